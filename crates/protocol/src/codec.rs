//! SLIP (RFC 1055) frame codec
//!
//! The gateway speaks over a continuous byte stream, so every command envelope
//! is byte-stuffed and delimited before it is written:
//!
//! ```text
//! [END][payload with END/ESC escaped][END]
//! ```
//!
//! `END` inside the payload becomes `ESC ESC_END`, `ESC` becomes `ESC ESC_ESC`.
//! Decoding reverses this and rejects malformed escapes or a missing terminator.
//!
//! # Example
//!
//! ```
//! use protocol::{decode_frame, encode_frame};
//!
//! let payload = [0x00, 0xC0, 0xDB, 0x42];
//! let framed = encode_frame(&payload);
//! assert_eq!(framed.first(), Some(&0xC0));
//! assert_eq!(decode_frame(&framed).unwrap(), payload);
//! ```

use crate::envelope::{ENVELOPE_OVERHEAD, MAX_PAYLOAD_SIZE};
use crate::error::FramingError;

#[cfg(feature = "async")]
use crate::error::{ProtocolError, Result};
#[cfg(feature = "async")]
use bytes::{Buf, BytesMut};
#[cfg(feature = "async")]
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frame delimiter
pub const END: u8 = 0xC0;
/// Escape introducer
pub const ESC: u8 = 0xDB;
/// Escaped END
pub const ESC_END: u8 = 0xDC;
/// Escaped ESC
pub const ESC_ESC: u8 = 0xDD;

/// Largest stuffed frame the gateway can produce (every byte escaped plus both delimiters)
pub const MAX_FRAME_SIZE: usize = 2 * (MAX_PAYLOAD_SIZE + ENVELOPE_OVERHEAD) + 2;

/// Byte-stuff `payload` into a delimited frame
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + payload.len() / 8 + 2);
    frame.push(END);
    for &byte in payload {
        match byte {
            END => frame.extend_from_slice(&[ESC, ESC_END]),
            ESC => frame.extend_from_slice(&[ESC, ESC_ESC]),
            other => frame.push(other),
        }
    }
    frame.push(END);
    frame
}

/// Recover the payload of one frame
///
/// One leading delimiter is optional; decoding stops at the next delimiter,
/// anything behind it is ignored. Runs of idle delimiters are collapsed by
/// [`FrameReader`], not here, so `[END, END]` stays the empty frame.
pub fn decode_frame(frame: &[u8]) -> std::result::Result<Vec<u8>, FramingError> {
    let body = frame.strip_prefix(&[END]).unwrap_or(frame);

    let mut payload = Vec::with_capacity(body.len());
    let mut escaped = false;
    for &byte in body {
        if escaped {
            match byte {
                ESC_END => payload.push(END),
                ESC_ESC => payload.push(ESC),
                END => return Err(FramingError::DanglingEscape),
                other => return Err(FramingError::InvalidEscape(other)),
            }
            escaped = false;
            continue;
        }
        match byte {
            END => return Ok(payload),
            ESC => escaped = true,
            other => payload.push(other),
        }
    }

    if escaped {
        Err(FramingError::DanglingEscape)
    } else {
        Err(FramingError::MissingTerminator)
    }
}

/// Splits an async byte stream into stuffed frames
///
/// Each returned frame includes its delimiters and can be handed to
/// [`decode_frame`] unchanged.
#[cfg(feature = "async")]
pub struct FrameReader<R> {
    reader: R,
    buffer: BytesMut,
}

#[cfg(feature = "async")]
impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(MAX_FRAME_SIZE),
        }
    }

    /// Bytes received but not yet returned as part of a frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partially received frame
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Read the next complete frame
    ///
    /// Returns `Ok(None)` once the stream is closed. A partial frame left in
    /// the buffer at end of stream is discarded.
    pub async fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(frame) = self.take_frame()? {
                return Ok(Some(frame));
            }

            let read = self.reader.read_buf(&mut self.buffer).await?;
            if read == 0 {
                if !self.buffer.is_empty() {
                    tracing::debug!(
                        "Stream closed with {} bytes of an unterminated frame",
                        self.buffer.len()
                    );
                    self.buffer.clear();
                }
                return Ok(None);
            }
        }
    }

    fn take_frame(&mut self) -> Result<Option<Vec<u8>>> {
        // Idle delimiters between frames carry no content
        let leading = self.buffer.iter().take_while(|&&b| b == END).count();
        self.buffer.advance(leading);

        match self.buffer.iter().position(|&b| b == END) {
            Some(end) => {
                let content = self.buffer.split_to(end + 1);
                let mut frame = Vec::with_capacity(content.len() + 1);
                frame.push(END);
                frame.extend_from_slice(&content);
                Ok(Some(frame))
            }
            None if self.buffer.len() > MAX_FRAME_SIZE => {
                self.buffer.clear();
                Err(ProtocolError::Framing(FramingError::Oversized {
                    max: MAX_FRAME_SIZE,
                }))
            }
            None => Ok(None),
        }
    }
}

/// Async: byte-stuff `payload` and write it as one frame
#[cfg(feature = "async")]
pub async fn write_frame_async<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode_frame(payload)).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_plain_payload() {
        let framed = encode_frame(&[0x01, 0x02, 0x03]);
        assert_eq!(framed, vec![END, 0x01, 0x02, 0x03, END]);
    }

    #[test]
    fn test_encode_escapes_delimiters() {
        let framed = encode_frame(&[END, ESC, 0x00]);
        assert_eq!(framed, vec![END, ESC, ESC_END, ESC, ESC_ESC, 0x00, END]);
    }

    #[test]
    fn test_decode_reverses_escapes() {
        let decoded = decode_frame(&[END, ESC, ESC_END, 0x10, ESC, ESC_ESC, END]).unwrap();
        assert_eq!(decoded, vec![END, 0x10, ESC]);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let decoded = decode_frame(&[END, 0x01, END, 0x99, 0x98]).unwrap();
        assert_eq!(decoded, vec![0x01]);
    }

    #[test]
    fn test_empty_payload_roundtrip() {
        assert_eq!(encode_frame(&[]), vec![END, END]);
        assert_eq!(decode_frame(&[END, END]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_decode_skips_only_one_leading_delimiter() {
        // A second delimiter closes an empty frame
        assert_eq!(decode_frame(&[END, END, 0x01, END]).unwrap(), Vec::<u8>::new());
        assert_eq!(decode_frame(&[END, 0x01, END]).unwrap(), vec![0x01]);
    }

    #[test]
    fn test_decode_missing_terminator() {
        let result = decode_frame(&[END, 0x01, 0x02]);
        assert_eq!(result, Err(FramingError::MissingTerminator));
    }

    #[test]
    fn test_decode_invalid_escape() {
        let result = decode_frame(&[END, ESC, 0x41, END]);
        assert_eq!(result, Err(FramingError::InvalidEscape(0x41)));
    }

    #[test]
    fn test_decode_dangling_escape() {
        assert_eq!(decode_frame(&[END, 0x01, ESC, END]), Err(FramingError::DanglingEscape));
        assert_eq!(decode_frame(&[END, 0x01, ESC]), Err(FramingError::DanglingEscape));
    }

    #[test]
    fn test_decode_without_leading_delimiter() {
        let decoded = decode_frame(&[0x05, 0x06, END]).unwrap();
        assert_eq!(decoded, vec![0x05, 0x06]);
    }

    #[tokio::test]
    async fn test_frame_reader_splits_stream() {
        let mut stream = encode_frame(&[0x01, END]);
        stream.extend(encode_frame(&[0x02]));
        let mut reader = FrameReader::new(std::io::Cursor::new(stream));

        let first = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(decode_frame(&first).unwrap(), vec![0x01, END]);

        let second = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(decode_frame(&second).unwrap(), vec![0x02]);

        assert!(reader.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_frame_reader_skips_idle_delimiters() {
        let stream = vec![END, END, END, 0x07, END];
        let mut reader = FrameReader::new(std::io::Cursor::new(stream));
        let frame = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(frame, vec![END, 0x07, END]);
    }

    #[tokio::test]
    async fn test_frame_reader_discards_partial_frame_at_eof() {
        let stream = vec![END, 0x01, 0x02];
        let mut reader = FrameReader::new(std::io::Cursor::new(stream));
        assert!(reader.read_frame().await.unwrap().is_none());
        assert_eq!(reader.buffered(), 0);
    }

    #[tokio::test]
    async fn test_frame_reader_rejects_oversized_frame() {
        let mut stream = vec![END];
        stream.extend(std::iter::repeat_n(0x55, MAX_FRAME_SIZE + 10));
        let mut reader = FrameReader::new(std::io::Cursor::new(stream));
        let result = reader.read_frame().await;
        assert!(matches!(
            result,
            Err(ProtocolError::Framing(FramingError::Oversized { .. }))
        ));
    }

    #[tokio::test]
    async fn test_write_frame_async() {
        let mut buffer = Vec::new();
        write_frame_async(&mut buffer, &[ESC]).await.unwrap();
        assert_eq!(buffer, vec![END, ESC, ESC_ESC, END]);
    }
}
