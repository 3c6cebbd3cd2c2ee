//! KLF transport envelope
//!
//! Every frame payload carries a small header, the command code and a
//! trailing XOR checksum:
//!
//! ```text
//! [ProtocolID: u8 = 0x00][Length: u8][Command: u16 BE][Data...][Checksum: u8]
//! ```
//!
//! `Length` counts the command, the data and the checksum; the checksum is the
//! XOR of every byte in front of it.

use crate::error::{EnvelopeError, ProtocolError, Result};
use bytes::{BufMut, BytesMut};
use byteorder::{BigEndian, ByteOrder};

/// Protocol identifier of the KLF 200 API
pub const PROTOCOL_ID: u8 = 0x00;

/// Header bytes in front of the data (protocol id, length, command)
pub const HEADER_SIZE: usize = 4;

/// Header plus checksum
pub const ENVELOPE_OVERHEAD: usize = HEADER_SIZE + 1;

/// Largest payload whose length still fits into the length byte
pub const MAX_PAYLOAD_SIZE: usize = u8::MAX as usize - 3;

/// A decoded command envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub command: u16,
    pub payload: Vec<u8>,
}

/// XOR checksum over `bytes`
#[inline]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Wrap `payload` for `command` into an envelope ready for framing
pub fn wrap(command: u16, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let mut buffer = BytesMut::with_capacity(ENVELOPE_OVERHEAD + payload.len());
    buffer.put_u8(PROTOCOL_ID);
    buffer.put_u8((payload.len() + 3) as u8);
    buffer.put_u16(command);
    buffer.put_slice(payload);
    let sum = checksum(&buffer);
    buffer.put_u8(sum);

    Ok(buffer.to_vec())
}

/// Split an envelope into command code and payload
pub fn unwrap(bytes: &[u8]) -> std::result::Result<Envelope, EnvelopeError> {
    if bytes.len() < ENVELOPE_OVERHEAD {
        return Err(EnvelopeError::Truncated {
            needed: ENVELOPE_OVERHEAD,
            available: bytes.len(),
        });
    }
    if bytes[0] != PROTOCOL_ID {
        return Err(EnvelopeError::ProtocolId(bytes[0]));
    }

    let declared = bytes[1] as usize;
    let actual = bytes.len() - 2;
    if declared != actual {
        return Err(EnvelopeError::Length { declared, actual });
    }

    let (body, trailer) = bytes.split_at(bytes.len() - 1);
    let computed = checksum(body);
    if computed != trailer[0] {
        return Err(EnvelopeError::Checksum {
            expected: trailer[0],
            computed,
        });
    }

    Ok(Envelope {
        command: BigEndian::read_u16(&body[2..4]),
        payload: body[HEADER_SIZE..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_layout() {
        let bytes = wrap(0x3000, &[0xAA, 0xBB]).unwrap();
        assert_eq!(bytes[0], PROTOCOL_ID);
        assert_eq!(bytes[1], 5);
        assert_eq!(&bytes[2..4], &[0x30, 0x00]);
        assert_eq!(&bytes[4..6], &[0xAA, 0xBB]);
        assert_eq!(bytes[6], 0x24);
    }

    #[test]
    fn test_unwrap_recovers_command_and_payload() {
        let bytes = wrap(0x0211, &[1, 2, 3, 4]).unwrap();
        let envelope = unwrap(&bytes).unwrap();
        assert_eq!(envelope.command, 0x0211);
        assert_eq!(envelope.payload, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_unwrap_empty_payload() {
        let bytes = wrap(0x000C, &[]).unwrap();
        assert_eq!(bytes.len(), ENVELOPE_OVERHEAD);
        let envelope = unwrap(&bytes).unwrap();
        assert_eq!(envelope.command, 0x000C);
        assert!(envelope.payload.is_empty());
    }

    #[test]
    fn test_unwrap_truncated() {
        let result = unwrap(&[0x00, 0x03, 0x30]);
        assert_eq!(
            result,
            Err(EnvelopeError::Truncated {
                needed: 5,
                available: 3
            })
        );
    }

    #[test]
    fn test_unwrap_bad_protocol_id() {
        let mut bytes = wrap(0x0001, &[]).unwrap();
        bytes[0] = 0x01;
        assert_eq!(unwrap(&bytes), Err(EnvelopeError::ProtocolId(0x01)));
    }

    #[test]
    fn test_unwrap_bad_length() {
        let mut bytes = wrap(0x0001, &[0x10]).unwrap();
        bytes.insert(4, 0x00);
        assert!(matches!(unwrap(&bytes), Err(EnvelopeError::Length { .. })));
    }

    #[test]
    fn test_unwrap_bad_checksum() {
        let mut bytes = wrap(0x0001, &[0x10]).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(unwrap(&bytes), Err(EnvelopeError::Checksum { .. })));
    }

    #[test]
    fn test_wrap_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        assert!(matches!(
            wrap(0x0300, &payload),
            Err(ProtocolError::PayloadTooLarge { .. })
        ));
        assert!(wrap(0x0300, &payload[..MAX_PAYLOAD_SIZE]).is_ok());
    }
}
