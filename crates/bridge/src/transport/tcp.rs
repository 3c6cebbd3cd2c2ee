use super::Transport;
use protocol::{FrameReader, ProtocolError, Result};
use std::io;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Plain TCP connection to the gateway
///
/// The KLF 200 only speaks TLS on its API port, so real hardware is reached
/// through a TLS-terminating proxy.
///
/// The connection is opened lazily by the first write and again after a
/// [`Transport::reset`].
pub struct TcpTransport {
    address: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    stream: Option<FrameReader<TcpStream>>,
}

impl TcpTransport {
    pub fn new(address: impl Into<String>, connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
            read_timeout,
            stream: None,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn connect(&mut self) -> Result<&mut FrameReader<TcpStream>> {
        if self.stream.is_none() {
            info!("Connecting to gateway at {}", self.address);
            let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.address))
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connecting to {} timed out", self.address),
                    )
                })??;
            stream.set_nodelay(true)?;
            info!("Connected to gateway at {}", self.address);
            self.stream = Some(FrameReader::new(stream));
        }
        self.stream
            .as_mut()
            .ok_or_else(|| ProtocolError::Io(io::Error::from(io::ErrorKind::NotConnected)))
    }
}

impl Transport for TcpTransport {
    async fn write(&mut self, frame: &[u8]) -> Result<()> {
        let result = {
            let stream = self.connect().await?.get_mut();
            match stream.write_all(frame).await {
                Ok(()) => stream.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = result {
            warn!("Write to gateway failed: {}", e);
            self.stream = None;
            return Err(e.into());
        }
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Vec<u8>> {
        let Some(reader) = self.stream.as_mut() else {
            return Err(io::Error::from(io::ErrorKind::NotConnected).into());
        };
        match tokio::time::timeout(self.read_timeout, reader.read_frame()).await {
            Err(_) => Ok(Vec::new()),
            Ok(Ok(Some(frame))) => Ok(frame),
            Ok(Ok(None)) => {
                info!("Gateway closed the connection");
                self.stream = None;
                Err(io::Error::new(io::ErrorKind::UnexpectedEof, "gateway closed the connection").into())
            }
            Ok(Err(e)) => Err(e),
        }
    }

    async fn is_alive(&self) -> bool {
        self.stream.is_some()
    }

    async fn reset(&mut self) {
        if let Some(mut reader) = self.stream.take() {
            debug!("Closing connection to {}", self.address);
            if let Err(e) = reader.get_mut().shutdown().await {
                debug!("Shutdown of {} failed: {}", self.address, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{decode_frame, encode_frame};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buffer = [0u8; 6];
            socket.read_exact(&mut buffer).await.unwrap();
            socket.write_all(&encode_frame(&[0x09, 0x08])).await.unwrap();
            buffer
        });

        let mut transport =
            TcpTransport::new(address, Duration::from_secs(2), Duration::from_secs(2));
        assert!(!transport.is_alive().await);

        let request = encode_frame(&[0x01, 0xC0, 0x02]);
        transport.write(&request).await.unwrap();
        assert!(transport.is_alive().await);

        let frame = transport.read_frame().await.unwrap();
        assert_eq!(decode_frame(&frame).unwrap(), vec![0x09, 0x08]);
        assert_eq!(server.await.unwrap().to_vec(), request);

        transport.reset().await;
        assert!(!transport.is_alive().await);
    }

    #[tokio::test]
    async fn test_tcp_idle_read_returns_empty() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            drop(socket);
        });

        let mut transport =
            TcpTransport::new(address, Duration::from_secs(2), Duration::from_millis(50));
        transport.write(&encode_frame(&[0x00])).await.unwrap();
        assert!(transport.read_frame().await.unwrap().is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_tcp_read_without_connection() {
        let mut transport =
            TcpTransport::new("127.0.0.1:1", Duration::from_millis(100), Duration::from_millis(100));
        assert!(matches!(
            transport.read_frame().await,
            Err(ProtocolError::Io(_))
        ));
    }
}
