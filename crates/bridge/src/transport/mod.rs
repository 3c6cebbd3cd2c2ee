//! Byte transports to the gateway
//!
//! A transport moves byte-stuffed frames; envelopes and command semantics are
//! the dispatcher's business. Reads block until one frame arrived or the
//! transport's own idle timeout expired, in which case an empty frame is
//! returned.

mod scripted;
mod tcp;

pub use scripted::{ScriptStep, ScriptedTransport};
pub use tcp::TcpTransport;

use protocol::Result;
use std::future::Future;

/// Connection to the gateway carrying SLIP frames
pub trait Transport: Send {
    /// Write one complete frame, connecting first if needed
    fn write(&mut self, frame: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Read one frame; empty if nothing arrived within the idle timeout
    fn read_frame(&mut self) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Whether the connection is currently open
    fn is_alive(&self) -> impl Future<Output = bool> + Send;

    /// Close the connection; the next write reconnects
    fn reset(&mut self) -> impl Future<Output = ()> + Send;
}
