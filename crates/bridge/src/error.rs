//! Bridge error types

use protocol::{GatewayErrorCode, ProtocolError, RecordError};
use std::time::Duration;
use thiserror::Error;

/// Why a command ended unsuccessfully, as decided by the command itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandFailure {
    /// Payload shorter than the command's fixed layout
    #[error("payload of {available} bytes, need {needed}")]
    PayloadLength { needed: usize, available: usize },

    /// Confirmation for a different session
    #[error("session {received:#06x} does not match {expected:#06x}")]
    SessionMismatch { expected: u16, received: u16 },

    /// The gateway refused the request
    #[error("request refused with status {status}")]
    Rejected { status: u8 },

    /// Answer about a different node than the one requested
    #[error("answer for node {received}, requested node {expected}")]
    NodeMismatch { expected: u8, received: u8 },

    /// The request was accepted but did not complete
    #[error("execution failed (status reply {status_reply})")]
    ExecutionFailed { status_reply: u8 },

    /// A parameter set before dispatch is unusable
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
}

impl From<RecordError> for CommandFailure {
    fn from(err: RecordError) -> Self {
        Self::PayloadLength {
            needed: err.needed,
            available: err.available,
        }
    }
}

/// Errors reported by the dispatcher
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{command}: payload of {available} bytes, need {needed}")]
    PayloadLength {
        command: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("{command}: session {received:#06x} does not match {expected:#06x}")]
    SessionMismatch {
        command: &'static str,
        expected: u16,
        received: u16,
    },

    /// Gateway stayed busy until the deadline
    #[error("Gateway busy")]
    GatewayBusy,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No terminal answer within {0:?}")]
    Timeout(Duration),

    #[error("Unrecognized command code {0:#06x}")]
    UnrecognizedCommand(u16),

    /// `GW_ERROR_NTF` with a terminal error code
    #[error("Gateway error: {0}")]
    Gateway(GatewayErrorCode),

    /// The transport went idle before the gateway answered at all
    #[error("No response from gateway")]
    NoResponse,

    #[error("{command}: {reason}")]
    Rejected {
        command: &'static str,
        reason: CommandFailure,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl BridgeError {
    /// Attribute a command's own failure to it
    pub fn from_failure(command: &'static str, failure: CommandFailure) -> Self {
        match failure {
            CommandFailure::PayloadLength { needed, available } => Self::PayloadLength {
                command,
                needed,
                available,
            },
            CommandFailure::SessionMismatch { expected, received } => Self::SessionMismatch {
                command,
                expected,
                received,
            },
            reason => Self::Rejected { command, reason },
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
