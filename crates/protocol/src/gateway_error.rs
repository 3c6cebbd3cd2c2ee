//! Error codes carried by `GW_ERROR_NTF`

use serde::{Deserialize, Serialize};

/// Condition reported by the gateway in an error notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GatewayErrorCode {
    General,
    UnknownCommand,
    FrameStructure,
    /// The gateway is busy, the same request may be sent again
    Busy,
    BadSystemTableIndex,
    /// The connection has not been authenticated (or lost its login)
    NotAuthenticated,
    Other(u8),
}

impl GatewayErrorCode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::General,
            1 => Self::UnknownCommand,
            2 => Self::FrameStructure,
            7 => Self::Busy,
            8 => Self::BadSystemTableIndex,
            12 => Self::NotAuthenticated,
            other => Self::Other(other),
        }
    }

    /// Code of a `GW_ERROR_NTF` payload; an empty payload counts as a general error
    pub fn from_payload(payload: &[u8]) -> Self {
        payload.first().map_or(Self::General, |&code| Self::from_u8(code))
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::General => 0,
            Self::UnknownCommand => 1,
            Self::FrameStructure => 2,
            Self::Busy => 7,
            Self::BadSystemTableIndex => 8,
            Self::NotAuthenticated => 12,
            Self::Other(value) => value,
        }
    }

    /// Diagnostic text, never used for control flow
    pub fn description(self) -> &'static str {
        match self {
            Self::General => "Not further defined error",
            Self::UnknownCommand => "Unknown command or command is not accepted at this state",
            Self::FrameStructure => "Error on frame structure",
            Self::Busy => "Busy, try again later",
            Self::BadSystemTableIndex => "Bad system table index",
            Self::NotAuthenticated => "Not authenticated",
            Self::Other(_) => "Unknown error code",
        }
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.description(), self.as_u8())
    }
}
