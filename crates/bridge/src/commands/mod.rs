//! Command catalogue
//!
//! Every gateway operation is a [`BridgeCommand`]: it knows the request code
//! and payload it sends, and consumes the confirmations and notifications the
//! dispatcher routes to it until it reaches a terminal [`CommandState`].
//!
//! ```text
//! Idle -> AwaitingConfirmation -> (AwaitingNotification)* -> Done(Success | Failure)
//! ```
//!
//! A command is re-armed by [`BridgeCommand::request_command_code`], so one
//! instance can be dispatched any number of times.

mod gateway;
mod house;
mod limitation;
mod login;
mod products;
mod run;
mod scenes;

pub use gateway::{GetDeviceStatus, GetFirmware, GetLanConfig, SetUtc};
pub use house::{GetHouseStatus, ReceiveOnly, SetHouseStatusMonitor};
pub use limitation::{
    GetLimitation, LIMITATION_TIME_CLEAR, LIMITATION_TIME_UNLIMITED, LimitationType, SetLimitation,
};
pub use login::{ChangePassword, Login, Logout, PASSWORD_SIZE};
pub use products::{GetProduct, GetProductStatus, GetProducts};
pub use run::{RunProductCommand, RunScene};
pub use scenes::GetScenes;

use crate::error::CommandFailure;
use byteorder::{BigEndian, ByteOrder};
use protocol::{Command, SessionCorrelator};

/// Originator of requests sent by this bridge (stand alone automatic controls)
pub const ORIGINATOR_SAAC: u8 = 0x08;

/// Priority of requests sent by this bridge (comfort level 2)
pub const PRIORITY_COMFORT: u8 = 0x05;

/// Size of the node index array in command requests
pub const INDEX_ARRAY_SIZE: usize = 20;

/// Confirmation status byte for "request accepted" (session based requests)
pub(crate) const STATUS_ACCEPTED: u8 = 0x01;

/// Confirmation status byte for "ok" (table based requests)
pub(crate) const STATUS_OK: u8 = 0x00;

/// Terminal result of one dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(CommandFailure),
}

/// Lifecycle of one dispatch of a command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommandState {
    #[default]
    Idle,
    AwaitingConfirmation,
    AwaitingNotification {
        received: usize,
    },
    Done(Outcome),
}

impl CommandState {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Done(Outcome::Success))
    }

    pub fn failure(&self) -> Option<&CommandFailure> {
        match self {
            Self::Done(Outcome::Failure(failure)) => Some(failure),
            _ => None,
        }
    }

    pub(crate) fn arm(&mut self) {
        *self = Self::AwaitingConfirmation;
    }

    pub(crate) fn succeed(&mut self) {
        *self = Self::Done(Outcome::Success);
    }

    pub(crate) fn fail(&mut self, failure: CommandFailure) {
        *self = Self::Done(Outcome::Failure(failure));
    }

    pub(crate) fn await_notifications(&mut self) {
        *self = Self::AwaitingNotification { received: 0 };
    }

    /// Count one notification, returns the new total
    pub(crate) fn record_notification(&mut self) -> usize {
        let received = match self {
            Self::AwaitingNotification { received } => *received + 1,
            _ => 1,
        };
        *self = Self::AwaitingNotification { received };
        received
    }

    /// Fail the command unless `payload` has at least `needed` bytes
    pub(crate) fn require_length(&mut self, payload: &[u8], needed: usize) -> bool {
        if payload.len() < needed {
            self.fail(CommandFailure::PayloadLength {
                needed,
                available: payload.len(),
            });
            return false;
        }
        true
    }

    /// Fail the command unless the confirmation belongs to `expected`
    pub(crate) fn require_session(&mut self, expected: u16, received: u16) -> bool {
        if !SessionCorrelator::matches(received, expected) {
            self.fail(CommandFailure::SessionMismatch { expected, received });
            return false;
        }
        true
    }
}

/// Per-command protocol
///
/// The dispatcher calls `request_command_code`, then `build_request_payload`
/// when it is about to send, then `handle_response` for every frame that is
/// not handled generically, until `is_finished` turns true.
pub trait BridgeCommand: Send {
    /// Name for logs
    fn name(&self) -> &'static str;

    /// Code of the request; re-arms the command for a fresh attempt
    fn request_command_code(&mut self) -> Command;

    /// Serialize the current parameters, drawing a session id if needed
    fn build_request_payload(&mut self, sessions: &mut SessionCorrelator) -> Vec<u8>;

    /// Consume one confirmation or notification
    fn handle_response(&mut self, command: Command, payload: &[u8], sequential_mode: bool);

    fn state(&self) -> &CommandState;

    fn is_finished(&self) -> bool {
        self.state().is_done()
    }

    fn is_successful(&self) -> bool {
        self.state().is_successful()
    }

    /// Whether the session must be logged in before sending
    fn requires_authentication(&self) -> bool {
        true
    }

    /// Whether success of this command logs the session in
    fn authenticates(&self) -> bool {
        false
    }
}

/// Read the big-endian session id at the start of `payload`
pub(crate) fn session_of(payload: &[u8]) -> u16 {
    BigEndian::read_u16(payload)
}

/// Node index array with `nodes` at the front
pub(crate) fn index_array(nodes: &[u8]) -> [u8; INDEX_ARRAY_SIZE] {
    let mut array = [0u8; INDEX_ARRAY_SIZE];
    for (slot, node) in array.iter_mut().zip(nodes) {
        *slot = *node;
    }
    array
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let mut state = CommandState::default();
        assert_eq!(state, CommandState::Idle);

        state.arm();
        assert!(!state.is_done());

        state.await_notifications();
        assert_eq!(state.record_notification(), 1);
        assert_eq!(state.record_notification(), 2);
        assert_eq!(state, CommandState::AwaitingNotification { received: 2 });

        state.succeed();
        assert!(state.is_done());
        assert!(state.is_successful());
        assert!(state.failure().is_none());
    }

    #[test]
    fn test_require_length_fails_closed() {
        let mut state = CommandState::AwaitingConfirmation;
        assert!(state.require_length(&[1, 2, 3], 3));
        assert!(!state.require_length(&[1, 2], 3));
        assert_eq!(
            state.failure(),
            Some(&CommandFailure::PayloadLength {
                needed: 3,
                available: 2
            })
        );
    }

    #[test]
    fn test_require_session() {
        let mut state = CommandState::AwaitingConfirmation;
        assert!(state.require_session(5, 5));
        assert!(!state.require_session(5, 6));
        assert!(state.is_done());
        assert!(!state.is_successful());
    }

    #[test]
    fn test_index_array() {
        let array = index_array(&[6, 3]);
        assert_eq!(array[0], 6);
        assert_eq!(array[1], 3);
        assert!(array[2..].iter().all(|&b| b == 0));
    }
}
