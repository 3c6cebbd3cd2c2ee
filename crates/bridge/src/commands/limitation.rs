//! Position limitations
//!
//! A limitation restricts the range an actuator may move in, for a time or
//! until cleared. Both requests are session based; the gateway answers with
//! `GW_LIMITATION_STATUS_NTF` and finally `GW_SESSION_FINISHED_NTF`.

use super::run::follow_session;
use super::{
    BridgeCommand, CommandState, ORIGINATOR_SAAC, PRIORITY_COMFORT, STATUS_ACCEPTED, index_array,
    session_of,
};
use crate::error::CommandFailure;
use protocol::{ActuatorPosition, Command, LimitationStatus, SessionCorrelator};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Limitation time value: keep until cleared
pub const LIMITATION_TIME_UNLIMITED: u8 = 253;

/// Limitation time value: clear the limitation set by this originator
pub const LIMITATION_TIME_CLEAR: u8 = 254;

/// Which bound of the limitation to read
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LimitationType {
    #[default]
    Min = 0,
    Max = 1,
}

/// Read the current limitation of one parameter (`GW_GET_LIMITATION_STATUS_REQ`)
#[derive(Debug, Default)]
pub struct GetLimitation {
    node_id: u8,
    parameter_id: u8,
    limitation_type: LimitationType,
    session_id: u16,
    status: Option<LimitationStatus>,
    state: CommandState,
}

impl GetLimitation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_actuator(&mut self, node_id: u8, parameter_id: u8, limitation_type: LimitationType) {
        self.node_id = node_id;
        self.parameter_id = parameter_id;
        self.limitation_type = limitation_type;
    }

    pub fn session_id(&self) -> u16 {
        self.session_id
    }

    pub fn status(&self) -> Option<&LimitationStatus> {
        self.status.as_ref()
    }

    /// The requested bound
    pub fn value(&self) -> Option<ActuatorPosition> {
        self.status.as_ref().map(|status| match self.limitation_type {
            LimitationType::Min => status.min_value,
            LimitationType::Max => status.max_value,
        })
    }
}

impl BridgeCommand for GetLimitation {
    fn name(&self) -> &'static str {
        "GetLimitation"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        self.status = None;
        Command::GetLimitationStatusReq
    }

    fn build_request_payload(&mut self, sessions: &mut SessionCorrelator) -> Vec<u8> {
        self.session_id = sessions.next_id();
        let mut payload = Vec::with_capacity(25);
        payload.extend_from_slice(&self.session_id.to_be_bytes());
        payload.push(1);
        payload.extend_from_slice(&index_array(&[self.node_id]));
        payload.push(self.parameter_id);
        payload.push(self.limitation_type as u8);
        payload
    }

    fn handle_response(&mut self, command: Command, payload: &[u8], sequential_mode: bool) {
        match command {
            Command::GetLimitationStatusCfm => {
                if !self.state.require_length(payload, 3)
                    || !self.state.require_session(self.session_id, session_of(payload))
                {
                    return;
                }
                match payload[2] {
                    STATUS_ACCEPTED => self.state.await_notifications(),
                    status => self.state.fail(CommandFailure::Rejected { status }),
                }
            }
            Command::LimitationStatusNtf => {
                let status = match LimitationStatus::decode(payload) {
                    Ok(status) => status,
                    Err(e) => {
                        self.state.fail(e.into());
                        return;
                    }
                };
                if !SessionCorrelator::matches(status.session_id, self.session_id) {
                    warn!(
                        "{}: ignoring limitation of session {:#06x}",
                        self.name(),
                        status.session_id
                    );
                    return;
                }
                debug!(
                    "Node {} limited to {}..{}",
                    status.node_id, status.min_value, status.max_value
                );
                self.status = Some(status);
                if sequential_mode {
                    self.state.record_notification();
                } else {
                    self.state.succeed();
                }
            }
            other => {
                if !follow_session(self.name(), &mut self.state, self.session_id, other, payload) {
                    debug!("{}: ignoring {}", self.name(), other);
                }
            }
        }
    }

    fn state(&self) -> &CommandState {
        &self.state
    }
}

/// Restrict the movement range of one parameter (`GW_SET_LIMITATION_REQ`)
#[derive(Debug)]
pub struct SetLimitation {
    node_id: u8,
    parameter_id: u8,
    min: ActuatorPosition,
    max: ActuatorPosition,
    limitation_time: u8,
    session_id: u16,
    state: CommandState,
}

impl Default for SetLimitation {
    fn default() -> Self {
        Self {
            node_id: 0,
            parameter_id: 0,
            min: ActuatorPosition::UNKNOWN,
            max: ActuatorPosition::UNKNOWN,
            limitation_time: LIMITATION_TIME_UNLIMITED,
            session_id: 0,
            state: CommandState::default(),
        }
    }
}

impl SetLimitation {
    /// Size of the set limitation payload
    pub const PAYLOAD_SIZE: usize = 31;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_limitation(
        &mut self,
        node_id: u8,
        parameter_id: u8,
        min: ActuatorPosition,
        max: ActuatorPosition,
        limitation_time: u8,
    ) {
        self.node_id = node_id;
        self.parameter_id = parameter_id;
        self.min = min;
        self.max = max;
        self.limitation_time = limitation_time;
    }

    pub fn session_id(&self) -> u16 {
        self.session_id
    }
}

impl BridgeCommand for SetLimitation {
    fn name(&self) -> &'static str {
        "SetLimitation"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        Command::SetLimitationReq
    }

    fn build_request_payload(&mut self, sessions: &mut SessionCorrelator) -> Vec<u8> {
        self.session_id = sessions.next_id();
        let mut payload = Vec::with_capacity(Self::PAYLOAD_SIZE);
        payload.extend_from_slice(&self.session_id.to_be_bytes());
        payload.push(ORIGINATOR_SAAC);
        payload.push(PRIORITY_COMFORT);
        payload.push(1);
        payload.extend_from_slice(&index_array(&[self.node_id]));
        payload.push(self.parameter_id);
        payload.extend_from_slice(&self.min.raw().to_be_bytes());
        payload.extend_from_slice(&self.max.raw().to_be_bytes());
        payload.push(self.limitation_time);
        payload
    }

    fn handle_response(&mut self, command: Command, payload: &[u8], sequential_mode: bool) {
        match command {
            Command::SetLimitationCfm => {
                if !self.state.require_length(payload, 3)
                    || !self.state.require_session(self.session_id, session_of(payload))
                {
                    return;
                }
                match payload[2] {
                    STATUS_ACCEPTED if sequential_mode => self.state.await_notifications(),
                    STATUS_ACCEPTED => self.state.succeed(),
                    status => self.state.fail(CommandFailure::Rejected { status }),
                }
            }
            // Echo of the new limitation, nothing to decide on
            Command::LimitationStatusNtf => {
                debug!("{}: limitation status received", self.name());
            }
            other => {
                if !follow_session(self.name(), &mut self.state, self.session_id, other, payload) {
                    debug!("{}: ignoring {}", self.name(), other);
                }
            }
        }
    }

    fn state(&self) -> &CommandState {
        &self.state
    }
}
