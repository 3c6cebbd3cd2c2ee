//! Moving actuators and activating scenes

use super::{
    BridgeCommand, CommandState, INDEX_ARRAY_SIZE, ORIGINATOR_SAAC, PRIORITY_COMFORT,
    STATUS_ACCEPTED, STATUS_OK, index_array, session_of,
};
use crate::error::CommandFailure;
use byteorder::{BigEndian, ByteOrder};
use protocol::position::{POSITION_CURRENT, POSITION_DEFAULT, POSITION_IGNORE, POSITION_TARGET};
use protocol::{
    ActuatorPosition, ActuatorState, Command, FunctionalParameters, ProductState, RunStatus,
    RunStatusNotification, SessionCorrelator,
};
use tracing::{debug, warn};

/// Track the follow-up notifications of an accepted session
///
/// Returns `false` if `command` is not a session progress notification.
/// Notifications for other sessions are logged and dropped.
pub(crate) fn follow_session(
    name: &'static str,
    state: &mut CommandState,
    session_id: u16,
    command: Command,
    payload: &[u8],
) -> bool {
    match command {
        Command::CommandRunStatusNtf => {
            let status = match RunStatusNotification::decode(payload) {
                Ok(status) => status,
                Err(e) => {
                    state.fail(e.into());
                    return true;
                }
            };
            if !SessionCorrelator::matches(status.session_id, session_id) {
                warn!(
                    "{}: ignoring run status of session {:#06x}, expected {:#06x}",
                    name, status.session_id, session_id
                );
                return true;
            }
            match status.run_status {
                RunStatus::Completed => state.succeed(),
                RunStatus::Failed => state.fail(CommandFailure::ExecutionFailed {
                    status_reply: status.status_reply,
                }),
                RunStatus::Active | RunStatus::Other(_) => {
                    let received = state.record_notification();
                    debug!("{}: node {} still running ({} updates)", name, status.node_id, received);
                }
            }
            true
        }
        Command::SessionFinishedNtf => {
            if payload.len() < 2 {
                state.fail(CommandFailure::PayloadLength {
                    needed: 2,
                    available: payload.len(),
                });
                return true;
            }
            let finished = session_of(payload);
            if SessionCorrelator::matches(finished, session_id) {
                if !state.is_done() {
                    state.succeed();
                }
            } else {
                warn!("{}: ignoring end of session {:#06x}", name, finished);
            }
            true
        }
        _ => false,
    }
}

/// Move one actuator (`GW_COMMAND_SEND_REQ`)
#[derive(Debug)]
pub struct RunProductCommand {
    node_id: u8,
    position: ActuatorPosition,
    functional_parameters: Option<FunctionalParameters>,
    session_id: u16,
    state: CommandState,
}

impl Default for RunProductCommand {
    fn default() -> Self {
        Self {
            node_id: 0,
            position: ActuatorPosition(POSITION_IGNORE),
            functional_parameters: None,
            session_id: 0,
            state: CommandState::default(),
        }
    }
}

impl RunProductCommand {
    /// Size of the command send payload
    pub const PAYLOAD_SIZE: usize = 66;

    const MAIN_PARAMETER_OFFSET: usize = 7;
    const FUNCTIONAL_PARAMETER_OFFSET: usize = 9;
    /// Main parameter plus FP1..FP16
    const PARAMETER_FIELDS: usize = 17;

    pub fn new() -> Self {
        Self::default()
    }

    /// Target position and optional functional parameters for `node_id`
    ///
    /// A position outside the absolute and relative ranges that is not one of
    /// the special values is sent as "ignore".
    pub fn set_node_and_parameters(
        &mut self,
        node_id: u8,
        position: ActuatorPosition,
        functional_parameters: Option<FunctionalParameters>,
    ) {
        let special = matches!(
            position.raw(),
            POSITION_TARGET | POSITION_CURRENT | POSITION_DEFAULT | POSITION_IGNORE
        );
        self.node_id = node_id;
        self.position = if position.is_valid() || special {
            position
        } else {
            warn!("Position {:#06x} for node {} replaced by ignore", position.raw(), node_id);
            ActuatorPosition(POSITION_IGNORE)
        };
        self.functional_parameters = functional_parameters;
    }

    pub fn session_id(&self) -> u16 {
        self.session_id
    }

    /// State the actuator is expected to report while executing this command
    pub fn requested_state(&self) -> ActuatorState {
        ActuatorState {
            node_id: self.node_id,
            state: ProductState::Executing,
            current_position: self.position,
            target_position: self.position,
            functional_parameters: self.functional_parameters,
            remaining_time: 0,
            timestamp: 0,
        }
    }
}

impl BridgeCommand for RunProductCommand {
    fn name(&self) -> &'static str {
        "RunProductCommand"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        Command::CommandSendReq
    }

    fn build_request_payload(&mut self, sessions: &mut SessionCorrelator) -> Vec<u8> {
        self.session_id = sessions.next_id();

        let mut payload = vec![0u8; Self::PAYLOAD_SIZE];
        BigEndian::write_u16(&mut payload[0..2], self.session_id);
        payload[2] = ORIGINATOR_SAAC;
        payload[3] = PRIORITY_COMFORT;
        // Parameter active: main parameter
        payload[4] = 0;
        BigEndian::write_u16(
            &mut payload[Self::MAIN_PARAMETER_OFFSET..Self::FUNCTIONAL_PARAMETER_OFFSET],
            self.position.raw(),
        );
        if let Some(params) = &self.functional_parameters {
            payload[5] = params.write_positional(&mut payload, Self::FUNCTIONAL_PARAMETER_OFFSET);
        }

        let index_offset = Self::MAIN_PARAMETER_OFFSET + 2 * Self::PARAMETER_FIELDS;
        payload[index_offset] = 1;
        payload[index_offset + 1..index_offset + 1 + INDEX_ARRAY_SIZE]
            .copy_from_slice(&index_array(&[self.node_id]));
        // Priority level lock fields stay zero
        payload
    }

    fn handle_response(&mut self, command: Command, payload: &[u8], sequential_mode: bool) {
        if command == Command::CommandSendCfm {
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
            return;
        }
        if !follow_session(self.name(), &mut self.state, self.session_id, command, payload) {
            debug!("{}: ignoring {}", self.name(), command);
        }
    }

    fn state(&self) -> &CommandState {
        &self.state
    }
}

/// Activate a stored scene (`GW_ACTIVATE_SCENE_REQ`)
#[derive(Debug, Default)]
pub struct RunScene {
    scene_id: u8,
    velocity: u8,
    session_id: u16,
    state: CommandState,
}

impl RunScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_scene(&mut self, scene_id: u8) {
        self.scene_id = scene_id;
    }

    /// Velocity byte (0 = default, 1 = silent, 2 = fast)
    pub fn set_velocity(&mut self, velocity: u8) {
        self.velocity = velocity;
    }

    pub fn session_id(&self) -> u16 {
        self.session_id
    }
}

impl BridgeCommand for RunScene {
    fn name(&self) -> &'static str {
        "RunScene"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        Command::ActivateSceneReq
    }

    fn build_request_payload(&mut self, sessions: &mut SessionCorrelator) -> Vec<u8> {
        self.session_id = sessions.next_id();
        let mut payload = Vec::with_capacity(6);
        payload.extend_from_slice(&self.session_id.to_be_bytes());
        payload.push(ORIGINATOR_SAAC);
        payload.push(PRIORITY_COMFORT);
        payload.push(self.scene_id);
        payload.push(self.velocity);
        payload
    }

    fn handle_response(&mut self, command: Command, payload: &[u8], sequential_mode: bool) {
        if command == Command::ActivateSceneCfm {
            // Status first, then the session
            if !self.state.require_length(payload, 3)
                || !self.state.require_session(self.session_id, session_of(&payload[1..]))
            {
                return;
            }
            match payload[0] {
                STATUS_OK if sequential_mode => self.state.await_notifications(),
                STATUS_OK => self.state.succeed(),
                status => self.state.fail(CommandFailure::Rejected { status }),
            }
            return;
        }
        if !follow_session(self.name(), &mut self.state, self.session_id, command, payload) {
            debug!("{}: ignoring {}", self.name(), command);
        }
    }

    fn state(&self) -> &CommandState {
        &self.state
    }
}
