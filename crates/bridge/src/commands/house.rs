//! House status monitor: unsolicited actuator updates

use super::{BridgeCommand, CommandState};
use protocol::{ActuatorState, Command, SessionCorrelator};
use tracing::debug;

/// Wait for the next position change of any actuator
///
/// Dispatched in receive-only mode; sends nothing.
#[derive(Debug)]
pub struct GetHouseStatus {
    discard_functional_parameters: bool,
    update: Option<ActuatorState>,
    state: CommandState,
}

impl Default for GetHouseStatus {
    fn default() -> Self {
        Self {
            discard_functional_parameters: true,
            update: None,
            state: CommandState::default(),
        }
    }
}

impl GetHouseStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_discard_functional_parameters(&mut self, discard: bool) {
        self.discard_functional_parameters = discard;
    }

    pub fn update(&self) -> Option<&ActuatorState> {
        self.update.as_ref()
    }
}

impl BridgeCommand for GetHouseStatus {
    fn name(&self) -> &'static str {
        "GetHouseStatus"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        self.update = None;
        Command::ReceiveOnly
    }

    fn build_request_payload(&mut self, _sessions: &mut SessionCorrelator) -> Vec<u8> {
        Vec::new()
    }

    fn handle_response(&mut self, command: Command, payload: &[u8], _sequential_mode: bool) {
        match command {
            Command::NodeStatePositionChangedNtf => {
                match ActuatorState::decode_position_changed(payload) {
                    Ok(update) => {
                        self.update = Some(if self.discard_functional_parameters {
                            update.without_functional_parameters()
                        } else {
                            update
                        });
                        self.state.succeed();
                    }
                    Err(e) => self.state.fail(e.into()),
                }
            }
            other => debug!("{}: ignoring {}", self.name(), other),
        }
    }

    fn state(&self) -> &CommandState {
        &self.state
    }

    fn requires_authentication(&self) -> bool {
        false
    }
}

/// Switch the house status monitor on or off
#[derive(Debug)]
pub struct SetHouseStatusMonitor {
    enable: bool,
    state: CommandState,
}

impl Default for SetHouseStatusMonitor {
    fn default() -> Self {
        Self {
            enable: true,
            state: CommandState::default(),
        }
    }
}

impl SetHouseStatusMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_enabled(&mut self, enable: bool) {
        self.enable = enable;
    }
}

impl BridgeCommand for SetHouseStatusMonitor {
    fn name(&self) -> &'static str {
        "SetHouseStatusMonitor"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        if self.enable {
            Command::HouseStatusMonitorEnableReq
        } else {
            Command::HouseStatusMonitorDisableReq
        }
    }

    fn build_request_payload(&mut self, _sessions: &mut SessionCorrelator) -> Vec<u8> {
        Vec::new()
    }

    fn handle_response(&mut self, command: Command, _payload: &[u8], _sequential_mode: bool) {
        match command {
            Command::HouseStatusMonitorEnableCfm if self.enable => self.state.succeed(),
            Command::HouseStatusMonitorDisableCfm if !self.enable => self.state.succeed(),
            other => debug!("{}: ignoring {}", self.name(), other),
        }
    }

    fn state(&self) -> &CommandState {
        &self.state
    }
}

/// Idle-time pickup of whatever the gateway reports on its own
///
/// Never finishes by itself; the dispatcher returns once the transport goes
/// quiet or an update was delivered.
#[derive(Debug, Default)]
pub struct ReceiveOnly {
    delivered: usize,
    state: CommandState,
}

impl ReceiveOnly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames handed over during the last dispatch
    pub fn delivered(&self) -> usize {
        self.delivered
    }
}

impl BridgeCommand for ReceiveOnly {
    fn name(&self) -> &'static str {
        "ReceiveOnly"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        self.delivered = 0;
        Command::ReceiveOnly
    }

    fn build_request_payload(&mut self, _sessions: &mut SessionCorrelator) -> Vec<u8> {
        Vec::new()
    }

    fn handle_response(&mut self, command: Command, _payload: &[u8], _sequential_mode: bool) {
        self.delivered += 1;
        debug!("{}: picked up {}", self.name(), command);
    }

    fn state(&self) -> &CommandState {
        &self.state
    }

    fn requires_authentication(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::test_utils::create_mock_position_changed;
    use protocol::{ActuatorPosition, FunctionalParameters, ProductState};

    fn with_vane(node: u8) -> Vec<u8> {
        let mut payload =
            create_mock_position_changed(node, 0x04, ActuatorPosition(0x1000), ActuatorPosition(0x6400));
        payload[6..8].copy_from_slice(&0x3000u16.to_be_bytes());
        payload
    }

    #[test]
    fn test_house_status_receives_update() {
        let mut command = GetHouseStatus::new();
        assert_eq!(command.request_command_code(), Command::ReceiveOnly);
        assert!(!command.requires_authentication());

        command.handle_response(Command::NodeStatePositionChangedNtf, &with_vane(5), false);
        assert!(command.is_successful());
        let update = command.update().unwrap();
        assert_eq!(update.node_id, 5);
        assert_eq!(update.state, ProductState::Executing);
        assert_eq!(update.target_position, ActuatorPosition(0x6400));
        assert!(update.functional_parameters.is_none());
    }

    #[test]
    fn test_house_status_keeps_parameters() {
        let mut command = GetHouseStatus::new();
        command.set_discard_functional_parameters(false);
        command.request_command_code();
        command.handle_response(Command::NodeStatePositionChangedNtf, &with_vane(5), false);
        assert_eq!(
            command.update().unwrap().functional_parameters,
            FunctionalParameters::set(0, 0x3000)
        );
    }

    #[test]
    fn test_house_status_truncated() {
        let mut command = GetHouseStatus::new();
        command.request_command_code();
        command.handle_response(Command::NodeStatePositionChangedNtf, &[0x05, 0x04], false);
        assert!(command.is_finished());
        assert!(!command.is_successful());
    }

    #[test]
    fn test_monitor_enable_and_disable() {
        let mut command = SetHouseStatusMonitor::new();
        assert_eq!(command.request_command_code(), Command::HouseStatusMonitorEnableReq);
        command.handle_response(Command::HouseStatusMonitorEnableCfm, &[], false);
        assert!(command.is_successful());

        command.set_enabled(false);
        assert_eq!(command.request_command_code(), Command::HouseStatusMonitorDisableReq);
        command.handle_response(Command::HouseStatusMonitorEnableCfm, &[], false);
        assert!(!command.is_finished());
        command.handle_response(Command::HouseStatusMonitorDisableCfm, &[], false);
        assert!(command.is_successful());
    }

    #[test]
    fn test_receive_only_never_finishes() {
        let mut command = ReceiveOnly::new();
        assert_eq!(command.request_command_code(), Command::ReceiveOnly);
        command.handle_response(Command::NodeStatePositionChangedNtf, &with_vane(1), false);
        assert!(!command.is_finished());
        assert_eq!(command.delivered(), 1);
    }
}
