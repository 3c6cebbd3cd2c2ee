//! Queries and settings of the gateway itself

use super::{BridgeCommand, CommandState};
use protocol::{Command, FirmwareVersion, GatewayState, LanConfig, SessionCorrelator};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Software and hardware versions (`GW_GET_VERSION_REQ`)
#[derive(Debug, Default)]
pub struct GetFirmware {
    version: Option<FirmwareVersion>,
    state: CommandState,
}

impl GetFirmware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> Option<&FirmwareVersion> {
        self.version.as_ref()
    }
}

impl BridgeCommand for GetFirmware {
    fn name(&self) -> &'static str {
        "GetFirmware"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        self.version = None;
        Command::GetVersionReq
    }

    fn build_request_payload(&mut self, _sessions: &mut SessionCorrelator) -> Vec<u8> {
        Vec::new()
    }

    fn handle_response(&mut self, command: Command, payload: &[u8], _sequential_mode: bool) {
        match command {
            Command::GetVersionCfm => match FirmwareVersion::decode(payload) {
                Ok(version) => {
                    debug!("Gateway firmware {}", version);
                    self.version = Some(version);
                    self.state.succeed();
                }
                Err(e) => self.state.fail(e.into()),
            },
            other => debug!("{}: ignoring {}", self.name(), other),
        }
    }

    fn state(&self) -> &CommandState {
        &self.state
    }
}

/// Gateway operating state (`GW_GET_STATE_REQ`), also used as a ping
#[derive(Debug, Default)]
pub struct GetDeviceStatus {
    gateway_state: Option<GatewayState>,
    state: CommandState,
}

impl GetDeviceStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gateway_state(&self) -> Option<&GatewayState> {
        self.gateway_state.as_ref()
    }
}

impl BridgeCommand for GetDeviceStatus {
    fn name(&self) -> &'static str {
        "GetDeviceStatus"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        self.gateway_state = None;
        Command::GetStateReq
    }

    fn build_request_payload(&mut self, _sessions: &mut SessionCorrelator) -> Vec<u8> {
        Vec::new()
    }

    fn handle_response(&mut self, command: Command, payload: &[u8], _sequential_mode: bool) {
        match command {
            Command::GetStateCfm => match GatewayState::decode(payload) {
                Ok(state) => {
                    self.gateway_state = Some(state);
                    self.state.succeed();
                }
                Err(e) => self.state.fail(e.into()),
            },
            other => debug!("{}: ignoring {}", self.name(), other),
        }
    }

    fn state(&self) -> &CommandState {
        &self.state
    }
}

/// LAN settings (`GW_GET_NETWORK_SETUP_REQ`)
#[derive(Debug, Default)]
pub struct GetLanConfig {
    config: Option<LanConfig>,
    state: CommandState,
}

impl GetLanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lan_config(&self) -> Option<&LanConfig> {
        self.config.as_ref()
    }
}

impl BridgeCommand for GetLanConfig {
    fn name(&self) -> &'static str {
        "GetLanConfig"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        self.config = None;
        Command::GetNetworkSetupReq
    }

    fn build_request_payload(&mut self, _sessions: &mut SessionCorrelator) -> Vec<u8> {
        Vec::new()
    }

    fn handle_response(&mut self, command: Command, payload: &[u8], _sequential_mode: bool) {
        match command {
            Command::GetNetworkSetupCfm => match LanConfig::decode(payload) {
                Ok(config) => {
                    self.config = Some(config);
                    self.state.succeed();
                }
                Err(e) => self.state.fail(e.into()),
            },
            other => debug!("{}: ignoring {}", self.name(), other),
        }
    }

    fn state(&self) -> &CommandState {
        &self.state
    }
}

/// Set the gateway clock (`GW_SET_UTC_REQ`)
#[derive(Debug, Default)]
pub struct SetUtc {
    timestamp: Option<u32>,
    state: CommandState,
}

impl SetUtc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `timestamp` (UNIX seconds) instead of the time at dispatch
    pub fn set_timestamp(&mut self, timestamp: u32) {
        self.timestamp = Some(timestamp);
    }

    /// Send the time at dispatch again
    pub fn use_current_time(&mut self) {
        self.timestamp = None;
    }

    fn now() -> u32 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as u32)
            .unwrap_or(0)
    }
}

impl BridgeCommand for SetUtc {
    fn name(&self) -> &'static str {
        "SetUtc"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        Command::SetUtcReq
    }

    fn build_request_payload(&mut self, _sessions: &mut SessionCorrelator) -> Vec<u8> {
        self.timestamp.unwrap_or_else(Self::now).to_be_bytes().to_vec()
    }

    fn handle_response(&mut self, command: Command, _payload: &[u8], _sequential_mode: bool) {
        match command {
            Command::SetUtcCfm => self.state.succeed(),
            other => debug!("{}: ignoring {}", self.name(), other),
        }
    }

    fn state(&self) -> &CommandState {
        &self.state
    }
}
