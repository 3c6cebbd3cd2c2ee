//! KLF 200 command codes
//!
//! Every envelope carries one of these 16-bit codes. Requests end in `_REQ`,
//! their synchronous answers in `_CFM` and asynchronous follow-ups in `_NTF`.
//! Two codes at the top of the range are engine-local: they select a dispatch
//! mode and are never written to the gateway.

use serde::{Deserialize, Serialize};

/// Gateway command codes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    ErrorNtf = 0x0000,
    GetVersionReq = 0x0008,
    GetVersionCfm = 0x0009,
    GetStateReq = 0x000C,
    GetStateCfm = 0x000D,
    GetNetworkSetupReq = 0x00E0,
    GetNetworkSetupCfm = 0x00E1,
    CsSystemTableUpdateNtf = 0x0112,
    GetNodeInformationReq = 0x0200,
    GetNodeInformationCfm = 0x0201,
    GetAllNodesInformationReq = 0x0202,
    GetAllNodesInformationCfm = 0x0203,
    GetAllNodesInformationNtf = 0x0204,
    GetAllNodesInformationFinishedNtf = 0x0205,
    NodeInformationChangedNtf = 0x020C,
    GetNodeInformationNtf = 0x0210,
    NodeStatePositionChangedNtf = 0x0211,
    HouseStatusMonitorEnableReq = 0x0240,
    HouseStatusMonitorEnableCfm = 0x0241,
    HouseStatusMonitorDisableReq = 0x0242,
    HouseStatusMonitorDisableCfm = 0x0243,
    CommandSendReq = 0x0300,
    CommandSendCfm = 0x0301,
    CommandRunStatusNtf = 0x0302,
    CommandRemainingTimeNtf = 0x0303,
    SessionFinishedNtf = 0x0304,
    StatusRequestReq = 0x0305,
    StatusRequestCfm = 0x0306,
    StatusRequestNtf = 0x0307,
    SetLimitationReq = 0x0310,
    SetLimitationCfm = 0x0311,
    GetLimitationStatusReq = 0x0312,
    GetLimitationStatusCfm = 0x0313,
    LimitationStatusNtf = 0x0314,
    GetSceneListReq = 0x040C,
    GetSceneListCfm = 0x040D,
    GetSceneListNtf = 0x040E,
    ActivateSceneReq = 0x0412,
    ActivateSceneCfm = 0x0413,
    SceneInformationChangedNtf = 0x0419,
    ActivationLogUpdatedNtf = 0x0506,
    SetUtcReq = 0x2000,
    SetUtcCfm = 0x2001,
    PasswordEnterReq = 0x3000,
    PasswordEnterCfm = 0x3001,
    PasswordChangeReq = 0x3002,
    PasswordChangeCfm = 0x3003,
    PasswordChangeNtf = 0x3004,
    /// Engine-local: wait for unsolicited notifications
    ReceiveOnly = 0xFFFE,
    /// Engine-local: close the transport
    Close = 0xFFFF,
}

/// How the dispatcher treats a requested command code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandCategory {
    /// Build a payload and send it
    Request,
    /// Send nothing, pick up whatever the gateway reports
    ReceiveOnly,
    /// Act on the transport itself
    Control,
}

impl Command {
    pub fn from_u16(value: u16) -> Option<Self> {
        let command = match value {
            0x0000 => Self::ErrorNtf,
            0x0008 => Self::GetVersionReq,
            0x0009 => Self::GetVersionCfm,
            0x000C => Self::GetStateReq,
            0x000D => Self::GetStateCfm,
            0x00E0 => Self::GetNetworkSetupReq,
            0x00E1 => Self::GetNetworkSetupCfm,
            0x0112 => Self::CsSystemTableUpdateNtf,
            0x0200 => Self::GetNodeInformationReq,
            0x0201 => Self::GetNodeInformationCfm,
            0x0202 => Self::GetAllNodesInformationReq,
            0x0203 => Self::GetAllNodesInformationCfm,
            0x0204 => Self::GetAllNodesInformationNtf,
            0x0205 => Self::GetAllNodesInformationFinishedNtf,
            0x020C => Self::NodeInformationChangedNtf,
            0x0210 => Self::GetNodeInformationNtf,
            0x0211 => Self::NodeStatePositionChangedNtf,
            0x0240 => Self::HouseStatusMonitorEnableReq,
            0x0241 => Self::HouseStatusMonitorEnableCfm,
            0x0242 => Self::HouseStatusMonitorDisableReq,
            0x0243 => Self::HouseStatusMonitorDisableCfm,
            0x0300 => Self::CommandSendReq,
            0x0301 => Self::CommandSendCfm,
            0x0302 => Self::CommandRunStatusNtf,
            0x0303 => Self::CommandRemainingTimeNtf,
            0x0304 => Self::SessionFinishedNtf,
            0x0305 => Self::StatusRequestReq,
            0x0306 => Self::StatusRequestCfm,
            0x0307 => Self::StatusRequestNtf,
            0x0310 => Self::SetLimitationReq,
            0x0311 => Self::SetLimitationCfm,
            0x0312 => Self::GetLimitationStatusReq,
            0x0313 => Self::GetLimitationStatusCfm,
            0x0314 => Self::LimitationStatusNtf,
            0x040C => Self::GetSceneListReq,
            0x040D => Self::GetSceneListCfm,
            0x040E => Self::GetSceneListNtf,
            0x0412 => Self::ActivateSceneReq,
            0x0413 => Self::ActivateSceneCfm,
            0x0419 => Self::SceneInformationChangedNtf,
            0x0506 => Self::ActivationLogUpdatedNtf,
            0x2000 => Self::SetUtcReq,
            0x2001 => Self::SetUtcCfm,
            0x3000 => Self::PasswordEnterReq,
            0x3001 => Self::PasswordEnterCfm,
            0x3002 => Self::PasswordChangeReq,
            0x3003 => Self::PasswordChangeCfm,
            0x3004 => Self::PasswordChangeNtf,
            0xFFFE => Self::ReceiveOnly,
            0xFFFF => Self::Close,
            _ => return None,
        };
        Some(command)
    }

    pub fn code(self) -> u16 {
        self as u16
    }

    /// Mnemonic as used in the KLF 200 API documentation
    pub fn name(self) -> &'static str {
        match self {
            Self::ErrorNtf => "GW_ERROR_NTF",
            Self::GetVersionReq => "GW_GET_VERSION_REQ",
            Self::GetVersionCfm => "GW_GET_VERSION_CFM",
            Self::GetStateReq => "GW_GET_STATE_REQ",
            Self::GetStateCfm => "GW_GET_STATE_CFM",
            Self::GetNetworkSetupReq => "GW_GET_NETWORK_SETUP_REQ",
            Self::GetNetworkSetupCfm => "GW_GET_NETWORK_SETUP_CFM",
            Self::CsSystemTableUpdateNtf => "GW_CS_SYSTEM_TABLE_UPDATE_NTF",
            Self::GetNodeInformationReq => "GW_GET_NODE_INFORMATION_REQ",
            Self::GetNodeInformationCfm => "GW_GET_NODE_INFORMATION_CFM",
            Self::GetAllNodesInformationReq => "GW_GET_ALL_NODES_INFORMATION_REQ",
            Self::GetAllNodesInformationCfm => "GW_GET_ALL_NODES_INFORMATION_CFM",
            Self::GetAllNodesInformationNtf => "GW_GET_ALL_NODES_INFORMATION_NTF",
            Self::GetAllNodesInformationFinishedNtf => "GW_GET_ALL_NODES_INFORMATION_FINISHED_NTF",
            Self::NodeInformationChangedNtf => "GW_NODE_INFORMATION_CHANGED_NTF",
            Self::GetNodeInformationNtf => "GW_GET_NODE_INFORMATION_NTF",
            Self::NodeStatePositionChangedNtf => "GW_NODE_STATE_POSITION_CHANGED_NTF",
            Self::HouseStatusMonitorEnableReq => "GW_HOUSE_STATUS_MONITOR_ENABLE_REQ",
            Self::HouseStatusMonitorEnableCfm => "GW_HOUSE_STATUS_MONITOR_ENABLE_CFM",
            Self::HouseStatusMonitorDisableReq => "GW_HOUSE_STATUS_MONITOR_DISABLE_REQ",
            Self::HouseStatusMonitorDisableCfm => "GW_HOUSE_STATUS_MONITOR_DISABLE_CFM",
            Self::CommandSendReq => "GW_COMMAND_SEND_REQ",
            Self::CommandSendCfm => "GW_COMMAND_SEND_CFM",
            Self::CommandRunStatusNtf => "GW_COMMAND_RUN_STATUS_NTF",
            Self::CommandRemainingTimeNtf => "GW_COMMAND_REMAINING_TIME_NTF",
            Self::SessionFinishedNtf => "GW_SESSION_FINISHED_NTF",
            Self::StatusRequestReq => "GW_STATUS_REQUEST_REQ",
            Self::StatusRequestCfm => "GW_STATUS_REQUEST_CFM",
            Self::StatusRequestNtf => "GW_STATUS_REQUEST_NTF",
            Self::SetLimitationReq => "GW_SET_LIMITATION_REQ",
            Self::SetLimitationCfm => "GW_SET_LIMITATION_CFM",
            Self::GetLimitationStatusReq => "GW_GET_LIMITATION_STATUS_REQ",
            Self::GetLimitationStatusCfm => "GW_GET_LIMITATION_STATUS_CFM",
            Self::LimitationStatusNtf => "GW_LIMITATION_STATUS_NTF",
            Self::GetSceneListReq => "GW_GET_SCENE_LIST_REQ",
            Self::GetSceneListCfm => "GW_GET_SCENE_LIST_CFM",
            Self::GetSceneListNtf => "GW_GET_SCENE_LIST_NTF",
            Self::ActivateSceneReq => "GW_ACTIVATE_SCENE_REQ",
            Self::ActivateSceneCfm => "GW_ACTIVATE_SCENE_CFM",
            Self::SceneInformationChangedNtf => "GW_SCENE_INFORMATION_CHANGED_NTF",
            Self::ActivationLogUpdatedNtf => "GW_ACTIVATION_LOG_UPDATED_NTF",
            Self::SetUtcReq => "GW_SET_UTC_REQ",
            Self::SetUtcCfm => "GW_SET_UTC_CFM",
            Self::PasswordEnterReq => "GW_PASSWORD_ENTER_REQ",
            Self::PasswordEnterCfm => "GW_PASSWORD_ENTER_CFM",
            Self::PasswordChangeReq => "GW_PASSWORD_CHANGE_REQ",
            Self::PasswordChangeCfm => "GW_PASSWORD_CHANGE_CFM",
            Self::PasswordChangeNtf => "GW_PASSWORD_CHANGE_NTF",
            Self::ReceiveOnly => "RECEIVE_ONLY",
            Self::Close => "CLOSE",
        }
    }

    pub fn category(self) -> CommandCategory {
        match self {
            Self::ReceiveOnly => CommandCategory::ReceiveOnly,
            Self::Close => CommandCategory::Control,
            _ => CommandCategory::Request,
        }
    }

    /// Asynchronous notifications that never concern the active command
    pub fn is_ignorable(self) -> bool {
        matches!(
            self,
            Self::NodeInformationChangedNtf
                | Self::CsSystemTableUpdateNtf
                | Self::SceneInformationChangedNtf
                | Self::ActivationLogUpdatedNtf
                | Self::PasswordChangeNtf
                | Self::CommandRemainingTimeNtf
        )
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:#06x})", self.name(), self.code())
    }
}

/// Human readable name for a raw code, including unknown ones
pub fn command_name(code: u16) -> String {
    match Command::from_u16(code) {
        Some(command) => command.name().to_string(),
        None => format!("UNKNOWN({:#06x})", code),
    }
}
