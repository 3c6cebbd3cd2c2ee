//! Decoded gateway records
//!
//! Fixed-layout structures carried inside confirmations and notifications.
//! Every decoder checks the payload length first and fails with a
//! [`RecordError`] instead of reading past the end.

use crate::error::RecordError;
use crate::params::FunctionalParameters;
use crate::position::{ActuatorPosition, POSITION_IGNORE, ProductState};
use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

type Result<T> = std::result::Result<T, RecordError>;

/// Length of a node or scene name field
pub const NAME_SIZE: usize = 64;

/// Decode a NUL-terminated name field
pub fn decode_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Encode `text` into a NUL-padded field of `size` bytes
///
/// Returns `None` if the text does not fit.
pub fn encode_name(text: &[u8], size: usize) -> Option<Vec<u8>> {
    if text.len() > size {
        return None;
    }
    let mut field = vec![0u8; size];
    field[..text.len()].copy_from_slice(text);
    Some(field)
}

/// Current state of one actuator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorState {
    pub node_id: u8,
    pub state: ProductState,
    pub current_position: ActuatorPosition,
    pub target_position: ActuatorPosition,
    pub functional_parameters: Option<FunctionalParameters>,
    /// Seconds until the actuator reaches its target
    pub remaining_time: u16,
    /// UNIX time of the last change, as reported by the gateway
    pub timestamp: u32,
}

impl ActuatorState {
    /// Size of a `GW_NODE_STATE_POSITION_CHANGED_NTF` payload
    pub const POSITION_CHANGED_SIZE: usize = 20;

    /// Decode a `GW_NODE_STATE_POSITION_CHANGED_NTF` payload
    pub fn decode_position_changed(payload: &[u8]) -> Result<Self> {
        RecordError::check("position change", payload, Self::POSITION_CHANGED_SIZE)?;
        Ok(Self {
            node_id: payload[0],
            state: ProductState::from_u8(payload[1]),
            current_position: ActuatorPosition(BigEndian::read_u16(&payload[2..])),
            target_position: ActuatorPosition(BigEndian::read_u16(&payload[4..])),
            functional_parameters: FunctionalParameters::read_positional(payload, 6),
            remaining_time: BigEndian::read_u16(&payload[14..]),
            timestamp: BigEndian::read_u32(&payload[16..]),
        })
    }

    /// Drop the functional parameter block
    pub fn without_functional_parameters(mut self) -> Self {
        self.functional_parameters = None;
        self
    }
}

/// Static and dynamic information about one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInformation {
    pub node_id: u8,
    pub order: u16,
    pub placement: u8,
    pub name: String,
    pub velocity: u8,
    /// Actuator type in the upper ten bits, subtype in the lower six
    pub node_type_subtype: u16,
    pub product_group: u8,
    pub product_type: u8,
    pub node_variation: u8,
    pub power_mode: u8,
    pub build_number: u8,
    pub serial_number: [u8; 8],
    pub state: ProductState,
    pub current_position: ActuatorPosition,
    pub target_position: ActuatorPosition,
    pub functional_parameters: Option<FunctionalParameters>,
    pub remaining_time: u16,
    pub timestamp: u32,
    /// Alias (type, value) pairs
    pub aliases: Vec<(u16, u16)>,
}

impl NodeInformation {
    /// Size of a node information notification payload
    pub const SIZE: usize = 124;

    const MAX_ALIASES: usize = 5;

    /// Decode a `GW_GET_NODE_INFORMATION_NTF` or `GW_GET_ALL_NODES_INFORMATION_NTF` payload
    pub fn decode(payload: &[u8]) -> Result<Self> {
        RecordError::check("node information", payload, Self::SIZE)?;

        let mut serial_number = [0u8; 8];
        serial_number.copy_from_slice(&payload[76..84]);

        let alias_count = (payload[103] as usize).min(Self::MAX_ALIASES);
        let aliases = (0..alias_count)
            .map(|i| {
                let offset = 104 + 4 * i;
                (
                    BigEndian::read_u16(&payload[offset..]),
                    BigEndian::read_u16(&payload[offset + 2..]),
                )
            })
            .collect();

        Ok(Self {
            node_id: payload[0],
            order: BigEndian::read_u16(&payload[1..]),
            placement: payload[3],
            name: decode_name(&payload[4..4 + NAME_SIZE]),
            velocity: payload[68],
            node_type_subtype: BigEndian::read_u16(&payload[69..]),
            product_group: payload[71],
            product_type: payload[72],
            node_variation: payload[73],
            power_mode: payload[74],
            build_number: payload[75],
            serial_number,
            state: ProductState::from_u8(payload[84]),
            current_position: ActuatorPosition(BigEndian::read_u16(&payload[85..])),
            target_position: ActuatorPosition(BigEndian::read_u16(&payload[87..])),
            functional_parameters: FunctionalParameters::read_positional(payload, 89),
            remaining_time: BigEndian::read_u16(&payload[97..]),
            timestamp: BigEndian::read_u32(&payload[99..]),
            aliases,
        })
    }

    pub fn actuator_type(&self) -> u16 {
        self.node_type_subtype >> 6
    }

    pub fn actuator_subtype(&self) -> u8 {
        (self.node_type_subtype & 0x3F) as u8
    }

    /// The dynamic part of the record
    pub fn actuator_state(&self) -> ActuatorState {
        ActuatorState {
            node_id: self.node_id,
            state: self.state,
            current_position: self.current_position,
            target_position: self.target_position,
            functional_parameters: self.functional_parameters,
            remaining_time: self.remaining_time,
            timestamp: self.timestamp,
        }
    }
}

/// Progress of a command session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Completed,
    Failed,
    Active,
    Other(u8),
}

impl RunStatus {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Completed,
            1 => Self::Failed,
            2 => Self::Active,
            other => Self::Other(other),
        }
    }
}

/// `GW_COMMAND_RUN_STATUS_NTF`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatusNotification {
    pub session_id: u16,
    pub status_owner: u8,
    pub node_id: u8,
    pub parameter_id: u8,
    pub value: u16,
    pub run_status: RunStatus,
    pub status_reply: u8,
    pub information_code: u32,
}

impl RunStatusNotification {
    pub const SIZE: usize = 13;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        RecordError::check("run status", payload, Self::SIZE)?;
        Ok(Self {
            session_id: BigEndian::read_u16(payload),
            status_owner: payload[2],
            node_id: payload[3],
            parameter_id: payload[4],
            value: BigEndian::read_u16(&payload[5..]),
            run_status: RunStatus::from_u8(payload[7]),
            status_reply: payload[8],
            information_code: BigEndian::read_u32(&payload[9..]),
        })
    }
}

/// `GW_STATUS_REQUEST_NTF` carrying indexed parameter records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNotification {
    pub session_id: u16,
    pub status_id: u8,
    pub node_id: u8,
    pub run_status: RunStatus,
    pub status_reply: u8,
    pub status_type: u8,
    pub main_parameter: ActuatorPosition,
    pub functional_parameters: Option<FunctionalParameters>,
}

impl StatusNotification {
    /// Fixed header in front of the parameter records
    pub const HEADER_SIZE: usize = 8;

    /// Status reply meaning "no further information"
    const REPLY_UNKNOWN: u8 = 0;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        RecordError::check("status", payload, Self::HEADER_SIZE)?;
        let count = payload[7] as usize;

        let mut main_parameter = ActuatorPosition::UNKNOWN;
        for record in payload[Self::HEADER_SIZE..].chunks_exact(3).take(count) {
            if record[0] == 0 {
                main_parameter = ActuatorPosition(BigEndian::read_u16(&record[1..]));
            }
        }

        Ok(Self {
            session_id: BigEndian::read_u16(payload),
            status_id: payload[2],
            node_id: payload[3],
            run_status: RunStatus::from_u8(payload[4]),
            status_reply: payload[5],
            status_type: payload[6],
            main_parameter,
            functional_parameters: FunctionalParameters::read_indexed_records(
                payload,
                Self::HEADER_SIZE,
                count,
            ),
        })
    }

    /// Execution state implied by the run status
    pub fn product_state(&self) -> ProductState {
        match self.run_status {
            RunStatus::Completed => ProductState::Done,
            RunStatus::Active => ProductState::Executing,
            RunStatus::Failed if self.status_reply == Self::REPLY_UNKNOWN => ProductState::Unknown,
            RunStatus::Failed => ProductState::Error,
            RunStatus::Other(_) => ProductState::Unknown,
        }
    }

    /// Actuator state with the main parameter as current position
    pub fn actuator_state(&self) -> ActuatorState {
        ActuatorState {
            node_id: self.node_id,
            state: self.product_state(),
            current_position: self.main_parameter,
            target_position: ActuatorPosition(POSITION_IGNORE),
            functional_parameters: self.functional_parameters,
            remaining_time: 0,
            timestamp: 0,
        }
    }
}

/// One scene from the scene list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub id: u8,
    pub name: String,
}

/// `GW_GET_SCENE_LIST_NTF`: a batch of scenes plus the number still to come
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneListNotification {
    pub scenes: Vec<SceneInfo>,
    pub remaining: u8,
}

impl SceneListNotification {
    const ENTRY_SIZE: usize = 1 + NAME_SIZE;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        RecordError::check("scene list", payload, 1)?;
        let count = payload[0] as usize;
        let needed = 1 + count * Self::ENTRY_SIZE + 1;
        RecordError::check("scene list", payload, needed)?;

        let scenes = payload[1..needed - 1]
            .chunks_exact(Self::ENTRY_SIZE)
            .map(|entry| SceneInfo {
                id: entry[0],
                name: decode_name(&entry[1..]),
            })
            .collect();

        Ok(Self {
            scenes,
            remaining: payload[needed - 1],
        })
    }
}

/// Gateway software and hardware versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub software: [u8; 6],
    pub hardware: u8,
    pub product_group: u8,
    pub product_type: u8,
}

impl FirmwareVersion {
    pub const SIZE: usize = 9;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        RecordError::check("firmware version", payload, Self::SIZE)?;
        let mut software = [0u8; 6];
        software.copy_from_slice(&payload[..6]);
        Ok(Self {
            software,
            hardware: payload[6],
            product_group: payload[7],
            product_type: payload[8],
        })
    }
}

impl std::fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.software.iter().map(u8::to_string).collect();
        write!(f, "{} (hardware {})", parts.join("."), self.hardware)
    }
}

/// Operating state of the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayState {
    pub state: u8,
    pub sub_state: u8,
}

impl GatewayState {
    pub const SIZE: usize = 2;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        RecordError::check("gateway state", payload, Self::SIZE)?;
        Ok(Self {
            state: payload[0],
            sub_state: payload[1],
        })
    }

    pub fn description(&self) -> &'static str {
        match self.state {
            0 => "test mode",
            1 => "gateway mode, no actuator nodes",
            2 => "gateway mode, with actuator nodes",
            3 => "beacon mode, not configured",
            4 => "beacon mode, configured",
            _ => "unknown state",
        }
    }

    /// Sub state while a configuration service or command is running
    pub fn is_busy(&self) -> bool {
        self.sub_state != 0
    }
}

/// LAN settings of the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanConfig {
    pub ip_address: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    pub default_gateway: Ipv4Addr,
    pub dhcp: bool,
}

impl LanConfig {
    pub const SIZE: usize = 13;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        RecordError::check("network setup", payload, Self::SIZE)?;
        let address = |offset: usize| Ipv4Addr::from(BigEndian::read_u32(&payload[offset..]));
        Ok(Self {
            ip_address: address(0),
            subnet_mask: address(4),
            default_gateway: address(8),
            dhcp: payload[12] != 0,
        })
    }
}

/// `GW_LIMITATION_STATUS_NTF`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitationStatus {
    pub session_id: u16,
    pub node_id: u8,
    pub parameter_id: u8,
    pub min_value: ActuatorPosition,
    pub max_value: ActuatorPosition,
    pub originator: u8,
    pub limitation_time: u8,
}

impl LimitationStatus {
    pub const SIZE: usize = 10;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        RecordError::check("limitation status", payload, Self::SIZE)?;
        Ok(Self {
            session_id: BigEndian::read_u16(payload),
            node_id: payload[2],
            parameter_id: payload[3],
            min_value: ActuatorPosition(BigEndian::read_u16(&payload[4..])),
            max_value: ActuatorPosition(BigEndian::read_u16(&payload[6..])),
            originator: payload[8],
            limitation_time: payload[9],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::UNKNOWN_VALUE;

    fn hex(text: &str) -> Vec<u8> {
        text.split_whitespace()
            .map(|b| u8::from_str_radix(b, 16).unwrap())
            .collect()
    }

    const SHED_WINDOW: &str = "00 00 00 00 53 68 65 64 20 57 69 6E 64 6F 77 00 00 00 00 00 00 00 00 00 00 00 00 00 \
        00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 \
        00 00 00 00 00 00 00 00 01 01 01 03 07 00 01 16 56 24 5C 26 14 19 00 FC 05 46 00 46 00 F7 FF F7 \
        FF F7 FF F7 FF 00 00 4F 05 B3 5F 01 D8 03 B2 1C 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00";

    #[test]
    fn test_decode_node_information() {
        let payload = hex(SHED_WINDOW);
        assert_eq!(payload.len(), NodeInformation::SIZE);

        let node = NodeInformation::decode(&payload).unwrap();
        assert_eq!(node.node_id, 0);
        assert_eq!(node.name, "Shed Window");
        assert_eq!(node.node_type_subtype, 0x0101);
        assert_eq!(node.actuator_type(), 4);
        assert_eq!(node.actuator_subtype(), 1);
        assert_eq!(node.state, ProductState::Done);
        assert_eq!(node.current_position, ActuatorPosition(0x4600));
        assert_eq!(node.target_position, ActuatorPosition(0x4600));
        assert_eq!(node.functional_parameters, None);
        assert_eq!(node.timestamp, 0x4F05_B35F);
        assert_eq!(node.aliases, vec![(0xD803, 0xB21C)]);
    }

    #[test]
    fn test_decode_node_information_too_short() {
        let payload = hex(SHED_WINDOW);
        let err = NodeInformation::decode(&payload[..100]).unwrap_err();
        assert_eq!(err.needed, NodeInformation::SIZE);
        assert_eq!(err.available, 100);
    }

    #[test]
    fn test_decode_position_changed() {
        let payload = hex("06 2D C8 00 B8 00 F7 FF F7 FF 00 00 F7 FF 00 00 4A E5 00 00");
        let state = ActuatorState::decode_position_changed(&payload).unwrap();
        assert_eq!(state.node_id, 6);
        assert_eq!(state.state, ProductState::Done);
        assert_eq!(state.current_position, ActuatorPosition(0xC800));
        assert_eq!(state.target_position, ActuatorPosition(0xB800));
        let params = state.functional_parameters.unwrap();
        assert_eq!(params.values(), [UNKNOWN_VALUE, UNKNOWN_VALUE, 0, UNKNOWN_VALUE]);
        assert_eq!(state.timestamp, 0x4AE5_0000);

        let stripped = state.without_functional_parameters();
        assert!(stripped.functional_parameters.is_none());
    }

    #[test]
    fn test_decode_status_notification() {
        let mut payload = hex("00 D8 01 06 00 01 01 02 00 C8 00 03 63 4F");
        payload.resize(59, 0);
        let status = StatusNotification::decode(&payload).unwrap();
        assert_eq!(status.session_id, 0x00D8);
        assert_eq!(status.node_id, 6);
        assert_eq!(status.run_status, RunStatus::Completed);
        assert_eq!(status.main_parameter, ActuatorPosition(0xC800));
        assert_eq!(status.functional_parameters.unwrap().get(2), Some(0x634F));

        let state = status.actuator_state();
        assert_eq!(state.state, ProductState::Done);
        assert_eq!(state.target_position, ActuatorPosition(POSITION_IGNORE));
    }

    #[test]
    fn test_status_failed_without_reply_is_unknown() {
        let mut payload = hex("0F A3 01 06 01 00 01 02 00 9A 36 03 00 00");
        payload.resize(59, 0);
        let status = StatusNotification::decode(&payload).unwrap();
        assert_eq!(status.run_status, RunStatus::Failed);
        assert_eq!(status.product_state(), ProductState::Unknown);
    }

    #[test]
    fn test_decode_run_status() {
        let payload = hex("12 34 01 06 00 C8 00 02 00 00 00 00 00");
        let ntf = RunStatusNotification::decode(&payload).unwrap();
        assert_eq!(ntf.session_id, 0x1234);
        assert_eq!(ntf.node_id, 6);
        assert_eq!(ntf.run_status, RunStatus::Active);
        assert!(RunStatusNotification::decode(&payload[..5]).is_err());
    }

    #[test]
    fn test_decode_scene_list() {
        let mut payload = vec![2];
        for (id, name) in [(1u8, "Morning"), (4, "Night")] {
            payload.push(id);
            payload.extend(encode_name(name.as_bytes(), NAME_SIZE).unwrap());
        }
        payload.push(0);

        let ntf = SceneListNotification::decode(&payload).unwrap();
        assert_eq!(ntf.remaining, 0);
        assert_eq!(ntf.scenes.len(), 2);
        assert_eq!(ntf.scenes[1], SceneInfo { id: 4, name: "Night".into() });

        assert!(SceneListNotification::decode(&payload[..40]).is_err());
    }

    #[test]
    fn test_decode_firmware_version() {
        let version = FirmwareVersion::decode(&[0, 2, 0, 0, 71, 0, 5, 14, 3]).unwrap();
        assert_eq!(version.to_string(), "0.2.0.0.71.0 (hardware 5)");
        assert_eq!(version.product_group, 14);
    }

    #[test]
    fn test_decode_lan_config() {
        let config = LanConfig::decode(&hex("C0 A8 01 0A FF FF FF 00 C0 A8 01 01 01")).unwrap();
        assert_eq!(config.ip_address, Ipv4Addr::new(192, 168, 1, 10));
        assert_eq!(config.subnet_mask, Ipv4Addr::new(255, 255, 255, 0));
        assert!(config.dhcp);
    }

    #[test]
    fn test_encode_name() {
        let field = encode_name(b"velux123", 32).unwrap();
        assert_eq!(field.len(), 32);
        assert_eq!(decode_name(&field), "velux123");
        assert!(encode_name(&[b'x'; 33], 32).is_none());
    }

    #[test]
    fn test_decode_limitation_status() {
        let status = LimitationStatus::decode(&hex("00 07 03 00 00 00 C8 00 01 FD")).unwrap();
        assert_eq!(status.session_id, 7);
        assert_eq!(status.node_id, 3);
        assert_eq!(status.max_value, ActuatorPosition(0xC800));
        assert_eq!(status.limitation_time, 0xFD);
    }
}
