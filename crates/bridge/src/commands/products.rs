//! Actuator enumeration and status retrieval

use super::run::follow_session;
use super::{BridgeCommand, CommandState, STATUS_ACCEPTED, STATUS_OK, index_array, session_of};
use crate::error::CommandFailure;
use protocol::{
    ActuatorState, Command, NodeInformation, SessionCorrelator, StatusNotification,
};
use tracing::{debug, warn};

/// Enumerate all actuators (`GW_GET_ALL_NODES_INFORMATION_REQ`)
///
/// The confirmation announces how many nodes follow; each node arrives in its
/// own notification.
#[derive(Debug, Default)]
pub struct GetProducts {
    expected: usize,
    products: Vec<NodeInformation>,
    state: CommandState,
}

impl GetProducts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes received during the last dispatch
    pub fn products(&self) -> &[NodeInformation] {
        &self.products
    }

    fn handle_confirmation(&mut self, payload: &[u8]) {
        if !self.state.require_length(payload, 2) {
            return;
        }
        if payload[0] != STATUS_OK {
            self.state.fail(CommandFailure::Rejected { status: payload[0] });
            return;
        }
        self.expected = payload[1] as usize;
        debug!("Gateway reports {} nodes", self.expected);
        if self.expected == 0 {
            self.state.succeed();
        } else {
            self.state.await_notifications();
        }
    }

    fn handle_node(&mut self, payload: &[u8]) {
        match NodeInformation::decode(payload) {
            Ok(node) => {
                debug!("Node {} '{}' received", node.node_id, node.name);
                self.products.push(node);
                let received = self.state.record_notification();
                if self.expected > 0 && received >= self.expected {
                    self.state.succeed();
                }
            }
            Err(e) => self.state.fail(e.into()),
        }
    }
}

impl BridgeCommand for GetProducts {
    fn name(&self) -> &'static str {
        "GetProducts"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        self.expected = 0;
        self.products.clear();
        Command::GetAllNodesInformationReq
    }

    fn build_request_payload(&mut self, _sessions: &mut SessionCorrelator) -> Vec<u8> {
        Vec::new()
    }

    fn handle_response(&mut self, command: Command, payload: &[u8], _sequential_mode: bool) {
        match command {
            Command::GetAllNodesInformationCfm => self.handle_confirmation(payload),
            Command::GetAllNodesInformationNtf => self.handle_node(payload),
            Command::GetAllNodesInformationFinishedNtf => {
                if self.products.len() < self.expected {
                    warn!(
                        "Node enumeration finished after {} of {} nodes",
                        self.products.len(),
                        self.expected
                    );
                }
                self.state.succeed();
            }
            other => debug!("{}: ignoring {}", self.name(), other),
        }
    }

    fn state(&self) -> &CommandState {
        &self.state
    }
}

/// Information about one actuator (`GW_GET_NODE_INFORMATION_REQ`)
#[derive(Debug)]
pub struct GetProduct {
    node_id: u8,
    discard_functional_parameters: bool,
    product: Option<NodeInformation>,
    state: CommandState,
}

impl Default for GetProduct {
    fn default() -> Self {
        Self {
            node_id: 0,
            discard_functional_parameters: true,
            product: None,
            state: CommandState::default(),
        }
    }
}

impl GetProduct {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_node(&mut self, node_id: u8) {
        self.node_id = node_id;
    }

    /// Drop the functional parameters from the answer
    ///
    /// Some third-party actuators report garbage there.
    pub fn set_discard_functional_parameters(&mut self, discard: bool) {
        self.discard_functional_parameters = discard;
    }

    pub fn product(&self) -> Option<&NodeInformation> {
        self.product.as_ref()
    }
}

impl BridgeCommand for GetProduct {
    fn name(&self) -> &'static str {
        "GetProduct"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        self.product = None;
        Command::GetNodeInformationReq
    }

    fn build_request_payload(&mut self, _sessions: &mut SessionCorrelator) -> Vec<u8> {
        vec![self.node_id]
    }

    fn handle_response(&mut self, command: Command, payload: &[u8], _sequential_mode: bool) {
        match command {
            Command::GetNodeInformationCfm => {
                if !self.state.require_length(payload, 2) {
                    return;
                }
                if payload[0] != STATUS_OK {
                    self.state.fail(CommandFailure::Rejected { status: payload[0] });
                } else if payload[1] != self.node_id {
                    self.state.fail(CommandFailure::NodeMismatch {
                        expected: self.node_id,
                        received: payload[1],
                    });
                } else {
                    self.state.await_notifications();
                }
            }
            Command::GetNodeInformationNtf => match NodeInformation::decode(payload) {
                Ok(node) if node.node_id != self.node_id => {
                    self.state.fail(CommandFailure::NodeMismatch {
                        expected: self.node_id,
                        received: node.node_id,
                    });
                }
                Ok(mut node) => {
                    if self.discard_functional_parameters {
                        node.functional_parameters = None;
                    }
                    self.product = Some(node);
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

/// Current position and functional parameters of one actuator (`GW_STATUS_REQUEST_REQ`)
#[derive(Debug, Default)]
pub struct GetProductStatus {
    node_id: u8,
    session_id: u16,
    status: Option<ActuatorState>,
    state: CommandState,
}

impl GetProductStatus {
    /// Ask for the current position
    const STATUS_TYPE_CURRENT_POSITION: u8 = 0x01;
    /// FPI1 requesting FP1..FP4
    const ALL_FUNCTIONAL_PARAMETERS: u8 = 0xF0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_node(&mut self, node_id: u8) {
        self.node_id = node_id;
    }

    pub fn session_id(&self) -> u16 {
        self.session_id
    }

    pub fn status(&self) -> Option<&ActuatorState> {
        self.status.as_ref()
    }
}

impl BridgeCommand for GetProductStatus {
    fn name(&self) -> &'static str {
        "GetProductStatus"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        self.status = None;
        Command::StatusRequestReq
    }

    fn build_request_payload(&mut self, sessions: &mut SessionCorrelator) -> Vec<u8> {
        self.session_id = sessions.next_id();
        let mut payload = Vec::with_capacity(26);
        payload.extend_from_slice(&self.session_id.to_be_bytes());
        payload.push(1);
        payload.extend_from_slice(&index_array(&[self.node_id]));
        payload.push(Self::STATUS_TYPE_CURRENT_POSITION);
        payload.push(Self::ALL_FUNCTIONAL_PARAMETERS);
        payload.push(0x00);
        payload
    }

    fn handle_response(&mut self, command: Command, payload: &[u8], sequential_mode: bool) {
        match command {
            Command::StatusRequestCfm => {
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
            Command::StatusRequestNtf => {
                let status = match StatusNotification::decode(payload) {
                    Ok(status) => status,
                    Err(e) => {
                        self.state.fail(e.into());
                        return;
                    }
                };
                if status.session_id != self.session_id {
                    warn!(
                        "{}: ignoring status for session {:#06x}, expected {:#06x}",
                        self.name(),
                        status.session_id,
                        self.session_id
                    );
                    return;
                }
                if status.node_id != self.node_id {
                    debug!("{}: ignoring status for node {}", self.name(), status.node_id);
                    return;
                }
                self.status = Some(status.actuator_state());
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

#[cfg(test)]
mod tests {
    use super::*;
    use common::test_utils::{bytes_from_hex, create_mock_node_payload};
    use protocol::{ActuatorPosition, ProductState};

    fn node(id: u8) -> Vec<u8> {
        create_mock_node_payload(id, "Window", 0x05, ActuatorPosition(0x4600), ActuatorPosition(0x4600))
    }

    #[test]
    fn test_get_products_collects_nodes() {
        let mut command = GetProducts::new();
        assert_eq!(command.request_command_code(), Command::GetAllNodesInformationReq);

        command.handle_response(Command::GetAllNodesInformationCfm, &[0x00, 0x02], false);
        assert_eq!(command.state(), &CommandState::AwaitingNotification { received: 0 });

        command.handle_response(Command::GetAllNodesInformationNtf, &node(0), false);
        assert!(!command.is_finished());
        command.handle_response(Command::GetAllNodesInformationNtf, &node(1), false);
        assert!(command.is_successful());
        assert_eq!(command.products().len(), 2);
    }

    #[test]
    fn test_get_products_empty_table() {
        let mut command = GetProducts::new();
        command.request_command_code();
        command.handle_response(Command::GetAllNodesInformationCfm, &[0x00, 0x00], false);
        assert!(command.is_successful());
        assert!(command.products().is_empty());
    }

    #[test]
    fn test_get_products_finished_notification() {
        let mut command = GetProducts::new();
        command.request_command_code();
        command.handle_response(Command::GetAllNodesInformationCfm, &[0x00, 0x03], false);
        command.handle_response(Command::GetAllNodesInformationNtf, &node(0), false);
        command.handle_response(Command::GetAllNodesInformationFinishedNtf, &[], false);
        assert!(command.is_successful());
        assert_eq!(command.products().len(), 1);
    }

    #[test]
    fn test_get_products_short_node_fails() {
        let mut command = GetProducts::new();
        command.request_command_code();
        command.handle_response(Command::GetAllNodesInformationCfm, &[0x00, 0x01], false);
        command.handle_response(Command::GetAllNodesInformationNtf, &[0x00; 40], false);
        assert!(command.is_finished());
        assert!(matches!(
            command.state().failure(),
            Some(CommandFailure::PayloadLength { needed: 124, available: 40 })
        ));
    }

    #[test]
    fn test_get_products_rearm_clears_results() {
        let mut command = GetProducts::new();
        command.request_command_code();
        command.handle_response(Command::GetAllNodesInformationCfm, &[0x00, 0x01], false);
        command.handle_response(Command::GetAllNodesInformationNtf, &node(4), false);
        assert_eq!(command.products().len(), 1);

        command.request_command_code();
        assert!(command.products().is_empty());
        assert!(!command.is_finished());
    }

    #[test]
    fn test_get_product_discards_functional_parameters() {
        let mut payload = node(6);
        payload[89..91].copy_from_slice(&[0x12, 0x34]);

        let mut command = GetProduct::new();
        command.set_node(6);
        command.request_command_code();
        command.handle_response(Command::GetNodeInformationCfm, &[0x00, 0x06], false);
        command.handle_response(Command::GetNodeInformationNtf, &payload, false);
        assert!(command.is_successful());
        assert!(command.product().unwrap().functional_parameters.is_none());

        command.set_discard_functional_parameters(false);
        command.request_command_code();
        command.handle_response(Command::GetNodeInformationNtf, &payload, false);
        let params = command.product().unwrap().functional_parameters.unwrap();
        assert_eq!(params.get(0), Some(0x1234));
    }

    #[test]
    fn test_get_product_wrong_node() {
        let mut command = GetProduct::new();
        command.set_node(2);
        command.request_command_code();
        command.handle_response(Command::GetNodeInformationNtf, &node(3), false);
        assert_eq!(
            command.state().failure(),
            Some(&CommandFailure::NodeMismatch { expected: 2, received: 3 })
        );
    }

    #[test]
    fn test_get_product_status() {
        let mut command = GetProductStatus::new();
        command.set_node(6);
        command.request_command_code();
        let request = command.build_request_payload(&mut SessionCorrelator::with_seed(0x00D8));
        assert_eq!(request.len(), 26);
        assert_eq!(&request[..4], &[0x00, 0xD8, 0x01, 0x06]);

        command.handle_response(Command::StatusRequestCfm, &[0x00, 0xD8, 0x01], false);
        assert!(!command.is_finished());

        let mut ntf = bytes_from_hex("00 D8 01 06 00 01 01 02 00 C8 00 03 63 4F").unwrap();
        ntf.resize(59, 0);
        command.handle_response(Command::StatusRequestNtf, &ntf, false);
        assert!(command.is_successful());

        let status = command.status().unwrap();
        assert_eq!(status.state, ProductState::Done);
        assert_eq!(status.current_position, ActuatorPosition(0xC800));
        assert_eq!(status.functional_parameters.unwrap().get(2), Some(0x634F));
    }

    #[test]
    fn test_get_product_status_sequential_waits_for_session_end() {
        let mut command = GetProductStatus::new();
        command.set_node(6);
        command.request_command_code();
        command.build_request_payload(&mut SessionCorrelator::with_seed(0x0031));
        command.handle_response(Command::StatusRequestCfm, &[0x00, 0x31, 0x01], true);

        let mut ntf = bytes_from_hex("00 31 01 06 00 01 01 01 00 C8 00").unwrap();
        ntf.resize(59, 0);
        command.handle_response(Command::StatusRequestNtf, &ntf, true);
        assert!(!command.is_finished());
        assert!(command.status().is_some());

        command.handle_response(Command::SessionFinishedNtf, &[0x00, 0x30], true);
        assert!(!command.is_finished());

        command.handle_response(Command::SessionFinishedNtf, &[0x00, 0x31], true);
        assert!(command.is_successful());
        assert_eq!(command.status().unwrap().current_position, ActuatorPosition(0xC800));
    }

    #[test]
    fn test_get_product_status_confirmation_session_mismatch() {
        let mut command = GetProductStatus::new();
        command.set_node(6);
        command.request_command_code();
        command.build_request_payload(&mut SessionCorrelator::with_seed(0x0010));
        command.handle_response(Command::StatusRequestCfm, &[0x00, 0x11, 0x01], false);
        assert!(command.is_finished());
        assert!(!command.is_successful());
        assert_eq!(
            command.state().failure(),
            Some(&CommandFailure::SessionMismatch { expected: 0x0010, received: 0x0011 })
        );
    }

    #[test]
    fn test_get_product_status_ignores_foreign_notification() {
        let mut command = GetProductStatus::new();
        command.set_node(6);
        command.request_command_code();
        command.build_request_payload(&mut SessionCorrelator::with_seed(0x0020));

        let mut ntf = bytes_from_hex("00 1F 01 06 00 01 01 01 00 C8 00").unwrap();
        ntf.resize(59, 0);
        command.handle_response(Command::StatusRequestNtf, &ntf, false);
        assert!(!command.is_finished());
        assert!(command.status().is_none());
    }
}
