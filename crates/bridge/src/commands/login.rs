//! Authentication: password enter, password change and closing the session

use super::{BridgeCommand, CommandState, STATUS_OK};
use crate::error::CommandFailure;
use protocol::records::encode_name;
use protocol::{Command, SessionCorrelator};
use tracing::{debug, warn};

/// Size of the password field
pub const PASSWORD_SIZE: usize = 32;

/// `GW_PASSWORD_ENTER_REQ`
#[derive(Default)]
pub struct Login {
    password: Vec<u8>,
    state: CommandState,
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login")
            .field("password", &"<redacted>")
            .field("state", &self.state)
            .finish()
    }
}

impl Login {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the secret sent with the next request
    pub fn set_password(&mut self, password: &[u8]) -> Result<(), CommandFailure> {
        if password.len() > PASSWORD_SIZE {
            return Err(CommandFailure::InvalidParameter("password longer than 32 bytes"));
        }
        self.password = password.to_vec();
        Ok(())
    }
}

impl BridgeCommand for Login {
    fn name(&self) -> &'static str {
        "Login"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        Command::PasswordEnterReq
    }

    fn build_request_payload(&mut self, _sessions: &mut SessionCorrelator) -> Vec<u8> {
        encode_name(&self.password, PASSWORD_SIZE).unwrap_or_else(|| vec![0; PASSWORD_SIZE])
    }

    fn handle_response(&mut self, command: Command, payload: &[u8], _sequential_mode: bool) {
        match command {
            Command::PasswordEnterCfm => {
                if !self.state.require_length(payload, 1) {
                    return;
                }
                match payload[0] {
                    STATUS_OK => self.state.succeed(),
                    status => {
                        warn!("Gateway refused the password (status {})", status);
                        self.state.fail(CommandFailure::Rejected { status });
                    }
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

    fn authenticates(&self) -> bool {
        true
    }
}

/// `GW_PASSWORD_CHANGE_REQ`
#[derive(Default)]
pub struct ChangePassword {
    old_password: Vec<u8>,
    new_password: Vec<u8>,
    state: CommandState,
}

impl std::fmt::Debug for ChangePassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangePassword")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ChangePassword {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_passwords(&mut self, old: &[u8], new: &[u8]) -> Result<(), CommandFailure> {
        if old.len() > PASSWORD_SIZE || new.len() > PASSWORD_SIZE {
            return Err(CommandFailure::InvalidParameter("password longer than 32 bytes"));
        }
        self.old_password = old.to_vec();
        self.new_password = new.to_vec();
        Ok(())
    }
}

impl BridgeCommand for ChangePassword {
    fn name(&self) -> &'static str {
        "ChangePassword"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        Command::PasswordChangeReq
    }

    fn build_request_payload(&mut self, _sessions: &mut SessionCorrelator) -> Vec<u8> {
        let mut payload = Vec::with_capacity(2 * PASSWORD_SIZE);
        for password in [&self.old_password, &self.new_password] {
            payload.extend(encode_name(password, PASSWORD_SIZE).unwrap_or_else(|| vec![0; PASSWORD_SIZE]));
        }
        payload
    }

    fn handle_response(&mut self, command: Command, payload: &[u8], _sequential_mode: bool) {
        match command {
            Command::PasswordChangeCfm => {
                if !self.state.require_length(payload, 1) {
                    return;
                }
                match payload[0] {
                    STATUS_OK => self.state.succeed(),
                    status => self.state.fail(CommandFailure::Rejected { status }),
                }
            }
            other => debug!("{}: ignoring {}", self.name(), other),
        }
    }

    fn state(&self) -> &CommandState {
        &self.state
    }
}

/// Close the connection to the gateway
///
/// Dispatched in control mode: nothing is sent, the dispatcher resets the
/// transport and forgets the login.
#[derive(Debug, Default)]
pub struct Logout {
    state: CommandState,
}

impl Logout {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BridgeCommand for Logout {
    fn name(&self) -> &'static str {
        "Logout"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        Command::Close
    }

    fn build_request_payload(&mut self, _sessions: &mut SessionCorrelator) -> Vec<u8> {
        Vec::new()
    }

    fn handle_response(&mut self, command: Command, _payload: &[u8], _sequential_mode: bool) {
        if command == Command::Close {
            self.state.succeed();
        }
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

    #[test]
    fn test_login_payload_is_padded() {
        let mut login = Login::new();
        login.set_password(b"velux123").unwrap();
        login.request_command_code();
        let payload = login.build_request_payload(&mut SessionCorrelator::with_seed(0));
        assert_eq!(payload.len(), PASSWORD_SIZE);
        assert_eq!(&payload[..8], b"velux123");
        assert!(payload[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_login_rejects_long_password() {
        let mut login = Login::new();
        assert!(login.set_password(&[b'a'; 33]).is_err());
        assert!(login.set_password(&[b'a'; 32]).is_ok());
    }

    #[test]
    fn test_login_success_and_failure() {
        let mut login = Login::new();
        assert_eq!(login.request_command_code(), Command::PasswordEnterReq);
        login.handle_response(Command::PasswordEnterCfm, &[0x00], false);
        assert!(login.is_finished());
        assert!(login.is_successful());

        login.request_command_code();
        assert!(!login.is_finished());
        login.handle_response(Command::PasswordEnterCfm, &[0x01], false);
        assert!(login.is_finished());
        assert!(!login.is_successful());
        assert_eq!(
            login.state().failure(),
            Some(&CommandFailure::Rejected { status: 1 })
        );
    }

    #[test]
    fn test_login_empty_confirmation() {
        let mut login = Login::new();
        login.request_command_code();
        login.handle_response(Command::PasswordEnterCfm, &[], false);
        assert!(login.is_finished());
        assert!(!login.is_successful());
    }

    #[test]
    fn test_debug_hides_password() {
        let mut login = Login::new();
        login.set_password(b"secret").unwrap();
        assert!(!format!("{:?}", login).contains("secret"));
    }

    #[test]
    fn test_change_password_payload() {
        let mut change = ChangePassword::new();
        change.set_passwords(b"old", b"new").unwrap();
        change.request_command_code();
        let payload = change.build_request_payload(&mut SessionCorrelator::with_seed(0));
        assert_eq!(payload.len(), 2 * PASSWORD_SIZE);
        assert_eq!(&payload[..3], b"old");
        assert_eq!(&payload[PASSWORD_SIZE..PASSWORD_SIZE + 3], b"new");

        change.handle_response(Command::PasswordChangeCfm, &[0x00], false);
        assert!(change.is_successful());
    }

    #[test]
    fn test_logout_completes_on_close() {
        let mut logout = Logout::new();
        assert_eq!(logout.request_command_code(), Command::Close);
        assert!(!logout.requires_authentication());
        logout.handle_response(Command::Close, &[], false);
        assert!(logout.is_successful());
    }
}
