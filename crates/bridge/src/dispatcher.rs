//! Command dispatch loop
//!
//! Exactly one command is in flight at a time: [`Dispatcher::execute`] holds
//! the session lock from the request until the command reached a terminal
//! state, the deadline expired or the transport failed.
//!
//! Frames that do not belong to the active command are handled here:
//!
//! - `GW_ERROR_NTF` ends the command, except "busy" which resends the request
//! - position change notifications are decoded and published to subscribers
//! - informational notifications and unknown codes are logged and dropped
//!
//! A receive-only pickup succeeds if at least one actuator update reached the
//! subscribers, even when a later frame was malformed or the transport failed.

use crate::commands::{BridgeCommand, CommandState, Outcome};
use crate::error::{BridgeError, Result};
use crate::transport::Transport;
use protocol::{
    ActuatorState, Command, CommandCategory, Envelope, GatewayErrorCode, ProtocolError,
    SessionCorrelator, decode_frame, encode_frame, envelope,
};
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, trace, warn};

/// Capacity of the actuator update channel
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Dispatch behaviour taken from the `[protocol]` configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Deadline for one command, from request to terminal answer
    pub command_timeout: Duration,
    /// Wait for the end of a session instead of trusting the confirmation
    pub sequential_mode: bool,
    /// Drop functional parameters from position change notifications
    pub discard_functional_parameters: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(60),
            sequential_mode: false,
            discard_functional_parameters: true,
        }
    }
}

/// Everything guarded by the session lock
struct Session<T> {
    transport: T,
    sessions: SessionCorrelator,
    authenticated: bool,
    last_error: Option<GatewayErrorCode>,
}

/// Runs commands against one gateway connection
pub struct Dispatcher<T> {
    session: Mutex<Session<T>>,
    settings: DispatchSettings,
    updates: broadcast::Sender<ActuatorState>,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T, settings: DispatchSettings) -> Self {
        Self::with_sessions(transport, settings, SessionCorrelator::new())
    }

    /// Use `sessions` to number session based requests
    pub fn with_sessions(transport: T, settings: DispatchSettings, sessions: SessionCorrelator) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            session: Mutex::new(Session {
                transport,
                sessions,
                authenticated: false,
                last_error: None,
            }),
            settings,
            updates,
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Receive every actuator update decoded from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ActuatorState> {
        self.updates.subscribe()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.lock().await.authenticated
    }

    pub async fn is_alive(&self) -> bool {
        self.session.lock().await.transport.is_alive().await
    }

    /// Run `command` and report whether it succeeded
    ///
    /// For receive-only commands the answer is whether an actuator update was
    /// delivered.
    pub async fn communicate(&self, command: &mut dyn BridgeCommand) -> bool {
        match self.execute(command).await {
            Ok(()) => true,
            Err(BridgeError::NoResponse) => {
                debug!("{}: nothing received", command.name());
                false
            }
            Err(e) => {
                warn!("{} failed: {}", command.name(), e);
                false
            }
        }
    }

    /// Run `command` to completion
    pub async fn execute(&self, command: &mut dyn BridgeCommand) -> Result<()> {
        let code = command.request_command_code();
        let mut session = self.session.lock().await;
        debug!("Dispatching {} as {}", command.name(), code);

        match code.category() {
            CommandCategory::Control => self.control(&mut session, command).await,
            CommandCategory::ReceiveOnly => self.receive(&mut session, command).await,
            CommandCategory::Request => self.request(&mut session, code, command).await,
        }
    }

    async fn control(&self, session: &mut Session<T>, command: &mut dyn BridgeCommand) -> Result<()> {
        info!("Closing gateway connection");
        session.transport.reset().await;
        session.authenticated = false;
        session.last_error = None;
        command.handle_response(Command::Close, &[], self.settings.sequential_mode);
        Self::conclude(session, command)
    }

    async fn receive(&self, session: &mut Session<T>, command: &mut dyn BridgeCommand) -> Result<()> {
        let deadline = Instant::now() + self.settings.command_timeout;
        let mut delivered = false;
        let mut failure = None;

        while !command.is_finished() {
            let Ok(read) = timeout_at(deadline, session.transport.read_frame()).await else {
                break;
            };
            let raw = match read {
                Ok(raw) => raw,
                Err(e) => {
                    failure = Some(transport_error(e));
                    break;
                }
            };
            if raw.is_empty() {
                break;
            }
            let (received, envelope) = match Self::open(&raw) {
                Ok(Some(opened)) => opened,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Dropping malformed frame: {}", e);
                    failure = Some(e);
                    break;
                }
            };

            match received {
                Command::NodeStatePositionChangedNtf => {
                    delivered |= self.publish(&envelope.payload);
                    command.handle_response(received, &envelope.payload, self.settings.sequential_mode);
                }
                Command::ErrorNtf => {
                    let error = GatewayErrorCode::from_payload(&envelope.payload);
                    warn!("Unsolicited gateway error: {}", error);
                    if error == GatewayErrorCode::NotAuthenticated {
                        session.authenticated = false;
                    }
                }
                other if other.is_ignorable() => debug!("Ignoring {}", other),
                other => {
                    command.handle_response(other, &envelope.payload, self.settings.sequential_mode)
                }
            }
        }

        if delivered {
            return Ok(());
        }
        match failure {
            Some(e) => Err(e),
            None => {
                trace!("Nothing received while idle");
                Err(BridgeError::NoResponse)
            }
        }
    }

    async fn request(
        &self,
        session: &mut Session<T>,
        code: Command,
        command: &mut dyn BridgeCommand,
    ) -> Result<()> {
        if command.requires_authentication() && !session.authenticated {
            warn!("{} needs a login first", command.name());
            return Err(BridgeError::NotAuthenticated);
        }

        let payload = command.build_request_payload(&mut session.sessions);
        let frame = encode_frame(&envelope::wrap(code.code(), &payload)?);
        let deadline = Instant::now() + self.settings.command_timeout;
        session.last_error = None;

        let mut send_pending = true;
        let mut responded = false;

        while !command.is_finished() {
            if send_pending {
                trace!("Sending {} ({} bytes)", code, payload.len());
                session.transport.write(&frame).await.map_err(transport_error)?;
                send_pending = false;
            }

            let raw = match timeout_at(deadline, session.transport.read_frame()).await {
                Ok(read) => read.map_err(transport_error)?,
                Err(_) => {
                    warn!(
                        "{} got no terminal answer within {:?}",
                        command.name(),
                        self.settings.command_timeout
                    );
                    return Err(match session.last_error {
                        Some(GatewayErrorCode::Busy) => BridgeError::GatewayBusy,
                        _ => BridgeError::Timeout(self.settings.command_timeout),
                    });
                }
            };

            if raw.is_empty() {
                if !responded {
                    warn!("Gateway did not answer {}", code);
                    return Err(BridgeError::NoResponse);
                }
                continue;
            }
            responded = true;

            let Some((received, envelope)) = Self::open(&raw)? else {
                continue;
            };

            match received {
                Command::ErrorNtf => {
                    let error = GatewayErrorCode::from_payload(&envelope.payload);
                    session.last_error = Some(error);
                    match error {
                        GatewayErrorCode::Busy => {
                            warn!("Gateway busy, sending {} again", code);
                            send_pending = true;
                        }
                        GatewayErrorCode::NotAuthenticated => {
                            warn!("Gateway dropped the login");
                            session.authenticated = false;
                            return Err(BridgeError::NotAuthenticated);
                        }
                        other => {
                            warn!("{} refused by gateway: {}", command.name(), other);
                            return Err(BridgeError::Gateway(other));
                        }
                    }
                }
                Command::NodeStatePositionChangedNtf => {
                    self.publish(&envelope.payload);
                }
                other if other.is_ignorable() => debug!("Ignoring {}", other),
                other => {
                    trace!("{} <- {}", command.name(), other);
                    command.handle_response(other, &envelope.payload, self.settings.sequential_mode);
                }
            }
        }

        Self::conclude(session, command)
    }

    /// Unframe and unwrap one frame; unknown codes yield `None`
    fn open(raw: &[u8]) -> Result<Option<(Command, Envelope)>> {
        let bytes = decode_frame(raw).map_err(ProtocolError::from)?;
        let envelope = envelope::unwrap(&bytes).map_err(ProtocolError::from)?;
        match Command::from_u16(envelope.command) {
            Some(command) => Ok(Some((command, envelope))),
            None => {
                warn!("{}, skipping", BridgeError::UnrecognizedCommand(envelope.command));
                Ok(None)
            }
        }
    }

    /// Decode a position change and hand it to subscribers; false if it did not decode
    fn publish(&self, payload: &[u8]) -> bool {
        match ActuatorState::decode_position_changed(payload) {
            Ok(update) => {
                let update = if self.settings.discard_functional_parameters {
                    update.without_functional_parameters()
                } else {
                    update
                };
                debug!(
                    "Node {} is {:?} at {}",
                    update.node_id, update.state, update.current_position
                );
                // Nobody listening is fine
                let _ = self.updates.send(update);
                true
            }
            Err(e) => {
                warn!("Dropping position change: {}", e);
                false
            }
        }
    }

    fn conclude(session: &mut Session<T>, command: &dyn BridgeCommand) -> Result<()> {
        match command.state() {
            CommandState::Done(Outcome::Success) => {
                if command.authenticates() {
                    info!("Logged in to gateway");
                    session.authenticated = true;
                }
                debug!("{} finished", command.name());
                Ok(())
            }
            CommandState::Done(Outcome::Failure(failure)) => {
                if command.authenticates() {
                    session.authenticated = false;
                }
                Err(BridgeError::from_failure(command.name(), failure.clone()))
            }
            _ => Err(BridgeError::NoResponse),
        }
    }
}

fn transport_error(err: ProtocolError) -> BridgeError {
    match err {
        ProtocolError::Io(e) => BridgeError::Transport(e),
        other => BridgeError::Protocol(other),
    }
}
