use super::{BridgeCommand, CommandState};
use protocol::{Command, SceneInfo, SceneListNotification, SessionCorrelator};
use tracing::debug;

/// List the scenes stored in the gateway (`GW_GET_SCENE_LIST_REQ`)
///
/// Scenes arrive in batches; the last batch reports zero remaining.
#[derive(Debug, Default)]
pub struct GetScenes {
    total: usize,
    scenes: Vec<SceneInfo>,
    state: CommandState,
}

impl GetScenes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scenes(&self) -> &[SceneInfo] {
        &self.scenes
    }

    /// Number of scenes announced by the confirmation
    pub fn total(&self) -> usize {
        self.total
    }
}

impl BridgeCommand for GetScenes {
    fn name(&self) -> &'static str {
        "GetScenes"
    }

    fn request_command_code(&mut self) -> Command {
        self.state.arm();
        self.total = 0;
        self.scenes.clear();
        Command::GetSceneListReq
    }

    fn build_request_payload(&mut self, _sessions: &mut SessionCorrelator) -> Vec<u8> {
        Vec::new()
    }

    fn handle_response(&mut self, command: Command, payload: &[u8], _sequential_mode: bool) {
        match command {
            Command::GetSceneListCfm => {
                if !self.state.require_length(payload, 1) {
                    return;
                }
                self.total = payload[0] as usize;
                if self.total == 0 {
                    self.state.succeed();
                } else {
                    self.state.await_notifications();
                }
            }
            Command::GetSceneListNtf => match SceneListNotification::decode(payload) {
                Ok(batch) => {
                    self.state.record_notification();
                    self.scenes.extend(batch.scenes);
                    debug!("{} scenes so far, {} remaining", self.scenes.len(), batch.remaining);
                    if batch.remaining == 0 {
                        self.state.succeed();
                    }
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
