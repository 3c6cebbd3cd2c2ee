use super::Transport;
use protocol::{Result, decode_frame, encode_frame, envelope};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::trace;

/// One scripted reaction of the fake gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Deliver this stuffed frame
    Frame(Vec<u8>),
    /// Let the idle timeout expire
    Idle,
    /// Never answer
    Hang,
}

#[derive(Debug, Default)]
struct Script {
    steps: VecDeque<ScriptStep>,
    written: Vec<Vec<u8>>,
    connected: bool,
    resets: usize,
}

/// In-memory gateway replaying a script
///
/// Clones share the same script, so a test can keep a handle after moving the
/// transport into a dispatcher. An exhausted script behaves like a quiet
/// gateway.
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
    idle_timeout: Duration,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::with_idle_timeout(Duration::from_millis(100))
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            idle_timeout,
        }
    }

    pub async fn push(&self, step: ScriptStep) {
        self.script.lock().await.steps.push_back(step);
    }

    /// Queue a frame for `command` carrying `payload`
    pub async fn push_frame(&self, command: u16, payload: &[u8]) -> Result<()> {
        let frame = encode_frame(&envelope::wrap(command, payload)?);
        self.push(ScriptStep::Frame(frame)).await;
        Ok(())
    }

    pub async fn push_idle(&self) {
        self.push(ScriptStep::Idle).await;
    }

    pub async fn push_hang(&self) {
        self.push(ScriptStep::Hang).await;
    }

    /// Frames written so far, still stuffed
    pub async fn written(&self) -> Vec<Vec<u8>> {
        self.script.lock().await.written.clone()
    }

    /// Command codes of the frames written so far
    pub async fn sent_commands(&self) -> Vec<u16> {
        self.script
            .lock()
            .await
            .written
            .iter()
            .filter_map(|frame| decode_frame(frame).ok())
            .filter_map(|bytes| envelope::unwrap(&bytes).ok())
            .map(|envelope| envelope.command)
            .collect()
    }

    /// Steps not consumed yet
    pub async fn remaining(&self) -> usize {
        self.script.lock().await.steps.len()
    }

    pub async fn resets(&self) -> usize {
        self.script.lock().await.resets
    }
}

impl Transport for ScriptedTransport {
    async fn write(&mut self, frame: &[u8]) -> Result<()> {
        let mut script = self.script.lock().await;
        script.connected = true;
        script.written.push(frame.to_vec());
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Vec<u8>> {
        // The lock must not be held while waiting
        let step = self.script.lock().await.steps.pop_front();
        match step {
            Some(ScriptStep::Frame(frame)) => {
                trace!("Scripted frame of {} bytes", frame.len());
                Ok(frame)
            }
            Some(ScriptStep::Hang) => std::future::pending().await,
            Some(ScriptStep::Idle) | None => {
                tokio::time::sleep(self.idle_timeout).await;
                Ok(Vec::new())
            }
        }
    }

    async fn is_alive(&self) -> bool {
        self.script.lock().await.connected
    }

    async fn reset(&mut self) {
        let mut script = self.script.lock().await;
        script.connected = false;
        script.resets += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_script_replays_in_order() {
        let mut transport = ScriptedTransport::new();
        let handle = transport.clone();
        handle.push_frame(0x3001, &[0x00]).await.unwrap();
        handle.push_idle().await;

        transport.write(&encode_frame(&envelope::wrap(0x3000, &[0; 32]).unwrap())).await.unwrap();
        assert!(transport.is_alive().await);
        assert_eq!(handle.sent_commands().await, vec![0x3000]);

        let frame = transport.read_frame().await.unwrap();
        let received = envelope::unwrap(&decode_frame(&frame).unwrap()).unwrap();
        assert_eq!(received.command, 0x3001);

        assert!(transport.read_frame().await.unwrap().is_empty());
        assert!(transport.read_frame().await.unwrap().is_empty());
        assert_eq!(handle.remaining().await, 0);

        transport.reset().await;
        assert!(!transport.is_alive().await);
        assert_eq!(handle.resets().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hang_never_completes() {
        let mut transport = ScriptedTransport::new();
        transport.push_hang().await;
        let result = tokio::time::timeout(Duration::from_secs(30), transport.read_frame()).await;
        assert!(result.is_err());
    }
}
