//! High level operations on one gateway
//!
//! [`Bridge`] owns one instance of every command in a [`CommandTable`]. A
//! caller can take an instance, set its parameters, hand it to
//! [`Bridge::execute`] and read the typed results from it afterwards; the
//! convenience methods do exactly that and copy the result out. Instances are
//! re-armed on every dispatch, so the table never grows.

use crate::commands::{
    BridgeCommand, ChangePassword, GetDeviceStatus, GetFirmware, GetHouseStatus, GetLanConfig,
    GetLimitation, GetProduct, GetProductStatus, GetProducts, GetScenes, LimitationType, Login,
    Logout, ReceiveOnly, RunProductCommand, RunScene, SetHouseStatusMonitor, SetLimitation, SetUtc,
};
use crate::dispatcher::{DispatchSettings, Dispatcher};
use crate::error::{BridgeError, Result};
use crate::transport::Transport;
use protocol::{
    ActuatorPosition, ActuatorState, FirmwareVersion, FunctionalParameters, GatewayState,
    LanConfig, NodeInformation, SceneInfo,
};
use tokio::sync::{Mutex, broadcast};

/// One reusable command instance per operation
///
/// Each instance sits behind its own lock so two tasks cannot interleave
/// parameters and results of the same operation.
#[derive(Debug, Default)]
pub struct CommandTable {
    login: Mutex<Login>,
    change_password: Mutex<ChangePassword>,
    logout: Mutex<Logout>,
    get_products: Mutex<GetProducts>,
    get_product: Mutex<GetProduct>,
    get_product_status: Mutex<GetProductStatus>,
    run_product: Mutex<RunProductCommand>,
    get_scenes: Mutex<GetScenes>,
    run_scene: Mutex<RunScene>,
    get_firmware: Mutex<GetFirmware>,
    get_device_status: Mutex<GetDeviceStatus>,
    get_lan_config: Mutex<GetLanConfig>,
    set_utc: Mutex<SetUtc>,
    set_house_status_monitor: Mutex<SetHouseStatusMonitor>,
    get_house_status: Mutex<GetHouseStatus>,
    receive_only: Mutex<ReceiveOnly>,
    get_limitation: Mutex<GetLimitation>,
    set_limitation: Mutex<SetLimitation>,
}

impl CommandTable {
    pub fn login(&self) -> &Mutex<Login> {
        &self.login
    }

    pub fn change_password(&self) -> &Mutex<ChangePassword> {
        &self.change_password
    }

    pub fn logout(&self) -> &Mutex<Logout> {
        &self.logout
    }

    pub fn get_products(&self) -> &Mutex<GetProducts> {
        &self.get_products
    }

    pub fn get_product(&self) -> &Mutex<GetProduct> {
        &self.get_product
    }

    pub fn get_product_status(&self) -> &Mutex<GetProductStatus> {
        &self.get_product_status
    }

    pub fn run_product(&self) -> &Mutex<RunProductCommand> {
        &self.run_product
    }

    pub fn get_scenes(&self) -> &Mutex<GetScenes> {
        &self.get_scenes
    }

    pub fn run_scene(&self) -> &Mutex<RunScene> {
        &self.run_scene
    }

    pub fn get_firmware(&self) -> &Mutex<GetFirmware> {
        &self.get_firmware
    }

    pub fn get_device_status(&self) -> &Mutex<GetDeviceStatus> {
        &self.get_device_status
    }

    pub fn get_lan_config(&self) -> &Mutex<GetLanConfig> {
        &self.get_lan_config
    }

    pub fn set_utc(&self) -> &Mutex<SetUtc> {
        &self.set_utc
    }

    pub fn set_house_status_monitor(&self) -> &Mutex<SetHouseStatusMonitor> {
        &self.set_house_status_monitor
    }

    pub fn get_house_status(&self) -> &Mutex<GetHouseStatus> {
        &self.get_house_status
    }

    pub fn receive_only(&self) -> &Mutex<ReceiveOnly> {
        &self.receive_only
    }

    pub fn get_limitation(&self) -> &Mutex<GetLimitation> {
        &self.get_limitation
    }

    pub fn set_limitation(&self) -> &Mutex<SetLimitation> {
        &self.set_limitation
    }
}

/// Typed access to the gateway
///
/// Calls from several tasks are serialized by the dispatcher.
pub struct Bridge<T> {
    dispatcher: Dispatcher<T>,
    commands: CommandTable,
}

impl<T: Transport> Bridge<T> {
    pub fn new(transport: T, settings: DispatchSettings) -> Self {
        Self::from_dispatcher(Dispatcher::new(transport, settings))
    }

    pub fn from_dispatcher(dispatcher: Dispatcher<T>) -> Self {
        let mut commands = CommandTable::default();
        commands
            .get_house_status
            .get_mut()
            .set_discard_functional_parameters(dispatcher.settings().discard_functional_parameters);
        Self {
            dispatcher,
            commands,
        }
    }

    /// Whether node information keeps its functional parameters
    pub fn set_discard_product_functional_parameters(&mut self, discard: bool) {
        self.commands
            .get_product
            .get_mut()
            .set_discard_functional_parameters(discard);
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Run a command taken from [`Bridge::commands`] (or any other instance)
    pub async fn execute(&self, command: &mut dyn BridgeCommand) -> Result<()> {
        self.dispatcher.execute(command).await
    }

    /// Actuator updates seen by any command
    pub fn subscribe(&self) -> broadcast::Receiver<ActuatorState> {
        self.dispatcher.subscribe()
    }

    pub async fn login(&self, password: &[u8]) -> Result<()> {
        let mut command = self.commands.login.lock().await;
        command
            .set_password(password)
            .map_err(|reason| BridgeError::Rejected {
                command: "Login",
                reason,
            })?;
        self.dispatcher.execute(&mut *command).await
    }

    pub async fn logout(&self) -> Result<()> {
        let mut command = self.commands.logout.lock().await;
        self.dispatcher.execute(&mut *command).await
    }

    pub async fn change_password(&self, old: &[u8], new: &[u8]) -> Result<()> {
        let mut command = self.commands.change_password.lock().await;
        command
            .set_passwords(old, new)
            .map_err(|reason| BridgeError::Rejected {
                command: "ChangePassword",
                reason,
            })?;
        self.dispatcher.execute(&mut *command).await
    }

    pub async fn products(&self) -> Result<Vec<NodeInformation>> {
        let mut command = self.commands.get_products.lock().await;
        self.dispatcher.execute(&mut *command).await?;
        Ok(command.products().to_vec())
    }

    pub async fn product(&self, node_id: u8) -> Result<NodeInformation> {
        let mut command = self.commands.get_product.lock().await;
        command.set_node(node_id);
        self.dispatcher.execute(&mut *command).await?;
        command.product().cloned().ok_or(BridgeError::NoResponse)
    }

    pub async fn product_status(&self, node_id: u8) -> Result<ActuatorState> {
        let mut command = self.commands.get_product_status.lock().await;
        command.set_node(node_id);
        self.dispatcher.execute(&mut *command).await?;
        command.status().cloned().ok_or(BridgeError::NoResponse)
    }

    /// Move `node_id` to `position`; returns the state it is expected to report
    pub async fn move_product(
        &self,
        node_id: u8,
        position: ActuatorPosition,
        functional_parameters: Option<FunctionalParameters>,
    ) -> Result<ActuatorState> {
        let mut command = self.commands.run_product.lock().await;
        command.set_node_and_parameters(node_id, position, functional_parameters);
        self.dispatcher.execute(&mut *command).await?;
        Ok(command.requested_state())
    }

    pub async fn scenes(&self) -> Result<Vec<SceneInfo>> {
        let mut command = self.commands.get_scenes.lock().await;
        self.dispatcher.execute(&mut *command).await?;
        Ok(command.scenes().to_vec())
    }

    pub async fn run_scene(&self, scene_id: u8, velocity: u8) -> Result<()> {
        let mut command = self.commands.run_scene.lock().await;
        command.set_scene(scene_id);
        command.set_velocity(velocity);
        self.dispatcher.execute(&mut *command).await
    }

    pub async fn firmware(&self) -> Result<FirmwareVersion> {
        let mut command = self.commands.get_firmware.lock().await;
        self.dispatcher.execute(&mut *command).await?;
        command.version().copied().ok_or(BridgeError::NoResponse)
    }

    pub async fn device_status(&self) -> Result<GatewayState> {
        let mut command = self.commands.get_device_status.lock().await;
        self.dispatcher.execute(&mut *command).await?;
        command.gateway_state().copied().ok_or(BridgeError::NoResponse)
    }

    pub async fn lan_config(&self) -> Result<LanConfig> {
        let mut command = self.commands.get_lan_config.lock().await;
        self.dispatcher.execute(&mut *command).await?;
        command.lan_config().copied().ok_or(BridgeError::NoResponse)
    }

    /// Set the gateway clock to the current time
    pub async fn sync_clock(&self) -> Result<()> {
        let mut command = self.commands.set_utc.lock().await;
        command.use_current_time();
        self.dispatcher.execute(&mut *command).await
    }

    pub async fn set_house_status_monitor(&self, enable: bool) -> Result<()> {
        let mut command = self.commands.set_house_status_monitor.lock().await;
        command.set_enabled(enable);
        self.dispatcher.execute(&mut *command).await
    }

    /// Wait for the next position change of any actuator
    pub async fn next_update(&self) -> Result<ActuatorState> {
        let mut command = self.commands.get_house_status.lock().await;
        self.dispatcher.execute(&mut *command).await?;
        command.update().cloned().ok_or(BridgeError::NoResponse)
    }

    /// Pick up pending notifications; true if an actuator update was published
    pub async fn poll(&self) -> bool {
        let mut command = self.commands.receive_only.lock().await;
        self.dispatcher.communicate(&mut *command).await
    }

    pub async fn limitation(
        &self,
        node_id: u8,
        parameter_id: u8,
        limitation_type: LimitationType,
    ) -> Result<ActuatorPosition> {
        let mut command = self.commands.get_limitation.lock().await;
        command.set_actuator(node_id, parameter_id, limitation_type);
        self.dispatcher.execute(&mut *command).await?;
        command.value().ok_or(BridgeError::NoResponse)
    }

    pub async fn set_limitation(
        &self,
        node_id: u8,
        parameter_id: u8,
        min: ActuatorPosition,
        max: ActuatorPosition,
        limitation_time: u8,
    ) -> Result<()> {
        let mut command = self.commands.set_limitation.lock().await;
        command.set_limitation(node_id, parameter_id, min, max, limitation_time);
        self.dispatcher.execute(&mut *command).await
    }
}
