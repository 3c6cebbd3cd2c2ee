//! klf-bridge command line client
//!
//! Logs in to a Velux KLF 200 gateway, runs one operation and prints the
//! result as JSON.

use anyhow::{Context, Result, anyhow};
use bridge::config::{self, BridgeConfig};
use bridge::{Bridge, TcpTransport};
use clap::{Parser, Subcommand};
use common::setup_logging;
use protocol::ActuatorPosition;
use serde::Serialize;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "klf-bridge")]
#[command(author, version, about = "Control Velux KLF 200 gateways")]
#[command(long_about = "
Talks to a Velux KLF 200 gateway over its TCP API: lists actuators and
scenes, moves actuators, activates scenes and follows position changes.

EXAMPLES:
    # List all actuators
    KLF_PASSWORD=velux123 klf-bridge --host 192.168.1.50 products

    # Move actuator 3 to 40 %
    klf-bridge --password velux123 move 3 40

    # Follow position changes until Ctrl+C
    klf-bridge monitor

    # Write the effective configuration
    klf-bridge --host 192.168.1.50 save-config

CONFIGURATION:
    The bridge looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/klf-bridge/bridge.toml
    3. /etc/klf-bridge/bridge.toml
    4. Built-in defaults

    The password is never stored in the configuration file.

TRANSPORT:
    klf-bridge speaks plain TCP. A stock KLF 200 only accepts TLS on port
    51200, so point --host/--port at a TLS-terminating proxy (for example
    stunnel or socat) in front of the gateway.
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Gateway host name or address
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Gateway API port
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Gateway password
    #[arg(long, env = "KLF_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Wait for every session to finish before returning
    #[arg(long)]
    sequential: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// List all actuators
    Products,
    /// List stored scenes
    Scenes,
    /// Show the gateway firmware version
    Firmware,
    /// Show the gateway state, or the status of one actuator
    Status {
        /// Node id of the actuator
        node: Option<u8>,
    },
    /// Move an actuator
    Move {
        node: u8,
        /// Target position, 0 (open) to 100 (closed)
        percent: u8,
        /// Count 0 as closed instead
        #[arg(long)]
        inverted: bool,
    },
    /// Activate a scene
    Scene {
        id: u8,
        /// Velocity (0 default, 1 silent, 2 fast)
        #[arg(long, default_value_t = 0)]
        velocity: u8,
    },
    /// Print position changes until Ctrl+C
    Monitor,
    /// Save the effective configuration and exit
    SaveConfig {
        /// Target file instead of the default location
        #[arg(value_name = "PATH")]
        path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = if let Some(ref path) = args.config {
        config::load_config(path).context("Failed to load configuration")?
    } else {
        BridgeConfig::load_or_default()
    };
    if let Some(ref host) = args.host {
        config.bridge.host = host.clone();
    }
    if let Some(port) = args.port {
        config.bridge.port = port;
    }
    if args.sequential {
        config.protocol.sequential_mode = true;
    }

    if let CliCommand::SaveConfig { ref path } = args.command {
        let path = path
            .as_deref()
            .map(config::expand_path)
            .unwrap_or_else(BridgeConfig::default_path);
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let log_level = args.log_level.as_deref().unwrap_or(&config.bridge.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("klf-bridge v{}", env!("CARGO_PKG_VERSION"));

    let password = args
        .password
        .as_deref()
        .ok_or_else(|| anyhow!("No password given, use --password or KLF_PASSWORD"))?;

    let transport = TcpTransport::new(
        config.address(),
        config.connect_timeout(),
        config.idle_read_timeout(),
    );
    let mut bridge = Bridge::new(transport, config.dispatch_settings());
    bridge.set_discard_product_functional_parameters(
        config.protocol.discard_product_functional_parameters,
    );

    bridge
        .login(password.as_bytes())
        .await
        .with_context(|| format!("Failed to log in to {}", config.address()))?;

    let result = run(&bridge, args.command).await;

    if let Err(e) = bridge.logout().await {
        warn!("Logout failed: {}", e);
    }
    result
}

async fn run(bridge: &Bridge<TcpTransport>, command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Products => {
            let products = bridge.products().await.context("Failed to list actuators")?;
            print_json(&products)
        }
        CliCommand::Scenes => {
            let scenes = bridge.scenes().await.context("Failed to list scenes")?;
            print_json(&scenes)
        }
        CliCommand::Firmware => {
            let version = bridge.firmware().await.context("Failed to read firmware version")?;
            println!("{}", version);
            Ok(())
        }
        CliCommand::Status { node: Some(node) } => {
            let status = bridge
                .product_status(node)
                .await
                .with_context(|| format!("Failed to read status of node {}", node))?;
            print_json(&status)
        }
        CliCommand::Status { node: None } => {
            let state = bridge.device_status().await.context("Failed to read gateway state")?;
            let lan = bridge.lan_config().await.context("Failed to read network setup")?;
            print_json(&serde_json::json!({
                "state": state,
                "description": state.description(),
                "network": lan,
            }))
        }
        CliCommand::Move {
            node,
            percent,
            inverted,
        } => {
            if percent > 100 {
                return Err(anyhow!("Position must be between 0 and 100, got {}", percent));
            }
            let position = ActuatorPosition::from_percent(percent, inverted);
            let expected = bridge
                .move_product(node, position, None)
                .await
                .with_context(|| format!("Failed to move node {}", node))?;
            print_json(&expected)
        }
        CliCommand::Scene { id, velocity } => {
            bridge
                .run_scene(id, velocity)
                .await
                .with_context(|| format!("Failed to activate scene {}", id))?;
            info!("Scene {} activated", id);
            Ok(())
        }
        CliCommand::Monitor => monitor(bridge).await,
        CliCommand::SaveConfig { .. } => Ok(()),
    }
}

async fn monitor(bridge: &Bridge<TcpTransport>) -> Result<()> {
    bridge
        .set_house_status_monitor(true)
        .await
        .context("Failed to enable the house status monitor")?;
    let mut updates = bridge.subscribe();
    info!("Waiting for position changes, press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
            _ = bridge.poll() => {}
        }
        while let Ok(update) = updates.try_recv() {
            println!("{}", serde_json::to_string(&update)?);
        }
    }

    if let Err(e) = bridge.set_house_status_monitor(false).await {
        warn!("Failed to disable the house status monitor: {}", e);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to encode output")?
    );
    Ok(())
}
