//! Client engine for the Velux KLF 200 gateway
//!
//! The [`Dispatcher`] runs one [`commands::BridgeCommand`] at a time over a
//! [`Transport`], handling gateway errors, busy retries and unsolicited
//! actuator updates on the way. [`Bridge`] keeps one reusable instance of
//! every command in its [`CommandTable`] and wraps them into typed calls.
//!
//! # Example
//!
//! ```no_run
//! use bridge::{Bridge, BridgeConfig, TcpTransport};
//!
//! # async fn run() -> bridge::Result<()> {
//! let config = BridgeConfig::default();
//! let transport = TcpTransport::new(
//!     config.address(),
//!     config.connect_timeout(),
//!     config.idle_read_timeout(),
//! );
//! let bridge = Bridge::new(transport, config.dispatch_settings());
//!
//! bridge.login(b"velux123").await?;
//! for product in bridge.products().await? {
//!     println!("{} {}", product.node_id, product.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod transport;

pub use bridge::{Bridge, CommandTable};
pub use config::BridgeConfig;
pub use dispatcher::{DispatchSettings, Dispatcher};
pub use error::{BridgeError, CommandFailure, Result};
pub use transport::{ScriptStep, ScriptedTransport, TcpTransport, Transport};
