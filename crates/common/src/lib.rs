//! Common utilities for klf-bridge
//!
//! This crate provides functionality shared by the bridge library, its binary
//! and the test suites: the error type, logging setup and helpers for building
//! gateway packets in tests.

pub mod error;
pub mod logging;
pub mod test_utils;

pub use error::{Error, Result};
pub use logging::setup_logging;
