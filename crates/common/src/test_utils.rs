//! Test utilities for klf-bridge
//!
//! Provides packet builders and helper functions for testing across crates.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{bytes_from_hex, gateway_frame};
//!
//! let payload = bytes_from_hex("00 02").unwrap();
//! let frame = gateway_frame(0x0203, &payload).unwrap();
//! assert_eq!(frame.first(), Some(&0xC0));
//! ```

use protocol::records::{NAME_SIZE, encode_name};
use protocol::{ActuatorPosition, Command, encode_frame, envelope};
use std::future::Future;
use std::time::Duration;

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Parse whitespace separated hex bytes, as found in gateway traces
///
/// # Example
/// ```
/// use common::test_utils::bytes_from_hex;
///
/// assert_eq!(bytes_from_hex("06 2D c8").unwrap(), vec![0x06, 0x2D, 0xC8]);
/// ```
pub fn bytes_from_hex(text: &str) -> crate::Result<Vec<u8>> {
    text.split_whitespace()
        .map(|byte| {
            u8::from_str_radix(byte, 16)
                .map_err(|e| crate::Error::Parse(format!("'{}' is not a hex byte: {}", byte, e)))
        })
        .collect()
}

/// Wrap `payload` in an envelope and SLIP frame, as the gateway would send it
pub fn gateway_frame(command: u16, payload: &[u8]) -> crate::Result<Vec<u8>> {
    Ok(encode_frame(&envelope::wrap(command, payload)?))
}

/// Framed `GW_ERROR_NTF` carrying `code`
pub fn error_frame(code: u8) -> crate::Result<Vec<u8>> {
    gateway_frame(Command::ErrorNtf.code(), &[code])
}

/// Create a mock 124-byte node information payload
///
/// # Arguments
/// * `node_id` - Node index in the gateway's system table
/// * `name` - Node name (truncated to the name field)
/// * `state` - Raw execution state byte
/// * `current` - Current main parameter
/// * `target` - Target main parameter
pub fn create_mock_node_payload(
    node_id: u8,
    name: &str,
    state: u8,
    current: ActuatorPosition,
    target: ActuatorPosition,
) -> Vec<u8> {
    let mut payload = vec![0u8; protocol::NodeInformation::SIZE];
    payload[0] = node_id;
    payload[2] = node_id;

    let name = &name.as_bytes()[..name.len().min(NAME_SIZE - 1)];
    if let Some(field) = encode_name(name, NAME_SIZE) {
        payload[4..4 + NAME_SIZE].copy_from_slice(&field);
    }

    payload[68] = 1;
    // Window opener, subtype 1
    payload[69..71].copy_from_slice(&0x0101u16.to_be_bytes());
    payload[84] = state;
    payload[85..87].copy_from_slice(&current.raw().to_be_bytes());
    payload[87..89].copy_from_slice(&target.raw().to_be_bytes());
    for slot in 0..4 {
        let offset = 89 + 2 * slot;
        payload[offset..offset + 2].copy_from_slice(&protocol::params::UNKNOWN_VALUE.to_be_bytes());
    }
    payload
}

/// Create a mock 20-byte position change notification payload
pub fn create_mock_position_changed(
    node_id: u8,
    state: u8,
    current: ActuatorPosition,
    target: ActuatorPosition,
) -> Vec<u8> {
    let mut payload = vec![0u8; 20];
    payload[0] = node_id;
    payload[1] = state;
    payload[2..4].copy_from_slice(&current.raw().to_be_bytes());
    payload[4..6].copy_from_slice(&target.raw().to_be_bytes());
    for slot in 0..4 {
        let offset = 6 + 2 * slot;
        payload[offset..offset + 2].copy_from_slice(&protocol::params::UNKNOWN_VALUE.to_be_bytes());
    }
    payload
}

/// Create a mock 13-byte command run status payload
pub fn create_mock_run_status(session_id: u16, node_id: u8, run_status: u8) -> Vec<u8> {
    let mut payload = vec![0u8; 13];
    payload[0..2].copy_from_slice(&session_id.to_be_bytes());
    payload[2] = 1;
    payload[3] = node_id;
    payload[7] = run_status;
    payload
}

/// Timeout wrapper for async tests
///
/// Wraps an async operation with a timeout to prevent tests from hanging.
///
/// # Example
/// ```ignore
/// use common::test_utils::{with_timeout, DEFAULT_TEST_TIMEOUT};
///
/// #[tokio::test]
/// async fn test_with_timeout() {
///     let result = with_timeout(DEFAULT_TEST_TIMEOUT, async { 42 }).await.unwrap();
///     assert_eq!(result, 42);
/// }
/// ```
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError { duration })
}

/// Error returned when a test times out
#[derive(Debug)]
pub struct TimeoutError {
    /// The timeout duration that was exceeded
    pub duration: Duration,
}

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Test timed out after {:?}", self.duration)
    }
}

impl std::error::Error for TimeoutError {}
