//! Wire protocol of the KLF 200 gateway
//!
//! This crate covers everything that can be decided from bytes alone: SLIP
//! framing, the command envelope with its XOR checksum, command codes, the
//! functional parameter block, actuator positions and the fixed-layout
//! records the gateway sends back. It keeps no connection state apart from
//! the [`SessionCorrelator`].
//!
//! # Example
//!
//! ```
//! use protocol::{Command, decode_frame, encode_frame, envelope};
//!
//! // Build a framed GW_GET_STATE_REQ
//! let bytes = envelope::wrap(Command::GetStateReq.code(), &[]).unwrap();
//! let framed = encode_frame(&bytes);
//!
//! // And take it apart again
//! let unframed = decode_frame(&framed).unwrap();
//! let received = envelope::unwrap(&unframed).unwrap();
//! assert_eq!(Command::from_u16(received.command), Some(Command::GetStateReq));
//! ```

pub mod codec;
pub mod commands;
pub mod envelope;
pub mod error;
pub mod gateway_error;
pub mod params;
pub mod position;
pub mod records;
pub mod session;

pub use codec::{MAX_FRAME_SIZE, decode_frame, encode_frame};

#[cfg(feature = "async")]
pub use codec::{FrameReader, write_frame_async};
pub use commands::{Command, CommandCategory, command_name};
pub use envelope::{Envelope, MAX_PAYLOAD_SIZE};
pub use error::{EnvelopeError, FramingError, ProtocolError, RecordError, Result};
pub use gateway_error::GatewayErrorCode;
pub use params::FunctionalParameters;
pub use position::{ActuatorPosition, ProductState};
pub use records::{
    ActuatorState, FirmwareVersion, GatewayState, LanConfig, LimitationStatus, NodeInformation,
    RunStatus, RunStatusNotification, SceneInfo, SceneListNotification, StatusNotification,
};
pub use session::SessionCorrelator;
