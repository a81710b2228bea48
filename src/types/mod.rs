//! Core types for XR25 telemetry.
//!
//! - [`EngineRecord`] is the decoded form of one frame
//! - [`BitField`] and the [`flags`] constants describe the digital groups
//! - [`SyncState`] and the framing constants describe the wire protocol
//! - [`UpdateRate`] controls how fast record streams are delivered

pub mod flags;
pub mod frame;
mod record;
mod update_rate;

pub use flags::BitField;
pub use frame::{BOUNDARY, MARKER, MAX_FRAME_LEN, SyncState, encode_frame, push_boundary};
pub use record::EngineRecord;
pub use update_rate::UpdateRate;
