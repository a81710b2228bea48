//! Wire-level framing constants and synchronization state
//!
//! ```text
//! 0xff 0x00 0xaa 0xbb 0xcc ... 0xff 0x00 0xaa ...
//! |-------| |-----------------| |-------|
//! boundary   payload (stuffed)  boundary
//! ```
//!
//! A literal `0xff` inside the payload travels as `0xff 0xff`.

use serde::{Deserialize, Serialize};

/// First octet of both a boundary and a stuffed literal.
pub const MARKER: u8 = 0xFF;

/// Second octet of a frame boundary.
pub const BOUNDARY: u8 = 0x00;

/// Largest payload one frame may carry once stuffing is resolved.
pub const MAX_FRAME_LEN: usize = 128;

/// Whether the receiver trusts its alignment on frame boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncState {
    /// No boundary seen yet, or the last frame overflowed.
    #[default]
    Unsynchronized,
    /// Bytes are being collected between two boundaries.
    Synchronized,
}

impl SyncState {
    pub fn is_synchronized(self) -> bool {
        self == SyncState::Synchronized
    }
}

/// Append one frame (leading boundary + stuffed payload) to `out`.
///
/// The frame is only delivered by a receiver once the *next* boundary
/// arrives, so a stream of frames must be closed with [`push_boundary`].
pub fn encode_frame(payload: &[u8], out: &mut Vec<u8>) {
    push_boundary(out);
    for &byte in payload {
        out.push(byte);
        if byte == MARKER {
            out.push(MARKER);
        }
    }
}

/// Append a bare `FF 00` boundary to `out`.
pub fn push_boundary(out: &mut Vec<u8>) {
    out.extend_from_slice(&[MARKER, BOUNDARY]);
}
