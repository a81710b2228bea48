//! Test utilities: stuffed stream builders and schema-free decoders
//!
//! Compiled for unit tests and for the `benchmark` feature so criterion
//! benches can build realistic input without real ECU captures.

#![cfg(any(test, feature = "benchmark"))]

use crate::decoder::FrameDecoder;
use crate::error::DecodeError;
use crate::types::{encode_frame, push_boundary};

/// Encode `payloads` as consecutive frames and close the last one.
///
/// The result starts with a boundary, so a fresh synchronizer delivers every
/// payload exactly once.
pub fn stuffed_stream(payloads: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for payload in payloads {
        encode_frame(payload, &mut out);
    }
    push_boundary(&mut out);
    out
}

/// `count` copies of a representative Fenix 3 frame, including stuffed bytes.
pub fn fenix3_stream(count: usize) -> Vec<u8> {
    let mut payload = [0u8; 26];
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte = (i as u8).wrapping_mul(37);
    }
    payload[0] = 0x42;
    payload[5] = 0xFF;
    payload[23..].fill(0);

    let frames: Vec<&[u8]> = std::iter::repeat_n(&payload[..], count).collect();
    stuffed_stream(&frames)
}

/// Install a test subscriber honouring `RUST_LOG`; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Returns the payload unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoDecoder;

impl FrameDecoder for EchoDecoder {
    type Record = Vec<u8>;

    fn decode(&self, payload: &[u8]) -> Result<Vec<u8>, DecodeError> {
        Ok(payload.to_vec())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Requires at least `len` bytes and keeps the first `len`.
#[derive(Debug, Clone, Copy)]
pub struct FixedLenDecoder {
    len: usize,
}

impl FixedLenDecoder {
    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl FrameDecoder for FixedLenDecoder {
    type Record = Vec<u8>;

    fn decode(&self, payload: &[u8]) -> Result<Vec<u8>, DecodeError> {
        payload
            .get(..self.len)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| DecodeError::length(self.len, payload.len()))
    }

    fn name(&self) -> &str {
        "fixed-len"
    }
}

/// Rejects every payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingDecoder;

impl FrameDecoder for FailingDecoder {
    type Record = Vec<u8>;

    fn decode(&self, _payload: &[u8]) -> Result<Vec<u8>, DecodeError> {
        Err(DecodeError::field("payload", "rejected by test decoder"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}
