//! Frame synchronization, decoding and sample history for XR25 ECU streams.
//!
//! Renault/Renix engine computers of the XR25 era stream their diagnostic
//! state as a byte-stuffed serial feed: frames are separated by `FF 00` and a
//! literal `FF` travels as `FF FF`. This crate turns that feed into typed
//! [`EngineRecord`]s and keeps scrolling histories for display.
//!
//! # Pipeline
//!
//! - A [`ByteSource`] yields octets (serial device, pipe, capture replay).
//! - The [`StreamSynchronizer`] recovers frame boundaries, collapses stuffing
//!   and counts desyncs.
//! - A [`FrameDecoder`] chosen by name from a [`DecoderRegistry`] turns each
//!   payload into a record.
//! - A post-decode hook fans the record out to a [`Mailbox`] (latest value)
//!   and any number of [`TimeSeries`] ring buffers.
//!
//! [`BackgroundReader`] runs all of this on its own thread.
//!
//! # Example
//!
//! ```rust
//! use std::io::Cursor;
//! use std::sync::Arc;
//! use xr25::types::{encode_frame, push_boundary};
//! use xr25::{
//!     BackgroundReader, DecoderRegistry, Mailbox, ReaderSource, SeriesSet, TimeSeries, fan_out,
//! };
//!
//! # fn main() -> xr25::Result<()> {
//! // One Fenix 3 frame, framed and stuffed as it would arrive on the wire
//! let mut payload = [0u8; 26];
//! payload[0] = 0x42;
//! let mut wire = Vec::new();
//! encode_frame(&payload, &mut wire);
//! push_boundary(&mut wire);
//!
//! let latest = Arc::new(Mailbox::new());
//! let rpm = Arc::new(TimeSeries::new());
//! let series = Arc::new(SeriesSet::new().with("rpm", rpm.clone(), |r: &xr25::EngineRecord| {
//!     (r.rpm as f64, None)
//! }));
//!
//! let decoder = DecoderRegistry::builtin().create("Fenix3")?;
//! let mut reader = BackgroundReader::new(ReaderSource::new(Cursor::new(wire)))
//!     .with_hook(fan_out(vec![latest.hook(), series.hook()]));
//! reader.start(decoder)?;
//!
//! while reader.is_running() {
//!     std::thread::sleep(std::time::Duration::from_millis(5));
//! }
//! reader.stop();
//!
//! assert_eq!(reader.frames_decoded(), 1);
//! assert_eq!(latest.snapshot().program_version, 0x42);
//! assert_eq!(rpm.len(), 1);
//! # Ok(())
//! # }
//! ```

mod config;
mod decoder;
pub mod decoders;
mod driver;
mod error;
mod mailbox;
pub mod series;
mod source;
pub mod sources;
pub mod stream;
mod synchronizer;
pub mod types;

#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;

pub use config::ReaderConfig;
pub use decoder::{BoxedDecoder, FrameDecoder};
pub use decoders::{DecoderRegistry, Fenix3Decoder, Fenix52BDecoder};
pub use driver::BackgroundReader;
pub use error::*;
pub use mailbox::Mailbox;
pub use series::{AlertRun, NO_DATA, Sample, SeriesSampler, SeriesSet, TimeSeries};
pub use source::{ByteSource, ReaderSource};
pub use synchronizer::{
    FrameAssembler, FrameEvent, PostDecodeHook, ReaderStatus, RunExit, StreamSynchronizer,
    SyncStats, fan_out,
};
pub use types::{BitField, EngineRecord, SyncState, UpdateRate};
