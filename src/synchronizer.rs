//! Frame synchronization over a byte-stuffed stream
//!
//! [`FrameAssembler`] is the byte-level state machine: it finds `FF 00`
//! boundaries, collapses `FF FF` into a literal `FF` and drops frames that
//! outgrow [`MAX_FRAME_LEN`]. [`StreamSynchronizer`] drives it from a
//! [`ByteSource`], hands each frame to a [`FrameDecoder`] and publishes the
//! outcome through [`SyncStats`] and an optional post-decode hook.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::decoder::FrameDecoder;
use crate::error::DecodeError;
use crate::source::ByteSource;
use crate::types::{BOUNDARY, MARKER, MAX_FRAME_LEN, SyncState};

/// Consecutive read errors tolerated before the loop gives up.
const MAX_READ_ERRORS: u32 = 10;

/// Called on the reader thread after every successful decode with the raw
/// payload and the record it produced. Must return quickly.
pub type PostDecodeHook<R> = Arc<dyn Fn(&[u8], &R) + Send + Sync>;

/// Combine several hooks into one that calls them in order.
pub fn fan_out<R: 'static>(hooks: Vec<PostDecodeHook<R>>) -> PostDecodeHook<R> {
    Arc::new(move |payload: &[u8], record: &R| {
        for hook in &hooks {
            hook(payload, record);
        }
    })
}

/// Outcome of feeding one byte to a [`FrameAssembler`].
#[derive(Debug, PartialEq, Eq)]
pub enum FrameEvent<'a> {
    /// Byte absorbed, no boundary yet.
    Pending,
    /// First boundary after start-up or after an overflow; nothing to deliver.
    Synchronized,
    /// A boundary closed this payload.
    Frame(&'a [u8]),
    /// Payload outgrew [`MAX_FRAME_LEN`] and was discarded.
    Overflow,
}

/// Byte-level frame recovery
///
/// Holds at most one pending `FF` of lookahead. A `FF` followed by anything
/// other than `00` or `FF` is an escape anomaly: the `FF` is dropped and the
/// following byte is kept as ordinary data.
pub struct FrameAssembler {
    buf: [u8; MAX_FRAME_LEN],
    len: usize,
    state: SyncState,
    escape: bool,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self { buf: [0; MAX_FRAME_LEN], len: 0, state: SyncState::Unsynchronized, escape: false }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Bytes collected since the last boundary.
    pub fn pending_len(&self) -> usize {
        self.len
    }

    pub fn push(&mut self, byte: u8) -> FrameEvent<'_> {
        if !self.escape {
            if byte == MARKER {
                self.escape = true;
                return FrameEvent::Pending;
            }
            return self.append(byte);
        }

        self.escape = false;
        if byte != BOUNDARY {
            // FF FF is a stuffed literal; FF xx keeps xx only
            return self.append(byte);
        }

        let len = std::mem::take(&mut self.len);
        match std::mem::replace(&mut self.state, SyncState::Synchronized) {
            SyncState::Synchronized => FrameEvent::Frame(&self.buf[..len]),
            SyncState::Unsynchronized => FrameEvent::Synchronized,
        }
    }

    fn append(&mut self, byte: u8) -> FrameEvent<'_> {
        if !self.state.is_synchronized() {
            return FrameEvent::Pending;
        }
        if self.len == MAX_FRAME_LEN {
            self.len = 0;
            self.state = SyncState::Unsynchronized;
            return FrameEvent::Overflow;
        }
        self.buf[self.len] = byte;
        self.len += 1;
        FrameEvent::Pending
    }
}

/// Counters shared between the reader and status displays
///
/// All fields are atomics; readers on any thread get point-in-time values
/// without locking.
#[derive(Debug, Default)]
pub struct SyncStats {
    synchronized: AtomicBool,
    sync_errors: AtomicU64,
    frames_delivered: AtomicU64,
    frames_decoded: AtomicU64,
    decode_failures: AtomicU64,
    window: AtomicU64,
    frames_per_second: AtomicU32,
}

impl SyncStats {
    pub fn is_synchronized(&self) -> bool {
        self.synchronized.load(Ordering::Acquire)
    }

    pub fn sync_errors(&self) -> u64 {
        self.sync_errors.load(Ordering::Relaxed)
    }

    /// Frames handed to the decoder, whether or not they decoded.
    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered.load(Ordering::Relaxed)
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded.load(Ordering::Relaxed)
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    /// Rate published by the last [`publish_rate`](Self::publish_rate).
    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second.load(Ordering::Relaxed)
    }

    /// Turn the frames counted since the previous call into a per-second rate.
    pub fn publish_rate(&self, elapsed: Duration) {
        let frames = self.window.swap(0, Ordering::AcqRel);
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { (frames as f64 / secs).round() as u32 } else { 0 };
        self.frames_per_second.store(rate, Ordering::Relaxed);
        trace!(frames, rate, "Published frame rate");
    }

    pub fn snapshot(&self) -> ReaderStatus {
        ReaderStatus {
            synchronized: self.is_synchronized(),
            sync_errors: self.sync_errors(),
            frames_per_second: self.frames_per_second(),
            frames_delivered: self.frames_delivered(),
            frames_decoded: self.frames_decoded(),
            decode_failures: self.decode_failures(),
        }
    }

    pub(crate) fn set_synchronized(&self, value: bool) {
        self.synchronized.store(value, Ordering::Release);
    }

    /// Clear the live indicators once no reader is running.
    pub(crate) fn idle(&self) {
        self.set_synchronized(false);
        self.window.store(0, Ordering::Relaxed);
        self.frames_per_second.store(0, Ordering::Relaxed);
    }

    fn frame_delivered(&self) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
        self.window.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`SyncStats`] for status displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderStatus {
    pub synchronized: bool,
    pub sync_errors: u64,
    pub frames_per_second: u32,
    pub frames_delivered: u64,
    pub frames_decoded: u64,
    pub decode_failures: u64,
}

/// Why [`StreamSynchronizer::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    EndOfStream,
    Cancelled,
    /// Too many consecutive read errors.
    SourceFailed,
}

/// Drives a [`FrameAssembler`] and a [`FrameDecoder`]
pub struct StreamSynchronizer<D: FrameDecoder> {
    assembler: FrameAssembler,
    decoder: D,
    hook: Option<PostDecodeHook<D::Record>>,
    stats: Arc<SyncStats>,
}

impl<D: FrameDecoder> StreamSynchronizer<D> {
    pub fn new(decoder: D, stats: Arc<SyncStats>) -> Self {
        Self { assembler: FrameAssembler::new(), decoder, hook: None, stats }
    }

    pub fn with_hook(mut self, hook: PostDecodeHook<D::Record>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn stats(&self) -> &Arc<SyncStats> {
        &self.stats
    }

    pub fn state(&self) -> SyncState {
        self.assembler.state()
    }

    /// Feed one byte
    ///
    /// Returns `Some` when the byte closed a frame, carrying the decoder's
    /// verdict. On success the hook has already run.
    pub fn push(&mut self, byte: u8) -> Option<Result<D::Record, DecodeError>> {
        match self.assembler.push(byte) {
            FrameEvent::Pending => None,
            FrameEvent::Synchronized => {
                debug!("Frame alignment acquired");
                self.stats.set_synchronized(true);
                None
            }
            FrameEvent::Overflow => {
                self.stats.sync_errors.fetch_add(1, Ordering::Relaxed);
                self.stats.set_synchronized(false);
                warn!(
                    "Frame exceeded {} bytes, resynchronizing ({} sync errors)",
                    MAX_FRAME_LEN,
                    self.stats.sync_errors()
                );
                None
            }
            FrameEvent::Frame(payload) => {
                self.stats.frame_delivered();
                match self.decoder.decode(payload) {
                    Ok(record) => {
                        self.stats.frames_decoded.fetch_add(1, Ordering::Relaxed);
                        trace!(len = payload.len(), "Frame decoded");
                        if let Some(hook) = &self.hook {
                            hook(payload, &record);
                        }
                        Some(Ok(record))
                    }
                    Err(e) => {
                        self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
                        debug!(decoder = self.decoder.name(), "Frame dropped: {}", e);
                        Some(Err(e))
                    }
                }
            }
        }
    }

    /// Feed a chunk of bytes, discarding per-frame results.
    pub fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let _ = self.push(byte);
        }
    }

    /// Read `source` until it ends, fails persistently or `cancel` fires
    ///
    /// A frame still being assembled when the loop exits is never delivered.
    pub async fn run<S>(&mut self, source: &mut S, cancel: &CancellationToken) -> RunExit
    where
        S: ByteSource + ?Sized,
    {
        info!(decoder = self.decoder.name(), source = %source.describe(), "Frame reader started");
        let mut error_count = 0u32;

        let exit = loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break RunExit::Cancelled,
                result = source.next_byte() => result,
            };

            match result {
                Ok(Some(byte)) => {
                    error_count = 0;
                    let _ = self.push(byte);
                }
                Ok(None) => break RunExit::EndOfStream,
                Err(e) => {
                    error_count += 1;
                    warn!("Byte source error ({}/{}): {}", error_count, MAX_READ_ERRORS, e);

                    if error_count >= MAX_READ_ERRORS {
                        error!("Too many byte source errors, stopping reader");
                        break RunExit::SourceFailed;
                    }

                    // 50ms, 100ms, 200ms, ...
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::select! {
                        _ = cancel.cancelled() => break RunExit::Cancelled,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        };

        info!(
            ?exit,
            frames = self.stats.frames_delivered(),
            sync_errors = self.stats.sync_errors(),
            "Frame reader ended"
        );
        exit
    }
}
