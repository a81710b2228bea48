//! Background reader owning the frame reader thread

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::decoder::FrameDecoder;
use crate::source::ByteSource;
use crate::synchronizer::{PostDecodeHook, ReaderStatus, StreamSynchronizer, SyncStats};
use crate::{Result, TelemetryError};

/// Smallest accepted frame-rate publication period.
const MIN_FPS_INTERVAL: Duration = Duration::from_millis(10);

struct Worker<S> {
    cancel: CancellationToken,
    handle: JoinHandle<Option<S>>,
}

/// Carries the source onto the reader thread
///
/// The spawn closure only holds a clone of the slot, so the source can be
/// taken back if the thread never starts.
struct Handoff<S>(Arc<Mutex<Option<S>>>);

impl<S> Handoff<S> {
    fn new(source: S) -> Self {
        Self(Arc::new(Mutex::new(Some(source))))
    }

    fn share(&self) -> Self {
        Self(self.0.clone())
    }

    fn take(&self) -> Option<S> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Runs a [`StreamSynchronizer`] on a dedicated thread
///
/// The reader owns its byte source. [`start`](Self::start) moves the source
/// onto a thread named `xr25-reader` that drives a current-thread tokio
/// runtime; [`stop`](Self::stop) cancels the loop, joins the thread and takes
/// the source back, so the same reader can be started again later with a
/// fresh synchronizer (and possibly a different decoder).
///
/// Statistics live in a shared [`SyncStats`] and accumulate across restarts.
/// Every accessor is a lock-free read usable from any thread while the worker
/// runs.
///
/// Dropping the reader stops it.
pub struct BackgroundReader<S: ByteSource, R> {
    source: Option<S>,
    worker: Option<Worker<S>>,
    stats: Arc<SyncStats>,
    hook: Option<PostDecodeHook<R>>,
    fps_interval: Duration,
}

impl<S: ByteSource, R: Clone + Default + Send + Sync + 'static> BackgroundReader<S, R> {
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            worker: None,
            stats: Arc::new(SyncStats::default()),
            hook: None,
            fps_interval: Duration::from_secs(1),
        }
    }

    /// Hook invoked on the reader thread after each successful decode.
    pub fn with_hook(mut self, hook: PostDecodeHook<R>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Convenience for hooks that only need the record.
    pub fn on_decoded<F>(self, callback: F) -> Self
    where
        F: Fn(&R) + Send + Sync + 'static,
    {
        self.with_hook(Arc::new(move |_: &[u8], record: &R| callback(record)))
    }

    /// Period at which [`frames_per_second`](Self::frames_per_second) is republished.
    pub fn with_fps_interval(mut self, interval: Duration) -> Self {
        self.fps_interval = interval.max(MIN_FPS_INTERVAL);
        self
    }

    /// Spawn the reader thread
    ///
    /// A no-op while a worker is already running. A worker that ended on its
    /// own (end of stream, persistent source failure) is reaped first, so
    /// `start` after end of stream resumes reading the same source.
    pub fn start<D>(&mut self, decoder: D) -> Result<()>
    where
        D: FrameDecoder<Record = R>,
    {
        if self.is_running() {
            debug!("Background reader already running");
            return Ok(());
        }
        self.reap();

        let source = self.source.take().ok_or_else(|| {
            TelemetryError::worker_failed("byte source was lost by a previous reader thread", None)
        })?;
        let handoff = Handoff::new(source);
        let pending = handoff.share();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let stats = self.stats.clone();
        let hook = self.hook.clone();
        let fps_interval = self.fps_interval;

        let spawned = std::thread::Builder::new().name("xr25-reader".into()).spawn(move || {
            let mut source = pending.take()?;
            let runtime =
                match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!("Failed to build reader runtime: {}", e);
                        return Some(source);
                    }
                };

            let mut sync = StreamSynchronizer::new(decoder, stats.clone());
            if let Some(hook) = hook {
                sync = sync.with_hook(hook);
            }

            runtime.block_on(async {
                let ticker = tokio::spawn(publish_frame_rate(stats.clone(), fps_interval));
                let exit = sync.run(&mut source, &token).await;
                ticker.abort();
                source.release();
                debug!(?exit, "Reader loop returned");
            });

            // only regular-file reads can still sit in the blocking pool, and those complete
            drop(runtime);
            stats.idle();
            Some(source)
        });

        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker { cancel, handle });
                info!("Background reader started");
                Ok(())
            }
            Err(e) => {
                self.source = handoff.take();
                Err(TelemetryError::worker_failed(
                    "failed to spawn reader thread",
                    Some(Box::new(e)),
                ))
            }
        }
    }

    /// Cancel the reader and wait for its thread to exit
    ///
    /// The worker's runtime is shut down before this returns, so no read
    /// outlives the call. Safe to call repeatedly and on a reader that never
    /// started.
    pub fn stop(&mut self) {
        if let Some(worker) = &self.worker {
            worker.cancel.cancel();
        }
        if self.reap() {
            info!("Background reader stopped");
        }
    }

    /// Whether a worker thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.handle.is_finished())
    }

    pub fn is_synchronized(&self) -> bool {
        self.stats.is_synchronized()
    }

    pub fn sync_error_count(&self) -> u64 {
        self.stats.sync_errors()
    }

    pub fn frames_per_second(&self) -> u32 {
        self.stats.frames_per_second()
    }

    pub fn frames_decoded(&self) -> u64 {
        self.stats.frames_decoded()
    }

    pub fn frames_delivered(&self) -> u64 {
        self.stats.frames_delivered()
    }

    pub fn decode_failures(&self) -> u64 {
        self.stats.decode_failures()
    }

    pub fn status(&self) -> ReaderStatus {
        self.stats.snapshot()
    }

    /// Shared counters, for status displays that outlive a borrow of the reader.
    pub fn stats(&self) -> Arc<SyncStats> {
        self.stats.clone()
    }

    /// Join a worker if there is one and recover its source.
    fn reap(&mut self) -> bool {
        let Some(worker) = self.worker.take() else {
            return false;
        };
        match worker.handle.join() {
            Ok(source) => self.source = source,
            Err(_) => {
                warn!("Reader thread panicked, byte source dropped");
                self.stats.idle();
            }
        }
        true
    }
}

impl<S: ByteSource, R> Drop for BackgroundReader<S, R> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.cancel.cancel();
            if worker.handle.join().is_err() {
                warn!("Reader thread panicked during shutdown");
            }
        }
    }
}

async fn publish_frame_rate(stats: Arc<SyncStats>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    let mut last = Instant::now();
    loop {
        ticker.tick().await;
        let now = Instant::now();
        stats.publish_rate(now - last);
        last = now;
    }
}
