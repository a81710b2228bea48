//! Paced replay of captured streams

use std::path::Path;
use tokio::time::{Duration, Instant, sleep_until};
use tracing::{debug, info};

use crate::source::ByteSource;
use crate::{Result, TelemetryError};

/// Byte rate of the XR25 diagnostic line (62500 baud, 8N1 + framing).
pub const XR25_LINE_RATE: u32 = 6250;

/// Pacing granularity; bytes are released in bursts once per tick.
const TICK: Duration = Duration::from_millis(10);

/// Replays an in-memory capture at a fixed byte rate
///
/// A capture read back from disk would otherwise be consumed as fast as the
/// CPU allows; pacing it keeps frames-per-second and the time-series
/// timestamps comparable to a live session.
pub struct ReplaySource {
    data: Vec<u8>,
    position: usize,
    bytes_per_sec: u32,
    speed: f64,
    burst: usize,
    budget: usize,
    // no runtime-bound timer may live here across reader restarts
    next_burst: Option<Instant>,
    label: String,
}

impl ReplaySource {
    /// Replay `data` at `bytes_per_sec`.
    pub fn new(data: Vec<u8>, bytes_per_sec: u32) -> Self {
        let mut source = Self {
            data,
            position: 0,
            bytes_per_sec: bytes_per_sec.max(1),
            speed: 1.0,
            burst: 1,
            budget: 0,
            next_burst: None,
            label: "replay".to_string(),
        };
        source.repace();
        source
    }

    /// Load a capture file and replay it at `bytes_per_sec`.
    pub fn open<P: AsRef<Path>>(path: P, bytes_per_sec: u32) -> Result<Self> {
        let path = path.as_ref();
        let data =
            std::fs::read(path).map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;

        info!(path = %path.display(), bytes = data.len(), bytes_per_sec, "Opened capture for replay");
        let mut source = Self::new(data, bytes_per_sec);
        source.label = format!("replay:{}", path.display());
        Ok(source)
    }

    /// Set playback speed multiplier (clamped to 0.1..=10.0).
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.clamp(0.1, 10.0);
        self.repace();
        debug!("Replay speed set to {}x", self.speed);
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Bytes not yet handed out.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Seconds of stream left at the current pace.
    pub fn remaining_secs(&self) -> f64 {
        self.remaining() as f64 / (self.bytes_per_sec as f64 * self.speed)
    }

    fn repace(&mut self) {
        let per_tick = self.bytes_per_sec as f64 * self.speed * TICK.as_secs_f64();
        self.burst = (per_tick.round() as usize).max(1);
        self.budget = self.budget.min(self.burst);
    }
}

#[async_trait::async_trait]
impl ByteSource for ReplaySource {
    async fn next_byte(&mut self) -> Result<Option<u8>> {
        let Some(&byte) = self.data.get(self.position) else {
            return Ok(None);
        };

        if self.budget == 0 {
            if let Some(due) = self.next_burst {
                sleep_until(due).await;
            }
            self.next_burst = Some(Instant::now() + TICK);
            self.budget = self.burst;
        }

        self.budget -= 1;
        self.position += 1;
        Ok(Some(byte))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn releases_bytes_in_paced_bursts() {
        // 1000 B/s at 10ms ticks: 10 bytes per tick
        let mut source = ReplaySource::new((0u8..25).collect(), 1000);
        let start = tokio::time::Instant::now();

        let mut seen = Vec::new();
        while let Some(byte) = source.next_byte().await.unwrap() {
            seen.push(byte);
        }

        assert_eq!(seen, (0u8..25).collect::<Vec<_>>());
        // first tick is immediate, two more are needed for bytes 10..25
        assert_eq!(start.elapsed(), Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn speed_scales_burst_size() {
        let mut source = ReplaySource::new(vec![0u8; 100], 1000);
        source.set_speed(100.0);
        assert_eq!(source.speed(), 10.0);
        assert!((source.remaining_secs() - 0.01).abs() < 1e-9);

        let start = tokio::time::Instant::now();
        while source.next_byte().await.unwrap().is_some() {}
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn missing_capture_is_a_file_error() {
        assert!(matches!(
            ReplaySource::open("/nonexistent/capture.bin", XR25_LINE_RATE),
            Err(TelemetryError::File { .. })
        ));
    }
}
