//! Fixed-capacity ring buffer of scalar samples

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::{Result, TelemetryError};

/// Slots kept by [`TimeSeries::new`].
pub const DEFAULT_CAPACITY: usize = 512;

/// Minimum spacing between two timestamped samples.
pub const DEFAULT_LABEL_INTERVAL: Duration = Duration::from_secs(5);

/// Value of a slot that was never written.
pub const NO_DATA: f64 = f64::INFINITY;

/// One entry read back from a [`TimeSeries`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub alert: bool,
    /// Set only on samples that start a new label interval.
    pub timestamp: Option<Instant>,
}

impl Sample {
    pub const EMPTY: Sample = Sample { value: NO_DATA, alert: false, timestamp: None };

    pub fn has_data(&self) -> bool {
        self.value != NO_DATA
    }
}

/// Consecutive samples sharing the same alert flag, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertRun {
    /// Offset of the newest sample in the run.
    pub start: usize,
    pub len: usize,
    pub alert: bool,
}

struct Slot {
    value: AtomicU64,
    alert: AtomicBool,
    // 0 = none, otherwise nanoseconds since `origin` plus one
    stamp: AtomicU64,
}

impl Slot {
    fn empty() -> Self {
        Self {
            value: AtomicU64::new(NO_DATA.to_bits()),
            alert: AtomicBool::new(false),
            stamp: AtomicU64::new(0),
        }
    }
}

/// Scrolling history of one scalar channel
///
/// Holds the last `N` samples, `N` a power of two, in O(N) memory however
/// long the run. Written by one producer (normally the reader thread through
/// a [`SeriesSampler`](super::SeriesSampler)) and read by any number of
/// consumers without locking. Each field of a slot is its own atomic, so a
/// reader racing the producer at the wrap point may see a slot half way
/// between its old and new contents; whole-history consistency is not
/// guaranteed.
///
/// Offsets count backwards from the newest sample: `get(0)` is the latest
/// write. Offsets at or past the number of samples written so far return
/// [`Sample::EMPTY`]. Once the buffer has wrapped, offsets `>= N` alias newer
/// slots; callers bound offsets by [`capacity`](Self::capacity).
pub struct TimeSeries {
    slots: Box<[Slot]>,
    mask: usize,
    index: AtomicUsize,
    changed: AtomicBool,
    origin: Instant,
    label_interval: Duration,
    last_stamp: AtomicU64,
}

impl Default for TimeSeries {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TimeSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeSeries")
            .field("capacity", &self.capacity())
            .field("written", &self.written())
            .field("label_interval", &self.label_interval)
            .finish()
    }
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::build(DEFAULT_CAPACITY)
    }

    /// Buffer of `capacity` slots; fails unless `capacity` is a power of two.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if !capacity.is_power_of_two() {
            return Err(TelemetryError::InvalidCapacity { capacity });
        }
        Ok(Self::build(capacity))
    }

    fn build(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Slot::empty()).collect(),
            mask: capacity - 1,
            index: AtomicUsize::new(0),
            changed: AtomicBool::new(false),
            origin: Instant::now(),
            label_interval: DEFAULT_LABEL_INTERVAL,
            last_stamp: AtomicU64::new(0),
        }
    }

    pub fn with_label_interval(mut self, interval: Duration) -> Self {
        self.label_interval = interval;
        self
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Total samples ever written, including overwritten ones.
    pub fn written(&self) -> usize {
        self.index.load(Ordering::Acquire)
    }

    /// Samples currently retrievable.
    pub fn len(&self) -> usize {
        self.written().min(self.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.written() == 0
    }

    /// Reference point for stored timestamps; samples taken before it are
    /// stamped as if taken at the origin.
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Append a sample
    ///
    /// The sample is timestamped when at least the label interval has passed
    /// since the last timestamped sample, and always when it is the first.
    /// Must only be called from one thread at a time.
    ///
    /// `+inf` is reserved for [`NO_DATA`] and is stored as `f64::MAX`, so a
    /// projection that overflows still extends the history.
    pub fn sample(&self, value: f64, alert: bool, now: Instant) {
        let i = self.index.load(Ordering::Relaxed);
        let slot = &self.slots[i & self.mask];

        let at = now.saturating_duration_since(self.origin).as_nanos() as u64 + 1;
        let last = self.last_stamp.load(Ordering::Relaxed);
        let due = at.saturating_sub(last) >= self.label_interval.as_nanos() as u64;
        let stamp = if last == 0 || due {
            self.last_stamp.store(at, Ordering::Relaxed);
            at
        } else {
            0
        };

        let value = if value == NO_DATA { f64::MAX } else { value };
        slot.value.store(value.to_bits(), Ordering::Relaxed);
        slot.alert.store(alert, Ordering::Relaxed);
        slot.stamp.store(stamp, Ordering::Relaxed);

        self.index.store(i.wrapping_add(1), Ordering::Release);
        self.changed.store(true, Ordering::Release);
    }

    /// Sample written `offset` writes before the newest one.
    pub fn get(&self, offset: usize) -> Sample {
        self.read(self.written(), offset)
    }

    pub fn latest(&self) -> Sample {
        self.get(0)
    }

    /// Whether anything was sampled since the last call; clears the flag.
    pub fn consume_changed(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }

    /// Walk newest to oldest, stopping at the first [`NO_DATA`] slot.
    pub fn history(&self) -> impl Iterator<Item = Sample> + '_ {
        let index = self.written();
        (0..self.capacity()).map(move |offset| self.read(index, offset)).take_while(Sample::has_data)
    }

    /// Split [`history`](Self::history) into runs of equal alert flag.
    pub fn runs(&self) -> Vec<AlertRun> {
        let mut runs: Vec<AlertRun> = Vec::new();
        for (offset, sample) in self.history().enumerate() {
            match runs.last_mut() {
                Some(run) if run.alert == sample.alert => run.len += 1,
                _ => runs.push(AlertRun { start: offset, len: 1, alert: sample.alert }),
            }
        }
        runs
    }

    /// Offsets and instants of timestamped samples, newest first.
    pub fn labels(&self) -> impl Iterator<Item = (usize, Instant)> + '_ {
        self.history().enumerate().filter_map(|(offset, s)| s.timestamp.map(|t| (offset, t)))
    }

    fn read(&self, index: usize, offset: usize) -> Sample {
        if offset >= index {
            return Sample::EMPTY;
        }
        let slot = &self.slots[index.wrapping_sub(1).wrapping_sub(offset) & self.mask];
        let stamp = slot.stamp.load(Ordering::Relaxed);
        Sample {
            value: f64::from_bits(slot.value.load(Ordering::Relaxed)),
            alert: slot.alert.load(Ordering::Relaxed),
            timestamp: (stamp != 0).then(|| self.origin + Duration::from_nanos(stamp - 1)),
        }
    }
}
