//! Record projections feeding time series

use std::sync::Arc;
use std::time::Instant;

use tracing::trace;

use super::TimeSeries;
use crate::synchronizer::PostDecodeHook;

/// Extracts `(value, alert)` from a record; `None` alert means no alert.
///
/// A `+inf` value is recorded as `f64::MAX` (see [`TimeSeries::sample`]).
pub type Projection<R> = Box<dyn Fn(&R) -> (f64, Option<bool>) + Send + Sync>;

/// Binds one [`TimeSeries`] to the record field it plots.
pub struct SeriesSampler<R> {
    name: String,
    series: Arc<TimeSeries>,
    project: Projection<R>,
}

impl<R> SeriesSampler<R> {
    pub fn new<F>(name: impl Into<String>, series: Arc<TimeSeries>, project: F) -> Self
    where
        F: Fn(&R) -> (f64, Option<bool>) + Send + Sync + 'static,
    {
        Self { name: name.into(), series, project: Box::new(project) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn series(&self) -> &Arc<TimeSeries> {
        &self.series
    }

    pub fn sample(&self, record: &R, now: Instant) {
        let (value, alert) = (self.project)(record);
        self.series.sample(value, alert.unwrap_or(false), now);
    }
}

impl<R> std::fmt::Debug for SeriesSampler<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesSampler")
            .field("name", &self.name)
            .field("series", &self.series)
            .finish_non_exhaustive()
    }
}

/// Fans each decoded record out to every registered sampler
///
/// All samplers see the same `now`, so their histories stay aligned.
///
/// ```rust
/// use std::sync::Arc;
/// use xr25::{EngineRecord, SeriesSet, TimeSeries};
///
/// let rpm = Arc::new(TimeSeries::new());
/// let set = SeriesSet::new()
///     .with("rpm", rpm.clone(), |r: &EngineRecord| (r.rpm as f64, None));
///
/// let hook = Arc::new(set).hook();
/// hook(&[], &EngineRecord { rpm: 900, ..Default::default() });
/// assert_eq!(rpm.latest().value, 900.0);
/// ```
#[derive(Debug)]
pub struct SeriesSet<R> {
    samplers: Vec<SeriesSampler<R>>,
}

impl<R> Default for SeriesSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> SeriesSet<R> {
    pub fn new() -> Self {
        Self { samplers: Vec::new() }
    }

    /// Add a sampler for `series` driven by `project`.
    pub fn with<F>(mut self, name: impl Into<String>, series: Arc<TimeSeries>, project: F) -> Self
    where
        F: Fn(&R) -> (f64, Option<bool>) + Send + Sync + 'static,
    {
        self.samplers.push(SeriesSampler::new(name, series, project));
        self
    }

    pub fn push(&mut self, sampler: SeriesSampler<R>) {
        self.samplers.push(sampler);
    }

    /// Series registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Arc<TimeSeries>> {
        self.samplers.iter().find(|s| s.name == name).map(|s| &s.series)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.samplers.iter().map(SeriesSampler::name)
    }

    pub fn len(&self) -> usize {
        self.samplers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samplers.is_empty()
    }

    pub fn sample_all(&self, record: &R, now: Instant) {
        for sampler in &self.samplers {
            sampler.sample(record, now);
        }
        trace!(series = self.samplers.len(), "Sampled record");
    }
}

impl<R: 'static> SeriesSet<R> {
    /// Post-decode hook sampling every decoded record at the time of decode.
    pub fn hook(self: Arc<Self>) -> PostDecodeHook<R> {
        Arc::new(move |_: &[u8], record: &R| self.sample_all(record, Instant::now()))
    }
}
