//! Scrolling sample histories fed from decoded records
//!
//! A [`TimeSeries`] is a lock-free ring buffer of `(value, alert, timestamp)`
//! samples. [`SeriesSampler`] pairs one with a projection that pulls a scalar
//! out of a record, and [`SeriesSet`] drives many of them from a single
//! post-decode hook.

mod buffer;
mod sampler;

pub use buffer::{AlertRun, DEFAULT_CAPACITY, DEFAULT_LABEL_INTERVAL, NO_DATA, Sample, TimeSeries};
pub use sampler::{Projection, SeriesSampler, SeriesSet};
