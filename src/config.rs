//! Reader configuration loaded from YAML

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::decoders::DecoderRegistry;
use crate::series::{DEFAULT_CAPACITY, DEFAULT_LABEL_INTERVAL, TimeSeries};
use crate::source::ByteSource;
use crate::sources::{ReplaySource, TeeSource, open_device};
use crate::types::UpdateRate;
use crate::{Result, TelemetryError};

/// Everything needed to wire a reader from a config file
///
/// Every field has a default, so an empty mapping (`{}`) is a valid config
/// reading a Fenix 3 ECU on `/dev/ttyUSB0`.
///
/// ```yaml
/// decoder: Fenix52B
/// source: captures/idle.bin
/// replay_bytes_per_sec: 6250
/// update_hz: 16
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Registered decoder variant name.
    pub decoder: String,

    /// Serial device, pipe or capture file.
    pub source: PathBuf,

    /// Mirror every byte read into this file.
    pub capture: Option<PathBuf>,

    /// Replay `source` as a capture at this byte rate instead of reading it live.
    pub replay_bytes_per_sec: Option<u32>,

    pub fps_interval_ms: u64,

    /// Slots per time series; must be a power of two.
    pub series_capacity: usize,

    /// Minimum seconds between timestamped samples.
    pub label_interval_secs: f64,

    /// Record stream rate for subscribers; absent means every record.
    pub update_hz: Option<u32>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            decoder: "Fenix3".to_string(),
            source: PathBuf::from("/dev/ttyUSB0"),
            capture: None,
            replay_bytes_per_sec: None,
            fps_interval_ms: 1000,
            series_capacity: DEFAULT_CAPACITY,
            label_interval_secs: DEFAULT_LABEL_INTERVAL.as_secs_f64(),
            update_hz: Some(16),
        }
    }
}

impl ReaderConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read and parse a YAML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading reader config from {}", path.display());

        let yaml = std::fs::read_to_string(path)
            .map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;
        let config = Self::from_yaml_str(&yaml)?;

        info!(decoder = %config.decoder, source = %config.source.display(), "Loaded reader config");
        Ok(config)
    }

    /// Reject settings that would only fail once reading has started.
    pub fn validate<R: 'static>(&self, registry: &DecoderRegistry<R>) -> Result<()> {
        if !registry.contains(&self.decoder) {
            return Err(TelemetryError::UnknownVariant {
                name: self.decoder.clone(),
                available: registry.names().map(str::to_string).collect(),
            });
        }
        if !self.series_capacity.is_power_of_two() {
            return Err(TelemetryError::InvalidCapacity { capacity: self.series_capacity });
        }
        if self.fps_interval_ms == 0 {
            return Err(TelemetryError::config("fps_interval_ms", "must be greater than zero"));
        }
        if !self.label_interval_secs.is_finite() || self.label_interval_secs < 0.0 {
            return Err(TelemetryError::config(
                "label_interval_secs",
                format!("{} is not a non-negative number of seconds", self.label_interval_secs),
            ));
        }
        if self.replay_bytes_per_sec == Some(0) {
            return Err(TelemetryError::config("replay_bytes_per_sec", "must be greater than zero"));
        }
        Ok(())
    }

    pub fn fps_interval(&self) -> Duration {
        Duration::from_millis(self.fps_interval_ms)
    }

    pub fn label_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.label_interval_secs).unwrap_or(DEFAULT_LABEL_INTERVAL)
    }

    pub fn update_rate(&self) -> UpdateRate {
        self.update_hz.map_or(UpdateRate::Native, UpdateRate::Max)
    }

    /// Empty time series sized and spaced as configured.
    pub fn new_series(&self) -> Result<TimeSeries> {
        Ok(TimeSeries::with_capacity(self.series_capacity)?
            .with_label_interval(self.label_interval()))
    }

    /// Open the configured byte source, wrapped in a capture tee if requested.
    pub fn open_source(&self) -> Result<Box<dyn ByteSource>> {
        let source: Box<dyn ByteSource> = match self.replay_bytes_per_sec {
            Some(rate) => Box::new(ReplaySource::open(&self.source, rate)?),
            None => Box::new(open_device(&self.source)?),
        };

        match &self.capture {
            Some(path) => Ok(Box::new(TeeSource::to_file(source, path)?)),
            None => Ok(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineRecord;

    fn registry() -> &'static DecoderRegistry<EngineRecord> {
        DecoderRegistry::builtin()
    }

    #[test]
    fn empty_mapping_uses_defaults() {
        let config = ReaderConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, ReaderConfig::default());
        assert_eq!(config.update_rate(), UpdateRate::Max(16));
        assert_eq!(config.fps_interval(), Duration::from_secs(1));
        assert_eq!(config.label_interval(), Duration::from_secs(5));
        config.validate(registry()).unwrap();
    }

    #[test]
    fn parses_replay_setup() {
        let config = ReaderConfig::from_yaml_str(
            "decoder: Fenix52B\nsource: captures/idle.bin\nreplay_bytes_per_sec: 6250\nupdate_hz: null\nseries_capacity: 1024\n",
        )
        .unwrap();

        assert_eq!(config.decoder, "Fenix52B");
        assert_eq!(config.replay_bytes_per_sec, Some(6250));
        assert_eq!(config.update_rate(), UpdateRate::Native);
        assert_eq!(config.new_series().unwrap().capacity(), 1024);
        config.validate(registry()).unwrap();
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = ReaderConfig::from_yaml_str("decodr: Fenix3\n").unwrap_err();
        assert!(matches!(err, TelemetryError::Config { .. }));
    }

    #[test]
    fn validate_fails_fast_on_unknown_decoder() {
        let config = ReaderConfig { decoder: "Fenix9".into(), ..Default::default() };
        match config.validate(registry()) {
            Err(TelemetryError::UnknownVariant { name, available }) => {
                assert_eq!(name, "Fenix9");
                assert!(available.contains(&"Fenix3".to_string()));
            }
            other => panic!("Expected UnknownVariant, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_bad_numbers() {
        let capacity = ReaderConfig { series_capacity: 500, ..Default::default() };
        assert!(matches!(
            capacity.validate(registry()),
            Err(TelemetryError::InvalidCapacity { capacity: 500 })
        ));

        let fps = ReaderConfig { fps_interval_ms: 0, ..Default::default() };
        assert!(matches!(fps.validate(registry()), Err(TelemetryError::Config { .. })));

        let labels = ReaderConfig { label_interval_secs: -1.0, ..Default::default() };
        assert!(matches!(labels.validate(registry()), Err(TelemetryError::Config { .. })));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ReaderConfig::load("/nonexistent/xr25.yaml").unwrap_err();
        assert!(matches!(err, TelemetryError::File { .. }));
    }

    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir().join(format!("xr25-config-{}.yaml", std::process::id()));
        std::fs::write(&path, "decoder: Fenix52B\nfps_interval_ms: 500\n").unwrap();

        let config = ReaderConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.decoder, "Fenix52B");
        assert_eq!(config.fps_interval(), Duration::from_millis(500));
    }

    #[test]
    fn open_source_replays_and_captures() {
        let dir = std::env::temp_dir();
        let input = dir.join(format!("xr25-replay-{}.bin", std::process::id()));
        let capture = dir.join(format!("xr25-capture-{}.bin", std::process::id()));
        std::fs::write(&input, [0xFF, 0x00, 0x01]).unwrap();

        let config = ReaderConfig {
            source: input.clone(),
            capture: Some(capture.clone()),
            replay_bytes_per_sec: Some(1_000_000),
            ..Default::default()
        };
        let source = config.open_source().unwrap();
        assert!(source.describe().starts_with("tee("));

        drop(source);
        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&capture).ok();
    }
}
