//! Error types for XR25 stream processing.
//!
//! Two layers of failure exist and they travel differently:
//!
//! - [`DecodeError`] is returned by a [`FrameDecoder`](crate::FrameDecoder) when a
//!   frame payload does not match its schema. The synchronizer drops such frames
//!   and counts them; it never retries.
//! - [`TelemetryError`] covers everything outside a single frame: opening byte
//!   sources, configuration, registry lookups and worker lifecycle.
//!
//! Transport desync (oversized frames) is deliberately absent from both: it is
//! absorbed by the synchronizer and only visible through its counters.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use xr25::TelemetryError;
//!
//! let error = TelemetryError::source_failed("/dev/ttyUSB0 disappeared");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for telemetry operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Failure reported by a frame decoder for one payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("Payload length mismatch: expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("Invalid value for {field}: {details}")]
    Field { field: &'static str, details: String },
}

impl DecodeError {
    /// Helper constructor for length mismatches.
    pub fn length(expected: usize, actual: usize) -> Self {
        DecodeError::Length { expected, actual }
    }

    /// Helper constructor for out-of-schema field values.
    pub fn field(field: &'static str, details: impl Into<String>) -> Self {
        DecodeError::Field { field, details: details.into() }
    }
}

/// Main error type for telemetry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Byte source failed: {reason}")]
    Source {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown decoder variant '{name}' (registered: {})", .available.join(", "))]
    UnknownVariant { name: String, available: Vec<String> },

    #[error("Frame decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Ring buffer capacity {capacity} is not a non-zero power of two")]
    InvalidCapacity { capacity: usize },

    #[error("Reader worker failed: {reason}")]
    Worker {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TelemetryError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::Source { .. } => true,
            TelemetryError::Worker { .. } => true,
            TelemetryError::File { .. } => false,
            TelemetryError::UnknownVariant { .. } => false,
            TelemetryError::Decode(_) => false,
            TelemetryError::Config { .. } => false,
            TelemetryError::InvalidCapacity { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::Source { .. } => vec![
                "Check the diagnostic cable is plugged in",
                "Verify the serial device path and permissions",
                "Reopen the byte source",
            ],
            TelemetryError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
                "Ensure sufficient disk space for captures",
            ],
            TelemetryError::UnknownVariant { .. } => vec![
                "Check decoder name spelling",
                "Use one of the registered decoder variants",
            ],
            TelemetryError::Decode(_) => vec![
                "Verify the selected decoder matches the ECU firmware",
                "Check the stream for line noise",
            ],
            TelemetryError::Config { .. } => vec![
                "Check configuration file syntax",
                "Compare against the documented configuration keys",
            ],
            TelemetryError::InvalidCapacity { .. } => {
                vec!["Use a power-of-two capacity such as 256, 512 or 1024"]
            }
            TelemetryError::Worker { .. } => vec![
                "Check system thread limits",
                "Restart the reader",
            ],
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        TelemetryError::File { path, source }
    }

    /// Helper constructor for byte source failures.
    pub fn source_failed(reason: impl Into<String>) -> Self {
        TelemetryError::Source { reason: reason.into(), source: None }
    }

    /// Helper constructor for configuration errors.
    pub fn config(context: impl Into<String>, details: impl Into<String>) -> Self {
        TelemetryError::Config { context: context.into(), details: details.into() }
    }

    /// Helper constructor for worker lifecycle errors.
    pub fn worker_failed(
        reason: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        TelemetryError::Worker { reason: reason.into(), source }
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::Source { reason: err.to_string(), source: Some(Box::new(err)) }
    }
}

impl From<serde_yaml_ng::Error> for TelemetryError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        TelemetryError::Config { context: "YAML".to_string(), details: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            reason in ".*",
            name in "\\w+",
            expected in 0usize..256,
            actual in 0usize..256,
            capacity in 0usize..10_000,
          ) {
            let source_msg = TelemetryError::source_failed(reason.clone()).to_string();
            prop_assert!(source_msg.contains(&reason));

            let variant_msg = TelemetryError::UnknownVariant {
                name: name.clone(),
                available: vec!["Fenix3".to_string(), "Fenix52B".to_string()],
            }
            .to_string();
            prop_assert!(variant_msg.contains(&name));
            prop_assert!(variant_msg.contains("Fenix3, Fenix52B"));

            let length_msg = DecodeError::length(expected, actual).to_string();
            prop_assert!(length_msg.contains(&expected.to_string()));
            prop_assert!(length_msg.contains(&actual.to_string()));

            let capacity_msg = TelemetryError::InvalidCapacity { capacity }.to_string();
            prop_assert!(capacity_msg.contains(&capacity.to_string()));
          }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<TelemetryError>();
        assert_send_sync_static::<DecodeError>();

        let error = TelemetryError::source_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(TelemetryError::source_failed("gone").is_retryable());
        assert!(!TelemetryError::InvalidCapacity { capacity: 3 }.is_retryable());
        assert!(
            !TelemetryError::UnknownVariant { name: "x".into(), available: vec![] }.is_retryable()
        );

        for suggestion in TelemetryError::config("decoder", "missing").recovery_suggestions() {
            assert!(suggestion.len() > 5);
        }
    }

    #[test]
    fn io_errors_keep_their_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "line dropped");
        let err: TelemetryError = io_err.into();
        match &err {
            TelemetryError::Source { reason, source } => {
                assert_eq!(reason, "line dropped");
                assert!(source.is_some());
            }
            other => panic!("Expected Source error, got {other:?}"),
        }
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn decode_errors_convert() {
        let err: TelemetryError = DecodeError::field("rpm", "negative").into();
        assert!(matches!(err, TelemetryError::Decode(DecodeError::Field { field: "rpm", .. })));
    }
}
