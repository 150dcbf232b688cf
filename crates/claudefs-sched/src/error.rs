//! Error types for the scheduler filter subsystem.
//!
//! Filter evaluation itself never fails; every rejection is a [`Status`](crate::filter::Status).
//! These errors only cover loading and validating options and cluster snapshots.

use thiserror::Error;

/// Result type alias for scheduler configuration operations.
pub type SchedResult<T> = Result<T, SchedError>;

/// Error variants for configuration and snapshot loading.
#[derive(Debug, Error)]
pub enum SchedError {
    /// Wraps standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A TOML document could not be parsed.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A JSON document could not be parsed.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The file extension is not one of the supported formats.
    #[error("Unsupported config file extension: {ext:?}")]
    UnsupportedFormat {
        /// The extension that was found.
        ext: String,
    },

    /// Options were parsed but are not internally consistent.
    #[error("Invalid config: {field}: {reason}")]
    InvalidConfig {
        /// The offending option.
        field: &'static str,
        /// Description of the problem.
        reason: String,
    },
}
