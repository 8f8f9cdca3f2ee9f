use thiserror::Error;

/// Primary error type for seubench operations.
///
/// Corruption found by the engine is never reported through this type: it is
/// counted, logged, and repaired in the loop. `BenchError` covers the failures
/// that stop a run before or outside the measured region, namely bad
/// configuration and a broken log sink.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Writing to the structured log sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed.
    #[error("configuration parse error: {detail}")]
    Config { detail: String },

    /// A configuration value is out of range.
    #[error("invalid configuration: {field}: {detail}")]
    InvalidConfig { field: &'static str, detail: String },

    /// Candidate and golden buffers disagree in length.
    #[error("shape mismatch: candidate has {candidate} elements, golden has {golden}")]
    ShapeMismatch { candidate: usize, golden: usize },

    /// No kernel is registered under the requested name.
    #[error("unknown kernel: '{name}'")]
    UnknownKernel { name: String },

    /// Internal logic error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BenchError {
    /// Create an invalid-configuration error.
    pub fn invalid_config(field: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error came from user-supplied configuration.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::InvalidConfig { .. } | Self::UnknownKernel { .. }
        )
    }
}

/// Result type alias using `BenchError`.
pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_display_names_field() {
        let err = BenchError::invalid_config("change_rate", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "invalid configuration: change_rate: must be greater than zero"
        );
        assert!(err.is_user_recoverable());
    }

    #[test]
    fn io_errors_convert_and_are_not_user_recoverable() {
        let io = std::io::Error::other("sink closed");
        let err: BenchError = io.into();
        assert!(matches!(err, BenchError::Io(_)));
        assert!(!err.is_user_recoverable());
    }

    #[test]
    fn shape_mismatch_display() {
        let err = BenchError::ShapeMismatch {
            candidate: 16,
            golden: 15,
        };
        assert_eq!(
            err.to_string(),
            "shape mismatch: candidate has 16 elements, golden has 15"
        );
    }
}
