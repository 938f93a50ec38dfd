//! # Generation Error Types
//!
//! All errors that can surface from a terrain generation run.
//!
//! Out-of-range writes during vegetation placement are deliberately absent:
//! they are an expected boundary condition and are skipped, not reported.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while generating terrain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// A parameter was rejected before any generation work began.
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParams {
        /// The offending parameter.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Generation finished but produced no active voxels.
    #[error("no terrain produced, try different parameters")]
    EmptyResult,

    /// The run was cancelled because a newer request replaced it.
    #[error("generation superseded by request {epoch}")]
    Superseded {
        /// Epoch of the request that replaced this one.
        epoch: u64,
    },

    /// A parameter file could not be read, parsed, or written.
    #[error("configuration error: {0}")]
    Config(String),

    /// The terrain object has been destroyed.
    #[error("terrain has been destroyed")]
    Destroyed,

    /// The background generation worker is no longer running.
    #[error("generation worker stopped")]
    WorkerStopped,

    /// No outcome arrived in time; the worker may still be building.
    #[error("no generation outcome within {0:?}")]
    Timeout(Duration),
}

impl GenerationError {
    /// Shorthand for [`GenerationError::InvalidParams`].
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            field,
            reason: reason.into(),
        }
    }

    /// Returns true if the caller can keep going (show a message, retry
    /// with other parameters) rather than treat this as a failure.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EmptyResult | Self::Superseded { .. } | Self::Timeout(_)
        )
    }
}

/// Result type for generation operations.
pub type GenerationResult<T> = Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GenerationError::invalid("octaves", "must be at least 1, got 0");
        assert_eq!(err.to_string(), "invalid parameter `octaves`: must be at least 1, got 0");
        assert_eq!(
            GenerationError::EmptyResult.to_string(),
            "no terrain produced, try different parameters"
        );
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(GenerationError::EmptyResult.is_recoverable());
        assert!(GenerationError::Superseded { epoch: 3 }.is_recoverable());
        assert!(!GenerationError::invalid("world_size", "zero").is_recoverable());
        assert!(!GenerationError::Destroyed.is_recoverable());
        assert!(GenerationError::Timeout(Duration::from_millis(5)).is_recoverable());
        assert!(!GenerationError::WorkerStopped.is_recoverable());
    }
}
