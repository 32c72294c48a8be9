//! Error types for the simulator.

use thiserror::Error;

/// Errors reported before any frame is simulated.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    /// Threshold count does not match the configured tier styles.
    #[error("Tier thresholds must include exactly {expected} values, got {actual}")]
    ThresholdCount {
        /// Configured threshold count.
        expected: usize,
        /// Supplied threshold count.
        actual: usize,
    },

    /// Thresholds are not ascending or not finite.
    #[error("Tier thresholds must be finite and ascending: {0:?}")]
    UnorderedThresholds(Vec<f64>),

    /// Seed tower is not in the tower set.
    #[error("Seed tower '{0}' not found in tower set")]
    SeedNotFound(String),

    /// Seed tower has no hop assignment.
    #[error("Seed tower '{0}' has no hop assignment")]
    SeedWithoutHop(String),

    /// Timing parameters the frame loop cannot run with.
    #[error("Invalid simulation parameters: {0}")]
    InvalidParams(String),
}

/// Result type for simulator operations.
pub type Result<T> = std::result::Result<T, SimError>;
