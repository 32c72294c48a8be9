//! # longfast-model
//!
//! Scenario loading, coverage data and configuration for LongFast simulations.
//!
//! This crate provides:
//! - Coverage data: towers, tower-to-tower and tower-to-cell visibility with
//!   path loss, population per cell ([`Coverage`])
//! - Line-of-sight row filtering against a link profile ([`LosProfile`])
//! - Animation configuration ([`AnimationConfig`])
//! - Tier threshold sources: explicit lists or path loss quantiles
//! - YAML scenario loading ([`load_scenario`])
//!
//! Everything here is read-only input to the simulator; the simulator borrows
//! these structures and never writes to them.

pub mod config;
pub mod coverage;
pub mod scenario;
pub mod thresholds;

pub use config::{AnimationConfig, ThresholdSpec};
pub use coverage::{
    AdjacencyMap, CellId, Coverage, Link, LosProfile, LosRow, PopulationMap, TowerId,
    TowerRecord, VisibilityMap,
};
pub use longfast_lora::RadioConfig;
pub use scenario::{load_scenario, load_scenario_from_str, Scenario};
pub use thresholds::{
    parse_thresholds, percentile_cont, quantile_thresholds, FALLBACK_TIER_THRESHOLDS_DB,
    TIER_LABELS, TIER_QUANTILES,
};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while loading or validating input data.
#[derive(Debug, Error)]
pub enum ModelError {
    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid radio parameters.
    #[error("Radio error: {0}")]
    Radio(#[from] longfast_lora::LoraError),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Seed tower could not be resolved by id or name.
    #[error("Seed '{0}' not found among towers")]
    SeedNotFound(String),

    /// A visibility entry references a tower that is not in the tower set.
    #[error("Unknown tower '{0}'")]
    UnknownTower(String),

    /// Population must be finite and non-negative.
    #[error("Invalid population {value} for cell '{cell}'")]
    InvalidPopulation {
        /// Cell identifier.
        cell: String,
        /// Offending value.
        value: f64,
    },

    /// Path loss must be finite.
    #[error("Invalid path loss {value} dB on {src} -> {dst}")]
    InvalidPathLoss {
        /// Source endpoint.
        src: String,
        /// Destination endpoint.
        dst: String,
        /// Offending value.
        value: f64,
    },

    /// Tier thresholds could not be parsed.
    #[error("Invalid tier thresholds: {0}")]
    InvalidThresholds(String),
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
