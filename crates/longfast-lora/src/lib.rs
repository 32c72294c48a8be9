//! # longfast-lora
//!
//! LoRa PHY helpers for LongFast propagation estimates.
//!
//! This crate provides:
//! - Radio parameter configuration ([`RadioConfig`])
//! - Time-on-air calculation ([`estimate_airtime_seconds`])
//!
//! The airtime is computed once per configuration and reused for every
//! simulated transmission; per-transmission variation is added by callers
//! as jitter.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised for radio parameters the airtime formula cannot handle.
#[derive(Debug, Error, PartialEq)]
pub enum LoraError {
    /// Spreading factor outside 7..=12.
    #[error("Invalid spreading factor {0} (must be 7-12)")]
    InvalidSpreadingFactor(u8),

    /// Bandwidth of zero.
    #[error("Invalid bandwidth {0} kHz (must be positive)")]
    InvalidBandwidth(f64),
}

/// Result type for LoRa operations.
pub type Result<T> = std::result::Result<T, LoraError>;

// ============================================================================
// Radio Parameters
// ============================================================================

/// Symbol duration above which low data rate optimization is forced on.
pub const LOW_DATA_RATE_SYMBOL_THRESHOLD_S: f64 = 0.016;

/// Symbols added to the programmed preamble (sync word and start frame delimiter).
pub const PREAMBLE_OVERHEAD_SYMBOLS: f64 = 4.25;

/// Fixed number of payload symbols before the coded payload.
pub const PAYLOAD_BASE_SYMBOLS: i64 = 8;

/// LoRa radio parameters used for airtime estimation.
///
/// Defaults match the Meshtastic EU868 LongFast preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// LoRa spreading factor (7 to 12).
    pub spreading_factor: u8,
    /// Bandwidth in kHz (e.g., 250.0).
    pub bandwidth_khz: f64,
    /// Coding rate denominator (5 to 8, representing 4/5 to 4/8).
    pub coding_rate: u8,
    /// Payload size in bytes.
    pub payload_bytes: u32,
    /// Number of programmed preamble symbols.
    pub preamble_symbols: u32,
    /// Whether the payload CRC is enabled.
    pub crc_enabled: bool,
    /// Whether implicit header mode is used.
    pub implicit_header: bool,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self::long_fast()
    }
}

impl RadioConfig {
    /// Meshtastic LongFast: SF11, 250 kHz, CR 4/5.
    pub const fn long_fast() -> Self {
        Self {
            spreading_factor: 11,
            bandwidth_khz: 250.0,
            coding_rate: 5,
            payload_bytes: 160,
            preamble_symbols: 8,
            crc_enabled: true,
            implicit_header: false,
        }
    }

    /// Check that the parameters are usable by the airtime formula.
    pub fn validate(&self) -> Result<()> {
        if !(7..=12).contains(&self.spreading_factor) {
            return Err(LoraError::InvalidSpreadingFactor(self.spreading_factor));
        }
        if !(self.bandwidth_khz > 0.0) {
            return Err(LoraError::InvalidBandwidth(self.bandwidth_khz));
        }
        Ok(())
    }

    /// Duration of one symbol in seconds.
    pub fn symbol_duration_s(&self) -> f64 {
        2.0_f64.powi(self.spreading_factor as i32) / (self.bandwidth_khz * 1000.0)
    }

    /// Whether low data rate optimization applies to these parameters.
    pub fn low_data_rate_optimize(&self) -> bool {
        self.symbol_duration_s() > LOW_DATA_RATE_SYMBOL_THRESHOLD_S
    }

    /// Number of payload symbols, including the fixed base.
    pub fn payload_symbols(&self) -> i64 {
        let sf = self.spreading_factor as i64;
        let de = self.low_data_rate_optimize() as i64;
        let crc = self.crc_enabled as i64;
        let ih = self.implicit_header as i64;
        // Out-of-range coding rates are pinned to 4/5..4/8.
        let cr = self.coding_rate.clamp(5, 8) as i64;

        let numerator = 8 * self.payload_bytes as i64 - 4 * sf + 28 + 16 * crc - 20 * ih;
        let denominator = 4 * (sf - 2 * de);
        let coded = (ceil_div(numerator, denominator) * cr).max(0);

        PAYLOAD_BASE_SYMBOLS + coded
    }

    /// Time on air in seconds. See [`estimate_airtime_seconds`].
    pub fn airtime_s(&self) -> Result<f64> {
        estimate_airtime_seconds(self)
    }
}

// ============================================================================
// PHY Calculations
// ============================================================================

/// Estimate LoRa time on air in seconds using the Semtech formula.
///
/// `T = (n_preamble + 4.25 + 8 + max(ceil((8PL - 4SF + 28 + 16CRC - 20IH) /
/// (4(SF - 2DE))) * CR, 0)) * 2^SF / BW`
pub fn estimate_airtime_seconds(radio: &RadioConfig) -> Result<f64> {
    radio.validate()?;

    let preamble = radio.preamble_symbols as f64 + PREAMBLE_OVERHEAD_SYMBOLS;
    let payload = radio.payload_symbols() as f64;

    Ok((preamble + payload) * radio.symbol_duration_s())
}

/// Integer ceiling division for a positive denominator.
fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    let quotient = numerator.div_euclid(denominator);
    if numerator.rem_euclid(denominator) == 0 {
        quotient
    } else {
        quotient + 1
    }
}
