// Copyright 2025-2026 CEMAXECUTER LLC

//! Startup configuration for an engine run.

use crate::control::{TuneParams, AGC_BANDWIDTHS, AGC_SET_POINT_MIN, AGC_SET_POINT_MAX, LNA_STATE_MAX};
use crate::transfer::SampleFormat;

/// Valid hardware decimation factors (1 = no decimation).
pub const DECIM_FACTORS: [u32; 6] = [1, 2, 4, 8, 16, 32];

/// Delivered per-tuner sample rate before decimation, in Hz. Both
/// master clock modes (6 MHz and 8 MHz ADC) down-convert to this.
pub const BASE_SAMPLE_RATE: u32 = 2_000_000;

const DEFAULT_MAX_TRANSFER_SIZE: usize = 10 * 1024;

/// Full engine configuration: the live-tunable fields plus the
/// start-only parameters that require a stream restart to change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// RF tuning frequency in Hz.
    pub tune_freq: f64,
    /// AGC loop bandwidth in Hz; 0, 5, 50, or 100.
    pub agc_bandwidth: u32,
    /// AGC set point in dBFS, in [-72, 0].
    pub agc_set_point: i32,
    /// LNA state in [0, 9] where 0 is maximum gain.
    pub lna_state: u32,
    /// Decimation factor; 1, 2, 4, 8, 16, or 32.
    pub decim_factor: u32,
    /// Front-end MW/FM notch filter.
    pub notch_mwfm: bool,
    /// Front-end DAB notch filter.
    pub notch_dab: bool,
    /// Use the maximum 8 MHz ADC master clock (12-bit resolution,
    /// slightly better anti-aliasing at the widest bandwidth) instead
    /// of the default 6 MHz clock (14-bit resolution).
    pub max_sample_rate: bool,
    /// USB bulk transfers instead of isochronous.
    pub usb_bulk_mode: bool,
    /// Enable driver debug output.
    pub api_debug: bool,
    /// Scalar format delivered to the transfer sink.
    pub format: SampleFormat,
    /// Maximum bytes per transfer; rounded down to a whole number of
    /// frames.
    pub max_transfer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tune_freq: 0.0,
            agc_bandwidth: 0,
            agc_set_point: -30,
            lna_state: 4,
            decim_factor: 1,
            notch_mwfm: false,
            notch_dab: false,
            max_sample_rate: false,
            usb_bulk_mode: false,
            api_debug: false,
            format: SampleFormat::Short,
            max_transfer_size: DEFAULT_MAX_TRANSFER_SIZE,
        }
    }
}

impl EngineConfig {
    /// Check every field against its accepted range. Startup fails on
    /// the first violation; nothing is clamped here.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.tune_freq > 0.0) {
            return Err(format!("tune frequency must be positive, got {}", self.tune_freq));
        }
        if !AGC_BANDWIDTHS.contains(&self.agc_bandwidth) {
            return Err(format!(
                "AGC bandwidth must be 0, 5, 50, or 100 Hz, got {}",
                self.agc_bandwidth
            ));
        }
        if self.agc_set_point < AGC_SET_POINT_MIN || self.agc_set_point > AGC_SET_POINT_MAX {
            return Err(format!(
                "AGC set point must be in [-72, 0] dBFS, got {}",
                self.agc_set_point
            ));
        }
        if self.lna_state > LNA_STATE_MAX {
            return Err(format!("LNA state must be in [0, 9], got {}", self.lna_state));
        }
        if !DECIM_FACTORS.contains(&self.decim_factor) {
            return Err(format!(
                "decimation factor must be one of 1, 2, 4, 8, 16, 32, got {}",
                self.decim_factor
            ));
        }
        if self.max_transfer_size < self.format.scalar_size() * 4 {
            return Err(format!(
                "max transfer size {} is smaller than one frame",
                self.max_transfer_size
            ));
        }
        Ok(())
    }

    /// Delivered sample rate per tuner in Hz after decimation.
    pub fn sample_rate(&self) -> u32 {
        BASE_SAMPLE_RATE / self.decim_factor
    }

    /// The live-tunable subset of this configuration.
    pub fn tune_params(&self) -> TuneParams {
        TuneParams {
            tune_freq: self.tune_freq,
            agc_bandwidth: self.agc_bandwidth,
            agc_set_point: self.agc_set_point,
            lna_state: self.lna_state,
            notch_mwfm: self.notch_mwfm,
            notch_dab: self.notch_dab,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> EngineConfig {
        EngineConfig {
            tune_freq: 97.3e6,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_defaults_match_engine_header() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.agc_bandwidth, 0);
        assert_eq!(cfg.agc_set_point, -30);
        assert_eq!(cfg.lna_state, 4);
        assert_eq!(cfg.decim_factor, 1);
        assert_eq!(cfg.max_transfer_size, 10 * 1024);
        assert_eq!(cfg.format, SampleFormat::Short);
    }

    #[test]
    fn test_validate_ranges() {
        assert!(valid().validate().is_ok());
        assert!(EngineConfig::default().validate().is_err()); // freq 0

        let mut cfg = valid();
        cfg.agc_set_point = 1;
        assert!(cfg.validate().is_err());
        cfg.agc_set_point = -73;
        assert!(cfg.validate().is_err());
        cfg.agc_set_point = -72;
        assert!(cfg.validate().is_ok());

        let mut cfg = valid();
        cfg.lna_state = 10;
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.decim_factor = 3;
        assert!(cfg.validate().is_err());
        cfg.decim_factor = 16;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_sample_rate_follows_decimation() {
        let mut cfg = valid();
        assert_eq!(cfg.sample_rate(), 2_000_000);
        cfg.decim_factor = 8;
        assert_eq!(cfg.sample_rate(), 250_000);
    }
}
