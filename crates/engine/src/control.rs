// Copyright 2025-2026 CEMAXECUTER LLC

//! Live-tunable parameter snapshots and the minimal-diff logic.
//!
//! Each control cycle compares the applied snapshot (read back from
//! the device) against the desired snapshot (mutated by the caller's
//! control hook) and reports exactly which hardware update calls are
//! needed. The grouping follows the hardware update-call boundaries:
//! AGC bandwidth and set point share one register write, everything
//! else is independent.

/// Valid AGC loop bandwidths in Hz; 0 disables the AGC.
pub const AGC_BANDWIDTHS: [u32; 4] = [0, 5, 50, 100];

/// AGC set point range in dBFS.
pub const AGC_SET_POINT_MIN: i32 = -72;
pub const AGC_SET_POINT_MAX: i32 = 0;

/// Maximum LNA gain-reduction state (0 is maximum gain).
pub const LNA_STATE_MAX: u32 = 9;

/// Snapshot of every live-tunable field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuneParams {
    /// RF tuning frequency in Hz.
    pub tune_freq: f64,
    /// AGC loop bandwidth in Hz (0 = disabled).
    pub agc_bandwidth: u32,
    /// AGC set point in dBFS.
    pub agc_set_point: i32,
    /// LNA gain-reduction state in [0, 9].
    pub lna_state: u32,
    /// MW/FM broadcast-band notch filter.
    pub notch_mwfm: bool,
    /// DAB-band notch filter.
    pub notch_dab: bool,
}

/// One category per hardware update call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateCategory {
    TuneFreq,
    Agc,
    LnaState,
    NotchMwfm,
    NotchDab,
}

/// Pure diff: which update calls does moving from `applied` to
/// `desired` require. Returns an empty vec when nothing changed.
pub fn diff_params(applied: &TuneParams, desired: &TuneParams) -> Vec<UpdateCategory> {
    let mut updates = Vec::new();
    if applied == desired {
        return updates;
    }
    if applied.tune_freq != desired.tune_freq {
        updates.push(UpdateCategory::TuneFreq);
    }
    if applied.agc_bandwidth != desired.agc_bandwidth
        || applied.agc_set_point != desired.agc_set_point
    {
        updates.push(UpdateCategory::Agc);
    }
    if applied.lna_state != desired.lna_state {
        updates.push(UpdateCategory::LnaState);
    }
    if applied.notch_mwfm != desired.notch_mwfm {
        updates.push(UpdateCategory::NotchMwfm);
    }
    if applied.notch_dab != desired.notch_dab {
        updates.push(UpdateCategory::NotchDab);
    }
    updates
}

/// Validate a desired snapshot before it is applied.
///
/// Out-of-range frequency and AGC set point revert to the applied
/// value; an out-of-range LNA state clamps to the maximum and an
/// unknown AGC bandwidth degrades to disabled. Every rejection
/// produces a diagnostic for the message sink.
pub fn sanitize_params(desired: &mut TuneParams, applied: &TuneParams) -> Vec<String> {
    let mut msgs = Vec::new();

    if !(desired.tune_freq > 0.0) {
        msgs.push(format!(
            "invalid tune frequency [{}], keeping {} Hz",
            desired.tune_freq, applied.tune_freq
        ));
        desired.tune_freq = applied.tune_freq;
    }

    if !AGC_BANDWIDTHS.contains(&desired.agc_bandwidth) {
        msgs.push(format!(
            "invalid AGC bandwidth [{}], AGC disabled",
            desired.agc_bandwidth
        ));
        desired.agc_bandwidth = 0;
    }

    if desired.agc_set_point < AGC_SET_POINT_MIN || desired.agc_set_point > AGC_SET_POINT_MAX {
        msgs.push(format!(
            "invalid AGC set point [{}], keeping {} dBFS",
            desired.agc_set_point, applied.agc_set_point
        ));
        desired.agc_set_point = applied.agc_set_point;
    }

    if desired.lna_state > LNA_STATE_MAX {
        msgs.push(format!(
            "invalid LNA state [{}], clamping to {}",
            desired.lna_state, LNA_STATE_MAX
        ));
        desired.lna_state = LNA_STATE_MAX;
    }

    msgs
}
