// Copyright 2025-2026 CEMAXECUTER LLC

//! Argument value parsers. Frequencies take decimal k/M/G suffixes,
//! sizes take binary K/M/G suffixes, and the tuner parameters are
//! range-checked here so bad values fail at the command line instead
//! of at device bring-up.

/// Parses a frequency in Hz. A trailing `k`, `M`, or `G` (either case)
/// scales by 1e3, 1e6, or 1e9, so `1.42G` is 1.42 GHz.
pub fn parse_frequency(arg: &str) -> Result<f64, String> {
    let (num, mult) = match arg.chars().last() {
        Some('k') | Some('K') => (&arg[..arg.len() - 1], 1e3),
        Some('m') | Some('M') => (&arg[..arg.len() - 1], 1e6),
        Some('g') | Some('G') => (&arg[..arg.len() - 1], 1e9),
        _ => (arg, 1.0),
    };
    let freq: f64 = num
        .parse()
        .map_err(|_| format!("invalid frequency [{}]", arg))?;
    Ok(freq * mult)
}

/// Parses a byte count. A trailing `k`, `M`, or `G` (either case)
/// scales by 1024, 1024^2, or 1024^3.
pub fn parse_size(arg: &str) -> Result<u64, String> {
    let (num, mult) = match arg.chars().last() {
        Some('k') | Some('K') => (&arg[..arg.len() - 1], 1u64 << 10),
        Some('m') | Some('M') => (&arg[..arg.len() - 1], 1u64 << 20),
        Some('g') | Some('G') => (&arg[..arg.len() - 1], 1u64 << 30),
        _ => (arg, 1),
    };
    let size: u64 = num.parse().map_err(|_| format!("invalid size [{}]", arg))?;
    size.checked_mul(mult)
        .ok_or_else(|| format!("size [{}] overflows", arg))
}

pub fn parse_agc_bandwidth(arg: &str) -> Result<u32, String> {
    let bw: u32 = arg
        .parse()
        .map_err(|_| "AGC loop bandwidth must be an unsigned int".to_string())?;
    match bw {
        0 | 5 | 50 | 100 => Ok(bw),
        _ => Err("AGC loop bandwidth must be 0, 5, 50, or 100".to_string()),
    }
}

pub fn parse_agc_set_point(arg: &str) -> Result<i32, String> {
    let set_point: i32 = arg
        .parse()
        .map_err(|_| "AGC set point must be an int".to_string())?;
    if !(-72..=0).contains(&set_point) {
        return Err("AGC set point must be in [-72-0] dBFS".to_string());
    }
    Ok(set_point)
}

pub fn parse_lna_state(arg: &str) -> Result<u32, String> {
    let state: u32 = arg
        .parse()
        .map_err(|_| "LNA state must be an unsigned int".to_string())?;
    if state > 9 {
        return Err("LNA state must be in [0-9]".to_string());
    }
    Ok(state)
}

pub fn parse_decim_factor(arg: &str) -> Result<u32, String> {
    let factor: u32 = arg
        .parse()
        .map_err(|_| "decimation factor must be an unsigned int".to_string())?;
    match factor {
        1 | 2 | 4 | 8 | 16 | 32 => Ok(factor),
        _ => Err("decimation factor must be in [1,2,4,8,16,32]".to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotchFilter {
    Mwfm,
    Dab,
}

pub fn parse_notch(arg: &str) -> Result<NotchFilter, String> {
    match arg {
        "mwfm" => Ok(NotchFilter::Mwfm),
        "dab" => Ok(NotchFilter::Dab),
        other => Err(format!("invalid notch filter name [{}]", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_suffixes() {
        assert_eq!(parse_frequency("1000").unwrap(), 1000.0);
        assert_eq!(parse_frequency("146.52M").unwrap(), 146_520_000.0);
        assert_eq!(parse_frequency("446k").unwrap(), 446_000.0);
        assert_eq!(parse_frequency("1.42G").unwrap(), 1_420_000_000.0);
        assert_eq!(parse_frequency("1.42g").unwrap(), 1_420_000_000.0);
        assert!(parse_frequency("abc").is_err());
        assert!(parse_frequency("1.42X").is_err());
    }

    #[test]
    fn test_size_suffixes() {
        assert_eq!(parse_size("10240").unwrap(), 10240);
        assert_eq!(parse_size("10K").unwrap(), 10 * 1024);
        assert_eq!(parse_size("10M").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_size("4G").unwrap(), 4 * 1024 * 1024 * 1024);
        assert!(parse_size("ten").is_err());
        // fractional sizes are not accepted
        assert!(parse_size("1.5M").is_err());
    }

    #[test]
    fn test_agc_bandwidth_values() {
        for ok in ["0", "5", "50", "100"] {
            assert!(parse_agc_bandwidth(ok).is_ok());
        }
        assert!(parse_agc_bandwidth("10").is_err());
        assert!(parse_agc_bandwidth("-5").is_err());
    }

    #[test]
    fn test_agc_set_point_range() {
        assert_eq!(parse_agc_set_point("-30").unwrap(), -30);
        assert_eq!(parse_agc_set_point("0").unwrap(), 0);
        assert_eq!(parse_agc_set_point("-72").unwrap(), -72);
        assert!(parse_agc_set_point("1").is_err());
        assert!(parse_agc_set_point("-73").is_err());
    }

    #[test]
    fn test_lna_state_range() {
        assert_eq!(parse_lna_state("0").unwrap(), 0);
        assert_eq!(parse_lna_state("9").unwrap(), 9);
        assert!(parse_lna_state("10").is_err());
    }

    #[test]
    fn test_decim_factors() {
        for ok in ["1", "2", "4", "8", "16", "32"] {
            assert!(parse_decim_factor(ok).is_ok());
        }
        assert!(parse_decim_factor("3").is_err());
        assert!(parse_decim_factor("64").is_err());
    }

    #[test]
    fn test_notch_names() {
        assert_eq!(parse_notch("mwfm").unwrap(), NotchFilter::Mwfm);
        assert_eq!(parse_notch("dab").unwrap(), NotchFilter::Dab);
        assert!(parse_notch("am").is_err());
    }
}
