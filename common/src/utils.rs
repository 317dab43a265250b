//! Common Utilities
//!
//! Physical constants and unit conversions used across the synthesis engine

use tracing::trace;

/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Wavelength in meters for a carrier frequency in Hz
pub fn wavelength(carrier_freq: f64) -> f64 {
    SPEED_OF_LIGHT / carrier_freq
}

/// Convert dBm to linear power in watts
pub fn dbm_to_linear(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0 - 3.0)
}

/// Convert linear power in watts to dBm
pub fn linear_to_dbm(watts: f64) -> f64 {
    10.0 * (watts.log10() + 3.0)
}

/// Baseband frequencies of the selected OFDM subcarriers
///
/// Subcarrier `k` sits at `k * bandwidth / total_subcarriers`; no centering
/// around DC is applied.
pub fn ofdm_subcarrier_frequencies(
    bandwidth_hz: f64,
    selected: &[usize],
    total_subcarriers: usize,
) -> Vec<f64> {
    let spacing = bandwidth_hz / total_subcarriers as f64;
    trace!(
        "Subcarrier spacing {:.3} Hz for {} Hz over {} subcarriers",
        spacing,
        bandwidth_hz,
        total_subcarriers
    );

    selected.iter().map(|&k| spacing * k as f64).collect()
}

/// Format a value with the closest SI prefix, e.g. `15.000 MHz`
pub fn format_with_si_prefix(value: f64, unit: &str) -> String {
    const PREFIXES: [(f64, &str); 9] = [
        (1e12, "T"),
        (1e9, "G"),
        (1e6, "M"),
        (1e3, "k"),
        (1.0, ""),
        (1e-3, "m"),
        (1e-6, "µ"),
        (1e-9, "n"),
        (1e-12, "p"),
    ];

    for (factor, prefix) in PREFIXES {
        if value.abs() >= factor {
            return format!("{:.3} {}{}", value / factor, prefix, unit);
        }
    }

    format!("{} {}", value, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dbm_conversion() {
        // 30 dBm is one watt
        assert!((dbm_to_linear(30.0) - 1.0).abs() < 1e-12);
        assert!((dbm_to_linear(0.0) - 1e-3).abs() < 1e-15);
        assert!((linear_to_dbm(1.0) - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_subcarrier_frequencies() {
        let freqs = ofdm_subcarrier_frequencies(50e6, &[0, 1, 64], 512);
        assert_eq!(freqs.len(), 3);
        assert_eq!(freqs[0], 0.0);
        assert!((freqs[1] - 97_656.25).abs() < 1e-6);
        assert!((freqs[2] - 6_250_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_si_prefix() {
        assert_eq!(format_with_si_prefix(15e6, "Hz"), "15.000 MHz");
        assert_eq!(format_with_si_prefix(15e12, "Hz/s"), "15.000 THz/s");
        assert_eq!(format_with_si_prefix(34.1e-6, "s"), "34.100 µs");
        assert_eq!(format_with_si_prefix(0.0, "s"), "0 s");
    }

    #[test]
    fn test_wavelength() {
        assert!((wavelength(28e9) - 0.010706873).abs() < 1e-9);
    }
}
