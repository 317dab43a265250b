//! Common Types for channel synthesis
//!
//! Defines fundamental types shared by the ray-tracing loader and the synthesis engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum directivity of a half-wave dipole (linear)
pub const HALFWAVE_DIPOLE_MAX_GAIN: f64 = 1.6409223769;

/// Line-of-sight status of a generated link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LosStatus {
    /// No path survived, there is no channel
    #[default]
    NoPath,
    /// Only reflected/diffracted paths
    NonLos,
    /// At least one line-of-sight path
    Los,
}

impl LosStatus {
    /// Derive the status from the LoS flags of the surviving paths
    pub fn from_flags(flags: &[bool]) -> Self {
        if flags.is_empty() {
            LosStatus::NoPath
        } else if flags.iter().any(|&los| los) {
            LosStatus::Los
        } else {
            LosStatus::NonLos
        }
    }

    /// Integer code used by dataset consumers (-1, 0, 1)
    pub fn code(&self) -> i8 {
        match self {
            LosStatus::NoPath => -1,
            LosStatus::NonLos => 0,
            LosStatus::Los => 1,
        }
    }
}

/// Error returned for an unknown radiation-pattern identifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported antenna radiation pattern: '{0}'")]
pub struct UnsupportedPattern(pub String);

/// Element radiation pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum RadiationPattern {
    /// Unit gain in every direction
    #[default]
    Isotropic,
    /// Half-wave dipole aligned with the z axis
    HalfwaveDipole,
}

impl RadiationPattern {
    /// Identifier as written in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            RadiationPattern::Isotropic => "isotropic",
            RadiationPattern::HalfwaveDipole => "halfwave-dipole",
        }
    }

    /// Linear power gain towards zenith angle `theta` (radians)
    pub fn gain(&self, theta: f64) -> f64 {
        match self {
            RadiationPattern::Isotropic => 1.0,
            RadiationPattern::HalfwaveDipole => {
                let sin_theta = theta.sin();
                if theta == 0.0 || sin_theta == 0.0 {
                    return 0.0;
                }
                let lobe = (std::f64::consts::FRAC_PI_2 * theta.cos()).cos();
                HALFWAVE_DIPOLE_MAX_GAIN * lobe * lobe / (sin_theta * sin_theta)
            }
        }
    }

    /// True when the pattern leaves path power untouched
    pub fn is_isotropic(&self) -> bool {
        matches!(self, RadiationPattern::Isotropic)
    }
}

impl FromStr for RadiationPattern {
    type Err = UnsupportedPattern;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "isotropic" => Ok(RadiationPattern::Isotropic),
            "halfwave-dipole" | "halfwave_dipole" => Ok(RadiationPattern::HalfwaveDipole),
            _ => Err(UnsupportedPattern(s.to_string())),
        }
    }
}

impl TryFrom<String> for RadiationPattern {
    type Error = UnsupportedPattern;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RadiationPattern> for String {
    fn from(pattern: RadiationPattern) -> Self {
        pattern.as_str().to_string()
    }
}

impl fmt::Display for RadiationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cartesian position in scenario coordinates (meters)
pub type Position = [f64; 3];

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_los_status_from_flags() {
        assert_eq!(LosStatus::from_flags(&[]), LosStatus::NoPath);
        assert_eq!(LosStatus::from_flags(&[false, false]), LosStatus::NonLos);
        assert_eq!(LosStatus::from_flags(&[false, true]), LosStatus::Los);
        assert_eq!(LosStatus::NoPath.code(), -1);
        assert_eq!(LosStatus::Los.code(), 1);
    }

    #[test]
    fn test_pattern_parsing() {
        assert_eq!("isotropic".parse::<RadiationPattern>().unwrap(), RadiationPattern::Isotropic);
        assert_eq!("Halfwave-Dipole".parse::<RadiationPattern>().unwrap(), RadiationPattern::HalfwaveDipole);
        assert!("patch".parse::<RadiationPattern>().is_err());
    }

    #[test]
    fn test_dipole_gain() {
        let broadside = RadiationPattern::HalfwaveDipole.gain(FRAC_PI_2);
        assert!((broadside - HALFWAVE_DIPOLE_MAX_GAIN).abs() < 1e-12);
        assert_eq!(RadiationPattern::HalfwaveDipole.gain(0.0), 0.0);
        assert_eq!(RadiationPattern::Isotropic.gain(0.3), 1.0);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(LosStatus::default(), LosStatus::NoPath);
        assert_eq!(RadiationPattern::default(), RadiationPattern::Isotropic);
        assert!(RadiationPattern::default().is_isotropic());
    }
}
