//! Per-link path parameters as stored by the ray tracer
//!
//! A shard stores one matrix per receiver, one column per path, with fixed
//! row semantics:
//!
//! | row | content                              |
//! |-----|--------------------------------------|
//! | 0   | phase (degrees)                      |
//! | 1   | time of arrival (seconds)            |
//! | 2   | received power (dBm)                 |
//! | 3   | arrival azimuth (degrees)            |
//! | 4   | arrival elevation (degrees)          |
//! | 5   | departure azimuth (degrees)          |
//! | 6   | departure elevation (degrees)        |
//! | 7   | line-of-sight flag                   |
//! | 8   | Doppler velocity (optional, m/s)     |
//! | 9   | Doppler acceleration (optional, m/s²)|

use common::dbm_to_linear;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Offset added to the stored dBm power before linearization
pub const POWER_NORMALIZATION_OFFSET_DB: f64 = 30.0;

/// Rows that every path matrix carries
const BASE_ROWS: usize = 8;

/// Rows of a path matrix with Doppler terms
const DOPPLER_ROWS: usize = 10;

/// Doppler terms of every path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DopplerTerms {
    /// Delay-rate velocity (m/s)
    pub velocity: Vec<f64>,
    /// Delay-rate acceleration (m/s²)
    pub acceleration: Vec<f64>,
}

/// Path parameters of one link
///
/// Angles are in degrees, power is linear and time of arrival in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PathRecord {
    pub power: Vec<f64>,
    pub phase: Vec<f64>,
    pub toa: Vec<f64>,
    pub dod_theta: Vec<f64>,
    pub dod_phi: Vec<f64>,
    pub doa_theta: Vec<f64>,
    pub doa_phi: Vec<f64>,
    pub los: Vec<bool>,
    /// Absent when the ray tracer ran without mobility
    pub doppler: Option<DopplerTerms>,
}

impl PathRecord {
    /// Parse a stored path matrix (rows x paths)
    pub fn from_matrix(matrix: ArrayView2<'_, f64>) -> Result<Self, String> {
        let (rows, paths) = matrix.dim();

        // Receivers without connectivity are stored as empty matrices
        if paths == 0 {
            return Ok(Self::default());
        }

        if rows < BASE_ROWS {
            return Err(format!(
                "expected at least {} rows, found {}",
                BASE_ROWS, rows
            ));
        }
        if rows > BASE_ROWS && rows < DOPPLER_ROWS {
            return Err(format!(
                "Doppler rows are incomplete: expected {} rows, found {}",
                DOPPLER_ROWS, rows
            ));
        }

        let row = |i: usize| matrix.row(i).to_vec();

        let doppler = if rows >= DOPPLER_ROWS {
            Some(DopplerTerms {
                velocity: row(8),
                acceleration: row(9),
            })
        } else {
            None
        };

        Ok(Self {
            phase: row(0),
            toa: row(1),
            power: matrix
                .row(2)
                .iter()
                .map(|&dbm| dbm_to_linear(dbm + POWER_NORMALIZATION_OFFSET_DB))
                .collect(),
            doa_phi: row(3),
            doa_theta: row(4),
            dod_phi: row(5),
            dod_theta: row(6),
            los: matrix.row(7).iter().map(|&flag| flag != 0.0).collect(),
            doppler,
        })
    }

    /// Inverse of [`PathRecord::from_matrix`], used when writing shards
    pub fn to_matrix(&self) -> Array2<f64> {
        let paths = self.num_paths();
        let rows = if self.doppler.is_some() { DOPPLER_ROWS } else { BASE_ROWS };
        let mut matrix = Array2::zeros((rows, paths));

        for p in 0..paths {
            matrix[[0, p]] = self.phase[p];
            matrix[[1, p]] = self.toa[p];
            matrix[[2, p]] = common::linear_to_dbm(self.power[p]) - POWER_NORMALIZATION_OFFSET_DB;
            matrix[[3, p]] = self.doa_phi[p];
            matrix[[4, p]] = self.doa_theta[p];
            matrix[[5, p]] = self.dod_phi[p];
            matrix[[6, p]] = self.dod_theta[p];
            matrix[[7, p]] = if self.los[p] { 1.0 } else { 0.0 };
            if let Some(doppler) = &self.doppler {
                matrix[[8, p]] = doppler.velocity[p];
                matrix[[9, p]] = doppler.acceleration[p];
            }
        }

        matrix
    }

    /// Number of paths
    pub fn num_paths(&self) -> usize {
        self.power.len()
    }

    /// Check that every per-path sequence has the same length
    pub fn validate(&self) -> Result<(), String> {
        let n = self.num_paths();
        let lengths = [
            ("phase", self.phase.len()),
            ("toa", self.toa.len()),
            ("dod_theta", self.dod_theta.len()),
            ("dod_phi", self.dod_phi.len()),
            ("doa_theta", self.doa_theta.len()),
            ("doa_phi", self.doa_phi.len()),
            ("los", self.los.len()),
        ];
        for (name, len) in lengths {
            if len != n {
                return Err(format!("'{}' has {} entries, expected {}", name, len, n));
            }
        }
        if let Some(doppler) = &self.doppler {
            if doppler.velocity.len() != n || doppler.acceleration.len() != n {
                return Err(format!(
                    "Doppler terms have {}/{} entries, expected {}",
                    doppler.velocity.len(),
                    doppler.acceleration.len(),
                    n
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_matrix_without_doppler() {
        let matrix = array![
            [10.0, -20.0],
            [1e-7, 2e-7],
            [-30.0, -40.0],
            [0.0, 45.0],
            [90.0, 80.0],
            [10.0, 20.0],
            [95.0, 85.0],
            [1.0, 0.0],
        ];
        let record = PathRecord::from_matrix(matrix.view()).unwrap();

        assert_eq!(record.num_paths(), 2);
        assert_eq!(record.phase, vec![10.0, -20.0]);
        assert!((record.power[0] - 1e-3).abs() < 1e-15);
        assert!((record.power[1] - 1e-4).abs() < 1e-15);
        assert_eq!(record.doa_phi, vec![0.0, 45.0]);
        assert_eq!(record.dod_theta, vec![95.0, 85.0]);
        assert_eq!(record.los, vec![true, false]);
        assert!(record.doppler.is_none());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_from_matrix_with_doppler() {
        let mut matrix = Array2::<f64>::zeros((10, 3));
        matrix.row_mut(8).fill(5.0);
        matrix.row_mut(9).fill(-0.5);
        let record = PathRecord::from_matrix(matrix.view()).unwrap();

        let doppler = record.doppler.unwrap();
        assert_eq!(doppler.velocity, vec![5.0; 3]);
        assert_eq!(doppler.acceleration, vec![-0.5; 3]);
    }

    #[test]
    fn test_empty_matrix_has_no_paths() {
        let matrix = Array2::<f64>::zeros((0, 0));
        let record = PathRecord::from_matrix(matrix.view()).unwrap();
        assert_eq!(record.num_paths(), 0);

        let matrix = Array2::<f64>::zeros((8, 0));
        assert_eq!(PathRecord::from_matrix(matrix.view()).unwrap().num_paths(), 0);
    }

    #[test]
    fn test_malformed_matrix() {
        let short = Array2::<f64>::zeros((5, 2));
        assert!(PathRecord::from_matrix(short.view()).is_err());

        let partial_doppler = Array2::<f64>::zeros((9, 2));
        assert!(PathRecord::from_matrix(partial_doppler.view()).is_err());
    }

    #[test]
    fn test_matrix_inverse() {
        let record = PathRecord {
            power: vec![1.0, 0.25],
            phase: vec![0.0, 30.0],
            toa: vec![0.0, 1e-6],
            dod_theta: vec![90.0, 60.0],
            dod_phi: vec![0.0, -30.0],
            doa_theta: vec![90.0, 120.0],
            doa_phi: vec![180.0, 10.0],
            los: vec![true, false],
            doppler: None,
        };
        let back = PathRecord::from_matrix(record.to_matrix().view()).unwrap();

        assert_eq!(back.los, record.los);
        for (a, b) in back.power.iter().zip(&record.power) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_validate_length_mismatch() {
        let record = PathRecord {
            power: vec![1.0, 1.0],
            phase: vec![0.0],
            ..Default::default()
        };
        let err = record.validate().unwrap_err();
        assert!(err.contains("phase"));
    }
}
