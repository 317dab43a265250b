//! Scenario-wide ray-tracing parameters
//!
//! Stored once per scenario as `params.mat` next to the scene directories.
//! The MAT-file keys follow the ray tracer's export: `carrier_freq`,
//! `transmit_power`, `num_BS`, `user_grids`, `doppler_available` and
//! `dual_polar_available`, all of them required.

use crate::format::{mat_variable, ShardDocument};
use crate::mat::{MatFile, MatValue};
use crate::{RayTraceError, RayTraceResult, ShardFormat};
use common::format_with_si_prefix;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Base name of the parameter file
pub const PARAMS_FILE_STEM: &str = "params";

/// Parameters the ray tracer ran with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParams {
    /// Carrier frequency (Hz)
    pub carrier_freq: f64,
    /// Transmit power (dBm)
    #[serde(default)]
    pub transmit_power: f64,
    /// Number of base stations
    pub num_bs: usize,
    /// User grids as (first row, last row, users per row)
    #[serde(default)]
    pub user_grids: Vec<[usize; 3]>,
    /// Whether the shards carry Doppler rows
    #[serde(default)]
    pub doppler_enabled: bool,
    #[serde(default)]
    pub polarization_enabled: bool,
}

impl ScenarioParams {
    /// Location of the parameter file inside a scenario directory
    pub fn file_path(scenario_dir: &Path, format: ShardFormat) -> PathBuf {
        scenario_dir.join(format!("{}.{}", PARAMS_FILE_STEM, format.extension()))
    }

    /// Load and validate the parameters of a scenario
    pub fn load(scenario_dir: &Path, format: ShardFormat) -> RayTraceResult<Self> {
        let path = Self::file_path(scenario_dir, format);
        let params: Self = format.read(&path)?;
        params.validate().map_err(|reason| RayTraceError::InvalidScenario {
            path: path.clone(),
            reason,
        })?;

        info!("Loaded scenario parameters from {}: {}", path.display(), params);
        Ok(params)
    }

    /// Write the parameters of a scenario
    pub fn save(&self, scenario_dir: &Path, format: ShardFormat) -> RayTraceResult<()> {
        format.write(&Self::file_path(scenario_dir, format), self)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.carrier_freq.is_finite() || self.carrier_freq <= 0.0 {
            return Err(format!(
                "carrier frequency must be positive, got {}",
                self.carrier_freq
            ));
        }
        if self.num_bs == 0 {
            return Err("scenario has no base stations".to_string());
        }
        for grid in &self.user_grids {
            if grid[1] < grid[0] {
                return Err(format!("user grid rows {}-{} are reversed", grid[0], grid[1]));
            }
        }
        Ok(())
    }

    /// Total number of users over all grids
    pub fn num_users(&self) -> usize {
        self.user_grids
            .iter()
            .map(|[first, last, per_row]| (last - first + 1) * per_row)
            .sum()
    }
}

/// Non-negative integer stored as a MATLAB double
fn mat_count(value: f64) -> Option<usize> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0).then_some(value as usize)
}

impl ShardDocument for ScenarioParams {
    fn from_mat(file: &MatFile, path: &Path) -> RayTraceResult<Self> {
        let invalid = |reason: String| RayTraceError::InvalidScenario {
            path: path.to_path_buf(),
            reason,
        };
        let scalar = |name: &str| -> RayTraceResult<f64> {
            mat_variable(file, name, path)?
                .scalar_value()
                .ok_or_else(|| invalid(format!("'{}' is not a numeric scalar", name)))
        };

        let num_bs = scalar("num_BS")?;
        let num_bs = mat_count(num_bs)
            .ok_or_else(|| invalid(format!("num_BS must be a whole number, got {}", num_bs)))?;

        let grids = mat_variable(file, "user_grids", path)?
            .to_array2()
            .map_err(|e| invalid(format!("user_grids: {}", e)))?;
        if grids.nrows() > 0 && grids.ncols() != 3 {
            return Err(invalid(format!(
                "user_grids has {} columns, expected 3",
                grids.ncols()
            )));
        }
        let user_grids = grids
            .rows()
            .into_iter()
            .map(|row| match (mat_count(row[0]), mat_count(row[1]), mat_count(row[2])) {
                (Some(first), Some(last), Some(per_row)) => Ok([first, last, per_row]),
                _ => Err(invalid(format!("user grid {} is not whole numbers", row))),
            })
            .collect::<RayTraceResult<Vec<_>>>()?;

        Ok(Self {
            carrier_freq: scalar("carrier_freq")?,
            transmit_power: scalar("transmit_power")?,
            num_bs,
            user_grids,
            doppler_enabled: scalar("doppler_available")? != 0.0,
            polarization_enabled: scalar("dual_polar_available")? != 0.0,
        })
    }

    fn to_mat(&self) -> MatFile {
        let mut grids = Array2::zeros((self.user_grids.len(), 3));
        for (mut row, grid) in grids.rows_mut().into_iter().zip(&self.user_grids) {
            row.assign(&ndarray::aview1(&grid.map(|v| v as f64)[..]));
        }
        let flag = |enabled: bool| MatValue::scalar(if enabled { 1.0 } else { 0.0 });

        let mut file = MatFile::new();
        file.insert("carrier_freq", MatValue::scalar(self.carrier_freq));
        file.insert("transmit_power", MatValue::scalar(self.transmit_power));
        file.insert("num_BS", MatValue::scalar(self.num_bs as f64));
        file.insert("user_grids", MatValue::matrix(&grids));
        file.insert("doppler_available", flag(self.doppler_enabled));
        file.insert("dual_polar_available", flag(self.polarization_enabled));
        file
    }
}

impl fmt::Display for ScenarioParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "carrier {}, {} base stations, {} users, Tx power {:.1} dBm, Doppler {}",
            format_with_si_prefix(self.carrier_freq, "Hz"),
            self.num_bs,
            self.num_users(),
            self.transmit_power,
            if self.doppler_enabled { "on" } else { "off" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ScenarioParams {
        ScenarioParams {
            carrier_freq: 28e9,
            transmit_power: 30.0,
            num_bs: 3,
            user_grids: vec![[1, 10, 50], [11, 12, 5]],
            doppler_enabled: true,
            polarization_enabled: false,
        }
    }

    #[test]
    fn test_num_users() {
        assert_eq!(params().num_users(), 510);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        for format in [ShardFormat::Mat, ShardFormat::Bincode, ShardFormat::Json] {
            params().save(dir.path(), format).unwrap();
            assert_eq!(ScenarioParams::load(dir.path(), format).unwrap(), params());
        }
    }

    #[test]
    fn test_optional_fields_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("params.json"),
            r#"{"carrier_freq": 3.5e9, "num_bs": 1}"#,
        )
        .unwrap();

        let loaded = ScenarioParams::load(dir.path(), ShardFormat::Json).unwrap();
        assert!(!loaded.doppler_enabled);
        assert!(loaded.user_grids.is_empty());
    }

    #[test]
    fn test_invalid_carrier() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad = params();
        bad.carrier_freq = 0.0;
        bad.save(dir.path(), ShardFormat::Json).unwrap();

        let err = ScenarioParams::load(dir.path(), ShardFormat::Json).unwrap_err();
        assert!(matches!(err, RayTraceError::InvalidScenario { .. }));
    }

    #[test]
    fn test_mat_keys() {
        let dir = tempfile::tempdir().unwrap();
        params().save(dir.path(), ShardFormat::default()).unwrap();
        assert!(dir.path().join("params.mat").exists());

        let bytes = std::fs::read(dir.path().join("params.mat")).unwrap();
        let file = MatFile::parse(&bytes).unwrap();
        assert_eq!(file.get("num_BS").unwrap().scalar_value(), Some(3.0));
        assert_eq!(file.get("user_grids").unwrap().dims(), &[2, 3]);
        assert_eq!(file.get("doppler_available").unwrap().scalar_value(), Some(1.0));
    }

    #[test]
    fn test_mat_requires_every_key() {
        let path = Path::new("params.mat");
        let mut file = params().to_mat();
        file.insert("num_BS", MatValue::scalar(2.5));
        let err = ScenarioParams::from_mat(&file, path).unwrap_err();
        assert!(matches!(err, RayTraceError::InvalidScenario { .. }));

        let mut partial = MatFile::new();
        for name in params().to_mat().names().filter(|&n| n != "dual_polar_available") {
            partial.insert(name, params().to_mat().get(name).unwrap().clone());
        }
        let err = ScenarioParams::from_mat(&partial, path).unwrap_err();
        assert!(
            matches!(err, RayTraceError::MissingField { ref field, .. } if field == "dual_polar_available")
        );
    }
}
