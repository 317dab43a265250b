//! Antenna Array Model
//!
//! Implements rectangular antenna arrays: element grid, steering vectors,
//! Euler rotation of path angles and field-of-view inclusion. Also provides
//! the factory that builds one array per base station or user from a
//! template and a rotation mode.

use crate::SynthError;
use common::RadiationPattern;
use ndarray::Array2;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

fn default_spacing() -> f64 {
    0.5
}

/// Configuration of one antenna array
///
/// Rotation and field of view are in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntennaArrayConfig {
    /// Element count along x, y and z
    pub shape: [usize; 3],
    /// Element spacing (wavelengths)
    #[serde(default = "default_spacing")]
    pub spacing: f64,
    /// Euler angles (gamma, beta, alpha)
    #[serde(default)]
    pub rotation: Option<[f64; 3]>,
    /// Azimuth and elevation extents, unbounded when absent
    #[serde(default)]
    pub fov: Option<[f64; 2]>,
    #[serde(default)]
    pub radiation_pattern: RadiationPattern,
}

impl AntennaArrayConfig {
    /// Single isotropic element without rotation or field of view
    pub fn single_element() -> Self {
        Self {
            shape: [1, 1, 1],
            spacing: default_spacing(),
            rotation: None,
            fov: None,
            radiation_pattern: RadiationPattern::Isotropic,
        }
    }

    pub fn validate(&self) -> Result<(), SynthError> {
        if self.shape.iter().any(|&n| n == 0) {
            return Err(SynthError::InvalidConfiguration(format!(
                "antenna shape entries must be at least 1, got {:?}",
                self.shape
            )));
        }
        if !self.spacing.is_finite() || self.spacing <= 0.0 {
            return Err(SynthError::InvalidConfiguration(format!(
                "antenna spacing must be positive, got {}",
                self.spacing
            )));
        }
        if let Some(rotation) = self.rotation {
            if rotation.iter().any(|r| !r.is_finite()) {
                return Err(SynthError::InvalidRotation(format!("{:?}", rotation)));
            }
        }
        if let Some(fov) = self.fov {
            if fov.iter().any(|f| !f.is_finite() || *f < 0.0) {
                return Err(SynthError::InvalidConfiguration(format!(
                    "field of view extents must be non-negative, got {:?}",
                    fov
                )));
            }
        }
        Ok(())
    }
}

/// Rectangular antenna array
///
/// Immutable once built; shared between channels through `Arc`.
#[derive(Debug, Clone)]
pub struct AntennaArray {
    config: AntennaArrayConfig,
    /// One row per element: (ix, iy, iz), x fastest
    element_indices: Array2<usize>,
    /// Euler angles in radians
    rotation: Option<[f64; 3]>,
    /// Half extents in radians
    half_fov: Option<[f64; 2]>,
}

impl AntennaArray {
    pub fn new(config: AntennaArrayConfig) -> Result<Self, SynthError> {
        config.validate()?;

        let [nx, ny, nz] = config.shape;
        let mut element_indices = Array2::zeros((nx * ny * nz, 3));
        let mut row = 0;
        for iz in 0..nz {
            for iy in 0..ny {
                for ix in 0..nx {
                    element_indices[[row, 0]] = ix;
                    element_indices[[row, 1]] = iy;
                    element_indices[[row, 2]] = iz;
                    row += 1;
                }
            }
        }

        let rotation = config.rotation.map(|r| r.map(f64::to_radians));
        let half_fov = config.fov.map(|f| f.map(|extent| extent.to_radians() / 2.0));

        Ok(Self {
            config,
            element_indices,
            rotation,
            half_fov,
        })
    }

    pub fn config(&self) -> &AntennaArrayConfig {
        &self.config
    }

    pub fn num_elements(&self) -> usize {
        self.element_indices.nrows()
    }

    pub fn shape(&self) -> [usize; 3] {
        self.config.shape
    }

    pub fn radiation_pattern(&self) -> RadiationPattern {
        self.config.radiation_pattern
    }

    pub fn has_rotation(&self) -> bool {
        self.rotation.is_some()
    }

    pub fn has_fov(&self) -> bool {
        self.half_fov.is_some()
    }

    /// Element grid, one (ix, iy, iz) row per element
    pub fn element_indices(&self) -> &Array2<usize> {
        &self.element_indices
    }

    /// Steering vectors for the given angles (radians)
    ///
    /// Returns an (elements, paths) matrix of unit-magnitude phasors.
    pub fn array_response(&self, theta: &[f64], phi: &[f64]) -> Array2<Complex64> {
        let kd = 2.0 * PI * self.config.spacing;
        let num_paths = theta.len().min(phi.len());
        let mut response = Array2::zeros((self.num_elements(), num_paths));

        for p in 0..num_paths {
            let (sin_theta, cos_theta) = theta[p].sin_cos();
            let (sin_phi, cos_phi) = phi[p].sin_cos();
            let direction = [sin_theta * cos_phi, sin_theta * sin_phi, cos_theta];

            for (e, idx) in self.element_indices.outer_iter().enumerate() {
                let phase = kd
                    * (idx[0] as f64 * direction[0]
                        + idx[1] as f64 * direction[1]
                        + idx[2] as f64 * direction[2]);
                response[[e, p]] = Complex64::from_polar(1.0, phase);
            }
        }

        response
    }

    /// Rotate zenith/azimuth angles (radians) into the array frame
    ///
    /// Gamma rolls about boresight, beta tilts in elevation and alpha sets
    /// the azimuth heading. Without a rotation the angles are returned as is.
    pub fn apply_rotation(&self, theta: &[f64], phi: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let Some([gamma, beta, alpha]) = self.rotation else {
            return (theta.to_vec(), phi.to_vec());
        };

        let (sin_gamma, cos_gamma) = gamma.sin_cos();
        let (sin_beta, cos_beta) = beta.sin_cos();

        theta
            .iter()
            .zip(phi)
            .map(|(&t, &p)| {
                let (sin_theta, cos_theta) = t.sin_cos();
                let (sin_pa, cos_pa) = (p - alpha).sin_cos();

                let cos_theta2 = cos_beta * cos_gamma * cos_theta
                    + sin_theta * (sin_beta * cos_gamma * cos_pa - sin_gamma * sin_pa);
                let theta2 = cos_theta2.clamp(-1.0, 1.0).acos();

                let re = cos_beta * sin_theta * cos_pa - sin_beta * cos_theta;
                let im = cos_beta * sin_gamma * cos_theta
                    + sin_theta * (sin_beta * sin_gamma * cos_pa + cos_gamma * sin_pa);
                (theta2, im.atan2(re))
            })
            .unzip()
    }

    /// Per-path field-of-view inclusion; everything is inside when unbounded
    pub fn is_in_field_of_view(&self, theta: &[f64], phi: &[f64]) -> Vec<bool> {
        match self.half_fov {
            None => vec![true; theta.len()],
            Some([half_az, half_el]) => theta
                .iter()
                .zip(phi)
                .map(|(&t, &p)| {
                    p.abs() <= half_az && t >= FRAC_PI_2 - half_el && t <= FRAC_PI_2 + half_el
                })
                .collect(),
        }
    }
}

impl fmt::Display for AntennaArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Antenna {:?} ({} elements)", self.config.shape, self.num_elements())?;
        match self.config.rotation {
            Some(r) => write!(f, ", rotation ({:.1}, {:.1}, {:.1}) deg", r[0], r[1], r[2])?,
            None => write!(f, ", no rotation")?,
        }
        match self.config.fov {
            Some(fov) => write!(f, ", FoV {:.1}x{:.1} deg", fov[0], fov[1])?,
            None => write!(f, ", unbounded FoV")?,
        }
        write!(
            f,
            ", spacing {} wavelengths, {} pattern",
            self.config.spacing, self.config.radiation_pattern
        )
    }
}

/// Rotation as written in configuration files
///
/// Either one 3-vector, a 3x2 matrix of (low, high) ranges, or one
/// 3-vector per instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RotationSetting {
    Vector(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
}

/// How the factory assigns rotations to the instances it builds
#[derive(Debug, Clone, PartialEq)]
pub enum RotationSpec {
    /// Keep the template rotation
    None,
    /// Same rotation for every instance
    Fixed([f64; 3]),
    /// Each angle drawn uniformly from its (low, high) range
    Uniform([[f64; 2]; 3]),
    /// One rotation per instance
    PerInstance(Vec<[f64; 3]>),
}

impl RotationSpec {
    /// Interpret a raw setting for `count` instances
    pub fn resolve(setting: &RotationSetting, count: usize) -> Result<Self, SynthError> {
        match setting {
            RotationSetting::Vector(v) => match v.as_slice() {
                [gamma, beta, alpha] => Ok(RotationSpec::Fixed([*gamma, *beta, *alpha])),
                _ => Err(SynthError::InvalidRotation(format!(
                    "expected 3 angles, got {}",
                    v.len()
                ))),
            },
            RotationSetting::Matrix(rows) => {
                if rows.len() == 3 && rows.iter().all(|r| r.len() == 2) {
                    let mut ranges = [[0.0; 2]; 3];
                    for (range, row) in ranges.iter_mut().zip(rows) {
                        if row[0] > row[1] {
                            return Err(SynthError::InvalidRotation(format!(
                                "range low {} exceeds high {}",
                                row[0], row[1]
                            )));
                        }
                        *range = [row[0], row[1]];
                    }
                    Ok(RotationSpec::Uniform(ranges))
                } else if rows.len() == count && rows.iter().all(|r| r.len() == 3) {
                    Ok(RotationSpec::PerInstance(
                        rows.iter().map(|r| [r[0], r[1], r[2]]).collect(),
                    ))
                } else {
                    Err(SynthError::InvalidRotation(format!(
                        "expected a 3-vector, a 3x2 range matrix or {} 3-vectors, got {} rows",
                        count,
                        rows.len()
                    )))
                }
            }
        }
    }
}

/// Antenna template whose rotation may vary per instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntennaTemplate {
    pub shape: [usize; 3],
    #[serde(default = "default_spacing")]
    pub spacing: f64,
    #[serde(default)]
    pub rotation: Option<RotationSetting>,
    #[serde(default)]
    pub fov: Option<[f64; 2]>,
    #[serde(default)]
    pub radiation_pattern: RadiationPattern,
}

impl AntennaTemplate {
    /// Base configuration without rotation
    pub fn base_config(&self) -> AntennaArrayConfig {
        AntennaArrayConfig {
            shape: self.shape,
            spacing: self.spacing,
            rotation: None,
            fov: self.fov,
            radiation_pattern: self.radiation_pattern,
        }
    }
}

/// Antenna settings: one template, or an explicit list of configurations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AntennaSettings {
    Template(AntennaTemplate),
    List(Vec<AntennaArrayConfig>),
}

/// Builds antenna instances with an injected random source
pub struct AntennaFactory<R: Rng> {
    rng: R,
}

impl AntennaFactory<StdRng> {
    /// Factory whose sampled rotations are reproducible from `seed`
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> AntennaFactory<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Build `count` arrays from a base configuration and a rotation mode
    pub fn build(
        &mut self,
        base: &AntennaArrayConfig,
        rotation: &RotationSpec,
        count: usize,
    ) -> Result<Vec<Arc<AntennaArray>>, SynthError> {
        let rotations: Vec<Option<[f64; 3]>> = match rotation {
            RotationSpec::None => vec![base.rotation; count],
            RotationSpec::Fixed(r) => vec![Some(*r); count],
            RotationSpec::Uniform(ranges) => {
                if let Some([low, high]) = ranges.iter().find(|[low, high]| !(low <= high)) {
                    return Err(SynthError::InvalidRotation(format!(
                        "range low {} exceeds high {}",
                        low, high
                    )));
                }
                (0..count)
                    .map(|_| {
                        Some(ranges.map(|[low, high]| {
                            if low == high {
                                low
                            } else {
                                self.rng.gen_range(low..high)
                            }
                        }))
                    })
                    .collect()
            }
            RotationSpec::PerInstance(list) => {
                if list.len() != count {
                    return Err(SynthError::AntennaCountMismatch {
                        expected: count,
                        got: list.len(),
                    });
                }
                list.iter().copied().map(Some).collect()
            }
        };

        let antennas = rotations
            .into_iter()
            .map(|rotation| {
                AntennaArray::new(AntennaArrayConfig {
                    rotation,
                    ..base.clone()
                })
                .map(Arc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Built {} antennas with rotation mode {:?}", antennas.len(), rotation);
        Ok(antennas)
    }

    /// Build arrays from explicit configurations
    ///
    /// A single configuration is shared by all `count` instances.
    pub fn from_configs(
        &self,
        configs: &[AntennaArrayConfig],
        count: usize,
    ) -> Result<Vec<Arc<AntennaArray>>, SynthError> {
        match configs {
            [single] => {
                let antenna = Arc::new(AntennaArray::new(single.clone())?);
                Ok(vec![antenna; count])
            }
            _ if configs.len() == count => configs
                .iter()
                .map(|config| AntennaArray::new(config.clone()).map(Arc::new))
                .collect(),
            _ => Err(SynthError::AntennaCountMismatch {
                expected: count,
                got: configs.len(),
            }),
        }
    }

    /// Build `count` arrays from configuration-file settings
    pub fn from_settings(
        &mut self,
        settings: &AntennaSettings,
        count: usize,
    ) -> Result<Vec<Arc<AntennaArray>>, SynthError> {
        match settings {
            AntennaSettings::Template(template) => {
                let rotation = match &template.rotation {
                    Some(setting) => RotationSpec::resolve(setting, count)?,
                    None => RotationSpec::None,
                };
                self.build(&template.base_config(), &rotation, count)
            }
            AntennaSettings::List(configs) => self.from_configs(configs, count),
        }
    }
}
