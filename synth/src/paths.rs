//! Path set of one link
//!
//! Holds the path parameters of a single transmitter/receiver link in
//! radians, computes the per-path channel impulse response and applies the
//! antenna rotation, field of view and radiation pattern exactly once.

use crate::antenna::AntennaArray;
use crate::SynthError;
use common::{format_with_si_prefix, wavelength, LosStatus};
use num_complex::Complex64;
use raytrace::PathRecord;
use std::f64::consts::PI;
use std::fmt;
use tracing::trace;

/// Propagation paths of one link
#[derive(Debug, Clone, PartialEq)]
pub struct PathSet {
    /// Linear power
    power: Vec<f64>,
    /// Degrees
    phase: Vec<f64>,
    /// Seconds
    toa: Vec<f64>,
    dod_theta: Vec<f64>,
    dod_phi: Vec<f64>,
    doa_theta: Vec<f64>,
    doa_phi: Vec<f64>,
    los: Vec<bool>,
    doppler_vel: Vec<f64>,
    doppler_acc: Vec<f64>,
    carrier_freq: f64,
    wavelength: f64,
    antenna_applied: bool,
}

impl PathSet {
    /// Build a path set from a stored record
    ///
    /// With `max_paths`, only the first paths in storage order are kept.
    pub fn new(
        record: &PathRecord,
        carrier_freq: f64,
        max_paths: Option<usize>,
    ) -> Result<Self, SynthError> {
        if !carrier_freq.is_finite() || carrier_freq <= 0.0 {
            return Err(SynthError::InvalidConfiguration(format!(
                "carrier frequency must be positive, got {}",
                carrier_freq
            )));
        }
        record.validate().map_err(SynthError::InvalidConfiguration)?;

        let n = max_paths.map_or(record.num_paths(), |m| m.min(record.num_paths()));
        let take = |v: &[f64]| v[..n].to_vec();
        let radians = |v: &[f64]| v[..n].iter().map(|d| d.to_radians()).collect::<Vec<_>>();

        let (doppler_vel, doppler_acc) = match &record.doppler {
            Some(doppler) => (take(&doppler.velocity), take(&doppler.acceleration)),
            None => (vec![0.0; n], vec![0.0; n]),
        };

        Ok(Self {
            power: take(&record.power),
            phase: take(&record.phase),
            toa: take(&record.toa),
            dod_theta: radians(&record.dod_theta),
            dod_phi: radians(&record.dod_phi),
            doa_theta: radians(&record.doa_theta),
            doa_phi: radians(&record.doa_phi),
            los: record.los[..n].to_vec(),
            doppler_vel,
            doppler_acc,
            carrier_freq,
            wavelength: wavelength(carrier_freq),
            antenna_applied: false,
        })
    }

    pub fn num_paths(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }

    pub fn carrier_freq(&self) -> f64 {
        self.carrier_freq
    }

    pub fn power(&self) -> &[f64] {
        &self.power
    }

    pub fn phase(&self) -> &[f64] {
        &self.phase
    }

    pub fn toa(&self) -> &[f64] {
        &self.toa
    }

    pub fn dod_theta(&self) -> &[f64] {
        &self.dod_theta
    }

    pub fn dod_phi(&self) -> &[f64] {
        &self.dod_phi
    }

    pub fn doa_theta(&self) -> &[f64] {
        &self.doa_theta
    }

    pub fn doa_phi(&self) -> &[f64] {
        &self.doa_phi
    }

    pub fn los(&self) -> &[bool] {
        &self.los
    }

    pub fn doppler_vel(&self) -> &[f64] {
        &self.doppler_vel
    }

    pub fn doppler_acc(&self) -> &[f64] {
        &self.doppler_acc
    }

    pub fn is_antenna_applied(&self) -> bool {
        self.antenna_applied
    }

    pub fn los_status(&self) -> LosStatus {
        LosStatus::from_flags(&self.los)
    }

    /// Complex amplitude and delay of every path
    ///
    /// With `doppler_shift`, the amplitude carries the phase rotation of the
    /// delay drift accumulated over the time of arrival.
    pub fn channel_impulse_response(&self, doppler_shift: bool) -> (Vec<Complex64>, &[f64]) {
        let amplitudes = (0..self.num_paths())
            .map(|p| {
                let a = Complex64::from_polar(self.power[p].sqrt(), self.phase[p].to_radians());
                if doppler_shift {
                    let toa = self.toa[p];
                    let drift = toa * (self.doppler_vel[p] + toa * self.doppler_acc[p] / 2.0);
                    a * Complex64::from_polar(1.0, -2.0 * PI * drift / self.wavelength)
                } else {
                    a
                }
            })
            .collect();

        (amplitudes, &self.toa)
    }

    /// Rotate the angles into the antenna frames and keep the paths inside
    /// both fields of view
    ///
    /// Consumes the set; clone first to keep the unfiltered paths. Fails on
    /// a set that already went through this step.
    pub fn apply_antenna_parameters(
        mut self,
        tx_antenna: &AntennaArray,
        rx_antenna: &AntennaArray,
    ) -> Result<Self, SynthError> {
        if self.antenna_applied {
            return Err(SynthError::AntennaAlreadyApplied);
        }

        if tx_antenna.has_rotation() {
            (self.dod_theta, self.dod_phi) = tx_antenna.apply_rotation(&self.dod_theta, &self.dod_phi);
        }
        if rx_antenna.has_rotation() {
            (self.doa_theta, self.doa_phi) = rx_antenna.apply_rotation(&self.doa_theta, &self.doa_phi);
        }

        let in_tx = tx_antenna.is_in_field_of_view(&self.dod_theta, &self.dod_phi);
        let in_rx = rx_antenna.is_in_field_of_view(&self.doa_theta, &self.doa_phi);
        let keep: Vec<bool> = in_tx.iter().zip(&in_rx).map(|(&t, &r)| t && r).collect();

        let before = self.num_paths();
        self.retain(&keep);
        trace!("Field of view kept {} of {} paths", self.num_paths(), before);

        let tx_pattern = tx_antenna.radiation_pattern();
        let rx_pattern = rx_antenna.radiation_pattern();
        if !tx_pattern.is_isotropic() || !rx_pattern.is_isotropic() {
            for p in 0..self.num_paths() {
                self.power[p] *= tx_pattern.gain(self.dod_theta[p]) * rx_pattern.gain(self.doa_theta[p]);
            }
        }

        self.antenna_applied = true;
        Ok(self)
    }

    /// Largest time of arrival, zero without paths
    pub fn max_toa(&self) -> f64 {
        self.toa.iter().copied().fold(0.0, f64::max)
    }

    pub fn total_power(&self) -> f64 {
        self.power.iter().sum()
    }

    /// Fraction of the power carried by paths arriving at or after `window`
    pub fn power_beyond(&self, window: f64) -> f64 {
        let total = self.total_power();
        if total <= 0.0 {
            return 0.0;
        }
        let late: f64 = self
            .toa
            .iter()
            .zip(&self.power)
            .filter(|(&toa, _)| toa >= window)
            .map(|(_, &p)| p)
            .sum();
        late / total
    }

    fn retain(&mut self, keep: &[bool]) {
        fn filter<T: Copy>(values: &mut Vec<T>, keep: &[bool]) {
            let mut mask = keep.iter();
            values.retain(|_| mask.next().copied().unwrap_or(false));
        }

        filter(&mut self.power, keep);
        filter(&mut self.phase, keep);
        filter(&mut self.toa, keep);
        filter(&mut self.dod_theta, keep);
        filter(&mut self.dod_phi, keep);
        filter(&mut self.doa_theta, keep);
        filter(&mut self.doa_phi, keep);
        filter(&mut self.los, keep);
        filter(&mut self.doppler_vel, keep);
        filter(&mut self.doppler_acc, keep);
    }
}

impl fmt::Display for PathSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} paths at {}, total power {:.3e}, max delay {}, {:?}",
            self.num_paths(),
            format_with_si_prefix(self.carrier_freq, "Hz"),
            self.total_power(),
            format_with_si_prefix(self.max_toa(), "s"),
            self.los_status()
        )
    }
}
