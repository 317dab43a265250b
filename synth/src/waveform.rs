//! FMCW Radar Waveform
//!
//! Generates the per-path intermediate-frequency samples of a frame of
//! linear chirps. Paths whose delay spills past the end of a chirp are
//! folded back into the next chirp period; paths delayed beyond one active
//! chirp are dropped.

use crate::paths::PathSet;
use crate::SynthError;
use common::{format_with_si_prefix, SPEED_OF_LIGHT};
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use tracing::{debug, info};

/// Chirp parameters of an FMCW frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FmcwConfig {
    pub n_chirps: usize,
    pub n_samples_per_chirp: usize,
    /// Hz/s
    pub chirp_slope: f64,
    /// Hz
    pub sampling_rate: f64,
    /// Chirp repetition period (s); defaults to the active chirp duration
    #[serde(default)]
    pub chirp_period: Option<f64>,
}

/// FMCW waveform bound to a carrier frequency
#[derive(Debug, Clone)]
pub struct Fmcw {
    config: FmcwConfig,
    carrier_freq: f64,
    t_chirp: f64,
    t_period: f64,
    t_pause: f64,
    t_frame: f64,
    bandwidth: f64,
    /// Sample times within one chirp
    time_fast: Vec<f64>,
    /// Absolute sample times of the frame, chirp-major
    time: Vec<f64>,
}

/// Per-path IF samples of one frame
#[derive(Debug, Clone)]
pub struct IfSamples {
    /// Index of each row's path in the originating path set
    pub kept_paths: Vec<usize>,
    /// (kept paths, chirps x samples per chirp)
    pub samples: Array2<Complex64>,
}

impl Fmcw {
    pub fn new(config: FmcwConfig, carrier_freq: f64) -> Result<Self, SynthError> {
        if config.n_chirps == 0 || config.n_samples_per_chirp == 0 {
            return Err(SynthError::InvalidConfiguration(format!(
                "FMCW frame needs at least one chirp and one sample, got {} x {}",
                config.n_chirps, config.n_samples_per_chirp
            )));
        }
        if !config.sampling_rate.is_finite() || config.sampling_rate <= 0.0 {
            return Err(SynthError::InvalidConfiguration(format!(
                "FMCW sampling rate must be positive, got {}",
                config.sampling_rate
            )));
        }
        if !config.chirp_slope.is_finite() {
            return Err(SynthError::InvalidConfiguration(format!(
                "FMCW chirp slope must be finite, got {}",
                config.chirp_slope
            )));
        }
        if !carrier_freq.is_finite() || carrier_freq <= 0.0 {
            return Err(SynthError::InvalidConfiguration(format!(
                "carrier frequency must be positive, got {}",
                carrier_freq
            )));
        }

        let t_chirp = config.n_samples_per_chirp as f64 / config.sampling_rate;
        let t_period = config.chirp_period.unwrap_or(t_chirp);
        if !(t_period >= t_chirp) {
            return Err(SynthError::InvalidConfiguration(format!(
                "chirp period {} s is shorter than the active chirp {} s",
                t_period, t_chirp
            )));
        }

        let time_fast: Vec<f64> = (0..config.n_samples_per_chirp)
            .map(|n| n as f64 / config.sampling_rate)
            .collect();
        // Chirp k starts at k * t_period, pause included, so Doppler drift
        // accrues over the repetition period rather than k * t_chirp
        let time = (0..config.n_chirps)
            .flat_map(|k| time_fast.iter().map(move |&t| t + k as f64 * t_period))
            .collect();

        let waveform = Self {
            carrier_freq,
            t_chirp,
            t_period,
            t_pause: t_period - t_chirp,
            t_frame: config.n_chirps as f64 * t_period,
            bandwidth: config.chirp_slope * t_chirp,
            time_fast,
            time,
            config,
        };
        info!("{}", waveform);
        Ok(waveform)
    }

    pub fn config(&self) -> &FmcwConfig {
        &self.config
    }

    pub fn n_chirps(&self) -> usize {
        self.config.n_chirps
    }

    pub fn n_samples_per_chirp(&self) -> usize {
        self.config.n_samples_per_chirp
    }

    pub fn carrier_freq(&self) -> f64 {
        self.carrier_freq
    }

    /// Active chirp duration (s)
    pub fn chirp_duration(&self) -> f64 {
        self.t_chirp
    }

    pub fn chirp_period(&self) -> f64 {
        self.t_period
    }

    pub fn pause(&self) -> f64 {
        self.t_pause
    }

    pub fn frame_duration(&self) -> f64 {
        self.t_frame
    }

    /// Swept bandwidth of one chirp (Hz)
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn time_fast(&self) -> &[f64] {
        &self.time_fast
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// IF samples of every path delayed less than one active chirp
    ///
    /// The delay drifts with the path's Doppler terms over the whole frame.
    /// A sample takes the current-chirp term once the echo has arrived, and
    /// the previous-period term while the echo of the previous chirp is
    /// still arriving.
    pub fn generate_samples(&self, paths: &PathSet) -> IfSamples {
        let (amplitudes, toa) = paths.channel_impulse_response(false);
        let kept_paths: Vec<usize> = (0..paths.num_paths())
            .filter(|&p| toa[p] < self.t_chirp)
            .collect();

        let n_fast = self.config.n_samples_per_chirp;
        let slope = self.config.chirp_slope;
        let f0 = self.carrier_freq;
        let mut samples = Array2::zeros((kept_paths.len(), self.time.len()));

        for (row, &p) in kept_paths.iter().enumerate() {
            let tau = toa[p];
            let vel = paths.doppler_vel()[p];
            let acc = paths.doppler_acc()[p];
            let a_conj = amplitudes[p].conj();

            for (i, &t) in self.time.iter().enumerate() {
                let t_fast = self.time_fast[i % n_fast];
                let current = t_fast >= tau;
                let previous = t_fast < tau - self.t_pause;
                if !current && !previous {
                    continue;
                }

                let tau_eff = tau + vel * t / SPEED_OF_LIGHT + acc * t * t / (2.0 * SPEED_OF_LIGHT);
                let delay = if current { tau_eff } else { tau_eff - self.t_period };

                let f_if = slope * delay;
                let phi_if = (f0 - 0.5 * slope * delay) * delay;
                samples[[row, i]] = a_conj * Complex64::from_polar(1.0, 2.0 * PI * (f_if * t_fast + phi_if));
            }
        }

        debug!(
            "Generated IF samples for {} of {} paths",
            kept_paths.len(),
            paths.num_paths()
        );
        IfSamples {
            kept_paths,
            samples,
        }
    }
}

impl fmt::Display for Fmcw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FMCW radar waveform: {} chirps, {} samples/chirp, slope {}, sampling {}, chirp period {}, BW {}",
            self.config.n_chirps,
            self.config.n_samples_per_chirp,
            format_with_si_prefix(self.config.chirp_slope, "Hz/s"),
            format_with_si_prefix(self.config.sampling_rate, "Hz"),
            format_with_si_prefix(self.t_period, "s"),
            format_with_si_prefix(self.bandwidth, "Hz")
        )
    }
}
