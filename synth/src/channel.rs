//! MIMO channel synthesis
//!
//! A [`Channel`] ties two antenna arrays to the path set of one link and
//! produces either an OFDM frequency response or FMCW radar IF samples.
//!
//! Coefficient layout:
//!
//! | variant | shape                                               |
//! |---------|-----------------------------------------------------|
//! | OFDM    | (rx elements, tx elements, selected subcarriers)    |
//! | Radar   | (rx elements, tx elements, samples/chirp, chirps)   |

use crate::antenna::AntennaArray;
use crate::paths::PathSet;
use crate::waveform::Fmcw;
use crate::SynthError;
use common::{format_with_si_prefix, ofdm_subcarrier_frequencies, LosStatus};
use ndarray::{s, Array2, Array3, Array4, Axis};
use num_complex::Complex64;
use num_traits::Zero;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Which subcarriers of the OFDM grid to materialize
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubcarrierSelection {
    /// Every subcarrier
    #[default]
    All,
    /// `start..end` with a stride
    Range { start: usize, end: usize, step: usize },
    /// Explicit indices
    List(Vec<usize>),
}

impl SubcarrierSelection {
    /// Indices selected out of `total` subcarriers
    pub fn indices(&self, total: usize) -> Result<Vec<usize>, SynthError> {
        let indices: Vec<usize> = match self {
            SubcarrierSelection::All => (0..total).collect(),
            SubcarrierSelection::Range { start, end, step } => {
                if *step == 0 {
                    return Err(SynthError::InvalidConfiguration(
                        "subcarrier step must be at least 1".to_string(),
                    ));
                }
                (*start..*end).step_by(*step).collect()
            }
            SubcarrierSelection::List(list) => list.clone(),
        };

        if indices.is_empty() {
            return Err(SynthError::InvalidConfiguration(
                "no subcarriers selected".to_string(),
            ));
        }
        if let Some(&k) = indices.iter().find(|&&k| k >= total) {
            return Err(SynthError::InvalidConfiguration(format!(
                "subcarrier {} is outside the grid of {} subcarriers",
                k, total
            )));
        }
        Ok(indices)
    }
}

/// OFDM grid configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfdmConfig {
    /// Hz
    pub bandwidth: f64,
    pub num_subcarriers: usize,
    #[serde(default)]
    pub subcarriers: SubcarrierSelection,
}

/// Validated OFDM grid with the baseband frequency of every selected subcarrier
#[derive(Debug, Clone, PartialEq)]
pub struct OfdmGrid {
    config: OfdmConfig,
    subcarriers: Vec<usize>,
    frequencies: Vec<f64>,
}

impl OfdmGrid {
    pub fn new(config: OfdmConfig) -> Result<Self, SynthError> {
        if !config.bandwidth.is_finite() || config.bandwidth <= 0.0 {
            return Err(SynthError::InvalidConfiguration(format!(
                "OFDM bandwidth must be positive, got {}",
                config.bandwidth
            )));
        }
        if config.num_subcarriers == 0 {
            return Err(SynthError::InvalidConfiguration(
                "OFDM grid needs at least one subcarrier".to_string(),
            ));
        }

        let subcarriers = config.subcarriers.indices(config.num_subcarriers)?;
        let frequencies =
            ofdm_subcarrier_frequencies(config.bandwidth, &subcarriers, config.num_subcarriers);

        Ok(Self {
            config,
            subcarriers,
            frequencies,
        })
    }

    pub fn config(&self) -> &OfdmConfig {
        &self.config
    }

    pub fn subcarriers(&self) -> &[usize] {
        &self.subcarriers
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Useful symbol duration, `num_subcarriers / bandwidth`
    pub fn symbol_duration(&self) -> f64 {
        self.config.num_subcarriers as f64 / self.config.bandwidth
    }
}

/// Variant-specific part of a channel
#[derive(Debug, Clone)]
pub enum ChannelKind {
    Ofdm { grid: Arc<OfdmGrid>, doppler_shift: bool },
    Radar(Arc<Fmcw>),
}

/// Generated coefficients
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCoeffs {
    Ofdm(Array3<Complex64>),
    Radar(Array4<Complex64>),
}

impl ChannelCoeffs {
    pub fn shape(&self) -> Vec<usize> {
        match self {
            ChannelCoeffs::Ofdm(c) => c.shape().to_vec(),
            ChannelCoeffs::Radar(c) => c.shape().to_vec(),
        }
    }

    /// Sum of squared magnitudes
    pub fn energy(&self) -> f64 {
        match self {
            ChannelCoeffs::Ofdm(c) => c.iter().map(|v| v.norm_sqr()).sum(),
            ChannelCoeffs::Radar(c) => c.iter().map(|v| v.norm_sqr()).sum(),
        }
    }
}

/// Channel of one transmitter/receiver link
///
/// `coeffs` stays `None` until [`Channel::generate`] runs, and also after it
/// when no path survived the antenna filtering.
#[derive(Debug, Clone)]
pub struct Channel {
    tx_antenna: Arc<AntennaArray>,
    rx_antenna: Arc<AntennaArray>,
    paths: PathSet,
    carrier_freq: f64,
    kind: ChannelKind,
    coeffs: Option<ChannelCoeffs>,
    los_status: LosStatus,
}

impl Channel {
    /// OFDM channel over the given grid
    pub fn ofdm(
        tx_antenna: Arc<AntennaArray>,
        rx_antenna: Arc<AntennaArray>,
        paths: PathSet,
        grid: Arc<OfdmGrid>,
        doppler_shift: bool,
    ) -> Self {
        Self::new(tx_antenna, rx_antenna, paths, ChannelKind::Ofdm { grid, doppler_shift })
    }

    /// FMCW radar channel
    pub fn radar(
        tx_antenna: Arc<AntennaArray>,
        rx_antenna: Arc<AntennaArray>,
        paths: PathSet,
        waveform: Arc<Fmcw>,
    ) -> Self {
        Self::new(tx_antenna, rx_antenna, paths, ChannelKind::Radar(waveform))
    }

    pub fn new(
        tx_antenna: Arc<AntennaArray>,
        rx_antenna: Arc<AntennaArray>,
        paths: PathSet,
        kind: ChannelKind,
    ) -> Self {
        let carrier_freq = paths.carrier_freq();
        Self {
            tx_antenna,
            rx_antenna,
            paths,
            carrier_freq,
            kind,
            coeffs: None,
            los_status: LosStatus::NoPath,
        }
    }

    pub fn tx_antenna(&self) -> &Arc<AntennaArray> {
        &self.tx_antenna
    }

    pub fn rx_antenna(&self) -> &Arc<AntennaArray> {
        &self.rx_antenna
    }

    pub fn paths(&self) -> &PathSet {
        &self.paths
    }

    pub fn carrier_freq(&self) -> f64 {
        self.carrier_freq
    }

    pub fn kind(&self) -> &ChannelKind {
        &self.kind
    }

    pub fn waveform(&self) -> Option<&Arc<Fmcw>> {
        match &self.kind {
            ChannelKind::Radar(waveform) => Some(waveform),
            ChannelKind::Ofdm { .. } => None,
        }
    }

    pub fn coeffs(&self) -> Option<&ChannelCoeffs> {
        self.coeffs.as_ref()
    }

    pub fn los_status(&self) -> LosStatus {
        self.los_status
    }

    /// Whether the link has coefficients at all
    pub fn has_channel(&self) -> bool {
        self.coeffs.is_some()
    }

    /// Compute the coefficients and the LoS status
    pub fn generate(&mut self) -> Result<(), SynthError> {
        if !self.paths.is_antenna_applied() {
            return Err(SynthError::InvalidConfiguration(
                "antenna parameters must be applied to the paths before generating".to_string(),
            ));
        }

        self.los_status = self.paths.los_status();
        if self.paths.is_empty() {
            self.coeffs = None;
            return Ok(());
        }

        let coeffs = match &self.kind {
            ChannelKind::Ofdm { grid, doppler_shift } => {
                ChannelCoeffs::Ofdm(self.generate_ofdm(grid, *doppler_shift)?)
            }
            ChannelKind::Radar(waveform) => ChannelCoeffs::Radar(self.generate_radar(waveform)?),
        };

        trace!("Generated channel coefficients of shape {:?}", coeffs.shape());
        self.coeffs = Some(coeffs);
        Ok(())
    }

    /// Spatial outer product of the two arrays' steering vectors
    ///
    /// Row `r * tx_elements + t` holds element pair (r, t), one column per path.
    fn steering_matrix(&self) -> Array2<Complex64> {
        let tx = self
            .tx_antenna
            .array_response(self.paths.dod_theta(), self.paths.dod_phi());
        let rx = self
            .rx_antenna
            .array_response(self.paths.doa_theta(), self.paths.doa_phi());

        let (n_tx, n_rx, n_paths) = (tx.nrows(), rx.nrows(), self.paths.num_paths());
        let mut steering = Array2::zeros((n_rx * n_tx, n_paths));
        for r in 0..n_rx {
            for t in 0..n_tx {
                let mut row = steering.row_mut(r * n_tx + t);
                for p in 0..n_paths {
                    row[p] = rx[[r, p]] * tx[[t, p]];
                }
            }
        }
        steering
    }

    fn generate_ofdm(
        &self,
        grid: &OfdmGrid,
        doppler_shift: bool,
    ) -> Result<Array3<Complex64>, SynthError> {
        let steering = self.steering_matrix();
        let (amplitudes, toa) = self.paths.channel_impulse_response(doppler_shift);
        let frequencies = grid.frequencies();
        let norm = (grid.config().num_subcarriers as f64).sqrt();

        let path_const = Array2::from_shape_fn((amplitudes.len(), frequencies.len()), |(p, k)| {
            amplitudes[p] * Complex64::from_polar(1.0, -2.0 * PI * toa[p] * frequencies[k]) / norm
        });

        let n_tx = self.tx_antenna.num_elements();
        let n_rx = self.rx_antenna.num_elements();
        let coeffs = steering
            .dot(&path_const)
            .into_shape_with_order((n_rx, n_tx, frequencies.len()))?;
        Ok(coeffs)
    }

    fn generate_radar(&self, waveform: &Fmcw) -> Result<Array4<Complex64>, SynthError> {
        let n_tx = self.tx_antenna.num_elements();
        let n_rx = self.rx_antenna.num_elements();
        let n_chirps = waveform.n_chirps();
        let n_samples = waveform.n_samples_per_chirp();

        let if_samples = waveform.generate_samples(&self.paths);
        if if_samples.kept_paths.is_empty() {
            return Ok(Array4::zeros((n_rx, n_tx, n_samples, n_chirps)));
        }

        // Only the paths that survived the delay cut contribute
        let steering = self
            .steering_matrix()
            .select(Axis(1), &if_samples.kept_paths);
        let signal = steering
            .dot(&if_samples.samples)
            .into_shape_with_order((n_rx, n_tx, n_chirps, n_samples))?;

        Ok(signal.permuted_axes([0, 1, 3, 2]).as_standard_layout().into_owned())
    }

    /// Range-Doppler magnitude map of one element pair of a radar channel
    ///
    /// FFT over fast time per chirp, then over slow time per range bin.
    /// Returns a (range bins, Doppler bins) map with zero Doppler centered,
    /// or `None` for links without coefficients.
    pub fn range_doppler_map(&self, rx: usize, tx: usize) -> Result<Option<Array2<f64>>, SynthError> {
        let coeffs = match &self.coeffs {
            Some(ChannelCoeffs::Radar(coeffs)) => coeffs,
            Some(ChannelCoeffs::Ofdm(_)) => {
                return Err(SynthError::InvalidConfiguration(
                    "range-Doppler map needs a radar channel".to_string(),
                ))
            }
            None => return Ok(None),
        };

        let (n_rx, n_tx, n_samples, n_chirps) = coeffs.dim();
        if rx >= n_rx || tx >= n_tx {
            return Err(SynthError::InvalidConfiguration(format!(
                "element pair ({}, {}) outside a {}x{} channel",
                rx, tx, n_rx, n_tx
            )));
        }

        let mut cube: Array2<Complex64> = coeffs.slice(s![rx, tx, .., ..]).to_owned();
        let mut planner = FftPlanner::<f64>::new();

        let range_fft = planner.plan_fft_forward(n_samples);
        let mut buffer = vec![Complex64::zero(); n_samples];
        for mut column in cube.axis_iter_mut(Axis(1)) {
            buffer.iter_mut().zip(column.iter()).for_each(|(b, v)| *b = *v);
            range_fft.process(&mut buffer);
            column.iter_mut().zip(&buffer).for_each(|(v, b)| *v = *b);
        }

        let doppler_fft = planner.plan_fft_forward(n_chirps);
        let mut buffer = vec![Complex64::zero(); n_chirps];
        let mut map = Array2::zeros((n_samples, n_chirps));
        for (bin, row) in cube.axis_iter(Axis(0)).enumerate() {
            buffer.iter_mut().zip(row.iter()).for_each(|(b, v)| *b = *v);
            doppler_fft.process(&mut buffer);
            for (k, value) in buffer.iter().enumerate() {
                map[[bin, (k + n_chirps / 2) % n_chirps]] = value.norm();
            }
        }

        Ok(Some(map))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match &self.kind {
            ChannelKind::Ofdm { grid, .. } => format!(
                "OFDM channel, {} over {} subcarriers ({} selected)",
                format_with_si_prefix(grid.config().bandwidth, "Hz"),
                grid.config().num_subcarriers,
                grid.subcarriers().len()
            ),
            ChannelKind::Radar(waveform) => format!("radar channel, {}", waveform),
        };
        writeln!(f, "{} at {}", variant, format_with_si_prefix(self.carrier_freq, "Hz"))?;
        writeln!(f, "  Tx: {}", self.tx_antenna)?;
        writeln!(f, "  Rx: {}", self.rx_antenna)?;
        writeln!(f, "  Paths: {}", self.paths)?;
        match &self.coeffs {
            Some(coeffs) => write!(f, "  Coefficients: {:?}", coeffs.shape())?,
            None => write!(f, "  Coefficients: none")?,
        }
        write!(f, ", LoS status {}", self.los_status.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::antenna::AntennaArrayConfig;
    use crate::waveform::FmcwConfig;
    use raytrace::PathRecord;

    fn antenna(shape: [usize; 3], fov: Option<[f64; 2]>) -> Arc<AntennaArray> {
        Arc::new(
            AntennaArray::new(AntennaArrayConfig {
                shape,
                fov,
                ..AntennaArrayConfig::single_element()
            })
            .unwrap(),
        )
    }

    fn broadside_record(toa: f64) -> PathRecord {
        PathRecord {
            power: vec![1.0],
            phase: vec![0.0],
            toa: vec![toa],
            dod_theta: vec![90.0],
            dod_phi: vec![0.0],
            doa_theta: vec![90.0],
            doa_phi: vec![0.0],
            los: vec![true],
            doppler: None,
        }
    }

    fn applied(record: &PathRecord, tx: &AntennaArray, rx: &AntennaArray) -> PathSet {
        PathSet::new(record, 28e9, None)
            .unwrap()
            .apply_antenna_parameters(tx, rx)
            .unwrap()
    }

    fn grid(num_subcarriers: usize, subcarriers: SubcarrierSelection) -> Arc<OfdmGrid> {
        Arc::new(
            OfdmGrid::new(OfdmConfig {
                bandwidth: 100e6,
                num_subcarriers,
                subcarriers,
            })
            .unwrap(),
        )
    }

    fn fmcw() -> Arc<Fmcw> {
        Arc::new(
            Fmcw::new(
                FmcwConfig {
                    n_chirps: 8,
                    n_samples_per_chirp: 16,
                    chirp_slope: 1e13,
                    sampling_rate: 4e6,
                    chirp_period: None,
                },
                28e9,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_subcarrier_selection() {
        assert_eq!(SubcarrierSelection::All.indices(4).unwrap(), vec![0, 1, 2, 3]);
        let range = SubcarrierSelection::Range { start: 0, end: 10, step: 4 };
        assert_eq!(range.indices(16).unwrap(), vec![0, 4, 8]);
        assert!(SubcarrierSelection::List(vec![3, 16]).indices(16).is_err());
        assert!(SubcarrierSelection::List(vec![]).indices(16).is_err());
    }

    #[test]
    fn test_ofdm_single_path_end_to_end() {
        let (tx, rx) = (antenna([1, 1, 1], None), antenna([1, 1, 1], None));
        let paths = applied(&broadside_record(0.0), &tx, &rx);
        let mut channel = Channel::ofdm(tx, rx, paths, grid(64, SubcarrierSelection::All), false);
        channel.generate().unwrap();

        let Some(ChannelCoeffs::Ofdm(coeffs)) = channel.coeffs() else {
            panic!("expected OFDM coefficients");
        };
        assert_eq!(coeffs.dim(), (1, 1, 64));
        let expected = Complex64::new(1.0 / 8.0, 0.0);
        assert!((coeffs[[0, 0, 0]] - expected).norm() < 1e-12);
        assert_eq!(channel.los_status(), LosStatus::Los);
    }

    #[test]
    fn test_ofdm_subcarrier_count() {
        let (tx, rx) = (antenna([1, 4, 2], None), antenna([2, 1, 1], None));
        let paths = applied(&broadside_record(50e-9), &tx, &rx);
        let selection = SubcarrierSelection::Range { start: 0, end: 512, step: 8 };
        let mut channel = Channel::ofdm(tx, rx, paths, grid(512, selection), false);
        channel.generate().unwrap();

        let Some(ChannelCoeffs::Ofdm(coeffs)) = channel.coeffs() else {
            panic!("expected OFDM coefficients");
        };
        assert_eq!(coeffs.dim(), (2, 8, 64));
    }

    #[test]
    fn test_ofdm_delay_phase_ramp() {
        let (tx, rx) = (antenna([1, 1, 1], None), antenna([1, 1, 1], None));
        let toa = 20e-9;
        let paths = applied(&broadside_record(toa), &tx, &rx);
        let grid = grid(16, SubcarrierSelection::List(vec![0, 5]));
        let f5 = grid.frequencies()[1];
        let mut channel = Channel::ofdm(tx, rx, paths, grid, false);
        channel.generate().unwrap();

        let Some(ChannelCoeffs::Ofdm(coeffs)) = channel.coeffs() else {
            panic!("expected OFDM coefficients");
        };
        let expected = Complex64::from_polar(0.25, -2.0 * PI * toa * f5);
        assert!((coeffs[[0, 0, 1]] - expected).norm() < 1e-12);
    }

    #[test]
    fn test_ofdm_element_layout() {
        // Two receive elements along x see a pi phase step at broadside
        let (tx, rx) = (antenna([1, 1, 1], None), antenna([2, 1, 1], None));
        let paths = applied(&broadside_record(0.0), &tx, &rx);
        let mut channel = Channel::ofdm(tx, rx, paths, grid(4, SubcarrierSelection::All), false);
        channel.generate().unwrap();

        let Some(ChannelCoeffs::Ofdm(coeffs)) = channel.coeffs() else {
            panic!("expected OFDM coefficients");
        };
        assert_eq!(coeffs.dim(), (2, 1, 4));
        assert!((coeffs[[0, 0, 0]] + coeffs[[1, 0, 0]]).norm() < 1e-12);
    }

    #[test]
    fn test_zero_path_channels() {
        let narrow = antenna([1, 1, 1], Some([0.0, 0.0]));
        let record = PathRecord {
            dod_phi: vec![10.0],
            ..broadside_record(0.0)
        };

        let paths = applied(&record, &narrow, &narrow);
        assert!(paths.is_empty());

        let mut ofdm = Channel::ofdm(
            narrow.clone(),
            narrow.clone(),
            paths.clone(),
            grid(8, SubcarrierSelection::All),
            false,
        );
        ofdm.generate().unwrap();
        assert!(ofdm.coeffs().is_none());
        assert_eq!(ofdm.los_status().code(), -1);

        let mut radar = Channel::radar(narrow.clone(), narrow, paths, fmcw());
        radar.generate().unwrap();
        assert!(radar.coeffs().is_none());
        assert_eq!(radar.los_status(), LosStatus::NoPath);
        assert!(radar.range_doppler_map(0, 0).unwrap().is_none());
    }

    #[test]
    fn test_generate_requires_applied_antennas() {
        let tx = antenna([1, 1, 1], None);
        let paths = PathSet::new(&broadside_record(0.0), 28e9, None).unwrap();
        let mut channel = Channel::ofdm(tx.clone(), tx, paths, grid(8, SubcarrierSelection::All), false);
        assert!(channel.generate().is_err());
    }

    #[test]
    fn test_radar_shape_and_zero_delay_sample() {
        let (tx, rx) = (antenna([1, 1, 1], None), antenna([1, 1, 1], None));
        let paths = applied(&broadside_record(0.0), &tx, &rx);
        let mut channel = Channel::radar(tx, rx, paths, fmcw());
        channel.generate().unwrap();

        let Some(ChannelCoeffs::Radar(coeffs)) = channel.coeffs() else {
            panic!("expected radar coefficients");
        };
        assert_eq!(coeffs.dim(), (1, 1, 16, 8));
        assert!((coeffs[[0, 0, 0, 0]].norm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_radar_tensor_shape_multi_element() {
        let (tx, rx) = (antenna([1, 2, 1], None), antenna([1, 2, 2], None));
        let paths = applied(&broadside_record(1e-7), &tx, &rx);
        let mut channel = Channel::radar(tx, rx, paths, fmcw());
        channel.generate().unwrap();

        assert_eq!(channel.coeffs().unwrap().shape(), vec![4, 2, 16, 8]);
    }

    #[test]
    fn test_radar_samples_then_chirps() {
        // Without Doppler every chirp repeats, so the chirp axis is constant
        let (tx, rx) = (antenna([1, 1, 1], None), antenna([1, 1, 1], None));
        let paths = applied(&broadside_record(1e-7), &tx, &rx);
        let mut channel = Channel::radar(tx, rx, paths, fmcw());
        channel.generate().unwrap();

        let Some(ChannelCoeffs::Radar(coeffs)) = channel.coeffs() else {
            panic!("expected radar coefficients");
        };
        for n in 0..16 {
            for k in 1..8 {
                assert!((coeffs[[0, 0, n, k]] - coeffs[[0, 0, n, 0]]).norm() < 1e-6);
            }
        }
    }

    #[test]
    fn test_radar_all_paths_beyond_chirp() {
        let (tx, rx) = (antenna([1, 1, 1], None), antenna([1, 2, 1], None));
        let paths = applied(&broadside_record(1e-3), &tx, &rx);
        let mut channel = Channel::radar(tx, rx, paths, fmcw());
        channel.generate().unwrap();

        let coeffs = channel.coeffs().unwrap();
        assert_eq!(coeffs.shape(), vec![2, 1, 16, 8]);
        assert_eq!(coeffs.energy(), 0.0);
        assert_eq!(channel.los_status(), LosStatus::Los);
    }

    #[test]
    fn test_range_doppler_peak() {
        // Beat frequency of one range bin: slope * tau = fs / n_samples
        let tau = 4e6 / 16.0 / 1e13;
        let (tx, rx) = (antenna([1, 1, 1], None), antenna([1, 1, 1], None));
        let paths = applied(&broadside_record(tau), &tx, &rx);
        let mut channel = Channel::radar(tx, rx, paths, fmcw());
        channel.generate().unwrap();

        let map = channel.range_doppler_map(0, 0).unwrap().unwrap();
        assert_eq!(map.dim(), (16, 8));

        let (mut best, mut peak) = ((0, 0), 0.0);
        for ((r, d), &value) in map.indexed_iter() {
            if value > peak {
                peak = value;
                best = (r, d);
            }
        }
        // Stationary target: zero Doppler sits at the center bin
        assert_eq!(best.1, 4);
        assert!(best.0 <= 2);
    }

    #[test]
    fn test_display_mentions_variant() {
        let (tx, rx) = (antenna([1, 1, 1], None), antenna([1, 1, 1], None));
        let paths = applied(&broadside_record(0.0), &tx, &rx);
        let channel = Channel::ofdm(tx, rx, paths, grid(8, SubcarrierSelection::All), false);
        let text = channel.to_string();
        assert!(text.starts_with("OFDM channel"));
        assert!(text.contains("Coefficients: none"));
    }
}
