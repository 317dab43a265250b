//! Scene Channel Builder
//!
//! Builds every channel of a scene: for each active base station, one
//! channel per user and, optionally, one per receiving base station.
//! Scenes are processed one after another; the links of one base station
//! are synthesized in parallel and collected in receiver order.

use crate::antenna::AntennaArray;
use crate::channel::{Channel, ChannelKind, OfdmConfig, OfdmGrid};
use crate::paths::PathSet;
use crate::waveform::{Fmcw, FmcwConfig};
use crate::SynthError;
use common::Position;
use raytrace::{LinkFamily, PathRecord, RayTracingDataStore, ReceiverRays, ScenarioParams, ShardFormat};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Mean clipped-power ratio above which the delay window is reported
const DELAY_WINDOW_WARN_RATIO: f64 = 0.01;

/// Waveform the links are synthesized for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMode {
    Ofdm(OfdmConfig),
    Radar(FmcwConfig),
}

/// Scene build configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SceneBuildConfig {
    /// Directory holding `params.<ext>` and the `scene_<n>` directories
    pub scenario_dir: PathBuf,
    pub format: ShardFormat,
    /// 1-based ids of the transmitting base stations
    pub active_bs: Vec<usize>,
    pub max_paths: Option<usize>,
    /// Apply the Doppler phase to OFDM path amplitudes
    pub doppler: bool,
    /// Build base-station-to-user channels
    pub user_links: bool,
    /// Build base-station-to-base-station channels
    pub bs_links: bool,
    /// Users to build; all users of the transmitter when absent
    pub user_indices: Option<Vec<usize>>,
    pub mode: SynthesisMode,
}

/// Antennas of the links of one build
///
/// `bs_tx[i]` and `bs_rx[i]` belong to the i-th active base station; the
/// receive side is used when that station is the receiver of a BS-BS link.
/// The user array is only needed for user links.
#[derive(Debug, Clone)]
pub struct LinkAntennas {
    pub bs_tx: Vec<Arc<AntennaArray>>,
    pub bs_rx: Vec<Arc<AntennaArray>>,
    pub ue: Option<Arc<AntennaArray>>,
}

/// Share of power lost past the OFDM delay window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayWindowReport {
    /// Useful symbol duration (s)
    pub window: f64,
    /// Links with paths arriving past the window
    pub violating_links: usize,
    /// Mean clipped-power ratio over the violating links
    pub mean_ratio: f64,
}

/// Channels of one active base station
#[derive(Debug, Clone)]
pub struct BsChannels {
    /// 1-based base-station id
    pub bs_id: usize,
    pub bs_location: Option<Position>,
    /// User index of each entry of `ue`
    pub ue_indices: Vec<usize>,
    pub ue: Vec<Channel>,
    pub ue_locations: Vec<Position>,
    /// One channel per active base station, in active order
    pub bs: Vec<Channel>,
}

/// Channels of one scene
#[derive(Debug, Clone)]
pub struct SceneChannels {
    pub scene: usize,
    /// In active base-station order
    pub per_bs: Vec<BsChannels>,
    pub delay_window: Option<DelayWindowReport>,
}

impl SceneChannels {
    /// Channel from the `tx`-th active base station to user `ue_index`
    pub fn ue_channel(&self, tx: usize, ue_index: usize) -> Option<&Channel> {
        let bs = self.per_bs.get(tx)?;
        let position = bs.ue_indices.iter().position(|&u| u == ue_index)?;
        bs.ue.get(position)
    }

    /// Channel from the `tx`-th to the `rx`-th active base station
    pub fn bs_channel(&self, tx: usize, rx: usize) -> Option<&Channel> {
        self.per_bs.get(tx)?.bs.get(rx)
    }

    pub fn ue_location(&self, tx: usize, ue_index: usize) -> Option<Position> {
        let bs = self.per_bs.get(tx)?;
        let position = bs.ue_indices.iter().position(|&u| u == ue_index)?;
        bs.ue_locations.get(position).copied()
    }

    pub fn bs_location(&self, tx: usize) -> Option<Position> {
        self.per_bs.get(tx)?.bs_location
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.per_bs.iter().flat_map(|bs| bs.ue.iter().chain(bs.bs.iter()))
    }
}

/// Builds the channels of the scenes of one scenario
pub struct SceneChannelBuilder {
    config: SceneBuildConfig,
    params: ScenarioParams,
    antennas: LinkAntennas,
    kind: ChannelKind,
}

impl SceneChannelBuilder {
    /// Validate the configuration against the scenario parameters
    pub fn new(config: SceneBuildConfig, antennas: LinkAntennas) -> Result<Self, SynthError> {
        let params = ScenarioParams::load(&config.scenario_dir, config.format)?;
        Self::with_params(config, antennas, params)
    }

    /// Same as [`SceneChannelBuilder::new`] with already loaded parameters
    pub fn with_params(
        config: SceneBuildConfig,
        antennas: LinkAntennas,
        params: ScenarioParams,
    ) -> Result<Self, SynthError> {
        validate_active_bs(&config.active_bs, params.num_bs)?;

        let n_active = config.active_bs.len();
        for count in [antennas.bs_tx.len(), antennas.bs_rx.len()] {
            if count != n_active {
                return Err(SynthError::AntennaCountMismatch {
                    expected: n_active,
                    got: count,
                });
            }
        }

        if config.user_links && antennas.ue.is_none() {
            return Err(SynthError::InvalidConfiguration(
                "user links need a user antenna".to_string(),
            ));
        }

        if config.doppler && !params.doppler_enabled {
            warn!("Doppler requested but the scenario was ray traced without Doppler terms");
        }

        let kind = match &config.mode {
            SynthesisMode::Ofdm(ofdm) => ChannelKind::Ofdm {
                grid: Arc::new(OfdmGrid::new(ofdm.clone())?),
                doppler_shift: config.doppler,
            },
            SynthesisMode::Radar(fmcw) => {
                ChannelKind::Radar(Arc::new(Fmcw::new(fmcw.clone(), params.carrier_freq)?))
            }
        };

        info!(
            "Scene builder ready: {} active base stations, user links {}, BS links {}",
            n_active, config.user_links, config.bs_links
        );

        Ok(Self {
            config,
            params,
            antennas,
            kind,
        })
    }

    pub fn params(&self) -> &ScenarioParams {
        &self.params
    }

    pub fn config(&self) -> &SceneBuildConfig {
        &self.config
    }

    /// Build the given scenes in order, stopping at the first error
    pub fn build(&self, scenes: &[usize]) -> Result<Vec<SceneChannels>, SynthError> {
        scenes.iter().map(|&scene| self.build_scene(scene)).collect()
    }

    /// Build every channel of one scene
    pub fn build_scene(&self, scene: usize) -> Result<SceneChannels, SynthError> {
        let scene_dir = self.config.scenario_dir.join(format!("scene_{}", scene));
        let store = RayTracingDataStore::open(&scene_dir, self.config.format)?;
        info!("Building scene {} from {}", scene, scene_dir.display());

        let bs_receivers: Vec<usize> = self.config.active_bs.iter().map(|id| id - 1).collect();
        let mut per_bs = Vec::with_capacity(self.config.active_bs.len());

        for (i, &bs_id) in self.config.active_bs.iter().enumerate() {
            let tx = bs_id - 1;
            let tx_antenna = &self.antennas.bs_tx[i];
            let mut channels = BsChannels {
                bs_id,
                bs_location: None,
                ue_indices: Vec::new(),
                ue: Vec::new(),
                ue_locations: Vec::new(),
                bs: Vec::new(),
            };

            if let (true, Some(ue_antenna)) = (self.config.user_links, &self.antennas.ue) {
                let data = store.load(tx, self.config.user_indices.as_deref(), LinkFamily::User)?;
                channels.ue = data
                    .receivers
                    .par_iter()
                    .map(|rx| self.synthesize(&rx.paths, tx_antenna, ue_antenna))
                    .collect::<Result<Vec<_>, _>>()?;
                channels.ue_indices = data.receivers.iter().map(|rx| rx.rx_index).collect();
                channels.ue_locations = receiver_positions(&data.receivers);
                channels.bs_location = Some(data.tx_location);
                info!("BS{}: generated {} user channels", bs_id, channels.ue.len());
            }

            if self.config.bs_links {
                let data = store.load(tx, Some(&bs_receivers), LinkFamily::BaseStation)?;
                channels.bs = data
                    .receivers
                    .par_iter()
                    .enumerate()
                    .map(|(j, rx)| self.synthesize(&rx.paths, tx_antenna, &self.antennas.bs_rx[j]))
                    .collect::<Result<Vec<_>, _>>()?;
                channels.bs_location.get_or_insert(data.tx_location);
                info!("BS{}: generated {} base-station channels", bs_id, channels.bs.len());
            }

            per_bs.push(channels);
        }

        let mut result = SceneChannels {
            scene,
            per_bs,
            delay_window: None,
        };
        if let ChannelKind::Ofdm { grid, .. } = &self.kind {
            result.delay_window = verify_delay_window(&result, grid.symbol_duration());
        }

        Ok(result)
    }

    fn synthesize(
        &self,
        record: &PathRecord,
        tx_antenna: &Arc<AntennaArray>,
        rx_antenna: &Arc<AntennaArray>,
    ) -> Result<Channel, SynthError> {
        let paths = PathSet::new(record, self.params.carrier_freq, self.config.max_paths)?
            .apply_antenna_parameters(tx_antenna, rx_antenna)?;
        let mut channel = Channel::new(
            Arc::clone(tx_antenna),
            Arc::clone(rx_antenna),
            paths,
            self.kind.clone(),
        );
        channel.generate()?;
        Ok(channel)
    }
}

fn validate_active_bs(active_bs: &[usize], num_bs: usize) -> Result<(), SynthError> {
    if active_bs.is_empty() {
        return Err(SynthError::InvalidConfiguration(
            "no active base stations".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for &id in active_bs {
        if id == 0 || id > num_bs {
            return Err(SynthError::InvalidConfiguration(format!(
                "active base station {} is outside 1..={}",
                id, num_bs
            )));
        }
        if !seen.insert(id) {
            return Err(SynthError::InvalidConfiguration(format!(
                "active base station {} is listed twice",
                id
            )));
        }
    }
    Ok(())
}

fn receiver_positions(receivers: &[ReceiverRays]) -> Vec<Position> {
    receivers.iter().map(|rx| rx.location.position).collect()
}

/// Check how much power arrives after the useful OFDM symbol duration
///
/// Logs a warning when the mean clipped ratio over the violating links
/// reaches one percent.
pub fn verify_delay_window(scene: &SceneChannels, window: f64) -> Option<DelayWindowReport> {
    let ratios: Vec<f64> = scene
        .channels()
        .map(Channel::paths)
        .filter(|paths| paths.max_toa() >= window)
        .map(|paths| paths.power_beyond(window))
        .collect();

    if ratios.is_empty() {
        debug!("Scene {}: every path arrives within the OFDM symbol", scene.scene);
        return None;
    }

    let report = DelayWindowReport {
        window,
        violating_links: ratios.len(),
        mean_ratio: ratios.iter().sum::<f64>() / ratios.len() as f64,
    };
    if report.mean_ratio >= DELAY_WINDOW_WARN_RATIO {
        warn!(
            "Scene {}: {} links have paths beyond the OFDM symbol duration of {:.3e} s, mean clipped power {:.2}%",
            scene.scene,
            report.violating_links,
            window,
            100.0 * report.mean_ratio
        );
    }
    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::antenna::AntennaArrayConfig;
    use crate::channel::{ChannelCoeffs, SubcarrierSelection};
    use common::LosStatus;
    use raytrace::RayShard;
    use std::path::Path;

    fn path_matrix(toa: f64, power_dbm: f64, los: bool) -> ndarray::Array2<f64> {
        let record = PathRecord {
            power: vec![common::dbm_to_linear(power_dbm)],
            phase: vec![0.0],
            toa: vec![toa],
            dod_theta: vec![90.0],
            dod_phi: vec![0.0],
            doa_theta: vec![90.0],
            doa_phi: vec![0.0],
            los: vec![los],
            doppler: None,
        };
        record.to_matrix()
    }

    fn write_scenario(dir: &Path) {
        let format = ShardFormat::Mat;
        ScenarioParams {
            carrier_freq: 28e9,
            transmit_power: 0.0,
            num_bs: 2,
            user_grids: vec![[1, 1, 3]],
            doppler_enabled: false,
            polarization_enabled: false,
        }
        .save(dir, format)
        .unwrap();

        let scene = dir.join("scene_0");
        std::fs::create_dir(&scene).unwrap();
        for tx in 0..2 {
            let users = RayShard {
                channels: vec![
                    path_matrix(10e-9, -60.0, true),
                    ndarray::Array2::zeros((8, 0)),
                    path_matrix(2e-6, -70.0, false),
                ],
                rx_locs: (0..3).map(|u| [u as f64, 1.0, 1.5, 20.0, 90.0]).collect(),
                tx_loc: None,
            };
            RayTracingDataStore::write_shard(&scene, format, LinkFamily::User, tx, 0, &users).unwrap();

            let stations = RayShard {
                channels: vec![path_matrix(5e-8, -50.0, true); 2],
                rx_locs: vec![[0.0, 0.0, 10.0, 0.0, 0.0], [50.0, 0.0, 10.0, 50.0, 80.0]],
                tx_loc: None,
            };
            RayTracingDataStore::write_shard(&scene, format, LinkFamily::BaseStation, tx, 0, &stations)
                .unwrap();
        }
    }

    fn antennas(n: usize) -> LinkAntennas {
        let bs = |shape| {
            Arc::new(
                AntennaArray::new(AntennaArrayConfig {
                    shape,
                    ..AntennaArrayConfig::single_element()
                })
                .unwrap(),
            )
        };
        LinkAntennas {
            bs_tx: vec![bs([1, 4, 1]); n],
            bs_rx: (0..n).map(|i| bs([1, i + 1, 1])).collect(),
            ue: Some(bs([1, 1, 1])),
        }
    }

    fn config(dir: &Path, mode: SynthesisMode) -> SceneBuildConfig {
        SceneBuildConfig {
            scenario_dir: dir.to_path_buf(),
            format: ShardFormat::Mat,
            active_bs: vec![1, 2],
            max_paths: Some(5),
            doppler: false,
            user_links: true,
            bs_links: true,
            user_indices: None,
            mode,
        }
    }

    fn ofdm_mode() -> SynthesisMode {
        SynthesisMode::Ofdm(OfdmConfig {
            bandwidth: 100e6,
            num_subcarriers: 64,
            subcarriers: SubcarrierSelection::Range { start: 0, end: 64, step: 2 },
        })
    }

    #[test]
    fn test_build_ofdm_scene() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario(dir.path());

        let builder = SceneChannelBuilder::new(config(dir.path(), ofdm_mode()), antennas(2)).unwrap();
        let scenes = builder.build(&[0]).unwrap();
        assert_eq!(scenes.len(), 1);
        let scene = &scenes[0];
        assert_eq!(scene.per_bs.len(), 2);
        assert_eq!(scene.per_bs[1].bs_id, 2);

        let ue0 = scene.ue_channel(0, 0).unwrap();
        assert_eq!(ue0.coeffs().unwrap().shape(), vec![1, 4, 32]);
        assert_eq!(ue0.los_status(), LosStatus::Los);

        // User 1 has no connectivity
        let ue1 = scene.ue_channel(0, 1).unwrap();
        assert!(ue1.coeffs().is_none());
        assert_eq!(ue1.los_status().code(), -1);

        assert_eq!(scene.ue_channel(1, 2).unwrap().los_status(), LosStatus::NonLos);
        assert_eq!(scene.ue_location(0, 2), Some([2.0, 1.0, 1.5]));

        // Receiving base stations keep their own arrays
        assert_eq!(scene.bs_channel(0, 0).unwrap().coeffs().unwrap().shape(), vec![1, 4, 32]);
        assert_eq!(scene.bs_channel(0, 1).unwrap().coeffs().unwrap().shape(), vec![2, 4, 32]);
        assert!(scene.bs_channel(0, 2).is_none());

        // Transmitter positions come from the base-station shards
        assert_eq!(scene.bs_location(1), Some([50.0, 0.0, 10.0]));
    }

    #[test]
    fn test_delay_window_report() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario(dir.path());

        let builder = SceneChannelBuilder::new(config(dir.path(), ofdm_mode()), antennas(2)).unwrap();
        let scene = builder.build_scene(0).unwrap();

        // User 2 of both base stations arrives after 640 ns with all its power
        let report = scene.delay_window.unwrap();
        assert_eq!(report.violating_links, 2);
        assert!((report.mean_ratio - 1.0).abs() < 1e-12);
        assert!((report.window - 64.0 / 100e6).abs() < 1e-18);
    }

    #[test]
    fn test_build_radar_scene() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario(dir.path());

        let mode = SynthesisMode::Radar(FmcwConfig {
            n_chirps: 4,
            n_samples_per_chirp: 32,
            chirp_slope: 1e13,
            sampling_rate: 8e6,
            chirp_period: None,
        });
        let mut cfg = config(dir.path(), mode);
        cfg.user_links = false;
        cfg.active_bs = vec![2];

        let builder = SceneChannelBuilder::new(cfg, antennas(1)).unwrap();
        let scene = builder.build_scene(0).unwrap();
        assert!(scene.per_bs[0].ue.is_empty());
        assert!(scene.delay_window.is_none());

        let channel = scene.bs_channel(0, 0).unwrap();
        assert!(channel.waveform().is_some());
        match channel.coeffs().unwrap() {
            ChannelCoeffs::Radar(coeffs) => assert_eq!(coeffs.dim(), (1, 4, 32, 4)),
            other => panic!("unexpected coefficients {:?}", other.shape()),
        }
        assert_eq!(scene.bs_location(0), Some([50.0, 0.0, 10.0]));
    }

    #[test]
    fn test_user_subset() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario(dir.path());

        let mut cfg = config(dir.path(), ofdm_mode());
        cfg.user_indices = Some(vec![2, 0]);
        cfg.bs_links = false;
        let builder = SceneChannelBuilder::new(cfg, antennas(2)).unwrap();
        let scene = builder.build_scene(0).unwrap();

        assert_eq!(scene.per_bs[0].ue_indices, vec![2, 0]);
        assert!(scene.ue_channel(0, 1).is_none());
        assert!(scene.ue_channel(0, 0).is_some());
    }

    #[test]
    fn test_antenna_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario(dir.path());

        let err = SceneChannelBuilder::new(config(dir.path(), ofdm_mode()), antennas(1))
            .err()
            .unwrap();
        assert!(matches!(err, SynthError::AntennaCountMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn test_invalid_active_bs() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario(dir.path());

        let mut cfg = config(dir.path(), ofdm_mode());
        cfg.active_bs = vec![1, 3];
        let err = SceneChannelBuilder::new(cfg, antennas(2)).err().unwrap();
        assert!(matches!(err, SynthError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_user_links_need_user_antenna() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario(dir.path());

        let mut links = antennas(2);
        links.ue = None;
        let err = SceneChannelBuilder::new(config(dir.path(), ofdm_mode()), links).err().unwrap();
        assert!(matches!(err, SynthError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_missing_scene() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario(dir.path());

        let builder = SceneChannelBuilder::new(config(dir.path(), ofdm_mode()), antennas(2)).unwrap();
        let err = builder.build(&[0, 1]).unwrap_err();
        assert!(matches!(err, SynthError::RayTrace(_)));
    }
}
