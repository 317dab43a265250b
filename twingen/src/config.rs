//! Run configuration
//!
//! A run file names the scenario, the scenes and base stations to build and
//! exactly one synthesis mode with its antennas. TOML and YAML are accepted.

use anyhow::{bail, Context};
use raytrace::ShardFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use synth::{
    AntennaArray, AntennaArrayConfig, AntennaFactory, AntennaSettings, FmcwConfig, LinkAntennas,
    OfdmConfig, SceneBuildConfig, SynthesisMode,
};

/// Top-level run configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Scenario directory holding the parameter file and `scene_<n>` directories
    pub scenario_dir: PathBuf,
    /// Shard encoding of the scenario
    #[serde(default)]
    pub format: ShardFormat,
    /// Scenes to build, in order
    #[serde(default = "default_scenes")]
    pub scenes: Vec<usize>,
    /// 1-based ids of the transmitting base stations
    pub active_bs: Vec<usize>,
    /// Keep at most this many paths per link
    #[serde(default)]
    pub max_paths: Option<usize>,
    /// Apply Doppler phases to OFDM paths
    #[serde(default)]
    pub doppler: bool,
    /// Also build base-station-to-base-station links in communication mode
    #[serde(default)]
    pub bs_links: bool,
    /// Restrict user links to these users
    #[serde(default)]
    pub user_indices: Option<Vec<usize>>,
    /// Seed of the antenna rotation sampler
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Communication mode
    #[serde(default)]
    pub comm: Option<CommConfig>,
    /// Radar mode
    #[serde(default)]
    pub radar: Option<RadarConfig>,
}

fn default_scenes() -> Vec<usize> {
    vec![0]
}

fn default_seed() -> u64 {
    42
}

/// OFDM links between base stations and users
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommConfig {
    pub bs_antenna: AntennaSettings,
    /// Single isotropic element when absent
    #[serde(default)]
    pub ue_antenna: Option<AntennaSettings>,
    pub ofdm: OfdmConfig,
}

/// FMCW links between base stations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RadarConfig {
    pub tx_antenna: AntennaSettings,
    pub rx_antenna: AntennaSettings,
    pub fmcw: FmcwConfig,
}

impl RunConfig {
    /// Load configuration from a TOML or YAML file, chosen by extension
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let config: RunConfig = match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            other => bail!("unsupported configuration format '{}' for {}", other, path.display()),
        };
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        match (&self.comm, &self.radar) {
            (Some(_), Some(_)) => bail!("configure either [comm] or [radar], not both"),
            (None, None) => bail!("one of [comm] or [radar] is required"),
            _ => {}
        }
        if self.active_bs.is_empty() {
            bail!("active_bs must name at least one base station");
        }
        if self.scenes.is_empty() {
            bail!("no scenes to build");
        }
        if self.max_paths == Some(0) {
            bail!("max_paths must be at least 1");
        }
        Ok(())
    }

    pub fn mode_name(&self) -> &'static str {
        if self.radar.is_some() {
            "radar"
        } else {
            "ofdm"
        }
    }

    /// Scene builder configuration; radar runs only build BS-BS links
    pub fn scene_build_config(&self) -> anyhow::Result<SceneBuildConfig> {
        let (mode, user_links, bs_links) = match (&self.comm, &self.radar) {
            (Some(comm), None) => (SynthesisMode::Ofdm(comm.ofdm.clone()), true, self.bs_links),
            (None, Some(radar)) => (SynthesisMode::Radar(radar.fmcw.clone()), false, true),
            _ => bail!("exactly one of [comm] or [radar] is required"),
        };

        Ok(SceneBuildConfig {
            scenario_dir: self.scenario_dir.clone(),
            format: self.format,
            active_bs: self.active_bs.clone(),
            max_paths: self.max_paths,
            doppler: self.doppler,
            user_links,
            bs_links,
            user_indices: self.user_indices.clone(),
            mode,
        })
    }

    /// Instantiate one antenna per active base station, plus the user antenna
    pub fn build_antennas(&self) -> anyhow::Result<LinkAntennas> {
        let mut factory = AntennaFactory::seeded(self.seed);
        let count = self.active_bs.len();

        match (&self.comm, &self.radar) {
            (Some(comm), None) => {
                let bs = factory
                    .from_settings(&comm.bs_antenna, count)
                    .context("invalid base-station antenna")?;
                let ue = match &comm.ue_antenna {
                    Some(settings) => factory
                        .from_settings(settings, 1)
                        .context("invalid user antenna")?
                        .into_iter()
                        .next(),
                    None => Some(Arc::new(AntennaArray::new(AntennaArrayConfig::single_element())?)),
                };
                Ok(LinkAntennas {
                    bs_tx: bs.clone(),
                    bs_rx: bs,
                    ue,
                })
            }
            (None, Some(radar)) => Ok(LinkAntennas {
                bs_tx: factory
                    .from_settings(&radar.tx_antenna, count)
                    .context("invalid radar transmit antenna")?,
                bs_rx: factory
                    .from_settings(&radar.rx_antenna, count)
                    .context("invalid radar receive antenna")?,
                ue: None,
            }),
            _ => bail!("exactly one of [comm] or [radar] is required"),
        }
    }
}
