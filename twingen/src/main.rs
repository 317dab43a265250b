//! Digital-twin channel generator
//!
//! Loads a run configuration, synthesizes the channels of the requested
//! scenes from ray-traced paths and writes a JSON summary of every link.

mod config;
mod summary;

use anyhow::{Context, Result};
use clap::Parser;
use common::format_with_si_prefix;
use std::path::PathBuf;
use synth::SceneChannelBuilder;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::RunConfig;
use crate::summary::RunSummary;

/// Ray-traced wireless channel synthesis
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the run configuration (TOML or YAML)
    #[arg(short, long, default_value = "twingen.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Scenes to build, overriding the configuration (e.g. "0,1,2")
    #[arg(short, long, value_delimiter = ',')]
    scenes: Option<Vec<usize>>,

    /// Seed of the antenna rotation sampler, overriding the configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Where to write the JSON link summary
    #[arg(short, long, default_value = "channels.json")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Starting twingen");
    info!("Configuration file: {}", args.config.display());

    let mut config = RunConfig::from_file(&args.config)?;
    if let Some(scenes) = args.scenes {
        config.scenes = scenes;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate().context("invalid run configuration")?;

    let antennas = config.build_antennas()?;
    let builder = SceneChannelBuilder::new(config.scene_build_config()?, antennas)
        .context("failed to set up the scene builder")?;

    info!("Run configuration:");
    info!("  Scenario: {}", config.scenario_dir.display());
    info!("  Mode: {}", config.mode_name());
    info!("  Carrier: {}", format_with_si_prefix(builder.params().carrier_freq, "Hz"));
    info!("  Active base stations: {:?}", config.active_bs);
    info!("  Scenes: {:?}", config.scenes);

    let mut summary = RunSummary::new(config.mode_name(), builder.params().carrier_freq);
    for &scene in &config.scenes {
        let channels = builder
            .build_scene(scene)
            .with_context(|| format!("failed to build scene {}", scene))?;

        let before = summary.links.len();
        summary.add_scene(&channels);
        info!("Scene {}: {} links", scene, summary.links.len() - before);
    }

    let connected = summary.connected_links();
    if connected == 0 {
        warn!("No link has a channel");
    }
    summary.write(&args.output)?;
    info!(
        "Wrote {} links ({} with a channel) to {}",
        summary.links.len(),
        connected,
        args.output.display()
    );

    Ok(())
}
