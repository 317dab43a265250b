//! JSON run summary, one entry per synthesized link

use anyhow::Context;
use raytrace::LinkFamily;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use synth::{Channel, SceneChannels};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkSummary {
    pub scene: usize,
    /// "BS-UE" or "BS-BS"
    pub family: String,
    /// 1-based transmitting base station
    pub tx: usize,
    /// User index, or 1-based receiving base station
    pub rx: usize,
    pub num_paths: usize,
    /// Absent when the link has no channel
    pub shape: Option<Vec<usize>>,
    /// -1 no path, 0 non-LoS, 1 LoS
    pub los: i8,
    pub energy: f64,
}

impl LinkSummary {
    fn new(scene: usize, family: LinkFamily, tx: usize, rx: usize, channel: &Channel) -> Self {
        let coeffs = channel.coeffs();
        Self {
            scene,
            family: family.to_string(),
            tx,
            rx,
            num_paths: channel.paths().num_paths(),
            shape: coeffs.map(|c| c.shape()),
            los: channel.los_status().code(),
            energy: coeffs.map(|c| c.energy()).unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayWindowSummary {
    pub scene: usize,
    pub window: f64,
    pub violating_links: usize,
    pub mean_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub mode: String,
    pub carrier_freq: f64,
    pub links: Vec<LinkSummary>,
    pub delay_window: Vec<DelayWindowSummary>,
}

impl RunSummary {
    pub fn new(mode: &str, carrier_freq: f64) -> Self {
        Self {
            mode: mode.to_string(),
            carrier_freq,
            links: Vec::new(),
            delay_window: Vec::new(),
        }
    }

    /// Record every link of a built scene
    pub fn add_scene(&mut self, scene: &SceneChannels) {
        for bs in &scene.per_bs {
            for (&ue_index, channel) in bs.ue_indices.iter().zip(&bs.ue) {
                self.links
                    .push(LinkSummary::new(scene.scene, LinkFamily::User, bs.bs_id, ue_index, channel));
            }
            // BS channels follow the active order of `per_bs`
            for (receiver, channel) in scene.per_bs.iter().zip(&bs.bs) {
                self.links.push(LinkSummary::new(
                    scene.scene,
                    LinkFamily::BaseStation,
                    bs.bs_id,
                    receiver.bs_id,
                    channel,
                ));
            }
        }

        if let Some(report) = scene.delay_window {
            self.delay_window.push(DelayWindowSummary {
                scene: scene.scene,
                window: report.window,
                violating_links: report.violating_links,
                mean_ratio: report.mean_ratio,
            });
        }
    }

    pub fn connected_links(&self) -> usize {
        self.links.iter().filter(|l| l.shape.is_some()).count()
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .with_context(|| format!("failed to write {}", path.display()))?;
        writer.flush()?;
        Ok(())
    }
}
