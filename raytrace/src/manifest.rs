//! Shard manifest of one scene directory
//!
//! Shards are discovered by filename:
//!
//! ```text
//! BS<k>_BS.mat              base station k to every base station
//! BS<k>_UE_<start>-<end>.mat base station k to users start..=end
//! ```
//!
//! Other [`ShardFormat`]s swap the extension. Base-station numbers in
//! filenames are 1-based; the manifest stores 0-based transmitter indices.
//! Receiver ranges are inclusive.

use crate::{RayTraceError, RayTraceResult, ShardFormat};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Receiver family of a shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkFamily {
    /// Base station to base station
    BaseStation,
    /// Base station to user equipment
    User,
}

impl fmt::Display for LinkFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkFamily::BaseStation => f.write_str("BS-BS"),
            LinkFamily::User => f.write_str("BS-UE"),
        }
    }
}

/// One shard file and the receivers it holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardEntry {
    /// 0-based transmitter index
    pub tx: usize,
    /// First receiver index (inclusive)
    pub rx_start: usize,
    /// Last receiver index (inclusive)
    pub rx_end: usize,
    /// Location of the shard file
    pub path: PathBuf,
}

impl ShardEntry {
    /// Whether `rx` falls inside this shard's range
    pub fn covers(&self, rx: usize) -> bool {
        rx >= self.rx_start && rx <= self.rx_end
    }

    /// Offset of `rx` inside the shard
    pub fn offset(&self, rx: usize) -> usize {
        rx - self.rx_start
    }

    /// Number of receivers in the range
    pub fn len(&self) -> usize {
        (self.rx_end - self.rx_start).saturating_add(1)
    }
}

/// Receivers requested from one shard, in request order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSelection<'a> {
    pub shard: &'a ShardEntry,
    pub receivers: Vec<usize>,
}

/// Index of the shard files of one scene
#[derive(Debug, Clone, Default)]
pub struct ShardManifest {
    /// Per transmitter, shards sorted by range start
    base_station: BTreeMap<usize, Vec<ShardEntry>>,
    user: BTreeMap<usize, Vec<ShardEntry>>,
}

impl ShardManifest {
    /// Scan a scene directory for shard files of the given format
    pub fn scan(directory: &Path, format: ShardFormat) -> RayTraceResult<Self> {
        let ext = regex::escape(format.extension());
        let bs_pattern = Regex::new(&format!(r"^BS(\d+)_BS\.{}$", ext))
            .map_err(|e| RayTraceError::InvalidShardName(e.to_string()))?;
        let ue_pattern = Regex::new(&format!(r"^BS(\d+)_UE_(\d+)-(\d+)\.{}$", ext))
            .map_err(|e| RayTraceError::InvalidShardName(e.to_string()))?;
        let suffix = format!(".{}", format.extension());

        let dir_entries = std::fs::read_dir(directory).map_err(|source| RayTraceError::Io {
            path: directory.to_path_buf(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in dir_entries {
            let entry = entry.map_err(|source| RayTraceError::Io {
                path: directory.to_path_buf(),
                source,
            })?;
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with("BS") && name.ends_with(&suffix) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        let mut bs_txs = Vec::new();
        let mut ue_entries = Vec::new();

        for name in names {
            let path = directory.join(&name);
            if let Some(caps) = bs_pattern.captures(&name) {
                let tx = parse_bs_number(&name, &caps[1])?;
                bs_txs.push((tx, path));
            } else if let Some(caps) = ue_pattern.captures(&name) {
                let tx = parse_bs_number(&name, &caps[1])?;
                let rx_start = parse_index(&name, &caps[2])?;
                let rx_end = parse_index(&name, &caps[3])?;
                if rx_end < rx_start {
                    return Err(RayTraceError::InvalidShardName(name));
                }
                ue_entries.push(ShardEntry {
                    tx,
                    rx_start,
                    rx_end,
                    path,
                });
            } else {
                return Err(RayTraceError::InvalidShardName(name));
            }
        }

        // A BS-BS shard holds every base station as a receiver
        let bs_entries = match (
            bs_txs.iter().map(|(tx, _)| *tx).min(),
            bs_txs.iter().map(|(tx, _)| *tx).max(),
        ) {
            (Some(rx_start), Some(rx_end)) => bs_txs
                .into_iter()
                .map(|(tx, path)| ShardEntry {
                    tx,
                    rx_start,
                    rx_end,
                    path,
                })
                .collect(),
            _ => Vec::new(),
        };

        let manifest = Self::from_entries(bs_entries, ue_entries)?;
        info!(
            "Indexed {} BS-BS and {} BS-UE shards in {}",
            manifest.num_shards(LinkFamily::BaseStation),
            manifest.num_shards(LinkFamily::User),
            directory.display()
        );
        Ok(manifest)
    }

    /// Build a manifest from explicit entries, validating the range invariants
    pub fn from_entries(
        base_station: Vec<ShardEntry>,
        user: Vec<ShardEntry>,
    ) -> RayTraceResult<Self> {
        Ok(Self {
            base_station: group_entries(base_station, LinkFamily::BaseStation)?,
            user: group_entries(user, LinkFamily::User)?,
        })
    }

    fn family(&self, family: LinkFamily) -> &BTreeMap<usize, Vec<ShardEntry>> {
        match family {
            LinkFamily::BaseStation => &self.base_station,
            LinkFamily::User => &self.user,
        }
    }

    /// Shards of one transmitter
    pub fn shards(&self, tx: usize, family: LinkFamily) -> RayTraceResult<&[ShardEntry]> {
        self.family(family)
            .get(&tx)
            .map(|entries| entries.as_slice())
            .ok_or(RayTraceError::UnknownTransmitter { tx, family })
    }

    /// Total number of shard files of a family
    pub fn num_shards(&self, family: LinkFamily) -> usize {
        self.family(family).values().map(Vec::len).sum()
    }

    /// Transmitters that have shards of a family
    pub fn transmitters(&self, family: LinkFamily) -> Vec<usize> {
        self.family(family).keys().copied().collect()
    }

    /// Every receiver index the filenames of a transmitter claim, ascending
    ///
    /// Ranges come from filenames, so this may be far larger than what the
    /// shards hold.
    pub fn receivers(
        &self,
        tx: usize,
        family: LinkFamily,
    ) -> RayTraceResult<impl Iterator<Item = usize> + '_> {
        Ok(self
            .shards(tx, family)?
            .iter()
            .flat_map(|entry| entry.rx_start..=entry.rx_end))
    }

    /// Resolve the shards covering the requested receivers
    ///
    /// Selections are ordered by range start; each lists its receivers in
    /// request order, without duplicates.
    pub fn resolve(
        &self,
        tx: usize,
        rx_indices: &[usize],
        family: LinkFamily,
    ) -> RayTraceResult<Vec<ShardSelection<'_>>> {
        let shards = self.shards(tx, family)?;
        let mut selections: Vec<ShardSelection<'_>> = Vec::new();
        let mut seen = HashSet::new();

        for &rx in rx_indices {
            if !seen.insert(rx) {
                continue;
            }
            let position = shards
                .iter()
                .position(|entry| entry.covers(rx))
                .ok_or(RayTraceError::MissingShard { tx, rx, family })?;
            let shard = &shards[position];

            match selections.iter_mut().find(|sel| std::ptr::eq(sel.shard, shard)) {
                Some(selection) => selection.receivers.push(rx),
                None => selections.push(ShardSelection {
                    shard,
                    receivers: vec![rx],
                }),
            }
        }

        selections.sort_by_key(|sel| sel.shard.rx_start);
        debug!(
            "Resolved {} receivers of transmitter {} to {} {} shards",
            seen.len(),
            tx,
            selections.len(),
            family
        );
        Ok(selections)
    }
}

fn parse_index(name: &str, digits: &str) -> RayTraceResult<usize> {
    digits
        .parse::<usize>()
        .map_err(|_| RayTraceError::InvalidShardName(name.to_string()))
}

/// Filenames number base stations from 1
fn parse_bs_number(name: &str, digits: &str) -> RayTraceResult<usize> {
    match parse_index(name, digits)? {
        0 => Err(RayTraceError::InvalidShardName(name.to_string())),
        k => Ok(k - 1),
    }
}

fn group_entries(
    entries: Vec<ShardEntry>,
    family: LinkFamily,
) -> RayTraceResult<BTreeMap<usize, Vec<ShardEntry>>> {
    let mut grouped: BTreeMap<usize, Vec<ShardEntry>> = BTreeMap::new();
    for entry in entries {
        grouped.entry(entry.tx).or_default().push(entry);
    }

    for (&tx, shards) in grouped.iter_mut() {
        shards.sort_by_key(|entry| entry.rx_start);
        for pair in shards.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.rx_start <= prev.rx_end {
                return Err(RayTraceError::OverlappingShards {
                    tx,
                    rx: next.rx_start,
                    family,
                });
            }
            if next.rx_start > prev.rx_end.saturating_add(1) {
                return Err(RayTraceError::ShardGap {
                    tx,
                    start: prev.rx_end + 1,
                    end: next.rx_start - 1,
                    family,
                });
            }
        }
    }

    Ok(grouped)
}
