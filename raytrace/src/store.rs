//! Ray-tracing data store of one scene
//!
//! Wraps the shard manifest of a scene directory and loads the path
//! records and receiver metadata of one transmitter.

use crate::manifest::{LinkFamily, ShardManifest};
use crate::path_record::PathRecord;
use crate::shard::{RayShard, RxLocation};
use crate::{RayTraceError, RayTraceResult, ShardFormat};
use common::Position;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Paths and metadata of one receiver
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverRays {
    pub rx_index: usize,
    pub paths: PathRecord,
    pub location: RxLocation,
}

/// Loaded ray-tracing data of one transmitter
#[derive(Debug, Clone, PartialEq)]
pub struct RayData {
    pub tx_index: usize,
    /// Receivers in request order
    pub receivers: Vec<ReceiverRays>,
    pub tx_location: Position,
}

impl RayData {
    pub fn receiver(&self, rx: usize) -> Option<&ReceiverRays> {
        self.receivers.iter().find(|r| r.rx_index == rx)
    }
}

/// Sharded ray-tracing output of one scene
#[derive(Debug, Clone)]
pub struct RayTracingDataStore {
    directory: PathBuf,
    format: ShardFormat,
    manifest: ShardManifest,
}

impl RayTracingDataStore {
    /// Index the shards of a scene directory
    pub fn open(directory: impl AsRef<Path>, format: ShardFormat) -> RayTraceResult<Self> {
        let directory = directory.as_ref().to_path_buf();
        let manifest = ShardManifest::scan(&directory, format)?;
        info!("Opened ray-tracing store at {}", directory.display());

        Ok(Self {
            directory,
            format,
            manifest,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn format(&self) -> ShardFormat {
        self.format
    }

    pub fn manifest(&self) -> &ShardManifest {
        &self.manifest
    }

    /// Load the paths from transmitter `tx` to the given receivers
    ///
    /// `None` loads every receiver stored in the transmitter's shards, in
    /// ascending order. Each shard file is read at most once per call.
    pub fn load(
        &self,
        tx: usize,
        rx_indices: Option<&[usize]>,
        family: LinkFamily,
    ) -> RayTraceResult<RayData> {
        let mut tx_location = None;
        let mut receivers = Vec::new();

        match rx_indices {
            Some(requested) => {
                let selections = self.manifest.resolve(tx, requested, family)?;
                let mut loaded: HashMap<usize, ReceiverRays> = HashMap::new();

                for selection in &selections {
                    let path = &selection.shard.path;
                    let shard = self.read_shard(path, &mut tx_location)?;
                    for &rx in &selection.receivers {
                        let offset = selection.shard.offset(rx);
                        loaded.insert(rx, extract_receiver(&shard, path, rx, offset)?);
                    }
                }

                receivers.reserve(loaded.len());
                for rx in requested {
                    if let Some(receiver) = loaded.remove(rx) {
                        receivers.push(receiver);
                    }
                }
            }
            None => {
                for entry in self.manifest.shards(tx, family)? {
                    let shard = self.read_shard(&entry.path, &mut tx_location)?;

                    // Filename ranges are only trusted up to what the shard holds
                    let count = entry.len().min(shard.num_receivers());
                    if count < entry.len() {
                        warn!(
                            "{} names {} receivers but holds {}",
                            entry.path.display(),
                            entry.len(),
                            shard.num_receivers()
                        );
                    }
                    for offset in 0..count {
                        let rx = entry.rx_start + offset;
                        receivers.push(extract_receiver(&shard, &entry.path, rx, offset)?);
                    }
                }
            }
        }

        let tx_location = match tx_location {
            Some(location) => location,
            None => self.tx_location_from_bs_shards(tx)?,
        };

        debug!(
            "Loaded {} {} receivers of transmitter {}",
            receivers.len(),
            family,
            tx
        );

        Ok(RayData {
            tx_index: tx,
            receivers,
            tx_location,
        })
    }

    /// Read one shard, keeping the first exported transmitter position
    fn read_shard(
        &self,
        path: &Path,
        tx_location: &mut Option<Position>,
    ) -> RayTraceResult<RayShard> {
        let shard: RayShard = self.format.read(path)?;
        debug!(
            "Read shard {} with {} receivers",
            path.display(),
            shard.num_receivers()
        );
        if tx_location.is_none() {
            *tx_location = shard.tx_loc;
        }
        Ok(shard)
    }

    /// Transmitter position as seen by a base-station shard
    ///
    /// Every base-station shard lists all base stations as receivers, so
    /// the transmitter's own row holds its position.
    fn tx_location_from_bs_shards(&self, tx: usize) -> RayTraceResult<Position> {
        let family = LinkFamily::BaseStation;
        let transmitters = self.manifest.transmitters(family);
        let source = if transmitters.contains(&tx) {
            Some(tx)
        } else {
            transmitters.first().copied()
        };
        let Some(source) = source else {
            return Err(RayTraceError::MissingTxLocation(tx));
        };

        let entry = self
            .manifest
            .shards(source, family)?
            .iter()
            .find(|entry| entry.covers(tx))
            .ok_or(RayTraceError::MissingTxLocation(tx))?;

        let shard: RayShard = self.format.read(&entry.path)?;
        let row = shard
            .rx_locs
            .get(entry.offset(tx))
            .ok_or(RayTraceError::MissingTxLocation(tx))?;
        Ok([row[0], row[1], row[2]])
    }

    /// Write a shard file named after its transmitter and receiver range
    pub fn write_shard(
        directory: &Path,
        format: ShardFormat,
        family: LinkFamily,
        tx: usize,
        rx_start: usize,
        shard: &RayShard,
    ) -> RayTraceResult<PathBuf> {
        let name = match family {
            LinkFamily::BaseStation => format!("BS{}_BS.{}", tx + 1, format.extension()),
            LinkFamily::User => format!(
                "BS{}_UE_{}-{}.{}",
                tx + 1,
                rx_start,
                rx_start + shard.num_receivers().saturating_sub(1),
                format.extension()
            ),
        };
        let path = directory.join(name);
        format.write(&path, shard)?;
        Ok(path)
    }
}

fn extract_receiver(
    shard: &RayShard,
    path: &Path,
    rx: usize,
    offset: usize,
) -> RayTraceResult<ReceiverRays> {
    let matrix = shard
        .channels
        .get(offset)
        .ok_or_else(|| RayTraceError::MissingField {
            path: path.to_path_buf(),
            field: format!("channels[{}]", offset),
        })?;
    let location = shard
        .rx_locs
        .get(offset)
        .ok_or_else(|| RayTraceError::MissingField {
            path: path.to_path_buf(),
            field: format!("rx_locs[{}]", offset),
        })?;

    let malformed = |reason: String| RayTraceError::MalformedPaths {
        path: path.to_path_buf(),
        rx,
        reason,
    };
    let paths = PathRecord::from_matrix(matrix.view()).map_err(malformed)?;
    paths.validate().map_err(malformed)?;

    Ok(ReceiverRays {
        rx_index: rx,
        paths,
        location: RxLocation::from(*location),
    })
}
