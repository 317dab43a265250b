//! Ray-Tracing Storage Interfaces Library
//!
//! This crate indexes and loads the sharded ray-tracing output of a scenario:
//! per-scene MAT-file shards holding base-station-to-base-station and
//! base-station-to-user path matrices, plus the scenario parameter file.

pub mod format;
pub mod manifest;
pub mod mat;
pub mod path_record;
pub mod scenario;
pub mod shard;
pub mod store;

pub use format::{ShardDocument, ShardFormat};
pub use mat::{MatFile, MatValue};
pub use manifest::{LinkFamily, ShardEntry, ShardManifest, ShardSelection};
pub use path_record::{DopplerTerms, PathRecord, POWER_NORMALIZATION_OFFSET_DB};
pub use scenario::ScenarioParams;
pub use shard::{RayShard, RxLocation};
pub use store::{RayData, RayTracingDataStore, ReceiverRays};

use std::path::PathBuf;
use thiserror::Error;

/// Ray-tracing storage errors
#[derive(Error, Debug)]
pub enum RayTraceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },

    #[error("Shard filename '{0}' does not match the expected naming convention")]
    InvalidShardName(String),

    #[error("No {family} shards for transmitter {tx}")]
    UnknownTransmitter { tx: usize, family: LinkFamily },

    #[error("No {family} shard of transmitter {tx} covers receiver {rx}")]
    MissingShard { tx: usize, rx: usize, family: LinkFamily },

    #[error("{family} shards of transmitter {tx} overlap at receiver {rx}")]
    OverlappingShards { tx: usize, rx: usize, family: LinkFamily },

    #[error("{family} shards of transmitter {tx} leave receivers {start}-{end} uncovered")]
    ShardGap {
        tx: usize,
        start: usize,
        end: usize,
        family: LinkFamily,
    },

    #[error("Malformed path matrix for receiver {rx} in {path}: {reason}")]
    MalformedPaths {
        path: PathBuf,
        rx: usize,
        reason: String,
    },

    #[error("Missing field '{field}' in {path}")]
    MissingField { path: PathBuf, field: String },

    #[error("No location available for transmitter {0}")]
    MissingTxLocation(usize),

    #[error("Invalid scenario parameters in {path}: {reason}")]
    InvalidScenario { path: PathBuf, reason: String },
}

/// Result alias for ray-tracing storage operations
pub type RayTraceResult<T> = Result<T, RayTraceError>;
