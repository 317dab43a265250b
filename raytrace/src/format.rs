//! Shard and parameter-file encodings
//!
//! The ray tracer exports MATLAB MAT-files. Bincode and JSON renditions of
//! the same documents are accepted for scenarios converted ahead of time.

use crate::mat::MatFile;
use crate::{RayTraceError, RayTraceResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::trace;

/// On-disk encoding of shard and scenario-parameter files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShardFormat {
    /// MATLAB level 5 MAT-file (`.mat`), as exported by the ray tracer
    #[default]
    Mat,
    /// Compact binary encoding (`.bin`)
    Bincode,
    /// Human-readable encoding (`.json`)
    Json,
}

/// A file stored in any [`ShardFormat`]
///
/// Serde covers the bincode and JSON encodings; MAT-files map named
/// variables onto the document by hand.
pub trait ShardDocument: Serialize + DeserializeOwned + Sized {
    fn from_mat(file: &MatFile, path: &Path) -> RayTraceResult<Self>;

    fn to_mat(&self) -> MatFile;
}

impl ShardFormat {
    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ShardFormat::Mat => "mat",
            ShardFormat::Bincode => "bin",
            ShardFormat::Json => "json",
        }
    }

    /// Decode a document from raw bytes
    pub fn decode<T: ShardDocument>(&self, bytes: &[u8], path: &Path) -> RayTraceResult<T> {
        let result = match self {
            ShardFormat::Mat => {
                let file = MatFile::parse(bytes).map_err(|message| RayTraceError::Decode {
                    path: path.to_path_buf(),
                    message,
                })?;
                return T::from_mat(&file, path);
            }
            ShardFormat::Bincode => bincode::deserialize(bytes).map_err(|e| e.to_string()),
            ShardFormat::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
        };

        result.map_err(|message| RayTraceError::Decode {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Encode a document to raw bytes
    pub fn encode<T: ShardDocument>(&self, value: &T, path: &Path) -> RayTraceResult<Vec<u8>> {
        let result = match self {
            ShardFormat::Mat => value.to_mat().to_bytes(),
            ShardFormat::Bincode => bincode::serialize(value).map_err(|e| e.to_string()),
            ShardFormat::Json => serde_json::to_vec(value).map_err(|e| e.to_string()),
        };

        result.map_err(|message| RayTraceError::Encode {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Read and decode a file
    pub fn read<T: ShardDocument>(&self, path: &Path) -> RayTraceResult<T> {
        let bytes = std::fs::read(path).map_err(|source| RayTraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        trace!("Read {} bytes from {}", bytes.len(), path.display());
        self.decode(&bytes, path)
    }

    /// Encode and write a file
    pub fn write<T: ShardDocument>(&self, path: &Path, value: &T) -> RayTraceResult<()> {
        let bytes = self.encode(value, path)?;
        std::fs::write(path, bytes).map_err(|source| RayTraceError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fetch a required MAT-file variable
pub(crate) fn mat_variable<'a>(
    file: &'a MatFile,
    name: &str,
    path: &Path,
) -> RayTraceResult<&'a crate::mat::MatValue> {
    file.get(name).ok_or_else(|| RayTraceError::MissingField {
        path: path.to_path_buf(),
        field: name.to_string(),
    })
}
