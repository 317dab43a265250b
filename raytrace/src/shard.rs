//! Shard file content
//!
//! A MAT-file shard holds three variables: `channels`, a 1 x N cell of
//! 1 x 1 structs whose first field (`p`) is the path matrix of one receiver,
//! `rx_locs`, an N x 5 matrix, and optionally `tx_loc`.

use crate::format::{mat_variable, ShardDocument};
use crate::mat::{MatFile, MatValue};
use crate::{RayTraceError, RayTraceResult};
use common::Position;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Struct field holding the path matrix of one receiver
const PATHS_FIELD: &str = "p";

/// One shard file: path matrices and receiver metadata for a contiguous
/// receiver range of one transmitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RayShard {
    /// Path matrix per local receiver offset (rows x paths)
    pub channels: Vec<Array2<f64>>,
    /// Per local receiver offset: x, y, z, distance, path loss
    pub rx_locs: Vec<[f64; 5]>,
    /// Transmitter position, when the ray tracer exported it
    #[serde(default)]
    pub tx_loc: Option<Position>,
}

impl RayShard {
    /// Number of receivers stored in this shard
    pub fn num_receivers(&self) -> usize {
        self.channels.len()
    }
}

impl ShardDocument for RayShard {
    fn from_mat(file: &MatFile, path: &Path) -> RayTraceResult<Self> {
        let decode_error = |message: String| RayTraceError::Decode {
            path: path.to_path_buf(),
            message,
        };

        let cells = mat_variable(file, "channels", path)?
            .cells()
            .ok_or_else(|| decode_error("'channels' is not a cell array".to_string()))?;
        let channels = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                // Older exports store the matrix directly in the cell
                let paths = match cell {
                    MatValue::Struct { .. } => cell
                        .field(PATHS_FIELD)
                        .or_else(|| cell.first_field())
                        .ok_or_else(|| RayTraceError::MissingField {
                            path: path.to_path_buf(),
                            field: format!("channels[{}].{}", i, PATHS_FIELD),
                        })?,
                    other => other,
                };
                paths
                    .to_array2()
                    .map_err(|e| decode_error(format!("channels[{}]: {}", i, e)))
            })
            .collect::<RayTraceResult<Vec<_>>>()?;

        let locs = mat_variable(file, "rx_locs", path)?
            .to_array2()
            .map_err(|e| decode_error(format!("rx_locs: {}", e)))?;
        if locs.nrows() > 0 && locs.ncols() < 5 {
            return Err(decode_error(format!(
                "rx_locs has {} columns, expected at least 5",
                locs.ncols()
            )));
        }
        let rx_locs = locs
            .rows()
            .into_iter()
            .map(|row| [row[0], row[1], row[2], row[3], row[4]])
            .collect();

        let tx_loc = match file.get("tx_loc") {
            Some(value) => {
                let values = value
                    .values()
                    .filter(|v| v.len() >= 3)
                    .ok_or_else(|| decode_error("tx_loc must hold 3 coordinates".to_string()))?;
                Some([values[0], values[1], values[2]])
            }
            None => None,
        };

        Ok(Self {
            channels,
            rx_locs,
            tx_loc,
        })
    }

    fn to_mat(&self) -> MatFile {
        let cells = self
            .channels
            .iter()
            .map(|paths| {
                MatValue::structure(vec![(PATHS_FIELD.to_string(), MatValue::matrix(paths))])
            })
            .collect();

        let mut locs = Array2::zeros((self.rx_locs.len(), 5));
        for (mut row, loc) in locs.rows_mut().into_iter().zip(&self.rx_locs) {
            row.assign(&ndarray::aview1(&loc[..]));
        }

        let mut file = MatFile::new();
        file.insert("channels", MatValue::cell_row(cells));
        file.insert("rx_locs", MatValue::matrix(&locs));
        if let Some(tx_loc) = self.tx_loc {
            file.insert("tx_loc", MatValue::row(&tx_loc));
        }
        file
    }
}

/// Receiver position and link metadata
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RxLocation {
    /// Cartesian position (m)
    pub position: Position,
    /// Transmitter-receiver distance (m)
    pub distance: f64,
    /// Path loss (dB)
    pub path_loss: f64,
}

impl From<[f64; 5]> for RxLocation {
    fn from(row: [f64; 5]) -> Self {
        Self {
            position: [row[0], row[1], row[2]],
            distance: row[3],
            path_loss: row[4],
        }
    }
}

impl From<RxLocation> for [f64; 5] {
    fn from(loc: RxLocation) -> Self {
        [
            loc.position[0],
            loc.position[1],
            loc.position[2],
            loc.distance,
            loc.path_loss,
        ]
    }
}
