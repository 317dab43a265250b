//! Channel Synthesis Library
//!
//! This crate turns ray-traced propagation paths into multi-antenna channel
//! tensors: OFDM frequency responses for communication links and FMCW
//! intermediate-frequency samples for radar links.

pub mod antenna;
pub mod channel;
pub mod paths;
pub mod scene;
pub mod waveform;

pub use antenna::{
    AntennaArray, AntennaArrayConfig, AntennaFactory, AntennaSettings, AntennaTemplate,
    RotationSetting, RotationSpec,
};
pub use channel::{Channel, ChannelCoeffs, ChannelKind, OfdmConfig, OfdmGrid, SubcarrierSelection};
pub use paths::PathSet;
pub use scene::{
    BsChannels, DelayWindowReport, LinkAntennas, SceneBuildConfig, SceneChannelBuilder,
    SceneChannels, SynthesisMode,
};
pub use waveform::{Fmcw, FmcwConfig, IfSamples};

use common::UnsupportedPattern;
use raytrace::RayTraceError;
use thiserror::Error;

/// Channel synthesis errors
#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    UnsupportedPattern(#[from] UnsupportedPattern),

    #[error("Antenna count mismatch: expected {expected}, got {got}")]
    AntennaCountMismatch { expected: usize, got: usize },

    #[error("Invalid antenna rotation shape: {0}")]
    InvalidRotation(String),

    #[error("Antenna parameters are already applied to this path set")]
    AntennaAlreadyApplied,

    #[error("Tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Ray-tracing data error: {0}")]
    RayTrace(#[from] RayTraceError),
}
