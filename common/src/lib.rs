//! Common Utilities and Types Library
//!
//! This crate provides shared types, constants and unit conversions used by the
//! ray-tracing loader and the channel synthesis engine.

pub mod types;
pub mod utils;

// Re-export commonly used items
pub use types::*;
pub use utils::*;
