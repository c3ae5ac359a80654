//! Shared domain types for the Eyeframe project.

pub mod config;
pub mod events;
pub mod frame;
pub mod raster;

mod errors;

pub use errors::{EyeframeError, Precondition, Result};
