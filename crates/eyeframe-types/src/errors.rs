use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T, E = EyeframeError> = std::result::Result<T, E>;

/// Unified error type covering common failure scenarios across subsystems.
#[derive(Debug, Error)]
pub enum EyeframeError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("media error: {0}")]
    Media(String),
    #[error("capture error: {0}")]
    Capture(String),
    #[error("export error: {0}")]
    Export(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Conditions under which a user operation is refused without side effects.
///
/// These are reported to the user as notices, never raised as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precondition {
    NoVideoLoaded,
    NothingToExport,
    ExportInFlight,
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Precondition::NoVideoLoaded => "no video loaded; choose a video file first",
            Precondition::NothingToExport => "no frames available to export",
            Precondition::ExportInFlight => "an export is still in progress",
        };
        f.write_str(message)
    }
}
