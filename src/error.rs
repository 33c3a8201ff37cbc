//! Error taxonomy for pack resolution and layer composition.

use std::fmt;
use std::path::PathBuf;

/// Failures raised while resolving a pack image or composing a layer.
///
/// Every variant is fatal to the event that triggered it: nothing is retried
/// and no partially built configuration is installed.
#[derive(Debug)]
pub enum PackError {
    /// The pack metadata document does not exist.
    NotFound { path: PathBuf },
    /// The pack metadata document exists but is malformed.
    Parse { path: PathBuf, message: String },
    /// An external probe (image dimensions or directory listing) failed.
    Probe { path: PathBuf, message: String },
    /// A selection was attempted over an empty directory listing.
    EmptySelection { dir: PathBuf },
    /// A layer insert position lies past the end of the layer list.
    LayerIndex { index: usize, len: usize },
}

impl PackError {
    pub(crate) fn probe(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        PackError::Probe {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        PackError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackError::NotFound { path } => {
                write!(f, "pack metadata not found: {}", path.display())
            }
            PackError::Parse { path, message } => {
                write!(f, "malformed pack metadata {}: {message}", path.display())
            }
            PackError::Probe { path, message } => {
                write!(f, "probe failed for {}: {message}", path.display())
            }
            PackError::EmptySelection { dir } => {
                write!(f, "no entries to select from in {}", dir.display())
            }
            PackError::LayerIndex { index, len } => {
                write!(f, "layer index {index} out of range for {len} layers")
            }
        }
    }
}

impl std::error::Error for PackError {}
