//! The host window seam: dimensions plus get/set of configuration overrides.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::compositor::WindowDimensions;
use crate::layer::BackgroundLayer;

/// Per-window configuration overrides.
///
/// Only `background` is interpreted; other keys are carried through so that
/// installing new overrides never drops settings owned by someone else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Vec<BackgroundLayer>>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// The host's base configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub background: Vec<BackgroundLayer>,
}

impl HostConfig {
    /// Load the base configuration, or an empty one when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// A terminal window whose background can be overridden.
pub trait HostWindow {
    fn dimensions(&self) -> WindowDimensions;
    /// Record a new window size.
    fn resize(&mut self, dimensions: WindowDimensions);
    /// Currently installed overrides; an unreadable set is an error.
    fn config_overrides(&self) -> Result<Option<Overrides>>;
    /// Install `overrides` as the window's active overrides in one step.
    fn set_config_overrides(&mut self, overrides: Overrides) -> Result<()>;
}

/// Window whose overrides live in memory.
#[derive(Debug, Clone)]
pub struct MemoryWindow {
    pub dimensions: WindowDimensions,
    pub overrides: Option<Overrides>,
}

impl MemoryWindow {
    pub fn new(dimensions: WindowDimensions) -> Self {
        Self {
            dimensions,
            overrides: None,
        }
    }
}

impl HostWindow for MemoryWindow {
    fn dimensions(&self) -> WindowDimensions {
        self.dimensions
    }

    fn resize(&mut self, dimensions: WindowDimensions) {
        self.dimensions = dimensions;
    }

    fn config_overrides(&self) -> Result<Option<Overrides>> {
        Ok(self.overrides.clone())
    }

    fn set_config_overrides(&mut self, overrides: Overrides) -> Result<()> {
        self.overrides = Some(overrides);
        Ok(())
    }
}

/// Window whose overrides are a JSON document on disk.
#[derive(Debug, Clone)]
pub struct FileWindow {
    path: PathBuf,
    dimensions: WindowDimensions,
}

impl FileWindow {
    pub fn new(path: impl Into<PathBuf>, dimensions: WindowDimensions) -> Self {
        Self {
            path: path.into(),
            dimensions,
        }
    }
}

impl HostWindow for FileWindow {
    fn dimensions(&self) -> WindowDimensions {
        self.dimensions
    }

    fn resize(&mut self, dimensions: WindowDimensions) {
        self.dimensions = dimensions;
    }

    fn config_overrides(&self) -> Result<Option<Overrides>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", self.path.display()));
            }
        };
        let overrides = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(Some(overrides))
    }

    fn set_config_overrides(&mut self, overrides: Overrides) -> Result<()> {
        let contents = serde_json::to_string_pretty(&overrides)?;
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file =
                fs::File::create(&tmp).with_context(|| format!("failed to write {}", tmp.display()))?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }
        // Rename so readers never observe a half-written document.
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to install {}", self.path.display()))?;
        Ok(())
    }
}
