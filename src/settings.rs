//! User settings and configuration IO.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::compositor::OverlayStyle;

/// File name used under the per-user config directory.
const SETTINGS_FILE: &str = "settings.json";
/// Environment variable that overrides the packs directory.
pub const PACKS_DIR_ENV: &str = "CATPACK_PACKS_DIR";

/// Settings persisted to `settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Largest share of the window height the overlay may cover (0-1).
    pub maximum_window_percentage: f64,
    /// Overlay opacity while visible (0-1).
    pub kitty_opacity: f32,
    /// Whether the overlay starts out visible.
    pub draw_cat: bool,
    /// Pack used when none is named explicitly.
    pub pack: Option<String>,
    /// Folder holding installed packs.
    pub packs_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            maximum_window_percentage: 0.8,
            kitty_opacity: 0.6,
            draw_cat: true,
            pack: None,
            packs_dir: None,
        }
    }
}

impl Settings {
    /// Reject fractions outside `0..=1`.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.maximum_window_percentage) {
            bail!(
                "maximum_window_percentage must be within 0..=1, got {}",
                self.maximum_window_percentage
            );
        }
        if !(0.0..=1.0).contains(&self.kitty_opacity) {
            bail!("kitty_opacity must be within 0..=1, got {}", self.kitty_opacity);
        }
        Ok(())
    }

    /// Overlay style for the given visibility.
    pub fn overlay_style(&self, visible: bool) -> OverlayStyle {
        OverlayStyle {
            max_fraction: self.maximum_window_percentage,
            opacity: self.kitty_opacity,
            visible,
        }
    }

    /// Folder holding installed packs.
    ///
    /// `CATPACK_PACKS_DIR` wins over the settings file, which wins over the
    /// per-user data directory.
    pub fn packs_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(PACKS_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }
        if let Some(dir) = &self.packs_dir {
            return Ok(dir.clone());
        }
        Ok(project_dirs()?.data_dir().join("packs"))
    }

    /// Directory of the pack called `name`.
    ///
    /// A name that already points at a directory is used as-is.
    pub fn pack_dir(&self, name: &str) -> Result<PathBuf> {
        let direct = Path::new(name);
        if direct.is_dir() {
            return Ok(direct.to_path_buf());
        }
        Ok(self.packs_dir()?.join(name))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "catpack", "catpack").ok_or_else(|| anyhow!("cannot determine config directory"))
}

/// Resolve the per-user settings file path.
pub fn settings_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join(SETTINGS_FILE))
}

/// Load settings from `path`, returning defaults when missing or unreadable.
pub fn load_from(path: &Path) -> Settings {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => return Settings::default(),
    };
    match serde_json::from_str(&contents) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!("ignoring malformed {}: {err}", path.display());
            Settings::default()
        }
    }
}

/// Persist settings to `path` as pretty JSON, creating parent folders.
pub fn save_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(settings)?;
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
