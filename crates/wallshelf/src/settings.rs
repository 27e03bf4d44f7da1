//! Configuration and settings management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::listing::{SortBy, SortOptions, SortOrder};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub library: LibrarySettings,
    #[serde(default)]
    pub view: ViewSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LibrarySettings {
    /// Use `custom_path` instead of the default library root.
    #[serde(default)]
    pub use_custom_path: bool,
    #[serde(default)]
    pub custom_path: String,
    /// List every item flat instead of through the virtual tree.
    #[serde(default)]
    pub vfs_disabled: bool,
    /// Overrides the per-user default library root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ViewSettings {
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl LibrarySettings {
    pub fn use_custom_root(&mut self, root: &Path) {
        self.use_custom_path = true;
        self.custom_path = root.display().to_string();
    }

    /// Back to the default root. The custom path is forgotten.
    pub fn use_default_root(&mut self) {
        self.use_custom_path = false;
        self.custom_path.clear();
    }
}

impl ViewSettings {
    pub fn sort_options(&self) -> SortOptions {
        SortOptions::new(self.sort_by, self.sort_order)
    }
}

impl Settings {
    /// Load settings from a file, or return defaults if file doesn't exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;

        Ok(settings)
    }

    /// Save settings to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize settings")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;

        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wallshelf")
            .join("settings.toml")
    }
}
