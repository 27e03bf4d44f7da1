//! The persisted database: VFS tree plus per-item metadata, one JSON file per
//! library root.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Result, VfsError};
use crate::vfs::Folder;

pub const DB_FILE_NAME: &str = "wallpapers_db.json";

/// Per-item facts that survive restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Last observed directory mtime, milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<f64>,
    /// Byte size computed at `mtime`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Launcher executable, relative to the item folder.
    #[serde(rename = "appPath", default, skip_serializing_if = "Option::is_none")]
    pub app_path: Option<String>,
}

pub type MetadataMap = BTreeMap<String, ItemMetadata>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub vfs_tree: Folder,
    pub wallpapers_meta: MetadataMap,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            vfs_tree: Folder::root(),
            wallpapers_meta: MetadataMap::new(),
        }
    }
}

impl Database {
    /// Load the database at `path`.
    ///
    /// A missing, empty, corrupt, or incomplete file yields the initial empty
    /// structure instead of an error; the organisation it held is lost but the
    /// application keeps working.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No database at {}, starting empty", path.display());
                return Self::default();
            }
            Err(e) => {
                tracing::warn!("Could not read {}: {}; starting empty", path.display(), e);
                return Self::default();
            }
        };

        if contents.trim().is_empty() {
            return Self::default();
        }

        match serde_json::from_str::<Database>(&contents) {
            Ok(db) => db,
            Err(e) => {
                tracing::warn!(
                    "Database {} is corrupt or incomplete ({}); starting empty",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Overwrite `path` with the full tree and metadata.
    ///
    /// Writes a sibling temp file first and renames it into place so a crash
    /// mid-write leaves the previous database intact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let persist_err = |source: std::io::Error| VfsError::Persist {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(persist_err)?;
            }
        }

        let temp_path = path.with_extension("json.tmp");
        let written = self
            .write_synced(&temp_path)
            .and_then(|()| fs::rename(&temp_path, path));
        if let Err(source) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(persist_err(source));
        }

        tracing::debug!("Saved database to {}", path.display());
        Ok(())
    }

    fn write_synced(&self, path: &Path) -> std::io::Result<()> {
        let mut writer = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writer.flush()?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()
    }
}
