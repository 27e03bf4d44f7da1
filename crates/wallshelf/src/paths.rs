//! Where the library lives: item root and database file, from settings.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, VfsError};
use crate::settings::LibrarySettings;
use crate::store::DB_FILE_NAME;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryPaths {
    /// Directory whose immediate subdirectories are items.
    pub root: PathBuf,
    pub db_file: PathBuf,
}

impl LibraryPaths {
    /// Custom roots keep their database inside the root so the library can be
    /// moved as one directory. The default root keeps it next to the root.
    pub fn resolve(settings: &LibrarySettings) -> Self {
        if settings.use_custom_path && !settings.custom_path.trim().is_empty() {
            let expanded = shellexpand::tilde(settings.custom_path.trim());
            return Self::for_root(PathBuf::from(expanded.as_ref()));
        }

        let root = settings
            .default_root
            .clone()
            .unwrap_or_else(default_library_root);
        let db_file = root
            .parent()
            .map(|p| p.join(DB_FILE_NAME))
            .unwrap_or_else(|| root.join(DB_FILE_NAME));
        Self { root, db_file }
    }

    pub fn for_root<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        let db_file = root.join(DB_FILE_NAME);
        Self { root, db_file }
    }
}

pub fn default_library_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wallshelf")
        .join("wallpapers")
}

/// Check that `path` looks like a library root: an existing directory holding
/// only numeric item folders and the database file.
pub fn validate_custom_root(path: &Path) -> Result<()> {
    let invalid = |reason: String| VfsError::InvalidLibrary {
        path: path.to_path_buf(),
        reason,
    };

    if !path.is_dir() {
        return Err(invalid("not an existing directory".to_string()));
    }

    let read_dir = fs::read_dir(path).map_err(|source| VfsError::LibraryUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp_name = format!("{}.tmp", DB_FILE_NAME);
    for entry in read_dir.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().to_string();
        let is_dir = entry.path().is_dir();

        if is_dir && !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if !is_dir && (name == DB_FILE_NAME || name == tmp_name) {
            continue;
        }
        return Err(invalid(format!(
            "unexpected entry {:?}; only numeric item folders and {} are allowed",
            name, DB_FILE_NAME
        )));
    }

    Ok(())
}
