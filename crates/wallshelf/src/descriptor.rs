//! Per-item `project.json` descriptors and the library health check.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, VfsError};

pub const DESCRIPTOR_FILE: &str = "project.json";

const DEFAULT_TITLE: &str = "Untitled";
const DEFAULT_TYPE: &str = "unknown";
const DEFAULT_RATING: &str = "everyone";

/// The fields of `project.json` the library cares about. Everything else in
/// the file is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectDescriptor {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub contentrating: Option<String>,
    /// Preview image, relative to the item folder.
    #[serde(default)]
    pub preview: Option<String>,
    /// Main media file, relative to the item folder.
    #[serde(default)]
    pub file: Option<String>,
}

impl ProjectDescriptor {
    /// Read `<item_dir>/project.json`.
    pub fn read(item_dir: &Path) -> Result<Self> {
        let id = item_dir
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let path = item_dir.join(DESCRIPTOR_FILE);

        let contents = fs::read_to_string(&path).map_err(|e| VfsError::Descriptor {
            id: id.clone(),
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::parse(&contents).map_err(|e| VfsError::Descriptor {
            id,
            reason: format!("cannot parse {}: {}", path.display(), e),
        })
    }

    pub fn parse(contents: &str) -> serde_json::Result<Self> {
        // Some editors save these files with a byte-order mark
        serde_json::from_str(contents.trim_start_matches('\u{feff}'))
    }

    pub fn title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
    }

    /// Lower-cased type tag, `unknown` when absent.
    pub fn item_type(&self) -> String {
        self.kind
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TYPE)
            .to_lowercase()
    }

    pub fn rating(&self) -> &str {
        self.contentrating
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_RATING)
    }

    pub fn is_video(&self) -> bool {
        self.item_type() == "video"
    }
}

/// One problem found by [`check_health`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthIssue {
    pub id: String,
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub missing_descriptor: Vec<HealthIssue>,
    pub invalid_descriptor: Vec<HealthIssue>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.missing_descriptor.is_empty() && self.invalid_descriptor.is_empty()
    }
}

/// A directory directly under the library root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDir {
    pub id: String,
    pub path: PathBuf,
}

/// Item directories under `root`, sorted by id.
///
/// Symlinks are not followed. Names that are not UTF-8 cannot be item ids and
/// are skipped with a warning.
pub fn item_dirs(root: &Path) -> Result<Vec<ItemDir>> {
    let read_dir = fs::read_dir(root).map_err(|source| VfsError::LibraryUnavailable {
        path: root.to_path_buf(),
        source,
    })?;

    let mut dirs = Vec::new();
    for entry in read_dir.filter_map(|e| e.ok()) {
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        match entry.file_name().to_str() {
            Some(id) => dirs.push(ItemDir {
                id: id.to_string(),
                path,
            }),
            None => tracing::warn!("Ignoring item directory with non UTF-8 name: {}", path.display()),
        }
    }
    dirs.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(dirs)
}

/// Inspect every item folder under `root` for a usable `project.json`.
///
/// An item is invalid when the file cannot be parsed or lacks a title or type.
pub fn check_health(root: &Path) -> Result<HealthReport> {
    let mut report = HealthReport::default();
    for ItemDir { id, path: dir } in item_dirs(root)? {
        let descriptor_path = dir.join(DESCRIPTOR_FILE);

        if !descriptor_path.exists() {
            report.missing_descriptor.push(HealthIssue {
                id,
                path: dir,
                reason: format!("missing {}", DESCRIPTOR_FILE),
            });
            continue;
        }

        let parsed = fs::read_to_string(&descriptor_path)
            .map_err(|e| e.to_string())
            .and_then(|c| ProjectDescriptor::parse(&c).map_err(|e| e.to_string()));

        match parsed {
            Ok(descriptor) => {
                let mut missing = Vec::new();
                if descriptor.title.as_deref().unwrap_or("").is_empty() {
                    missing.push("title");
                }
                if descriptor.kind.as_deref().unwrap_or("").is_empty() {
                    missing.push("type");
                }
                if !missing.is_empty() {
                    report.invalid_descriptor.push(HealthIssue {
                        id,
                        path: dir,
                        reason: format!("missing fields: {}", missing.join(", ")),
                    });
                }
            }
            Err(e) => report.invalid_descriptor.push(HealthIssue {
                id,
                path: dir,
                reason: format!("cannot parse {}: {}", DESCRIPTOR_FILE, e),
            }),
        }
    }

    Ok(report)
}
