use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::SystemTime;
use tokio::sync::mpsc;
use walkdir::WalkDir;

use crate::descriptor::{item_dirs, ItemDir, ProjectDescriptor};
use crate::error::Result;
use crate::store::MetadataMap;
use crate::vfs::ItemSizes;

/// Shown in place of a preview image that does not exist on disk.
pub const PLACEHOLDER_PREVIEW_URI: &str = "wallshelf://assets/missing-preview.webp";

/// Everything a front end needs to display one item. Rebuilt on every scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedItem {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub rating: String,
    pub preview: String,
    pub preview_missing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    pub folder_path: PathBuf,
    pub size: u64,
    pub date_added: Option<DateTime<Utc>>,
    pub app_path: Option<String>,
}

pub type ItemCache = HashMap<String, CachedItem>;

impl ItemSizes for ItemCache {
    fn item_size(&self, id: &str) -> Option<u64> {
        self.get(id).map(|item| item.size)
    }
}

/// New `mtime`/`size` pair for an item whose directory changed since the
/// last scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeRefresh {
    pub mtime: f64,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Items with a readable descriptor.
    pub items: u64,
    /// Item directories skipped because of their descriptor.
    pub skipped: u64,
    /// Items whose size had to be recomputed.
    pub resized: u64,
    pub total_size: u64,
}

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub items_scanned: usize,
    pub total_items: usize,
    pub current_item: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub items: ItemCache,
    /// Ids of every item directory on disk, including skipped ones.
    pub present: HashSet<String>,
    pub refreshed: HashMap<String, SizeRefresh>,
    pub stats: ScanStats,
}

const PARALLEL_THRESHOLD: usize = 16;
const PROGRESS_UPDATE_INTERVAL: usize = 10;

enum ItemOutcome {
    Scanned {
        item: CachedItem,
        refresh: Option<SizeRefresh>,
    },
    Skipped,
}

/// Walks a library root, one immediate subdirectory per item.
///
/// Holds its own copy of the metadata so it can run on a blocking thread
/// while the caller keeps ownership of the database.
pub struct Scanner {
    root: PathBuf,
    metadata: MetadataMap,
    progress_sender: Option<mpsc::UnboundedSender<ProgressUpdate>>,
    items_processed: AtomicUsize,
}

impl Scanner {
    pub fn new<P: AsRef<Path>>(root: P, metadata: &MetadataMap) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            metadata: metadata.clone(),
            progress_sender: None,
            items_processed: AtomicUsize::new(0),
        }
    }

    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        self.progress_sender = Some(sender);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scan(&self) -> Result<ScanOutput> {
        let dirs = item_dirs(&self.root)?;

        let present: HashSet<String> = dirs.iter().map(|d| d.id.clone()).collect();
        let total = dirs.len();
        self.items_processed.store(0, Ordering::Relaxed);

        let skipped = AtomicU64::new(0);
        let resized = AtomicU64::new(0);

        let visit = |dir: &ItemDir| -> Option<(CachedItem, Option<SizeRefresh>)> {
            let outcome = self.scan_item(dir);
            self.report_progress(&dir.id, total);
            match outcome {
                ItemOutcome::Scanned { item, refresh } => {
                    if refresh.is_some() {
                        resized.fetch_add(1, Ordering::Relaxed);
                    }
                    Some((item, refresh))
                }
                ItemOutcome::Skipped => {
                    skipped.fetch_add(1, Ordering::Relaxed);
                    None
                }
            }
        };

        // Small libraries are cheaper to walk serially
        let scanned: Vec<(CachedItem, Option<SizeRefresh>)> = if total > PARALLEL_THRESHOLD {
            dirs.par_iter().filter_map(visit).collect()
        } else {
            dirs.iter().filter_map(visit).collect()
        };

        let mut output = ScanOutput {
            present,
            ..ScanOutput::default()
        };
        for (item, refresh) in scanned {
            if let Some(refresh) = refresh {
                output.refreshed.insert(item.id.clone(), refresh);
            }
            output.stats.total_size = output.stats.total_size.saturating_add(item.size);
            output.items.insert(item.id.clone(), item);
        }
        output.stats.items = output.items.len() as u64;
        output.stats.skipped = skipped.load(Ordering::Relaxed);
        output.stats.resized = resized.load(Ordering::Relaxed);

        tracing::info!(
            "Scanned {}: {} items, {} skipped, {} resized",
            self.root.display(),
            output.stats.items,
            output.stats.skipped,
            output.stats.resized
        );

        Ok(output)
    }

    fn scan_item(&self, item_dir: &ItemDir) -> ItemOutcome {
        let ItemDir { id, path: dir } = item_dir;
        let id = id.clone();

        let stats = match fs::metadata(dir) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Could not stat item {}: {}", id, e);
                return ItemOutcome::Skipped;
            }
        };

        let descriptor = match ProjectDescriptor::read(dir) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Skipping item: {}", e);
                return ItemOutcome::Skipped;
            }
        };

        let mtime = stats.modified().ok().and_then(millis_since_epoch);
        let stored = self.metadata.get(&id);
        let cached_size = stored.and_then(|m| match (m.mtime, m.size, mtime) {
            (Some(then), Some(size), Some(now)) if then == now => Some(size),
            _ => None,
        });

        let (size, refresh) = match cached_size {
            Some(size) => {
                tracing::debug!("Reusing stored size for {}", id);
                (size, None)
            }
            None => {
                let size = directory_size(dir);
                (
                    size,
                    mtime.map(|mtime| SizeRefresh { mtime, size }),
                )
            }
        };

        let (preview, preview_missing) = match descriptor.preview.as_deref() {
            Some(p) if !p.is_empty() && dir.join(p).is_file() => (file_uri(&dir.join(p)), false),
            _ => (PLACEHOLDER_PREVIEW_URI.to_string(), true),
        };

        let video = if descriptor.is_video() {
            descriptor.file.as_deref().map(|f| file_uri(&dir.join(f)))
        } else {
            None
        };

        let date_added = stats
            .created()
            .or_else(|_| stats.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        let item = CachedItem {
            title: descriptor.title().to_string(),
            kind: descriptor.item_type(),
            rating: descriptor.rating().to_string(),
            preview,
            preview_missing,
            video,
            folder_path: dir.to_path_buf(),
            size,
            date_added,
            app_path: stored.and_then(|m| m.app_path.clone()),
            id,
        };

        ItemOutcome::Scanned { item, refresh }
    }

    fn report_progress(&self, id: &str, total: usize) {
        let done = self.items_processed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(sender) = &self.progress_sender {
            if done % PROGRESS_UPDATE_INTERVAL == 0 || done == total {
                let _ = sender.send(ProgressUpdate {
                    items_scanned: done,
                    total_items: total,
                    current_item: id.to_string(),
                });
            }
        }
    }
}

fn millis_since_epoch(t: SystemTime) -> Option<f64> {
    t.duration_since(std::time::UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs_f64() * 1000.0)
}

/// Sum of all file sizes below `dir`. Entries that cannot be read are skipped.
pub fn directory_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .fold(0u64, |acc, len| acc.saturating_add(len))
}

/// `file://` URI for a local path, with forward slashes on every platform.
pub fn file_uri(path: &Path) -> String {
    match url::Url::from_file_path(path) {
        Ok(url) => url.to_string(),
        Err(()) => format!("file://{}", path.display()).replace('\\', "/"),
    }
}
