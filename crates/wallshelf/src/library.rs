//! The library: persisted database, derived item cache, and every operation
//! that reads or edits them.
//!
//! Each mutation validates first, edits in memory, re-aggregates folder sizes
//! and saves before returning. A failed validation leaves everything as it was.

use std::path::Path;

use crate::descriptor::ProjectDescriptor;
use crate::error::{Result, VfsError};
use crate::listing::{self, ListEntry, SortOptions, FOLDER_ID_PREFIX};
use crate::paths::LibraryPaths;
use crate::reconcile::{reconcile, ReconcileReport};
use crate::scanner::{ItemCache, ScanOutput, Scanner};
use crate::store::{Database, MetadataMap};
use crate::vfs::{aggregate, Folder, ItemRef, VPath};

const UNKNOWN_TYPE: &str = "unknown";

/// One thing to move with [`Library::move_items`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveSource {
    Folder(VPath),
    Item(String),
}

impl MoveSource {
    /// `vfolder_./A/` and anything containing a `/` (`./A`, `A/B/`) name
    /// folders; everything else is an item id.
    pub fn parse(raw: &str) -> Self {
        if let Some(vpath) = raw.strip_prefix(FOLDER_ID_PREFIX) {
            return MoveSource::Folder(VPath::parse(vpath));
        }
        if raw.contains('/') {
            return MoveSource::Folder(VPath::parse(raw));
        }
        MoveSource::Item(raw.to_string())
    }

    fn describe(&self) -> String {
        match self {
            MoveSource::Folder(vpath) => vpath.to_string(),
            MoveSource::Item(id) => id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveReport {
    pub moved: Vec<String>,
    /// Folders that no longer exist and ids the library does not know.
    pub skipped: Vec<String>,
}

pub struct Library {
    paths: LibraryPaths,
    db: Database,
    cache: ItemCache,
    vfs_disabled: bool,
}

impl Library {
    /// Load the database for `paths`. The item cache stays empty until the
    /// first [`rescan`](Self::rescan).
    pub fn open(paths: LibraryPaths) -> Self {
        let db = Database::load(&paths.db_file);
        tracing::info!(
            "Opened library {} ({} folders at root, {} known items)",
            paths.root.display(),
            db.vfs_tree.folders().count(),
            db.wallpapers_meta.len()
        );
        Self {
            paths,
            db,
            cache: ItemCache::new(),
            vfs_disabled: false,
        }
    }

    pub fn with_vfs_disabled(mut self, disabled: bool) -> Self {
        self.vfs_disabled = disabled;
        self
    }

    pub fn set_vfs_disabled(&mut self, disabled: bool) {
        self.vfs_disabled = disabled;
    }

    /// Switch to another library root. The old database is left on disk; the
    /// new one is created when absent.
    pub fn reopen(&mut self, paths: LibraryPaths) -> Result<()> {
        let exists = paths.db_file.exists();
        self.db = Database::load(&paths.db_file);
        self.cache.clear();
        self.paths = paths;
        if !exists {
            self.db.save(&self.paths.db_file)?;
        }
        Ok(())
    }

    pub fn paths(&self) -> &LibraryPaths {
        &self.paths
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn full_tree(&self) -> &Folder {
        &self.db.vfs_tree
    }

    pub fn all_metadata(&self) -> &MetadataMap {
        &self.db.wallpapers_meta
    }

    pub fn item_cache(&self) -> &ItemCache {
        &self.cache
    }

    /// A scanner primed with the current metadata, detached from `self`.
    pub fn scanner(&self) -> Scanner {
        Scanner::new(&self.paths.root, &self.db.wallpapers_meta)
    }

    /// Scan the library root and fold the result into the database.
    pub fn rescan(&mut self) -> Result<ReconcileReport> {
        let output = self.scanner().scan()?;
        self.apply_scan(output)
    }

    /// Second half of [`rescan`](Self::rescan), for scans run elsewhere.
    pub fn apply_scan(&mut self, output: ScanOutput) -> Result<ReconcileReport> {
        let report = reconcile(&mut self.db, &output);
        self.cache = output.items;
        aggregate(&mut self.db.vfs_tree, &self.cache);

        if report.changed {
            self.db.save(&self.paths.db_file)?;
        }

        let dangling = self.dangling_references();
        if !dangling.is_empty() {
            tracing::warn!("{} dangling references: {:?}", dangling.len(), dangling);
        }

        Ok(report)
    }

    /// Replace tree and metadata with the initial structure and save it.
    pub fn clear(&mut self) -> Result<()> {
        self.db = Database::default();
        self.cache.clear();
        self.db.save(&self.paths.db_file)?;
        tracing::info!("Cleared database {}", self.paths.db_file.display());
        Ok(())
    }

    /// [`clear`](Self::clear), then rebuild everything from disk.
    pub fn reset(&mut self) -> Result<ReconcileReport> {
        self.clear()?;
        self.rescan()
    }

    pub fn list_children(&self, vpath: &VPath, sort: SortOptions) -> Result<Vec<ListEntry>> {
        if self.vfs_disabled {
            return Ok(listing::list_flat(&self.cache, sort));
        }
        let folder = self
            .db
            .vfs_tree
            .resolve(vpath)
            .ok_or_else(|| VfsError::PathNotFound(vpath.to_string()))?;
        Ok(listing::list_folder(folder, vpath, &self.cache, sort))
    }

    /// Referenced ids with no cache entry, sorted.
    pub fn dangling_references(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .db
            .vfs_tree
            .item_ids()
            .into_iter()
            .filter(|id| !self.cache.contains_key(id))
            .collect();
        ids.sort();
        ids
    }

    pub fn create_folder(&mut self, parent: &VPath, name: &str) -> Result<VPath> {
        let name = validate_folder_name(name)?;
        let parent_folder = self
            .db
            .vfs_tree
            .resolve_mut(parent)
            .ok_or_else(|| VfsError::PathNotFound(parent.to_string()))?;

        if parent_folder.has_folder_named_ignore_case(name) {
            return Err(VfsError::DuplicateName {
                parent: parent.to_string(),
                name: name.to_string(),
            });
        }

        parent_folder.push_folder(Folder::new(name));
        self.commit()?;

        let created = parent.join(name);
        tracing::info!("Created folder {}", created);
        Ok(created)
    }

    pub fn move_items(&mut self, sources: &[MoveSource], target: &VPath) -> Result<MoveReport> {
        if self.db.vfs_tree.resolve(target).is_none() {
            return Err(VfsError::PathNotFound(target.to_string()));
        }

        for source in sources {
            if let MoveSource::Folder(folder) = source {
                if folder.is_root() {
                    return Err(VfsError::RootImmutable);
                }
                if target.starts_with(folder) {
                    return Err(VfsError::MoveIntoSelf {
                        folder: folder.to_string(),
                        target: target.to_string(),
                    });
                }
            }
        }

        let mut report = MoveReport::default();
        for source in sources {
            let moved = match source {
                MoveSource::Folder(vpath) => self.move_folder(vpath, target),
                MoveSource::Item(id) => self.move_item(id, target),
            };
            if moved {
                report.moved.push(source.describe());
            } else {
                report.skipped.push(source.describe());
            }
        }

        self.commit()?;
        tracing::info!(
            "Moved {} entries to {} ({} skipped)",
            report.moved.len(),
            target,
            report.skipped.len()
        );
        Ok(report)
    }

    fn move_folder(&mut self, vpath: &VPath, target: &VPath) -> bool {
        let Some(folder) = self.db.vfs_tree.detach_folder(vpath) else {
            tracing::warn!("Folder {} no longer exists, not moved", vpath);
            return false;
        };
        match self.db.vfs_tree.resolve_mut(target) {
            Some(destination) => {
                destination.push_folder(folder);
                true
            }
            None => {
                // Target was checked up front and cannot sit inside a moved folder
                self.db.vfs_tree.push_folder(folder);
                false
            }
        }
    }

    fn move_item(&mut self, id: &str, target: &VPath) -> bool {
        if !self.is_known_item(id) {
            tracing::warn!("Item {} is not in the library, not moved", id);
            return false;
        }
        self.db.vfs_tree.detach_item(id);
        let kind = self.item_type_of(id);

        let Some(destination) = self.db.vfs_tree.resolve_mut(target) else {
            return false;
        };
        destination.push_item(ItemRef::new(id, kind.clone()));
        self.db
            .wallpapers_meta
            .entry(id.to_string())
            .or_default()
            .kind = Some(kind);
        true
    }

    /// An id the library has seen, or one whose directory exists under the root.
    fn is_known_item(&self, id: &str) -> bool {
        if !is_single_segment(id) {
            return false;
        }
        self.cache.contains_key(id)
            || self.db.wallpapers_meta.contains_key(id)
            || self.db.vfs_tree.contains_item(id)
            || self.paths.root.join(id).is_dir()
    }

    /// Type tag for `id`: stored metadata, then the cache, then the item's
    /// descriptor, then `unknown`.
    fn item_type_of(&self, id: &str) -> String {
        if let Some(kind) = self
            .db
            .wallpapers_meta
            .get(id)
            .and_then(|m| m.kind.as_ref())
            .filter(|k| !k.is_empty())
        {
            return kind.clone();
        }
        if let Some(item) = self.cache.get(id) {
            return item.kind.clone();
        }
        match ProjectDescriptor::read(&self.paths.root.join(id)) {
            Ok(descriptor) => descriptor.item_type(),
            Err(e) => {
                tracing::warn!("Could not determine type while moving: {}", e);
                UNKNOWN_TYPE.to_string()
            }
        }
    }

    pub fn delete_virtual_folder(&mut self, vpath: &VPath) -> Result<()> {
        if vpath.is_root() {
            return Err(VfsError::RootImmutable);
        }
        let folder = self
            .db
            .vfs_tree
            .resolve(vpath)
            .ok_or_else(|| VfsError::PathNotFound(vpath.to_string()))?;
        if !folder.is_empty() {
            return Err(VfsError::FolderNotEmpty(vpath.to_string()));
        }

        self.db.vfs_tree.detach_folder(vpath);
        self.commit()?;
        tracing::info!("Deleted folder {}", vpath);
        Ok(())
    }

    /// Forget an item: drop its first reference and its metadata. Returns
    /// whether anything was removed.
    pub fn remove_item_reference(&mut self, id: &str) -> Result<bool> {
        let removed = self.forget(id);
        if removed {
            self.commit()?;
        }
        Ok(removed)
    }

    /// Batch form of [`remove_item_reference`](Self::remove_item_reference)
    /// with a single save. Returns how many ids were known.
    pub fn remove_item_references<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<usize> {
        let mut removed = 0;
        for id in ids {
            if self.forget(id.as_ref()) {
                removed += 1;
            }
        }
        if removed > 0 {
            self.commit()?;
        }
        Ok(removed)
    }

    fn forget(&mut self, id: &str) -> bool {
        let detached = self.db.vfs_tree.detach_item(id).is_some();
        let had_meta = self.db.wallpapers_meta.remove(id).is_some();
        detached || had_meta
    }

    /// Record the launcher executable (relative to the item folder) and type
    /// for `id`. An item missing from the tree is attached to the root.
    pub fn assign_launcher_path(&mut self, id: &str, relative_path: &Path, kind: &str) -> Result<()> {
        let app_path = relative_path.to_string_lossy().replace('\\', "/");

        let entry = self.db.wallpapers_meta.entry(id.to_string()).or_default();
        entry.app_path = Some(app_path.clone());
        entry.kind = Some(kind.to_string());

        match self.db.vfs_tree.locate_item(id) {
            Some(location) => {
                if let Some(item) = self.db.vfs_tree.item_mut(&location) {
                    item.kind = kind.to_string();
                }
            }
            None => self.db.vfs_tree.push_item(ItemRef::new(id, kind)),
        }

        if let Some(cached) = self.cache.get_mut(id) {
            cached.app_path = Some(app_path);
            cached.kind = kind.to_string();
        }

        self.commit()
    }

    fn commit(&mut self) -> Result<()> {
        aggregate(&mut self.db.vfs_tree, &self.cache);
        self.db.save(&self.paths.db_file)
    }
}

/// Non-empty, not `.` or `..`, no separators.
fn is_single_segment(name: &str) -> bool {
    !(name.is_empty() || name == "." || name == ".." || name.contains(|c: char| c == '/' || c == '\\'))
}

fn validate_folder_name(raw: &str) -> Result<&str> {
    let name = raw.trim();
    if !is_single_segment(name) {
        return Err(VfsError::InvalidName(raw.to_string()));
    }
    Ok(name)
}
