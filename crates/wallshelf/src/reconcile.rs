//! Folds a physical scan into the persisted database.
//!
//! The directory listing decides which items exist; the tree decides where
//! they live. Nothing here touches the disk.

use crate::scanner::ScanOutput;
use crate::store::Database;
use crate::vfs::ItemRef;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// True when the database differs from what was loaded and must be saved.
    pub changed: bool,
    /// Ids whose directory disappeared.
    pub pruned: Vec<String>,
    /// Ids newly attached to the root folder.
    pub archived: Vec<String>,
    /// Ids whose stored size was recomputed.
    pub refreshed: Vec<String>,
}

pub fn reconcile(db: &mut Database, scan: &ScanOutput) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    let mut refreshed: Vec<&String> = scan.refreshed.keys().collect();
    refreshed.sort();
    for id in refreshed {
        let refresh = scan.refreshed[id];
        let entry = db.wallpapers_meta.entry(id.clone()).or_default();
        entry.mtime = Some(refresh.mtime);
        entry.size = Some(refresh.size);
        report.refreshed.push(id.clone());
    }

    let stale: Vec<String> = db
        .wallpapers_meta
        .keys()
        .filter(|id| !scan.present.contains(id.as_str()))
        .cloned()
        .collect();
    for id in stale {
        db.wallpapers_meta.remove(&id);
        db.vfs_tree.detach_item(&id);
        tracing::info!("Pruned vanished item {}", id);
        report.pruned.push(id);
    }

    let referenced = db.vfs_tree.item_ids();
    let mut new_ids: Vec<&String> = scan
        .items
        .keys()
        .filter(|id| !referenced.contains(id.as_str()))
        .collect();
    new_ids.sort();
    for id in new_ids {
        let kind = scan.items[id].kind.to_lowercase();
        db.vfs_tree.push_item(ItemRef::new(id.clone(), kind));
        report.archived.push(id.clone());
    }
    if !report.archived.is_empty() {
        tracing::info!("Archived {} new items at root", report.archived.len());
    }

    report.changed =
        !report.refreshed.is_empty() || !report.pruned.is_empty() || !report.archived.is_empty();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{CachedItem, SizeRefresh};
    use crate::store::ItemMetadata;
    use crate::vfs::{Folder, VPath};
    use std::path::PathBuf;

    fn cached(id: &str, kind: &str, size: u64) -> CachedItem {
        CachedItem {
            id: id.to_string(),
            title: format!("Item {id}"),
            kind: kind.to_string(),
            rating: "everyone".to_string(),
            preview: String::new(),
            preview_missing: true,
            video: None,
            folder_path: PathBuf::from(id),
            size,
            date_added: None,
            app_path: None,
        }
    }

    fn scan_of(items: &[(&str, &str)]) -> ScanOutput {
        let mut scan = ScanOutput::default();
        for (id, kind) in items {
            scan.items.insert(id.to_string(), cached(id, kind, 1));
            scan.present.insert(id.to_string());
        }
        scan
    }

    fn meta(kind: &str) -> ItemMetadata {
        ItemMetadata {
            mtime: Some(1.0),
            size: Some(1),
            kind: Some(kind.to_string()),
            app_path: None,
        }
    }

    #[test]
    fn test_stale_item_pruned_and_new_items_archived() {
        let mut db = Database::default();
        let mut folder = Folder::new("Old");
        folder.push_item(ItemRef::new("C", "scene"));
        db.vfs_tree.push_folder(folder);
        db.wallpapers_meta.insert("C".to_string(), meta("scene"));

        let report = reconcile(&mut db, &scan_of(&[("A", "scene"), ("B", "video")]));

        assert!(report.changed);
        assert_eq!(report.pruned, vec!["C".to_string()]);
        assert_eq!(report.archived, vec!["A".to_string(), "B".to_string()]);
        assert!(!db.wallpapers_meta.contains_key("C"));
        assert!(!db.vfs_tree.contains_item("C"));

        let root_ids: Vec<&str> = db.vfs_tree.items().map(|i| i.id.as_str()).collect();
        assert_eq!(root_ids, vec!["A", "B"]);
        assert_eq!(db.vfs_tree.items().nth(1).unwrap().kind, "video");
        // The folder itself survives pruning
        assert!(db.vfs_tree.resolve(&VPath::parse("Old")).is_some());
    }

    #[test]
    fn test_already_organised_items_stay_put() {
        let mut db = Database::default();
        let mut games = Folder::new("Games");
        games.push_item(ItemRef::new("A", "scene"));
        db.vfs_tree.push_folder(games);
        db.wallpapers_meta.insert("A".to_string(), meta("scene"));

        let report = reconcile(&mut db, &scan_of(&[("A", "scene")]));

        assert!(!report.changed);
        assert_eq!(db.vfs_tree.items().count(), 0);
        assert_eq!(db.vfs_tree.count_item("A"), 1);
    }

    #[test]
    fn test_each_id_referenced_at_most_once() {
        let mut db = Database::default();
        db.vfs_tree.push_item(ItemRef::new("A", "scene"));
        let scan = scan_of(&[("A", "scene"), ("B", "scene")]);

        reconcile(&mut db, &scan);
        reconcile(&mut db, &scan);

        for id in ["A", "B"] {
            assert_eq!(db.vfs_tree.count_item(id), 1);
        }
    }

    #[test]
    fn test_refresh_updates_metadata_and_keeps_app_path() {
        let mut db = Database::default();
        db.wallpapers_meta.insert(
            "A".to_string(),
            ItemMetadata {
                app_path: Some("game.exe".to_string()),
                ..meta("application")
            },
        );
        db.vfs_tree.push_item(ItemRef::new("A", "application"));

        let mut scan = scan_of(&[("A", "application")]);
        scan.refreshed.insert(
            "A".to_string(),
            SizeRefresh {
                mtime: 99.5,
                size: 4096,
            },
        );

        let report = reconcile(&mut db, &scan);
        assert!(report.changed);
        assert_eq!(report.refreshed, vec!["A".to_string()]);
        let entry = &db.wallpapers_meta["A"];
        assert_eq!(entry.mtime, Some(99.5));
        assert_eq!(entry.size, Some(4096));
        assert_eq!(entry.app_path.as_deref(), Some("game.exe"));
    }

    #[test]
    fn test_skipped_item_is_neither_pruned_nor_archived() {
        let mut db = Database::default();
        let mut folder = Folder::new("Keep");
        folder.push_item(ItemRef::new("broken", "scene"));
        db.vfs_tree.push_folder(folder);
        db.wallpapers_meta.insert("broken".to_string(), meta("scene"));

        // Directory exists but its descriptor could not be read
        let mut scan = ScanOutput::default();
        scan.present.insert("broken".to_string());

        let report = reconcile(&mut db, &scan);
        assert!(!report.changed);
        assert!(db.wallpapers_meta.contains_key("broken"));
        assert_eq!(db.vfs_tree.count_item("broken"), 1);
    }
}
