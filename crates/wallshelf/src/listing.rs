//! Folder contents as a front end shows them: summaries for subfolders,
//! cached item details for references, sorted folders-first.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::scanner::{CachedItem, ItemCache};
use crate::vfs::{Folder, VPath};

/// Prefix of the synthetic ids given to folder entries.
pub const FOLDER_ID_PREFIX: &str = "vfolder_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Title,
    Size,
    DateAdded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortOptions {
    pub by: SortBy,
    pub order: SortOrder,
}

impl SortOptions {
    pub fn new(by: SortBy, order: SortOrder) -> Self {
        Self { by, order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSummary {
    pub id: String,
    pub title: String,
    pub vpath: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "itemType", rename_all = "lowercase")]
pub enum ListEntry {
    Folder(FolderSummary),
    Wallpaper(CachedItem),
}

impl ListEntry {
    pub fn id(&self) -> &str {
        match self {
            ListEntry::Folder(f) => &f.id,
            ListEntry::Wallpaper(w) => &w.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ListEntry::Folder(f) => &f.title,
            ListEntry::Wallpaper(w) => &w.title,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            ListEntry::Folder(f) => f.size,
            ListEntry::Wallpaper(w) => w.size,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, ListEntry::Folder(_))
    }
}

pub fn folder_entry_id(vpath: &VPath) -> String {
    format!("{}{}", FOLDER_ID_PREFIX, vpath)
}

/// Direct children of `folder` (which lives at `vpath`).
///
/// References without a cache entry are dangling; they are logged and left
/// out of the listing.
pub fn list_folder(
    folder: &Folder,
    vpath: &VPath,
    cache: &ItemCache,
    sort: SortOptions,
) -> Vec<ListEntry> {
    let mut folders: Vec<FolderSummary> = folder
        .folders()
        .map(|f| {
            let child = vpath.join(&f.name);
            FolderSummary {
                id: folder_entry_id(&child),
                title: f.name.clone(),
                vpath: child.to_string(),
                size: f.size,
            }
        })
        .collect();

    let mut items: Vec<CachedItem> = folder
        .items()
        .filter_map(|r| {
            let cached = cache.get(&r.id);
            if cached.is_none() {
                tracing::warn!("Dangling reference {} in {}", r.id, vpath);
            }
            cached.cloned()
        })
        .collect();

    sort_folders(&mut folders, sort);
    sort_items(&mut items, sort);

    folders
        .into_iter()
        .map(ListEntry::Folder)
        .chain(items.into_iter().map(ListEntry::Wallpaper))
        .collect()
}

/// Every cached item, ignoring the virtual tree.
pub fn list_flat(cache: &ItemCache, sort: SortOptions) -> Vec<ListEntry> {
    let mut items: Vec<CachedItem> = cache.values().cloned().collect();
    sort_items(&mut items, sort);
    items.into_iter().map(ListEntry::Wallpaper).collect()
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn sort_folders(folders: &mut [FolderSummary], sort: SortOptions) {
    folders.sort_by(|a, b| {
        let ordering = match sort.by {
            SortBy::Size => a.size.cmp(&b.size),
            // Folders carry no date, so date sorting falls back to title
            SortBy::Title | SortBy::DateAdded => compare_titles(&a.title, &b.title),
        };
        directed(ordering, sort.order)
    });
}

fn sort_items(items: &mut [CachedItem], sort: SortOptions) {
    items.sort_by(|a, b| {
        let ordering = match sort.by {
            SortBy::Title => compare_titles(&a.title, &b.title),
            SortBy::Size => a.size.cmp(&b.size),
            SortBy::DateAdded => a.date_added.cmp(&b.date_added),
        };
        directed(ordering.then_with(|| a.id.cmp(&b.id)), sort.order)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::ItemRef;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    fn cached(id: &str, title: &str, size: u64, day: u32) -> CachedItem {
        CachedItem {
            id: id.to_string(),
            title: title.to_string(),
            kind: "scene".to_string(),
            rating: "everyone".to_string(),
            preview: String::new(),
            preview_missing: false,
            video: None,
            folder_path: PathBuf::from(id),
            size,
            date_added: Some(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()),
            app_path: None,
        }
    }

    fn fixture() -> (Folder, ItemCache) {
        let mut root = Folder::root();
        let mut big = Folder::new("beta");
        big.size = 500;
        let mut small = Folder::new("Alpha");
        small.size = 5;
        root.push_folder(big);
        root.push_item(ItemRef::new("1", "scene"));
        root.push_folder(small);
        root.push_item(ItemRef::new("2", "scene"));
        root.push_item(ItemRef::new("3", "scene"));
        root.push_item(ItemRef::new("ghost", "scene"));

        let mut cache = ItemCache::new();
        for item in [
            cached("1", "Ocean", 30, 3),
            cached("2", "city", 10, 1),
            cached("3", "Meadow", 20, 2),
        ] {
            cache.insert(item.id.clone(), item);
        }
        (root, cache)
    }

    fn ids(entries: &[ListEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.id()).collect()
    }

    #[test]
    fn test_folders_first_sorted_by_title() {
        let (root, cache) = fixture();
        let entries = list_folder(&root, &VPath::root(), &cache, SortOptions::default());

        assert_eq!(
            ids(&entries),
            vec!["vfolder_./Alpha/", "vfolder_./beta/", "2", "3", "1"]
        );
        match &entries[0] {
            ListEntry::Folder(f) => {
                assert_eq!(f.vpath, "./Alpha/");
                assert_eq!(f.size, 5);
            }
            other => panic!("expected folder, got {other:?}"),
        }
    }

    #[test]
    fn test_sort_by_size_descending() {
        let (root, cache) = fixture();
        let entries = list_folder(
            &root,
            &VPath::root(),
            &cache,
            SortOptions::new(SortBy::Size, SortOrder::Desc),
        );
        assert_eq!(
            ids(&entries),
            vec!["vfolder_./beta/", "vfolder_./Alpha/", "1", "3", "2"]
        );
    }

    #[test]
    fn test_sort_by_date_folders_fall_back_to_title() {
        let (root, cache) = fixture();
        let entries = list_folder(
            &root,
            &VPath::root(),
            &cache,
            SortOptions::new(SortBy::DateAdded, SortOrder::Asc),
        );
        assert_eq!(
            ids(&entries),
            vec!["vfolder_./Alpha/", "vfolder_./beta/", "2", "3", "1"]
        );
    }

    #[test]
    fn test_dangling_references_are_left_out() {
        let (root, cache) = fixture();
        let entries = list_folder(&root, &VPath::root(), &cache, SortOptions::default());
        assert!(entries.iter().all(|e| e.id() != "ghost"));
        assert_eq!(entries.iter().filter(|e| !e.is_folder()).count(), 3);
    }

    #[test]
    fn test_flat_listing_ignores_tree() {
        let (_, cache) = fixture();
        let entries = list_flat(&cache, SortOptions::new(SortBy::Size, SortOrder::Asc));
        assert_eq!(ids(&entries), vec!["2", "3", "1"]);
        assert!(entries.iter().all(|e| !e.is_folder()));
    }

    #[test]
    fn test_entry_serializes_with_item_type_tag() {
        let (root, cache) = fixture();
        let entries = list_folder(&root, &VPath::root(), &cache, SortOptions::default());
        let json = serde_json::to_value(&entries).unwrap();
        assert_eq!(json[0]["itemType"], "folder");
        assert_eq!(json[2]["itemType"], "wallpaper");
        assert_eq!(json[2]["type"], "scene");
        assert_eq!(json[2]["previewMissing"], false);
    }
}
