use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio::sync::mpsc;

use wallshelf::descriptor::DESCRIPTOR_FILE;
use wallshelf::scanner::ProgressUpdate;
use wallshelf::store::DB_FILE_NAME;
use wallshelf::{
    Database, Library, LibraryHandle, LibraryPaths, MoveSource, SortOptions, VPath, VfsError,
};

fn write_item(root: &Path, id: &str, title: &str, kind: &str, bytes: usize) {
    let dir = root.join(id);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join(DESCRIPTOR_FILE),
        format!(r#"{{ "title": "{title}", "type": "{kind}", "preview": "preview.gif" }}"#),
    )
    .unwrap();
    fs::write(dir.join("preview.gif"), b"GIF89a").unwrap();
    fs::write(dir.join("scene.pkg"), vec![0u8; bytes]).unwrap();
}

/// Push a directory's mtime well past the coarse filesystem clock so the
/// scanner cannot mistake it for unchanged.
fn bump_mtime(dir: &Path) {
    let later = SystemTime::now() + Duration::from_secs(120);
    fs::File::open(dir).unwrap().set_modified(later).unwrap();
}

/// Library root with three items:
/// - 1001 "Aurora" scene
/// - 1002 "Harbor" video
/// - 1003 "Lantern" web
fn create_test_library() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_item(root, "1001", "Aurora", "scene", 4096);
    write_item(root, "1002", "Harbor", "Video", 1024);
    write_item(root, "1003", "Lantern", "web", 512);
    temp_dir
}

#[test]
fn test_first_scan_archives_everything_at_root() {
    let temp_dir = create_test_library();
    let mut library = Library::open(LibraryPaths::for_root(temp_dir.path()));

    let report = library.rescan().unwrap();
    assert!(report.changed);
    assert_eq!(report.archived, vec!["1001", "1002", "1003"]);
    assert_eq!(report.refreshed.len(), 3);
    assert!(temp_dir.path().join(DB_FILE_NAME).exists());

    let tree = library.full_tree();
    let total: u64 = library.item_cache().values().map(|i| i.size).sum();
    assert_eq!(tree.size, total);
    assert_eq!(library.item_cache()["1002"].kind, "video");

    // Nothing changed on disk, so the second pass is a no-op
    let again = library.rescan().unwrap();
    assert!(!again.changed);
}

#[test]
fn test_organisation_survives_restart() {
    let temp_dir = create_test_library();
    let paths = LibraryPaths::for_root(temp_dir.path());

    {
        let mut library = Library::open(paths.clone());
        library.rescan().unwrap();
        let games = library.create_folder(&VPath::root(), "Games").unwrap();
        let retro = library.create_folder(&games, "Retro").unwrap();
        library
            .move_items(
                &[
                    MoveSource::Item("1001".to_string()),
                    MoveSource::Item("1003".to_string()),
                ],
                &retro,
            )
            .unwrap();
    }

    let mut library = Library::open(paths);
    let report = library.rescan().unwrap();
    assert!(report.archived.is_empty());

    let retro = library
        .full_tree()
        .resolve(&VPath::parse("./Games/Retro/"))
        .unwrap();
    let ids: Vec<&str> = retro.items().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["1001", "1003"]);

    let expected = library.item_cache()["1001"].size + library.item_cache()["1003"].size;
    assert_eq!(retro.size, expected);
    assert_eq!(
        library
            .full_tree()
            .resolve(&VPath::parse("./Games/"))
            .unwrap()
            .size,
        expected
    );
}

#[test]
fn test_filesystem_drift_is_reconciled() {
    let temp_dir = create_test_library();
    let mut library = Library::open(LibraryPaths::for_root(temp_dir.path()));
    library.rescan().unwrap();
    let keep = library.create_folder(&VPath::root(), "Keep").unwrap();
    library
        .move_items(&[MoveSource::Item("1002".to_string())], &keep)
        .unwrap();

    // Delete one item, add another, grow a third
    fs::remove_dir_all(temp_dir.path().join("1002")).unwrap();
    write_item(temp_dir.path(), "2001", "Comet", "scene", 64);
    let before = library.item_cache()["1001"].size;
    let grown = temp_dir.path().join("1001");
    fs::write(grown.join("extra.bin"), vec![1u8; 1000]).unwrap();
    bump_mtime(&grown);

    let report = library.rescan().unwrap();
    assert_eq!(report.pruned, vec!["1002"]);
    assert_eq!(report.archived, vec!["2001"]);
    assert!(report.refreshed.contains(&"1001".to_string()));

    assert!(!library.full_tree().contains_item("1002"));
    assert!(!library.all_metadata().contains_key("1002"));
    assert!(library.full_tree().resolve(&keep).unwrap().is_empty());
    assert_eq!(library.item_cache()["1001"].size, before + 1000);

    for id in library.full_tree().item_ids() {
        assert_eq!(library.full_tree().count_item(&id), 1);
    }
}

#[test]
fn test_corrupt_database_starts_fresh_without_failing() {
    let temp_dir = create_test_library();
    fs::write(temp_dir.path().join(DB_FILE_NAME), "{\"vfs_tree\": [").unwrap();

    let mut library = Library::open(LibraryPaths::for_root(temp_dir.path()));
    assert!(library.full_tree().is_empty());

    let report = library.rescan().unwrap();
    assert_eq!(report.archived.len(), 3);
    let reloaded = Database::load(temp_dir.path().join(DB_FILE_NAME));
    assert_eq!(reloaded.vfs_tree.items().count(), 3);
}

#[test]
fn test_unavailable_root_leaves_tree_untouched() {
    let temp_dir = create_test_library();
    let paths = LibraryPaths::for_root(temp_dir.path());
    let mut library = Library::open(paths.clone());
    library.rescan().unwrap();
    library.create_folder(&VPath::root(), "Stays").unwrap();
    let before = library.full_tree().clone();

    let mut moved = Library::open(LibraryPaths {
        root: temp_dir.path().join("gone"),
        db_file: paths.db_file.clone(),
    });
    let err = moved.rescan().unwrap_err();
    assert!(matches!(err, VfsError::LibraryUnavailable { .. }));
    assert_eq!(moved.full_tree(), &before);
    assert_eq!(Database::load(&paths.db_file).vfs_tree, before);
}

#[test]
fn test_listing_through_library() {
    let temp_dir = create_test_library();
    let mut library = Library::open(LibraryPaths::for_root(temp_dir.path()));
    library.rescan().unwrap();
    library.create_folder(&VPath::root(), "Zeta").unwrap();

    let entries = library
        .list_children(&VPath::root(), SortOptions::default())
        .unwrap();
    let ids: Vec<&str> = entries.iter().map(|e| e.id()).collect();
    assert_eq!(ids, vec!["vfolder_./Zeta/", "1001", "1002", "1003"]);
}

#[tokio::test]
async fn test_actor_workflow_with_progress() {
    let temp_dir = create_test_library();
    let library = Library::open(LibraryPaths::for_root(temp_dir.path()));
    let (handle, task) = LibraryHandle::spawn(library);

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ProgressUpdate>();
    let report = handle.rescan_with_progress(progress_tx).await.unwrap();
    assert_eq!(report.archived.len(), 3);

    let mut updates = Vec::new();
    while let Some(update) = progress_rx.recv().await {
        updates.push(update);
    }
    assert!(updates.iter().any(|u| u.items_scanned == 3 && u.total_items == 3));

    let folder = handle.create_folder(VPath::root(), "Moving").await.unwrap();
    let err = handle
        .move_items(vec![MoveSource::Folder(folder.clone())], folder.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, VfsError::MoveIntoSelf { .. }));

    let removed = handle
        .remove_item_references(vec!["1001".to_string(), "1002".to_string()])
        .await
        .unwrap();
    assert_eq!(removed, 2);

    handle.shutdown().await;
    task.await.unwrap();

    let db = Database::load(temp_dir.path().join(DB_FILE_NAME));
    assert!(db.vfs_tree.child_folder("Moving").is_some());
    assert!(!db.wallpapers_meta.contains_key("1001"));
    assert!(db.vfs_tree.contains_item("1003"));
}
