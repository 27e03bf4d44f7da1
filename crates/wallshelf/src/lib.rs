//! Virtual folder library for wallpaper item directories.
//!
//! Items live on disk as one directory each under a library root. Their
//! organisation lives in a persisted virtual tree that survives items being
//! added, removed or changed outside the tool.

pub mod actor;
pub mod descriptor;
pub mod error;
pub mod library;
pub mod listing;
pub mod paths;
pub mod reconcile;
pub mod scanner;
pub mod settings;
pub mod store;
pub mod vfs;

pub use actor::{LibraryActor, LibraryCommand, LibraryHandle};
pub use error::{Result, VfsError};
pub use library::{Library, MoveReport, MoveSource};
pub use listing::{ListEntry, SortBy, SortOptions, SortOrder};
pub use paths::LibraryPaths;
pub use reconcile::ReconcileReport;
pub use store::{Database, ItemMetadata, MetadataMap};
pub use vfs::{Folder, ItemRef, VPath, VfsNode};
