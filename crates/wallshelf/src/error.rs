//! Error types for the VFS engine.
//!
//! Every public library operation returns [`Result<T>`]. Validation failures
//! carry enough context for a front end to show the reason as-is.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    /// The library root cannot be enumerated (missing, not a directory, no access).
    #[error("library root unavailable: {path}: {source}")]
    LibraryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A candidate custom library root failed validation.
    #[error("invalid library root {path}: {reason}")]
    InvalidLibrary { path: PathBuf, reason: String },

    /// An item's `project.json` is missing or unparsable.
    #[error("descriptor error for item {id}: {reason}")]
    Descriptor { id: String, reason: String },

    /// Writing the database file failed.
    #[error("failed to persist database {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid folder name: {0:?}")]
    InvalidName(String),

    #[error("a folder named {name:?} already exists in {parent}")]
    DuplicateName { parent: String, name: String },

    #[error("virtual path no longer exists: {0}")]
    PathNotFound(String),

    #[error("folder {0} is not empty")]
    FolderNotEmpty(String),

    #[error("cannot move folder {folder} into itself or one of its subfolders ({target})")]
    MoveIntoSelf { folder: String, target: String },

    #[error("the root folder cannot be removed")]
    RootImmutable,

    /// The blocking scan task panicked or was cancelled.
    #[error("scan aborted: {0}")]
    ScanAborted(String),

    #[error("library worker has stopped")]
    ActorGone,
}

pub type Result<T> = std::result::Result<T, VfsError>;
