//! Single-writer access to a [`Library`].
//!
//! One task owns the library and applies commands strictly in arrival order,
//! each including its save. Scans run on the blocking pool but are awaited
//! before the next command, so no edit can interleave with a scan.

use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Result, VfsError};
use crate::library::{Library, MoveReport, MoveSource};
use crate::listing::{ListEntry, SortOptions};
use crate::paths::LibraryPaths;
use crate::reconcile::ReconcileReport;
use crate::scanner::ProgressUpdate;
use crate::store::MetadataMap;
use crate::vfs::{Folder, VPath};

const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<Result<T>>;

pub enum LibraryCommand {
    Rescan {
        progress: Option<mpsc::UnboundedSender<ProgressUpdate>>,
        reply: Reply<ReconcileReport>,
    },
    Reset(Reply<ReconcileReport>),
    /// Switch library root, then rescan.
    Reopen(LibraryPaths, Reply<ReconcileReport>),
    SetVfsDisabled(bool),
    ListChildren {
        vpath: VPath,
        sort: SortOptions,
        reply: Reply<Vec<ListEntry>>,
    },
    FullTree(Reply<Folder>),
    AllMetadata(Reply<MetadataMap>),
    DanglingReferences(Reply<Vec<String>>),
    CreateFolder {
        parent: VPath,
        name: String,
        reply: Reply<VPath>,
    },
    MoveItems {
        sources: Vec<MoveSource>,
        target: VPath,
        reply: Reply<MoveReport>,
    },
    DeleteFolder {
        vpath: VPath,
        reply: Reply<()>,
    },
    RemoveItems {
        ids: Vec<String>,
        reply: Reply<usize>,
    },
    AssignLauncherPath {
        id: String,
        relative_path: PathBuf,
        kind: String,
        reply: Reply<()>,
    },
    Shutdown,
}

pub struct LibraryActor {
    library: Library,
    receiver: mpsc::Receiver<LibraryCommand>,
}

impl LibraryActor {
    pub fn new(library: Library, receiver: mpsc::Receiver<LibraryCommand>) -> Self {
        Self { library, receiver }
    }

    pub async fn run(mut self) {
        while let Some(command) = self.receiver.recv().await {
            match command {
                LibraryCommand::Rescan { progress, reply } => {
                    let result = self.rescan(progress).await;
                    let _ = reply.send(result);
                }
                LibraryCommand::Reset(reply) => {
                    let result = match self.library.clear() {
                        Ok(()) => self.rescan(None).await,
                        Err(e) => Err(e),
                    };
                    let _ = reply.send(result);
                }
                LibraryCommand::Reopen(paths, reply) => {
                    let result = match self.library.reopen(paths) {
                        Ok(()) => self.rescan(None).await,
                        Err(e) => Err(e),
                    };
                    let _ = reply.send(result);
                }
                LibraryCommand::SetVfsDisabled(disabled) => {
                    self.library.set_vfs_disabled(disabled);
                }
                LibraryCommand::ListChildren { vpath, sort, reply } => {
                    let _ = reply.send(self.library.list_children(&vpath, sort));
                }
                LibraryCommand::FullTree(reply) => {
                    let _ = reply.send(Ok(self.library.full_tree().clone()));
                }
                LibraryCommand::AllMetadata(reply) => {
                    let _ = reply.send(Ok(self.library.all_metadata().clone()));
                }
                LibraryCommand::DanglingReferences(reply) => {
                    let _ = reply.send(Ok(self.library.dangling_references()));
                }
                LibraryCommand::CreateFolder {
                    parent,
                    name,
                    reply,
                } => {
                    let _ = reply.send(self.library.create_folder(&parent, &name));
                }
                LibraryCommand::MoveItems {
                    sources,
                    target,
                    reply,
                } => {
                    let _ = reply.send(self.library.move_items(&sources, &target));
                }
                LibraryCommand::DeleteFolder { vpath, reply } => {
                    let _ = reply.send(self.library.delete_virtual_folder(&vpath));
                }
                LibraryCommand::RemoveItems { ids, reply } => {
                    let _ = reply.send(self.library.remove_item_references(&ids));
                }
                LibraryCommand::AssignLauncherPath {
                    id,
                    relative_path,
                    kind,
                    reply,
                } => {
                    let _ = reply.send(self.library.assign_launcher_path(
                        &id,
                        &relative_path,
                        &kind,
                    ));
                }
                LibraryCommand::Shutdown => break,
            }
        }
        tracing::debug!("Library actor stopped");
    }

    async fn rescan(
        &mut self,
        progress: Option<mpsc::UnboundedSender<ProgressUpdate>>,
    ) -> Result<ReconcileReport> {
        let mut scanner = self.library.scanner();
        if let Some(sender) = progress {
            scanner = scanner.with_progress(sender);
        }
        let output = tokio::task::spawn_blocking(move || scanner.scan())
            .await
            .map_err(|e| VfsError::ScanAborted(e.to_string()))??;
        self.library.apply_scan(output)
    }
}

/// Cloneable front door to a running [`LibraryActor`].
#[derive(Clone)]
pub struct LibraryHandle {
    sender: mpsc::Sender<LibraryCommand>,
}

impl LibraryHandle {
    /// Move `library` into a new actor task.
    pub fn spawn(library: Library) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(LibraryActor::new(library, receiver).run());
        (Self { sender }, task)
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> LibraryCommand) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(command(reply))
            .await
            .map_err(|_| VfsError::ActorGone)?;
        response.await.map_err(|_| VfsError::ActorGone)?
    }

    pub async fn rescan(&self) -> Result<ReconcileReport> {
        self.request(|reply| LibraryCommand::Rescan {
            progress: None,
            reply,
        })
        .await
    }

    /// Rescan, streaming per-item progress to `progress`.
    pub async fn rescan_with_progress(
        &self,
        progress: mpsc::UnboundedSender<ProgressUpdate>,
    ) -> Result<ReconcileReport> {
        self.request(|reply| LibraryCommand::Rescan {
            progress: Some(progress),
            reply,
        })
        .await
    }

    pub async fn reset(&self) -> Result<ReconcileReport> {
        self.request(LibraryCommand::Reset).await
    }

    pub async fn reopen(&self, paths: LibraryPaths) -> Result<ReconcileReport> {
        self.request(|reply| LibraryCommand::Reopen(paths, reply))
            .await
    }

    pub async fn set_vfs_disabled(&self, disabled: bool) -> Result<()> {
        self.sender
            .send(LibraryCommand::SetVfsDisabled(disabled))
            .await
            .map_err(|_| VfsError::ActorGone)
    }

    pub async fn list_children(&self, vpath: VPath, sort: SortOptions) -> Result<Vec<ListEntry>> {
        self.request(|reply| LibraryCommand::ListChildren { vpath, sort, reply })
            .await
    }

    pub async fn full_tree(&self) -> Result<Folder> {
        self.request(LibraryCommand::FullTree).await
    }

    pub async fn all_metadata(&self) -> Result<MetadataMap> {
        self.request(LibraryCommand::AllMetadata).await
    }

    pub async fn dangling_references(&self) -> Result<Vec<String>> {
        self.request(LibraryCommand::DanglingReferences).await
    }

    pub async fn create_folder(&self, parent: VPath, name: impl Into<String>) -> Result<VPath> {
        let name = name.into();
        self.request(|reply| LibraryCommand::CreateFolder {
            parent,
            name,
            reply,
        })
        .await
    }

    pub async fn move_items(&self, sources: Vec<MoveSource>, target: VPath) -> Result<MoveReport> {
        self.request(|reply| LibraryCommand::MoveItems {
            sources,
            target,
            reply,
        })
        .await
    }

    pub async fn delete_virtual_folder(&self, vpath: VPath) -> Result<()> {
        self.request(|reply| LibraryCommand::DeleteFolder { vpath, reply })
            .await
    }

    pub async fn remove_item_references(&self, ids: Vec<String>) -> Result<usize> {
        self.request(|reply| LibraryCommand::RemoveItems { ids, reply })
            .await
    }

    pub async fn assign_launcher_path(
        &self,
        id: impl Into<String>,
        relative_path: impl Into<PathBuf>,
        kind: impl Into<String>,
    ) -> Result<()> {
        let (id, relative_path, kind) = (id.into(), relative_path.into(), kind.into());
        self.request(|reply| LibraryCommand::AssignLauncherPath {
            id,
            relative_path,
            kind,
            reply,
        })
        .await
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(LibraryCommand::Shutdown).await;
    }
}
