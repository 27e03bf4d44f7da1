//! Tree node types and their on-disk JSON shape.
//!
//! Folders serialize as `{ "name", "type": "folder", "children", "size" }` and
//! item references as `{ "id", "type" }`. The two shapes are told apart by
//! their fields, so the enum is untagged.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VfsNode {
    Folder(Folder),
    Item(ItemRef),
}

impl VfsNode {
    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            VfsNode::Folder(f) => Some(f),
            VfsNode::Item(_) => None,
        }
    }

    pub fn as_item(&self) -> Option<&ItemRef> {
        match self {
            VfsNode::Item(i) => Some(i),
            VfsNode::Folder(_) => None,
        }
    }
}

/// The `"type": "folder"` discriminator carried by every folder object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderTag {
    #[default]
    Folder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub name: String,
    #[serde(rename = "type")]
    pub tag: FolderTag,
    #[serde(default)]
    pub children: Vec<VfsNode>,
    /// Cumulative byte size, rewritten by [`crate::vfs::aggregate`].
    #[serde(default)]
    pub size: u64,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: FolderTag::Folder,
            children: Vec::new(),
            size: 0,
        }
    }

    pub fn root() -> Self {
        Self::new("root")
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn push_folder(&mut self, folder: Folder) {
        self.children.push(VfsNode::Folder(folder));
    }

    pub fn push_item(&mut self, item: ItemRef) {
        self.children.push(VfsNode::Item(item));
    }

    pub fn folders(&self) -> impl Iterator<Item = &Folder> {
        self.children.iter().filter_map(VfsNode::as_folder)
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemRef> {
        self.children.iter().filter_map(VfsNode::as_item)
    }
}

/// A reference to a physical item, identified by its directory name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ItemRef {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }
}
