//! Queries and primitive edits over a folder subtree.
//!
//! Lookups never mutate. Edits take a location computed by a lookup, so a
//! failed lookup leaves the tree untouched.

use std::collections::HashSet;

use super::node::{Folder, ItemRef, VfsNode};
use super::path::VPath;

/// Where an item reference lives: its parent folder and index among siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLocation {
    pub parent: VPath,
    pub index: usize,
}

impl Folder {
    /// Direct child folder by exact name.
    pub fn child_folder(&self, name: &str) -> Option<&Folder> {
        self.folders().find(|f| f.name == name)
    }

    fn child_folder_index(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|c| matches!(c, VfsNode::Folder(f) if f.name == name))
    }

    /// Case-insensitive sibling check used when creating folders.
    pub fn has_folder_named_ignore_case(&self, name: &str) -> bool {
        let wanted = name.to_lowercase();
        self.folders().any(|f| f.name.to_lowercase() == wanted)
    }

    /// Walk `path` from this folder. Segments match folder names exactly.
    pub fn resolve(&self, path: &VPath) -> Option<&Folder> {
        let mut current = self;
        for segment in path.segments() {
            current = current.child_folder(segment)?;
        }
        Some(current)
    }

    pub fn resolve_mut(&mut self, path: &VPath) -> Option<&mut Folder> {
        let mut current = self;
        for segment in path.segments() {
            let index = current.child_folder_index(segment)?;
            current = match &mut current.children[index] {
                VfsNode::Folder(f) => f,
                VfsNode::Item(_) => return None,
            };
        }
        Some(current)
    }

    /// First reference to `id`. Direct children are checked before descending,
    /// and subfolders are visited in order.
    pub fn locate_item(&self, id: &str) -> Option<ItemLocation> {
        self.locate_item_from(id, VPath::root())
    }

    fn locate_item_from(&self, id: &str, here: VPath) -> Option<ItemLocation> {
        if let Some(index) = self
            .children
            .iter()
            .position(|c| matches!(c, VfsNode::Item(i) if i.id == id))
        {
            return Some(ItemLocation {
                parent: here,
                index,
            });
        }
        self.folders()
            .find_map(|f| f.locate_item_from(id, here.join(&f.name)))
    }

    pub fn contains_item(&self, id: &str) -> bool {
        self.locate_item(id).is_some()
    }

    /// Every item id referenced anywhere below this folder.
    pub fn item_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        self.collect_item_ids(&mut ids);
        ids
    }

    fn collect_item_ids(&self, ids: &mut HashSet<String>) {
        for child in &self.children {
            match child {
                VfsNode::Folder(f) => f.collect_item_ids(ids),
                VfsNode::Item(i) => {
                    ids.insert(i.id.clone());
                }
            }
        }
    }

    /// All item references below this folder, depth first.
    pub fn all_items(&self) -> Vec<&ItemRef> {
        let mut out = Vec::new();
        self.collect_items(&mut out);
        out
    }

    fn collect_items<'a>(&'a self, out: &mut Vec<&'a ItemRef>) {
        for child in &self.children {
            match child {
                VfsNode::Folder(f) => f.collect_items(out),
                VfsNode::Item(i) => out.push(i),
            }
        }
    }

    /// Number of references to `id` in the subtree.
    pub fn count_item(&self, id: &str) -> usize {
        self.all_items().iter().filter(|i| i.id == id).count()
    }

    pub fn item_mut(&mut self, location: &ItemLocation) -> Option<&mut ItemRef> {
        let parent = self.resolve_mut(&location.parent)?;
        match parent.children.get_mut(location.index)? {
            VfsNode::Item(item) => Some(item),
            VfsNode::Folder(_) => None,
        }
    }

    /// Remove the node at a previously computed location.
    pub fn remove_item_at(&mut self, location: &ItemLocation) -> Option<ItemRef> {
        let parent = self.resolve_mut(&location.parent)?;
        if !matches!(parent.children.get(location.index), Some(VfsNode::Item(_))) {
            return None;
        }
        match parent.children.remove(location.index) {
            VfsNode::Item(item) => Some(item),
            VfsNode::Folder(_) => None,
        }
    }

    /// Detach the first reference to `id`, if any.
    pub fn detach_item(&mut self, id: &str) -> Option<ItemRef> {
        let location = self.locate_item(id)?;
        self.remove_item_at(&location)
    }

    /// Detach the folder at `path` from its parent. The root cannot be detached.
    pub fn detach_folder(&mut self, path: &VPath) -> Option<Folder> {
        let name = path.name()?;
        let parent = self.resolve_mut(&path.parent()?)?;
        let index = parent.child_folder_index(name)?;
        match parent.children.remove(index) {
            VfsNode::Folder(folder) => Some(folder),
            VfsNode::Item(_) => None,
        }
    }
}
