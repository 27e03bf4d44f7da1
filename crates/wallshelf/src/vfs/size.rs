//! Folder size aggregation.

use std::collections::HashMap;

use super::node::{Folder, VfsNode};

/// Source of per-item byte sizes, usually the scanner's item cache.
pub trait ItemSizes {
    fn item_size(&self, id: &str) -> Option<u64>;
}

impl ItemSizes for HashMap<String, u64> {
    fn item_size(&self, id: &str) -> Option<u64> {
        self.get(id).copied()
    }
}

/// Recompute `size` on every folder in the subtree and return the total.
///
/// Unknown item ids contribute zero, so dangling references never fail the walk.
pub fn aggregate<S: ItemSizes + ?Sized>(folder: &mut Folder, sizes: &S) -> u64 {
    let mut total: u64 = 0;
    for child in folder.children.iter_mut() {
        let child_size = match child {
            VfsNode::Folder(sub) => aggregate(sub, sizes),
            VfsNode::Item(item) => sizes.item_size(&item.id).unwrap_or(0),
        };
        total = total.saturating_add(child_size);
    }
    folder.size = total;
    total
}
