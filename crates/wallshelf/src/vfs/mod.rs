//! The virtual folder tree: node types, virtual paths, queries, and size
//! aggregation.

mod node;
mod path;
mod size;
mod tree;

pub use node::{Folder, FolderTag, ItemRef, VfsNode};
pub use path::{VPath, ROOT_MARKER};
pub use size::{aggregate, ItemSizes};
pub use tree::ItemLocation;
