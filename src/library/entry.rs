//! The library entry tree.
//!
//! Each scan produces a fresh, immutable tree of `Entry` values behind
//! `Arc`s. Consumers never mutate a tree in place; a rescan replaces the
//! whole snapshot.

use std::fmt;
use std::sync::Arc;

use crate::vfs::{DirHandle, FileHandle};

/// Identifier of the synthetic root entry.
pub const ROOT_ID: &str = "root";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Kind-specific payload. Exactly one variant per entry, so the
/// file-fields-vs-children invariant holds by construction.
pub enum Node {
    File {
        size: u64,
        /// Epoch milliseconds, fixed at scan time.
        last_modified: i64,
        mime_hint: String,
        handle: Arc<dyn FileHandle>,
        /// Back-reference used only to remove the original after a move.
        parent: Arc<dyn DirHandle>,
    },
    Directory {
        handle: Arc<dyn DirHandle>,
        /// Ordered children, rebuilt wholesale on every rescan.
        children: Vec<Arc<Entry>>,
    },
}

/// A node in the library tree.
pub struct Entry {
    /// Stable path-like id, unique within a scan session (`"root"` for the
    /// root, `parent_id/name` below it). The sole join key across duration,
    /// rating, selection, and playback state.
    pub id: String,
    pub name: String,
    pub node: Node,
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self.node {
            Node::File { .. } => EntryKind::File,
            Node::Directory { .. } => EntryKind::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == EntryKind::Directory
    }

    pub fn children(&self) -> &[Arc<Entry>] {
        match &self.node {
            Node::Directory { children, .. } => children,
            Node::File { .. } => &[],
        }
    }

    /// File size in bytes; 0 for directories.
    pub fn size(&self) -> u64 {
        match &self.node {
            Node::File { size, .. } => *size,
            Node::Directory { .. } => 0,
        }
    }

    /// Last modification time in epoch millis; 0 for directories.
    pub fn last_modified(&self) -> i64 {
        match &self.node {
            Node::File { last_modified, .. } => *last_modified,
            Node::Directory { .. } => 0,
        }
    }

    pub fn mime_hint(&self) -> &str {
        match &self.node {
            Node::File { mime_hint, .. } => mime_hint,
            Node::Directory { .. } => "",
        }
    }

    pub fn file_handle(&self) -> Option<&Arc<dyn FileHandle>> {
        match &self.node {
            Node::File { handle, .. } => Some(handle),
            Node::Directory { .. } => None,
        }
    }

    pub fn parent_handle(&self) -> Option<&Arc<dyn DirHandle>> {
        match &self.node {
            Node::File { parent, .. } => Some(parent),
            Node::Directory { .. } => None,
        }
    }

    pub fn dir_handle(&self) -> Option<&Arc<dyn DirHandle>> {
        match &self.node {
            Node::Directory { handle, .. } => Some(handle),
            Node::File { .. } => None,
        }
    }

    /// All file entries in this subtree, depth-first in tree order.
    pub fn collect_files(self: &Arc<Self>) -> Vec<Arc<Entry>> {
        let mut out = Vec::new();
        self.collect_files_into(&mut out);
        out
    }

    fn collect_files_into(self: &Arc<Self>, out: &mut Vec<Arc<Entry>>) {
        match &self.node {
            Node::File { .. } => out.push(self.clone()),
            Node::Directory { children, .. } => {
                for child in children {
                    child.collect_files_into(out);
                }
            }
        }
    }

    /// Find an entry in this subtree by id.
    pub fn find(self: &Arc<Self>, id: &str) -> Option<Arc<Entry>> {
        if self.id == id {
            return Some(self.clone());
        }
        // Ids are path-like, so only matching prefixes can contain the target
        if !id.starts_with(&self.id) {
            return None;
        }
        for child in self.children() {
            if let Some(found) = child.find(id) {
                return Some(found);
            }
        }
        None
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("children", &self.children().len())
            .finish()
    }
}

/// Compose a child id from its parent id and name.
pub fn child_id(parent_id: &str, name: &str) -> String {
    format!("{}/{}", parent_id, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{dir_entry, file_entry};

    #[test]
    fn test_kind_accessors() {
        let file = file_entry("root/kick.wav", "kick.wav", 100, 1_000);
        assert_eq!(file.kind(), EntryKind::File);
        assert_eq!(file.size(), 100);
        assert_eq!(file.last_modified(), 1_000);
        assert!(file.file_handle().is_some());
        assert!(file.dir_handle().is_none());

        let dir = dir_entry("root", "samples", vec![file]);
        assert_eq!(dir.kind(), EntryKind::Directory);
        assert_eq!(dir.size(), 0);
        assert_eq!(dir.children().len(), 1);
        assert!(dir.dir_handle().is_some());
    }

    #[test]
    fn test_collect_files_tree_order() {
        let tree = dir_entry(
            ROOT_ID,
            "root",
            vec![
                file_entry("root/a.wav", "a.wav", 1, 1),
                dir_entry(
                    "root/sub",
                    "sub",
                    vec![file_entry("root/sub/b.wav", "b.wav", 2, 2)],
                ),
                file_entry("root/c.wav", "c.wav", 3, 3),
            ],
        );
        let files = tree.collect_files();
        let ids: Vec<&str> = files.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["root/a.wav", "root/sub/b.wav", "root/c.wav"]);
    }

    #[test]
    fn test_find_by_id() {
        let tree = dir_entry(
            ROOT_ID,
            "root",
            vec![dir_entry(
                "root/sub",
                "sub",
                vec![file_entry("root/sub/b.wav", "b.wav", 2, 2)],
            )],
        );
        assert_eq!(tree.find("root/sub/b.wav").unwrap().name, "b.wav");
        assert!(tree.find("root/nope.wav").is_none());
        assert_eq!(tree.find(ROOT_ID).unwrap().id, ROOT_ID);
    }

    #[test]
    fn test_child_id() {
        assert_eq!(child_id(ROOT_ID, "kick.wav"), "root/kick.wav");
        assert_eq!(child_id("root/sub", "x"), "root/sub/x");
    }
}
