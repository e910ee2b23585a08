//! Directory scanning.
//!
//! Walks a directory capability depth-first and builds a fresh entry tree.
//! Files are filtered to the audio extension allow-list; non-matching files
//! are dropped silently. Directories are always kept so the tree stays
//! navigable even when empty of audio. A failure in one subdirectory is
//! logged and that subtree treated as empty; a scan never aborts.

use std::sync::Arc;

use crate::audio::is_audio_name;
use crate::library::entry::{child_id, Entry, Node, ROOT_ID};
use crate::vfs::{ChildHandle, DirHandle};

/// Scan a directory capability into a fresh entry tree.
pub fn scan(root: Arc<dyn DirHandle>) -> Arc<Entry> {
    let name = root.name();
    scan_dir(ROOT_ID.to_string(), name, root)
}

fn scan_dir(id: String, name: String, handle: Arc<dyn DirHandle>) -> Arc<Entry> {
    let listed = match handle.list() {
        Ok(children) => children,
        Err(e) => {
            log::warn!("Skipping unreadable directory {}: {}", id, e);
            Vec::new()
        }
    };

    let mut children: Vec<Arc<Entry>> = Vec::new();
    for (child_name, child) in listed {
        match child {
            ChildHandle::Dir(dir) => {
                children.push(scan_dir(child_id(&id, &child_name), child_name, dir));
            }
            ChildHandle::File(file) => {
                if !is_audio_name(&child_name) {
                    continue;
                }
                match file.stat() {
                    Ok(stat) => children.push(Arc::new(Entry {
                        id: child_id(&id, &child_name),
                        name: child_name,
                        node: Node::File {
                            size: stat.size,
                            last_modified: stat.last_modified,
                            mime_hint: stat.mime_hint,
                            handle: file,
                            parent: handle.clone(),
                        },
                    })),
                    Err(e) => {
                        log::warn!("Skipping unreadable file {}: {}", child_name, e);
                    }
                }
            }
        }
    }

    Arc::new(Entry {
        id,
        name,
        node: Node::Directory { handle, children },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::entry::EntryKind;
    use crate::test_fixtures::{mem_dir, mem_file, mem_subdir, FailingDir};

    #[test]
    fn test_scan_filters_to_audio_extensions() {
        let root = mem_dir(
            "samples",
            vec![
                mem_file("kick.wav", 10, 1_000),
                mem_file("readme.txt", 5, 1_000),
                mem_file("loop.mp3", 20, 2_000),
                mem_file("cover.png", 99, 1_000),
            ],
        );

        let tree = scan(root);
        assert_eq!(tree.id, ROOT_ID);
        assert_eq!(tree.kind(), EntryKind::Directory);

        let names: Vec<&str> = tree.children().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["kick.wav", "loop.mp3"]);
    }

    #[test]
    fn test_scan_keeps_empty_directories() {
        let root = mem_dir(
            "samples",
            vec![mem_subdir("empty_sub", vec![]), mem_file("a.wav", 1, 1)],
        );

        let tree = scan(root);
        assert_eq!(tree.children().len(), 2);
        let children = tree.children();
        let sub = children.iter().find(|c| c.name == "empty_sub").unwrap();
        assert!(sub.is_dir());
        assert!(sub.children().is_empty());
    }

    #[test]
    fn test_scan_ids_are_path_like_and_unique() {
        let root = mem_dir(
            "samples",
            vec![mem_subdir("kicks", vec![mem_file("808.wav", 1, 1)])],
        );

        let tree = scan(root);
        let sub = &tree.children()[0];
        assert_eq!(sub.id, "root/kicks");
        assert_eq!(sub.children()[0].id, "root/kicks/808.wav");
    }

    #[test]
    fn test_scan_failure_in_subtree_is_contained() {
        let root = mem_dir(
            "samples",
            vec![
                FailingDir::entry("broken"),
                mem_file("ok.wav", 1, 1),
            ],
        );

        let tree = scan(root);
        // Broken subtree present but empty; sibling survives
        assert_eq!(tree.children().len(), 2);
        assert!(tree.children()[0].children().is_empty());
        assert_eq!(tree.children()[1].name, "ok.wav");
    }

    #[test]
    fn test_scan_failing_root_yields_empty_tree() {
        let tree = scan(FailingDir::handle("broken"));
        assert!(tree.children().is_empty());
        assert_eq!(tree.id, ROOT_ID);
    }

    #[test]
    fn test_rescan_produces_fresh_tree() {
        let root = mem_dir("samples", vec![mem_file("a.wav", 1, 1)]);
        let first = scan(root.clone());
        let second = scan(root);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.children().len(), second.children().len());
    }
}
