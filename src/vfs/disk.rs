//! Disk-backed implementations of the file-system capability traits.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use super::{mime_hint_for, ChildHandle, DirHandle, FileHandle, FileStat};

/// A directory on the local disk.
pub struct DiskDir {
    path: PathBuf,
}

impl DiskDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DirHandle for DiskDir {
    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }

    fn list(&self) -> Result<Vec<(String, ChildHandle)>, String> {
        let entries = fs::read_dir(&self.path)
            .map_err(|e| format!("Failed to read directory {}: {}", self.path.display(), e))?;

        let mut children: Vec<(String, ChildHandle)> = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().to_string();
            let path = entry.path();
            if path.is_dir() {
                children.push((name, ChildHandle::Dir(Arc::new(DiskDir::new(path)))));
            } else if path.is_file() {
                children.push((name, ChildHandle::File(Arc::new(DiskFile::new(path)))));
            }
        }

        // read_dir order is platform-dependent; sort by name for stable ids
        children.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(children)
    }

    fn create_file(&self, name: &str, bytes: &[u8]) -> Result<(), String> {
        let target = self.path.join(name);
        fs::write(&target, bytes)
            .map_err(|e| format!("Failed to write {}: {}", target.display(), e))
    }

    fn remove_child(&self, name: &str) -> Result<(), String> {
        let target = self.path.join(name);
        if target.is_dir() {
            fs::remove_dir_all(&target)
                .map_err(|e| format!("Failed to remove {}: {}", target.display(), e))
        } else {
            fs::remove_file(&target)
                .map_err(|e| format!("Failed to remove {}: {}", target.display(), e))
        }
    }
}

/// A file on the local disk.
pub struct DiskFile {
    path: PathBuf,
}

impl DiskFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FileHandle for DiskFile {
    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    fn stat(&self) -> Result<FileStat, String> {
        let meta = fs::metadata(&self.path)
            .map_err(|e| format!("Failed to stat {}: {}", self.path.display(), e))?;
        let last_modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Ok(FileStat {
            size: meta.len(),
            last_modified,
            mime_hint: mime_hint_for(&self.name()),
        })
    }

    fn read(&self) -> Result<Vec<u8>, String> {
        fs::read(&self.path).map_err(|e| format!("Failed to read {}: {}", self.path.display(), e))
    }
}
