//! File-system capability interface
//!
//! The library core never touches paths directly. It is handed directory and
//! file handles that expose enumeration, read, create+write, and remove
//! semantics. The disk-backed implementation lives in `disk`; tests use an
//! in-memory implementation from `test_fixtures`.

mod disk;

pub use disk::DiskDir;

use std::sync::Arc;

/// Metadata for a file, fixed at scan time.
#[derive(Debug, Clone)]
pub struct FileStat {
    pub size: u64,
    /// Last modification time in epoch milliseconds.
    pub last_modified: i64,
    pub mime_hint: String,
}

/// Read capability for a single file.
pub trait FileHandle: Send + Sync {
    fn name(&self) -> String;
    fn stat(&self) -> Result<FileStat, String>;
    fn read(&self) -> Result<Vec<u8>, String>;
}

/// A child yielded by directory enumeration.
#[derive(Clone)]
pub enum ChildHandle {
    File(Arc<dyn FileHandle>),
    Dir(Arc<dyn DirHandle>),
}

/// Enumeration plus create/remove capability for a directory.
pub trait DirHandle: Send + Sync {
    fn name(&self) -> String;
    /// Ordered enumeration of children with `{name, kind}`.
    fn list(&self) -> Result<Vec<(String, ChildHandle)>, String>;
    /// Create (or overwrite) a file with the given contents.
    fn create_file(&self, name: &str, bytes: &[u8]) -> Result<(), String>;
    /// Remove a direct child by name.
    fn remove_child(&self, name: &str) -> Result<(), String>;
}

/// Guess a MIME hint from a file name's extension.
pub fn mime_hint_for(name: &str) -> String {
    let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
    let mime = match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "aif" | "aiff" => "audio/aiff",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        _ => "application/octet-stream",
    };
    mime.to_string()
}
