//! Batch relocation.
//!
//! Moves a set of file entries into a target directory, transactionally per
//! item: read the source bytes, create (or overwrite) a same-named file in
//! the target, then best-effort remove the original from its recorded
//! parent. One failure never aborts the batch.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::library::entry::Entry;
use crate::vfs::DirHandle;

/// Outcome of a batch move.
#[derive(Debug, Default)]
pub struct MoveReport {
    /// Entries whose contents landed in the target.
    pub moved: usize,
    /// Per-entry failures as `(id, error)`.
    pub failed: Vec<(String, String)>,
}

/// Move each file entry into `target`. Directories in the input are skipped
/// with a per-item error. Returns once every item has settled.
pub async fn move_many(entries: Vec<Arc<Entry>>, target: Arc<dyn DirHandle>) -> MoveReport {
    let mut tasks = FuturesUnordered::new();

    for entry in entries {
        let target = target.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            (entry.id.clone(), move_one(&entry, &target))
        }));
    }

    let mut report = MoveReport::default();
    while let Some(joined) = tasks.next().await {
        match joined {
            Ok((_, Ok(()))) => report.moved += 1,
            Ok((id, Err(e))) => {
                log::warn!("Move failed for {}: {}", id, e);
                report.failed.push((id, e));
            }
            Err(e) => {
                log::warn!("Move task panicked: {}", e);
                report.failed.push((String::new(), e.to_string()));
            }
        }
    }
    report
}

fn move_one(entry: &Entry, target: &Arc<dyn DirHandle>) -> Result<(), String> {
    let handle = entry
        .file_handle()
        .ok_or_else(|| format!("{} is not a file", entry.id))?;

    let bytes = handle.read()?;
    target.create_file(&entry.name, &bytes)?;

    // Removal is best-effort: the copy already succeeded, a rescan will
    // reconcile any leftover original.
    if let Some(parent) = entry.parent_handle() {
        if let Err(e) = parent.remove_child(&entry.name) {
            log::warn!("Could not remove original {}: {}", entry.id, e);
        }
    }

    Ok(())
}
