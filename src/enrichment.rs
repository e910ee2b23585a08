//! Metadata enrichment queue.
//!
//! A single background pass derives durations for files missing from the
//! cached duration map. Each probe is timeout-bounded, results are flushed
//! in batches, and the pass yields after every flush so interactive work is
//! not starved.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::audio::DurationProbe;
use crate::library::Entry;
use crate::session::Session;

/// Hard ceiling on a single probe, including the file read.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Flush once this many results have accumulated.
pub const FLUSH_BATCH: usize = 20;

/// Flush at least this often while the queue is busy.
pub const FLUSH_INTERVAL: Duration = Duration::from_millis(500);

/// Cooperative pause after each flush.
pub const FLUSH_PAUSE: Duration = Duration::from_millis(100);

pub struct EnrichmentQueue {
    session: Arc<Session>,
    probe: Arc<dyn DurationProbe>,
}

impl EnrichmentQueue {
    pub fn new(session: Arc<Session>, probe: Arc<dyn DurationProbe>) -> Self {
        Self { session, probe }
    }

    /// Files from the current snapshot with no cached duration, in tree
    /// order (the pass works strictly front-to-back).
    fn pending(&self) -> VecDeque<Arc<Entry>> {
        let Some(root) = self.session.root() else {
            return VecDeque::new();
        };
        let durations = self.session.durations.lock().unwrap();
        root.collect_files()
            .into_iter()
            .filter(|f| !durations.contains_key(&f.id))
            .collect()
    }

    /// Run one enrichment pass over the current snapshot. A call while
    /// another pass is active is a no-op.
    pub async fn run(&self) {
        if self
            .session
            .is_enriching
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Enrichment already running, ignoring trigger");
            return;
        }

        let mut pending = self.pending();
        if !pending.is_empty() {
            log::info!("Enriching {} files", pending.len());
        }

        let mut batch: Vec<(String, f64)> = Vec::new();
        let mut last_flush = Instant::now();

        while let Some(entry) = pending.pop_front() {
            match self.probe_one(&entry).await {
                Ok(seconds) => {
                    // Widen immediately so the range control can already
                    // represent the new value before the batch lands.
                    self.session.widen_duration_bound(seconds);
                    batch.push((entry.id.clone(), seconds));
                }
                Err(e) => log::warn!("Enrichment skipped {}: {}", entry.id, e),
            }

            if batch.len() >= FLUSH_BATCH || last_flush.elapsed() >= FLUSH_INTERVAL {
                self.session.apply_durations(&batch);
                batch.clear();
                last_flush = Instant::now();
                tokio::time::sleep(FLUSH_PAUSE).await;
            }
        }

        if !batch.is_empty() {
            self.session.apply_durations(&batch);
        }
        self.session.is_enriching.store(false, Ordering::SeqCst);
    }

    /// Read and probe one file on the blocking pool, bounded by
    /// [`PROBE_TIMEOUT`] end to end.
    async fn probe_one(&self, entry: &Arc<Entry>) -> Result<f64, String> {
        let handle = entry
            .file_handle()
            .ok_or_else(|| format!("Not a file: {}", entry.id))?
            .clone();
        let probe = self.probe.clone();
        let name = entry.name.clone();

        let task = tokio::task::spawn_blocking(move || {
            let bytes = handle.read()?;
            probe.probe(&bytes, &name)
        });

        match tokio::time::timeout(PROBE_TIMEOUT, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(format!("Probe task failed: {}", e)),
            Err(_) => Err(format!("Probe timed out after {:?}", PROBE_TIMEOUT)),
        }
    }
}
