//! Facet bounds for range-filter controls.
//!
//! Derived min/max of size, duration, and last-modified over the current
//! file population. The duration maximum only ever widens: enrichment may
//! discover a longer file at any time, and a rescan must not shrink the
//! range a user may already have dialed in.

use std::collections::HashMap;
use std::sync::Arc;

use crate::library::entry::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MinMax<T> {
    pub min: T,
    pub max: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub size: MinMax<u64>,
    pub duration: MinMax<f64>,
    pub date: MinMax<i64>,
}

impl Bounds {
    /// Derive bounds from a file population and the current duration map.
    /// `previous` carries the duration maximum across rescans so it can only
    /// widen.
    pub fn derive(
        files: &[Arc<Entry>],
        durations: &HashMap<String, f64>,
        previous: Option<&Bounds>,
    ) -> Bounds {
        let mut bounds = Bounds::default();

        for (i, file) in files.iter().enumerate() {
            let size = file.size();
            let date = file.last_modified();
            let duration = durations.get(&file.id).copied().unwrap_or(0.0);

            if i == 0 {
                bounds.size = MinMax { min: size, max: size };
                bounds.date = MinMax { min: date, max: date };
                bounds.duration = MinMax {
                    min: duration,
                    max: duration,
                };
            } else {
                bounds.size.min = bounds.size.min.min(size);
                bounds.size.max = bounds.size.max.max(size);
                bounds.date.min = bounds.date.min.min(date);
                bounds.date.max = bounds.date.max.max(date);
                bounds.duration.min = bounds.duration.min.min(duration);
                bounds.duration.max = bounds.duration.max.max(duration);
            }
        }

        if let Some(prev) = previous {
            bounds.duration.max = bounds.duration.max.max(prev.duration.max);
        }

        bounds
    }

    /// Widen the duration maximum to cover a newly discovered duration.
    /// Never narrows.
    pub fn widen_duration(&mut self, seconds: f64) {
        if seconds > self.duration.max {
            self.duration.max = seconds;
        }
    }
}
