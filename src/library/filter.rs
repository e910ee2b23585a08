//! Filter criteria, the shared predicate, and stable sorting.
//!
//! The flat file list and the tree flattener evaluate the exact same
//! predicate so the two views can never diverge. Durations and ratings
//! absent from their maps count as 0 — an unenriched file behaves like a
//! zero-length one until the queue gets to it.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::library::entry::Entry;
use crate::library::search::matches;

/// Inclusive numeric range snapshot for one facet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> Range<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Read-only filter snapshot consumed by both views.
#[derive(Debug, Clone)]
pub struct FilterCriteria {
    pub query: String,
    pub size: Range<u64>,
    pub duration: Range<f64>,
    pub date: Range<i64>,
    pub min_rating: u8,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            query: String::new(),
            size: Range::new(0, u64::MAX),
            duration: Range::new(0.0, f64::MAX),
            date: Range::new(0, i64::MAX),
            min_rating: 0,
        }
    }
}

impl FilterCriteria {
    /// True when a search or rating filter forces the tree view open.
    pub fn is_search_active(&self) -> bool {
        !self.query.trim().is_empty() || self.min_rating > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Size,
    Type,
    Date,
    Duration,
    Rating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: SortKey::Name,
            order: SortOrder::Asc,
        }
    }
}

/// The shared predicate: search AND size AND duration AND date AND rating.
pub fn matches_criteria(
    entry: &Entry,
    criteria: &FilterCriteria,
    durations: &HashMap<String, f64>,
    ratings: &HashMap<String, u8>,
) -> bool {
    let duration = durations.get(&entry.id).copied().unwrap_or(0.0);
    let rating = ratings.get(&entry.id).copied().unwrap_or(0);

    matches(&entry.name, &criteria.query)
        && criteria.size.contains(entry.size())
        && criteria.duration.contains(duration)
        && criteria.date.contains(entry.last_modified())
        && rating >= criteria.min_rating
}

/// Compare two entries under a sort spec. Equal keys return `Ordering::Equal`
/// so a stable sort preserves input order.
pub fn compare_entries(
    a: &Entry,
    b: &Entry,
    spec: &SortSpec,
    durations: &HashMap<String, f64>,
    ratings: &HashMap<String, u8>,
) -> Ordering {
    let ordering = match spec.key {
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Type => a
            .mime_hint()
            .to_lowercase()
            .cmp(&b.mime_hint().to_lowercase()),
        SortKey::Size => a.size().cmp(&b.size()),
        SortKey::Date => a.last_modified().cmp(&b.last_modified()),
        SortKey::Duration => {
            let da = durations.get(&a.id).copied().unwrap_or(0.0);
            let db = durations.get(&b.id).copied().unwrap_or(0.0);
            da.partial_cmp(&db).unwrap_or(Ordering::Equal)
        }
        SortKey::Rating => {
            let ra = ratings.get(&a.id).copied().unwrap_or(0);
            let rb = ratings.get(&b.id).copied().unwrap_or(0);
            ra.cmp(&rb)
        }
    };

    match spec.order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

/// Stable in-place sort by the spec.
pub fn sort_files(
    files: &mut [Arc<Entry>],
    spec: &SortSpec,
    durations: &HashMap<String, f64>,
    ratings: &HashMap<String, u8>,
) {
    files.sort_by(|a, b| compare_entries(a, b, spec, durations, ratings));
}

/// The flat view: every file in the tree passing the predicate, stably
/// sorted. Tree order is the tie-break order.
pub fn filter_files(
    root: &Arc<Entry>,
    criteria: &FilterCriteria,
    spec: &SortSpec,
    durations: &HashMap<String, f64>,
    ratings: &HashMap<String, u8>,
) -> Vec<Arc<Entry>> {
    let mut files: Vec<Arc<Entry>> = root
        .collect_files()
        .into_iter()
        .filter(|f| matches_criteria(f, criteria, durations, ratings))
        .collect();
    sort_files(&mut files, spec, durations, ratings);
    files
}
