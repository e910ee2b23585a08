//! Library tree, scanning, and view derivation
//!
//! This module contains:
//! - The immutable entry tree produced by each scan
//! - Directory scanning with the audio extension allow-list
//! - Smart search matching and the shared filter predicate
//! - Flat and tree-flattened views with stable sorting
//! - Facet bounds for range-filter controls
//! - Transactional-per-item batch relocation

mod bounds;
pub mod entry;
mod filter;
mod flatten;
mod relocate;
mod scanner;
mod search;

pub use bounds::Bounds;
pub use entry::Entry;
pub use filter::{filter_files, FilterCriteria, SortKey, SortOrder, SortSpec};
pub use flatten::{flatten_tree, visible_range, FlatRow, OVERSCAN_ROWS};
pub use relocate::{move_many, MoveReport};
pub use scanner::scan;

#[cfg(test)]
pub use filter::Range;
