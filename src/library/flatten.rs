//! Tree flattening for the nested browser view.
//!
//! Converts the hierarchical, filtered tree into an ordered row sequence for
//! windowed rendering. Directory children are only evaluated when the
//! directory is expanded or a search/rating filter is active; an active
//! filter force-expands every directory so buried matches stay reachable.

use std::collections::{HashMap, HashSet};
use std::ops::Range as IndexRange;
use std::sync::Arc;

use crate::library::entry::Entry;
use crate::library::filter::{matches_criteria, sort_files, FilterCriteria, SortSpec};

/// Rows kept rendered beyond each edge of the viewport.
pub const OVERSCAN_ROWS: usize = 10;

/// One row of the flattened view.
#[derive(Debug, Clone)]
pub struct FlatRow {
    pub entry: Arc<Entry>,
    pub depth: usize,
}

/// Flatten the tree under `root` into the authoritative render sequence.
///
/// The synthetic root itself is never emitted. Within each directory,
/// subdirectories come first in scan order, then matching files sorted with
/// the same comparator as the flat list (a fresh sort per directory).
pub fn flatten_tree(
    root: &Arc<Entry>,
    criteria: &FilterCriteria,
    spec: &SortSpec,
    durations: &HashMap<String, f64>,
    ratings: &HashMap<String, u8>,
    expanded: &HashSet<String>,
) -> Vec<FlatRow> {
    let force_expanded = criteria.is_search_active();
    rows_for(root, 0, criteria, spec, durations, ratings, expanded, force_expanded)
}

#[allow(clippy::too_many_arguments)]
fn rows_for(
    dir: &Arc<Entry>,
    depth: usize,
    criteria: &FilterCriteria,
    spec: &SortSpec,
    durations: &HashMap<String, f64>,
    ratings: &HashMap<String, u8>,
    expanded: &HashSet<String>,
    force_expanded: bool,
) -> Vec<FlatRow> {
    let mut out: Vec<FlatRow> = Vec::new();
    let mut files: Vec<Arc<Entry>> = Vec::new();

    for child in dir.children() {
        if child.is_dir() {
            if force_expanded {
                // Emit the directory only when something beneath it matches
                let sub = rows_for(
                    child,
                    depth + 1,
                    criteria,
                    spec,
                    durations,
                    ratings,
                    expanded,
                    force_expanded,
                );
                if !sub.is_empty() {
                    out.push(FlatRow {
                        entry: child.clone(),
                        depth,
                    });
                    out.extend(sub);
                }
            } else {
                // Directories stay navigable regardless of row filters
                out.push(FlatRow {
                    entry: child.clone(),
                    depth,
                });
                if expanded.contains(&child.id) {
                    out.extend(rows_for(
                        child,
                        depth + 1,
                        criteria,
                        spec,
                        durations,
                        ratings,
                        expanded,
                        force_expanded,
                    ));
                }
            }
        } else if matches_criteria(child, criteria, durations, ratings) {
            files.push(child.clone());
        }
    }

    sort_files(&mut files, spec, durations, ratings);
    out.extend(files.into_iter().map(|entry| FlatRow { entry, depth }));
    out
}

/// Compute the visible slice of the flattened list for a virtualized window.
pub fn visible_range(
    scroll_top: f64,
    viewport_height: f64,
    row_height: f64,
    len: usize,
    overscan: usize,
) -> IndexRange<usize> {
    if len == 0 || row_height <= 0.0 {
        return 0..0;
    }
    let first = (scroll_top / row_height).floor() as i64 - overscan as i64;
    let last = ((scroll_top + viewport_height) / row_height).ceil() as i64 + overscan as i64;

    let start = first.max(0) as usize;
    let end = (last.max(0) as usize).min(len);
    start..end.max(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::entry::ROOT_ID;
    use crate::library::filter::{Range, SortKey, SortOrder};
    use crate::test_fixtures::{dir_entry, file_entry};

    fn maps() -> (HashMap<String, f64>, HashMap<String, u8>) {
        (HashMap::new(), HashMap::new())
    }

    fn tree() -> Arc<Entry> {
        dir_entry(
            ROOT_ID,
            "root",
            vec![
                dir_entry(
                    "root/kicks",
                    "kicks",
                    vec![
                        file_entry("root/kicks/909.wav", "909.wav", 2, 2),
                        file_entry("root/kicks/808.wav", "808.wav", 1, 1),
                    ],
                ),
                dir_entry("root/fx", "fx", vec![file_entry("root/fx/riser.wav", "riser.wav", 3, 3)]),
                file_entry("root/loop.wav", "loop.wav", 4, 4),
            ],
        )
    }

    #[test]
    fn test_collapsed_directories_hide_children() {
        let (durations, ratings) = maps();
        let rows = flatten_tree(
            &tree(),
            &FilterCriteria::default(),
            &SortSpec::default(),
            &durations,
            &ratings,
            &HashSet::new(),
        );
        let ids: Vec<&str> = rows.iter().map(|r| r.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["root/kicks", "root/fx", "root/loop.wav"]);
        assert_eq!(rows[0].depth, 0);
    }

    #[test]
    fn test_expanded_directory_emits_sorted_children() {
        let (durations, ratings) = maps();
        let mut expanded = HashSet::new();
        expanded.insert("root/kicks".to_string());

        let rows = flatten_tree(
            &tree(),
            &FilterCriteria::default(),
            &SortSpec::default(),
            &durations,
            &ratings,
            &expanded,
        );
        let ids: Vec<&str> = rows.iter().map(|r| r.entry.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "root/kicks",
                "root/kicks/808.wav",
                "root/kicks/909.wav",
                "root/fx",
                "root/loop.wav"
            ]
        );
        assert_eq!(rows[1].depth, 1);
    }

    #[test]
    fn test_active_search_force_expands_and_prunes() {
        let (durations, ratings) = maps();
        let criteria = FilterCriteria {
            query: "808".to_string(),
            ..Default::default()
        };

        // Nothing expanded, but the match must still be reachable
        let rows = flatten_tree(
            &tree(),
            &criteria,
            &SortSpec::default(),
            &durations,
            &ratings,
            &HashSet::new(),
        );
        let ids: Vec<&str> = rows.iter().map(|r| r.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["root/kicks", "root/kicks/808.wav"]);
    }

    #[test]
    fn test_rating_filter_also_forces_expansion() {
        let (durations, mut ratings) = maps();
        ratings.insert("root/fx/riser.wav".to_string(), 5);
        let criteria = FilterCriteria {
            min_rating: 4,
            ..Default::default()
        };

        let rows = flatten_tree(
            &tree(),
            &criteria,
            &SortSpec::default(),
            &durations,
            &ratings,
            &HashSet::new(),
        );
        let ids: Vec<&str> = rows.iter().map(|r| r.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["root/fx", "root/fx/riser.wav"]);
    }

    #[test]
    fn test_row_filter_without_search_keeps_directories() {
        let (durations, ratings) = maps();
        // A size filter is not a "search" filter; directories stay visible
        let criteria = FilterCriteria {
            size: Range::new(100, 200),
            ..Default::default()
        };
        let mut expanded = HashSet::new();
        expanded.insert("root/kicks".to_string());

        let rows = flatten_tree(
            &tree(),
            &criteria,
            &SortSpec::default(),
            &durations,
            &ratings,
            &expanded,
        );
        let ids: Vec<&str> = rows.iter().map(|r| r.entry.id.as_str()).collect();
        // Files are all outside the size range, but the tree stays navigable
        assert_eq!(ids, vec!["root/kicks", "root/fx"]);
    }

    #[test]
    fn test_per_directory_sort_is_independent() {
        let (durations, ratings) = maps();
        let criteria = FilterCriteria {
            query: "wav".to_string(),
            ..Default::default()
        };
        let spec = SortSpec {
            key: SortKey::Size,
            order: SortOrder::Desc,
        };

        let rows = flatten_tree(&tree(), &criteria, &spec, &durations, &ratings, &HashSet::new());
        let ids: Vec<&str> = rows.iter().map(|r| r.entry.id.as_str()).collect();
        // Each directory sorts its own matches; no global re-ordering
        assert_eq!(
            ids,
            vec![
                "root/kicks",
                "root/kicks/909.wav",
                "root/kicks/808.wav",
                "root/fx",
                "root/fx/riser.wav",
                "root/loop.wav",
            ]
        );
    }

    #[test]
    fn test_visible_range_basic() {
        // 24px rows, 240px viewport, scrolled to row 50
        let range = visible_range(1200.0, 240.0, 24.0, 1000, OVERSCAN_ROWS);
        assert_eq!(range, 40..70);
    }

    #[test]
    fn test_visible_range_clamps_at_edges() {
        let range = visible_range(0.0, 240.0, 24.0, 1000, OVERSCAN_ROWS);
        assert_eq!(range, 0..20);

        let range = visible_range(23_760.0, 240.0, 24.0, 1000, OVERSCAN_ROWS);
        assert_eq!(range, 980..1000);
    }

    #[test]
    fn test_visible_range_empty_list() {
        assert_eq!(visible_range(0.0, 240.0, 24.0, 0, OVERSCAN_ROWS), 0..0);
    }

    #[test]
    fn test_visible_range_small_list() {
        assert_eq!(visible_range(0.0, 240.0, 24.0, 5, OVERSCAN_ROWS), 0..5);
    }
}
