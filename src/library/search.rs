//! Smart search matching.
//!
//! A query splits on whitespace into terms and every term must match:
//! - `-term` excludes names containing `term` (case-insensitive)
//! - `/pattern/flags` is compiled as a regular expression (case-insensitive
//!   unless flags say otherwise); invalid patterns fall back to a plain
//!   substring match of the raw term
//! - anything else is a case-insensitive substring match

use regex::RegexBuilder;

/// Evaluate a search query against a name. Blank queries match everything.
pub fn matches(text: &str, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    query.split_whitespace().all(|term| term_matches(text, term))
}

fn term_matches(text: &str, term: &str) -> bool {
    if let Some(excluded) = term.strip_prefix('-') {
        // Excluding nothing always passes
        if excluded.is_empty() {
            return true;
        }
        return !contains_ci(text, excluded);
    }

    if let Some(rest) = term.strip_prefix('/') {
        // A second '/' after the first marks a /pattern/flags term
        if let Some(close) = rest.rfind('/') {
            let pattern = &rest[..close];
            let flags = &rest[close + 1..];
            let case_insensitive = flags.is_empty() || flags.contains('i');

            match RegexBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .build()
            {
                Ok(re) => return re.is_match(text),
                // Invalid syntax: treat the raw term as a substring
                Err(_) => return contains_ci(text, term),
            }
        }
    }

    contains_ci(text, term)
}

fn contains_ci(text: &str, needle: &str) -> bool {
    text.to_lowercase().contains(&needle.to_lowercase())
}
