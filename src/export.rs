//! Export of the currently filtered file set.
//!
//! Two formats: a plain-text listing (one name per line) and a JSON array of
//! per-file records. The output is composed fully in memory before anything
//! is written, so a failed export never leaves a partial file behind.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Json,
}

/// One exported file entry.
#[derive(Debug, Serialize)]
pub struct ExportRecord {
    pub name: String,
    /// Path-like id within the library tree.
    pub path: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime: String,
    /// Seconds; 0 when not yet enriched.
    pub duration: f64,
    pub rating: u8,
    #[serde(rename = "lastModified")]
    pub last_modified: i64,
}

/// Records for the currently filtered set, in view order.
pub fn export_records(session: &Arc<Session>) -> Vec<ExportRecord> {
    let durations = session.durations.lock().unwrap().clone();
    let ratings = session.ratings.lock().unwrap().clone();

    session
        .filtered_files()
        .iter()
        .map(|entry| ExportRecord {
            name: entry.name.clone(),
            path: entry.id.clone(),
            size: entry.size(),
            mime: entry.mime_hint().to_string(),
            duration: durations.get(&entry.id).copied().unwrap_or(0.0),
            rating: ratings.get(&entry.id).copied().unwrap_or(0),
            last_modified: entry.last_modified(),
        })
        .collect()
}

/// Plain-text listing, one name per line.
pub fn export_text(session: &Arc<Session>) -> String {
    let mut out = String::new();
    for record in export_records(session) {
        out.push_str(&record.name);
        out.push('\n');
    }
    out
}

pub fn export_json(session: &Arc<Session>) -> Result<String, String> {
    serde_json::to_string_pretty(&export_records(session))
        .map_err(|e| format!("Failed to serialize export: {}", e))
}

/// Compose and write an export file. Failures surface a notice and leave no
/// partial output.
pub fn write_export(
    session: &Arc<Session>,
    format: ExportFormat,
    path: &Path,
) -> Result<(), String> {
    let contents = match format {
        ExportFormat::Text => Ok(export_text(session)),
        ExportFormat::Json => export_json(session),
    };

    let result = contents.and_then(|contents| {
        fs::write(path, contents).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
    });

    if let Err(e) = &result {
        session.push_notice(format!("Export failed: {}", e));
    } else {
        log::info!("Exported filtered list to {}", path.display());
    }
    result
}

/// Duration in whole minutes and seconds ("3m 27s").
pub fn format_duration(seconds: f64) -> String {
    let total_secs = seconds.round() as u64;
    format!("{}m {}s", total_secs / 60, total_secs % 60)
}

/// Size in decimal units (1 MB = 1,000,000 bytes).
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1000;
    const MB: u64 = KB * 1000;
    const GB: u64 = MB * 1000;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
