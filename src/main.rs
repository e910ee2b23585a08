//! sampledeck - audio sample library core
//!
//! Scans a sample directory into a library tree, enriches durations in the
//! background, and prints or exports the filtered listing.

mod audio;
mod enrichment;
mod export;
mod library;
mod logging;
mod playback;
mod session;
mod store;
mod test_fixtures;
mod vfs;

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use audio::{LoftyProbe, SymphoniaDecoder};
use enrichment::EnrichmentQueue;
use export::{export_json, export_text, format_duration, format_size, ExportFormat};
use library::{visible_range, Entry, SortKey, SortOrder, OVERSCAN_ROWS};
use playback::Sequencer;
use session::Session;
use store::{JsonFileStore, KvStore, MemoryStore};
use vfs::DiskDir;

struct CliArgs {
    library: PathBuf,
    query: Option<String>,
    sort: Option<(SortKey, SortOrder)>,
    min_rating: u8,
    format: ExportFormat,
    out: Option<PathBuf>,
    skip_enrich: bool,
    tree: bool,
    window: Option<(usize, usize)>,
    audition: bool,
}

fn print_usage() {
    eprintln!("Usage: sampledeck <library-dir> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --query <q>          Smart search query (terms, -exclusions, /regex/)");
    eprintln!("  --sort <key>[:desc]  name | size | type | date | duration | rating");
    eprintln!("  --min-rating <n>     Only files rated at least n (0-5)");
    eprintln!("  --json               Emit a JSON array instead of plain names");
    eprintln!("  --out <path>         Write the listing to a file");
    eprintln!("  --skip-enrich        Skip background duration enrichment");
    eprintln!("  --tree               Print the nested browser view instead of the flat list");
    eprintln!("  --window <row>:<n>   With --tree, show only the n rows visible from row");
    eprintln!("  --audition           Load the first listed file through the playback decoder");
}

fn parse_window(value: &str) -> Result<(usize, usize), String> {
    let (first, count) = value
        .split_once(':')
        .ok_or_else(|| format!("Invalid window (want <row>:<n>): {}", value))?;
    let first = first
        .parse()
        .map_err(|_| format!("Invalid window row: {}", first))?;
    let count = count
        .parse()
        .map_err(|_| format!("Invalid window size: {}", count))?;
    Ok((first, count))
}

fn parse_sort(value: &str) -> Result<(SortKey, SortOrder), String> {
    let (key, order) = match value.split_once(':') {
        Some((key, order)) => (key, order),
        None => (value, "asc"),
    };
    let key = match key {
        "name" => SortKey::Name,
        "size" => SortKey::Size,
        "type" => SortKey::Type,
        "date" => SortKey::Date,
        "duration" => SortKey::Duration,
        "rating" => SortKey::Rating,
        other => return Err(format!("Unknown sort key: {}", other)),
    };
    let order = match order {
        "asc" => SortOrder::Asc,
        "desc" => SortOrder::Desc,
        other => return Err(format!("Unknown sort order: {}", other)),
    };
    Ok((key, order))
}

fn parse_args(args: Vec<String>) -> Result<CliArgs, String> {
    let mut library = None;
    let mut parsed = CliArgs {
        library: PathBuf::new(),
        query: None,
        sort: None,
        min_rating: 0,
        format: ExportFormat::Text,
        out: None,
        skip_enrich: false,
        tree: false,
        window: None,
        audition: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--query" => {
                parsed.query = Some(iter.next().ok_or("--query needs a value")?);
            }
            "--sort" => {
                let value = iter.next().ok_or("--sort needs a value")?;
                parsed.sort = Some(parse_sort(&value)?);
            }
            "--min-rating" => {
                let value = iter.next().ok_or("--min-rating needs a value")?;
                parsed.min_rating = value
                    .parse()
                    .map_err(|_| format!("Invalid rating: {}", value))?;
            }
            "--json" => parsed.format = ExportFormat::Json,
            "--out" => {
                parsed.out = Some(PathBuf::from(iter.next().ok_or("--out needs a value")?));
            }
            "--skip-enrich" => parsed.skip_enrich = true,
            "--tree" => parsed.tree = true,
            "--window" => {
                let value = iter.next().ok_or("--window needs a value")?;
                parsed.window = Some(parse_window(&value)?);
            }
            "--audition" => parsed.audition = true,
            other if other.starts_with("--") => {
                return Err(format!("Unknown option: {}", other));
            }
            other => {
                if library.replace(PathBuf::from(other)).is_some() {
                    return Err("Only one library directory may be given".to_string());
                }
            }
        }
    }

    parsed.library = library.ok_or("Missing library directory")?;
    Ok(parsed)
}

fn expand_all(session: &Session) {
    fn collect(entry: &Arc<Entry>, into: &mut HashSet<String>) {
        for child in entry.children() {
            if child.is_dir() {
                into.insert(child.id.clone());
                collect(child, into);
            }
        }
    }
    let Some(root) = session.root() else { return };
    let mut expanded = session.expanded.lock().unwrap();
    collect(&root, &mut expanded);
}

fn print_tree(session: &Session, window: Option<(usize, usize)>) {
    let rows = session.flattened();
    let range = match window {
        Some((first, count)) => {
            visible_range(first as f64, count as f64, 1.0, rows.len(), OVERSCAN_ROWS)
        }
        None => 0..rows.len(),
    };
    for row in &rows[range] {
        let suffix = if row.entry.is_dir() { "/" } else { "" };
        println!("{}{}{}", "  ".repeat(row.depth), row.entry.name, suffix);
    }
}

fn open_store() -> Arc<dyn KvStore> {
    match JsonFileStore::default_path() {
        Some(path) => Arc::new(JsonFileStore::open(path)),
        None => {
            log::warn!("No home directory; caches will not persist");
            Arc::new(MemoryStore::new())
        }
    }
}

async fn run(args: CliArgs) -> Result<(), String> {
    if !args.library.is_dir() {
        return Err(format!("Not a directory: {}", args.library.display()));
    }

    let session = Session::new(open_store());
    session.open_library(Arc::new(DiskDir::new(&args.library)));

    {
        let mut criteria = session.criteria.lock().unwrap();
        if let Some(query) = args.query {
            criteria.query = query;
        }
        criteria.min_rating = args.min_rating;
    }
    if let Some((key, order)) = args.sort {
        let mut sort = session.sort.lock().unwrap();
        sort.key = key;
        sort.order = order;
    }

    if !args.skip_enrich {
        EnrichmentQueue::new(session.clone(), Arc::new(LoftyProbe))
            .run()
            .await;
    }

    if args.audition {
        let sequencer = Sequencer::new(session.clone(), Some(Arc::new(SymphoniaDecoder)));
        sequencer.ensure_initial_load().await;
        let state = sequencer.state();
        match state.active_id {
            Some(id) => log::info!(
                "Loaded {} ({} waveform buckets)",
                id,
                state.waveform.map_or(0, |w| w.len())
            ),
            None => log::warn!("No file to audition"),
        }
    }

    if args.tree {
        expand_all(&session);
        print_tree(&session, args.window);
    } else {
        match args.out {
            Some(path) => export::write_export(&session, args.format, &path)?,
            None => {
                let listing = match args.format {
                    ExportFormat::Text => export_text(&session),
                    ExportFormat::Json => export_json(&session)?,
                };
                print!("{}", listing);
            }
        }
    }

    let files = session.filtered_files();
    let total_size: u64 = files.iter().map(|f| f.size()).sum();
    let total_duration: f64 = {
        let durations = session.durations.lock().unwrap();
        files
            .iter()
            .map(|f| durations.get(&f.id).copied().unwrap_or(0.0))
            .sum()
    };
    log::info!(
        "{} files, {}, {}",
        files.len(),
        format_size(total_size),
        format_duration(total_duration)
    );

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return ExitCode::FAILURE;
    }

    let parsed = match parse_args(args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match run(parsed).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
