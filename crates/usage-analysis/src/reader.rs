//! Usage file discovery and loading.
//!
//! Reads usage events from a `.json` array, a `.jsonl` file with one event per
//! line, or every such file under a directory. Records that fail to parse or
//! validate are skipped and counted rather than aborting the load.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use usage_core::error::{InsightError, Result};
use usage_core::models::UsageEvent;

/// Events loaded from disk plus a count of what was dropped.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Valid events, sorted by timestamp.
    pub events: Vec<UsageEvent>,
    /// Records that could not be parsed or failed validation.
    pub skipped: usize,
    /// Files read.
    pub files: usize,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.json` and `.jsonl` files recursively under `dir`, sorted by path.
pub fn find_usage_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_usage_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load usage events from a file or a directory of files.
///
/// Fails when `path` cannot be read, when a directory holds no usage files,
/// or when a `.json` file is not valid JSON at all. Individual bad records
/// are only counted in [`LoadReport::skipped`].
pub fn load_events(path: &Path) -> Result<LoadReport> {
    let meta = std::fs::metadata(path).map_err(|source| InsightError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let files = if meta.is_dir() {
        let found = find_usage_files(path);
        if found.is_empty() {
            return Err(InsightError::NoInputFiles(path.to_path_buf()));
        }
        found
    } else {
        vec![path.to_path_buf()]
    };

    let mut report = LoadReport::default();
    for file in &files {
        let (events, skipped) = load_file(file)?;
        report.events.extend(events);
        report.skipped += skipped;
        report.files += 1;
    }

    report.events.sort_by_key(|e| e.timestamp);

    debug!(
        "Loaded {} events from {} files ({} skipped)",
        report.events.len(),
        report.files,
        report.skipped
    );
    if report.skipped > 0 {
        warn!("Skipped {} malformed or invalid usage records", report.skipped);
    }

    Ok(report)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn is_usage_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "json" || ext == "jsonl")
        .unwrap_or(false)
}

fn is_json_document(path: &Path) -> bool {
    path.extension().map(|ext| ext == "json").unwrap_or(false)
}

/// Parse one file; returns `(events, skipped)`.
fn load_file(path: &Path) -> Result<(Vec<UsageEvent>, usize)> {
    let file = std::fs::File::open(path).map_err(|source| InsightError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    if is_json_document(path) {
        let document: serde_json::Value = serde_json::from_reader(std::io::BufReader::new(file))?;
        let records = match document {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        };
        return Ok(collect_records(path, records.into_iter().map(Ok)));
    }

    let reader = std::io::BufReader::new(file);
    let mut lines = Vec::new();
    for line_result in reader.lines() {
        let line = match line_result {
            Ok(l) => l,
            // Non-UTF-8 line: the bytes are consumed, so count it and keep reading.
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                lines.push(Err(InsightError::Io(e)));
                continue;
            }
            Err(source) => {
                return Err(InsightError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        lines.push(serde_json::from_str::<serde_json::Value>(trimmed).map_err(InsightError::from));
    }
    Ok(collect_records(path, lines.into_iter()))
}

fn collect_records<I>(path: &Path, records: I) -> (Vec<UsageEvent>, usize)
where
    I: Iterator<Item = Result<serde_json::Value>>,
{
    let mut events = Vec::new();
    let mut skipped = 0usize;
    for (index, record) in records.enumerate() {
        match record.and_then(parse_event) {
            Ok(event) => events.push(event),
            Err(e) => {
                skipped += 1;
                debug!("Skipping record {} in {}: {}", index + 1, path.display(), e);
            }
        }
    }
    debug!(
        "File {}: {} events, {} skipped",
        path.display(),
        events.len(),
        skipped
    );
    (events, skipped)
}

/// Decode and validate one record. A missing total is filled from the parts.
fn parse_event(value: serde_json::Value) -> Result<UsageEvent> {
    let mut event: UsageEvent = serde_json::from_value(value)?;
    if event.total_tokens == 0 {
        event.total_tokens = event
            .input_tokens
            .saturating_add(event.output_tokens)
            .saturating_add(event.cache_read_tokens);
    }
    event.validate()?;
    Ok(event)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
