//! Batch ingestion and date filtering
//!
//! Reads transcript batches from a directory of JSON files (one array of
//! raw records per file, as the worker machines write them) and filters to
//! the target calendar day. Unreadable files and unparseable timestamps are
//! logged and skipped; they never abort the batch.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, warn};

use blotter_core::TranscriptRecord;

/// Timestamp format the worker machines embed in each record
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A record as written by the transcription workers
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub transcription: String,

    /// Feed URL; falls back to the batch file stem when absent
    #[serde(default)]
    pub url: Option<String>,

    pub timestamp: String,
}

/// Load every `*.json` batch file under `dir`.
///
/// A file that fails to parse is skipped with a warning, matching the
/// per-file decode handling of the upstream fetch stage.
pub fn load_batches(dir: &Path) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read input directory {}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to read batch file");
                continue;
            }
        };

        let mut batch: Vec<RawRecord> = match serde_json::from_str(&content) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "JSON decode error in batch file");
                continue;
            }
        };

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        for record in &mut batch {
            record.url.get_or_insert_with(|| stem.clone());
        }

        debug!(file = %path.display(), count = batch.len(), "loaded batch file");
        records.extend(batch);
    }

    Ok(records)
}

/// Filter raw records to the target date, producing pipeline input.
///
/// Returns the surviving records plus how many were dropped for an
/// unparseable timestamp.
pub fn filter_to_date(records: Vec<RawRecord>, date: NaiveDate) -> (Vec<TranscriptRecord>, usize) {
    let mut kept = Vec::new();
    let mut dropped = 0;

    for record in records {
        let parsed = match NaiveDateTime::parse_from_str(&record.timestamp, TIMESTAMP_FORMAT) {
            Ok(parsed) => parsed,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };
        if parsed.date() != date {
            continue;
        }

        let source_id = record.url.unwrap_or_else(|| "unknown".to_string());
        kept.push(TranscriptRecord::new(
            record.transcription,
            source_id,
            parsed.and_utc(),
        ));
    }

    (kept, dropped)
}
