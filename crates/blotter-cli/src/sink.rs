//! Local record sinks
//!
//! File-backed implementations of the `RecordSink` trait. The column
//! contract is `source_id, timestamp, extracted_address, extracted_keyword,
//! method`; absent fields render as empty strings (CSV) or nulls (JSONL).
//! Spreadsheet transport lives outside this binary and consumes these files.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use blotter_core::{BlotterError, ExtractionResult, RecordSink, Result};

const CSV_HEADER: [&str; 5] = [
    "source_id",
    "timestamp",
    "extracted_address",
    "extracted_keyword",
    "method",
];

/// Appends results as CSV rows, writing the header on first creation
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl RecordSink for CsvSink {
    async fn append(&self, results: &[ExtractionResult]) -> Result<()> {
        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if write_header {
            writer
                .write_record(CSV_HEADER)
                .map_err(|e| BlotterError::SinkError(e.to_string()))?;
        }

        for result in results {
            let timestamp = result.timestamp.to_rfc3339();
            let address = result
                .extracted_address
                .as_ref()
                .map(|a| a.formatted.as_str())
                .unwrap_or("");
            let keyword = result.extracted_keyword.as_deref().unwrap_or("");
            let method = result.method.to_string();

            writer
                .write_record([
                    result.source_id.as_str(),
                    timestamp.as_str(),
                    address,
                    keyword,
                    method.as_str(),
                ])
                .map_err(|e| BlotterError::SinkError(e.to_string()))?;
        }

        writer
            .flush()
            .map_err(|e| BlotterError::SinkError(e.to_string()))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Appends results as one JSON object per line
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl RecordSink for JsonlSink {
    async fn append(&self, results: &[ExtractionResult]) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        for result in results {
            let line = serde_json::to_string(result)
                .map_err(|e| BlotterError::SinkError(e.to_string()))?;
            writeln!(file, "{line}")?;
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blotter_core::TranscriptRecord;
    use chrono::Utc;

    fn results() -> Vec<ExtractionResult> {
        let record = TranscriptRecord::new("no incident", "feed-1", Utc::now());
        vec![
            ExtractionResult::prefiltered_out(&record),
            ExtractionResult::unresolved(&record, "Fire"),
        ]
    }

    #[tokio::test]
    async fn test_csv_sink_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let sink = CsvSink::new(&path);

        sink.append(&results()).await.unwrap();
        sink.append(&results()).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("source_id,timestamp"));
        assert!(lines[2].ends_with(",none"));
    }

    #[tokio::test]
    async fn test_jsonl_sink_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let sink = JsonlSink::new(&path);

        sink.append(&results()).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: ExtractionResult = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.extracted_keyword.as_deref(), Some("Fire"));
    }
}
