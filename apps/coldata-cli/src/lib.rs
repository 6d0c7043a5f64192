//! Record import for the `coldata` command line.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use coldata_core::traits::DocumentStore;
use coldata_core::types::Record;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub files: usize,
    pub inserted: usize,
    /// Records whose index was already present.
    pub skipped: usize,
}

/// `path` itself when it is a file, else every `*.jsonl` below it in name order.
pub fn record_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "jsonl"))
        .collect();
    files.sort();
    files
}

/// Reads one JSON record per non-blank line.
pub fn read_records(file: &Path) -> Result<Vec<Record>> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("failed to open {}", file.display()))?);
    let mut records = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid record", file.display(), n + 1))?;
        records.push(record.normalized());
    }
    Ok(records)
}

pub async fn import_path(store: &dyn DocumentStore, path: &Path) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    for file in record_files(path) {
        for record in read_records(&file)? {
            if store.insert_if_absent(&record).await? {
                report.inserted += 1;
            } else {
                report.skipped += 1;
            }
        }
        report.files += 1;
        tracing::info!(file = %file.display(), inserted = report.inserted, skipped = report.skipped, "imported");
    }
    Ok(report)
}
