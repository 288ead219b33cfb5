//! The only mutating part of the crate: removing confirmed duplicates and
//! keeping a JSON-lines log of what was removed.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{error, warn};

use crate::error::{DedupeError, Result};
use crate::report::ScanReport;

pub const HISTORY_FILE: &str = ".dupecull-history.jsonl";

/// `true` only for a (trimmed) `y`/`Y` answer.
pub fn is_confirmed(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

pub trait Remover {
    fn remove(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsRemover;

impl Remover for FsRemover {
    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

#[derive(Debug, Default)]
pub struct DeletionOutcome {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<DedupeError>,
}

impl DeletionOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Try to remove every path. A failure is recorded and the loop moves on.
pub fn delete_files(paths: &[PathBuf], remover: &dyn Remover) -> DeletionOutcome {
    let mut outcome = DeletionOutcome::default();
    for path in paths {
        match remover.remove(path) {
            Ok(()) => outcome.deleted.push(path.clone()),
            Err(source) => {
                error!(path = %path.display(), "delete failed: {}", source);
                outcome.failed.push(DedupeError::DeletionFailure {
                    path: path.clone(),
                    source,
                });
            }
        }
    }
    outcome
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: String,
    pub retained: String,
    pub deleted: Vec<String>,
    pub action: String,
}

/// One history record per group that lost at least one file.
pub fn history_records(report: &ScanReport, outcome: &DeletionOutcome) -> Vec<HistoryRecord> {
    let timestamp = Utc::now().to_rfc3339();
    report
        .folders
        .iter()
        .flat_map(|f| f.groups.iter())
        .filter_map(|group| {
            let deleted: Vec<String> = group
                .duplicates
                .iter()
                .filter(|p| outcome.deleted.contains(*p))
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            if deleted.is_empty() {
                return None;
            }
            Some(HistoryRecord {
                timestamp: timestamp.clone(),
                retained: group.kept.to_string_lossy().into_owned(),
                deleted,
                action: "deleted".to_string(),
            })
        })
        .collect()
}

pub fn append_history(root: &Path, records: &[HistoryRecord]) -> Result<PathBuf> {
    let history_file = root.join(HISTORY_FILE);
    let mut out = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&history_file)?;
    for record in records {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }
    Ok(history_file)
}

/// Parse the history log under `root`. Malformed lines are skipped.
pub fn read_history(root: &Path) -> Result<Vec<HistoryRecord>> {
    let history_file = root.join(HISTORY_FILE);
    let reader = BufReader::new(File::open(&history_file)?);

    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<HistoryRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!("skipping malformed history entry {}: {}", i, e),
        }
    }
    Ok(records)
}
