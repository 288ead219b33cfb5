use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::MediaKind;
use crate::error::Result;
use crate::folder::{FolderReport, FolderScanner};
use crate::walk::list_folders;

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub media: MediaKind,
    pub folders: Vec<FolderReport>,
}

impl ScanReport {
    /// Every path proposed for deletion, folder by folder, group by group.
    pub fn deletion_set(&self) -> Vec<PathBuf> {
        self.folders
            .iter()
            .flat_map(FolderReport::deletion_list)
            .collect()
    }

    pub fn group_count(&self) -> usize {
        self.folders.iter().map(|f| f.groups.len()).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Scan `root` and all folders below it, one folder at a time in sorted order.
pub fn scan_tree(root: &Path, scanner: &FolderScanner) -> Result<ScanReport> {
    scanner.config().validate()?;
    let folders = list_folders(root)?;
    scan_folders(root, &folders, scanner)
}

/// Scan folders already listed under `root`, in the order given.
pub fn scan_folders(
    root: &Path,
    folders: &[PathBuf],
    scanner: &FolderScanner,
) -> Result<ScanReport> {
    scanner.config().validate()?;
    info!(root = %root.display(), folders = folders.len(), "starting scan");

    let mut reports = Vec::with_capacity(folders.len());
    for folder in folders {
        reports.push(scanner.scan_folder(folder)?);
    }

    Ok(ScanReport {
        root: root.to_path_buf(),
        media: scanner.config().media,
        folders: reports,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Human-readable listing for one folder.
pub fn render_folder(report: &FolderReport, media: MediaKind) -> String {
    let noun = match media {
        MediaKind::Images => "images",
        MediaKind::Videos => "videos",
    };

    let mut out = String::new();
    let _ = writeln!(out, "Checking folder → {}", report.folder.display());
    let _ = writeln!(out, "Total {} found = {}", noun, report.extracted);
    if report.skipped > 0 {
        let _ = writeln!(out, "Skipped (could not decode) = {}", report.skipped);
    }

    if report.extracted < 2 {
        return out;
    }

    if report.groups.is_empty() {
        let _ = writeln!(out, "No duplicates found.");
    } else {
        let _ = writeln!(out, "\nDuplicates:");
        for group in &report.groups {
            let names: Vec<String> = group.members().map(file_name).collect();
            let _ = writeln!(out, "{}", names.join("\t"));
        }
    }
    if !report.degenerate.is_empty() {
        let _ = writeln!(
            out,
            "Not compared (blank frame): {}",
            report
                .degenerate
                .iter()
                .map(|p| file_name(p))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    out
}

/// Folder listings followed by the consolidated deletion list.
pub fn render_report(report: &ScanReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Folder to be explored: {}\n", report.root.display());

    for folder in &report.folders {
        out.push_str(&render_folder(folder, report.media));
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "-----------------------------Overall Report----------------------------------"
    );

    let deletions = report.deletion_set();
    if deletions.is_empty() {
        let _ = writeln!(out, "No duplicates found.");
    } else {
        let _ = writeln!(out, "\nFiles marked for delete:");
        for path in &deletions {
            let _ = writeln!(out, "{}", path.display());
        }
    }
    out
}
