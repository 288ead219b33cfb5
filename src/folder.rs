use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{MediaKind, ScanConfig};
use crate::error::{DedupeError, Result};
use crate::grouping::extract_groups;
use crate::selector::select_canonical;
use crate::signature::{extract_record, ImageDecoder, MediaDecoder, MediaRecord, VideoDecoder};
use crate::similarity::find_duplicates;
use crate::walk::list_candidates;

/// Lifecycle of one folder scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderStage {
    Scanning,
    SignatureExtracted,
    SimilarityComputed,
    Grouped,
    Reported,
}

impl fmt::Display for FolderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FolderStage::Scanning => "SCANNING",
            FolderStage::SignatureExtracted => "SIGNATURE_EXTRACTED",
            FolderStage::SimilarityComputed => "SIMILARITY_COMPUTED",
            FolderStage::Grouped => "GROUPED",
            FolderStage::Reported => "REPORTED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportGroup {
    pub kept: PathBuf,
    pub duplicates: Vec<PathBuf>,
}

impl ReportGroup {
    /// Kept file first, then the deletion candidates.
    pub fn members(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.kept.as_path()).chain(self.duplicates.iter().map(PathBuf::as_path))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderReport {
    pub folder: PathBuf,
    pub candidates: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub degenerate: Vec<PathBuf>,
    pub groups: Vec<ReportGroup>,
}

impl FolderReport {
    fn empty(folder: &Path, candidates: usize, extracted: usize, skipped: usize) -> Self {
        Self {
            folder: folder.to_path_buf(),
            candidates,
            extracted,
            skipped,
            degenerate: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// This folder's share of the deletion set, in group order.
    pub fn deletion_list(&self) -> Vec<PathBuf> {
        self.groups
            .iter()
            .flat_map(|g| g.duplicates.iter().cloned())
            .collect()
    }
}

/// Runs the extract → compare → group → select pipeline on one folder at a time.
pub struct FolderScanner {
    config: ScanConfig,
    decoder: Box<dyn MediaDecoder>,
    progress: Option<ProgressBar>,
}

impl FolderScanner {
    /// Scanner with the stock decoder for `config.media`.
    pub fn new(config: ScanConfig) -> Self {
        let decoder: Box<dyn MediaDecoder> = match config.media {
            MediaKind::Images => Box::new(ImageDecoder),
            MediaKind::Videos => Box::new(VideoDecoder::new()),
        };
        Self::with_decoder(config, decoder)
    }

    pub fn with_decoder(config: ScanConfig, decoder: Box<dyn MediaDecoder>) -> Self {
        Self {
            config,
            decoder,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn scan_folder(&self, folder: &Path) -> Result<FolderReport> {
        let files = list_candidates(folder, self.config.media)?;
        self.scan_files(folder, &files)
    }

    /// Scan `files`, which must already be sorted by file name.
    pub fn scan_files(&self, folder: &Path, files: &[PathBuf]) -> Result<FolderReport> {
        let mut stage = FolderStage::Scanning;
        debug!(folder = %folder.display(), %stage, files = files.len());

        let records = self.extract_all(folder, files)?;
        let skipped = files.len() - records.len();
        if skipped > 0 {
            warn!(
                folder = %folder.display(),
                "skipped {} file(s) that could not be decoded",
                skipped
            );
        }
        stage = FolderStage::SignatureExtracted;
        debug!(folder = %folder.display(), %stage, extracted = records.len());

        if records.len() < 2 {
            debug!(folder = %folder.display(), stage = %FolderStage::Reported, "nothing to compare");
            return Ok(FolderReport::empty(folder, files.len(), records.len(), skipped));
        }

        let (duplicates, degenerate) = find_duplicates(&records, self.config.threshold)?;
        stage = FolderStage::SimilarityComputed;
        debug!(folder = %folder.display(), %stage);

        let groups = extract_groups(&duplicates);
        stage = FolderStage::Grouped;
        debug!(folder = %folder.display(), %stage, groups = groups.len());

        let groups = groups
            .iter()
            .filter_map(|group| select_canonical(group, |i| records[i].size, self.config.keep))
            .map(|canonical| ReportGroup {
                kept: records[canonical.kept].path.clone(),
                duplicates: canonical
                    .duplicates
                    .iter()
                    .map(|&i| records[i].path.clone())
                    .collect(),
            })
            .collect();

        stage = FolderStage::Reported;
        debug!(folder = %folder.display(), %stage);

        Ok(FolderReport {
            folder: folder.to_path_buf(),
            candidates: files.len(),
            extracted: records.len(),
            skipped,
            degenerate: degenerate.iter().map(|&i| records[i].path.clone()).collect(),
            groups,
        })
    }

    /// Extract every file in parallel; the ordered collect is the barrier the
    /// similarity stage waits on, and it keeps indices in file-name order.
    ///
    /// A file that fails to decode is skipped. A decoder tool that cannot be
    /// started fails every file the same way, so it aborts the scan instead.
    fn extract_all(&self, folder: &Path, files: &[PathBuf]) -> Result<Vec<MediaRecord>> {
        if let Some(pb) = &self.progress {
            pb.set_length(files.len() as u64);
            pb.set_position(0);
            pb.set_message(folder.display().to_string());
        }

        let decoder = self.decoder.as_ref();
        let compare_size = self.config.compare_size;
        let results: Vec<Result<MediaRecord>> = files
            .par_iter()
            .map(|path| {
                let record = extract_record(path, decoder, compare_size);
                if let Some(pb) = &self.progress {
                    pb.inc(1);
                }
                record
            })
            .collect();

        let mut records = Vec::with_capacity(files.len());
        for (result, path) in results.into_iter().zip(files) {
            match result {
                Ok(record) => records.push(record),
                Err(e @ DedupeError::ToolUnavailable { .. }) => return Err(e),
                Err(e) => debug!(path = %path.display(), "skipped: {}", e),
            }
        }
        Ok(records)
    }
}
