//! Near-duplicate detection for images and videos.
//!
//! Each folder is handled on its own: files are reduced to grayscale
//! signatures, compared by cosine distance, collapsed into duplicate groups and
//! ordered by file size so that one file per group is kept.

pub mod config;
pub mod delete;
pub mod error;
pub mod folder;
pub mod grouping;
pub mod logging;
pub mod report;
pub mod selector;
pub mod signature;
pub mod similarity;
pub mod walk;

pub use config::{KeepPolicy, MediaKind, ScanConfig};
pub use error::{DedupeError, Result};
pub use folder::{FolderReport, FolderScanner, FolderStage, ReportGroup};
pub use report::{scan_folders, scan_tree, ScanReport};
pub use signature::{ImageDecoder, MediaDecoder, MediaRecord, VideoDecoder};
