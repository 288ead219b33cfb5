use serde::{Deserialize, Serialize};

use crate::error::{DedupeError, Result};

/// Side length (in pixels) every frame is resized to before comparison.
pub const DEFAULT_COMPARE_SIZE: u32 = 300;

/// Cosine distance below which two signatures count as duplicates.
pub const DEFAULT_THRESHOLD: f64 = 1e-3;

/// Container extensions treated as videos, matched case-insensitively.
pub const VIDEO_EXTENSIONS: [&str; 6] = ["mov", "avi", "mp4", "wmv", "flv", "mkv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Images,
    Videos,
}

/// Which file of a duplicate group survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeepPolicy {
    #[default]
    Smallest,
    Largest,
}

impl From<bool> for KeepPolicy {
    fn from(keep_largest: bool) -> Self {
        if keep_largest {
            KeepPolicy::Largest
        } else {
            KeepPolicy::Smallest
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub media: MediaKind,
    pub compare_size: u32,
    pub keep: KeepPolicy,
    pub threshold: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            media: MediaKind::default(),
            compare_size: DEFAULT_COMPARE_SIZE,
            keep: KeepPolicy::default(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ScanConfig {
    pub fn new(media: MediaKind) -> Self {
        Self {
            media,
            ..Self::default()
        }
    }

    pub fn with_compare_size(mut self, compare_size: u32) -> Self {
        self.compare_size = compare_size;
        self
    }

    pub fn with_keep(mut self, keep: KeepPolicy) -> Self {
        self.keep = keep;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.compare_size == 0 {
            return Err(DedupeError::InvalidConfig {
                message: "compare size must be at least 1".to_string(),
            });
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(DedupeError::InvalidConfig {
                message: format!("threshold must be a positive number, got {}", self.threshold),
            });
        }
        Ok(())
    }
}
