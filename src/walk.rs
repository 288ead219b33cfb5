use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::{MediaKind, VIDEO_EXTENSIONS};
use crate::error::{DedupeError, Result};

/// `root` and every directory below it, sorted byte-wise by full path.
pub fn list_folders(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(DedupeError::InvalidPath {
            path: format!("{} is not a directory", root.display()),
        });
    }

    let mut folders: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect();

    folders.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    Ok(folders)
}

pub fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Regular files directly inside `folder`, sorted by file name.
///
/// Every file is a candidate image; decoding decides what is one. Videos are
/// filtered by extension.
pub fn list_candidates(folder: &Path, media: MediaKind) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(DedupeError::InvalidPath {
            path: folder.display().to_string(),
        });
    }

    let files = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| match media {
            MediaKind::Images => true,
            MediaKind::Videos => is_video(path),
        })
        .collect();

    Ok(files)
}
