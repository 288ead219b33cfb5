use dupecull::delete::{self, FsRemover};
use dupecull::grouping::extract_groups;
use dupecull::similarity::find_duplicates;
use dupecull::walk::list_folders;
use dupecull::{
    scan_folders, scan_tree, DedupeError, FolderScanner, KeepPolicy, MediaKind, MediaRecord,
    ScanConfig, VideoDecoder,
};
use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn white() -> RgbImage {
    ImageBuffer::from_pixel(16, 16, Rgb([255u8, 255, 255]))
}

fn gradient() -> RgbImage {
    ImageBuffer::from_fn(16, 16, |x, y| {
        let v = (x * 16) as u8;
        Rgb([v, (y * 16) as u8, v])
    })
}

fn checker() -> RgbImage {
    ImageBuffer::from_fn(16, 16, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 {
            Rgb([240u8, 240, 240])
        } else {
            Rgb([20u8, 20, 20])
        }
    })
}

fn save(img: &RgbImage, path: &Path, format: ImageFormat) -> PathBuf {
    img.save_with_format(path, format).unwrap();
    path.to_path_buf()
}

fn config() -> ScanConfig {
    ScanConfig::default().with_compare_size(32)
}

/// img1 and img2 hold the same pixels; img1 is a BMP and so much larger.
fn scenario(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let img1 = save(&white(), &dir.join("img1.bmp"), ImageFormat::Bmp);
    let img2 = save(&white(), &dir.join("img2.png"), ImageFormat::Png);
    let img3 = save(&gradient(), &dir.join("img3.png"), ImageFormat::Png);
    assert!(fs::metadata(&img1).unwrap().len() > fs::metadata(&img2).unwrap().len());
    (img1, img2, img3)
}

#[test]
fn test_identical_pixels_keep_smallest() {
    let temp_dir = TempDir::new().unwrap();
    let (img1, img2, img3) = scenario(temp_dir.path());

    let scanner = FolderScanner::new(ScanConfig::default());
    let report = scan_tree(temp_dir.path(), &scanner).unwrap();

    assert_eq!(report.group_count(), 1);
    assert_eq!(report.folders[0].groups[0].kept, img2);
    assert_eq!(report.deletion_set(), vec![img1]);
    assert!(!report.deletion_set().contains(&img3));
}

#[test]
fn test_identical_pixels_keep_largest() {
    let temp_dir = TempDir::new().unwrap();
    let (img1, img2, _) = scenario(temp_dir.path());

    let scanner = FolderScanner::new(config().with_keep(KeepPolicy::Largest));
    let report = scan_tree(temp_dir.path(), &scanner).unwrap();

    assert_eq!(report.folders[0].groups[0].kept, img1);
    assert_eq!(report.deletion_set(), vec![img2]);
}

#[test]
fn test_empty_and_single_image_folders() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir(root.join("empty")).unwrap();
    fs::create_dir(root.join("single")).unwrap();
    save(&white(), &root.join("single/only.png"), ImageFormat::Png);
    fs::write(root.join("single/readme.txt"), b"not an image").unwrap();

    let report = scan_tree(root, &FolderScanner::new(config())).unwrap();
    assert_eq!(report.folders.len(), 3);
    assert!(report.deletion_set().is_empty());

    let single = &report.folders[2];
    assert_eq!(single.candidates, 2);
    assert_eq!(single.extracted, 1);
    assert_eq!(single.skipped, 1);
}

#[test]
fn test_folders_are_compared_independently() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir(root.join("a")).unwrap();
    fs::create_dir(root.join("b")).unwrap();

    save(&checker(), &root.join("a/one.png"), ImageFormat::Png);
    let b_big = save(&checker(), &root.join("b/big.bmp"), ImageFormat::Bmp);
    let b_small = save(&checker(), &root.join("b/small.png"), ImageFormat::Png);
    let a_big = save(&white(), &root.join("a/white.bmp"), ImageFormat::Bmp);
    let a_small = save(&white(), &root.join("a/white.png"), ImageFormat::Png);

    let report = scan_tree(root, &FolderScanner::new(config())).unwrap();
    assert_eq!(report.group_count(), 2);
    // Folders in sorted order: root, a, b.
    assert_eq!(report.deletion_set(), vec![a_big, b_big]);
    assert_eq!(report.folders[1].groups[0].kept, a_small);
    assert_eq!(report.folders[2].groups[0].kept, b_small);
}

#[test]
fn test_rescan_without_deleting_is_identical() {
    let temp_dir = TempDir::new().unwrap();
    scenario(temp_dir.path());
    save(&gradient(), &temp_dir.path().join("img4.bmp"), ImageFormat::Bmp);

    let scanner = FolderScanner::new(config());
    let first = scan_tree(temp_dir.path(), &scanner).unwrap();
    let second = scan_tree(temp_dir.path(), &scanner).unwrap();

    assert_eq!(first.deletion_set(), second.deletion_set());
    assert_eq!(first.folders[0].groups, second.folders[0].groups);
    assert_eq!(first.group_count(), 2);
}

#[test]
fn test_star_grouping_through_the_engine() {
    // Three unit directions 0, θ and 2θ apart: A≈B and B≈C under τ, A≉C.
    let theta: f64 = 0.04;
    let record = |name: &str, angle: f64| MediaRecord {
        name: name.to_string(),
        path: PathBuf::from(name),
        size: 1,
        signature: vec![(1000.0 * angle.cos()) as f32, (1000.0 * angle.sin()) as f32],
        aux: None,
    };
    let records = vec![record("a", 0.0), record("b", theta), record("c", 2.0 * theta)];

    let (duplicates, _) = find_duplicates(&records, 1e-3).unwrap();
    assert!(duplicates.get(0, 1));
    assert!(duplicates.get(1, 2));
    assert!(!duplicates.get(0, 2));

    assert_eq!(extract_groups(&duplicates), vec![vec![0, 1]]);
}

#[test]
fn test_delete_and_history() {
    let temp_dir = TempDir::new().unwrap();
    let (img1, img2, img3) = scenario(temp_dir.path());

    let report = scan_tree(temp_dir.path(), &FolderScanner::new(config())).unwrap();
    let deletions = report.deletion_set();
    let outcome = delete::delete_files(&deletions, &FsRemover);
    assert!(outcome.is_clean());
    assert!(!img1.exists());
    assert!(img2.exists());
    assert!(img3.exists());

    let records = delete::history_records(&report, &outcome);
    delete::append_history(temp_dir.path(), &records).unwrap();
    let history = delete::read_history(temp_dir.path()).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].retained, img2.to_string_lossy());
    assert_eq!(history[0].deleted, vec![img1.to_string_lossy().into_owned()]);

    // The history file itself is not an image and nothing is left to delete.
    let rescan = scan_tree(temp_dir.path(), &FolderScanner::new(config())).unwrap();
    assert!(rescan.deletion_set().is_empty());
}

#[test]
fn test_json_report() {
    let temp_dir = TempDir::new().unwrap();
    scenario(temp_dir.path());

    let report = scan_tree(temp_dir.path(), &FolderScanner::new(config())).unwrap();
    let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(value["folders"][0]["extracted"], 3);
    assert_eq!(value["folders"][0]["groups"].as_array().unwrap().len(), 1);
}

#[test]
fn test_invalid_root_and_config() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing");
    assert!(scan_tree(&missing, &FolderScanner::new(config())).is_err());

    let bad = FolderScanner::new(config().with_threshold(0.0));
    assert!(scan_tree(temp_dir.path(), &bad).is_err());
}

#[test]
fn test_video_scan_without_ffmpeg_fails_loudly() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("one.mp4"), b"not really a video").unwrap();
    fs::write(temp_dir.path().join("two.mp4"), b"not really a video").unwrap();

    let decoder = VideoDecoder::with_tools("/nonexistent/ffprobe", "/nonexistent/ffmpeg");
    let scanner = FolderScanner::with_decoder(ScanConfig::new(MediaKind::Videos), Box::new(decoder));

    let err = scan_tree(temp_dir.path(), &scanner).unwrap_err();
    assert!(matches!(err, DedupeError::ToolUnavailable { .. }));
}

#[test]
fn test_scan_folders_matches_scan_tree() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir(root.join("sub")).unwrap();
    scenario(&root.join("sub"));

    let scanner = FolderScanner::new(config());
    let folders = list_folders(root).unwrap();
    let listed = scan_folders(root, &folders, &scanner).unwrap();
    let walked = scan_tree(root, &scanner).unwrap();

    assert_eq!(listed.folders.len(), 2);
    assert_eq!(listed.deletion_set(), walked.deletion_set());
    assert_eq!(listed.deletion_set(), vec![root.join("sub/img1.bmp")]);
}
