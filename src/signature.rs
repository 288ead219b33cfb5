//! Signature extraction: decode a media file, reduce it to a grayscale
//! `compare_size × compare_size` thumbnail and flatten that into a vector.
//!
//! Decoding sits behind the [`MediaDecoder`] trait. Still images go through the
//! `image` crate; videos are probed and sampled with the `ffprobe`/`ffmpeg`
//! command line tools so only their first frame is ever decoded.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageReader, Luma};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{DedupeError, Result};

/// Output of a decoder: the grayscale frame to compare plus, for videos, the
/// number of frames the container reports.
#[derive(Debug, Clone)]
pub struct DecodedMedia {
    pub frame: GrayImage,
    pub frame_count: Option<u64>,
}

pub trait MediaDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<DecodedMedia>;
}

/// One successfully extracted file of a folder batch.
#[derive(Debug, Clone)]
pub struct MediaRecord {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub signature: Vec<f32>,
    pub aux: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl MediaDecoder for ImageDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedMedia> {
        let img = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| DedupeError::decode(path, e))?;

        Ok(DecodedMedia {
            frame: luma601(&img),
            frame_count: None,
        })
    }
}

/// 8-bit luma with ITU-R 601 weights (0.299, 0.587, 0.114) in 16-bit fixed
/// point, rounded half up.
fn luma601(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let l = (u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000) >> 16;
        Luma([l as u8])
    })
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    duration: Option<String>,
    avg_frame_rate: Option<String>,
}

impl ProbeStream {
    /// Frame count from the container header, or estimated from duration and
    /// frame rate when the header doesn't carry one.
    fn frame_count(&self) -> Option<u64> {
        if let Some(n) = self.nb_frames.as_deref().and_then(|s| s.parse::<u64>().ok()) {
            return Some(n);
        }
        let duration: f64 = self.duration.as_deref()?.parse().ok()?;
        let fps = parse_rate(self.avg_frame_rate.as_deref()?)?;
        Some((duration * fps + 0.5).floor() as u64)
    }
}

fn parse_rate(rate: &str) -> Option<f64> {
    let (num, den) = match rate.split_once('/') {
        Some((num, den)) => (num.parse::<f64>().ok()?, den.parse::<f64>().ok()?),
        None => (rate.parse::<f64>().ok()?, 1.0),
    };
    if den == 0.0 || !num.is_finite() {
        return None;
    }
    Some(num / den)
}

/// Decodes the first frame of a video through external `ffprobe`/`ffmpeg` binaries.
#[derive(Debug, Clone)]
pub struct VideoDecoder {
    ffprobe: PathBuf,
    ffmpeg: PathBuf,
}

impl Default for VideoDecoder {
    fn default() -> Self {
        Self {
            ffprobe: PathBuf::from("ffprobe"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

impl VideoDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(ffprobe: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            ffmpeg: ffmpeg.into(),
        }
    }

    fn probe(&self, path: &Path) -> Result<ProbeStream> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-select_streams", "v:0", "-show_entries"])
            .arg("stream=width,height,nb_frames,duration,avg_frame_rate")
            .args(["-of", "json"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| DedupeError::ToolUnavailable {
                message: format!("could not run {}: {}", self.ffprobe.display(), e),
            })?;

        if !output.status.success() {
            return Err(DedupeError::decode(
                path,
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }

        let parsed: ProbeOutput =
            serde_json::from_slice(&output.stdout).map_err(|e| DedupeError::decode(path, e))?;
        parsed
            .streams
            .into_iter()
            .next()
            .ok_or_else(|| DedupeError::decode(path, "no video stream"))
    }

    fn first_frame(&self, path: &Path, width: u32, height: u32) -> Result<GrayImage> {
        let output = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-noautorotate", "-i"])
            .arg(path)
            .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "gray", "-"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| DedupeError::ToolUnavailable {
                message: format!("could not run {}: {}", self.ffmpeg.display(), e),
            })?;

        if !output.status.success() {
            return Err(DedupeError::decode(
                path,
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }

        let expected = width as usize * height as usize;
        if output.stdout.len() < expected {
            return Err(DedupeError::decode(
                path,
                format!("short frame: {} of {} bytes", output.stdout.len(), expected),
            ));
        }

        let mut pixels = output.stdout;
        pixels.truncate(expected);
        GrayImage::from_raw(width, height, pixels)
            .ok_or_else(|| DedupeError::decode(path, "frame buffer does not match dimensions"))
    }
}

impl MediaDecoder for VideoDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedMedia> {
        let stream = self.probe(path)?;
        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => return Err(DedupeError::decode(path, "stream has no dimensions")),
        };
        let frame_count = stream.frame_count().unwrap_or(0);
        let frame = self.first_frame(path, width, height)?;

        Ok(DecodedMedia {
            frame,
            frame_count: Some(frame_count),
        })
    }
}

/// Resize `frame` to `compare_size × compare_size` and flatten it row-major.
pub fn extract_signature(frame: &GrayImage, compare_size: u32) -> Result<Vec<f32>> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(DedupeError::InvalidConfig {
            message: "cannot resize an empty frame".to_string(),
        });
    }
    if compare_size == 0 {
        return Err(DedupeError::InvalidConfig {
            message: "compare size must be at least 1".to_string(),
        });
    }

    let resized = imageops::resize(frame, compare_size, compare_size, FilterType::CatmullRom);
    Ok(resized.into_raw().into_iter().map(f32::from).collect())
}

/// Decode `path` and turn it into a [`MediaRecord`]. Any failure means the
/// file is left out of its batch; no partial record is produced.
pub fn extract_record(
    path: &Path,
    decoder: &dyn MediaDecoder,
    compare_size: u32,
) -> Result<MediaRecord> {
    let decoded = decoder.decode(path)?;

    // Single-frame "videos" are stills in a video container.
    if let Some(frames) = decoded.frame_count {
        if frames <= 1 {
            return Err(DedupeError::decode(
                path,
                format!("{} frame(s), not a video", frames),
            ));
        }
    }

    let signature = extract_signature(&decoded.frame, compare_size)
        .map_err(|e| DedupeError::decode(path, e))?;
    let size = fs::metadata(path)?.len();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| DedupeError::InvalidPath {
            path: path.display().to_string(),
        })?;

    Ok(MediaRecord {
        name,
        path: path.to_path_buf(),
        size,
        signature,
        aux: decoded.frame_count,
    })
}
