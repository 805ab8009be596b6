//! Local file frame source.
//!
//! This module provides `FileSource` for decoding frames from local video files.
//! The file source is responsible for:
//! - Accepting only local paths with an allow-listed container extension
//! - Decoding video frames in-memory to RGB24
//! - Reporting the container frame rate
//!
//! The file source does not fetch remote URLs.

use anyhow::{anyhow, Result};
use std::path::Path;

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::FrameSource;
use crate::frame::VideoFrame;

pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["mp4", "avi", "mov"];

const SYNTHETIC_WIDTH: u32 = 64;
const SYNTHETIC_HEIGHT: u32 = 48;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path (e.g., "/tmp/upload.mp4") or `stub://<name>` for synthetic frames.
    pub path: String,
    /// Accepted container extensions, lowercase, without the dot.
    pub allowed_extensions: Vec<String>,
    /// Frame count produced by the synthetic backend.
    pub synthetic_frames: u64,
    /// Frame rate reported by the synthetic backend.
    pub synthetic_fps: f64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            synthetic_frames: 100,
            synthetic_fps: 10.0,
        }
    }
}

impl FileConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn open(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        if config.path.starts_with("stub://") {
            return Ok(Self {
                backend: FileBackend::Synthetic(SyntheticFileSource::new(config)?),
            });
        }
        check_extension(&config.path, &config.allowed_extensions)?;

        #[cfg(feature = "ingest-file-ffmpeg")]
        {
            Ok(Self {
                backend: FileBackend::Ffmpeg(FfmpegFileSource::new(config)?),
            })
        }
        #[cfg(not(feature = "ingest-file-ffmpeg"))]
        {
            Err(anyhow!(
                "file ingestion requires the ingest-file-ffmpeg feature"
            ))
        }
    }
}

impl FrameSource for FileSource {
    fn fps(&self) -> f64 {
        match &self.backend {
            FileBackend::Synthetic(source) => source.config.synthetic_fps,
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.fps(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    fn stats(&self) -> FileStats {
        match &self.backend {
            FileBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_decoded: u64,
    pub path: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticFileSource {
    config: FileConfig,
    frame_count: u64,
}

impl SyntheticFileSource {
    fn new(config: FileConfig) -> Result<Self> {
        if !(config.synthetic_fps.is_finite() && config.synthetic_fps > 0.0) {
            return Err(anyhow!("synthetic fps must be positive"));
        }
        log::info!("FileSource: opened {} (synthetic)", config.path);
        Ok(Self {
            config,
            frame_count: 0,
        })
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>> {
        if self.frame_count >= self.config.synthetic_frames {
            return Ok(None);
        }
        let index = self.frame_count;
        self.frame_count += 1;
        let pixels = synthetic_pixels(index);
        VideoFrame::from_rgb(index, SYNTHETIC_WIDTH, SYNTHETIC_HEIGHT, pixels).map(Some)
    }

    fn stats(&self) -> FileStats {
        FileStats {
            frames_decoded: self.frame_count,
            path: self.config.path.clone(),
        }
    }
}

/// Whether the synthetic scene shows its bright subject at `index`.
pub fn synthetic_subject_visible(index: u64) -> bool {
    (20..50).contains(&index) || (70..80).contains(&index)
}

fn synthetic_pixels(index: u64) -> Vec<u8> {
    let w = SYNTHETIC_WIDTH as usize;
    let h = SYNTHETIC_HEIGHT as usize;
    let mut pixels = vec![0u8; w * h * 3];
    let subject = synthetic_subject_visible(index);
    for y in 0..h {
        for x in 0..w {
            let offset = (y * w + x) * 3;
            let in_square = subject && (16..32).contains(&x) && (12..28).contains(&y);
            let value = if in_square {
                240
            } else {
                ((x + y + index as usize) % 64) as u8
            };
            pixels[offset] = value;
            pixels[offset + 1] = value;
            pixels[offset + 2] = value;
        }
    }
    pixels
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

/// Reject files whose extension is not on the allow-list.
pub fn check_extension(path: &str, allowed: &[String]) -> Result<()> {
    let ext = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| anyhow!("video file '{}' has no extension", path))?;
    if allowed.iter().any(|allowed| allowed.eq_ignore_ascii_case(&ext)) {
        Ok(())
    } else {
        Err(anyhow!(
            "unsupported video type '.{}' (accepted: {})",
            ext,
            allowed.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_urls_and_empty_paths() {
        assert!(FileSource::open(FileConfig::new("")).is_err());
        assert!(FileSource::open(FileConfig::new("http://example.com/a.mp4")).is_err());
    }

    #[test]
    fn extension_allow_list_is_case_insensitive() {
        let allowed = vec!["mp4".to_string(), "mov".to_string()];
        assert!(check_extension("clip.MP4", &allowed).is_ok());
        assert!(check_extension("/tmp/herd.mov", &allowed).is_ok());
        assert!(check_extension("clip.mkv", &allowed).is_err());
        assert!(check_extension("clip", &allowed).is_err());
    }

    #[test]
    fn synthetic_source_yields_configured_frames() -> Result<()> {
        let mut config = FileConfig::new("stub://pasture");
        config.synthetic_frames = 3;
        config.synthetic_fps = 25.0;
        let mut source = FileSource::open(config)?;
        assert_eq!(source.fps(), 25.0);

        let mut indices = Vec::new();
        while let Some(frame) = source.next_frame()? {
            assert_eq!(frame.pixels().len(), 64 * 48 * 3);
            indices.push(frame.index);
        }
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(source.stats().frames_decoded, 3);
        assert!(source.next_frame()?.is_none());
        Ok(())
    }

    #[test]
    fn synthetic_subject_is_bright() -> Result<()> {
        let frame = VideoFrame::from_rgb(25, 64, 48, synthetic_pixels(25))?;
        assert_eq!(frame.luma_at(20, 20), 240);
        let frame = VideoFrame::from_rgb(60, 64, 48, synthetic_pixels(60))?;
        assert!(frame.luma_at(20, 20) < 64);
        Ok(())
    }

    #[test]
    fn synthetic_source_rejects_zero_fps() {
        let mut config = FileConfig::new("stub://pasture");
        config.synthetic_fps = 0.0;
        assert!(FileSource::open(config).is_err());
    }
}
