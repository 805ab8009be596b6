//! Frame ingestion sources.
//!
//! This module provides sources that decode a video into an ordered sequence of
//! `VideoFrame`s together with the stream's frame rate:
//! - Local video files (feature: ingest-file-ffmpeg)
//! - Synthetic source (`stub://`, testing and demos)
//!
//! Sources decode strictly in order, one frame per call. They do not sample,
//! detect, or persist anything; that belongs to the scan pipeline.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;

use anyhow::Result;

use crate::frame::VideoFrame;

pub use file::{FileConfig, FileSource, FileStats};

/// A finite, ordered stream of decoded frames.
pub trait FrameSource {
    /// Frames per second reported by the container.
    fn fps(&self) -> f64;

    /// Decode the next frame. Returns `Ok(None)` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<VideoFrame>>;

    /// Counters for logging and summaries.
    fn stats(&self) -> FileStats;
}
