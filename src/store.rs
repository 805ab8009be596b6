//! Detected-frame persistence.
//!
//! Positive samples are written eagerly as JPEG files named by frame index
//! (`frame_<index>.jpg`). Files are left in place after the scan; writing the
//! same index twice overwrites the earlier file.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::frame::VideoFrame;

pub const DEFAULT_OUTPUT_DIR: &str = "cow_frames";

const JPEG_QUALITY: u8 = 90;

#[derive(Clone, Debug)]
pub struct FrameStore {
    dir: PathBuf,
}

impl FrameStore {
    /// Open (creating if needed) the output directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create output directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, frame_index: u64) -> PathBuf {
        self.dir.join(format!("frame_{frame_index}.jpg"))
    }

    /// Encode `frame` as JPEG and return the written path.
    pub fn persist(&self, frame: &VideoFrame) -> Result<PathBuf> {
        let path = self.path_for(frame.index);
        let image = frame.to_rgb_image()?;
        let file =
            File::create(&path).with_context(|| format!("create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
            .encode_image(&image)
            .with_context(|| format!("encode frame {} as jpeg", frame.index))?;
        log::debug!("stored frame {} at {}", frame.index, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn persists_named_jpeg() -> Result<()> {
        let dir = tempdir()?;
        let store = FrameStore::open(dir.path().join("nested/frames"))?;
        let frame = VideoFrame::from_rgb(40, 4, 4, vec![128u8; 48])?;

        let path = store.persist(&frame)?;
        assert_eq!(path, store.dir().join("frame_40.jpg"));

        let decoded = image::open(&path)?;
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
        Ok(())
    }

    #[test]
    fn open_is_idempotent() -> Result<()> {
        let dir = tempdir()?;
        FrameStore::open(dir.path())?;
        FrameStore::open(dir.path())?;
        Ok(())
    }
}
