//! Decoded video frames.
//!
//! - `VideoFrame`: packed RGB24 pixels plus the frame's position in the stream.
//!
//! Pixel bytes are private. Detectors borrow them through `pixels()`, the frame
//! store encodes them through `to_rgb_image()`.

use anyhow::{anyhow, Result};
use image::RgbImage;

/// A single decoded frame in packed RGB24 layout.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    /// Zero-based position of this frame in the decoded stream.
    pub index: u64,
    pub width: u32,
    pub height: u32,
    data: Vec<u8>,
}

impl VideoFrame {
    /// Wrap packed RGB24 bytes. The length must match `width * height * 3`.
    pub fn from_rgb(index: u64, width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            index,
            width,
            height,
            data,
        })
    }

    /// Read-only view of the packed pixel bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Luma (BT.601) of the pixel at `(x, y)`.
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 3;
        let r = self.data[idx] as u32;
        let g = self.data[idx + 1] as u32;
        let b = self.data[idx + 2] as u32;
        ((299 * r + 587 * g + 114 * b) / 1000) as u8
    }

    /// Copy the pixels into an `image` buffer for encoding or resizing.
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| anyhow!("frame {} has an invalid pixel buffer", self.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_length_mismatch() {
        let err = VideoFrame::from_rgb(0, 2, 2, vec![0u8; 11]).unwrap_err();
        assert!(err.to_string().contains("length mismatch"));
    }

    #[test]
    fn luma_weights_channels() -> Result<()> {
        let frame = VideoFrame::from_rgb(3, 2, 1, vec![255, 255, 255, 0, 0, 255])?;
        assert_eq!(frame.luma_at(0, 0), 255);
        assert_eq!(frame.luma_at(1, 0), 29);
        assert_eq!(frame.index, 3);
        Ok(())
    }

    #[test]
    fn converts_to_image_buffer() -> Result<()> {
        let frame = VideoFrame::from_rgb(0, 1, 2, vec![1, 2, 3, 4, 5, 6])?;
        let image = frame.to_rgb_image()?;
        assert_eq!(image.dimensions(), (1, 2));
        assert_eq!(image.get_pixel(0, 1).0, [4, 5, 6]);
        Ok(())
    }
}
