use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{ClassId, Detection, DetectionResult};
use crate::frame::VideoFrame;

const BRIGHT_LUMA: u8 = 200;

/// Stub backend for testing and demos.
///
/// Treats a bright region as the target object: when at least `min_fraction`
/// of the pixels reach `BRIGHT_LUMA`, reports one box of the requested class
/// around them.
pub struct StubBackend {
    min_fraction: f32,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { min_fraction: 0.01 }
    }

    pub fn with_min_fraction(mut self, min_fraction: f32) -> Self {
        self.min_fraction = min_fraction;
        self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &VideoFrame, target: ClassId) -> Result<DetectionResult> {
        let (w, h) = (frame.width, frame.height);
        let total = (w as usize) * (h as usize);
        if total == 0 {
            return Ok(DetectionResult::default());
        }

        let mut bright = 0usize;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (w, h, 0u32, 0u32);
        for y in 0..h {
            for x in 0..w {
                if frame.luma_at(x, y) >= BRIGHT_LUMA {
                    bright += 1;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }

        let fraction = bright as f32 / total as f32;
        if bright == 0 || fraction < self.min_fraction {
            return Ok(DetectionResult::default());
        }

        log::debug!(
            "stub backend: frame {} bright fraction {:.3}",
            frame.index,
            fraction
        );
        Ok(DetectionResult {
            detections: vec![Detection {
                x: min_x as f32 / w as f32,
                y: min_y as f32 / h as f32,
                w: (max_x - min_x + 1) as f32 / w as f32,
                h: (max_y - min_y + 1) as f32 / h as f32,
                confidence: 0.85,
                class: target,
            }],
        })
    }
}
