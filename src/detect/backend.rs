use anyhow::Result;

use super::result::{ClassId, DetectionResult};
use crate::frame::VideoFrame;

/// Detector backend trait.
///
/// A backend is an opaque object detector. Thresholding, non-max suppression
/// and model internals are its own business; callers only ask for boxes of a
/// single target class and count them.
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame, reporting only boxes of class `target`.
    fn detect(&mut self, frame: &VideoFrame, target: ClassId) -> Result<DetectionResult>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<B: DetectorBackend + ?Sized> DetectorBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, frame: &VideoFrame, target: ClassId) -> Result<DetectionResult> {
        (**self).detect(frame, target)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
