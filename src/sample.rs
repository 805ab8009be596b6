//! Frame sampling and elapsed-time stamps.
//!
//! Sampling is measured in raw frame count, not seconds: with a stride of 10 a
//! 30 fps video is evaluated three times per second, a 10 fps video once.

use anyhow::{anyhow, Result};
use serde::{Serialize, Serializer};
use std::fmt;

/// Elapsed time of a frame from the start of the video.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Timestamp {
    seconds: f64,
}

impl Timestamp {
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// `frame_index / fps`. Callers guarantee a positive frame rate.
    pub fn from_frame(frame_index: u64, fps: f64) -> Self {
        Self {
            seconds: frame_index as f64 / fps,
        }
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    /// Whole seconds, truncated toward zero.
    pub fn whole_seconds(&self) -> u64 {
        if self.seconds.is_finite() && self.seconds > 0.0 {
            self.seconds as u64
        } else {
            0
        }
    }
}

impl fmt::Display for Timestamp {
    /// `H:MM:SS`, hours unpadded.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.whole_seconds();
        write!(
            f,
            "{}:{:02}:{:02}",
            total / 3600,
            (total / 60) % 60,
            total % 60
        )
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One evaluated frame. `hit` carries the frame image when the target was detected.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample<I> {
    pub frame_index: u64,
    pub timestamp: Timestamp,
    pub hit: Option<I>,
}

impl<I> Sample<I> {
    pub fn detected(frame_index: u64, timestamp: Timestamp, image: I) -> Self {
        Self {
            frame_index,
            timestamp,
            hit: Some(image),
        }
    }

    pub fn missed(frame_index: u64, timestamp: Timestamp) -> Self {
        Self {
            frame_index,
            timestamp,
            hit: None,
        }
    }

    pub fn is_detected(&self) -> bool {
        self.hit.is_some()
    }
}

/// Fixed-stride frame selector.
#[derive(Clone, Copy, Debug)]
pub struct Sampler {
    stride: u64,
}

impl Sampler {
    pub fn new(stride: u64) -> Result<Self> {
        if stride == 0 {
            return Err(anyhow!("sampling stride must be at least 1"));
        }
        Ok(Self { stride })
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Frame 0 is always sampled; later frames only on exact multiples of the stride.
    pub fn should_sample(&self, frame_index: u64) -> bool {
        frame_index % self.stride == 0
    }
}
