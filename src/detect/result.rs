use serde::{Deserialize, Serialize};
use std::fmt;

/// Detector class index (COCO numbering for the bundled YOLO models).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u32);

impl ClassId {
    /// COCO "cow".
    pub const COW: ClassId = ClassId(19);
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of running detection on a frame.
#[derive(Clone, Debug, Default)]
pub struct DetectionResult {
    /// Bounding boxes (normalized 0..1 coordinates).
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    /// Number of boxes reported for `class`.
    pub fn count_for(&self, class: ClassId) -> usize {
        self.detections.iter().filter(|d| d.class == class).count()
    }

    /// A frame counts as a hit when at least one box of the target class is present.
    pub fn is_hit(&self, class: ClassId) -> bool {
        self.count_for(class) > 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub confidence: f32,
    pub class: ClassId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(class: u32) -> Detection {
        Detection {
            x: 0.1,
            y: 0.1,
            w: 0.2,
            h: 0.2,
            confidence: 0.9,
            class: ClassId(class),
        }
    }

    #[test]
    fn hit_requires_a_box_of_the_target_class() {
        let empty = DetectionResult::default();
        assert!(!empty.is_hit(ClassId::COW));

        let other = DetectionResult {
            detections: vec![boxed(0), boxed(2)],
        };
        assert!(!other.is_hit(ClassId::COW));

        let cows = DetectionResult {
            detections: vec![boxed(19), boxed(0), boxed(19)],
        };
        assert!(cows.is_hit(ClassId::COW));
        assert_eq!(cows.count_for(ClassId::COW), 2);
    }
}
