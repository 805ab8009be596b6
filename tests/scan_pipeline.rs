//! End-to-end scans over scripted frame sources and detectors.

use anyhow::{anyhow, Result};
use std::collections::HashSet;
use tempfile::tempdir;

use sightline::report::render_html;
use sightline::{
    scan, ClassId, Detection, DetectionResult, DetectorBackend, FileConfig, FileSource, FileStats,
    FrameSource, FrameStore, ReportSettings, ScanSettings, StubBackend, VideoFrame,
};

/// Tiny in-memory video of solid frames.
struct ScriptedSource {
    fps: f64,
    total: u64,
    next: u64,
}

impl ScriptedSource {
    fn new(total: u64, fps: f64) -> Self {
        Self {
            fps,
            total,
            next: 0,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>> {
        if self.next >= self.total {
            return Ok(None);
        }
        let index = self.next;
        self.next += 1;
        let shade = (index % 256) as u8;
        VideoFrame::from_rgb(index, 4, 4, vec![shade; 48]).map(Some)
    }

    fn stats(&self) -> FileStats {
        FileStats {
            frames_decoded: self.next,
            path: "scripted".to_string(),
        }
    }
}

/// Reports boxes on a fixed set of frame indices, tagged with a chosen class.
struct ScriptedDetector {
    hits: HashSet<u64>,
    reported_class: Option<ClassId>,
    calls: Vec<u64>,
    fail_on: Option<u64>,
}

impl ScriptedDetector {
    fn new(hits: &[u64]) -> Self {
        Self {
            hits: hits.iter().copied().collect(),
            reported_class: None,
            calls: Vec::new(),
            fail_on: None,
        }
    }
}

impl DetectorBackend for ScriptedDetector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, frame: &VideoFrame, target: ClassId) -> Result<DetectionResult> {
        self.calls.push(frame.index);
        if self.fail_on == Some(frame.index) {
            return Err(anyhow!("model exploded"));
        }
        if !self.hits.contains(&frame.index) {
            return Ok(DetectionResult::default());
        }
        Ok(DetectionResult {
            detections: vec![Detection {
                x: 0.0,
                y: 0.0,
                w: 1.0,
                h: 1.0,
                confidence: 0.9,
                class: self.reported_class.unwrap_or(target),
            }],
        })
    }
}

fn settings(stride: u64) -> ScanSettings {
    ScanSettings {
        stride,
        target_class: ClassId::COW,
    }
}

#[test]
fn detector_sees_only_strided_frames() -> Result<()> {
    let dir = tempdir()?;
    let store = FrameStore::open(dir.path())?;
    let mut source = ScriptedSource::new(25, 30.0);
    let mut detector = ScriptedDetector::new(&[]);

    let report = scan(&mut source, &mut detector, &store, settings(10), None)?;

    assert_eq!(detector.calls, vec![0, 10, 20]);
    assert_eq!(report.frames_read, 25);
    assert_eq!(report.samples_evaluated, 3);
    assert!(report.events.is_empty());
    Ok(())
}

#[test]
fn last_frame_sampled_only_on_stride_multiple() -> Result<()> {
    let dir = tempdir()?;
    let store = FrameStore::open(dir.path())?;

    let mut source = ScriptedSource::new(21, 10.0);
    let mut detector = ScriptedDetector::new(&[20]);
    let report = scan(&mut source, &mut detector, &store, settings(10), None)?;
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].start.to_string(), "0:00:02");

    let mut source = ScriptedSource::new(20, 10.0);
    let mut detector = ScriptedDetector::new(&[19]);
    let report = scan(&mut source, &mut detector, &store, settings(10), None)?;
    assert!(report.events.is_empty());
    Ok(())
}

#[test]
fn runs_of_hits_become_events_with_stored_frames() -> Result<()> {
    let dir = tempdir()?;
    let store = FrameStore::open(dir.path().join("frames"))?;
    // Sample pattern over indices 0..=60 with stride 10: T T F T F F T
    let mut source = ScriptedSource::new(61, 10.0);
    let mut detector = ScriptedDetector::new(&[0, 10, 30, 60]);

    let report = scan(&mut source, &mut detector, &store, settings(10), None)?;

    let spans: Vec<(String, String, usize)> = report
        .events
        .iter()
        .map(|e| (e.start.to_string(), e.end.to_string(), e.images.len()))
        .collect();
    assert_eq!(
        spans,
        vec![
            ("0:00:00".to_string(), "0:00:01".to_string(), 2),
            ("0:00:03".to_string(), "0:00:03".to_string(), 1),
            ("0:00:06".to_string(), "0:00:06".to_string(), 1),
        ]
    );
    assert_eq!(
        report.events[0].images,
        vec![store.path_for(0), store.path_for(10)]
    );
    for index in [0, 10, 30, 60] {
        assert!(store.path_for(index).exists());
    }
    assert!(!store.path_for(20).exists());
    assert_eq!(report.detections, 4);
    Ok(())
}

#[test]
fn boxes_of_other_classes_do_not_count() -> Result<()> {
    let dir = tempdir()?;
    let store = FrameStore::open(dir.path())?;
    let mut source = ScriptedSource::new(30, 10.0);
    let mut detector = ScriptedDetector::new(&[0, 10, 20]);
    detector.reported_class = Some(ClassId(0));

    let report = scan(&mut source, &mut detector, &store, settings(10), None)?;
    assert!(report.events.is_empty());
    assert_eq!(report.detections, 0);
    Ok(())
}

#[test]
fn detector_failure_aborts_scan() -> Result<()> {
    let dir = tempdir()?;
    let store = FrameStore::open(dir.path())?;
    let mut source = ScriptedSource::new(30, 10.0);
    let mut detector = ScriptedDetector::new(&[0]);
    detector.fail_on = Some(10);

    let err = scan(&mut source, &mut detector, &store, settings(10), None).unwrap_err();
    assert!(format!("{err:#}").contains("model exploded"));
    assert!(format!("{err:#}").contains("frame 10"));
    Ok(())
}

#[test]
fn invalid_frame_rate_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let store = FrameStore::open(dir.path())?;
    let mut source = ScriptedSource::new(5, 0.0);
    let mut detector = ScriptedDetector::new(&[]);
    assert!(scan(&mut source, &mut detector, &store, settings(1), None).is_err());
    Ok(())
}

#[test]
fn repeated_scans_are_identical() -> Result<()> {
    let dir = tempdir()?;
    let store = FrameStore::open(dir.path())?;
    let run = || -> Result<Vec<(f64, f64, usize)>> {
        let mut source = FileSource::open(FileConfig::new("stub://pasture"))?;
        let mut detector = StubBackend::new();
        let report = scan(&mut source, &mut detector, &store, settings(5), None)?;
        Ok(report
            .events
            .iter()
            .map(|e| (e.start.seconds(), e.end.seconds(), e.images.len()))
            .collect())
    };
    let first = run()?;
    assert_eq!(first, vec![(2.0, 4.5, 6), (7.0, 7.5, 2)]);
    assert_eq!(first, run()?);
    Ok(())
}

#[test]
fn synthetic_scan_renders_report() -> Result<()> {
    let dir = tempdir()?;
    let store = FrameStore::open(dir.path())?;
    let mut source = FileSource::open(FileConfig::new("stub://pasture"))?;
    let mut detector = StubBackend::new();
    let report = scan(&mut source, &mut detector, &store, settings(10), None)?;

    let html = render_html(&report, &ReportSettings::default())?;
    assert!(html.contains("Done! Found 2 cow detection intervals."));
    assert!(html.contains("Event 1: 0:00:02 to 0:00:04"));
    assert!(html.contains("Event 2: 0:00:07 to 0:00:07"));
    assert_eq!(html.matches("data:image/jpeg;base64,").count(), 4);
    Ok(())
}
