//! Scan pipeline: decode, sample, detect, persist, group.
//!
//! Everything runs on the caller's thread, one frame at a time. The detector,
//! the frame store and the settings are explicit parameters scoped to a single
//! run; any error aborts the scan and propagates to the caller.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::config::ScanSettings;
use crate::detect::DetectorBackend;
use crate::group::{Event, IntervalGrouper};
use crate::ingest::FrameSource;
use crate::sample::{Sample, Sampler, Timestamp};
use crate::store::FrameStore;

/// Outcome of one scan.
#[derive(Clone, Debug, Serialize)]
pub struct ScanReport {
    pub frames_read: u64,
    pub samples_evaluated: u64,
    pub detections: u64,
    pub fps: f64,
    pub events: Vec<Event<PathBuf>>,
}

impl ScanReport {
    pub fn summary_line(&self, label: &str) -> String {
        format!(
            "Done! Found {} {} detection intervals.",
            self.events.len(),
            label
        )
    }

    pub fn empty_notice(label: &str) -> String {
        format!("No {label} detection intervals found.")
    }
}

/// Per-frame progress callback: `(frames_read, events_closed_so_far)`.
pub type Progress<'a> = &'a mut dyn FnMut(u64, usize);

pub fn scan<S, D>(
    source: &mut S,
    detector: &mut D,
    store: &FrameStore,
    settings: ScanSettings,
    mut progress: Option<Progress<'_>>,
) -> Result<ScanReport>
where
    S: FrameSource + ?Sized,
    D: DetectorBackend + ?Sized,
{
    let fps = source.fps();
    if !(fps.is_finite() && fps > 0.0) {
        return Err(anyhow!("video reports an invalid frame rate ({fps})"));
    }
    let sampler = Sampler::new(settings.stride)?;
    let mut grouper = IntervalGrouper::new();

    let mut frames_read = 0u64;
    let mut samples_evaluated = 0u64;
    let mut detections = 0u64;

    while let Some(frame) = source.next_frame()? {
        frames_read += 1;
        let frame_index = frame.index;

        if sampler.should_sample(frame_index) {
            samples_evaluated += 1;
            let timestamp = Timestamp::from_frame(frame_index, fps);
            let result = detector
                .detect(&frame, settings.target_class)
                .with_context(|| format!("detector failed on frame {frame_index}"))?;

            let sample = if result.is_hit(settings.target_class) {
                detections += 1;
                let path = store.persist(&frame)?;
                log::debug!(
                    "frame {} at {}: {} box(es) of class {}",
                    frame_index,
                    timestamp,
                    result.count_for(settings.target_class),
                    settings.target_class
                );
                Sample::detected(frame_index, timestamp, path)
            } else {
                Sample::missed(frame_index, timestamp)
            };
            grouper.push(sample);
        }

        if let Some(progress) = progress.as_mut() {
            progress(frames_read, grouper.closed_events());
        }
    }

    let events = grouper.finish();
    log::info!(
        "scan complete: {} frames, {} samples, {} detections, {} intervals",
        frames_read,
        samples_evaluated,
        detections,
        events.len()
    );

    Ok(ScanReport {
        frames_read,
        samples_evaluated,
        detections,
        fps,
        events,
    })
}
