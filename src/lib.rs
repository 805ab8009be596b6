//! Sightline
//!
//! Scans a video for a single object class and reports the time intervals over
//! which the object was continuously detected.
//!
//! # Architecture
//!
//! The scan is a single sequential pipeline:
//!
//! 1. **Ingest**: decode the video into ordered frames plus its frame rate.
//! 2. **Sample**: evaluate every Nth raw frame, stamped `index / fps`.
//! 3. **Detect**: ask a detector backend for boxes of the target class.
//! 4. **Store**: write positive frames to the output directory.
//! 5. **Group**: fold positive runs into `Event` intervals.
//! 6. **Report**: render the events as HTML strips, JSON or text.
//!
//! # Module Structure
//!
//! - `frame`: decoded RGB frames
//! - `ingest`: frame sources (local files, synthetic)
//! - `sample`: stride sampler and timestamps
//! - `detect`: detector backends and the hit predicate
//! - `group`: interval grouping
//! - `store`: detected-frame persistence
//! - `pipeline`: the scan loop
//! - `report`: presentation
//! - `server`: upload interface
//! - `config`: file + environment configuration

pub mod config;
pub mod detect;
pub mod frame;
pub mod group;
pub mod ingest;
pub mod pipeline;
pub mod report;
pub mod sample;
pub mod server;
pub mod store;
pub mod ui;

pub use config::{AppConfig, DetectorSettings, ReportSettings, ScanSettings, UploadSettings};
pub use detect::{build_backend, ClassId, Detection, DetectionResult, DetectorBackend, StubBackend};
pub use frame::VideoFrame;
pub use group::{group_samples, Event, IntervalGrouper};
pub use ingest::{FileConfig, FileSource, FileStats, FrameSource};
pub use pipeline::{scan, ScanReport};
pub use sample::{Sample, Sampler, Timestamp};
pub use store::FrameStore;
