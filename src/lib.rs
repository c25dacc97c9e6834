//! Conveyor belt detection
//!
//! Runs a pretrained single-shot detector over every frame of a conveyor-belt
//! video and reports how often the belt and its corner were found in the frames
//! where they are expected.
//!
//! # Pipeline
//!
//! 1. `ingest`: decode frames from a local video (or a synthetic `stub://` source)
//! 2. `enhance`: CLAHE on the lightness channel
//! 3. `detect`: blob -> network -> decoded boxes, frame ids recorded per class
//! 4. `preview`: live window, ESC stops playback
//! 5. `report`: expected vs. detected frame sets
//!
//! `pipeline::Session` drives steps 1-4 for one playback pass.

pub mod belt;
pub mod classes;
pub mod config;
pub mod detect;
pub mod enhance;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod preview;
pub mod report;
pub mod ui;

pub use belt::{BeltDetected, BeltVisible};
pub use classes::ClassNames;
pub use config::BeltConfig;
pub use detect::{BeltDetector, DetectorBackend};
pub use enhance::ClaheEnhancer;
pub use frame::Frame;
pub use ingest::{FileConfig, FileSource};
pub use pipeline::{FrameSource, Session, SessionSummary, StopReason};
pub use preview::{NullPreview, Preview, PreviewAction};
pub use report::BeltReport;

use anyhow::Result;

/// Expected frames for the report: the ground-truth file when configured,
/// otherwise the synthesized range.
pub fn expected_frames(config: &BeltConfig) -> Result<BeltVisible> {
    match &config.expected.ground_truth {
        Some(path) => BeltVisible::from_file(path),
        None => Ok(BeltVisible::synthesized(config.expected.range.clone())),
    }
}
