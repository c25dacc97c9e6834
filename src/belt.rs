//! Expected and observed belt frame records.

use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Frames (ids) in which each belt part is supposed to be detected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct BeltVisible {
    pub belt_frames: Vec<u64>,
    pub belt_corner_frames: Vec<u64>,
}

impl BeltVisible {
    pub fn new(belt_frames: Vec<u64>, belt_corner_frames: Vec<u64>) -> Self {
        Self {
            belt_frames,
            belt_corner_frames,
        }
    }

    /// Both parts expected in every frame of `range`.
    ///
    /// This is a placeholder for real ground truth; see `from_file`.
    pub fn synthesized(range: Range<u64>) -> Self {
        Self {
            belt_frames: range.clone().collect(),
            belt_corner_frames: range.collect(),
        }
    }

    /// Load annotated frames from a JSON file with `belt_frames` and
    /// `belt_corner_frames` arrays.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ground truth {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid ground truth file {}", path.display()))
    }
}

/// Frames (ids) in which each belt part was detected.
///
/// One entry is appended per qualifying detection, so a frame may repeat.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BeltDetected {
    /// Main part.
    pub belt_frames: Vec<u64>,
    /// Corner part.
    pub belt_corner_frames: Vec<u64>,
}

impl BeltDetected {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_belt(&mut self, frame: u64) {
        self.belt_frames.push(frame);
    }

    pub fn add_corner_belt(&mut self, frame: u64) {
        self.belt_corner_frames.push(frame);
    }
}
