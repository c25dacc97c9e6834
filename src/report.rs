//! Accuracy report: expected frames vs. detected frames, per belt part.

use std::collections::BTreeSet;
use std::fmt;

use crate::belt::{BeltDetected, BeltVisible};

/// Set comparison for one belt part.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartReport {
    /// Length of the expected sequence (not deduplicated).
    pub expected: usize,
    /// Frames both expected and detected.
    pub matched: BTreeSet<u64>,
    /// Frames expected but never detected.
    pub missed: BTreeSet<u64>,
    /// Frames detected but not expected.
    pub false_detected: BTreeSet<u64>,
}

impl PartReport {
    pub fn compare(expected: &[u64], detected: &[u64]) -> Self {
        let expected_set: BTreeSet<u64> = expected.iter().copied().collect();
        let detected_set: BTreeSet<u64> = detected.iter().copied().collect();
        Self {
            expected: expected.len(),
            matched: expected_set.intersection(&detected_set).copied().collect(),
            missed: expected_set.difference(&detected_set).copied().collect(),
            false_detected: detected_set.difference(&expected_set).copied().collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeltReport {
    pub total_frames: u64,
    pub belt: PartReport,
    pub corner: PartReport,
}

impl BeltReport {
    pub fn new(visible: &BeltVisible, detected: &BeltDetected, total_frames: u64) -> Self {
        Self {
            total_frames,
            belt: PartReport::compare(&visible.belt_frames, &detected.belt_frames),
            corner: PartReport::compare(&visible.belt_corner_frames, &detected.belt_corner_frames),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        vec![
            format!(
                "Total frames {}, successfully detected belt {} of {} times, corner belt - {} of {}",
                self.total_frames,
                self.belt.matched.len(),
                self.belt.expected,
                self.corner.matched.len(),
                self.corner.expected
            ),
            format!("Non detected belt frames: {}", frame_set(&self.belt.missed)),
            format!(
                "False detected belt frames: {}",
                frame_set(&self.belt.false_detected)
            ),
            format!(
                "Non detected belt corner frames: {}",
                frame_set(&self.corner.missed)
            ),
            format!(
                "False detected belt corner frames: {}",
                frame_set(&self.corner.false_detected)
            ),
        ]
    }

    pub fn log(&self) {
        for line in self.lines() {
            log::info!("{}", line);
        }
    }
}

/// `{1, 2}` for frames, `set()` when there are none.
fn frame_set(frames: &BTreeSet<u64>) -> String {
    if frames.is_empty() {
        "set()".to_string()
    } else {
        format!("{frames:?}")
    }
}

impl fmt::Display for BeltReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
