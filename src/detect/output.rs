//! Decoding of single-shot detector output rows.
//!
//! Each row is `[cx, cy, w, h, objectness, score_0, .., score_n]` with the box
//! normalized to the frame. Only the best class score is thresholded; objectness
//! is not folded in and overlapping boxes are not suppressed.

use anyhow::{anyhow, Result};

use super::result::{BoundingBox, Detection};

/// Scores start after the box and objectness.
const SCORES_OFFSET: usize = 5;

/// A network output viewed as rows of its last dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputTensor {
    cols: usize,
    data: Vec<f32>,
}

impl OutputTensor {
    pub fn new(cols: usize, data: Vec<f32>) -> Result<Self> {
        if cols == 0 {
            if data.is_empty() {
                return Ok(Self { cols, data });
            }
            return Err(anyhow!("output tensor has zero-width rows"));
        }
        if data.len() % cols != 0 {
            return Err(anyhow!(
                "output tensor of {} values is not a whole number of {}-wide rows",
                data.len(),
                cols
            ));
        }
        Ok(Self { cols, data })
    }

    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != cols) {
            return Err(anyhow!("output rows have mixed widths"));
        }
        Self::new(cols, rows.concat())
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.cols.max(1))
    }
}

/// Decode every row of every output into detections above `threshold`.
pub fn decode_detections(
    outputs: &[OutputTensor],
    width: u32,
    height: u32,
    threshold: f32,
) -> Vec<Detection> {
    outputs
        .iter()
        .flat_map(|output| output.rows())
        .filter_map(|row| decode_row(row, width, height, threshold))
        .collect()
}

fn decode_row(row: &[f32], width: u32, height: u32, threshold: f32) -> Option<Detection> {
    let scores = row.get(SCORES_OFFSET..).filter(|scores| !scores.is_empty())?;
    let (class_id, confidence) = best_class(scores);
    if !(confidence > threshold) {
        return None;
    }

    let width = width as f32;
    let height = height as f32;
    let center_x = (row[0] * width) as i32;
    let center_y = (row[1] * height) as i32;
    let w = (row[2] * width) as i32;
    let h = (row[3] * height) as i32;

    Some(Detection {
        class_id,
        confidence,
        bbox: BoundingBox {
            x: (center_x as f32 - w as f32 / 2.0) as i32,
            y: (center_y as f32 - h as f32 / 2.0) as i32,
            width: w,
            height: h,
        },
    })
}

/// First index holding the maximum score.
fn best_class(scores: &[f32]) -> (usize, f32) {
    let mut best = (0, scores[0]);
    for (idx, &score) in scores.iter().enumerate().skip(1) {
        if score > best.1 {
            best = (idx, score);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cx: f32, cy: f32, w: f32, h: f32, scores: &[f32]) -> Vec<f32> {
        let mut row = vec![cx, cy, w, h, 0.9];
        row.extend_from_slice(scores);
        row
    }

    #[test]
    fn decodes_box_from_normalized_center() {
        let output = OutputTensor::from_rows(&[row(0.5, 0.5, 0.25, 0.5, &[0.1, 0.8])]).unwrap();
        let detections = decode_detections(&[output], 640, 480, 0.2);
        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert_eq!(det.class_id, 1);
        assert!((det.confidence - 0.8).abs() < 1e-6);
        assert_eq!(
            det.bbox,
            BoundingBox {
                x: 240,
                y: 120,
                width: 160,
                height: 240
            }
        );
    }

    #[test]
    fn threshold_is_strict_and_ignores_objectness() {
        let mut at_threshold = row(0.5, 0.5, 0.1, 0.1, &[0.2, 0.0]);
        at_threshold[4] = 1.0;
        let above = row(0.5, 0.5, 0.1, 0.1, &[0.0, 0.21]);
        let output = OutputTensor::from_rows(&[at_threshold, above]).unwrap();
        let detections = decode_detections(&[output], 100, 100, 0.2);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 1);
    }

    #[test]
    fn ties_resolve_to_first_class() {
        let output = OutputTensor::from_rows(&[row(0.5, 0.5, 0.1, 0.1, &[0.5, 0.5, 0.5])]).unwrap();
        let detections = decode_detections(&[output], 10, 10, 0.2);
        assert_eq!(detections[0].class_id, 0);
    }

    #[test]
    fn truncates_toward_zero_near_the_edge() {
        let output = OutputTensor::from_rows(&[row(0.1, 0.1, 0.55, 0.55, &[0.9])]).unwrap();
        let det = &decode_detections(&[output], 100, 100, 0.2)[0];
        assert_eq!(det.bbox.width, 55);
        assert_eq!(det.bbox.x, -17);
        assert_eq!(det.bbox.y, -17);
    }

    #[test]
    fn decodes_every_output_and_skips_short_rows() {
        let first = OutputTensor::from_rows(&[row(0.5, 0.5, 0.1, 0.1, &[0.9])]).unwrap();
        let second = OutputTensor::from_rows(&[
            row(0.2, 0.2, 0.1, 0.1, &[0.0, 0.7]),
            row(0.2, 0.2, 0.1, 0.1, &[0.0, 0.1]),
        ])
        .unwrap();
        let short = OutputTensor::new(5, vec![0.5; 10]).unwrap();
        let detections = decode_detections(&[first, second, short], 10, 10, 0.2);
        assert_eq!(detections.len(), 2);
    }

    #[test]
    fn rejects_ragged_tensors() {
        assert!(OutputTensor::new(6, vec![0.0; 7]).is_err());
        assert!(OutputTensor::from_rows(&[vec![0.0; 6], vec![0.0; 7]]).is_err());
    }
}
