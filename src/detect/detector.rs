use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use super::backend::DetectorBackend;
use super::blob::{blob_from_image, BlobParams};
use super::output::decode_detections;
use super::result::{BoundingBox, Detection};
use crate::belt::BeltDetected;
use crate::classes::ClassNames;
use crate::config::DetectorSettings;
use crate::frame::Frame;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 2;

/// Per-frame belt detection: blob, forward pass, decode, record, draw.
pub struct BeltDetector {
    backend: Box<dyn DetectorBackend>,
    blob: BlobParams,
    threshold: f32,
    belt_class: usize,
    corner_class: usize,
    classes: ClassNames,
}

impl BeltDetector {
    pub fn new(
        backend: Box<dyn DetectorBackend>,
        settings: &DetectorSettings,
        classes: ClassNames,
    ) -> Self {
        Self {
            backend,
            blob: BlobParams::from_settings(settings),
            threshold: settings.threshold,
            belt_class: settings.belt_class,
            corner_class: settings.corner_class,
            classes,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn warm_up(&mut self) -> Result<()> {
        self.backend.warm_up()
    }

    /// Detect belt parts in `frame`, record its index in `detected` and draw
    /// every accepted box onto the frame.
    ///
    /// Boxes are decoded against the frame's own dimensions.
    pub fn detect(&mut self, frame: &mut Frame, detected: &mut BeltDetected) -> Result<Vec<Detection>> {
        let blob = blob_from_image(frame.image(), &self.blob);
        let outputs = self
            .backend
            .forward(&blob)
            .with_context(|| format!("inference failed on frame {}", frame.index))?;
        let detections = decode_detections(&outputs, frame.width(), frame.height(), self.threshold);

        for detection in &detections {
            draw_box(frame.image_mut(), &detection.bbox);
            if detection.class_id == self.corner_class {
                detected.add_corner_belt(frame.index);
            } else if detection.class_id == self.belt_class {
                detected.add_belt(frame.index);
            }
            log::debug!(
                "frame {}: {} ({:.2}) at {},{} {}x{}",
                frame.index,
                self.classes.label(detection.class_id),
                detection.confidence,
                detection.bbox.x,
                detection.bbox.y,
                detection.bbox.width,
                detection.bbox.height
            );
        }

        Ok(detections)
    }
}

fn draw_box(img: &mut RgbImage, bbox: &BoundingBox) {
    for inset in 0..BOX_THICKNESS {
        let width = bbox.width - 2 * inset;
        let height = bbox.height - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(bbox.x + inset, bbox.y + inset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(img, rect, BOX_COLOR);
    }
}
