//! Decoded video frames.
//!
//! A `Frame` pairs an RGB image with its zero-based position in the video.
//! Frame ids are what the belt records and the report operate on.

use anyhow::{anyhow, Result};
use image::RgbImage;

/// A single decoded frame.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Zero-based index of the frame in the source.
    pub index: u64,
    image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    /// Build a frame from packed RGB24 bytes.
    pub fn from_rgb(index: u64, width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{} frame, received {}",
                expected_len,
                width,
                height,
                pixels.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", width, height))?;
        Ok(Self { index, image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Replace the pixels, keeping the frame index.
    pub fn replace_image(&mut self, image: RgbImage) {
        self.image = image;
    }
}
