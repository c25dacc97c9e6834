use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::config::DetectorSettings;

/// How a frame is turned into network input.
#[derive(Clone, Debug, PartialEq)]
pub struct BlobParams {
    pub width: u32,
    pub height: u32,
    /// Multiplier applied after mean subtraction.
    pub scale: f32,
    /// Per-channel mean, in the frame's channel order.
    pub mean: [f32; 3],
    /// Swap the first and third channels (RGB <-> BGR).
    pub swap_rb: bool,
    /// Resize to cover the target and center-crop instead of stretching.
    pub crop: bool,
}

impl BlobParams {
    pub fn from_settings(settings: &DetectorSettings) -> Self {
        Self {
            width: settings.input_size,
            height: settings.input_size,
            scale: settings.scale,
            mean: settings.mean,
            swap_rb: settings.swap_rb,
            crop: settings.crop,
        }
    }
}

/// NCHW `f32` tensor with a batch of one.
#[derive(Clone, Debug, PartialEq)]
pub struct Blob {
    pub shape: [usize; 4],
    pub data: Vec<f32>,
}

pub fn blob_from_image(img: &RgbImage, params: &BlobParams) -> Blob {
    let resized = resize_for_blob(img, params);
    let width = params.width as usize;
    let height = params.height as usize;
    let plane = width * height;

    let mut data = vec![0f32; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = y as usize * width + x as usize;
        for channel in 0..3 {
            let src = if params.swap_rb { 2 - channel } else { channel };
            data[channel * plane + offset] =
                (pixel.0[src] as f32 - params.mean[src]) * params.scale;
        }
    }

    Blob {
        shape: [1, 3, height, width],
        data,
    }
}

fn resize_for_blob(img: &RgbImage, params: &BlobParams) -> RgbImage {
    let (src_w, src_h) = img.dimensions();
    if (src_w, src_h) == (params.width, params.height) {
        return img.clone();
    }
    if !params.crop || src_w == 0 || src_h == 0 {
        return imageops::resize(img, params.width, params.height, FilterType::Triangle);
    }

    let factor = f64::max(
        params.width as f64 / src_w as f64,
        params.height as f64 / src_h as f64,
    );
    let cover_w = ((src_w as f64 * factor).round() as u32).max(params.width);
    let cover_h = ((src_h as f64 * factor).round() as u32).max(params.height);
    let covered = if (cover_w, cover_h) == (src_w, src_h) {
        img.clone()
    } else {
        imageops::resize(img, cover_w, cover_h, FilterType::Triangle)
    };
    let left = (cover_w - params.width) / 2;
    let top = (cover_h - params.height) / 2;
    imageops::crop_imm(&covered, left, top, params.width, params.height).to_image()
}
