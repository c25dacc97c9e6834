//! Frame contrast enhancement.
//!
//! Frames are converted to L*a*b*, the lightness channel is equalized with
//! CLAHE and the result is converted back to RGB. Chroma is left untouched.
//! Builds that link OpenCV run the conversion and CLAHE through `imgproc`;
//! otherwise the portable implementation in this module is used.

mod clahe;
mod color;
#[cfg(feature = "opencv")]
mod cv;

pub use clahe::{Clahe, MAX_TILES};
pub use color::{lab_to_rgb, rgb_to_lab};

use anyhow::Result;
use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::config::ClaheSettings;

#[derive(Clone, Copy, Debug)]
pub struct ClaheEnhancer {
    clahe: Clahe,
}

impl ClaheEnhancer {
    pub fn new(clahe: Clahe) -> Self {
        Self { clahe }
    }

    pub fn from_settings(settings: &ClaheSettings) -> Self {
        Self::new(Clahe::new(
            settings.clip_limit,
            settings.tiles_x,
            settings.tiles_y,
        ))
    }

    pub fn apply(&self, img: &RgbImage) -> Result<RgbImage> {
        #[cfg(feature = "opencv")]
        {
            cv::apply(&self.clahe, img)
        }
        #[cfg(not(feature = "opencv"))]
        {
            Ok(self.apply_portable(img))
        }
    }

    /// Pure-Rust Lab conversion and CLAHE.
    pub fn apply_portable(&self, img: &RgbImage) -> RgbImage {
        let (width, height) = img.dimensions();
        let lab: Vec<[u8; 3]> = img.pixels().map(|p| rgb_to_lab(p.0)).collect();

        let lightness = GrayImage::from_fn(width, height, |x, y| {
            Luma([lab[(y * width + x) as usize][0]])
        });
        let equalized = self.clahe.apply(&lightness);

        RgbImage::from_fn(width, height, |x, y| {
            let [_, a, b] = lab[(y * width + x) as usize];
            let l = equalized.get_pixel(x, y).0[0];
            Rgb(lab_to_rgb([l, a, b]))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_dimensions_and_neutral_colors() {
        let img = RgbImage::from_fn(32, 24, |x, _| {
            let v = 60 + (x * 2) as u8;
            Rgb([v, v, v])
        });
        let enhancer = ClaheEnhancer::new(Clahe::new(15.0, 4, 4));
        for out in [enhancer.apply_portable(&img), enhancer.apply(&img).unwrap()] {
            assert_eq!(out.dimensions(), (32, 24));
            for p in out.pixels() {
                let [r, g, b] = p.0;
                assert!((r as i16 - g as i16).abs() <= 2 && (g as i16 - b as i16).abs() <= 2);
            }
        }
    }

    #[test]
    fn equalizes_lightness_only() {
        // Black/white halves in one tile: L maps through the clipped LUT, chroma stays neutral.
        let img = RgbImage::from_fn(4, 4, |x, _| {
            if x < 2 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let out = ClaheEnhancer::new(Clahe::new(40.0, 1, 1)).apply_portable(&img);
        // clip = 2: bins 0 and 255 keep 2 each, 12 residual counts land on bins 0, 21, .., 231.
        // lut[0] = round(3 * 255 / 16) = 48, lut[255] = 255.
        let dark = out.get_pixel(0, 0).0;
        let light = out.get_pixel(3, 3).0;
        assert_eq!(light, [255, 255, 255]);
        assert_eq!(dark, lab_to_rgb([48, 128, 128]));
    }
}
