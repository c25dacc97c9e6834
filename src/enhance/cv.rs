//! CLAHE through OpenCV `imgproc`, used whenever the crate links OpenCV.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use opencv::core::{self, Mat, Scalar, Size, Vector};
use opencv::imgproc;
use opencv::prelude::*;

use super::Clahe;

fn to_mat(img: &RgbImage) -> Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        img.height() as i32,
        img.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )
    .context("allocate enhancement frame")?;
    mat.data_bytes_mut()
        .context("access enhancement frame")?
        .copy_from_slice(img.as_raw());
    Ok(mat)
}

pub fn apply(clahe: &Clahe, img: &RgbImage) -> Result<RgbImage> {
    let rgb = to_mat(img)?;
    let mut lab = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut lab, imgproc::COLOR_RGB2Lab).context("convert frame to Lab")?;

    let mut channels = Vector::<Mat>::new();
    core::split(&lab, &mut channels).context("split Lab channels")?;
    let lightness = channels.get(0).context("read lightness channel")?;

    let (tiles_x, tiles_y) = clahe.tile_grid();
    let mut cv_clahe =
        imgproc::create_clahe(clahe.clip_limit(), Size::new(tiles_x as i32, tiles_y as i32))
            .context("create CLAHE")?;
    let mut equalized = Mat::default();
    cv_clahe
        .apply(&lightness, &mut equalized)
        .context("equalize lightness")?;
    channels.set(0, equalized).context("replace lightness channel")?;

    let mut merged = Mat::default();
    core::merge(&channels, &mut merged).context("merge Lab channels")?;
    let mut out = Mat::default();
    imgproc::cvt_color_def(&merged, &mut out, imgproc::COLOR_Lab2RGB).context("convert frame to RGB")?;

    let data = out.data_bytes().context("read enhanced frame")?.to_vec();
    RgbImage::from_raw(img.width(), img.height(), data)
        .ok_or_else(|| anyhow!("enhanced frame has unexpected size"))
}
