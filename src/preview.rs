//! Live preview of annotated frames.

use anyhow::Result;

use crate::frame::Frame;

/// Key code that stops playback from the preview window.
pub const ESCAPE_KEY: i32 = 27;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewAction {
    Continue,
    Stop,
}

/// Something that can display frames as they are processed.
pub trait Preview {
    fn show(&mut self, frame: &Frame) -> Result<PreviewAction>;
}

/// Headless preview: shows nothing, never stops playback.
#[derive(Debug, Default)]
pub struct NullPreview;

impl Preview for NullPreview {
    fn show(&mut self, _frame: &Frame) -> Result<PreviewAction> {
        Ok(PreviewAction::Continue)
    }
}

pub fn action_for_key(key: i32) -> PreviewAction {
    if key == ESCAPE_KEY {
        PreviewAction::Stop
    } else {
        PreviewAction::Continue
    }
}

/// Pick a window preview when requested and compiled in, otherwise headless.
pub fn open_preview(enabled: bool) -> Box<dyn Preview> {
    if !enabled {
        return Box::new(NullPreview);
    }
    #[cfg(feature = "preview-opencv")]
    {
        match window::WindowPreview::open(window::WINDOW_NAME) {
            Ok(preview) => return Box::new(preview),
            Err(err) => log::warn!("preview window unavailable ({err:#}), running headless"),
        }
    }
    #[cfg(not(feature = "preview-opencv"))]
    log::warn!("preview requested but this build lacks the preview-opencv feature, running headless");
    Box::new(NullPreview)
}

#[cfg(feature = "preview-opencv")]
pub mod window {
    use anyhow::{Context, Result};
    use opencv::core::{self, Mat, Scalar};
    use opencv::highgui;
    use opencv::imgproc;
    use opencv::prelude::*;

    use super::{action_for_key, Preview, PreviewAction};
    use crate::frame::Frame;

    pub const WINDOW_NAME: &str = "Image";

    /// OpenCV HighGUI window; ESC stops playback. All windows are destroyed on drop.
    pub struct WindowPreview {
        name: String,
    }

    impl WindowPreview {
        pub fn open(name: &str) -> Result<Self> {
            highgui::named_window(name, highgui::WINDOW_AUTOSIZE)
                .with_context(|| format!("open preview window '{name}'"))?;
            Ok(Self {
                name: name.to_string(),
            })
        }
    }

    fn to_bgr_mat(frame: &Frame) -> Result<Mat> {
        let mut rgb = Mat::new_rows_cols_with_default(
            frame.height() as i32,
            frame.width() as i32,
            core::CV_8UC3,
            Scalar::all(0.0),
        )
        .context("allocate preview frame")?;
        rgb.data_bytes_mut()
            .context("access preview frame")?
            .copy_from_slice(frame.image().as_raw());
        let mut bgr = Mat::default();
        imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)
            .context("convert preview frame to BGR")?;
        Ok(bgr)
    }

    impl Preview for WindowPreview {
        fn show(&mut self, frame: &Frame) -> Result<PreviewAction> {
            let bgr = to_bgr_mat(frame)?;
            highgui::imshow(&self.name, &bgr).context("show preview frame")?;
            let key = highgui::wait_key(1).context("poll preview keys")?;
            Ok(action_for_key(key))
        }
    }

    impl Drop for WindowPreview {
        fn drop(&mut self) {
            if let Err(err) = highgui::destroy_all_windows() {
                log::warn!("failed to close preview windows: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn escape_stops_other_keys_continue() {
        assert_eq!(action_for_key(27), PreviewAction::Stop);
        assert_eq!(action_for_key(-1), PreviewAction::Continue);
        assert_eq!(action_for_key(113), PreviewAction::Continue);
    }

    #[test]
    fn disabled_preview_never_stops() {
        let mut preview = open_preview(false);
        let frame = Frame::new(0, RgbImage::new(2, 2));
        assert_eq!(preview.show(&frame).unwrap(), PreviewAction::Continue);
    }
}
