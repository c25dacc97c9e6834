//! One playback pass over a video: enhance, detect, preview, accumulate.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use crate::belt::BeltDetected;
use crate::detect::BeltDetector;
use crate::enhance::ClaheEnhancer;
use crate::frame::Frame;
use crate::preview::{Preview, PreviewAction};

/// Where frames come from. `None` ends the pass.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

impl FrameSource for crate::ingest::FileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        crate::ingest::FileSource::next_frame(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    /// ESC in the preview window.
    UserStop,
    /// Ctrl-C.
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct SessionSummary {
    pub frames_processed: u64,
    pub detected: BeltDetected,
    pub stop_reason: StopReason,
}

impl SessionSummary {
    /// Frame count for the report. A preview stop breaks out after the current
    /// frame, so only the frames before it are counted; otherwise every
    /// processed frame is.
    pub fn total_frames(&self) -> u64 {
        match self.stop_reason {
            StopReason::UserStop => self.frames_processed.saturating_sub(1),
            StopReason::EndOfStream | StopReason::Cancelled => self.frames_processed,
        }
    }
}

pub struct Session<'a> {
    pub detector: &'a mut BeltDetector,
    pub enhancer: Option<&'a ClaheEnhancer>,
    pub preview: &'a mut dyn Preview,
    /// Called with the frame index after each processed frame.
    pub on_frame: Option<&'a mut dyn FnMut(u64)>,
}

impl Session<'_> {
    /// Process frames until the source ends, the preview asks to stop or
    /// `cancel` is raised. Detections gathered before a stop are kept.
    pub fn run(&mut self, source: &mut dyn FrameSource, cancel: &AtomicBool) -> Result<SessionSummary> {
        let mut detected = BeltDetected::new();
        let mut frames_processed = 0u64;

        let stop_reason = loop {
            if cancel.load(Ordering::Relaxed) {
                log::info!("cancellation requested after {} frame(s)", frames_processed);
                break StopReason::Cancelled;
            }

            let Some(mut frame) = source.next_frame()? else {
                break StopReason::EndOfStream;
            };

            if let Some(enhancer) = self.enhancer {
                let enhanced = enhancer.apply(frame.image())?;
                frame.replace_image(enhanced);
            }

            let detections = self.detector.detect(&mut frame, &mut detected)?;
            frames_processed += 1;
            log::debug!("frame {}: {} detection(s)", frame.index, detections.len());
            if let Some(on_frame) = self.on_frame.as_mut() {
                on_frame(frame.index);
            }

            if self.preview.show(&frame)? == PreviewAction::Stop {
                log::info!("playback stopped from preview at frame {}", frame.index);
                break StopReason::UserStop;
            }
        };

        Ok(SessionSummary {
            frames_processed,
            detected,
            stop_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::ClassNames;
    use crate::config::DetectorSettings;
    use crate::detect::{OutputTensor, StubBackend};
    use crate::preview::NullPreview;
    use image::RgbImage;

    struct VecSource(std::vec::IntoIter<Frame>);

    impl VecSource {
        fn frames(count: u64) -> Self {
            Self(
                (0..count)
                    .map(|i| Frame::new(i, RgbImage::new(8, 8)))
                    .collect::<Vec<_>>()
                    .into_iter(),
            )
        }
    }

    impl FrameSource for VecSource {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            Ok(self.0.next())
        }
    }

    struct StopAt(u64);

    impl Preview for StopAt {
        fn show(&mut self, frame: &Frame) -> Result<PreviewAction> {
            Ok(if frame.index == self.0 {
                PreviewAction::Stop
            } else {
                PreviewAction::Continue
            })
        }
    }

    fn corner_hit() -> Vec<OutputTensor> {
        vec![OutputTensor::from_rows(&[vec![0.5, 0.5, 0.5, 0.5, 1.0, 0.0, 0.9]]).unwrap()]
    }

    fn detector(script: Vec<Vec<OutputTensor>>) -> BeltDetector {
        BeltDetector::new(
            Box::new(StubBackend::scripted(script)),
            &DetectorSettings::default(),
            ClassNames::default(),
        )
    }

    #[test]
    fn runs_until_end_of_stream() {
        let mut detector = detector(vec![vec![], corner_hit(), vec![], corner_hit()]);
        let mut preview = NullPreview;
        let mut session = Session {
            detector: &mut detector,
            enhancer: None,
            preview: &mut preview,
            on_frame: None,
        };

        let summary = session
            .run(&mut VecSource::frames(5), &AtomicBool::new(false))
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::EndOfStream);
        assert_eq!(summary.frames_processed, 5);
        assert_eq!(summary.total_frames(), 5);
        assert_eq!(summary.detected.belt_corner_frames, vec![1, 3]);
        assert!(summary.detected.belt_frames.is_empty());
    }

    #[test]
    fn preview_stop_keeps_partial_results() {
        let mut detector = detector(vec![corner_hit(), corner_hit(), corner_hit()]);
        let mut preview = StopAt(1);
        let mut session = Session {
            detector: &mut detector,
            enhancer: None,
            preview: &mut preview,
            on_frame: None,
        };

        let summary = session
            .run(&mut VecSource::frames(10), &AtomicBool::new(false))
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::UserStop);
        assert_eq!(summary.frames_processed, 2);
        assert_eq!(summary.total_frames(), 1);
        assert_eq!(summary.detected.belt_corner_frames, vec![0, 1]);
    }

    #[test]
    fn cancellation_is_checked_before_each_frame() {
        let mut detector = detector(vec![]);
        let mut preview = NullPreview;
        let mut session = Session {
            detector: &mut detector,
            enhancer: None,
            preview: &mut preview,
            on_frame: None,
        };

        let summary = session
            .run(&mut VecSource::frames(3), &AtomicBool::new(true))
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::Cancelled);
        assert_eq!(summary.frames_processed, 0);
        assert_eq!(summary.total_frames(), 0);
    }
}
