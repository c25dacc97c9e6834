//! End-to-end playback over the synthetic source with a scripted detector.

use std::sync::atomic::AtomicBool;

use belt_detection::config::DetectorSettings;
use belt_detection::detect::{OutputTensor, StubBackend};
use belt_detection::enhance::Clahe;
use belt_detection::{
    BeltDetector, BeltReport, BeltVisible, ClaheEnhancer, ClassNames, FileConfig, FileSource,
    Frame, NullPreview, Preview, PreviewAction, Session, StopReason,
};

/// Presses ESC while showing the given frame.
struct EscapeAt(u64);

impl Preview for EscapeAt {
    fn show(&mut self, frame: &Frame) -> anyhow::Result<PreviewAction> {
        Ok(if frame.index == self.0 {
            PreviewAction::Stop
        } else {
            PreviewAction::Continue
        })
    }
}

fn detection_row(belt: f32, corner: f32) -> Vec<f32> {
    vec![0.5, 0.5, 0.2, 0.1, 1.0, belt, corner]
}

fn frame_outputs(rows: Vec<Vec<f32>>) -> Vec<OutputTensor> {
    if rows.is_empty() {
        return Vec::new();
    }
    vec![OutputTensor::from_rows(&rows).expect("rows")]
}

#[test]
fn reports_matches_misses_and_false_detections() {
    // Frames 0..6: belt in 0, 1, 5; corner in 1 (twice) and 2; frame 3 only
    // below threshold; frame 4 nothing.
    let script = vec![
        frame_outputs(vec![detection_row(0.9, 0.0)]),
        frame_outputs(vec![detection_row(0.8, 0.1), detection_row(0.0, 0.7), detection_row(0.1, 0.6)]),
        frame_outputs(vec![detection_row(0.0, 0.4)]),
        frame_outputs(vec![detection_row(0.2, 0.15)]),
        frame_outputs(vec![]),
        frame_outputs(vec![detection_row(0.3, 0.0)]),
    ];
    let mut detector = BeltDetector::new(
        Box::new(StubBackend::scripted(script)),
        &DetectorSettings::default(),
        ClassNames::parse("belt\nbelt_corner\n"),
    );
    let enhancer = ClaheEnhancer::new(Clahe::new(15.0, 10, 10));
    let mut preview = NullPreview;
    let mut frames_seen = Vec::new();
    let mut on_frame = |index: u64| frames_seen.push(index);

    let mut source = FileSource::new(FileConfig {
        path: "stub://conveyor?frames=6".to_string(),
    })
    .expect("synthetic source");
    let summary = Session {
        detector: &mut detector,
        enhancer: Some(&enhancer),
        preview: &mut preview,
        on_frame: Some(&mut on_frame),
    }
    .run(&mut source, &AtomicBool::new(false))
    .expect("session");

    assert_eq!(summary.stop_reason, StopReason::EndOfStream);
    assert_eq!(summary.frames_processed, 6);
    assert_eq!(frames_seen, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(summary.detected.belt_frames, vec![0, 1, 5]);
    assert_eq!(summary.detected.belt_corner_frames, vec![1, 1, 2]);

    let expected = BeltVisible::new(vec![0, 1, 2, 3], vec![1, 3]);
    let report = BeltReport::new(&expected, &summary.detected, summary.total_frames());
    let lines = report.lines();

    assert_eq!(
        lines[0],
        "Total frames 6, successfully detected belt 2 of 4 times, corner belt - 1 of 2"
    );
    assert_eq!(lines[1], "Non detected belt frames: {2, 3}");
    assert_eq!(lines[2], "False detected belt frames: {5}");
    assert_eq!(lines[3], "Non detected belt corner frames: {3}");
    assert_eq!(lines[4], "False detected belt corner frames: {2}");
}

#[test]
fn synthesized_expectations_over_a_quiet_video() {
    let mut detector = BeltDetector::new(
        Box::new(StubBackend::new()),
        &DetectorSettings::default(),
        ClassNames::default(),
    );
    let mut preview = NullPreview;
    let mut source = FileSource::new(FileConfig {
        path: "stub://conveyor?frames=4".to_string(),
    })
    .expect("synthetic source");

    let summary = Session {
        detector: &mut detector,
        enhancer: None,
        preview: &mut preview,
        on_frame: None,
    }
    .run(&mut source, &AtomicBool::new(false))
    .expect("session");

    let report = BeltReport::new(
        &BeltVisible::synthesized(0..125),
        &summary.detected,
        summary.total_frames(),
    );
    assert_eq!(report.total_frames, 4);
    assert!(report.belt.matched.is_empty());
    assert_eq!(report.belt.missed.len(), 125);
    assert_eq!(report.corner.expected, 125);
    assert!(report.corner.false_detected.is_empty());
}

#[test]
fn escape_reports_frames_before_the_stop() {
    let script = vec![
        frame_outputs(vec![detection_row(0.9, 0.0)]),
        frame_outputs(vec![detection_row(0.0, 0.9)]),
        frame_outputs(vec![detection_row(0.9, 0.0)]),
    ];
    let mut detector = BeltDetector::new(
        Box::new(StubBackend::scripted(script)),
        &DetectorSettings::default(),
        ClassNames::default(),
    );
    let mut preview = EscapeAt(1);
    let mut source = FileSource::new(FileConfig {
        path: "stub://conveyor?frames=10".to_string(),
    })
    .expect("synthetic source");

    let summary = Session {
        detector: &mut detector,
        enhancer: None,
        preview: &mut preview,
        on_frame: None,
    }
    .run(&mut source, &AtomicBool::new(false))
    .expect("session");

    assert_eq!(summary.stop_reason, StopReason::UserStop);
    assert_eq!(summary.frames_processed, 2);
    assert_eq!(summary.detected.belt_frames, vec![0]);
    assert_eq!(summary.detected.belt_corner_frames, vec![1]);

    let expected = BeltVisible::new(vec![0, 1], vec![1]);
    let lines = BeltReport::new(&expected, &summary.detected, summary.total_frames()).lines();
    assert_eq!(
        lines[0],
        "Total frames 1, successfully detected belt 1 of 2 times, corner belt - 1 of 1"
    );
    assert_eq!(lines[1], "Non detected belt frames: {1}");
    assert_eq!(lines[2], "False detected belt frames: set()");
    assert_eq!(lines[3], "Non detected belt corner frames: set()");
    assert_eq!(lines[4], "False detected belt corner frames: set()");
}
