//! belt_detect - conveyor belt detection over a video
//!
//! This binary:
//! 1. Loads the detector network and class names
//! 2. Plays the video once, enhancing and running detection on every frame
//! 3. Shows annotated frames in a preview window (ESC stops, Ctrl-C cancels)
//! 4. Logs how many expected belt / belt-corner frames were detected

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use belt_detection::detect::{open_backend, BackendKind};
use belt_detection::preview::open_preview;
use belt_detection::ui::{Ui, UiMode};
use belt_detection::{
    expected_frames, BeltConfig, BeltDetector, BeltReport, ClaheEnhancer, ClassNames, FileConfig,
    FileSource, Session,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "BELT_CONFIG")]
    config: Option<PathBuf>,
    /// Video to process (overrides config).
    #[arg(long)]
    video: Option<String>,
    /// Detector backend: opencv, tract or stub (overrides config).
    #[arg(long)]
    backend: Option<String>,
    /// Minimum class confidence for a detection (overrides config).
    #[arg(long)]
    threshold: Option<f32>,
    /// Run without the preview window.
    #[arg(long)]
    headless: bool,
    /// Skip CLAHE contrast enhancement.
    #[arg(long)]
    no_enhance: bool,
    /// Stage output style.
    #[arg(long, value_enum, default_value_t = UiMode::Auto)]
    ui: UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = Ui::new(args.ui, std::io::stderr().is_terminal());

    let mut cfg = BeltConfig::load_from(args.config.as_deref())?;
    if let Some(video) = args.video {
        cfg.video = video;
    }
    if let Some(backend) = args.backend {
        cfg.model.backend = backend;
    }
    if let Some(threshold) = args.threshold {
        cfg.detector.threshold = threshold;
    }
    if args.headless {
        cfg.preview = false;
    }
    cfg.validate()?;

    let available: Vec<String> = BackendKind::available()
        .into_iter()
        .map(|kind| kind.to_string())
        .collect();
    log::info!(
        "video={} backend={} threshold={} (compiled backends: {})",
        cfg.video,
        cfg.model.backend,
        cfg.detector.threshold,
        available.join(", ")
    );

    let expected = expected_frames(&cfg)?;

    let mut detector = {
        let _stage = ui.stage("load detector");
        let classes = match ClassNames::load(&cfg.model.names) {
            Ok(classes) => classes,
            Err(err) => {
                log::warn!("{err:#}; using numeric class labels");
                ClassNames::default()
            }
        };
        let backend = open_backend(&cfg.model, &cfg.detector)?;
        let mut detector = BeltDetector::new(backend, &cfg.detector, classes);
        detector.warm_up().context("detector warm-up failed")?;
        detector
    };
    log::info!("detector backend {} ready", detector.backend_name());

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            cancel.store(true, Ordering::Relaxed);
        })
        .context("error setting Ctrl-C handler")?;
    }

    let enhancer = ClaheEnhancer::from_settings(&cfg.clahe);
    let summary = {
        let mut source = FileSource::new(FileConfig {
            path: cfg.video.clone(),
        })?;
        let mut preview = open_preview(cfg.preview);
        let mut stage = ui.stage("process video");
        let mut on_frame = |_index: u64| stage.frame_done();
        let mut session = Session {
            detector: &mut detector,
            enhancer: (!args.no_enhance).then_some(&enhancer),
            preview: preview.as_mut(),
            on_frame: Some(&mut on_frame),
        };
        session.run(&mut source, &cancel)?
    };
    log::info!(
        "playback finished ({:?}) after {} frame(s)",
        summary.stop_reason,
        summary.frames_processed
    );

    BeltReport::new(&expected, &summary.detected, summary.total_frames()).log();
    Ok(())
}
