//! Local video file source.
//!
//! `FileSource` yields decoded RGB frames from a local video file with
//! consecutive zero-based indices. End of stream is `Ok(None)`, never an error.
//!
//! Paths of the form `stub://name[?frames=N]` produce a synthetic conveyor
//! scene for tests and dry runs.

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use crate::frame::Frame;

const SYNTHETIC_WIDTH: u32 = 640;
const SYNTHETIC_HEIGHT: u32 = 480;
const SYNTHETIC_DEFAULT_FRAMES: u64 = 150;

/// Configuration for a local file source.
#[derive(Clone, Debug, Default)]
pub struct FileConfig {
    /// Local file path (e.g., "test.mp4").
    pub path: String,
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        if config.path.starts_with("stub://") {
            Ok(Self {
                backend: FileBackend::Synthetic(SyntheticFileSource::new(config)?),
            })
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                Ok(Self {
                    backend: FileBackend::Ffmpeg(FfmpegFileSource::new(config)?),
                })
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                Err(anyhow!(
                    "file ingestion requires the ingest-file-ffmpeg feature"
                ))
            }
        }
    }

    /// Decode the next frame, or `None` once the video is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> FileStats {
        match &self.backend {
            FileBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

impl Drop for FileSource {
    fn drop(&mut self) {
        let stats = self.stats();
        log::info!(
            "FileSource: released {} after {} frame(s)",
            stats.path,
            stats.frames_captured
        );
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileStats {
    pub frames_captured: u64,
    pub path: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticFileSource {
    config: FileConfig,
    total_frames: u64,
    frame_count: u64,
}

impl SyntheticFileSource {
    fn new(config: FileConfig) -> Result<Self> {
        let total_frames = parse_synthetic_frames(&config.path)?;
        log::info!(
            "FileSource: opened {} (synthetic, {} frames)",
            config.path,
            total_frames
        );
        Ok(Self {
            config,
            total_frames,
            frame_count: 0,
        })
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.frame_count >= self.total_frames {
            return Ok(None);
        }
        let index = self.frame_count;
        self.frame_count += 1;
        Ok(Some(Frame::new(index, synthetic_scene(index))))
    }

    fn stats(&self) -> FileStats {
        FileStats {
            frames_captured: self.frame_count,
            path: self.config.path.clone(),
        }
    }
}

/// Dim background with a brighter belt band that drifts one pixel per frame.
fn synthetic_scene(index: u64) -> RgbImage {
    let offset = (index % SYNTHETIC_WIDTH as u64) as u32;
    RgbImage::from_fn(SYNTHETIC_WIDTH, SYNTHETIC_HEIGHT, |x, y| {
        let on_belt = (200..280).contains(&y);
        let stripe = ((x + offset) / 16) % 2 == 0;
        match (on_belt, stripe) {
            (true, true) => Rgb([120, 118, 110]),
            (true, false) => Rgb([100, 98, 92]),
            (false, _) => Rgb([40 + (y / 16) as u8, 42, 45]),
        }
    })
}

fn parse_synthetic_frames(path: &str) -> Result<u64> {
    let Some((_, query)) = path.split_once('?') else {
        return Ok(SYNTHETIC_DEFAULT_FRAMES);
    };
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("frames=") {
            return value
                .parse()
                .map_err(|_| anyhow!("invalid synthetic frame count '{}' in {}", value, path));
        }
    }
    Ok(SYNTHETIC_DEFAULT_FRAMES)
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}
