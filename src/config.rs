use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::enhance::MAX_TILES;

const DEFAULT_VIDEO: &str = "test.mp4";
const DEFAULT_WEIGHTS: &str = "YOLOFI2.weights";
const DEFAULT_NETWORK_CONFIG: &str = "YOLOFI.cfg";
const DEFAULT_ONNX_MODEL: &str = "YOLOFI2.onnx";
const DEFAULT_OBJ_NAMES: &str = "obj.names";
const DEFAULT_BACKEND: &str = "opencv";
const DEFAULT_THRESHOLD: f32 = 0.2;
const DEFAULT_INPUT_SIZE: u32 = 480;
const DEFAULT_SCALE: f32 = 0.00392;
const DEFAULT_BELT_CLASS: usize = 0;
const DEFAULT_CORNER_CLASS: usize = 1;
const DEFAULT_CLAHE_CLIP: f64 = 15.0;
const DEFAULT_CLAHE_TILES: u32 = 10;
const DEFAULT_EXPECTED_START: u64 = 0;
const DEFAULT_EXPECTED_END: u64 = 125;

#[derive(Debug, Deserialize, Default)]
struct BeltConfigFile {
    video: Option<String>,
    model: Option<ModelConfigFile>,
    detector: Option<DetectorConfigFile>,
    clahe: Option<ClaheConfigFile>,
    expected: Option<ExpectedConfigFile>,
    preview: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    backend: Option<String>,
    weights: Option<PathBuf>,
    config: Option<PathBuf>,
    onnx: Option<PathBuf>,
    names: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    threshold: Option<f32>,
    input_size: Option<u32>,
    scale: Option<f32>,
    mean: Option<[f32; 3]>,
    swap_rb: Option<bool>,
    crop: Option<bool>,
    belt_class: Option<usize>,
    corner_class: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct ClaheConfigFile {
    clip_limit: Option<f64>,
    tiles_x: Option<u32>,
    tiles_y: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ExpectedConfigFile {
    start: Option<u64>,
    end: Option<u64>,
    ground_truth: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct BeltConfig {
    pub video: String,
    pub model: ModelSettings,
    pub detector: DetectorSettings,
    pub clahe: ClaheSettings,
    pub expected: ExpectedSettings,
    pub preview: bool,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Backend name: `opencv`, `tract` or `stub`.
    pub backend: String,
    /// Darknet weights (opencv backend).
    pub weights: PathBuf,
    /// Darknet network config (opencv backend).
    pub config: PathBuf,
    /// ONNX export of the network (tract backend).
    pub onnx: PathBuf,
    pub names: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    pub threshold: f32,
    pub input_size: u32,
    pub scale: f32,
    pub mean: [f32; 3],
    pub swap_rb: bool,
    pub crop: bool,
    pub belt_class: usize,
    pub corner_class: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            input_size: DEFAULT_INPUT_SIZE,
            scale: DEFAULT_SCALE,
            mean: [0.0; 3],
            swap_rb: false,
            crop: false,
            belt_class: DEFAULT_BELT_CLASS,
            corner_class: DEFAULT_CORNER_CLASS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaheSettings {
    pub clip_limit: f64,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

impl Default for ClaheSettings {
    fn default() -> Self {
        Self {
            clip_limit: DEFAULT_CLAHE_CLIP,
            tiles_x: DEFAULT_CLAHE_TILES,
            tiles_y: DEFAULT_CLAHE_TILES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedSettings {
    pub range: Range<u64>,
    /// When set, replaces `range` as the source of expected frames.
    pub ground_truth: Option<PathBuf>,
}

impl BeltConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("BELT_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit file (or defaults), then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: BeltConfigFile) -> Self {
        let model = file.model.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let clahe = file.clahe.unwrap_or_default();
        let expected = file.expected.unwrap_or_default();
        let defaults = DetectorSettings::default();

        Self {
            video: file.video.unwrap_or_else(|| DEFAULT_VIDEO.to_string()),
            model: ModelSettings {
                backend: model
                    .backend
                    .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
                weights: model
                    .weights
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_WEIGHTS)),
                config: model
                    .config
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_NETWORK_CONFIG)),
                onnx: model
                    .onnx
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_ONNX_MODEL)),
                names: model
                    .names
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_OBJ_NAMES)),
            },
            detector: DetectorSettings {
                threshold: detector.threshold.unwrap_or(defaults.threshold),
                input_size: detector.input_size.unwrap_or(defaults.input_size),
                scale: detector.scale.unwrap_or(defaults.scale),
                mean: detector.mean.unwrap_or(defaults.mean),
                swap_rb: detector.swap_rb.unwrap_or(defaults.swap_rb),
                crop: detector.crop.unwrap_or(defaults.crop),
                belt_class: detector.belt_class.unwrap_or(defaults.belt_class),
                corner_class: detector.corner_class.unwrap_or(defaults.corner_class),
            },
            clahe: ClaheSettings {
                clip_limit: clahe.clip_limit.unwrap_or(DEFAULT_CLAHE_CLIP),
                tiles_x: clahe.tiles_x.unwrap_or(DEFAULT_CLAHE_TILES),
                tiles_y: clahe.tiles_y.unwrap_or(DEFAULT_CLAHE_TILES),
            },
            expected: ExpectedSettings {
                range: expected.start.unwrap_or(DEFAULT_EXPECTED_START)
                    ..expected.end.unwrap_or(DEFAULT_EXPECTED_END),
                ground_truth: expected.ground_truth,
            },
            preview: file.preview.unwrap_or(true),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(video) = std::env::var("BELT_VIDEO") {
            if !video.trim().is_empty() {
                self.video = video;
            }
        }
        if let Ok(backend) = std::env::var("BELT_BACKEND") {
            if !backend.trim().is_empty() {
                self.model.backend = backend.trim().to_lowercase();
            }
        }
        if let Ok(threshold) = std::env::var("BELT_THRESHOLD") {
            self.detector.threshold = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("BELT_THRESHOLD must be a number between 0 and 1"))?;
        }
        if let Ok(headless) = std::env::var("BELT_HEADLESS") {
            self.preview = !parse_flag(&headless)
                .ok_or_else(|| anyhow!("BELT_HEADLESS must be a boolean (1/0, true/false)"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.video.trim().is_empty() {
            return Err(anyhow!("video path must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.detector.threshold) {
            return Err(anyhow!(
                "detector threshold must be within [0, 1], got {}",
                self.detector.threshold
            ));
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector input size must be greater than zero"));
        }
        if !(self.detector.scale.is_finite() && self.detector.scale > 0.0) {
            return Err(anyhow!("detector scale must be a positive number"));
        }
        if self.detector.belt_class == self.detector.corner_class {
            return Err(anyhow!(
                "belt and corner classes must differ (both are {})",
                self.detector.belt_class
            ));
        }
        if !(self.clahe.clip_limit.is_finite() && self.clahe.clip_limit > 0.0) {
            return Err(anyhow!("clahe clip limit must be greater than zero"));
        }
        let tiles = 1..=MAX_TILES;
        if !tiles.contains(&self.clahe.tiles_x) || !tiles.contains(&self.clahe.tiles_y) {
            return Err(anyhow!(
                "clahe tile grid must be between 1x1 and {MAX_TILES}x{MAX_TILES}, got {}x{}",
                self.clahe.tiles_x,
                self.clahe.tiles_y
            ));
        }
        if self.expected.range.start > self.expected.range.end {
            return Err(anyhow!(
                "expected frame range {}..{} is inverted",
                self.expected.range.start,
                self.expected.range.end
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<BeltConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let cfg = BeltConfig::from_file(BeltConfigFile::default());
        assert_eq!(cfg.video, "test.mp4");
        assert_eq!(cfg.model.weights, PathBuf::from("YOLOFI2.weights"));
        assert_eq!(cfg.model.config, PathBuf::from("YOLOFI.cfg"));
        assert_eq!(cfg.model.names, PathBuf::from("obj.names"));
        assert_eq!(cfg.detector, DetectorSettings::default());
        assert_eq!(cfg.detector.threshold, 0.2);
        assert_eq!(cfg.detector.input_size, 480);
        assert_eq!(cfg.clahe, ClaheSettings::default());
        assert_eq!(cfg.expected.range, 0..125);
        assert!(cfg.preview);
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_identical_class_ids() {
        let mut cfg = BeltConfig::from_file(BeltConfigFile::default());
        cfg.detector.corner_class = cfg.detector.belt_class;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut cfg = BeltConfig::from_file(BeltConfigFile::default());
        cfg.detector.threshold = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bounds_clahe_tile_grid() {
        let mut cfg = BeltConfig::from_file(BeltConfigFile::default());
        cfg.clahe.tiles_x = MAX_TILES;
        cfg.validate().unwrap();

        cfg.clahe.tiles_x = u32::MAX;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("clahe tile grid"));

        cfg.clahe.tiles_x = 10;
        cfg.clahe.tiles_y = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parses_flags() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
