use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};

use super::backend::DetectorBackend;
use super::backends::StubBackend;
use crate::config::{DetectorSettings, ModelSettings};

/// Inference backends selectable by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// OpenCV DNN over the Darknet weights/cfg pair.
    Opencv,
    /// Tract over an ONNX export.
    Tract,
    Stub,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Opencv, BackendKind::Tract, BackendKind::Stub];

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Opencv => "opencv",
            BackendKind::Tract => "tract",
            BackendKind::Stub => "stub",
        }
    }

    /// Whether this build carries the backend.
    pub fn is_available(self) -> bool {
        match self {
            BackendKind::Opencv => cfg!(feature = "backend-opencv"),
            BackendKind::Tract => cfg!(feature = "backend-tract"),
            BackendKind::Stub => true,
        }
    }

    pub fn available() -> Vec<BackendKind> {
        Self::ALL
            .into_iter()
            .filter(|kind| kind.is_available())
            .collect()
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "opencv" | "darknet" => Ok(BackendKind::Opencv),
            "tract" | "onnx" => Ok(BackendKind::Tract),
            "stub" => Ok(BackendKind::Stub),
            other => Err(anyhow!(
                "unknown detector backend '{}' (expected one of: opencv, tract, stub)",
                other
            )),
        }
    }
}

/// Load the configured backend.
pub fn open_backend(
    model: &ModelSettings,
    detector: &DetectorSettings,
) -> Result<Box<dyn DetectorBackend>> {
    let kind: BackendKind = model.backend.parse()?;
    match kind {
        BackendKind::Stub => Ok(Box::new(StubBackend::new())),
        BackendKind::Opencv => {
            #[cfg(feature = "backend-opencv")]
            {
                let _ = detector;
                Ok(Box::new(super::backends::DarknetBackend::new(
                    &model.weights,
                    &model.config,
                )?))
            }
            #[cfg(not(feature = "backend-opencv"))]
            {
                let _ = detector;
                Err(anyhow!(
                    "detector backend 'opencv' requires the backend-opencv feature"
                ))
            }
        }
        BackendKind::Tract => {
            #[cfg(feature = "backend-tract")]
            {
                Ok(Box::new(super::backends::TractBackend::new(
                    &model.onnx,
                    detector.input_size,
                    detector.input_size,
                )?))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                let _ = detector;
                Err(anyhow!(
                    "detector backend 'tract' requires the backend-tract feature"
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn model(backend: &str) -> ModelSettings {
        ModelSettings {
            backend: backend.to_string(),
            weights: PathBuf::from("missing.weights"),
            config: PathBuf::from("missing.cfg"),
            onnx: PathBuf::from("missing.onnx"),
            names: PathBuf::from("obj.names"),
        }
    }

    #[test]
    fn parses_backend_names_and_aliases() {
        assert_eq!("OpenCV".parse::<BackendKind>().unwrap(), BackendKind::Opencv);
        assert_eq!("darknet".parse::<BackendKind>().unwrap(), BackendKind::Opencv);
        assert_eq!("onnx".parse::<BackendKind>().unwrap(), BackendKind::Tract);
        assert!("cuda".parse::<BackendKind>().is_err());
    }

    #[test]
    fn stub_is_always_available() {
        assert!(BackendKind::available().contains(&BackendKind::Stub));
        let backend = open_backend(&model("stub"), &DetectorSettings::default()).unwrap();
        assert_eq!(backend.name(), "stub");
    }

    #[test]
    fn missing_model_files_are_errors() {
        assert!(open_backend(&model("tract"), &DetectorSettings::default()).is_err());
        assert!(open_backend(&model("opencv"), &DetectorSettings::default()).is_err());
    }
}
