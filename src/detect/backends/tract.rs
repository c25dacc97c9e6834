#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::blob::Blob;
use crate::detect::output::OutputTensor;

/// Tract-based backend for ONNX inference.
///
/// Loads an ONNX export of the detector and runs it on NCHW blobs of a fixed
/// input size. Every graph output is returned.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    width: u32,
    height: u32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
        })
    }

    fn build_input(&self, blob: &Blob) -> Result<Tensor> {
        let expected = [1, 3, self.height as usize, self.width as usize];
        if blob.shape != expected {
            return Err(anyhow!(
                "blob shape {:?} does not match model input {:?}",
                blob.shape,
                expected
            ));
        }
        Tensor::from_shape(&blob.shape, &blob.data).context("failed to build input tensor")
    }
}

fn to_output(value: &Tensor) -> Result<OutputTensor> {
    let view = value
        .to_array_view::<f32>()
        .context("model output tensor was not f32")?;
    let cols = view.shape().last().copied().unwrap_or(0);
    OutputTensor::new(cols, view.iter().copied().collect())
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn forward(&mut self, blob: &Blob) -> Result<Vec<OutputTensor>> {
        let input = self.build_input(blob)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        outputs.iter().map(|value| to_output(value)).collect()
    }

    fn warm_up(&mut self) -> Result<()> {
        let blob = Blob {
            shape: [1, 3, self.height as usize, self.width as usize],
            data: vec![0.0; 3 * self.height as usize * self.width as usize],
        };
        self.forward(&blob).map(|_| ())
    }
}
