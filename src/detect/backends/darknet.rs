#![cfg(feature = "backend-opencv")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use opencv::core::{self, Mat, Scalar, Vector};
use opencv::dnn;
use opencv::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::blob::Blob;
use crate::detect::output::OutputTensor;

/// OpenCV DNN backend for Darknet `.weights` + `.cfg` networks.
///
/// All unconnected output layers (the YOLO heads) are forwarded on every call.
pub struct DarknetBackend {
    net: dnn::Net,
    output_layers: Vector<String>,
}

impl DarknetBackend {
    pub fn new(weights: &Path, config: &Path) -> Result<Self> {
        let weights_str = path_str(weights)?;
        let config_str = path_str(config)?;
        let net = dnn::read_net(weights_str, config_str, "").with_context(|| {
            format!(
                "failed to load darknet network {} / {}",
                weights.display(),
                config.display()
            )
        })?;
        if net.empty().context("inspect loaded network")? {
            return Err(anyhow!(
                "darknet network {} / {} is empty",
                weights.display(),
                config.display()
            ));
        }
        let output_layers = net
            .get_unconnected_out_layers_names()
            .context("resolve network output layers")?;
        log::info!(
            "darknet network loaded with {} output layer(s)",
            output_layers.len()
        );
        Ok(Self {
            net,
            output_layers,
        })
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow!("path {} is not valid UTF-8", path.display()))
}

fn blob_to_mat(blob: &Blob) -> Result<Mat> {
    let sizes: Vec<i32> = blob.shape.iter().map(|&dim| dim as i32).collect();
    let mut mat = Mat::new_nd_with_default(&sizes, core::CV_32F, Scalar::all(0.0))
        .context("allocate input blob")?;
    mat.data_typed_mut::<f32>()
        .context("access input blob")?
        .copy_from_slice(&blob.data);
    Ok(mat)
}

impl DetectorBackend for DarknetBackend {
    fn name(&self) -> &'static str {
        "opencv"
    }

    fn forward(&mut self, blob: &Blob) -> Result<Vec<OutputTensor>> {
        let input = blob_to_mat(blob)?;
        self.net
            .set_input(&input, "", 1.0, Scalar::default())
            .context("set network input")?;

        let mut outputs = Vector::<Mat>::new();
        self.net
            .forward(&mut outputs, &self.output_layers)
            .context("darknet forward pass failed")?;

        outputs
            .iter()
            .map(|out| {
                let cols = out.cols().max(0) as usize;
                let data = out
                    .data_typed::<f32>()
                    .context("network output was not a continuous f32 matrix")?
                    .to_vec();
                OutputTensor::new(cols, data)
            })
            .collect()
    }
}
