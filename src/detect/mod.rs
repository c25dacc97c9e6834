//! Belt detection with a pretrained single-shot detector.
//!
//! - `blob`: frame -> NCHW network input
//! - `backend` / `backends`: inference engines (OpenCV DNN, tract, stub)
//! - `output`: decoding of raw output rows into boxes
//! - `detector`: the per-frame step that ties them together

mod backend;
mod backends;
mod blob;
mod detector;
mod output;
mod registry;
mod result;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-opencv")]
pub use backends::DarknetBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use blob::{blob_from_image, Blob, BlobParams};
pub use detector::BeltDetector;
pub use output::{decode_detections, OutputTensor};
pub use registry::{open_backend, BackendKind};
pub use result::{BoundingBox, Detection};
