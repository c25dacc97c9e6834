use anyhow::Result;

use super::blob::Blob;
use super::output::OutputTensor;

/// Inference engine behind the belt detector.
///
/// A backend owns a loaded network and turns one input blob into the raw
/// outputs of every unconnected output layer. Decoding the rows is not the
/// backend's concern.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run the network on a single NCHW blob.
    fn forward(&mut self, blob: &Blob) -> Result<Vec<OutputTensor>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
