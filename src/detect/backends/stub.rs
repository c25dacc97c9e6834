use std::collections::VecDeque;

use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::blob::Blob;
use crate::detect::output::OutputTensor;

/// Stub backend for testing and dry runs.
///
/// Replays scripted outputs, one entry per `forward` call, then produces no
/// outputs at all.
#[derive(Debug, Default)]
pub struct StubBackend {
    script: VecDeque<Vec<OutputTensor>>,
    calls: u64,
    last_shape: Option<[usize; 4]>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Vec<OutputTensor>>,
    {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Number of forward passes so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn last_shape(&self) -> Option<[usize; 4]> {
        self.last_shape
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn forward(&mut self, blob: &Blob) -> Result<Vec<OutputTensor>> {
        self.calls += 1;
        self.last_shape = Some(blob.shape);
        Ok(self.script.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob() -> Blob {
        Blob {
            shape: [1, 3, 2, 2],
            data: vec![0.0; 12],
        }
    }

    #[test]
    fn stub_replays_script_then_goes_quiet() {
        let output = OutputTensor::new(6, vec![0.5; 6]).unwrap();
        let mut backend = StubBackend::scripted(vec![vec![output.clone()], vec![]]);

        assert_eq!(backend.forward(&blob()).unwrap(), vec![output]);
        assert!(backend.forward(&blob()).unwrap().is_empty());
        assert!(backend.forward(&blob()).unwrap().is_empty());
        assert_eq!(backend.calls(), 3);
        assert_eq!(backend.last_shape(), Some([1, 3, 2, 2]));
    }
}
