//! Frame ingestion sources.
//!
//! - Local video files (feature: ingest-file-ffmpeg)
//! - Synthetic `stub://` source (testing, dry runs)
//!
//! Sources hand out frames with consecutive zero-based indices and report end
//! of stream as `Ok(None)`. The decoder handle is owned by the source and
//! released when the source is dropped.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;

pub use file::{FileConfig, FileSource, FileStats};
