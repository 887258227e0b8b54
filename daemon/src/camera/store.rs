use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{CaptureError, Frame};

/// Directory holding the transient per-frame JPEG files.
pub struct CaptureStore {
    directory: PathBuf,
}

impl CaptureStore {
    /// Create the capture directory if it does not exist yet.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        info!("Capture directory ready at {:?}", directory);
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn frame_path(&self, frame: &Frame) -> PathBuf {
        self.directory
            .join(format!("frame_{}.jpg", frame.captured_at.timestamp_millis()))
    }

    /// Write `frame` as a JPEG. The file is removed when the returned handle drops.
    pub fn persist(&self, frame: &Frame) -> Result<StoredFrame, CaptureError> {
        let path = self.frame_path(frame);
        let stored = StoredFrame { path };
        frame.save_jpeg(&stored.path)?;
        debug!("Saved frame to {:?}", stored.path);
        Ok(stored)
    }
}

/// A frame written to disk for the duration of one dispatch.
#[derive(Debug)]
pub struct StoredFrame {
    path: PathBuf,
}

impl StoredFrame {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoredFrame {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {:?}: {}", self.path, e),
        }
    }
}
