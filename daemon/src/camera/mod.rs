//! Frame acquisition and the on-disk capture store.

#[cfg(feature = "camera")]
pub mod capture;
pub mod frame;
pub mod store;

#[cfg(feature = "camera")]
pub use capture::Camera;
pub use frame::Frame;
pub use store::{CaptureStore, StoredFrame};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open video source {device:?}")]
    Open { device: String },
    #[error("could not read frame: {0}")]
    Read(String),
    #[error("failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Anything that hands the capture loop one frame at a time.
pub trait FrameSource {
    /// Block until the next frame is available.
    fn grab(&mut self) -> Result<Frame, CaptureError>;
}
