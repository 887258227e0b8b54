//! Recognition adapters.
//!
//! Each adapter takes the path of a JPEG written by the capture store and
//! returns plain data. The pretrained models behind them are external.

pub mod faces;
pub mod objects;
pub mod text;

pub use faces::{FaceGallery, FaceMatch, SeetaFaceRecognizer};
#[cfg(feature = "yolo")]
pub use objects::YoloDetector;
pub use text::TesseractReader;

use anyhow::Result;
use std::path::Path;

use crate::config::ObjectsConfig;

pub trait ObjectRecognizer {
    /// Describe the objects in the image, e.g. `["2 persons", "1 chair"]`.
    fn recognize_objects(&mut self, image: &Path) -> Result<Vec<String>>;
}

pub trait FaceRecognizer {
    /// One label per detected face.
    fn recognize_faces(&mut self, image: &Path) -> Result<Vec<String>>;
}

pub trait TextRecognizer {
    /// All text found in the image on a single line; empty when there is none.
    fn read_text(&mut self, image: &Path) -> Result<String>;
}

/// Load the object detector this build was compiled with.
#[cfg(feature = "yolo")]
pub fn load_object_recognizer(config: &ObjectsConfig) -> Result<Box<dyn ObjectRecognizer>> {
    Ok(Box::new(YoloDetector::load(config)?))
}

#[cfg(not(feature = "yolo"))]
pub fn load_object_recognizer(config: &ObjectsConfig) -> Result<Box<dyn ObjectRecognizer>> {
    anyhow::bail!(
        "cannot load {:?}: seerd was built without the `yolo` feature",
        config.model_path
    )
}
