use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The recognition task the assistant is currently running.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    ObjectDetection,
    FaceRecognition,
    TextRecognition,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid mode {0}: expected 1, 2 or 3")]
pub struct InvalidMode(pub u8);

impl Mode {
    pub const ALL: [Mode; 3] = [
        Mode::ObjectDetection,
        Mode::FaceRecognition,
        Mode::TextRecognition,
    ];

    /// Number the user types to select this mode.
    pub fn number(self) -> u8 {
        match self {
            Mode::ObjectDetection => 1,
            Mode::FaceRecognition => 2,
            Mode::TextRecognition => 3,
        }
    }

    /// Short name used when announcing a mode switch.
    pub fn spoken_name(self) -> &'static str {
        match self {
            Mode::ObjectDetection => "Captioning",
            Mode::FaceRecognition => "Recognition",
            Mode::TextRecognition => "OCR",
        }
    }
}

impl TryFrom<u8> for Mode {
    type Error = InvalidMode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Mode::ObjectDetection),
            2 => Ok(Mode::FaceRecognition),
            3 => Ok(Mode::TextRecognition),
            other => Err(InvalidMode(other)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::ObjectDetection => "object detection",
            Mode::FaceRecognition => "face recognition",
            Mode::TextRecognition => "text recognition",
        };
        f.write_str(name)
    }
}
