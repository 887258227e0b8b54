use anyhow::Result;
use shared::Mode;
use std::path::Path;
use tracing::debug;

use crate::speech::Speaker;
use crate::vision::{FaceRecognizer, ObjectRecognizer, TextRecognizer};

pub const NO_TEXT_DETECTED: &str = "No text detected";

/// `"I see a, b"`, or nothing when no objects were found.
pub fn describe_objects(objects: &[String]) -> Option<String> {
    if objects.is_empty() {
        return None;
    }
    Some(format!("I see {}", objects.join(", ")))
}

/// `"I see a"`, `"I see a, and b"`, `"I see a, b, and c"`; nothing when no
/// faces were found.
pub fn describe_faces(faces: &[String]) -> Option<String> {
    match faces {
        [] => None,
        [only] => Some(format!("I see {}", only)),
        [rest @ .., last] => Some(format!("I see {}, and {}", rest.join(", "), last)),
    }
}

pub fn describe_text(text: &str) -> String {
    if text.is_empty() {
        NO_TEXT_DETECTED.to_string()
    } else {
        format!("I read: {}", text)
    }
}

pub fn mode_announcement(mode: Mode) -> String {
    format!("{} mode activated", mode.spoken_name())
}

/// Routes a stored frame to the adapter for the current mode and speaks the
/// result.
pub struct Dispatcher {
    objects: Box<dyn ObjectRecognizer>,
    faces: Box<dyn FaceRecognizer>,
    text: Box<dyn TextRecognizer>,
    speaker: Box<dyn Speaker>,
}

impl Dispatcher {
    pub fn new(
        objects: Box<dyn ObjectRecognizer>,
        faces: Box<dyn FaceRecognizer>,
        text: Box<dyn TextRecognizer>,
        speaker: Box<dyn Speaker>,
    ) -> Self {
        Self {
            objects,
            faces,
            text,
            speaker,
        }
    }

    /// Run exactly one adapter on `image`. Returns the sentence that was
    /// spoken, if any.
    pub fn dispatch(&mut self, mode: Mode, image: &Path) -> Result<Option<String>> {
        let sentence = match mode {
            Mode::ObjectDetection => {
                let objects = self.objects.recognize_objects(image)?;
                debug!("Objects: {:?}", objects);
                describe_objects(&objects)
            }
            Mode::FaceRecognition => {
                let faces = self.faces.recognize_faces(image)?;
                debug!("Faces: {:?}", faces);
                describe_faces(&faces)
            }
            Mode::TextRecognition => {
                let text = self.text.read_text(image)?;
                Some(describe_text(&text))
            }
        };

        if let Some(sentence) = &sentence {
            self.speaker.speak(sentence)?;
        }
        Ok(sentence)
    }

    pub fn announce_mode(&mut self, mode: Mode) -> Result<()> {
        self.speaker.speak(&mode_announcement(mode))?;
        Ok(())
    }
}
