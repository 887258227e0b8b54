pub mod espeak;

pub use espeak::EspeakSpeaker;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech engine '{command}' is not available: {source}")]
    Unavailable {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("speech engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Optional overrides for a single utterance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceParams {
    /// Words per minute.
    pub rate: Option<u32>,
    /// 0.0 to 1.0.
    pub volume: Option<f32>,
    pub voice: Option<String>,
}

/// Synchronous text-to-speech. Returns once playback has finished.
pub trait Speaker {
    fn speak_with(&mut self, text: &str, params: &VoiceParams) -> Result<(), SpeechError>;

    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        self.speak_with(text, &VoiceParams::default())
    }
}
