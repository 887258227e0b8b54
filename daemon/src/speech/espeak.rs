use std::process::Command;
use tracing::info;

use super::{Speaker, SpeechError, VoiceParams};
use crate::config::SpeechConfig;

/// Speaks through the `espeak-ng` command line synthesizer.
pub struct EspeakSpeaker {
    command: String,
    defaults: VoiceParams,
}

impl EspeakSpeaker {
    /// Fails when the synthesizer cannot be started.
    pub fn new(config: &SpeechConfig) -> Result<Self, SpeechError> {
        let output = Command::new(&config.command)
            .arg("--version")
            .output()
            .map_err(|source| SpeechError::Unavailable {
                command: config.command.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(SpeechError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        info!("Using speech engine '{}'", config.command);

        Ok(Self {
            command: config.command.clone(),
            defaults: VoiceParams {
                rate: Some(config.rate),
                volume: Some(config.volume),
                voice: config.voice.clone(),
            },
        })
    }

    /// Command line arguments for `text`, with `params` taking precedence
    /// over the configured defaults.
    pub fn args(&self, text: &str, params: &VoiceParams) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(rate) = params.rate.or(self.defaults.rate) {
            args.push("-s".to_string());
            args.push(rate.to_string());
        }
        if let Some(volume) = params.volume.or(self.defaults.volume) {
            args.push("-a".to_string());
            args.push(amplitude(volume).to_string());
        }
        if let Some(voice) = params.voice.as_ref().or(self.defaults.voice.as_ref()) {
            args.push("-v".to_string());
            args.push(voice.clone());
        }

        args.push("--".to_string());
        args.push(text.to_string());
        args
    }
}

/// espeak-ng amplitude for a 0.0..=1.0 volume.
fn amplitude(volume: f32) -> u32 {
    (volume.clamp(0.0, 1.0) * 100.0).round() as u32
}

impl Speaker for EspeakSpeaker {
    fn speak_with(&mut self, text: &str, params: &VoiceParams) -> Result<(), SpeechError> {
        info!("Speaking: {}", text);

        let output = Command::new(&self.command)
            .args(self.args(text, params))
            .output()
            .map_err(|source| SpeechError::Unavailable {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SpeechError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
