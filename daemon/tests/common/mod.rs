// Common test helpers for seerd daemon tests
//
// This module provides:
// - Fake frame sources, recognizers and speakers for driving the capture loop
// - User interaction helpers for the ignored hardware tests
// - Test output formatting

#![allow(dead_code)]

use anyhow::Result;
use seerd::camera::{CaptureError, Frame, FrameSource};
use seerd::control::{parse_key, ControlEvent, ControlInput};
use seerd::dispatch::Dispatcher;
use seerd::speech::{Speaker, SpeechError, VoiceParams};
use seerd::vision::{FaceRecognizer, ObjectRecognizer, TextRecognizer};
use shared::{Mode, StatusInfo};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Hands out small grey frames, then fails once `remaining` runs out.
pub struct FakeSource {
    remaining: Option<usize>,
}

impl FakeSource {
    pub fn endless() -> Self {
        Self { remaining: None }
    }

    pub fn failing_after(frames: usize) -> Self {
        Self {
            remaining: Some(frames),
        }
    }
}

impl FrameSource for FakeSource {
    fn grab(&mut self) -> Result<Frame, CaptureError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(CaptureError::Read("camera unplugged".into()));
            }
            *remaining -= 1;
        }
        Ok(Frame::from_bgr(vec![128; 16 * 16 * 3], 16, 16))
    }
}

/// One adapter invocation: which mode ran, on which file, and whether the
/// file existed at that moment.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterCall {
    pub mode: Mode,
    pub path: PathBuf,
    pub existed: bool,
}

#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<AdapterCall>>>,
    spoken: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<AdapterCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    fn record(&self, mode: Mode, path: &Path) {
        self.calls.lock().unwrap().push(AdapterCall {
            mode,
            path: path.to_path_buf(),
            existed: path.exists(),
        });
    }
}

/// What each fake adapter returns. `Err` strings become adapter errors.
#[derive(Clone)]
pub struct Outcomes {
    pub objects: Result<Vec<String>, String>,
    pub faces: Result<Vec<String>, String>,
    pub text: Result<String, String>,
    pub speech_fails: bool,
}

impl Default for Outcomes {
    fn default() -> Self {
        Self {
            objects: Ok(vec!["1 person".to_string()]),
            faces: Ok(vec!["Ada".to_string()]),
            text: Ok("EXIT".to_string()),
            speech_fails: false,
        }
    }
}

struct FakeObjects(Outcomes, Recorder);
struct FakeFaces(Outcomes, Recorder);
struct FakeText(Outcomes, Recorder);
struct FakeSpeaker(Outcomes, Recorder);

impl ObjectRecognizer for FakeObjects {
    fn recognize_objects(&mut self, image: &Path) -> Result<Vec<String>> {
        self.1.record(Mode::ObjectDetection, image);
        self.0.objects.clone().map_err(anyhow::Error::msg)
    }
}

impl FaceRecognizer for FakeFaces {
    fn recognize_faces(&mut self, image: &Path) -> Result<Vec<String>> {
        self.1.record(Mode::FaceRecognition, image);
        self.0.faces.clone().map_err(anyhow::Error::msg)
    }
}

impl TextRecognizer for FakeText {
    fn read_text(&mut self, image: &Path) -> Result<String> {
        self.1.record(Mode::TextRecognition, image);
        self.0.text.clone().map_err(anyhow::Error::msg)
    }
}

impl Speaker for FakeSpeaker {
    fn speak_with(&mut self, text: &str, _params: &VoiceParams) -> Result<(), SpeechError> {
        if self.0.speech_fails {
            return Err(SpeechError::Failed {
                status: "exit status: 1".into(),
                stderr: "no audio device".into(),
            });
        }
        self.1.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub fn fake_dispatcher(outcomes: Outcomes, recorder: &Recorder) -> Dispatcher {
    Dispatcher::new(
        Box::new(FakeObjects(outcomes.clone(), recorder.clone())),
        Box::new(FakeFaces(outcomes.clone(), recorder.clone())),
        Box::new(FakeText(outcomes.clone(), recorder.clone())),
        Box::new(FakeSpeaker(outcomes, recorder.clone())),
    )
}

/// Keys typed at the terminal, delivered one per poll.
pub struct ScriptedKeys(pub VecDeque<char>);

impl ControlInput for ScriptedKeys {
    fn poll(&mut self) -> Option<ControlEvent> {
        while let Some(key) = self.0.pop_front() {
            if let Some(event) = parse_key(key) {
                return Some(event);
            }
        }
        None
    }
}

pub fn initial_status() -> StatusInfo {
    StatusInfo {
        is_running: false,
        mode: Mode::ObjectDetection,
        frames_processed: 0,
        failures: 0,
        interval_ms: 0,
    }
}

/// Files currently in `dir`.
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

/// Ask user to confirm an action
pub fn confirm_action(prompt: &str) -> bool {
    print!(
        "\n[CONFIRM] {}\nPress 'y' to confirm, any other key to skip: ",
        prompt
    );
    io::stdout().flush().unwrap();

    let mut input = String::new();
    io::stdin().read_line(&mut input).unwrap();

    input.trim().to_lowercase() == "y"
}

/// Print a section header
pub fn print_header(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("  {}", title);
    println!("{}", "=".repeat(60));
}

pub fn print_success(message: &str) {
    println!("\n✓ {}", message);
}

pub fn print_error(message: &str) {
    println!("\n✗ {}", message);
}

pub fn print_info(message: &str) {
    println!("\nℹ {}", message);
}
