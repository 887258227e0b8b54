mod common;

use common::{
    fake_dispatcher, files_in, initial_status, FakeSource, Outcomes, Recorder, ScriptedKeys,
};
use seerd::assistant::{Assistant, Tick};
use seerd::camera::CaptureStore;
use seerd::control::{ChannelInput, ControlEvent};
use shared::{Mode, StatusInfo};
use std::collections::VecDeque;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

const INTERVAL: Duration = Duration::from_secs(2);

struct Harness {
    assistant: Assistant<FakeSource>,
    recorder: Recorder,
    status: watch::Receiver<StatusInfo>,
    dir: tempfile::TempDir,
}

impl Harness {
    fn new(outcomes: Outcomes, source: FakeSource, mode: Mode) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::open(dir.path().join("captures")).unwrap();
        let recorder = Recorder::default();
        let (status_tx, status) = watch::channel(initial_status());

        let assistant = Assistant::new(
            source,
            store,
            fake_dispatcher(outcomes, &recorder),
            mode,
            INTERVAL,
            status_tx,
        );

        Self {
            assistant,
            recorder,
            status,
            dir,
        }
    }

    fn with_outcomes(outcomes: Outcomes) -> Self {
        Self::new(outcomes, FakeSource::endless(), Mode::ObjectDetection)
    }

    fn captures(&self) -> std::path::PathBuf {
        self.dir.path().join("captures")
    }
}

fn assert_removed(path: &Path) {
    assert!(!path.exists(), "{:?} was not deleted", path);
}

#[test]
fn test_frame_file_removed_after_successful_attempt() {
    let mut h = Harness::with_outcomes(Outcomes::default());

    assert_eq!(h.assistant.step(Instant::now()).unwrap(), Tick::Processed);

    let calls = h.recorder.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].existed, "adapter ran on a missing file");
    assert!(calls[0]
        .path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("frame_"));
    assert_removed(&calls[0].path);
    assert!(files_in(&h.captures()).is_empty());
    assert_eq!(h.recorder.spoken(), vec!["I see 1 person"]);
}

#[test]
fn test_frame_file_removed_after_adapter_failure() {
    let mut h = Harness::with_outcomes(Outcomes {
        objects: Err("model exploded".into()),
        ..Outcomes::default()
    });

    let now = Instant::now();
    assert_eq!(h.assistant.step(now).unwrap(), Tick::Processed);

    let calls = h.recorder.calls();
    assert_eq!(calls.len(), 1);
    assert_removed(&calls[0].path);
    assert!(h.recorder.spoken().is_empty());
    assert_eq!(h.assistant.failures(), 1);
    assert_eq!(h.assistant.frames_processed(), 1);
}

#[test]
fn test_failed_attempt_still_advances_timer() {
    let mut h = Harness::with_outcomes(Outcomes {
        objects: Err("model exploded".into()),
        ..Outcomes::default()
    });

    let t0 = Instant::now();
    h.assistant.step(t0).unwrap();

    assert!(!h.assistant.due(t0 + Duration::from_millis(500)));
    assert_eq!(
        h.assistant.step(t0 + Duration::from_millis(500)).unwrap(),
        Tick::Skipped
    );
    assert_eq!(h.recorder.calls().len(), 1);
}

#[test]
fn test_speech_failure_is_logged_and_file_removed() {
    let mut h = Harness::with_outcomes(Outcomes {
        speech_fails: true,
        ..Outcomes::default()
    });

    assert_eq!(h.assistant.step(Instant::now()).unwrap(), Tick::Processed);

    assert_eq!(h.assistant.failures(), 1);
    assert_removed(&h.recorder.calls()[0].path);
}

#[test]
fn test_interval_is_respected() {
    let mut h = Harness::with_outcomes(Outcomes::default());
    let t0 = Instant::now();

    assert_eq!(h.assistant.step(t0).unwrap(), Tick::Processed);
    assert_eq!(
        h.assistant.step(t0 + Duration::from_millis(1999)).unwrap(),
        Tick::Skipped
    );
    assert_eq!(h.assistant.step(t0 + INTERVAL).unwrap(), Tick::Processed);
    assert_eq!(
        h.assistant.step(t0 + INTERVAL + Duration::from_secs(1)).unwrap(),
        Tick::Skipped
    );

    assert_eq!(h.recorder.calls().len(), 2);
    assert_eq!(h.assistant.frames_processed(), 2);
    assert!(files_in(&h.captures()).is_empty());
}

#[test]
fn test_empty_objects_are_not_spoken() {
    let mut h = Harness::with_outcomes(Outcomes {
        objects: Ok(vec![]),
        ..Outcomes::default()
    });

    h.assistant.step(Instant::now()).unwrap();

    assert_eq!(h.recorder.calls().len(), 1);
    assert!(h.recorder.spoken().is_empty());
    assert_eq!(h.assistant.failures(), 0);
}

#[test]
fn test_face_mode_speaks_joined_labels() {
    let mut h = Harness::new(
        Outcomes {
            faces: Ok(vec!["Ada".into(), "Grace".into(), "Unknown person".into()]),
            ..Outcomes::default()
        },
        FakeSource::endless(),
        Mode::FaceRecognition,
    );

    h.assistant.step(Instant::now()).unwrap();

    assert_eq!(h.recorder.calls()[0].mode, Mode::FaceRecognition);
    assert_eq!(
        h.recorder.spoken(),
        vec!["I see Ada, Grace, and Unknown person"]
    );
}

#[test]
fn test_text_mode_reports_missing_text() {
    let mut h = Harness::new(
        Outcomes {
            text: Ok(String::new()),
            ..Outcomes::default()
        },
        FakeSource::endless(),
        Mode::TextRecognition,
    );

    h.assistant.step(Instant::now()).unwrap();

    assert_eq!(h.recorder.spoken(), vec!["No text detected"]);
}

#[test]
fn test_mode_key_switches_adapter_and_announces() {
    let mut h = Harness::with_outcomes(Outcomes::default());
    h.assistant = h
        .assistant
        .with_input(Box::new(ScriptedKeys(VecDeque::from(['2']))));

    h.assistant.step(Instant::now()).unwrap();

    assert_eq!(h.assistant.mode(), Mode::FaceRecognition);
    let calls = h.recorder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].mode, Mode::FaceRecognition);
    assert_eq!(
        h.recorder.spoken(),
        vec!["Recognition mode activated", "I see Ada"]
    );
    assert_eq!(h.status.borrow().mode, Mode::FaceRecognition);
}

#[test]
fn test_invalid_keys_change_nothing() {
    let mut h = Harness::with_outcomes(Outcomes::default());
    let keys = ScriptedKeys(VecDeque::from(['0', '4', '7', 'x']));
    h.assistant = h.assistant.with_input(Box::new(keys));

    h.assistant.step(Instant::now()).unwrap();

    assert_eq!(h.assistant.mode(), Mode::ObjectDetection);
    assert_eq!(h.recorder.spoken(), vec!["I see 1 person"]);
    assert_eq!(h.recorder.calls()[0].mode, Mode::ObjectDetection);
}

#[test]
fn test_selecting_active_mode_is_still_announced() {
    let mut h = Harness::with_outcomes(Outcomes {
        objects: Ok(vec![]),
        ..Outcomes::default()
    });
    h.assistant = h
        .assistant
        .with_input(Box::new(ScriptedKeys(VecDeque::from(['1']))));

    h.assistant.step(Instant::now()).unwrap();

    assert_eq!(h.recorder.spoken(), vec!["Captioning mode activated"]);
}

#[test]
fn test_remote_mode_change_through_channel() {
    let mut h = Harness::with_outcomes(Outcomes::default());
    let (tx, rx) = mpsc::unbounded_channel();
    h.assistant = h.assistant.with_input(Box::new(ChannelInput::new(rx)));

    tx.send(ControlEvent::SetMode(Mode::TextRecognition)).unwrap();
    h.assistant.step(Instant::now()).unwrap();

    assert_eq!(h.recorder.calls()[0].mode, Mode::TextRecognition);
    assert_eq!(
        h.recorder.spoken(),
        vec!["OCR mode activated", "I read: EXIT"]
    );
}

#[test]
fn test_quit_stops_run() {
    let mut h = Harness::with_outcomes(Outcomes::default());
    let (tx, rx) = mpsc::unbounded_channel();
    h.assistant = h.assistant.with_input(Box::new(ChannelInput::new(rx)));

    tx.send(ControlEvent::Quit).unwrap();
    h.assistant.run().unwrap();

    assert!(h.recorder.calls().is_empty());
    assert!(!h.status.borrow().is_running);
}

#[test]
fn test_quit_key_stops_run() {
    let mut h = Harness::with_outcomes(Outcomes::default());
    h.assistant = h
        .assistant
        .with_input(Box::new(ScriptedKeys(VecDeque::from(['q']))));

    assert!(h.assistant.run().is_ok());
    assert!(h.recorder.calls().is_empty());
}

#[test]
fn test_camera_failure_ends_run() {
    let mut h = Harness::new(
        Outcomes::default(),
        FakeSource::failing_after(1),
        Mode::ObjectDetection,
    );

    assert!(h.assistant.run().is_err());

    assert_eq!(h.recorder.calls().len(), 1);
    assert!(files_in(&h.captures()).is_empty());
    assert!(!h.status.borrow().is_running);
}

#[test]
fn test_status_tracks_progress() {
    let mut h = Harness::with_outcomes(Outcomes {
        faces: Err("no model".into()),
        ..Outcomes::default()
    });
    let t0 = Instant::now();

    assert!(h.status.borrow().is_running);
    h.assistant.step(t0).unwrap();
    h.assistant = h
        .assistant
        .with_input(Box::new(ScriptedKeys(VecDeque::from(['2']))));
    h.assistant.step(t0 + INTERVAL).unwrap();

    let status = h.status.borrow().clone();
    assert_eq!(status.mode, Mode::FaceRecognition);
    assert_eq!(status.frames_processed, 2);
    assert_eq!(status.failures, 1);
    assert_eq!(status.interval_ms, 2000);
}
