//! The capture loop.
//!
//! Runs on a single blocking thread: grab a frame, and once the interval has
//! elapsed since the last attempt, persist it, dispatch it, speak, delete it.
//! Frames grabbed while the interval has not elapsed are dropped.

use shared::{Mode, StatusInfo};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::camera::{CaptureError, CaptureStore, FrameSource};
use crate::control::{ControlEvent, ControlInput};
use crate::dispatch::Dispatcher;

/// What a single loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// A frame was read but the interval had not elapsed.
    Skipped,
    /// A processing attempt ran, successfully or not.
    Processed,
    /// A quit request was received; no frame was read.
    Quit,
}

pub struct Assistant<S: FrameSource> {
    source: S,
    store: CaptureStore,
    dispatcher: Dispatcher,
    inputs: Vec<Box<dyn ControlInput>>,
    mode: Mode,
    interval: Duration,
    last_processed: Option<Instant>,
    frames_processed: u64,
    failures: u64,
    status: watch::Sender<StatusInfo>,
}

impl<S: FrameSource> Assistant<S> {
    pub fn new(
        source: S,
        store: CaptureStore,
        dispatcher: Dispatcher,
        mode: Mode,
        interval: Duration,
        status: watch::Sender<StatusInfo>,
    ) -> Self {
        let assistant = Self {
            source,
            store,
            dispatcher,
            inputs: Vec::new(),
            mode,
            interval,
            last_processed: None,
            frames_processed: 0,
            failures: 0,
            status,
        };
        assistant.publish(true);
        assistant
    }

    pub fn with_input(mut self, input: Box<dyn ControlInput>) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Run until a quit request or a camera read failure.
    pub fn run(&mut self) -> Result<(), CaptureError> {
        info!(
            "Capture loop started in {} mode, interval {:?}",
            self.mode, self.interval
        );

        let result = loop {
            match self.step(Instant::now()) {
                Ok(Tick::Quit) => break Ok(()),
                Ok(_) => {}
                Err(e) => {
                    error!("Camera read failed: {}", e);
                    break Err(e);
                }
            }
        };

        self.publish(false);
        info!(
            "Capture loop stopped after {} frames ({} failed)",
            self.frames_processed, self.failures
        );
        result
    }

    /// One iteration: drain control input, read a frame, process it if due.
    pub fn step(&mut self, now: Instant) -> Result<Tick, CaptureError> {
        if self.poll_inputs() {
            return Ok(Tick::Quit);
        }

        let frame = self.source.grab()?;
        if !self.due(now) {
            return Ok(Tick::Skipped);
        }

        let started = Instant::now();
        let outcome = self
            .store
            .persist(&frame)
            .map_err(anyhow::Error::from)
            .and_then(|stored| self.dispatcher.dispatch(self.mode, stored.path()));

        match outcome {
            Ok(Some(sentence)) => debug!("Spoke {:?}", sentence),
            Ok(None) => debug!("Nothing to say in {} mode", self.mode),
            Err(e) => {
                error!("Processing failed in {} mode: {:#}", self.mode, e);
                self.failures += 1;
            }
        }
        debug!("Frame processed in {:?}", started.elapsed());

        self.last_processed = Some(now);
        self.frames_processed += 1;
        self.publish(true);
        Ok(Tick::Processed)
    }

    /// True when no attempt has run yet or the interval has elapsed.
    pub fn due(&self, now: Instant) -> bool {
        self.last_processed
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval)
    }

    /// Apply every pending event. Returns true when a quit was requested.
    fn poll_inputs(&mut self) -> bool {
        let mut events = Vec::new();
        for input in &mut self.inputs {
            while let Some(event) = input.poll() {
                events.push(event);
            }
        }

        for event in events {
            if self.apply(event) {
                return true;
            }
        }
        false
    }

    fn apply(&mut self, event: ControlEvent) -> bool {
        match event {
            ControlEvent::Quit => {
                info!("Quit requested");
                true
            }
            ControlEvent::SetMode(mode) => {
                info!("Switching to {} mode", mode);
                self.mode = mode;
                self.publish(true);
                if let Err(e) = self.dispatcher.announce_mode(mode) {
                    error!("Failed to announce mode change: {:#}", e);
                }
                false
            }
        }
    }

    fn publish(&self, is_running: bool) {
        self.status.send_replace(StatusInfo {
            is_running,
            mode: self.mode,
            frames_processed: self.frames_processed,
            failures: self.failures,
            interval_ms: self.interval.as_millis() as u64,
        });
    }
}
