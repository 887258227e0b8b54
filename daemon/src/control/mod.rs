//! Sources of mode changes and quit requests for the capture loop.
//!
//! Every input is polled without blocking, once per loop iteration.

pub mod keyboard;

pub use keyboard::{terminal_writer, KeyboardInput, TerminalWriter};

use shared::Mode;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    SetMode(Mode),
    Quit,
}

/// Map a typed character to a control event. Anything other than
/// `1`, `2`, `3` or `q` is ignored.
pub fn parse_key(key: char) -> Option<ControlEvent> {
    match key {
        'q' | 'Q' => Some(ControlEvent::Quit),
        c => c
            .to_digit(10)
            .and_then(|d| Mode::try_from(d as u8).ok())
            .map(ControlEvent::SetMode),
    }
}

/// `Press 1: Captioning, 2: Recognition, 3: OCR, q: Quit`
pub fn key_help() -> String {
    let modes: Vec<String> = Mode::ALL
        .iter()
        .map(|mode| format!("{}: {}", mode.number(), mode.spoken_name()))
        .collect();
    format!("Press {}, q: Quit", modes.join(", "))
}

pub trait ControlInput {
    /// Next pending event, if any. Must not block.
    fn poll(&mut self) -> Option<ControlEvent>;
}

/// Open an input that the daemon can run without, e.g. the terminal
/// keyboard when there is no TTY. Failures are logged and skipped.
pub fn open_optional<I, F>(name: &str, open: F) -> Option<Box<dyn ControlInput>>
where
    I: ControlInput + 'static,
    F: FnOnce() -> anyhow::Result<I>,
{
    match open() {
        Ok(input) => {
            info!("{} input enabled", name);
            Some(Box::new(input))
        }
        Err(e) => {
            warn!("{} input unavailable, continuing without it: {}", name, e);
            None
        }
    }
}

/// Events forwarded by the control socket server.
pub struct ChannelInput {
    rx: mpsc::UnboundedReceiver<ControlEvent>,
}

impl ChannelInput {
    pub fn new(rx: mpsc::UnboundedReceiver<ControlEvent>) -> Self {
        Self { rx }
    }
}

impl ControlInput for ChannelInput {
    fn poll(&mut self) -> Option<ControlEvent> {
        self.rx.try_recv().ok()
    }
}
