use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, is_raw_mode_enabled};
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, warn};

use super::{parse_key, ControlEvent, ControlInput};

/// Single-key terminal input. Raw mode is held for the lifetime of the value.
pub struct KeyboardInput {
    _private: (),
}

impl KeyboardInput {
    pub fn new() -> Result<Self> {
        enable_raw_mode()
            .map_err(|e| anyhow::anyhow!("Failed to enable terminal raw mode: {}", e))?;
        debug!("Keyboard input enabled");
        Ok(Self { _private: () })
    }
}

impl ControlInput for KeyboardInput {
    fn poll(&mut self) -> Option<ControlEvent> {
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => {
                    warn!("Keyboard poll failed: {}", e);
                    return None;
                }
            }

            let key = match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Keyboard read failed: {}", e);
                    return None;
                }
            };

            // Raw mode swallows the terminal's own Ctrl-C handling.
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                return Some(ControlEvent::Quit);
            }
            if let KeyCode::Char(c) = key.code {
                if let Some(event) = parse_key(c) {
                    return Some(event);
                }
            }
        }
    }
}

impl Drop for KeyboardInput {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

/// Log output for the terminal the keys are read from.
///
/// Raw mode turns off output post-processing, so a bare `\n` no longer
/// returns the cursor to column 0. While raw mode is on, every `\n` is
/// written as `\r\n`.
pub struct TerminalWriter<W: Write> {
    inner: W,
    raw_mode: bool,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(inner: W, raw_mode: bool) -> Self {
        Self { inner, raw_mode }
    }
}

/// `MakeWriter` for `tracing_subscriber::fmt().with_writer(..)`.
pub fn terminal_writer() -> TerminalWriter<io::Stdout> {
    TerminalWriter::new(io::stdout(), is_raw_mode_enabled().unwrap_or(false))
}

impl<W: Write> Write for TerminalWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.raw_mode {
            return self.inner.write(buf);
        }
        self.inner.write_all(&expand_newlines(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn expand_newlines(buf: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(buf.len() + 8);
    let mut prev = 0u8;
    for &byte in buf {
        if byte == b'\n' && prev != b'\r' {
            out.push(b'\r');
        }
        out.push(byte);
        prev = byte;
    }
    out
}
