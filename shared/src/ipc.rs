use crate::mode::Mode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

const SOCKET_NAME: &str = "seerd.sock";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Command {
    SetMode(Mode),
    Status,
    Quit,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Response {
    Ok,
    Error(String),
    Status(StatusInfo),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatusInfo {
    pub is_running: bool,
    pub mode: Mode,
    pub frames_processed: u64,
    pub failures: u64,
    pub interval_ms: u64,
}

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection refused: is seerd running?")]
    ConnectionRefused,

    #[error("Connection timeout")]
    Timeout,
}

/// Unix socket the daemon listens on.
/// Uses the XDG runtime directory if available, falls back to /tmp.
pub fn default_socket_path() -> PathBuf {
    match dirs::runtime_dir() {
        Some(runtime_dir) => runtime_dir.join(SOCKET_NAME),
        None => PathBuf::from("/tmp").join(SOCKET_NAME),
    }
}
