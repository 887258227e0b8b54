use shared::ipc::{Command, Response, StatusInfo};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::control::ControlEvent;

const LOOP_GONE: &str = "capture loop is not running";

/// Unix socket front end for the capture loop. Never touches loop state
/// directly: commands go over a channel, status comes back over a watch.
pub struct DaemonServer {
    socket_path: PathBuf,
    controls: mpsc::UnboundedSender<ControlEvent>,
    status: watch::Receiver<StatusInfo>,
    io_timeout: Duration,
}

impl DaemonServer {
    pub fn new(
        socket_path: PathBuf,
        controls: mpsc::UnboundedSender<ControlEvent>,
        status: watch::Receiver<StatusInfo>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            socket_path,
            controls,
            status,
            io_timeout,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        info!("Starting socket server at {}", self.socket_path.display());
        let listener = UnixListener::bind(&self.socket_path)?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("Connection accepted");
                    let controls = self.controls.clone();
                    let status = self.status.clone();
                    let io_timeout = self.io_timeout;
                    tokio::spawn(async move {
                        if let Err(e) =
                            Self::handle_connection(stream, controls, status, io_timeout).await
                        {
                            error!("Error handling connection: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }

    async fn handle_connection(
        mut stream: UnixStream,
        controls: mpsc::UnboundedSender<ControlEvent>,
        status: watch::Receiver<StatusInfo>,
        io_timeout: Duration,
    ) -> anyhow::Result<()> {
        let mut buffer = vec![0u8; 1024];
        let n = timeout(io_timeout, stream.read(&mut buffer))
            .await
            .map_err(|_| anyhow::anyhow!("Timed out reading command"))??;
        if n == 0 {
            return Ok(());
        }
        buffer.truncate(n);

        let response = match serde_json::from_slice::<Command>(&buffer) {
            Ok(command) => {
                info!("Received command: {:?}", command);
                Self::handle_command(command, &controls, &status)
            }
            Err(e) => Response::Error(format!("invalid command: {}", e)),
        };

        let response_json = serde_json::to_vec(&response)?;
        timeout(io_timeout, stream.write_all(&response_json))
            .await
            .map_err(|_| anyhow::anyhow!("Timed out writing response"))??;
        debug!("Sent response: {:?}", response);

        Ok(())
    }

    fn handle_command(
        command: Command,
        controls: &mpsc::UnboundedSender<ControlEvent>,
        status: &watch::Receiver<StatusInfo>,
    ) -> Response {
        let event = match command {
            Command::Status => return Response::Status(status.borrow().clone()),
            Command::SetMode(mode) => ControlEvent::SetMode(mode),
            Command::Quit => ControlEvent::Quit,
        };

        // The receiver lives on the capture thread, so a failed send means
        // the loop has exited.
        if controls.send(event).is_err() {
            return Response::Error(LOOP_GONE.to_string());
        }
        Response::Ok
    }
}

impl Drop for DaemonServer {
    fn drop(&mut self) {
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}
