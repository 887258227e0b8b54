use shared::ipc::{Command, IpcError, Response};
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::{timeout, Duration};
use tracing::warn;

/// Timeout for each socket operation (connect, write, read).
const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn new() -> Self {
        Self::with_socket_path(shared::default_socket_path())
    }

    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    pub async fn send_command(&self, cmd: Command) -> Result<Response, IpcError> {
        let mut stream = match timeout(SOCKET_TIMEOUT, UnixStream::connect(&self.socket_path)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused
                ) =>
            {
                return Err(IpcError::ConnectionRefused);
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                warn!(
                    "Connection timeout: failed to connect to daemon at {} within {:?}",
                    self.socket_path.display(),
                    SOCKET_TIMEOUT
                );
                return Err(IpcError::Timeout);
            }
        };

        let command_json = serde_json::to_vec(&cmd)?;

        match timeout(SOCKET_TIMEOUT, stream.write_all(&command_json)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Write timeout: failed to send command within {:?}", SOCKET_TIMEOUT);
                return Err(IpcError::Timeout);
            }
        }

        let mut buffer = vec![0u8; 1024];
        let n = match timeout(SOCKET_TIMEOUT, stream.read(&mut buffer)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                warn!("Read timeout: no response from daemon within {:?}", SOCKET_TIMEOUT);
                return Err(IpcError::Timeout);
            }
        };
        buffer.truncate(n);

        Ok(serde_json::from_slice(&buffer)?)
    }
}
