pub mod ipc;
pub mod mode;

pub use ipc::{default_socket_path, Command, IpcError, Response, StatusInfo};
pub use mode::{InvalidMode, Mode};
