pub mod assistant;
pub mod camera;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod models;
pub mod server;
pub mod speech;
pub mod vision;

pub use assistant::{Assistant, Tick};
pub use camera::{CaptureStore, Frame, FrameSource, StoredFrame};
pub use control::{ChannelInput, ControlEvent, ControlInput, KeyboardInput};
pub use dispatch::Dispatcher;
pub use server::DaemonServer;
pub use speech::{EspeakSpeaker, Speaker, VoiceParams};
