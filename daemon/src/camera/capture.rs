//! OpenCV-backed camera capture.

use opencv::{
    core::{MatTraitConstManual, Size},
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::{debug, info, warn};

use super::{CaptureError, Frame, FrameSource};
use crate::config::CameraConfig;

/// The single capture device, opened once at startup.
pub struct Camera {
    capture: VideoCapture,
    device: String,
    frame: Mat,
}

impl Camera {
    pub fn open(config: &CameraConfig) -> Result<Self, CaptureError> {
        let mut capture = open_video_capture(&config.device)?;
        configure_camera(&mut capture, config.width, config.height);
        info!("Camera {} opened", config.device);

        Ok(Self {
            capture,
            device: config.device.clone(),
            frame: Mat::default(),
        })
    }
}

impl FrameSource for Camera {
    fn grab(&mut self) -> Result<Frame, CaptureError> {
        let ok = self
            .capture
            .read(&mut self.frame)
            .map_err(|e| CaptureError::Read(e.to_string()))?;
        if !ok {
            return Err(CaptureError::Read(format!(
                "camera {} returned no frame",
                self.device
            )));
        }

        let size: Size = self
            .frame
            .size()
            .map_err(|e| CaptureError::Read(e.to_string()))?;
        let (width, height) = (size.width, size.height);
        if width <= 0 || height <= 0 {
            return Err(CaptureError::Read("empty frame".into()));
        }

        let data = self
            .frame
            .data_bytes()
            .map_err(|e| CaptureError::Read(e.to_string()))?
            .to_vec();

        Ok(Frame::from_bgr(data, width as u32, height as u32))
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            warn!("Failed to release camera {}: {}", self.device, e);
        } else {
            info!("Camera {} released", self.device);
        }
    }
}

/// Parse a `/dev/videoX` style device string and return the zero-based index if present.
pub(crate) fn parse_device_index(device: &str) -> Option<i32> {
    if let Ok(index) = device.parse::<i32>() {
        return Some(index);
    }
    let stripped = device.strip_prefix("/dev/video")?;
    if !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit()) {
        return stripped.parse::<i32>().ok();
    }
    None
}

fn open_video_capture(device: &str) -> Result<VideoCapture, CaptureError> {
    if let Some(index) = parse_device_index(device) {
        match VideoCapture::new(index, videoio::CAP_ANY) {
            Ok(cap) if cap.is_opened().unwrap_or(false) => return Ok(cap),
            Ok(_) => debug!("Device #{} did not open", index),
            Err(err) => warn!("Failed to open device #{}: {}", index, err),
        }
    } else {
        match VideoCapture::from_file(device, videoio::CAP_ANY) {
            Ok(cap) if cap.is_opened().unwrap_or(false) => return Ok(cap),
            Ok(_) => debug!("{} did not open", device),
            Err(err) => warn!("Failed to open {}: {}", device, err),
        }
    }

    Err(CaptureError::Open {
        device: device.to_string(),
    })
}

fn configure_camera(cap: &mut VideoCapture, width: u32, height: u32) {
    for (name, prop, value) in [
        ("width", videoio::CAP_PROP_FRAME_WIDTH, width),
        ("height", videoio::CAP_PROP_FRAME_HEIGHT, height),
    ] {
        applied(name, value, cap.set(prop, value as f64));
    }
}

/// Log a frame size request the backend did not honour. Capture goes on at
/// whatever size the device delivers.
fn applied(name: &str, value: u32, result: opencv::Result<bool>) -> bool {
    match result {
        Ok(true) => true,
        Ok(false) => {
            warn!("Camera ignored requested frame {} {}", name, value);
            false
        }
        Err(e) => {
            warn!("Failed to set frame {} to {}: {}", name, value, e);
            false
        }
    }
}
