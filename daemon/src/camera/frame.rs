use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbImage};
use std::path::Path;

use super::CaptureError;

/// Raw BGR8 frame captured from the camera.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn from_bgr(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            captured_at: Utc::now(),
        }
    }

    /// Reorder the BGR buffer into an RGB image.
    pub fn to_rgb_image(&self) -> Result<RgbImage, CaptureError> {
        let expected = (self.width as usize) * (self.height as usize) * 3;
        if self.data.len() != expected {
            return Err(CaptureError::Read(format!(
                "unexpected frame buffer size: got {} bytes, expected {}",
                self.data.len(),
                expected
            )));
        }

        let rgb: Vec<u8> = self
            .data
            .chunks_exact(3)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect();

        RgbImage::from_raw(self.width, self.height, rgb)
            .ok_or_else(|| CaptureError::Read("frame buffer does not fit dimensions".into()))
    }

    pub fn save_jpeg(&self, path: &Path) -> Result<(), CaptureError> {
        let image = self.to_rgb_image()?;
        image.save_with_format(path, ImageFormat::Jpeg)?;
        Ok(())
    }
}
