use anyhow::Result;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat};
use std::io::{Cursor, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

use super::TextRecognizer;
use crate::config::OcrConfig;

/// OCR through the `tesseract` command line engine.
pub struct TesseractReader {
    command: String,
    languages: String,
    max_width: u32,
}

impl TesseractReader {
    /// Fails when the engine cannot be started.
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let output = Command::new(&config.command)
            .arg("--version")
            .output()
            .map_err(|e| anyhow::anyhow!("OCR engine '{}' is not available: {}", config.command, e))?;
        if !output.status.success() {
            anyhow::bail!("OCR engine '{}' exited with {}", config.command, output.status);
        }
        info!("Using OCR engine '{}'", config.command);

        Ok(Self {
            command: config.command.clone(),
            languages: config.languages.join("+"),
            max_width: config.max_width,
        })
    }

    fn recognize_png(&self, png: &[u8]) -> Result<String> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", &self.languages])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to start '{}': {}", self.command, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(png)?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            anyhow::bail!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TextRecognizer for TesseractReader {
    fn read_text(&mut self, image: &Path) -> Result<String> {
        let gray = preprocess(image, self.max_width)?;
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(gray).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let raw = self.recognize_png(&png)?;
        let text = normalize_text(&raw);
        debug!("OCR read {} characters", text.len());
        Ok(text)
    }
}

/// Load `image`, shrink it to at most `max_width` pixels wide keeping the
/// aspect ratio, and convert it to grayscale.
pub fn preprocess(image: &Path, max_width: u32) -> Result<GrayImage> {
    let img = image::open(image)
        .map_err(|e| anyhow::anyhow!("Could not read image at {:?}: {}", image, e))?;

    let img = if max_width > 0 && img.width() > max_width {
        let ratio = max_width as f32 / img.width() as f32;
        let height = ((img.height() as f32 * ratio) as u32).max(1);
        img.resize_exact(max_width, height, FilterType::Triangle)
    } else {
        img
    };

    Ok(img.to_luma8())
}

/// Collapse the engine's line-oriented output into a single line.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
