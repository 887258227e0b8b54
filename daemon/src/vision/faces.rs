//! Face recognition against a gallery of known faces.
//!
//! Faces are found with the SeetaFace frontal detector (`rustface`). Each face
//! is embedded as a normalized 32x32 luminance patch and matched to the
//! nearest gallery entry.

use anyhow::Result;
use image::imageops::FilterType;
use image::GrayImage;
use rustface::{Detector, ImageData};
use std::path::Path;
use tracing::{debug, info, warn};

use super::FaceRecognizer;
use crate::config::FacesConfig;

pub const EMBEDDING_SIDE: u32 = 32;
pub const UNKNOWN_PERSON: &str = "Unknown person";

/// Embed the face inside `(x, y, width, height)` of `gray`.
///
/// The box is clamped to the image. The result is zero-mean and unit-norm, so
/// distances between embeddings fall in `[0, 2]`.
pub fn embed_face(gray: &GrayImage, x: i32, y: i32, width: u32, height: u32) -> Vec<f32> {
    let x0 = (x.max(0) as u32).min(gray.width().saturating_sub(1));
    let y0 = (y.max(0) as u32).min(gray.height().saturating_sub(1));
    let x1 = x0.saturating_add(width).min(gray.width());
    let y1 = y0.saturating_add(height).min(gray.height());
    let w = x1.saturating_sub(x0).max(1);
    let h = y1.saturating_sub(y0).max(1);

    let crop = image::imageops::crop_imm(gray, x0, y0, w, h).to_image();
    let patch = image::imageops::resize(&crop, EMBEDDING_SIDE, EMBEDDING_SIDE, FilterType::Triangle);

    let mut values: Vec<f32> = patch.into_raw().into_iter().map(|p| p as f32 / 255.0).collect();
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    values.iter_mut().for_each(|v| *v -= mean);

    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        values.iter_mut().for_each(|v| *v /= norm);
    }
    values
}

pub fn distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[derive(Debug, Clone, PartialEq)]
pub enum FaceMatch {
    Confident(String),
    Unsure(String),
    Unknown,
}

impl FaceMatch {
    pub fn label(&self) -> String {
        match self {
            FaceMatch::Confident(name) => name.clone(),
            FaceMatch::Unsure(name) => format!("I'm not sure, but this might be {}", name),
            FaceMatch::Unknown => UNKNOWN_PERSON.to_string(),
        }
    }
}

/// Known faces, loaded once at startup.
pub struct FaceGallery {
    entries: Vec<(String, Vec<f32>)>,
    confident_distance: f32,
    unsure_distance: f32,
}

impl FaceGallery {
    pub fn new(confident_distance: f32, unsure_distance: f32) -> Self {
        Self {
            entries: Vec::new(),
            confident_distance,
            unsure_distance,
        }
    }

    pub fn add(&mut self, name: impl Into<String>, embedding: Vec<f32>) {
        self.entries.push((name.into(), embedding));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn identify(&self, embedding: &[f32]) -> FaceMatch {
        let best = self
            .entries
            .iter()
            .map(|(name, known)| (name, distance(known, embedding)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match best {
            Some((name, d)) if d < self.confident_distance => FaceMatch::Confident(name.clone()),
            Some((name, d)) if d < self.unsure_distance => FaceMatch::Unsure(name.clone()),
            _ => FaceMatch::Unknown,
        }
    }
}

pub struct SeetaFaceRecognizer {
    detector: Box<dyn Detector>,
    gallery: FaceGallery,
    frame_scale: f32,
}

impl SeetaFaceRecognizer {
    pub fn load(config: &FacesConfig) -> Result<Self> {
        let model_path = config
            .model_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid face model path {:?}", config.model_path))?;
        let mut detector = rustface::create_detector(model_path).map_err(|e| {
            anyhow::anyhow!("Failed to load face model {:?}: {}", config.model_path, e)
        })?;
        detector.set_min_face_size(config.min_face_size.max(20));
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let mut recognizer = Self {
            detector,
            gallery: FaceGallery::new(config.confident_distance, config.unsure_distance),
            frame_scale: config.frame_scale,
        };
        recognizer.load_known_faces(&config.known_faces_dir)?;
        Ok(recognizer)
    }

    fn load_known_faces(&mut self, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            info!("Known faces directory {:?} not found, every face will be unknown", dir);
            return Ok(());
        }

        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        paths.sort();

        for path in paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned) else {
                continue;
            };
            let gray = match image::open(&path) {
                Ok(img) => img.to_luma8(),
                Err(e) => {
                    warn!("Skipping known face {:?}: {}", path, e);
                    continue;
                }
            };
            match self.embed_all(&gray).into_iter().next() {
                Some(embedding) => self.gallery.add(name, embedding),
                None => warn!("No face found in {:?}", path),
            }
        }

        info!("Loaded {} known faces", self.gallery.len());
        Ok(())
    }

    fn embed_all(&mut self, gray: &GrayImage) -> Vec<Vec<f32>> {
        let (w, h) = gray.dimensions();
        let mut image = ImageData::new(gray, w, h);
        self.detector
            .detect(&mut image)
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                embed_face(gray, bbox.x(), bbox.y(), bbox.width(), bbox.height())
            })
            .collect()
    }

    fn scaled(&self, gray: GrayImage) -> GrayImage {
        if (self.frame_scale - 1.0).abs() < f32::EPSILON || self.frame_scale <= 0.0 {
            return gray;
        }
        let w = ((gray.width() as f32 * self.frame_scale).round() as u32).max(1);
        let h = ((gray.height() as f32 * self.frame_scale).round() as u32).max(1);
        image::imageops::resize(&gray, w, h, FilterType::Triangle)
    }
}

impl FaceRecognizer for SeetaFaceRecognizer {
    fn recognize_faces(&mut self, image: &Path) -> Result<Vec<String>> {
        let gray = image::open(image)
            .map_err(|e| anyhow::anyhow!("Could not read image at {:?}: {}", image, e))?
            .to_luma8();
        let gray = self.scaled(gray);

        let embeddings = self.embed_all(&gray);
        debug!("Detected {} faces", embeddings.len());

        if self.gallery.is_empty() {
            return Ok(vec![UNKNOWN_PERSON.to_string(); embeddings.len()]);
        }

        Ok(embeddings
            .iter()
            .map(|embedding| self.gallery.identify(embedding).label())
            .collect())
    }
}
