//! YOLOv8 object recognition.
//!
//! The detector runs an exported TorchScript module; everything after the
//! forward pass (class selection, NMS, counting) lives here so it can be
//! exercised without libtorch.

/// COCO-80 class names in model output order.
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Single detection in model input coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Center x, center y, width, height.
    pub bbox_cxcywh: [f32; 4],
    pub score: f32,
    pub class_id: usize,
}

impl Detection {
    fn corners(&self) -> [f32; 4] {
        let [cx, cy, w, h] = self.bbox_cxcywh;
        [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]
    }

    fn area(&self) -> f32 {
        let [_, _, w, h] = self.bbox_cxcywh;
        w.max(0.0) * h.max(0.0)
    }

    pub fn iou(&self, other: &Detection) -> f32 {
        let [ax1, ay1, ax2, ay2] = self.corners();
        let [bx1, by1, bx2, by2] = other.corners();

        let inter_w = (ax2.min(bx2) - ax1.max(bx1)).max(0.0);
        let inter_h = (ay2.min(by2) - ay1.max(by1)).max(0.0);
        let inter = inter_w * inter_h;
        let union = self.area() + other.area() - inter;

        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// Decode one prediction row `[cx, cy, w, h, class scores...]`.
pub fn decode_row(row: &[f32], confidence_threshold: f32) -> Option<Detection> {
    if row.len() < 5 {
        return None;
    }
    let (class_id, score) = row[4..]
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))?;
    if score < confidence_threshold {
        return None;
    }
    Some(Detection {
        bbox_cxcywh: [row[0], row[1], row[2], row[3]],
        score,
        class_id,
    })
}

/// Upper bound on decoded candidates before NMS.
pub const MAX_CANDIDATES: usize = 1024;

/// Decode every row and keep the `max` highest-scoring candidates.
pub fn select_candidates(
    rows: &[Vec<f32>],
    confidence_threshold: f32,
    max: usize,
) -> Vec<Detection> {
    let mut candidates: Vec<Detection> = rows
        .iter()
        .filter_map(|row| decode_row(row, confidence_threshold))
        .collect();
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates.truncate(max);
    candidates
}

/// Greedy per-class non-maximum suppression.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

/// Count detections per class, in the order classes are first seen, and
/// format each as `"<count> <label>"` with a plural `s` when count > 1.
pub fn summarize(detections: &[Detection], labels: &[&str]) -> Vec<String> {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for detection in detections {
        match counts.iter_mut().find(|(id, _)| *id == detection.class_id) {
            Some((_, count)) => *count += 1,
            None => counts.push((detection.class_id, 1)),
        }
    }

    counts
        .into_iter()
        .map(|(class_id, count)| {
            let label = labels
                .get(class_id)
                .map(|l| l.to_string())
                .unwrap_or_else(|| format!("object {}", class_id));
            let suffix = if count > 1 { "s" } else { "" };
            format!("{} {}{}", count, label, suffix)
        })
        .collect()
}

#[cfg(feature = "yolo")]
mod torch {
    use anyhow::Result;
    use image::imageops::FilterType;
    use std::path::Path;
    use tch::{CModule, Device, Kind, Tensor};
    use tracing::{debug, info, warn};

    use super::{non_max_suppression, select_candidates, summarize, COCO_CLASSES, MAX_CANDIDATES};
    use crate::config::ObjectsConfig;
    use crate::vision::ObjectRecognizer;

    /// TorchScript-backed YOLOv8 detector.
    pub struct YoloDetector {
        module: CModule,
        device: Device,
        input_size: u32,
        confidence_threshold: f32,
        iou_threshold: f32,
    }

    impl YoloDetector {
        pub fn load(config: &ObjectsConfig) -> Result<Self> {
            let device = match config.backend.to_lowercase().as_str() {
                "cpu" => Device::Cpu,
                "gpu" | "cuda" => Device::cuda_if_available(),
                other => {
                    warn!(
                        "Invalid backend value '{}', defaulting to CPU. Valid options: cpu, gpu, cuda",
                        other
                    );
                    Device::Cpu
                }
            };

            info!("Loading YOLO module from {:?} on {:?}", config.model_path, device);
            let module = CModule::load_on_device(&config.model_path, device).map_err(|e| {
                anyhow::anyhow!("Failed to load YOLO model {:?}: {}", config.model_path, e)
            })?;

            Ok(Self {
                module,
                device,
                input_size: config.input_size,
                confidence_threshold: config.confidence_threshold,
                iou_threshold: config.iou_threshold,
            })
        }

        fn image_to_tensor(&self, image: &Path) -> Result<Tensor> {
            let img = image::open(image)
                .map_err(|e| anyhow::anyhow!("Could not read image at {:?}: {}", image, e))?
                .to_rgb8();
            let size = self.input_size;
            let resized = image::imageops::resize(&img, size, size, FilterType::Triangle);

            let tensor = Tensor::from_slice(resized.as_raw())
                .to_device(self.device)
                .to_kind(Kind::Float)
                .view([1, size as i64, size as i64, 3])
                .permute([0, 3, 1, 2])
                / 255.0;
            Ok(tensor)
        }
    }

    impl ObjectRecognizer for YoloDetector {
        fn recognize_objects(&mut self, image: &Path) -> Result<Vec<String>> {
            let input = self.image_to_tensor(image)?;
            let output = tch::no_grad(|| self.module.forward_ts(&[input]))?;

            let shape = output.size();
            if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
                anyhow::bail!("unexpected detector output shape: {:?}", shape);
            }

            let preds = output
                .to_device(Device::Cpu)
                .to_kind(Kind::Float)
                .squeeze_dim(0)
                .permute([1, 0])
                .contiguous();
            let rows: Vec<Vec<f32>> = Vec::<Vec<f32>>::try_from(&preds)?;

            let candidates = select_candidates(&rows, self.confidence_threshold, MAX_CANDIDATES);
            let candidate_count = candidates.len();
            let detections = non_max_suppression(candidates, self.iou_threshold);

            debug!(
                "YOLO: {} candidates, {} after NMS",
                candidate_count,
                detections.len()
            );
            Ok(summarize(&detections, &COCO_CLASSES))
        }
    }
}

#[cfg(feature = "yolo")]
pub use torch::YoloDetector;
