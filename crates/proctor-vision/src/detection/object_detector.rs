//! Generic object detection using a YOLO-style ONNX model, filtered down to
//! the device classes this engine cares about.
//!
//! GPU acceleration support:
//! - CUDA on Linux with NVIDIA GPU
//! - CoreML on macOS with Apple Silicon
//! - CPU fallback on all platforms

use std::path::Path;
use std::sync::Mutex;

use image::{DynamicImage, ImageBuffer, Rgb};
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use proctor_models::{BoundingBox, DeviceClass};
use tracing::{debug, info};

use crate::error::{VisionError, VisionResult};

/// A device detected by the object detector, in original-frame pixel space.
#[derive(Debug, Clone)]
pub struct DetectedObject {
    pub class: DeviceClass,
    pub bbox: BoundingBox,
    pub confidence: f64,
}

/// Full COCO class names, indexed by the model's native class id.
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

#[derive(Debug, Clone)]
pub struct ObjectDetectorConfig {
    pub model_path: String,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    pub input_size: u32,
}

impl Default for ObjectDetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/yolov8n.onnx".to_string(),
            confidence_threshold: 0.5,
            nms_threshold: 0.45,
            input_size: 640,
        }
    }
}

/// Raw (pre-class-filter) detection in normalized [0,1] coordinates.
struct RawDetection {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    class_id: usize,
    confidence: f32,
}

pub struct ObjectDetector {
    session: Mutex<Session>,
    config: ObjectDetectorConfig,
}

impl ObjectDetector {
    pub fn new(config: ObjectDetectorConfig) -> VisionResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(VisionError::model_not_found(&config.model_path));
        }

        let session = Mutex::new(create_session(model_path)?);
        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            "object detector initialized"
        );

        let detector = Self { session, config };
        detector.warm_up();
        Ok(detector)
    }

    /// Run one dummy inference so the first real frame does not pay the
    /// session's lazy-initialization cost.
    fn warm_up(&self) {
        let dummy = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(
            self.config.input_size,
            self.config.input_size,
            Rgb([0u8, 0, 0]),
        ));
        if let Err(err) = self.detect_image(&dummy) {
            debug!(error = %err, "object detector warm-up inference failed");
        }
    }

    /// Detect devices in an original-resolution RGB frame.
    pub fn detect(
        &self,
        image_data: &[u8],
        width: u32,
        height: u32,
    ) -> VisionResult<Vec<DetectedObject>> {
        let img = raw_to_image(image_data, width, height)?;
        self.detect_image(&img)
    }

    pub fn detect_image(&self, img: &DynamicImage) -> VisionResult<Vec<DetectedObject>> {
        use image::GenericImageView;
        let (width, height) = img.dimensions();
        let input = self.preprocess(img)?;
        let outputs = self.run_inference(input)?;
        let raw = self.postprocess(&outputs, width, height)?;

        Ok(raw
            .into_iter()
            .filter_map(|d| {
                let label = COCO_CLASSES.get(d.class_id)?;
                let class = DeviceClass::from_coco_label(label)?;
                Some(DetectedObject {
                    class,
                    bbox: BoundingBox::new(
                        d.x as f64 * width as f64,
                        d.y as f64 * height as f64,
                        d.width as f64 * width as f64,
                        d.height as f64 * height as f64,
                    ),
                    confidence: d.confidence as f64,
                })
            })
            .collect())
    }

    fn preprocess(&self, img: &DynamicImage) -> VisionResult<Value> {
        let input_size = self.config.input_size;

        let resized = img.resize_exact(input_size, input_size, image::imageops::FilterType::Triangle);
        let rgb = resized.to_rgb8();
        let (w, h) = (input_size as usize, input_size as usize);

        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = rgb.get_pixel(x as u32, y as u32);
                    chw_data.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| VisionError::inference_failed(format!("failed to create tensor: {e}")))
    }

    fn run_inference(&self, input: Value) -> VisionResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| VisionError::internal("object detector session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::inference_failed(format!("onnx inference failed: {e}")))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| VisionError::inference_failed("missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::inference_failed(format!("failed to extract tensor: {e}")))?;

        Ok(tensor.1.iter().copied().collect())
    }

    fn postprocess(
        &self,
        outputs: &[f32],
        orig_width: u32,
        orig_height: u32,
    ) -> VisionResult<Vec<RawDetection>> {
        let num_classes = 80;
        let num_boxes = 8400;
        let num_features = 84;

        if outputs.len() != num_features * num_boxes {
            return Err(VisionError::inference_failed(format!(
                "unexpected output size: expected {}, got {}",
                num_features * num_boxes,
                outputs.len()
            )));
        }

        let output_array = Array::from_shape_vec((num_features, num_boxes), outputs.to_vec())
            .map_err(|e| VisionError::inference_failed(format!("failed to reshape output: {e}")))?;
        let transposed = output_array.t();

        let mut candidates: Vec<RawDetection> = Vec::new();
        let input_size = self.config.input_size as f32;
        let scale_w = orig_width as f32 / input_size;
        let scale_h = orig_height as f32 / input_size;

        for i in 0..num_boxes {
            let cx = transposed[[i, 0]];
            let cy = transposed[[i, 1]];
            let w = transposed[[i, 2]];
            let h = transposed[[i, 3]];

            let mut best_class = 0;
            let mut best_score = 0.0f32;
            for c in 0..num_classes {
                let score = transposed[[i, 4 + c]];
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }

            if best_score < self.config.confidence_threshold {
                continue;
            }

            let x = (cx - w / 2.0) * scale_w;
            let y = (cy - h / 2.0) * scale_h;
            let width = w * scale_w;
            let height = h * scale_h;

            let x_norm = (x / orig_width as f32).clamp(0.0, 1.0);
            let y_norm = (y / orig_height as f32).clamp(0.0, 1.0);
            let w_norm = (width / orig_width as f32).min(1.0 - x_norm);
            let h_norm = (height / orig_height as f32).min(1.0 - y_norm);

            candidates.push(RawDetection {
                x: x_norm,
                y: y_norm,
                width: w_norm,
                height: h_norm,
                class_id: best_class,
                confidence: best_score,
            });
        }

        Ok(self.non_maximum_suppression(candidates))
    }

    fn non_maximum_suppression(&self, mut detections: Vec<RawDetection>) -> Vec<RawDetection> {
        if detections.is_empty() {
            return detections;
        }

        detections.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());

        let mut keep = Vec::new();
        let mut suppressed = vec![false; detections.len()];

        for i in 0..detections.len() {
            if suppressed[i] {
                continue;
            }
            for j in (i + 1)..detections.len() {
                if suppressed[j] || detections[i].class_id != detections[j].class_id {
                    continue;
                }
                if compute_iou(&detections[i], &detections[j]) > self.config.nms_threshold {
                    suppressed[j] = true;
                }
            }
        }

        for (i, det) in detections.into_iter().enumerate() {
            if !suppressed[i] {
                keep.push(det);
            }
        }
        keep
    }

    pub fn config(&self) -> &ObjectDetectorConfig {
        &self.config
    }
}

fn compute_iou(a: &RawDetection, b: &RawDetection) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let inter_w = (x2 - x1).max(0.0);
    let inter_h = (y2 - y1).max(0.0);
    let intersection = inter_w * inter_h;

    let area_a = a.width * a.height;
    let area_b = b.width * b.height;
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

fn raw_to_image(image_data: &[u8], width: u32, height: u32) -> VisionResult<DynamicImage> {
    let expected_len = (width * height * 3) as usize;
    if image_data.len() != expected_len {
        return Err(VisionError::internal(format!(
            "invalid image data length: expected {expected_len}, got {}",
            image_data.len()
        )));
    }

    let img_buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_raw(width, height, image_data.to_vec())
            .ok_or_else(|| VisionError::internal("failed to create image buffer"))?;

    Ok(DynamicImage::ImageRgb8(img_buffer))
}

fn create_session(model_path: &Path) -> VisionResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| VisionError::model_load_failed(format!("failed to read model file: {e}")))?;

    let builder = Session::builder()
        .map_err(|e| VisionError::model_load_failed(format!("failed to create session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| VisionError::model_load_failed(format!("failed to set optimization level: {e}")))?;

    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("using CUDA execution provider for object detection");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, trying alternatives");
    }

    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!("using CoreML execution provider for object detection");
                return Ok(session);
            }
        }
        debug!("CoreML execution provider not available, using CPU");
    }

    info!("using CPU execution provider for object detection");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| VisionError::model_load_failed(format!("failed to load onnx model: {e}")))
}

pub fn is_model_available_at(path: &str) -> bool {
    Path::new(path).exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coco_classes_len() {
        assert_eq!(COCO_CLASSES.len(), 80);
        assert_eq!(COCO_CLASSES[67], "cell phone");
    }

    #[test]
    fn test_config_default_confidence_floor() {
        let config = ObjectDetectorConfig::default();
        assert_eq!(config.input_size, 640);
        assert!((config.confidence_threshold - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_iou_identical_boxes_is_one() {
        let a = RawDetection { x: 0.1, y: 0.1, width: 0.2, height: 0.2, class_id: 67, confidence: 0.9 };
        let b = RawDetection { x: 0.1, y: 0.1, width: 0.2, height: 0.2, class_id: 67, confidence: 0.8 };
        assert!((compute_iou(&a, &b) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_iou_no_overlap_is_zero() {
        let a = RawDetection { x: 0.0, y: 0.0, width: 0.1, height: 0.1, class_id: 67, confidence: 0.9 };
        let b = RawDetection { x: 0.5, y: 0.5, width: 0.1, height: 0.1, class_id: 67, confidence: 0.9 };
        assert_eq!(compute_iou(&a, &b), 0.0);
    }
}
