use super::yolo::{self, INPUT_SIZE, NMS_IOU};
use super::{DetectorBackend, VehicleDetector};
use crate::config::DetectorConfig;
use crate::error::DetectionError;
use crate::frame::Frame;

use ort::session::{builder::GraphOptimizationLevel, Session};
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info};

const COCO_CLASSES: usize = 80;

/// YOLOv8 ONNX detector counting COCO vehicle classes
pub struct YoloDetector {
    session: Mutex<Session>,
    confidence_threshold: f32,
}

impl YoloDetector {
    pub fn load(config: &DetectorConfig) -> Result<Self, DetectionError> {
        let path = config.model_path.as_str();
        let load_error = |details: String| DetectionError::ModelLoad {
            path: path.to_string(),
            details,
        };

        if !Path::new(path).exists() {
            return Err(load_error("model file not found".to_string()));
        }

        info!("Loading YOLO model: {}", path);
        let session = Self::build_session(path).map_err(|e| load_error(e.to_string()))?;

        info!("YOLO detector initialized");
        Ok(Self {
            session: Mutex::new(session),
            confidence_threshold: config.confidence_threshold,
        })
    }

    fn build_session(path: &str) -> anyhow::Result<Session> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(path)?;
        Ok(session)
    }

    fn infer(&self, input: Vec<f32>) -> anyhow::Result<Vec<f32>> {
        let size = INPUT_SIZE as usize;
        let shape = [1, 3, size, size];
        let input_value =
            ort::value::Value::from_array((shape.as_slice(), input.into_boxed_slice()))?;

        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs!["images" => input_value])?;
        let (_, data) = outputs[0].try_extract_tensor::<f32>()?;

        Ok(data.to_vec())
    }
}

impl VehicleDetector for YoloDetector {
    fn backend(&self) -> DetectorBackend {
        DetectorBackend::Model
    }

    fn detect(&self, frame: &Frame) -> Result<usize, DetectionError> {
        if frame.is_empty() {
            return Err(DetectionError::Preprocess {
                details: "frame has no pixels".to_string(),
            });
        }

        let input = yolo::letterbox(frame.image());
        let output = self.infer(input).map_err(|e| DetectionError::Inference {
            details: e.to_string(),
        })?;
        let candidates = yolo::decode(&output, COCO_CLASSES, self.confidence_threshold);
        let vehicles = yolo::nms(candidates, NMS_IOU);

        debug!("YOLO detected {} vehicles", vehicles.len());
        Ok(vehicles.len())
    }
}
