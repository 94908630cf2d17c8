mod heuristic;
#[cfg(feature = "model_detection")]
mod model;
mod priority;
#[cfg_attr(not(feature = "model_detection"), allow(dead_code))]
mod yolo;


pub use heuristic::HeuristicDetector;
#[cfg(feature = "model_detection")]
pub use model::YoloDetector;
pub use priority::{classify, PriorityLevel, VehicleCount};

use crate::config::DetectorConfig;
use crate::error::DetectionError;
use crate::frame::Frame;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorBackend {
    Model,
    Heuristic,
}

impl DetectorBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorBackend::Model => "model",
            DetectorBackend::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for DetectorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frame to vehicle count conversion.
///
/// Implementations report raw counts through [`detect`](Self::detect);
/// callers use [`count`](Self::count), which clamps the result and maps any
/// failure to zero.
pub trait VehicleDetector: Send + Sync {
    fn backend(&self) -> DetectorBackend;

    fn detect(&self, frame: &Frame) -> Result<usize, DetectionError>;

    fn count(&self, frame: &Frame) -> VehicleCount {
        match self.detect(frame) {
            Ok(raw) => VehicleCount::saturating(raw),
            Err(e) => {
                warn!("{} detector failed, reporting no vehicles: {}", self.backend(), e);
                VehicleCount::ZERO
            }
        }
    }
}

/// Pick the backend once at startup: the model when it loads, the heuristic otherwise
pub fn select_detector(config: &DetectorConfig) -> Arc<dyn VehicleDetector> {
    #[cfg(feature = "model_detection")]
    {
        match YoloDetector::load(config) {
            Ok(detector) => {
                info!("Using model detector ({})", config.model_path);
                return Arc::new(detector);
            }
            Err(e) => warn!("Model detector unavailable, falling back to heuristic: {}", e),
        }
    }
    #[cfg(not(feature = "model_detection"))]
    info!("Model detection not compiled in");

    info!(
        "Using heuristic detector (threshold {}, min area {:.0}px)",
        config.binary_threshold, config.min_blob_area
    );
    Arc::new(HeuristicDetector::from_config(config))
}
