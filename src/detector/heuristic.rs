use super::{DetectorBackend, VehicleDetector};
use crate::config::DetectorConfig;
use crate::error::DetectionError;
use crate::frame::Frame;

use image::{imageops, ImageBuffer, Luma};
use imageproc::{
    contrast::threshold,
    region_labelling::{connected_components, Connectivity},
};
use std::collections::HashMap;
use tracing::debug;

/// Brightness blob counter used when no model is available.
///
/// Pixels brighter than `binary_threshold` form the foreground; each
/// 8-connected foreground region larger than `min_blob_area` is one vehicle.
pub struct HeuristicDetector {
    binary_threshold: u8,
    min_blob_area: f64,
}

impl HeuristicDetector {
    pub fn new(binary_threshold: u8, min_blob_area: f64) -> Self {
        Self {
            binary_threshold,
            min_blob_area,
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.binary_threshold, config.min_blob_area)
    }

    fn component_areas(components: &ImageBuffer<Luma<u32>, Vec<u32>>) -> HashMap<u32, u32> {
        let mut areas = HashMap::new();
        for pixel in components.pixels() {
            let label = pixel[0];
            if label > 0 {
                *areas.entry(label).or_insert(0) += 1;
            }
        }
        areas
    }
}

impl VehicleDetector for HeuristicDetector {
    fn backend(&self) -> DetectorBackend {
        DetectorBackend::Heuristic
    }

    fn detect(&self, frame: &Frame) -> Result<usize, DetectionError> {
        if frame.is_empty() {
            return Err(DetectionError::Preprocess {
                details: "frame has no pixels".to_string(),
            });
        }

        let gray = imageops::grayscale(frame.image());
        let mask = threshold(&gray, self.binary_threshold);
        let components = connected_components(&mask, Connectivity::Eight, Luma([0u8]));

        let areas = Self::component_areas(&components);
        let blobs = areas
            .values()
            .filter(|&&area| area as f64 > self.min_blob_area)
            .count();

        debug!(
            "Heuristic detector: {} regions, {} above {:.0}px",
            areas.len(),
            blobs,
            self.min_blob_area
        );
        Ok(blobs)
    }
}
