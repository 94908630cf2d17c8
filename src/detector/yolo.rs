//! Letterboxing and output decoding for YOLOv8-style detectors.

use image::{imageops, Rgb, RgbImage};

pub const INPUT_SIZE: u32 = 640;
pub const PAD_LEVEL: u8 = 114;
pub const NMS_IOU: f32 = 0.45;

/// COCO ids for car, motorcycle, bus and truck
pub const VEHICLE_CLASSES: [usize; 4] = [2, 3, 5, 7];

const BOX_FIELDS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// [x1, y1, x2, y2] in letterboxed input coordinates
    pub bbox: [f32; 4],
    pub confidence: f32,
    pub class_id: usize,
}

/// Scale into a square canvas keeping aspect ratio, then flatten to
/// normalized CHW floats.
pub fn letterbox(image: &RgbImage) -> Vec<f32> {
    let size = INPUT_SIZE;
    let (src_w, src_h) = image.dimensions();
    let scale = (size as f32 / src_w as f32).min(size as f32 / src_h as f32);
    let scaled_w = ((src_w as f32 * scale) as u32).clamp(1, size);
    let scaled_h = ((src_h as f32 * scale) as u32).clamp(1, size);
    let pad_x = (size - scaled_w) / 2;
    let pad_y = (size - scaled_h) / 2;

    let resized = imageops::resize(image, scaled_w, scaled_h, imageops::FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_LEVEL; 3]));
    imageops::overlay(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    let plane = (size * size) as usize;
    let mut input = vec![0.0f32; 3 * plane];
    for (i, pixel) in canvas.pixels().enumerate() {
        for c in 0..3 {
            input[c * plane + i] = pixel[c] as f32 / 255.0;
        }
    }
    input
}

/// Decode a `[1, 4 + classes, anchors]` prediction tensor into vehicle
/// candidates scoring strictly above `confidence`.
pub fn decode(output: &[f32], classes: usize, confidence: f32) -> Vec<Candidate> {
    let rows = BOX_FIELDS + classes;
    if classes == 0 || output.len() < rows {
        return Vec::new();
    }
    let anchors = output.len() / rows;

    let mut candidates = Vec::new();
    for i in 0..anchors {
        let (mut best_class, mut best_conf) = (0usize, 0.0f32);
        for c in 0..classes {
            let conf = output[(BOX_FIELDS + c) * anchors + i];
            if conf > best_conf {
                best_conf = conf;
                best_class = c;
            }
        }

        if best_conf <= confidence || !VEHICLE_CLASSES.contains(&best_class) {
            continue;
        }

        let cx = output[i];
        let cy = output[anchors + i];
        let w = output[2 * anchors + i];
        let h = output[3 * anchors + i];
        candidates.push(Candidate {
            bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            confidence: best_conf,
            class_id: best_class,
        });
    }
    candidates
}

pub fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if keep
            .iter()
            .all(|kept| iou(&kept.bbox, &candidate.bbox) <= iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - intersection;

    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}
