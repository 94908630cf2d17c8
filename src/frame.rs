use chrono::{DateTime, Utc};
use image::RgbImage;
use std::sync::Arc;

/// Where a frame handed to the detector came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOrigin {
    /// Platform still-capture utility
    NativeStill,
    /// Direct video device grab
    Device,
    /// Last successful capture for the lane, reused
    Cached,
    /// Synthesized all-zero frame
    Blank,
}

impl FrameOrigin {
    /// True for frames produced by a real capture strategy
    pub fn is_live(&self) -> bool {
        matches!(self, FrameOrigin::NativeStill | FrameOrigin::Device)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FrameOrigin::NativeStill => "native_still",
            FrameOrigin::Device => "device",
            FrameOrigin::Cached => "cached",
            FrameOrigin::Blank => "blank",
        }
    }
}

/// An RGB raster shared read-only between the frame source, detector and sink
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<RgbImage>,
    origin: FrameOrigin,
    captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(image: RgbImage, origin: FrameOrigin) -> Self {
        Self {
            image: Arc::new(image),
            origin,
            captured_at: Utc::now(),
        }
    }

    /// All-zero frame of the given resolution
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbImage::new(width, height), FrameOrigin::Blank)
    }

    /// Same pixels, re-labelled as served from the lane cache
    pub fn as_cached(&self) -> Self {
        Self {
            image: Arc::clone(&self.image),
            origin: FrameOrigin::Cached,
            captured_at: self.captured_at,
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn shared_image(&self) -> Arc<RgbImage> {
        Arc::clone(&self.image)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn origin(&self) -> FrameOrigin {
        self.origin
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_frame() {
        let frame = Frame::blank(640, 480);
        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.origin(), FrameOrigin::Blank);
        assert!(frame.image().pixels().all(|p| p.0 == [0, 0, 0]));
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_cached_frame_shares_pixels() {
        let mut image = RgbImage::new(4, 4);
        image.put_pixel(1, 1, image::Rgb([200, 10, 10]));
        let frame = Frame::new(image, FrameOrigin::Device);
        let cached = frame.as_cached();

        assert_eq!(cached.origin(), FrameOrigin::Cached);
        assert!(Arc::ptr_eq(&frame.shared_image(), &cached.shared_image()));
        assert_eq!(cached.captured_at(), frame.captured_at());
    }

    #[test]
    fn test_origin_liveness() {
        assert!(FrameOrigin::NativeStill.is_live());
        assert!(FrameOrigin::Device.is_live());
        assert!(!FrameOrigin::Cached.is_live());
        assert!(!FrameOrigin::Blank.is_live());
    }
}
