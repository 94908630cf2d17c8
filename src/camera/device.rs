use super::strategy::CaptureStrategy;
use crate::config::CameraConfig;
use crate::error::CaptureError;
use crate::frame::{Frame, FrameOrigin};
use crate::lane::Lane;
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use image::RgbImage;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Single-frame V4L2 grab through a short-lived GStreamer pipeline
pub struct DeviceCapture {
    resolution: (u32, u32),
    timeout: Duration,
}

impl DeviceCapture {
    pub fn new(resolution: (u32, u32), timeout: Duration) -> Self {
        Self {
            resolution,
            timeout,
        }
    }

    /// Initialize GStreamer once; `None` keeps device capture out of the chain
    pub fn probe(config: &CameraConfig) -> Option<Self> {
        match gstreamer::init() {
            Ok(()) => {
                info!(
                    "Direct device capture available ({}x{})",
                    config.resolution.0, config.resolution.1
                );
                Some(Self::new(config.resolution, config.device_timeout()))
            }
            Err(e) => {
                warn!("Failed to initialize GStreamer, device capture disabled: {}", e);
                None
            }
        }
    }

    /// Build GStreamer pipeline string for a single RGB frame
    fn build_pipeline_string(index: u32, width: u32, height: u32) -> String {
        format!(
            "v4l2src device=/dev/video{} num-buffers=1 ! \
             videoconvert ! videoscale ! \
             video/x-raw,format=RGB,width={},height={} ! \
             appsink name=sink sync=false max-buffers=1 drop=true emit-signals=false",
            index, width, height
        )
    }

    fn grab_blocking(
        index: u32,
        resolution: (u32, u32),
        timeout: Duration,
    ) -> Result<RgbImage, CaptureError> {
        let device_error = |details: String| CaptureError::Device { index, details };

        let pipeline_desc = Self::build_pipeline_string(index, resolution.0, resolution.1);
        debug!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| device_error(format!("Failed to create pipeline: {}", e)))?
            .downcast::<Pipeline>()
            .map_err(|_| device_error("Failed to downcast to Pipeline".to_string()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| device_error("Failed to get appsink element".to_string()))?
            .downcast::<AppSink>()
            .map_err(|_| device_error("Failed to downcast to AppSink".to_string()))?;

        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(device_error(format!("Failed to start pipeline: {}", e)));
        }

        let sample =
            appsink.try_pull_sample(gstreamer::ClockTime::from_mseconds(timeout.as_millis() as u64));
        let result = match sample {
            Some(sample) => Self::sample_to_image(&sample).map_err(device_error),
            None => Err(CaptureError::Timeout {
                millis: timeout.as_millis() as u64,
            }),
        };

        let _ = pipeline.set_state(gstreamer::State::Null);
        result
    }

    fn sample_to_image(sample: &gstreamer::Sample) -> Result<RgbImage, String> {
        let buffer = sample.buffer().ok_or("No buffer in sample")?;
        let caps = sample.caps().ok_or("No caps in sample")?;
        let video_info =
            VideoInfo::from_caps(caps).map_err(|e| format!("Failed to get video info: {}", e))?;

        let width = video_info.width();
        let height = video_info.height();
        let stride = video_info.stride()[0] as usize;
        let row_bytes = width as usize * 3;
        if width == 0 || height == 0 {
            return Err(format!("Sample has empty dimensions {}x{}", width, height));
        }

        let map = buffer
            .map_readable()
            .map_err(|e| format!("Failed to map buffer: {}", e))?;
        let data = map.as_slice();

        if stride < row_bytes || data.len() < stride * (height as usize - 1) + row_bytes {
            return Err(format!(
                "Buffer of {} bytes too small for {}x{} (stride {})",
                data.len(),
                width,
                height,
                stride
            ));
        }

        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in data.chunks(stride).take(height as usize) {
            pixels.extend_from_slice(&row[..row_bytes]);
        }

        RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| "Failed to create RGB image from sample".to_string())
    }
}

#[async_trait]
impl CaptureStrategy for DeviceCapture {
    fn name(&self) -> &'static str {
        "device"
    }

    async fn capture(&self, lane: &Lane) -> Result<Frame, CaptureError> {
        let index = lane.index;
        let resolution = self.resolution;
        let timeout = self.timeout;

        // The pull is bounded by `timeout`; the outer guard covers pipeline start-up stalls.
        let grab = tokio::task::spawn_blocking(move || Self::grab_blocking(index, resolution, timeout));
        let image = match tokio::time::timeout(timeout * 2, grab).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => {
                return Err(CaptureError::Device {
                    index,
                    details: format!("Capture task failed: {}", e),
                })
            }
            Err(_) => {
                return Err(CaptureError::Timeout {
                    millis: (timeout * 2).as_millis() as u64,
                })
            }
        };

        debug!(
            "Device capture for {} (camera {}): {}x{}",
            lane.key,
            index,
            image.width(),
            image.height()
        );

        Ok(Frame::new(image, FrameOrigin::Device))
    }
}
