use crate::error::SemaforError;
use crate::frame::Frame;
use crate::lane::Lane;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Fire-and-forget consumer of each lane's current frame
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn store(&self, lane: &Lane, frame: &Frame);
}

/// Sink used when frame persistence is disabled
pub struct NullFrameSink;

#[async_trait]
impl FrameSink for NullFrameSink {
    async fn store(&self, _lane: &Lane, _frame: &Frame) {}
}

/// Writes `<dir>/<lane_key>.jpg` for dashboard display
pub struct JpegFileSink {
    dir: PathBuf,
    quality: u8,
}

impl JpegFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        match std::fs::create_dir_all(&dir) {
            Ok(()) => info!("Frame sink writing to {}", dir.display()),
            Err(e) => warn!("Failed to create frame directory {}: {}", dir.display(), e),
        }

        Self { dir, quality: 85 }
    }

    pub fn path_for(&self, lane: &Lane) -> PathBuf {
        self.dir.join(format!("{}.jpg", lane.key))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_jpeg(
        image: &RgbImage,
        target: &Path,
        quality: u8,
    ) -> Result<(), SemaforError> {
        // Written beside the target and renamed so readers never see a partial file.
        let staging = target.with_extension("jpg.tmp");
        {
            let file = File::create(&staging)?;
            let mut writer = BufWriter::new(file);
            JpegEncoder::new_with_quality(&mut writer, quality)
                .encode_image(image)
                .map_err(|e| {
                    SemaforError::component(
                        "frame_sink".to_string(),
                        format!("JPEG encoding failed: {}", e),
                    )
                })?;
            writer.flush()?;
        }
        std::fs::rename(&staging, target)?;
        Ok(())
    }
}

#[async_trait]
impl FrameSink for JpegFileSink {
    async fn store(&self, lane: &Lane, frame: &Frame) {
        let target = self.path_for(lane);
        let image = frame.shared_image();
        let quality = self.quality;
        let lane_key = lane.key.clone();

        let written =
            tokio::task::spawn_blocking(move || Self::write_jpeg(&image, &target, quality).map(|_| target))
                .await;

        match written {
            Ok(Ok(target)) => debug!("Saved {} frame to {}", lane_key, target.display()),
            Ok(Err(e)) => warn!("Failed to save {} frame: {}", lane_key, e),
            Err(e) => warn!("Frame save task for {} failed: {}", lane_key, e),
        }
    }
}
