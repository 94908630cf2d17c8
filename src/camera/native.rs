use super::strategy::CaptureStrategy;
use crate::config::CameraConfig;
use crate::error::CaptureError;
use crate::frame::{Frame, FrameOrigin};
use crate::lane::Lane;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, trace};

/// Still capture through the platform camera utility (`libcamera-still` on Raspberry Pi)
pub struct NativeStillCapture {
    command: PathBuf,
    capture_ms: u64,
    timeout: Duration,
}

impl NativeStillCapture {
    pub fn new(command: impl Into<PathBuf>, capture_ms: u64, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            capture_ms,
            timeout,
        }
    }

    /// Resolve the utility on PATH once; `None` keeps it out of the chain
    pub fn probe(config: &CameraConfig) -> Option<Self> {
        match which::which(&config.still_command) {
            Ok(path) => {
                info!("Native still capture available: {}", path.display());
                Some(Self::new(
                    path,
                    config.still_capture_ms,
                    config.still_timeout(),
                ))
            }
            Err(e) => {
                info!(
                    "Native still capture '{}' not available: {}",
                    config.still_command, e
                );
                None
            }
        }
    }

    pub fn command(&self) -> &PathBuf {
        &self.command
    }
}

#[async_trait]
impl CaptureStrategy for NativeStillCapture {
    fn name(&self) -> &'static str {
        "native_still"
    }

    async fn capture(&self, lane: &Lane) -> Result<Frame, CaptureError> {
        let output_file = tempfile::Builder::new()
            .prefix("semafor-")
            .suffix(".jpg")
            .tempfile()
            .map_err(|e| CaptureError::Spawn {
                details: format!("Failed to create scratch file: {}", e),
            })?;

        let mut cmd = Command::new(&self.command);
        cmd.arg("-n")
            .arg("--camera")
            .arg(lane.index.to_string())
            .arg("-o")
            .arg(output_file.path())
            .arg("--timeout")
            .arg(self.capture_ms.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        trace!(
            "Running {} for {} (camera {})",
            self.command.display(),
            lane.key,
            lane.index
        );

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(CaptureError::Spawn {
                    details: e.to_string(),
                })
            }
            Err(_) => {
                return Err(CaptureError::Timeout {
                    millis: self.timeout.as_millis() as u64,
                })
            }
        };

        if !output.status.success() {
            debug!(
                "Still capture for {} failed: {}",
                lane.key,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(CaptureError::ExitStatus {
                code: output.status.code(),
            });
        }

        let bytes = tokio::fs::read(output_file.path())
            .await
            .map_err(|e| CaptureError::Decode {
                details: format!("Failed to read capture output: {}", e),
            })?;

        let image = image::load_from_memory(&bytes)
            .map_err(|e| CaptureError::Decode {
                details: e.to_string(),
            })?
            .to_rgb8();

        debug!(
            "Native still capture for {}: {}x{}",
            lane.key,
            image.width(),
            image.height()
        );

        Ok(Frame::new(image, FrameOrigin::NativeStill))
    }
}
