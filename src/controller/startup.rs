use super::traffic::TrafficController;
use super::types::Capabilities;
#[cfg(all(feature = "camera", target_os = "linux"))]
use crate::camera::DeviceCapture;
use crate::camera::{CaptureStrategy, FrameSink, JpegFileSink, NativeStillCapture, NullFrameSink};
use crate::config::SemaforConfig;
use crate::detector::{select_detector, DetectorBackend};
use crate::error::Result;
use crate::lane::Lane;
use crate::lights::LightOutput;
use crate::signal::SignalTiming;
use crate::telemetry::TelemetryPublisher;
use std::sync::Arc;
use tracing::info;

impl TrafficController {
    /// Probe the host once and assemble the controller from configuration
    pub fn from_config(
        config: &SemaforConfig,
        publisher: Arc<dyn TelemetryPublisher>,
    ) -> Result<Self> {
        config.validate()?;
        info!("Initializing traffic controller");

        let mut strategies: Vec<Arc<dyn CaptureStrategy>> = Vec::new();
        let mut capabilities = Capabilities::default();

        if let Some(native) = NativeStillCapture::probe(&config.camera) {
            capabilities.native_still = true;
            strategies.push(Arc::new(native));
        }

        #[cfg(all(feature = "camera", target_os = "linux"))]
        if let Some(device) = DeviceCapture::probe(&config.camera) {
            capabilities.device_capture = true;
            strategies.push(Arc::new(device));
        }

        let detector = select_detector(&config.detector);
        capabilities.model_backend = detector.backend() == DetectorBackend::Model;

        let lights = LightOutput::from_config(&config.lights);
        capabilities.gpio = !lights.is_mock();

        let sink: Arc<dyn FrameSink> = if config.frames.enabled {
            Arc::new(JpegFileSink::new(&config.frames.path))
        } else {
            Arc::new(NullFrameSink)
        };

        info!("Capabilities: {}", capabilities);

        Self::builder()
            .lanes(Lane::pair_from_config(&config.lanes))
            .strategies(strategies)
            .resolution(config.camera.resolution)
            .sink(sink)
            .sink_timeout(config.frames.write_timeout())
            .detector(detector)
            .lights(lights)
            .publisher(publisher, &config.telemetry.topic)
            .timing(SignalTiming::from_config(&config.signal))
            .tick_interval(config.system.tick_interval())
            .publish_interval(config.telemetry.publish_interval())
            .publish_timeout(config.telemetry.publish_timeout())
            .capabilities(capabilities)
            .build()
    }
}

#[cfg(feature = "streaming")]
impl TrafficController {
    /// Serve telemetry in the background until the controller is cancelled
    pub fn start_telemetry_server(
        &self,
        config: &SemaforConfig,
        hub: Arc<crate::telemetry::TelemetryHub>,
    ) -> Option<tokio::task::JoinHandle<()>> {
        use crate::telemetry::TelemetryServer;
        use tracing::error;

        if !config.telemetry.server_enabled {
            info!("Telemetry server disabled");
            return None;
        }

        let mut server = TelemetryServer::new(&config.telemetry, hub);
        if config.frames.enabled {
            server = server.with_frames_dir(&config.frames.path);
        }

        let cancel = self.cancellation_token();
        Some(tokio::spawn(async move {
            if let Err(e) = server.start(cancel).await {
                error!("Telemetry server error: {}", e);
            }
        }))
    }
}
