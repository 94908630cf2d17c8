use super::traffic::TrafficController;
use super::types::Capabilities;
use crate::camera::{CaptureStrategy, FrameSink, FrameSource, NullFrameSink};
use crate::config::SemaforConfig;
use crate::detector::VehicleDetector;
use crate::error::{Result, SemaforError};
use crate::lane::Lane;
use crate::lights::LightOutput;
use crate::signal::{Clock, SignalStateMachine, SignalTiming, SystemClock};
use crate::telemetry::{PublishSchedule, TelemetryPublisher};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Assembles a [`TrafficController`] from explicit components
pub struct TrafficControllerBuilder {
    lanes: Option<[Lane; 2]>,
    strategies: Vec<Arc<dyn CaptureStrategy>>,
    resolution: (u32, u32),
    sink: Option<Arc<dyn FrameSink>>,
    sink_timeout: Duration,
    detector: Option<Arc<dyn VehicleDetector>>,
    lights: Option<LightOutput>,
    publisher: Option<Arc<dyn TelemetryPublisher>>,
    topic: String,
    timing: SignalTiming,
    clock: Option<Arc<dyn Clock>>,
    tick_interval: Duration,
    publish_interval: Duration,
    publish_timeout: Duration,
    capabilities: Capabilities,
    cancellation_token: Option<CancellationToken>,
}

impl TrafficControllerBuilder {
    pub fn new() -> Self {
        let defaults = SemaforConfig::default();
        Self {
            lanes: None,
            strategies: Vec::new(),
            resolution: defaults.camera.resolution,
            sink: None,
            sink_timeout: defaults.frames.write_timeout(),
            detector: None,
            lights: None,
            publisher: None,
            topic: defaults.telemetry.topic.clone(),
            timing: SignalTiming::from_config(&defaults.signal),
            clock: None,
            tick_interval: defaults.system.tick_interval(),
            publish_interval: defaults.telemetry.publish_interval(),
            publish_timeout: defaults.telemetry.publish_timeout(),
            capabilities: Capabilities::default(),
            cancellation_token: None,
        }
    }

    pub fn lanes(mut self, lanes: [Lane; 2]) -> Self {
        self.lanes = Some(lanes);
        self
    }

    /// Capture strategies in fallback order
    pub fn strategies(mut self, strategies: Vec<Arc<dyn CaptureStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn resolution(mut self, resolution: (u32, u32)) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn FrameSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Upper bound on each frame write inside a tick
    pub fn sink_timeout(mut self, timeout: Duration) -> Self {
        self.sink_timeout = timeout;
        self
    }

    pub fn detector(mut self, detector: Arc<dyn VehicleDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn lights(mut self, lights: LightOutput) -> Self {
        self.lights = Some(lights);
        self
    }

    pub fn publisher(mut self, publisher: Arc<dyn TelemetryPublisher>, topic: &str) -> Self {
        self.publisher = Some(publisher);
        self.topic = topic.to_string();
        self
    }

    pub fn timing(mut self, timing: SignalTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn publish_interval(mut self, interval: Duration) -> Self {
        self.publish_interval = interval;
        self
    }

    pub fn publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn build(self) -> Result<TrafficController> {
        let missing = |what: &str| {
            SemaforError::component("controller".to_string(), format!("{} is required", what))
        };

        let detector = self.detector.ok_or_else(|| missing("Vehicle detector"))?;
        let lights = self.lights.ok_or_else(|| missing("Light output"))?;
        let publisher = self.publisher.ok_or_else(|| missing("Telemetry publisher"))?;

        let lanes = self
            .lanes
            .unwrap_or_else(|| Lane::pair_from_config(&SemaforConfig::default().lanes));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let sink = self.sink.unwrap_or_else(|| Arc::new(NullFrameSink));

        let start = clock.now();
        Ok(TrafficController {
            lanes,
            source: FrameSource::new(self.strategies, self.resolution),
            sink,
            sink_timeout: self.sink_timeout,
            detector,
            machine: SignalStateMachine::new(self.timing, start),
            lights,
            publisher,
            topic: self.topic,
            publish_timeout: self.publish_timeout,
            schedule: PublishSchedule::new(self.publish_interval, start),
            clock,
            tick_interval: self.tick_interval,
            capabilities: self.capabilities,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
            ticks: 0,
        })
    }
}

impl Default for TrafficControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficController {
    pub fn builder() -> TrafficControllerBuilder {
        TrafficControllerBuilder::new()
    }
}
