use super::types::{Capabilities, TickReport};
use crate::camera::{FrameSink, FrameSource};
use crate::detector::{VehicleCount, VehicleDetector};
use crate::frame::FrameOrigin;
use crate::lane::Lane;
use crate::lights::LightOutput;
use crate::signal::{Clock, SignalStateMachine};
use crate::telemetry::{
    publish_best_effort, ControllerSnapshot, PublishSchedule, TelemetryPublisher,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct LaneSample {
    origin: FrameOrigin,
    count: VehicleCount,
}

/// Owns every component and drives them one tick at a time
pub struct TrafficController {
    pub(super) lanes: [Lane; 2],
    pub(super) source: FrameSource,
    pub(super) sink: Arc<dyn FrameSink>,
    pub(super) sink_timeout: Duration,
    pub(super) detector: Arc<dyn VehicleDetector>,
    pub(super) machine: SignalStateMachine,
    pub(super) lights: LightOutput,
    pub(super) publisher: Arc<dyn TelemetryPublisher>,
    pub(super) topic: String,
    pub(super) publish_timeout: Duration,
    pub(super) schedule: PublishSchedule,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) tick_interval: Duration,
    pub(super) capabilities: Capabilities,
    pub(super) cancellation_token: CancellationToken,
    pub(super) ticks: u64,
}

impl TrafficController {
    /// One iteration: sample both lanes, step the signal, drive the lights,
    /// publish when due. Never fails.
    pub async fn tick(&mut self) -> TickReport {
        self.ticks += 1;

        let (first, second) = tokio::join!(
            self.sample_lane(&self.lanes[0]),
            self.sample_lane(&self.lanes[1])
        );
        let counts = [first.count, second.count];

        let now = self.clock.now();
        let transition = self.machine.tick(now, counts);
        if let Some(transition) = transition {
            info!("Signal phase {} -> {}", transition.from, transition.to);
        }

        let status = self.machine.status(now);
        self.lights.apply(status.lights);
        let snapshot = ControllerSnapshot::new(&status, counts);

        let published = if self.schedule.is_due(now) {
            info!("{}", snapshot.summary());
            let delivered = publish_best_effort(
                self.publisher.as_ref(),
                &self.topic,
                &snapshot,
                self.publish_timeout,
            )
            .await;
            self.schedule.mark(now);
            delivered
        } else {
            false
        };

        debug!(
            "Tick {}: {} ({} / {} frames)",
            self.ticks,
            status.phase,
            first.origin.as_str(),
            second.origin.as_str()
        );

        TickReport {
            snapshot,
            transition,
            published,
            origins: [first.origin, second.origin],
        }
    }

    async fn sample_lane(&self, lane: &Lane) -> LaneSample {
        let frame = self.source.acquire(lane).await;
        if tokio::time::timeout(self.sink_timeout, self.sink.store(lane, &frame))
            .await
            .is_err()
        {
            warn!(
                "Frame sink for {} did not finish within {}ms, skipping",
                lane.key,
                self.sink_timeout.as_millis()
            );
        }
        let origin = frame.origin();

        let detector = Arc::clone(&self.detector);
        let count = match tokio::task::spawn_blocking(move || detector.count(&frame)).await {
            Ok(count) => count,
            Err(e) => {
                error!("Detection task for {} failed: {}", lane.key, e);
                VehicleCount::ZERO
            }
        };

        LaneSample { origin, count }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn lanes(&self) -> &[Lane; 2] {
        &self.lanes
    }

    pub fn machine(&self) -> &SignalStateMachine {
        &self.machine
    }

    pub fn lights(&self) -> &LightOutput {
        &self.lights
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Token that stops `run` and any background services
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }
}
