use super::snapshot::ControllerSnapshot;
use crate::error::TelemetryError;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[async_trait]
pub trait TelemetryPublisher: Send + Sync {
    /// Deliver the snapshot to every current subscriber of `topic`
    async fn publish(
        &self,
        topic: &str,
        snapshot: &ControllerSnapshot,
    ) -> Result<usize, TelemetryError>;
}

/// Publish under a deadline; failures are logged and reported as `false`
pub async fn publish_best_effort(
    publisher: &dyn TelemetryPublisher,
    topic: &str,
    snapshot: &ControllerSnapshot,
    timeout: Duration,
) -> bool {
    match tokio::time::timeout(timeout, publisher.publish(topic, snapshot)).await {
        Ok(Ok(receivers)) => {
            debug!("Published snapshot to '{}' ({} receivers)", topic, receivers);
            true
        }
        Ok(Err(e)) => {
            warn!("Telemetry publish failed: {}", e);
            false
        }
        Err(_) => {
            let e = TelemetryError::Timeout {
                topic: topic.to_string(),
            };
            warn!("{}", e);
            false
        }
    }
}

/// Rate limit for snapshot publishing.
///
/// The first publish falls due one interval after `start`.
#[derive(Debug, Clone)]
pub struct PublishSchedule {
    interval: Duration,
    last: Instant,
}

impl PublishSchedule {
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last: start,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last) >= self.interval
    }

    pub fn mark(&mut self, now: Instant) {
        self.last = now;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
