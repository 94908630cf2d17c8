use super::publisher::TelemetryPublisher;
use super::snapshot::ControllerSnapshot;
use crate::error::TelemetryError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// In-process fan-out of JSON messages grouped by topic.
///
/// Observers join a topic by subscribing and leave by dropping the receiver.
/// The most recent message per topic is kept for late joiners.
pub struct TelemetryHub {
    capacity: usize,
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
    latest: RwLock<HashMap<String, String>>,
}

impl TelemetryHub {
    pub fn new(capacity: usize) -> Self {
        info!("Telemetry hub created (capacity {})", capacity);
        Self {
            capacity: capacity.max(1),
            channels: RwLock::new(HashMap::new()),
            latest: RwLock::new(HashMap::new()),
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<String> {
        if let Some(sender) = self.channels.read().get(topic) {
            return sender.clone();
        }
        self.channels
            .write()
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<String> {
        debug!("New subscriber on topic '{}'", topic);
        self.sender(topic).subscribe()
    }

    /// Deliver a raw message, returning how many subscribers received it
    pub fn send(&self, topic: &str, message: String) -> usize {
        self.latest
            .write()
            .insert(topic.to_string(), message.clone());

        match self.sender(topic).send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!("No subscribers on topic '{}'", topic);
                0
            }
        }
    }

    pub fn latest(&self, topic: &str) -> Option<String> {
        self.latest.read().get(topic).cloned()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.channels
            .read()
            .get(topic)
            .map_or(0, |sender| sender.receiver_count())
    }
}

#[async_trait]
impl TelemetryPublisher for TelemetryHub {
    async fn publish(
        &self,
        topic: &str,
        snapshot: &ControllerSnapshot,
    ) -> Result<usize, TelemetryError> {
        let message = snapshot.to_json()?;
        Ok(self.send(topic, message))
    }
}
