use super::strategy::CaptureStrategy;
use crate::frame::Frame;
use crate::lane::Lane;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, trace};

/// Per-lane frame acquisition over an ordered fallback chain.
///
/// `acquire` never fails: when every strategy misses it serves the lane's last
/// live frame, or a blank frame at the standard resolution. Lanes sharing a
/// camera index take turns on it; distinct indices capture concurrently.
pub struct FrameSource {
    strategies: Vec<Arc<dyn CaptureStrategy>>,
    cache: Mutex<HashMap<String, Frame>>,
    devices: Mutex<HashMap<u32, Arc<AsyncMutex<()>>>>,
    resolution: (u32, u32),
}

impl FrameSource {
    pub fn new(strategies: Vec<Arc<dyn CaptureStrategy>>, resolution: (u32, u32)) -> Self {
        Self {
            strategies,
            cache: Mutex::new(HashMap::new()),
            devices: Mutex::new(HashMap::new()),
            resolution,
        }
    }

    /// Acquire one frame for the lane, first success wins
    pub async fn acquire(&self, lane: &Lane) -> Frame {
        let device = self.device_lock(lane.index);
        let _turn = device.lock().await;

        for strategy in &self.strategies {
            match strategy.capture(lane).await {
                Ok(frame) if !frame.is_empty() => {
                    trace!(
                        "{} captured {}x{} frame for {}",
                        strategy.name(),
                        frame.width(),
                        frame.height(),
                        lane.key
                    );
                    self.cache.lock().insert(lane.key.clone(), frame.clone());
                    return frame;
                }
                Ok(_) => {
                    debug!("{} returned an empty frame for {}", strategy.name(), lane.key);
                }
                Err(e) => {
                    debug!("{} missed for {}: {}", strategy.name(), lane.key, e);
                }
            }
        }

        self.fallback(lane)
    }

    fn device_lock(&self, index: u32) -> Arc<AsyncMutex<()>> {
        Arc::clone(self.devices.lock().entry(index).or_default())
    }

    /// Terminal link of the chain
    pub fn fallback(&self, lane: &Lane) -> Frame {
        match self.cache.lock().get(&lane.key) {
            Some(frame) => {
                trace!("Serving cached frame for {}", lane.key);
                frame.as_cached()
            }
            None => {
                trace!("No frame cached for {}, serving blank frame", lane.key);
                Frame::blank(self.resolution.0, self.resolution.1)
            }
        }
    }

    /// Last live frame captured for the lane
    pub fn cached(&self, lane: &Lane) -> Option<Frame> {
        self.cache.lock().get(&lane.key).cloned()
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}
