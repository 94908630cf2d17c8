use super::traffic::TrafficController;
use tracing::info;

impl TrafficController {
    /// Stop background services and turn every light off. Idempotent.
    pub fn shutdown(&mut self) {
        if self.lights.is_released() {
            return;
        }
        info!("Beginning graceful shutdown");

        self.cancellation_token.cancel();
        self.lights.release();

        info!("Graceful shutdown completed after {} ticks", self.ticks);
    }
}
