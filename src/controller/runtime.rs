use super::traffic::TrafficController;
use super::types::ShutdownReason;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

impl TrafficController {
    /// Tick until the cancellation token fires
    pub async fn run(&mut self) {
        let cancel = self.cancellation_token();
        info!(
            "Traffic controller running (tick every {}ms)",
            self.tick_interval.as_millis()
        );

        while !cancel.is_cancelled() {
            self.tick().await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.tick_interval) => {}
            }
        }

        info!("Control loop stopped after {} ticks", self.ticks);
    }

    /// Run with SIGINT/SIGTERM handling, then release the outputs
    pub async fn run_until_signal(&mut self) -> ShutdownReason {
        let (sender, mut receiver) = oneshot::channel();
        setup_signal_handlers(sender, self.cancellation_token());

        self.run().await;

        let reason = receiver.try_recv().unwrap_or(ShutdownReason::Cancelled);
        info!("Shutdown initiated: {}", reason);
        self.shutdown();
        reason
    }
}

/// Cancel `token` on the first SIGINT or SIGTERM, reporting which one arrived
fn setup_signal_handlers(sender: oneshot::Sender<ShutdownReason>, token: CancellationToken) {
    let sender = Arc::new(Mutex::new(Some(sender)));

    // SIGTERM (systemd stop) - Unix only
    #[cfg(unix)]
    {
        let sender = Arc::clone(&sender);
        let token = token.clone();
        tokio::spawn(async move {
            let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!("Failed to register SIGTERM handler: {}", e);
                    return;
                }
            };
            tokio::select! {
                received = sigterm.recv() => {
                    if received.is_some() {
                        info!("Received SIGTERM signal");
                        notify(&sender, &token, "SIGTERM").await;
                    }
                }
                _ = token.cancelled() => {}
            }
        });
    }

    tokio::spawn(async move {
        tokio::select! {
            received = signal::ctrl_c() => match received {
                Ok(()) => {
                    info!("Received SIGINT signal (Ctrl+C)");
                    notify(&sender, &token, "SIGINT").await;
                }
                Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
            },
            _ = token.cancelled() => {}
        }
    });
}

async fn notify(
    sender: &Mutex<Option<oneshot::Sender<ShutdownReason>>>,
    token: &CancellationToken,
    signal_name: &str,
) {
    if let Some(sender) = sender.lock().await.take() {
        let _ = sender.send(ShutdownReason::Signal(signal_name.to_string()));
    }
    token.cancel();
}
