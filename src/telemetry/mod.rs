mod hub;
mod publisher;
#[cfg(feature = "streaming")]
mod server;
mod snapshot;


pub use hub::TelemetryHub;
pub use publisher::{publish_best_effort, PublishSchedule, TelemetryPublisher};
#[cfg(feature = "streaming")]
pub use server::TelemetryServer;
pub use snapshot::ControllerSnapshot;
