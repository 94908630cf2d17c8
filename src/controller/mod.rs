mod builder;
mod runtime;
mod shutdown;
mod startup;
mod traffic;
mod types;

#[cfg(test)]
mod tests;

pub use builder::TrafficControllerBuilder;
pub use traffic::TrafficController;
pub use types::{Capabilities, ShutdownReason, TickReport};
