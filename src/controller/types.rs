use crate::frame::FrameOrigin;
use crate::signal::Transition;
use crate::telemetry::ControllerSnapshot;
use std::fmt;

/// Why the control loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal(String),
    Cancelled,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "received {}", name),
            ShutdownReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Host facilities found at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub native_still: bool,
    pub device_capture: bool,
    pub model_backend: bool,
    pub gpio: bool,
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |available: bool| if available { "yes" } else { "no" };
        write!(
            f,
            "native_still={} device_capture={} model_backend={} gpio={}",
            flag(self.native_still),
            flag(self.device_capture),
            flag(self.model_backend),
            flag(self.gpio)
        )
    }
}

/// Outcome of one control loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub snapshot: ControllerSnapshot,
    pub transition: Option<Transition>,
    pub published: bool,
    pub origins: [FrameOrigin; 2],
}
