mod clock;
mod machine;
mod phase;

#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use machine::{
    phase_expired, remaining_seconds, SignalStateMachine, SignalStatus, Transition,
};
pub use phase::{LightColor, SignalPhase, SignalTiming};
