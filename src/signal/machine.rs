use super::phase::{LightColor, SignalPhase, SignalTiming};
use crate::detector::VehicleCount;
use crate::lane::LaneId;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Decide whether `phase` ends after running for `elapsed`.
///
/// Yellow ends at its fixed budget. Green ends at `green_max`, or once it has
/// run strictly longer than `green_min` while the opposing lane has demand.
pub fn phase_expired(
    phase: SignalPhase,
    elapsed: Duration,
    counts: [VehicleCount; 2],
    timing: &SignalTiming,
) -> bool {
    if !phase.is_green() {
        return elapsed >= timing.yellow;
    }

    let opposing = counts[phase.timed_lane().opposite().position()];
    elapsed >= timing.green_max || (elapsed > timing.green_min && opposing.is_present())
}

/// Whole seconds left in the phase budget, floored at zero
pub fn remaining_seconds(budget: Duration, elapsed: Duration) -> u64 {
    budget.saturating_sub(elapsed).as_secs()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SignalPhase,
    pub to: SignalPhase,
}

/// Derived per-lane outputs for the active phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalStatus {
    pub phase: SignalPhase,
    pub lights: [LightColor; 2],
    pub timers: [u64; 2],
}

impl SignalStatus {
    pub fn light(&self, lane: LaneId) -> LightColor {
        self.lights[lane.position()]
    }

    pub fn timer(&self, lane: LaneId) -> u64 {
        self.timers[lane.position()]
    }
}

pub struct SignalStateMachine {
    timing: SignalTiming,
    phase: SignalPhase,
    phase_started: Instant,
    counts: [VehicleCount; 2],
}

impl SignalStateMachine {
    pub fn new(timing: SignalTiming, now: Instant) -> Self {
        info!(
            "Signal state machine starting in {} (green {}-{}s, yellow {}s)",
            SignalPhase::Lane1Green,
            timing.green_min.as_secs(),
            timing.green_max.as_secs(),
            timing.yellow.as_secs()
        );
        Self {
            timing,
            phase: SignalPhase::Lane1Green,
            phase_started: now,
            counts: [VehicleCount::ZERO; 2],
        }
    }

    /// Record the latest counts and advance at most one phase
    pub fn tick(&mut self, now: Instant, counts: [VehicleCount; 2]) -> Option<Transition> {
        self.counts = counts;
        let elapsed = self.elapsed(now);

        if !phase_expired(self.phase, elapsed, counts, &self.timing) {
            return None;
        }

        let transition = Transition {
            from: self.phase,
            to: self.phase.next(),
        };
        debug!(
            "{} -> {} after {:.1}s (vehicles {} / {})",
            transition.from,
            transition.to,
            elapsed.as_secs_f32(),
            counts[0],
            counts[1]
        );
        self.phase = transition.to;
        self.phase_started = now;
        Some(transition)
    }

    /// Lights and countdowns for the current phase as of `now`
    pub fn status(&self, now: Instant) -> SignalStatus {
        let remaining = remaining_seconds(self.timing.budget(self.phase), self.elapsed(now));
        let mut timers = [0; 2];
        timers[self.phase.timed_lane().position()] = remaining;

        SignalStatus {
            phase: self.phase,
            lights: self.phase.colors(),
            timers,
        }
    }

    pub fn phase(&self) -> SignalPhase {
        self.phase
    }

    pub fn counts(&self) -> [VehicleCount; 2] {
        self.counts
    }

    pub fn timing(&self) -> &SignalTiming {
        &self.timing
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.phase_started)
    }
}
