use crate::detector::{PriorityLevel, VehicleCount};
use crate::signal::{LightColor, SignalStatus};
use serde::{Deserialize, Serialize};

/// Everything an observer sees for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub light1_status: LightColor,
    pub light2_status: LightColor,
    pub vehicles1: VehicleCount,
    pub vehicles2: VehicleCount,
    pub timer1: u64,
    pub timer2: u64,
    pub priority1: PriorityLevel,
    pub priority2: PriorityLevel,
}

impl ControllerSnapshot {
    pub fn new(status: &SignalStatus, counts: [VehicleCount; 2]) -> Self {
        Self {
            light1_status: status.lights[0],
            light2_status: status.lights[1],
            vehicles1: counts[0],
            vehicles2: counts[1],
            timer1: status.timers[0],
            timer2: status.timers[1],
            priority1: counts[0].priority(),
            priority2: counts[1].priority(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// One-line operator summary
    pub fn summary(&self) -> String {
        format!(
            "L1={} V1={} | L2={} V2={}",
            self.light1_status, self.vehicles1, self.light2_status, self.vehicles2
        )
    }
}
