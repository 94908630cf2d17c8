use crate::config::SignalConfig;
use crate::lane::LaneId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightColor {
    Red,
    Yellow,
    Green,
    Off,
}

impl LightColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            LightColor::Red => "red",
            LightColor::Yellow => "yellow",
            LightColor::Green => "green",
            LightColor::Off => "off",
        }
    }
}

impl fmt::Display for LightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four phases of the cycle, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalPhase {
    Lane1Green,
    Lane1Yellow,
    Lane2Green,
    Lane2Yellow,
}

impl SignalPhase {
    pub fn next(self) -> Self {
        match self {
            SignalPhase::Lane1Green => SignalPhase::Lane1Yellow,
            SignalPhase::Lane1Yellow => SignalPhase::Lane2Green,
            SignalPhase::Lane2Green => SignalPhase::Lane2Yellow,
            SignalPhase::Lane2Yellow => SignalPhase::Lane1Green,
        }
    }

    /// Lane whose countdown this phase drives
    pub fn timed_lane(self) -> LaneId {
        match self {
            SignalPhase::Lane1Green | SignalPhase::Lane1Yellow => LaneId::Lane1,
            SignalPhase::Lane2Green | SignalPhase::Lane2Yellow => LaneId::Lane2,
        }
    }

    pub fn is_green(self) -> bool {
        matches!(self, SignalPhase::Lane1Green | SignalPhase::Lane2Green)
    }

    /// Colors shown on (lane 1, lane 2).
    ///
    /// Lane 2 yellow also shows yellow on lane 1, while lane 1 yellow keeps
    /// lane 2 red. Field installations depend on this pattern.
    pub fn colors(self) -> [LightColor; 2] {
        match self {
            SignalPhase::Lane1Green => [LightColor::Green, LightColor::Red],
            SignalPhase::Lane1Yellow => [LightColor::Yellow, LightColor::Red],
            SignalPhase::Lane2Green => [LightColor::Red, LightColor::Green],
            SignalPhase::Lane2Yellow => [LightColor::Yellow, LightColor::Yellow],
        }
    }

    pub fn color_for(self, lane: LaneId) -> LightColor {
        self.colors()[lane.position()]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalPhase::Lane1Green => "LANE1_GREEN",
            SignalPhase::Lane1Yellow => "LANE1_YELLOW",
            SignalPhase::Lane2Green => "LANE2_GREEN",
            SignalPhase::Lane2Yellow => "LANE2_YELLOW",
        }
    }
}

impl fmt::Display for SignalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase durations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalTiming {
    pub green_max: Duration,
    pub green_min: Duration,
    pub yellow: Duration,
}

impl SignalTiming {
    pub fn from_config(config: &SignalConfig) -> Self {
        Self {
            green_max: Duration::from_secs(config.green_max_seconds),
            green_min: Duration::from_secs(config.green_min_seconds),
            yellow: Duration::from_secs(config.yellow_seconds),
        }
    }

    /// Countdown budget for the phase
    pub fn budget(&self, phase: SignalPhase) -> Duration {
        if phase.is_green() {
            self.green_max
        } else {
            self.yellow
        }
    }
}

impl Default for SignalTiming {
    fn default() -> Self {
        Self {
            green_max: Duration::from_secs(15),
            green_min: Duration::from_secs(5),
            yellow: Duration::from_secs(2),
        }
    }
}
