use serde::{Deserialize, Serialize};
use std::fmt;

/// Vehicles detected in one lane, saturated at [`VehicleCount::MAX`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleCount(u8);

impl VehicleCount {
    pub const MAX: u8 = 9;
    pub const ZERO: VehicleCount = VehicleCount(0);

    /// Clamp a raw detector result into range
    pub fn saturating(raw: usize) -> Self {
        Self(raw.min(Self::MAX as usize) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Any demand at all
    pub fn is_present(self) -> bool {
        self.0 > 0
    }

    pub fn priority(self) -> PriorityLevel {
        classify(self)
    }
}

impl From<VehicleCount> for u8 {
    fn from(count: VehicleCount) -> Self {
        count.0
    }
}

impl fmt::Display for VehicleCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriorityLevel {
    Low,
    Med,
    High,
}

impl PriorityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::Low => "LOW",
            PriorityLevel::Med => "MED",
            PriorityLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify(count: VehicleCount) -> PriorityLevel {
    match count.value() {
        0 => PriorityLevel::Low,
        1..=2 => PriorityLevel::Med,
        _ => PriorityLevel::High,
    }
}
