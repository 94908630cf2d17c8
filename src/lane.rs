use crate::config::LanesConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two signaled directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaneId {
    Lane1,
    Lane2,
}

impl LaneId {
    pub const ALL: [LaneId; 2] = [LaneId::Lane1, LaneId::Lane2];

    pub fn opposite(&self) -> LaneId {
        match self {
            LaneId::Lane1 => LaneId::Lane2,
            LaneId::Lane2 => LaneId::Lane1,
        }
    }

    pub fn position(&self) -> usize {
        match self {
            LaneId::Lane1 => 0,
            LaneId::Lane2 => 1,
        }
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneId::Lane1 => write!(f, "lane1"),
            LaneId::Lane2 => write!(f, "lane2"),
        }
    }
}

/// Lane identity: which capture source feeds it and its stable label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    pub id: LaneId,
    pub index: u32,
    pub key: String,
}

impl Lane {
    pub fn new(id: LaneId, index: u32, key: impl Into<String>) -> Self {
        Self {
            id,
            index,
            key: key.into(),
        }
    }

    /// Both lanes, in lane order, from configuration
    pub fn pair_from_config(config: &LanesConfig) -> [Lane; 2] {
        [
            Lane::new(LaneId::Lane1, config.lane1_index, config.lane1_key.clone()),
            Lane::new(LaneId::Lane2, config.lane2_index, config.lane2_key.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SemaforConfig;

    #[test]
    fn test_opposite_lane() {
        assert_eq!(LaneId::Lane1.opposite(), LaneId::Lane2);
        assert_eq!(LaneId::Lane2.opposite(), LaneId::Lane1);
    }

    #[test]
    fn test_pair_from_config() {
        let mut config = SemaforConfig::default();
        config.lanes.lane2_index = 1;
        let [lane1, lane2] = Lane::pair_from_config(&config.lanes);

        assert_eq!(lane1.id, LaneId::Lane1);
        assert_eq!(lane1.key, "lane1");
        assert_eq!(lane2.index, 1);
        assert_eq!(lane2.id.position(), 1);
    }
}
