use crate::constants::{
    DEFAULT_SEQUENCE_DEPTH, DEFAULT_SPHERICAL_DEPTH, DEFAULT_STEP_DEPTH, DEFAULT_TURN_DEPTH,
    MAX_SEQUENCE_DEPTH, MAX_SPHERICAL_DEPTH, MAX_STEP_DEPTH, MAX_TURN_DEPTH,
};
use crate::model::Lane;
use serde::{Deserialize, Serialize};

/// How many hops each prefetch lane may follow from the current capture.
///
/// Values are stored as configured; [`CacheDepth::clamped`] applies the
/// per-lane maxima at the point of use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDepth {
    pub sequence: u8,
    pub spherical: u8,
    pub step: u8,
    pub turn: u8,
}

impl CacheDepth {
    pub fn new(sequence: u8, spherical: u8, step: u8, turn: u8) -> Self {
        Self {
            sequence,
            spherical,
            step,
            turn,
        }
    }

    /// Every lane limited to its maximum.
    pub fn clamped(self) -> Self {
        Self {
            sequence: self.sequence.min(MAX_SEQUENCE_DEPTH),
            spherical: self.spherical.min(MAX_SPHERICAL_DEPTH),
            step: self.step.min(MAX_STEP_DEPTH),
            turn: self.turn.min(MAX_TURN_DEPTH),
        }
    }

    pub fn is_clamped(self) -> bool {
        self == self.clamped()
    }

    /// Clamped depth of one lane. Step and turn lanes are closed around a
    /// spherical capture, which has no perspective neighbors.
    pub fn for_lane(self, lane: Lane, current_is_spherical: bool) -> u8 {
        let clamped = self.clamped();
        match lane {
            Lane::Sequence => clamped.sequence,
            Lane::Spherical => clamped.spherical,
            Lane::Step if current_is_spherical => 0,
            Lane::Step => clamped.step,
            Lane::Turn if current_is_spherical => 0,
            Lane::Turn => clamped.turn,
        }
    }
}

impl Default for CacheDepth {
    fn default() -> Self {
        Self {
            sequence: DEFAULT_SEQUENCE_DEPTH,
            spherical: DEFAULT_SPHERICAL_DEPTH,
            step: DEFAULT_STEP_DEPTH,
            turn: DEFAULT_TURN_DEPTH,
        }
    }
}
