//! Directed relations between captures and the per-capture knowledge of them.

use crate::types::CaptureId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a navigation edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Next,
    Prev,
    Spherical,
    StepForward,
    StepBackward,
    StepLeft,
    StepRight,
    TurnLeft,
    TurnRight,
    TurnU,
    Similar,
}

impl Direction {
    pub const STEPS: [Direction; 4] = [
        Direction::StepForward,
        Direction::StepBackward,
        Direction::StepLeft,
        Direction::StepRight,
    ];

    pub const TURNS: [Direction; 3] = [Direction::TurnLeft, Direction::TurnRight, Direction::TurnU];

    /// The prefetch lane this direction belongs to, `None` for informational edges.
    pub fn lane(self) -> Option<Lane> {
        match self {
            Direction::Next | Direction::Prev => Some(Lane::Sequence),
            Direction::Spherical => Some(Lane::Spherical),
            Direction::StepForward
            | Direction::StepBackward
            | Direction::StepLeft
            | Direction::StepRight => Some(Lane::Step),
            Direction::TurnLeft | Direction::TurnRight | Direction::TurnU => Some(Lane::Turn),
            Direction::Similar => None,
        }
    }

    /// Whether edges of this direction are stored in the sequence status
    /// rather than the spatial one.
    pub fn is_sequential(self) -> bool {
        matches!(self, Direction::Next | Direction::Prev)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Next => "next",
            Direction::Prev => "prev",
            Direction::Spherical => "spherical",
            Direction::StepForward => "step_forward",
            Direction::StepBackward => "step_backward",
            Direction::StepLeft => "step_left",
            Direction::StepRight => "step_right",
            Direction::TurnLeft => "turn_left",
            Direction::TurnRight => "turn_right",
            Direction::TurnU => "turn_u",
            Direction::Similar => "similar",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Independent prefetch track with its own depth budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    Sequence,
    Spherical,
    Step,
    Turn,
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lane::Sequence => "sequence",
            Lane::Spherical => "spherical",
            Lane::Step => "step",
            Lane::Turn => "turn",
        };
        f.write_str(name)
    }
}

/// Directed relation from one capture to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: CaptureId,
    pub target: CaptureId,
    pub direction: Direction,
    /// Azimuth of the motion from source to target, in radians.
    #[serde(default)]
    pub motion_azimuth: f64,
}

impl Edge {
    pub fn new(source: CaptureId, target: CaptureId, direction: Direction) -> Self {
        Self {
            source,
            target,
            direction,
            motion_azimuth: 0.0,
        }
    }

    pub fn with_motion_azimuth(self, motion_azimuth: f64) -> Self {
        Self {
            motion_azimuth,
            ..self
        }
    }
}

/// Whether the outgoing edges of one category are known yet.
///
/// Values are only built through [`EdgeStatus::uncached`] and
/// [`EdgeStatus::cached`], so an uncached status never carries edges.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeStatus {
    cached: bool,
    edges: Vec<Edge>,
}

impl EdgeStatus {
    pub fn uncached() -> Self {
        Self {
            cached: false,
            edges: Vec::new(),
        }
    }

    pub fn cached(edges: Vec<Edge>) -> Self {
        Self {
            cached: true,
            edges,
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn into_edges(self) -> Vec<Edge> {
        self.edges
    }

    /// Edges of one direction, in stored order.
    pub fn edges_toward(&self, direction: Direction) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.direction == direction)
    }
}

impl Default for EdgeStatus {
    fn default() -> Self {
        Self::uncached()
    }
}
