// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role. Reading these constants should tell you how far the
//! prefetcher is allowed to look ahead and how the simulator behaves.

// ---------------------------------------------------------------------------
// Prefetch depth boundaries
// ---------------------------------------------------------------------------

/// Deepest look-ahead along a sequence, in each of the two directions.
pub const MAX_SEQUENCE_DEPTH: u8 = 4;

/// Deepest look-ahead through spherical-to-spherical edges.
pub const MAX_SPHERICAL_DEPTH: u8 = 2;

/// Deepest look-ahead through step edges.
pub const MAX_STEP_DEPTH: u8 = 3;

/// Deepest look-ahead through turn edges.
///
/// A turn lands on a capture facing elsewhere, so a second turn is rarely
/// what the user does next.
pub const MAX_TURN_DEPTH: u8 = 1;

pub const DEFAULT_SEQUENCE_DEPTH: u8 = 2;
pub const DEFAULT_SPHERICAL_DEPTH: u8 = 1;
pub const DEFAULT_STEP_DEPTH: u8 = 1;
pub const DEFAULT_TURN_DEPTH: u8 = 0;

// ---------------------------------------------------------------------------
// Simulation defaults
// ---------------------------------------------------------------------------

/// Lower bound of the simulated per-request latency.
pub const SIMULATED_LATENCY_MIN_MS: u64 = 5;

/// Upper bound of the simulated per-request latency.
pub const SIMULATED_LATENCY_MAX_MS: u64 = 40;

/// Side length of the synthetic bitmaps produced by the simulator.
pub const SIMULATED_BITMAP_SIDE: u32 = 8;

/// How long the simulator lets prefetching run before reporting.
pub const DEFAULT_SETTLE_MS: u64 = 500;
