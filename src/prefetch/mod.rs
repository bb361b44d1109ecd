//! Depth-limited prefetching around the current capture.
//!
//! - [`depth`]: per-lane look-ahead limits and their clamping
//! - [`expand`]: one directional walk through the graph
//! - [`engine`]: the [`Prefetcher`] that restarts walks as the user moves

pub mod depth;
pub mod engine;
pub mod expand;

pub use depth::CacheDepth;
pub use engine::Prefetcher;
pub use expand::{expand, ExpansionReport};
