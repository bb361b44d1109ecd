//! In-memory navigation graph loaded from a JSON fixture.

mod fixture;
mod memory;

pub use fixture::{CaptureRecord, EdgeRecord, GraphFixture, SequenceRecord};
pub use memory::MemoryGraph;
