//! Domain model: edges, sequences, captures and their assets.

mod assets;
mod capture;
mod edge;
mod sequence;

pub use assets::{Bitmap, Mesh};
pub use capture::{Capture, CoreData, SpatialData};
pub use edge::{Direction, Edge, EdgeStatus, Lane};
pub use sequence::Sequence;
