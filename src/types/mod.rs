use thiserror::Error;

mod domain_types;
mod ids;

pub use domain_types::*;
pub use ids::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid id format: {0}")]
    InvalidId(String),

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),

    #[error("Value out of bounds: {value}, expected {min}..={max}")]
    OutOfBounds { value: f64, min: f64, max: f64 },

    #[error("Invalid range: {start}..{end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("Unknown image size: {0}")]
    UnknownImageSize(String),

    #[error("Malformed {field}: {input}")]
    Malformed { field: &'static str, input: String },
}
