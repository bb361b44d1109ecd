use super::ValidationError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Strong typing for IDs with phantom types
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    value: String,
    _phantom: PhantomData<T>,
}

/// Marker types for different ID kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceMarker;

/// Type aliases for specific ID types
pub type CaptureId = Id<CaptureMarker>;
pub type SequenceId = Id<SequenceMarker>;

impl<T> Id<T> {
    /// Parse an id, rejecting anything outside `[A-Za-z0-9_-]`
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = normalize_id(input)?;
        Ok(Self {
            value: normalized,
            _phantom: PhantomData,
        })
    }

    /// Get the ID as a string reference
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

fn normalize_id(input: &str) -> Result<String, ValidationError> {
    lazy_static::lazy_static! {
        static ref ID_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
    }

    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::EmptyField("id"));
    }

    if !ID_REGEX.is_match(input) {
        return Err(ValidationError::InvalidId(format!(
            "'{}' contains characters outside [A-Za-z0-9_-]",
            input
        )));
    }

    Ok(input.to_string())
}
