use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Geographic position in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// Projection model of the camera that produced a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraType {
    Perspective,
    Fisheye,
    Spherical,
}

impl CameraType {
    /// Spherical captures have no perspective step or turn neighbors.
    pub fn is_spherical(self) -> bool {
        matches!(self, CameraType::Spherical)
    }
}

/// Thumbnail resolution requested from the asset source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "256")]
    Size256,
    #[serde(rename = "1024")]
    Size1024,
    #[serde(rename = "2048")]
    Size2048,
    #[serde(rename = "original")]
    Original,
}

impl ImageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Size256 => "256",
            ImageSize::Size1024 => "1024",
            ImageSize::Size2048 => "2048",
            ImageSize::Original => "original",
        }
    }

    /// Pixel length of the longest side, `None` for the original upload.
    pub fn max_dimension(self) -> Option<u32> {
        match self {
            ImageSize::Size256 => Some(256),
            ImageSize::Size1024 => Some(1024),
            ImageSize::Size2048 => Some(2048),
            ImageSize::Original => None,
        }
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        ImageSize::Size1024
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "256" => Ok(ImageSize::Size256),
            "1024" => Ok(ImageSize::Size1024),
            "2048" => Ok(ImageSize::Size2048),
            "original" => Ok(ImageSize::Original),
            other => Err(ValidationError::UnknownImageSize(other.to_string())),
        }
    }
}

/// Warning message with structured information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub level: WarningLevel,
    pub message: String,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningLevel {
    Info,
    Warning,
    Error,
}

impl Warning {
    pub fn new(level: WarningLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.level, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, " ({})", ctx)?;
        }
        Ok(())
    }
}
