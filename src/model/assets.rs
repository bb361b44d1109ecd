//! Heavy per-capture assets: the decoded bitmap and the reconstructed mesh.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Reconstructed geometry of a capture. Empty when the capture was never
/// merged into a reconstruction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Flat `[x, y, z, x, y, z, ...]` vertex coordinates.
    pub vertices: Vec<f32>,
    /// Flat triangle vertex indices.
    pub faces: Vec<u32>,
}

impl Mesh {
    pub fn new(vertices: Vec<f32>, faces: Vec<u32>) -> Self {
        Self { vertices, faces }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.faces.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.len() / 3
    }
}

/// Decoded RGBA pixels, shared between the cache and its readers.
#[derive(Clone)]
pub struct Bitmap {
    pixels: Arc<RgbaImage>,
}

impl Bitmap {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    /// Decodes an encoded image buffer (PNG or JPEG).
    pub fn decode(buffer: &[u8]) -> Result<Self, image::ImageError> {
        let decoded = image::load_from_memory(buffer)?;
        Ok(Self::new(decoded.to_rgba8()))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Whether both handles refer to the same decoded allocation.
    pub fn same_allocation(&self, other: &Bitmap) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        self.same_allocation(other) || *self.pixels == *other.pixels
    }
}
