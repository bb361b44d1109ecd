//! Graph realization algebra.
//!
//! The prefetch engine never builds captures itself; it asks a
//! [`GraphService`] for them and relies on the laws below.

use crate::error::AppError;
use crate::model::Capture;
use crate::types::CaptureId;
use async_trait::async_trait;
use std::sync::Arc;

/// Capability to produce graph nodes with their heavy assets in place.
///
/// # Laws
///
/// All implementations must satisfy these laws:
///
/// - **L1 (Assets cached)**: A resolved capture has its assets cached.
///   ```text
///   cache_capture(id) == Ok(capture)
///   capture.assets_cached() == true
///   ```
///
/// - **L2 (Identity)**: The resolved capture has the requested id.
///   ```text
///   cache_capture(id) == Ok(capture)
///   capture.id() == id
///   ```
///
/// - **L3 (Sharing)**: Resolving the same id twice yields the same entity,
///   so its asset cache de-duplicates concurrent fetches.
///   ```text
///   cache_capture(id) == Ok(c1)
///   cache_capture(id) == Ok(c2)
///   Arc::ptr_eq(c1, c2)
///   ```
///
/// This trait is **object-safe** and can be used as `Arc<dyn GraphService>`.
#[async_trait]
pub trait GraphService: Send + Sync {
    /// Resolve `id` to a capture whose bitmap and mesh are cached.
    async fn cache_capture(&self, id: &CaptureId) -> Result<Arc<Capture>, AppError>;
}
