//! The capture entity: one geotagged image in the navigation graph.
//!
//! A capture always starts with core data (identity, sequence, position).
//! Spatial data arrives once, through [`Capture::complete`], and every
//! accessor that needs it fails fast until then. The heavy assets live in an
//! [`AssetCache`] that is bound exactly once and torn down by
//! [`Capture::uncache`] or [`Capture::dispose`].

use super::assets::{Bitmap, Mesh};
use super::edge::{Edge, EdgeStatus};
use crate::cache::{AssetCache, PendingFetch, Replay, Subscription};
use crate::error::AppError;
use crate::types::{CameraType, CaptureId, ImageSize, LngLat, SequenceId};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// Identity data present from creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreData {
    pub sequence_id: SequenceId,
    pub original_lng_lat: LngLat,
    #[serde(default)]
    pub computed_lng_lat: Option<LngLat>,
}

/// Rich data available once the capture is complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialData {
    pub camera_type: CameraType,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub quality_score: Option<f64>,
    /// Rotation in angle-axis form.
    #[serde(default)]
    pub computed_rotation: [f64; 3],
    /// Whether the capture was merged into a 3D reconstruction.
    #[serde(default)]
    pub merged: bool,
    pub captured_at: DateTime<Utc>,
    pub image_url: Url,
    #[serde(default)]
    pub thumbnails: BTreeMap<ImageSize, Url>,
    #[serde(default)]
    pub mesh_url: Option<Url>,
}

impl SpatialData {
    /// URL of the thumbnail of `size`, falling back to the full image.
    pub fn image_url_for(&self, size: ImageSize) -> &Url {
        self.thumbnails.get(&size).unwrap_or(&self.image_url)
    }
}

#[derive(Debug, Default)]
struct CaptureState {
    core: Option<CoreData>,
    spatial: Option<SpatialData>,
    cache: Option<Arc<AssetCache>>,
}

/// A node of the navigation graph together with its cached assets.
#[derive(Debug)]
pub struct Capture {
    id: CaptureId,
    state: RwLock<CaptureState>,
    /// Flips to `true` once spatial data is decided: completed or disposed.
    settled: Replay<bool>,
}

impl Capture {
    pub fn new(id: CaptureId, core: CoreData) -> Self {
        Self {
            id,
            state: RwLock::new(CaptureState {
                core: Some(core),
                ..Default::default()
            }),
            settled: Replay::new(false),
        }
    }

    pub fn id(&self) -> &CaptureId {
        &self.id
    }

    // --- Lifecycle ---

    pub fn has_core(&self) -> bool {
        self.state.read().core.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.state.read().spatial.is_some()
    }

    pub fn has_cache(&self) -> bool {
        self.state.read().cache.is_some()
    }

    /// Core and spatial data present, cache bound, bitmap and mesh cached.
    pub fn assets_cached(&self) -> bool {
        let state = self.state.read();
        state.core.is_some()
            && state.spatial.is_some()
            && state
                .cache
                .as_ref()
                .is_some_and(|cache| cache.bitmap().is_some() && cache.mesh().is_some())
    }

    /// One-time transition to the complete state.
    pub fn complete(&self, spatial: Option<SpatialData>) -> Result<(), AppError> {
        let spatial = spatial.ok_or_else(|| AppError::MissingSpatialData(self.id.clone()))?;
        let mut state = self.state.write();
        if state.core.is_none() {
            return Err(AppError::Disposed(self.id.clone()));
        }
        if state.spatial.is_some() {
            return Err(AppError::AlreadyComplete(self.id.clone()));
        }
        state.spatial = Some(spatial);
        drop(state);
        self.settled.publish(true);
        Ok(())
    }

    /// Waits until the capture is complete and returns its spatial data.
    ///
    /// Fails with [`AppError::Disposed`] if the capture is disposed first.
    pub async fn wait_for_spatial(&self) -> Result<SpatialData, AppError> {
        let mut settled = self.settled.subscribe();
        let _ = settled.wait_for(|settled| *settled).await;
        self.spatial()
    }

    /// Binds the asset cache. A capture holds at most one cache at a time.
    pub fn bind_cache(&self, cache: Arc<AssetCache>) -> Result<(), AppError> {
        let mut state = self.state.write();
        if state.core.is_none() {
            return Err(AppError::Disposed(self.id.clone()));
        }
        if state.cache.is_some() {
            return Err(AppError::CacheAlreadyBound(self.id.clone()));
        }
        state.cache = Some(cache);
        Ok(())
    }

    /// The bound cache.
    pub fn cache(&self) -> Result<Arc<AssetCache>, AppError> {
        self.state
            .read()
            .cache
            .clone()
            .ok_or_else(|| AppError::NoCacheBound(self.id.clone()))
    }

    /// Disposes and detaches the cache; core and spatial data survive so a
    /// fresh cache can be bound later.
    pub fn uncache(&self) {
        let cache = self.state.write().cache.take();
        if let Some(cache) = cache {
            cache.dispose();
            log::debug!("Uncached capture {}", self.id);
        }
    }

    /// Disposes the cache and clears every field. The capture is unusable
    /// afterwards.
    pub fn dispose(&self) {
        let mut state = self.state.write();
        if let Some(cache) = state.cache.take() {
            cache.dispose();
        }
        state.core = None;
        state.spatial = None;
        drop(state);
        self.settled.publish(true);
        log::debug!("Disposed capture {}", self.id);
    }

    // --- Core accessors ---

    fn with_core<T>(&self, read: impl FnOnce(&CoreData) -> T) -> Result<T, AppError> {
        let state = self.state.read();
        state
            .core
            .as_ref()
            .map(read)
            .ok_or_else(|| AppError::Disposed(self.id.clone()))
    }

    pub fn sequence_id(&self) -> Result<SequenceId, AppError> {
        self.with_core(|core| core.sequence_id.clone())
    }

    pub fn original_lng_lat(&self) -> Result<LngLat, AppError> {
        self.with_core(|core| core.original_lng_lat)
    }

    pub fn computed_lng_lat(&self) -> Result<Option<LngLat>, AppError> {
        self.with_core(|core| core.computed_lng_lat)
    }

    /// Computed position when available, the original one otherwise.
    pub fn lng_lat(&self) -> Result<LngLat, AppError> {
        self.with_core(|core| core.computed_lng_lat.unwrap_or(core.original_lng_lat))
    }

    // --- Spatial accessors ---

    fn with_spatial<T>(&self, read: impl FnOnce(&SpatialData) -> T) -> Result<T, AppError> {
        let state = self.state.read();
        if state.core.is_none() {
            return Err(AppError::Disposed(self.id.clone()));
        }
        state
            .spatial
            .as_ref()
            .map(read)
            .ok_or_else(|| AppError::NotComplete(self.id.clone()))
    }

    pub fn spatial(&self) -> Result<SpatialData, AppError> {
        self.with_spatial(SpatialData::clone)
    }

    pub fn camera_type(&self) -> Result<CameraType, AppError> {
        self.with_spatial(|s| s.camera_type)
    }

    pub fn is_spherical(&self) -> Result<bool, AppError> {
        self.with_spatial(|s| s.camera_type.is_spherical())
    }

    pub fn width(&self) -> Result<u32, AppError> {
        self.with_spatial(|s| s.width)
    }

    pub fn height(&self) -> Result<u32, AppError> {
        self.with_spatial(|s| s.height)
    }

    pub fn quality_score(&self) -> Result<Option<f64>, AppError> {
        self.with_spatial(|s| s.quality_score)
    }

    pub fn computed_rotation(&self) -> Result<[f64; 3], AppError> {
        self.with_spatial(|s| s.computed_rotation)
    }

    pub fn merged(&self) -> Result<bool, AppError> {
        self.with_spatial(|s| s.merged)
    }

    pub fn captured_at(&self) -> Result<DateTime<Utc>, AppError> {
        self.with_spatial(|s| s.captured_at)
    }

    // --- Asset delegation ---

    /// Starts (or joins) the combined bitmap and mesh fetch.
    pub fn cache_assets(&self) -> Result<PendingFetch, AppError> {
        let (cache, spatial) = self.cache_and_spatial()?;
        let merged = spatial.merged;
        Ok(cache.cache_assets(&spatial, merged))
    }

    /// Starts (or joins) a bitmap-only fetch at `size`.
    pub fn cache_image(&self, size: ImageSize) -> Result<PendingFetch, AppError> {
        let (cache, spatial) = self.cache_and_spatial()?;
        Ok(cache.cache_image(&spatial, size))
    }

    fn cache_and_spatial(&self) -> Result<(Arc<AssetCache>, SpatialData), AppError> {
        let spatial = self.spatial()?;
        let cache = self.cache()?;
        Ok((cache, spatial))
    }

    pub fn cache_sequence_edges(&self, edges: Vec<Edge>) -> Result<(), AppError> {
        self.cache()?.cache_sequence_edges(edges);
        Ok(())
    }

    pub fn cache_spatial_edges(&self, edges: Vec<Edge>) -> Result<(), AppError> {
        self.cache()?.cache_spatial_edges(edges);
        Ok(())
    }

    pub fn reset_sequence_edges(&self) -> Result<(), AppError> {
        self.cache()?.reset_sequence_edges();
        Ok(())
    }

    pub fn reset_spatial_edges(&self) -> Result<(), AppError> {
        self.cache()?.reset_spatial_edges();
        Ok(())
    }

    // --- Asset reads ---

    pub fn bitmap(&self) -> Option<Bitmap> {
        self.cache().ok().and_then(|cache| cache.bitmap())
    }

    pub fn mesh(&self) -> Option<Mesh> {
        self.cache().ok().and_then(|cache| cache.mesh())
    }

    /// Sequence edge status; uncached while no cache is bound.
    pub fn sequence_edges(&self) -> EdgeStatus {
        self.cache()
            .map(|cache| cache.sequence_edges())
            .unwrap_or_default()
    }

    /// Spatial edge status; uncached while no cache is bound.
    pub fn spatial_edges(&self) -> EdgeStatus {
        self.cache()
            .map(|cache| cache.spatial_edges())
            .unwrap_or_default()
    }

    pub fn watch_bitmap(&self) -> Result<Subscription<Option<Bitmap>>, AppError> {
        Ok(self.cache()?.watch_bitmap())
    }

    pub fn watch_sequence_edges(&self) -> Result<Subscription<EdgeStatus>, AppError> {
        Ok(self.cache()?.watch_sequence_edges())
    }

    pub fn watch_spatial_edges(&self) -> Result<Subscription<EdgeStatus>, AppError> {
        Ok(self.cache()?.watch_spatial_edges())
    }
}
