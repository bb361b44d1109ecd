//! Per-capture owner of fetched assets and edge knowledge.
//!
//! The cache is the only writer of its fields. Readers either call the
//! synchronous getters or subscribe to one of the replaying channels; they
//! never touch the fetch machinery directly.

use super::replay::{Replay, Subscription};
use crate::algebras::{AssetSource, FetchError};
use crate::error::CacheError;
use crate::model::{Bitmap, Edge, EdgeStatus, Mesh, SpatialData};
use crate::types::{CaptureId, ImageSize, Warning, WarningLevel};
use futures::future::{self, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Handle to an in-flight (or already settled) cache operation.
///
/// Every caller that asks for the same operation while it is pending gets a
/// clone of the same handle, and all of them observe the same outcome.
pub type PendingFetch = Shared<BoxFuture<'static, Result<(), CacheError>>>;

/// Cancellation handle for one asset kind, tagged with the operation that owns it.
struct AbortSlot {
    op: u64,
    token: CancellationToken,
}

#[derive(Default)]
struct CacheState {
    bitmap: Option<Bitmap>,
    mesh: Option<Mesh>,
    disposed: bool,
    assets_pending: Option<PendingFetch>,
    image_pending: Option<PendingFetch>,
    bitmap_abort: Option<AbortSlot>,
    mesh_abort: Option<AbortSlot>,
    warnings: Vec<Warning>,
    next_op: u64,
}

impl CacheState {
    fn begin_op(&mut self) -> u64 {
        self.next_op += 1;
        self.next_op
    }

    /// Drops the abort handles still owned by `op`.
    fn release_aborts(&mut self, op: u64) {
        if self.bitmap_abort.as_ref().is_some_and(|slot| slot.op == op) {
            self.bitmap_abort = None;
        }
        if self.mesh_abort.as_ref().is_some_and(|slot| slot.op == op) {
            self.mesh_abort = None;
        }
    }
}

/// Owner of one capture's bitmap, mesh and edge statuses.
pub struct AssetCache {
    id: CaptureId,
    source: Arc<dyn AssetSource>,
    image_size: ImageSize,
    lifetime: CancellationToken,
    state: Mutex<CacheState>,
    bitmap_channel: Replay<Option<Bitmap>>,
    sequence_channel: Replay<EdgeStatus>,
    spatial_channel: Replay<EdgeStatus>,
}

impl AssetCache {
    /// Creates an empty cache fetching `ImageSize::default()` bitmaps.
    pub fn new(id: CaptureId, source: Arc<dyn AssetSource>) -> Self {
        Self::with_image_size(id, source, ImageSize::default())
    }

    pub fn with_image_size(
        id: CaptureId,
        source: Arc<dyn AssetSource>,
        image_size: ImageSize,
    ) -> Self {
        Self {
            id,
            source,
            image_size,
            lifetime: CancellationToken::new(),
            state: Mutex::new(CacheState::default()),
            bitmap_channel: Replay::new(None),
            sequence_channel: Replay::new(EdgeStatus::uncached()),
            spatial_channel: Replay::new(EdgeStatus::uncached()),
        }
    }

    pub fn id(&self) -> &CaptureId {
        &self.id
    }

    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }

    // --- Synchronous reads ---

    pub fn bitmap(&self) -> Option<Bitmap> {
        self.state.lock().bitmap.clone()
    }

    pub fn mesh(&self) -> Option<Mesh> {
        self.state.lock().mesh.clone()
    }

    pub fn sequence_edges(&self) -> EdgeStatus {
        self.sequence_channel.current()
    }

    pub fn spatial_edges(&self) -> EdgeStatus {
        self.spatial_channel.current()
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Warnings recorded by recovered failures, oldest first.
    pub fn warnings(&self) -> Vec<Warning> {
        self.state.lock().warnings.clone()
    }

    // --- Change notifications ---

    pub fn watch_bitmap(&self) -> Subscription<Option<Bitmap>> {
        self.bitmap_channel.subscribe()
    }

    pub fn watch_sequence_edges(&self) -> Subscription<EdgeStatus> {
        self.sequence_channel.subscribe()
    }

    pub fn watch_spatial_edges(&self) -> Subscription<EdgeStatus> {
        self.spatial_channel.subscribe()
    }

    // --- Asset fetching ---

    /// Fetches the bitmap and the mesh together.
    ///
    /// A call made while a previous one is pending returns that pending
    /// handle. Captures that are not `merged` get an empty mesh without a
    /// request. Must be called from within a Tokio runtime.
    pub fn cache_assets(self: &Arc<Self>, spatial: &SpatialData, merged: bool) -> PendingFetch {
        let mut state = self.state.lock();
        if state.disposed {
            return settled(Err(CacheError::Disposed(self.id.clone())));
        }
        if let Some(pending) = &state.assets_pending {
            log::debug!("Joining in-flight asset fetch for {}", self.id);
            return pending.clone();
        }

        let op = state.begin_op();

        // An image-only fetch already in flight provides the bitmap.
        let bitmap_source = match &state.image_pending {
            Some(pending) => BitmapSource::Pending(pending.clone()),
            None => {
                let token = self.lifetime.child_token();
                state.bitmap_abort = Some(AbortSlot {
                    op,
                    token: token.clone(),
                });
                BitmapSource::Fetch {
                    url: spatial.image_url_for(self.image_size).clone(),
                    token,
                }
            }
        };

        let mesh_request = match (merged, &spatial.mesh_url) {
            (true, Some(url)) => {
                let token = self.lifetime.child_token();
                state.mesh_abort = Some(AbortSlot {
                    op,
                    token: token.clone(),
                });
                Some((url.clone(), token))
            }
            _ => None,
        };

        log::debug!(
            "Fetching assets for {} (merged: {}, mesh request: {})",
            self.id,
            merged,
            mesh_request.is_some()
        );

        let cache = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = tokio::try_join!(cache.resolve_bitmap(bitmap_source), async {
                Ok::<_, CacheError>(cache.fetch_mesh(mesh_request).await)
            });
            cache.finish_assets(op, outcome)
        });

        let pending = into_pending(task, self.id.clone());
        state.assets_pending = Some(pending.clone());
        pending
    }

    /// Fetches only a bitmap of the given size.
    ///
    /// Settles immediately when a bitmap is already present. While a combined
    /// asset fetch is pending, its handle is returned instead of issuing a
    /// second bitmap request.
    pub fn cache_image(self: &Arc<Self>, spatial: &SpatialData, size: ImageSize) -> PendingFetch {
        let mut state = self.state.lock();
        if state.disposed {
            return settled(Err(CacheError::Disposed(self.id.clone())));
        }
        if state.bitmap.is_some() {
            return settled(Ok(()));
        }
        if let Some(pending) = state.image_pending.as_ref().or(state.assets_pending.as_ref()) {
            log::debug!("Joining in-flight bitmap fetch for {}", self.id);
            return pending.clone();
        }

        let op = state.begin_op();
        let token = self.lifetime.child_token();
        state.bitmap_abort = Some(AbortSlot {
            op,
            token: token.clone(),
        });
        let url = spatial.image_url_for(size).clone();
        log::debug!("Fetching {} image for {}", size, self.id);

        let cache = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = cache.fetch_bitmap(url, token).await;
            cache.finish_image(op, outcome)
        });

        let pending = into_pending(task, self.id.clone());
        state.image_pending = Some(pending.clone());
        pending
    }

    async fn resolve_bitmap(&self, source: BitmapSource) -> Result<Bitmap, CacheError> {
        match source {
            BitmapSource::Fetch { url, token } => self.fetch_bitmap(url, token).await,
            BitmapSource::Pending(pending) => {
                pending.await?;
                self.bitmap()
                    .ok_or_else(|| CacheError::Disposed(self.id.clone()))
            }
        }
    }

    async fn fetch_bitmap(&self, url: Url, token: CancellationToken) -> Result<Bitmap, CacheError> {
        let buffer = tokio::select! {
            _ = token.cancelled() => return Err(CacheError::Cancelled(self.id.clone())),
            result = self.source.fetch_image_buffer(&url, token.clone()) => result?,
        };

        let decoded = tokio::task::spawn_blocking(move || Bitmap::decode(&buffer))
            .await
            .map_err(|e| CacheError::TaskFailed {
                id: self.id.clone(),
                message: e.to_string(),
            })?;

        decoded.map_err(|e| CacheError::Decode {
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }

    /// Mesh failures never fail the operation; they degrade to an empty mesh.
    async fn fetch_mesh(
        &self,
        request: Option<(Url, CancellationToken)>,
    ) -> (Mesh, Option<Warning>) {
        let Some((url, token)) = request else {
            return (Mesh::empty(), None);
        };

        let result = tokio::select! {
            _ = token.cancelled() => Err(FetchError::Aborted { url: url.to_string() }),
            result = self.source.fetch_mesh(&url, token.clone()) => result,
        };

        match result {
            Ok(mesh) => (mesh, None),
            Err(e) if e.is_aborted() => {
                log::debug!("Mesh fetch for {} aborted", self.id);
                (Mesh::empty(), None)
            }
            Err(e) => {
                log::warn!("Failed to fetch mesh for {}: {}", self.id, e);
                let warning = Warning::new(
                    WarningLevel::Warning,
                    format!("mesh unavailable, using empty mesh: {}", e),
                )
                .with_context(self.id.to_string());
                (Mesh::empty(), Some(warning))
            }
        }
    }

    fn finish_assets(
        &self,
        op: u64,
        outcome: Result<(Bitmap, (Mesh, Option<Warning>)), CacheError>,
    ) -> Result<(), CacheError> {
        let mut state = self.state.lock();
        state.release_aborts(op);
        state.assets_pending = None;

        if state.disposed {
            log::debug!("Discarding asset fetch for disposed cache {}", self.id);
            return Err(CacheError::Disposed(self.id.clone()));
        }

        let (bitmap, (mesh, warning)) = outcome.inspect_err(|e| {
            log::debug!("Asset fetch for {} failed: {}", self.id, e);
        })?;

        state.mesh = Some(mesh);
        state.warnings.extend(warning);
        let changed = !state
            .bitmap
            .as_ref()
            .is_some_and(|current| current.same_allocation(&bitmap));
        state.bitmap = Some(bitmap.clone());
        if changed {
            self.bitmap_channel.publish(Some(bitmap));
        }
        Ok(())
    }

    fn finish_image(&self, op: u64, outcome: Result<Bitmap, CacheError>) -> Result<(), CacheError> {
        let mut state = self.state.lock();
        state.release_aborts(op);
        state.image_pending = None;

        if state.disposed {
            log::debug!("Discarding image fetch for disposed cache {}", self.id);
            return Err(CacheError::Disposed(self.id.clone()));
        }

        let bitmap = outcome?;
        state.bitmap = Some(bitmap.clone());
        self.bitmap_channel.publish(Some(bitmap));
        Ok(())
    }

    // --- Edge statuses ---

    /// Marks the sequence edges as known. Subscribers are notified before
    /// this returns.
    pub fn cache_sequence_edges(&self, edges: Vec<Edge>) {
        self.set_status(&self.sequence_channel, EdgeStatus::cached(edges), "sequence");
    }

    pub fn cache_spatial_edges(&self, edges: Vec<Edge>) {
        self.set_status(&self.spatial_channel, EdgeStatus::cached(edges), "spatial");
    }

    pub fn reset_sequence_edges(&self) {
        self.set_status(&self.sequence_channel, EdgeStatus::uncached(), "sequence");
    }

    pub fn reset_spatial_edges(&self) {
        self.set_status(&self.spatial_channel, EdgeStatus::uncached(), "spatial");
    }

    fn set_status(&self, channel: &Replay<EdgeStatus>, status: EdgeStatus, kind: &str) {
        let state = self.state.lock();
        if state.disposed {
            log::debug!("Ignoring {} edge update for disposed cache {}", kind, self.id);
            return;
        }
        channel.publish(status);
    }

    // --- Teardown ---

    /// Cancels in-flight fetches, drops every asset and warning, resets both edge
    /// statuses. Subscribers observe the emptied state once more. Later
    /// completions are discarded. Calling it again is a no-op.
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;

        if let Some(slot) = state.bitmap_abort.take() {
            slot.token.cancel();
        }
        if let Some(slot) = state.mesh_abort.take() {
            slot.token.cancel();
        }
        self.lifetime.cancel();

        state.assets_pending = None;
        state.image_pending = None;
        state.bitmap = None;
        state.mesh = None;
        state.warnings.clear();

        self.bitmap_channel.publish(None);
        self.sequence_channel.publish(EdgeStatus::uncached());
        self.spatial_channel.publish(EdgeStatus::uncached());

        log::debug!("Disposed asset cache for {}", self.id);
    }
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AssetCache")
            .field("id", &self.id)
            .field("has_bitmap", &state.bitmap.is_some())
            .field("has_mesh", &state.mesh.is_some())
            .field("disposed", &state.disposed)
            .finish()
    }
}

/// Where the combined asset fetch gets its bitmap from.
enum BitmapSource {
    Fetch { url: Url, token: CancellationToken },
    Pending(PendingFetch),
}

fn settled(result: Result<(), CacheError>) -> PendingFetch {
    future::ready(result).boxed().shared()
}

fn into_pending(task: JoinHandle<Result<(), CacheError>>, id: CaptureId) -> PendingFetch {
    async move {
        match task.await {
            Ok(result) => result,
            Err(e) => Err(CacheError::TaskFailed {
                id,
                message: e.to_string(),
            }),
        }
    }
    .boxed()
    .shared()
}
