//! Graph service over a fully loaded [`GraphFixture`].

use super::fixture::GraphFixture;
use crate::algebras::{AssetSource, GraphService};
use crate::cache::AssetCache;
use crate::error::AppError;
use crate::model::{Capture, Direction, Edge, Sequence, SpatialData};
use crate::types::{CaptureId, ImageSize, SequenceId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory graph: every capture exists in core state up front and is
/// completed, bound and cached on first request.
pub struct MemoryGraph {
    captures: HashMap<CaptureId, Arc<Capture>>,
    spatial: HashMap<CaptureId, SpatialData>,
    sequences: HashMap<SequenceId, Sequence>,
    spatial_edges: HashMap<CaptureId, Vec<Edge>>,
    source: Arc<dyn AssetSource>,
    image_size: ImageSize,
    requests: DashMap<CaptureId, usize>,
}

impl MemoryGraph {
    pub fn new(fixture: GraphFixture, source: Arc<dyn AssetSource>) -> Result<Self, AppError> {
        Self::with_image_size(fixture, source, ImageSize::default())
    }

    pub fn with_image_size(
        fixture: GraphFixture,
        source: Arc<dyn AssetSource>,
        image_size: ImageSize,
    ) -> Result<Self, AppError> {
        fixture.validate()?;

        let sequences = fixture
            .sequences
            .iter()
            .map(|record| (record.id.clone(), record.to_sequence()))
            .collect();

        let mut captures = HashMap::new();
        let mut spatial = HashMap::new();
        for record in &fixture.captures {
            captures.insert(
                record.id.clone(),
                Arc::new(Capture::new(record.id.clone(), record.core())),
            );
            spatial.insert(record.id.clone(), record.spatial());
        }

        let mut spatial_edges: HashMap<CaptureId, Vec<Edge>> = HashMap::new();
        for record in &fixture.spatial_edges {
            spatial_edges
                .entry(record.source.clone())
                .or_default()
                .push(record.to_edge());
        }

        Ok(Self {
            captures,
            spatial,
            sequences,
            spatial_edges,
            source,
            image_size,
            requests: DashMap::new(),
        })
    }

    /// The capture entity for `id`, whatever its state.
    pub fn capture(&self, id: &CaptureId) -> Option<Arc<Capture>> {
        self.captures.get(id).cloned()
    }

    /// How often `cache_capture` was asked for `id`.
    pub fn request_count(&self, id: &CaptureId) -> usize {
        self.requests.get(id).map(|count| *count).unwrap_or(0)
    }

    /// Every requested id with its request count, sorted by id.
    pub fn requests(&self) -> Vec<(CaptureId, usize)> {
        let mut requests: Vec<_> = self
            .requests
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        requests.sort();
        requests
    }

    /// Disposes every capture's cache so it can be cached again.
    pub fn uncache_all(&self) {
        for capture in self.captures.values() {
            capture.uncache();
        }
    }

    /// Completes the capture and binds a cache, tolerating a concurrent
    /// request having done either first.
    fn prepare(&self, capture: &Capture) -> Result<(), AppError> {
        let id = capture.id();
        if !capture.is_complete() {
            let spatial = self.spatial.get(id).cloned();
            match capture.complete(spatial) {
                Ok(()) | Err(AppError::AlreadyComplete(_)) => {}
                Err(e) => return Err(e),
            }
        }
        if !capture.has_cache() {
            let cache = AssetCache::with_image_size(
                id.clone(),
                Arc::clone(&self.source),
                self.image_size,
            );
            match capture.bind_cache(Arc::new(cache)) {
                Ok(()) | Err(AppError::CacheAlreadyBound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn sequence_edges_of(&self, capture: &Capture) -> Result<Vec<Edge>, AppError> {
        let sequence_id = capture.sequence_id()?;
        let sequence = self
            .sequences
            .get(&sequence_id)
            .ok_or(AppError::SequenceNotFound(sequence_id))?;

        let id = capture.id();
        let next = sequence
            .find_next_id(id)
            .map(|target| Edge::new(id.clone(), target.clone(), Direction::Next));
        let prev = sequence
            .find_prev_id(id)
            .map(|target| Edge::new(id.clone(), target.clone(), Direction::Prev));
        Ok(next.into_iter().chain(prev).collect())
    }
}

#[async_trait]
impl GraphService for MemoryGraph {
    async fn cache_capture(&self, id: &CaptureId) -> Result<Arc<Capture>, AppError> {
        *self.requests.entry(id.clone()).or_insert(0) += 1;

        let capture = self
            .capture(id)
            .ok_or_else(|| AppError::CaptureNotFound(id.clone()))?;
        self.prepare(&capture)?;
        if !capture.assets_cached() {
            capture.cache_assets()?.await?;
        }

        if !capture.sequence_edges().is_cached() {
            capture.cache_sequence_edges(self.sequence_edges_of(&capture)?)?;
        }
        if !capture.spatial_edges().is_cached() {
            let edges = self.spatial_edges.get(id).cloned().unwrap_or_default();
            capture.cache_spatial_edges(edges)?;
        }

        log::debug!("Cached capture {}", id);
        Ok(capture)
    }
}
