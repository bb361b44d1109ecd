// tests/common/mod.rs
//! Shared builders and test doubles for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use capture_prefetch::graph::{CaptureRecord, EdgeRecord, SequenceRecord};
use capture_prefetch::{
    AppError, AssetSource, CameraType, Capture, CaptureId, Direction, FetchError, GraphFixture,
    GraphService, LngLat, MemoryGraph, Mesh, SequenceId, SimulatedAssets,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

pub fn id(value: &str) -> CaptureId {
    CaptureId::parse(value).expect("test ids are valid")
}

pub fn ids(values: &[&str]) -> Vec<CaptureId> {
    values.iter().map(|value| id(value)).collect()
}

/// Builds a [`GraphFixture`] one record at a time.
#[derive(Default)]
pub struct FixtureBuilder {
    fixture: GraphFixture,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sequence and a perspective capture for each of its ids.
    pub fn sequence(self, sequence: &str, captures: &[&str]) -> Self {
        self.sequence_of(sequence, captures, CameraType::Perspective)
    }

    pub fn sequence_of(mut self, sequence: &str, captures: &[&str], camera: CameraType) -> Self {
        let sequence_id = SequenceId::parse(sequence).expect("test ids are valid");
        self.fixture.sequences.push(SequenceRecord {
            id: sequence_id.clone(),
            image_ids: ids(captures),
        });
        for capture in captures {
            self.fixture
                .captures
                .push(capture_record(capture, &sequence_id, camera));
        }
        self
    }

    pub fn edge(mut self, source: &str, target: &str, direction: Direction) -> Self {
        self.fixture.spatial_edges.push(EdgeRecord {
            source: id(source),
            target: id(target),
            direction,
            motion_azimuth: 0.0,
        });
        self
    }

    pub fn merged(mut self, capture: &str) -> Self {
        if let Some(record) = self
            .fixture
            .captures
            .iter_mut()
            .find(|record| record.id.as_str() == capture)
        {
            record.merged = true;
        }
        self
    }

    pub fn build(self) -> GraphFixture {
        self.fixture
    }
}

fn capture_record(capture: &str, sequence_id: &SequenceId, camera: CameraType) -> CaptureRecord {
    CaptureRecord {
        id: id(capture),
        sequence_id: sequence_id.clone(),
        lng_lat: LngLat::new(0.0, 0.0),
        computed_lng_lat: None,
        camera_type: camera,
        width: 8,
        height: 8,
        quality_score: None,
        computed_rotation: [0.0; 3],
        merged: false,
        captured_at: chrono::DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp"),
        image_url: Url::parse(&format!("https://assets.test/{}.png", capture))
            .expect("valid url"),
        thumbnails: Default::default(),
        mesh_url: Some(
            Url::parse(&format!("https://assets.test/{}.mesh", capture)).expect("valid url"),
        ),
    }
}

/// A memory graph over instant simulated assets.
pub fn memory_graph(fixture: GraphFixture) -> Arc<MemoryGraph> {
    memory_graph_over(fixture, Arc::new(SimulatedAssets::new(0..=1)))
}

pub fn memory_graph_over(fixture: GraphFixture, source: Arc<dyn AssetSource>) -> Arc<MemoryGraph> {
    Arc::new(MemoryGraph::new(fixture, source).expect("fixture is consistent"))
}

/// Graph service that refuses selected ids and forwards the rest.
pub struct FailingGraph {
    inner: Arc<MemoryGraph>,
    failing: HashSet<CaptureId>,
    failures: AtomicUsize,
}

impl FailingGraph {
    pub fn new(inner: Arc<MemoryGraph>, failing: &[&str]) -> Self {
        Self {
            inner,
            failing: ids(failing).into_iter().collect(),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphService for FailingGraph {
    async fn cache_capture(&self, id: &CaptureId) -> Result<Arc<Capture>, AppError> {
        if self.failing.contains(id) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(FetchError::HttpStatus {
                status: 500,
                url: format!("https://assets.test/{}.png", id),
            }
            .into());
        }
        self.inner.cache_capture(id).await
    }
}

/// Asset source that records every request and can hold them until released.
pub struct RecordingSource {
    image_requests: Mutex<Vec<String>>,
    mesh_requests: AtomicUsize,
    gate: tokio::sync::Semaphore,
    fail_mesh: bool,
    failing_images: HashSet<String>,
}

impl RecordingSource {
    /// Requests complete immediately.
    pub fn open() -> Self {
        Self::with_gate(tokio::sync::Semaphore::MAX_PERMITS, false)
    }

    /// Requests wait until [`RecordingSource::release`] is called.
    pub fn gated() -> Self {
        Self::with_gate(0, false)
    }

    pub fn failing_mesh() -> Self {
        Self::with_gate(tokio::sync::Semaphore::MAX_PERMITS, true)
    }

    /// Image requests for the given captures answer 404; the rest succeed.
    pub fn failing_images(captures: &[&str]) -> Self {
        Self {
            failing_images: captures
                .iter()
                .map(|capture| format!("/{}.png", capture))
                .collect(),
            ..Self::open()
        }
    }

    fn with_gate(permits: usize, fail_mesh: bool) -> Self {
        Self {
            image_requests: Mutex::new(Vec::new()),
            mesh_requests: AtomicUsize::new(0),
            gate: tokio::sync::Semaphore::new(permits),
            fail_mesh,
            failing_images: HashSet::new(),
        }
    }

    pub fn release(&self, requests: usize) {
        self.gate.add_permits(requests);
    }

    pub fn image_requests(&self) -> Vec<String> {
        self.image_requests.lock().clone()
    }

    pub fn mesh_requests(&self) -> usize {
        self.mesh_requests.load(Ordering::SeqCst)
    }

    async fn pass(&self, url: &Url, abort: &CancellationToken) -> Result<(), FetchError> {
        tokio::select! {
            _ = abort.cancelled() => Err(FetchError::Aborted { url: url.to_string() }),
            permit = self.gate.acquire() => {
                permit
                    .map_err(|e| FetchError::Other { message: e.to_string() })?
                    .forget();
                Ok(())
            }
        }
    }
}

#[async_trait]
impl AssetSource for RecordingSource {
    async fn fetch_image_buffer(
        &self,
        url: &Url,
        abort: CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        self.image_requests.lock().push(url.to_string());
        self.pass(url, &abort).await?;
        if self.failing_images.contains(url.path()) {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }
        Ok(png(2, 2))
    }

    async fn fetch_mesh(&self, url: &Url, abort: CancellationToken) -> Result<Mesh, FetchError> {
        self.mesh_requests.fetch_add(1, Ordering::SeqCst);
        self.pass(url, &abort).await?;
        if self.fail_mesh {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }
        Ok(Mesh::new(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], vec![0, 1, 2]))
    }
}

/// A solid PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encoding a PNG in memory");
    out.into_inner()
}

/// Polls `condition` until it holds, panicking after two seconds.
pub async fn eventually(description: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {}", description);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Gives background tasks time to issue any further requests.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

/// Spatial data pointing at `assets.test` URLs for `capture`.
pub fn spatial(capture: &str, merged: bool) -> capture_prefetch::SpatialData {
    let record = capture_record(
        capture,
        &SequenceId::parse("seq").expect("test ids are valid"),
        CameraType::Perspective,
    );
    capture_prefetch::SpatialData {
        merged,
        ..record.spatial()
    }
}

/// A capture in core state.
pub fn core_capture(capture: &str) -> Capture {
    let record = capture_record(
        capture,
        &SequenceId::parse("seq").expect("test ids are valid"),
        CameraType::Perspective,
    );
    Capture::new(id(capture), record.core())
}
