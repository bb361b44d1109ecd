//! Offline asset source with synthetic payloads, random latency and
//! injectable failures.

use crate::algebras::{AssetSource, FetchError};
use crate::constants::{SIMULATED_BITMAP_SIDE, SIMULATED_LATENCY_MAX_MS, SIMULATED_LATENCY_MIN_MS};
use crate::model::Mesh;
use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use rand::Rng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Cursor;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Asset source that fabricates a small PNG per image URL and a quad per
/// mesh URL.
///
/// Payloads depend only on the URL, so the determinism law holds whenever
/// both failure rates are zero.
#[derive(Debug)]
pub struct SimulatedAssets {
    latency_ms: RangeInclusive<u64>,
    image_failure_rate: f64,
    mesh_failure_rate: f64,
    image_requests: AtomicUsize,
    mesh_requests: AtomicUsize,
}

impl SimulatedAssets {
    pub fn new(latency_ms: RangeInclusive<u64>) -> Self {
        Self {
            latency_ms,
            image_failure_rate: 0.0,
            mesh_failure_rate: 0.0,
            image_requests: AtomicUsize::new(0),
            mesh_requests: AtomicUsize::new(0),
        }
    }

    /// Probability in `[0, 1]` that an image request fails.
    pub fn with_image_failure_rate(mut self, rate: f64) -> Self {
        self.image_failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Probability in `[0, 1]` that a mesh request fails.
    pub fn with_mesh_failure_rate(mut self, rate: f64) -> Self {
        self.mesh_failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn image_requests(&self) -> usize {
        self.image_requests.load(Ordering::Relaxed)
    }

    pub fn mesh_requests(&self) -> usize {
        self.mesh_requests.load(Ordering::Relaxed)
    }

    /// Sleeps for a random latency and rolls for failure. Returns `Err`
    /// when aborted or when the roll fails.
    async fn simulate(
        &self,
        url: &Url,
        failure_rate: f64,
        abort: &CancellationToken,
    ) -> Result<(), FetchError> {
        // ThreadRng is not Send; draw everything before the first await.
        let (latency, fails) = {
            let mut rng = rand::rng();
            let latency = if self.latency_ms.is_empty() {
                *self.latency_ms.start()
            } else {
                rng.random_range(self.latency_ms.clone())
            };
            (latency, rng.random_bool(failure_rate))
        };

        tokio::select! {
            biased;
            _ = abort.cancelled() => {
                return Err(FetchError::Aborted { url: url.to_string() });
            }
            _ = tokio::time::sleep(Duration::from_millis(latency)) => {}
        }

        if fails {
            log::debug!("Simulated failure for {}", url);
            return Err(FetchError::HttpStatus {
                status: 503,
                url: url.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SimulatedAssets {
    fn default() -> Self {
        Self::new(SIMULATED_LATENCY_MIN_MS..=SIMULATED_LATENCY_MAX_MS)
    }
}

#[async_trait]
impl AssetSource for SimulatedAssets {
    async fn fetch_image_buffer(
        &self,
        url: &Url,
        abort: CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        self.image_requests.fetch_add(1, Ordering::Relaxed);
        self.simulate(url, self.image_failure_rate, &abort).await?;
        synthetic_png(url)
    }

    async fn fetch_mesh(&self, url: &Url, abort: CancellationToken) -> Result<Mesh, FetchError> {
        self.mesh_requests.fetch_add(1, Ordering::Relaxed);
        self.simulate(url, self.mesh_failure_rate, &abort).await?;
        Ok(Mesh::new(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            vec![0, 1, 2, 0, 2, 3],
        ))
    }
}

/// A solid-colored PNG whose color is derived from the URL.
fn synthetic_png(url: &Url) -> Result<Vec<u8>, FetchError> {
    let mut hasher = DefaultHasher::new();
    url.as_str().hash(&mut hasher);
    let [r, g, b, ..] = hasher.finish().to_le_bytes();

    let image = RgbaImage::from_pixel(
        SIMULATED_BITMAP_SIDE,
        SIMULATED_BITMAP_SIDE,
        Rgba([r, g, b, 255]),
    );
    let mut encoded = Cursor::new(Vec::new());
    image
        .write_to(&mut encoded, ImageFormat::Png)
        .map_err(|e| FetchError::Other {
            message: format!("encoding synthetic image: {}", e),
        })?;
    Ok(encoded.into_inner())
}
