//! Asset retrieval algebra.
//!
//! Defines the [`AssetSource`] capability: the raw network side of the asset
//! cache. Implementations know nothing about captures, sharing or
//! disposal; they only fetch bytes and meshes and honor cancellation.

use crate::model::Mesh;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::error::FetchError;

/// Raw asset retrieval capability.
///
/// # Laws
///
/// All implementations must satisfy these laws:
///
/// - **L1 (Abort)**: A request whose token is already cancelled does not
///   succeed.
///   ```text
///   token.cancel()
///   fetch_image_buffer(url, token) == Err(_)
///   ```
///
/// - **L2 (Independence)**: Cancelling one request's token does not affect
///   a request made with a different token.
///   ```text
///   t1.cancel()
///   fetch_mesh(url, t2) == fetch_mesh(url, fresh_token)
///   ```
///
/// - **L3 (Determinism)**: Fetching the same URL twice with live tokens
///   yields equal payloads.
///
/// This trait is **object-safe** and can be used as `Arc<dyn AssetSource>`.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Retrieve the encoded image bytes behind `url`.
    async fn fetch_image_buffer(
        &self,
        url: &Url,
        abort: CancellationToken,
    ) -> Result<Vec<u8>, FetchError>;

    /// Retrieve the reconstructed mesh behind `url`.
    async fn fetch_mesh(&self, url: &Url, abort: CancellationToken) -> Result<Mesh, FetchError>;
}
