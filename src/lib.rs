// src/lib.rs
//! capture-prefetch library: asset caching and look-ahead for navigation graphs.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `CacheError`, `FetchError`, `ValidationError`
//! - **Configuration**: `SimulationConfig`, `CacheDepth`
//! - **Domain model**: `Capture`, `Edge`, `EdgeStatus`, `Sequence`, `Bitmap`, `Mesh`
//! - **Domain types**: `CaptureId`, `SequenceId`, `CameraType`, `ImageSize`
//! - **Caching**: `AssetCache`, `Replay`, `Subscription`
//! - **Prefetching**: `Prefetcher`, `expand`
//! - **Interpreters**: `HttpAssetClient`, `SimulatedAssets`, `MemoryGraph`

pub mod algebras;
pub mod api;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod graph;
pub mod model;
pub mod prefetch;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, CacheError};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, SimulationConfig};

// --- Domain Model ---
pub use crate::model::{
    Bitmap, Capture, CoreData, Direction, Edge, EdgeStatus, Lane, Mesh, Sequence, SpatialData,
};

// --- Domain Types ---
pub use crate::types::{
    CameraType, CaptureId, ImageSize, LngLat, SequenceId, Warning, WarningLevel,
};

// --- Caching ---
pub use crate::cache::{AssetCache, PendingFetch, Replay, Subscription};

// --- Prefetching ---
pub use crate::prefetch::{expand, CacheDepth, ExpansionReport, Prefetcher};

// --- Interpreters ---
pub use crate::api::{HttpAssetClient, SimulatedAssets};
pub use crate::graph::{GraphFixture, MemoryGraph};

// --- Algebras (Capability Traits) ---
pub use crate::algebras::{AssetSource, FetchError, GraphService};
