// src/api/mod.rs
//! Asset transport: the ability to retrieve raw bitmaps and meshes.
//!
//! Business logic depends on [`AssetSource`](crate::algebras::AssetSource),
//! never on these interpreters. [`HttpAssetClient`] talks to a real asset
//! host; [`SimulatedAssets`] fabricates payloads for offline runs.

pub mod client;
pub mod parser;
pub mod simulated;

pub use client::{ApiResponse, HttpAssetClient};
pub use parser::{check_status, parse_mesh_response};
pub use simulated::SimulatedAssets;
