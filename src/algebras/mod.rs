//! Capability algebras for the prefetch subsystem.
//!
//! This module defines algebraic traits that represent **capabilities**,
//! not implementations. Each trait is:
//!
//! - **Object-safe**: can be used as `dyn Trait`
//! - **Documented with laws**: properties that all implementations must satisfy
//! - **Async via `async_trait`**
//!
//! # Architecture
//!
//! ```text
//! Prefetch engine / asset caches
//!         ↓
//! Algebras (this module)
//!         ↓
//! Interpreters (api/, graph/)
//! ```
//!
//! # Capability Traits
//!
//! - [`AssetSource`]: raw, cancellable retrieval of image buffers and meshes
//! - [`GraphService`]: realization of graph nodes with their assets cached
//!
//! # Laws
//!
//! Each trait documents algebraic laws that all implementations must satisfy.
//! These are verified via law tests in each module's test suite.

pub mod assets;
pub mod error;
pub mod graph;

pub use assets::AssetSource;
pub use error::FetchError;
pub use graph::GraphService;
