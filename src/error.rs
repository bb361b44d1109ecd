// src/error.rs
//! Application error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in the system.
//! Lifecycle misuse of a capture, asset fetch failures and configuration
//! problems each get their own variants so callers can tell a programmer
//! error from a transient network failure.

use crate::algebras::FetchError;
use crate::types::{CaptureId, SequenceId};
use thiserror::Error;

/// Failure of a single asset cache operation.
///
/// Cloneable because one in-flight fetch is shared by every caller that
/// requested it while it was pending.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("Asset fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Could not decode image for {id}: {reason}")]
    Decode { id: CaptureId, reason: String },

    #[error("Asset fetch for {0} was cancelled")]
    Cancelled(CaptureId),

    #[error("Asset cache for {0} has been disposed")]
    Disposed(CaptureId),

    #[error("Asset fetch task for {id} failed: {message}")]
    TaskFailed { id: CaptureId, message: String },
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Capture {0} cannot be completed without spatial data")]
    MissingSpatialData(CaptureId),

    #[error("Capture {0} has already been completed")]
    AlreadyComplete(CaptureId),

    #[error("Capture {0} is not complete; spatial data is unavailable")]
    NotComplete(CaptureId),

    #[error("Capture {0} already has a bound asset cache")]
    CacheAlreadyBound(CaptureId),

    #[error("Capture {0} has no bound asset cache")]
    NoCacheBound(CaptureId),

    #[error("Capture {0} has been disposed")]
    Disposed(CaptureId),

    #[error("Capture {0} is not part of the graph")]
    CaptureNotFound(CaptureId),

    #[error("Sequence {0} is not part of the graph")]
    SequenceNotFound(SequenceId),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("JSON parse error for {path}: {source}")]
    JsonParseError {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    ValidationError(#[from] crate::types::ValidationError),
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        AppError::Cache(CacheError::Fetch(err))
    }
}

impl AppError {
    /// Whether the failure came from a flaky transport and may succeed on a
    /// later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Cache(CacheError::Fetch(err)) => err.is_retryable(),
            AppError::NetworkFailure(_) => true,
            _ => false,
        }
    }
}
