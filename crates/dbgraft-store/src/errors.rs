//! Error handling for dbgraft-store
//!
//! Wraps dbgraft-core ExError with store-specific helpers

use dbgraft_core::errors::{ExError, ExErrorKind, GraftError};
use dbgraft_core::model::StoreSpec;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create an open error for a store the engine rejected
pub fn open_failed(spec: &StoreSpec, err: rusqlite::Error) -> ExError {
    GraftError::OpenFailed {
        store: spec.name.clone(),
        location: spec.location.to_string(),
        reason: err.to_string(),
    }
    .into()
}

/// Create a query error; `stage` is prepare, bind or fetch
pub fn query_failed(store: &str, query: &str, stage: &str, err: rusqlite::Error) -> ExError {
    GraftError::QueryFailed {
        store: store.to_string(),
        query: query.to_string(),
        reason: format!("{} failed: {}", stage, err),
    }
    .into()
}

/// Create a capture error
pub fn capture_failed(store: &str, reason: impl Into<String>) -> ExError {
    GraftError::CaptureFailed {
        store: store.to_string(),
        reason: reason.into(),
    }
    .into()
}

/// Create a transplant error
pub fn transplant_failed(source_store: &str, target: &str, reason: impl Into<String>) -> ExError {
    GraftError::TransplantFailed {
        source_store: source_store.to_string(),
        target: target.to_string(),
        reason: reason.into(),
    }
    .into()
}

/// Create a close error
pub fn close_failed(store: &str, err: rusqlite::Error) -> ExError {
    GraftError::CloseFailed {
        store: store.to_string(),
        reason: err.to_string(),
    }
    .into()
}

/// Create a database error from rusqlite::Error with no better classification
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op("sqlite")
        .with_message(err.to_string())
}
