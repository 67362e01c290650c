//! dbgraft Core - error taxonomy, logging facility and shared model types
//!
//! This crate provides the foundations the other dbgraft crates build on:
//! - Structured error facility (`ExError` / `ExErrorKind`) and the domain
//!   error enum `GraftError`
//! - Canonical logging facility with test capture
//! - Store identity, open modes, row probes and query results

pub mod errors;
pub mod logging_facility;
pub mod model;

// Macros expand to paths below this re-export
pub use dbgraft_core_types as core_types;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, GraftError, Result};
pub use model::{OpenMode, QueryResult, RowProbe, StoreLocation, StoreSpec};
