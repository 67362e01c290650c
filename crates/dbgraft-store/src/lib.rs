//! dbgraft Store - SQLite connections, verification queries and image transplant
//!
//! Provides:
//! - Store opening and engine capability checks
//! - A connection registry with ordered, guaranteed cleanup
//! - Verification queries used as pre/post transplant oracles
//! - Snapshot capture and copying transplant of whole-store images

pub mod db;
pub mod errors;
pub mod registry;
pub mod snapshot;
pub mod verify;

// Re-export key types
pub use errors::Result;
pub use registry::{CloseSummary, ConnectionRegistry, ConnectionState};
pub use snapshot::{capture, transplant, SnapshotBuffer, TransplantOptions};
pub use verify::{find_rows_matching, list_tables, verify, VerificationReport, VerifyOutcome};
