//! Whole-store images.
//!
//! ## Responsibilities
//!
//! - Capture a connection's `main` schema into an owned [`SnapshotBuffer`]
//! - Transplant a buffer into another open connection by copy
//! - Release the buffer exactly once, by move
//!
//! ## Non-Responsibilities
//!
//! - Choosing source and targets, ordering, cleanup (handled by `dbgraft-engine`)

pub mod buffer;
pub mod capture;
pub mod transplant;

// Re-export primary types
pub use buffer::{ImageError, ImageHeader, SnapshotBuffer};
pub use capture::capture;
pub use transplant::{transplant, TransplantOptions};
