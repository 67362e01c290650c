//! Core types shared across dbgraft facilities
//!
//! This crate provides foundational types used by both error handling
//! and logging facilities:
//!
//! - **Correlation types**: RunId
//! - **Schema constants**: Canonical field keys, event names and operation names

pub mod correlation;
pub mod schema;

pub use correlation::RunId;
