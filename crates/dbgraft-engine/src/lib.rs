//! dbgraft Engine - run plans and the transplant orchestrator
//!
//! A run opens every store of a plan, verifies them, captures the source,
//! transplants the image into each target, verifies again, and always
//! finishes with ordered cleanup.

pub mod orchestrator;
pub mod plan;
pub mod report;

pub use orchestrator::{run_plan, run_plan_with, ImageOps, SqliteImageOps};
pub use plan::RunPlan;
pub use report::{CaptureSummary, CleanupReport, RunReport, RunState};
