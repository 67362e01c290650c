//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Field keys every lifecycle event carries
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_STORE: &str = "store";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Canonical operation names
pub const OP_CHECK_ENGINE: &str = "check_engine";
pub const OP_OPEN: &str = "open";
pub const OP_VERIFY: &str = "verify";
pub const OP_LIST_TABLES: &str = "list_tables";
pub const OP_FIND_ROWS: &str = "find_rows_matching";
pub const OP_CAPTURE: &str = "capture";
pub const OP_TRANSPLANT: &str = "transplant";
pub const OP_RELEASE: &str = "release";
pub const OP_CLOSE: &str = "close";
pub const OP_RUN: &str = "run";
