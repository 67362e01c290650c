use thiserror::Error;

/// Result type alias using GraftError
pub type Result<T> = std::result::Result<T, GraftError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code and a process exit code, so that
/// callers can tell failure classes apart without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Lifecycle
    OpenFailed,
    QueryFailed,
    CaptureFailed,
    TransplantFailed,
    CloseFailed,

    // Engine
    /// The linked SQLite library lacks a required capability
    Unsupported,

    // Structural/Validation
    InvalidInput,
    NotFound,
    Config,

    // Integration/IO
    Io,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::OpenFailed => "ERR_OPEN_FAILED",
            ExErrorKind::QueryFailed => "ERR_QUERY_FAILED",
            ExErrorKind::CaptureFailed => "ERR_CAPTURE_FAILED",
            ExErrorKind::TransplantFailed => "ERR_TRANSPLANT_FAILED",
            ExErrorKind::CloseFailed => "ERR_CLOSE_FAILED",
            ExErrorKind::Unsupported => "ERR_UNSUPPORTED",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Process exit code for a run that ended with this kind
    pub fn exit_code(&self) -> i32 {
        match self {
            ExErrorKind::InvalidInput | ExErrorKind::Config => 2,
            ExErrorKind::OpenFailed => 3,
            ExErrorKind::CaptureFailed => 4,
            ExErrorKind::TransplantFailed => 5,
            ExErrorKind::CloseFailed => 6,
            ExErrorKind::QueryFailed => 7,
            ExErrorKind::Unsupported => 8,
            ExErrorKind::NotFound | ExErrorKind::Io | ExErrorKind::Internal => 1,
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification plus the context needed to diagnose a failure
/// without re-running: the operation, the store label and the engine message.
#[derive(Debug, Clone, PartialEq)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    store: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            store: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add store label context
    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the store label context, if any
    pub fn store(&self) -> Option<&str> {
        self.store.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if let Some(store) = &self.store {
            write!(f, " on store '{}'", store)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain failures raised by the transplant subsystem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraftError {
    // ===== Registry =====
    /// The engine rejected the store identifier or the store is unreadable
    #[error("Cannot open store {store} at {location}: {reason}")]
    OpenFailed {
        store: String,
        location: String,
        reason: String,
    },

    /// A store with the same label was already opened in this run
    #[error("Store {store} is already open")]
    AlreadyOpen { store: String },

    /// The store label is unknown to the registry
    #[error("Store not registered: {store}")]
    StoreNotRegistered { store: String },

    /// The store was registered but is no longer open
    #[error("Store {store} is closed")]
    StoreClosed { store: String },

    /// Closing the connection reported an engine error
    #[error("Cannot close store {store}: {reason}")]
    CloseFailed { store: String, reason: String },

    // ===== Verification =====
    /// Preparing, binding or stepping an introspection query failed
    #[error("Query [{query}] failed on store {store}: {reason}")]
    QueryFailed {
        store: String,
        query: String,
        reason: String,
    },

    // ===== Snapshot =====
    /// The engine produced no image for the source store
    #[error("Cannot capture store {store}: {reason}")]
    CaptureFailed { store: String, reason: String },

    /// The image bytes do not form a well-shaped database image
    #[error("Invalid image from {source_store}: {reason}")]
    InvalidImage {
        source_store: String,
        reason: String,
    },

    /// The target rejected the image or could not adopt it
    #[error("Cannot transplant image from {source_store} into {target}: {reason}")]
    TransplantFailed {
        source_store: String,
        target: String,
        reason: String,
    },

    // ===== Engine / configuration =====
    /// The linked SQLite library lacks a required capability
    #[error("SQLite library is unsupported: {reason}")]
    Unsupported { reason: String },

    /// The run plan failed validation
    #[error("Invalid plan: {reason}")]
    InvalidPlan { reason: String },
}

impl From<GraftError> for ExError {
    fn from(err: GraftError) -> Self {
        let message = err.to_string();
        match err {
            GraftError::OpenFailed { store, .. } => ExError::new(ExErrorKind::OpenFailed)
                .with_op("open")
                .with_store(store)
                .with_message(message),

            GraftError::AlreadyOpen { store } => ExError::new(ExErrorKind::OpenFailed)
                .with_op("open")
                .with_store(store)
                .with_message(message),

            GraftError::StoreNotRegistered { store } => ExError::new(ExErrorKind::NotFound)
                .with_store(store)
                .with_message(message),

            GraftError::StoreClosed { store } => ExError::new(ExErrorKind::InvalidInput)
                .with_store(store)
                .with_message(message),

            GraftError::CloseFailed { store, .. } => ExError::new(ExErrorKind::CloseFailed)
                .with_op("close")
                .with_store(store)
                .with_message(message),

            GraftError::QueryFailed { store, .. } => ExError::new(ExErrorKind::QueryFailed)
                .with_op("query")
                .with_store(store)
                .with_message(message),

            GraftError::CaptureFailed { store, .. } => ExError::new(ExErrorKind::CaptureFailed)
                .with_op("capture")
                .with_store(store)
                .with_message(message),

            GraftError::InvalidImage { source_store, .. } => {
                ExError::new(ExErrorKind::TransplantFailed)
                    .with_op("transplant")
                    .with_store(source_store)
                    .with_message(message)
            }

            GraftError::TransplantFailed { target, .. } => {
                ExError::new(ExErrorKind::TransplantFailed)
                    .with_op("transplant")
                    .with_store(target)
                    .with_message(message)
            }

            GraftError::Unsupported { .. } => ExError::new(ExErrorKind::Unsupported)
                .with_op("check_engine")
                .with_message(message),

            GraftError::InvalidPlan { .. } => ExError::new(ExErrorKind::Config)
                .with_op("plan")
                .with_message(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = ExError::new(ExErrorKind::CaptureFailed)
            .with_op("capture")
            .with_store("europe")
            .with_message("out of memory");

        let text = err.to_string();
        assert!(text.starts_with("[ERR_CAPTURE_FAILED]"));
        assert!(text.contains("'capture'"));
        assert!(text.contains("'europe'"));
        assert!(text.ends_with("out of memory"));
    }
}
