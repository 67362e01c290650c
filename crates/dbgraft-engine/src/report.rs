//! Run reports

use dbgraft_core::errors::{ExError, ExErrorKind};
use dbgraft_core_types::RunId;
use dbgraft_store::db::EngineInfo;
use dbgraft_store::VerificationReport;

/// Orchestrator states, in the order a full run visits them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Initializing,
    ConnectionsOpen,
    PreVerified,
    Captured,
    /// Number of targets transplanted so far
    Transplanted(usize),
    PostVerified,
    Cleanup,
    Done,
}

/// Metadata of the captured image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSummary {
    pub source: String,
    pub size_bytes: usize,
    pub page_size: u32,
    pub page_count: u64,
    /// SHA-256 of the image, lowercase hex
    pub digest: String,
}

/// What the cleanup routine did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupReport {
    /// The captured buffer was released (false when nothing was captured)
    pub buffer_released: bool,
    /// Bytes freed by the release
    pub released_bytes: usize,
    /// Stores closed, in closing order
    pub closed: Vec<String>,
    pub close_failures: Vec<ExError>,
}

/// Everything a run observed, returned whether it succeeded or not
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    /// Every state the run entered, in order
    pub states: Vec<RunState>,
    pub engine: Option<EngineInfo>,
    /// Stores that reached `Open`, in opening order
    pub opened: Vec<String>,
    pub pre_verification: Vec<VerificationReport>,
    pub capture: Option<CaptureSummary>,
    /// Targets that received the image, in transplant order
    pub transplanted: Vec<String>,
    pub post_verification: Vec<VerificationReport>,
    /// The error that stopped the forward sequence
    pub failure: Option<ExError>,
    pub cleanup: CleanupReport,
}

impl RunReport {
    pub(crate) fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            states: vec![RunState::Initializing],
            engine: None,
            opened: Vec::new(),
            pre_verification: Vec::new(),
            capture: None,
            transplanted: Vec::new(),
            post_verification: Vec::new(),
            failure: None,
            cleanup: CleanupReport::default(),
        }
    }

    pub(crate) fn enter(&mut self, state: RunState) {
        tracing::debug!(state = ?state, "Entering run state");
        self.states.push(state);
    }

    pub fn final_state(&self) -> Option<RunState> {
        self.states.last().copied()
    }

    /// Whether the forward sequence reached `PostVerified`
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Kind of the forward failure, if any
    pub fn failure_kind(&self) -> Option<ExErrorKind> {
        self.failure.as_ref().map(ExError::kind)
    }

    pub fn pre_for(&self, store: &str) -> Option<&VerificationReport> {
        self.pre_verification.iter().find(|r| r.store == store)
    }

    pub fn post_for(&self, store: &str) -> Option<&VerificationReport> {
        self.post_verification.iter().find(|r| r.store == store)
    }

    /// Process exit code for this run
    ///
    /// The forward failure wins; close failures only surface on an
    /// otherwise successful run.
    pub fn exit_code(&self) -> i32 {
        match &self.failure {
            Some(err) => err.kind().exit_code(),
            None if !self.cleanup.close_failures.is_empty() => {
                ExErrorKind::CloseFailed.exit_code()
            }
            None => 0,
        }
    }
}
