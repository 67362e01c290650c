//! Transplant orchestrator
//!
//! Drives one run through
//! `Initializing → ConnectionsOpen → PreVerified → Captured → Transplanted(k)
//! → PostVerified → Cleanup → Done`.
//!
//! ## Pipeline (in order):
//! 1. Plan validation and engine capability check
//! 2. Open every store in declared order (first failure stops)
//! 3. Verify every open store (failures degrade, never stop)
//! 4. Capture the source
//! 5. Transplant into each target in order (first failure stops)
//! 6. Verify every open store again
//!
//! Forward stages return `Result`. Cleanup runs after the forward sequence
//! whatever its outcome: release the buffer once, then close stores in
//! reverse order of opening.
//!
//! Query results and separators go to the caller's writer; lifecycle
//! events go to `tracing` inside a `run` span carrying the run id.

use std::io::Write;
use std::time::Instant;

use crate::plan::RunPlan;
use crate::report::{CaptureSummary, RunReport, RunState};
use dbgraft_core::core_types::schema::{OP_CHECK_ENGINE, OP_RUN, OP_VERIFY};
use dbgraft_core::errors::{ExError, ExErrorKind};
use dbgraft_core::model::QueryResult;
use dbgraft_core::{log_op_end, log_op_error, log_op_start};
use dbgraft_core_types::RunId;
use dbgraft_store::db::{check_engine, filename_of};
use dbgraft_store::errors::{capture_failed, Result};
use dbgraft_store::{
    verify, ConnectionRegistry, SnapshotBuffer, TransplantOptions, VerificationReport,
    VerifyOutcome,
};
use rusqlite::Connection;

const SEPARATOR: &str = "==============================";

/// Image capture and installation, the two steps a run delegates
///
/// [`SqliteImageOps`] is the real implementation; tests wrap it to inject
/// failures at a chosen target.
pub trait ImageOps {
    /// Capture the whole image of `conn`
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::CaptureFailed`
    fn capture(&self, conn: &Connection, store: &str) -> Result<SnapshotBuffer>;

    /// Install `buffer` as the content of `target`
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::TransplantFailed`
    fn transplant(
        &self,
        buffer: &SnapshotBuffer,
        target: &mut Connection,
        target_name: &str,
        options: TransplantOptions,
    ) -> Result<()>;
}

/// Serialize/deserialize through the linked SQLite library
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteImageOps;

impl ImageOps for SqliteImageOps {
    fn capture(&self, conn: &Connection, store: &str) -> Result<SnapshotBuffer> {
        dbgraft_store::capture(conn, store)
    }

    fn transplant(
        &self,
        buffer: &SnapshotBuffer,
        target: &mut Connection,
        target_name: &str,
        options: TransplantOptions,
    ) -> Result<()> {
        dbgraft_store::transplant(buffer, target, target_name, options)
    }
}

/// Run a plan against the linked SQLite library
pub fn run_plan<W: Write>(plan: &RunPlan, out: &mut W) -> RunReport {
    run_plan_with(plan, &SqliteImageOps, out)
}

/// Run a plan with the given image operations
///
/// Never fails: the forward failure, if any, is recorded in the report
/// next to the cleanup summary.
pub fn run_plan_with<O: ImageOps, W: Write>(plan: &RunPlan, ops: &O, out: &mut W) -> RunReport {
    let run_id = RunId::new();
    let span = tracing::info_span!("run", run_id = %run_id);
    let _entered = span.enter();

    let start = Instant::now();
    log_op_start!(OP_RUN, source = plan.source.as_str(), stores = plan.stores.len() as u64);

    let mut run = Run {
        plan,
        ops,
        out: Printer { out },
        registry: ConnectionRegistry::new(),
        buffer: None,
        report: RunReport::new(run_id),
    };

    if let Err(err) = run.forward() {
        run.report.failure = Some(err);
    }
    run.cleanup();

    let Run { report, .. } = run;
    let failure = report.failure.clone();
    match failure {
        None => {
            log_op_end!(
                OP_RUN,
                duration_ms = start.elapsed().as_millis() as u64,
                transplanted = report.transplanted.len() as u64,
                close_failures = report.cleanup.close_failures.len() as u64
            );
        }
        Some(err) => {
            log_op_error!(
                OP_RUN,
                err,
                duration_ms = start.elapsed().as_millis() as u64,
                transplanted = report.transplanted.len() as u64
            );
        }
    }
    report
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Pre,
    Post,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Pre => "pre",
            Phase::Post => "post",
        }
    }
}

/// Primary output; a failed write is logged and otherwise ignored
struct Printer<'w, W: Write> {
    out: &'w mut W,
}

impl<W: Write> Printer<'_, W> {
    fn line(&mut self, text: impl std::fmt::Display) {
        if let Err(err) = writeln!(self.out, "{}", text) {
            tracing::warn!(error = %err, "Cannot write run output");
        }
    }

    fn separator(&mut self) {
        self.line(SEPARATOR);
    }

    fn rows(&mut self, rows: &QueryResult) {
        for (index, row) in rows.iter().enumerate() {
            self.line(format_args!("{}: [{}]", index + 1, row));
        }
    }

    fn verification(&mut self, phase: Phase, report: &VerificationReport, probe: &str) {
        let tag = phase.label();
        self.separator();
        if let Some(tables) = &report.tables {
            self.line(format_args!("[{}] {}: {} tables", tag, report.store, tables.len()));
            self.rows(tables);
        }
        if let Some(matches) = &report.matches {
            self.line(format_args!("[{}] {}: {}", tag, report.store, probe));
            self.rows(matches);
        }
        match &report.outcome {
            VerifyOutcome::Inspected => {}
            VerifyOutcome::EmptySchema => {
                self.line(format_args!("[{}] {}: no tables", tag, report.store))
            }
            VerifyOutcome::Failed(err) => self.line(format_args!(
                "[{}] {}: verification failed: {}",
                tag, report.store, err
            )),
        }
    }
}

struct Run<'a, 'w, O, W: Write> {
    plan: &'a RunPlan,
    ops: &'a O,
    out: Printer<'w, W>,
    registry: ConnectionRegistry,
    buffer: Option<SnapshotBuffer>,
    report: RunReport,
}

impl<O: ImageOps, W: Write> Run<'_, '_, O, W> {
    fn forward(&mut self) -> Result<()> {
        self.plan.validate()?;
        self.check_engine()?;

        self.open_stores()?;
        self.report.enter(RunState::ConnectionsOpen);

        self.verify_stores(Phase::Pre);
        self.report.enter(RunState::PreVerified);

        self.capture_source()?;
        self.report.enter(RunState::Captured);

        self.transplant_targets()?;

        self.verify_stores(Phase::Post);
        self.report.enter(RunState::PostVerified);
        Ok(())
    }

    fn check_engine(&mut self) -> Result<()> {
        let start = Instant::now();
        log_op_start!(OP_CHECK_ENGINE);
        let info = match check_engine() {
            Ok(info) => info,
            Err(err) => {
                log_op_error!(
                    OP_CHECK_ENGINE,
                    err,
                    duration_ms = start.elapsed().as_millis() as u64
                );
                return Err(err);
            }
        };
        log_op_end!(
            OP_CHECK_ENGINE,
            duration_ms = start.elapsed().as_millis() as u64,
            version = info.version.as_str(),
            version_number = info.version_number,
            threadsafe = info.threadsafe
        );
        self.out.line(format_args!(
            "SQLite {} (threadsafe: {})",
            info.version, info.threadsafe
        ));
        self.report.engine = Some(info);
        Ok(())
    }

    fn open_stores(&mut self) -> Result<()> {
        let plan = self.plan;
        for spec in &plan.stores {
            self.registry.open(spec)?;
            self.report.opened.push(spec.name.clone());
            self.describe_store(&spec.name);
        }
        Ok(())
    }

    fn describe_store(&mut self, name: &str) {
        match self.registry.connection(name).map(filename_of) {
            Ok(Some(filename)) => {
                tracing::info!(store = name, filename = filename.as_str(), "Store filename");
                self.out.line(format_args!("{}: {}", name, filename));
            }
            Ok(None) => {
                tracing::info!(store = name, "Store has no backing file");
                self.out.line(format_args!("{}: (memory)", name));
            }
            Err(err) => tracing::warn!(store = name, error = %err, "Cannot describe store"),
        }
    }

    fn verify_stores(&mut self, phase: Phase) {
        let plan = self.plan;
        let probe = format!(
            "{}.{} LIKE '{}'",
            plan.probe.table, plan.probe.column, plan.probe.pattern
        );
        let names: Vec<String> = self
            .registry
            .open_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        for name in names {
            if let Phase::Post = phase {
                self.describe_store(&name);
            }

            let start = Instant::now();
            log_op_start!(OP_VERIFY, store = name.as_str(), phase = phase.label());
            let report = match self.registry.connection(&name) {
                Ok(conn) => verify(conn, &name, &plan.probe),
                Err(err) => VerificationReport {
                    store: name.clone(),
                    tables: None,
                    matches: None,
                    outcome: VerifyOutcome::Failed(err),
                },
            };
            match &report.outcome {
                VerifyOutcome::Failed(err) => {
                    let err = err.clone();
                    log_op_error!(
                        OP_VERIFY,
                        err,
                        duration_ms = start.elapsed().as_millis() as u64,
                        store = name.as_str(),
                        phase = phase.label()
                    );
                }
                _ => {
                    log_op_end!(
                        OP_VERIFY,
                        duration_ms = start.elapsed().as_millis() as u64,
                        store = name.as_str(),
                        phase = phase.label()
                    );
                }
            }

            self.out.verification(phase, &report, &probe);
            match phase {
                Phase::Pre => self.report.pre_verification.push(report),
                Phase::Post => self.report.post_verification.push(report),
            }
        }
    }

    fn capture_source(&mut self) -> Result<()> {
        let plan = self.plan;
        let source = plan.source.as_str();
        let conn = self.registry.connection(source)?;
        let buffer = self.buffer.insert(self.ops.capture(conn, source)?);

        let header = buffer
            .header()
            .map_err(|e| capture_failed(source, e.to_string()))?;
        let summary = CaptureSummary {
            source: source.to_string(),
            size_bytes: buffer.len(),
            page_size: header.page_size,
            page_count: header.page_count,
            digest: buffer.digest(),
        };

        self.out.separator();
        self.out.line(format_args!(
            "Captured {} bytes from {} ({} pages of {} bytes)",
            summary.size_bytes, summary.source, summary.page_count, summary.page_size
        ));
        self.report.capture = Some(summary);
        Ok(())
    }

    fn transplant_targets(&mut self) -> Result<()> {
        let plan = self.plan;
        let options = TransplantOptions {
            read_only: plan.transplant_read_only,
        };
        let buffer = self.buffer.as_ref().ok_or_else(|| {
            ExError::new(ExErrorKind::Internal)
                .with_op("transplant")
                .with_message("no captured image to transplant")
        })?;

        for target in plan.target_names() {
            let conn = self.registry.connection_mut(target)?;
            self.ops.transplant(buffer, conn, target, options)?;

            self.report.transplanted.push(target.to_string());
            self.report
                .enter(RunState::Transplanted(self.report.transplanted.len()));
            self.out
                .line(format_args!("Transplanted {} into {}", buffer.origin(), target));
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        self.report.enter(RunState::Cleanup);

        if let Some(buffer) = self.buffer.take() {
            self.report.cleanup.released_bytes = buffer.release();
            self.report.cleanup.buffer_released = true;
        }

        let summary = self.registry.close_all();
        self.out.separator();
        for name in &summary.closed {
            self.out.line(format_args!("Closed {}", name));
        }
        for failure in &summary.failures {
            self.out.line(format_args!("Close failed: {}", failure));
        }
        self.report.cleanup.closed = summary.closed;
        self.report.cleanup.close_failures = summary.failures;

        self.report.enter(RunState::Done);
    }
}
