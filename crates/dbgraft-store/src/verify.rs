//! Verification queries
//!
//! Two read-only introspection queries used before and after a transplant:
//! the table list and a LIKE match over one column. Results are compared
//! across stores, so values keep the engine's row order.

use std::time::Instant;

use crate::errors::{query_failed, Result};
use dbgraft_core::core_types::schema::{OP_FIND_ROWS, OP_LIST_TABLES};
use dbgraft_core::errors::{ExError, ExErrorKind};
use dbgraft_core::model::{QueryResult, RowProbe};
use dbgraft_core::{log_op_end, log_op_error, log_op_start};
use rusqlite::types::ValueRef;
use rusqlite::{CachedStatement, Connection};

/// Enumerates every table of the main schema
pub const LIST_TABLES_SQL: &str = "SELECT name FROM sqlite_master WHERE type='table'";

/// A cached statement that logs its release
///
/// The statement is reset and handed back to the connection's cache when
/// this guard drops, on success and on every early return.
struct ScopedStatement<'conn, 'a> {
    stmt: CachedStatement<'conn>,
    store: &'a str,
    query: &'a str,
}

impl Drop for ScopedStatement<'_, '_> {
    fn drop(&mut self) {
        tracing::debug!(store = self.store, query = self.query, "Released statement");
    }
}

/// Render one scalar as text
///
/// Integers and reals in decimal, NULL as `NULL`, blobs as lowercase hex.
pub fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => hex::encode(b),
    }
}

/// Quote an identifier for interpolation into SQL
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Prepare, bind and step a single-column query
///
/// Statements come from the connection's cache, so a repeated query reuses
/// its compiled form. Partial results are discarded on any failure.
fn run_text_query(
    conn: &Connection,
    store: &str,
    sql: &str,
    params: &[&str],
) -> Result<QueryResult> {
    let stmt = conn
        .prepare_cached(sql)
        .map_err(|e| query_failed(store, sql, "prepare", e))?;
    tracing::debug!(store = store, query = sql, "Prepared statement");
    let mut scoped = ScopedStatement {
        stmt,
        store,
        query: sql,
    };

    for (index, param) in params.iter().enumerate() {
        scoped
            .stmt
            .raw_bind_parameter(index + 1, *param)
            .map_err(|e| query_failed(store, sql, "bind", e))?;
        tracing::debug!(
            store = store,
            index = index + 1,
            len = param.len(),
            value = *param,
            "Bound statement parameter"
        );
    }

    let mut values = Vec::new();
    let mut rows = scoped.stmt.raw_query();
    while let Some(row) = rows
        .next()
        .map_err(|e| query_failed(store, sql, "fetch", e))?
    {
        let value = row
            .get_ref(0)
            .map_err(|e| query_failed(store, sql, "fetch", e))?;
        values.push(render_value(value));
    }

    Ok(QueryResult::new(values))
}

fn logged(
    op: &str,
    store: &str,
    run: impl FnOnce() -> Result<QueryResult>,
) -> Result<QueryResult> {
    let start = Instant::now();
    log_op_start!(op, store = store);
    match run() {
        Ok(result) => {
            log_op_end!(
                op,
                duration_ms = start.elapsed().as_millis() as u64,
                store = store,
                rows = result.len() as u64
            );
            Ok(result)
        }
        Err(err) => {
            log_op_error!(
                op,
                err,
                duration_ms = start.elapsed().as_millis() as u64,
                store = store
            );
            Err(err)
        }
    }
}

/// Names of every table in the connection's schema
///
/// ## Errors
///
/// - `ExErrorKind::QueryFailed`: prepare or fetch failed
pub fn list_tables(conn: &Connection, store: &str) -> Result<QueryResult> {
    logged(OP_LIST_TABLES, store, || {
        run_text_query(conn, store, LIST_TABLES_SQL, &[])
    })
}

/// Values of `probe.column` in `probe.table` that match `probe.pattern`
///
/// The pattern is bound as a parameter; table and column are quoted
/// identifiers. The column is qualified with its table, so a column the
/// table lacks fails to prepare instead of reading as a string literal.
///
/// ## Errors
///
/// - `ExErrorKind::QueryFailed`: prepare, bind or fetch failed (for
///   example, the table does not exist)
pub fn find_rows_matching(conn: &Connection, store: &str, probe: &RowProbe) -> Result<QueryResult> {
    let table = quote_identifier(&probe.table);
    let sql = format!(
        "SELECT {table}.{column} FROM {table} WHERE {table}.{column} LIKE ?1",
        column = quote_identifier(&probe.column),
        table = table,
    );
    logged(OP_FIND_ROWS, store, || {
        run_text_query(conn, store, &sql, &[probe.pattern.as_str()])
    })
}

/// What a verification pass learned about one store
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// Tables listed and the probe ran
    Inspected,
    /// No tables; the probe was skipped
    EmptySchema,
    /// A query failed; nothing past that point is known
    Failed(ExError),
}

/// Result of running both verification queries against one store
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub store: String,
    pub tables: Option<QueryResult>,
    pub matches: Option<QueryResult>,
    pub outcome: VerifyOutcome,
}

impl VerificationReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, VerifyOutcome::Failed(_))
    }

    /// Failure kind, when the pass failed
    pub fn failure_kind(&self) -> Option<ExErrorKind> {
        match &self.outcome {
            VerifyOutcome::Failed(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// List tables, then run the probe unless the schema is empty
///
/// Query failures are recorded in the report instead of returned.
/// An empty table list is not distinguished from a schema the
/// connection cannot see.
pub fn verify(conn: &Connection, store: &str, probe: &RowProbe) -> VerificationReport {
    let mut report = VerificationReport {
        store: store.to_string(),
        tables: None,
        matches: None,
        outcome: VerifyOutcome::Inspected,
    };

    let tables = match list_tables(conn, store) {
        Ok(tables) => tables,
        Err(err) => {
            report.outcome = VerifyOutcome::Failed(err);
            return report;
        }
    };
    let empty = tables.is_empty();
    report.tables = Some(tables);
    if empty {
        tracing::info!(store = store, "No tables; skipping row probe");
        report.outcome = VerifyOutcome::EmptySchema;
        return report;
    }

    match find_rows_matching(conn, store, probe) {
        Ok(matches) => report.matches = Some(matches),
        Err(err) => report.outcome = VerifyOutcome::Failed(err),
    }
    report
}
