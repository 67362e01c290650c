//! Connection registry
//!
//! Owns every connection of a run, in the order the stores were opened.
//! Other components only ever see `&Connection` / `&mut Connection`
//! borrowed from here.
//!
//! ## Invariants
//!
//! - A store label (and a file location) is opened at most once per registry
//! - Every connection that reached `Open` is closed exactly once
//! - Closing sweeps in reverse order of opening, and never stops early
//! - Dropping the registry sweeps whatever is still open

use std::time::Instant;

use crate::db;
use crate::errors::{close_failed, Result};
use dbgraft_core::core_types::schema::{OP_CLOSE, OP_OPEN};
use dbgraft_core::errors::{ExError, GraftError};
use dbgraft_core::model::StoreSpec;
use dbgraft_core::{log_op_end, log_op_error, log_op_start};
use rusqlite::Connection;

/// Lifecycle state of a registered store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

struct RegistryEntry {
    spec: StoreSpec,
    conn: Option<Connection>,
}

impl RegistryEntry {
    fn state(&self) -> ConnectionState {
        if self.conn.is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }
}

/// Outcome of a close sweep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloseSummary {
    /// Labels closed by this sweep, in the order they were closed
    pub closed: Vec<String>,
    /// Close failures; the sweep continued past each of them
    pub failures: Vec<ExError>,
}

impl CloseSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ordered set of named connections owned for the duration of a run
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: Vec<RegistryEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store and remember it for cleanup
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::OpenFailed`: label or file already registered, or
    ///   the engine rejected the store
    pub fn open(&mut self, spec: &StoreSpec) -> Result<&Connection> {
        let start = Instant::now();
        log_op_start!(OP_OPEN, store = spec.name.as_str(), location = %spec.location);

        if let Err(err) = self.check_unregistered(spec) {
            log_op_error!(
                OP_OPEN,
                err,
                duration_ms = start.elapsed().as_millis() as u64,
                store = spec.name.as_str()
            );
            return Err(err);
        }

        let conn = match db::open_store(spec) {
            Ok(conn) => conn,
            Err(err) => {
                log_op_error!(
                    OP_OPEN,
                    err,
                    duration_ms = start.elapsed().as_millis() as u64,
                    store = spec.name.as_str()
                );
                return Err(err);
            }
        };

        log_op_end!(
            OP_OPEN,
            duration_ms = start.elapsed().as_millis() as u64,
            store = spec.name.as_str(),
            mode = ?spec.effective_mode()
        );

        self.entries.push(RegistryEntry {
            spec: spec.clone(),
            conn: Some(conn),
        });
        let entry = self.entries.last().and_then(|e| e.conn.as_ref());
        entry.ok_or_else(|| {
            GraftError::StoreNotRegistered {
                store: spec.name.clone(),
            }
            .into()
        })
    }

    fn check_unregistered(&self, spec: &StoreSpec) -> Result<()> {
        let clash = self.entries.iter().any(|entry| {
            entry.spec.name == spec.name
                || (!spec.location.is_memory() && entry.spec.location == spec.location)
        });
        if clash {
            return Err(GraftError::AlreadyOpen {
                store: spec.name.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn entry(&self, name: &str) -> Result<&RegistryEntry> {
        self.entries
            .iter()
            .find(|e| e.spec.name == name)
            .ok_or_else(|| {
                GraftError::StoreNotRegistered {
                    store: name.to_string(),
                }
                .into()
            })
    }

    /// Borrow an open connection
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::NotFound`: label never opened
    /// - `ExErrorKind::InvalidInput`: store already closed
    pub fn connection(&self, name: &str) -> Result<&Connection> {
        self.entry(name)?.conn.as_ref().ok_or_else(|| {
            GraftError::StoreClosed {
                store: name.to_string(),
            }
            .into()
        })
    }

    /// Mutably borrow an open connection (required to install an image)
    ///
    /// ## Errors
    ///
    /// Same as [`ConnectionRegistry::connection`].
    pub fn connection_mut(&mut self, name: &str) -> Result<&mut Connection> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.spec.name == name)
            .ok_or_else(|| -> ExError {
                GraftError::StoreNotRegistered {
                    store: name.to_string(),
                }
                .into()
            })?;
        entry.conn.as_mut().ok_or_else(|| {
            GraftError::StoreClosed {
                store: name.to_string(),
            }
            .into()
        })
    }

    /// State of a registered store, `None` when the label is unknown
    pub fn state(&self, name: &str) -> Option<ConnectionState> {
        self.entry(name).ok().map(RegistryEntry::state)
    }

    /// Labels in opening order, open or closed
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.spec.name.as_str()).collect()
    }

    /// Labels of currently open stores, in opening order
    pub fn open_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.conn.is_some())
            .map(|e| e.spec.name.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Backing file of an open store, `None` for a volatile store
    ///
    /// ## Errors
    ///
    /// Same as [`ConnectionRegistry::connection`].
    pub fn filename_of(&self, name: &str) -> Result<Option<String>> {
        self.connection(name).map(db::filename_of)
    }

    /// Close one store
    ///
    /// Returns `Ok(false)` when the store was already closed; the
    /// underlying close is only ever issued once.
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::NotFound`: label never opened
    /// - `ExErrorKind::CloseFailed`: the engine reported an error; the
    ///   store is `Closed` afterwards regardless
    pub fn close(&mut self, name: &str) -> Result<bool> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.spec.name == name)
            .ok_or_else(|| -> ExError {
                GraftError::StoreNotRegistered {
                    store: name.to_string(),
                }
                .into()
            })?;
        match entry.conn.take() {
            Some(conn) => close_connection(name, conn).map(|()| true),
            None => Ok(false),
        }
    }

    /// Close every open store in reverse order of opening
    ///
    /// Never stops early: each failure is recorded and the sweep goes on.
    pub fn close_all(&mut self) -> CloseSummary {
        let mut summary = CloseSummary::default();
        for entry in self.entries.iter_mut().rev() {
            let Some(conn) = entry.conn.take() else {
                continue;
            };
            let name = entry.spec.name.clone();
            if let Err(err) = close_connection(&name, conn) {
                summary.failures.push(err);
            }
            summary.closed.push(name);
        }
        summary
    }
}

impl Drop for ConnectionRegistry {
    fn drop(&mut self) {
        if self.entries.iter().any(|e| e.conn.is_some()) {
            tracing::warn!("Connection registry dropped with open stores; closing them");
            self.close_all();
        }
    }
}

fn close_connection(name: &str, conn: Connection) -> Result<()> {
    let start = Instant::now();
    log_op_start!(OP_CLOSE, store = name);

    match conn.close() {
        Ok(()) => {
            log_op_end!(
                OP_CLOSE,
                duration_ms = start.elapsed().as_millis() as u64,
                store = name
            );
            Ok(())
        }
        Err((conn, err)) => {
            let err = close_failed(name, err);
            log_op_error!(
                OP_CLOSE,
                err,
                duration_ms = start.elapsed().as_millis() as u64,
                store = name
            );
            // rusqlite panics when dropping a handle whose close failed
            tracing::warn!(store = name, "Leaking connection handle after failed close");
            std::mem::forget(conn);
            Err(err)
        }
    }
}
