//! Snapshot capture

use std::time::Instant;

use crate::errors::{capture_failed, Result};
use crate::snapshot::buffer::SnapshotBuffer;
use dbgraft_core::core_types::schema::OP_CAPTURE;
use dbgraft_core::{log_op_end, log_op_error, log_op_start};
use rusqlite::{Connection, DatabaseName};

/// Capture the whole `main` schema of `conn` into an owned buffer
///
/// Works the same for file-backed and in-memory connections. The source
/// connection is only read and stays usable. No retries.
///
/// ## Errors
///
/// - `ExErrorKind::CaptureFailed`: the engine produced no image, an empty
///   image, or bytes that do not form a whole image
pub fn capture(conn: &Connection, store: &str) -> Result<SnapshotBuffer> {
    let start = Instant::now();
    log_op_start!(OP_CAPTURE, store = store);

    match serialize_main(conn, store) {
        Ok(buffer) => {
            log_op_end!(
                OP_CAPTURE,
                duration_ms = start.elapsed().as_millis() as u64,
                store = store,
                size_bytes = buffer.len() as u64,
                digest = buffer.digest().as_str()
            );
            Ok(buffer)
        }
        Err(err) => {
            log_op_error!(
                OP_CAPTURE,
                err,
                duration_ms = start.elapsed().as_millis() as u64,
                store = store
            );
            Err(err)
        }
    }
}

fn serialize_main(conn: &Connection, store: &str) -> Result<SnapshotBuffer> {
    // A store with zero pages comes back as an engine error
    let data = conn
        .serialize(DatabaseName::Main)
        .map_err(|e| capture_failed(store, format!("engine returned no image: {}", e)))?;
    if data.is_empty() {
        return Err(capture_failed(store, "engine returned an empty image"));
    }

    let buffer = SnapshotBuffer::from_bytes(store, data.to_vec());
    buffer
        .header()
        .map_err(|e| capture_failed(store, e.to_string()))?;
    Ok(buffer)
}
