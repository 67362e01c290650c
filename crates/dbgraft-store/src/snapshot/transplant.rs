//! Snapshot transplant
//!
//! Installs a captured image as the entire content of another connection.
//! The target receives its own SQLite-allocated copy of the bytes and frees
//! it on close; the caller's buffer is only read.

use std::ptr::NonNull;
use std::time::Instant;

use crate::errors::{transplant_failed, Result};
use crate::snapshot::buffer::SnapshotBuffer;
use dbgraft_core::core_types::schema::OP_TRANSPLANT;
use dbgraft_core::errors::GraftError;
use dbgraft_core::{log_op_end, log_op_error, log_op_start};
use rusqlite::serialize::OwnedData;
use rusqlite::{ffi, Connection, DatabaseName};

/// Header offsets of the file format write/read versions
const WRITE_VERSION_OFFSET: usize = 18;
const READ_VERSION_OFFSET: usize = 19;
const LEGACY_FORMAT: u8 = 1;
const WAL_FORMAT: u8 = 2;

/// How the target adopts the image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransplantOptions {
    /// Install the image read-only instead of resizeable read-write
    pub read_only: bool,
}

/// Replace the content of `target` with the image in `buffer`
///
/// May be called any number of times with the same buffer. Taking the
/// target by `&mut` means no statement of the target can be mid-step.
///
/// ## Errors
///
/// - `ExErrorKind::TransplantFailed`:
///   - the image is malformed (target left unchanged)
///   - the engine refused the image (target left unchanged)
///   - the installed image cannot be read back (target unusable until
///     another image is installed)
pub fn transplant(
    buffer: &SnapshotBuffer,
    target: &mut Connection,
    target_name: &str,
    options: TransplantOptions,
) -> Result<()> {
    let start = Instant::now();
    log_op_start!(
        OP_TRANSPLANT,
        store = target_name,
        source = buffer.origin(),
        size_bytes = buffer.len() as u64
    );

    match install(buffer, target, target_name, options) {
        Ok(tables) => {
            log_op_end!(
                OP_TRANSPLANT,
                duration_ms = start.elapsed().as_millis() as u64,
                store = target_name,
                source = buffer.origin(),
                schema_entries = tables
            );
            Ok(())
        }
        Err(err) => {
            log_op_error!(
                OP_TRANSPLANT,
                err,
                duration_ms = start.elapsed().as_millis() as u64,
                store = target_name,
                source = buffer.origin()
            );
            Err(err)
        }
    }
}

fn install(
    buffer: &SnapshotBuffer,
    target: &mut Connection,
    target_name: &str,
    options: TransplantOptions,
) -> Result<i64> {
    let header = buffer.header().map_err(|e| -> dbgraft_core::ExError {
        GraftError::InvalidImage {
            source_store: buffer.origin().to_string(),
            reason: e.to_string(),
        }
        .into()
    })?;
    tracing::debug!(
        store = target_name,
        page_size = header.page_size,
        page_count = header.page_count,
        "Image header accepted"
    );

    let data = sqlite_owned_copy(buffer.as_bytes()).ok_or_else(|| {
        transplant_failed(
            buffer.origin(),
            target_name,
            format!("cannot allocate {} bytes for the image", buffer.len()),
        )
    })?;

    // Cached statements would refer to the schema being replaced
    target.flush_prepared_statement_cache();

    target
        .deserialize(DatabaseName::Main, data, options.read_only)
        .map_err(|e| transplant_failed(buffer.origin(), target_name, e.to_string()))?;

    target
        .query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| {
            transplant_failed(
                buffer.origin(),
                target_name,
                format!("installed image is unreadable, target unusable: {}", e),
            )
        })
}

/// Mark a WAL-mode header as a legacy rollback-journal image
///
/// The memdb VFS cannot open WAL-mode images. Headers too short to carry
/// both version bytes are left alone.
fn legacy_wal_header(header: &mut [u8]) {
    if header.len() > READ_VERSION_OFFSET && header[WRITE_VERSION_OFFSET] == WAL_FORMAT {
        header[WRITE_VERSION_OFFSET] = LEGACY_FORMAT;
        header[READ_VERSION_OFFSET] = LEGACY_FORMAT;
    }
}

/// Copy `bytes` into a block allocated by SQLite, as `sqlite3_deserialize`
/// requires for an image it will own and free
fn sqlite_owned_copy(bytes: &[u8]) -> Option<OwnedData> {
    let len = bytes.len();
    // SAFETY: sqlite3_malloc64 returns null or a block of at least `len` bytes.
    let raw = unsafe { ffi::sqlite3_malloc64(len as u64) }.cast::<u8>();
    let ptr = NonNull::new(raw)?;

    // SAFETY: `ptr` is a fresh allocation of `len` bytes that cannot overlap
    // `bytes`, and ownership passes to OwnedData, which frees it with
    // sqlite3_free unless the engine takes it over.
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), len);
        legacy_wal_header(std::slice::from_raw_parts_mut(ptr.as_ptr(), len));
        Some(OwnedData::from_raw_nonnull(ptr, len))
    }
}
