//! Database connection management
//!
//! Opens stores by identifier and reports what the linked SQLite library
//! can do.

use crate::errors::{from_rusqlite, open_failed, Result};
use dbgraft_core::errors::GraftError;
use dbgraft_core::model::{OpenMode, StoreLocation, StoreSpec};
use rusqlite::{Connection, OpenFlags};

/// Compile option whose presence removes sqlite3_serialize/sqlite3_deserialize
const OMIT_DESERIALIZE: &str = "OMIT_DESERIALIZE";

/// Translate an open mode into SQLite open flags
pub fn open_flags(mode: OpenMode) -> OpenFlags {
    let base = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    match mode {
        OpenMode::ReadOnly => base | OpenFlags::SQLITE_OPEN_READ_ONLY,
        OpenMode::ReadWrite => base | OpenFlags::SQLITE_OPEN_READ_WRITE,
        OpenMode::Create => {
            base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        }
    }
}

/// Open the store described by `spec`
///
/// Volatile stores get a fresh private in-memory database.
pub fn open_store(spec: &StoreSpec) -> Result<Connection> {
    match &spec.location {
        StoreLocation::Memory => Connection::open_in_memory(),
        StoreLocation::File(path) => {
            Connection::open_with_flags(path, open_flags(spec.effective_mode()))
        }
    }
    .map_err(|e| open_failed(spec, e))
}

/// Backing file of the connection's main schema
///
/// Returns `None` for a private volatile store.
pub fn filename_of(conn: &Connection) -> Option<String> {
    conn.path()
        .filter(|path| !path.is_empty())
        .map(str::to_string)
}

/// Capabilities of the linked SQLite library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInfo {
    pub version: String,
    pub version_number: i32,
    pub threadsafe: bool,
    pub serialize_supported: bool,
    pub compile_options: Vec<String>,
}

/// Inspect the linked SQLite library through a throwaway connection
pub fn engine_info() -> Result<EngineInfo> {
    let conn = Connection::open_in_memory().map_err(from_rusqlite)?;
    let compile_options = {
        let mut stmt = conn
            .prepare("PRAGMA compile_options")
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(from_rusqlite)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?
    };

    let threadsafe = compile_options
        .iter()
        .find_map(|opt| opt.strip_prefix("THREADSAFE="))
        .map(|level| level != "0")
        .unwrap_or(false);
    let serialize_supported = !compile_options.iter().any(|opt| opt == OMIT_DESERIALIZE);

    Ok(EngineInfo {
        version: rusqlite::version().to_string(),
        version_number: rusqlite::version_number(),
        threadsafe,
        serialize_supported,
        compile_options,
    })
}

/// Fail with `Unsupported` unless the library can serialize and deserialize
pub fn check_engine() -> Result<EngineInfo> {
    let info = engine_info()?;
    if !info.serialize_supported {
        return Err(GraftError::Unsupported {
            reason: format!(
                "SQLite {} was built with SQLITE_{}",
                info.version, OMIT_DESERIALIZE
            ),
        }
        .into());
    }
    Ok(info)
}
