use dbgraft_core::model::{OpenMode, StoreSpec};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

#[allow(dead_code)]
pub const EUROPE: &[&str] = &["Finland", "Ireland", "Spain"];
#[allow(dead_code)]
pub const AFRICA: &[&str] = &["Ghana", "Somaliland", "Kenya"];

/// Create a file store with a `countries` table holding `countries` in order
#[allow(dead_code)]
pub fn create_store(dir: &Path, file: &str, countries: &[&str]) -> PathBuf {
    let path = dir.join(file);
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE countries (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         CREATE TABLE capitals (country_id INTEGER, name TEXT);",
    )
    .unwrap();
    for country in countries {
        conn.execute("INSERT INTO countries (name) VALUES (?1)", [country])
            .unwrap();
    }
    path
}

/// Read-only spec for a fixture file
#[allow(dead_code)]
pub fn file_spec(name: &str, path: &Path) -> StoreSpec {
    StoreSpec::new(name, &*path.to_string_lossy()).with_mode(OpenMode::ReadOnly)
}

/// In-memory store seeded with `countries`
#[allow(dead_code)]
pub fn memory_store(countries: &[&str]) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE countries (id INTEGER PRIMARY KEY, name TEXT NOT NULL);")
        .unwrap();
    for country in countries {
        conn.execute("INSERT INTO countries (name) VALUES (?1)", [country])
            .unwrap();
    }
    conn
}
