use dbgraft_core::model::{StoreSpec, MEMORY_SENTINEL};
use dbgraft_engine::RunPlan;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

pub const EUROPE: &[&str] = &["Finland", "Ireland", "Spain"];
pub const AFRICA: &[&str] = &["Ghana", "Somaliland", "Kenya"];

/// Create a file store with a `countries` table holding `countries` in order
pub fn create_store(dir: &Path, file: &str, countries: &[&str]) -> PathBuf {
    let path = dir.join(file);
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE countries (id INTEGER PRIMARY KEY, name TEXT NOT NULL);")
        .unwrap();
    for country in countries {
        conn.execute("INSERT INTO countries (name) VALUES (?1)", [country])
            .unwrap();
    }
    path
}

/// The default europe/africa/memory plan over fixtures in `dir`
///
/// Labels get `suffix` appended so that captured events can be told apart
/// between tests running in parallel.
#[allow(dead_code)]
pub fn fixture_plan(dir: &Path, suffix: &str) -> RunPlan {
    let europe = create_store(dir, "europe.db", EUROPE);
    let africa = create_store(dir, "africa.db", AFRICA);
    RunPlan {
        stores: vec![
            StoreSpec::new(format!("europe{}", suffix), &*europe.to_string_lossy()),
            StoreSpec::new(format!("africa{}", suffix), &*africa.to_string_lossy()),
            StoreSpec::new(format!("memory{}", suffix), MEMORY_SENTINEL),
        ],
        source: format!("europe{}", suffix),
        ..RunPlan::default()
    }
}
