// Connection registry: open/close lifecycle, ordering and cleanup guarantees

mod common;

use common::{create_store, file_spec, EUROPE};
use dbgraft_core::core_types::schema::{EVENT_END, EVENT_END_ERROR, OP_CLOSE};
use dbgraft_core::errors::ExErrorKind;
use dbgraft_core::logging_facility::test_capture::init_test_capture;
use dbgraft_core::model::StoreSpec;
use dbgraft_store::registry::{ConnectionRegistry, ConnectionState};
use tempfile::TempDir;

#[test]
fn test_open_missing_file_read_only_fails() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = ConnectionRegistry::new();

    let spec = file_spec("ghost", &temp_dir.path().join("ghost.db"));
    let err = registry.open(&spec).err().unwrap();

    assert_eq!(err.kind(), ExErrorKind::OpenFailed);
    assert_eq!(err.store(), Some("ghost"));
    assert!(err.message().contains("ghost.db"));
    // Failed opens are not remembered
    assert_eq!(registry.state("ghost"), None);
    assert!(registry.is_empty());
}

#[test]
fn test_same_file_cannot_be_opened_twice() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_store(temp_dir.path(), "europe.db", EUROPE);
    let mut registry = ConnectionRegistry::new();

    registry.open(&file_spec("europe", &path)).unwrap();
    let err = registry.open(&file_spec("europe-again", &path)).err().unwrap();

    assert_eq!(err.kind(), ExErrorKind::OpenFailed);
    assert_eq!(registry.names(), vec!["europe"]);
}

#[test]
fn test_filename_of_file_and_memory() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_store(temp_dir.path(), "europe.db", EUROPE);
    let mut registry = ConnectionRegistry::new();
    registry.open(&file_spec("europe", &path)).unwrap();
    registry.open(&StoreSpec::new("memory", ":memory:")).unwrap();

    let filename = registry.filename_of("europe").unwrap().unwrap();
    assert!(filename.ends_with("europe.db"));
    assert_eq!(registry.filename_of("memory").unwrap(), None);
}

#[test]
fn test_close_all_runs_in_reverse_open_order() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_store(temp_dir.path(), "europe.db", EUROPE);
    let mut registry = ConnectionRegistry::new();
    registry.open(&file_spec("europe", &path)).unwrap();
    registry.open(&StoreSpec::new("scratch", ":memory:")).unwrap();
    registry.open(&StoreSpec::new("third", ":memory:")).unwrap();

    registry.close("scratch").unwrap();
    let summary = registry.close_all();

    assert!(summary.is_clean());
    assert_eq!(summary.closed, vec!["third", "europe"]);
    for name in ["europe", "scratch", "third"] {
        assert_eq!(registry.state(name), Some(ConnectionState::Closed));
    }
    assert!(registry.open_names().is_empty());
}

#[test]
fn test_drop_closes_open_stores_in_reverse_order() {
    let capture = init_test_capture();
    let first = "drop-sweep-first-unique";
    let second = "drop-sweep-second-unique";

    {
        let mut registry = ConnectionRegistry::new();
        registry.open(&StoreSpec::new(first, ":memory:")).unwrap();
        registry.open(&StoreSpec::new(second, ":memory:")).unwrap();
    }

    let closes: Vec<String> = capture
        .events()
        .into_iter()
        .filter(|e| e.op.as_deref() == Some(OP_CLOSE) && e.event.as_deref() == Some(EVENT_END))
        .filter_map(|e| e.store)
        .filter(|s| s == first || s == second)
        .collect();

    assert_eq!(closes, vec![second.to_string(), first.to_string()]);
}

#[test]
fn test_failed_close_is_recorded_and_sweep_continues() {
    let capture = init_test_capture();
    let mut registry = ConnectionRegistry::new();
    for name in ["busy-sweep-a", "busy-sweep-b", "busy-sweep-c"] {
        registry.open(&StoreSpec::new(name, ":memory:")).unwrap();
    }

    // An unfinalized statement makes the engine refuse to close
    let stmt = registry
        .connection("busy-sweep-b")
        .unwrap()
        .prepare("SELECT 1")
        .unwrap();
    std::mem::forget(stmt);

    let summary = registry.close_all();

    assert!(!summary.is_clean());
    assert_eq!(
        summary.closed,
        vec!["busy-sweep-c", "busy-sweep-b", "busy-sweep-a"]
    );
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].kind(), ExErrorKind::CloseFailed);
    assert_eq!(summary.failures[0].store(), Some("busy-sweep-b"));

    for name in ["busy-sweep-a", "busy-sweep-b", "busy-sweep-c"] {
        assert_eq!(registry.state(name), Some(ConnectionState::Closed));
    }
    // Closed means closed: no second attempt
    assert!(!registry.close("busy-sweep-b").unwrap());
    assert_eq!(
        capture.count_events(|e| e.is(OP_CLOSE, EVENT_END_ERROR, "busy-sweep-b")),
        1
    );
    assert_eq!(
        capture.count_events(|e| e.is(OP_CLOSE, EVENT_END, "busy-sweep-a")),
        1
    );
}
