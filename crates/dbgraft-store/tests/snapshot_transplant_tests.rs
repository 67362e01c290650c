// Capture and transplant of whole-store images
// Covers fidelity, multi-target replay, buffer reuse and rejection paths

mod common;

use common::{create_store, file_spec, memory_store, AFRICA, EUROPE};
use dbgraft_core::errors::ExErrorKind;
use dbgraft_core::model::{RowProbe, StoreSpec};
use dbgraft_store::registry::ConnectionRegistry;
use dbgraft_store::snapshot::{capture, transplant, SnapshotBuffer, TransplantOptions};
use dbgraft_store::verify::{find_rows_matching, list_tables, verify, VerifyOutcome};
use rusqlite::Connection;
use tempfile::TempDir;

fn probe() -> RowProbe {
    RowProbe::new("countries", "name", "%land%")
}

#[test]
fn test_transplant_into_empty_memory_store() {
    let temp_dir = TempDir::new().unwrap();
    let europe = create_store(temp_dir.path(), "europe.db", EUROPE);

    let mut registry = ConnectionRegistry::new();
    registry.open(&file_spec("europe", &europe)).unwrap();
    registry.open(&StoreSpec::new("memory", ":memory:")).unwrap();

    assert!(list_tables(registry.connection("memory").unwrap(), "memory")
        .unwrap()
        .is_empty());

    let buffer = capture(registry.connection("europe").unwrap(), "europe").unwrap();
    transplant(
        &buffer,
        registry.connection_mut("memory").unwrap(),
        "memory",
        TransplantOptions::default(),
    )
    .unwrap();

    let matches = find_rows_matching(registry.connection("memory").unwrap(), "memory", &probe())
        .unwrap();
    assert_eq!(matches, ["Finland", "Ireland"]);

    buffer.release();
}

#[test]
fn test_transplant_fidelity_over_file_target() {
    let temp_dir = TempDir::new().unwrap();
    let europe = create_store(temp_dir.path(), "europe.db", EUROPE);
    let africa = create_store(temp_dir.path(), "africa.db", AFRICA);

    let mut registry = ConnectionRegistry::new();
    registry.open(&file_spec("europe", &europe)).unwrap();
    registry.open(&file_spec("africa", &africa)).unwrap();

    let source = registry.connection("europe").unwrap();
    let tables_at_capture = list_tables(source, "europe").unwrap();
    let rows_at_capture = find_rows_matching(source, "europe", &probe()).unwrap();
    let buffer = capture(source, "europe").unwrap();

    let before = find_rows_matching(registry.connection("africa").unwrap(), "africa", &probe())
        .unwrap();
    assert_eq!(before, ["Somaliland"]);

    transplant(
        &buffer,
        registry.connection_mut("africa").unwrap(),
        "africa",
        TransplantOptions::default(),
    )
    .unwrap();

    let target = registry.connection("africa").unwrap();
    assert_eq!(list_tables(target, "africa").unwrap(), tables_at_capture);
    assert_eq!(
        find_rows_matching(target, "africa", &probe()).unwrap(),
        rows_at_capture
    );

    buffer.release();
}

#[test]
fn test_same_buffer_replays_identically_into_many_targets() {
    let source = memory_store(EUROPE);
    let mut target_b = memory_store(AFRICA);
    let mut target_c = Connection::open_in_memory().unwrap();

    let buffer = capture(&source, "source").unwrap();
    let digest = buffer.digest();

    transplant(&buffer, &mut target_b, "b", TransplantOptions::default()).unwrap();
    transplant(&buffer, &mut target_c, "c", TransplantOptions::default()).unwrap();

    // Buffer untouched by either transplant
    assert_eq!(buffer.digest(), digest);

    let b = find_rows_matching(&target_b, "b", &probe()).unwrap();
    let c = find_rows_matching(&target_c, "c", &probe()).unwrap();
    assert_eq!(b, c);
    assert_eq!(list_tables(&target_b, "b").unwrap(), list_tables(&target_c, "c").unwrap());

    buffer.release();
}

#[test]
fn test_targets_own_their_copy() {
    let source = memory_store(EUROPE);
    let mut target_b = Connection::open_in_memory().unwrap();
    let mut target_c = Connection::open_in_memory().unwrap();

    let buffer = capture(&source, "source").unwrap();
    transplant(&buffer, &mut target_b, "b", TransplantOptions::default()).unwrap();
    transplant(&buffer, &mut target_c, "c", TransplantOptions::default()).unwrap();
    buffer.release();

    // Writes to one target do not leak into the other
    target_b
        .execute("INSERT INTO countries (name) VALUES ('Iceland')", [])
        .unwrap();

    assert_eq!(
        find_rows_matching(&target_b, "b", &probe()).unwrap(),
        ["Finland", "Ireland", "Iceland"]
    );
    assert_eq!(
        find_rows_matching(&target_c, "c", &probe()).unwrap(),
        ["Finland", "Ireland"]
    );
}

#[test]
fn test_source_is_left_usable() {
    let source = memory_store(EUROPE);

    let first = capture(&source, "source").unwrap();
    assert_eq!(
        find_rows_matching(&source, "source", &probe()).unwrap(),
        ["Finland", "Ireland"]
    );
    let second = capture(&source, "source").unwrap();

    assert_eq!(first.digest(), second.digest());
    assert_eq!(first.origin(), "source");
    first.release();
    second.release();
}

#[test]
fn test_capture_of_empty_store_fails() {
    let empty = Connection::open_in_memory().unwrap();

    let err = capture(&empty, "empty").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::CaptureFailed);
    assert_eq!(err.store(), Some("empty"));
}

#[test]
fn test_header_reports_pages() {
    let source = memory_store(EUROPE);
    let buffer = capture(&source, "source").unwrap();

    let header = buffer.header().unwrap();
    assert_eq!(
        header.page_size as u64 * header.page_count,
        buffer.len() as u64
    );
    buffer.release();
}

#[test]
fn test_malformed_image_leaves_target_unchanged() {
    let mut target = memory_store(AFRICA);
    let garbage = SnapshotBuffer::from_bytes("garbage", vec![0x42u8; 4096]);

    let err = transplant(&garbage, &mut target, "target", TransplantOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::TransplantFailed);
    assert!(err.message().contains("header magic"));

    assert_eq!(
        find_rows_matching(&target, "target", &probe()).unwrap(),
        ["Somaliland"]
    );
}

#[test]
fn test_unreadable_image_is_reported() {
    // Right magic and page size, but page 1 is otherwise zeroed
    let mut bytes = vec![0u8; 4096];
    bytes[..16].copy_from_slice(b"SQLite format 3\0");
    bytes[16..18].copy_from_slice(&4096u16.to_be_bytes());
    let corrupt = SnapshotBuffer::from_bytes("corrupt", bytes);

    let mut target = Connection::open_in_memory().unwrap();
    let err = transplant(&corrupt, &mut target, "target", TransplantOptions::default())
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::TransplantFailed);
    assert_eq!(err.store(), Some("target"));
}

#[test]
fn test_read_only_install_rejects_writes() {
    let source = memory_store(EUROPE);
    let mut target = Connection::open_in_memory().unwrap();

    let buffer = capture(&source, "source").unwrap();
    transplant(
        &buffer,
        &mut target,
        "target",
        TransplantOptions { read_only: true },
    )
    .unwrap();
    buffer.release();

    assert_eq!(
        find_rows_matching(&target, "target", &probe()).unwrap(),
        ["Finland", "Ireland"]
    );
    assert!(target
        .execute("INSERT INTO countries (name) VALUES ('Poland')", [])
        .is_err());
}

#[test]
fn test_verification_after_transplant_sees_new_image() {
    let source = memory_store(EUROPE);
    let mut target = memory_store(AFRICA);

    // Fills the target's statement cache against the old schema
    let before = verify(&target, "cached-target", &probe());
    assert_eq!(before.matches.clone().unwrap(), ["Somaliland"]);

    let buffer = capture(&source, "cached-source").unwrap();
    transplant(
        &buffer,
        &mut target,
        "cached-target",
        TransplantOptions::default(),
    )
    .unwrap();

    let after = verify(&target, "cached-target", &probe());
    assert_eq!(after.outcome, VerifyOutcome::Inspected);
    assert_eq!(after.tables.unwrap(), ["countries"]);
    assert_eq!(after.matches.unwrap(), ["Finland", "Ireland"]);

    buffer.release();
}
