// Verification query runner: ordering, skip rule, parameter safety

mod common;

use common::{memory_store, EUROPE};
use dbgraft_core::errors::ExErrorKind;
use dbgraft_core::model::RowProbe;
use dbgraft_store::verify::{find_rows_matching, list_tables, quote_identifier, verify, VerifyOutcome};
use proptest::prelude::*;
use rusqlite::Connection;

#[test]
fn test_rows_come_back_in_engine_order() {
    let conn = memory_store(&["Poland", "Finland", "Spain", "Ireland"]);

    let rows = find_rows_matching(&conn, "ordered", &RowProbe::default()).unwrap();
    assert_eq!(rows, ["Poland", "Finland", "Ireland"]);
}

#[test]
fn test_pattern_is_bound_not_interpolated() {
    let conn = memory_store(EUROPE);
    let hostile = RowProbe::new("countries", "name", "%' OR '1'='1");

    let rows = find_rows_matching(&conn, "hostile", &hostile).unwrap();
    assert!(rows.is_empty());

    // Still intact
    assert_eq!(list_tables(&conn, "hostile").unwrap(), ["countries"]);
}

#[test]
fn test_unknown_column_is_query_failure() {
    let conn = memory_store(EUROPE);
    let probe = RowProbe::new("countries", "population", "%");

    let err = find_rows_matching(&conn, "cols", &probe).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::QueryFailed);
    assert_eq!(err.store(), Some("cols"));
    assert!(err.message().contains("prepare failed"));
}

#[test]
fn test_non_text_values_are_rendered() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE readings (v);
         INSERT INTO readings VALUES (42), (2.5), (NULL), (x'0aff'), ('text');",
    )
    .unwrap();

    let rows = find_rows_matching(&conn, "readings", &RowProbe::new("readings", "v", "%"))
        .unwrap();
    // LIKE skips NULL
    assert_eq!(rows, ["42", "2.5", "0aff", "text"]);
}

#[test]
fn test_verification_is_repeatable() {
    let conn = memory_store(EUROPE);
    let probe = RowProbe::default();

    let first = verify(&conn, "repeat", &probe);
    let second = verify(&conn, "repeat", &probe);

    assert_eq!(first.outcome, VerifyOutcome::Inspected);
    assert_eq!(first, second);
}

proptest! {
    #[test]
    fn prop_quoted_identifiers_round_trip(name in "[a-zA-Z0-9_%'\"-]{1,16}") {
        prop_assume!(!name.to_ascii_lowercase().starts_with("sqlite_"));
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE {} ({} TEXT); INSERT INTO {} VALUES ('probe');",
            quote_identifier(&name),
            quote_identifier(&name),
            quote_identifier(&name),
        ))
        .unwrap();

        let tables = list_tables(&conn, "prop").unwrap();
        prop_assert_eq!(tables.as_slice(), &[name.clone()][..]);

        let rows = find_rows_matching(&conn, "prop", &RowProbe::new(name.clone(), name, "pro%")).unwrap();
        prop_assert_eq!(rows.as_slice(), &["probe".to_string()][..]);
    }
}
