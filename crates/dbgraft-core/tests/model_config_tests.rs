use dbgraft_core::model::{OpenMode, RowProbe, StoreLocation, StoreSpec};
use proptest::prelude::*;

#[derive(Debug, serde::Deserialize)]
struct Doc {
    stores: Vec<StoreSpec>,
    #[serde(default)]
    probe: RowProbe,
}

#[test]
fn test_store_specs_from_toml() {
    let doc: Doc = toml::from_str(
        r#"
        [[stores]]
        name = "europe"
        location = "europe.db"

        [[stores]]
        name = "scratch"
        location = "scratch.db"
        mode = "create"

        [[stores]]
        name = "memory"
        location = ":memory:"
        "#,
    )
    .unwrap();

    assert_eq!(doc.stores.len(), 3);
    assert_eq!(doc.stores[0].effective_mode(), OpenMode::ReadOnly);
    assert_eq!(doc.stores[1].effective_mode(), OpenMode::Create);
    assert_eq!(doc.stores[2].location, StoreLocation::Memory);
    assert_eq!(doc.probe, RowProbe::default());
}

#[test]
fn test_partial_probe_keeps_defaults() {
    let doc: Doc = toml::from_str(
        r#"
        stores = []

        [probe]
        pattern = "S%"
        "#,
    )
    .unwrap();

    assert_eq!(doc.probe.table, "countries");
    assert_eq!(doc.probe.column, "name");
    assert_eq!(doc.probe.pattern, "S%");
}

#[test]
fn test_store_spec_json_uses_plain_location() {
    let spec = StoreSpec::new("memory", ":memory:");
    let json = serde_json::to_string(&spec).unwrap();
    assert_eq!(json, r#"{"name":"memory","location":":memory:"}"#);
}

proptest! {
    #[test]
    fn prop_store_flag_keeps_name_and_location(
        name in "[a-z][a-z0-9_]{0,12}",
        location in "[a-zA-Z0-9_./]{1,24}",
    ) {
        let spec: StoreSpec = format!("{}={}", name, location).parse().unwrap();
        prop_assert_eq!(spec.name, name);
        prop_assert_eq!(spec.location.to_string(), location);
    }
}
