use lmc_core::{LmcError, ParameterTree};
use serde_json::json;
use tempfile::tempdir;

fn system_tree() -> ParameterTree {
    ParameterTree::from_value(json!({
        "beta": 0.4,
        "dimensions": [4, 4],
        "systembase_name": "systembase",
    }))
    .unwrap()
}

#[test]
fn written_trees_reload_with_identical_values() {
    let dir = tempdir().unwrap();
    let tree = system_tree();
    let path = tree.write_to_file(dir.path(), "systembase_params").unwrap();
    assert!(path.ends_with("systembase_params.json"));

    let reloaded = ParameterTree::read_from_file(dir.path(), "systembase_params").unwrap();
    assert_eq!(reloaded.to_value(), tree.to_value());
}

#[test]
fn component_resolution_prefers_inline_entries() {
    let mut parent = ParameterTree::new();
    parent.insert("systembase", json!({"beta": 0.7}));

    let resolved = parent
        .resolve_component("systembase", "systembase_params", "systembase")
        .unwrap();
    assert_eq!(resolved.get::<f64>("beta").unwrap(), 0.7);
    resolved.verify_name_tag("systembase", "systembase").unwrap();
}

#[test]
fn component_resolution_follows_path_entries_and_checks_identity() {
    let dir = tempdir().unwrap();
    system_tree()
        .write_to_file(dir.path(), "systembase_params")
        .unwrap();

    let mut parent = ParameterTree::new();
    parent.insert(
        "systembase_path",
        json!(dir.path().display().to_string()),
    );

    let resolved = parent
        .resolve_component("systembase", "systembase_params", "systembase")
        .unwrap();
    assert_eq!(resolved.get::<f64>("beta").unwrap(), 0.4);

    // A tree tagged with a different identity must be rejected.
    let err = parent
        .resolve_component("systembase", "systembase_params", "scalar_field")
        .unwrap_err();
    assert!(matches!(err, LmcError::Config(_)));
}

#[test]
fn component_resolution_defaults_to_a_tagged_empty_tree() {
    let parent = ParameterTree::new();
    let resolved = parent
        .resolve_component("measurement", "readable_measure_params", "readable_measure")
        .unwrap();
    resolved
        .verify_name_tag("measurement", "readable_measure")
        .unwrap();
}
