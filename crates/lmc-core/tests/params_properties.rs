use lmc_core::ParameterTree;
use proptest::prelude::*;
use serde_json::{json, Value};

fn nested_tree(depth: usize) -> (ParameterTree, Vec<String>) {
    let mut value = json!({"target": 0.0, "sibling": "untouched"});
    let mut path = vec!["target".to_string()];
    for level in (0..depth).rev() {
        let key = format!("level{level}");
        path.insert(0, key.clone());
        value = json!({key: value, "bystander": level});
    }
    (ParameterTree::from_value(value).unwrap(), path)
}

proptest! {
    #[test]
    fn patches_reach_leaves_at_any_depth(depth in 0usize..5, patched in -1e9f64..1e9) {
        let (mut tree, path) = nested_tree(depth);

        let found = tree.find_key_path("target");
        prop_assert_eq!(found.as_ref(), Some(&path));

        let before = tree.to_value();
        tree.patch_leaf(&path, json!(patched)).unwrap();
        prop_assert_eq!(tree.leaf(&path), Some(&json!(patched)));

        // Every other key is byte-identical to the original tree.
        let mut reverted = tree.to_value();
        set_at(&mut reverted, &path, json!(0.0));
        prop_assert_eq!(reverted, before);
    }

    #[test]
    fn typed_defaults_never_shadow_present_entries(value in -1e9f64..1e9, fallback in -1e9f64..1e9) {
        let mut tree = ParameterTree::new();
        tree.insert("entry", json!(value));
        prop_assert_eq!(tree.get_or("entry", fallback).unwrap(), value);
        prop_assert_eq!(tree.get_or("absent", fallback).unwrap(), fallback);
    }
}

fn set_at(value: &mut Value, path: &[String], replacement: Value) {
    let mut current = value;
    for segment in &path[..path.len() - 1] {
        current = current.get_mut(segment).unwrap();
    }
    *current.get_mut(&path[path.len() - 1]).unwrap() = replacement;
}
