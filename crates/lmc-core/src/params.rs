//! Hierarchically nested parameter trees with typed accessors, default
//! substitution and pretty-JSON file round-trip.
//!
//! A [`ParameterTree`] is the configuration currency of the engine: every
//! component (system, execution mode, measurement processor, simulation)
//! owns one tree, serializes it to `<name>.json` and re-verifies its
//! structural identity tag on load. Nested component trees are embedded by
//! value, or referenced through a `<component>_path` sibling key pointing
//! at the directory holding the component's own parameter file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::{ErrorInfo, LmcError};

/// A mapping from string keys to scalars, sequences or nested trees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterTree {
    root: Map<String, Value>,
}

impl ParameterTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, LmcError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(LmcError::Config(
                ErrorInfo::new("params-not-object", "parameter tree must be a JSON object")
                    .with_context("found", type_name(&other)),
            )),
        }
    }

    /// Returns the tree as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Returns true when the tree contains `key` at the top level.
    pub fn contains(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    /// Reads a typed entry. Absence of the key is a fatal configuration
    /// error; use [`ParameterTree::get_or`] to supply a declared default.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, LmcError> {
        let value = self.root.get(key).ok_or_else(|| {
            LmcError::Config(
                ErrorInfo::new("missing-entry", "required parameter entry not found")
                    .with_context("key", key),
            )
        })?;
        convert(key, value)
    }

    /// Reads a typed entry, substituting `default` when the key is absent.
    /// A present value of the wrong type is still a fatal error.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, LmcError> {
        match self.root.get(key) {
            Some(value) => convert(key, value),
            None => Ok(default),
        }
    }

    /// Inserts or replaces a top-level entry.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.root.insert(key.into(), value);
    }

    /// Embeds another tree by value under `key`.
    pub fn insert_tree(&mut self, key: impl Into<String>, tree: &ParameterTree) {
        self.root.insert(key.into(), tree.to_value());
    }

    /// Removes and returns a top-level entry.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.root.remove(key)
    }

    /// Returns the nested tree stored under `key`.
    pub fn subtree(&self, key: &str) -> Result<ParameterTree, LmcError> {
        let value = self.get::<Value>(key)?;
        ParameterTree::from_value(value)
    }

    /// Canonical path of the parameter file `<name>.json` inside `dir`.
    pub fn file_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.json"))
    }

    /// Returns true when `<name>.json` exists inside `dir`.
    pub fn file_exists(dir: &Path, name: &str) -> bool {
        Self::file_path(dir, name).is_file()
    }

    /// Writes the tree as pretty JSON to `<dir>/<name>.json`, creating the
    /// directory if needed. Returns the written path.
    pub fn write_to_file(&self, dir: &Path, name: &str) -> Result<PathBuf, LmcError> {
        fs::create_dir_all(dir).map_err(|err| {
            LmcError::Serde(
                ErrorInfo::new("params-mkdir", err.to_string())
                    .with_context("path", dir.display().to_string()),
            )
        })?;
        let path = Self::file_path(dir, name);
        let json = serde_json::to_string_pretty(&self.to_value()).map_err(|err| {
            LmcError::Serde(
                ErrorInfo::new("params-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(&path, json).map_err(|err| {
            LmcError::Serde(
                ErrorInfo::new("params-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Ok(path)
    }

    /// Loads a tree from `<dir>/<name>.json`.
    pub fn read_from_file(dir: &Path, name: &str) -> Result<Self, LmcError> {
        let path = Self::file_path(dir, name);
        let contents = fs::read_to_string(&path).map_err(|err| {
            LmcError::Serde(
                ErrorInfo::new("params-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        let value: Value = serde_json::from_str(&contents).map_err(|err| {
            LmcError::Serde(
                ErrorInfo::new("params-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_value(value)
    }

    /// Records the structural identity tag `<component>_name = name`.
    pub fn set_name_tag(&mut self, component: &str, name: &str) {
        self.root
            .insert(format!("{component}_name"), Value::String(name.to_string()));
    }

    /// Verifies that the tree carries the identity tag `<component>_name`
    /// with the expected value. A missing or differing tag is fatal.
    pub fn verify_name_tag(&self, component: &str, expected: &str) -> Result<(), LmcError> {
        let tag_key = format!("{component}_name");
        let found = self.get_or::<String>(&tag_key, String::new())?;
        if found != expected {
            return Err(LmcError::Config(
                ErrorInfo::new("name-tag-mismatch", "parameter tree identity tag does not match")
                    .with_context("component", component)
                    .with_context("expected", expected)
                    .with_context("found", found),
            ));
        }
        Ok(())
    }

    /// Searches the tree depth-first for the first occurrence of `key`
    /// (at any nesting level) and returns the key path leading to it.
    pub fn find_key_path(&self, key: &str) -> Option<Vec<String>> {
        find_in_object(&self.root, key, &mut Vec::new())
    }

    /// Returns the leaf value stored at `path`, if present.
    pub fn leaf(&self, path: &[String]) -> Option<&Value> {
        let mut current = self.root.get(path.first()?)?;
        for segment in &path[1..] {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Replaces the single leaf located at `path` with `value`. Every path
    /// segment must already exist; the patch never creates structure.
    pub fn patch_leaf(&mut self, path: &[String], value: Value) -> Result<(), LmcError> {
        let missing = || {
            LmcError::Config(
                ErrorInfo::new("running-parameter-missing", "parameter leaf path not found")
                    .with_context("path", path.join(".")),
            )
        };
        let (first, rest) = path.split_first().ok_or_else(missing)?;
        let mut current = self.root.get_mut(first).ok_or_else(missing)?;
        for segment in rest {
            current = current
                .as_object_mut()
                .and_then(|object| object.get_mut(segment))
                .ok_or_else(missing)?;
        }
        *current = value;
        Ok(())
    }

    /// Resolves a nested component tree the way the engine loads every
    /// sub-configuration: an inline `component` entry wins, otherwise a
    /// `<component>_path` sibling names the directory holding
    /// `<file_stem>.json`, otherwise a default tree carrying only the
    /// identity tag is generated. File loads verify the identity tag.
    pub fn resolve_component(
        &self,
        component: &str,
        file_stem: &str,
        expected_name: &str,
    ) -> Result<ParameterTree, LmcError> {
        if self.contains(component) {
            log::debug!("{component} parameters loaded from the enclosing tree");
            let mut tree = self.subtree(component)?;
            tree.set_name_tag(component, expected_name);
            return Ok(tree);
        }
        let path_key = format!("{component}_path");
        if self.contains(&path_key) {
            let dir: String = self.get(&path_key)?;
            let dir = PathBuf::from(dir);
            log::debug!(
                "{component} parameters loaded from {}",
                Self::file_path(&dir, file_stem).display()
            );
            let tree = Self::read_from_file(&dir, file_stem)?;
            tree.verify_name_tag(component, expected_name)?;
            return Ok(tree);
        }
        log::debug!("{component} parameters defaulted");
        let mut tree = ParameterTree::new();
        tree.set_name_tag(component, expected_name);
        Ok(tree)
    }
}

fn convert<T: DeserializeOwned>(key: &str, value: &Value) -> Result<T, LmcError> {
    serde_json::from_value(value.clone()).map_err(|err| {
        LmcError::Config(
            ErrorInfo::new("entry-type", "parameter entry has an unexpected type")
                .with_context("key", key)
                .with_hint(err.to_string()),
        )
    })
}

fn find_in_object(object: &Map<String, Value>, key: &str, prefix: &mut Vec<String>) -> Option<Vec<String>> {
    if object.contains_key(key) {
        let mut path = prefix.clone();
        path.push(key.to_string());
        return Some(path);
    }
    for (name, value) in object {
        if let Value::Object(nested) = value {
            prefix.push(name.clone());
            if let Some(path) = find_in_object(nested, key, prefix) {
                return Some(path);
            }
            prefix.pop();
        }
    }
    None
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tree() -> ParameterTree {
        ParameterTree::from_value(json!({
            "seed": 42,
            "systembase": {"beta": 0.4, "dimensions": [4, 4]},
        }))
        .unwrap()
    }

    #[test]
    fn typed_access_with_defaults() {
        let tree = sample_tree();
        assert_eq!(tree.get::<u64>("seed").unwrap(), 42);
        assert_eq!(tree.get_or::<u64>("absent", 7).unwrap(), 7);
        assert!(matches!(
            tree.get::<u64>("absent"),
            Err(LmcError::Config(_))
        ));
        assert!(matches!(
            tree.get::<String>("seed"),
            Err(LmcError::Config(_))
        ));
    }

    #[test]
    fn key_path_search_descends_into_nested_trees() {
        let tree = sample_tree();
        assert_eq!(
            tree.find_key_path("systembase").unwrap(),
            vec!["systembase".to_string()]
        );
        assert_eq!(
            tree.find_key_path("beta").unwrap(),
            vec!["systembase".to_string(), "beta".to_string()]
        );
        assert!(tree.find_key_path("gamma").is_none());
    }

    #[test]
    fn patch_replaces_only_the_targeted_leaf() {
        let mut tree = sample_tree();
        let path = vec!["systembase".to_string(), "beta".to_string()];
        tree.patch_leaf(&path, json!(0.7)).unwrap();
        assert_eq!(tree.leaf(&path), Some(&json!(0.7)));
        let dims = vec!["systembase".to_string(), "dimensions".to_string()];
        assert_eq!(tree.leaf(&dims), Some(&json!([4, 4])));
    }

    #[test]
    fn patch_of_an_unknown_path_is_fatal() {
        let mut tree = sample_tree();
        let path = vec!["systembase".to_string(), "gamma".to_string()];
        assert!(matches!(
            tree.patch_leaf(&path, json!(1.0)),
            Err(LmcError::Config(_))
        ));
    }

    #[test]
    fn name_tag_round_trip() {
        let mut tree = ParameterTree::new();
        tree.set_name_tag("execution_mode", "expectation_value");
        tree.verify_name_tag("execution_mode", "expectation_value")
            .unwrap();
        assert!(matches!(
            tree.verify_name_tag("execution_mode", "correlation_time"),
            Err(LmcError::Config(_))
        ));
    }
}
