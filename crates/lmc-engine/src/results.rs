use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lmc_core::{ErrorInfo, LmcError, ParameterTree};

/// Canonical key under which a running-parameter value is stored in stage
/// result files and encoded into data file names.
///
/// The external evaluator writes keys with this exact format; fixing it in
/// one place keeps the writer/reader coupling testable in isolation.
pub fn canonical_rp_key(rp_value: Option<f64>) -> String {
    match rp_value {
        None => "default".to_string(),
        Some(value) => format!("{value:.6}"),
    }
}

/// The two timing stages whose results a later mode can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// Equilibration length estimates.
    EquilibriumTime,
    /// Autocorrelation length estimates.
    CorrelationTime,
}

impl StageKind {
    /// Top-level key inside the stage result file.
    pub fn result_key(self) -> &'static str {
        match self {
            StageKind::EquilibriumTime => "EquilibriumTime",
            StageKind::CorrelationTime => "CorrelationTime",
        }
    }

    /// File stem of the stage result file.
    pub fn file_stem(self) -> &'static str {
        match self {
            StageKind::EquilibriumTime => "equilibrium_time_results",
            StageKind::CorrelationTime => "correlation_time_results",
        }
    }
}

/// An on-disk mapping from running-parameter keys to a scalar timing
/// value, produced by the external evaluation step and consumed by a
/// later execution mode.
#[derive(Debug, Clone)]
pub struct StageResultFile {
    stage: StageKind,
    path: PathBuf,
    entries: BTreeMap<String, u32>,
}

impl StageResultFile {
    /// Loads `<dir>/<stage>_results.json`. A missing or malformed file is
    /// a fatal dependency error: running a later stage without a valid
    /// timing estimate would silently produce meaningless statistics.
    pub fn load(dir: &Path, stage: StageKind) -> Result<Self, LmcError> {
        let path = ParameterTree::file_path(dir, stage.file_stem());
        let tree = ParameterTree::read_from_file(dir, stage.file_stem()).map_err(|err| {
            LmcError::Dependency(
                ErrorInfo::new("stage-results-missing", "stage result file could not be read")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.info().message.clone()),
            )
        })?;
        if !tree.contains(stage.result_key()) {
            return Err(LmcError::Dependency(
                ErrorInfo::new("stage-key-missing", "stage result file lacks its stage key")
                    .with_context("path", path.display().to_string())
                    .with_context("key", stage.result_key()),
            ));
        }
        let entries: BTreeMap<String, u32> = tree.get(stage.result_key())?;
        Ok(Self {
            stage,
            path,
            entries,
        })
    }

    /// Looks up the timing value recorded for the given running-parameter
    /// value (`"default"` when no sweep is active). A missing key is a
    /// fatal dependency error naming the file and key.
    pub fn lookup(&self, rp_value: Option<f64>) -> Result<u32, LmcError> {
        let key = canonical_rp_key(rp_value);
        self.entries.get(&key).copied().ok_or_else(|| {
            LmcError::Dependency(
                ErrorInfo::new("stage-entry-missing", "no stage result for running parameter")
                    .with_context("path", self.path.display().to_string())
                    .with_context("stage", self.stage.result_key())
                    .with_context("key", key),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn keys_use_six_decimal_formatting() {
        assert_eq!(canonical_rp_key(None), "default");
        assert_eq!(canonical_rp_key(Some(0.4)), "0.400000");
        assert_eq!(canonical_rp_key(Some(2.0)), "2.000000");
    }

    #[test]
    fn lookups_resolve_default_and_swept_keys() {
        let dir = tempdir().unwrap();
        let tree = ParameterTree::from_value(json!({
            "EquilibriumTime": {"default": 37, "0.400000": 52},
        }))
        .unwrap();
        tree.write_to_file(dir.path(), "equilibrium_time_results")
            .unwrap();

        let results = StageResultFile::load(dir.path(), StageKind::EquilibriumTime).unwrap();
        assert_eq!(results.lookup(None).unwrap(), 37);
        assert_eq!(results.lookup(Some(0.4)).unwrap(), 52);
        assert!(matches!(
            results.lookup(Some(0.5)),
            Err(LmcError::Dependency(_))
        ));
    }

    #[test]
    fn missing_files_and_stage_keys_are_dependency_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            StageResultFile::load(dir.path(), StageKind::CorrelationTime),
            Err(LmcError::Dependency(_))
        ));

        ParameterTree::from_value(json!({"EquilibriumTime": {}}))
            .unwrap()
            .write_to_file(dir.path(), "correlation_time_results")
            .unwrap();
        assert!(matches!(
            StageResultFile::load(dir.path(), StageKind::CorrelationTime),
            Err(LmcError::Dependency(_))
        ));
    }
}
