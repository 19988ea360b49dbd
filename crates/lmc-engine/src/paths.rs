use std::fs;
use std::path::PathBuf;

use lmc_core::{ErrorInfo, LmcError};

/// Directory layout for one simulation target: configuration files under
/// `configs/<target>/`, data files under `data/<target>/` and evaluation
/// results under `results/<target>/`, each created lazily on first access.
#[derive(Debug, Clone)]
pub struct SimulationPaths {
    root: PathBuf,
    target: String,
}

impl SimulationPaths {
    /// Creates the layout for `target` under `root`.
    pub fn new(root: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            target: target.into(),
        }
    }

    /// Target identifier of this simulation.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Configuration directory, created if absent.
    pub fn config_dir(&self) -> Result<PathBuf, LmcError> {
        self.ensure(self.root.join("configs").join(&self.target))
    }

    /// Data directory, created if absent.
    pub fn data_dir(&self) -> Result<PathBuf, LmcError> {
        self.ensure(self.root.join("data").join(&self.target))
    }

    /// Results directory, created if absent.
    pub fn results_dir(&self) -> Result<PathBuf, LmcError> {
        self.ensure(self.root.join("results").join(&self.target))
    }

    fn ensure(&self, dir: PathBuf) -> Result<PathBuf, LmcError> {
        fs::create_dir_all(&dir).map_err(|err| {
            LmcError::Serde(
                ErrorInfo::new("dir-create", err.to_string())
                    .with_context("path", dir.display().to_string()),
            )
        })?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn directories_are_created_lazily() {
        let root = tempdir().unwrap();
        let paths = SimulationPaths::new(root.path(), "ising_sweep");

        assert!(!root.path().join("configs").exists());
        let config_dir = paths.config_dir().unwrap();
        assert!(config_dir.is_dir());
        assert!(config_dir.ends_with("configs/ising_sweep"));

        assert!(paths.data_dir().unwrap().ends_with("data/ising_sweep"));
        assert!(paths
            .results_dir()
            .unwrap()
            .ends_with("results/ising_sweep"));
    }
}
