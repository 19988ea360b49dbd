//! Execution mode variants.
//!
//! Each mode encapsulates the policy for how many sweeps to run, when to
//! start measuring, which measurements to request and how to resolve
//! implicit timing parameters from a previous stage's result file.

mod correlation_time;
mod equilibrium_time;
mod expectation_value;
mod from_file_preparation;

pub use correlation_time::CorrelationTime;
pub use equilibrium_time::EquilibriumTime;
pub use expectation_value::ExpectationValue;
pub use from_file_preparation::FromFilePreparation;

use std::path::{Path, PathBuf};

use lmc_core::{ErrorInfo, LmcError, ParameterTree};

use crate::chain::MarkovChainConfig;
use crate::results::{canonical_rp_key, StageKind, StageResultFile};

pub(crate) fn default_results_path() -> String {
    "None".to_string()
}

/// Shared resolution rule for implicit timing parameters: a `"None"` path
/// selects the explicit value, anything else names the directory of a
/// stage result file keyed by the running-parameter value.
pub(crate) fn resolve_stage_entry(
    path_field: &str,
    explicit: u32,
    stage: StageKind,
    rp_value: Option<f64>,
) -> Result<u32, LmcError> {
    if path_field == "None" {
        return Ok(explicit);
    }
    log::info!(
        "looking up {} for key {} in {}",
        stage.result_key(),
        canonical_rp_key(rp_value),
        ParameterTree::file_path(Path::new(path_field), stage.file_stem()).display(),
    );
    let results = StageResultFile::load(Path::new(path_field), stage)?;
    results.lookup(rp_value)
}

/// An execution mode instance, dispatching the common mode contract over
/// the four variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionMode {
    /// Determine the number of sweeps needed to reach equilibrium.
    EquilibriumTime(EquilibriumTime),
    /// Determine the autocorrelation time.
    CorrelationTime(CorrelationTime),
    /// Compute expectation values.
    ExpectationValue(ExpectationValue),
    /// Prepare configuration files only.
    FromFilePreparation(FromFilePreparation),
}

impl ExecutionMode {
    /// Identity tag and parameter-file stem of the active variant.
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionMode::EquilibriumTime(_) => EquilibriumTime::name(),
            ExecutionMode::CorrelationTime(_) => CorrelationTime::name(),
            ExecutionMode::ExpectationValue(_) => ExpectationValue::name(),
            ExecutionMode::FromFilePreparation(_) => FromFilePreparation::name(),
        }
    }

    /// Measurements the mode requests from the system.
    pub fn measures(&self) -> Vec<String> {
        match self {
            ExecutionMode::EquilibriumTime(mode) => mode.measures(),
            ExecutionMode::CorrelationTime(mode) => mode.measures(),
            ExecutionMode::ExpectationValue(mode) => mode.measures(),
            ExecutionMode::FromFilePreparation(mode) => mode.measures(),
        }
    }

    /// Rejects configurations that are invalid for the active variant.
    pub fn validate(&self) -> Result<(), LmcError> {
        match self {
            ExecutionMode::ExpectationValue(mode) => mode.validate(),
            _ => Ok(()),
        }
    }

    /// Builds the sampling schedule, resolving implicit timing parameters
    /// from stage result files where configured.
    pub fn generate_markov_chain(
        &self,
        rp_value: Option<f64>,
    ) -> Result<MarkovChainConfig, LmcError> {
        match self {
            ExecutionMode::EquilibriumTime(mode) => Ok(mode.generate_markov_chain()),
            ExecutionMode::CorrelationTime(mode) => mode.generate_markov_chain(rp_value),
            ExecutionMode::ExpectationValue(mode) => mode.generate_markov_chain(rp_value),
            ExecutionMode::FromFilePreparation(mode) => Ok(mode.generate_markov_chain()),
        }
    }

    /// Serializes the variant's parameters, tagged with its identity.
    pub fn to_parameters(&self) -> Result<ParameterTree, LmcError> {
        let value = match self {
            ExecutionMode::EquilibriumTime(mode) => serde_json::to_value(mode),
            ExecutionMode::CorrelationTime(mode) => serde_json::to_value(mode),
            ExecutionMode::ExpectationValue(mode) => serde_json::to_value(mode),
            ExecutionMode::FromFilePreparation(mode) => serde_json::to_value(mode),
        }
        .map_err(|err| {
            LmcError::Serde(ErrorInfo::new("mode-serialize", err.to_string()))
        })?;
        let mut tree = ParameterTree::from_value(value)?;
        tree.set_name_tag("execution_mode", self.name());
        Ok(tree)
    }

    /// Rebuilds a variant from its name and parameter tree.
    pub fn from_parameters(name: &str, tree: &ParameterTree) -> Result<Self, LmcError> {
        let value = tree.to_value();
        let mode = match name {
            "equilibrium_time" => serde_json::from_value(value)
                .map(ExecutionMode::EquilibriumTime),
            "correlation_time" => serde_json::from_value(value)
                .map(ExecutionMode::CorrelationTime),
            "expectation_value" => serde_json::from_value(value)
                .map(ExecutionMode::ExpectationValue),
            "from_file_preparation" => serde_json::from_value(value)
                .map(ExecutionMode::FromFilePreparation),
            other => {
                return Err(LmcError::Config(
                    ErrorInfo::new("mode-unknown", "unknown execution mode")
                        .with_context("mode", other),
                ))
            }
        }
        .map_err(|err| {
            LmcError::Config(
                ErrorInfo::new("mode-parse", "execution mode parameters are invalid")
                    .with_context("mode", name)
                    .with_hint(err.to_string()),
            )
        })?;
        mode.validate()?;
        Ok(mode)
    }

    /// Writes the mode parameters as `<mode>_params.json` into `dir`.
    pub fn write_to_file(&self, dir: &Path) -> Result<PathBuf, LmcError> {
        self.to_parameters()?
            .write_to_file(dir, &format!("{}_params", self.name()))
    }

    /// Loads `<name>_params.json` from `dir`, verifying the identity tag.
    pub fn from_file(dir: &Path, name: &str) -> Result<Self, LmcError> {
        let tree = ParameterTree::read_from_file(dir, &format!("{name}_params"))?;
        tree.verify_name_tag("execution_mode", name)?;
        Self::from_parameters(name, &tree)
    }

    /// Hands the produced data over to the external evaluation
    /// collaborator. The engine never computes final statistics itself;
    /// this hook only records the delegation. `FromFilePreparation` does
    /// nothing at all.
    pub fn evaluate(
        &self,
        data_dir: &Path,
        results_dir: &Path,
        rp_name: Option<&str>,
        rp_values: &[f64],
    ) -> Result<(), LmcError> {
        if matches!(self, ExecutionMode::FromFilePreparation(_)) {
            return Ok(());
        }
        log::info!(
            "evaluation of {} delegated to the external analysis step: data in {}, results expected in {}, running parameter {} over {} value(s)",
            self.name(),
            data_dir.display(),
            results_dir.display(),
            rp_name.unwrap_or("None"),
            rp_values.len(),
        );
        Ok(())
    }
}
