use lmc_core::{ErrorInfo, LmcError};
use serde::{Deserialize, Serialize};

use crate::chain::{MarkovChainConfig, StartingMode};
use crate::modes::{default_results_path, resolve_stage_entry};
use crate::results::StageKind;

/// Prepares the computation of expectation values.
///
/// Both implicit timing parameters can be chained from earlier stages:
/// the measure interval from a correlation-time stage and the
/// equilibration length from an equilibrium-time stage. `post_measures`,
/// `error_type` and `n_means_bootstrap` are persisted for the external
/// evaluation step only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationValue {
    /// Explicit number of sweeps between measurements, used when no
    /// correlation-time stage result is referenced.
    #[serde(default = "default_measure_interval")]
    pub measure_interval: u32,
    /// Total number of measurements.
    #[serde(default = "default_number_of_measurements")]
    pub number_of_measurements: u32,
    /// Explicit equilibration length, used when no equilibrium-time stage
    /// result is referenced.
    #[serde(default)]
    pub start_measuring: u32,
    /// Directory of `equilibrium_time_results.json`, or `"None"`.
    #[serde(default = "default_results_path")]
    pub equilibrium_time_rel_results_path: String,
    /// Directory of `correlation_time_results.json`, or `"None"`.
    #[serde(default = "default_results_path")]
    pub correlation_time_rel_results_path: String,
    /// Measurements recorded during the simulation. Must not be empty.
    #[serde(default = "default_measures")]
    pub measures: Vec<String>,
    /// Additional measures computed only by the external evaluator;
    /// storing configurations (`"Config"` in `measures`) is required for
    /// these to work.
    #[serde(default)]
    pub post_measures: Vec<String>,
    /// Chain initialization policy.
    #[serde(default)]
    pub starting_mode: StartingMode,
    /// Error estimation method used by the evaluator.
    #[serde(default = "default_error_type")]
    pub error_type: String,
    /// Number of bootstrap samples used by the evaluator; zero selects
    /// the plain standard error.
    #[serde(default)]
    pub n_means_bootstrap: u32,
}

fn default_measure_interval() -> u32 {
    1
}

fn default_number_of_measurements() -> u32 {
    1000
}

fn default_measures() -> Vec<String> {
    vec!["Mean".to_string()]
}

fn default_error_type() -> String {
    "statistical".to_string()
}

impl Default for ExpectationValue {
    fn default() -> Self {
        Self {
            measure_interval: default_measure_interval(),
            number_of_measurements: default_number_of_measurements(),
            start_measuring: 0,
            equilibrium_time_rel_results_path: default_results_path(),
            correlation_time_rel_results_path: default_results_path(),
            measures: default_measures(),
            post_measures: Vec::new(),
            starting_mode: StartingMode::default(),
            error_type: default_error_type(),
            n_means_bootstrap: 0,
        }
    }
}

impl ExpectationValue {
    /// Identity tag and parameter-file stem of this mode.
    pub fn name() -> &'static str {
        "expectation_value"
    }

    /// Measurements requested from the system during the run.
    pub fn measures(&self) -> Vec<String> {
        self.measures.clone()
    }

    /// Rejects configurations that could never produce a data file.
    pub fn validate(&self) -> Result<(), LmcError> {
        if self.measures.is_empty() {
            return Err(LmcError::Config(ErrorInfo::new(
                "measures-empty",
                "expectation value mode requires at least one measure",
            )));
        }
        Ok(())
    }

    /// Sampling schedule with both implicit timing parameters resolved
    /// from their stage result files when configured.
    pub fn generate_markov_chain(
        &self,
        rp_value: Option<f64>,
    ) -> Result<MarkovChainConfig, LmcError> {
        let measure_interval = resolve_stage_entry(
            &self.correlation_time_rel_results_path,
            self.measure_interval,
            StageKind::CorrelationTime,
            rp_value,
        )?;
        let start_measuring = resolve_stage_entry(
            &self.equilibrium_time_rel_results_path,
            self.start_measuring,
            StageKind::EquilibriumTime,
            rp_value,
        )?;
        Ok(MarkovChainConfig {
            measure_interval,
            number_of_measurements: self.number_of_measurements,
            repetitions: 1,
            start_measuring,
            starting_mode: self.starting_mode,
        })
    }
}
