use lmc_core::LmcError;
use serde::{Deserialize, Serialize};

use crate::chain::{MarkovChainConfig, StartingMode};
use crate::modes::{default_results_path, resolve_stage_entry};
use crate::results::StageKind;

use super::equilibrium_time::default_measure;

/// Prepares the determination of the autocorrelation time of the studied
/// system.
///
/// The chain measures every sweep for `minimum_sample_size +
/// maximum_correlation_time` ticks; the autocorrelation function itself is
/// computed by the external evaluator. The equilibration length is either
/// given explicitly (`start_measuring`) or resolved from a previous
/// equilibrium-time stage result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationTime {
    /// Minimum number of samples entering each autocorrelation average.
    #[serde(default = "default_minimum_sample_size")]
    pub minimum_sample_size: u32,
    /// Maximum measurable correlation time.
    #[serde(default = "default_maximum_correlation_time")]
    pub maximum_correlation_time: u32,
    /// Explicit equilibration length, used when no stage result file is
    /// referenced.
    #[serde(default)]
    pub start_measuring: u32,
    /// Directory of `equilibrium_time_results.json`, or `"None"` to use
    /// the explicit value.
    #[serde(default = "default_results_path")]
    pub equilibrium_time_rel_results_path: String,
    /// Measure used to evaluate the autocorrelation time.
    #[serde(default = "default_measure")]
    pub measure: String,
    /// Chain initialization policy.
    #[serde(default)]
    pub starting_mode: StartingMode,
}

fn default_minimum_sample_size() -> u32 {
    100
}

fn default_maximum_correlation_time() -> u32 {
    1000
}

impl Default for CorrelationTime {
    fn default() -> Self {
        Self {
            minimum_sample_size: default_minimum_sample_size(),
            maximum_correlation_time: default_maximum_correlation_time(),
            start_measuring: 0,
            equilibrium_time_rel_results_path: default_results_path(),
            measure: default_measure(),
            starting_mode: StartingMode::default(),
        }
    }
}

impl CorrelationTime {
    /// Identity tag and parameter-file stem of this mode.
    pub fn name() -> &'static str {
        "correlation_time"
    }

    /// Measurements requested from the system during the run.
    pub fn measures(&self) -> Vec<String> {
        vec![self.measure.clone()]
    }

    /// Sampling schedule with the equilibration length resolved from the
    /// referenced stage result file when one is configured.
    pub fn generate_markov_chain(
        &self,
        rp_value: Option<f64>,
    ) -> Result<MarkovChainConfig, LmcError> {
        let start_measuring = resolve_stage_entry(
            &self.equilibrium_time_rel_results_path,
            self.start_measuring,
            StageKind::EquilibriumTime,
            rp_value,
        )?;
        Ok(MarkovChainConfig {
            measure_interval: 1,
            number_of_measurements: self.minimum_sample_size + self.maximum_correlation_time,
            repetitions: 1,
            start_measuring,
            starting_mode: self.starting_mode,
        })
    }
}
