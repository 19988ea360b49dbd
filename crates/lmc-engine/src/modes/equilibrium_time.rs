use serde::{Deserialize, Serialize};

use crate::chain::{MarkovChainConfig, StartingMode};

/// Prepares the determination of the number of sweeps a system needs to
/// reach equilibrium.
///
/// The chain alternates hot and cold starts across `2 * sample_size`
/// repetitions so the external evaluator can compare the averaged hot and
/// cold evolutions; the configurations are considered equilibrated once
/// the two ensemble averages agree within `confidence_range`.
/// `confidence_range`, `confidence_window` and `measure` are consumed by
/// the evaluation step, not by the sampling schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquilibriumTime {
    /// Number of independent chains per ensemble (hot and cold each).
    #[serde(default = "default_sample_size")]
    pub sample_size: u32,
    /// Number of measured sweeps per chain.
    #[serde(default = "default_number_of_steps")]
    pub number_of_steps: u32,
    /// Confidence range between the hot and cold ensemble averages.
    #[serde(default = "default_confidence_range")]
    pub confidence_range: f64,
    /// Smoothing window (in sweeps) applied by the evaluator.
    #[serde(default = "default_confidence_window")]
    pub confidence_window: u32,
    /// Measure observed to decide equilibration.
    #[serde(default = "default_measure")]
    pub measure: String,
}

fn default_sample_size() -> u32 {
    100
}

fn default_number_of_steps() -> u32 {
    1000
}

fn default_confidence_range() -> f64 {
    0.1
}

fn default_confidence_window() -> u32 {
    10
}

pub(crate) fn default_measure() -> String {
    "Mean".to_string()
}

impl Default for EquilibriumTime {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            number_of_steps: default_number_of_steps(),
            confidence_range: default_confidence_range(),
            confidence_window: default_confidence_window(),
            measure: default_measure(),
        }
    }
}

impl EquilibriumTime {
    /// Identity tag and parameter-file stem of this mode.
    pub fn name() -> &'static str {
        "equilibrium_time"
    }

    /// Measurements requested from the system during the run.
    pub fn measures(&self) -> Vec<String> {
        vec![self.measure.clone()]
    }

    /// Sampling schedule: every sweep is measured, starting immediately,
    /// with alternating hot and cold repetitions.
    pub fn generate_markov_chain(&self) -> MarkovChainConfig {
        MarkovChainConfig {
            measure_interval: 1,
            number_of_measurements: self.number_of_steps,
            repetitions: 2 * self.sample_size,
            start_measuring: 0,
            starting_mode: StartingMode::Alternating,
        }
    }
}
