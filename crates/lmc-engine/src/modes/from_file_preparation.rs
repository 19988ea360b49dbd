use serde::{Deserialize, Serialize};

use crate::chain::{MarkovChainConfig, StartingMode};

/// Placeholder mode used when a simulation is only prepared on disk for a
/// later run with an actual execution mode. Executing a chain under this
/// mode is meaningless; its schedule is empty and its evaluation hook does
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromFilePreparation {}

impl FromFilePreparation {
    /// Identity tag and parameter-file stem of this mode.
    pub fn name() -> &'static str {
        "from_file_preparation"
    }

    /// No measurements are requested.
    pub fn measures(&self) -> Vec<String> {
        Vec::new()
    }

    /// Empty schedule; logged as a warning since running it does nothing.
    pub fn generate_markov_chain(&self) -> MarkovChainConfig {
        log::warn!("a Markov chain based on the from-file preparation mode should not be executed");
        MarkovChainConfig {
            measure_interval: 0,
            number_of_measurements: 0,
            repetitions: 0,
            start_measuring: 0,
            starting_mode: StartingMode::Hot,
        }
    }
}
