use lmc_core::{LmcError, RngHandle};
use serde::{Deserialize, Serialize};

use crate::sink::MeasurementSink;
use crate::system::{StartMode, System};

/// Configured chain initialization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartingMode {
    /// Every repetition starts from a randomized state.
    Hot,
    /// Every repetition starts from the ordered baseline state.
    Cold,
    /// Repetitions alternate hot and cold, starting hot.
    Alternating,
}

impl Default for StartingMode {
    fn default() -> Self {
        StartingMode::Hot
    }
}

impl StartingMode {
    /// Preparation applied to the first repetition.
    pub fn first(self) -> StartMode {
        match self {
            StartingMode::Hot | StartingMode::Alternating => StartMode::Hot,
            StartingMode::Cold => StartMode::Cold,
        }
    }
}

/// Sampling schedule for one or more independent chain repetitions.
/// Immutable once constructed; fully determines the sweep schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkovChainConfig {
    /// Number of sweeps between consecutive measurements.
    #[serde(default = "default_measure_interval")]
    pub measure_interval: u32,
    /// Number of measurements per repetition.
    #[serde(default = "default_number_of_measurements")]
    pub number_of_measurements: u32,
    /// Number of independent chain repetitions.
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    /// Number of equilibration sweeps discarded before the first
    /// measurement of each repetition.
    #[serde(default)]
    pub start_measuring: u32,
    /// Initialization policy across repetitions.
    #[serde(default)]
    pub starting_mode: StartingMode,
}

fn default_measure_interval() -> u32 {
    1
}

fn default_number_of_measurements() -> u32 {
    1000
}

fn default_repetitions() -> u32 {
    1
}

impl Default for MarkovChainConfig {
    fn default() -> Self {
        Self {
            measure_interval: default_measure_interval(),
            number_of_measurements: default_number_of_measurements(),
            repetitions: default_repetitions(),
            start_measuring: 0,
            starting_mode: StartingMode::default(),
        }
    }
}

impl MarkovChainConfig {
    /// Total number of elementary sweeps the schedule performs across all
    /// repetitions, known before the run starts.
    pub fn total_sweeps(&self) -> u64 {
        u64::from(self.repetitions)
            * (u64::from(self.start_measuring)
                + u64::from(self.number_of_measurements) * u64::from(self.measure_interval))
    }
}

/// Summary returned by the chain driver after all repetitions complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSummary {
    /// Repetitions executed.
    pub repetitions: u32,
    /// Measurement rows forwarded to the sink.
    pub rows_recorded: u64,
    /// Elementary sweeps performed.
    pub sweeps_performed: u64,
}

/// Drives the configured repetitions over `system`, forwarding every
/// measurement row to `sink`.
///
/// Per repetition: initialize, equilibrate for `start_measuring` sweeps,
/// then alternate measuring and updating for `measure_interval` sweeps.
/// No step is retried; the first error from the system or the sink aborts
/// the whole chain.
pub fn run<S: System, M: MeasurementSink>(
    config: &MarkovChainConfig,
    system: &mut S,
    sink: &mut M,
    rng: &mut RngHandle,
) -> Result<ChainSummary, LmcError> {
    log::info!(
        "running {} Markov chain(s): {} measurements each, measure interval {}, {} equilibration sweeps, {} total sweeps",
        config.repetitions,
        config.number_of_measurements,
        config.measure_interval,
        config.start_measuring,
        config.total_sweeps(),
    );

    let mut mode = config.starting_mode.first();
    let mut rows_recorded = 0u64;
    let mut sweeps_performed = 0u64;

    for repetition in 0..config.repetitions {
        system.initialize(mode, rng);

        system.update_step(config.start_measuring, rng);
        sweeps_performed += u64::from(config.start_measuring);

        sink.begin_repetition(&system.measure_names(), repetition)?;
        system.init_measurements(mode, repetition);

        for _ in 0..config.number_of_measurements {
            let row = system.measure();
            sink.record(&row)?;
            rows_recorded += 1;

            system.update_step(config.measure_interval, rng);
            sweeps_performed += u64::from(config.measure_interval);
        }

        sink.end_repetition()?;
        system.finalize_measurements(mode, repetition);

        if config.starting_mode == StartingMode::Alternating {
            mode = mode.flipped();
        }
    }

    log::info!("finished MCMC run(s)");

    Ok(ChainSummary {
        repetitions: config.repetitions,
        rows_recorded,
        sweeps_performed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_sweeps_follows_the_schedule_arithmetic() {
        let config = MarkovChainConfig {
            measure_interval: 10,
            number_of_measurements: 100,
            repetitions: 3,
            start_measuring: 50,
            starting_mode: StartingMode::Hot,
        };
        assert_eq!(config.total_sweeps(), 3 * (50 + 100 * 10));
    }

    #[test]
    fn starting_mode_round_trips_through_serde() {
        let config = MarkovChainConfig {
            starting_mode: StartingMode::Alternating,
            ..MarkovChainConfig::default()
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["starting_mode"], "alternating");
        let back: MarkovChainConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }
}
