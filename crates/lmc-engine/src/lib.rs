#![deny(missing_docs)]

//! Generic driver for Markov chain Monte Carlo simulations of lattice-type
//! models (Ising spins, scalar fields, O(N) vectors).
//!
//! Client code supplies a [`System`] implementing state initialization, a
//! single Monte Carlo update step and a set of named measurements; the
//! engine supplies equilibration, repeated sampling, measurement
//! collection, parameter persistence and multi-stage experiment chaining
//! (equilibration time, autocorrelation time and expectation values, each
//! stage consuming the previous stage's results from disk).

/// Markov chain schedule configuration and the chain driver.
pub mod chain;
/// Measurement values, policies and the name-resolving registry.
pub mod measures;
/// Execution mode variants controlling sampling schedules per stage.
pub mod modes;
/// Directory layout conventions for configs, data and results.
pub mod paths;
/// Stage result files produced by the external evaluation step.
pub mod results;
/// Proposal samplers for client system update steps.
pub mod sampler;
/// The simulation orchestrator: sweeps, persistence and stage chaining.
pub mod simulation;
/// The measurement sink boundary and the tab-separated default writer.
pub mod sink;
/// The system contract implemented by every concrete model.
pub mod system;

pub use chain::{ChainSummary, MarkovChainConfig, StartingMode};
pub use measures::{MeasurementRegistry, MeasurementValue};
pub use modes::{
    CorrelationTime, EquilibriumTime, ExecutionMode, ExpectationValue, FromFilePreparation,
};
pub use paths::SimulationPaths;
pub use results::{canonical_rp_key, StageKind, StageResultFile};
pub use simulation::{RunReport, RunningParameter, Simulation, SimulationBuilder, SingleRunReport};
pub use sink::{MeasurementSink, ReadableMeasure};
pub use system::{SiteValue, StartMode, System};
