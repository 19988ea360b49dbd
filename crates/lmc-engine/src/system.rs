use lmc_core::{LmcError, ParameterTree, RngHandle};
use serde::{Deserialize, Serialize};

use crate::measures::MeasurementValue;

/// Initial state preparation applied at the start of a repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartMode {
    /// Randomized initial configuration.
    Hot,
    /// Fixed, ordered baseline configuration.
    Cold,
}

impl StartMode {
    /// Returns the opposite preparation, used by alternating schedules.
    pub fn flipped(self) -> Self {
        match self {
            StartMode::Hot => StartMode::Cold,
            StartMode::Cold => StartMode::Hot,
        }
    }
}

/// Scalar site values that generic measurement policies can reduce.
pub trait SiteValue: Copy {
    /// Numeric view of the site used by moment-style measurements.
    fn to_f64(self) -> f64;
    /// Canonical textual rendering used by configuration dumps.
    fn render(self) -> String;
}

macro_rules! integer_site_value {
    ($($ty:ty),*) => {
        $(impl SiteValue for $ty {
            fn to_f64(self) -> f64 {
                self as f64
            }

            fn render(self) -> String {
                self.to_string()
            }
        })*
    };
}

integer_site_value!(i8, i16, i32, i64);

impl SiteValue for f32 {
    fn to_f64(self) -> f64 {
        self as f64
    }

    fn render(self) -> String {
        format!("{self:.6}")
    }
}

impl SiteValue for f64 {
    fn to_f64(self) -> f64 {
        self
    }

    fn render(self) -> String {
        format!("{self:.6}")
    }
}

/// Contract required of every concrete model driven by the engine.
///
/// A system owns its full state representation (an array of site values)
/// plus any topology precomputed from its parameters at construction; it
/// is rebuilt from a fresh parameter tree before every running-parameter
/// value and mutated in place by [`System::update_step`]. The random
/// source is injected explicitly so that runs stay reproducible under a
/// fixed configured seed.
pub trait System: Sized {
    /// Scalar type stored at each lattice site.
    type Site: SiteValue;

    /// Component key and identity tag used for the system's parameter
    /// file (`<name>_params.json`).
    fn name() -> &'static str {
        "systembase"
    }

    /// Builds the system from its parameter tree. Invalid parameters
    /// (size mismatches, unknown options) are fatal configuration errors;
    /// there is no recovery path upstream.
    fn from_parameters(params: ParameterTree) -> Result<Self, LmcError>;

    /// The parameter tree the system was built from, for provenance
    /// snapshots and persistence.
    fn parameters(&self) -> &ParameterTree;

    /// (Re)populates the state. Called once per repetition, before any
    /// sweep of that repetition.
    fn initialize(&mut self, mode: StartMode, rng: &mut RngHandle);

    /// Advances the chain by exactly `sweeps` elementary Monte Carlo
    /// sweeps, leaving the state consistent for measurement.
    fn update_step(&mut self, sweeps: u32, rng: &mut RngHandle);

    /// Number of lattice sites.
    fn size(&self) -> usize;

    /// Value of the site at `index`.
    fn site(&self, index: usize) -> Self::Site;

    /// Mutable access to the site at `index`.
    fn site_mut(&mut self, index: usize) -> &mut Self::Site;

    /// The whole state as a flat slice of site values.
    fn representation(&self) -> &[Self::Site];

    /// Mutable view of the whole state.
    fn representation_mut(&mut self) -> &mut [Self::Site];

    /// Names of the measurements the system currently produces, in the
    /// order rows are emitted. Positional: downstream file headers and row
    /// values are matched by position, not by key.
    fn measure_names(&self) -> Vec<String>;

    /// Replaces the measurement set. Execution modes call this before a
    /// run; measures declared in the system's own parameters are ignored
    /// while a mode is active.
    fn set_measures(&mut self, names: Vec<String>);

    /// Hook invoked after equilibration, before the first measurement of
    /// a repetition.
    fn init_measurements(&mut self, _mode: StartMode, _repetition: u32) {}

    /// Produces one measurement row, ordered to match
    /// [`System::measure_names`].
    fn measure(&mut self) -> Vec<MeasurementValue>;

    /// Teardown hook invoked at the end of each repetition.
    fn finalize_measurements(&mut self, _mode: StartMode, _repetition: u32) {}
}
