use lmc_core::{LmcError, ParameterTree, RngHandle};
use lmc_engine::measures::{MeasurementRegistry, MeasurementValue};
use lmc_engine::modes::{CorrelationTime, ExecutionMode, ExpectationValue};
use lmc_engine::sink::ReadableMeasure;
use lmc_engine::simulation::Simulation;
use lmc_engine::system::{StartMode, System};
use serde_json::json;
use std::path::Path;
use tempfile::tempdir;

/// System with a frozen state; only the sweep accounting matters here.
struct FrozenSystem {
    params: ParameterTree,
    sites: Vec<f64>,
    registry: MeasurementRegistry<FrozenSystem>,
}

impl System for FrozenSystem {
    type Site = f64;

    fn from_parameters(params: ParameterTree) -> Result<Self, LmcError> {
        Ok(Self {
            params,
            sites: vec![1.0, -1.0],
            registry: MeasurementRegistry::default(),
        })
    }

    fn parameters(&self) -> &ParameterTree {
        &self.params
    }

    fn initialize(&mut self, _mode: StartMode, _rng: &mut RngHandle) {}

    fn update_step(&mut self, _sweeps: u32, _rng: &mut RngHandle) {}

    fn size(&self) -> usize {
        self.sites.len()
    }

    fn site(&self, index: usize) -> f64 {
        self.sites[index]
    }

    fn site_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.sites[index]
    }

    fn representation(&self) -> &[f64] {
        &self.sites
    }

    fn representation_mut(&mut self) -> &mut [f64] {
        &mut self.sites
    }

    fn measure_names(&self) -> Vec<String> {
        self.registry.names()
    }

    fn set_measures(&mut self, names: Vec<String>) {
        self.registry = MeasurementRegistry::resolve(&names);
    }

    fn measure(&mut self) -> Vec<MeasurementValue> {
        self.registry.measure(self)
    }
}

fn write_stage_results(dir: &Path, stem: &str, value: serde_json::Value) {
    ParameterTree::from_value(value)
        .unwrap()
        .write_to_file(dir, stem)
        .unwrap();
}

fn build_simulation(
    data_dir: &Path,
    mode: ExecutionMode,
    sweep: Option<Vec<f64>>,
) -> Result<Simulation<FrozenSystem>, LmcError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut builder = Simulation::<FrozenSystem>::builder()
        .system(ParameterTree::from_value(json!({"beta": 0.5})).unwrap())
        .mode(mode)
        .measurement(ReadableMeasure::new(data_dir))
        .seed(5);
    if let Some(values) = sweep {
        builder = builder.running_parameter("systembase", "beta", values);
    }
    builder.build()
}

#[test]
fn expectation_value_resolves_equilibration_from_the_default_key() {
    let dir = tempdir().unwrap();
    write_stage_results(
        dir.path(),
        "equilibrium_time_results",
        json!({"EquilibriumTime": {"default": 37}}),
    );

    let mode = ExecutionMode::ExpectationValue(ExpectationValue {
        number_of_measurements: 2,
        equilibrium_time_rel_results_path: dir.path().display().to_string(),
        ..ExpectationValue::default()
    });
    let mut simulation = build_simulation(dir.path(), mode, None).unwrap();
    let report = simulation.run().unwrap();

    // One repetition: 37 equilibration sweeps plus 2 measured intervals.
    assert_eq!(report.runs[0].chain.sweeps_performed, 37 + 2);
}

#[test]
fn stage_lookups_are_keyed_by_the_running_parameter_value() {
    let dir = tempdir().unwrap();
    write_stage_results(
        dir.path(),
        "equilibrium_time_results",
        json!({"EquilibriumTime": {"0.500000": 21}}),
    );

    let mode = ExecutionMode::CorrelationTime(CorrelationTime {
        minimum_sample_size: 3,
        maximum_correlation_time: 4,
        equilibrium_time_rel_results_path: dir.path().display().to_string(),
        ..CorrelationTime::default()
    });
    let mut simulation = build_simulation(dir.path(), mode, Some(vec![0.5])).unwrap();
    let report = simulation.run().unwrap();

    // 21 equilibration sweeps, then 3 + 4 measured sweeps at interval 1.
    assert_eq!(report.runs[0].chain.sweeps_performed, 21 + 7);
}

#[test]
fn a_missing_stage_key_aborts_the_sweep() {
    let dir = tempdir().unwrap();
    write_stage_results(
        dir.path(),
        "equilibrium_time_results",
        json!({"EquilibriumTime": {"0.500000": 21}}),
    );

    let mode = ExecutionMode::CorrelationTime(CorrelationTime {
        equilibrium_time_rel_results_path: dir.path().display().to_string(),
        ..CorrelationTime::default()
    });
    let mut simulation = build_simulation(dir.path(), mode, Some(vec![0.75])).unwrap();
    assert!(matches!(
        simulation.run(),
        Err(LmcError::Dependency(_))
    ));
}

#[test]
fn a_missing_stage_file_aborts_before_any_sampling() {
    let dir = tempdir().unwrap();
    let mode = ExecutionMode::ExpectationValue(ExpectationValue {
        correlation_time_rel_results_path: dir.path().join("absent").display().to_string(),
        ..ExpectationValue::default()
    });
    let mut simulation = build_simulation(dir.path(), mode, None).unwrap();
    assert!(matches!(
        simulation.run(),
        Err(LmcError::Dependency(_))
    ));
}

#[test]
fn both_stages_chain_into_the_expectation_value_schedule() {
    let dir = tempdir().unwrap();
    write_stage_results(
        dir.path(),
        "equilibrium_time_results",
        json!({"EquilibriumTime": {"default": 10}}),
    );
    write_stage_results(
        dir.path(),
        "correlation_time_results",
        json!({"CorrelationTime": {"default": 4}}),
    );

    let mode = ExecutionMode::ExpectationValue(ExpectationValue {
        number_of_measurements: 3,
        equilibrium_time_rel_results_path: dir.path().display().to_string(),
        correlation_time_rel_results_path: dir.path().display().to_string(),
        ..ExpectationValue::default()
    });
    let mut simulation = build_simulation(dir.path(), mode, None).unwrap();
    let report = simulation.run().unwrap();

    assert_eq!(report.runs[0].chain.sweeps_performed, 10 + 3 * 4);
}
