use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use lmc_core::{ErrorInfo, LmcError, ParameterTree, RngHandle};
use serde_json::json;

use crate::chain::{self, ChainSummary};
use crate::modes::ExecutionMode;
use crate::sink::{MeasurementSink, ReadableMeasure};
use crate::system::System;

/// Master seed used when the configuration does not carry one.
const DEFAULT_SEED: u64 = 0x05EE_D1A7_71CE_5EED;

/// A single configuration field swept across an explicit ordered list of
/// values, one full chain execution per value.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningParameter {
    /// Parent configuration key under which the swept field lives.
    pub kind: String,
    /// Name of the swept field.
    pub name: String,
    /// Ordered sweep values; reproducibility forbids implicit ordering.
    pub values: Vec<f64>,
}

enum Source<T> {
    Inline(T),
    FromFile(PathBuf),
}

enum ModeSource {
    Inline(ExecutionMode),
    FromFile { dir: PathBuf, name: String },
}

/// Report for one chain execution triggered by [`Simulation::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct SingleRunReport {
    /// Running-parameter value of the run, if a sweep was active.
    pub rp_value: Option<f64>,
    /// Data file the measurement rows were written to.
    pub data_file: PathBuf,
    /// Summary returned by the chain driver.
    pub chain: ChainSummary,
}

/// Aggregate report over all running-parameter values of one `run()`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// One entry per executed chain, in sweep order.
    pub runs: Vec<SingleRunReport>,
}

/// Assembles a [`Simulation`] from inline components and file references.
///
/// Each of the three sub-configurations (system, execution mode,
/// measurement processor) is either supplied inline or loaded from the
/// named directory; every combination funnels into the same canonical
/// parameter representation and the same loader, which verifies the
/// identity tag of every file it reads.
pub struct SimulationBuilder<S: System, M: MeasurementSink = ReadableMeasure> {
    system: Option<Source<ParameterTree>>,
    mode: Option<ModeSource>,
    measurement: Option<Source<M>>,
    running: Option<RunningParameter>,
    seed: Option<u64>,
    _system: PhantomData<S>,
}

impl<S: System, M: MeasurementSink> SimulationBuilder<S, M> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            system: None,
            mode: None,
            measurement: None,
            running: None,
            seed: None,
            _system: PhantomData,
        }
    }

    /// Supplies the system parameter tree inline.
    pub fn system(mut self, params: ParameterTree) -> Self {
        self.system = Some(Source::Inline(params));
        self
    }

    /// Loads the system parameters from `<dir>/<system>_params.json`.
    pub fn system_from_file(mut self, dir: impl Into<PathBuf>) -> Self {
        self.system = Some(Source::FromFile(dir.into()));
        self
    }

    /// Supplies the execution mode inline.
    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = Some(ModeSource::Inline(mode));
        self
    }

    /// Loads the execution mode named `name` from
    /// `<dir>/<name>_params.json`.
    pub fn mode_from_file(mut self, dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        self.mode = Some(ModeSource::FromFile {
            dir: dir.into(),
            name: name.into(),
        });
        self
    }

    /// Supplies the measurement sink inline.
    pub fn measurement(mut self, sink: M) -> Self {
        self.measurement = Some(Source::Inline(sink));
        self
    }

    /// Loads the sink parameters from `<dir>/<sink>_params.json`.
    pub fn measurement_from_file(mut self, dir: impl Into<PathBuf>) -> Self {
        self.measurement = Some(Source::FromFile(dir.into()));
        self
    }

    /// Configures a running-parameter sweep.
    pub fn running_parameter(
        mut self,
        kind: impl Into<String>,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Self {
        self.running = Some(RunningParameter {
            kind: kind.into(),
            name: name.into(),
            values,
        });
        self
    }

    /// Overrides the configured master seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Resolves every source into the canonical parameter representation
    /// and constructs the simulation.
    pub fn build(self) -> Result<Simulation<S, M>, LmcError> {
        let mut params = ParameterTree::new();
        params.insert("seed", json!(self.seed.unwrap_or(DEFAULT_SEED)));

        match &self.running {
            Some(running) => {
                params.insert("running_parameter_kind", json!(running.kind));
                params.insert("running_parameter", json!(running.name));
                params.insert("rp_intervals", json!(running.values));
            }
            None => {
                params.insert("running_parameter_kind", json!("None"));
                params.insert("running_parameter", json!("None"));
                params.insert("rp_intervals", json!(Vec::<f64>::new()));
            }
        }

        let system = self.system.ok_or_else(|| missing_component("system"))?;
        match system {
            Source::Inline(tree) => params.insert_tree(S::name(), &tree),
            Source::FromFile(dir) => {
                let stem = format!("{}_params", S::name());
                require_parameter_file(&dir, &stem, "system")?;
                params.insert(
                    format!("{}_path", S::name()),
                    json!(dir.display().to_string()),
                );
            }
        }

        let mode = self.mode.ok_or_else(|| missing_component("execution mode"))?;
        match mode {
            ModeSource::Inline(mode) => {
                params.insert("mode", json!(mode.name()));
                let tree = mode.to_parameters()?;
                params.insert_tree("execution_mode", &tree);
            }
            ModeSource::FromFile { dir, name } => {
                require_parameter_file(&dir, &format!("{name}_params"), "execution mode")?;
                params.insert("mode", json!(name));
                params.insert("execution_mode_path", json!(dir.display().to_string()));
            }
        }

        let measurement = self
            .measurement
            .ok_or_else(|| missing_component("measurement"))?;
        match measurement {
            Source::Inline(sink) => params.insert_tree("measurement", sink.parameters()),
            Source::FromFile(dir) => {
                let stem = format!("{}_params", M::name());
                require_parameter_file(&dir, &stem, "measurement")?;
                params.insert("measurement_path", json!(dir.display().to_string()));
            }
        }

        Simulation::from_parameters(params)
    }
}

impl<S: System, M: MeasurementSink> Default for SimulationBuilder<S, M> {
    fn default() -> Self {
        Self::new()
    }
}

fn missing_component(component: &str) -> LmcError {
    LmcError::Config(
        ErrorInfo::new("component-missing", "simulation component was not supplied")
            .with_context("component", component),
    )
}

fn require_parameter_file(dir: &Path, stem: &str, component: &str) -> Result<(), LmcError> {
    if !ParameterTree::file_exists(dir, stem) {
        return Err(LmcError::Config(
            ErrorInfo::new("config-file-missing", "referenced parameter file does not exist")
                .with_context("component", component)
                .with_context("path", ParameterTree::file_path(dir, stem).display().to_string()),
        ));
    }
    Ok(())
}

/// Orchestrates one system's parameters, an execution mode and a
/// measurement sink into sequential chain executions, optionally swept
/// over a running parameter.
pub struct Simulation<S: System, M: MeasurementSink = ReadableMeasure> {
    params: ParameterTree,
    system_params: ParameterTree,
    mode: ExecutionMode,
    sink: M,
    running: Option<RunningParameter>,
    running_path: Vec<String>,
    rng: RngHandle,
    _system: PhantomData<S>,
}

impl<S: System, M: MeasurementSink> Simulation<S, M> {
    /// Parameter-file stem of the simulation itself.
    pub fn name() -> &'static str {
        "sim_params"
    }

    /// Starts assembling a simulation.
    pub fn builder() -> SimulationBuilder<S, M> {
        SimulationBuilder::new()
    }

    /// Constructs the simulation from its canonical parameter tree,
    /// resolving the three sub-configurations (inline, from file, or
    /// defaulted) and the running-parameter path.
    pub fn from_parameters(mut params: ParameterTree) -> Result<Self, LmcError> {
        log::debug!("setting up MCMC simulation");
        params.set_name_tag("simulation", Self::name());

        let seed = params.get_or("seed", DEFAULT_SEED)?;
        let running_parameter: String =
            params.get_or("running_parameter", "None".to_string())?;
        let running_parameter_kind: String =
            params.get_or("running_parameter_kind", "None".to_string())?;
        let rp_intervals: Vec<f64> = params.get_or("rp_intervals", Vec::new())?;

        let system_params =
            params.resolve_component(S::name(), &format!("{}_params", S::name()), S::name())?;

        let mode_name: String = params.get("mode")?;
        let mode = if params.contains("execution_mode") {
            ExecutionMode::from_parameters(&mode_name, &params.subtree("execution_mode")?)?
        } else if params.contains("execution_mode_path") {
            let dir: String = params.get("execution_mode_path")?;
            ExecutionMode::from_file(Path::new(&dir), &mode_name)?
        } else {
            return Err(LmcError::Config(ErrorInfo::new(
                "execution-mode-missing",
                "neither an inline execution mode nor a mode file path was supplied",
            )));
        };

        let measurement_params = params.resolve_component(
            "measurement",
            &format!("{}_params", M::name()),
            M::name(),
        )?;
        let sink = M::from_parameters(measurement_params)?;

        let declared: Vec<String> = system_params.get_or("measures", Vec::new())?;
        if !declared.is_empty() {
            log::info!(
                "measures set by the system parameters are ignored while an execution mode is active"
            );
        }

        let running = if running_parameter != "None" {
            Some(RunningParameter {
                kind: running_parameter_kind,
                name: running_parameter,
                values: rp_intervals,
            })
        } else {
            None
        };

        let mut simulation = Self {
            params,
            system_params,
            mode,
            sink,
            running,
            running_path: Vec::new(),
            rng: RngHandle::from_seed(seed),
            _system: PhantomData,
        };

        if let Some(running) = simulation.running.clone() {
            let expanded = simulation.build_expanded_raw_parameters()?;
            let mut path = expanded.find_key_path(&running.kind).ok_or_else(|| {
                LmcError::Config(
                    ErrorInfo::new(
                        "running-parameter-kind-missing",
                        "running parameter kind not found in the expanded parameters",
                    )
                    .with_context("kind", running.kind.clone()),
                )
            })?;
            path.push(running.name.clone());
            if expanded.leaf(&path).is_none() {
                return Err(LmcError::Config(
                    ErrorInfo::new(
                        "running-parameter-missing",
                        "running parameter not found under its kind",
                    )
                    .with_context("path", path.join(".")),
                ));
            }
            simulation.running_path = path;
        }

        Ok(simulation)
    }

    /// Loads a simulation persisted by [`Simulation::write_to_file`].
    pub fn from_file(config_dir: &Path) -> Result<Self, LmcError> {
        let tree = ParameterTree::read_from_file(config_dir, Self::name())?;
        tree.verify_name_tag("simulation", Self::name())?;
        Self::from_parameters(tree)
    }

    /// The active execution mode.
    pub fn mode(&self) -> &ExecutionMode {
        &self.mode
    }

    /// The configured running parameter, if any.
    pub fn running_parameter(&self) -> Option<&RunningParameter> {
        self.running.as_ref()
    }

    /// One tree merging the simulation parameters with the expanded
    /// system, execution mode and measurement sub-trees.
    pub fn build_expanded_raw_parameters(&self) -> Result<ParameterTree, LmcError> {
        let mut expanded = self.params.clone();
        expanded.remove(&format!("{}_path", S::name()));
        expanded.remove("execution_mode_path");
        expanded.remove("measurement_path");
        expanded.insert_tree(S::name(), &self.system_params);
        let mode_tree = self.mode.to_parameters()?;
        expanded.insert_tree("execution_mode", &mode_tree);
        expanded.insert_tree("measurement", self.sink.parameters());
        Ok(expanded)
    }

    /// Executes the simulation: exactly one chain without a running
    /// parameter, otherwise one chain per sweep value in declaration
    /// order, fully sequential.
    pub fn run(&mut self) -> Result<RunReport, LmcError> {
        let mut runs = Vec::new();
        match self.running.as_ref().map(|running| running.values.clone()) {
            None => runs.push(self.single_run(None)?),
            Some(values) => {
                for value in values {
                    runs.push(self.single_run(Some(value))?);
                }
            }
        }
        Ok(RunReport { runs })
    }

    fn single_run(&mut self, rp_value: Option<f64>) -> Result<SingleRunReport, LmcError> {
        let chain_config = self.mode.generate_markov_chain(rp_value)?;

        let mut expanded = self.build_expanded_raw_parameters()?;
        if let Some(value) = rp_value {
            if let Some(running) = &self.running {
                log::info!("updating running parameter {} to {value}", running.name);
            }
            expanded.patch_leaf(&self.running_path, json!(value))?;
        }
        let mut system = S::from_parameters(expanded.subtree(S::name())?)?;
        system.set_measures(self.mode.measures());

        let rp_name = self.running.as_ref().map(|running| running.name.clone());
        self.sink
            .begin_run(self.mode.name(), rp_name.as_deref(), rp_value)?;

        // Full expanded-parameter snapshot written next to the data file.
        let data_dir = self.sink.data_dir()?;
        expanded.write_to_file(&data_dir, &self.sink.run_filename())?;

        let summary = chain::run(&chain_config, &mut system, &mut self.sink, &mut self.rng)?;
        let data_file = data_dir.join(format!("{}.dat", self.sink.run_filename()));
        Ok(SingleRunReport {
            rp_value,
            data_file,
            chain: summary,
        })
    }

    /// Persists the three sub-configurations plus the sweep metadata into
    /// `config_dir`, each component to its own identity-tagged file.
    pub fn write_to_file(&self, config_dir: &Path) -> Result<(), LmcError> {
        let mut system_tree = self.system_params.clone();
        system_tree.set_name_tag(S::name(), S::name());
        system_tree.write_to_file(config_dir, &format!("{}_params", S::name()))?;

        self.mode.write_to_file(config_dir)?;

        let mut sink_tree = self.sink.parameters().clone();
        sink_tree.set_name_tag("measurement", M::name());
        sink_tree.write_to_file(config_dir, &format!("{}_params", M::name()))?;

        let mut sim_tree = self.params.clone();
        sim_tree.remove(S::name());
        sim_tree.remove("execution_mode");
        sim_tree.remove("measurement");
        let dir_string = config_dir.display().to_string();
        sim_tree.insert(format!("{}_path", S::name()), json!(dir_string));
        sim_tree.insert("execution_mode_path", json!(dir_string));
        sim_tree.insert("measurement_path", json!(dir_string));
        sim_tree.set_name_tag("simulation", Self::name());
        sim_tree.write_to_file(config_dir, Self::name())?;
        Ok(())
    }

    /// Forwards the produced data to the external evaluation collaborator
    /// for this mode, naming the directory the results are expected in.
    pub fn evaluate(&self, results_dir: &Path) -> Result<(), LmcError> {
        let data_dir = self.sink.data_dir()?;
        let rp_name = self.running.as_ref().map(|running| running.name.as_str());
        let values: Vec<f64> = self
            .running
            .as_ref()
            .map(|running| running.values.clone())
            .unwrap_or_default();
        self.mode.evaluate(&data_dir, results_dir, rp_name, &values)
    }
}
