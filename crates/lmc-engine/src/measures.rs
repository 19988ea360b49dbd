use std::fmt::{self, Display};

use crate::system::{SiteValue, System};

/// A single measurement result, kept open only at the sink boundary; the
/// numeric path inside the engine works on concrete site values.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementValue {
    /// Integer-valued measurement.
    Int(i64),
    /// Floating point measurement.
    Float(f64),
    /// Textual measurement, e.g. a whole-configuration dump.
    Text(String),
}

impl Display for MeasurementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementValue::Int(value) => write!(f, "{value}"),
            MeasurementValue::Float(value) => write!(f, "{value:.6}"),
            MeasurementValue::Text(value) => write!(f, "{value}"),
        }
    }
}

/// A stateless measurement computation over a system snapshot.
pub trait MeasurePolicy<S: System> {
    /// Name under which the policy is declared in configurations.
    fn name(&self) -> &'static str;
    /// Computes the measurement from the current state.
    fn apply(&self, system: &S) -> MeasurementValue;
}

struct Mean;
struct AbsMean;
struct Abs;
struct Variance;
struct SecondMoment;
struct FourthMoment;
struct ConfigDump;

fn site_mean<S: System>(system: &S) -> f64 {
    let sum: f64 = system
        .representation()
        .iter()
        .map(|site| site.to_f64())
        .sum();
    sum / system.size() as f64
}

fn moment<S: System>(system: &S, power: i32) -> f64 {
    let sum: f64 = system
        .representation()
        .iter()
        .map(|site| site.to_f64().powi(power))
        .sum();
    sum / system.size() as f64
}

impl<S: System> MeasurePolicy<S> for Mean {
    fn name(&self) -> &'static str {
        "Mean"
    }

    fn apply(&self, system: &S) -> MeasurementValue {
        MeasurementValue::Float(site_mean(system))
    }
}

impl<S: System> MeasurePolicy<S> for AbsMean {
    fn name(&self) -> &'static str {
        "AbsMean"
    }

    fn apply(&self, system: &S) -> MeasurementValue {
        MeasurementValue::Float(site_mean(system).abs())
    }
}

impl<S: System> MeasurePolicy<S> for Abs {
    fn name(&self) -> &'static str {
        "Abs"
    }

    fn apply(&self, system: &S) -> MeasurementValue {
        let sum: f64 = system
            .representation()
            .iter()
            .map(|site| site.to_f64().abs())
            .sum();
        MeasurementValue::Float(sum / system.size() as f64)
    }
}

impl<S: System> MeasurePolicy<S> for Variance {
    fn name(&self) -> &'static str {
        "Variance"
    }

    fn apply(&self, system: &S) -> MeasurementValue {
        let mean = site_mean(system);
        MeasurementValue::Float((moment(system, 2) - mean * mean).max(0.0))
    }
}

impl<S: System> MeasurePolicy<S> for SecondMoment {
    fn name(&self) -> &'static str {
        "SecondMoment"
    }

    fn apply(&self, system: &S) -> MeasurementValue {
        MeasurementValue::Float(moment(system, 2))
    }
}

impl<S: System> MeasurePolicy<S> for FourthMoment {
    fn name(&self) -> &'static str {
        "FourthMoment"
    }

    fn apply(&self, system: &S) -> MeasurementValue {
        MeasurementValue::Float(moment(system, 4))
    }
}

impl<S: System> MeasurePolicy<S> for ConfigDump {
    fn name(&self) -> &'static str {
        "Config"
    }

    fn apply(&self, system: &S) -> MeasurementValue {
        let rendered: Vec<String> = system
            .representation()
            .iter()
            .map(|site| site.render())
            .collect();
        MeasurementValue::Text(rendered.join(" "))
    }
}

fn builtin<S: System>(name: &str) -> Option<Box<dyn MeasurePolicy<S>>> {
    match name {
        "Mean" => Some(Box::new(Mean)),
        "AbsMean" => Some(Box::new(AbsMean)),
        "Abs" => Some(Box::new(Abs)),
        "Variance" => Some(Box::new(Variance)),
        "SecondMoment" => Some(Box::new(SecondMoment)),
        "FourthMoment" => Some(Box::new(FourthMoment)),
        "Config" => Some(Box::new(ConfigDump)),
        _ => None,
    }
}

/// Resolves declared measurement names to computation policies.
///
/// Policies are kept in declaration order so that file headers and row
/// values stay positionally aligned. Names the engine does not recognize
/// are dropped without error: configurations legitimately carry a
/// superset of names that only the external post-processing step
/// understands, and those must pass through the engine untouched.
pub struct MeasurementRegistry<S: System> {
    policies: Vec<Box<dyn MeasurePolicy<S>>>,
}

impl<S: System> MeasurementRegistry<S> {
    /// Builds a registry from declared names, preserving declaration
    /// order and silently dropping unknown names.
    pub fn resolve(names: &[String]) -> Self {
        let mut policies = Vec::with_capacity(names.len());
        for name in names {
            match builtin::<S>(name) {
                Some(policy) => policies.push(policy),
                None => log::debug!(
                    "measure {name} is not known to the engine; left to post-hoc evaluation"
                ),
            }
        }
        Self { policies }
    }

    /// Names of the resolved policies, in emission order.
    pub fn names(&self) -> Vec<String> {
        self.policies
            .iter()
            .map(|policy| policy.name().to_string())
            .collect()
    }

    /// Number of resolved policies.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// True when no declared name resolved to a policy.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Computes one ordered measurement row from the current state.
    pub fn measure(&self, system: &S) -> Vec<MeasurementValue> {
        self.policies
            .iter()
            .map(|policy| policy.apply(system))
            .collect()
    }
}

impl<S: System> Default for MeasurementRegistry<S> {
    fn default() -> Self {
        Self {
            policies: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmc_core::{LmcError, ParameterTree, RngHandle};
    use crate::system::StartMode;

    struct FixedSystem {
        params: ParameterTree,
        sites: Vec<f64>,
        registry: MeasurementRegistry<FixedSystem>,
    }

    impl FixedSystem {
        fn with_sites(sites: Vec<f64>) -> Self {
            Self {
                params: ParameterTree::new(),
                sites,
                registry: MeasurementRegistry::default(),
            }
        }
    }

    impl System for FixedSystem {
        type Site = f64;

        fn from_parameters(params: ParameterTree) -> Result<Self, LmcError> {
            Ok(Self {
                params,
                sites: Vec::new(),
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

    #[test]
    fn registry_preserves_declaration_order() {
        let names = vec![
            "SecondMoment".to_string(),
            "Mean".to_string(),
            "Config".to_string(),
        ];
        let registry = MeasurementRegistry::<FixedSystem>::resolve(&names);
        assert_eq!(registry.names(), names);
    }

    #[test]
    fn unknown_names_are_dropped_without_error() {
        let names = vec![
            "Mean".to_string(),
            "WilsonLoop".to_string(),
            "SecondMoment".to_string(),
        ];
        let registry = MeasurementRegistry::<FixedSystem>::resolve(&names);
        assert_eq!(registry.names(), vec!["Mean", "SecondMoment"]);
    }

    #[test]
    fn moment_policies_compute_site_averages() {
        let mut system = FixedSystem::with_sites(vec![1.0, -1.0, 1.0, 1.0]);
        system.set_measures(vec![
            "Mean".to_string(),
            "AbsMean".to_string(),
            "Abs".to_string(),
            "SecondMoment".to_string(),
            "Variance".to_string(),
        ]);
        let row = system.measure();
        assert_eq!(row[0], MeasurementValue::Float(0.5));
        assert_eq!(row[1], MeasurementValue::Float(0.5));
        assert_eq!(row[2], MeasurementValue::Float(1.0));
        assert_eq!(row[3], MeasurementValue::Float(1.0));
        assert_eq!(row[4], MeasurementValue::Float(0.75));
    }

    #[test]
    fn config_dump_renders_every_site() {
        let mut system = FixedSystem::with_sites(vec![0.5, -0.25]);
        system.set_measures(vec!["Config".to_string()]);
        let row = system.measure();
        assert_eq!(
            row[0],
            MeasurementValue::Text("0.500000 -0.250000".to_string())
        );
    }

    #[test]
    fn values_render_canonically() {
        assert_eq!(MeasurementValue::Int(-3).to_string(), "-3");
        assert_eq!(MeasurementValue::Float(0.4).to_string(), "0.400000");
        assert_eq!(MeasurementValue::Text("a b".to_string()).to_string(), "a b");
    }
}
