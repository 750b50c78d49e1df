//! Experiment and run configuration types.
//!
//! An [`ExperimentConfig`] describes a family of runs compactly; the expander
//! turns it into concrete [`RunConfig`] values. Both carry a content-derived
//! `unique_id` computed by [`crate::hash::fingerprint`].

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use snc_core::errors::{ErrorInfo, SncError};
use snc_core::graph::GraphRole;

use crate::hash::{config_to_filename, fingerprint};
use crate::serde::load_settings_file;

/// Top-level fields left out of every fingerprint.
pub const NON_SEMANTIC_FIELDS: [&str; 3] = ["unique_id", "export", "overwrite"];

/// Values a single parameter takes across an experiment.
///
/// Deserialization tries a list first, then the range form, then a scalar.
/// Derived structs also accept sequences, so `List` must precede `Range`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValues {
    List(Vec<Value>),
    Range(RangeSpec),
    Single(Value),
}

/// Largest number of values a range may expand to.
pub const MAX_RANGE_LEN: usize = 10_000;

/// Integer range with exclusive `stop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeSpec {
    pub start: i64,
    pub stop: i64,
    #[serde(default = "RangeSpec::default_step")]
    pub step: i64,
}

impl RangeSpec {
    const fn default_step() -> i64 {
        1
    }

    /// Number of values, computed without stepping through the range.
    fn len(&self) -> u128 {
        let span = i128::from(self.stop) - i128::from(self.start);
        let step = i128::from(self.step);
        if step == 0 || span == 0 || (span > 0) != (step > 0) {
            return 0;
        }
        ((span.abs() + step.abs() - 1) / step.abs()) as u128
    }

    fn values(&self, name: &str) -> Result<Vec<Value>, SncError> {
        let len = self.len();
        if len > MAX_RANGE_LEN as u128 {
            return Err(SncError::Configuration(
                ErrorInfo::new("range_too_large", "range expands to too many values")
                    .with_context("param", name)
                    .with_context("len", len.to_string())
                    .with_context("max", MAX_RANGE_LEN.to_string()),
            ));
        }
        let mut out = Vec::with_capacity(len as usize);
        let mut current = Some(self.start);
        while let Some(value) = current {
            if out.len() as u128 >= len {
                break;
            }
            out.push(json!(value));
            current = value.checked_add(self.step);
        }
        Ok(out)
    }
}

impl ParamValues {
    /// Concrete values, in declaration order. An empty result is an error.
    pub fn resolve(&self, name: &str) -> Result<Vec<Value>, SncError> {
        let values = match self {
            ParamValues::Range(range) if range.step == 0 => {
                return Err(SncError::Configuration(
                    ErrorInfo::new("range_step", "range step must be non-zero")
                        .with_context("param", name),
                ))
            }
            ParamValues::Range(range) => range.values(name)?,
            ParamValues::List(values) => values.clone(),
            ParamValues::Single(value) => vec![value.clone()],
        };
        if values.is_empty() {
            return Err(SncError::Configuration(
                ErrorInfo::new("empty_param", "parameter resolves to no values")
                    .with_context("param", name),
            ));
        }
        Ok(values)
    }
}

impl From<Value> for ParamValues {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(values) => ParamValues::List(values),
            other => ParamValues::Single(other),
        }
    }
}

/// Per-stage overwrite switches (stages 1 to 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StageOverwrites {
    pub creation: bool,
    pub propagation: bool,
    pub visualisation: bool,
    pub results: bool,
}

impl StageOverwrites {
    /// Switch for a 1-based stage index.
    pub fn for_stage(&self, stage: u8) -> bool {
        match stage {
            1 => self.creation,
            2 => self.propagation,
            3 => self.visualisation,
            4 => self.results,
            _ => false,
        }
    }
}

/// Image export and interactive display options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportOptions {
    pub export_images: bool,
    pub export_types: Vec<String>,
    pub show_snns: bool,
}

impl ExportOptions {
    /// Whether stage 3 has anything to do.
    pub fn visualisation_requested(&self) -> bool {
        self.export_images || self.show_snns
    }

    /// Extensions images are written with; empty unless exporting.
    pub fn image_extensions(&self) -> &[String] {
        if self.export_images {
            &self.export_types
        } else {
            &[]
        }
    }
}

/// Backend the SNNs are simulated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulatorKind {
    Nx,
    Simsnn,
}

impl SimulatorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SimulatorKind::Nx => "nx",
            SimulatorKind::Simsnn => "simsnn",
        }
    }

    pub fn parse(name: &str) -> Result<Self, SncError> {
        match name {
            "nx" => Ok(SimulatorKind::Nx),
            "simsnn" => Ok(SimulatorKind::Simsnn),
            other => Err(SncError::Configuration(
                ErrorInfo::new("unsupported_simulator", "simulator is not supported")
                    .with_context("simulator", other)
                    .with_hint("use one of: nx, simsnn"),
            )),
        }
    }
}

impl Display for SimulatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compact experiment description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub algorithms: BTreeMap<String, BTreeMap<String, ParamValues>>,
    #[serde(default)]
    pub adaptations: Option<BTreeMap<String, ParamValues>>,
    #[serde(default)]
    pub radiations: Option<BTreeMap<String, ParamValues>>,
    pub seeds: Vec<u64>,
    pub size_and_max_graphs: Vec<(u32, u32)>,
    pub simulators: Vec<String>,
    #[serde(default)]
    pub overwrite: StageOverwrites,
    #[serde(default)]
    pub export: ExportOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
}

impl ExperimentConfig {
    /// Built-in MDSA experiment exercising adaptation and radiation.
    pub fn default_mdsa() -> Self {
        let mut mdsa = BTreeMap::new();
        mdsa.insert("m_val".to_string(), ParamValues::List(vec![json!(0), json!(1)]));
        let mut algorithms = BTreeMap::new();
        algorithms.insert("MDSA".to_string(), mdsa);

        let mut adaptations = BTreeMap::new();
        adaptations.insert("redundancy".to_string(), ParamValues::Single(json!(2)));
        let mut radiations = BTreeMap::new();
        radiations.insert("neuron_death".to_string(), ParamValues::Single(json!(0.25)));

        Self {
            algorithms,
            adaptations: Some(adaptations),
            radiations: Some(radiations),
            seeds: vec![5],
            size_and_max_graphs: vec![(3, 1), (4, 2)],
            simulators: vec![SimulatorKind::Nx.as_str().to_string()],
            overwrite: StageOverwrites::default(),
            export: ExportOptions::default(),
            unique_id: None,
        }
    }

    /// Loads an experiment description from a YAML or JSON file.
    ///
    /// Shape errors (wrong field types, malformed size/count tuples) surface
    /// as configuration errors rather than serde errors.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SncError> {
        load_settings_file(path.as_ref()).map_err(|err| match err {
            SncError::Serde(info) if info.code != "settings_read" => SncError::Configuration(
                ErrorInfo::new("malformed_settings", info.message)
                    .with_context("path", path.as_ref().display().to_string()),
            ),
            other => other,
        })
    }

    /// Adaptation settings, `None` when absent or empty.
    pub fn adaptations(&self) -> Option<&BTreeMap<String, ParamValues>> {
        self.adaptations.as_ref().filter(|map| !map.is_empty())
    }

    /// Radiation settings, `None` when absent or empty.
    pub fn radiations(&self) -> Option<&BTreeMap<String, ParamValues>> {
        self.radiations.as_ref().filter(|map| !map.is_empty())
    }

    pub fn fingerprint(&self) -> Result<String, SncError> {
        fingerprint(&self.normalised(), &NON_SEMANTIC_FIELDS)
    }

    /// Filename stem for the experiment report.
    pub fn filename(&self) -> Result<String, SncError> {
        config_to_filename(&self.normalised(), &NON_SEMANTIC_FIELDS)
    }

    /// Sets `unique_id`, rejecting a supplied id that does not match the content.
    pub fn with_unique_id(mut self) -> Result<Self, SncError> {
        let computed = self.fingerprint()?;
        check_unique_id(self.unique_id.as_deref(), &computed)?;
        self.unique_id = Some(computed);
        Ok(self)
    }

    fn normalised(&self) -> Self {
        let mut copy = self.clone();
        copy.adaptations = self.adaptations().cloned();
        copy.radiations = self.radiations().cloned();
        copy
    }
}

fn check_unique_id(supplied: Option<&str>, computed: &str) -> Result<(), SncError> {
    match supplied {
        Some(id) if id != computed => Err(SncError::Configuration(
            ErrorInfo::new("unique_id_mismatch", "unique_id does not match configuration content")
                .with_context("supplied", id)
                .with_context("computed", computed),
        )),
        _ => Ok(()),
    }
}

/// Algorithm name with one concrete parameter assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmChoice {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl AlgorithmChoice {
    /// Integer parameter `key`, failing on absence or a non-integer value.
    pub fn int_param(&self, key: &str) -> Result<i64, SncError> {
        let value = self.params.get(key).ok_or_else(|| {
            SncError::Configuration(
                ErrorInfo::new("missing_param", "required parameter is missing")
                    .with_context("algorithm", &self.name)
                    .with_context("param", key),
            )
        })?;
        value.as_i64().ok_or_else(|| {
            SncError::Configuration(
                ErrorInfo::new("param_type", "parameter must be an integer")
                    .with_context("algorithm", &self.name)
                    .with_context("param", key)
                    .with_context("value", value.to_string()),
            )
        })
    }
}

/// One adaptation or radiation setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub value: Value,
}

impl Variant {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Directory category for artifacts of this variant, e.g. `neuron_death_0.25`.
    pub fn category(&self) -> String {
        let value = match &self.value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        format!("{}_{}", self.name, value)
    }
}

/// One concrete point of an experiment's cross-product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub algorithm: AlgorithmChoice,
    pub adaptation: Option<Variant>,
    pub radiation: Option<Variant>,
    pub seed: u64,
    pub graph_size: u32,
    pub graph_nr: u32,
    pub simulator: SimulatorKind,
    #[serde(default)]
    pub overwrite: StageOverwrites,
    #[serde(default)]
    pub export: ExportOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    /// Fields this version does not know about, kept so reconciliation sees them.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RunConfig {
    /// Loads a run configuration from a YAML or JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SncError> {
        load_settings_file(path)
    }

    pub fn fingerprint(&self) -> Result<String, SncError> {
        fingerprint(self, &NON_SEMANTIC_FIELDS)
    }

    /// Sets `unique_id`, rejecting a supplied id that does not match the content.
    pub fn with_unique_id(mut self) -> Result<Self, SncError> {
        let computed = self.fingerprint()?;
        check_unique_id(self.unique_id.as_deref(), &computed)?;
        self.unique_id = Some(computed);
        Ok(self)
    }

    /// The assigned identifier; runs are only driven after expansion assigned one.
    pub fn id(&self) -> Result<&str, SncError> {
        self.unique_id.as_deref().ok_or_else(|| {
            SncError::Configuration(
                ErrorInfo::new("missing_unique_id", "run configuration has no unique_id")
                    .with_hint("expand the experiment configuration before running"),
            )
        })
    }

    pub fn has_adaptation(&self) -> bool {
        self.adaptation.is_some()
    }

    pub fn has_radiation(&self) -> bool {
        self.radiation.is_some()
    }

    /// Graph roles this run produces.
    pub fn expected_roles(&self) -> Vec<GraphRole> {
        GraphRole::expected(self.has_adaptation(), self.has_radiation())
    }

    /// Iteration count of the MDSA algorithm.
    pub fn m_val(&self) -> Result<i64, SncError> {
        self.algorithm.int_param("m_val")
    }

    /// Number of simulated timesteps: enough for the weakest node's rank
    /// spike to propagate through selection and counting.
    pub fn sim_duration(&self) -> usize {
        self.graph_size as usize + 2
    }

    /// Directory category of a role's artifacts: `snns` or the radiation setting.
    pub fn category(&self, role: GraphRole) -> String {
        match (&self.radiation, role.with_radiation()) {
            (Some(radiation), true) => radiation.category(),
            _ => "snns".to_string(),
        }
    }

    /// Field-for-field view used for reconciliation.
    pub fn to_fields(&self) -> Result<serde_json::Map<String, Value>, SncError> {
        match crate::serde::to_canonical_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(SncError::serde(
                "run_config_shape",
                format!("run configuration serialized as {other}"),
            )),
        }
    }

    /// Inverse of [`RunConfig::to_fields`].
    pub fn from_fields(fields: serde_json::Map<String, Value>) -> Result<Self, SncError> {
        serde_json::from_value(Value::Object(fields))
            .map_err(|err| SncError::serde("run_config_fields", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_resolves_exclusive_stop() {
        let range = ParamValues::Range(RangeSpec {
            start: 1,
            stop: 7,
            step: 2,
        });
        assert_eq!(range.resolve("m_val").unwrap(), vec![json!(1), json!(3), json!(5)]);
    }

    #[test]
    fn empty_list_is_rejected() {
        let err = ParamValues::List(Vec::new()).resolve("m_val").unwrap_err();
        assert_eq!(err.info().code, "empty_param");
    }

    #[test]
    fn untagged_forms_deserialize() {
        let single: ParamValues = serde_json::from_str("3").unwrap();
        let list: ParamValues = serde_json::from_str("[1, 2]").unwrap();
        let range: ParamValues = serde_json::from_str(r#"{"start": 0, "stop": 2}"#).unwrap();
        assert_eq!(single, ParamValues::Single(json!(3)));
        assert_eq!(list, ParamValues::List(vec![json!(1), json!(2)]));
        assert_eq!(range.resolve("x").unwrap(), vec![json!(0), json!(1)]);
        let triple: ParamValues = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(triple.resolve("x").unwrap().len(), 3);
    }

    #[test]
    fn ranges_near_the_integer_limit_stop_cleanly() {
        let range = ParamValues::Range(RangeSpec {
            start: i64::MAX - 1,
            stop: i64::MAX,
            step: 2,
        });
        assert_eq!(range.resolve("m_val").unwrap(), vec![json!(i64::MAX - 1)]);
        let down = ParamValues::Range(RangeSpec {
            start: i64::MIN + 1,
            stop: i64::MIN,
            step: -3,
        });
        assert_eq!(down.resolve("m_val").unwrap(), vec![json!(i64::MIN + 1)]);
    }

    #[test]
    fn huge_ranges_are_rejected_before_expansion() {
        let range = ParamValues::Range(RangeSpec {
            start: 0,
            stop: 1_000_000_000_000,
            step: 1,
        });
        let err = range.resolve("m_val").unwrap_err();
        assert_eq!(err.info().code, "range_too_large");
        let backwards = ParamValues::Range(RangeSpec {
            start: 0,
            stop: 5,
            step: -1,
        });
        assert_eq!(backwards.resolve("m_val").unwrap_err().info().code, "empty_param");
    }
}
