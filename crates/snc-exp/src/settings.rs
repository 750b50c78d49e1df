//! Schema of supported settings and validation of experiment and run configurations.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde_json::Value;
use snc_core::errors::{ErrorInfo, SncError};

use crate::config::{ExperimentConfig, ExportOptions, ParamValues, RunConfig, SimulatorKind, Variant};

/// Type and range constraint of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSchema {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
}

impl ParamSchema {
    fn check(&self, owner: &str, param: &str, value: &Value) -> Result<(), SncError> {
        let in_range = match self {
            ParamSchema::Int { min, max } => {
                let number = value.as_i64().ok_or_else(|| type_error(owner, param, "an integer", value))?;
                (*min..=*max).contains(&number)
            }
            ParamSchema::Float { min, max } => {
                let number = value.as_f64().ok_or_else(|| type_error(owner, param, "a number", value))?;
                (*min..=*max).contains(&number)
            }
        };
        if in_range {
            Ok(())
        } else {
            Err(SncError::Configuration(
                ErrorInfo::new("param_range", "parameter is out of the supported range")
                    .with_context("owner", owner)
                    .with_context("param", param)
                    .with_context("value", value.to_string())
                    .with_context("range", self.describe()),
            ))
        }
    }

    fn describe(&self) -> String {
        match self {
            ParamSchema::Int { min, max } => format!("[{min}, {max}]"),
            ParamSchema::Float { min, max } => format!("[{min}, {max}]"),
        }
    }
}

fn type_error(owner: &str, param: &str, expected: &str, value: &Value) -> SncError {
    SncError::Configuration(
        ErrorInfo::new("param_type", format!("parameter must be {expected}"))
            .with_context("owner", owner)
            .with_context("param", param)
            .with_context("value", value.to_string()),
    )
}

/// Settings this build knows how to run.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportedSettings {
    pub algorithms: BTreeMap<String, BTreeMap<String, ParamSchema>>,
    pub adaptations: BTreeMap<String, ParamSchema>,
    pub radiations: BTreeMap<String, ParamSchema>,
    pub graph_sizes: RangeInclusive<u32>,
    pub max_graphs: RangeInclusive<u32>,
    pub simulators: Vec<SimulatorKind>,
    pub export_types: Vec<String>,
}

impl Default for SupportedSettings {
    fn default() -> Self {
        let mut mdsa = BTreeMap::new();
        mdsa.insert("m_val".to_string(), ParamSchema::Int { min: 0, max: 20 });
        let mut algorithms = BTreeMap::new();
        algorithms.insert("MDSA".to_string(), mdsa);

        let mut adaptations = BTreeMap::new();
        adaptations.insert("redundancy".to_string(), ParamSchema::Int { min: 1, max: 10 });
        let mut radiations = BTreeMap::new();
        radiations.insert("neuron_death".to_string(), ParamSchema::Float { min: 0.0, max: 1.0 });

        Self {
            algorithms,
            adaptations,
            radiations,
            graph_sizes: 3..=20,
            max_graphs: 1..=15,
            simulators: vec![SimulatorKind::Nx, SimulatorKind::Simsnn],
            export_types: vec!["svg".to_string(), "dot".to_string()],
        }
    }
}

impl SupportedSettings {
    /// Validates every field of an experiment description.
    pub fn verify_experiment_config(&self, exp: &ExperimentConfig) -> Result<(), SncError> {
        if exp.algorithms.is_empty() {
            return Err(empty("algorithms"));
        }
        for (name, params) in &exp.algorithms {
            let schema = self.algorithm_schema(name)?;
            for key in params.keys() {
                if !schema.contains_key(key) {
                    return Err(unknown_param(name, key));
                }
            }
            for (key, param_schema) in schema {
                let values = params
                    .get(key)
                    .ok_or_else(|| missing_param(name, key))?
                    .resolve(key)?;
                for value in &values {
                    param_schema.check(name, key, value)?;
                }
            }
        }
        if let Some(adaptations) = exp.adaptations() {
            self.verify_variants("adaptation", adaptations, &self.adaptations)?;
        }
        if let Some(radiations) = exp.radiations() {
            self.verify_variants("radiation", radiations, &self.radiations)?;
        }
        if exp.seeds.is_empty() {
            return Err(empty("seeds"));
        }
        if exp.size_and_max_graphs.is_empty() {
            return Err(empty("size_and_max_graphs"));
        }
        for &(size, max_graphs) in &exp.size_and_max_graphs {
            self.verify_size(size)?;
            if !self.max_graphs.contains(&max_graphs) {
                return Err(SncError::Configuration(
                    ErrorInfo::new("max_graphs_range", "max graph count is out of the supported range")
                        .with_context("size", size.to_string())
                        .with_context("max_graphs", max_graphs.to_string()),
                ));
            }
        }
        if exp.simulators.is_empty() {
            return Err(empty("simulators"));
        }
        for name in &exp.simulators {
            self.verify_simulator(SimulatorKind::parse(name)?)?;
        }
        self.verify_export(&exp.export)
    }

    /// Validates one concrete run configuration.
    pub fn verify_run_config(&self, run: &RunConfig) -> Result<(), SncError> {
        let name = &run.algorithm.name;
        let schema = self.algorithm_schema(name)?;
        for key in run.algorithm.params.keys() {
            if !schema.contains_key(key) {
                return Err(unknown_param(name, key));
            }
        }
        for (key, param_schema) in schema {
            let value = run
                .algorithm
                .params
                .get(key)
                .ok_or_else(|| missing_param(name, key))?;
            param_schema.check(name, key, value)?;
        }
        if let Some(adaptation) = &run.adaptation {
            self.verify_variant("adaptation", adaptation, &self.adaptations)?;
        }
        if let Some(radiation) = &run.radiation {
            self.verify_variant("radiation", radiation, &self.radiations)?;
        }
        self.verify_size(run.graph_size)?;
        if run.graph_nr >= *self.max_graphs.end() {
            return Err(SncError::Configuration(
                ErrorInfo::new("graph_nr_range", "graph index is out of the supported range")
                    .with_context("graph_nr", run.graph_nr.to_string()),
            ));
        }
        self.verify_simulator(run.simulator)?;
        if let Some(key) = run.extra.keys().next() {
            return Err(SncError::Configuration(
                ErrorInfo::new("unknown_field", "run configuration has an unknown field")
                    .with_context("field", key),
            ));
        }
        self.verify_export(&run.export)
    }

    fn algorithm_schema(&self, name: &str) -> Result<&BTreeMap<String, ParamSchema>, SncError> {
        self.algorithms.get(name).ok_or_else(|| {
            SncError::Configuration(
                ErrorInfo::new("unsupported_algorithm", "algorithm is not supported")
                    .with_context("algorithm", name)
                    .with_hint(format!(
                        "supported algorithms: {}",
                        self.algorithms.keys().cloned().collect::<Vec<_>>().join(", ")
                    )),
            )
        })
    }

    fn verify_variants(
        &self,
        kind: &str,
        variants: &BTreeMap<String, ParamValues>,
        schema: &BTreeMap<String, ParamSchema>,
    ) -> Result<(), SncError> {
        for (name, values) in variants {
            for value in values.resolve(name)? {
                self.verify_variant(kind, &Variant::new(name.clone(), value), schema)?;
            }
        }
        Ok(())
    }

    fn verify_variant(
        &self,
        kind: &str,
        variant: &Variant,
        schema: &BTreeMap<String, ParamSchema>,
    ) -> Result<(), SncError> {
        let param_schema = schema.get(&variant.name).ok_or_else(|| {
            SncError::Configuration(
                ErrorInfo::new(format!("unsupported_{kind}"), format!("{kind} is not supported"))
                    .with_context(kind, &variant.name),
            )
        })?;
        param_schema.check(kind, &variant.name, &variant.value)
    }

    fn verify_size(&self, size: u32) -> Result<(), SncError> {
        if self.graph_sizes.contains(&size) {
            Ok(())
        } else {
            Err(SncError::Configuration(
                ErrorInfo::new("graph_size_range", "graph size is out of the supported range")
                    .with_context("size", size.to_string())
                    .with_context(
                        "range",
                        format!("[{}, {}]", self.graph_sizes.start(), self.graph_sizes.end()),
                    ),
            ))
        }
    }

    fn verify_simulator(&self, simulator: SimulatorKind) -> Result<(), SncError> {
        if self.simulators.contains(&simulator) {
            Ok(())
        } else {
            Err(SncError::Configuration(
                ErrorInfo::new("unsupported_simulator", "simulator is not supported")
                    .with_context("simulator", simulator.as_str()),
            ))
        }
    }

    fn verify_export(&self, export: &ExportOptions) -> Result<(), SncError> {
        if export.export_images && export.export_types.is_empty() {
            return Err(SncError::Configuration(
                ErrorInfo::new("missing_export_types", "image export requires at least one export type")
                    .with_hint("supported export types: svg, dot"),
            ));
        }
        match export
            .export_types
            .iter()
            .find(|ext| !self.export_types.contains(ext))
        {
            Some(ext) => Err(SncError::Configuration(
                ErrorInfo::new("unsupported_export_type", "export type is not supported")
                    .with_context("export_type", ext),
            )),
            None => Ok(()),
        }
    }
}

fn empty(field: &str) -> SncError {
    SncError::Configuration(
        ErrorInfo::new("empty_param", "setting must list at least one value").with_context("param", field),
    )
}

fn missing_param(owner: &str, param: &str) -> SncError {
    SncError::Configuration(
        ErrorInfo::new("missing_param", "required parameter is missing")
            .with_context("owner", owner)
            .with_context("param", param),
    )
}

fn unknown_param(owner: &str, param: &str) -> SncError {
    SncError::Configuration(
        ErrorInfo::new("unknown_param", "parameter is not recognised")
            .with_context("owner", owner)
            .with_context("param", param),
    )
}
