//! Expansion of an [`ExperimentConfig`] into concrete [`RunConfig`] values.
//!
//! Each varying dimension is a small function from a partial run to the
//! partial runs extending it, chained with `flat_map` in the order
//! algorithm, (adaptation, radiation), seed, (size, max graphs), simulator,
//! graph index.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use snc_core::errors::{ErrorInfo, SncError};
use tracing::{debug, info};

use crate::config::{
    AlgorithmChoice, ExperimentConfig, ParamValues, RunConfig, SimulatorKind, Variant,
};
use crate::settings::SupportedSettings;

#[derive(Debug, Clone, Default)]
struct PartialRun {
    algorithm: Option<AlgorithmChoice>,
    adaptation: Option<Variant>,
    radiation: Option<Variant>,
    seed: Option<u64>,
    size_and_max: Option<(u32, u32)>,
    simulator: Option<SimulatorKind>,
    graph_nr: Option<u32>,
}

impl PartialRun {
    fn finish(self, exp: &ExperimentConfig) -> Result<RunConfig, SncError> {
        let missing = |dimension: &str| {
            SncError::Configuration(
                ErrorInfo::new("incomplete_run", "expansion left a dimension unset")
                    .with_context("dimension", dimension),
            )
        };
        let (graph_size, _) = self.size_and_max.ok_or_else(|| missing("size"))?;
        Ok(RunConfig {
            algorithm: self.algorithm.ok_or_else(|| missing("algorithm"))?,
            adaptation: self.adaptation,
            radiation: self.radiation,
            seed: self.seed.ok_or_else(|| missing("seed"))?,
            graph_size,
            graph_nr: self.graph_nr.ok_or_else(|| missing("graph_nr"))?,
            simulator: self.simulator.ok_or_else(|| missing("simulator"))?,
            overwrite: exp.overwrite,
            export: exp.export.clone(),
            unique_id: None,
            extra: BTreeMap::new(),
        })
    }
}

fn fan_out<T: Clone>(
    partial: PartialRun,
    values: &[T],
    set: fn(&mut PartialRun, T),
) -> impl Iterator<Item = PartialRun> + '_ {
    values.iter().cloned().map(move |value| {
        let mut next = partial.clone();
        set(&mut next, value);
        next
    })
}

fn graph_indices(partial: PartialRun) -> impl Iterator<Item = PartialRun> {
    let count = partial.size_and_max.map(|(_, max)| max).unwrap_or(0);
    (0..count).map(move |graph_nr| {
        let mut next = partial.clone();
        next.graph_nr = Some(graph_nr);
        next
    })
}

/// Every parameter assignment of every algorithm, as a cross-product per algorithm.
fn algorithm_choices(exp: &ExperimentConfig) -> Result<Vec<AlgorithmChoice>, SncError> {
    let mut choices = Vec::new();
    for (name, params) in &exp.algorithms {
        let resolved = resolve_all(params)?;
        let mut assignments = Vec::new();
        expand_grid(&resolved, 0, BTreeMap::new(), &mut assignments);
        choices.extend(assignments.into_iter().map(|params| AlgorithmChoice {
            name: name.clone(),
            params,
        }));
    }
    Ok(choices)
}

fn resolve_all(params: &BTreeMap<String, ParamValues>) -> Result<Vec<(String, Vec<Value>)>, SncError> {
    params
        .iter()
        .map(|(name, values)| Ok((name.clone(), values.resolve(name)?)))
        .collect()
}

fn expand_grid(
    params: &[(String, Vec<Value>)],
    idx: usize,
    current: BTreeMap<String, Value>,
    outputs: &mut Vec<BTreeMap<String, Value>>,
) {
    if idx == params.len() {
        outputs.push(current);
        return;
    }
    let (name, values) = &params[idx];
    for value in values {
        let mut next = current.clone();
        next.insert(name.clone(), value.clone());
        expand_grid(params, idx + 1, next, outputs);
    }
}

/// One entry per concrete variant, or a single `None` when the family is absent.
fn variant_options(
    variants: Option<&BTreeMap<String, ParamValues>>,
) -> Result<Vec<Option<Variant>>, SncError> {
    let Some(variants) = variants else {
        return Ok(vec![None]);
    };
    let mut options = Vec::new();
    for (name, values) in variants {
        for value in values.resolve(name)? {
            options.push(Some(Variant::new(name.clone(), value)));
        }
    }
    Ok(options)
}

/// Expands against the built-in [`SupportedSettings`].
pub fn expand(exp: &ExperimentConfig) -> Result<Vec<RunConfig>, SncError> {
    expand_with(exp, &SupportedSettings::default())
}

/// Validates `exp`, generates the full cross-product and assigns identifiers.
///
/// Runs with equal identifiers are reported once, keeping the first.
pub fn expand_with(
    exp: &ExperimentConfig,
    settings: &SupportedSettings,
) -> Result<Vec<RunConfig>, SncError> {
    settings.verify_experiment_config(exp)?;

    let algorithms = algorithm_choices(exp)?;
    let variant_pairs: Vec<(Option<Variant>, Option<Variant>)> = {
        let adaptations = variant_options(exp.adaptations())?;
        let radiations = variant_options(exp.radiations())?;
        adaptations
            .iter()
            .flat_map(|adaptation| {
                radiations
                    .iter()
                    .map(move |radiation| (adaptation.clone(), radiation.clone()))
            })
            .collect()
    };
    let simulators = exp
        .simulators
        .iter()
        .map(|name| SimulatorKind::parse(name))
        .collect::<Result<Vec<_>, _>>()?;

    let partials: Vec<PartialRun> = fan_out(PartialRun::default(), &algorithms, |p, a| {
        p.algorithm = Some(a)
    })
    .flat_map(|p| {
        fan_out(p, &variant_pairs, |p, (adaptation, radiation)| {
            p.adaptation = adaptation;
            p.radiation = radiation;
        })
    })
    .flat_map(|p| fan_out(p, &exp.seeds, |p, seed| p.seed = Some(seed)))
    .flat_map(|p| fan_out(p, &exp.size_and_max_graphs, |p, pair| p.size_and_max = Some(pair)))
    .flat_map(|p| fan_out(p, &simulators, |p, simulator| p.simulator = Some(simulator)))
    .flat_map(graph_indices)
    .collect();

    let mut seen = BTreeSet::new();
    let mut runs = Vec::with_capacity(partials.len());
    for partial in partials {
        let run = partial.finish(exp)?;
        settings.verify_run_config(&run)?;
        let run = run.with_unique_id()?;
        let id = run.id()?.to_string();
        if seen.insert(id.clone()) {
            runs.push(run);
        } else {
            debug!(run = %id, "skipping duplicate run configuration");
        }
    }
    info!(runs = runs.len(), "expanded experiment configuration");
    Ok(runs)
}

/// Expands `exp` and, when `pin` is given, narrows the result to the run it
/// describes.
///
/// The pin is matched on content; a pin carrying a `unique_id` that does not
/// match its own content, or one the experiment cannot produce, is an error.
pub fn expand_pinned(
    exp: &ExperimentConfig,
    pin: Option<&RunConfig>,
) -> Result<Vec<RunConfig>, SncError> {
    let runs = expand(exp)?;
    let Some(pin) = pin else {
        return Ok(runs);
    };
    let pin_id = pin.clone().with_unique_id()?.id()?.to_string();
    match runs.into_iter().find(|run| run.unique_id.as_deref() == Some(pin_id.as_str())) {
        Some(run) => {
            info!(run = %pin_id, "pinned run configuration");
            Ok(vec![run])
        }
        None => Err(SncError::Configuration(
            ErrorInfo::new("pin_not_found", "pinned run configuration is not produced by the experiment")
                .with_context("unique_id", pin_id)
                .with_hint("check the pin's seed, graph size and parameters against the experiment settings"),
        )),
    }
}
