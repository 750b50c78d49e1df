use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};
use snc_core::errors::{ErrorInfo, SncError};
use snc_core::graph::{GraphRole, GraphSet, SnnGraph};
use snc_exp::RunConfig;
use tracing::info;

use crate::backends::Scorer;
use crate::reference::alipour::alipour_selection;
use crate::store::missing_trace;

/// Nodes whose `counter` neuron (any replica) spiked during the simulation.
pub fn snn_selection(graph: &SnnGraph, role: GraphRole) -> Result<BTreeSet<u32>, SncError> {
    let trace = graph.trace.as_ref().ok_or_else(|| missing_trace(role))?;
    trace.validate(graph.neurons.len())?;
    Ok(graph
        .neurons
        .iter()
        .zip(&trace.spikes)
        .filter(|(_, spikes)| spikes.iter().any(|&spike| spike))
        .filter_map(|(neuron, _)| counter_node(&neuron.name))
        .collect())
}

fn counter_node(name: &str) -> Option<u32> {
    name.strip_prefix("counter_")?.split('#').next()?.parse().ok()
}

/// Reference stage-4 scorer comparing every SNN against the Alipour reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlipourScorer;

impl Scorer for AlipourScorer {
    fn compute_result(
        &self,
        m_val: i64,
        run: &RunConfig,
        graphs: &GraphSet,
    ) -> Result<BTreeMap<GraphRole, Value>, SncError> {
        if run.algorithm.name != "MDSA" {
            return Err(SncError::Configuration(
                ErrorInfo::new("unsupported_algorithm", "no scorer for algorithm")
                    .with_context("algorithm", &run.algorithm.name),
            ));
        }
        let m_val = usize::try_from(m_val).map_err(|_| {
            SncError::Configuration(
                ErrorInfo::new("param_range", "m_val must be non-negative")
                    .with_context("m_val", m_val.to_string()),
            )
        })?;
        let input = graphs.input()?;
        input.validate()?;
        let expected = alipour_selection(input, m_val);

        let mut results = BTreeMap::new();
        for role in run.expected_roles().into_iter().filter(|role| role.is_snn()) {
            let selected = snn_selection(graphs.require(role)?.as_snn()?, role)?;
            let passed = selected == expected;
            info!(%role, passed, "scored network");
            results.insert(
                role,
                json!({ "alipour": expected, "snn": selected, "passed": passed }),
            );
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::counter_node;

    #[test]
    fn counter_names_parse_with_replicas() {
        assert_eq!(counter_node("counter_12"), Some(12));
        assert_eq!(counter_node("counter_3#2"), Some(3));
        assert_eq!(counter_node("select_1_2"), None);
    }
}
