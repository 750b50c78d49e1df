//! Reference input graphs and MDSA spiking networks.

use rand::seq::SliceRandom;
use rand::Rng;
use snc_core::errors::{ErrorInfo, SncError};
use snc_core::graph::{
    GraphEntry, GraphRole, GraphSet, InputGraph, Neuron, SimulatorHandle, SnnGraph, Synapse,
};
use snc_core::rng::{graph_seed, RngHandle, SUBSTREAM_RADIATION, SUBSTREAM_RAND_NRS, SUBSTREAM_TOPOLOGY};
use snc_exp::{RunConfig, SimulatorKind, Variant};
use tracing::debug;

use crate::backends::GraphGenerator;
use crate::reference::alipour::{alipour_weights, priority_ranks};

const EXTRA_EDGE_PROBABILITY: f64 = 0.3;
const INHIBITION: f64 = -100.0;
const SPIKE_THRESHOLD: f64 = 0.25;
const SIMULATOR_TIME_STEP: f64 = 1.0;

/// Connected random graph: a shuffled spanning path plus random extra edges,
/// with a random permutation of `0..size` as per-node random numbers.
pub fn random_input_graph(size: u32, seed: u64) -> InputGraph {
    let mut topology = RngHandle::substream(seed, SUBSTREAM_TOPOLOGY);
    let mut order: Vec<u32> = (0..size).collect();
    order.shuffle(&mut topology);
    let mut edges: Vec<(u32, u32)> = order.windows(2).map(|pair| (pair[0], pair[1])).collect();
    for a in 0..size {
        for b in (a + 1)..size {
            if topology.gen_bool(EXTRA_EDGE_PROBABILITY) {
                edges.push((a, b));
            }
        }
    }
    let mut numbers = RngHandle::substream(seed, SUBSTREAM_RAND_NRS);
    let mut rand_nrs: Vec<u32> = (0..size).collect();
    rand_nrs.shuffle(&mut numbers);
    InputGraph::new(size, edges, rand_nrs)
}

#[derive(Default)]
struct NetworkBuilder {
    graph: SnnGraph,
}

impl NetworkBuilder {
    fn neuron(&mut self, name: String, bias: f64, du: f64, dv: f64, vth: f64) -> usize {
        let idx = self.graph.neurons.len();
        self.graph.neurons.push(Neuron {
            name,
            bias,
            du,
            dv,
            vth,
        });
        idx
    }

    fn synapse(&mut self, pre: usize, post: usize, weight: f64) {
        self.graph.synapses.push(Synapse { pre, post, weight });
    }
}

/// MDSA network on `input` for `m_val` rounds.
///
/// `rank_{u}` integrates a constant bias and spikes once, at its priority
/// rank. `select_{v}_{u}` latches on the first rank spike in the closed
/// neighbourhood of `v` and inhibits its siblings. `counter_{u}` spikes once
/// some node selected `u`.
pub fn mdsa_snn(input: &InputGraph, m_val: usize) -> SnnGraph {
    let weights = alipour_weights(input, m_val);
    let ranks = priority_ranks(input, &weights);
    let mut net = NetworkBuilder::default();

    let rank: Vec<usize> = (0..input.size)
        .map(|node| {
            let vth = f64::from(ranks[node as usize]) + 0.5;
            net.neuron(format!("rank_{node}"), 1.0, 0.0, 0.0, vth)
        })
        .collect();
    for &idx in &rank {
        net.synapse(idx, idx, INHIBITION);
    }
    let counter: Vec<usize> = (0..input.size)
        .map(|node| net.neuron(format!("counter_{node}"), 0.0, 1.0, 1.0, SPIKE_THRESHOLD))
        .collect();

    for node in 0..input.size {
        let hood = input.closed_neighbourhood(node);
        let select: Vec<usize> = hood
            .iter()
            .map(|candidate| {
                net.neuron(
                    format!("select_{node}_{candidate}"),
                    0.0,
                    0.0,
                    1.0,
                    SPIKE_THRESHOLD,
                )
            })
            .collect();
        for (&candidate, &idx) in hood.iter().zip(&select) {
            net.synapse(rank[candidate as usize], idx, 1.0);
            net.synapse(idx, counter[candidate as usize], 1.0);
            for &sibling in select.iter().filter(|&&sibling| sibling != idx) {
                net.synapse(idx, sibling, INHIBITION);
            }
        }
    }
    debug!(
        neurons = net.graph.neurons.len(),
        synapses = net.graph.synapses.len(),
        "built mdsa network"
    );
    net.graph
}

/// Network with `copies` replicas of every neuron. Every synapse connects all
/// replica pairs with its weight divided by `copies`, so one dead replica
/// weakens but does not remove an input.
pub fn with_redundancy(graph: &SnnGraph, copies: usize) -> SnnGraph {
    let copies = copies.max(1);
    let neurons = graph
        .neurons
        .iter()
        .flat_map(|neuron| {
            (0..copies).map(move |copy| Neuron {
                name: if copy == 0 {
                    neuron.name.clone()
                } else {
                    format!("{}#{copy}", neuron.name)
                },
                ..neuron.clone()
            })
        })
        .collect();
    let scale = copies as f64;
    let synapses = graph
        .synapses
        .iter()
        .flat_map(|synapse| {
            (0..copies).flat_map(move |from| {
                (0..copies).map(move |to| Synapse {
                    pre: synapse.pre * copies + from,
                    post: synapse.post * copies + to,
                    weight: synapse.weight / scale,
                })
            })
        })
        .collect();
    SnnGraph {
        neurons,
        synapses,
        ..SnnGraph::default()
    }
}

/// Copy of `graph` in which every neuron died with probability `probability`.
pub fn irradiate(graph: &SnnGraph, probability: f64, seed: u64) -> SnnGraph {
    let mut rng = RngHandle::substream(seed, SUBSTREAM_RADIATION);
    let mut damaged = graph.clone();
    damaged.dead_neurons = graph
        .neurons
        .iter()
        .filter(|_| rng.gen::<f64>() < probability)
        .map(|neuron| neuron.name.clone())
        .collect();
    damaged
}

/// Reference stage-1 generator.
#[derive(Debug, Clone, Default)]
pub struct MdsaGenerator {
    fixed_input: Option<InputGraph>,
}

impl MdsaGenerator {
    /// Generator that uses `graph` for every run instead of generating one.
    pub fn with_input_graph(graph: InputGraph) -> Self {
        Self {
            fixed_input: Some(graph),
        }
    }

    fn input_graph(&self, run: &RunConfig, seed: u64) -> Result<InputGraph, SncError> {
        let Some(fixed) = &self.fixed_input else {
            return Ok(random_input_graph(run.graph_size, seed));
        };
        if fixed.size != run.graph_size {
            return Err(SncError::Configuration(
                ErrorInfo::new("input_graph_size", "input graph size differs from the run's graph size")
                    .with_context("graph_size", run.graph_size.to_string())
                    .with_context("input_size", fixed.size.to_string()),
            ));
        }
        let graph = InputGraph::new(fixed.size, fixed.edges.iter().copied(), fixed.rand_nrs.clone());
        graph.validate()?;
        Ok(graph)
    }
}

fn redundancy(variant: &Variant) -> Result<usize, SncError> {
    match (variant.name.as_str(), variant.value.as_u64()) {
        ("redundancy", Some(copies)) if copies >= 1 => Ok(copies as usize),
        _ => Err(SncError::Configuration(
            ErrorInfo::new("unsupported_adaptation", "adaptation is not supported")
                .with_context("adaptation", variant.category()),
        )),
    }
}

fn death_probability(variant: &Variant) -> Result<f64, SncError> {
    match (variant.name.as_str(), variant.value.as_f64()) {
        ("neuron_death", Some(p)) if (0.0..=1.0).contains(&p) => Ok(p),
        _ => Err(SncError::Configuration(
            ErrorInfo::new("unsupported_radiation", "radiation is not supported")
                .with_context("radiation", variant.category()),
        )),
    }
}

fn wrap(simulator: SimulatorKind, graph: SnnGraph) -> GraphEntry {
    match simulator {
        SimulatorKind::Nx => GraphEntry::Snn(graph),
        SimulatorKind::Simsnn => GraphEntry::Simulator(SimulatorHandle {
            network: graph,
            time_step: SIMULATOR_TIME_STEP,
        }),
    }
}

impl GraphGenerator for MdsaGenerator {
    fn get_used_graphs(&self, run: &RunConfig) -> Result<GraphSet, SncError> {
        let m_val = usize::try_from(run.m_val()?).map_err(|_| {
            SncError::Configuration(
                ErrorInfo::new("param_range", "m_val must be non-negative").with_context("param", "m_val"),
            )
        })?;
        let seed = graph_seed(run.seed, run.graph_size, run.graph_nr);
        let input = self.input_graph(run, seed)?;
        let base = mdsa_snn(&input, m_val);
        let adapted = run
            .adaptation
            .as_ref()
            .map(|variant| Ok::<_, SncError>(with_redundancy(&base, redundancy(variant)?)))
            .transpose()?;

        let mut graphs = GraphSet::new();
        if let Some(radiation) = &run.radiation {
            let probability = death_probability(radiation)?;
            graphs.insert(
                GraphRole::RadSnnAlgo,
                wrap(run.simulator, irradiate(&base, probability, seed)),
            );
            if let Some(adapted) = &adapted {
                graphs.insert(
                    GraphRole::RadAdaptedSnn,
                    wrap(run.simulator, irradiate(adapted, probability, seed)),
                );
            }
        }
        if let Some(adapted) = adapted {
            graphs.insert(GraphRole::AdaptedSnn, wrap(run.simulator, adapted));
        }
        graphs.insert(GraphRole::SnnAlgo, wrap(run.simulator, base));
        graphs.insert(GraphRole::Input, GraphEntry::Input(input));
        Ok(graphs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_graphs_are_connected_and_reproducible() {
        let graph = random_input_graph(6, 11);
        assert_eq!(graph, random_input_graph(6, 11));
        assert!(graph.validate().is_ok());
        assert!((0..6).all(|node| graph.degree(node) >= 1));
        let mut nrs = graph.rand_nrs.clone();
        nrs.sort_unstable();
        assert_eq!(nrs, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn redundancy_replicates_neurons_and_synapses() {
        let base = mdsa_snn(&random_input_graph(3, 1), 0);
        let adapted = with_redundancy(&base, 2);
        assert_eq!(adapted.neurons.len(), base.neurons.len() * 2);
        assert_eq!(adapted.synapses.len(), base.synapses.len() * 4);
        assert!(adapted.neuron_index("counter_0#1").is_some());
    }
}
