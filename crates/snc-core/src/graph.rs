//! Graph model threaded through the four pipeline stages.
//!
//! A [`GraphSet`] maps each [`GraphRole`] to a tagged [`GraphEntry`]. The
//! representation (plain input graph, SNN graph or simulator handle) is
//! resolved once when the generator builds the set; consumers match on the
//! variant instead of probing the value at every call site.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ErrorInfo, SncError};

/// Index of the last pipeline stage.
pub const FINAL_STAGE: u8 = 4;

/// Role a graph plays within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GraphRole {
    /// The (non-spiking) input graph the algorithm runs on.
    #[serde(rename = "input_graph")]
    Input,
    /// Unmodified SNN encoding of the algorithm.
    #[serde(rename = "snn_algo_graph")]
    SnnAlgo,
    /// SNN encoding after structural adaptation.
    #[serde(rename = "adapted_snn_graph")]
    AdaptedSnn,
    /// Unmodified SNN encoding with radiation damage.
    #[serde(rename = "rad_snn_algo_graph")]
    RadSnnAlgo,
    /// Adapted SNN encoding with radiation damage.
    #[serde(rename = "rad_adapted_snn_graph")]
    RadAdaptedSnn,
}

impl GraphRole {
    /// All SNN roles in canonical order.
    pub const SNN_ROLES: [GraphRole; 4] = [
        GraphRole::SnnAlgo,
        GraphRole::AdaptedSnn,
        GraphRole::RadSnnAlgo,
        GraphRole::RadAdaptedSnn,
    ];

    /// Stable textual name used in filenames and serialized artifacts.
    pub fn name(self) -> &'static str {
        match self {
            GraphRole::Input => "input_graph",
            GraphRole::SnnAlgo => "snn_algo_graph",
            GraphRole::AdaptedSnn => "adapted_snn_graph",
            GraphRole::RadSnnAlgo => "rad_snn_algo_graph",
            GraphRole::RadAdaptedSnn => "rad_adapted_snn_graph",
        }
    }

    /// Whether the role is one of the SNN encodings.
    pub fn is_snn(self) -> bool {
        self != GraphRole::Input
    }

    /// Whether the role carries structural adaptation.
    pub fn with_adaptation(self) -> bool {
        matches!(self, GraphRole::AdaptedSnn | GraphRole::RadAdaptedSnn)
    }

    /// Whether the role carries radiation damage.
    pub fn with_radiation(self) -> bool {
        matches!(self, GraphRole::RadSnnAlgo | GraphRole::RadAdaptedSnn)
    }

    /// Roles a run must produce given whether it adapts and/or irradiates.
    pub fn expected(has_adaptation: bool, has_radiation: bool) -> Vec<GraphRole> {
        let mut roles = vec![GraphRole::Input];
        roles.extend(
            Self::SNN_ROLES
                .into_iter()
                .filter(|role| !role.with_adaptation() || has_adaptation)
                .filter(|role| !role.with_radiation() || has_radiation),
        );
        roles
    }
}

impl Display for GraphRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Undirected input graph with the per-node random numbers used for tie-breaking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputGraph {
    /// Number of nodes; nodes are labelled `0..size`.
    pub size: u32,
    /// Undirected edges with `a < b`, sorted.
    pub edges: Vec<(u32, u32)>,
    /// Random number per node, drawn from the graph's random-number stream.
    pub rand_nrs: Vec<u32>,
    /// Stages this graph has completed.
    #[serde(default)]
    pub completed_stages: BTreeSet<u8>,
}

impl InputGraph {
    /// Builds a graph from an edge list, normalising edge orientation and order.
    pub fn new(size: u32, edges: impl IntoIterator<Item = (u32, u32)>, rand_nrs: Vec<u32>) -> Self {
        let edges: BTreeSet<(u32, u32)> = edges
            .into_iter()
            .filter(|(a, b)| a != b)
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect();
        Self {
            size,
            edges: edges.into_iter().collect(),
            rand_nrs,
            completed_stages: BTreeSet::new(),
        }
    }

    /// Neighbours of `node`, excluding the node itself, in ascending order.
    pub fn neighbours(&self, node: u32) -> Vec<u32> {
        let mut out: Vec<u32> = self
            .edges
            .iter()
            .filter_map(|&(a, b)| match (a == node, b == node) {
                (true, _) => Some(b),
                (_, true) => Some(a),
                _ => None,
            })
            .collect();
        out.sort_unstable();
        out
    }

    /// Closed neighbourhood of `node` (the node plus its neighbours), ascending.
    pub fn closed_neighbourhood(&self, node: u32) -> Vec<u32> {
        let mut out = self.neighbours(node);
        out.push(node);
        out.sort_unstable();
        out
    }

    /// Degree of `node`.
    pub fn degree(&self, node: u32) -> usize {
        self.neighbours(node).len()
    }

    /// Checks node labels, edge endpoints and random-number coverage.
    pub fn validate(&self) -> Result<(), SncError> {
        if self.rand_nrs.len() != self.size as usize {
            return Err(SncError::StructuralIntegrity(
                ErrorInfo::new("rand_nrs_len", "one random number per node is required")
                    .with_context("size", self.size.to_string())
                    .with_context("rand_nrs", self.rand_nrs.len().to_string()),
            ));
        }
        if let Some(&(a, b)) = self.edges.iter().find(|(a, b)| *a >= self.size || *b >= self.size)
        {
            return Err(SncError::StructuralIntegrity(
                ErrorInfo::new("edge_out_of_range", "edge endpoint exceeds graph size")
                    .with_context("edge", format!("{a}-{b}"))
                    .with_context("size", self.size.to_string()),
            ));
        }
        Ok(())
    }
}

/// Current-based leaky integrate-and-fire neuron.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    /// Unique neuron name within its graph.
    pub name: String,
    /// Constant input added to the voltage every timestep.
    pub bias: f64,
    /// Current decay factor in `[0, 1]`.
    pub du: f64,
    /// Voltage decay factor in `[0, 1]`.
    pub dv: f64,
    /// Spike threshold; the neuron spikes when its voltage exceeds it.
    pub vth: f64,
}

/// Directed synapse between two neurons of the same graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synapse {
    /// Index of the presynaptic neuron.
    pub pre: usize,
    /// Index of the postsynaptic neuron.
    pub post: usize,
    /// Synaptic weight.
    pub weight: f64,
}

/// Per-neuron simulation trace, every matrix indexed `[neuron][timestep]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Trace {
    /// Voltage matrix.
    #[serde(rename = "V")]
    pub v: Vec<Vec<f64>>,
    /// Current matrix.
    #[serde(rename = "I")]
    pub i: Vec<Vec<f64>>,
    /// Spike matrix.
    pub spikes: Vec<Vec<bool>>,
}

impl Trace {
    /// Number of simulated timesteps.
    pub fn duration(&self) -> usize {
        self.spikes.first().map(Vec::len).unwrap_or(0)
    }

    /// Whether neuron `neuron` spiked at timestep `t`.
    pub fn spiked(&self, neuron: usize, t: usize) -> bool {
        self.spikes
            .get(neuron)
            .and_then(|row| row.get(t))
            .copied()
            .unwrap_or(false)
    }

    /// Checks that all three matrices agree with the neuron count and with each other.
    pub fn validate(&self, neurons: usize) -> Result<(), SncError> {
        let duration = self.duration();
        let shapes_match = [self.v.len(), self.i.len(), self.spikes.len()]
            .iter()
            .all(|&rows| rows == neurons)
            && self.v.iter().all(|row| row.len() == duration)
            && self.i.iter().all(|row| row.len() == duration)
            && self.spikes.iter().all(|row| row.len() == duration);
        if shapes_match {
            Ok(())
        } else {
            Err(SncError::StructuralIntegrity(
                ErrorInfo::new("trace_shape", "trace matrices do not match the network")
                    .with_context("neurons", neurons.to_string())
                    .with_context("duration", duration.to_string()),
            ))
        }
    }
}

/// Spiking neural network encoding of the algorithm on one input graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SnnGraph {
    /// Neurons in a stable order; trace rows follow this order.
    pub neurons: Vec<Neuron>,
    /// Synapses referencing neurons by index.
    pub synapses: Vec<Synapse>,
    /// Names of neurons killed by radiation.
    #[serde(default)]
    pub dead_neurons: BTreeSet<String>,
    /// Stages this graph has completed.
    #[serde(default)]
    pub completed_stages: BTreeSet<u8>,
    /// Simulation trace, present from stage 2 onwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Trace>,
    /// Scored result, present after stage 4.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
}

impl SnnGraph {
    /// Index of the neuron called `name`.
    pub fn neuron_index(&self, name: &str) -> Option<usize> {
        self.neurons.iter().position(|neuron| neuron.name == name)
    }

    /// Whether the neuron at `index` was killed by radiation.
    pub fn is_dead(&self, index: usize) -> bool {
        self.neurons
            .get(index)
            .map(|neuron| self.dead_neurons.contains(&neuron.name))
            .unwrap_or(false)
    }
}

/// SNN graph bundled with the settings of a stepping simulator backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorHandle {
    /// Network the simulator runs.
    pub network: SnnGraph,
    /// Integration time step.
    pub time_step: f64,
}

/// Tagged graph representation stored per role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "graph", rename_all = "snake_case")]
pub enum GraphEntry {
    /// The input graph.
    Input(InputGraph),
    /// A plain SNN graph.
    Snn(SnnGraph),
    /// An SNN graph owned by a stepping simulator.
    Simulator(SimulatorHandle),
}

impl GraphEntry {
    /// Short name of the representation for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            GraphEntry::Input(_) => "input",
            GraphEntry::Snn(_) => "snn",
            GraphEntry::Simulator(_) => "simulator",
        }
    }

    /// Stages completed by this entry.
    pub fn completed_stages(&self) -> &BTreeSet<u8> {
        match self {
            GraphEntry::Input(graph) => &graph.completed_stages,
            GraphEntry::Snn(graph) => &graph.completed_stages,
            GraphEntry::Simulator(handle) => &handle.network.completed_stages,
        }
    }

    /// Records completion of `stage`.
    pub fn mark_stage(&mut self, stage: u8) {
        let stages = match self {
            GraphEntry::Input(graph) => &mut graph.completed_stages,
            GraphEntry::Snn(graph) => &mut graph.completed_stages,
            GraphEntry::Simulator(handle) => &mut handle.network.completed_stages,
        };
        stages.insert(stage);
    }

    /// Borrows the input graph, failing for SNN representations.
    pub fn as_input(&self) -> Result<&InputGraph, SncError> {
        match self {
            GraphEntry::Input(graph) => Ok(graph),
            other => Err(unsupported("input", other)),
        }
    }

    /// Borrows the SNN network of either SNN representation.
    pub fn as_snn(&self) -> Result<&SnnGraph, SncError> {
        match self {
            GraphEntry::Snn(graph) => Ok(graph),
            GraphEntry::Simulator(handle) => Ok(&handle.network),
            other => Err(unsupported("snn", other)),
        }
    }

    /// Mutably borrows the SNN network of either SNN representation.
    pub fn as_snn_mut(&mut self) -> Result<&mut SnnGraph, SncError> {
        match self {
            GraphEntry::Snn(graph) => Ok(graph),
            GraphEntry::Simulator(handle) => Ok(&mut handle.network),
            other => Err(unsupported("snn", other)),
        }
    }
}

fn unsupported(expected: &str, found: &GraphEntry) -> SncError {
    SncError::UnsupportedType(
        ErrorInfo::new("graph_kind", "unexpected graph representation")
            .with_context("expected", expected)
            .with_context("found", found.kind_name()),
    )
}

/// Mapping from graph role to graph, owned by the controller for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct GraphSet {
    graphs: BTreeMap<GraphRole, GraphEntry>,
}

impl GraphSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the graph for `role`.
    pub fn insert(&mut self, role: GraphRole, entry: GraphEntry) -> Option<GraphEntry> {
        self.graphs.insert(role, entry)
    }

    /// Returns the graph for `role`, if present.
    pub fn get(&self, role: GraphRole) -> Option<&GraphEntry> {
        self.graphs.get(&role)
    }

    /// Returns the graph for `role` or a structural integrity error.
    pub fn require(&self, role: GraphRole) -> Result<&GraphEntry, SncError> {
        self.graphs.get(&role).ok_or_else(|| missing_role(role))
    }

    /// Returns the graph for `role` mutably or a structural integrity error.
    pub fn require_mut(&mut self, role: GraphRole) -> Result<&mut GraphEntry, SncError> {
        self.graphs.get_mut(&role).ok_or_else(|| missing_role(role))
    }

    /// Borrows the input graph.
    pub fn input(&self) -> Result<&InputGraph, SncError> {
        self.require(GraphRole::Input)?.as_input()
    }

    /// Iterates over `(role, graph)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (GraphRole, &GraphEntry)> + '_ {
        self.graphs.iter().map(|(role, entry)| (*role, entry))
    }

    /// Number of graphs in the set.
    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Marks every graph in the set as having completed `stage`.
    pub fn mark_stage(&mut self, stage: u8) {
        for entry in self.graphs.values_mut() {
            entry.mark_stage(stage);
        }
    }

    /// Verifies every expected role is present and every graph carries the
    /// markers of stages `1..=upto`.
    pub fn verify_stages(&self, expected: &[GraphRole], upto: u8) -> Result<(), SncError> {
        for role in expected {
            self.require(*role)?;
        }
        for (role, entry) in &self.graphs {
            if let Some(stage) = (1..=upto).find(|stage| !entry.completed_stages().contains(stage))
            {
                return Err(SncError::StructuralIntegrity(
                    ErrorInfo::new("missing_stage_marker", "graph has not completed a stage")
                        .with_context("role", role.name())
                        .with_context("stage", stage.to_string()),
                ));
            }
        }
        Ok(())
    }
}

fn missing_role(role: GraphRole) -> SncError {
    SncError::StructuralIntegrity(
        ErrorInfo::new("missing_role", "graph role is missing from the graph set")
            .with_context("role", role.name()),
    )
}
