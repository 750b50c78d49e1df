//! Results directory layout.
//!
//! ```text
//! stage_1/input_graphs/{size}_{nr}_{seed}.json
//! stage_1/run_configs/{unique_id}.json
//! stage_2/{category}/{role}_{unique_id}_{rand_hash}[_{rad_hash}].json
//! stage_3/{category}/{role}_{unique_id}_{t}.{ext}
//! stage_4/{unique_id}.json
//! experiments/{experiment filename}.json
//! ```

use std::path::{Path, PathBuf};

use snc_core::errors::SncError;
use snc_core::graph::{GraphRole, InputGraph, SnnGraph};
use snc_exp::{stable_hash_string, RunConfig};

/// Paths of every artifact under one results root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout for runs on a user-supplied input graph, kept apart from generated graphs.
    pub fn for_custom_graph(root: impl Into<PathBuf>, graph: &InputGraph) -> Result<Self, SncError> {
        let hash = stable_hash_string(&(graph.size, &graph.edges, &graph.rand_nrs))?;
        Ok(Self::new(root.into().join("custom").join(hash)))
    }

    /// Results root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Input graph shared by runs with the same structural parameters.
    pub fn input_graph(&self, run: &RunConfig) -> PathBuf {
        self.root
            .join("stage_1")
            .join("input_graphs")
            .join(format!("{}_{}_{}.json", run.graph_size, run.graph_nr, run.seed))
    }

    /// Run configuration and graph set after stage 1.
    pub fn stage1_artifact(&self, unique_id: &str) -> PathBuf {
        self.root
            .join("stage_1")
            .join("run_configs")
            .join(format!("{unique_id}.json"))
    }

    /// Simulation trace of one role.
    pub fn stage2_trace(
        &self,
        run: &RunConfig,
        unique_id: &str,
        role: GraphRole,
        rand_hash: &str,
        rad_hash: Option<&str>,
    ) -> PathBuf {
        let mut name = format!("{}_{unique_id}_{rand_hash}", role.name());
        if let Some(rad_hash) = rad_hash {
            name.push('_');
            name.push_str(rad_hash);
        }
        name.push_str(".json");
        self.root.join("stage_2").join(run.category(role)).join(name)
    }

    /// Image of one role at timestep `t`.
    pub fn stage3_image(
        &self,
        run: &RunConfig,
        unique_id: &str,
        role: GraphRole,
        t: usize,
        ext: &str,
    ) -> PathBuf {
        self.root
            .join("stage_3")
            .join(run.category(role))
            .join(format!("{}_{unique_id}_{t}.{ext}", role.name()))
    }

    /// Graph set with results after stage 4.
    pub fn stage4_artifact(&self, unique_id: &str) -> PathBuf {
        self.root.join("stage_4").join(format!("{unique_id}.json"))
    }

    /// Experiment report.
    pub fn experiment_report(&self, filename: &str) -> PathBuf {
        self.root.join("experiments").join(format!("{filename}.json"))
    }
}

/// Hash of the input graph's random-number stream.
pub fn rand_nrs_hash(input: &InputGraph) -> Result<String, SncError> {
    stable_hash_string(&input.rand_nrs)
}

/// Hash of the sorted set of radiation-killed neurons.
pub fn rad_affected_hash(graph: &SnnGraph) -> Result<String, SncError> {
    stable_hash_string(&graph.dead_neurons)
}
