//! Collaborator interfaces of the four stages.

use std::collections::BTreeMap;

use serde_json::Value;
use snc_core::errors::{ErrorInfo, SncError};
use snc_core::graph::{GraphRole, GraphSet, InputGraph, SnnGraph};
use snc_exp::RunConfig;

use crate::reference::{AlipourScorer, FrameRenderer, LifSimulator, MdsaGenerator};

/// Builds the input graph and every SNN graph of a run (stage 1).
pub trait GraphGenerator {
    /// Graph set with one entry per expected role.
    fn get_used_graphs(&self, run: &RunConfig) -> Result<GraphSet, SncError>;
}

/// Simulates every SNN graph of a run in place (stage 2).
pub trait Simulator {
    /// Attaches a trace to every SNN graph of `graphs`.
    fn sim_graphs(&self, run: &RunConfig, graphs: &mut GraphSet) -> Result<(), SncError>;
}

/// Output format of a rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// Scalable vector graphics.
    Svg,
    /// Graphviz dot source.
    Dot,
    /// Plain text for interactive display.
    Text,
}

impl FrameFormat {
    /// Format of an export extension.
    pub fn from_extension(ext: &str) -> Result<Self, SncError> {
        match ext {
            "svg" => Ok(FrameFormat::Svg),
            "dot" => Ok(FrameFormat::Dot),
            other => Err(SncError::UnsupportedType(
                ErrorInfo::new("export_type", "no renderer for export type")
                    .with_context("export_type", other),
            )),
        }
    }
}

/// Draws the state of one SNN graph at one timestep (stage 3).
pub trait Renderer {
    /// One frame of `graph` at timestep `t`.
    fn render(
        &self,
        role: GraphRole,
        graph: &SnnGraph,
        t: usize,
        format: FrameFormat,
    ) -> Result<String, SncError>;
}

/// Scores the simulated SNNs against the non-spiking reference (stage 4).
pub trait Scorer {
    /// Result payload per SNN role.
    fn compute_result(
        &self,
        m_val: i64,
        run: &RunConfig,
        graphs: &GraphSet,
    ) -> Result<BTreeMap<GraphRole, Value>, SncError>;
}

/// The collaborators a controller drives.
pub struct Backends {
    /// Stage 1.
    pub generator: Box<dyn GraphGenerator>,
    /// Stage 2.
    pub simulator: Box<dyn Simulator>,
    /// Stage 3.
    pub renderer: Box<dyn Renderer>,
    /// Stage 4.
    pub scorer: Box<dyn Scorer>,
}

impl Backends {
    /// Deterministic reference implementations of every collaborator.
    pub fn reference() -> Self {
        Self {
            generator: Box::new(MdsaGenerator::default()),
            simulator: Box::new(LifSimulator),
            renderer: Box::new(FrameRenderer),
            scorer: Box::new(AlipourScorer),
        }
    }

    /// Reference backends generating every run on a fixed input graph.
    pub fn reference_with_input_graph(graph: InputGraph) -> Self {
        Self {
            generator: Box::new(MdsaGenerator::with_input_graph(graph)),
            ..Self::reference()
        }
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}
