//! Deterministic reference implementations of the stage collaborators.

mod alipour;
mod generator;
mod lif;
mod render;
mod scorer;

pub use alipour::{alipour_selection, alipour_weights, priority_ranks, winners};
pub use generator::{irradiate, mdsa_snn, random_input_graph, with_redundancy, MdsaGenerator};
pub use lif::{simulate, LifSimulator};
pub use render::FrameRenderer;
pub use scorer::{snn_selection, AlipourScorer};
