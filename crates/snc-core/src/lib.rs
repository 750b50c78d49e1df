#![deny(missing_docs)]
#![doc = "Core error taxonomy, deterministic seeding and graph model for the SNC pipeline."]

pub mod errors;
pub mod graph;
pub mod rng;

pub use errors::{ErrorInfo, SncError};
pub use graph::{
    GraphEntry, GraphRole, GraphSet, InputGraph, Neuron, SimulatorHandle, SnnGraph, Synapse,
    Trace, FINAL_STAGE,
};
pub use rng::{derive_substream_seed, graph_seed, RngHandle};
