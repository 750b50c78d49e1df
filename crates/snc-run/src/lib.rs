#![deny(missing_docs)]
#![doc = "Staged run controller with idempotent resumption for SNC experiments."]

/// Collaborator traits of the four stages.
pub mod backends;
/// Operator console and the stale-visualisation gate.
pub mod confirm;
/// Per-run stage state machine.
pub mod controller;
/// Per-stage skip/run decisions.
pub mod decision;
/// Experiment loop and report.
pub mod experiment;
/// Result integration into the graph set.
pub mod integrate;
/// Results directory layout.
pub mod layout;
/// Stage completion probes.
pub mod oracle;
/// Cached run configuration reconciliation.
pub mod reconcile;
/// Deterministic reference collaborators.
pub mod reference;
/// Artifact persistence.
pub mod store;

pub use backends::{Backends, FrameFormat, GraphGenerator, Renderer, Scorer, Simulator};
pub use confirm::{
    resolve_stale_visualisation, visualisation_is_stale, Console, GateAnswer,
    StaleVisualisationPolicy, StdinConsole,
};
pub use controller::{RunController, RunOutcome, RunState};
pub use decision::{determine_what_to_run, StageDecision, StageFlags};
pub use experiment::{run_experiment, ExperimentReport, RunRecord};
pub use integrate::integrate;
pub use layout::Layout;
pub use oracle::StageOracle;
pub use reconcile::reconcile;
pub use store::{ArtifactStore, RunArtifact};
