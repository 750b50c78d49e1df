use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use snc_core::errors::{ErrorInfo, SncError};
use snc_core::graph::{GraphRole, GraphSet};
use snc_exp::{RunConfig, SupportedSettings};
use tracing::{error, info};

use crate::backends::{Backends, FrameFormat};
use crate::confirm::{resolve_stale_visualisation, Console, StaleVisualisationPolicy, StdinConsole};
use crate::decision::{determine_what_to_run, StageDecision, StageFlags};
use crate::integrate::integrate;
use crate::layout::Layout;
use crate::oracle::StageOracle;
use crate::reconcile::reconcile;
use crate::store::{missing_trace, ArtifactStore, RunArtifact};

/// Position of a run in the stage pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    /// Decisions are being made; nothing has executed.
    Pending,
    /// Graph generation.
    Stage1,
    /// Simulation.
    Stage2,
    /// Visualisation.
    Stage3,
    /// Result scoring.
    Stage4,
    /// Every stage completed.
    Done,
    /// The run stopped on an error.
    Aborted,
}

impl RunState {
    /// Stable name used in logs and error context.
    pub fn name(self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::Stage1 => "stage-1",
            RunState::Stage2 => "stage-2",
            RunState::Stage3 => "stage-3",
            RunState::Stage4 => "stage-4",
            RunState::Done => "done",
            RunState::Aborted => "aborted",
        }
    }

    fn stage(stage: u8) -> Self {
        match stage {
            1 => RunState::Stage1,
            2 => RunState::Stage2,
            3 => RunState::Stage3,
            _ => RunState::Stage4,
        }
    }
}

/// Result of driving one run configuration to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Identifier of the run.
    pub unique_id: String,
    /// Final state, always [`RunState::Done`].
    pub state: RunState,
    /// Decisions the run executed with.
    pub decisions: StageFlags,
    /// Wall-clock seconds spent per stage.
    pub stage_seconds: BTreeMap<u8, f64>,
    /// Final graph set with results.
    pub graphs: GraphSet,
    /// Files written during the run.
    pub writes: usize,
}

/// Drives run configurations through the four stages, one at a time.
///
/// The controller owns the graph set of the current run for the run's
/// lifetime; every stage receives the run configuration by reference.
pub struct RunController {
    store: ArtifactStore,
    backends: Backends,
    settings: SupportedSettings,
    policy: StaleVisualisationPolicy,
    console: Box<dyn Console>,
}

impl std::fmt::Debug for RunController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunController")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RunController {
    /// Controller writing under `layout` with the stale-visualisation policy
    /// [`StaleVisualisationPolicy::Abort`] and a stdin console.
    pub fn new(layout: Layout, backends: Backends) -> Self {
        Self {
            store: ArtifactStore::new(layout),
            backends,
            settings: SupportedSettings::default(),
            policy: StaleVisualisationPolicy::default(),
            console: Box::new(StdinConsole),
        }
    }

    /// Replaces the stale-visualisation policy.
    pub fn with_policy(mut self, policy: StaleVisualisationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the operator console.
    pub fn with_console(mut self, console: Box<dyn Console>) -> Self {
        self.console = console;
        self
    }

    /// Artifact store of the controller.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Executes or loads every stage of `run`.
    ///
    /// Errors abort the run; nothing is retried. The error carries the state
    /// the run was in under the `state` context key.
    pub fn run(&mut self, run: &RunConfig) -> Result<RunOutcome, SncError> {
        let unique_id = run.id()?.to_string();
        let writes_before = self.store.writes();
        let mut state = RunState::Pending;
        match self.drive(run, &mut state) {
            Ok((decisions, stage_seconds, graphs)) => {
                info!(run = %unique_id, "run complete");
                Ok(RunOutcome {
                    unique_id,
                    state: RunState::Done,
                    decisions,
                    stage_seconds,
                    graphs,
                    writes: self.store.writes() - writes_before,
                })
            }
            Err(err) => {
                error!(run = %unique_id, state = state.name(), %err, "run aborted");
                Err(err.with_context("state", state.name()))
            }
        }
    }

    fn drive(
        &mut self,
        run: &RunConfig,
        state: &mut RunState,
    ) -> Result<(StageFlags, BTreeMap<u8, f64>, GraphSet), SncError> {
        let verified = run.clone().with_unique_id()?;
        let run = &verified;
        self.settings.verify_run_config(run)?;
        let unique_id = run.id()?;

        let oracle = StageOracle::new(&self.store);
        let mut flags = determine_what_to_run(run, &oracle)?;
        resolve_stale_visualisation(run, &mut flags, &oracle, self.policy, self.console.as_mut())?;
        info!(run = %unique_id, decisions = ?flags, "determined stages to run");

        let mut seconds = BTreeMap::new();
        let mut graphs = GraphSet::new();
        for stage in 1..=4u8 {
            *state = RunState::stage(stage);
            let decision = flags.get(stage);
            info!(run = %unique_id, stage, ?decision, "entering stage");
            let started = Instant::now();
            graphs = match stage {
                1 => self.stage_1(run, decision)?,
                2 => self.stage_2(run, decision, graphs)?,
                3 => self.stage_3(run, decision, graphs)?,
                _ => self.stage_4(run, decision, graphs)?,
            };
            self.assert_stage(run, &graphs, stage)?;
            seconds.insert(stage, started.elapsed().as_secs_f64());
        }
        *state = RunState::Done;
        Ok((flags, seconds, graphs))
    }

    fn stage_1(&self, run: &RunConfig, decision: StageDecision) -> Result<GraphSet, SncError> {
        if decision.runs() {
            let mut graphs = self.backends.generator.get_used_graphs(run)?;
            graphs.mark_stage(1);
            self.store.write_stage1(run, &graphs)?;
            return Ok(graphs);
        }
        let artifact: RunArtifact = self
            .store
            .read_json(&self.store.layout().stage1_artifact(run.id()?))?;
        let reconciled = reconcile(run, &artifact.run_config)?;
        debug_assert_eq!(&reconciled, run);
        Ok(artifact.graphs)
    }

    fn stage_2(
        &self,
        run: &RunConfig,
        decision: StageDecision,
        mut graphs: GraphSet,
    ) -> Result<GraphSet, SncError> {
        graphs.verify_stages(&run.expected_roles(), 1)?;
        if decision.runs() {
            self.backends.simulator.sim_graphs(run, &mut graphs)?;
            for role in snn_roles(run) {
                let snn = graphs.require(role)?.as_snn()?;
                snn.trace
                    .as_ref()
                    .ok_or_else(|| missing_trace(role))?
                    .validate(snn.neurons.len())?;
            }
            self.store.write_traces(run, &graphs)?;
        } else {
            self.store.load_traces(run, &mut graphs)?;
        }
        graphs.mark_stage(2);
        Ok(graphs)
    }

    fn stage_3(
        &mut self,
        run: &RunConfig,
        decision: StageDecision,
        mut graphs: GraphSet,
    ) -> Result<GraphSet, SncError> {
        graphs.verify_stages(&run.expected_roles(), 2)?;
        if decision.runs() {
            let unique_id = run.id()?;
            let extensions = run.export.image_extensions();
            for role in snn_roles(run) {
                let snn = graphs.require(role)?.as_snn()?;
                for t in 0..run.sim_duration() {
                    for ext in extensions {
                        let frame = self.backends.renderer.render(
                            role,
                            snn,
                            t,
                            FrameFormat::from_extension(ext)?,
                        )?;
                        let path = self.store.layout().stage3_image(run, unique_id, role, t, ext);
                        self.store.write_text(&path, &frame)?;
                    }
                    if run.export.show_snns {
                        let frame = self.backends.renderer.render(role, snn, t, FrameFormat::Text)?;
                        self.console.show_frame(&frame)?;
                    }
                }
            }
        }
        graphs.mark_stage(3);
        Ok(graphs)
    }

    fn stage_4(
        &self,
        run: &RunConfig,
        decision: StageDecision,
        mut graphs: GraphSet,
    ) -> Result<GraphSet, SncError> {
        let expected = run.expected_roles();
        graphs.verify_stages(&expected, 3)?;
        let path = self.store.layout().stage4_artifact(run.id()?);
        if !decision.runs() {
            let artifact: RunArtifact = self.store.read_json(&path)?;
            let reconciled = reconcile(run, &artifact.run_config)?;
            debug_assert_eq!(&reconciled, run);
            return Ok(artifact.graphs);
        }
        let already_scored = snn_roles(run).into_iter().all(|role| {
            graphs
                .get(role)
                .and_then(|entry| entry.as_snn().ok())
                .map(|snn| snn.results.is_some())
                .unwrap_or(false)
        });
        if already_scored && !decision.forced() && path.is_file() {
            info!(run = %run.id()?, "results already attached; nothing to export");
            graphs.mark_stage(4);
            return Ok(graphs);
        }
        let results = self
            .backends
            .scorer
            .compute_result(run.m_val()?, run, &graphs)?;
        let merged = integrate(&graphs, &results, &expected)?;
        self.store.write_json(
            &path,
            &RunArtifact {
                run_config: run.clone(),
                graphs: merged.clone(),
            },
        )?;
        Ok(merged)
    }

    fn assert_stage(&self, run: &RunConfig, graphs: &GraphSet, stage: u8) -> Result<(), SncError> {
        graphs.verify_stages(&run.expected_roles(), stage)?;
        if StageOracle::new(&self.store).has_output(run, stage)? {
            Ok(())
        } else {
            Err(SncError::StructuralIntegrity(
                ErrorInfo::new("stage_output_missing", "stage finished without its artifacts on disk")
                    .with_context("unique_id", run.id()?)
                    .with_context("stage", stage.to_string()),
            ))
        }
    }
}

fn snn_roles(run: &RunConfig) -> Vec<GraphRole> {
    run.expected_roles()
        .into_iter()
        .filter(|role| role.is_snn())
        .collect()
}
