use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use snc_core::errors::SncError;
use snc_exp::{expand_pinned, ExperimentConfig, RunConfig};
use tracing::{info, warn};

use crate::controller::{RunController, RunState};
use crate::decision::StageFlags;

/// Outcome of one run within an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Identifier of the run.
    pub unique_id: String,
    /// Final state of the run (done or aborted).
    pub state: RunState,
    /// Decisions the run executed with; absent when it failed before deciding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decisions: Option<StageFlags>,
    /// Seconds spent per stage.
    #[serde(default)]
    pub stage_seconds: BTreeMap<u8, f64>,
    /// Files written by the run.
    pub writes: usize,
    /// Error that aborted the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SncError>,
}

/// Summary written after every run of an experiment was attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// Fingerprint of the experiment configuration.
    pub experiment_id: String,
    /// RFC 3339 timestamp of report creation.
    pub created_at: String,
    /// The experiment configuration that was expanded.
    pub experiment: ExperimentConfig,
    /// One record per expanded run, in expansion order.
    pub runs: Vec<RunRecord>,
}

impl ExperimentReport {
    /// Records of the runs that aborted.
    pub fn failed_runs(&self) -> impl Iterator<Item = &RunRecord> + '_ {
        self.runs.iter().filter(|record| record.state == RunState::Aborted)
    }
}

/// Expands `exp` (or locates `pin` within it) and drives every run through
/// `controller`.
///
/// Expansion errors are returned before anything is written. A failing run is
/// recorded and the loop continues with the next one. The report is persisted
/// under the experiment's filename.
pub fn run_experiment(
    exp: &ExperimentConfig,
    pin: Option<&RunConfig>,
    controller: &mut RunController,
) -> Result<ExperimentReport, SncError> {
    let exp = exp.clone().with_unique_id()?;
    let runs = expand_pinned(&exp, pin)?;
    let experiment_id = exp.fingerprint()?;
    info!(experiment = %experiment_id, runs = runs.len(), "starting experiment");

    let mut records = Vec::with_capacity(runs.len());
    for run in &runs {
        let writes_before = controller.store().writes();
        let record = match controller.run(run) {
            Ok(outcome) => RunRecord {
                unique_id: outcome.unique_id,
                state: outcome.state,
                decisions: Some(outcome.decisions),
                stage_seconds: outcome.stage_seconds,
                writes: outcome.writes,
                error: None,
            },
            Err(err) => {
                warn!(run = %run.id()?, %err, "continuing after failed run");
                RunRecord {
                    unique_id: run.id()?.to_string(),
                    state: RunState::Aborted,
                    decisions: None,
                    stage_seconds: BTreeMap::new(),
                    writes: controller.store().writes() - writes_before,
                    error: Some(err),
                }
            }
        };
        records.push(record);
    }

    let report = ExperimentReport {
        experiment_id,
        created_at: Utc::now().to_rfc3339(),
        experiment: exp.clone(),
        runs: records,
    };
    let path = controller.store().layout().experiment_report(&exp.filename()?);
    controller.store().write_json(&path, &report)?;
    info!(
        path = %path.display(),
        failed = report.failed_runs().count(),
        "experiment complete"
    );
    Ok(report)
}
