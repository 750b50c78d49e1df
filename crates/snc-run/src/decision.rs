//! Per-stage run decisions.

use serde::{Deserialize, Serialize};
use snc_core::errors::SncError;
use snc_exp::RunConfig;

use crate::oracle::StageOracle;

/// What the controller does with one stage of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageDecision {
    /// Output exists and nothing upstream changed; load it.
    Skip,
    /// Output is missing or stale; compute it.
    Run,
    /// An overwrite switch (or a forced upstream stage) demands recomputation.
    RunForced,
}

impl StageDecision {
    /// Whether the stage computes.
    pub fn runs(self) -> bool {
        !matches!(self, StageDecision::Skip)
    }

    /// Whether the stage was forced.
    pub fn forced(self) -> bool {
        matches!(self, StageDecision::RunForced)
    }

    fn from_conditions(forced: bool, needed: bool) -> Self {
        if forced {
            StageDecision::RunForced
        } else if needed {
            StageDecision::Run
        } else {
            StageDecision::Skip
        }
    }
}

/// Decision record of one run, computed once before stage 1 and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFlags {
    /// Graph generation.
    pub stage_1: StageDecision,
    /// Simulation.
    pub stage_2: StageDecision,
    /// Visualisation.
    pub stage_3: StageDecision,
    /// Result scoring.
    pub stage_4: StageDecision,
}

impl StageFlags {
    /// Decision for a 1-based stage index.
    pub fn get(&self, stage: u8) -> StageDecision {
        match stage {
            1 => self.stage_1,
            2 => self.stage_2,
            3 => self.stage_3,
            _ => self.stage_4,
        }
    }
}

/// Derives the decision of every stage from the oracle and the overwrite switches.
///
/// A forced stage 1 forces stages 2 and 4; any computing upstream stage makes
/// stage 4 compute. Stage 3 only runs when visualisation is requested and is
/// never forced by upstream stages; stale images are handled by the
/// stale-visualisation gate instead.
pub fn determine_what_to_run(
    run: &RunConfig,
    oracle: &StageOracle<'_>,
) -> Result<StageFlags, SncError> {
    let overwrite = &run.overwrite;
    let stage_1 = StageDecision::from_conditions(overwrite.creation, !oracle.has_output(run, 1)?);
    let stage_2 = StageDecision::from_conditions(
        overwrite.propagation || stage_1.forced(),
        stage_1.runs() || !oracle.has_output(run, 2)?,
    );
    let stage_3 = if run.export.visualisation_requested() {
        StageDecision::from_conditions(
            overwrite.visualisation,
            run.export.show_snns || !oracle.has_output(run, 3)?,
        )
    } else {
        StageDecision::Skip
    };
    let stage_4 = StageDecision::from_conditions(
        overwrite.results || stage_1.forced() || stage_2.forced(),
        stage_1.runs() || stage_2.runs() || !oracle.has_output(run, 4)?,
    );
    Ok(StageFlags {
        stage_1,
        stage_2,
        stage_3,
        stage_4,
    })
}
