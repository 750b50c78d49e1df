//! Stage completion oracle.
//!
//! A stage counts as done only when its artifacts exist and load as a graph
//! set carrying the stage's markers. Unreadable or inconsistent artifacts are
//! reported as missing so the stage is recomputed.

use std::path::Path;

use snc_core::errors::SncError;
use snc_core::graph::{GraphRole, GraphSet};
use snc_exp::RunConfig;
use tracing::{debug, warn};

use crate::store::{ArtifactStore, RunArtifact};

/// Answers whether a stage's output already exists for a run.
#[derive(Debug, Clone, Copy)]
pub struct StageOracle<'a> {
    store: &'a ArtifactStore,
}

impl<'a> StageOracle<'a> {
    /// Oracle over the artifacts of `store`.
    pub fn new(store: &'a ArtifactStore) -> Self {
        Self { store }
    }

    /// Whether stage `stage` (1 to 4) has valid output for `run`.
    pub fn has_output(&self, run: &RunConfig, stage: u8) -> Result<bool, SncError> {
        let done = match stage {
            1 => self.stage1_graphs(run)?.is_some(),
            2 => self.traces_present(run)?,
            3 => !self.expects_images(run) || self.images_present(run)?,
            4 => self.stage4_complete(run)?,
            other => {
                return Err(SncError::configuration(
                    "unknown_stage",
                    format!("pipeline has no stage {other}"),
                ))
            }
        };
        debug!(run = %run.id()?, stage, done, "probed stage output");
        Ok(done)
    }

    /// Whether the run exports images at all.
    pub fn expects_images(&self, run: &RunConfig) -> bool {
        !run.export.image_extensions().is_empty()
    }

    /// Whether every expected image exists; false when no images are expected.
    pub fn images_present(&self, run: &RunConfig) -> Result<bool, SncError> {
        if !self.expects_images(run) {
            return Ok(false);
        }
        let unique_id = run.id()?;
        let layout = self.store.layout();
        let present = snn_roles(run).into_iter().all(|role| {
            (0..run.sim_duration()).all(|t| {
                run.export
                    .image_extensions()
                    .iter()
                    .all(|ext| layout.stage3_image(run, unique_id, role, t, ext).is_file())
            })
        });
        Ok(present)
    }

    /// Stage-1 graph set of `run`, if persisted and complete.
    pub fn stage1_graphs(&self, run: &RunConfig) -> Result<Option<GraphSet>, SncError> {
        let layout = self.store.layout();
        let path = layout.stage1_artifact(run.id()?);
        if !path.is_file() || !layout.input_graph(run).is_file() {
            return Ok(None);
        }
        Ok(self.load_verified(run, &path, 1))
    }

    fn traces_present(&self, run: &RunConfig) -> Result<bool, SncError> {
        let Some(graphs) = self.stage1_graphs(run)? else {
            return Ok(false);
        };
        for role in snn_roles(run) {
            if !self.store.trace_path(run, &graphs, role)?.is_file() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn stage4_complete(&self, run: &RunConfig) -> Result<bool, SncError> {
        let path = self.store.layout().stage4_artifact(run.id()?);
        if !path.is_file() {
            return Ok(false);
        }
        let Some(graphs) = self.load_verified(run, &path, 4) else {
            return Ok(false);
        };
        let scored = snn_roles(run).into_iter().all(|role| {
            graphs
                .get(role)
                .and_then(|entry| entry.as_snn().ok())
                .map(|snn| snn.results.is_some())
                .unwrap_or(false)
        });
        Ok(scored)
    }

    fn load_verified(&self, run: &RunConfig, path: &Path, stage: u8) -> Option<GraphSet> {
        let artifact: RunArtifact = match self.store.read_json(path) {
            Ok(artifact) => artifact,
            Err(err) => {
                warn!(path = %path.display(), %err, "ignoring unreadable artifact");
                return None;
            }
        };
        if let Err(err) = artifact.graphs.verify_stages(&run.expected_roles(), stage) {
            warn!(path = %path.display(), %err, "ignoring incomplete artifact");
            return None;
        }
        Some(artifact.graphs)
    }
}

fn snn_roles(run: &RunConfig) -> Vec<GraphRole> {
    run.expected_roles()
        .into_iter()
        .filter(|role| role.is_snn())
        .collect()
}
