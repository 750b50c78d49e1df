//! Artifact persistence on top of [`Layout`].

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use snc_core::errors::{ErrorInfo, SncError};
use snc_core::graph::{GraphRole, GraphSet, Trace};
use snc_exp::{from_json_slice, to_canonical_json_bytes, RunConfig};
use tracing::debug;

use crate::layout::{rad_affected_hash, rand_nrs_hash, Layout};

fn io_error(code: &str, path: &Path, err: impl ToString) -> SncError {
    SncError::Serde(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// Run configuration persisted together with its graph set (stages 1 and 4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunArtifact {
    /// Configuration the graphs were produced for.
    pub run_config: RunConfig,
    /// Graph set at the end of the stage.
    pub graphs: GraphSet,
}

/// Reads and writes artifacts, counting every write.
#[derive(Debug)]
pub struct ArtifactStore {
    layout: Layout,
    writes: Cell<usize>,
}

impl ArtifactStore {
    /// Store over `layout`. Nothing is created on disk until the first write.
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            writes: Cell::new(0),
        }
    }

    /// Paths of the results tree.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Number of files written through this store so far.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    /// Writes canonical JSON, creating parent directories on demand.
    pub fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), SncError> {
        let bytes = to_canonical_json_bytes(value)?;
        self.write_bytes(path, &bytes)
    }

    /// Writes a text artifact such as a rendered frame.
    pub fn write_text(&self, path: &Path, text: &str) -> Result<(), SncError> {
        self.write_bytes(path, text.as_bytes())
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), SncError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| io_error("artifact_dir", parent, err))?;
        }
        fs::write(path, bytes).map_err(|err| io_error("artifact_write", path, err))?;
        self.writes.set(self.writes.get() + 1);
        debug!(path = %path.display(), "wrote artifact");
        Ok(())
    }

    /// Reads a JSON artifact.
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, SncError> {
        let bytes = fs::read(path).map_err(|err| io_error("artifact_read", path, err))?;
        from_json_slice(&bytes).map_err(|err| match err {
            SncError::Serde(info) => {
                SncError::Serde(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }

    /// Path of the stage-2 trace of `role`, keyed by the random-number and
    /// radiation hashes of `graphs`.
    pub fn trace_path(
        &self,
        run: &RunConfig,
        graphs: &GraphSet,
        role: GraphRole,
    ) -> Result<PathBuf, SncError> {
        let unique_id = run.id()?;
        let rand_hash = rand_nrs_hash(graphs.input()?)?;
        let rad_hash = if role.with_radiation() {
            Some(rad_affected_hash(graphs.require(role)?.as_snn()?)?)
        } else {
            None
        };
        Ok(self
            .layout
            .stage2_trace(run, unique_id, role, &rand_hash, rad_hash.as_deref()))
    }

    /// Persists the stage-1 input graph and run artifact.
    pub fn write_stage1(&self, run: &RunConfig, graphs: &GraphSet) -> Result<(), SncError> {
        self.write_json(&self.layout.input_graph(run), graphs.input()?)?;
        self.write_json(
            &self.layout.stage1_artifact(run.id()?),
            &RunArtifact {
                run_config: run.clone(),
                graphs: graphs.clone(),
            },
        )
    }

    /// Persists one trace per SNN role of the run.
    pub fn write_traces(&self, run: &RunConfig, graphs: &GraphSet) -> Result<(), SncError> {
        for role in run.expected_roles().into_iter().filter(|role| role.is_snn()) {
            let trace = graphs.require(role)?.as_snn()?.trace.as_ref().ok_or_else(|| {
                missing_trace(role)
            })?;
            self.write_json(&self.trace_path(run, graphs, role)?, trace)?;
        }
        Ok(())
    }

    /// Loads the persisted trace of every SNN role into `graphs`.
    pub fn load_traces(&self, run: &RunConfig, graphs: &mut GraphSet) -> Result<(), SncError> {
        for role in run.expected_roles().into_iter().filter(|role| role.is_snn()) {
            let path = self.trace_path(run, graphs, role)?;
            let trace: Trace = self.read_json(&path)?;
            let snn = graphs.require_mut(role)?.as_snn_mut()?;
            trace.validate(snn.neurons.len())?;
            snn.trace = Some(trace);
        }
        Ok(())
    }
}

/// Error raised when a stage needs a trace that stage 2 did not produce.
pub fn missing_trace(role: GraphRole) -> SncError {
    SncError::StructuralIntegrity(
        ErrorInfo::new("missing_trace", "graph has no simulation trace").with_context("role", role.name()),
    )
}
