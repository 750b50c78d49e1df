//! Stale-visualisation gate and the operator console.
//!
//! When a run recomputes its simulation while images from an earlier
//! simulation are still on disk, and visualisation overwrite was not
//! requested, the images no longer match the traces. The gate resolves this
//! before any stage executes.

use std::fmt::{self, Display};
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snc_core::errors::{ErrorInfo, SncError};
use snc_exp::RunConfig;
use tracing::{info, warn};

use crate::decision::{StageDecision, StageFlags};
use crate::oracle::StageOracle;

/// How the controller resolves stale images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StaleVisualisationPolicy {
    /// Ask the operator console and block until it answers.
    Prompt,
    /// Abort the run.
    #[default]
    Abort,
    /// Re-render the images.
    Overwrite,
    /// Keep the stale images and continue.
    Keep,
}

impl FromStr for StaleVisualisationPolicy {
    type Err = SncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "prompt" => Ok(Self::Prompt),
            "abort" => Ok(Self::Abort),
            "overwrite" => Ok(Self::Overwrite),
            "keep" => Ok(Self::Keep),
            other => Err(SncError::Configuration(
                ErrorInfo::new("stale_visualisation_policy", "unknown stale visualisation policy")
                    .with_context("policy", other)
                    .with_hint("use one of: prompt, abort, overwrite, keep"),
            )),
        }
    }
}

impl Display for StaleVisualisationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prompt => "prompt",
            Self::Abort => "abort",
            Self::Overwrite => "overwrite",
            Self::Keep => "keep",
        })
    }
}

/// Operator answer to the stale-visualisation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAnswer {
    /// Re-render the images.
    Overwrite,
    /// Keep the stale images.
    Keep,
    /// Abort the run.
    Abort,
}

/// Interactive side of the pipeline.
pub trait Console {
    /// Asks whether to overwrite stale images of run `unique_id`. May block indefinitely.
    fn confirm_stale_visualisation(&mut self, unique_id: &str) -> Result<GateAnswer, SncError>;

    /// Shows one display frame.
    fn show_frame(&mut self, frame: &str) -> Result<(), SncError>;
}

/// Console on the process's stdin and stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConsole;

impl Console for StdinConsole {
    fn confirm_stale_visualisation(&mut self, unique_id: &str) -> Result<GateAnswer, SncError> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        loop {
            write!(
                stdout,
                "Run {unique_id}: the simulation is recomputed but images of an earlier simulation exist.\n\
                 [o]verwrite images, [k]eep them, or [a]bort? "
            )
            .and_then(|_| stdout.flush())
            .map_err(|err| SncError::serde("console_write", err))?;
            let mut line = String::new();
            let read = stdin
                .lock()
                .read_line(&mut line)
                .map_err(|err| SncError::serde("console_read", err))?;
            if read == 0 {
                return Ok(GateAnswer::Abort);
            }
            match line.trim().to_ascii_lowercase().as_str() {
                "o" | "overwrite" => return Ok(GateAnswer::Overwrite),
                "k" | "keep" => return Ok(GateAnswer::Keep),
                "a" | "abort" => return Ok(GateAnswer::Abort),
                _ => continue,
            }
        }
    }

    fn show_frame(&mut self, frame: &str) -> Result<(), SncError> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{frame}").map_err(|err| SncError::serde("console_write", err))
    }
}

/// Whether the images on disk predate the simulation this run will produce.
pub fn visualisation_is_stale(
    run: &RunConfig,
    flags: &StageFlags,
    oracle: &StageOracle<'_>,
) -> Result<bool, SncError> {
    Ok(run.export.visualisation_requested()
        && !run.overwrite.visualisation
        && flags.stage_2.runs()
        && oracle.images_present(run)?)
}

/// Applies `policy` to stale images, upgrading stage 3 or aborting the run.
pub fn resolve_stale_visualisation(
    run: &RunConfig,
    flags: &mut StageFlags,
    oracle: &StageOracle<'_>,
    policy: StaleVisualisationPolicy,
    console: &mut dyn Console,
) -> Result<(), SncError> {
    if !visualisation_is_stale(run, flags, oracle)? {
        return Ok(());
    }
    let unique_id = run.id()?;
    let answer = match policy {
        StaleVisualisationPolicy::Prompt => console.confirm_stale_visualisation(unique_id)?,
        StaleVisualisationPolicy::Abort => GateAnswer::Abort,
        StaleVisualisationPolicy::Overwrite => GateAnswer::Overwrite,
        StaleVisualisationPolicy::Keep => GateAnswer::Keep,
    };
    match answer {
        GateAnswer::Overwrite => {
            info!(run = %unique_id, "re-rendering stale images");
            flags.stage_3 = StageDecision::RunForced;
            Ok(())
        }
        GateAnswer::Keep => {
            warn!(run = %unique_id, "keeping images that predate the recomputed simulation");
            Ok(())
        }
        GateAnswer::Abort => Err(SncError::Aborted(
            ErrorInfo::new("stale_visualisation", "images on disk do not match the recomputed simulation")
                .with_context("unique_id", unique_id)
                .with_context("policy", policy.to_string())
                .with_hint("pass --overwrite-visualisation or choose another stale visualisation policy"),
        )),
    }
}
