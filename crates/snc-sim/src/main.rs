use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;
use snc_core::InputGraph;
use snc_exp::{load_settings_file, ExperimentConfig, RunConfig};
use snc_run::{run_experiment, Backends, Layout, RunController, StaleVisualisationPolicy};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "snc-sim", about = "Staged SNN experiment runner")]
struct Cli {
    /// JSON or YAML input graph used instead of generated graphs.
    #[arg(short = 'g', long)]
    graph_filepath: Option<PathBuf>,
    /// Experiment settings file; the built-in MDSA experiment when absent.
    #[arg(short = 'e', long)]
    experiment_settings: Option<PathBuf>,
    /// Run configuration to execute alone; it must be produced by the experiment.
    #[arg(short = 'r', long)]
    run_config: Option<PathBuf>,
    /// Image formats to export per timestep, comma separated.
    #[arg(short = 'x', long, value_delimiter = ',', value_name = "TYPES")]
    export_images: Vec<String>,
    /// Show every simulated network on the console.
    #[arg(short = 'v', long)]
    visualise_snn: bool,
    /// Regenerate graphs even when cached.
    #[arg(long, visible_alias = "oc")]
    overwrite_creation: bool,
    /// Resimulate even when traces are cached.
    #[arg(long, visible_alias = "op")]
    overwrite_propagation: bool,
    /// Re-render images even when present.
    #[arg(long, visible_alias = "ov")]
    overwrite_visualisation: bool,
    /// Rescore even when results are cached.
    #[arg(long, visible_alias = "or")]
    overwrite_results: bool,
    /// Root of the results tree.
    #[arg(long, default_value = "results")]
    results_dir: PathBuf,
    /// What to do with images that predate a resimulation.
    #[arg(long, default_value = "prompt", value_name = "POLICY")]
    on_stale_visualisation: StaleVisualisationPolicy,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snc=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse_from(normalize_args(std::env::args()));
    let mut exp = match &cli.experiment_settings {
        Some(path) => ExperimentConfig::from_path(path)?,
        None => ExperimentConfig::default_mdsa(),
    };
    apply_overrides(&cli, &mut exp);
    let pin = cli
        .run_config
        .as_deref()
        .map(RunConfig::from_path)
        .transpose()?;

    let (layout, backends) = match &cli.graph_filepath {
        Some(path) => {
            let graph = load_input_graph(path)?;
            exp.size_and_max_graphs = vec![(graph.size, 1)];
            info!(path = %path.display(), size = graph.size, "using custom input graph");
            (
                Layout::for_custom_graph(&cli.results_dir, &graph)?,
                Backends::reference_with_input_graph(graph),
            )
        }
        None => (Layout::new(&cli.results_dir), Backends::reference()),
    };

    let mut controller =
        RunController::new(layout, backends).with_policy(cli.on_stale_visualisation);
    let report = run_experiment(&exp, pin.as_ref(), &mut controller)?;

    let failed = report.failed_runs().count();
    if failed > 0 {
        for record in report.failed_runs() {
            if let Some(err) = &record.error {
                error!(run = %record.unique_id, %err, "run failed");
            }
        }
        return Err(format!("{failed} of {} runs failed", report.runs.len()).into());
    }
    info!(runs = report.runs.len(), "all runs completed");
    Ok(())
}

/// Two-letter single-dash overwrite flags (`-oc`) are rewritten to their long
/// alias; clap shorts are single characters.
fn normalize_args<I: IntoIterator<Item = String>>(args: I) -> Vec<String> {
    const OVERWRITE_SHORTS: [&str; 4] = ["-oc", "-op", "-ov", "-or"];
    args.into_iter()
        .map(|arg| {
            if OVERWRITE_SHORTS.contains(&arg.as_str()) {
                format!("-{arg}")
            } else {
                arg
            }
        })
        .collect()
}

fn apply_overrides(cli: &Cli, exp: &mut ExperimentConfig) {
    if !cli.export_images.is_empty() {
        exp.export.export_images = true;
        exp.export.export_types = cli.export_images.clone();
    }
    exp.export.show_snns |= cli.visualise_snn;
    exp.overwrite.creation |= cli.overwrite_creation;
    exp.overwrite.propagation |= cli.overwrite_propagation;
    exp.overwrite.visualisation |= cli.overwrite_visualisation;
    exp.overwrite.results |= cli.overwrite_results;
}

fn load_input_graph(path: &Path) -> Result<InputGraph, Box<dyn Error>> {
    let graph: InputGraph = load_settings_file(path)?;
    graph.validate()?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_experiment_settings() {
        let cli = Cli::parse_from([
            "snc-sim",
            "--export-images",
            "svg,dot",
            "--overwrite-results",
            "--on-stale-visualisation",
            "keep",
        ]);
        let mut exp = ExperimentConfig::default_mdsa();
        apply_overrides(&cli, &mut exp);
        assert!(exp.export.export_images);
        assert_eq!(exp.export.export_types, vec!["svg", "dot"]);
        assert!(exp.overwrite.results);
        assert!(!exp.overwrite.creation);
        assert_eq!(cli.on_stale_visualisation, StaleVisualisationPolicy::Keep);
    }

    #[test]
    fn stale_visualisation_defaults_to_prompting() {
        let cli = Cli::parse_from(["snc-sim"]);
        assert_eq!(cli.on_stale_visualisation, StaleVisualisationPolicy::Prompt);
        assert_eq!(cli.results_dir, PathBuf::from("results"));
        assert!(Cli::try_parse_from(["snc-sim", "--on-stale-visualisation", "maybe"]).is_err());
    }

    #[test]
    fn short_flags_match_the_long_forms() {
        let args = [
            "snc-sim", "-g", "graph.json", "-e", "exp.yaml", "-r", "run.json", "-x", "svg", "-v",
            "-oc", "-op", "-ov", "-or",
        ]
        .map(String::from);
        let cli = Cli::parse_from(normalize_args(args));
        assert_eq!(cli.graph_filepath, Some(PathBuf::from("graph.json")));
        assert_eq!(cli.experiment_settings, Some(PathBuf::from("exp.yaml")));
        assert_eq!(cli.run_config, Some(PathBuf::from("run.json")));
        assert_eq!(cli.export_images, vec!["svg"]);
        assert!(cli.visualise_snn);
        assert!(cli.overwrite_creation);
        assert!(cli.overwrite_propagation);
        assert!(cli.overwrite_visualisation);
        assert!(cli.overwrite_results);
    }

    #[test]
    fn overwrite_aliases_only_set_their_own_stage() {
        let cli = Cli::parse_from(normalize_args(["snc-sim", "--op"].map(String::from)));
        assert!(cli.overwrite_propagation);
        assert!(!cli.overwrite_creation);
        assert!(!cli.overwrite_results);
        assert_eq!(normalize_args(["-o".to_string()]), vec!["-o"]);
    }
}
