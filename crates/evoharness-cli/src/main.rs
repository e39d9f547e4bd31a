//! Evoharness - evaluator-guided code evolution CLI
//!
//! ## Commands
//!
//! - `run`: evolve a seed program against a configured test suite
//! - `score`: score one program against the configured suite
//! - `audit`: classify which problems of a run tree have completed output

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};

use evoharness_audit::{export_csv, render_detailed, render_summary, RunAuditor};
use evoharness_core::{
    ArtifactWriter, CandidateExecutor, EvaluationResult, EvolutionConfig, EvolutionController,
    OpenAiCompatibleBackend, Scorer,
};

#[derive(Parser)]
#[command(name = "evoharness")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluator-guided iterative code evolution", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evolve a seed program
    Run {
        /// Evolution configuration (JSON)
        #[arg(short, long, env = "EVOHARNESS_CONFIG")]
        config: PathBuf,

        /// Seed program (Rhai)
        #[arg(short, long)]
        seed_program: PathBuf,

        /// Problem directory that receives openevolve_output/
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the full run outcome as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Score one program against the configured test suite
    Score {
        /// Program to score (Rhai)
        #[arg(short, long)]
        program: PathBuf,

        /// Evolution configuration (JSON) holding the suite and limits
        #[arg(short, long, env = "EVOHARNESS_CONFIG")]
        config: PathBuf,
    },

    /// Report which problems under a root have completed output
    Audit {
        /// Root directory holding one directory per dataset
        #[arg(long, default_value = "problems")]
        root: PathBuf,

        /// List every problem, not just counts
        #[arg(short, long)]
        detailed: bool,

        /// Export the per-problem records to CSV
        #[arg(short, long)]
        export_csv: bool,

        /// CSV destination used with --export-csv
        #[arg(long, default_value = evoharness_audit::DEFAULT_CSV_PATH)]
        csv_path: PathBuf,

        /// Name of the output directory that marks a completed run
        #[arg(long, default_value = evoharness_audit::DEFAULT_OUTPUT_DIR)]
        output_name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    evoharness_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            config,
            seed_program,
            output,
            report,
        } => cmd_run(&config, &seed_program, output.as_deref(), report.as_deref()).await,
        Commands::Score { program, config } => cmd_score(&program, &config).await,
        Commands::Audit {
            root,
            detailed,
            export_csv,
            csv_path,
            output_name,
        } => cmd_audit(
            &root,
            detailed,
            export_csv.then_some(csv_path.as_path()),
            &output_name,
        ),
    }
}

fn load_config(path: &Path) -> Result<EvolutionConfig> {
    EvolutionConfig::from_json_file(path)
        .with_context(|| format!("Failed to load configuration {:?}", path))
}

async fn cmd_run(
    config_path: &Path,
    seed_path: &Path,
    output: Option<&Path>,
    report: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let seed = std::fs::read_to_string(seed_path)
        .with_context(|| format!("Failed to read seed program {:?}", seed_path))?;

    let timeout = Duration::from_millis(config.retry.request_timeout_ms);
    let backend = OpenAiCompatibleBackend::from_env(&config.models, timeout)
        .context("Failed to build model backend client")?;

    let mut controller = EvolutionController::new(config, Arc::new(backend))
        .context("Invalid evolution configuration")?;
    if let Some(dir) = output {
        controller = controller.with_artifacts(ArtifactWriter::new(dir));
    }

    let cancel = controller.cancellation_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight evaluations");
            cancel.cancel();
        }
    });

    let outcome = controller.run(&seed).await?;
    info!(run_id = %outcome.run_id, "run complete");

    println!("Run:         {}", outcome.run_id);
    println!("Stopped:     {}", outcome.stop_reason.as_str());
    println!("Generations: {}", outcome.generations_completed);
    println!(
        "Best:        {} (generation {}, score {:.3}, {}/{} passed)",
        outcome.best.program.id,
        outcome.best.program.generation,
        outcome.best.score(),
        outcome.best.evaluation.passed,
        outcome.best.evaluation.total
    );
    println!();
    println!("{}", outcome.best.program.code.trim());

    if let Some(path) = report {
        let content = serde_json::to_string_pretty(&outcome)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
        println!("\nReport written to {:?}", path);
    }
    if let Some(dir) = output {
        println!("Artifacts in {:?}", ArtifactWriter::new(dir).output_dir());
    }

    Ok(())
}

async fn cmd_score(program_path: &Path, config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let code = std::fs::read_to_string(program_path)
        .with_context(|| format!("Failed to read program {:?}", program_path))?;

    let scorer = Scorer::new(CandidateExecutor::new(
        config.target_function.clone(),
        config.limits.clone(),
    ));
    let evaluation = scorer
        .score(&code, &config.test_cases)
        .await
        .context("Failed to score program")?;

    print!("{}", render_evaluation(&evaluation));
    Ok(())
}

fn render_evaluation(evaluation: &EvaluationResult) -> String {
    let mut out = format!(
        "Score: {:.3} ({}/{} passed)\n",
        evaluation.score, evaluation.passed, evaluation.total
    );
    if let Some(diagnostic) = &evaluation.diagnostic {
        out.push_str(&format!("Not runnable: {}\n", diagnostic));
        return out;
    }
    for case in &evaluation.cases {
        let status = if case.passed { "PASS" } else { "FAIL" };
        let detail = match (&case.failure, &case.output) {
            (Some(failure), _) => failure.to_string(),
            (None, Some(output)) => output.to_string(),
            (None, None) => String::new(),
        };
        out.push_str(&format!(
            "  {:>3}  {}  {:>5}ms  {}\n",
            case.case_index + 1,
            status,
            case.duration_ms,
            detail
        ));
    }
    out
}

fn cmd_audit(
    root: &Path,
    detailed: bool,
    csv_path: Option<&Path>,
    output_name: &str,
) -> Result<()> {
    let report = RunAuditor::new()
        .with_output_dir_name(output_name)
        .audit(root)
        .with_context(|| format!("Failed to audit {:?}", root))?;

    print!("{}", render_summary(&report));
    if detailed {
        print!("\n{}", render_detailed(&report));
    }
    for (dataset, anomaly) in report.anomalies() {
        warn!(dataset = %dataset, path = %anomaly.path().display(), "{}", anomaly.describe());
    }

    if let Some(path) = csv_path {
        let rows = export_csv(&report, path)
            .with_context(|| format!("Failed to export CSV to {:?}", path))?;
        println!("\nExported {} rows to {:?}", rows, path);
    }
    Ok(())
}
