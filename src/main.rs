use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use lazytab::boot::init_logger;
use lazytab::ci_utils::{wait_for_status_file, MockDocumentHost, StatusFileObserver, TestWorkspace};
use lazytab::scenario::{
    load_all_workflows, run_lazy_load_scenario, ScenarioOptions, ScenarioReport, Workflow,
};
use lazytab::tracker::{
    LazyLoadStateTracker, TrackedResource, VerificationResult, WaitOptions,
};

/// Lazy document-load verification for IDE automation suites
#[derive(Parser, Debug)]
#[command(name = "lazytab", version)]
#[command(about = "Verify lazily restored document windows", long_about = None)]
struct Cli {
    /// Enable debug mode (show detailed logging)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a workflow against the simulated document host
    Run {
        /// Workflow file, or the id of a workflow under --dir
        workflow: String,

        /// Directory searched when WORKFLOW is an id
        #[arg(long, default_value = "workflows")]
        dir: PathBuf,

        /// Focus documents in a random order
        #[arg(long)]
        shuffle: bool,

        /// Seed for the shuffled order (implies --shuffle)
        #[arg(long)]
        seed: Option<u64>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,

        /// Leave status dumps and the tracker snapshot on disk
        #[arg(long)]
        keep_workspace: bool,
    },

    /// Verify a saved tracker snapshot against a host status dump
    Verify {
        /// Tracker snapshot (JSON array of tracked documents)
        #[arg(long)]
        expected: PathBuf,

        /// Status dump written by the host
        #[arg(long)]
        status: PathBuf,

        /// How long a window may take to materialize
        #[arg(long, default_value_t = 10_000)]
        timeout_ms: u64,

        /// Delay between observations
        #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: u64,

        /// How long to wait for the status dump to appear
        #[arg(long, default_value_t = 10)]
        wait_secs: u64,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the workflows under a directory
    List {
        #[arg(long, default_value = "workflows")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.debug);

    match dispatch(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            log::error!("💥 {err:#}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether every verification passed.
async fn dispatch(command: Command) -> Result<bool> {
    match command {
        Command::Run {
            workflow,
            dir,
            shuffle,
            seed,
            json,
            keep_workspace,
        } => {
            let workflow = resolve_workflow(&workflow, &dir)?;
            let shuffle_seed = seed.or_else(|| shuffle.then(rand::random::<u64>));
            run_workflow(workflow, shuffle_seed, json, keep_workspace).await
        }
        Command::Verify {
            expected,
            status,
            timeout_ms,
            interval_ms,
            wait_secs,
            json,
        } => {
            let wait = WaitOptions::from_millis(timeout_ms, interval_ms);
            verify_snapshot(&expected, &status, wait, wait_secs, json).await
        }
        Command::List { dir } => {
            let workflows = load_all_workflows(&dir)?;
            log::info!("📋 {} workflow(s) in {}", workflows.len(), dir.display());
            for (id, workflow) in &workflows {
                println!(
                    "{id:<32} {:>2} document(s)  {}",
                    workflow.documents.len(),
                    workflow.manifest.description
                );
            }
            Ok(true)
        }
    }
}

fn resolve_workflow(name: &str, dir: &Path) -> Result<Workflow> {
    let path = Path::new(name);
    if path.is_file() {
        return Workflow::load(path);
    }

    let mut workflows = load_all_workflows(dir)?;
    workflows.remove(name).ok_or_else(|| {
        anyhow!(
            "Unknown workflow '{}' (not a file, and no such id in {})",
            name,
            dir.display()
        )
    })
}

async fn run_workflow(
    workflow: Workflow,
    shuffle_seed: Option<u64>,
    json: bool,
    keep_workspace: bool,
) -> Result<bool> {
    log::info!("🧪 Running workflow: {}", workflow.manifest.id);
    if !workflow.manifest.description.is_empty() {
        log::info!("📝 Description: {}", workflow.manifest.description);
    }

    let ws = TestWorkspace::create(&workflow.manifest.id)?;
    let options = ScenarioOptions {
        shuffle_seed,
        status_dump: Some(ws.file("status.json")),
    };

    let report = tokio::task::spawn_blocking(move || {
        let mut host = MockDocumentHost::new(workflow.documents.iter().cloned());
        run_lazy_load_scenario(&mut host, &workflow, &options)
    })
    .await
    .context("Scenario task panicked")??;

    let snapshot = serde_json::to_string_pretty(&report.tracked)?;
    std::fs::write(ws.file("tracker.json"), snapshot).context("Failed to write tracker snapshot")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if keep_workspace {
        let path = ws.keep();
        log::info!("📁 Workspace kept at {}", path.display());
    } else {
        ws.cleanup()?;
    }
    Ok(report.passed())
}

async fn verify_snapshot(
    expected: &Path,
    status: &Path,
    wait: WaitOptions,
    wait_secs: u64,
    json: bool,
) -> Result<bool> {
    let content = std::fs::read_to_string(expected)
        .with_context(|| format!("Failed to read snapshot {}", expected.display()))?;
    let resources: Vec<TrackedResource> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot {}", expected.display()))?;
    log::info!(
        "📥 Loaded {} tracked document(s) from {}",
        resources.len(),
        expected.display()
    );

    let interval_ms = u64::try_from(wait.interval.as_millis()).unwrap_or(u64::MAX);
    wait_for_status_file(status, wait_secs, Some(interval_ms)).await?;

    let status = status.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        let mut tracker = LazyLoadStateTracker::from_resources(resources);
        let mut observer = StatusFileObserver::new(status);
        tracker.verify_against(&mut observer, wait)
    })
    .await
    .context("Verification task panicked")??;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result("verify", &result);
    }
    Ok(result.passed())
}

fn print_result(phase: &str, result: &VerificationResult) {
    let mark = if result.passed() { "ok  " } else { "FAIL" };
    println!("{mark} {phase} ({} checked)", result.checked);
    for rekey in &result.rekeyed {
        println!("       re-captioned '{}' -> '{}'", rekey.from, rekey.to);
    }
    for mismatch in &result.failures {
        println!("       {mismatch}");
    }
}

fn print_report(report: &ScenarioReport) {
    println!("Scenario {}", report.id);
    if let Some(seed) = report.shuffle_seed {
        println!("  shuffle seed: {seed}");
    }
    for phase in &report.phases {
        print_result(&phase.phase, &phase.result);
    }
    if report.passed() {
        println!("All {} phase(s) passed", report.phases.len());
    } else {
        println!("{} mismatch(es)", report.failure_count());
    }
}
