//! Ward CLI - workflow gating and cross-reference integrity
//!
//! Usage:
//!   ward init [PATH]            Initialize ward in a project
//!   ward validate [PHASE]       Validate evidence for a phase
//!   ward validate -c PHASE      Scaffold an evidence template
//!   ward xref                   Run the cross-reference sweep
//!   ward advance                Advance the workflow one step
//!   ward status                 Show workflow and task status
//!   ward classify TEXT          Classify discovery text
//!
//! Exit codes: 0 = valid/success, 1 = invalid/review-needed,
//! 2 = critical/halt.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;
use ward_core::{ContentClassifier, WardConfig, WardError, WorkflowImpact};
use ward_gate::{EvidenceSchema, KeywordClassifier, TaskGraph, WorkflowEngine};
use ward_store::StateStore;
use ward_xref::{sweep, write_report, SweepConfig};

const EXIT_VALID: i32 = 0;
const EXIT_REVIEW: i32 = 1;
const EXIT_HALT: i32 = 2;

#[derive(Parser)]
#[command(name = "ward")]
#[command(author, version, about = "Workflow gating and doc integrity checking")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Project root (defaults to current directory)
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize ward in a project
    Init {
        /// Project path (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate evidence for a phase (default: current workflow step)
    Validate {
        /// Phase to validate
        phase: Option<String>,

        /// Scaffold an evidence template instead of validating
        #[arg(short = 'c', long = "create")]
        create: bool,
    },

    /// Run the full-tree cross-reference sweep and write the report
    Xref {
        /// Override the sweep time budget, in seconds
        #[arg(long)]
        budget: Option<u64>,
    },

    /// Advance the workflow one step and print the next instruction
    Advance,

    /// Show the current workflow step, iteration, and ready tasks
    Status,

    /// Classify free-form discovery text
    Classify {
        /// Discovery text
        text: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: failed to install tracing subscriber");
    }

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            EXIT_HALT
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let config = WardConfig::load_or_default(&cli.root)?;
    let store = StateStore::new(cli.root.join(&config.state_dir));

    match cli.command {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { phase, create } => cmd_validate(&store, phase, create),
        Commands::Xref { budget } => cmd_xref(&cli.root, &config, budget),
        Commands::Advance => cmd_advance(store),
        Commands::Status => cmd_status(&store),
        Commands::Classify { text } => cmd_classify(&text),
    }
}

fn cmd_init(path: &PathBuf) -> Result<i32> {
    WardConfig::write_default(path).context("Failed to write default config")?;
    let config = WardConfig::load_or_default(path)?;
    std::fs::create_dir_all(path.join(&config.state_dir))?;
    println!("Initialized ward in {}", path.display());
    Ok(EXIT_VALID)
}

fn cmd_validate(store: &StateStore, phase: Option<String>, create: bool) -> Result<i32> {
    let schema = EvidenceSchema::builtin();

    let phase = match phase {
        Some(phase) => phase,
        None => {
            let (state, warnings) = store.load_workflow();
            print_warnings(&warnings);
            state.current_step.to_string()
        }
    };

    if create {
        let record = schema.scaffold(&phase);
        store.save_evidence(&record)?;
        println!(
            "Created evidence template for '{}' with {} required field(s)",
            phase,
            record.fields.len()
        );
        return Ok(EXIT_VALID);
    }

    let (record, warnings) = store.load_evidence(&phase);
    print_warnings(&warnings);
    let Some(record) = record else {
        println!("No evidence record found for phase '{}'", phase);
        return Ok(EXIT_REVIEW);
    };

    let result = schema.validate(&record, &phase);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(if result.valid { EXIT_VALID } else { EXIT_REVIEW })
}

fn cmd_xref(root: &PathBuf, config: &WardConfig, budget: Option<u64>) -> Result<i32> {
    let sweep_config = SweepConfig {
        root: root.clone(),
        skip_dirs: config.skip_dirs.clone(),
        time_budget: Duration::from_secs(budget.unwrap_or(config.sweep_budget_secs)),
    };

    let report = match sweep(&sweep_config) {
        Ok(report) => report,
        Err(WardError::Configuration(msg)) => {
            eprintln!("fatal: {}", msg);
            return Ok(EXIT_HALT);
        }
        Err(e) => return Err(e.into()),
    };

    let path = write_report(&report, root, &config.error_log_dir)?;
    println!(
        "Scanned {} file(s), {} broken reference(s){}",
        report.files_scanned,
        report.broken.len(),
        if report.timed_out {
            " (timed out, partial)"
        } else {
            ""
        }
    );
    println!("Report: {}", path.display());
    Ok(if report.is_clean() {
        EXIT_VALID
    } else {
        EXIT_REVIEW
    })
}

fn cmd_advance(store: StateStore) -> Result<i32> {
    let engine = WorkflowEngine::new(store);
    let outcome = engine.advance()?;
    print_warnings(&outcome.warnings);
    println!(
        "{} -> {} (iteration {})",
        outcome.previous, outcome.next, outcome.iteration
    );
    println!("{}", outcome.instruction);
    Ok(EXIT_VALID)
}

fn cmd_status(store: &StateStore) -> Result<i32> {
    let (system, warnings) = store.load_system();
    print_warnings(&warnings);

    let workflow = system.workflow.unwrap_or_default();
    println!(
        "Workflow: {} (iteration {}, updated {})",
        workflow.current_step, workflow.iteration, workflow.last_updated
    );

    let graph = TaskGraph::from_nodes(system.tasks)?;
    println!("Tasks: {}", graph.len());
    let ready = graph.ready_tasks();
    if !ready.is_empty() {
        println!("Ready: {}", ready.join(", "));
    }

    for phase in &system.phases {
        println!("Phase {}: {:?}", phase.name, phase.status);
    }
    Ok(EXIT_VALID)
}

fn cmd_classify(text: &str) -> Result<i32> {
    let classifier = KeywordClassifier::new();
    let discovery = classifier.classify(text);
    println!("{}", serde_json::to_string_pretty(&discovery)?);
    Ok(match discovery.workflow_impact {
        WorkflowImpact::None => EXIT_VALID,
        WorkflowImpact::ReviewNeeded => EXIT_REVIEW,
        WorkflowImpact::Halt => EXIT_HALT,
    })
}

fn print_warnings(warnings: &[ward_store::ConsistencyWarning]) {
    for warning in warnings {
        warn!(%warning, "State consistency warning");
    }
}
