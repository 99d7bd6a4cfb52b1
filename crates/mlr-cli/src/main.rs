//! MLR-Bench - research agent benchmark CLI
//!
//! The `mlr-bench` command drives the research pipeline over tasks from the
//! benchmark catalog.
//!
//! ## Commands
//!
//! - `run --task-id <ID>`: run one task end to end
//! - `run --all`: run every task, continuing past failures
//! - `tasks`: list catalog tasks, optionally filtered
//!
//! Ctrl-C aborts the current run and exits with status 130.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn, Level};

use mlr_core::{
    init_tracing, parse_level, save_record, BenchConfig, EventEmitter, GeminiClient,
    HttpEventSink, ScoreSummary, Task, TaskCatalog, TaskCategory, WorkspaceManager, METRICS,
};
use mlr_pipeline::{MlrJudge, PipelineArtifacts, ResearchPipeline, StageContext};

/// Files written by the multi-judge pass next to the stage artifacts.
const IDEA_EVALUATION_FILE: &str = "idea_evaluation.json";
const PAPER_EVALUATION_FILE: &str = "paper_evaluation.json";

/// Exit status after Ctrl-C (128 + SIGINT).
const INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "mlr-bench")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MLR-Bench research agent pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Log level (DEBUG, INFO, WARNING, ERROR); overrides LOG_LEVEL
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the research pipeline
    Run {
        /// Task to run
        #[arg(long, required_unless_present = "all", conflicts_with = "all")]
        task_id: Option<String>,

        /// Run every task in the catalog
        #[arg(long)]
        all: bool,
    },

    /// List catalog tasks
    Tasks {
        /// Only tasks in this category (e.g. "Trustworthy AI")
        #[arg(long)]
        category: Option<String>,

        /// Only tasks from this conference (case-insensitive)
        #[arg(long)]
        conference: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = BenchConfig::from_env().context("Failed to read configuration")?;
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        parse_level(cli.log_level.as_deref().unwrap_or(&config.log_level))
    };
    config
        .ensure_directories()
        .context("Failed to create working directories")?;
    init_tracing(cli.json, level, config.log_file.as_deref());

    let catalog = TaskCatalog::load(&config.tasks_file())
        .with_context(|| format!("Failed to load tasks from {:?}", config.tasks_file()))?;

    let outcome = tokio::select! {
        result = dispatch(cli.command, &config, &catalog) => result.map(|()| ExitCode::SUCCESS),
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted by user");
            Ok(ExitCode::from(INTERRUPTED))
        }
    };

    METRICS.flush();
    outcome
}

async fn dispatch(command: Commands, config: &BenchConfig, catalog: &TaskCatalog) -> Result<()> {
    match command {
        Commands::Run { task_id, all } => {
            let pipeline = build_pipeline(config)?;
            if all {
                cmd_run_all(&pipeline, catalog.all_tasks()).await;
                Ok(())
            } else {
                let task_id = task_id.context("--task-id is required without --all")?;
                let task = catalog.require_task(&task_id)?;
                cmd_run(&pipeline, task).await
            }
        }
        Commands::Tasks {
            category,
            conference,
        } => cmd_tasks(catalog, category.as_deref(), conference.as_deref()),
    }
}

/// Wire the Gemini clients, judge panel and event sink from `config`.
fn build_pipeline(config: &BenchConfig) -> Result<ResearchPipeline> {
    let emitter = match &config.event_sink_url {
        Some(url) => {
            let sink = HttpEventSink::new(url.clone()).context("Failed to create event sink")?;
            info!(url = %sink.url(), "forwarding events to visualization sink");
            EventEmitter::with_sink(Arc::new(sink))
        }
        None => EventEmitter::new(),
    };

    let writer = gemini_context(config, &config.model_name)?;
    let judges = config
        .judge_models
        .iter()
        .map(|model| gemini_context(config, model))
        .collect::<Result<Vec<_>>>()?;

    Ok(ResearchPipeline::new(writer, MlrJudge::new(judges), emitter)
        .with_results_dir(&config.results_dir)
        .with_workspaces(WorkspaceManager::new(&config.workspaces_dir)))
}

fn gemini_context(config: &BenchConfig, model: &str) -> Result<StageContext> {
    let client = GeminiClient::new(config.api_key.clone(), config.gemini_settings(model))
        .with_context(|| format!("Failed to create generation client for {model}"))?;
    Ok(StageContext::new(Arc::new(client)).with_retry(config.retry))
}

/// Run one task: pipeline, then the full judge panel. Returns the
/// pipeline's combined average score.
async fn run_task(pipeline: &ResearchPipeline, task: &Task) -> Result<f64> {
    info!(task_id = %task.task_id, title = %task.title, "starting task");
    let artifacts = pipeline
        .run_stages(task)
        .await
        .with_context(|| format!("Pipeline failed for task {}", task.task_id))?;

    judge_panel_pass(pipeline, task, &artifacts)
        .await
        .with_context(|| format!("Judge panel failed for task {}", task.task_id))?;

    Ok(artifacts.evaluation.average_score)
}

/// Score the run's idea and paper with every configured judge.
async fn judge_panel_pass(
    pipeline: &ResearchPipeline,
    task: &Task,
    artifacts: &PipelineArtifacts,
) -> Result<()> {
    let dir = pipeline.task_results_dir(&task.task_id);
    let judge = pipeline.judge();

    let idea = judge.evaluate_idea(&artifacts.idea, task).await?;
    save_record(pipeline.store(), &idea, &dir.join(IDEA_EVALUATION_FILE)).await?;

    let paper = judge
        .evaluate_paper(&artifacts.paper, task, &artifacts.experiment.code_files)
        .await?;
    save_record(pipeline.store(), &paper, &dir.join(PAPER_EVALUATION_FILE)).await?;

    info!(
        task_id = %task.task_id,
        judges = judge.judge_count(),
        idea = idea.average_score,
        paper = paper.average_score,
        "judge panel complete"
    );
    Ok(())
}

async fn cmd_run(pipeline: &ResearchPipeline, task: &Task) -> Result<()> {
    let score = match run_task(pipeline, task).await {
        Ok(score) => score,
        Err(e) => {
            error!(task_id = %task.task_id, error = %format!("{e:#}"), "task failed");
            return Err(e);
        }
    };

    println!("Task {} completed", task.task_id);
    println!("  Average score: {score:.2}");
    println!(
        "  Results: {}",
        pipeline.task_results_dir(&task.task_id).display()
    );
    Ok(())
}

/// Run every task in order, logging failures and moving on.
async fn cmd_run_all(pipeline: &ResearchPipeline, tasks: &[Task]) -> Option<ScoreSummary> {
    let mut scores = Vec::with_capacity(tasks.len());
    let mut failed = 0usize;

    for (i, task) in tasks.iter().enumerate() {
        info!(task_id = %task.task_id, index = i + 1, total = tasks.len(), "running task");
        match run_task(pipeline, task).await {
            Ok(score) => scores.push(score),
            Err(e) => {
                failed += 1;
                error!(task_id = %task.task_id, error = %format!("{e:#}"), "task failed");
            }
        }
    }

    println!(
        "Completed {} of {} tasks ({} failed)",
        scores.len(),
        tasks.len(),
        failed
    );
    let summary = ScoreSummary::from_scores(&scores);
    match &summary {
        Some(summary) => {
            let rendered = serde_json::to_string_pretty(summary).unwrap_or_default();
            println!("Score summary:\n{rendered}");
        }
        None => println!("No scores to summarize"),
    }
    summary
}

/// Tasks matching both filters, in catalog order.
fn select_tasks<'a>(
    catalog: &'a TaskCatalog,
    category: Option<&str>,
    conference: Option<&str>,
) -> Result<Vec<&'a Task>> {
    let category = match category {
        Some(label) => match TaskCategory::from_label(label) {
            Some(category) => Some(category),
            None => bail!("Unknown category '{label}'"),
        },
        None => None,
    };

    let mut tasks: Vec<&Task> = match category {
        Some(category) => catalog.tasks_by_category(category),
        None => catalog.all_tasks().iter().collect(),
    };
    if let Some(conference) = conference {
        let matching = catalog.tasks_by_conference(conference);
        tasks.retain(|t| matching.iter().any(|m| m.task_id == t.task_id));
    }
    Ok(tasks)
}

fn cmd_tasks(catalog: &TaskCatalog, category: Option<&str>, conference: Option<&str>) -> Result<()> {
    let tasks = select_tasks(catalog, category, conference)?;
    if tasks.is_empty() {
        println!("No tasks found");
        return Ok(());
    }

    for task in &tasks {
        println!("{}\t{}\t{}", task.task_id, task.category, task.title);
    }
    println!("\n{} task(s)", tasks.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use mlr_core::fakes::{FailingArtifactStore, MemoryArtifactStore, ScriptedGeneration};
    use std::path::{Path, PathBuf};

    fn catalog() -> TaskCatalog {
        let mut a = Task::new("a", "Alignment", TaskCategory::TrustworthyAi, "d");
        a.conference = Some("ICLR".to_string());
        let mut b = Task::new("b", "Agents", TaskCategory::LlmVlm, "d");
        b.conference = Some("NeurIPS".to_string());
        let mut c = Task::new("c", "Safety", TaskCategory::TrustworthyAi, "d");
        c.conference = Some("NeurIPS".to_string());
        TaskCatalog::new(vec![a, b, c])
    }

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.task_id.clone()).collect()
    }

    fn fake_pipeline(workspaces: &Path) -> ResearchPipeline {
        let ctx = StageContext::new(Arc::new(ScriptedGeneration::with_responder("fake", |_| {
            "Overall: 6".to_string()
        })));
        ResearchPipeline::new(ctx.clone(), MlrJudge::new(vec![ctx.clone(), ctx]), EventEmitter::new())
            .with_workspaces(WorkspaceManager::new(workspaces))
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_requires_task_or_all() {
        assert!(Cli::try_parse_from(["mlr-bench", "run"]).is_err());
        assert!(Cli::try_parse_from(["mlr-bench", "run", "--all", "--task-id", "x"]).is_err());
        let cli = Cli::try_parse_from(["mlr-bench", "--log-level", "DEBUG", "run", "--task-id", "x"])
            .expect("parse");
        assert_eq!(cli.log_level.as_deref(), Some("DEBUG"));
        assert!(matches!(cli.command, Commands::Run { task_id: Some(_), all: false }));
    }

    #[test]
    fn test_select_tasks_filters() {
        let catalog = catalog();
        let all = select_tasks(&catalog, None, None).expect("select");
        assert_eq!(ids(&all), vec!["a", "b", "c"]);

        let trustworthy = select_tasks(&catalog, Some("trustworthy ai"), None).expect("select");
        assert_eq!(ids(&trustworthy), vec!["a", "c"]);

        let both = select_tasks(&catalog, Some("Trustworthy AI"), Some("neurips")).expect("select");
        assert_eq!(ids(&both), vec!["c"]);

        assert!(select_tasks(&catalog, Some("astrology"), None).is_err());
    }

    #[tokio::test]
    async fn test_run_task_writes_panel_evaluations() {
        let workspaces = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(MemoryArtifactStore::new());
        let pipeline = fake_pipeline(workspaces.path()).with_store(store.clone());
        let task = Task::new("t1", "Alignment", TaskCategory::TrustworthyAi, "d");

        let score = run_task(&pipeline, &task).await.expect("run");
        assert_eq!(score, 6.0);

        let idea: serde_json::Value = serde_json::from_str(
            &store
                .get(&PathBuf::from("results/t1").join(IDEA_EVALUATION_FILE))
                .expect("idea evaluation saved"),
        )
        .expect("json");
        assert_eq!(idea["evaluations"].as_array().map(Vec::len), Some(2));
        assert_eq!(idea["average_score"], 6.0);
        assert!(store
            .get(&PathBuf::from("results/t1").join(PAPER_EVALUATION_FILE))
            .is_some());
    }

    #[tokio::test]
    async fn test_run_all_continues_past_failures() {
        let workspaces = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(FailingArtifactStore::new("idea.json"));
        let failing = fake_pipeline(workspaces.path()).with_store(store.clone());
        let catalog = catalog();

        let summary = cmd_run_all(&failing, catalog.all_tasks()).await;
        assert!(summary.is_none(), "every task fails on idea.json");

        let healthy = fake_pipeline(workspaces.path()).with_store(Arc::new(MemoryArtifactStore::new()));
        let summary = cmd_run_all(&healthy, catalog.all_tasks())
            .await
            .expect("summary");
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, 6.0);
    }
}
