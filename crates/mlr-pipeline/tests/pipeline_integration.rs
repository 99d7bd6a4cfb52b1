//! Integration tests for the research pipeline with in-memory fakes.

use mlr_core::fakes::{FailingArtifactStore, FlakyGeneration, MemoryArtifactStore, ScriptedGeneration};
use mlr_core::{
    ArtifactStore, EventEmitter, EventType, FsArtifactStore, GenerationRequest, GenerationService,
    ResearchPaper, RetryPolicy, Task, TaskCategory, WorkspaceManager, METRICS,
};
use mlr_pipeline::prompts;
use mlr_pipeline::{MlrJudge, PipelineError, ResearchPipeline, StageContext, StageKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

fn task() -> Task {
    Task::new(
        "t1",
        "Bidirectional Human-AI Alignment",
        TaskCategory::TrustworthyAi,
        "Study alignment in both directions.",
    )
}

fn pipeline(
    ctx: StageContext,
    emitter: EventEmitter,
    store: Arc<dyn ArtifactStore>,
    workspaces: &Path,
) -> ResearchPipeline {
    let judge = MlrJudge::new(vec![ctx.clone()]);
    ResearchPipeline::new(ctx, judge, emitter)
        .with_store(store)
        .with_workspaces(WorkspaceManager::new(workspaces))
        .with_results_dir("results")
}

/// Responds like a cooperative model, keyed on the agent instruction.
fn scripted_model(request: &GenerationRequest) -> String {
    let response = match request.instruction.as_str() {
        prompts::IDEA_INSTRUCTION => {
            "Title: Mutual Calibration\nMotivation:\nHumans adapt to AI too.\n\
             Main idea:\nModel both sides of the loop.\nMethodology:\nUser studies."
        }
        prompts::LITERATURE_INSTRUCTION => {
            "Key findings:\nOne-way alignment dominates.\nResearch gap:\nNo bidirectional view.\n\
             Related work:\nRLHF, constitutional AI."
        }
        prompts::PROPOSAL_INSTRUCTION => {
            "Abstract\nWe propose mutual calibration.\nMethodology\nTwo-sided RLHF.\n\
             Experimental Plan\nA/B study."
        }
        prompts::EXPERIMENT_INSTRUCTION => "import torch\n\ndef main():\n    pass\n",
        prompts::PAPER_INSTRUCTION => {
            "Abstract\nMutual calibration improves trust.\nExperiments\nTwo user studies.\n\
             Results\nTrust up 12%.\nConclusion\nAlignment is a two-way street."
        }
        prompts::IDEA_EVALUATION_INSTRUCTION => "Consistency: 8\nClarity: 6\nFeedback:\nGood idea.",
        prompts::PAPER_EVALUATION_INSTRUCTION => "Overall: 9\nStrengths:\nThorough.",
        _ => "",
    };
    response.to_string()
}

fn stage_files(task_id: &str) -> Vec<PathBuf> {
    let dir = PathBuf::from("results").join(task_id);
    ["idea", "literature", "proposal", "experiment", "paper"]
        .iter()
        .map(|s| dir.join(format!("{s}.json")))
        .collect()
}

/// Test: empty generation still yields a complete paper and every artifact
#[tokio::test]
async fn test_empty_generation_produces_complete_paper() {
    let workspaces = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(MemoryArtifactStore::new());
    let ctx = StageContext::new(Arc::new(ScriptedGeneration::empty("stub")));
    let pipeline = pipeline(ctx, EventEmitter::new(), store.clone(), workspaces.path());

    let paper = pipeline
        .run_full_pipeline(&task())
        .await
        .expect("pipeline should succeed");

    for (name, body) in paper.sections() {
        assert!(!body.trim().is_empty(), "paper field {name} is empty");
    }
    assert_eq!(paper.title, "Research Idea for Bidirectional Human-AI Alignment");

    for file in stage_files("t1") {
        assert!(store.get(&file).is_some(), "{file:?} not persisted");
    }
    let markdown = store.get(Path::new("results/t1/paper.md")).expect("paper.md");
    assert!(markdown.starts_with("# Research Idea for"));

    let saved: ResearchPaper =
        serde_json::from_str(&store.get(Path::new("results/t1/paper.json")).expect("paper.json"))
            .expect("paper.json parses");
    assert_eq!(saved, paper);

    let evaluation: serde_json::Value = serde_json::from_str(
        &store.get(Path::new("results/t1/evaluation.json")).expect("evaluation.json"),
    )
    .expect("evaluation parses");
    assert_eq!(evaluation["average_score"], 5.0);
    assert_eq!(evaluation["stage"], "combined");

    assert!(workspaces.path().join("t1").join("experiment.py").is_file());
}

/// Test: artifacts carry parsed content through every stage
#[tokio::test]
async fn test_scripted_model_flows_through_stages() {
    let workspaces = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(MemoryArtifactStore::new());
    let ctx = StageContext::new(Arc::new(ScriptedGeneration::with_responder("gemini-test", scripted_model)));
    let pipeline = pipeline(ctx, EventEmitter::new(), store, workspaces.path());

    let artifacts = pipeline.run_stages(&task()).await.expect("pipeline should succeed");

    assert_eq!(artifacts.idea.title, "Mutual Calibration");
    assert_eq!(artifacts.literature.research_gap, "No bidirectional view.");
    assert_eq!(artifacts.proposal.title, "Mutual Calibration");
    assert_eq!(artifacts.proposal.methodology, "Two-sided RLHF.");
    assert_eq!(artifacts.experiment.metrics["lines_of_code"], 5.0);
    assert_eq!(artifacts.paper.title, "Mutual Calibration");
    assert_eq!(artifacts.paper.results, "Trust up 12%.");
    assert_eq!(artifacts.paper.introduction, artifacts.proposal.introduction);
    assert_eq!(artifacts.paper.model_name, "gemini-test");

    assert_eq!(artifacts.evaluation.idea_score, 7.0);
    assert_eq!(artifacts.evaluation.paper_score, 9.0);
    assert_eq!(artifacts.evaluation.average_score, 8.0);
    assert_eq!(artifacts.evaluation.evaluation.consistency_score, Some(7.0));
    assert_eq!(artifacts.evaluation.evaluation.clarity_score, Some(9.0));
}

/// Test: the filesystem store lays out the results directory
#[tokio::test]
async fn test_filesystem_results_layout() {
    let root = tempfile::tempdir().expect("tempdir");
    let ctx = StageContext::new(Arc::new(ScriptedGeneration::with_responder("m", scripted_model)));
    let judge = MlrJudge::new(vec![ctx.clone()]);
    let pipeline = ResearchPipeline::new(ctx, judge, EventEmitter::new())
        .with_store(Arc::new(FsArtifactStore::new()))
        .with_workspaces(WorkspaceManager::new(root.path().join("workspaces")))
        .with_results_dir(root.path().join("results"));

    pipeline.run_full_pipeline(&task()).await.expect("pipeline should succeed");

    let dir = root.path().join("results").join("t1");
    for name in [
        "idea.json",
        "literature.json",
        "proposal.json",
        "experiment.json",
        "paper.json",
        "paper.md",
        "evaluation.json",
    ] {
        assert!(dir.join(name).is_file(), "{name} missing");
    }
    let markdown = std::fs::read_to_string(dir.join("paper.md")).expect("read paper.md");
    assert!(markdown.contains("## 5. Results\nTrust up 12%."));
}

/// Test: a persistence failure aborts the run before later stages
#[tokio::test]
async fn test_persistence_failure_aborts_run() {
    let workspaces = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FailingArtifactStore::new("proposal.json"));
    let emitter = EventEmitter::new();
    let ctx = StageContext::new(Arc::new(ScriptedGeneration::empty("stub")));
    let pipeline = pipeline(ctx, emitter.clone(), store.clone(), workspaces.path());

    let err = pipeline.run_full_pipeline(&task()).await.unwrap_err();

    assert!(matches!(err, PipelineError::Core(_)), "unexpected error: {err}");
    assert_eq!(err.kind(), "persistence");
    assert_eq!(
        store.written(),
        vec![
            PathBuf::from("results/t1/idea.json"),
            PathBuf::from("results/t1/literature.json"),
        ]
    );
    assert!(
        emitter
            .get_events(None)
            .iter()
            .all(|e| e.agent_name != "Experimenter" && e.agent_name != "MLRJudge"),
        "no stage after the failed write should run"
    );
}

/// Test: a failed evaluation write is reported like any other stage failure
#[tokio::test]
async fn test_evaluation_write_failure_emits_error_event() {
    let workspaces = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FailingArtifactStore::new("evaluation.json"));
    let emitter = EventEmitter::new();
    let ctx = StageContext::new(Arc::new(ScriptedGeneration::empty("stub")));
    let pipeline = pipeline(ctx, emitter.clone(), store.clone(), workspaces.path());
    let failed_before = METRICS.stages_failed();

    let err = pipeline.run_full_pipeline(&task()).await.unwrap_err();

    assert_eq!(err.kind(), "persistence");
    assert!(store.written().contains(&PathBuf::from("results/t1/paper.md")));
    assert!(METRICS.stages_failed() > failed_before);

    let last = emitter.get_events(None).pop().expect("events");
    assert_eq!(last.agent_name, "MLRJudge");
    assert_eq!(last.stage, "evaluation");
    assert_eq!(last.event_type, EventType::Error);
    assert_eq!(last.data["type"], "persistence");
    assert!(last.data["error"].as_str().expect("error").contains("evaluation.json"));
}

/// Test: every stage emits its lifecycle events in order
#[tokio::test]
async fn test_event_stream_order() {
    let workspaces = tempfile::tempdir().expect("tempdir");
    let emitter = EventEmitter::new();
    let ctx = StageContext::new(Arc::new(ScriptedGeneration::empty("stub")));
    let pipeline = pipeline(ctx, emitter.clone(), Arc::new(MemoryArtifactStore::new()), workspaces.path());

    pipeline.run_full_pipeline(&task()).await.expect("pipeline should succeed");

    let events = emitter.get_events(None);
    let mut expected = Vec::new();
    for stage in &StageKind::ORDER[..5] {
        for event_type in [
            EventType::Started,
            EventType::Input,
            EventType::Output,
            EventType::Completed,
        ] {
            expected.push((stage.agent_name().to_string(), stage.name().to_string(), event_type));
        }
    }
    for event_type in [EventType::Started, EventType::Output, EventType::Completed] {
        expected.push(("MLRJudge".to_string(), "evaluation".to_string(), event_type));
    }

    let actual: Vec<(String, String, EventType)> = events
        .iter()
        .map(|e| (e.agent_name.clone(), e.stage.clone(), e.event_type))
        .collect();
    assert_eq!(actual, expected);

    assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let completed = events.last().expect("events");
    assert_eq!(completed.data["average"], 5.0);
    assert_eq!(completed.data["scores"]["idea_score"], 5.0);

    let paper_output = events
        .iter()
        .find(|e| e.agent_name == "PaperWriter" && e.event_type == EventType::Output)
        .expect("paper output event");
    assert_eq!(paper_output.data["type"], "ResearchPaper");
    assert!(paper_output.data["preview"].as_str().expect("preview").chars().count() <= 200);
}

/// Test: overloaded generation is retried with backoff and the run succeeds
#[tokio::test(start_paused = true)]
async fn test_overloaded_generation_is_retried() {
    let workspaces = tempfile::tempdir().expect("tempdir");
    let service = Arc::new(FlakyGeneration::overloaded(ScriptedGeneration::empty("stub"), 2));
    let ctx = StageContext::new(service.clone()).with_retry(RetryPolicy::new(5, Duration::from_secs(2)));
    let pipeline = pipeline(ctx, EventEmitter::new(), Arc::new(MemoryArtifactStore::new()), workspaces.path());

    let start = tokio::time::Instant::now();
    pipeline.run_full_pipeline(&task()).await.expect("retries should absorb the overload");

    // Five stages plus two evaluator calls, plus the two rejected attempts.
    assert_eq!(service.calls(), 9);
    assert!(start.elapsed() >= Duration::from_secs(6));
}

/// Test: a non-transient generation failure aborts the first stage
#[tokio::test]
async fn test_rejected_generation_aborts_with_error_event() {
    let workspaces = tempfile::tempdir().expect("tempdir");
    let emitter = EventEmitter::new();
    let service = Arc::new(FlakyGeneration::rejecting(ScriptedGeneration::empty("stub"), 1));
    let ctx = StageContext::new(service.clone()).with_retry(RetryPolicy::default());
    let store = Arc::new(MemoryArtifactStore::new());
    let pipeline = pipeline(ctx, emitter.clone(), store.clone(), workspaces.path());

    let err = pipeline.run_full_pipeline(&task()).await.unwrap_err();

    assert!(matches!(err, PipelineError::Stage { stage: StageKind::Idea, .. }));
    assert_eq!(err.kind(), "upstream");
    assert_eq!(service.calls(), 1);
    assert!(store.paths().is_empty());

    let last = emitter.get_events(None).pop().expect("events");
    assert_eq!(last.agent_name, "IdeaGenerator");
    assert_eq!(last.event_type, EventType::Error);
    assert_eq!(last.data["type"], "upstream");
    assert!(last.data["error"].as_str().expect("error").contains("400"));
}

/// Test: generation services are swappable behind the trait object
#[tokio::test]
async fn test_judges_can_use_their_own_models() {
    let workspaces = tempfile::tempdir().expect("tempdir");
    let writer: Arc<dyn GenerationService> = Arc::new(ScriptedGeneration::empty("writer"));
    let judge_model = Arc::new(ScriptedGeneration::with_responder("judge", |_| "Overall: 3".to_string()));

    let judge = MlrJudge::new(vec![StageContext::new(judge_model.clone())]);
    let pipeline = ResearchPipeline::new(StageContext::new(writer), judge, EventEmitter::new())
        .with_store(Arc::new(MemoryArtifactStore::new()))
        .with_workspaces(WorkspaceManager::new(workspaces.path()));

    let artifacts = pipeline.run_stages(&task()).await.expect("pipeline should succeed");
    assert_eq!(artifacts.evaluation.average_score, 3.0);
    assert_eq!(artifacts.evaluation.model_name, "judge");
    assert_eq!(judge_model.requests().len(), 2);
    assert_eq!(artifacts.paper.model_name, "writer");
}
