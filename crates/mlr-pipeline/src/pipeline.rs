//! Research pipeline orchestration.
//!
//! A run walks the six stages in order for one task:
//! Idea -> Literature -> Proposal -> Experiment -> Paper -> Evaluation.
//! Each artifact is persisted under `<results>/<task_id>/` before the next
//! stage starts; any failure aborts the run. There is no resume.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use mlr_core::{
    obs, save_record, task_span, ArtifactStore, BenchError, CombinedEvaluation, EventEmitter,
    EventType, ExperimentResult, FsArtifactStore, LiteratureReview, ResearchIdea, ResearchPaper,
    ResearchProposal, Task, WorkspaceManager, METRICS,
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, Instrument};

use crate::judge::{JudgeError, MlrJudge};
use crate::stage::StageKind;
use crate::units::{
    ExperimentInput, Experimenter, IdeaGenerator, IdeaInput, LiteratureInput, LiteratureReviewer,
    PaperInput, PaperWriter, ProposalInput, ProposalWriter, StageContext, StageError, StageUnit,
    Traced,
};

/// File names written next to the stage artifacts.
pub const PAPER_MARKDOWN_FILE: &str = "paper.md";
pub const EVALUATION_FILE: &str = "evaluation.json";

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: StageKind,
        #[source]
        source: StageError,
    },

    #[error("evaluation failed: {0}")]
    Evaluation(#[from] JudgeError),

    #[error(transparent)]
    Core(#[from] BenchError),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Stage { source, .. } => source.kind(),
            PipelineError::Evaluation(e) => e.kind(),
            PipelineError::Core(e) => e.kind(),
        }
    }
}

/// Every artifact produced by one successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineArtifacts {
    pub idea: ResearchIdea,
    pub literature: LiteratureReview,
    pub proposal: ResearchProposal,
    pub experiment: ExperimentResult,
    pub paper: ResearchPaper,
    pub evaluation: CombinedEvaluation,
}

/// Drives one task through every stage, persisting as it goes.
pub struct ResearchPipeline {
    idea: Traced<IdeaGenerator>,
    literature: Traced<LiteratureReviewer>,
    proposal: Traced<ProposalWriter>,
    experiment: Traced<Experimenter>,
    paper: Traced<PaperWriter>,
    judge: MlrJudge,
    emitter: EventEmitter,
    store: Arc<dyn ArtifactStore>,
    workspaces: WorkspaceManager,
    results_dir: PathBuf,
}

impl ResearchPipeline {
    /// Pipeline writing to `results/` and `workspaces/` on the filesystem.
    pub fn new(ctx: StageContext, judge: MlrJudge, emitter: EventEmitter) -> Self {
        Self {
            idea: Traced::new(IdeaGenerator::new(ctx.clone()), emitter.clone()),
            literature: Traced::new(LiteratureReviewer::new(ctx.clone()), emitter.clone()),
            proposal: Traced::new(ProposalWriter::new(ctx.clone()), emitter.clone()),
            experiment: Traced::new(Experimenter::new(ctx.clone()), emitter.clone()),
            paper: Traced::new(PaperWriter::new(ctx), emitter.clone()),
            judge,
            emitter,
            store: Arc::new(FsArtifactStore::new()),
            workspaces: WorkspaceManager::new("workspaces"),
            results_dir: PathBuf::from("results"),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_results_dir(mut self, results_dir: impl Into<PathBuf>) -> Self {
        self.results_dir = results_dir.into();
        self
    }

    pub fn with_workspaces(mut self, workspaces: WorkspaceManager) -> Self {
        self.workspaces = workspaces;
        self
    }

    pub fn judge(&self) -> &MlrJudge {
        &self.judge
    }

    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    pub fn store(&self) -> &dyn ArtifactStore {
        self.store.as_ref()
    }

    /// Directory holding `task_id`'s artifacts.
    pub fn task_results_dir(&self, task_id: &str) -> PathBuf {
        self.results_dir.join(task_id)
    }

    /// Run every stage and return the paper.
    pub async fn run_full_pipeline(&self, task: &Task) -> Result<ResearchPaper, PipelineError> {
        Ok(self.run_stages(task).await?.paper)
    }

    /// Run every stage and return all artifacts.
    pub async fn run_stages(&self, task: &Task) -> Result<PipelineArtifacts, PipelineError> {
        let started = Instant::now();
        obs::emit_pipeline_started(&task.task_id, &task.title);

        let outcome = self
            .execute(task)
            .instrument(task_span(&task.task_id))
            .await;

        let duration_ms = started.elapsed().as_millis() as u64;
        obs::emit_pipeline_finished(&task.task_id, duration_ms, outcome.is_ok());
        if let Err(e) = &outcome {
            error!(task_id = %task.task_id, error = %e, "pipeline failed");
        }
        outcome
    }

    async fn execute(&self, task: &Task) -> Result<PipelineArtifacts, PipelineError> {
        let workspace = self.workspaces.create_workspace(&task.task_id).await?;
        let dir = self.task_results_dir(&task.task_id);

        let idea = self
            .run_stage(&self.idea, &IdeaInput { task: task.clone() }, task, &dir)
            .await?;

        let literature = self
            .run_stage(
                &self.literature,
                &LiteratureInput {
                    task: task.clone(),
                    idea: idea.clone(),
                },
                task,
                &dir,
            )
            .await?;

        let proposal = self
            .run_stage(
                &self.proposal,
                &ProposalInput {
                    task: task.clone(),
                    idea: idea.clone(),
                    literature: literature.clone(),
                },
                task,
                &dir,
            )
            .await?;

        let experiment = self
            .run_stage(
                &self.experiment,
                &ExperimentInput {
                    task: task.clone(),
                    idea: idea.clone(),
                    proposal: proposal.clone(),
                    literature: literature.clone(),
                    workspace,
                },
                task,
                &dir,
            )
            .await?;

        let paper_input = PaperInput {
            task: task.clone(),
            idea,
            literature,
            proposal,
            experiment,
        };
        let paper = self.run_stage(&self.paper, &paper_input, task, &dir).await?;
        self.store
            .save_text(&paper.to_markdown(), &dir.join(PAPER_MARKDOWN_FILE))
            .await?;

        let PaperInput {
            idea,
            literature,
            proposal,
            experiment,
            ..
        } = paper_input;

        let evaluation = self.evaluate(task, &idea, &paper, &dir).await?;

        info!(
            task_id = %task.task_id,
            idea = evaluation.idea_score,
            paper = evaluation.paper_score,
            average = evaluation.average_score,
            "pipeline completed"
        );

        Ok(PipelineArtifacts {
            idea,
            literature,
            proposal,
            experiment,
            paper,
            evaluation,
        })
    }

    /// Run one traced stage, then persist its artifact.
    async fn run_stage<S: StageUnit>(
        &self,
        unit: &Traced<S>,
        input: &S::Input,
        task: &Task,
        dir: &Path,
    ) -> Result<S::Output, PipelineError> {
        let kind = unit.kind();
        info!(
            stage = kind.name(),
            step = kind.position(),
            total = StageKind::ORDER.len(),
            "running stage"
        );
        let started = Instant::now();

        let output = match unit.run(input).await {
            Ok(output) => output,
            Err(source) => {
                METRICS.inc_stages_failed();
                obs::emit_stage_failed(&task.task_id, kind.name(), &source);
                return Err(PipelineError::Stage { stage: kind, source });
            }
        };

        if let Err(e) = save_record(self.store.as_ref(), &output, &dir.join(kind.artifact_file())).await {
            METRICS.inc_stages_failed();
            obs::emit_stage_failed(&task.task_id, kind.name(), &e);
            return Err(e.into());
        }

        METRICS.inc_stages_completed();
        obs::emit_stage_completed(&task.task_id, kind.name(), started.elapsed().as_millis() as u64);
        Ok(output)
    }

    /// Combined judge scoring, reported as `MLRJudge`/`evaluation` events.
    async fn evaluate(
        &self,
        task: &Task,
        idea: &ResearchIdea,
        paper: &ResearchPaper,
        dir: &Path,
    ) -> Result<CombinedEvaluation, PipelineError> {
        let stage = StageKind::Evaluation;
        let emit = |event_type, data| {
            self.emitter
                .emit_with(stage.agent_name(), stage.name(), event_type, data)
        };
        info!(
            stage = stage.name(),
            step = stage.position(),
            total = StageKind::ORDER.len(),
            "running stage"
        );
        let started = Instant::now();
        emit(EventType::Started, json!({}));

        let outcome = match self.judge.evaluate_combined(idea, paper, Some(task)).await {
            Ok(evaluation) => save_record(self.store.as_ref(), &evaluation, &dir.join(EVALUATION_FILE))
                .await
                .map(|()| evaluation)
                .map_err(PipelineError::from),
            Err(e) => Err(PipelineError::from(e)),
        };
        let evaluation = match outcome {
            Ok(evaluation) => evaluation,
            Err(e) => {
                emit(EventType::Error, json!({ "error": e.to_string(), "type": e.kind() }));
                METRICS.inc_stages_failed();
                obs::emit_stage_failed(&task.task_id, stage.name(), &e);
                return Err(e);
            }
        };

        let scores = json!({
            "idea_score": evaluation.idea_score,
            "paper_score": evaluation.paper_score,
            "average": evaluation.average_score,
        });
        let mut payload = scores.clone();
        payload["scores"] = scores;
        emit(EventType::Output, payload.clone());
        emit(EventType::Completed, payload);

        METRICS.inc_stages_completed();
        obs::emit_stage_completed(&task.task_id, stage.name(), started.elapsed().as_millis() as u64);
        obs::emit_evaluation_scored(
            &task.task_id,
            evaluation.idea_score,
            evaluation.paper_score,
            evaluation.average_score,
        );
        Ok(evaluation)
    }
}
