//! Experiment stage: proposal -> generated code saved to the workspace.
//!
//! The generated code is written to `<workspace>/experiment.py` and never
//! executed; the result only reports its size.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use mlr_core::{
    BenchError, ExperimentResult, LiteratureReview, ResearchIdea, ResearchProposal, Task,
};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::{StageContext, StageResult, StageUnit};
use crate::prompts;
use crate::stage::StageKind;

/// File name of the generated experiment code inside the workspace.
pub const EXPERIMENT_FILE: &str = "experiment.py";

const EXECUTION_LOG: &str = "Mock execution log - code generated but not executed for safety";

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentInput {
    pub task: Task,
    pub idea: ResearchIdea,
    pub proposal: ResearchProposal,
    pub literature: LiteratureReview,
    /// Isolated per-task directory the code is written into.
    pub workspace: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Experimenter {
    ctx: StageContext,
}

impl Experimenter {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }

    /// Describe `code` saved at `code_file`.
    pub fn summarize(&self, task: &Task, code: &str, code_file: &str) -> ExperimentResult {
        let mut results = serde_json::Map::new();
        results.insert("status".to_string(), json!("generated"));
        results.insert(
            "note".to_string(),
            json!("Code generated successfully. In production, this would execute."),
        );

        let metrics = BTreeMap::from([
            ("code_length".to_string(), code.chars().count() as f64),
            ("lines_of_code".to_string(), code.split('\n').count() as f64),
        ]);

        ExperimentResult {
            task_id: task.task_id.clone(),
            code_files: vec![code_file.to_string()],
            execution_log: EXECUTION_LOG.to_string(),
            results,
            metrics,
            success: true,
            error_message: None,
            model_name: self.ctx.model_name().to_string(),
        }
    }
}

#[async_trait]
impl StageUnit for Experimenter {
    type Input = ExperimentInput;
    type Output = ExperimentResult;

    fn kind(&self) -> StageKind {
        StageKind::Experiment
    }

    async fn run(&self, input: &ExperimentInput) -> StageResult<ExperimentResult> {
        info!(idea = %input.idea.title, "generating experiment code");
        let code = self
            .ctx
            .generate(
                prompts::EXPERIMENT_INSTRUCTION,
                prompts::experiment_coding(&input.proposal),
                &format!("experiment_{}", input.task.task_id),
            )
            .await?;

        let code_file = input.workspace.join(EXPERIMENT_FILE);
        tokio::fs::write(&code_file, &code)
            .await
            .map_err(|source| BenchError::Persistence {
                path: code_file.clone(),
                source,
            })?;

        info!(path = ?code_file, bytes = code.len(), "saved experiment code");
        Ok(self.summarize(&input.task, &code, &code_file.to_string_lossy()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlr_core::fakes::ScriptedGeneration;
    use mlr_core::TaskCategory;
    use std::sync::Arc;

    fn experimenter(code: &'static str) -> Experimenter {
        Experimenter::new(StageContext::new(Arc::new(ScriptedGeneration::with_responder(
            "coder",
            move |_| code.to_string(),
        ))))
    }

    fn input(workspace: PathBuf) -> ExperimentInput {
        let task = Task::new("t1", "T", TaskCategory::Nlp, "d");
        let idea: ResearchIdea = serde_json::from_value(json!({
            "task_id": "t1", "title": "I", "motivation": "m", "main_idea": "x",
            "methodology": null, "expected_outcomes": null, "model_name": "m"
        }))
        .expect("idea");
        let proposal: ResearchProposal = serde_json::from_value(json!({
            "task_id": "t1", "title": "I", "abstract": "a", "introduction": "i",
            "related_work": "r", "methodology": "m", "expected_results": "e",
            "experimental_plan": "p", "model_name": "m"
        }))
        .expect("proposal");
        let literature: LiteratureReview = serde_json::from_value(json!({
            "task_id": "t1", "idea_title": "I", "key_findings": "k", "research_gap": "g",
            "related_work_summary": "r", "model_name": "m"
        }))
        .expect("literature");
        ExperimentInput {
            task,
            idea,
            proposal,
            literature,
            workspace,
        }
    }

    #[tokio::test]
    async fn test_code_is_written_and_measured() {
        let dir = tempfile::tempdir().expect("tempdir");
        let code = "import torch\nprint('hi')";
        let result = experimenter(code)
            .run(&input(dir.path().to_path_buf()))
            .await
            .expect("experiment");

        let saved = std::fs::read_to_string(dir.path().join(EXPERIMENT_FILE)).expect("saved");
        assert_eq!(saved, code);
        assert_eq!(result.metrics["code_length"], code.len() as f64);
        assert_eq!(result.metrics["lines_of_code"], 2.0);
        assert!(result.success);
        assert_eq!(result.results["status"], "generated");
        assert_eq!(result.code_files.len(), 1);
        assert!(result.code_files[0].ends_with(EXPERIMENT_FILE));
    }

    #[tokio::test]
    async fn test_empty_code_counts_one_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = experimenter("")
            .run(&input(dir.path().to_path_buf()))
            .await
            .expect("experiment");
        assert_eq!(result.metrics["code_length"], 0.0);
        assert_eq!(result.metrics["lines_of_code"], 1.0);
    }

    #[tokio::test]
    async fn test_missing_workspace_is_persistence_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = experimenter("x")
            .run(&input(dir.path().join("missing")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "persistence");
    }
}
