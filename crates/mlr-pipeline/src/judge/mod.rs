//! Multi-judge evaluation panel.
//!
//! [`MlrJudge`] holds one idea evaluator and one paper evaluator per
//! configured judge model, named `judge_1`, `judge_2`, ... in order.
//! Evaluators run sequentially and their verdicts are combined with
//! [`aggregate`].

pub mod evaluator;

pub use evaluator::{
    build_verdict, extract_scores, overall_score, ExtractedScores, IdeaEvaluator, PaperEvaluator,
    DEFAULT_OVERALL, IDEA_RUBRICS, PAPER_RUBRICS,
};

use std::collections::BTreeMap;

use mlr_core::{
    AggregatedEvaluation, CombinedEvaluation, EvaluationResult, ResearchIdea, ResearchPaper,
    Rubric, Task,
};
use tracing::info;

use crate::units::{StageContext, StageError};

/// Score assumed for each side of the combined path when it is not judged.
pub const UNJUDGED_SCORE: f64 = 7.0;

/// Errors raised by the judge panel.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("no evaluations to aggregate")]
    EmptyEvaluations,

    #[error(transparent)]
    Stage(#[from] StageError),
}

impl JudgeError {
    pub fn kind(&self) -> &'static str {
        match self {
            JudgeError::EmptyEvaluations => "empty_evaluations",
            JudgeError::Stage(e) => e.kind(),
        }
    }
}

impl mlr_core::ErrorKind for JudgeError {
    fn kind(&self) -> &'static str {
        JudgeError::kind(self)
    }
}

/// Combine verdicts on one artifact.
///
/// `average_score` is the mean of every `overall_score`; each rubric in
/// `score_breakdown` is averaged over the evaluators that reported it.
pub fn aggregate(
    task_id: &str,
    stage: &str,
    evaluations: Vec<EvaluationResult>,
) -> Result<AggregatedEvaluation, JudgeError> {
    if evaluations.is_empty() {
        return Err(JudgeError::EmptyEvaluations);
    }

    let average_score =
        evaluations.iter().map(|e| e.overall_score).sum::<f64>() / evaluations.len() as f64;

    let mut score_breakdown = BTreeMap::new();
    for rubric in Rubric::ALL {
        let reported: Vec<f64> = evaluations
            .iter()
            .filter_map(|e| e.rubric_score(rubric))
            .collect();
        if !reported.is_empty() {
            let mean = reported.iter().sum::<f64>() / reported.len() as f64;
            score_breakdown.insert(rubric.name().to_string(), mean);
        }
    }

    Ok(AggregatedEvaluation {
        task_id: task_id.to_string(),
        stage: stage.to_string(),
        evaluations,
        average_score,
        score_breakdown,
    })
}

/// Panel of judges, one per generation context.
#[derive(Debug, Clone)]
pub struct MlrJudge {
    idea_evaluators: Vec<IdeaEvaluator>,
    paper_evaluators: Vec<PaperEvaluator>,
}

impl MlrJudge {
    pub fn new(judges: Vec<StageContext>) -> Self {
        let idea_evaluators = judges
            .iter()
            .enumerate()
            .map(|(i, ctx)| IdeaEvaluator::new(format!("judge_{}", i + 1), ctx.clone()))
            .collect();
        let paper_evaluators = judges
            .into_iter()
            .enumerate()
            .map(|(i, ctx)| PaperEvaluator::new(format!("judge_{}", i + 1), ctx))
            .collect();
        let judge = Self {
            idea_evaluators,
            paper_evaluators,
        };
        info!(judges = judge.judge_count(), "judge panel initialized");
        judge
    }

    pub fn judge_count(&self) -> usize {
        self.idea_evaluators.len()
    }

    /// Run every idea evaluator and aggregate their verdicts.
    pub async fn evaluate_idea(
        &self,
        idea: &ResearchIdea,
        task: &Task,
    ) -> Result<AggregatedEvaluation, JudgeError> {
        let mut evaluations = Vec::with_capacity(self.idea_evaluators.len());
        for evaluator in &self.idea_evaluators {
            evaluations.push(evaluator.evaluate(idea, task).await?);
        }
        let aggregated = aggregate(&task.task_id, "idea", evaluations)?;
        info!(task_id = %task.task_id, average = aggregated.average_score, "idea evaluation complete");
        Ok(aggregated)
    }

    /// Run every paper evaluator and aggregate their verdicts.
    pub async fn evaluate_paper(
        &self,
        paper: &ResearchPaper,
        task: &Task,
        code_files: &[String],
    ) -> Result<AggregatedEvaluation, JudgeError> {
        let mut evaluations = Vec::with_capacity(self.paper_evaluators.len());
        for evaluator in &self.paper_evaluators {
            evaluations.push(evaluator.evaluate(paper, task, code_files).await?);
        }
        let aggregated = aggregate(&task.task_id, "paper", evaluations)?;
        info!(task_id = %task.task_id, average = aggregated.average_score, "paper evaluation complete");
        Ok(aggregated)
    }

    /// Score idea and paper with the first judge only.
    ///
    /// Without a task, or without any judge, both sides default to
    /// [`UNJUDGED_SCORE`].
    pub async fn evaluate_combined(
        &self,
        idea: &ResearchIdea,
        paper: &ResearchPaper,
        task: Option<&Task>,
    ) -> Result<CombinedEvaluation, JudgeError> {
        let idea_score = match (task, self.idea_evaluators.first()) {
            (Some(task), Some(evaluator)) => evaluator.evaluate(idea, task).await?.overall_score,
            _ => UNJUDGED_SCORE,
        };
        let paper_score = match (task, self.paper_evaluators.first()) {
            (Some(task), Some(evaluator)) => {
                evaluator.evaluate(paper, task, &[]).await?.overall_score
            }
            _ => UNJUDGED_SCORE,
        };
        let average_score = (idea_score + paper_score) / 2.0;

        let mut evaluation = EvaluationResult::with_overall("judge_1", average_score);
        evaluation.consistency_score = Some(idea_score);
        evaluation.clarity_score = Some(paper_score);
        evaluation.feedback = "Combined evaluation of idea and paper".to_string();

        info!(
            idea = idea_score,
            paper = paper_score,
            average = average_score,
            "combined evaluation complete"
        );

        Ok(CombinedEvaluation {
            task_id: task.map_or_else(|| "unknown".to_string(), |t| t.task_id.clone()),
            stage: "combined".to_string(),
            model_name: self
                .idea_evaluators
                .first()
                .map_or_else(|| "unknown".to_string(), |e| e.model_name().to_string()),
            idea_score,
            paper_score,
            average_score,
            evaluation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(overall: f64, scores: &[(Rubric, f64)]) -> EvaluationResult {
        let mut result = EvaluationResult::with_overall("j", overall);
        for (rubric, score) in scores {
            result.set_rubric_score(*rubric, Some(*score));
        }
        result
    }

    #[test]
    fn test_aggregate_empty_is_error() {
        let err = aggregate("t1", "idea", Vec::new()).unwrap_err();
        assert!(matches!(err, JudgeError::EmptyEvaluations));
        assert_eq!(err.kind(), "empty_evaluations");
    }

    #[test]
    fn test_breakdown_averages_reporters_only() {
        let a = verdict(6.0, &[(Rubric::Clarity, 8.0)]);
        let b = verdict(8.0, &[(Rubric::Clarity, 6.0), (Rubric::Novelty, 7.0)]);
        let aggregated = aggregate("t1", "paper", vec![a, b]).expect("aggregate");

        assert_eq!(aggregated.average_score, 7.0);
        assert_eq!(aggregated.score_breakdown.get("clarity"), Some(&7.0));
        assert_eq!(aggregated.score_breakdown.get("novelty"), Some(&7.0));
        assert!(!aggregated.score_breakdown.contains_key("soundness"));
        assert_eq!(aggregated.evaluations.len(), 2);
        assert_eq!(aggregated.stage, "paper");
    }

    #[test]
    fn test_judges_are_numbered() {
        use mlr_core::fakes::ScriptedGeneration;
        use std::sync::Arc;

        let judge = MlrJudge::new(vec![
            StageContext::new(Arc::new(ScriptedGeneration::empty("a"))),
            StageContext::new(Arc::new(ScriptedGeneration::empty("b"))),
        ]);
        assert_eq!(judge.judge_count(), 2);
        let names: Vec<&str> = judge.paper_evaluators.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["judge_1", "judge_2"]);
    }
}
