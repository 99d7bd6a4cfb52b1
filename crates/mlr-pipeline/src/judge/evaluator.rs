//! Single-judge evaluators for ideas and papers.
//!
//! A review response is scanned line by line for `<rubric>: <number>`
//! pairs. The overall score is the explicit `overall` value when nonzero,
//! otherwise the mean of the nonzero rubric scores for the evaluator's
//! kind, otherwise 5.0.

use std::collections::BTreeMap;

use mlr_core::domain::is_valid_score;
use mlr_core::text::{non_empty_or, prefix_or};
use mlr_core::{
    EvaluationResult, HeaderStyle, Joiner, ResearchIdea, ResearchPaper, Rubric, SectionSchema,
    SectionSpec, Task, METRICS,
};
use tracing::info;

use crate::prompts;
use crate::units::{StageContext, StageResult};

/// Rubrics an idea evaluator reports.
pub const IDEA_RUBRICS: [Rubric; 5] = [
    Rubric::Consistency,
    Rubric::Clarity,
    Rubric::Novelty,
    Rubric::Feasibility,
    Rubric::Significance,
];

/// Rubrics a paper evaluator reports.
pub const PAPER_RUBRICS: [Rubric; 4] = [
    Rubric::Clarity,
    Rubric::Novelty,
    Rubric::Soundness,
    Rubric::Significance,
];

/// Overall score used when a response yields nothing usable.
pub const DEFAULT_OVERALL: f64 = 5.0;

/// Scores found in a review response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedScores {
    pub overall: Option<f64>,
    pub rubrics: BTreeMap<Rubric, f64>,
}

/// First number in the first token of `text`, if it is a valid score.
fn leading_score(text: &str) -> Option<f64> {
    let token = text.split_whitespace().next()?;
    let digits: String = token
        .chars()
        .skip_while(|c| !c.is_ascii_digit() && *c != '.')
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value: f64 = digits.parse().ok()?;
    is_valid_score(value).then_some(value)
}

/// Scan `raw` for `<name>: <score>` lines. Later lines win.
pub fn extract_scores(raw: &str) -> ExtractedScores {
    let mut scores = ExtractedScores::default();
    for line in raw.lines() {
        let lower = line.to_lowercase();
        let Some((_, rest)) = lower.split_once(':') else {
            continue;
        };
        let Some(value) = leading_score(rest) else {
            continue;
        };
        for rubric in Rubric::ALL {
            if lower.contains(rubric.name()) {
                scores.rubrics.insert(rubric, value);
            }
        }
        if lower.contains("overall") {
            scores.overall = Some(value);
        }
    }
    scores
}

/// Explicit overall when nonzero, else the mean of nonzero `rubrics`,
/// else [`DEFAULT_OVERALL`].
pub fn overall_score(scores: &ExtractedScores, rubrics: &[Rubric]) -> f64 {
    if let Some(overall) = scores.overall.filter(|o| *o != 0.0) {
        return overall;
    }
    let nonzero: Vec<f64> = rubrics
        .iter()
        .filter_map(|r| scores.rubrics.get(r).copied())
        .filter(|s| *s > 0.0)
        .collect();
    if nonzero.is_empty() {
        DEFAULT_OVERALL
    } else {
        nonzero.iter().sum::<f64>() / nonzero.len() as f64
    }
}

fn feedback_schema() -> SectionSchema {
    SectionSchema::new(
        HeaderStyle::Labeled,
        Joiner::Newline,
        vec![
            SectionSpec::new("strengths", &["strengths:"]),
            SectionSpec::new("weaknesses", &["weaknesses:"]),
            SectionSpec::new("feedback", &["feedback:"]),
        ],
    )
    .with_default_section("feedback")
}

/// Turn one review response into a verdict reporting `rubrics`.
pub fn build_verdict(
    ctx: &StageContext,
    evaluator_name: &str,
    raw: &str,
    rubrics: &[Rubric],
) -> EvaluationResult {
    let scores = extract_scores(raw);
    let sections = ctx.parser().parse(raw, &feedback_schema());

    let mut result = EvaluationResult::with_overall(evaluator_name, overall_score(&scores, rubrics));
    for rubric in rubrics {
        result.set_rubric_score(*rubric, scores.rubrics.get(rubric).copied());
    }
    result.feedback = match sections.get("feedback") {
        Some(feedback) => feedback.to_string(),
        None => prefix_or(raw, 500, "No feedback provided"),
    };
    result.strengths = non_empty_or(sections.get("strengths"), "Strengths identified");
    result.weaknesses = non_empty_or(sections.get("weaknesses"), "Weaknesses identified");
    result
}

/// Scores research ideas on consistency, clarity, novelty, feasibility
/// and significance.
#[derive(Debug, Clone)]
pub struct IdeaEvaluator {
    name: String,
    ctx: StageContext,
}

impl IdeaEvaluator {
    pub fn new(name: impl Into<String>, ctx: StageContext) -> Self {
        Self {
            name: name.into(),
            ctx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_name(&self) -> &str {
        self.ctx.model_name()
    }

    pub async fn evaluate(&self, idea: &ResearchIdea, task: &Task) -> StageResult<EvaluationResult> {
        info!(evaluator = %self.name, idea = %idea.title, "evaluating idea");
        let raw = self
            .ctx
            .generate(
                prompts::IDEA_EVALUATION_INSTRUCTION,
                prompts::idea_evaluation(idea),
                &format!("eval_idea_{}_{}", task.task_id, self.name),
            )
            .await?;
        let result = build_verdict(&self.ctx, &self.name, &raw, &IDEA_RUBRICS);
        METRICS.inc_evaluations();
        info!(evaluator = %self.name, score = result.overall_score, "idea evaluation complete");
        Ok(result)
    }
}

/// Scores research papers on clarity, novelty, soundness and significance.
#[derive(Debug, Clone)]
pub struct PaperEvaluator {
    name: String,
    ctx: StageContext,
}

impl PaperEvaluator {
    pub fn new(name: impl Into<String>, ctx: StageContext) -> Self {
        Self {
            name: name.into(),
            ctx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn evaluate(
        &self,
        paper: &ResearchPaper,
        task: &Task,
        code_files: &[String],
    ) -> StageResult<EvaluationResult> {
        info!(evaluator = %self.name, paper = %paper.title, "evaluating paper");
        let raw = self
            .ctx
            .generate(
                prompts::PAPER_EVALUATION_INSTRUCTION,
                prompts::paper_evaluation(paper, code_files),
                &format!("eval_paper_{}_{}", task.task_id, self.name),
            )
            .await?;
        let result = build_verdict(&self.ctx, &self.name, &raw, &PAPER_RUBRICS);
        METRICS.inc_evaluations();
        info!(evaluator = %self.name, score = result.overall_score, "paper evaluation complete");
        Ok(result)
    }
}
