//! Judge verdicts and their aggregation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Named scoring dimension, scored in [0, 10].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Rubric {
    Consistency,
    Clarity,
    Novelty,
    Feasibility,
    Significance,
    Soundness,
}

impl Rubric {
    pub const ALL: [Rubric; 6] = [
        Rubric::Consistency,
        Rubric::Clarity,
        Rubric::Novelty,
        Rubric::Feasibility,
        Rubric::Significance,
        Rubric::Soundness,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Rubric::Consistency => "consistency",
            Rubric::Clarity => "clarity",
            Rubric::Novelty => "novelty",
            Rubric::Feasibility => "feasibility",
            Rubric::Significance => "significance",
            Rubric::Soundness => "soundness",
        }
    }
}

/// Upper bound of every score.
pub const MAX_SCORE: f64 = 10.0;

/// Whether `score` lies in the closed score range [0, 10].
pub fn is_valid_score(score: f64) -> bool {
    (0.0..=MAX_SCORE).contains(&score)
}

/// One evaluator's verdict on one artifact.
///
/// `overall_score` is always set; rubric scores are absent when the judge's
/// response did not yield a usable value for them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationResult {
    pub evaluator_name: String,
    pub overall_score: f64,
    #[serde(default)]
    pub consistency_score: Option<f64>,
    #[serde(default)]
    pub clarity_score: Option<f64>,
    #[serde(default)]
    pub novelty_score: Option<f64>,
    #[serde(default)]
    pub feasibility_score: Option<f64>,
    #[serde(default)]
    pub significance_score: Option<f64>,
    #[serde(default)]
    pub soundness_score: Option<f64>,
    pub feedback: String,
    pub strengths: String,
    pub weaknesses: String,
}

impl EvaluationResult {
    /// A verdict with only an overall score and no rubric detail.
    pub fn with_overall(evaluator_name: impl Into<String>, overall_score: f64) -> Self {
        Self {
            evaluator_name: evaluator_name.into(),
            overall_score,
            consistency_score: None,
            clarity_score: None,
            novelty_score: None,
            feasibility_score: None,
            significance_score: None,
            soundness_score: None,
            feedback: String::new(),
            strengths: String::new(),
            weaknesses: String::new(),
        }
    }

    /// Score reported for `rubric`, if any.
    pub fn rubric_score(&self, rubric: Rubric) -> Option<f64> {
        match rubric {
            Rubric::Consistency => self.consistency_score,
            Rubric::Clarity => self.clarity_score,
            Rubric::Novelty => self.novelty_score,
            Rubric::Feasibility => self.feasibility_score,
            Rubric::Significance => self.significance_score,
            Rubric::Soundness => self.soundness_score,
        }
    }

    pub fn set_rubric_score(&mut self, rubric: Rubric, score: Option<f64>) {
        let slot = match rubric {
            Rubric::Consistency => &mut self.consistency_score,
            Rubric::Clarity => &mut self.clarity_score,
            Rubric::Novelty => &mut self.novelty_score,
            Rubric::Feasibility => &mut self.feasibility_score,
            Rubric::Significance => &mut self.significance_score,
            Rubric::Soundness => &mut self.soundness_score,
        };
        *slot = score;
    }
}

/// Combined verdict of every evaluator that scored one artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedEvaluation {
    pub task_id: String,
    /// Which artifact was judged (`idea`, `paper`).
    pub stage: String,
    pub evaluations: Vec<EvaluationResult>,
    /// Mean of every member's `overall_score`.
    pub average_score: f64,
    /// Rubric name to mean score over the evaluators that reported it.
    pub score_breakdown: BTreeMap<String, f64>,
}

/// Single-judge verdict over an idea and the paper built from it.
///
/// The flattened `evaluation` carries the average as `overall_score`, the
/// idea score as `consistency_score` and the paper score as `clarity_score`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CombinedEvaluation {
    pub task_id: String,
    pub stage: String,
    pub model_name: String,
    pub idea_score: f64,
    pub paper_score: f64,
    pub average_score: f64,
    #[serde(flatten)]
    pub evaluation: EvaluationResult,
}

/// Average, min and max over a set of scores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreSummary {
    /// Mean rounded to two decimals.
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl ScoreSummary {
    /// Summarise `scores`. Returns `None` for an empty slice.
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let sum: f64 = scores.iter().sum();
        let mean = sum / scores.len() as f64;
        Some(Self {
            average: (mean * 100.0).round() / 100.0,
            min: scores.iter().copied().fold(f64::INFINITY, f64::min),
            max: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            count: scores.len(),
        })
    }
}
