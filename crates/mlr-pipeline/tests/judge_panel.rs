//! Integration tests for the multi-judge evaluation panel.

use mlr_core::fakes::ScriptedGeneration;
use mlr_core::{ResearchIdea, ResearchPaper, Task, TaskCategory};
use mlr_pipeline::{JudgeError, MlrJudge, StageContext, UNJUDGED_SCORE};
use std::sync::Arc;

fn task() -> Task {
    Task::new("t1", "Reliable Agents", TaskCategory::LlmVlm, "Make agents reliable.")
}

fn idea() -> ResearchIdea {
    serde_json::from_value(serde_json::json!({
        "task_id": "t1",
        "title": "Self-checking agents",
        "motivation": "Agents hallucinate tool calls.",
        "main_idea": "Verify every call before running it.",
        "methodology": null,
        "expected_outcomes": null,
        "model_name": "writer"
    }))
    .expect("idea fixture")
}

fn paper() -> ResearchPaper {
    serde_json::from_value(serde_json::json!({
        "task_id": "t1", "title": "Self-checking agents", "abstract": "A",
        "introduction": "I", "related_work": "R", "methodology": "M",
        "experiments": "E", "results": "Res", "discussion": "D",
        "conclusion": "C", "references": "Refs", "model_name": "writer"
    }))
    .expect("paper fixture")
}

fn judge_with(responses: &[&'static str]) -> MlrJudge {
    let contexts = responses
        .iter()
        .enumerate()
        .map(|(i, response)| {
            let response = *response;
            StageContext::new(Arc::new(ScriptedGeneration::with_responder(
                format!("judge-model-{i}"),
                move |_| response.to_string(),
            )))
        })
        .collect();
    MlrJudge::new(contexts)
}

/// Test: idea verdicts from every judge are averaged
#[tokio::test]
async fn test_idea_panel_averages_judges() {
    let judge = judge_with(&[
        "Consistency: 8\nNovelty: 6\nOverall: 7",
        "Consistency: 6\nFeasibility: 9\nOverall: 9",
    ]);

    let aggregated = judge.evaluate_idea(&idea(), &task()).await.expect("idea panel");

    assert_eq!(aggregated.stage, "idea");
    assert_eq!(aggregated.task_id, "t1");
    assert_eq!(aggregated.average_score, 8.0);
    assert_eq!(aggregated.evaluations.len(), 2);
    assert_eq!(aggregated.evaluations[0].evaluator_name, "judge_1");
    assert_eq!(aggregated.evaluations[1].evaluator_name, "judge_2");

    assert_eq!(aggregated.score_breakdown.get("consistency"), Some(&7.0));
    assert_eq!(aggregated.score_breakdown.get("novelty"), Some(&6.0));
    assert_eq!(aggregated.score_breakdown.get("feasibility"), Some(&9.0));
    assert!(!aggregated.score_breakdown.contains_key("soundness"));
}

/// Test: paper judges never report consistency
#[tokio::test]
async fn test_paper_panel_reports_paper_rubrics_only() {
    let judge = judge_with(&["Consistency: 10\nSoundness: 4\nClarity: 8", "Soundness: 6"]);

    let aggregated = judge
        .evaluate_paper(&paper(), &task(), &["experiment.py".to_string()])
        .await
        .expect("paper panel");

    assert_eq!(aggregated.stage, "paper");
    // judge_1 falls back to the mean of soundness and clarity.
    assert_eq!(aggregated.evaluations[0].overall_score, 6.0);
    assert_eq!(aggregated.evaluations[1].overall_score, 6.0);
    assert_eq!(aggregated.average_score, 6.0);
    assert_eq!(aggregated.score_breakdown.get("soundness"), Some(&5.0));
    assert_eq!(aggregated.score_breakdown.get("clarity"), Some(&8.0));
    assert!(!aggregated.score_breakdown.contains_key("consistency"));
}

/// Test: breakdown keys are exactly the rubrics some judge reported
#[tokio::test]
async fn test_breakdown_covers_reported_rubrics() {
    let judge = judge_with(&["Novelty: 5", "Significance: 7", "nothing useful here"]);

    let aggregated = judge.evaluate_idea(&idea(), &task()).await.expect("idea panel");

    let keys: Vec<&str> = aggregated.score_breakdown.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["novelty", "significance"]);
    for (rubric, mean) in &aggregated.score_breakdown {
        assert!((0.0..=10.0).contains(mean), "{rubric} out of range");
    }
    // 5.0, 7.0 and the 5.0 default.
    assert!((aggregated.average_score - 17.0 / 3.0).abs() < 1e-9);
}

/// Test: combined scoring without a task uses the fixed defaults
#[tokio::test]
async fn test_combined_without_task_is_unjudged() {
    let service = Arc::new(ScriptedGeneration::with_responder("judge", |_| "Overall: 2".to_string()));
    let judge = MlrJudge::new(vec![StageContext::new(service.clone())]);

    let combined = judge
        .evaluate_combined(&idea(), &paper(), None)
        .await
        .expect("combined");

    assert_eq!(combined.idea_score, UNJUDGED_SCORE);
    assert_eq!(combined.paper_score, UNJUDGED_SCORE);
    assert_eq!(combined.average_score, 7.0);
    assert_eq!(combined.task_id, "unknown");
    assert_eq!(combined.stage, "combined");
    assert!(service.requests().is_empty(), "no judge should be consulted");
}

/// Test: combined scoring with a task consults only the first judge
#[tokio::test]
async fn test_combined_with_task_uses_first_judge() {
    let judge = judge_with(&["Overall: 4", "Overall: 10"]);

    let combined = judge
        .evaluate_combined(&idea(), &paper(), Some(&task()))
        .await
        .expect("combined");

    assert_eq!(combined.idea_score, 4.0);
    assert_eq!(combined.paper_score, 4.0);
    assert_eq!(combined.average_score, 4.0);
    assert_eq!(combined.model_name, "judge-model-0");
    assert_eq!(combined.evaluation.evaluator_name, "judge_1");
    assert_eq!(combined.evaluation.feedback, "Combined evaluation of idea and paper");

    let json = serde_json::to_value(&combined).expect("serialize");
    assert_eq!(json["overall_score"], 4.0);
    assert_eq!(json["consistency_score"], 4.0);
}

/// Test: an empty panel cannot aggregate but can still combine
#[tokio::test]
async fn test_empty_panel() {
    let judge = MlrJudge::new(Vec::new());
    assert_eq!(judge.judge_count(), 0);

    let err = judge.evaluate_idea(&idea(), &task()).await.unwrap_err();
    assert!(matches!(err, JudgeError::EmptyEvaluations));

    let combined = judge
        .evaluate_combined(&idea(), &paper(), Some(&task()))
        .await
        .expect("combined");
    assert_eq!(combined.average_score, UNJUDGED_SCORE);
    assert_eq!(combined.model_name, "unknown");
}
