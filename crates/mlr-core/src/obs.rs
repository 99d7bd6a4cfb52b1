//! Structured observability hooks for pipeline lifecycle events.
//!
//! This module provides:
//! - Task-scoped tracing spans via [`task_span`]
//! - Emission functions for pipeline start/finish, stage outcomes, retries,
//!   evaluation scores and sink delivery problems
//!
//! These go to the `tracing` subscriber only. The agent event stream that
//! feeds the visualization sink lives in [`crate::events`].

use tracing::{debug, info, warn};

/// Task-scoped tracing span. Attach it to a run's future with
/// `tracing::Instrument` so every event inside is tagged with the task id.
///
/// ```ignore
/// pipeline.run_stages(&task).instrument(task_span(&task.task_id)).await
/// ```
pub fn task_span(task_id: &str) -> tracing::Span {
    tracing::info_span!("mlr.task", task_id = %task_id)
}

/// Emit event: pipeline started for a task.
pub fn emit_pipeline_started(task_id: &str, title: &str) {
    info!(event = "pipeline.started", task_id = %task_id, title = %title);
}

/// Emit event: pipeline finished with duration and outcome.
pub fn emit_pipeline_finished(task_id: &str, duration_ms: u64, success: bool) {
    info!(
        event = "pipeline.finished",
        task_id = %task_id,
        duration_ms = duration_ms,
        success = success,
    );
}

/// Emit event: a stage produced and persisted its artifact.
pub fn emit_stage_completed(task_id: &str, stage: &str, duration_ms: u64) {
    info!(
        event = "stage.completed",
        task_id = %task_id,
        stage = %stage,
        duration_ms = duration_ms,
    );
}

/// Emit event: a stage failed (warning level).
pub fn emit_stage_failed(task_id: &str, stage: &str, error: &dyn std::fmt::Display) {
    warn!(event = "stage.failed", task_id = %task_id, stage = %stage, error = %error);
}

/// Emit event: a transient failure will be retried after `delay_ms`.
pub fn emit_retry_scheduled(attempt: u32, max_retries: u32, delay_ms: u64) {
    warn!(
        event = "retry.scheduled",
        attempt = attempt,
        max_retries = max_retries,
        delay_ms = delay_ms,
    );
}

/// Emit event: combined evaluation scores for a task.
pub fn emit_evaluation_scored(task_id: &str, idea_score: f64, paper_score: f64, average: f64) {
    info!(
        event = "evaluation.scored",
        task_id = %task_id,
        idea_score = idea_score,
        paper_score = paper_score,
        average = average,
    );
}

/// Emit event: the visualization sink could not be reached (debug level).
pub fn emit_sink_unreachable(error: &dyn std::fmt::Display) {
    debug!(event = "sink.unreachable", error = %error);
}
