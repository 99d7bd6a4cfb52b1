//! Execution tracing middleware.
//!
//! [`ExecutionTracer::trace`] wraps any async unit of work and emits, in
//! order: `started`, `input`, then either `output` + `completed` or `error`.
//! The wrapped future's result is handed back untouched, errors included.

use std::future::Future;

use serde::Serialize;
use serde_json::json;

use crate::domain::EventType;
use crate::events::EventEmitter;
use crate::text::{short_type_name, truncate_chars, PREVIEW_CHARS};

/// Failure classification carried in `error` event payloads.
pub trait ErrorKind {
    /// Short snake_case tag naming the failure class.
    fn kind(&self) -> &'static str;
}

impl ErrorKind for crate::domain::BenchError {
    fn kind(&self) -> &'static str {
        crate::domain::BenchError::kind(self)
    }
}

impl ErrorKind for anyhow::Error {
    fn kind(&self) -> &'static str {
        "error"
    }
}

/// Emits lifecycle events for one agent working on one stage.
#[derive(Debug, Clone)]
pub struct ExecutionTracer {
    emitter: EventEmitter,
    agent_name: String,
    stage: String,
}

impl ExecutionTracer {
    pub fn new(emitter: EventEmitter, agent_name: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            emitter,
            agent_name: agent_name.into(),
            stage: stage.into(),
        }
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Run `work`, emitting lifecycle events around it.
    ///
    /// `input` is only used for the `input` event preview.
    pub async fn trace<I, T, E, Fut>(&self, input: &I, work: Fut) -> Result<T, E>
    where
        I: Serialize + ?Sized,
        T: Serialize,
        E: std::fmt::Display + ErrorKind,
        Fut: Future<Output = Result<T, E>>,
    {
        self.emit(EventType::Started, json!({}));
        self.emit(EventType::Input, json!({ "args": preview(input) }));

        match work.await {
            Ok(value) => {
                self.emit(
                    EventType::Output,
                    json!({
                        "type": short_type_name::<T>(),
                        "preview": preview(&value),
                    }),
                );
                self.emit(EventType::Completed, json!({}));
                Ok(value)
            }
            Err(err) => {
                self.emit(
                    EventType::Error,
                    json!({
                        "error": err.to_string(),
                        "type": err.kind(),
                    }),
                );
                Err(err)
            }
        }
    }

    fn emit(&self, event_type: EventType, data: serde_json::Value) {
        self.emitter
            .emit_with(&self.agent_name, &self.stage, event_type, data);
    }
}

/// Bounded JSON rendering of `value` for event payloads.
fn preview<V: Serialize + ?Sized>(value: &V) -> String {
    let rendered = serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {e}>"));
    truncate_chars(&rendered, PREVIEW_CHARS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("generation backend exploded")
        }
    }

    impl ErrorKind for Boom {
        fn kind(&self) -> &'static str {
            "boom"
        }
    }

    fn types(emitter: &EventEmitter) -> Vec<EventType> {
        emitter
            .get_events(None)
            .iter()
            .map(|e| e.event_type)
            .collect()
    }

    #[tokio::test]
    async fn test_success_emits_four_events_in_order() {
        let emitter = EventEmitter::new();
        let tracer = ExecutionTracer::new(emitter.clone(), "IdeaGenerator", "idea");

        let result: Result<String, Boom> =
            tracer.trace("task t1", async { Ok("idea".to_string()) }).await;

        assert_eq!(result, Ok("idea".to_string()));
        assert_eq!(
            types(&emitter),
            vec![
                EventType::Started,
                EventType::Input,
                EventType::Output,
                EventType::Completed
            ]
        );

        let events = emitter.get_events(None);
        assert!(events.iter().all(|e| e.agent_name == "IdeaGenerator" && e.stage == "idea"));
        assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(events[0].data, json!({}));
        assert_eq!(events[1].data["args"], "\"task t1\"");
        assert_eq!(events[2].data["type"], "String");
        assert_eq!(events[2].data["preview"], "\"idea\"");
    }

    #[tokio::test]
    async fn test_failure_emits_error_and_returns_original() {
        let emitter = EventEmitter::new();
        let tracer = ExecutionTracer::new(emitter.clone(), "PaperWriter", "paper");

        let result: Result<u32, Boom> = tracer.trace(&42u32, async { Err(Boom) }).await;

        assert_eq!(result, Err(Boom));
        assert_eq!(
            types(&emitter),
            vec![EventType::Started, EventType::Input, EventType::Error]
        );
        let error = &emitter.get_events(None)[2];
        assert_eq!(error.data["error"], "generation backend exploded");
        assert_eq!(error.data["type"], "boom");
    }

    #[tokio::test]
    async fn test_previews_are_bounded() {
        let emitter = EventEmitter::new();
        let tracer = ExecutionTracer::new(emitter.clone(), "Experimenter", "experiment");
        let long_input = "x".repeat(1_000);

        let _: Result<String, Boom> = tracer
            .trace(&long_input, async { Ok("y".repeat(1_000)) })
            .await;

        let events = emitter.get_events(None);
        let args = events[1].data["args"].as_str().expect("args");
        let output = events[2].data["preview"].as_str().expect("preview");
        assert_eq!(args.chars().count(), PREVIEW_CHARS);
        assert_eq!(output.chars().count(), PREVIEW_CHARS);
    }
}
