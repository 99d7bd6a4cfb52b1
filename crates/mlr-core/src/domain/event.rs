//! Agent lifecycle events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of an agent event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Started,
    Input,
    Output,
    Completed,
    Error,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Started => "started",
            EventType::Input => "input",
            EventType::Output => "output",
            EventType::Completed => "completed",
            EventType::Error => "error",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single event emitted by an agent while working on a pipeline stage.
///
/// The serialized form is also the wire payload POSTed to the
/// visualization sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentEvent {
    pub agent_name: String,

    /// Pipeline stage name (`idea`, `literature`, ..., `evaluation`).
    pub stage: String,

    pub event_type: EventType,

    /// Opaque payload; always a JSON object.
    #[serde(default = "empty_object")]
    pub data: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl AgentEvent {
    /// Create an event stamped with the current time.
    ///
    /// Non-object payloads are wrapped as `{"value": ...}`.
    pub fn new(
        agent_name: impl Into<String>,
        stage: impl Into<String>,
        event_type: EventType,
        data: serde_json::Value,
    ) -> Self {
        let data = match data {
            serde_json::Value::Object(_) => data,
            serde_json::Value::Null => empty_object(),
            other => serde_json::json!({ "value": other }),
        };
        Self {
            agent_name: agent_name.into(),
            stage: stage.into(),
            event_type,
            data,
            timestamp: Utc::now(),
        }
    }

    /// Create an event with an empty payload.
    pub fn bare(
        agent_name: impl Into<String>,
        stage: impl Into<String>,
        event_type: EventType,
    ) -> Self {
        Self::new(agent_name, stage, event_type, serde_json::Value::Null)
    }
}
