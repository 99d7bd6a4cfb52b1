//! Benchmark task records.

use serde::{Deserialize, Serialize};

/// Research area a task belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskCategory {
    #[serde(rename = "Trustworthy AI")]
    TrustworthyAi,
    #[serde(rename = "LLM/VLM")]
    LlmVlm,
    #[serde(rename = "ML Theory")]
    MlTheory,
    #[serde(rename = "AI for Science")]
    AiForScience,
    #[serde(rename = "Multimodal")]
    Multimodal,
    #[serde(rename = "Reinforcement Learning")]
    ReinforcementLearning,
    #[serde(rename = "Computer Vision")]
    ComputerVision,
    #[serde(rename = "NLP")]
    Nlp,
    #[serde(rename = "Other")]
    Other,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 9] = [
        TaskCategory::TrustworthyAi,
        TaskCategory::LlmVlm,
        TaskCategory::MlTheory,
        TaskCategory::AiForScience,
        TaskCategory::Multimodal,
        TaskCategory::ReinforcementLearning,
        TaskCategory::ComputerVision,
        TaskCategory::Nlp,
        TaskCategory::Other,
    ];

    /// Display label, identical to the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            TaskCategory::TrustworthyAi => "Trustworthy AI",
            TaskCategory::LlmVlm => "LLM/VLM",
            TaskCategory::MlTheory => "ML Theory",
            TaskCategory::AiForScience => "AI for Science",
            TaskCategory::Multimodal => "Multimodal",
            TaskCategory::ReinforcementLearning => "Reinforcement Learning",
            TaskCategory::ComputerVision => "Computer Vision",
            TaskCategory::Nlp => "NLP",
            TaskCategory::Other => "Other",
        }
    }

    /// Parse a label, ignoring ASCII case.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A research task from the benchmark catalog. Read-only once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique identifier, e.g. `iclr2025_bi_align`.
    pub task_id: String,

    pub title: String,

    pub category: TaskCategory,

    /// Full task description (workshop call text).
    pub description: String,

    #[serde(default)]
    pub workshop_name: Option<String>,

    #[serde(default)]
    pub conference: Option<String>,

    #[serde(default)]
    pub year: Option<i32>,

    #[serde(default)]
    pub topics: Vec<String>,
}

impl Task {
    /// Create a task with no venue metadata.
    pub fn new(
        task_id: impl Into<String>,
        title: impl Into<String>,
        category: TaskCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            title: title.into(),
            category,
            description: description.into(),
            workshop_name: None,
            conference: None,
            year: None,
            topics: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serializes_as_label() {
        let json = serde_json::to_string(&TaskCategory::LlmVlm).expect("serialize");
        assert_eq!(json, "\"LLM/VLM\"");
    }

    #[test]
    fn test_category_from_label_is_case_insensitive() {
        assert_eq!(
            TaskCategory::from_label("trustworthy ai"),
            Some(TaskCategory::TrustworthyAi)
        );
        assert_eq!(TaskCategory::from_label("nlp"), Some(TaskCategory::Nlp));
        assert_eq!(TaskCategory::from_label("astrology"), None);
    }

    #[test]
    fn test_task_deserializes_without_optional_fields() {
        let json = r#"{
            "task_id": "t1",
            "title": "Bidirectional Human-AI Alignment",
            "category": "Trustworthy AI",
            "description": "Study alignment in both directions."
        }"#;
        let task: Task = serde_json::from_str(json).expect("deserialize");
        assert_eq!(task.task_id, "t1");
        assert_eq!(task.category, TaskCategory::TrustworthyAi);
        assert!(task.conference.is_none());
        assert!(task.topics.is_empty());
    }
}
