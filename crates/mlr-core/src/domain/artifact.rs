//! Stage artifacts produced by the research pipeline.
//!
//! Each artifact is created once by its stage unit, keyed by `task_id`, and
//! never mutated afterwards. `model_name` records which generation service
//! produced it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Output of the idea stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchIdea {
    pub task_id: String,
    pub title: String,
    pub motivation: String,
    pub main_idea: String,
    pub methodology: Option<String>,
    pub expected_outcomes: Option<String>,
    pub model_name: String,
}

/// A cited work in a literature review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaperReference {
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub summary: String,
    /// Why this work matters for the idea.
    pub relevance: String,
}

/// Output of the literature stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiteratureReview {
    pub task_id: String,
    pub idea_title: String,
    #[serde(default)]
    pub papers: Vec<PaperReference>,
    pub key_findings: String,
    pub research_gap: String,
    pub related_work_summary: String,
    pub model_name: String,
}

/// Output of the proposal stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchProposal {
    pub task_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub introduction: String,
    pub related_work: String,
    pub methodology: String,
    pub expected_results: String,
    pub experimental_plan: String,
    pub model_name: String,
}

/// Output of the experiment stage. Code is generated and saved, never run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentResult {
    pub task_id: String,
    /// Paths of the generated code files.
    #[serde(default)]
    pub code_files: Vec<String>,
    pub execution_log: String,
    #[serde(default)]
    pub results: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub model_name: String,
}

/// Output of the paper stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchPaper {
    pub task_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub introduction: String,
    pub related_work: String,
    pub methodology: String,
    pub experiments: String,
    pub results: String,
    pub discussion: String,
    pub conclusion: String,
    pub references: String,
    pub model_name: String,
}

impl ResearchPaper {
    /// Render the paper as a markdown document.
    pub fn to_markdown(&self) -> String {
        format!(
            "# {title}\n\n\
             ## Abstract\n{abstract_text}\n\n\
             ## 1. Introduction\n{introduction}\n\n\
             ## 2. Related Work\n{related_work}\n\n\
             ## 3. Methodology\n{methodology}\n\n\
             ## 4. Experiments\n{experiments}\n\n\
             ## 5. Results\n{results}\n\n\
             ## 6. Discussion\n{discussion}\n\n\
             ## 7. Conclusion\n{conclusion}\n\n\
             ## References\n{references}\n",
            title = self.title,
            abstract_text = self.abstract_text,
            introduction = self.introduction,
            related_work = self.related_work,
            methodology = self.methodology,
            experiments = self.experiments,
            results = self.results,
            discussion = self.discussion,
            conclusion = self.conclusion,
            references = self.references,
        )
    }

    /// All text fields of the paper, in document order.
    pub fn sections(&self) -> [(&'static str, &str); 11] {
        [
            ("title", &self.title),
            ("abstract", &self.abstract_text),
            ("introduction", &self.introduction),
            ("related_work", &self.related_work),
            ("methodology", &self.methodology),
            ("experiments", &self.experiments),
            ("results", &self.results),
            ("discussion", &self.discussion),
            ("conclusion", &self.conclusion),
            ("references", &self.references),
            ("model_name", &self.model_name),
        ]
    }
}
