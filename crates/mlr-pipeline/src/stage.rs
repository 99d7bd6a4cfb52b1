//! Pipeline stage definitions.

use serde::{Deserialize, Serialize};

/// The six sequential states of a research run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Task -> ResearchIdea
    Idea,

    /// Idea -> LiteratureReview
    Literature,

    /// Idea + review -> ResearchProposal
    Proposal,

    /// Proposal -> generated experiment code
    Experiment,

    /// Everything so far -> ResearchPaper
    Paper,

    /// Idea + paper -> combined judge verdict
    Evaluation,
}

impl StageKind {
    /// Stages in execution order.
    pub const ORDER: [StageKind; 6] = [
        StageKind::Idea,
        StageKind::Literature,
        StageKind::Proposal,
        StageKind::Experiment,
        StageKind::Paper,
        StageKind::Evaluation,
    ];

    /// Stage name as used in events and artifact file names.
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Idea => "idea",
            StageKind::Literature => "literature",
            StageKind::Proposal => "proposal",
            StageKind::Experiment => "experiment",
            StageKind::Paper => "paper",
            StageKind::Evaluation => "evaluation",
        }
    }

    /// Agent reported in lifecycle events for this stage.
    pub fn agent_name(&self) -> &'static str {
        match self {
            StageKind::Idea => "IdeaGenerator",
            StageKind::Literature => "LiteratureReviewer",
            StageKind::Proposal => "ProposalWriter",
            StageKind::Experiment => "Experimenter",
            StageKind::Paper => "PaperWriter",
            StageKind::Evaluation => "MLRJudge",
        }
    }

    /// Artifact file written after the stage, relative to the task's
    /// results directory.
    pub fn artifact_file(&self) -> String {
        format!("{}.json", self.name())
    }

    /// 1-based position in [`StageKind::ORDER`].
    pub fn position(&self) -> usize {
        Self::ORDER
            .iter()
            .position(|s| s == self)
            .map_or(0, |i| i + 1)
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
