//! Paper writing: all upstream artifacts -> [`ResearchPaper`].

use async_trait::async_trait;
use mlr_core::text::non_empty_or;
use mlr_core::{
    ExperimentResult, HeaderStyle, Joiner, LiteratureReview, ResearchIdea, ResearchPaper,
    ResearchProposal, SectionSchema, SectionSpec, Task,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::proposal::PROSE_HEADER_MAX;
use super::{carry_over, StageContext, StageResult, StageUnit};
use crate::prompts;
use crate::stage::StageKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperInput {
    pub task: Task,
    pub idea: ResearchIdea,
    pub literature: LiteratureReview,
    pub proposal: ResearchProposal,
    pub experiment: ExperimentResult,
}

#[derive(Debug, Clone)]
pub struct PaperWriter {
    ctx: StageContext,
}

fn schema() -> SectionSchema {
    SectionSchema::new(
        HeaderStyle::Prose {
            max_len: PROSE_HEADER_MAX,
        },
        Joiner::Newline,
        vec![
            SectionSpec::new("abstract", &["abstract"]),
            SectionSpec::new("introduction", &["introduction"]),
            SectionSpec::new("related_work", &["related work"]),
            SectionSpec::new("methodology", &["methodology"]),
            SectionSpec::new("experiments", &["experiments"]),
            SectionSpec::new("results", &["results"]),
            SectionSpec::new("discussion", &["discussion"]),
            SectionSpec::new("conclusion", &["conclusion"]),
            SectionSpec::new("references", &["references"]),
        ],
    )
}

impl PaperWriter {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }

    /// Build the paper; the first four sections fall back to the proposal.
    pub fn parse(&self, raw: &str, input: &PaperInput) -> ResearchPaper {
        let s = self.ctx.parser().parse(raw, &schema());
        let proposal = &input.proposal;

        ResearchPaper {
            task_id: input.task.task_id.clone(),
            title: non_empty_or(Some(input.idea.title.as_str()), &input.task.title),
            abstract_text: carry_over(s.get("abstract"), &proposal.abstract_text, "Abstract"),
            introduction: carry_over(
                s.get("introduction"),
                &proposal.introduction,
                "Introduction section",
            ),
            related_work: carry_over(
                s.get("related_work"),
                &proposal.related_work,
                "Related work section",
            ),
            methodology: carry_over(
                s.get("methodology"),
                &proposal.methodology,
                "Methodology section",
            ),
            experiments: non_empty_or(s.get("experiments"), "Experiments section"),
            results: non_empty_or(s.get("results"), "Results section"),
            discussion: non_empty_or(s.get("discussion"), "Discussion section"),
            conclusion: non_empty_or(s.get("conclusion"), "Conclusion section"),
            references: non_empty_or(s.get("references"), "References section"),
            model_name: self.ctx.model_name().to_string(),
        }
    }
}

#[async_trait]
impl StageUnit for PaperWriter {
    type Input = PaperInput;
    type Output = ResearchPaper;

    fn kind(&self) -> StageKind {
        StageKind::Paper
    }

    async fn run(&self, input: &PaperInput) -> StageResult<ResearchPaper> {
        info!(idea = %input.idea.title, "writing paper");
        let raw = self
            .ctx
            .generate(
                prompts::PAPER_INSTRUCTION,
                prompts::paper_writing(&input.task, &input.proposal, &input.experiment),
                &format!("paper_{}", input.task.task_id),
            )
            .await?;
        let paper = self.parse(&raw, input);
        info!(title = %paper.title, "completed paper");
        Ok(paper)
    }
}
