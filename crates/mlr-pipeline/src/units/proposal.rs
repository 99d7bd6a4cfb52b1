//! Proposal writing: idea + review -> [`ResearchProposal`].

use async_trait::async_trait;
use mlr_core::text::{non_empty_or, prefix_or};
use mlr_core::{
    HeaderStyle, Joiner, LiteratureReview, ResearchIdea, ResearchProposal, SectionSchema,
    SectionSpec, Task,
};
use serde::Serialize;
use tracing::info;

use super::{StageContext, StageResult, StageUnit};
use crate::prompts;
use crate::stage::StageKind;

/// Header lines longer than this are treated as body text.
pub(crate) const PROSE_HEADER_MAX: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct ProposalInput {
    pub task: Task,
    pub idea: ResearchIdea,
    pub literature: LiteratureReview,
}

#[derive(Debug, Clone)]
pub struct ProposalWriter {
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
            SectionSpec::new("expected_results", &["expected results"]),
            SectionSpec::new("experimental_plan", &["experimental plan"]),
        ],
    )
}

impl ProposalWriter {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }

    pub fn parse(&self, raw: &str, input: &ProposalInput) -> ResearchProposal {
        let s = self.ctx.parser().parse(raw, &schema());

        ResearchProposal {
            task_id: input.task.task_id.clone(),
            title: input.idea.title.clone(),
            abstract_text: match s.get("abstract") {
                Some(text) => text.to_string(),
                None => prefix_or(raw, 200, "Proposal abstract"),
            },
            introduction: non_empty_or(s.get("introduction"), "Introduction section"),
            related_work: non_empty_or(s.get("related_work"), "Related work section"),
            methodology: super::carry_over(
                s.get("methodology"),
                input.idea.methodology.as_deref().unwrap_or_default(),
                "Proposed methodology",
            ),
            expected_results: non_empty_or(s.get("expected_results"), "Expected results"),
            experimental_plan: non_empty_or(s.get("experimental_plan"), "Experimental plan"),
            model_name: self.ctx.model_name().to_string(),
        }
    }
}

#[async_trait]
impl StageUnit for ProposalWriter {
    type Input = ProposalInput;
    type Output = ResearchProposal;

    fn kind(&self) -> StageKind {
        StageKind::Proposal
    }

    async fn run(&self, input: &ProposalInput) -> StageResult<ResearchProposal> {
        info!(idea = %input.idea.title, "writing proposal");
        let raw = self
            .ctx
            .generate(
                prompts::PROPOSAL_INSTRUCTION,
                prompts::proposal_writing(&input.task, &input.idea, &input.literature),
                &format!("proposal_{}", input.task.task_id),
            )
            .await?;
        let proposal = self.parse(&raw, input);
        info!(title = %proposal.title, "completed proposal");
        Ok(proposal)
    }
}
