//! Literature review: idea -> [`LiteratureReview`].

use async_trait::async_trait;
use mlr_core::text::{non_empty_or, prefix_or};
use mlr_core::{
    HeaderStyle, Joiner, LiteratureReview, ResearchIdea, SectionSchema, SectionSpec, Task,
};
use serde::Serialize;
use tracing::info;

use super::{StageContext, StageResult, StageUnit};
use crate::prompts;
use crate::stage::StageKind;

#[derive(Debug, Clone, Serialize)]
pub struct LiteratureInput {
    pub task: Task,
    pub idea: ResearchIdea,
}

#[derive(Debug, Clone)]
pub struct LiteratureReviewer {
    ctx: StageContext,
}

fn schema() -> SectionSchema {
    SectionSchema::new(
        HeaderStyle::Labeled,
        Joiner::Space,
        vec![
            SectionSpec::new("key_findings", &["key findings:", "findings:"]),
            SectionSpec::new("research_gap", &["research gap:", "gap:"]),
            SectionSpec::new("related_work", &["related work:", "summary:"]),
        ],
    )
}

impl LiteratureReviewer {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }

    pub fn parse(&self, raw: &str, input: &LiteratureInput) -> LiteratureReview {
        let sections = self.ctx.parser().parse(raw, &schema());
        let or_prefix = |key: &str, default: &str| match sections.get(key) {
            Some(value) => value.to_string(),
            None => prefix_or(raw, 300, default),
        };

        LiteratureReview {
            task_id: input.task.task_id.clone(),
            idea_title: input.idea.title.clone(),
            papers: Vec::new(),
            key_findings: or_prefix("key_findings", "Key findings from related work"),
            research_gap: non_empty_or(
                sections.get("research_gap"),
                "Identified research gap in the literature",
            ),
            related_work_summary: or_prefix("related_work", "Summary of related work"),
            model_name: self.ctx.model_name().to_string(),
        }
    }
}

#[async_trait]
impl StageUnit for LiteratureReviewer {
    type Input = LiteratureInput;
    type Output = LiteratureReview;

    fn kind(&self) -> StageKind {
        StageKind::Literature
    }

    async fn run(&self, input: &LiteratureInput) -> StageResult<LiteratureReview> {
        info!(idea = %input.idea.title, "reviewing literature");
        let raw = self
            .ctx
            .generate(
                prompts::LITERATURE_INSTRUCTION,
                prompts::literature_review(&input.idea),
                &format!("literature_{}", input.task.task_id),
            )
            .await?;
        Ok(self.parse(&raw, input))
    }
}
