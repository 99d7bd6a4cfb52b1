//! Idea generation: task -> [`ResearchIdea`].

use async_trait::async_trait;
use mlr_core::text::{non_empty_or, prefix_or};
use mlr_core::{HeaderStyle, Joiner, ResearchIdea, SectionSchema, SectionSpec, Task};
use serde::Serialize;
use tracing::info;

use super::{StageContext, StageResult, StageUnit};
use crate::prompts;
use crate::stage::StageKind;

#[derive(Debug, Clone, Serialize)]
pub struct IdeaInput {
    pub task: Task,
}

#[derive(Debug, Clone)]
pub struct IdeaGenerator {
    ctx: StageContext,
}

fn schema() -> SectionSchema {
    SectionSchema::new(
        HeaderStyle::Labeled,
        Joiner::Space,
        vec![
            SectionSpec::new("title", &["title:"]).ordinal("1.").capture_inline(),
            SectionSpec::new("motivation", &["motivation:"]).ordinal("2."),
            SectionSpec::new("main_idea", &["main idea:"]).ordinal("3."),
            SectionSpec::new("methodology", &["methodology:"]).ordinal("4."),
            SectionSpec::new("expected_outcomes", &["expected outcomes:"]).ordinal("5."),
        ],
    )
}

impl IdeaGenerator {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }

    /// Build the idea from a raw response. Never fails.
    pub fn parse(&self, raw: &str, task: &Task) -> ResearchIdea {
        let sections = self.ctx.parser().parse(raw, &schema());
        let optional = |key: &str| sections.get(key).map(str::to_string);

        ResearchIdea {
            task_id: task.task_id.clone(),
            title: non_empty_or(
                sections.get("title"),
                &format!("Research Idea for {}", task.title),
            ),
            motivation: non_empty_or(sections.get("motivation"), "Generated motivation"),
            main_idea: match sections.get("main_idea") {
                Some(main_idea) => main_idea.to_string(),
                None => prefix_or(raw, 500, "Generated main idea"),
            },
            methodology: optional("methodology"),
            expected_outcomes: optional("expected_outcomes"),
            model_name: self.ctx.model_name().to_string(),
        }
    }
}

#[async_trait]
impl StageUnit for IdeaGenerator {
    type Input = IdeaInput;
    type Output = ResearchIdea;

    fn kind(&self) -> StageKind {
        StageKind::Idea
    }

    async fn run(&self, input: &IdeaInput) -> StageResult<ResearchIdea> {
        info!(task_id = %input.task.task_id, "generating idea");
        let raw = self
            .ctx
            .generate(
                prompts::IDEA_INSTRUCTION,
                prompts::idea_generation(&input.task),
                &format!("idea_{}", input.task.task_id),
            )
            .await?;
        let idea = self.parse(&raw, &input.task);
        info!(title = %idea.title, "generated idea");
        Ok(idea)
    }
}
