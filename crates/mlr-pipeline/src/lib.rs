//! MLR-Bench research pipeline.
//!
//! Runs the five generation stages for a task and scores the result with a
//! panel of judges.
//!
//! # Modules
//!
//! - [`stage`]: the six pipeline states
//! - [`prompts`]: prompt templates and agent instructions
//! - [`units`]: one stage unit per generation step, plus [`units::Traced`]
//! - [`judge`]: idea/paper evaluators and score aggregation
//! - [`pipeline`]: the orchestrator tying stages, persistence and events together

pub mod judge;
pub mod pipeline;
pub mod prompts;
pub mod stage;
pub mod units;

pub use judge::{aggregate, IdeaEvaluator, JudgeError, MlrJudge, PaperEvaluator, UNJUDGED_SCORE};
pub use pipeline::{PipelineArtifacts, PipelineError, ResearchPipeline};
pub use stage::StageKind;
pub use units::{
    ExperimentInput, Experimenter, IdeaGenerator, IdeaInput, LiteratureInput, LiteratureReviewer,
    PaperInput, PaperWriter, ProposalInput, ProposalWriter, StageContext, StageError, StageResult,
    StageUnit, Traced,
};
