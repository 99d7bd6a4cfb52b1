//! Domain models for MLR-Bench.
//!
//! - [`task`]: benchmark tasks and their categories
//! - [`artifact`]: the typed output of each pipeline stage
//! - [`evaluation`]: judge verdicts and aggregated scores
//! - [`event`]: agent lifecycle events
//! - [`error`]: core error taxonomy

pub mod artifact;
pub mod error;
pub mod evaluation;
pub mod event;
pub mod task;

pub use artifact::{
    ExperimentResult, LiteratureReview, PaperReference, ResearchIdea, ResearchPaper,
    ResearchProposal,
};
pub use error::{BenchError, Result};
pub use evaluation::{
    is_valid_score, AggregatedEvaluation, CombinedEvaluation, EvaluationResult, Rubric,
    ScoreSummary, MAX_SCORE,
};
pub use event::{AgentEvent, EventType};
pub use task::{Task, TaskCategory};
