//! MLR-Bench Core Library
//!
//! Domain model and shared machinery for the research pipeline:
//! - [`events`]: agent event log with listeners and a best-effort sink
//! - [`tracer`]: lifecycle-event middleware around async work
//! - [`retry`]: exponential backoff for overloaded generation backends
//! - [`generation`]: the text generation boundary and a Gemini client
//! - [`parsing`]: swappable free-text section extraction
//! - [`persistence`], [`workspace`], [`catalog`], [`config`]: collaborators
//!   at the edge of the pipeline

pub mod catalog;
pub mod config;
pub mod domain;
pub mod events;
pub mod fakes;
pub mod generation;
pub mod metrics;
pub mod obs;
pub mod parsing;
pub mod persistence;
pub mod retry;
pub mod telemetry;
pub mod text;
pub mod tracer;
pub mod workspace;

pub use catalog::TaskCatalog;
pub use config::BenchConfig;

pub use domain::{
    AgentEvent, AggregatedEvaluation, BenchError, CombinedEvaluation, EvaluationResult, EventType,
    ExperimentResult, LiteratureReview, PaperReference, ResearchIdea, ResearchPaper,
    ResearchProposal, Result, Rubric, ScoreSummary, Task, TaskCategory,
};

pub use events::{EventEmitter, EventSink, HttpEventSink, ListenerId};

pub use generation::{
    collect_text, generate_text, GeminiClient, GeminiSettings, GenerationError,
    GenerationRequest, GenerationService, TextStream,
};

pub use metrics::METRICS;

pub use obs::{
    emit_evaluation_scored, emit_pipeline_finished, emit_pipeline_started, emit_retry_scheduled,
    emit_sink_unreachable, emit_stage_completed, emit_stage_failed, task_span,
};

pub use parsing::{
    HeaderStyle, HeuristicSectionParser, Joiner, ParsedSections, SectionParser, SectionSchema,
    SectionSpec,
};

pub use persistence::{save_record, ArtifactStore, FsArtifactStore};

pub use retry::{is_transient_overload, retry_async, retry_async_if, retry_blocking, RetryPolicy};

pub use telemetry::{init_tracing, parse_level};

pub use tracer::{ErrorKind, ExecutionTracer};

pub use workspace::WorkspaceManager;
