//! Stage units: one generation-backed step of the research pipeline each.
//!
//! Every unit follows the same shape:
//! 1. render its prompt template
//! 2. call the generation service (through the retry wrapper when configured)
//! 3. split the response with the configured [`SectionParser`]
//! 4. fill every empty field with a deterministic fallback
//!
//! Parsing never fails; only generation and IO errors surface as
//! [`StageError`]. Wrap a unit in [`Traced`] to emit lifecycle events.

mod experiment;
mod idea;
mod literature;
mod paper;
mod proposal;

pub use experiment::{ExperimentInput, Experimenter, EXPERIMENT_FILE};
pub use idea::{IdeaGenerator, IdeaInput};
pub use literature::{LiteratureInput, LiteratureReviewer};
pub use paper::{PaperInput, PaperWriter};
pub use proposal::{ProposalInput, ProposalWriter};

use std::sync::Arc;

use async_trait::async_trait;
use mlr_core::{
    generate_text, retry_async, BenchError, EventEmitter, ExecutionTracer, GenerationError,
    GenerationRequest, GenerationService, HeuristicSectionParser, RetryPolicy, SectionParser,
};
use serde::Serialize;
use uuid::Uuid;

use crate::stage::StageKind;

/// Errors raised while running a stage.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Core(#[from] BenchError),
}

impl StageError {
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::Generation(e) => e.kind(),
            StageError::Core(e) => e.kind(),
        }
    }
}

impl mlr_core::ErrorKind for StageError {
    fn kind(&self) -> &'static str {
        StageError::kind(self)
    }
}

pub type StageResult<T> = std::result::Result<T, StageError>;

/// Collaborators shared by every stage unit.
#[derive(Clone)]
pub struct StageContext {
    generator: Arc<dyn GenerationService>,
    parser: Arc<dyn SectionParser>,
    retry: Option<RetryPolicy>,
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("model", &self.generator.model_name())
            .field("retry", &self.retry)
            .finish()
    }
}

impl StageContext {
    /// Context with the heuristic parser and no retries.
    pub fn new(generator: Arc<dyn GenerationService>) -> Self {
        Self {
            generator,
            parser: Arc::new(HeuristicSectionParser),
            retry: None,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn SectionParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    pub fn parser(&self) -> &dyn SectionParser {
        self.parser.as_ref()
    }

    /// Generate the full response text for one prompt.
    ///
    /// `session_prefix` tags the request with a fresh session id such as
    /// `proposal_<task>_<8 hex>`.
    pub async fn generate(
        &self,
        instruction: &str,
        prompt: String,
        session_prefix: &str,
    ) -> Result<String, GenerationError> {
        let session = Uuid::new_v4().simple().to_string();
        let request = GenerationRequest::new(instruction, prompt)
            .with_session(format!("{session_prefix}_{}", &session[..8]));

        let attempt = || {
            let request = request.clone();
            let generator = self.generator.as_ref();
            async move { generate_text(generator, request).await }
        };

        match &self.retry {
            Some(policy) => retry_async(policy, attempt).await,
            None => attempt().await,
        }
    }
}

/// A pipeline step turning typed inputs into one artifact.
#[async_trait]
pub trait StageUnit: Send + Sync {
    type Input: Serialize + Send + Sync;
    type Output: Serialize + Send;

    fn kind(&self) -> StageKind;

    async fn run(&self, input: &Self::Input) -> StageResult<Self::Output>;
}

/// Stage unit wrapper emitting `started`/`input`/`output`/`completed`
/// (or `error`) events around every run.
#[derive(Debug)]
pub struct Traced<S> {
    inner: S,
    tracer: ExecutionTracer,
}

impl<S: StageUnit> Traced<S> {
    pub fn new(inner: S, emitter: EventEmitter) -> Self {
        let kind = inner.kind();
        Self {
            tracer: ExecutionTracer::new(emitter, kind.agent_name(), kind.name()),
            inner,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: StageUnit> StageUnit for Traced<S> {
    type Input = S::Input;
    type Output = S::Output;

    fn kind(&self) -> StageKind {
        self.inner.kind()
    }

    async fn run(&self, input: &Self::Input) -> StageResult<Self::Output> {
        self.tracer.trace(input, self.inner.run(input)).await
    }
}

/// `parsed` when it has content, else `carried` when that has content,
/// else `default`.
pub(crate) fn carry_over(parsed: Option<&str>, carried: &str, default: &str) -> String {
    mlr_core::text::non_empty_or(
        parsed.filter(|p| !p.trim().is_empty()).or(Some(carried)),
        default,
    )
}
