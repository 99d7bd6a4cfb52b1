//! In-memory fakes for the generation and persistence seams (testing only).
//!
//! Provides `ScriptedGeneration`, `FlakyGeneration`, `MemoryArtifactStore`
//! and `FailingArtifactStore`, which satisfy the trait contracts without
//! network or filesystem access.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::domain::{BenchError, Result};
use crate::generation::{GenerationError, GenerationRequest, GenerationService, TextStream};
use crate::persistence::ArtifactStore;

type Responder = Box<dyn Fn(&GenerationRequest) -> String + Send + Sync>;

// ---------------------------------------------------------------------------
// ScriptedGeneration
// ---------------------------------------------------------------------------

/// Generation service answering from a script, delivered in small chunks.
///
/// Every request is recorded and can be inspected with
/// [`ScriptedGeneration::requests`].
pub struct ScriptedGeneration {
    model: String,
    responder: Responder,
    chunk_chars: usize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGeneration {
    /// Answer every request with `f(request)`.
    pub fn with_responder<F>(model: impl Into<String>, f: F) -> Self
    where
        F: Fn(&GenerationRequest) -> String + Send + Sync + 'static,
    {
        Self {
            model: model.into(),
            responder: Box::new(f),
            chunk_chars: 16,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with empty text.
    pub fn empty(model: impl Into<String>) -> Self {
        Self::with_responder(model, |_| String::new())
    }

    /// Answer requests with `responses` in order, then with empty text.
    pub fn with_responses(model: impl Into<String>, responses: Vec<String>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::with_responder(model, move |_| {
            queue.lock().unwrap().pop_front().unwrap_or_default()
        })
    }

    /// Characters per delivered chunk (minimum 1).
    pub fn chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn split_chunks(text: &str, chunk_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_chars)
        .map(|c| c.iter().collect())
        .collect()
}

#[async_trait]
impl GenerationService for ScriptedGeneration {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn stream(&self, request: GenerationRequest) -> std::result::Result<TextStream, GenerationError> {
        let text = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        let chunks = split_chunks(&text, self.chunk_chars);
        Ok(stream::iter(chunks.into_iter().map(Ok)).boxed())
    }
}

// ---------------------------------------------------------------------------
// FlakyGeneration
// ---------------------------------------------------------------------------

/// Fails the first `failures` calls with a transient 503, then delegates.
pub struct FlakyGeneration<G> {
    inner: G,
    remaining_failures: AtomicU32,
    calls: AtomicU32,
    status: u16,
    body: String,
}

impl<G: GenerationService> FlakyGeneration<G> {
    pub fn overloaded(inner: G, failures: u32) -> Self {
        Self {
            inner,
            remaining_failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
            status: 503,
            body: r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#
                .to_string(),
        }
    }

    /// Fails the first `failures` calls with a non-transient 400.
    pub fn rejecting(inner: G, failures: u32) -> Self {
        Self {
            status: 400,
            body: r#"{"error":{"code":400,"status":"INVALID_ARGUMENT"}}"#.to_string(),
            ..Self::overloaded(inner, failures)
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<G: GenerationService> GenerationService for FlakyGeneration<G> {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn stream(&self, request: GenerationRequest) -> std::result::Result<TextStream, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let should_fail = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(GenerationError::Upstream {
                status: self.status,
                body: self.body.clone(),
            });
        }
        self.inner.stream(request).await
    }
}

// ---------------------------------------------------------------------------
// MemoryArtifactStore
// ---------------------------------------------------------------------------

/// Artifact store keeping every write in a `BTreeMap<path, contents>`.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents written to `path`, if any.
    pub fn get(&self, path: &Path) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    /// Every written path, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn save_json(&self, value: &serde_json::Value, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(value)?;
        self.files.lock().unwrap().insert(path.to_path_buf(), content);
        Ok(())
    }

    async fn save_text(&self, text: &str, path: &Path) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), text.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FailingArtifactStore
// ---------------------------------------------------------------------------

/// Memory store that refuses writes to files named `fail_on`.
#[derive(Debug)]
pub struct FailingArtifactStore {
    inner: MemoryArtifactStore,
    fail_on: String,
}

impl FailingArtifactStore {
    pub fn new(fail_on: impl Into<String>) -> Self {
        Self {
            inner: MemoryArtifactStore::new(),
            fail_on: fail_on.into(),
        }
    }

    pub fn written(&self) -> Vec<PathBuf> {
        self.inner.paths()
    }

    fn check(&self, path: &Path) -> Result<()> {
        if path.file_name().is_some_and(|n| n == self.fail_on.as_str()) {
            return Err(BenchError::Persistence {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for FailingArtifactStore {
    async fn save_json(&self, value: &serde_json::Value, path: &Path) -> Result<()> {
        self.check(path)?;
        self.inner.save_json(value, path).await
    }

    async fn save_text(&self, text: &str, path: &Path) -> Result<()> {
        self.check(path)?;
        self.inner.save_text(text, path).await
    }
}
