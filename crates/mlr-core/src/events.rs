//! Agent event stream: append-only log, in-process listeners and a
//! best-effort out-of-process sink.
//!
//! [`EventEmitter`] is a cheap-to-clone handle. Construct one at process
//! start and hand clones to every component that emits; all clones share
//! the same log and listener set.
//!
//! Emission never fails and never waits on I/O:
//! - listener errors are logged and counted, then dispatch continues
//! - sink delivery runs on a spawned task bounded by [`SINK_TIMEOUT`], and
//!   its outcome is discarded

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::{AgentEvent, EventType};
use crate::metrics::METRICS;

/// Upper bound on a single sink delivery attempt.
pub const SINK_TIMEOUT: Duration = Duration::from_millis(500);

/// Default address of the visualization server's ingest endpoint.
pub const DEFAULT_SINK_URL: &str = "http://localhost:5000/api/event";

/// Callback invoked synchronously for every emitted event.
pub type Listener = Arc<dyn Fn(&AgentEvent) -> anyhow::Result<()> + Send + Sync>;

/// Handle returned by [`EventEmitter::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Out-of-process event destination.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: &AgentEvent) -> anyhow::Result<()>;
}

/// Sink that POSTs each event as JSON to the visualization server.
pub struct HttpEventSink {
    client: reqwest::Client,
    url: String,
}

impl HttpEventSink {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(SINK_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn deliver(&self, event: &AgentEvent) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

struct EmitterInner {
    log: Mutex<Vec<AgentEvent>>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
    sink: Option<Arc<dyn EventSink>>,
}

/// Shared, append-only agent event log with pub/sub fan-out.
#[derive(Clone)]
pub struct EventEmitter {
    inner: Arc<EmitterInner>,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("events", &self.len())
            .field("listeners", &lock(&self.inner.listeners).len())
            .field("has_sink", &self.inner.sink.is_some())
            .finish()
    }
}

/// Lock ignoring poisoning; a panicking listener must not wedge the log.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl EventEmitter {
    /// Emitter with no out-of-process sink.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Emitter that also forwards every event to `sink`.
    pub fn with_sink(sink: Arc<dyn EventSink>) -> Self {
        Self::build(Some(sink))
    }

    fn build(sink: Option<Arc<dyn EventSink>>) -> Self {
        Self {
            inner: Arc::new(EmitterInner {
                log: Mutex::new(Vec::new()),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
                sink,
            }),
        }
    }

    /// Append `event`, notify listeners in subscription order, then hand
    /// the event to the sink.
    pub fn emit(&self, mut event: AgentEvent) {
        {
            let mut log = lock(&self.inner.log);
            // Keep log timestamps monotonic under wall-clock adjustments.
            if let Some(last) = log.last() {
                if event.timestamp < last.timestamp {
                    event.timestamp = last.timestamp;
                }
            }
            log.push(event.clone());
        }
        METRICS.inc_events_emitted();
        debug!(
            agent = %event.agent_name,
            stage = %event.stage,
            event_type = %event.event_type,
            "agent event"
        );

        let listeners: Vec<(ListenerId, Listener)> = lock(&self.inner.listeners).clone();
        for (id, listener) in listeners {
            if let Err(e) = listener(&event) {
                METRICS.inc_listener_failures();
                warn!(listener = id.0, error = %e, "event listener failed");
            }
        }

        self.forward_to_sink(event);
    }

    /// Build and emit an event in one call.
    pub fn emit_with(
        &self,
        agent_name: &str,
        stage: &str,
        event_type: EventType,
        data: serde_json::Value,
    ) {
        self.emit(AgentEvent::new(agent_name, stage, event_type, data));
    }

    /// Fire-and-forget delivery. Without a Tokio runtime there is nowhere
    /// to run the request, so the event is simply not forwarded.
    fn forward_to_sink(&self, event: AgentEvent) {
        let Some(sink) = self.inner.sink.clone() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        handle.spawn(async move {
            match tokio::time::timeout(SINK_TIMEOUT, sink.deliver(&event)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => crate::obs::emit_sink_unreachable(&e),
                Err(elapsed) => crate::obs::emit_sink_unreachable(&elapsed),
            }
        });
    }

    /// Register a listener; it sees every event emitted after this call.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&AgentEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.listeners).push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.inner.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// The most recent `limit` events in emission order, or all of them.
    pub fn get_events(&self, limit: Option<usize>) -> Vec<AgentEvent> {
        let log = lock(&self.inner.log);
        let start = match limit {
            Some(n) => log.len().saturating_sub(n),
            None => 0,
        };
        log[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.log).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every logged event. Listeners stay subscribed.
    pub fn clear(&self) {
        lock(&self.inner.log).clear();
        info!("event log cleared");
    }
}
