//! Cancellation-aware chat session
//!
//! A `ChatSession` owns at most one in-flight request. Each `send` supersedes
//! the previous call before dispatching its own: the old task is aborted and
//! its generation invalidated, so a late completion is discarded even if the
//! abort does not land before the response arrives.
//!
//! Results are delivered through a `PendingReply` the caller awaits wherever
//! it wants to observe them.

use crate::chat::client::ChatBackend;
use crate::chat::types::ChatRequest;
use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::metrics::{Metrics, Outcome};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug)]
struct SlotState {
    generation: u64,
    settled: bool,
}

/// Generation counter deciding which completion is allowed to settle
///
/// `begin` and `settle` take the same lock, so a completion either settles
/// before the next call starts or is rejected as stale.
#[derive(Debug, Clone)]
pub struct Supersession {
    state: Arc<Mutex<SlotState>>,
}

impl Default for Supersession {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(SlotState {
                generation: 0,
                settled: true,
            })),
        }
    }
}

impl Supersession {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a new generation
    ///
    /// Returns the new generation and whether an unsettled one was superseded.
    pub fn begin(&self) -> (u64, bool) {
        let mut state = self.lock();
        let superseded = !state.settled;
        state.generation += 1;
        state.settled = false;
        (state.generation, superseded)
    }

    /// Invalidate the current generation without starting a new request
    ///
    /// Returns whether an unsettled generation was cancelled.
    pub fn invalidate(&self) -> bool {
        let mut state = self.lock();
        let superseded = !state.settled;
        state.generation += 1;
        state.settled = true;
        superseded
    }

    /// Settle `generation`, running `deliver` under the lock if still current
    ///
    /// Returns false (and never runs `deliver`) for a stale or already
    /// settled generation.
    pub fn settle<F: FnOnce()>(&self, generation: u64, deliver: F) -> bool {
        let mut state = self.lock();
        if state.generation != generation || state.settled {
            return false;
        }
        state.settled = true;
        deliver();
        true
    }

    /// Generation of the most recent `begin` or `invalidate`
    pub fn current(&self) -> u64 {
        self.lock().generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    /// True if `generation` is current and has not settled yet
    pub fn is_pending(&self, generation: u64) -> bool {
        let state = self.lock();
        state.generation == generation && !state.settled
    }
}

/// Single-shot handle to one call's outcome
///
/// Resolves to `Err(ChatError::Cancelled)` if the call was superseded. Can be
/// awaited directly (also by `&mut`, e.g. inside `tokio::select!`) or through
/// [`PendingReply::wait`].
#[derive(Debug)]
pub struct PendingReply {
    request_id: Uuid,
    generation: u64,
    rx: oneshot::Receiver<Result<String, ChatError>>,
}

impl PendingReply {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for this call to settle
    pub async fn wait(self) -> Result<String, ChatError> {
        self.await
    }
}

impl Future for PendingReply {
    type Output = Result<String, ChatError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the call was superseded or aborted.
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ChatError::Cancelled)))
    }
}

struct InFlight {
    request_id: Uuid,
    generation: u64,
    task: AbortHandle,
}

/// Chat client with last-writer-wins supersession
///
/// Single-caller contract: `send` and `cancel` take `&mut self`, so one
/// owner drives the session. Must be used from within a Tokio runtime.
pub struct ChatSession<B: ChatBackend + 'static> {
    backend: Arc<B>,
    config: ChatConfig,
    supersession: Supersession,
    in_flight: Option<InFlight>,
    metrics: Option<Arc<Metrics>>,
}

impl<B: ChatBackend + 'static> ChatSession<B> {
    pub fn new(backend: B, config: ChatConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            config,
            supersession: Supersession::new(),
            in_flight: None,
            metrics: None,
        }
    }

    /// Record every outcome into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Request id of the call that may still settle, if any
    pub fn in_flight(&self) -> Option<Uuid> {
        self.in_flight
            .as_ref()
            .filter(|f| self.supersession.is_pending(f.generation))
            .map(|f| f.request_id)
    }

    /// Send `prompt`, superseding any call still pending on this session
    ///
    /// The configured suffix is appended before transmission.
    pub fn send(&mut self, prompt: &str) -> PendingReply {
        let (generation, superseded) = self.supersession.begin();
        self.abort_previous(superseded);

        let request = ChatRequest::from_prompt(&self.config, prompt);
        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();

        let backend = Arc::clone(&self.backend);
        let supersession = self.supersession.clone();
        let metrics = self.metrics.clone();
        let span = tracing::info_span!("chat_request", %request_id, generation);

        let task = tokio::spawn(
            async move {
                tracing::debug!(model = request.model(), "Dispatching chat request");
                let started = Instant::now();
                let result = backend.complete(&request).await;
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                let outcome = Outcome::of(&result);

                let delivered = supersession.settle(generation, || {
                    if let Some(metrics) = &metrics {
                        metrics.record_outcome(outcome);
                        metrics.record_duration(elapsed_ms);
                    }
                    // Receiver may already be gone; the result is simply unobserved.
                    let _ = tx.send(result);
                });

                if delivered {
                    tracing::info!(
                        outcome = outcome.as_str(),
                        elapsed_ms,
                        "Chat request settled"
                    );
                } else {
                    tracing::debug!(
                        outcome = outcome.as_str(),
                        elapsed_ms,
                        "Discarding completion of superseded request"
                    );
                }
            }
            .instrument(span),
        );

        self.in_flight = Some(InFlight {
            request_id,
            generation,
            task: task.abort_handle(),
        });

        PendingReply {
            request_id,
            generation,
            rx,
        }
    }

    /// Cancel the pending call, if any, without issuing a new one
    pub fn cancel(&mut self) {
        let superseded = self.supersession.invalidate();
        self.abort_previous(superseded);
    }

    fn abort_previous(&mut self, superseded: bool) {
        if let Some(previous) = self.in_flight.take() {
            previous.task.abort();
            if superseded {
                tracing::debug!(
                    request_id = %previous.request_id,
                    generation = previous.generation,
                    "Superseded in-flight chat request"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_outcome(Outcome::Cancelled);
                }
            }
        }
    }
}

impl<B: ChatBackend + 'static> Drop for ChatSession<B> {
    fn drop(&mut self) {
        if let Some(previous) = self.in_flight.take() {
            previous.task.abort();
        }
    }
}

/// What `ReplyBoard::apply` did with an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardUpdate {
    /// New reply is now displayed
    Replaced,
    /// Displayed reply kept, failure indicator raised
    Failed,
    /// Superseded outcome, nothing changed
    Ignored,
}

/// Caller-visible state of the chat screen
///
/// Holds the last displayed reply. Failures never clear it and cancellations
/// never touch it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyBoard {
    text: String,
    failed: bool,
}

impl ReplyBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True if the most recent non-cancelled outcome was a failure
    pub fn has_failure(&self) -> bool {
        self.failed
    }

    pub fn apply(&mut self, outcome: Result<String, ChatError>) -> BoardUpdate {
        match outcome {
            Ok(reply) => {
                self.text = reply;
                self.failed = false;
                BoardUpdate::Replaced
            }
            Err(e) if e.is_cancelled() => BoardUpdate::Ignored,
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "Chat request failed");
                self.failed = true;
                BoardUpdate::Failed
            }
        }
    }
}
