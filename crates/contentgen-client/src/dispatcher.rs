use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::StreamExt as _;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cancel::{AbortHandle, CancelToken, cancel_pair};
use crate::protocol::protocol_events;
use crate::request::Request;
use crate::session::{SessionController, SessionEvent, SessionState};
use crate::transport::InferenceTransport;

/// Message used when a stream closes before its terminal event.
pub const STREAM_ENDED_EARLY: &str = "Stream ended before completion";

/// How a submission reaches the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportMode {
    /// Incremental frames through the protocol decoder.
    Streaming,
    /// One request, one whole response body.
    Buffered,
}

/// Streaming is used only when preferred and supported; otherwise buffered.
pub fn select_mode(prefer_streaming: bool, streaming_supported: bool) -> TransportMode {
    if prefer_streaming && streaming_supported {
        TransportMode::Streaming
    } else {
        TransportMode::Buffered
    }
}

struct ActiveRequest {
    session_id: uuid::Uuid,
    abort: AbortHandle,
}

/// Drives submissions through the transport and into the session.
///
/// Holds at most one active cancellation token. Every `submit` supersedes
/// the previous one (replace, then cancel old) before anything else, so a
/// stale request stops reading before the new one starts accumulating.
pub struct Dispatcher {
    transport: Arc<dyn InferenceTransport>,
    controller: SessionController,
    prefer_streaming: AtomicBool,
    active: Mutex<Option<ActiveRequest>>,
}

impl Dispatcher {
    /// Creates a dispatcher that prefers streaming.
    pub fn new(transport: Arc<dyn InferenceTransport>) -> Self {
        Self {
            transport,
            controller: SessionController::new(),
            prefer_streaming: AtomicBool::new(true),
            active: Mutex::new(None),
        }
    }

    /// Sets the initial streaming preference.
    pub fn with_streaming(self, enabled: bool) -> Self {
        self.set_streaming(enabled);
        self
    }

    /// Toggles the streaming preference. Read once per submission.
    pub fn set_streaming(&self, enabled: bool) {
        self.prefer_streaming.store(enabled, Ordering::SeqCst);
    }

    pub fn streaming_enabled(&self) -> bool {
        self.prefer_streaming.load(Ordering::SeqCst)
    }

    /// Mode the next submission would use.
    pub fn transport_mode(&self) -> TransportMode {
        select_mode(self.streaming_enabled(), self.transport.supports_streaming())
    }

    /// Returns a copy of the current session state.
    pub fn snapshot(&self) -> SessionState {
        self.controller.snapshot()
    }

    /// Subscribes to session state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.controller.subscribe()
    }

    pub fn transport(&self) -> &Arc<dyn InferenceTransport> {
        &self.transport
    }

    /// Submits a request and drives it to `Done`, `Error` or cancelled
    /// `Idle`. Returns the session snapshot taken when this submission
    /// stops driving it.
    ///
    /// Never fails: every fault ends up in the session state.
    pub async fn submit(&self, request: Request) -> SessionState {
        let session_id = uuid::Uuid::new_v4();
        let (abort, token) = cancel_pair();
        self.supersede(session_id, abort);

        if let Err(err) = request.validate() {
            warn!(
                event = "dispatch.rejected",
                domain = "dispatch",
                session_id = %session_id,
                reason = %err
            );
            self.controller.apply(
                session_id,
                SessionEvent::Rejected {
                    session_id,
                    task: request.task,
                    input_text: request.input_text,
                    message: err.to_string(),
                },
            );
            self.release(session_id);
            return self.snapshot();
        }

        self.controller.apply(
            session_id,
            SessionEvent::Submitted {
                session_id,
                task: request.task,
                input_text: request.input_text.clone(),
            },
        );

        let mode = self.transport_mode();
        info!(
            event = "dispatch.submitted",
            domain = "dispatch",
            session_id = %session_id,
            task = %request.task,
            mode = ?mode
        );
        match mode {
            TransportMode::Streaming => self.run_streaming(session_id, &request, token).await,
            TransportMode::Buffered => self.run_buffered(session_id, &request, token).await,
        }

        self.release(session_id);
        self.snapshot()
    }

    /// Cancels the in-flight request, if any.
    ///
    /// The session moves to `Idle` right away; the transport loop stops at
    /// its next suspension point.
    pub fn cancel(&self) {
        let active = self.lock_active().take();
        if let Some(active) = active {
            info!(
                event = "dispatch.cancelled",
                domain = "dispatch",
                session_id = %active.session_id
            );
            active.abort.abort();
            self.controller
                .apply(active.session_id, SessionEvent::Cancelled);
        }
    }

    /// Cancels any in-flight request and resets the session to `Idle`.
    pub fn clear(&self) {
        self.cancel();
        self.controller
            .apply(uuid::Uuid::nil(), SessionEvent::Cleared);
    }

    async fn run_buffered(&self, session_id: uuid::Uuid, request: &Request, mut token: CancelToken) {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                self.controller.apply(session_id, SessionEvent::Cancelled);
            }
            result = self.transport.complete(request) => {
                match result {
                    Ok(meta) => {
                        self.controller.apply(session_id, SessionEvent::Completed(meta));
                    }
                    Err(err) => {
                        warn!(event = "dispatch.transport_failed", domain = "dispatch", session_id = %session_id, error = %err);
                        self.controller
                            .apply(session_id, SessionEvent::Failed(err.message().to_string()));
                    }
                }
            }
        }
    }

    async fn run_streaming(&self, session_id: uuid::Uuid, request: &Request, mut token: CancelToken) {
        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            opened = self.transport.open_stream(request) => Some(opened),
        };
        let bytes_stream = match opened {
            None => {
                self.controller.apply(session_id, SessionEvent::Cancelled);
                return;
            }
            Some(Err(err)) => {
                warn!(event = "dispatch.transport_failed", domain = "dispatch", session_id = %session_id, error = %err);
                self.controller
                    .apply(session_id, SessionEvent::Failed(err.message().to_string()));
                return;
            }
            Some(Ok(stream)) => stream,
        };

        let mut events = Box::pin(protocol_events(bytes_stream));
        let mut seq = 0_u64;
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    self.controller.apply(session_id, SessionEvent::Cancelled);
                    return;
                }
                next = events.next() => {
                    match next {
                        Some(Ok(event)) => {
                            let terminal = event.is_terminal();
                            debug!(event = "dispatch.protocol_event", domain = "dispatch", session_id = %session_id, seq, kind = event.kind());
                            seq = seq.saturating_add(1);
                            self.controller.apply(session_id, SessionEvent::from_protocol(event));
                            if terminal {
                                return;
                            }
                        }
                        Some(Err(err)) => {
                            warn!(event = "dispatch.stream_failed", domain = "dispatch", session_id = %session_id, error = %err);
                            self.controller
                                .apply(session_id, SessionEvent::Failed(err.message().to_string()));
                            return;
                        }
                        None => {
                            warn!(event = "dispatch.stream_ended_early", domain = "dispatch", session_id = %session_id, seq);
                            self.controller
                                .apply(session_id, SessionEvent::Failed(STREAM_ENDED_EARLY.to_string()));
                            return;
                        }
                    }
                }
            }
        }
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveRequest>> {
        // The guarded value is a plain handle; a poisoned lock holds no
        // partial update.
        self.active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn supersede(&self, session_id: uuid::Uuid, abort: AbortHandle) {
        let previous = self
            .lock_active()
            .replace(ActiveRequest { session_id, abort });
        if let Some(previous) = previous {
            debug!(
                event = "dispatch.superseded",
                domain = "dispatch",
                previous = %previous.session_id,
                next = %session_id
            );
            previous.abort.abort();
        }
    }

    fn release(&self, session_id: uuid::Uuid) {
        let mut active = self.lock_active();
        if active.as_ref().is_some_and(|a| a.session_id == session_id) {
            *active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_requires_preference_and_support() {
        assert_eq!(select_mode(true, true), TransportMode::Streaming);
        assert_eq!(select_mode(true, false), TransportMode::Buffered);
        assert_eq!(select_mode(false, true), TransportMode::Buffered);
        assert_eq!(select_mode(false, false), TransportMode::Buffered);
    }
}
