//! Request lifecycle state machine.
//!
//! `reduce` is the pure transition function; `SessionController` is the only
//! place it is applied, and publishes each new state to observers.
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::protocol::{EndSummary, ProtocolEvent};
use crate::request::Task;
use crate::response::ResponseMeta;

/// Lifecycle status of the current session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Streaming,
    Done,
    Error,
}

impl SessionStatus {
    /// True for `Done` and `Error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// Observable snapshot of the current session.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct SessionState {
    pub session_id: Option<uuid::Uuid>,
    pub status: SessionStatus,
    /// Output received so far. After a cancellation this is a leftover, not
    /// an authoritative result.
    pub output: String,
    pub error: Option<String>,
    pub meta: Option<ResponseMeta>,
    pub task: Task,
    pub input_text: String,
}

/// Inputs to the state machine.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// A request passed validation and is about to be sent.
    Submitted {
        session_id: uuid::Uuid,
        task: Task,
        input_text: String,
    },
    /// A request failed local validation; no transport call was made.
    Rejected {
        session_id: uuid::Uuid,
        task: Task,
        input_text: String,
        message: String,
    },
    /// Streamed output fragment.
    Chunk(String),
    /// Streamed end marker.
    Ended {
        summary: EndSummary,
        received_at: DateTime<Utc>,
    },
    /// Whole buffered response.
    Completed(ResponseMeta),
    /// Stream error event or transport failure.
    Failed(String),
    /// Cooperative cancellation was observed.
    Cancelled,
    /// Explicit reset by the collaborator.
    Cleared,
}

impl SessionEvent {
    /// Lifts a decoded protocol event, stamping `End` with the current time.
    pub fn from_protocol(event: ProtocolEvent) -> Self {
        match event {
            ProtocolEvent::Chunk { text } => Self::Chunk(text),
            ProtocolEvent::End(summary) => Self::Ended {
                summary,
                received_at: Utc::now(),
            },
            ProtocolEvent::Error { message } => Self::Failed(message),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Submitted { .. } => "submitted",
            Self::Rejected { .. } => "rejected",
            Self::Chunk(_) => "chunk",
            Self::Ended { .. } => "ended",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Cancelled => "cancelled",
            Self::Cleared => "cleared",
        }
    }
}

/// Applies one event. Pairs not listed below leave the state unchanged, so
/// `Done` and `Error` are only left through a new submission or a clear.
pub fn reduce(state: SessionState, event: SessionEvent) -> SessionState {
    use SessionStatus::*;

    match (state.status, event) {
        (_, SessionEvent::Submitted {
            session_id,
            task,
            input_text,
        }) => SessionState {
            session_id: Some(session_id),
            status: Streaming,
            task,
            input_text,
            ..SessionState::default()
        },
        (_, SessionEvent::Rejected {
            session_id,
            task,
            input_text,
            message,
        }) => SessionState {
            session_id: Some(session_id),
            status: Error,
            error: Some(message),
            task,
            input_text,
            ..SessionState::default()
        },
        (_, SessionEvent::Cleared) => SessionState::default(),
        (Streaming, SessionEvent::Chunk(text)) => {
            let mut next = state;
            next.output.push_str(&text);
            next
        }
        (Streaming, SessionEvent::Ended {
            summary,
            received_at,
        }) => {
            let mut next = state;
            next.meta = Some(ResponseMeta {
                id: summary.id,
                task: summary.task.unwrap_or(next.task),
                model: summary.model,
                input_text: next.input_text.clone(),
                output_text: next.output.clone(),
                usage: summary.usage,
                created_at: received_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            });
            next.status = Done;
            next
        }
        (Streaming, SessionEvent::Completed(meta)) => {
            let mut next = state;
            next.output = meta.output_text.clone();
            next.meta = Some(meta);
            next.status = Done;
            next
        }
        (Streaming, SessionEvent::Failed(message)) => {
            let mut next = state;
            next.error = Some(message);
            next.status = Error;
            next
        }
        (Streaming, SessionEvent::Cancelled) => {
            let mut next = state;
            next.meta = None;
            next.error = None;
            next.status = Idle;
            next
        }
        (_, _) => state,
    }
}

/// True when `reduce` would change a state with this status.
fn accepts(status: SessionStatus, event: &SessionEvent) -> bool {
    match event {
        SessionEvent::Submitted { .. } | SessionEvent::Rejected { .. } | SessionEvent::Cleared => {
            true
        }
        _ => status == SessionStatus::Streaming,
    }
}

/// Single owner of the observable session.
///
/// `apply` is the only mutation entry point. Events tagged with a session id
/// other than the current one are dropped, so a superseded request can never
/// write into a newer session.
#[derive(Debug)]
pub struct SessionController {
    tx: watch::Sender<SessionState>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self { tx }
    }

    /// Applies `event` on behalf of `session_id`.
    ///
    /// `Submitted`, `Rejected` and `Cleared` start or reset a session and
    /// are always accepted. Returns whether the event was applied.
    pub fn apply(&self, session_id: uuid::Uuid, event: SessionEvent) -> bool {
        let opens_session = matches!(
            event,
            SessionEvent::Submitted { .. } | SessionEvent::Rejected { .. } | SessionEvent::Cleared
        );
        let name = event.name();
        let mut transition = None;
        let applied = self.tx.send_if_modified(|state| {
            if !opens_session && state.session_id != Some(session_id) {
                debug!(
                    event = "session.stale_event_dropped",
                    domain = "session",
                    session_id = %session_id,
                    kind = name
                );
                return false;
            }
            let before = state.status;
            if !accepts(before, &event) {
                return false;
            }
            *state = reduce(std::mem::take(state), event);
            transition = Some((before, state.status));
            true
        });
        if let Some((from, to)) = transition
            && from != to
        {
            info!(
                event = "session.transition",
                domain = "session",
                session_id = %session_id,
                kind = name,
                from = ?from,
                to = ?to
            );
        }
        applied
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Current status without cloning the output.
    pub fn status(&self) -> SessionStatus {
        self.tx.borrow().status
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }
}
