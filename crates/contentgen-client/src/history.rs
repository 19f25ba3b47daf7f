use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::response::UsageHistoryItem;
use crate::transport::InferenceTransport;

#[derive(Default)]
struct HistoryState {
    items: Vec<UsageHistoryItem>,
    loading: bool,
}

/// Cached view of the service's recent usage list.
///
/// Fetch failures are logged and swallowed: the previous list stays in
/// place and nothing else depends on a refresh succeeding.
pub struct UsageHistory {
    transport: Arc<dyn InferenceTransport>,
    state: Mutex<HistoryState>,
}

impl UsageHistory {
    pub fn new(transport: Arc<dyn InferenceTransport>) -> Self {
        Self {
            transport,
            state: Mutex::new(HistoryState::default()),
        }
    }

    /// Re-fetches the list and returns what is cached afterwards.
    pub async fn refresh(&self) -> Vec<UsageHistoryItem> {
        self.with_state(|s| s.loading = true);
        let fetched = self.transport.recent_usage().await;
        self.with_state(|s| {
            s.loading = false;
            match fetched {
                Ok(items) => {
                    debug!(event = "history.refreshed", domain = "history", items = items.len() as u64);
                    s.items = items;
                }
                Err(err) => {
                    warn!(event = "history.refresh_failed", domain = "history", error = %err);
                }
            }
            s.items.clone()
        })
    }

    /// Cached items in source order.
    pub fn items(&self) -> Vec<UsageHistoryItem> {
        self.with_state(|s| s.items.clone())
    }

    /// True while a refresh is in flight.
    pub fn is_loading(&self) -> bool {
        self.with_state(|s| s.loading)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut HistoryState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
