use tokio::sync::watch;

/// Creates a linked abort handle and cancellation token.
pub fn cancel_pair() -> (AbortHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, CancelToken { rx })
}

/// Handle used to request cancellation of an in-flight request.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation. Idempotent.
    ///
    /// Cancellation is cooperative: the transport loop observes it between
    /// chunk reads and stops without raising a fault.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    /// True once `abort` has been called on any clone.
    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiving side of an `AbortHandle`, consulted by the transport loop.
#[derive(Clone, Debug)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Polls the flag without waiting.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested.
    ///
    /// If every `AbortHandle` is dropped without aborting, this never
    /// resolves.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                if *self.rx.borrow() {
                    return;
                }
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn abort_wakes_waiting_token() {
        let (handle, mut token) = cancel_pair();
        assert!(!token.is_cancelled());
        let waiter = tokio::spawn(async move {
            token.cancelled().await;
            token.is_cancelled()
        });
        handle.abort();
        assert!(waiter.await.expect("join"));
        assert!(handle.is_aborted());
    }

    #[tokio::test]
    async fn dropped_handle_without_abort_never_cancels() {
        let (handle, mut token) = cancel_pair();
        drop(handle);
        let outcome = tokio::time::timeout(Duration::from_millis(20), token.cancelled()).await;
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn abort_before_wait_resolves_immediately() {
        let (handle, mut token) = cancel_pair();
        handle.abort();
        drop(handle);
        token.cancelled().await;
        assert!(token.is_cancelled());
    }
}
