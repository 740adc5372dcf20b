//! Cancellation signal for one analyze/apply invocation.
//!
//! A `CancelHandle`/`CancelToken` pair built on a `tokio::sync::watch`
//! channel. The caller keeps the handle; the token is passed into the
//! pipeline via `CallOptions` and raced against outstanding network calls.
//! A fired token surfaces as `PipelineError::Cancelled`, never as a
//! transport error.

use tokio::sync::watch;

/// Caller-held side of a cancellation pair.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Pipeline-held side of a cancellation pair. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Creates a connected cancellation pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    /// Signals cancellation. Idempotent; outstanding and future waits resolve.
    pub fn cancel(&self) {
        // send only fails when no receiver is left, which means nothing is
        // waiting anyway
        let _ = self.tx.send(true);
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is signalled. If the handle is dropped
    /// without cancelling, this pends forever — the invocation then runs to
    /// its natural completion or timeout.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        loop {
            if rx.changed().await.is_err() {
                // handle dropped without cancelling
                std::future::pending::<()>().await;
            }
            if *rx.borrow() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_token_starts_uncancelled() {
        let (_handle, token) = cancel_pair();
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_resolves_waiters() {
        let (handle, token) = cancel_pair();
        let waiter = tokio::spawn(async move { token.cancelled().await });
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter must resolve after cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_visible_late() {
        let (handle, token) = cancel_pair();
        handle.cancel();
        handle.cancel();
        assert!(token.is_cancelled());
        // a wait started after the signal resolves immediately
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("already-cancelled token resolves immediately");
    }
}
