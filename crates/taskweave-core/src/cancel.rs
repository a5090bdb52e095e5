//! Cooperative cancellation signal passed into every agent invocation.
//!
//! The runtime holds the [`CancelHandle`] and raises it on an explicit
//! cancellation request or when the execution deadline expires; the agent
//! holds a [`CancelToken`] and is expected to observe it promptly, either
//! by polling [`CancelToken::is_cancelled`] between steps or by selecting
//! on [`CancelToken::cancelled`] alongside long-running work.

use tokio::sync::watch;

/// Raises the cancellation signal. Owned by the scheduler.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observes the cancellation signal. Cloned into agent invocations.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Create a connected handle/token pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    /// Raise the signal. Idempotent; observers see it at their next check.
    pub fn cancel(&self) {
        // Receivers may already be gone when the agent returned first.
        let _ = self.tx.send(true);
    }

    /// Whether the signal has been raised.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl CancelToken {
    /// Non-blocking check, suitable between processing steps.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal is raised. If the handle is dropped
    /// without cancelling, this pends forever; the runtime always keeps
    /// the handle alive for the duration of the invocation.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// A token that is never cancelled, for callers without a deadline.
    pub fn never() -> Self {
        static NEVER: std::sync::OnceLock<watch::Sender<bool>> = std::sync::OnceLock::new();
        let tx = NEVER.get_or_init(|| watch::channel(false).0);
        CancelToken { rx: tx.subscribe() }
    }
}
