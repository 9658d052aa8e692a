//! Per-dispatch context: ids, timestamp and a cooperative cancellation signal.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::ids::{CorrelationId, DispatchId};

/// Shared, advisory cancellation flag.
///
/// Clones observe the same flag. Cancelling never interrupts running code;
/// handlers decide when (and whether) to look at it.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        });
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once cancellation has been requested (immediately if it already was).
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns once the flag flips.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Transient value passed alongside every dispatch.
///
/// Created per call, discarded after completion. Every handler of one
/// `publish` receives a clone, so they all observe the same signal.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    dispatch_id: DispatchId,
    correlation_id: Option<CorrelationId>,
    issued_at: DateTime<Utc>,
    cancellation: CancellationSignal,
}

impl DispatchContext {
    /// Context stamped with a fresh id and the system time.
    pub fn new() -> Self {
        Self::from_parts(DispatchId::generate(), Utc::now())
    }

    pub(crate) fn from_parts(dispatch_id: DispatchId, issued_at: DateTime<Utc>) -> Self {
        Self {
            dispatch_id,
            correlation_id: None,
            issued_at,
            cancellation: CancellationSignal::new(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Replace the signal, e.g. to tie several dispatches to one shutdown flag.
    pub fn with_cancellation(mut self, cancellation: CancellationSignal) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn dispatch_id(&self) -> DispatchId {
        self.dispatch_id
    }

    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.correlation_id
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn cancellation(&self) -> &CancellationSignal {
        &self.cancellation
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn clones_share_the_signal() {
        let ctx = DispatchContext::new();
        let clone = ctx.clone();
        assert!(!clone.is_cancelled());

        ctx.cancel();
        assert!(clone.is_cancelled());

        // idempotent
        ctx.cancel();
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_when_already_cancelled() {
        let signal = CancellationSignal::new();
        signal.cancel();
        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_wakes_waiter() {
        let signal = CancellationSignal::new();
        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.cancelled().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        signal.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn with_cancellation_ties_contexts_to_one_signal() {
        let shutdown = CancellationSignal::new();
        let first = DispatchContext::new().with_cancellation(shutdown.clone());
        let second = DispatchContext::new().with_cancellation(shutdown.clone());
        let unrelated = DispatchContext::new();

        shutdown.cancel();

        assert!(first.is_cancelled());
        assert!(second.cancellation().is_cancelled());
        assert!(!unrelated.is_cancelled());
    }

    #[test]
    fn correlation_id_is_optional() {
        let ctx = DispatchContext::new();
        assert!(ctx.correlation_id().is_none());

        let corr = CorrelationId::generate();
        let ctx = ctx.with_correlation_id(corr);
        assert_eq!(ctx.correlation_id(), Some(corr));
    }
}
