//! FanOutCoordinator - 1 つの Event を全 handler に並行配送する
//!
//! # アルゴリズム
//! 1. handler ごとに `tokio::spawn` で独立したタスクを起動（同じ event / 同じ context）
//! 2. 全タスクの完了を待つ（join。途中で return しない）
//! 3. 失敗した handler を登録順に集めて `AggregateEventError` にする
//!
//! 成功した handler の副作用はそのまま残ります（handler 間のトランザクションはない）。
//! キャンセルは協調的: signal を立てるだけで、handler を強制終了しない。

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

use super::config::FanOutPolicy;
use super::invoker::Invoker;
use crate::domain::{
    AggregateEventError, DispatchContext, Event, HandlerError, HandlerFailure, HandlerId,
    MessageType,
};
use crate::typed::{EventHandler, ResolvedHandler};

#[derive(Clone)]
pub(crate) struct FanOutCoordinator {
    invoker: Invoker,
    policy: FanOutPolicy,
    max_concurrent: Option<usize>,
}

impl FanOutCoordinator {
    pub(crate) fn new(invoker: Invoker, policy: FanOutPolicy, max_concurrent: Option<usize>) -> Self {
        Self {
            invoker,
            policy,
            max_concurrent,
        }
    }

    /// Must be called from within a Tokio runtime.
    ///
    /// If the returned future is dropped early, already spawned handlers keep
    /// running detached.
    pub(crate) async fn run<E: Event>(
        &self,
        handlers: Vec<ResolvedHandler<dyn EventHandler<E>>>,
        event: E,
        ctx: &DispatchContext,
    ) -> Result<(), AggregateEventError> {
        if handlers.is_empty() {
            return Ok(());
        }

        let attempted = handlers.len();
        let event = Arc::new(event);
        // Permits are scoped to this publish; other publishes are not throttled.
        let permits = self
            .max_concurrent
            .map(|limit| Arc::new(Semaphore::new(limit)));

        let started = Instant::now();
        let mut joins: Vec<(HandlerId, JoinHandle<Result<(), HandlerError>>)> =
            Vec::with_capacity(attempted);
        for bound in handlers {
            let id = bound.id;
            let event = Arc::clone(&event);
            let ctx = ctx.clone();
            let invoker = self.invoker.clone();
            let permits = permits.clone();
            let policy = self.policy;

            let join = tokio::spawn(
                async move {
                    let _permit = match permits {
                        Some(sem) => sem.acquire_owned().await.ok(),
                        None => None,
                    };
                    let result = invoker.invoke_event_handler(&bound, &event, &ctx).await;
                    if result.is_err() && policy == FanOutPolicy::CancelOnFirstFailure {
                        ctx.cancel();
                    }
                    result
                }
                .in_current_span(),
            );
            joins.push((id, join));
        }

        let mut failures = Vec::new();
        for (handler, join) in joins {
            let cause = match join.await {
                Ok(Ok(())) => continue,
                Ok(Err(cause)) => cause,
                // the task never reported back, so the invoker did not see the outcome
                Err(join_err) => {
                    let cause = lost_task_error(join_err);
                    self.invoker.report_failure(
                        MessageType::of::<E>(),
                        handler,
                        ctx,
                        &cause,
                        started.elapsed(),
                    );
                    cause
                }
            };
            failures.push(HandlerFailure { handler, cause });
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AggregateEventError {
                message_type: MessageType::of::<E>(),
                attempted,
                failures,
            })
        }
    }
}

/// Aborted tasks (runtime shutdown) count as cancelled; anything else is a panic
/// that escaped the invoker.
fn lost_task_error(err: JoinError) -> HandlerError {
    if err.is_cancelled() {
        HandlerError::cancelled()
    } else {
        HandlerError::panicked(err.to_string())
    }
}
