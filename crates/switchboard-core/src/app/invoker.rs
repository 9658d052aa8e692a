//! Invoker - 解決済み handler を静的な型のまま呼び出す
//!
//! Registry は型消去された handler を保持し、Invoker は呼び出し側の
//! 型（`C`, `C::Output`, `E`）で handler を実行します。
//!
//! # 役割
//! - handler のエラーを `HandlerExecutionError` に包む（Command / Query）
//! - panic を捕捉して失敗として扱う（`catch_unwind`）
//! - 実行時間を計測し、observer と stats に通知する

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;

use super::stats::DispatchStats;
use crate::domain::{
    Command, DispatchContext, Event, HandlerError, HandlerExecutionError, HandlerId, MessageType,
    Query,
};
use crate::ports::{DispatchEvent, DispatchObserver};
use crate::typed::{CommandHandler, EventHandler, QueryHandler, ResolvedHandler};

#[derive(Clone)]
pub(crate) struct Invoker {
    observer: Arc<dyn DispatchObserver>,
    stats: Arc<DispatchStats>,
}

impl Invoker {
    pub(crate) fn new(observer: Arc<dyn DispatchObserver>, stats: Arc<DispatchStats>) -> Self {
        Self { observer, stats }
    }

    pub(crate) fn observer(&self) -> &dyn DispatchObserver {
        self.observer.as_ref()
    }

    pub(crate) async fn invoke_command<C: Command>(
        &self,
        bound: &ResolvedHandler<dyn CommandHandler<C>>,
        command: C,
        ctx: &DispatchContext,
    ) -> Result<C::Output, HandlerExecutionError> {
        let message_type = MessageType::of::<C>();
        self.run(message_type, bound.id, ctx, bound.handler.handle(command, ctx))
            .await
            .map_err(|cause| HandlerExecutionError {
                message_type,
                handler: bound.id,
                cause,
            })
    }

    /// Same contract as `invoke_command`.
    pub(crate) async fn invoke_query<Q: Query>(
        &self,
        bound: &ResolvedHandler<dyn QueryHandler<Q>>,
        query: Q,
        ctx: &DispatchContext,
    ) -> Result<Q::Output, HandlerExecutionError> {
        let message_type = MessageType::of::<Q>();
        self.run(message_type, bound.id, ctx, bound.handler.handle(query, ctx))
            .await
            .map_err(|cause| HandlerExecutionError {
                message_type,
                handler: bound.id,
                cause,
            })
    }

    /// Runs one subscriber. Failures and panics come back as a value, never
    /// as an unwinding panic, so siblings are unaffected.
    pub(crate) async fn invoke_event_handler<E: Event>(
        &self,
        bound: &ResolvedHandler<dyn EventHandler<E>>,
        event: &E,
        ctx: &DispatchContext,
    ) -> Result<(), HandlerError> {
        self.run(
            MessageType::of::<E>(),
            bound.id,
            ctx,
            bound.handler.handle(event, ctx),
        )
        .await
    }

    async fn run<T, F>(
        &self,
        message_type: MessageType,
        handler: HandlerId,
        ctx: &DispatchContext,
        fut: F,
    ) -> Result<T, HandlerError>
    where
        F: Future<Output = Result<T, HandlerError>>,
    {
        let started = Instant::now();
        let result = match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(HandlerError::panicked(panic_message(&*payload))),
        };
        let duration = started.elapsed();

        match &result {
            Ok(_) => {
                self.stats.handler_finished(false);
                self.observer.on_event(&DispatchEvent::HandlerSucceeded {
                    dispatch_id: ctx.dispatch_id(),
                    message_type,
                    handler,
                    duration,
                });
            }
            Err(cause) => self.report_failure(message_type, handler, ctx, cause, duration),
        }
        result
    }

    /// Counts and reports a failed handler. Also used for handlers whose task
    /// never reported back (aborted by the runtime).
    pub(crate) fn report_failure(
        &self,
        message_type: MessageType,
        handler: HandlerId,
        ctx: &DispatchContext,
        cause: &HandlerError,
        duration: Duration,
    ) {
        self.stats.handler_finished(true);
        self.observer.on_event(&DispatchEvent::HandlerFailed {
            dispatch_id: ctx.dispatch_id(),
            message_type,
            handler,
            error_kind: cause.kind(),
            error: cause.to_string(),
            duration,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}
