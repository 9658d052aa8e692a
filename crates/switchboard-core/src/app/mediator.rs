//! Mediator - 外部コードが触る唯一の入口
//!
//! - `send` / `query`: handler を 1 つ解決して Invoker で実行
//! - `publish`: handler 一覧を解決して FanOutCoordinator に委譲
//! - `register`: handler の trait から MessageType / MessageKind を推論して Registry に登録
//!
//! # フェーズ
//! - **Composing**: `MediatorBuilder` で登録（fail-fast）
//! - **Operational**: dispatch が主。登録も RwLock で同期されているので可能

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn, Instrument};

use super::builder::MediatorBuilder;
use super::config::MediatorConfig;
use super::fan_out::FanOutCoordinator;
use super::invoker::Invoker;
use super::stats::{DispatchStats, StatsSnapshot};
use crate::domain::{
    AggregateEventError, Command, DispatchContext, Event, HandlerId, MediatorError, MessageKey,
    Query,
};
use crate::impls::TracingObserver;
use crate::ports::{Clock, DispatchEvent, DispatchObserver, IdGenerator, SystemClock, UlidGenerator};
use crate::typed::{CommandHandler, EventHandler, HandlerRegistry, IntoHandlerBinding, QueryHandler};

struct Inner {
    registry: HandlerRegistry,
    invoker: Invoker,
    fan_out: FanOutCoordinator,
    ids: Box<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    stats: Arc<DispatchStats>,
    config: MediatorConfig,
}

/// Typed in-process router for commands, queries and events.
///
/// Cloning is cheap and every clone shares the same registry. Build one
/// instance at the composition root and hand it to whoever needs it.
///
/// # 使用例
/// ```ignore
/// let mediator = Mediator::builder()
///     .register(Arc::new(PlaceOrderHandler))?
///     .register(Arc::new(InventoryHandler))?
///     .expect_command::<PlaceOrder>()
///     .build()?;
///
/// let order_id = mediator.send(PlaceOrder { id: 42 }).await?;
/// mediator.publish(OrderPlaced { order_id }).await?;
/// ```
#[derive(Clone)]
pub struct Mediator {
    inner: Arc<Inner>,
}

impl Mediator {
    /// Default config, `TracingObserver`, system clock.
    pub fn new() -> Self {
        Self::from_parts(
            HandlerRegistry::new(),
            MediatorConfig::default(),
            Arc::new(TracingObserver),
            Arc::new(SystemClock),
        )
    }

    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    /// `config` is expected to be validated already.
    pub(crate) fn from_parts(
        registry: HandlerRegistry,
        config: MediatorConfig,
        observer: Arc<dyn DispatchObserver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let stats = Arc::new(DispatchStats::default());
        let invoker = Invoker::new(observer, stats.clone());
        let fan_out = FanOutCoordinator::new(
            invoker.clone(),
            config.fan_out_policy,
            config.max_concurrent_handlers,
        );
        Self {
            inner: Arc::new(Inner {
                registry,
                invoker,
                fan_out,
                ids: Box::new(UlidGenerator::new(clock.clone())),
                clock,
                stats,
                config,
            }),
        }
    }

    /// Fresh context with a new dispatch id, stamped by the mediator's clock.
    pub fn new_context(&self) -> DispatchContext {
        DispatchContext::from_parts(self.inner.ids.generate_dispatch_id(), self.inner.clock.now())
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a handler, inferring message type and kind from the handler
    /// trait it implements.
    pub fn register<M, B>(&self, handler: B) -> Result<HandlerId, MediatorError>
    where
        B: IntoHandlerBinding<M>,
    {
        let id = handler.bind(&self.inner.registry)?;
        debug!(handler = %id, "handler registered");
        Ok(id)
    }

    pub fn register_command<C, H>(&self, handler: Arc<H>) -> Result<HandlerId, MediatorError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let id = self.inner.registry.register_command::<C>(handler)?;
        debug!(handler = %id, message_type = MessageKey::command::<C>().message_type.short_name(), "command handler registered");
        Ok(id)
    }

    pub fn register_query<Q, H>(&self, handler: Arc<H>) -> Result<HandlerId, MediatorError>
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        let id = self.inner.registry.register_query::<Q>(handler)?;
        debug!(handler = %id, message_type = MessageKey::query::<Q>().message_type.short_name(), "query handler registered");
        Ok(id)
    }

    pub fn subscribe<E, H>(&self, handler: Arc<H>) -> HandlerId
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        let id = self.inner.registry.subscribe::<E>(handler);
        debug!(handler = %id, message_type = MessageKey::event::<E>().message_type.short_name(), "event handler subscribed");
        id
    }

    pub fn unregister(&self, id: HandlerId) -> bool {
        let removed = self.inner.registry.unregister(id);
        if removed {
            debug!(handler = %id, "handler unregistered");
        }
        removed
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Run the single handler bound to `C` and return its result unchanged.
    pub async fn send<C: Command>(&self, command: C) -> Result<C::Output, MediatorError> {
        let ctx = self.new_context();
        self.send_with(command, &ctx).await
    }

    pub async fn send_with<C: Command>(
        &self,
        command: C,
        ctx: &DispatchContext,
    ) -> Result<C::Output, MediatorError> {
        let key = MessageKey::command::<C>();
        self.inner.stats.command_sent();
        let bound = self.resolve_logged(key, || self.inner.registry.resolve_command::<C>())?;
        self.started(key, ctx, 1);

        let span = tracing::debug_span!("send", message_type = key.message_type.short_name(), dispatch_id = %ctx.dispatch_id());
        let output = self
            .inner
            .invoker
            .invoke_command(&bound, command, ctx)
            .instrument(span)
            .await?;
        Ok(output)
    }

    /// The read-side counterpart of `send`.
    pub async fn query<Q: Query>(&self, query: Q) -> Result<Q::Output, MediatorError> {
        let ctx = self.new_context();
        self.query_with(query, &ctx).await
    }

    pub async fn query_with<Q: Query>(
        &self,
        query: Q,
        ctx: &DispatchContext,
    ) -> Result<Q::Output, MediatorError> {
        let key = MessageKey::query::<Q>();
        self.inner.stats.query_sent();
        let bound = self.resolve_logged(key, || self.inner.registry.resolve_query::<Q>())?;
        self.started(key, ctx, 1);

        let span = tracing::debug_span!("query", message_type = key.message_type.short_name(), dispatch_id = %ctx.dispatch_id());
        let output = self
            .inner
            .invoker
            .invoke_query(&bound, query, ctx)
            .instrument(span)
            .await?;
        Ok(output)
    }

    /// Deliver `event` to every subscriber concurrently and wait for all of them.
    ///
    /// Zero subscribers is a silent success. Requires a Tokio runtime.
    pub async fn publish<E: Event>(&self, event: E) -> Result<(), AggregateEventError> {
        let ctx = self.new_context();
        self.publish_with(event, &ctx).await
    }

    /// Like `publish`, with a caller-owned context so the caller can cancel
    /// the fan-out or attach a correlation id.
    pub async fn publish_with<E: Event>(
        &self,
        event: E,
        ctx: &DispatchContext,
    ) -> Result<(), AggregateEventError> {
        let key = MessageKey::event::<E>();
        self.inner.stats.event_published();
        let handlers = self.inner.registry.resolve_event::<E>();
        let handler_count = handlers.len();
        self.started(key, ctx, handler_count);

        let started = Instant::now();
        let span = tracing::debug_span!("publish", message_type = key.message_type.short_name(), dispatch_id = %ctx.dispatch_id(), handlers = handler_count);
        let result = self
            .inner
            .fan_out
            .run(handlers, event, ctx)
            .instrument(span)
            .await;

        let failures = result.as_ref().err().map_or(0, AggregateEventError::len);
        if failures > 0 {
            self.inner.stats.publish_failed();
        }
        self.inner.invoker.observer().on_event(&DispatchEvent::PublishCompleted {
            dispatch_id: ctx.dispatch_id(),
            message_type: key.message_type,
            handlers: handler_count,
            failures,
            duration: started.elapsed(),
        });
        result
    }

    fn resolve_logged<T>(
        &self,
        key: MessageKey,
        resolve: impl FnOnce() -> Result<T, MediatorError>,
    ) -> Result<T, MediatorError> {
        resolve().inspect_err(|err| {
            warn!(message_type = key.message_type.short_name(), kind = %key.kind, error = %err, "dispatch rejected");
        })
    }

    fn started(&self, key: MessageKey, ctx: &DispatchContext, handlers: usize) {
        self.inner.invoker.observer().on_event(&DispatchEvent::DispatchStarted {
            dispatch_id: ctx.dispatch_id(),
            message_type: key.message_type,
            kind: key.kind,
            handlers,
        });
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn registry(&self) -> &HandlerRegistry {
        &self.inner.registry
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn config(&self) -> &MediatorConfig {
        &self.inner.config
    }
}

impl Default for Mediator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::FanOutPolicy;
    use crate::domain::{
        CancellationSignal, CorrelationId, HandlerError, HandlerErrorKind, MessageType,
    };
    use crate::impls::RecordingObserver;
    use crate::ports::FixedClock;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    // ---- messages -------------------------------------------------------

    struct PlaceOrder {
        id: u64,
    }

    impl Command for PlaceOrder {
        type Output = u64;
    }

    struct GetOrderStatus {
        id: u64,
    }

    impl Query for GetOrderStatus {
        type Output = String;
    }

    #[derive(Debug, Clone)]
    struct OrderPlaced {
        order_id: u64,
    }

    impl Event for OrderPlaced {}

    struct NobodyListens;

    impl Event for NobodyListens {}

    // ---- handlers -------------------------------------------------------

    struct PlaceOrderHandler;

    #[async_trait]
    impl CommandHandler<PlaceOrder> for PlaceOrderHandler {
        async fn handle(&self, command: PlaceOrder, _ctx: &DispatchContext) -> Result<u64, HandlerError> {
            Ok(command.id)
        }
    }

    struct RejectingOrderHandler;

    #[async_trait]
    impl CommandHandler<PlaceOrder> for RejectingOrderHandler {
        async fn handle(&self, _command: PlaceOrder, _ctx: &DispatchContext) -> Result<u64, HandlerError> {
            Err(HandlerError::new("payment declined"))
        }
    }

    struct OrderStatusHandler;

    #[async_trait]
    impl QueryHandler<GetOrderStatus> for OrderStatusHandler {
        async fn handle(&self, query: GetOrderStatus, _ctx: &DispatchContext) -> Result<String, HandlerError> {
            Ok(format!("order {} shipped", query.id))
        }
    }

    /// Records every order id it sees.
    #[derive(Default)]
    struct InventoryHandler {
        seen: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl EventHandler<OrderPlaced> for InventoryHandler {
        async fn handle(&self, event: &OrderPlaced, _ctx: &DispatchContext) -> Result<(), HandlerError> {
            self.seen.lock().push(event.order_id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct NotificationHandler {
        seen: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl EventHandler<OrderPlaced> for NotificationHandler {
        async fn handle(&self, event: &OrderPlaced, _ctx: &DispatchContext) -> Result<(), HandlerError> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.seen.lock().push(event.order_id);
            Ok(())
        }
    }

    struct BrokenProjection;

    #[async_trait]
    impl EventHandler<OrderPlaced> for BrokenProjection {
        async fn handle(&self, _event: &OrderPlaced, _ctx: &DispatchContext) -> Result<(), HandlerError> {
            Err(HandlerError::new("projection store unavailable"))
        }
    }

    struct PanickingProjection;

    #[async_trait]
    impl EventHandler<OrderPlaced> for PanickingProjection {
        async fn handle(&self, _event: &OrderPlaced, _ctx: &DispatchContext) -> Result<(), HandlerError> {
            panic!("index out of range");
        }
    }

    /// Blocks until cancellation is requested, then records that it saw it.
    struct CancelAware {
        saw_cancel: AtomicBool,
    }

    #[async_trait]
    impl EventHandler<OrderPlaced> for CancelAware {
        async fn handle(&self, _event: &OrderPlaced, ctx: &DispatchContext) -> Result<(), HandlerError> {
            ctx.cancelled().await;
            self.saw_cancel.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler<OrderPlaced> for CountingHandler {
        async fn handle(&self, _event: &OrderPlaced, _ctx: &DispatchContext) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CorrelationProbe {
        seen: Mutex<Option<CorrelationId>>,
    }

    #[async_trait]
    impl CommandHandler<PlaceOrder> for CorrelationProbe {
        async fn handle(&self, command: PlaceOrder, ctx: &DispatchContext) -> Result<u64, HandlerError> {
            *self.seen.lock() = ctx.correlation_id();
            Ok(command.id)
        }
    }

    // ---- tests ----------------------------------------------------------

    #[tokio::test]
    async fn send_returns_handler_result_unchanged() {
        let mediator = Mediator::new();
        mediator.register(Arc::new(PlaceOrderHandler)).unwrap();

        let id = mediator.send(PlaceOrder { id: 42 }).await.unwrap();
        assert_eq!(id, 42);
    }

    #[tokio::test]
    async fn send_without_handler_fails_with_no_handler_found() {
        let mediator = Mediator::new();
        let err = mediator.send(PlaceOrder { id: 1 }).await.unwrap_err();
        assert!(matches!(
            err,
            MediatorError::NoHandlerFound(t) if t == MessageType::of::<PlaceOrder>()
        ));
    }

    #[tokio::test]
    async fn query_without_handler_fails_with_no_handler_found() {
        let mediator = Mediator::new();
        let err = mediator.query(GetOrderStatus { id: 1 }).await.unwrap_err();
        assert!(matches!(err, MediatorError::NoHandlerFound(_)));
    }

    #[test]
    fn second_command_handler_is_rejected() {
        let mediator = Mediator::new();
        let first = mediator.register(Arc::new(PlaceOrderHandler)).unwrap();
        let err = mediator.register(Arc::new(RejectingOrderHandler)).unwrap_err();

        assert!(matches!(
            err,
            MediatorError::DuplicateHandler { existing, .. } if existing == first
        ));
    }

    #[test]
    fn second_query_handler_is_rejected() {
        let mediator = Mediator::new();
        mediator.register(Arc::new(OrderStatusHandler)).unwrap();
        let err = mediator.register(Arc::new(OrderStatusHandler)).unwrap_err();
        assert!(matches!(err, MediatorError::DuplicateHandler { .. }));
    }

    #[tokio::test]
    async fn command_failure_propagates_as_execution_error() {
        let mediator = Mediator::new();
        let id = mediator.register(Arc::new(RejectingOrderHandler)).unwrap();

        let err = mediator.send(PlaceOrder { id: 1 }).await.unwrap_err();
        let MediatorError::HandlerExecution(exec) = err else {
            panic!("expected HandlerExecution, got {err:?}");
        };
        assert_eq!(exec.handler, id);
        assert_eq!(exec.message_type, MessageType::of::<PlaceOrder>());
        assert_eq!(exec.cause.message(), "payment declined");
    }

    #[tokio::test]
    async fn query_returns_handler_result() {
        let mediator = Mediator::new();
        mediator.register(Arc::new(OrderStatusHandler)).unwrap();

        let status = mediator.query(GetOrderStatus { id: 5 }).await.unwrap();
        assert_eq!(status, "order 5 shipped");
    }

    #[tokio::test]
    async fn order_placed_reaches_inventory_and_notification() {
        let mediator = Mediator::new();
        let inventory = Arc::new(InventoryHandler::default());
        let notification = Arc::new(NotificationHandler::default());
        mediator.register(inventory.clone()).unwrap();
        mediator.register(notification.clone()).unwrap();

        mediator.publish(OrderPlaced { order_id: 1 }).await.unwrap();

        assert_eq!(*inventory.seen.lock(), vec![1]);
        assert_eq!(*notification.seen.lock(), vec![1]);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_silent_success() {
        let observer = Arc::new(RecordingObserver::new());
        let mediator = Mediator::builder()
            .with_observer(observer.clone())
            .build()
            .unwrap();

        mediator.publish(NobodyListens).await.unwrap();

        let snap = mediator.stats();
        assert_eq!(snap.events_published, 1);
        assert_eq!(snap.handler_invocations, 0);
        assert_eq!(observer.names(), vec!["dispatch_started", "publish_completed"]);
    }

    #[tokio::test]
    async fn publish_invokes_each_of_n_handlers_exactly_once() {
        for n in [0usize, 1, 3, 8] {
            let mediator = Mediator::new();
            let handlers: Vec<_> = (0..n)
                .map(|_| {
                    Arc::new(CountingHandler {
                        calls: AtomicUsize::new(0),
                    })
                })
                .collect();
            for h in &handlers {
                mediator.register(h.clone()).unwrap();
            }

            mediator.publish(OrderPlaced { order_id: 9 }).await.unwrap();

            for h in &handlers {
                assert_eq!(h.calls.load(Ordering::SeqCst), 1, "n={n}");
            }
        }
    }

    #[tokio::test]
    async fn partial_failure_reports_only_the_failed_handler() {
        let mediator = Mediator::new();
        let broken = mediator.register(Arc::new(BrokenProjection)).unwrap();
        let inventory = Arc::new(InventoryHandler::default());
        mediator.register(inventory.clone()).unwrap();

        let err = mediator.publish(OrderPlaced { order_id: 3 }).await.unwrap_err();

        assert_eq!(err.len(), 1);
        assert_eq!(err.failed_handlers(), vec![broken]);
        assert_eq!(err.failures[0].cause.message(), "projection store unavailable");
        assert_eq!(*inventory.seen.lock(), vec![3]);
        assert_eq!(mediator.stats().failed_publishes, 1);
    }

    #[tokio::test]
    async fn panicking_subscriber_does_not_abort_siblings() {
        let mediator = Mediator::new();
        let panicking = mediator.register(Arc::new(PanickingProjection)).unwrap();
        let inventory = Arc::new(InventoryHandler::default());
        mediator.register(inventory.clone()).unwrap();

        let err = mediator.publish(OrderPlaced { order_id: 4 }).await.unwrap_err();

        assert_eq!(err.failed_handlers(), vec![panicking]);
        assert_eq!(err.failures[0].cause.kind(), HandlerErrorKind::Panicked);
        assert_eq!(*inventory.seen.lock(), vec![4]);
    }

    #[tokio::test]
    async fn cancellation_is_observed_before_publish_returns() {
        let mediator = Mediator::new();
        let handler = Arc::new(CancelAware {
            saw_cancel: AtomicBool::new(false),
        });
        mediator.register(handler.clone()).unwrap();

        let ctx = mediator.new_context();
        let publish = tokio::spawn({
            let mediator = mediator.clone();
            let ctx = ctx.clone();
            async move { mediator.publish_with(OrderPlaced { order_id: 1 }, &ctx).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!publish.is_finished());
        assert!(!handler.saw_cancel.load(Ordering::SeqCst));

        ctx.cancel();
        tokio::time::timeout(Duration::from_secs(5), publish)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(handler.saw_cancel.load(Ordering::SeqCst));
    }

    /// Counts how many dispatches it saw cancelled.
    #[derive(Default)]
    struct CancelCounter {
        cancelled: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler<OrderPlaced> for CancelCounter {
        async fn handle(&self, _event: &OrderPlaced, ctx: &DispatchContext) -> Result<(), HandlerError> {
            ctx.cancelled().await;
            self.cancelled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn one_shutdown_signal_cancels_several_publishes() {
        let mediator = Mediator::new();
        let handler = Arc::new(CancelCounter::default());
        mediator.register(handler.clone()).unwrap();

        let shutdown = CancellationSignal::new();
        let publishes: Vec<_> = (1..=2)
            .map(|order_id| {
                let mediator = mediator.clone();
                let ctx = mediator.new_context().with_cancellation(shutdown.clone());
                tokio::spawn(async move { mediator.publish_with(OrderPlaced { order_id }, &ctx).await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handler.cancelled.load(Ordering::SeqCst), 0);

        shutdown.cancel();
        for publish in publishes {
            tokio::time::timeout(Duration::from_secs(5), publish)
                .await
                .unwrap()
                .unwrap()
                .unwrap();
        }
        assert_eq!(handler.cancelled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn correlation_id_reaches_the_handler() {
        let mediator = Mediator::new();
        let probe = Arc::new(CorrelationProbe {
            seen: Mutex::new(None),
        });
        mediator.register(probe.clone()).unwrap();

        let corr = CorrelationId::generate();
        let ctx = mediator.new_context().with_correlation_id(corr);
        mediator.send_with(PlaceOrder { id: 2 }, &ctx).await.unwrap();

        assert_eq!(*probe.seen.lock(), Some(corr));
    }

    #[tokio::test]
    async fn registration_while_operational_is_visible_to_next_dispatch() {
        let mediator = Mediator::new();
        assert!(mediator.send(PlaceOrder { id: 1 }).await.is_err());

        let worker = tokio::spawn({
            let mediator = mediator.clone();
            async move { mediator.register(Arc::new(PlaceOrderHandler)) }
        });
        worker.await.unwrap().unwrap();

        assert_eq!(mediator.send(PlaceOrder { id: 8 }).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn unsubscribed_handler_no_longer_receives_events() {
        let mediator = Mediator::new();
        let inventory = Arc::new(InventoryHandler::default());
        let id = mediator.register(inventory.clone()).unwrap();

        mediator.publish(OrderPlaced { order_id: 1 }).await.unwrap();
        assert!(mediator.unregister(id));
        mediator.publish(OrderPlaced { order_id: 2 }).await.unwrap();

        assert_eq!(*inventory.seen.lock(), vec![1]);
    }

    #[tokio::test]
    async fn observer_sees_started_handlers_and_completion() {
        let observer = Arc::new(RecordingObserver::new());
        let mediator = Mediator::builder()
            .with_observer(observer.clone())
            .with_config(MediatorConfig::default().with_max_concurrent_handlers(2))
            .register(Arc::new(BrokenProjection))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(mediator.config().fan_out_policy, FanOutPolicy::RunAll);
        assert_eq!(mediator.config().max_concurrent_handlers, Some(2));

        let _ = mediator.publish(OrderPlaced { order_id: 1 }).await;

        assert_eq!(
            observer.names(),
            vec!["dispatch_started", "handler_failed", "publish_completed"]
        );
        let events = observer.events();
        assert!(matches!(
            events.last(),
            Some(DispatchEvent::PublishCompleted { handlers: 1, failures: 1, .. })
        ));
    }

    #[test]
    fn contexts_use_the_configured_clock() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        let mediator = Mediator::builder()
            .with_clock(FixedClock::new(at))
            .build()
            .unwrap();

        let ctx = mediator.new_context();
        assert_eq!(ctx.issued_at(), at);
        assert_eq!(ctx.dispatch_id().as_ulid().timestamp_ms(), at.timestamp_millis() as u64);
        assert_ne!(ctx.dispatch_id(), mediator.new_context().dispatch_id());
    }

    #[tokio::test]
    async fn stats_count_each_dispatch_kind() {
        let mediator = Mediator::new();
        mediator.register(Arc::new(PlaceOrderHandler)).unwrap();
        mediator.register(Arc::new(OrderStatusHandler)).unwrap();

        mediator.send(PlaceOrder { id: 1 }).await.unwrap();
        mediator.query(GetOrderStatus { id: 1 }).await.unwrap();
        mediator.publish(NobodyListens).await.unwrap();

        let snap = mediator.stats();
        assert_eq!(snap.commands_sent, 1);
        assert_eq!(snap.queries_sent, 1);
        assert_eq!(snap.events_published, 1);
        assert_eq!(snap.handler_invocations, 2);
        assert_eq!(snap.handler_failures, 0);
    }
}
