//! Handler traits - Command / Query / Event を処理する Handler の定義
//!
//! # 学習ポイント
//! - ジェネリック trait (`CommandHandler<C>`) による型安全な対応付け
//! - Object-safe trait として `Arc<dyn CommandHandler<C>>` に格納
//! - Marker 型による登録時の型推論 (`IntoHandlerBinding<Marker>`)

use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use super::registry::HandlerRegistry;
use crate::domain::message::short_type_name;
use crate::domain::{Command, DispatchContext, Event, HandlerError, HandlerId, MediatorError, Query};

/// CommandHandler は Command を 1 件処理して結果を返す
///
/// # 使用例
/// ```ignore
/// struct PlaceOrderHandler;
///
/// #[async_trait]
/// impl CommandHandler<PlaceOrder> for PlaceOrderHandler {
///     async fn handle(&self, command: PlaceOrder, _ctx: &DispatchContext) -> Result<u64, HandlerError> {
///         Ok(command.id)
///     }
/// }
/// ```
///
/// # ジェネリクスによる型安全性
/// - `CommandHandler<PlaceOrder>` は `PlaceOrder` しか受け取れない
/// - 戻り値の型は `PlaceOrder::Output` に固定される
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, command: C, ctx: &DispatchContext) -> Result<C::Output, HandlerError>;

    /// Identity used in errors and logs. Defaults to the type name.
    fn name(&self) -> &'static str {
        short_type_name(type_name::<Self>())
    }
}

/// QueryHandler は Query を 1 件処理して結果を返す
///
/// Should not change state. Nothing enforces that.
#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    async fn handle(&self, query: Q, ctx: &DispatchContext) -> Result<Q::Output, HandlerError>;

    fn name(&self) -> &'static str {
        short_type_name(type_name::<Self>())
    }
}

/// EventHandler は Event を購読する
///
/// The same event value is shared with every other subscriber, so it is
/// borrowed. Handlers run concurrently with their siblings.
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync {
    async fn handle(&self, event: &E, ctx: &DispatchContext) -> Result<(), HandlerError>;

    fn name(&self) -> &'static str {
        short_type_name(type_name::<Self>())
    }
}

/// Marker for handlers bound as command handlers.
pub struct AsCommand<C>(PhantomData<fn() -> C>);

/// Marker for handlers bound as query handlers.
pub struct AsQuery<Q>(PhantomData<fn() -> Q>);

/// Marker for handlers bound as event handlers.
pub struct AsEvent<E>(PhantomData<fn() -> E>);

/// Lets `register(handler)` infer the message type and kind from the handler
/// trait it implements.
///
/// `Marker` only exists to keep the three blanket impls apart. When a handler
/// implements more than one handler trait the inference is ambiguous; use
/// `register_command` / `register_query` / `subscribe` in that case.
pub trait IntoHandlerBinding<Marker> {
    fn bind(self, registry: &HandlerRegistry) -> Result<HandlerId, MediatorError>;
}

impl<C, H> IntoHandlerBinding<AsCommand<C>> for Arc<H>
where
    C: Command,
    H: CommandHandler<C> + 'static,
{
    fn bind(self, registry: &HandlerRegistry) -> Result<HandlerId, MediatorError> {
        registry.register_command::<C>(self)
    }
}

impl<Q, H> IntoHandlerBinding<AsQuery<Q>> for Arc<H>
where
    Q: Query,
    H: QueryHandler<Q> + 'static,
{
    fn bind(self, registry: &HandlerRegistry) -> Result<HandlerId, MediatorError> {
        registry.register_query::<Q>(self)
    }
}

impl<E, H> IntoHandlerBinding<AsEvent<E>> for Arc<H>
where
    E: Event,
    H: EventHandler<E> + 'static,
{
    fn bind(self, registry: &HandlerRegistry) -> Result<HandlerId, MediatorError> {
        Ok(registry.subscribe::<E>(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageKey, MessageKind};

    struct PlaceOrder {
        id: u64,
    }

    impl Command for PlaceOrder {
        type Output = u64;
    }

    struct OrderPlaced;

    impl Event for OrderPlaced {}

    struct PlaceOrderHandler;

    #[async_trait]
    impl CommandHandler<PlaceOrder> for PlaceOrderHandler {
        async fn handle(&self, command: PlaceOrder, _ctx: &DispatchContext) -> Result<u64, HandlerError> {
            Ok(command.id)
        }
    }

    struct AuditHandler;

    #[async_trait]
    impl EventHandler<OrderPlaced> for AuditHandler {
        async fn handle(&self, _event: &OrderPlaced, _ctx: &DispatchContext) -> Result<(), HandlerError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "audit"
        }
    }

    #[tokio::test]
    async fn command_handler_returns_output() {
        let handler = PlaceOrderHandler;
        let out = handler
            .handle(PlaceOrder { id: 9 }, &DispatchContext::new())
            .await
            .unwrap();
        assert_eq!(out, 9);
    }

    #[test]
    fn default_name_is_short_type_name() {
        assert_eq!(CommandHandler::<PlaceOrder>::name(&PlaceOrderHandler), "PlaceOrderHandler");
        assert_eq!(EventHandler::<OrderPlaced>::name(&AuditHandler), "audit");
    }

    #[test]
    fn bind_infers_kind_from_handler_trait() {
        let registry = HandlerRegistry::new();

        let command_id = Arc::new(PlaceOrderHandler).bind(&registry).unwrap();
        let event_id = Arc::new(AuditHandler).bind(&registry).unwrap();

        assert_eq!(command_id.name(), "PlaceOrderHandler");
        assert_eq!(event_id.name(), "audit");
        assert!(registry.contains(MessageKey::command::<PlaceOrder>()));
        assert_eq!(
            registry.handler_count(MessageKey::new(
                crate::domain::MessageType::of::<OrderPlaced>(),
                MessageKind::Event
            )),
            1
        );
    }
}
