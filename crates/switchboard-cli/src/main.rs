use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use switchboard_core::{
    Command, CommandHandler, DispatchContext, Event, EventHandler, HandlerError, Mediator,
    MediatorConfig, Query, QueryHandler,
};

// ---- messages ----------------------------------------------------------

struct PlaceOrder {
    id: u64,
    sku: &'static str,
    quantity: u32,
}

impl Command for PlaceOrder {
    type Output = u64;
}

struct GetOrder {
    id: u64,
}

impl Query for GetOrder {
    type Output = Option<Order>;
}

#[derive(Debug, Clone)]
struct OrderPlaced {
    order_id: u64,
    sku: &'static str,
    quantity: u32,
}

impl Event for OrderPlaced {}

#[derive(Debug, Clone, Serialize)]
struct Order {
    id: u64,
    sku: &'static str,
    quantity: u32,
}

// ---- handlers ----------------------------------------------------------

type OrderStore = Arc<Mutex<HashMap<u64, Order>>>;

/// 注文を保存して OrderPlaced を発行する
struct PlaceOrderHandler {
    store: OrderStore,
    mediator: Mediator,
}

#[async_trait]
impl CommandHandler<PlaceOrder> for PlaceOrderHandler {
    async fn handle(&self, command: PlaceOrder, ctx: &DispatchContext) -> Result<u64, HandlerError> {
        if command.quantity == 0 {
            return Err(HandlerError::new("quantity must be positive"));
        }
        let order = Order {
            id: command.id,
            sku: command.sku,
            quantity: command.quantity,
        };
        self.store.lock().insert(order.id, order);

        // subscriber の失敗は注文そのものを失敗させない
        let event = OrderPlaced {
            order_id: command.id,
            sku: command.sku,
            quantity: command.quantity,
        };
        let follow_up = self.mediator.new_context();
        let follow_up = match ctx.correlation_id() {
            Some(corr) => follow_up.with_correlation_id(corr),
            None => follow_up,
        };
        if let Err(e) = self.mediator.publish_with(event, &follow_up).await {
            warn!(order_id = command.id, error = %e, "order placed but subscribers failed");
        }
        Ok(command.id)
    }
}

struct GetOrderHandler {
    store: OrderStore,
}

#[async_trait]
impl QueryHandler<GetOrder> for GetOrderHandler {
    async fn handle(&self, query: GetOrder, _ctx: &DispatchContext) -> Result<Option<Order>, HandlerError> {
        Ok(self.store.lock().get(&query.id).cloned())
    }
}

struct InventoryHandler;

#[async_trait]
impl EventHandler<OrderPlaced> for InventoryHandler {
    async fn handle(&self, event: &OrderPlaced, _ctx: &DispatchContext) -> Result<(), HandlerError> {
        sleep(Duration::from_millis(20)).await;
        info!(order_id = event.order_id, sku = event.sku, quantity = event.quantity, "inventory reserved");
        Ok(())
    }
}

/// 一部の SKU で失敗する通知 handler（部分失敗のデモ用）
struct NotificationHandler;

#[async_trait]
impl EventHandler<OrderPlaced> for NotificationHandler {
    async fn handle(&self, event: &OrderPlaced, _ctx: &DispatchContext) -> Result<(), HandlerError> {
        if event.sku.starts_with("GIFT") {
            return Err(HandlerError::new("mail gateway rejected gift template"));
        }
        info!(order_id = event.order_id, "order confirmation sent");
        Ok(())
    }
}

fn load_config() -> Result<MediatorConfig, Box<dyn std::error::Error>> {
    match std::env::var("SWITCHBOARD_CONFIG") {
        Ok(json) => Ok(MediatorConfig::from_json_str(&json)?),
        Err(_) => Ok(MediatorConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("switchboard_core=info,switchboard_cli=info")),
        )
        .init();

    // (A) Mediator を構築（handler は下で登録）
    let store: OrderStore = Arc::new(Mutex::new(HashMap::new()));
    let mediator = Mediator::builder()
        .with_config(load_config()?)
        .register(Arc::new(GetOrderHandler {
            store: store.clone(),
        }))?
        .register(Arc::new(InventoryHandler))?
        .register(Arc::new(NotificationHandler))?
        .expect_query::<GetOrder>()
        .build()?;

    // PlaceOrderHandler は Mediator 自身を握るので構築後に登録する
    mediator.register(Arc::new(PlaceOrderHandler {
        store: store.clone(),
        mediator: mediator.clone(),
    }))?;

    println!("registry: {}", serde_json::to_string_pretty(&mediator.registry().snapshot())?);

    // (B) Command: 正常系と部分失敗
    for (id, sku, quantity) in [(42, "BOOK-1", 2), (43, "GIFT-CARD", 1)] {
        println!("send PlaceOrder id={id}");
        let placed = mediator.send(PlaceOrder { id, sku, quantity }).await?;
        println!("  -> placed order {placed}");
    }

    // (C) Command: handler 自身の失敗はそのまま返る
    match mediator.send(PlaceOrder { id: 44, sku: "BOOK-1", quantity: 0 }).await {
        Ok(id) => println!("unexpected success: {id}"),
        Err(e) => println!("send PlaceOrder id=44 failed: {e}"),
    }

    // (D) Query
    let order = mediator.query(GetOrder { id: 42 }).await?;
    println!("query GetOrder id=42 -> {}", serde_json::to_string(&order)?);

    // (E) 統計
    println!("stats: {}", serde_json::to_string_pretty(&mediator.stats())?);
    Ok(())
}
