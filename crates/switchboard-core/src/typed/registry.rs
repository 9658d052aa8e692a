//! HandlerRegistry - Handler の登録と解決
//!
//! # 学習ポイント
//! - `HashMap<MessageKey, _>` での型消去された handler の管理（`Box<dyn Any>`）
//! - 解決時に `downcast_ref` で静的な型を復元
//! - `RwLock` による「読み取りは並行、登録は排他」
//!
//! # Cardinality
//! - Command / Query: 1 つの MessageType に handler は 1 つだけ（2 つ目は `DuplicateHandler`）
//! - Event: 0 個以上。登録順を保持し、重複登録も拒否しない

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use super::handler::{CommandHandler, EventHandler, QueryHandler};
use crate::domain::{Command, Event, HandlerId, MediatorError, MessageKey, MessageKind, Query};

/// A handler together with the identity it was registered under.
pub struct ResolvedHandler<H: ?Sized> {
    pub id: HandlerId,
    pub handler: Arc<H>,
}

impl<H: ?Sized> Clone for ResolvedHandler<H> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
        }
    }
}

/// One registration. `handler` holds an `Arc<dyn XxxHandler<M>>` whose
/// concrete type is fixed by the key it is stored under.
struct Registration {
    id: HandlerId,
    handler: Box<dyn Any + Send + Sync>,
}

enum HandlerBinding {
    Single(Registration),
    Many(Vec<Registration>),
}

impl HandlerBinding {
    fn registrations(&self) -> &[Registration] {
        match self {
            HandlerBinding::Single(reg) => std::slice::from_ref(reg),
            HandlerBinding::Many(regs) => regs,
        }
    }
}

#[derive(Default)]
struct Bindings {
    table: HashMap<MessageKey, HandlerBinding>,
    next_seq: u64,
}

impl Bindings {
    fn next_id(&mut self, name: &'static str) -> HandlerId {
        self.next_seq += 1;
        HandlerId::new(self.next_seq, name)
    }
}

/// HandlerRegistry は MessageKey → handler(s) の対応を保持
///
/// # 使用例
/// ```ignore
/// let registry = HandlerRegistry::new();
/// registry.register_command::<PlaceOrder>(Arc::new(PlaceOrderHandler))?;
/// registry.subscribe::<OrderPlaced>(Arc::new(InventoryHandler));
///
/// let bound = registry.resolve_command::<PlaceOrder>()?;
/// ```
///
/// # 内部実装
/// - handler は `Arc` で共有（composition root 側も同じ handler を保持できる）
/// - 登録は `&self` で可能。dispatch 中の登録も RwLock で安全
#[derive(Default)]
pub struct HandlerRegistry {
    bindings: RwLock<Bindings>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_command<C: Command>(
        &self,
        handler: Arc<dyn CommandHandler<C>>,
    ) -> Result<HandlerId, MediatorError> {
        let name = handler.name();
        self.register_single(MessageKey::command::<C>(), name, Box::new(handler))
    }

    pub fn register_query<Q: Query>(
        &self,
        handler: Arc<dyn QueryHandler<Q>>,
    ) -> Result<HandlerId, MediatorError> {
        let name = handler.name();
        self.register_single(MessageKey::query::<Q>(), name, Box::new(handler))
    }

    /// Append an event handler. Never fails; registration order is kept.
    pub fn subscribe<E: Event>(&self, handler: Arc<dyn EventHandler<E>>) -> HandlerId {
        let name = handler.name();
        self.register_many(MessageKey::event::<E>(), name, Box::new(handler))
    }

    fn register_single(
        &self,
        key: MessageKey,
        name: &'static str,
        handler: Box<dyn Any + Send + Sync>,
    ) -> Result<HandlerId, MediatorError> {
        debug_assert!(key.kind.is_single());
        let mut bindings = self.bindings.write();
        if let Some(existing) = bindings.table.get(&key) {
            let existing = existing.registrations()[0].id;
            return Err(MediatorError::DuplicateHandler {
                message_type: key.message_type,
                existing,
            });
        }
        let id = bindings.next_id(name);
        bindings
            .table
            .insert(key, HandlerBinding::Single(Registration { id, handler }));
        Ok(id)
    }

    fn register_many(
        &self,
        key: MessageKey,
        name: &'static str,
        handler: Box<dyn Any + Send + Sync>,
    ) -> HandlerId {
        debug_assert!(!key.kind.is_single());
        let mut bindings = self.bindings.write();
        let id = bindings.next_id(name);
        let binding = bindings
            .table
            .entry(key)
            .or_insert_with(|| HandlerBinding::Many(Vec::new()));
        if let HandlerBinding::Many(regs) = binding {
            regs.push(Registration { id, handler });
        }
        id
    }

    /// Remove one registration. Returns `false` if the id is unknown.
    ///
    /// Other event handlers of the same type keep their relative order.
    pub fn unregister(&self, id: HandlerId) -> bool {
        let mut bindings = self.bindings.write();
        let mut emptied = None;
        let mut removed = false;
        for (key, binding) in bindings.table.iter_mut() {
            match binding {
                HandlerBinding::Single(reg) if reg.id == id => {
                    emptied = Some(*key);
                    removed = true;
                }
                HandlerBinding::Many(regs) => {
                    let before = regs.len();
                    regs.retain(|reg| reg.id != id);
                    if regs.len() != before {
                        removed = true;
                        if regs.is_empty() {
                            emptied = Some(*key);
                        }
                    }
                }
                _ => {}
            }
            if removed {
                break;
            }
        }
        if let Some(key) = emptied {
            bindings.table.remove(&key);
        }
        removed
    }

    pub fn resolve_command<C: Command>(
        &self,
    ) -> Result<ResolvedHandler<dyn CommandHandler<C>>, MediatorError> {
        self.resolve_single::<Arc<dyn CommandHandler<C>>>(MessageKey::command::<C>())
            .map(|(id, handler)| ResolvedHandler { id, handler })
    }

    pub fn resolve_query<Q: Query>(
        &self,
    ) -> Result<ResolvedHandler<dyn QueryHandler<Q>>, MediatorError> {
        self.resolve_single::<Arc<dyn QueryHandler<Q>>>(MessageKey::query::<Q>())
            .map(|(id, handler)| ResolvedHandler { id, handler })
    }

    /// Every handler bound to `E`, in registration order. Empty is not an error.
    pub fn resolve_event<E: Event>(&self) -> Vec<ResolvedHandler<dyn EventHandler<E>>> {
        let bindings = self.bindings.read();
        let Some(binding) = bindings.table.get(&MessageKey::event::<E>()) else {
            return Vec::new();
        };
        binding
            .registrations()
            .iter()
            .filter_map(|reg| {
                reg.handler
                    .downcast_ref::<Arc<dyn EventHandler<E>>>()
                    .map(|handler| ResolvedHandler {
                        id: reg.id,
                        handler: Arc::clone(handler),
                    })
            })
            .collect()
    }

    fn resolve_single<T: Clone + 'static>(
        &self,
        key: MessageKey,
    ) -> Result<(HandlerId, T), MediatorError> {
        let bindings = self.bindings.read();
        bindings
            .table
            .get(&key)
            .and_then(|binding| binding.registrations().first())
            .and_then(|reg| reg.handler.downcast_ref::<T>().map(|h| (reg.id, h.clone())))
            .ok_or(MediatorError::NoHandlerFound(key.message_type))
    }

    pub fn contains(&self, key: MessageKey) -> bool {
        self.bindings.read().table.contains_key(&key)
    }

    pub fn handler_count(&self, key: MessageKey) -> usize {
        self.bindings
            .read()
            .table
            .get(&key)
            .map_or(0, |binding| binding.registrations().len())
    }

    pub fn registered_types(&self) -> Vec<MessageKey> {
        self.bindings.read().table.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.read().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().table.is_empty()
    }

    /// Serializable view of every binding, ordered by first registration.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let bindings = self.bindings.read();
        let mut rows: Vec<(u64, BindingSnapshot)> = bindings
            .table
            .iter()
            .map(|(key, binding)| {
                let regs = binding.registrations();
                let first_seq = regs.first().map_or(u64::MAX, |reg| reg.id.seq());
                let row = BindingSnapshot {
                    message_type: key.message_type.short_name().to_string(),
                    kind: key.kind,
                    handlers: regs.iter().map(|reg| reg.id.to_string()).collect(),
                };
                (first_seq, row)
            })
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        RegistrySnapshot {
            bindings: rows.into_iter().map(|(_, row)| row).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingSnapshot {
    pub message_type: String,
    pub kind: MessageKind,
    pub handlers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySnapshot {
    pub bindings: Vec<BindingSnapshot>,
}
