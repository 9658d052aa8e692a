//! Message - Command / Query / Event の定義
//!
//! # 学習ポイント
//! - Associated Types (`type Output`)
//! - `TypeId` による静的な型の同一性（リフレクション不要）
//! - Marker trait (`Event`)

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// An intent to change state. Exactly one handler, may return a result.
///
/// # 使用例
/// ```ignore
/// struct PlaceOrder {
///     id: u64,
/// }
///
/// impl Command for PlaceOrder {
///     type Output = u64;
/// }
/// ```
pub trait Command: Send + 'static {
    type Output: Send + 'static;
}

/// An intent to read state. Exactly one handler, returns a typed result.
///
/// Write/read separation is a convention between callers and handlers;
/// the mediator routes queries exactly like commands.
pub trait Query: Send + 'static {
    type Output: Send + 'static;
}

/// A fact that already happened, broadcast to zero or more handlers.
///
/// One event value is shared by every handler of a publish, hence `Sync`.
pub trait Event: Send + Sync + 'static {}

/// Determines cardinality and execution policy of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Command,
    Query,
    Event,
}

impl MessageKind {
    /// Command and Query bind exactly one handler; Event binds any number.
    pub fn is_single(self) -> bool {
        !matches!(self, MessageKind::Event)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageKind::Command => "command",
            MessageKind::Query => "query",
            MessageKind::Event => "event",
        };
        f.write_str(s)
    }
}

/// Runtime identity of a message's shape.
///
/// Equality and hashing only look at the `TypeId`; the name is kept for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
}

impl MessageType {
    pub fn of<M: 'static>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: type_name::<M>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified Rust type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without the module path (`PlaceOrder` for `app::orders::PlaceOrder`).
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageType({})", self.name)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Registry key. A type registered as an event and as a command gets two
/// independent bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub message_type: MessageType,
    pub kind: MessageKind,
}

impl MessageKey {
    pub fn new(message_type: MessageType, kind: MessageKind) -> Self {
        Self { message_type, kind }
    }

    pub fn command<C: Command>() -> Self {
        Self::new(MessageType::of::<C>(), MessageKind::Command)
    }

    pub fn query<Q: Query>() -> Self {
        Self::new(MessageType::of::<Q>(), MessageKind::Query)
    }

    pub fn event<E: Event>() -> Self {
        Self::new(MessageType::of::<E>(), MessageKind::Event)
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.message_type)
    }
}

/// Strips the outer module path: `a::b::Wrapper<c::D>` -> `Wrapper<c::D>`.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let head_end = full.find('<').unwrap_or(full.len());
    match full[..head_end].rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}
