//! Identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID + Phantom type
//! `Id<T>` が共通実装を持ち、`T` はマーカー型としてコンパイル時にだけ使います。
//! `DispatchId` と `CorrelationId` は混同できません。
//!
//! `HandlerId` だけは ULID ではなく、Registry 内の登録順序（seq）で識別します。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
pub trait IdMarker: Send + Sync + 'static {
    /// Display で使うプレフィックス（例: "dispatch-"）
    fn prefix() -> &'static str;
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// Fresh id from the system clock and thread rng.
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Dispatch のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dispatch {}

impl IdMarker for Dispatch {
    fn prefix() -> &'static str {
        "dispatch-"
    }
}

/// Correlation のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Correlation {}

impl IdMarker for Correlation {
    fn prefix() -> &'static str {
        "corr-"
    }
}

/// Identifier of a single `send` / `query` / `publish` call.
pub type DispatchId = Id<Dispatch>;

/// Caller-supplied trace id, carried unchanged through every handler.
pub type CorrelationId = Id<Correlation>;

/// Identity of one handler registration.
///
/// `seq` is unique per registry and grows with registration order, so two
/// registrations of the same handler instance are still told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HandlerId {
    seq: u64,
    name: &'static str,
}

impl HandlerId {
    pub(crate) fn new(seq: u64, name: &'static str) -> Self {
        Self { seq, name }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let dispatch = DispatchId::generate();
        let correlation = CorrelationId::generate();

        assert!(dispatch.to_string().starts_with("dispatch-"));
        assert!(correlation.to_string().starts_with("corr-"));

        // let _: DispatchId = correlation; // <- does not compile
    }

    #[test]
    fn correlation_id_roundtrips_through_json() {
        let id = CorrelationId::generate();
        let serialized = serde_json::to_string(&id).unwrap();
        let back: CorrelationId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn handler_ids_order_by_registration() {
        let first = HandlerId::new(1, "InventoryHandler");
        let second = HandlerId::new(2, "InventoryHandler");
        assert_ne!(first, second);
        assert!(first < second);
        assert_eq!(second.to_string(), "InventoryHandler#2");
    }
}
