//! Typed - 型付き Handler API
//!
//! # 二層構造
//! - **表層（Typed）**: `CommandHandler<C>` / `QueryHandler<Q>` / `EventHandler<E>` - 型安全
//! - **内部（Dyn）**: `HandlerRegistry` は `Box<dyn Any>` で保持し、解決時に型を復元

pub mod handler;
pub mod registry;

pub use self::handler::{
    AsCommand, AsEvent, AsQuery, CommandHandler, EventHandler, IntoHandlerBinding, QueryHandler,
};
pub use self::registry::{BindingSnapshot, HandlerRegistry, RegistrySnapshot, ResolvedHandler};
