//! switchboard-core
//!
//! In-process mediator: typed commands, queries and events routed to
//! registered handlers.
//!
//! # モジュール構成
//! - **domain**: メッセージ trait、ID、DispatchContext、エラー
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator, DispatchObserver）
//! - **typed**: 型付き Handler API（CommandHandler / QueryHandler / EventHandler, HandlerRegistry）
//! - **app**: Mediator, MediatorBuilder, 設定、統計
//! - **impls**: observer の実装（TracingObserver, NoopObserver, RecordingObserver）
//!
//! # 配送の規則
//! - Command / Query: ちょうど 1 つの handler。未登録なら `NoHandlerFound`
//! - Event: 0 個以上の handler に並行配送。失敗は `AggregateEventError` に集約

pub mod domain;
pub mod ports;
pub mod typed;
pub mod app;
pub mod impls;

pub use crate::app::{
    BuildError, ConfigError, FanOutPolicy, Mediator, MediatorBuilder, MediatorConfig,
    StatsSnapshot,
};
pub use crate::domain::{
    AggregateEventError, CancellationSignal, Command, CorrelationId, DispatchContext, DispatchId,
    Event, HandlerError, HandlerErrorKind, HandlerExecutionError, HandlerFailure, HandlerId,
    MediatorError, MessageKey, MessageKind, MessageType, Query,
};
pub use crate::typed::{CommandHandler, EventHandler, HandlerRegistry, QueryHandler};
