//! DispatchObserver port - dispatch 通知の抽象化
//!
//! Mediator は dispatch の開始・handler の成否・publish の集計を
//! `DispatchEvent` として observer に渡します。送信先（ログ、メトリクスなど）は
//! observer 側の責務です。
//!
//! # 実装
//! - `impls::TracingObserver`: tracing に出力（デフォルト）
//! - `impls::NoopObserver`: 何もしない
//! - `impls::RecordingObserver`: メモリに記録（テスト用）

use std::time::Duration;

use crate::domain::{DispatchId, HandlerErrorKind, HandlerId, MessageKind, MessageType};

/// Minimal payload of one observable step of a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    DispatchStarted {
        dispatch_id: DispatchId,
        message_type: MessageType,
        kind: MessageKind,
        handlers: usize,
    },
    HandlerSucceeded {
        dispatch_id: DispatchId,
        message_type: MessageType,
        handler: HandlerId,
        duration: Duration,
    },
    HandlerFailed {
        dispatch_id: DispatchId,
        message_type: MessageType,
        handler: HandlerId,
        error_kind: HandlerErrorKind,
        error: String,
        duration: Duration,
    },
    PublishCompleted {
        dispatch_id: DispatchId,
        message_type: MessageType,
        handlers: usize,
        failures: usize,
        duration: Duration,
    },
}

impl DispatchEvent {
    /// Stable event name, e.g. for log keys or metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            DispatchEvent::DispatchStarted { .. } => "dispatch_started",
            DispatchEvent::HandlerSucceeded { .. } => "handler_succeeded",
            DispatchEvent::HandlerFailed { .. } => "handler_failed",
            DispatchEvent::PublishCompleted { .. } => "publish_completed",
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            DispatchEvent::DispatchStarted { message_type, .. }
            | DispatchEvent::HandlerSucceeded { message_type, .. }
            | DispatchEvent::HandlerFailed { message_type, .. }
            | DispatchEvent::PublishCompleted { message_type, .. } => *message_type,
        }
    }
}

/// DispatchObserver は dispatch 通知の受け取り口
///
/// Called inline on the dispatching task (and on fan-out tasks), so
/// implementations must be cheap and must not block.
pub trait DispatchObserver: Send + Sync {
    fn on_event(&self, event: &DispatchEvent);
}
