//! DispatchObserver の実装

use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::ports::{DispatchEvent, DispatchObserver};

/// Writes every dispatch event to `tracing`.
///
/// Successes go out at `debug`, handler failures and failed publishes at
/// `warn`. Enable with e.g. `RUST_LOG=switchboard_core=debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DispatchObserver for TracingObserver {
    fn on_event(&self, event: &DispatchEvent) {
        match event {
            DispatchEvent::DispatchStarted {
                dispatch_id,
                message_type,
                kind,
                handlers,
            } => debug!(
                %dispatch_id,
                message_type = message_type.short_name(),
                %kind,
                handlers,
                "dispatch started"
            ),
            DispatchEvent::HandlerSucceeded {
                dispatch_id,
                message_type,
                handler,
                duration,
            } => debug!(
                %dispatch_id,
                message_type = message_type.short_name(),
                %handler,
                outcome = "ok",
                duration_ms = millis(duration),
                "handler succeeded"
            ),
            DispatchEvent::HandlerFailed {
                dispatch_id,
                message_type,
                handler,
                error_kind,
                error,
                duration,
            } => warn!(
                %dispatch_id,
                message_type = message_type.short_name(),
                %handler,
                outcome = %error_kind,
                %error,
                duration_ms = millis(duration),
                "handler failed"
            ),
            DispatchEvent::PublishCompleted {
                dispatch_id,
                message_type,
                handlers,
                failures,
                duration,
            } => {
                if *failures > 0 {
                    warn!(
                        %dispatch_id,
                        message_type = message_type.short_name(),
                        handlers,
                        failures,
                        duration_ms = millis(duration),
                        "publish completed with failures"
                    );
                } else {
                    debug!(
                        %dispatch_id,
                        message_type = message_type.short_name(),
                        handlers,
                        duration_ms = millis(duration),
                        "publish completed"
                    );
                }
            }
        }
    }
}

/// Saturates instead of truncating.
fn millis(duration: &Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DispatchObserver for NoopObserver {
    fn on_event(&self, _event: &DispatchEvent) {}
}

/// RecordingObserver はイベントをメモリに記録（テスト用）
///
/// # 使用例
/// ```ignore
/// let observer = Arc::new(RecordingObserver::new());
/// let mediator = Mediator::builder().with_observer(observer.clone()).build()?;
/// mediator.publish(OrderPlaced { order_id: 1 }).await?;
/// assert_eq!(observer.names(), vec!["dispatch_started", "handler_succeeded", "publish_completed"]);
/// ```
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<DispatchEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().clone()
    }

    /// Event names in arrival order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(DispatchEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl DispatchObserver for RecordingObserver {
    fn on_event(&self, event: &DispatchEvent) {
        self.events.lock().push(event.clone());
    }
}
