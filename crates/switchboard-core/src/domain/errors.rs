//! Errors - エラー型と分類
//!
//! - `HandlerError`: handler が返すエラー（原因）
//! - `MediatorError`: send / query / register の失敗
//! - `AggregateEventError`: publish で 1 件以上の handler が失敗した結果

use std::fmt;

use thiserror::Error;

use super::ids::HandlerId;
use super::message::MessageType;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// HandlerErrorKind は handler 失敗の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerErrorKind {
    /// The handler returned an error.
    Failed,
    /// The handler gave up after observing the cancellation signal.
    Cancelled,
    /// The handler panicked; the mediator caught it.
    Panicked,
}

impl fmt::Display for HandlerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HandlerErrorKind::Failed => "failed",
            HandlerErrorKind::Cancelled => "cancelled",
            HandlerErrorKind::Panicked => "panicked",
        };
        f.write_str(s)
    }
}

/// Error returned by a handler.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    kind: HandlerErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: HandlerErrorKind::Failed,
            message: message.into(),
            source: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: HandlerErrorKind::Cancelled,
            message: "cancelled".to_string(),
            source: None,
        }
    }

    pub(crate) fn panicked(message: impl Into<String>) -> Self {
        Self {
            kind: HandlerErrorKind::Panicked,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, keeping it reachable through `source()`.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind: HandlerErrorKind::Failed,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> HandlerErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// A command or query handler failed.
#[derive(Debug, Error)]
#[error("handler {handler} failed for message_type={message_type}: {cause}")]
pub struct HandlerExecutionError {
    pub message_type: MessageType,
    pub handler: HandlerId,
    #[source]
    pub cause: HandlerError,
}

/// One failed handler inside a publish.
#[derive(Debug)]
pub struct HandlerFailure {
    pub handler: HandlerId,
    pub cause: HandlerError,
}

/// Returned from `publish` when one or more event handlers failed.
///
/// Failures are ordered by registration order. Handlers that succeeded are
/// not listed and their side effects stay in place.
#[derive(Debug, Error)]
#[error("{} of {attempted} handler(s) failed for event={message_type}: [{}]", count(.failures), summarize(.failures))]
pub struct AggregateEventError {
    pub message_type: MessageType,
    pub attempted: usize,
    pub failures: Vec<HandlerFailure>,
}

impl AggregateEventError {
    pub fn failures(&self) -> &[HandlerFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_handlers(&self) -> Vec<HandlerId> {
        self.failures.iter().map(|f| f.handler).collect()
    }
}

fn count(failures: &[HandlerFailure]) -> usize {
    failures.len()
}

fn summarize(failures: &[HandlerFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.handler, f.cause))
        .collect::<Vec<_>>()
        .join("; ")
}

/// MediatorError は send / query / register の失敗
#[derive(Debug, Error)]
pub enum MediatorError {
    #[error("no handler found for message_type={0}")]
    NoHandlerFound(MessageType),

    #[error("duplicate handler for message_type={message_type} (already bound to {existing})")]
    DuplicateHandler {
        message_type: MessageType,
        existing: HandlerId,
    },

    #[error(transparent)]
    HandlerExecution(#[from] HandlerExecutionError),
}
