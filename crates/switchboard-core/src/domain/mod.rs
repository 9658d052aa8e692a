//! Domain model: messages, ids, dispatch context, errors.

pub mod message;
pub mod ids;
pub mod context;
pub mod errors;

pub use self::message::{Command, Event, MessageKey, MessageKind, MessageType, Query};
pub use self::ids::{CorrelationId, DispatchId, HandlerId, Id, IdMarker};
pub use self::context::{CancellationSignal, DispatchContext};
pub use self::errors::{
    AggregateEventError, HandlerError, HandlerErrorKind, HandlerExecutionError, HandlerFailure,
    MediatorError,
};
