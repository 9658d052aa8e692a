//! Ports - 抽象化レイヤー
//!
//! Mediator が外部に依存する部分（時刻、ID、通知先）を trait で差し替え可能にします。

pub mod clock;
pub mod id_generator;
pub mod observer;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::observer::{DispatchEvent, DispatchObserver};
