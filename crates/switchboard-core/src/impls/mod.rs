//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **TracingObserver**: `tracing` に出力（Mediator のデフォルト）
//! - **NoopObserver**: 何もしない
//! - **RecordingObserver**: メモリに記録（テスト用）
//!
//! Clock / IdGenerator の実装は ports 側にあります（SystemClock, FixedClock, UlidGenerator）。

pub mod observers;

pub use self::observers::{NoopObserver, RecordingObserver, TracingObserver};
