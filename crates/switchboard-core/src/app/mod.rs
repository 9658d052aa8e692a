//! App - アプリケーション層
//!
//! Registry / Invoker / FanOutCoordinator を組み合わせて Mediator を実装します。
//!
//! # 主要コンポーネント
//! - **Mediator**: send / query / publish / register の入口
//! - **MediatorBuilder**: 構築とワイヤリング（Fail-fast）
//! - **Invoker**: 1 handler の実行（panic 捕捉、計測）
//! - **FanOutCoordinator**: Event の並行配送と失敗の集約

pub mod builder;
pub mod config;
pub mod mediator;
pub mod stats;

mod fan_out;
mod invoker;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, MediatorBuilder};
pub use self::config::{ConfigError, FanOutPolicy, MediatorConfig};
pub use self::mediator::Mediator;
pub use self::stats::StatsSnapshot;
