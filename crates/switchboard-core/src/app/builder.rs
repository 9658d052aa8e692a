//! MediatorBuilder - Mediator の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;

use super::config::{ConfigError, MediatorConfig};
use super::mediator::Mediator;
use crate::domain::{Command, Event, MediatorError, MessageKey, Query};
use crate::impls::TracingObserver;
use crate::ports::{Clock, DispatchObserver, SystemClock};
use crate::typed::{
    CommandHandler, EventHandler, HandlerRegistry, IntoHandlerBinding, QueryHandler,
};

/// MediatorBuilder は Mediator を構築
///
/// # 使用例
/// ```ignore
/// let mediator = MediatorBuilder::new()
///     .register(Arc::new(PlaceOrderHandler))?
///     .expect_command::<PlaceOrder>()
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - `register()` は重複登録をその場で `MediatorError` にする
/// - `expect_command()` / `expect_query()` で必須の handler を宣言
/// - `build()` 時に「期待集合 ⊆ 登録済み集合」をチェック
pub struct MediatorBuilder {
    registry: HandlerRegistry,
    config: MediatorConfig,
    observer: Arc<dyn DispatchObserver>,
    clock: Arc<dyn Clock>,
    expected: Vec<MessageKey>,
}

/// BuildError は Mediator 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing handlers: {0:?}. These messages were expected but have no handler.")]
    MissingHandlers(Vec<String>),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MediatorBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            config: MediatorConfig::default(),
            observer: Arc::new(TracingObserver),
            clock: Arc::new(SystemClock),
            expected: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: MediatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default `TracingObserver`.
    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Handler を登録（種別は handler の trait から推論）
    pub fn register<M, B>(self, handler: B) -> Result<Self, MediatorError>
    where
        B: IntoHandlerBinding<M>,
    {
        handler.bind(&self.registry)?;
        Ok(self)
    }

    /// 推論が曖昧な場合（handler が複数の trait を実装している）に使う
    pub fn register_command<C, H>(self, handler: Arc<H>) -> Result<Self, MediatorError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        self.registry.register_command::<C>(handler)?;
        Ok(self)
    }

    pub fn register_query<Q, H>(self, handler: Arc<H>) -> Result<Self, MediatorError>
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        self.registry.register_query::<Q>(handler)?;
        Ok(self)
    }

    /// Always `Ok`; kept fallible so it chains like the other register methods.
    pub fn subscribe<E, H>(self, handler: Arc<H>) -> Result<Self, MediatorError>
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        self.registry.subscribe::<E>(handler);
        Ok(self)
    }

    /// `C` に handler が登録されていることを build 時に要求する
    pub fn expect_command<C: Command>(mut self) -> Self {
        self.expected.push(MessageKey::command::<C>());
        self
    }

    pub fn expect_query<Q: Query>(mut self) -> Self {
        self.expected.push(MessageKey::query::<Q>());
        self
    }

    /// MediatorBuilder を構築して Mediator を生成
    ///
    /// # 検証
    /// - config の妥当性（`max_concurrent_handlers` が 0 でないこと）
    /// - expect_* で宣言した message が全て登録されているか
    pub fn build(self) -> Result<Mediator, BuildError> {
        self.config.validate()?;

        let missing: Vec<String> = self
            .expected
            .iter()
            .filter(|key| !self.registry.contains(**key))
            .map(|key| format!("{} {}", key.kind, key.message_type.short_name()))
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingHandlers(missing));
        }

        Ok(Mediator::from_parts(
            self.registry,
            self.config,
            self.observer,
            self.clock,
        ))
    }
}

impl Default for MediatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
