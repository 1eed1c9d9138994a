//! 事件总线（EventBus）
//!
//! 对外的发布入口，组合注册表、实例仓库与分发器：
//! - 注册只能在 [`EventBusBuilder`] 上进行，`build` 之后注册表只读；
//! - `EventBus` 可廉价克隆，所有克隆共享同一组处理器单例；
//! - 发布需要在 tokio 运行时内进行（处理器以任务方式运行）。
//!
use crate::{
    config::EventBusConfig,
    dispatcher::Dispatcher,
    error::{BusError, BusResult},
    event::Event,
    handler::{EventHandler, FromResolver},
    mode::{Delivery, WaitMode},
    registry::HandlerRegistry,
    resolver::DependencyResolver,
    store::HandlerStore,
};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 进程内事件总线
#[derive(Clone)]
pub struct EventBus {
    dispatcher: Arc<Dispatcher>,
}

impl EventBus {
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    /// 以配置中的默认模式发布事件
    pub async fn publish<E: Event>(&self, event: E) -> BusResult<Delivery> {
        let mode = self.dispatcher.config().default_mode;
        self.publish_cancellable(event, mode, CancellationToken::new())
            .await
    }

    /// 以指定模式发布事件
    pub async fn publish_with<E: Event>(&self, event: E, mode: WaitMode) -> BusResult<Delivery> {
        self.publish_cancellable(event, mode, CancellationToken::new())
            .await
    }

    /// 以指定模式发布事件，并将取消信号传递给每个处理器
    ///
    /// 已取消的信号不会阻止处理器启动，是否提前结束由处理器自行决定。
    pub async fn publish_cancellable<E: Event>(
        &self,
        event: E,
        mode: WaitMode,
        cancel: CancellationToken,
    ) -> BusResult<Delivery> {
        self.dispatcher.dispatch(event, mode, cancel).await
    }

    /// 返回处理器 `H` 的单例（必要时构造）
    pub async fn handler<H>(&self) -> BusResult<Arc<H>>
    where
        H: Any + Send + Sync,
    {
        self.dispatcher.store().instance::<H>().await
    }

    /// 事件 `E` 已注册的处理器数量
    pub fn handler_count<E: Event>(&self) -> usize {
        self.dispatcher.registry().lookup::<E>().len()
    }

    /// 已注册事件的稳定名称（按首次注册顺序）
    pub fn registered_events(&self) -> Vec<&'static str> {
        self.dispatcher.registry().event_names()
    }

    pub fn config(&self) -> &EventBusConfig {
        self.dispatcher.config()
    }

    /// 仍在运行的处理器调用数量（包括 `WaitForAny`/`WaitForNone` 脱离的调用）
    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    /// 等待所有处理器调用结束，常用于优雅关闭与测试
    ///
    /// 多个调用方同时等待时按到达顺序依次执行；等待期间新发布的调用同样会被等待，
    /// 持续发布时可能迟迟不返回。
    pub async fn wait_idle(&self) {
        self.dispatcher.wait_idle().await
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.registered_events())
            .field("store", self.dispatcher.store())
            .field("in_flight", &self.in_flight())
            .field("config", self.config())
            .finish()
    }
}

/// 事件总线构造器：唯一的注册阶段
///
/// 注册错误（如同一处理器类型重复注册）会被记录，并在 `build` 时返回第一条。
#[derive(Default)]
pub struct EventBusBuilder {
    registry: HandlerRegistry,
    store: HandlerStore,
    config: EventBusConfig,
    error: Option<BusError>,
}

impl EventBusBuilder {
    /// 注册由 [`FromResolver`] 惰性构造的处理器单例
    pub fn handler<E, H>(mut self) -> Self
    where
        E: Event,
        H: EventHandler<E> + FromResolver,
    {
        let registered = self.registry.register::<E, H>();
        if self.record(registered) {
            self.store.insert_lazy::<H>();
        }
        self
    }

    /// 注册已构造好的处理器单例
    pub fn handler_instance<E, H>(mut self, handler: Arc<H>) -> Self
    where
        E: Event,
        H: EventHandler<E>,
    {
        let registered = self.registry.register::<E, H>();
        if self.record(registered) {
            self.store.insert_instance(handler);
        }
        self
    }

    /// 设置构造处理器时使用的依赖解析器（默认为空的 `SingletonContainer`）
    pub fn resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.store.set_resolver(resolver);
        self
    }

    pub fn config(mut self, config: EventBusConfig) -> Self {
        self.config = config;
        self
    }

    /// 冻结注册表并构造总线
    pub fn build(self) -> BusResult<EventBus> {
        if let Some(err) = self.error {
            return Err(err);
        }

        if self.config.eager_construction {
            let order: Vec<TypeId> = self.registry.handler_types().collect();
            self.store.construct_all(order)?;
        }

        tracing::debug!(
            events = self.registry.event_names().len(),
            handlers = self.store.len(),
            "event bus built"
        );

        Ok(EventBus {
            dispatcher: Arc::new(Dispatcher::new(
                Arc::new(self.registry),
                Arc::new(self.store),
                self.config,
            )),
        })
    }

    fn record(&mut self, res: BusResult<()>) -> bool {
        match res {
            Ok(()) => true,
            Err(err) => {
                self.error.get_or_insert(err);
                false
            }
        }
    }
}
