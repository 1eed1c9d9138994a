//! 分发器（Dispatcher）
//!
//! 解析事件的处理器集合，按注册顺序依次启动调用，再按 [`WaitMode`] 决定等待多少：
//! - `WaitForAll`：等待全部完成，汇总全部失败；
//! - `WaitForAny`：首个完成即返回，其余继续运行，失败只记录日志；
//! - `WaitForNone`：启动后立即返回，失败只记录日志。
//!
//! 每个处理器调用先在发布方上下文中按注册顺序轮询一次（启动顺序与注册顺序一致），
//! 未完成的部分再作为独立任务交给 tokio 运行时（由 `TaskTracker` 跟踪），
//! 处理器 panic 不会波及发布方。
//!
use crate::{
    config::EventBusConfig,
    error::{BusError, BusResult, HandlerFailure},
    event::Event,
    mode::{Delivery, WaitMode},
    registry::{HandlerEntry, HandlerRegistry, SharedAny},
    store::HandlerStore,
};
use futures_util::{
    FutureExt, StreamExt,
    future::{self, BoxFuture, join_all},
    stream::FuturesUnordered,
};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::Poll;
use tokio::sync::Mutex;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::Instrument;

/// 已启动的调用：(处理器名, 剩余部分的完成结果)
type Invocation = (&'static str, BoxFuture<'static, anyhow::Result<()>>);

pub(crate) struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    store: Arc<HandlerStore>,
    tracker: TaskTracker,
    // 串行化 wait_idle 的 close/wait/reopen
    idle: Mutex<()>,
    config: EventBusConfig,
}

impl Dispatcher {
    pub(crate) fn new(
        registry: Arc<HandlerRegistry>,
        store: Arc<HandlerStore>,
        config: EventBusConfig,
    ) -> Self {
        Self {
            registry,
            store,
            tracker: TaskTracker::new(),
            idle: Mutex::new(()),
            config,
        }
    }

    pub(crate) fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub(crate) fn store(&self) -> &HandlerStore {
        &self.store
    }

    pub(crate) fn config(&self) -> &EventBusConfig {
        &self.config
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// 等待当前所有处理器任务（包括已脱离发布方的）结束
    ///
    /// 并发调用按到达顺序依次执行；等待期间新发布的调用同样会被等待。
    pub(crate) async fn wait_idle(&self) {
        let _guard = self.idle.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    pub(crate) async fn dispatch<E>(
        &self,
        event: E,
        mode: WaitMode,
        cancel: CancellationToken,
    ) -> BusResult<Delivery>
    where
        E: Event,
    {
        let handlers = self.registry.lookup::<E>();
        let span = tracing::debug_span!(
            "evbus.publish",
            event = E::NAME,
            mode = %mode,
            handlers = handlers.len(),
        );

        self.dispatch_inner(event, handlers, mode, cancel)
            .instrument(span)
            .await
    }

    async fn dispatch_inner<E>(
        &self,
        event: E,
        handlers: &[HandlerEntry],
        mode: WaitMode,
        cancel: CancellationToken,
    ) -> BusResult<Delivery>
    where
        E: Event,
    {
        if handlers.is_empty() {
            tracing::debug!("no handlers registered, nothing to do");
            return Ok(Delivery::NoHandlers);
        }

        // 先取齐全部单例：构造失败时一个处理器也不启动
        let mut instances = Vec::with_capacity(handlers.len());
        for entry in handlers {
            instances.push(
                self.store
                    .instance_any(entry.handler_type, entry.handler)
                    .await?,
            );
        }

        let event: SharedAny = Arc::new(event);
        let mut invocations: Vec<Invocation> = Vec::with_capacity(handlers.len());
        for (entry, instance) in handlers.iter().zip(instances) {
            invocations.push(
                self.start(entry, instance, event.clone(), &cancel, mode)
                    .await,
            );
        }

        match mode {
            WaitMode::WaitForAll => Self::wait_all::<E>(invocations).await,
            WaitMode::WaitForAny => Ok(Self::wait_any(invocations).await),
            WaitMode::WaitForNone => {
                tracing::debug!(detached = invocations.len(), "handlers detached");
                Ok(Delivery::Detached {
                    handlers: invocations.len(),
                })
            }
        }
    }

    /// 启动一次处理器调用
    ///
    /// 先在发布方上下文中轮询一次，使处理器按注册顺序开始执行；
    /// 首次轮询未完成的调用再交给运行时继续。
    async fn start(
        &self,
        entry: &HandlerEntry,
        instance: SharedAny,
        event: SharedAny,
        cancel: &CancellationToken,
        mode: WaitMode,
    ) -> Invocation {
        let handler = entry.handler;
        let fut = (entry.invoke)(instance, event, cancel.clone());
        let loud = self.config.log_suppressed_failures;

        let mut task = async move {
            let out = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(out) => out,
                Err(panic) => Err(anyhow::anyhow!("handler panicked: {}", panic_message(&*panic))),
            };

            match &out {
                Ok(()) => tracing::debug!("handler completed"),
                Err(err) if mode.surfaces_failures() => {
                    tracing::debug!(error = %format!("{err:#}"), "handler failed")
                }
                Err(err) if loud => {
                    tracing::warn!(error = %format!("{err:#}"), "handler failed, not reported to publisher")
                }
                Err(err) => {
                    tracing::debug!(error = %format!("{err:#}"), "handler failed, not reported to publisher")
                }
            }

            out
        }
        .instrument(tracing::debug_span!("evbus.handle", handler))
        .boxed();

        let first = futures_util::poll!(&mut task);
        let rest = match first {
            Poll::Ready(out) => future::ready(out).boxed(),
            Poll::Pending => self.tracker.spawn(task).map(flatten).boxed(),
        };

        (handler, rest)
    }

    async fn wait_all<E: Event>(invocations: Vec<Invocation>) -> BusResult<Delivery> {
        let total = invocations.len();
        let (names, pending): (Vec<_>, Vec<_>) = invocations.into_iter().unzip();

        let failures: Vec<HandlerFailure> = names
            .into_iter()
            .zip(join_all(pending).await)
            .filter_map(|(handler, out)| match out {
                Ok(()) => None,
                Err(error) => Some(HandlerFailure::new(handler, error)),
            })
            .collect();

        if failures.is_empty() {
            tracing::debug!(handlers = total, "all handlers completed");
            return Ok(Delivery::Completed { handlers: total });
        }

        Err(BusError::HandlersFailed {
            event: E::NAME,
            failures,
        })
    }

    async fn wait_any(invocations: Vec<Invocation>) -> Delivery {
        let total = invocations.len();
        let mut pending: FuturesUnordered<_> = invocations
            .into_iter()
            .map(|(handler, rest)| async move { (handler, rest.await) })
            .collect();

        // 剩余的 JoinHandle 随 `pending` 一起被丢弃，对应任务继续在运行时上执行
        match pending.next().await {
            Some((handler, result)) => {
                tracing::debug!(handler, succeeded = result.is_ok(), "first handler completed");
                Delivery::FirstCompleted {
                    handler,
                    succeeded: result.is_ok(),
                    handlers: total,
                }
            }
            None => Delivery::NoHandlers,
        }
    }
}

fn flatten(joined: Result<anyhow::Result<()>, tokio::task::JoinError>) -> anyhow::Result<()> {
    match joined {
        Ok(out) => out,
        Err(err) => Err(anyhow::anyhow!("handler task aborted: {err}")),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
