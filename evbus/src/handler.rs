use crate::{event::Event, resolver::DependencyResolver};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// 事件处理器：处理某一类型的事件
///
/// 每个处理器类型在进程内只有一个实例，会被多个并发发布同时调用，
/// 因此处理器内不应持有“单次调用”的可变状态；需要共享状态时自行保证并发安全。
#[async_trait]
pub trait EventHandler<E>: Send + Sync + 'static
where
    E: Event,
{
    /// 处理事件
    ///
    /// - `event`：发布方传入的同一份事件值（只读共享）
    /// - `cancel`：本次发布的取消信号，处理器自行决定如何响应
    async fn handle(&self, event: &E, cancel: &CancellationToken) -> anyhow::Result<()>;
}

/// 由依赖解析器构造处理器单例
///
/// 仅允许解析进程级（单例兼容）的依赖；按请求作用域的依赖应在 `handle` 内部另行获取。
pub trait FromResolver: Sized {
    fn construct(resolver: &dyn DependencyResolver) -> anyhow::Result<Self>;
}
