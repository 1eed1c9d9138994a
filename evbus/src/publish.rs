//! 发布门面（Publish Facade）
//!
//! 除 [`EventBus::publish`] 外，提供两种等价写法：
//! - 自由函数 [`publish`]；
//! - 对所有事件类型自动实现的 [`PublishExt`]，可写作 `event.publish_to(&bus)`。
//!
use crate::{
    bus::EventBus,
    error::BusResult,
    event::Event,
    mode::{Delivery, WaitMode},
};
use async_trait::async_trait;

/// 以指定模式发布事件，等价于 `bus.publish_with(event, mode)`
pub async fn publish<E: Event>(bus: &EventBus, event: E, mode: WaitMode) -> BusResult<Delivery> {
    bus.publish_with(event, mode).await
}

/// 事件侧的发布能力
#[async_trait]
pub trait PublishExt: Event + Sized {
    /// 以总线配置的默认模式发布
    async fn publish_to(self, bus: &EventBus) -> BusResult<Delivery>;

    async fn publish_to_with(self, bus: &EventBus, mode: WaitMode) -> BusResult<Delivery>;
}

#[async_trait]
impl<E: Event> PublishExt for E {
    async fn publish_to(self, bus: &EventBus) -> BusResult<Delivery> {
        bus.publish(self).await
    }

    async fn publish_to_with(self, bus: &EventBus, mode: WaitMode) -> BusResult<Delivery> {
        bus.publish_with(self, mode).await
    }
}
