//! 进程内事件总线（evbus）
//!
//! 应用代码发布强类型事件，独立注册的处理器在事件发布时被调用，
//! 使生产者与消费者在同一进程内解耦（不涉及网络传输与持久化）。
//!
//! 组成：
//! - 注册表（`registry`）：事件类型 -> 按注册顺序排列的处理器；
//! - 实例仓库（`store`）：每个处理器类型一个进程级单例，支持依赖解析与惰性构造；
//! - 分发器（`dispatcher`）：并发启动处理器，按 [`WaitMode`] 等待全部/首个/不等待；
//! - 发布门面（[`EventBus`]、[`publish`]、[`PublishExt`]）。
//!
//! 典型用法：
//! 1. 用 `#[derive(Event)]` 声明事件，为处理器实现 [`EventHandler`]；
//! 2. 在 [`EventBus::builder`] 上注册处理器（注册阶段之后不可再变更）；
//! 3. 通过 `bus.publish(event)` 或 `event.publish_to(&bus)` 发布。
//!
//! ```rust
//! use evbus::{Event, EventBus, EventHandler, WaitMode};
//! use std::sync::{Arc, Mutex};
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Event)]
//! struct OrderCreated {
//!     id: String,
//! }
//!
//! #[derive(Default)]
//! struct AuditLog(Mutex<Vec<String>>);
//!
//! #[async_trait::async_trait]
//! impl EventHandler<OrderCreated> for AuditLog {
//!     async fn handle(&self, e: &OrderCreated, _c: &CancellationToken) -> anyhow::Result<()> {
//!         self.0.lock().unwrap().push(e.id.clone());
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let log = Arc::new(AuditLog::default());
//! let bus = EventBus::builder()
//!     .handler_instance::<OrderCreated, _>(log.clone())
//!     .build()?;
//!
//! bus.publish_with(OrderCreated { id: "X1".into() }, WaitMode::WaitForAll).await?;
//! assert_eq!(*log.0.lock().unwrap(), vec!["X1".to_string()]);
//! # Ok(())
//! # }
//! ```
//!
pub mod bus;
pub mod config;
mod dispatcher;
pub mod error;
pub mod event;
pub mod handler;
pub mod mode;
pub mod publish;
mod registry;
pub mod resolver;
mod store;

pub use bus::{EventBus, EventBusBuilder};
pub use config::EventBusConfig;
pub use error::{BusError, BusResult, HandlerFailure};
pub use event::Event;
pub use handler::{EventHandler, FromResolver};
pub use mode::{Delivery, WaitMode};
pub use publish::{PublishExt, publish};
pub use resolver::{DependencyResolver, SingletonContainer};

#[cfg(feature = "derive")]
pub use evbus_macros::Event;

// 允许在本 crate 内部通过 ::evbus 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::evbus 路径。
extern crate self as evbus;
