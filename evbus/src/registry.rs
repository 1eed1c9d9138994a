//! 事件类型注册表（HandlerRegistry）
//!
//! 以事件的 `TypeId` 为键，保存按注册顺序排列的处理器条目。
//! 注册只发生在 [`EventBusBuilder`](crate::EventBusBuilder) 阶段；
//! `build` 之后注册表被冻结在 `Arc` 中，查找是纯读操作，无需加锁。
//!
use crate::{
    error::{BusError, BusResult},
    event::Event,
    handler::EventHandler,
};
use futures_util::future::BoxFuture;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub(crate) type SharedAny = Arc<dyn Any + Send + Sync>;

/// 类型擦除后的调用入口：(处理器实例, 事件, 取消信号) -> 处理结果
pub(crate) type InvokeFn = Arc<
    dyn Fn(SharedAny, SharedAny, CancellationToken) -> BoxFuture<'static, anyhow::Result<()>>
        + Send
        + Sync,
>;

/// 单个处理器的注册条目
#[derive(Clone)]
pub(crate) struct HandlerEntry {
    pub(crate) handler: &'static str,
    pub(crate) handler_type: TypeId,
    pub(crate) invoke: InvokeFn,
}

struct EventEntry {
    name: &'static str,
    handlers: Vec<HandlerEntry>,
}

#[derive(Default)]
pub(crate) struct HandlerRegistry {
    by_event: HashMap<TypeId, EventEntry>,
    // 事件类型的首次注册顺序，用于只读视图
    order: Vec<TypeId>,
}

impl HandlerRegistry {
    /// 注册处理器 `H` 订阅事件 `E`
    ///
    /// 一个处理器类型只能订阅一种事件，且只能注册一次。
    pub(crate) fn register<E, H>(&mut self) -> BusResult<()>
    where
        E: Event,
        H: EventHandler<E>,
    {
        let handler_type = TypeId::of::<H>();
        if self.contains_handler(handler_type) {
            return Err(BusError::AlreadyRegistered {
                handler: type_name::<H>(),
                event: E::NAME,
            });
        }

        let invoke: InvokeFn = Arc::new(
            |instance: SharedAny,
             event: SharedAny,
             cancel: CancellationToken|
             -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(async move {
                    // 正常情况下这里的 downcast 永远不会失败（键与闭包同一泛型 E/H）
                    let handler = instance
                        .downcast::<H>()
                        .map_err(|_| BusError::TypeMismatch {
                            expected: type_name::<H>(),
                            found: "unknown",
                        })?;
                    let event = event.downcast::<E>().map_err(|_| BusError::TypeMismatch {
                        expected: E::NAME,
                        found: "unknown",
                    })?;

                    handler.handle(&event, &cancel).await
                })
            },
        );

        let key = TypeId::of::<E>();
        if !self.by_event.contains_key(&key) {
            self.order.push(key);
        }

        self.by_event
            .entry(key)
            .or_insert_with(|| EventEntry {
                name: E::NAME,
                handlers: Vec::new(),
            })
            .handlers
            .push(HandlerEntry {
                handler: type_name::<H>(),
                handler_type,
                invoke,
            });

        Ok(())
    }

    /// 查找事件 `E` 的处理器，未注册时返回空切片
    pub(crate) fn lookup<E: Event>(&self) -> &[HandlerEntry] {
        self.by_event
            .get(&TypeId::of::<E>())
            .map(|e| e.handlers.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn contains_handler(&self, handler_type: TypeId) -> bool {
        self.by_event
            .values()
            .any(|e| e.handlers.iter().any(|h| h.handler_type == handler_type))
    }

    /// 已注册事件的稳定名称（按首次注册顺序）
    pub(crate) fn event_names(&self) -> Vec<&'static str> {
        self.order
            .iter()
            .filter_map(|k| self.by_event.get(k).map(|e| e.name))
            .collect()
    }

    pub(crate) fn handler_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.order
            .iter()
            .filter_map(|k| self.by_event.get(k))
            .flat_map(|e| e.handlers.iter().map(|h| h.handler_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Ping;
    impl Event for Ping {
        const NAME: &'static str = "Ping";
    }

    struct Pong;
    impl Event for Pong {
        const NAME: &'static str = "Pong";
    }

    #[derive(Default)]
    struct First {
        seen: Mutex<usize>,
    }
    struct Second;

    #[async_trait]
    impl EventHandler<Ping> for First {
        async fn handle(&self, _e: &Ping, _c: &CancellationToken) -> anyhow::Result<()> {
            *self.seen.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[async_trait]
    impl EventHandler<Ping> for Second {
        async fn handle(&self, _e: &Ping, _c: &CancellationToken) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl EventHandler<Pong> for Second {
        async fn handle(&self, _e: &Pong, _c: &CancellationToken) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn lookup_keeps_registration_order() {
        let mut reg = HandlerRegistry::default();
        reg.register::<Ping, Second>().unwrap();
        reg.register::<Ping, First>().unwrap();

        let names: Vec<_> = reg.lookup::<Ping>().iter().map(|h| h.handler).collect();
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("Second"));
        assert!(names[1].ends_with("First"));
    }

    #[test]
    fn lookup_of_unregistered_event_is_empty() {
        let reg = HandlerRegistry::default();
        assert!(reg.lookup::<Pong>().is_empty());
        assert!(reg.event_names().is_empty());
    }

    #[test]
    fn one_handler_type_subscribes_once() {
        let mut reg = HandlerRegistry::default();
        reg.register::<Ping, Second>().unwrap();

        let err = reg.register::<Pong, Second>().unwrap_err();
        match err {
            BusError::AlreadyRegistered { handler, event } => {
                assert!(handler.ends_with("Second"));
                assert_eq!(event, "Pong");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(reg.lookup::<Pong>().is_empty());
    }

    #[tokio::test]
    async fn erased_invoke_reaches_typed_handler() {
        let mut reg = HandlerRegistry::default();
        reg.register::<Ping, First>().unwrap();

        let instance = Arc::new(First::default());
        let erased: SharedAny = instance.clone();
        let entry = reg.lookup::<Ping>()[0].clone();
        (entry.invoke)(erased, Arc::new(Ping) as SharedAny, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(*instance.seen.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn erased_invoke_reports_type_mismatch() {
        let mut reg = HandlerRegistry::default();
        reg.register::<Ping, First>().unwrap();

        let entry = reg.lookup::<Ping>()[0].clone();
        let instance: SharedAny = Arc::new(First::default());
        let wrong_event: SharedAny = Arc::new(Pong);
        let err = (entry.invoke)(instance, wrong_event, CancellationToken::new())
            .await
            .unwrap_err();

        match err.downcast_ref::<BusError>() {
            Some(BusError::TypeMismatch { expected, .. }) => assert_eq!(*expected, "Ping"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
