//! 处理器实例仓库（HandlerStore）
//!
//! 每个处理器类型在进程生命周期内只持有一个实例：
//! - `handler_instance` 注册的实例在注册时即就绪；
//! - `handler` 注册的实例由 [`FromResolver`] 在首次需要时构造并缓存，
//!   并发的首次请求只会构造一次；构造失败不会被缓存，下次请求重新尝试。
//!
use crate::{
    error::{BusError, BusResult},
    handler::FromResolver,
    registry::SharedAny,
    resolver::{DependencyResolver, SingletonContainer},
};
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;

type Factory = Arc<dyn Fn(&dyn DependencyResolver) -> anyhow::Result<SharedAny> + Send + Sync>;

struct Slot {
    name: &'static str,
    cell: OnceCell<SharedAny>,
    factory: Option<Factory>,
}

pub(crate) struct HandlerStore {
    slots: HashMap<TypeId, Slot>,
    resolver: Arc<dyn DependencyResolver>,
}

impl Default for HandlerStore {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            resolver: Arc::new(SingletonContainer::new()),
        }
    }
}

impl HandlerStore {
    pub(crate) fn set_resolver(&mut self, resolver: Arc<dyn DependencyResolver>) {
        self.resolver = resolver;
    }

    /// 保存一个已经构造好的单例
    pub(crate) fn insert_instance<H>(&mut self, instance: Arc<H>)
    where
        H: Send + Sync + 'static,
    {
        self.slots.insert(
            TypeId::of::<H>(),
            Slot {
                name: type_name::<H>(),
                cell: OnceCell::new_with(Some(instance as SharedAny)),
                factory: None,
            },
        );
    }

    /// 登记一个惰性构造的单例
    pub(crate) fn insert_lazy<H>(&mut self)
    where
        H: FromResolver + Send + Sync + 'static,
    {
        let factory: Factory =
            Arc::new(|resolver: &dyn DependencyResolver| -> anyhow::Result<SharedAny> {
                let handler = H::construct(resolver)?;
                Ok(Arc::new(handler) as SharedAny)
            });

        self.slots.insert(
            TypeId::of::<H>(),
            Slot {
                name: type_name::<H>(),
                cell: OnceCell::new(),
                factory: Some(factory),
            },
        );
    }

    /// 返回处理器 `H` 的单例，必要时构造
    pub(crate) async fn instance<H>(&self) -> BusResult<Arc<H>>
    where
        H: Any + Send + Sync,
    {
        let any = self.instance_any(TypeId::of::<H>(), type_name::<H>()).await?;

        any.downcast::<H>().map_err(|_| BusError::TypeMismatch {
            expected: type_name::<H>(),
            found: "unknown",
        })
    }

    pub(crate) async fn instance_any(
        &self,
        handler_type: TypeId,
        handler: &'static str,
    ) -> BusResult<SharedAny> {
        let Some(slot) = self.slots.get(&handler_type) else {
            return Err(BusError::HandlerNotFound { handler });
        };

        let resolver = self.resolver.as_ref();
        slot.cell
            .get_or_try_init(|| async { Self::construct(slot, resolver) })
            .await
            .cloned()
    }

    /// 立即构造全部惰性单例（用于 `eager_construction`）
    pub(crate) fn construct_all(&self, order: impl IntoIterator<Item = TypeId>) -> BusResult<()> {
        for handler_type in order {
            let Some(slot) = self.slots.get(&handler_type) else {
                continue;
            };
            if slot.cell.initialized() {
                continue;
            }

            let instance = Self::construct(slot, self.resolver.as_ref())?;
            // 构造期间没有并发发布，set 失败只可能是同一槽位已被初始化
            let _ = slot.cell.set(instance);
        }

        Ok(())
    }

    fn construct(slot: &Slot, resolver: &dyn DependencyResolver) -> BusResult<SharedAny> {
        let Some(factory) = slot.factory.as_ref() else {
            return Err(BusError::HandlerNotFound { handler: slot.name });
        };

        tracing::debug!(handler = slot.name, "constructing handler singleton");
        factory(resolver).map_err(|source| BusError::Construction {
            handler: slot.name,
            source,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

impl fmt::Debug for HandlerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ready = self.slots.values().filter(|s| s.cell.initialized()).count();
        f.debug_struct("HandlerStore")
            .field("handlers", &self.slots.len())
            .field("constructed", &ready)
            .finish()
    }
}
