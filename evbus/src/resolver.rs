//! 依赖解析（DependencyResolver）
//!
//! 由外部容器提供的能力，用于在构造处理器单例时解析其依赖。
//! 内置的 [`SingletonContainer`] 是一个最小实现，仅保存进程级单例。
//!
use crate::error::{BusError, BusResult};
use dashmap::DashMap;
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

type SharedAny = Arc<dyn Any + Send + Sync>;

/// 依赖解析器：按类型返回单例依赖
pub trait DependencyResolver: Send + Sync {
    fn resolve_any(&self, type_id: TypeId) -> Option<SharedAny>;
}

impl dyn DependencyResolver + '_ {
    /// 按类型解析依赖，缺失时返回 `UnresolvedDependency`
    pub fn resolve<T>(&self) -> BusResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let Some(any) = self.resolve_any(TypeId::of::<T>()) else {
            return Err(BusError::UnresolvedDependency {
                dependency: type_name::<T>(),
            });
        };

        any.downcast::<T>().map_err(|_| BusError::TypeMismatch {
            expected: type_name::<T>(),
            found: "unknown",
        })
    }
}

/// 基于内存的单例容器
#[derive(Default)]
pub struct SingletonContainer {
    services: DashMap<TypeId, SharedAny>,
}

impl SingletonContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册（或替换）一个单例依赖
    pub fn insert<T>(&self, service: Arc<T>) -> &Self
    where
        T: Any + Send + Sync,
    {
        self.services.insert(TypeId::of::<T>(), service);
        self
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl DependencyResolver for SingletonContainer {
    fn resolve_any(&self, type_id: TypeId) -> Option<SharedAny> {
        self.services.get(&type_id).map(|s| s.value().clone())
    }
}

impl fmt::Debug for SingletonContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonContainer")
            .field("services", &self.services.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Clock(u64);

    #[test]
    fn resolves_inserted_singleton() {
        let container = SingletonContainer::new();
        let clock = Arc::new(Clock(7));
        container.insert(clock.clone());

        let resolver: &dyn DependencyResolver = &container;
        let got = resolver.resolve::<Clock>().unwrap();
        assert!(Arc::ptr_eq(&got, &clock));
        assert_eq!(got.0, 7);
        assert!(container.contains::<Clock>());
    }

    #[test]
    fn missing_dependency_is_reported_by_type_name() {
        let container = SingletonContainer::new();
        let resolver: &dyn DependencyResolver = &container;

        match resolver.resolve::<Clock>() {
            Err(BusError::UnresolvedDependency { dependency }) => {
                assert!(dependency.ends_with("Clock"))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
