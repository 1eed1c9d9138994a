//! 事件总线统一错误定义
//!
//! 覆盖注册阶段、单例构造与分发阶段的最小必要集合。
//! 处理器内部的业务错误以 `anyhow::Error` 表达，由分发器在 `WaitForAll`
//! 模式下汇总为 [`BusError::HandlersFailed`]。
//!
use std::fmt;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum BusError {
    // --- 分发 ---
    #[error("{} handler(s) failed for event={event}: {}", .failures.len(), summarize(.failures))]
    HandlersFailed {
        event: &'static str,
        failures: Vec<HandlerFailure>,
    },

    #[error("handler not found: {handler}")]
    HandlerNotFound { handler: &'static str },

    // --- 单例构造 ---
    #[error("handler construction failed: handler={handler}, reason={source}")]
    Construction {
        handler: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("unresolved dependency: {dependency}")]
    UnresolvedDependency { dependency: &'static str },

    // --- 注册 ---
    #[error("handler already registered: handler={handler}, event={event}")]
    AlreadyRegistered {
        handler: &'static str,
        event: &'static str,
    },

    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// 统一 Result 类型别名
pub type BusResult<T> = Result<T, BusError>;

/// 单个处理器调用的失败记录
#[derive(Debug)]
pub struct HandlerFailure {
    /// 处理器类型名
    pub handler: &'static str,
    pub error: anyhow::Error,
}

impl HandlerFailure {
    pub(crate) fn new(handler: &'static str, error: anyhow::Error) -> Self {
        Self { handler, error }
    }
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.handler, self.error)
    }
}

impl BusError {
    /// `HandlersFailed` 时返回失败列表，其余变体返回空切片
    pub fn failures(&self) -> &[HandlerFailure] {
        match self {
            BusError::HandlersFailed { failures, .. } => failures,
            _ => &[],
        }
    }
}

fn summarize(failures: &[HandlerFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handlers_failed_lists_every_failure() {
        let err = BusError::HandlersFailed {
            event: "OrderCreated",
            failures: vec![
                HandlerFailure::new("a::Audit", anyhow::anyhow!("disk full")),
                HandlerFailure::new("b::Mailer", anyhow::anyhow!("smtp down")),
            ],
        };

        let msg = err.to_string();
        assert!(msg.starts_with("2 handler(s) failed for event=OrderCreated"));
        assert!(msg.contains("a::Audit: disk full"));
        assert!(msg.contains("b::Mailer: smtp down"));
        assert_eq!(err.failures().len(), 2);
    }

    #[test]
    fn failures_is_empty_for_other_variants() {
        let err = BusError::UnresolvedDependency { dependency: "Db" };
        assert!(err.failures().is_empty());
        assert_eq!(err.to_string(), "unresolved dependency: Db");
    }
}
