//! 发布等待模式（WaitMode）与发布结果（Delivery）
//!
use serde::{Deserialize, Serialize};
use std::fmt;

/// 发布方对处理器完成情况的等待策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitMode {
    /// 并发启动全部处理器，等待全部完成；任一失败则发布失败
    #[default]
    WaitForAll,
    /// 并发启动全部处理器，首个完成即返回；其余继续运行，失败不回传
    WaitForAny,
    /// 启动全部处理器后立即返回（fire-and-forget）
    WaitForNone,
}

impl WaitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitMode::WaitForAll => "wait_for_all",
            WaitMode::WaitForAny => "wait_for_any",
            WaitMode::WaitForNone => "wait_for_none",
        }
    }

    /// 该模式下处理器失败是否会回传给发布方
    pub fn surfaces_failures(&self) -> bool {
        matches!(self, WaitMode::WaitForAll)
    }
}

impl fmt::Display for WaitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次发布在返回时观察到的结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// 没有订阅者，视为成功的空操作
    NoHandlers,
    /// `WaitForAll`：全部处理器成功完成
    Completed { handlers: usize },
    /// `WaitForAny`：首个完成的处理器及其是否成功（仅供参考，不是错误）；
    /// `handlers` 为本次启动的处理器总数，其余的仍在后台运行
    FirstCompleted {
        handler: &'static str,
        succeeded: bool,
        handlers: usize,
    },
    /// `WaitForNone`：已启动但未等待的处理器数量
    Detached { handlers: usize },
}

impl Delivery {
    /// 本次发布启动的处理器数量
    pub fn started(&self) -> usize {
        match self {
            Delivery::NoHandlers => 0,
            Delivery::Completed { handlers }
            | Delivery::FirstCompleted { handlers, .. }
            | Delivery::Detached { handlers } => *handlers,
        }
    }
}
