//! 事件总线配置
//!
//! 可通过 `EventBusConfig::builder()` 链式构造，也可由宿主从 JSON/TOML 反序列化，
//! 缺省字段取默认值。
//!
use crate::mode::WaitMode;
use bon::Builder;
use serde::{Deserialize, Serialize};

/// 事件总线配置
#[derive(Builder, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    /// 未显式指定等待模式时使用的模式
    #[builder(default)]
    pub default_mode: WaitMode,
    /// 在 `build` 阶段立即构造全部惰性处理器（失败则 `build` 失败）
    #[builder(default = false)]
    pub eager_construction: bool,
    /// `WaitForAny`/`WaitForNone` 下被吞掉的处理器失败以 warn 级别记录；否则为 debug
    #[builder(default = true)]
    pub log_suppressed_failures: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            default_mode: WaitMode::WaitForAll,
            eager_construction: false,
            log_suppressed_failures: true,
        }
    }
}
