/// 进程内事件（Event）
///
/// 描述“已经发生的事实”，发布后对所有处理器只读共享。
/// - 路由依据是事件的具体类型（`TypeId`），总线不关心载荷内容；
/// - 建议以过去式命名，如 `OrderCreated`、`UserRenamed`。
///
/// 关联常量：
/// - `NAME`：事件的稳定名称，用于日志与错误信息。避免依赖 `type_name::<T>()`。
///
/// 通常通过 `#[derive(Event)]` 实现，可用 `#[event(name = "...")]` 覆写名称。
pub trait Event: Send + Sync + 'static {
    /// 事件的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;
}
