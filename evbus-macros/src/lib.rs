use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod event;

/// 事件派生宏
/// - 为结构体/枚举实现 `::evbus::Event`，`NAME` 默认为类型名
/// - 支持参数：`#[event(name = "order.created")]` 覆写稳定名称
/// - 泛型参数原样带入实现，并追加 `Self: Send + Sync + 'static` 约束
#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    event::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
