use proc_macro2::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Data, DeriveInput, Expr, Ident, LitStr, Result, Token, parse::Parse, parse::ParseStream,
};

/// #[derive(Event)] 宏实现
pub(crate) fn expand(input: DeriveInput) -> Result<TokenStream> {
    if let Data::Union(u) = &input.data {
        return Err(syn::Error::new(
            u.union_token.span(),
            "#[derive(Event)] only on struct or enum",
        ));
    }

    let cfg = EventAttrConfig::from_attrs(&input.attrs)?;

    let ident = &input.ident;
    let name = cfg
        .name
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
    // 泛型事件：把 trait 的超约束落到实现上，避免对任意 T 都要求 Send + Sync
    let mut generics = input.generics.clone();
    if !generics.params.is_empty() {
        let (_, ty_generics, _) = input.generics.split_for_impl();
        generics.make_where_clause().predicates.push(syn::parse_quote! {
            #ident #ty_generics: ::core::marker::Send + ::core::marker::Sync + 'static
        });
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::evbus::Event for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;
        }
    })
}

// 解析 #[event(name = "...")]，可出现多次但每个键只能出现一次
#[derive(Default)]
struct EventAttrConfig {
    name: Option<LitStr>,
}

impl EventAttrConfig {
    fn from_attrs(attrs: &[syn::Attribute]) -> Result<Self> {
        let mut cfg = Self::default();

        for attr in attrs.iter().filter(|a| a.path().is_ident("event")) {
            let pairs: Punctuated<EventAttrKv, Token![,]> =
                attr.parse_args_with(Punctuated::<EventAttrKv, Token![,]>::parse_terminated)?;

            for kv in pairs {
                match kv.key.to_string().as_str() {
                    "name" => {
                        if cfg.name.is_some() {
                            return Err(syn::Error::new(
                                kv.key.span(),
                                "duplicate key 'name' in attribute",
                            ));
                        }
                        let lit = match kv.value {
                            Expr::Lit(syn::ExprLit {
                                lit: syn::Lit::Str(lit),
                                ..
                            }) => lit,
                            other => {
                                return Err(syn::Error::new(
                                    other.span(),
                                    "expected string literal for 'name'",
                                ));
                            }
                        };
                        if lit.value().trim().is_empty() {
                            return Err(syn::Error::new(lit.span(), "'name' must not be empty"));
                        }
                        cfg.name = Some(lit);
                    }
                    _ => {
                        return Err(syn::Error::new(
                            kv.key.span(),
                            "unknown key; expected 'name'",
                        ));
                    }
                }
            }
        }

        Ok(cfg)
    }
}

struct EventAttrKv {
    key: Ident,
    #[allow(dead_code)]
    eq: Token![=],
    value: Expr,
}

impl Parse for EventAttrKv {
    fn parse(input: ParseStream) -> Result<Self> {
        Ok(Self {
            key: input.parse()?,
            eq: input.parse()?,
            value: input.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_str(src: &str) -> Result<String> {
        let input: DeriveInput = syn::parse_str(src)?;
        expand(input).map(|ts| ts.to_string())
    }

    #[test]
    fn name_defaults_to_type_ident() {
        let out = expand_str("struct OrderCreated { id: String }").unwrap();
        assert!(out.contains("\"OrderCreated\""));
        assert!(out.contains("Event for OrderCreated"));
    }

    #[test]
    fn name_can_be_overridden() {
        let out = expand_str(r#"#[event(name = "order.created")] struct OrderCreated;"#).unwrap();
        assert!(out.contains("\"order.created\""));
        assert!(!out.contains("\"OrderCreated\""));
    }

    #[test]
    fn generics_are_carried_over() {
        let out = expand_str("struct Changed<T: Clone> { value: T }").unwrap();
        assert!(out.contains("Event for Changed < T >"));
        assert!(out.contains("Changed < T > : :: core :: marker :: Send"));
    }

    #[test]
    fn rejects_duplicate_and_unknown_keys() {
        let dup = expand_str(r#"#[event(name = "a", name = "b")] struct E;"#).unwrap_err();
        assert!(dup.to_string().contains("duplicate key 'name'"));

        let unknown = expand_str(r#"#[event(version = 2)] struct E;"#).unwrap_err();
        assert!(unknown.to_string().contains("unknown key"));
    }

    #[test]
    fn rejects_unions_and_non_string_names() {
        let union = expand_str("union U { a: u32 }").unwrap_err();
        assert!(union.to_string().contains("only on struct or enum"));

        let int = expand_str("#[event(name = 3)] struct E;").unwrap_err();
        assert!(int.to_string().contains("expected string literal"));
    }
}
