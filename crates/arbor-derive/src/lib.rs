//! Proc-macro support for arbor components.
//!
//! `#[derive_component]` on an impl block registers the methods marked
//! `#[handler]` and `#[subcomponent]` in static capability tables, and
//! implements `arbor::component::Dispatch` over them.

use std::{collections::HashSet, result::Result as StdResult};

use convert_case::{Case, Casing};
use proc_macro_error::*;
use quote::quote;
use syn::{
    FnArg, GenericArgument, ImplItem, ImplItemFn, ItemImpl, LitStr, Meta, PathArguments,
    ReturnType, Type, parse_macro_input,
};

/// Local result type for macro parsing.
type Result<T> = StdResult<T, Error>;

/// Errors raised while parsing capability metadata.
#[derive(PartialEq, Eq, thiserror::Error, Debug, Clone)]
enum Error {
    /// Failed to parse an attribute payload.
    #[error("parse error: {0}")]
    Parse(String),
    /// Unsupported signature.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Two capabilities registered under one name.
    #[error("duplicate {kind} name {name:?}")]
    Duplicate {
        /// Handler or subcomponent.
        kind: &'static str,
        /// The repeated name.
        name: String,
    },
}

impl From<Error> for Diagnostic {
    fn from(e: Error) -> Self {
        Self::spanned(proc_macro2::Span::call_site(), Level::Error, format!("{e}"))
    }
}

/// The argument a handler method takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Param {
    /// No argument.
    None,
    /// `&Event`.
    Event,
    /// `&mut Canvas`.
    Canvas,
}

/// Parsed metadata for a `#[handler]` method.
#[derive(Debug, Clone)]
struct HandlerMeta {
    /// Method identifier.
    method: syn::Ident,
    /// Name markup refers to.
    name: String,
    /// Argument kind.
    param: Param,
    /// Does the method return a Result?
    is_result: bool,
}

/// Parsed metadata for a `#[subcomponent]` method.
#[derive(Debug, Clone)]
struct SubcomponentMeta {
    /// Method identifier.
    method: syn::Ident,
    /// Tag markup refers to.
    name: String,
}

/// Parse generated tokens into an impl item with context on failure.
fn parse_impl_item(tokens: proc_macro2::TokenStream, label: &str) -> syn::ImplItem {
    syn::parse2(tokens).unwrap_or_else(|err| abort_call_site!("{} parse failed: {}", label, err))
}

/// The name a method registers under: an explicit `name = "..."`, or the
/// PascalCase form of the method name.
fn registered_name(method: &ImplItemFn, attr: &str) -> Result<Option<String>> {
    let mut found = None;
    for a in &method.attrs {
        if !a.path().is_ident(attr) {
            continue;
        }
        let mut name = None;
        match &a.meta {
            Meta::Path(_) => {}
            Meta::List(_) => {
                a.parse_nested_meta(|meta| {
                    if meta.path.is_ident("name") {
                        let lit: LitStr = meta.value()?.parse()?;
                        name = Some(lit.value());
                        Ok(())
                    } else {
                        Err(syn::Error::new_spanned(
                            meta.path,
                            format!("unknown {attr} argument"),
                        ))
                    }
                })
                .map_err(|e| Error::Parse(e.to_string()))?;
            }
            Meta::NameValue(_) => {
                return Err(Error::Parse(format!("invalid {attr} argument")));
            }
        }
        found = Some(name.unwrap_or_else(|| method.sig.ident.to_string().to_case(Case::Pascal)));
    }
    Ok(found)
}

/// The last path segment of a type, if it is a path.
fn last_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(p) => p.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

/// Is this `Result<(), E>`, or a `Result<()>` alias?
fn is_unit_result(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    let Some(segment) = path.path.segments.last() else {
        return false;
    };
    if segment.ident != "Result" {
        return false;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return false;
    };
    matches!(
        args.args.first(),
        Some(GenericArgument::Type(Type::Tuple(t))) if t.elems.is_empty()
    )
}

/// Check the receiver and collect the typed arguments of a method.
fn typed_args<'a>(method: &'a ImplItemFn, what: &str) -> Result<Vec<&'a Type>> {
    let mut receiver = false;
    let mut args = Vec::new();
    for input in &method.sig.inputs {
        match input {
            FnArg::Receiver(r) => {
                if r.reference.is_none() {
                    return Err(Error::Unsupported(format!(
                        "{what} methods must take &self or &mut self"
                    )));
                }
                receiver = true;
            }
            FnArg::Typed(pat) => args.push(&*pat.ty),
        }
    }
    if !receiver {
        return Err(Error::Unsupported(format!(
            "{what} methods must take &self or &mut self"
        )));
    }
    Ok(args)
}

/// Parse an impl method annotated with `#[handler]`.
fn parse_handler(method: &ImplItemFn) -> Result<Option<HandlerMeta>> {
    let Some(name) = registered_name(method, "handler")? else {
        return Ok(None);
    };
    let args = typed_args(method, "handler")?;
    let param = match args.as_slice() {
        [] => Param::None,
        [Type::Reference(r)] => match (last_ident(&r.elem).as_deref(), r.mutability.is_some()) {
            (Some("Event"), false) => Param::Event,
            (Some("Canvas" | "RgbaImage"), true) => Param::Canvas,
            _ => {
                return Err(Error::Unsupported(
                    "handler arguments must be &Event or &mut Canvas".into(),
                ));
            }
        },
        _ => {
            return Err(Error::Unsupported(
                "handlers take at most one argument: &Event or &mut Canvas".into(),
            ));
        }
    };
    let is_result = match &method.sig.output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => match &**ty {
            Type::Tuple(t) if t.elems.is_empty() => false,
            ty if is_unit_result(ty) => true,
            _ => {
                return Err(Error::Unsupported(
                    "handlers must return () or Result<(), E>".into(),
                ));
            }
        },
    };
    Ok(Some(HandlerMeta {
        method: method.sig.ident.clone(),
        name,
        param,
        is_result,
    }))
}

/// Parse an impl method annotated with `#[subcomponent]`.
fn parse_subcomponent(method: &ImplItemFn) -> Result<Option<SubcomponentMeta>> {
    let Some(name) = registered_name(method, "subcomponent")? else {
        return Ok(None);
    };
    if !typed_args(method, "subcomponent")?.is_empty() {
        return Err(Error::Unsupported(
            "subcomponent methods take no arguments".into(),
        ));
    }
    if !name.starts_with(|c: char| c.is_uppercase()) {
        return Err(Error::Unsupported(format!(
            "subcomponent name {name:?} must start with an uppercase letter"
        )));
    }
    Ok(Some(SubcomponentMeta {
        method: method.sig.ident.clone(),
        name,
    }))
}

/// Reject repeated names.
fn check_unique<'a>(kind: &'static str, names: impl Iterator<Item = &'a String>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(Error::Duplicate {
                kind,
                name: name.clone(),
            });
        }
    }
    Ok(())
}

/// Generate the invoke function and spec const for a handler.
fn handler_items(h: &HandlerMeta) -> (Vec<syn::ImplItem>, syn::Ident) {
    let method = &h.method;
    let name = &h.name;
    let lower = method.to_string();
    let invoke_ident = syn::Ident::new(
        &format!("__arbor_handler_invoke_{lower}"),
        proc_macro2::Span::call_site(),
    );
    let spec_ident = syn::Ident::new(
        &format!("__ARBOR_HANDLER_{}", lower.to_uppercase()),
        proc_macro2::Span::call_site(),
    );

    let (param, call) = match h.param {
        Param::None => (
            quote! { arbor::component::HandlerParam::None },
            quote! { target.#method() },
        ),
        Param::Event => (
            quote! { arbor::component::HandlerParam::Event },
            quote! { target.#method(arg.event()?) },
        ),
        Param::Canvas => (
            quote! { arbor::component::HandlerParam::Canvas },
            quote! { target.#method(arg.canvas()?) },
        ),
    };
    let consume = if h.param == Param::None {
        quote! { let _ = arg; }
    } else {
        quote! {}
    };
    let body = if h.is_result {
        quote! {
            #call.map_err(|e| arbor::component::HandlerError::Exec(
                ::core::convert::Into::<arbor::anyhow::Error>::into(e),
            ))
        }
    } else {
        quote! {
            #call;
            Ok(())
        }
    };

    let invoke = quote! {
        fn #invoke_ident(
            target: &mut dyn ::std::any::Any,
            arg: arbor::component::HandlerArg<'_>,
        ) -> arbor::component::HandlerResult<()>
        where
            Self: 'static,
        {
            let target = target
                .downcast_mut::<Self>()
                .ok_or(arbor::component::HandlerError::TargetMismatch)?;
            #consume
            #body
        }
    };
    let spec = quote! {
        const #spec_ident: arbor::component::HandlerSpec = arbor::component::HandlerSpec {
            name: #name,
            param: #param,
            invoke: Self::#invoke_ident,
        };
    };
    (
        vec![
            parse_impl_item(invoke, "handler invoke fn"),
            parse_impl_item(spec, "handler spec const"),
        ],
        spec_ident,
    )
}

/// Generate the resolve function and spec const for a subcomponent.
fn subcomponent_items(s: &SubcomponentMeta) -> (Vec<syn::ImplItem>, syn::Ident) {
    let method = &s.method;
    let name = &s.name;
    let lower = method.to_string();
    let resolve_ident = syn::Ident::new(
        &format!("__arbor_sub_resolve_{lower}"),
        proc_macro2::Span::call_site(),
    );
    let spec_ident = syn::Ident::new(
        &format!("__ARBOR_SUB_{}", lower.to_uppercase()),
        proc_macro2::Span::call_site(),
    );
    let resolve = quote! {
        fn #resolve_ident(
            target: &dyn ::std::any::Any,
        ) -> arbor::component::HandlerResult<Option<arbor::component::Subcomponent>>
        where
            Self: 'static,
        {
            let target = target
                .downcast_ref::<Self>()
                .ok_or(arbor::component::HandlerError::TargetMismatch)?;
            arbor::component::IntoSubcomponent::into_subcomponent(target.#method())
        }
    };
    let spec = quote! {
        const #spec_ident: arbor::component::SubcomponentSpec =
            arbor::component::SubcomponentSpec {
                name: #name,
                resolve: Self::#resolve_ident,
            };
    };
    (
        vec![
            parse_impl_item(resolve, "subcomponent resolve fn"),
            parse_impl_item(spec, "subcomponent spec const"),
        ],
        spec_ident,
    )
}

/// Register `#[handler]` and `#[subcomponent]` methods in an impl block and
/// implement `arbor::component::Dispatch` for the type.
#[proc_macro_error]
#[proc_macro_attribute]
pub fn derive_component(
    _attr: proc_macro::TokenStream,
    input: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let mut input = parse_macro_input!(input as ItemImpl);
    let name = input.self_ty.clone();
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();

    let mut handlers = Vec::new();
    let mut subcomponents = Vec::new();
    for item in &input.items {
        if let ImplItem::Fn(method) = item {
            if let Some(h) = parse_handler(method).unwrap_or_abort() {
                handlers.push(h);
            }
            if let Some(s) = parse_subcomponent(method).unwrap_or_abort() {
                subcomponents.push(s);
            }
        }
    }
    check_unique("handler", handlers.iter().map(|h| &h.name)).unwrap_or_abort();
    check_unique("subcomponent", subcomponents.iter().map(|s| &s.name)).unwrap_or_abort();

    let mut generated_items: Vec<syn::ImplItem> = Vec::new();
    let mut handler_refs = Vec::new();
    for h in &handlers {
        let (items, spec) = handler_items(h);
        generated_items.extend(items);
        handler_refs.push(quote! { &Self::#spec });
    }
    let mut sub_refs = Vec::new();
    for s in &subcomponents {
        let (items, spec) = subcomponent_items(s);
        generated_items.extend(items);
        sub_refs.push(quote! { &Self::#spec });
    }

    let handlers_const = quote! {
        const __ARBOR_HANDLERS: &'static [&'static arbor::component::HandlerSpec] = &[
            #(#handler_refs),*
        ];
    };
    let subs_const = quote! {
        const __ARBOR_SUBCOMPONENTS: &'static [&'static arbor::component::SubcomponentSpec] = &[
            #(#sub_refs),*
        ];
    };
    generated_items.push(parse_impl_item(handlers_const, "handler list const"));
    generated_items.push(parse_impl_item(subs_const, "subcomponent list const"));
    input.items.extend(generated_items);

    let dispatch_impl = quote! {
        impl #impl_generics arbor::component::Dispatch for #name #where_clause {
            fn handlers(&self) -> &'static [&'static arbor::component::HandlerSpec] {
                Self::__ARBOR_HANDLERS
            }

            fn subcomponents(&self) -> &'static [&'static arbor::component::SubcomponentSpec] {
                Self::__ARBOR_SUBCOMPONENTS
            }
        }
    };

    let output = quote! {
        #input
        #dispatch_impl
    };
    output.into()
}

/// Mark a method as an event handler. This macro should be used to decorate
/// methods in an `impl` block that uses the `derive_component` macro.
#[proc_macro_attribute]
pub fn handler(
    _attr: proc_macro::TokenStream,
    input: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    input
}

/// Mark a method as a subcomponent capability. This macro should be used to
/// decorate methods in an `impl` block that uses the `derive_component`
/// macro.
#[proc_macro_attribute]
pub fn subcomponent(
    _attr: proc_macro::TokenStream,
    input: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    input
}
