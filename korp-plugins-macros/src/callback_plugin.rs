//! `#[callback_plugin]` expansion.
//!
//! Scans an inherent `impl` block for callback methods and generates the
//! `CallbackPlugin` implementation plus the inventory submission.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, Path, Token, Type,
    parse::{Parse, ParseStream},
};

/// Methods of `CallbackPlugin` itself; never callbacks.
const BASE_METHODS: &[&str] = &["applies_to", "create", "hook_methods"];

/// Arguments for the `#[callback_plugin]` macro.
pub(crate) struct PluginArgs {
    /// Explicit plugin name; defaults to the module name.
    pub plugin: Option<LitStr>,
    /// Constructor `fn(&PluginContext) -> Result<Self, E>`; defaults to `Default`.
    pub init: Option<Path>,
}

impl Parse for PluginArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut plugin = None;
        let mut init = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "plugin" => plugin = Some(input.parse()?),
                "init" => init = Some(input.parse()?),
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(PluginArgs { plugin, init })
    }
}

fn is_callback_name(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_lowercase) && !BASE_METHODS.contains(&name)
}

/// Whether the method takes `&self`.
fn takes_shared_self(method: &ImplItemFn) -> bool {
    matches!(
        method.sig.inputs.first(),
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none()
    )
}

/// One `HookMethod::new(..)` entry for a callback method.
///
/// Callbacks may take `()`, `(args)` or `(args, request)` after `&self`.
fn hook_method_entry(method: &ImplItemFn) -> syn::Result<TokenStream> {
    let ident = &method.sig.ident;
    let name = ident.to_string();
    let closure = match method.sig.inputs.len() - 1 {
        0 => quote! {
            |this, _, _| {
                ::korp_plugins::IntoCallbackResult::into_callback_result(this.#ident())
            }
        },
        1 => quote! {
            |this, args, _| {
                ::korp_plugins::IntoCallbackResult::into_callback_result(this.#ident(args))
            }
        },
        2 => quote! {
            |this, args, request| {
                let result = this.#ident(args, request);
                ::korp_plugins::IntoCallbackResult::into_callback_result(result)
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &method.sig.inputs,
                "callback methods take at most \
                 `(&self, args: &mut HookArgs, request: &dyn Request)`",
            ));
        }
    };
    Ok(quote! {
        ::korp_plugins::HookMethod::<Self>::new(#name, #closure)
    })
}

pub(crate) fn expand(args: PluginArgs, item: ItemImpl) -> syn::Result<TokenStream> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[callback_plugin] must be placed on an inherent impl block",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "callback plugins cannot be generic",
        ));
    }

    let self_ty: &Type = &item.self_ty;
    let mut entries = Vec::new();
    let mut has_applies_to = false;

    for impl_item in &item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        if !takes_shared_self(method) {
            continue;
        }
        let name = method.sig.ident.to_string();
        if name == "applies_to" {
            has_applies_to = true;
        } else if is_callback_name(&name) {
            entries.push(hook_method_entry(method)?);
        }
    }

    let create_body = match &args.init {
        Some(init) => quote! {
            #init(ctx).map_err(::core::convert::Into::into)
        },
        None => quote! {
            let _ = ctx;
            ::core::result::Result::Ok(<Self as ::core::default::Default>::default())
        },
    };

    let applies_to = has_applies_to.then(|| {
        quote! {
            fn applies_to(
                &self,
                request: &dyn ::korp_plugins::Request,
            ) -> ::core::result::Result<bool, ::korp_plugins::BoxError> {
                let applies = <#self_ty>::applies_to(self, request);
                ::korp_plugins::IntoApplicability::into_applicability(applies)
            }
        }
    });

    let plugin_name = match &args.plugin {
        Some(lit) => quote! { ::core::option::Option::Some(#lit) },
        None => quote! { ::core::option::Option::None },
    };

    Ok(quote! {
        #item

        impl ::korp_plugins::CallbackPlugin for #self_ty {
            fn create(
                ctx: &::korp_plugins::PluginContext<'_>,
            ) -> ::core::result::Result<Self, ::korp_plugins::BoxError> {
                #create_body
            }

            fn hook_methods() -> ::std::vec::Vec<::korp_plugins::HookMethod<Self>> {
                ::std::vec![#(#entries),*]
            }

            #applies_to
        }

        ::korp_plugins::inventory::submit! {
            ::korp_plugins::PluginDescriptor::new(
                ::core::module_path!(),
                #plugin_name,
                ::core::stringify!(#self_ty),
                ::core::line!(),
                ::korp_plugins::install_plugin::<#self_ty>,
            )
        }
    })
}
