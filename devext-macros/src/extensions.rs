//! Extension-method macros.
//!
//! This module contains:
//! - `#[extensions]` - Attribute macro turning an inherent `impl` block into an
//!   `Extensible` implementation
//! - `#[hook(...)]` - Inner marker consumed by `#[extensions]`

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, quote};
use syn::{
    Attribute, FnArg, GenericArgument, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, Member,
    Path, PathArguments, ReturnType, Token, Type,
    ext::IdentExt,
    parse::{Parse, ParseStream},
    parse_macro_input,
};

/// Arguments for the `#[extensions]` macro.
struct ExtensionsArgs {
    /// Parent type whose methods are inherited.
    extends: Option<Path>,
    /// Field reaching the parent.
    via: Option<Member>,
    /// Submit the type for `inventory` collection.
    submit: bool,
}

impl Parse for ExtensionsArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut extends = None;
        let mut via = None;
        let mut submit = false;

        while !input.is_empty() {
            let ident: Ident = input.call(Ident::parse_any)?;

            match ident.to_string().as_str() {
                "extends" => {
                    input.parse::<Token![=]>()?;
                    extends = Some(input.parse()?);
                }
                "via" => {
                    input.parse::<Token![=]>()?;
                    via = Some(input.parse()?);
                }
                "submit" => submit = true,
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

        Ok(ExtensionsArgs {
            extends,
            via,
            submit,
        })
    }
}

/// Contents of a `#[hook(...)]` attribute.
enum HookArg {
    /// `#[hook("Name")]`
    Named(LitStr),
    /// `#[hook(inherit)]`: override keeping the ancestor's marker.
    Inherit,
}

impl Parse for HookArg {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(LitStr) {
            let name: LitStr = input.parse()?;
            if name.value().is_empty() {
                return Err(syn::Error::new(name.span(), "hook name must not be empty"));
            }
            return Ok(HookArg::Named(name));
        }

        let ident: Ident = input.parse()?;
        if ident == "inherit" {
            Ok(HookArg::Inherit)
        } else {
            Err(syn::Error::new(
                ident.span(),
                "expected a hook name string or `inherit`",
            ))
        }
    }
}

/// What a method gives back.
enum Returns {
    /// `()` or `Result<(), E>`.
    Outcome,
    /// `Self`.
    Subject,
    /// `Result<Self, E>`.
    TrySubject,
}

/// Implementation of the `#[extensions]` macro.
pub(crate) fn extensions_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ExtensionsArgs);
    let mut input = parse_macro_input!(item as ItemImpl);

    match expand(&args, &mut input) {
        Ok(tokens) => tokens.into(),
        Err(err) => {
            let err = err.to_compile_error();
            quote! {
                #input
                #err
            }
            .into()
        }
    }
}

fn expand(args: &ExtensionsArgs, input: &mut ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[extensions] must be placed on an inherent impl block",
        ));
    }

    let self_ty = input.self_ty.clone();
    let mut declarations = Vec::new();
    let mut errors: Option<syn::Error> = None;

    for item in &mut input.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        let hook = match take_hook_attr(&mut method.attrs) {
            Ok(Some(hook)) => hook,
            Ok(None) => continue,
            Err(err) => {
                push_error(&mut errors, err);
                continue;
            }
        };
        match declare_method(method, &hook, &self_ty) {
            Ok(tokens) => declarations.push(tokens),
            Err(err) => push_error(&mut errors, err),
        }
    }

    if let Some(err) = errors {
        return Err(err);
    }

    let parent = match (&args.extends, &args.via) {
        (Some(parent), Some(via)) => quote! {
            ty.inherits::<#parent>(|__this: &mut Self| &mut __this.#via);
        },
        (Some(parent), None) => {
            return Err(syn::Error::new_spanned(
                parent,
                "`extends` requires `via = field` naming the parent field",
            ));
        }
        (None, Some(via)) => {
            return Err(syn::Error::new_spanned(via, "`via` requires `extends = Parent`"));
        }
        (None, None) => quote! {},
    };

    let submit = if args.submit {
        if !input.generics.params.is_empty() {
            return Err(syn::Error::new_spanned(
                &input.generics,
                "generic types cannot be submitted for collection",
            ));
        }
        quote! {
            ::devext::inventory::submit! {
                ::devext::TypeRegistration::of::<#self_ty>()
            }
        }
    } else {
        quote! {}
    };

    let (impl_generics, _, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #input

        impl #impl_generics ::devext::Extensible for #self_ty #where_clause {
            fn declare(ty: &mut ::devext::TypeBuilder<Self>) {
                #parent
                #(#declarations)*
            }
        }

        #submit
    })
}

fn push_error(errors: &mut Option<syn::Error>, err: syn::Error) {
    match errors {
        Some(existing) => existing.combine(err),
        None => *errors = Some(err),
    }
}

/// Remove the `#[hook]` attribute from a method, parsing it.
fn take_hook_attr(attrs: &mut Vec<Attribute>) -> syn::Result<Option<HookArg>> {
    let mut found: Vec<Attribute> = Vec::new();
    attrs.retain(|attr| {
        if attr.path().is_ident("hook") {
            found.push(attr.clone());
            false
        } else {
            true
        }
    });

    match found.as_slice() {
        [] => Ok(None),
        [attr] => attr.parse_args::<HookArg>().map(Some),
        [_, second, ..] => Err(syn::Error::new_spanned(
            second,
            "a method can extend at most one hook",
        )),
    }
}

fn declare_method(method: &ImplItemFn, hook: &HookArg, self_ty: &Type) -> syn::Result<TokenStream2> {
    let sig = &method.sig;
    let fn_name = &sig.ident;
    let method_name = LitStr::new(&fn_name.unraw().to_string(), fn_name.span());

    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            sig.asyncness,
            "extension methods cannot be async",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "extension methods cannot be generic",
        ));
    }

    let mut inputs = sig.inputs.iter().peekable();
    let is_instance = match inputs.peek() {
        Some(FnArg::Receiver(receiver)) => {
            if receiver.reference.is_none() {
                return Err(syn::Error::new_spanned(
                    receiver,
                    "extension methods take `&self` or `&mut self`",
                ));
            }
            inputs.next();
            true
        }
        _ => false,
    };

    let mut arg_types = Vec::new();
    let mut arg_exprs = Vec::new();
    for (i, arg) in inputs.enumerate() {
        let FnArg::Typed(pat_type) = arg else {
            return Err(syn::Error::new_spanned(arg, "unexpected receiver"));
        };
        let index = syn::Index::from(i);
        match &*pat_type.ty {
            Type::Reference(reference) if reference.mutability.is_some() => {
                return Err(syn::Error::new_spanned(
                    reference,
                    "hook arguments are shared; take `&T` or an owned `T`",
                ));
            }
            Type::Reference(reference) => {
                arg_types.push(owned_argument(&reference.elem));
                arg_exprs.push(quote! { &__args.#index });
            }
            ty => {
                arg_types.push(ty.to_token_stream());
                arg_exprs.push(quote! { ::core::clone::Clone::clone(&__args.#index) });
            }
        }
    }
    let args_ty = quote! { ( #(#arg_types,)* ) };

    let returns = classify(&sig.output, self_ty);
    let hook_name = match hook {
        HookArg::Named(name) => Some(name),
        HookArg::Inherit => None,
    };

    // Methods without parameters never read the argument tuple.
    let args_pat = if arg_exprs.is_empty() {
        quote! { _ }
    } else {
        quote! { __args }
    };
    let instance_fn = quote! {
        |__this: &mut Self, #args_pat: &#args_ty| Self::#fn_name(__this, #(#arg_exprs),*)
    };

    let tokens = match (is_instance, returns, hook_name) {
        (true, Returns::Outcome, Some(hook)) => quote! {
            ty.method(#method_name, #hook, #instance_fn);
        },
        (true, Returns::Outcome, None) => quote! {
            ty.override_method(#method_name, #instance_fn);
        },
        (true, Returns::Subject, Some(hook)) => quote! {
            ty.transform(#method_name, #hook, #instance_fn);
        },
        (true, Returns::Subject, None) => quote! {
            ty.override_transform(#method_name, #instance_fn);
        },
        (true, Returns::TrySubject, Some(hook)) => quote! {
            ty.try_transform(#method_name, #hook, #instance_fn);
        },
        (true, Returns::TrySubject, None) => quote! {
            ty.override_try_transform(#method_name, #instance_fn);
        },
        (false, Returns::Outcome, Some(hook)) => quote! {
            ty.static_method(#method_name, #hook, |#args_pat: &#args_ty| {
                Self::#fn_name(#(#arg_exprs),*)
            });
        },
        (false, Returns::Outcome, None) => {
            return Err(syn::Error::new_spanned(
                fn_name,
                "static methods are not inherited; `inherit` needs a receiver",
            ));
        }
        (false, Returns::Subject | Returns::TrySubject, _) => {
            return Err(syn::Error::new_spanned(
                fn_name,
                "pipeline steps need a `&self` or `&mut self` receiver",
            ));
        }
    };

    Ok(tokens)
}

/// The type stored in the argument tuple for a `&T` parameter.
fn owned_argument(elem: &Type) -> TokenStream2 {
    match elem {
        Type::Path(path) if path.qself.is_none() && path.path.is_ident("str") => {
            quote! { ::std::string::String }
        }
        Type::Slice(slice) => {
            let inner = &slice.elem;
            quote! { ::std::vec::Vec<#inner> }
        }
        other => other.to_token_stream(),
    }
}

fn classify(output: &ReturnType, self_ty: &Type) -> Returns {
    let ReturnType::Type(_, ty) = output else {
        return Returns::Outcome;
    };
    if is_self(ty, self_ty) {
        return Returns::Subject;
    }
    if let Type::Path(path) = &**ty {
        if let Some(last) = path.path.segments.last() {
            if last.ident == "Result" {
                if let PathArguments::AngleBracketed(generics) = &last.arguments {
                    if let Some(GenericArgument::Type(ok)) = generics.args.first() {
                        if is_self(ok, self_ty) {
                            return Returns::TrySubject;
                        }
                    }
                }
            }
        }
    }
    Returns::Outcome
}

fn is_self(ty: &Type, self_ty: &Type) -> bool {
    match ty {
        Type::Path(path) if path.qself.is_none() && path.path.is_ident("Self") => true,
        _ => ty.to_token_stream().to_string() == self_ty.to_token_stream().to_string(),
    }
}
