//! Implementation of the `#[derive(ScriptEnum)]` macro.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

use crate::attrs::{TypeAttrs, VariantAttrs};

pub fn derive_enum_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_enum_inner(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_enum_inner(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let attrs = TypeAttrs::from_attrs(&input.attrs)?;
    let script_name = attrs.name.clone().unwrap_or_else(|| name.to_string());

    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(name, "derive(ScriptEnum) only supports enums"));
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "derive(ScriptEnum) does not support generic enums",
        ));
    }

    let mut entries = Vec::new();
    let mut arms = Vec::new();
    let mut fallback = None;

    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "derive(ScriptEnum) only supports fieldless variants",
            ));
        }
        let variant_attrs = VariantAttrs::from_attrs(&variant.attrs)?;
        let ident = &variant.ident;
        let value_name = variant_attrs.name.unwrap_or_else(|| ident.to_string());

        entries.push(quote! { (#value_name, #name::#ident as i64) });
        arms.push(quote! {
            v if v == #name::#ident as i64 => ::core::option::Option::Some(#name::#ident),
        });

        if variant_attrs.default {
            if fallback.is_some() {
                return Err(syn::Error::new_spanned(variant, "only one variant can be #[bind(default)]"));
            }
            fallback = Some(ident.clone());
        }
    }

    let fallback = match fallback.or_else(|| data.variants.first().map(|v| v.ident.clone())) {
        Some(ident) => ident,
        None => {
            return Err(syn::Error::new_spanned(
                name,
                "derive(ScriptEnum) needs at least one variant",
            ));
        }
    };

    Ok(quote! {
        impl ::scriptbind_core::ScriptEnum for #name {
            const NAME: &'static str = #script_name;

            fn variants() -> &'static [(&'static str, i64)] {
                const VARIANTS: &[(&str, i64)] = &[#(#entries),*];
                VARIANTS
            }

            fn from_discriminant(value: i64) -> ::core::option::Option<Self> {
                match value {
                    #(#arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn discriminant(self) -> i64 {
                self as i64
            }

            fn fallback() -> Self {
                #name::#fallback
            }
        }

        impl ::scriptbind_core::FromStack for #name {
            fn test(state: &::scriptbind_core::State, pos: usize) -> bool {
                ::scriptbind_core::test_enum::<Self>(state, pos)
            }

            fn get(state: &::scriptbind_core::State, pos: usize) -> Self {
                ::scriptbind_core::get_enum::<Self>(state, pos)
            }

            fn make_default() -> Self {
                <Self as ::scriptbind_core::ScriptEnum>::fallback()
            }
        }

        impl ::scriptbind_core::ToStack for #name {
            fn push(
                self,
                state: &mut ::scriptbind_core::State,
            ) -> ::core::result::Result<usize, ::scriptbind_core::ConversionError> {
                ::scriptbind_core::push_enum(self, state)
            }
        }
    })
}
