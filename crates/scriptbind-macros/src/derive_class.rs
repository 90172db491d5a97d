//! Implementation of the `#[derive(Class)]` macro.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

use crate::attrs::{FieldAttrs, TypeAttrs};

pub fn derive_class_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_class_inner(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_class_inner(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let attrs = TypeAttrs::from_attrs(&input.attrs)?;
    let script_name = attrs.name.clone().unwrap_or_else(|| name.to_string());

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            name,
            "derive(Class) only supports structs; use derive(ScriptEnum) for enums",
        ));
    };

    let (bases, fields) = collect_members(name, &data.fields)?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let from_stack = if attrs.value {
        quote! {
            impl #impl_generics ::scriptbind_core::FromStack for #name #ty_generics #where_clause {
                fn test(state: &::scriptbind_core::State, pos: usize) -> bool {
                    ::scriptbind_core::test_embedded::<Self>(state, pos)
                }

                fn get(state: &::scriptbind_core::State, pos: usize) -> Self {
                    ::scriptbind_core::copy_embedded::<Self>(state, pos)
                }

                fn make_default() -> Self {
                    <Self as ::core::default::Default>::default()
                }
            }
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics ::scriptbind_core::Class for #name #ty_generics #where_clause {
            const NAME: &'static str = #script_name;

            fn bases() -> ::std::vec::Vec<::scriptbind_core::BaseLink> {
                ::std::vec![#(#bases),*]
            }

            fn fields() -> ::std::vec::Vec<::scriptbind_core::FieldMeta<Self>> {
                ::std::vec![#(#fields),*]
            }
        }

        impl #impl_generics ::scriptbind_core::ToStack for #name #ty_generics #where_clause {
            fn push(
                self,
                state: &mut ::scriptbind_core::State,
            ) -> ::core::result::Result<usize, ::scriptbind_core::ConversionError> {
                ::scriptbind_core::push_embedded(self, state)
            }
        }

        #from_stack
    })
}

/// Collect base links and field hooks from struct fields.
fn collect_members(
    name: &syn::Ident,
    fields: &Fields,
) -> syn::Result<(Vec<TokenStream2>, Vec<TokenStream2>)> {
    let mut bases = Vec::new();
    let mut metas = Vec::new();

    let Fields::Named(fields) = fields else {
        // Tuple and unit structs expose neither bases nor fields
        for field in fields {
            let field_attrs = FieldAttrs::from_attrs(&field.attrs)?;
            if field_attrs.base || field_attrs.get || field_attrs.set {
                return Err(syn::Error::new_spanned(
                    field,
                    "bind field attributes need named fields",
                ));
            }
        }
        return Ok((bases, metas));
    };

    for field in &fields.named {
        let field_attrs = FieldAttrs::from_attrs(&field.attrs)?;
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let field_ty = &field.ty;

        if field_attrs.base {
            bases.push(quote! {
                ::scriptbind_core::BaseLink::new::<#name, #field_ty>(
                    ::core::mem::offset_of!(#name, #field_name),
                    |this| &this.#field_name,
                    |this| &mut this.#field_name,
                )
            });
            continue;
        }

        if !field_attrs.get && !field_attrs.set {
            continue;
        }

        let symbol = field_attrs
            .name
            .clone()
            .unwrap_or_else(|| field_name.to_string());

        let reader = field_attrs.get.then(|| {
            quote! {
                .with_reader(|this: &Self, state| {
                    ::scriptbind_core::ToStack::push(
                        ::core::clone::Clone::clone(&this.#field_name),
                        state,
                    )
                })
            }
        });

        let writer = field_attrs.set.then(|| {
            quote! {
                .with_writer(|this: &mut Self, state, pos| {
                    if !<#field_ty as ::scriptbind_core::FromStack>::test(state, pos) {
                        return ::scriptbind_core::WriterStatus::TypeFailed;
                    }
                    this.#field_name = <#field_ty as ::scriptbind_core::FromStack>::get(state, pos);
                    ::scriptbind_core::WriterStatus::Succeeded
                })
            }
        });

        metas.push(quote! {
            ::scriptbind_core::FieldMeta::new(#symbol) #reader #writer
        });
    }

    Ok((bases, metas))
}
