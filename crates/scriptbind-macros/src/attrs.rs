//! Attribute parsing utilities for scriptbind macros.

use syn::{Attribute, LitStr};

/// Parsed `#[bind(...)]` attributes on a type.
#[derive(Debug, Default)]
pub struct TypeAttrs {
    /// Override name for scripts (default: Rust type name)
    pub name: Option<String>,
    /// Generate by-value `FromStack` (requires `Clone + Default`)
    pub value: bool,
}

/// Parsed `#[bind(...)]` attributes on a struct field.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// Field embeds a base class
    pub base: bool,
    /// Generate reader
    pub get: bool,
    /// Generate writer
    pub set: bool,
    /// Override symbol name
    pub name: Option<String>,
}

/// Parsed `#[bind(...)]` attributes on an enum variant.
#[derive(Debug, Default)]
pub struct VariantAttrs {
    /// Override value name
    pub name: Option<String>,
    /// Variant produced when an integer names no variant
    pub default: bool,
}

fn unknown(meta: &syn::meta::ParseNestedMeta<'_>, kind: &str) -> syn::Error {
    meta.error(format!(
        "unknown bind {} attribute: {}",
        kind,
        meta.path.get_ident().map(|i| i.to_string()).unwrap_or_default()
    ))
}

impl TypeAttrs {
    /// Parse attributes from a list of `#[bind(...)]` attributes.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("bind") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.name = Some(value.value());
                } else if meta.path.is_ident("value") {
                    result.value = true;
                } else {
                    return Err(unknown(&meta, "type"));
                }
                Ok(())
            })?;
        }

        Ok(result)
    }
}

impl FieldAttrs {
    /// Parse attributes from a list of `#[bind(...)]` attributes.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("bind") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("base") {
                    result.base = true;
                } else if meta.path.is_ident("get") {
                    result.get = true;
                } else if meta.path.is_ident("set") {
                    result.set = true;
                } else if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.name = Some(value.value());
                } else {
                    return Err(unknown(&meta, "field"));
                }
                Ok(())
            })?;

            if result.base && (result.get || result.set || result.name.is_some()) {
                return Err(syn::Error::new_spanned(
                    attr,
                    "a base field cannot also be a property",
                ));
            }
        }

        Ok(result)
    }
}

impl VariantAttrs {
    /// Parse attributes from a list of `#[bind(...)]` attributes.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("bind") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.name = Some(value.value());
                } else if meta.path.is_ident("default") {
                    result.default = true;
                } else {
                    return Err(unknown(&meta, "variant"));
                }
                Ok(())
            })?;
        }

        Ok(result)
    }
}
