//! scriptbind Proc Macros
//!
//! This crate provides derive macros that make native types bindable.
//!
//! # Macros
//!
//! - `#[derive(Class)]` - Implement `Class` and `ToStack` for a struct
//! - `#[derive(ScriptEnum)]` - Implement `ScriptEnum` and the stack
//!   conversions for a fieldless enum
//!
//! # Example
//!
//! ```ignore
//! use scriptbind_macros::Class;
//!
//! #[derive(Class, Clone, Default)]
//! #[bind(name = "Player", value)]
//! pub struct Player {
//!     #[bind(base)]
//!     pub entity: Entity,
//!     #[bind(get, set)]
//!     pub health: i32,
//! }
//! ```

use proc_macro::TokenStream;

mod attrs;
mod derive_class;
mod derive_enum;

/// Derive the `Class` trait for a struct.
///
/// The generated code implements `Class` (name, bases, field hooks) and
/// `ToStack`, which pushes the value as an embedded object.
///
/// # Attributes
///
/// - `#[bind(name = "...")]` - Override the script class name
/// - `#[bind(value)]` - Also implement `FromStack` by copy; the type must be
///   `Clone + Default`
///
/// # Field Attributes
///
/// - `#[bind(base)]` - The field embeds a base class (multiple allowed)
/// - `#[bind(get)]` - Generate a reader (the field type must be `Clone + ToStack`)
/// - `#[bind(set)]` - Generate a type-checked writer (`FromStack`)
/// - `#[bind(name = "...")]` - Override the symbol name
///
/// # Example
///
/// ```ignore
/// #[derive(Class)]
/// struct Derived {
///     #[bind(base)]
///     first: First,
///     #[bind(base)]
///     second: Second,
///     #[bind(get, set, name = "count")]
///     internal_count: i32,
/// }
/// ```
#[proc_macro_derive(Class, attributes(bind))]
pub fn derive_class(input: TokenStream) -> TokenStream {
    derive_class::derive_class_impl(input)
}

/// Derive the `ScriptEnum` trait for a fieldless enum.
///
/// Variants are encoded as their integer discriminants. An integer naming
/// no variant fails `test`.
///
/// # Attributes
///
/// - `#[bind(name = "...")]` - Override the script enum name
///
/// # Variant Attributes
///
/// - `#[bind(name = "...")]` - Override the value name
/// - `#[bind(default)]` - Variant returned by `make_default` (default: the
///   first variant)
///
/// # Example
///
/// ```ignore
/// #[derive(ScriptEnum, Clone, Copy)]
/// enum Color {
///     Red = 1,
///     #[bind(default)]
///     Green,
///     #[bind(name = "BLUE")]
///     Blue = 10,
/// }
/// ```
#[proc_macro_derive(ScriptEnum, attributes(bind))]
pub fn derive_script_enum(input: TokenStream) -> TokenStream {
    derive_enum::derive_enum_impl(input)
}
