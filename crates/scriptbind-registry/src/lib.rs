//! Registration of native functions, classes and enums.
//!
//! This crate turns typed Rust callables into script-callable overload sets
//! and fills the namespace, class and enum tables of a
//! [`State`](scriptbind_core::State):
//!
//! - [`Module`]: one namespace; functions, constants, nested namespaces
//! - [`ClassBuilder`]: constructors, member functions, properties, statics
//! - [`EnumBuilder`]: named integer values
//! - [`OverloadSet`]: ordered candidates with first-match resolution and
//!   trailing default arguments
//!
//! # Example
//!
//! ```
//! use scriptbind_core::{State, Value};
//! use scriptbind_registry::Module;
//!
//! let mut state = State::new();
//! Module::new(&mut state)
//!     .function("add", |a: i64, b: i64| a + b)?
//!     .function("add", |a: String, b: String| a + &b)?;
//!
//! let add = state.global("add");
//! let Value::Function(add) = add else { unreachable!() };
//! let results = state.invoke(&add, &[Value::Integer(2), Value::Integer(3)]).unwrap();
//! assert_eq!(results, vec![Value::Integer(5)]);
//! # Ok::<(), scriptbind_core::RegistrationError>(())
//! ```

mod class_builder;
mod enum_builder;
mod invoke;
mod module;
mod overload;

pub use class_builder::ClassBuilder;
pub use enum_builder::EnumBuilder;
pub use invoke::{IntoConstructor, IntoFunction, IntoMethod, Maker, Mut, Ref};
pub use module::Module;
pub use overload::{Binder, Candidate, Invoker, OverloadSet, ParamSpec, Site};
