//! scriptbind: bind native Rust types and functions into an embedded
//! scripting runtime.
//!
//! The facade re-exports the runtime collaborator and conversion traits
//! from `scriptbind-core`, the enrollment DSL from `scriptbind-registry`
//! and the derive macros, and adds [`call_function`] for calling script
//! values by dotted path.
//!
//! # Example
//!
//! ```
//! use scriptbind::prelude::*;
//!
//! #[derive(Class, Clone, Default)]
//! #[bind(value)]
//! struct Vec2 {
//!     #[bind(get, set)]
//!     x: f64,
//!     #[bind(get, set)]
//!     y: f64,
//! }
//!
//! let mut state = State::new();
//! let mut module = Module::new(&mut state);
//! module
//!     .class::<Vec2>()
//!     .constructor(|x: f64, y: f64| Vec2 { x, y })?
//!     .method("length", |v: &Vec2| (v.x * v.x + v.y * v.y).sqrt())?
//!     .build()?;
//! module.function("dot", |a: Vec2, b: Vec2| a.x * b.x + a.y * b.y)?;
//!
//! let a = call_function::<Value, _>(&mut state, "Vec2", (3.0f64, 4.0f64)).unwrap();
//! let length: f64 = call_method(&mut state, &a, "length", ()).unwrap();
//! assert_eq!(length, 5.0);
//! # Ok::<(), RegistrationError>(())
//! ```

mod call;

pub use call::{CallError, call_function, call_function_or_default, call_method};

pub use scriptbind_core;
pub use scriptbind_registry;

pub use scriptbind_macros::{Class, ScriptEnum};

// Re-export main types
pub mod prelude {
    pub use crate::call::{CallError, call_function, call_function_or_default, call_method};
    pub use scriptbind_core::{
        Class, ConflictPolicy, Config, ConversionError, FromStack, Function, Handle, Intrusive,
        IntrusivePtr, ObjRef, ObjectRef, RefCount, RegistrationError, ScriptEnum, ScriptError,
        State, StorageCategory, TableKind, TableRef, ToStack, Value, ValueKind, WriterStatus,
    };
    pub use scriptbind_macros::{Class, ScriptEnum};
    pub use scriptbind_registry::{ClassBuilder, EnumBuilder, Module};
}
