//! Core types for the scriptbind binding bridge.
//!
//! This crate provides the foundational pieces shared by the registry,
//! the derive macros and the facade crate:
//!
//! - [`State`]: the runtime instance (evaluation stack, globals, class registry)
//! - [`Value`], [`TableRef`], [`Function`]: runtime values
//! - [`FromStack`], [`ToStack`]: the value conversion registry
//! - [`ObjectRef`], [`ObjRef`], [`StorageCategory`]: the object storage model
//! - [`Class`], [`ClassRegistry`]: class descriptors and multi-base resolution
//! - [`dispatch`]: member lookup on objects
//! - Error types for conversion, script calls and registration
//!
//! # Example
//!
//! ```
//! use scriptbind_core::{FromStack, State, ToStack};
//!
//! let mut state = State::new();
//! 42i32.push(&mut state).unwrap();
//! assert!(i32::test(&state, 1));
//! assert_eq!(i32::get(&state, 1), 42);
//! ```

mod class;
mod config;
mod convert;
mod error;
mod function;
mod hash;
mod object;
mod smart_ptr;
mod state;
mod table;
mod value;

pub use class::{
    BaseEntry, BaseLink, Class, ClassId, ClassMembers, ClassRegistry, FieldMeta, FieldReader,
    FieldWriter, MemberFlags, Resolution, TypeDescriptor, Upcast, WriterStatus, dispatch,
};
pub use config::{Config, ConflictPolicy};
pub use convert::{FromStack, Handle, ScriptEnum, ToStack, get_enum, push_enum, test_enum};
pub use error::{ConversionError, RegistrationError, ScriptError};
pub use function::{AsAny, Function, NativeCallable};
pub use hash::{NameHash, hash_constants};
pub use object::{
    ObjRef, ObjectRef, StorageCategory, Wrapper, copy_embedded, push_embedded, test_embedded,
};
pub use smart_ptr::{Intrusive, IntrusivePtr, RefCount};
pub use state::State;
pub use table::{Table, TableKind, TableRef};
pub use value::{Key, Value, ValueKind};
