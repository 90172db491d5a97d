//! EnumBuilder for registering enums.
//!
//! Each value is bound twice: in the enum's read-only table and directly in
//! the enclosing namespace, so scripts can write both `Color.Red` and `Red`.
//!
//! # Example
//!
//! ```
//! use scriptbind_core::{State, Value};
//! use scriptbind_registry::Module;
//!
//! let mut state = State::new();
//! Module::new(&mut state)
//!     .enum_builder("Color")
//!     .value("Red", 0)?
//!     .value("Green", 1)?
//!     .build()?;
//! assert_eq!(state.global("Green"), Value::Integer(1));
//! # Ok::<(), scriptbind_core::RegistrationError>(())
//! ```

use std::rc::Rc;

use scriptbind_core::{ConflictPolicy, RegistrationError, TableKind, TableRef, Value};

use crate::module::bind_symbol;

/// Builder for registering an enum.
///
/// Created by calling `Module::enum_builder(name)`.
pub struct EnumBuilder {
    scope: TableRef,
    table: TableRef,
    name: String,
    policy: ConflictPolicy,
}

impl EnumBuilder {
    pub(crate) fn new(scope: TableRef, name: &str, policy: ConflictPolicy) -> Self {
        Self {
            scope,
            table: TableRef::new(TableKind::Enum { name: Rc::from(name) }),
            name: name.to_string(),
            policy,
        }
    }

    /// The enum's own table.
    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// Add a named value.
    pub fn value(self, name: &str, value: i64) -> Result<Self, RegistrationError> {
        bind_symbol(&self.table, name, Value::Integer(value), self.policy)?;
        bind_symbol(&self.scope, name, Value::Integer(value), self.policy)?;
        Ok(self)
    }

    /// Bind the enum table under the enum's name.
    pub fn build(self) -> Result<(), RegistrationError> {
        tracing::debug!(name = %self.name, values = self.table.len(), "enum bound");
        bind_symbol(&self.scope, &self.name, Value::Table(self.table), self.policy)
    }
}
