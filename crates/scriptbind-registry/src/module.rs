//! Namespace-level registration.
//!
//! A [`Module`] registers symbols into one namespace table of a [`State`]:
//! the global table, or a nested namespace created with
//! [`Module::namespace`]. Registered symbols go to the table's bound layer,
//! so later script assignments cannot overwrite them.
//!
//! # Example
//!
//! ```
//! use scriptbind_core::State;
//! use scriptbind_registry::Module;
//!
//! let mut state = State::new();
//! let mut module = Module::new(&mut state);
//! module
//!     .function("add", |a: i64, b: i64| a + b)?
//!     .function_with("scale", |a: f64, factor: f64| a * factor, (2.0f64,))?;
//! module.namespace("math")?.function("neg", |a: i64| -a)?;
//! # Ok::<(), scriptbind_core::RegistrationError>(())
//! ```

use scriptbind_core::{
    Class, ConflictPolicy, ConversionError, Function, Key, RegistrationError, ScriptEnum,
    ScriptError, State, TableKind, TableRef, ToStack, Value,
};

use crate::class_builder::ClassBuilder;
use crate::enum_builder::EnumBuilder;
use crate::invoke::IntoFunction;
use crate::overload::{Binder, Candidate, OverloadSet, Site};

/// Registration handle for one namespace.
pub struct Module<'s> {
    state: &'s mut State,
    table: TableRef,
    path: String,
}

impl<'s> Module<'s> {
    /// Register into the global namespace.
    pub fn new(state: &'s mut State) -> Self {
        let table = state.globals().clone();
        Self {
            state,
            table,
            path: String::new(),
        }
    }

    /// The namespace table being populated.
    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn state(&mut self) -> &mut State {
        self.state
    }

    /// Dotted path of this namespace; empty for the global one.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn qualified(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path, name)
        }
    }

    fn policy(&self) -> ConflictPolicy {
        self.state.config().name_conflict
    }

    /// Open (creating if needed) a nested namespace.
    pub fn namespace(&mut self, name: &str) -> Result<Module<'_>, RegistrationError> {
        let key = Key::from(name);
        let table = match self.table.get_bound(&key) {
            Some(Value::Table(table)) if table.kind() == TableKind::Namespace => table,
            Some(_) => {
                return Err(RegistrationError::NameConflict {
                    name: self.qualified(name),
                });
            }
            None => {
                let table = TableRef::namespace();
                self.table.bind(key, Value::Table(table.clone()));
                table
            }
        };
        let path = self.qualified(name);
        Ok(Module {
            state: &mut *self.state,
            table,
            path,
        })
    }

    /// Register a function, or append an overload to an existing one.
    pub fn function<F, Args, R>(&mut self, name: &str, f: F) -> Result<&mut Self, RegistrationError>
    where
        F: IntoFunction<Args, R>,
    {
        let qualified = self.qualified(name);
        let candidate = Candidate::new(Binder::new(F::params()), f.into_invoker());
        add_overload(&self.table, name, Site::function(&qualified), candidate, self.policy())?;
        Ok(self)
    }

    /// Register a function whose trailing parameters have defaults.
    pub fn function_with<F, Args, R, D>(
        &mut self,
        name: &str,
        f: F,
        defaults: D,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: IntoFunction<Args, R>,
        D: ToStack,
    {
        let qualified = self.qualified(name);
        let binder = Binder::new(F::params()).with_defaults(self.state, &qualified, defaults)?;
        let candidate = Candidate::new(binder, f.into_invoker());
        add_overload(&self.table, name, Site::function(&qualified), candidate, self.policy())?;
        Ok(self)
    }

    /// Register a function that reads and pushes stack values itself.
    ///
    /// Raw functions are not overloadable.
    pub fn function_raw<F>(&mut self, name: &str, f: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut State) -> Result<usize, ScriptError> + 'static,
    {
        let function = Function::new(self.qualified(name), f);
        bind_symbol(&self.table, name, Value::Function(function), self.policy())?;
        Ok(self)
    }

    /// Bind a constant value.
    pub fn constant(&mut self, name: &str, value: impl ToStack) -> Result<&mut Self, RegistrationError> {
        let qualified = self.qualified(name);
        let value = encode_value(self.state, &qualified, value)?;
        bind_symbol(&self.table, name, value, self.policy())?;
        Ok(self)
    }

    /// Start registering class `T` in this namespace.
    pub fn class<T: Class>(&mut self) -> ClassBuilder<'_, T> {
        let policy = self.policy();
        let scope = self.table.clone();
        ClassBuilder::new(&mut *self.state, scope, policy)
    }

    /// Start registering an enum by hand.
    pub fn enum_builder(&mut self, name: &str) -> EnumBuilder {
        EnumBuilder::new(self.table.clone(), name, self.policy())
    }

    /// Register a derived enum and all of its variants.
    pub fn enumeration<E: ScriptEnum>(&mut self) -> Result<&mut Self, RegistrationError> {
        let mut builder = self.enum_builder(E::NAME);
        for (name, value) in E::variants() {
            builder = builder.value(name, *value)?;
        }
        builder.build()?;
        Ok(self)
    }
}

pub(crate) fn conflict(name: &str, policy: ConflictPolicy) -> Result<(), RegistrationError> {
    match policy {
        ConflictPolicy::Warn => {
            tracing::warn!(name, "name conflict: symbol already registered, keeping the first");
            Ok(())
        }
        ConflictPolicy::Error => Err(RegistrationError::NameConflict {
            name: name.to_string(),
        }),
    }
}

/// Bind `value` under `name` unless the name is already bound.
pub(crate) fn bind_symbol(
    table: &TableRef,
    name: &str,
    value: Value,
    policy: ConflictPolicy,
) -> Result<(), RegistrationError> {
    let key = Key::from(name);
    if table.get_bound(&key).is_some() {
        return conflict(name, policy);
    }
    table.bind(key, value);
    Ok(())
}

/// Append `candidate` to the overload set bound under `name`, creating the
/// set at `site` when the name is free.
pub(crate) fn add_overload(
    table: &TableRef,
    name: &str,
    site: Site,
    candidate: Candidate,
    policy: ConflictPolicy,
) -> Result<(), RegistrationError> {
    let key = Key::from(name);
    match table.get_bound(&key) {
        Some(Value::Function(existing)) => match existing.downcast_ref::<OverloadSet>() {
            Some(set) => {
                set.push(candidate);
                Ok(())
            }
            None => conflict(name, policy),
        },
        Some(_) => conflict(name, policy),
        None => {
            let set = OverloadSet::new(site, candidate);
            table.bind(key, Value::Function(Function::from_callable(name, set)));
            Ok(())
        }
    }
}

/// Encode a single-slot value through a push.
pub(crate) fn encode_value(
    state: &mut State,
    name: &str,
    value: impl ToStack,
) -> Result<Value, RegistrationError> {
    let invalid = |source: ConversionError| RegistrationError::InvalidDefault {
        name: name.to_string(),
        source,
    };
    let top = state.top();
    let pushed = value.push(state).map_err(invalid)?;
    let encoded = state.value_at(top + 1).cloned().unwrap_or_default();
    state.set_top(top);
    if pushed != 1 {
        return Err(invalid(ConversionError::Failed {
            message: format!("value occupies {} slots, expected 1", pushed),
        }));
    }
    Ok(encoded)
}
