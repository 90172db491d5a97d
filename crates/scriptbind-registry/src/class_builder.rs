//! ClassBuilder for registering native classes.
//!
//! ClassBuilder provides a fluent API that registers a [`Class`] with the
//! state's class registry, fills its member tables and binds its class
//! table into the enclosing namespace.
//!
//! # Example
//!
//! ```ignore
//! module.class::<Player>()
//!     .constructor(|name: String| Player::new(name))?
//!     .constructor_with(|name: String, hp: i64| Player::with_hp(name, hp), (100i64,))?
//!     .method("heal", |p: &mut Player, amount: i64| p.hp += amount)?
//!     .property("name", |p| p.name.clone(), |p, name| p.name = name)?
//!     .writer("hp", |p: &mut Player, hp: i64| {
//!         if hp < 0 {
//!             return false;
//!         }
//!         p.hp = hp;
//!         true
//!     })?
//!     .static_function("count", || PLAYERS.get())?
//!     .build()?;
//! ```
//!
//! The class table then supports `Player(...)` (embedded construction),
//! `Player.new(...)`, `Player.new_u(...)`, `Player.new_s(...)` and, for
//! intrusive classes, `Player.new_i(...)`.

use std::rc::Rc;
use std::sync::Arc;

use scriptbind_core::{
    Class, ClassId, ClassMembers, ConflictPolicy, ConversionError, FieldReader, FieldWriter,
    FromStack, Function, Intrusive, IntrusivePtr, ObjRef, RegistrationError, ScriptError, State,
    TableKind, TableRef, ToStack, Value, WriterStatus, push_embedded,
};

use crate::invoke::{IntoConstructor, IntoFunction, IntoMethod, Maker};
use crate::module::{add_overload, bind_symbol, conflict};
use crate::overload::{Binder, Candidate, OverloadSet, Site, invalid_object};

/// Pushes a constructed value with a particular storage category.
type Pusher<T> = fn(T, &mut State) -> Result<usize, ConversionError>;

/// Builder for registering a native class.
///
/// Created by calling `Module::class::<T>()`.
pub struct ClassBuilder<'m, T: Class> {
    /// State whose registry holds the class
    state: &'m mut State,
    /// Namespace the class table is bound into
    scope: TableRef,
    policy: ConflictPolicy,
    class: ClassId,
    /// The class (static) table
    table: TableRef,
    /// Constructors, in registration order
    constructors: Vec<(Binder, Maker<T>)>,
    /// Set when the class is declared intrusive
    intrusive: Option<Pusher<T>>,
}

impl<'m, T: Class> ClassBuilder<'m, T> {
    /// Register `T` (and its bases) and install its derived fields.
    pub(crate) fn new(state: &'m mut State, scope: TableRef, policy: ConflictPolicy) -> Self {
        let class = state.registry_mut().register::<T>();
        let table = TableRef::new(TableKind::Class {
            class,
            name: Rc::from(T::NAME),
        });
        let mut builder = Self {
            state,
            scope,
            policy,
            class,
            table,
            constructors: Vec::new(),
            intrusive: None,
        };
        builder.install_fields();
        builder
    }

    /// The id assigned to `T` in this state.
    pub fn class_id(&self) -> ClassId {
        self.class
    }

    /// The class table that `build` binds into the namespace.
    pub fn table(&self) -> &TableRef {
        &self.table
    }

    fn members(&mut self) -> Result<&mut ClassMembers, RegistrationError> {
        self.state
            .registry_mut()
            .descriptor_mut(self.class)
            .map(|descriptor| descriptor.members_mut())
            .ok_or_else(|| RegistrationError::Script {
                name: T::NAME.to_string(),
                source: ScriptError::runtime("class descriptor is missing"),
            })
    }

    fn install_fields(&mut self) {
        for field in T::fields() {
            let result = self.install_field(field.name, field.reader, field.writer);
            if let Err(err) = result {
                tracing::warn!(class = T::NAME, field = field.name, %err, "field not installed");
            }
        }
    }

    fn install_field(
        &mut self,
        name: &'static str,
        reader: Option<FieldReader<T>>,
        writer: Option<FieldWriter<T>>,
    ) -> Result<(), RegistrationError> {
        if let Some(reader) = reader {
            let member: Rc<str> = Rc::from(name);
            let function = Function::new(name, move |state: &mut State| {
                let this = ObjRef::<T>::get(state, 1);
                this.with(|this| reader(this, &mut *state))
                    .ok_or_else(|| invalid_object(state, T::NAME, &member))?
                    .map_err(ScriptError::from)
            });
            self.insert_reader(name, function)?;
        }
        if let Some(writer) = writer {
            let member: Rc<str> = Rc::from(name);
            let function = Function::new(name, move |state: &mut State| {
                let this = ObjRef::<T>::get(state, 1);
                let status = this
                    .with_mut(|this| writer(this, state, 2))
                    .ok_or_else(|| invalid_object(state, T::NAME, &member))?;
                status.push(state).map_err(ScriptError::from)
            });
            self.insert_writer(name, function)?;
        }
        Ok(())
    }

    fn insert_reader(&mut self, name: &str, function: Function) -> Result<(), RegistrationError> {
        let policy = self.policy;
        if self.members()?.insert_reader(name, function) {
            Ok(())
        } else {
            conflict(&format!("{}.{}", T::NAME, name), policy)
        }
    }

    fn insert_writer(&mut self, name: &str, function: Function) -> Result<(), RegistrationError> {
        let policy = self.policy;
        if self.members()?.insert_writer(name, function) {
            Ok(())
        } else {
            conflict(&format!("{}.{}", T::NAME, name), policy)
        }
    }

    fn add_method(&mut self, name: &str, candidate: Candidate) -> Result<(), RegistrationError> {
        let policy = self.policy;
        let members = self.members()?;
        match members.function(name) {
            Some(existing) => match existing.downcast_ref::<OverloadSet>() {
                Some(set) => {
                    set.push(candidate);
                    Ok(())
                }
                None => conflict(&format!("{}.{}", T::NAME, name), policy),
            },
            None => {
                let set = OverloadSet::new(Site::member::<T>(name), candidate);
                members.insert_function(name, Function::from_callable(name, set));
                Ok(())
            }
        }
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    /// Add a constructor.
    pub fn constructor<F, Args>(mut self, f: F) -> Result<Self, RegistrationError>
    where
        F: IntoConstructor<T, Args>,
    {
        self.constructors.push((Binder::new(F::params()), f.into_maker()));
        Ok(self)
    }

    /// Add a constructor whose trailing parameters have defaults.
    pub fn constructor_with<F, Args, D>(mut self, f: F, defaults: D) -> Result<Self, RegistrationError>
    where
        F: IntoConstructor<T, Args>,
        D: ToStack,
    {
        let binder = Binder::new(F::params()).with_defaults(self.state, T::NAME, defaults)?;
        self.constructors.push((binder, f.into_maker()));
        Ok(self)
    }

    // ========================================================================
    // Member functions
    // ========================================================================

    /// Add a member function taking `&T` or `&mut T` first.
    ///
    /// Registering the same name again appends an overload.
    pub fn method<F, M, R>(mut self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        F: IntoMethod<T, M, R>,
    {
        let candidate = Candidate::new(Binder::new(F::params()), f.into_invoker(Rc::from(name)));
        self.add_method(name, candidate)?;
        Ok(self)
    }

    /// Add a member function whose trailing parameters have defaults.
    pub fn method_with<F, M, R, D>(mut self, name: &str, f: F, defaults: D) -> Result<Self, RegistrationError>
    where
        F: IntoMethod<T, M, R>,
        D: ToStack,
    {
        let qualified = format!("{}:{}", T::NAME, name);
        let binder = Binder::new(F::params()).with_defaults(self.state, &qualified, defaults)?;
        let candidate = Candidate::new(binder, f.into_invoker(Rc::from(name)));
        self.add_method(name, candidate)?;
        Ok(self)
    }

    /// Add a static function on the class table.
    pub fn static_function<F, Args, R>(self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        F: IntoFunction<Args, R>,
    {
        let site = Site::function(&format!("{}.{}", T::NAME, name));
        let candidate = Candidate::new(Binder::new(F::params()), f.into_invoker());
        add_overload(&self.table, name, site, candidate, self.policy)?;
        Ok(self)
    }

    /// Add a member function that handles the stack itself.
    ///
    /// Position 1 holds the object.
    pub fn function_raw<F>(mut self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        F: Fn(&mut State) -> Result<usize, ScriptError> + 'static,
    {
        let policy = self.policy;
        if !self.members()?.insert_function(name, Function::new(name, f)) {
            conflict(&format!("{}.{}", T::NAME, name), policy)?;
        }
        Ok(self)
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Add a readable and writable property.
    ///
    /// The writer reports a type failure when the assigned value does not
    /// convert to `V`.
    pub fn property<V, G, S>(self, name: &str, get: G, set: S) -> Result<Self, RegistrationError>
    where
        V: FromStack + ToStack + 'static,
        G: Fn(&T) -> V + 'static,
        S: Fn(&mut T, V) + 'static,
    {
        self.reader(name, get)?.writer(name, move |this: &mut T, value: V| {
            set(this, value);
            true
        })
    }

    /// Add a property without a writer.
    pub fn readonly<V, G>(self, name: &str, get: G) -> Result<Self, RegistrationError>
    where
        V: ToStack + 'static,
        G: Fn(&T) -> V + 'static,
    {
        self.reader(name, get)
    }

    /// Add a property without a reader.
    pub fn writeonly<V, S>(self, name: &str, set: S) -> Result<Self, RegistrationError>
    where
        V: FromStack + 'static,
        S: Fn(&mut T, V) + 'static,
    {
        self.writer(name, move |this: &mut T, value: V| {
            set(this, value);
            true
        })
    }

    /// Add a computed readable symbol.
    pub fn reader<V, G>(mut self, name: &str, get: G) -> Result<Self, RegistrationError>
    where
        V: ToStack + 'static,
        G: Fn(&T) -> V + 'static,
    {
        let member: Rc<str> = Rc::from(name);
        let function = Function::new(name, move |state: &mut State| {
            let this = ObjRef::<T>::get(state, 1);
            let value = this
                .with(|this| get(this))
                .ok_or_else(|| invalid_object(state, T::NAME, &member))?;
            value.push(state).map_err(ScriptError::from)
        });
        self.insert_reader(name, function)?;
        Ok(self)
    }

    /// Add a validated writable symbol.
    ///
    /// A value that does not convert to `V` is a type failure; a setter
    /// returning `false` is a value failure.
    pub fn writer<V, S>(mut self, name: &str, set: S) -> Result<Self, RegistrationError>
    where
        V: FromStack + 'static,
        S: Fn(&mut T, V) -> bool + 'static,
    {
        let member: Rc<str> = Rc::from(name);
        let function = Function::new(name, move |state: &mut State| {
            let this = ObjRef::<T>::get(state, 1);
            if this.is_null() {
                return Err(invalid_object(state, T::NAME, &member));
            }
            let status = if V::test(state, 2) {
                let value = V::get(state, 2);
                match this.with_mut(|this| set(this, value)) {
                    Some(true) => WriterStatus::Succeeded,
                    Some(false) => WriterStatus::ValueFailed,
                    None => return Err(invalid_object(state, T::NAME, &member)),
                }
            } else {
                WriterStatus::TypeFailed
            };
            status.push(state).map_err(ScriptError::from)
        });
        self.insert_writer(name, function)?;
        Ok(self)
    }

    /// Add a readable symbol that handles the stack itself.
    ///
    /// Receives the object at position 1 and pushes the value.
    pub fn reader_raw<F>(mut self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        F: Fn(&mut State) -> Result<usize, ScriptError> + 'static,
    {
        self.insert_reader(name, Function::new(name, f))?;
        Ok(self)
    }

    /// Add a writable symbol that handles the stack itself.
    ///
    /// Receives the object at position 1 and the value at position 2 and
    /// pushes a [`WriterStatus`].
    pub fn writer_raw<F>(mut self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        F: Fn(&mut State) -> Result<usize, ScriptError> + 'static,
    {
        self.insert_writer(name, Function::new(name, f))?;
        Ok(self)
    }

    // ========================================================================
    // Build
    // ========================================================================

    fn constructor_set(&self, site: Site, pusher: Pusher<T>) -> Option<Function> {
        let mut candidates = self.constructors.iter().map(|(binder, make)| {
            let make = Rc::clone(make);
            let invoke = Rc::new(move |state: &mut State| {
                let value = make(state);
                pusher(value, state).map_err(ScriptError::from)
            });
            Candidate::new(binder.clone(), invoke)
        });
        let set = OverloadSet::new(site, candidates.next()?);
        candidates.for_each(|candidate| set.push(candidate));
        Some(Function::from_callable(T::NAME, set))
    }

    fn bind_new(&self, name: &str, pusher: Pusher<T>) -> Result<(), RegistrationError> {
        match self.constructor_set(Site::New { class: T::NAME }, pusher) {
            Some(function) => bind_symbol(&self.table, name, Value::Function(function), self.policy),
            None => Ok(()),
        }
    }

    /// Finish registration and bind the class table into the namespace.
    pub fn build(self) -> Result<(), RegistrationError> {
        let unique: Pusher<T> = |value, state| Box::new(value).push(state);
        let shared: Pusher<T> = |value, state| Arc::new(value).push(state);

        if let Some(construct) = self.constructor_set(Site::Construct { class: T::NAME }, push_embedded::<T>) {
            self.table.set_call_handler(construct);
        }
        self.bind_new("new", self.intrusive.unwrap_or(unique))?;
        self.bind_new("new_u", unique)?;
        self.bind_new("new_s", shared)?;
        if let Some(intrusive) = self.intrusive {
            self.bind_new("new_i", intrusive)?;
        }

        tracing::debug!(class = T::NAME, id = self.class.raw(), "class bound");
        bind_symbol(&self.scope, T::NAME, Value::Table(self.table.clone()), self.policy)
    }
}

impl<'m, T: Class + Intrusive> ClassBuilder<'m, T> {
    /// Declare the class intrusively counted: `new` then constructs an
    /// [`IntrusivePtr`], and `new_i` becomes available.
    pub fn intrusive(mut self) -> Self {
        let pusher: Pusher<T> = |value, state| IntrusivePtr::new(value).push(state);
        self.intrusive = Some(pusher);
        self
    }
}
