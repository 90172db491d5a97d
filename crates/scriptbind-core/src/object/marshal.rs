//! Conversions for class objects.
//!
//! Each storage category gets its own [`FromStack`]/[`ToStack`] pair:
//!
//! | Rust type | test accepts | get | push |
//! |---|---|---|---|
//! | `ObjRef<T>` | any live object resolving to `T` | borrow in place | same object |
//! | `Box<T>` | - | - | unique wrapper |
//! | `Option<Box<T>>` | live unique wrapper of exactly `T` | move out, emptying it | unique or nil |
//! | `Arc<T>` | - | - | shared wrapper |
//! | `Option<Arc<T>>` | shared, or live weak, of exactly `T` | clone the handle | shared or nil |
//! | `Weak<T>` | shared, or live weak, of exactly `T` | observe | weak wrapper |
//! | `IntrusivePtr<T>` | - | - | intrusive wrapper |
//! | `Option<IntrusivePtr<T>>` | intrusive wrapper of exactly `T` | add a count | intrusive or nil |
//!
//! By-value conversion of a class (embedded category) is generated by
//! `#[derive(Class)]` through [`push_embedded`], [`test_embedded`] and
//! [`copy_embedded`].
//!
//! Pushing requires the class to be registered with the state; otherwise
//! the push fails with [`ConversionError::UnregisteredClass`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use super::{ObjectRef, Payload, Wrapper};
use crate::class::{Class, Resolution};
use crate::convert::{FromStack, ToStack};
use crate::error::ConversionError;
use crate::smart_ptr::{Intrusive, IntrusivePtr};
use crate::state::State;
use crate::value::Value;

/// Wrap `payload` as an object of class `T` and push it.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn push_object<T: Class>(state: &mut State, payload: Payload) -> Result<usize, ConversionError> {
    let class = state
        .registry()
        .id_of::<T>()
        .ok_or(ConversionError::UnregisteredClass { name: T::NAME })?;
    state.push(Value::Object(ObjectRef::new(Wrapper::new::<T>(class, payload))))?;
    Ok(1)
}

/// Push `value` as an embedded object.
pub fn push_embedded<T: Class>(value: T, state: &mut State) -> Result<usize, ConversionError> {
    push_object::<T>(state, Payload::embedded(value))
}

/// True when the slot holds a live object that resolves to `T`.
pub fn test_embedded<T: Class>(state: &State, pos: usize) -> bool {
    object_at(state, pos)
        .and_then(|object| {
            let resolution = object.resolve::<T>(state.registry())?;
            object.with_resolved::<T, _>(&resolution, |_| ())
        })
        .is_some()
}

/// Copy a `T` out of whatever object the slot holds.
pub fn copy_embedded<T: Class + Clone + Default>(state: &State, pos: usize) -> T {
    object_at(state, pos)
        .and_then(|object| {
            let resolution = object.resolve::<T>(state.registry())?;
            object.with_resolved(&resolution, T::clone)
        })
        .unwrap_or_default()
}

fn object_at(state: &State, pos: usize) -> Option<&ObjectRef> {
    state.value_at(pos)?.as_object()
}

fn push_or_nil<T: Class>(
    state: &mut State,
    payload: Option<Payload>,
) -> Result<usize, ConversionError> {
    match payload {
        Some(payload) => push_object::<T>(state, payload),
        None => {
            state.push(Value::Nil)?;
            Ok(1)
        }
    }
}

// ============================================================================
// Borrowed objects
// ============================================================================

/// A script object viewed as a `T`.
///
/// Holds the object alive and remembers how to reach its `T` sub-object.
/// Access goes through [`with`](Self::with) and [`with_mut`](Self::with_mut)
/// so the object is only borrowed for the duration of a closure.
pub struct ObjRef<T> {
    object: Option<ObjectRef>,
    resolution: Resolution,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Class> ObjRef<T> {
    /// View `object` as a `T`, if it resolves in the state's registry.
    pub fn resolve(state: &State, object: &ObjectRef) -> Option<Self> {
        let resolution = object.resolve::<T>(state.registry())?;
        Some(Self {
            object: Some(object.clone()),
            resolution,
            _marker: PhantomData,
        })
    }

    /// The empty reference produced as a default.
    pub fn null() -> Self {
        Self {
            object: None,
            resolution: Resolution::Direct,
            _marker: PhantomData,
        }
    }

    pub fn is_null(&self) -> bool {
        self.object.is_none()
    }

    pub fn object(&self) -> Option<&ObjectRef> {
        self.object.as_ref()
    }

    /// Byte offset of the `T` sub-object inside the pushed object.
    pub fn offset(&self) -> usize {
        self.resolution.offset()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.object.as_ref()?.with_resolved(&self.resolution, f)
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.object.as_ref()?.with_resolved_mut(&self.resolution, f)
    }
}

impl<T> Clone for ObjRef<T> {
    fn clone(&self) -> Self {
        Self {
            object: self.object.clone(),
            resolution: self.resolution.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ObjRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object {
            Some(object) => write!(f, "ObjRef({})", object),
            None => f.write_str("ObjRef(null)"),
        }
    }
}

impl<T: Class> FromStack for ObjRef<T> {
    fn test(state: &State, pos: usize) -> bool {
        test_embedded::<T>(state, pos)
    }

    fn get(state: &State, pos: usize) -> Self {
        object_at(state, pos)
            .and_then(|object| Self::resolve(state, object))
            .unwrap_or_else(Self::null)
    }

    fn make_default() -> Self {
        Self::null()
    }
}

impl<T: Class> ToStack for ObjRef<T> {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        let value = self.object.map_or(Value::Nil, Value::Object);
        state.push(value)?;
        Ok(1)
    }
}

// ============================================================================
// Unique ownership
// ============================================================================

impl<T: Class> ToStack for Box<T> {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        push_object::<T>(state, Payload::unique(self))
    }
}

impl<T: Class> FromStack for Option<Box<T>> {
    fn test(state: &State, pos: usize) -> bool {
        object_at(state, pos).is_some_and(|object| object.wrapper().holds_unique::<T>())
    }

    fn get(state: &State, pos: usize) -> Self {
        object_at(state, pos)?.wrapper().take_unique::<T>()
    }

    fn make_default() -> Self {
        None
    }
}

impl<T: Class> ToStack for Option<Box<T>> {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        push_or_nil::<T>(state, self.map(Payload::unique))
    }
}

// ============================================================================
// Shared ownership
// ============================================================================

impl<T: Class> ToStack for Arc<T> {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        push_object::<T>(state, Payload::shared(self))
    }
}

impl<T: Class> FromStack for Option<Arc<T>> {
    fn test(state: &State, pos: usize) -> bool {
        object_at(state, pos).is_some_and(|object| object.wrapper().shared_handle::<T>().is_some())
    }

    fn get(state: &State, pos: usize) -> Self {
        object_at(state, pos)?.wrapper().shared_handle::<T>()
    }

    fn make_default() -> Self {
        None
    }
}

impl<T: Class> ToStack for Option<Arc<T>> {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        push_or_nil::<T>(state, self.map(Payload::shared))
    }
}

// ============================================================================
// Weak observation
// ============================================================================

impl<T: Class> ToStack for Weak<T> {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        push_object::<T>(state, Payload::weak(self))
    }
}

impl<T: Class> FromStack for Weak<T> {
    fn test(state: &State, pos: usize) -> bool {
        object_at(state, pos).is_some_and(|object| object.wrapper().weak_handle::<T>().is_some())
    }

    fn get(state: &State, pos: usize) -> Self {
        object_at(state, pos)
            .and_then(|object| object.wrapper().weak_handle::<T>())
            .unwrap_or_default()
    }

    fn make_default() -> Self {
        Weak::new()
    }
}

// ============================================================================
// Intrusive counting
// ============================================================================

impl<T: Class + Intrusive> ToStack for IntrusivePtr<T> {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        push_object::<T>(state, Payload::intrusive(self))
    }
}

impl<T: Class + Intrusive> FromStack for Option<IntrusivePtr<T>> {
    fn test(state: &State, pos: usize) -> bool {
        object_at(state, pos).is_some_and(|object| object.wrapper().intrusive_handle::<T>().is_some())
    }

    fn get(state: &State, pos: usize) -> Self {
        object_at(state, pos)?.wrapper().intrusive_handle::<T>()
    }

    fn make_default() -> Self {
        None
    }
}

impl<T: Class + Intrusive> ToStack for Option<IntrusivePtr<T>> {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        push_or_nil::<T>(state, self.map(Payload::intrusive))
    }
}
