//! Object wrappers: native objects living in script values.
//!
//! A [`Wrapper`] carries a native object together with its storage
//! category and class. The payload is a tagged enum; every access site
//! matches on the category, so a payload is never read under the wrong
//! ownership model.
//!
//! | category | payload | ownership |
//! |---|---|---|
//! | embedded | `Box<dyn Any>` | the wrapper owns the value |
//! | intrusive | `IntrusivePtr<T>` | shared through the object's own count |
//! | unique | `Option<Box<dyn Any>>` | sole owner, emptied when moved out |
//! | shared | `Arc<T>` | shared, atomically counted |
//! | weak | `Weak<T>` | observer, may expire |
//!
//! The wrapper's `Drop` is the finalizer: dropping the payload runs the
//! destructor, releases a count, or does nothing for an observer.

mod handle;
mod marshal;

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Weak};

use crate::class::{Class, ClassId, ClassRegistry, Resolution};
use crate::smart_ptr::{Intrusive, IntrusivePtr};

use handle::ErasedHandle;

pub use marshal::{ObjRef, copy_embedded, push_embedded, test_embedded};

/// Ownership model of a wrapper's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageCategory {
    Embedded,
    Intrusive,
    Unique,
    Shared,
    Weak,
}

pub(crate) enum Payload {
    Embedded(Box<dyn Any>),
    Intrusive(Box<dyn ErasedHandle>),
    Unique(Option<Box<dyn Any>>),
    Shared(Box<dyn ErasedHandle>),
    Weak(Box<dyn ErasedHandle>),
}

impl Payload {
    pub(crate) fn embedded<T: Any>(value: T) -> Self {
        Payload::Embedded(Box::new(value))
    }

    pub(crate) fn unique<T: Any>(value: Box<T>) -> Self {
        Payload::Unique(Some(value))
    }

    pub(crate) fn shared<T: Any>(value: Arc<T>) -> Self {
        Payload::Shared(Box::new(value))
    }

    pub(crate) fn weak<T: Any>(value: Weak<T>) -> Self {
        Payload::Weak(Box::new(value))
    }

    pub(crate) fn intrusive<T: Intrusive>(value: IntrusivePtr<T>) -> Self {
        Payload::Intrusive(Box::new(value))
    }

    fn category(&self) -> StorageCategory {
        match self {
            Payload::Embedded(_) => StorageCategory::Embedded,
            Payload::Intrusive(_) => StorageCategory::Intrusive,
            Payload::Unique(_) => StorageCategory::Unique,
            Payload::Shared(_) => StorageCategory::Shared,
            Payload::Weak(_) => StorageCategory::Weak,
        }
    }
}

/// A native object held by the runtime.
///
/// The class header is immutable; the payload sits behind a `RefCell` so
/// native calls can borrow the object while the header stays readable.
pub struct Wrapper {
    class: ClassId,
    type_id: TypeId,
    type_name: &'static str,
    category: StorageCategory,
    payload: RefCell<Payload>,
}

impl Wrapper {
    pub(crate) fn new<T: Class>(class: ClassId, payload: Payload) -> Self {
        Self {
            class,
            type_id: TypeId::of::<T>(),
            type_name: T::NAME,
            category: payload.category(),
            payload: RefCell::new(payload),
        }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn category(&self) -> StorageCategory {
        self.category
    }

    /// False for an emptied unique wrapper, an expired weak one, or an
    /// object currently borrowed mutably by a native call.
    pub fn is_live(&self) -> bool {
        let Ok(payload) = self.payload.try_borrow() else {
            return false;
        };
        match &*payload {
            Payload::Embedded(_) => true,
            Payload::Unique(slot) => slot.is_some(),
            Payload::Intrusive(handle) | Payload::Shared(handle) | Payload::Weak(handle) => {
                handle.is_live()
            }
        }
    }

    /// Run `f` on the object as originally pushed.
    fn with_origin<R>(&self, f: impl FnOnce(&dyn Any) -> R) -> Option<R> {
        let payload = self.payload.try_borrow().ok()?;
        match &*payload {
            Payload::Embedded(value) | Payload::Unique(Some(value)) => Some(f(&**value)),
            Payload::Unique(None) => None,
            Payload::Intrusive(handle) | Payload::Shared(handle) | Payload::Weak(handle) => {
                let mut f = Some(f);
                let mut out = None;
                handle.with_ref(&mut |origin| out = f.take().map(|f| f(origin)));
                out
            }
        }
    }

    fn with_origin_mut<R>(&self, f: impl FnOnce(&mut dyn Any) -> R) -> Option<R> {
        let mut payload = self.payload.try_borrow_mut().ok()?;
        match &mut *payload {
            Payload::Embedded(value) | Payload::Unique(Some(value)) => Some(f(&mut **value)),
            Payload::Unique(None) => None,
            Payload::Intrusive(handle) | Payload::Shared(handle) | Payload::Weak(handle) => {
                let mut f = Some(f);
                let mut out = None;
                handle.with_mut(&mut |origin| out = f.take().map(|f| f(origin)));
                out
            }
        }
    }

    fn take_unique<T: Any>(&self) -> Option<Box<T>> {
        let mut payload = self.payload.try_borrow_mut().ok()?;
        match &mut *payload {
            Payload::Unique(slot) if slot.as_ref().is_some_and(|v| v.is::<T>()) => {
                slot.take()?.downcast::<T>().ok()
            }
            _ => None,
        }
    }

    fn holds_unique<T: Any>(&self) -> bool {
        self.payload
            .try_borrow()
            .is_ok_and(|p| matches!(&*p, Payload::Unique(Some(value)) if value.is::<T>()))
    }

    fn shared_handle<T: Any>(&self) -> Option<Arc<T>> {
        let payload = self.payload.try_borrow().ok()?;
        match &*payload {
            Payload::Shared(handle) => handle.handle().downcast_ref::<Arc<T>>().cloned(),
            Payload::Weak(handle) => handle.handle().downcast_ref::<Weak<T>>()?.upgrade(),
            _ => None,
        }
    }

    fn weak_handle<T: Any>(&self) -> Option<Weak<T>> {
        let payload = self.payload.try_borrow().ok()?;
        match &*payload {
            Payload::Shared(handle) => handle.handle().downcast_ref::<Arc<T>>().map(Arc::downgrade),
            Payload::Weak(handle) => handle
                .handle()
                .downcast_ref::<Weak<T>>()
                .filter(|weak| weak.strong_count() > 0)
                .cloned(),
            _ => None,
        }
    }

    fn intrusive_handle<T: Intrusive>(&self) -> Option<IntrusivePtr<T>> {
        let payload = self.payload.try_borrow().ok()?;
        match &*payload {
            Payload::Intrusive(handle) => handle.handle().downcast_ref::<IntrusivePtr<T>>().cloned(),
            _ => None,
        }
    }
}

impl Drop for Wrapper {
    fn drop(&mut self) {
        tracing::trace!(
            class = self.type_name,
            category = ?self.category,
            "finalizing wrapper"
        );
    }
}

impl fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapper")
            .field("class", &self.class)
            .field("type_name", &self.type_name)
            .field("category", &self.category)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Shared reference to a [`Wrapper`], the payload of an object value.
#[derive(Clone)]
pub struct ObjectRef(Rc<Wrapper>);

impl ObjectRef {
    pub fn new(wrapper: Wrapper) -> Self {
        ObjectRef(Rc::new(wrapper))
    }

    pub fn wrapper(&self) -> &Wrapper {
        &self.0
    }

    /// Class the object was pushed as.
    pub fn class(&self) -> ClassId {
        self.0.class
    }

    pub fn type_id(&self) -> TypeId {
        self.0.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.0.type_name
    }

    pub fn category(&self) -> StorageCategory {
        self.0.category
    }

    pub fn is_live(&self) -> bool {
        self.0.is_live()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Resolve the object against class `T` in `registry`.
    ///
    /// Fails when the object's class is unknown to this registry (for
    /// example after the registry was cleared) or when `T` is neither the
    /// object's class nor a registered ancestor of it.
    pub fn resolve<T: Class>(&self, registry: &ClassRegistry) -> Option<Resolution> {
        let target = registry.id_of::<T>()?;
        self.resolve_id(registry, target)
    }

    pub fn resolve_id(&self, registry: &ClassRegistry, target: ClassId) -> Option<Resolution> {
        registry.descriptor_checked(self.0.class, self.0.type_id)?;
        registry.resolve(self.0.class, target)
    }

    /// Run `f` on the `T` sub-object selected by `resolution`.
    pub fn with_resolved<T: Any, R>(&self, resolution: &Resolution, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.0
            .with_origin(|origin| resolution.apply(origin)?.downcast_ref::<T>().map(f))
            .flatten()
    }

    /// Mutable counterpart of [`with_resolved`](Self::with_resolved).
    ///
    /// Shared and intrusive payloads are only mutable while the wrapper
    /// holds the sole count; weak payloads never are.
    pub fn with_resolved_mut<T: Any, R>(
        &self,
        resolution: &Resolution,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        self.0
            .with_origin_mut(|origin| resolution.apply_mut(origin)?.downcast_mut::<T>().map(f))
            .flatten()
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:p}", self.0.type_name, Rc::as_ptr(&self.0))
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}
