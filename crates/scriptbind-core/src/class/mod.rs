//! Native class model.
//!
//! A native type becomes visible to scripts by implementing [`Class`]
//! (usually through `#[derive(Class)]`) and registering it with the state's
//! [`ClassRegistry`]. Multiple inheritance is expressed by composition: a
//! derived type embeds each base as a field and reports it through
//! [`Class::bases`] as a [`BaseLink`], which records the base's byte offset
//! inside the derived type and a typed projection to reach it.
//!
//! ## Key Types
//!
//! - [`Class`] - implemented by every bindable type
//! - [`BaseLink`] - one direct base of a class
//! - [`ClassRegistry`] - per-instance type descriptors and offset maps
//! - [`ClassMembers`] - the function, reader and writer tables of a class
//! - [`FieldMeta`] - a field exposed through generated reader/writer hooks
//!
//! # Example
//!
//! ```ignore
//! #[derive(Class)]
//! struct Derived {
//!     #[bind(base)]
//!     first: First,
//!     #[bind(base)]
//!     second: Second,
//!     #[bind(get, set)]
//!     extra: i32,
//! }
//! ```

use std::any::{Any, TypeId};
use std::rc::Rc;

mod members;
mod registry;

pub mod dispatch;

pub use members::{ClassMembers, MemberFlags, WriterStatus};
pub use registry::{BaseEntry, ClassId, ClassRegistry, Resolution, TypeDescriptor};

use crate::error::ConversionError;
use crate::state::State;

/// A native type that can cross the boundary as an object.
pub trait Class: Any + Sized {
    /// Script-visible class name.
    const NAME: &'static str;

    /// Direct bases, in declaration order.
    fn bases() -> Vec<BaseLink> {
        Vec::new()
    }

    /// Fields exposed as readable/writable symbols.
    fn fields() -> Vec<FieldMeta<Self>> {
        Vec::new()
    }
}

/// One step of an upcast from a derived object to an embedded base.
pub trait Upcast {
    fn upcast<'a>(&self, this: &'a dyn Any) -> Option<&'a dyn Any>;
    fn upcast_mut<'a>(&self, this: &'a mut dyn Any) -> Option<&'a mut dyn Any>;
}

struct FieldUpcast<D, B> {
    get: fn(&D) -> &B,
    get_mut: fn(&mut D) -> &mut B,
}

impl<D: Any, B: Any> Upcast for FieldUpcast<D, B> {
    fn upcast<'a>(&self, this: &'a dyn Any) -> Option<&'a dyn Any> {
        let derived = this.downcast_ref::<D>()?;
        let base: &'a dyn Any = (self.get)(derived);
        Some(base)
    }

    fn upcast_mut<'a>(&self, this: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        let derived = this.downcast_mut::<D>()?;
        let base: &'a mut dyn Any = (self.get_mut)(derived);
        Some(base)
    }
}

/// A direct base of a class.
#[derive(Clone)]
pub struct BaseLink {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) offset: usize,
    pub(crate) register: fn(&mut ClassRegistry) -> ClassId,
    pub(crate) upcast: Rc<dyn Upcast>,
}

impl BaseLink {
    /// Describe base `B` embedded in `D` at `offset` bytes.
    ///
    /// `offset` is normally `core::mem::offset_of!(D, field)` and must agree
    /// with the projections.
    pub fn new<D: Class, B: Class>(
        offset: usize,
        get: fn(&D) -> &B,
        get_mut: fn(&mut D) -> &mut B,
    ) -> Self {
        Self {
            type_id: TypeId::of::<B>(),
            name: B::NAME,
            offset,
            register: ClassRegistry::register::<B>,
            upcast: Rc::new(FieldUpcast { get, get_mut }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn base_type(&self) -> TypeId {
        self.type_id
    }
}

/// Reader hook: push the field of `T`, returning the number of slots.
pub type FieldReader<T> = fn(&T, &mut State) -> Result<usize, ConversionError>;

/// Writer hook: test and store the value at a stack position into `T`.
pub type FieldWriter<T> = fn(&mut T, &State, usize) -> WriterStatus;

/// A field exposed to scripts.
pub struct FieldMeta<T> {
    pub name: &'static str,
    pub reader: Option<FieldReader<T>>,
    pub writer: Option<FieldWriter<T>>,
}

impl<T> FieldMeta<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            reader: None,
            writer: None,
        }
    }

    pub fn with_reader(mut self, reader: FieldReader<T>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn with_writer(mut self, writer: FieldWriter<T>) -> Self {
        self.writer = Some(writer);
        self
    }
}
