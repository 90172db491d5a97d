//! Script-side value representation.
//!
//! [`Value`] is what lives in every slot of the evaluation stack and in every
//! table entry. Scalars are stored inline; functions, tables and native
//! objects are reference counted so that copying a value between slots never
//! copies the underlying object.
//!
//! ## Key Types
//!
//! - [`Value`] - a single stack slot
//! - [`ValueKind`] - the type tag reported for a slot
//! - [`Key`] - the hashable subset of values usable as table keys

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use ordered_float::OrderedFloat;

use crate::function::Function;
use crate::object::ObjectRef;
use crate::table::TableRef;

/// Type tag of a stack slot.
///
/// Integers and floating point numbers share the `Number` tag; use
/// [`Value::is_integer`] to tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ValueKind {
    Nil = 0,
    Boolean = 1,
    LightPtr = 2,
    Number = 3,
    String = 4,
    Table = 5,
    Function = 6,
    Object = 7,
}

impl ValueKind {
    /// Human-readable name of the tag.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Nil => "nil",
            ValueKind::Boolean => "boolean",
            ValueKind::LightPtr => "lightpointer",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Table => "table",
            ValueKind::Function => "function",
            ValueKind::Object => "object",
        }
    }
}

/// A value stored in a stack slot or table entry.
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value
    #[default]
    Nil,
    /// Boolean value
    Boolean(bool),
    /// Integer value (all native integer widths are stored as i64)
    Integer(i64),
    /// Floating point value
    Number(f64),
    /// Immutable string
    String(Rc<str>),
    /// Opaque native pointer, never dereferenced by the bridge
    LightPtr(NonNull<c_void>),
    /// Callable native function
    Function(Function),
    /// Table (plain, namespace, class or enum)
    Table(TableRef),
    /// Wrapped native object
    Object(ObjectRef),
}

impl Value {
    /// Type tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Integer(_) | Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::LightPtr(_) => ValueKind::LightPtr,
            Value::Function(_) => ValueKind::Function,
            Value::Table(_) => ValueKind::Table,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Get a human-readable name for this value's type.
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Check if this value is nil.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Check if this value is an integer (as opposed to a float).
    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_))
    }

    /// Wrapped object, if this value is one.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Table, if this value is one.
    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Function, if this value is one.
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Whether calling this value can succeed.
    pub fn is_callable(&self) -> bool {
        match self {
            Value::Function(_) => true,
            Value::Table(table) => table.call_handler().is_some(),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Rc::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Boolean(v) => write!(f, "Boolean({})", v),
            Value::Integer(v) => write!(f, "Integer({})", v),
            Value::Number(v) => write!(f, "Number({:?})", v),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::LightPtr(p) => write!(f, "LightPtr({:p})", p.as_ptr()),
            Value::Function(func) => write!(f, "Function({})", func.name()),
            Value::Table(t) => write!(f, "Table({})", t),
            Value::Object(o) => write!(f, "Object({})", o),
        }
    }
}

/// Textual representation used in script-facing error messages.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Number(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            Value::Number(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::LightPtr(p) => write!(f, "lightpointer: {:p}", p.as_ptr()),
            Value::Function(func) => write!(f, "function: {}", func.name()),
            Value::Table(t) => write!(f, "{}", t),
            Value::Object(o) => write!(f, "{}", o),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Integer(a), Value::Number(b)) | (Value::Number(b), Value::Integer(a)) => {
                *a as f64 == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::LightPtr(a), Value::LightPtr(b)) => a == b,
            // Reference types compare by identity
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Table(a), Value::Table(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Hashable table key.
///
/// Floats with an exact integer value are normalized to `Integer` so that
/// `t[1]` and `t[1.0]` address the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Boolean(bool),
    Integer(i64),
    Number(OrderedFloat<f64>),
    String(Rc<str>),
}

impl Key {
    /// Convert a value into a key, if the value is hashable.
    ///
    /// Returns `None` for nil, NaN and reference values.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Boolean(b) => Some(Key::Boolean(*b)),
            Value::Integer(i) => Some(Key::Integer(*i)),
            Value::Number(n) if n.is_nan() => None,
            Value::Number(n) => {
                if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 {
                    Some(Key::Integer(*n as i64))
                } else {
                    Some(Key::Number(OrderedFloat(*n)))
                }
            }
            Value::String(s) => Some(Key::String(Rc::clone(s))),
            _ => None,
        }
    }

    /// The key as a value.
    pub fn to_value(&self) -> Value {
        match self {
            Key::Boolean(b) => Value::Boolean(*b),
            Key::Integer(i) => Value::Integer(*i),
            Key::Number(n) => Value::Number(n.into_inner()),
            Key::String(s) => Value::String(Rc::clone(s)),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::String(Rc::from(value))
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Integer(value)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_value(), f)
    }
}
