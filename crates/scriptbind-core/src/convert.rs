//! Conversion traits between native values and stack slots.
//!
//! This module provides the two halves of the value conversion registry:
//! - [`FromStack`]: test and read a native value from a stack position
//! - [`ToStack`]: push a native value onto the stack
//!
//! A type that implements only one half is push-only (`&str`) or get-only.
//! Every type has a fixed slot width: scalars take one slot, `()` takes
//! none, and tuples take the sum of their elements.
//!
//! ## Supported Types
//!
//! - Integers: `i8`..`i64`, `u8`..`u64`, `isize`, `usize`
//! - Floats: `f32`, `f64`
//! - Boolean: `bool`
//! - Strings: `String`, `Rc<str>` (get and push), `&str` (push only)
//! - Light pointers: `*mut c_void`, `*const c_void`
//! - Script values: [`Value`], [`Handle`], [`Function`], [`TableRef`]
//! - Unit: `()` (zero slots)
//! - Tuples of up to eight convertible types
//! - Enums implementing [`ScriptEnum`] through the derive
//!
//! Class objects are covered in [`crate::object`].
//!
//! ## Example
//!
//! ```
//! use scriptbind_core::{FromStack, State, ToStack};
//!
//! let mut state = State::new();
//! (7i32, true).push(&mut state).unwrap();
//! assert!(<(i32, bool)>::test(&state, 1));
//! assert_eq!(<(i32, bool)>::get(&state, 1), (7, true));
//! ```

use std::ffi::c_void;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::error::ConversionError;
use crate::function::Function;
use crate::state::State;
use crate::table::TableRef;
use crate::value::Value;

/// Read a native value from a stack position.
pub trait FromStack: Sized {
    /// Number of stack slots the value occupies.
    const WIDTH: usize = 1;

    /// Check, without side effects, whether the slot at `pos` converts.
    fn test(state: &State, pos: usize) -> bool;

    /// Convert the slot at `pos`.
    ///
    /// Only meaningful after `test` returned true; otherwise an arbitrary
    /// (but valid) value is produced.
    fn get(state: &State, pos: usize) -> Self;

    /// Fallback value, always constructible.
    fn make_default() -> Self;
}

/// Push a native value onto the stack.
pub trait ToStack {
    /// Number of stack slots the value occupies.
    const WIDTH: usize = 1;

    /// Push the value, returning the number of slots written.
    ///
    /// On failure nothing stays pushed.
    fn push(self, state: &mut State) -> Result<usize, ConversionError>;
}

fn push_one(state: &mut State, value: Value) -> Result<usize, ConversionError> {
    state.push(value)?;
    Ok(1)
}

// ============================================================================
// Integer implementations
// ============================================================================

/// First float above the range of an integer type with `bits` bits.
///
/// `MAX as f64` rounds up to a power of two for 64-bit types, so the bound
/// is computed as that power of two and compared exclusively.
fn exclusive_max(bits: u32, signed: bool) -> f64 {
    2f64.powi((bits - u32::from(signed)) as i32)
}

macro_rules! impl_stack_int {
    ($($ty:ty),*) => {
        $(
            impl FromStack for $ty {
                fn test(state: &State, pos: usize) -> bool {
                    match state.value_at(pos) {
                        Some(Value::Integer(v)) => <$ty>::try_from(*v).is_ok(),
                        Some(Value::Number(v)) => {
                            v.fract() == 0.0
                                && *v >= <$ty>::MIN as f64
                                && *v < exclusive_max(<$ty>::BITS, <$ty>::MIN != 0)
                        }
                        _ => false,
                    }
                }

                fn get(state: &State, pos: usize) -> Self {
                    match state.value_at(pos) {
                        Some(Value::Integer(v)) => *v as $ty,
                        Some(Value::Number(v)) => *v as $ty,
                        _ => 0,
                    }
                }

                fn make_default() -> Self {
                    0
                }
            }

            impl ToStack for $ty {
                fn push(self, state: &mut State) -> Result<usize, ConversionError> {
                    push_one(state, Value::Integer(self as i64))
                }
            }
        )*
    };
}

impl_stack_int!(i8, i16, i32, i64, isize, u8, u16, u32);

// 64-bit unsigned values are stored by bit reinterpretation to keep the full range
macro_rules! impl_stack_wide_uint {
    ($($ty:ty),*) => {
        $(
            impl FromStack for $ty {
                fn test(state: &State, pos: usize) -> bool {
                    match state.value_at(pos) {
                        Some(Value::Integer(_)) => true,
                        Some(Value::Number(v)) => {
                            v.fract() == 0.0 && *v >= 0.0 && *v < exclusive_max(<$ty>::BITS, false)
                        }
                        _ => false,
                    }
                }

                fn get(state: &State, pos: usize) -> Self {
                    match state.value_at(pos) {
                        Some(Value::Integer(v)) => *v as $ty,
                        Some(Value::Number(v)) => *v as $ty,
                        _ => 0,
                    }
                }

                fn make_default() -> Self {
                    0
                }
            }

            impl ToStack for $ty {
                fn push(self, state: &mut State) -> Result<usize, ConversionError> {
                    push_one(state, Value::Integer(self as i64))
                }
            }
        )*
    };
}

impl_stack_wide_uint!(u64, usize);

// ============================================================================
// Float implementations
// ============================================================================

macro_rules! impl_stack_float {
    ($($ty:ty),*) => {
        $(
            impl FromStack for $ty {
                fn test(state: &State, pos: usize) -> bool {
                    matches!(state.value_at(pos), Some(Value::Number(_) | Value::Integer(_)))
                }

                fn get(state: &State, pos: usize) -> Self {
                    match state.value_at(pos) {
                        Some(Value::Number(v)) => *v as $ty,
                        Some(Value::Integer(v)) => *v as $ty,
                        _ => 0.0,
                    }
                }

                fn make_default() -> Self {
                    0.0
                }
            }

            impl ToStack for $ty {
                fn push(self, state: &mut State) -> Result<usize, ConversionError> {
                    push_one(state, Value::Number(self as f64))
                }
            }
        )*
    };
}

impl_stack_float!(f32, f64);

// ============================================================================
// Bool implementation
// ============================================================================

impl FromStack for bool {
    fn test(state: &State, pos: usize) -> bool {
        matches!(state.value_at(pos), Some(Value::Boolean(_)))
    }

    fn get(state: &State, pos: usize) -> Self {
        matches!(state.value_at(pos), Some(Value::Boolean(true)))
    }

    fn make_default() -> Self {
        false
    }
}

impl ToStack for bool {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        push_one(state, Value::Boolean(self))
    }
}

// ============================================================================
// String implementations
// ============================================================================

impl FromStack for String {
    fn test(state: &State, pos: usize) -> bool {
        matches!(state.value_at(pos), Some(Value::String(_)))
    }

    fn get(state: &State, pos: usize) -> Self {
        match state.value_at(pos) {
            Some(Value::String(s)) => s.to_string(),
            _ => String::new(),
        }
    }

    fn make_default() -> Self {
        String::new()
    }
}

impl ToStack for String {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        push_one(state, Value::from(self))
    }
}

impl FromStack for Rc<str> {
    fn test(state: &State, pos: usize) -> bool {
        matches!(state.value_at(pos), Some(Value::String(_)))
    }

    fn get(state: &State, pos: usize) -> Self {
        match state.value_at(pos) {
            Some(Value::String(s)) => Rc::clone(s),
            _ => Rc::from(""),
        }
    }

    fn make_default() -> Self {
        Rc::from("")
    }
}

impl ToStack for Rc<str> {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        push_one(state, Value::String(self))
    }
}

// Borrowed strings can be pushed but never read back as a borrow
impl ToStack for &str {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        push_one(state, Value::from(self))
    }
}

// ============================================================================
// Light pointer implementations
// ============================================================================

macro_rules! impl_stack_light_ptr {
    ($($ty:ty => $null:expr),*) => {
        $(
            impl FromStack for $ty {
                fn test(state: &State, pos: usize) -> bool {
                    matches!(state.value_at(pos), Some(Value::LightPtr(_)))
                }

                fn get(state: &State, pos: usize) -> Self {
                    match state.value_at(pos) {
                        Some(Value::LightPtr(p)) => p.as_ptr() as $ty,
                        _ => $null,
                    }
                }

                fn make_default() -> Self {
                    $null
                }
            }

            impl ToStack for $ty {
                fn push(self, state: &mut State) -> Result<usize, ConversionError> {
                    let ptr = NonNull::new(self as *mut c_void).ok_or(ConversionError::NullPointer)?;
                    push_one(state, Value::LightPtr(ptr))
                }
            }
        )*
    };
}

impl_stack_light_ptr!(
    *mut c_void => std::ptr::null_mut(),
    *const c_void => std::ptr::null()
);

// ============================================================================
// Script value implementations
// ============================================================================

impl FromStack for Value {
    fn test(state: &State, pos: usize) -> bool {
        state.value_at(pos).is_some()
    }

    fn get(state: &State, pos: usize) -> Self {
        state.value_at(pos).cloned().unwrap_or_default()
    }

    fn make_default() -> Self {
        Value::Nil
    }
}

impl ToStack for Value {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        push_one(state, self)
    }
}

/// A native-held reference to any non-nil script value.
///
/// Holding a `Handle` keeps the referenced table, function or object alive
/// independently of the stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Handle(Value);

impl Handle {
    pub fn new(value: Value) -> Self {
        Handle(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// True for the default (nil) handle.
    pub fn is_empty(&self) -> bool {
        self.0.is_nil()
    }
}

impl FromStack for Handle {
    fn test(state: &State, pos: usize) -> bool {
        state.value_at(pos).is_some_and(|v| !v.is_nil())
    }

    fn get(state: &State, pos: usize) -> Self {
        Handle(Value::get(state, pos))
    }

    fn make_default() -> Self {
        Handle(Value::Nil)
    }
}

impl ToStack for Handle {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        push_one(state, self.0)
    }
}

impl FromStack for Function {
    fn test(state: &State, pos: usize) -> bool {
        matches!(state.value_at(pos), Some(Value::Function(_)))
    }

    fn get(state: &State, pos: usize) -> Self {
        match state.value_at(pos) {
            Some(Value::Function(f)) => f.clone(),
            _ => Self::make_default(),
        }
    }

    fn make_default() -> Self {
        Function::new("default", |_: &mut State| Ok(0))
    }
}

impl ToStack for Function {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        push_one(state, Value::Function(self))
    }
}

impl FromStack for TableRef {
    fn test(state: &State, pos: usize) -> bool {
        matches!(state.value_at(pos), Some(Value::Table(_)))
    }

    fn get(state: &State, pos: usize) -> Self {
        match state.value_at(pos) {
            Some(Value::Table(t)) => t.clone(),
            _ => TableRef::plain(),
        }
    }

    fn make_default() -> Self {
        TableRef::plain()
    }
}

impl ToStack for TableRef {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        push_one(state, Value::Table(self))
    }
}

// ============================================================================
// Unit (void) implementation
// ============================================================================

impl FromStack for () {
    const WIDTH: usize = 0;

    fn test(_state: &State, _pos: usize) -> bool {
        true
    }

    fn get(_state: &State, _pos: usize) -> Self {}

    fn make_default() -> Self {}
}

impl ToStack for () {
    const WIDTH: usize = 0;

    fn push(self, _state: &mut State) -> Result<usize, ConversionError> {
        Ok(0)
    }
}

// ============================================================================
// Tuple implementations
// ============================================================================

macro_rules! impl_stack_tuple {
    ($($ty:ident $var:ident),+) => {
        impl<$($ty: FromStack),+> FromStack for ($($ty,)+) {
            const WIDTH: usize = 0 $(+ <$ty as FromStack>::WIDTH)+;

            #[allow(unused_assignments)]
            fn test(state: &State, pos: usize) -> bool {
                let mut at = pos;
                $(
                    if !<$ty as FromStack>::test(state, at) {
                        return false;
                    }
                    at += <$ty as FromStack>::WIDTH;
                )+
                true
            }

            #[allow(unused_assignments)]
            fn get(state: &State, pos: usize) -> Self {
                let mut at = pos;
                $(
                    let $var = <$ty as FromStack>::get(state, at);
                    at += <$ty as FromStack>::WIDTH;
                )+
                ($($var,)+)
            }

            fn make_default() -> Self {
                ($(<$ty as FromStack>::make_default(),)+)
            }
        }

        impl<$($ty: ToStack),+> ToStack for ($($ty,)+) {
            const WIDTH: usize = 0 $(+ <$ty as ToStack>::WIDTH)+;

            fn push(self, state: &mut State) -> Result<usize, ConversionError> {
                let top = state.top();
                let ($($var,)+) = self;
                let mut pushed = 0;
                $(
                    match $var.push(state) {
                        Ok(n) => pushed += n,
                        Err(err) => {
                            state.set_top(top);
                            return Err(err);
                        }
                    }
                )+
                Ok(pushed)
            }
        }
    };
}

impl_stack_tuple!(A a);
impl_stack_tuple!(A a, B b);
impl_stack_tuple!(A a, B b, C c);
impl_stack_tuple!(A a, B b, C c, D d);
impl_stack_tuple!(A a, B b, C c, D d, E e);
impl_stack_tuple!(A a, B b, C c, D d, E e, F f);
impl_stack_tuple!(A a, B b, C c, D d, E e, F f, G g);
impl_stack_tuple!(A a, B b, C c, D d, E e, F f, G g, H h);

// ============================================================================
// Enums
// ============================================================================

/// A fieldless enum encoded as an integer.
///
/// Implemented by `#[derive(ScriptEnum)]`, which also generates the
/// [`FromStack`]/[`ToStack`] impls through [`test_enum`] and [`get_enum`].
pub trait ScriptEnum: Copy + 'static {
    /// Script-visible enum name.
    const NAME: &'static str;

    /// Every variant with its script name and integer value.
    fn variants() -> &'static [(&'static str, i64)];

    fn from_discriminant(value: i64) -> Option<Self>;

    fn discriminant(self) -> i64;

    /// Variant used when conversion has no valid input.
    fn fallback() -> Self;
}

/// `test` for enums: the slot holds an integer naming a variant.
pub fn test_enum<E: ScriptEnum>(state: &State, pos: usize) -> bool {
    i64::test(state, pos) && E::from_discriminant(i64::get(state, pos)).is_some()
}

/// `get` for enums.
pub fn get_enum<E: ScriptEnum>(state: &State, pos: usize) -> E {
    E::from_discriminant(i64::get(state, pos)).unwrap_or_else(E::fallback)
}

/// `push` for enums.
pub fn push_enum<E: ScriptEnum>(value: E, state: &mut State) -> Result<usize, ConversionError> {
    value.discriminant().push(state)
}
