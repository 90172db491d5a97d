//! Native function storage and callable trait.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::error::ScriptError;
use crate::state::State;

/// Upcast helper so type-erased callables can be inspected after storage.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Trait for callable native functions.
///
/// A callable reads its arguments from the current frame of the [`State`]
/// (positions `1..=top`), pushes its results and returns how many values it
/// pushed. Returning `Err` aborts the current script call.
pub trait NativeCallable: AsAny {
    /// Call this function against the given state.
    fn call(&self, state: &mut State) -> Result<usize, ScriptError>;
}

// Implement NativeCallable for closures that take the state
impl<F> NativeCallable for F
where
    F: Fn(&mut State) -> Result<usize, ScriptError> + 'static,
{
    fn call(&self, state: &mut State) -> Result<usize, ScriptError> {
        (self)(state)
    }
}

/// Type-erased native function.
///
/// Cloning shares the underlying callable, so a function bound in several
/// tables is still one function.
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    inner: Rc<dyn NativeCallable>,
}

impl Function {
    /// Create a new function from a closure over the state.
    pub fn new<F>(name: impl Into<Rc<str>>, f: F) -> Self
    where
        F: Fn(&mut State) -> Result<usize, ScriptError> + 'static,
    {
        Self::from_callable(name, f)
    }

    /// Create a new function from any callable.
    pub fn from_callable<C>(name: impl Into<Rc<str>>, callable: C) -> Self
    where
        C: NativeCallable + 'static,
    {
        Self {
            name: name.into(),
            inner: Rc::new(callable),
        }
    }

    /// Name the function was created with (used in diagnostics).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call this function with the given state.
    pub fn call(&self, state: &mut State) -> Result<usize, ScriptError> {
        self.inner.call(state)
    }

    /// Access the concrete callable, if it is a `C`.
    pub fn downcast_ref<C: NativeCallable + 'static>(&self) -> Option<&C> {
        let callable: &dyn NativeCallable = &*self.inner;
        callable.as_any().downcast_ref::<C>()
    }

    /// Check whether two functions share the same callable.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    struct Counter(usize);

    impl NativeCallable for Counter {
        fn call(&self, state: &mut State) -> Result<usize, ScriptError> {
            state.push(Value::Integer(self.0 as i64))?;
            Ok(1)
        }
    }

    #[test]
    fn closure_is_callable() {
        let mut state = State::new();
        let f = Function::new("answer", |state: &mut State| {
            state.push(Value::Integer(42))?;
            Ok(1)
        });
        assert_eq!(f.call(&mut state).unwrap(), 1);
        assert_eq!(state.value_at(1), Some(&Value::Integer(42)));
    }

    #[test]
    fn downcast_to_concrete_callable() {
        let f = Function::from_callable("counter", Counter(3));
        assert_eq!(f.downcast_ref::<Counter>().map(|c| c.0), Some(3));
        assert!(f.name() == "counter");
    }

    #[test]
    fn clones_share_identity() {
        let f = Function::from_callable("counter", Counter(1));
        let g = f.clone();
        let h = Function::from_callable("counter", Counter(1));
        assert!(f.ptr_eq(&g));
        assert!(!f.ptr_eq(&h));
    }
}
