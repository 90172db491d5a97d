//! Type-erased ownership handles stored in wrapper payloads.

use std::any::Any;
use std::sync::{Arc, Weak};

use crate::smart_ptr::{Intrusive, IntrusivePtr};

/// A counted handle whose pointee is reached through a callback.
///
/// Callbacks run only while the pointee is reachable; the return value
/// reports whether it ran.
pub(crate) trait ErasedHandle {
    fn with_ref(&self, f: &mut dyn FnMut(&dyn Any)) -> bool;

    /// Runs only when this handle is the sole owner of the pointee.
    fn with_mut(&mut self, f: &mut dyn FnMut(&mut dyn Any)) -> bool;

    fn is_live(&self) -> bool;

    /// The concrete handle (`Arc<T>`, `Weak<T>` or `IntrusivePtr<T>`).
    fn handle(&self) -> &dyn Any;
}

impl<T: Any> ErasedHandle for Arc<T> {
    fn with_ref(&self, f: &mut dyn FnMut(&dyn Any)) -> bool {
        f(&**self);
        true
    }

    fn with_mut(&mut self, f: &mut dyn FnMut(&mut dyn Any)) -> bool {
        match Arc::get_mut(self) {
            Some(value) => {
                f(value);
                true
            }
            None => false,
        }
    }

    fn is_live(&self) -> bool {
        true
    }

    fn handle(&self) -> &dyn Any {
        self
    }
}

impl<T: Any> ErasedHandle for Weak<T> {
    fn with_ref(&self, f: &mut dyn FnMut(&dyn Any)) -> bool {
        match self.upgrade() {
            Some(strong) => {
                f(&*strong);
                true
            }
            None => false,
        }
    }

    // Observers never get exclusive access
    fn with_mut(&mut self, _f: &mut dyn FnMut(&mut dyn Any)) -> bool {
        false
    }

    fn is_live(&self) -> bool {
        self.strong_count() > 0
    }

    fn handle(&self) -> &dyn Any {
        self
    }
}

impl<T: Intrusive> ErasedHandle for IntrusivePtr<T> {
    fn with_ref(&self, f: &mut dyn FnMut(&dyn Any)) -> bool {
        f(&**self);
        true
    }

    fn with_mut(&mut self, f: &mut dyn FnMut(&mut dyn Any)) -> bool {
        match IntrusivePtr::get_mut(self) {
            Some(value) => {
                f(value);
                true
            }
            None => false,
        }
    }

    fn is_live(&self) -> bool {
        true
    }

    fn handle(&self) -> &dyn Any {
        self
    }
}
