//! Intrusive reference counting.
//!
//! An intrusively counted type embeds a [`RefCount`] and exposes it through
//! [`Intrusive`]. [`IntrusivePtr`] owns one count: cloning increments it,
//! dropping decrements it, and the object is freed when it reaches zero.
//! Counts are atomic, so handles may be cloned and dropped on other threads
//! when `T: Send + Sync`.

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering, fence};

/// Embedded atomic reference counter.
#[derive(Default)]
pub struct RefCount(AtomicUsize);

impl RefCount {
    pub fn new() -> Self {
        RefCount(AtomicUsize::new(0))
    }

    /// Current count.
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns true when the last count was released.
    fn decrement(&self) -> bool {
        if self.0.fetch_sub(1, Ordering::Release) != 1 {
            return false;
        }
        fence(Ordering::Acquire);
        true
    }
}

impl fmt::Debug for RefCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefCount({})", self.get())
    }
}

/// A type carrying its own reference count.
pub trait Intrusive: Any {
    fn ref_count(&self) -> &RefCount;
}

/// Owning pointer to an intrusively counted object.
pub struct IntrusivePtr<T: Intrusive> {
    ptr: NonNull<T>,
}

impl<T: Intrusive> IntrusivePtr<T> {
    /// Move `value` to the heap and take the first count.
    pub fn new(value: T) -> Self {
        let ptr = NonNull::from(Box::leak(Box::new(value)));
        // SAFETY: ptr was just allocated and is valid
        unsafe { ptr.as_ref() }.ref_count().increment();
        Self { ptr }
    }

    /// Number of live handles.
    pub fn count(this: &Self) -> usize {
        this.ref_count().get()
    }

    /// Mutable access, available only while this is the sole handle.
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        if Self::count(this) != 1 {
            return None;
        }
        // SAFETY: the count is 1 and `this` is borrowed mutably, so no other
        // reference to the object exists
        Some(unsafe { this.ptr.as_mut() })
    }

    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.ptr == other.ptr
    }
}

impl<T: Intrusive> Deref for IntrusivePtr<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the object stays allocated while this handle holds a count
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: Intrusive> Clone for IntrusivePtr<T> {
    fn clone(&self) -> Self {
        self.ref_count().increment();
        Self { ptr: self.ptr }
    }
}

impl<T: Intrusive> Drop for IntrusivePtr<T> {
    fn drop(&mut self) {
        if self.ref_count().decrement() {
            // SAFETY: the pointer came from Box::leak and this was the last count
            drop(unsafe { Box::from_raw(self.ptr.as_ptr()) });
        }
    }
}

impl<T: Intrusive + fmt::Debug> fmt::Debug for IntrusivePtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

// SAFETY: the counter is atomic and the pointee is shared only as &T
unsafe impl<T: Intrusive + Send + Sync> Send for IntrusivePtr<T> {}
unsafe impl<T: Intrusive + Send + Sync> Sync for IntrusivePtr<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    struct Tracked {
        count: RefCount,
        value: i32,
        dropped: Arc<AtomicBool>,
    }

    impl Intrusive for Tracked {
        fn ref_count(&self) -> &RefCount {
            &self.count
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    fn tracked(value: i32) -> (IntrusivePtr<Tracked>, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        let ptr = IntrusivePtr::new(Tracked {
            count: RefCount::new(),
            value,
            dropped: dropped.clone(),
        });
        (ptr, dropped)
    }

    #[test]
    fn clone_and_drop_adjust_the_count() {
        let (first, dropped) = tracked(3);
        assert_eq!(IntrusivePtr::count(&first), 1);
        let second = first.clone();
        assert_eq!(IntrusivePtr::count(&first), 2);
        assert!(IntrusivePtr::ptr_eq(&first, &second));
        drop(first);
        assert!(!dropped.load(Ordering::SeqCst));
        assert_eq!(second.value, 3);
        drop(second);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn get_mut_requires_sole_handle() {
        let (mut first, _) = tracked(1);
        IntrusivePtr::get_mut(&mut first).unwrap().value = 2;
        let second = first.clone();
        assert!(IntrusivePtr::get_mut(&mut first).is_none());
        drop(second);
        assert_eq!(IntrusivePtr::get_mut(&mut first).unwrap().value, 2);
    }

    #[test]
    fn counts_survive_other_threads() {
        let (ptr, dropped) = tracked(9);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let local = ptr.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let extra = local.clone();
                        drop(extra);
                    }
                    local.value
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 9);
        }
        assert_eq!(IntrusivePtr::count(&ptr), 1);
        drop(ptr);
        assert!(dropped.load(Ordering::SeqCst));
    }
}
