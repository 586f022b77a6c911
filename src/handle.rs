//! Shared-ownership handles for objects that cross the host boundary.
//!
//! Every object the adapter hands to the host service (enumerators, the
//! collection loader, the fallback observer) and every object the host hands
//! back (fonts, faces, streams, collections) travels as a [`Handle`]. The
//! reference count is atomic so the host's own worker threads may release a
//! handle concurrently with the adapter; the wrapped value is destroyed
//! exactly once, when the last owner lets go.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

pub struct Handle<T: ?Sized> {
    inner: Arc<T>,
}

impl<T> Handle<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }
}

impl<T: ?Sized> Handle<T> {
    /// Wraps an existing shared allocation. Used to erase a concrete type
    /// into a trait object: `Handle::from_arc(Arc::new(x) as Arc<dyn Trait>)`.
    pub fn from_arc(inner: Arc<T>) -> Self {
        Self { inner }
    }

    /// Number of live owners, including `this`.
    pub fn ref_count(this: &Self) -> usize {
        Arc::strong_count(&this.inner)
    }

    /// Releases one ownership and returns the number of owners left.
    ///
    /// A return value of zero means the value has been destroyed.
    pub fn release(this: Self) -> usize {
        let remaining = Arc::strong_count(&this.inner) - 1;
        if remaining == 0 {
            log::trace!("releasing last owner of {}", std::any::type_name::<T>());
        }
        drop(this);
        remaining
    }

    /// Identity comparison that ignores trait-object metadata.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&a.inner), Arc::as_ptr(&b.inner))
    }
}

impl<T: ?Sized> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized> From<Arc<T>> for Handle<T> {
    fn from(inner: Arc<T>) -> Self {
        Self::from_arc(inner)
    }
}

impl<T: ?Sized> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("type", &std::any::type_name::<T>())
            .field("refs", &Arc::strong_count(&self.inner))
            .finish()
    }
}
