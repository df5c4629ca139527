//! The reference-counted handle primitive (component A).
//!
//! Every `Topic` and `Partition` is reached exclusively through a
//! [`Shared<T>`] handle. `keep` and `drop` map onto `Clone`/`Drop` of the
//! underlying `Arc`, so callers never see a raw count — `strong_count`
//! exists only so the test suite can pin the refcount scenarios down.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

pub struct Shared<T: ?Sized>(Arc<T>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Shared(Arc::new(value))
    }
}

impl<T: ?Sized> Shared<T> {
    /// Takes a new strong reference to the same object.
    pub fn keep(&self) -> Self {
        Shared(Arc::clone(&self.0))
    }

    pub fn strong_count(this: &Self) -> usize {
        Arc::strong_count(&this.0)
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        self.keep()
    }
}

impl<T: ?Sized> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Equality by identity, not by value — two distinct objects that
/// happen to compare equal are still different handles.
pub fn shared_opt_ptr_eq<T: ?Sized>(a: &Option<Shared<T>>, b: &Option<Shared<T>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Shared::ptr_eq(a, b),
        _ => false,
    }
}
