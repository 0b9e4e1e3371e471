// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identity-compared leaves.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// A shared value compared by identity rather than by content.
///
/// Normalized option structs compare equal field by field to decide whether
/// anything changed. Values that must not be compared structurally (callbacks,
/// handles to external resources) are wrapped in `Opaque` so two wrappers are
/// equal only when they point at the same allocation.
///
/// ```
/// use std::rc::Rc;
/// use canopy_reactive::Opaque;
///
/// let f: Rc<dyn Fn(i32) -> i32> = Rc::new(|x| x + 1);
/// let a = Opaque::new(f.clone());
/// let b = Opaque::new(f);
/// let c: Opaque<dyn Fn(i32) -> i32> = Opaque::new(Rc::new(|x| x + 1));
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// assert_eq!(a(1), 2);
/// ```
pub struct Opaque<T: ?Sized>(Rc<T>);

impl<T: ?Sized> Opaque<T> {
    /// Wrap a shared value.
    pub fn new(value: Rc<T>) -> Self {
        Self(value)
    }

    /// The wrapped `Rc`.
    pub fn as_rc(&self) -> &Rc<T> {
        &self.0
    }

    /// Unwrap into the inner `Rc`.
    pub fn into_rc(self) -> Rc<T> {
        self.0
    }
}

impl<T: ?Sized> Clone for Opaque<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: ?Sized> PartialEq for Opaque<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Eq for Opaque<T> {}

impl<T: ?Sized> Deref for Opaque<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized> From<Rc<T>> for Opaque<T> {
    fn from(value: Rc<T>) -> Self {
        Self(value)
    }
}

impl<T: ?Sized> fmt::Debug for Opaque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({:p})", Rc::as_ptr(&self.0))
    }
}
