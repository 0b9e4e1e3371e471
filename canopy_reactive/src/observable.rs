// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mutable reactive cells.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::runtime::SourceNode;

/// A shared, mutable reactive cell.
///
/// Cloning an `Observable` creates another handle to the **same** value.
///
/// - [`get`](Self::get) and [`with`](Self::with) read the value and register a
///   dependency for the running [`Computed`](crate::Computed) or
///   [`Effect`](crate::Effect).
/// - [`peek`](Self::peek) and [`with_untracked`](Self::with_untracked) read
///   without registering anything.
/// - [`set`](Self::set) and [`update`](Self::update) write and notify
///   subscribers.
///
/// ```
/// use canopy_reactive::{Computed, Observable};
///
/// let count = Observable::new(2);
/// let doubled = Computed::new({
///     let count = count.clone();
///     move || count.get() * 2
/// });
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

struct ObservableInner<T> {
    value: RefCell<T>,
    source: Rc<SourceNode>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observable")
            .field(&*self.inner.value.borrow())
            .finish()
    }
}

impl<T> Observable<T> {
    /// Create a cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                value: RefCell::new(value),
                source: SourceNode::new(),
            }),
        }
    }

    /// Borrow the value, registering a dependency.
    ///
    /// Writing to the same cell from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.source.track();
        f(&self.inner.value.borrow())
    }

    /// Borrow the value without registering a dependency.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.inner.source.notify();
    }

    /// Replace the value, returning the previous one, and notify subscribers.
    pub fn replace(&self, value: T) -> T {
        let old = self.inner.value.replace(value);
        self.inner.source.notify();
        old
    }

    /// Mutate the value in place and notify subscribers.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.inner.value.borrow_mut());
        self.inner.source.notify();
        result
    }

    /// Returns true if both handles point at the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live computed values and effects subscribed to this cell.
    pub fn subscriber_count(&self) -> usize {
        self.inner.source.subscriber_count()
    }
}

impl<T: Clone> Observable<T> {
    /// Tracked read.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Untracked read.
    pub fn peek(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T: PartialEq> Observable<T> {
    /// Write `value` only if it differs from the current value.
    ///
    /// Returns true if the value changed (and subscribers were notified).
    pub fn set_if_changed(&self, value: T) -> bool {
        if *self.inner.value.borrow() == value {
            return false;
        }
        self.set(value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Computed, Effect};
    use std::cell::Cell;

    #[test]
    fn get_and_peek_return_current_value() {
        let o = Observable::new(3);
        assert_eq!(o.get(), 3);
        assert_eq!(o.peek(), 3);
        o.set(4);
        assert_eq!(o.get(), 4);
        assert_eq!(o.replace(5), 4);
        assert_eq!(o.update(|v| core::mem::take(v)), 5);
        assert_eq!(o.peek(), 0);
    }

    #[test]
    fn clones_share_the_cell() {
        let a = Observable::new(String::from("a"));
        let b = a.clone();
        b.set(String::from("b"));
        assert_eq!(a.peek(), "b");
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Observable::new(String::new())));
    }

    #[test]
    fn peek_registers_no_dependency() {
        let o = Observable::new(1);
        let runs = Rc::new(Cell::new(0));
        let _e = Effect::new({
            let (o, runs) = (o.clone(), runs.clone());
            move || {
                o.peek();
                runs.set(runs.get() + 1);
            }
        });
        assert_eq!(o.subscriber_count(), 0);
        o.set(2);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn set_if_changed_skips_equal_values() {
        let o = Observable::new(7);
        let c = Computed::new({
            let o = o.clone();
            move || o.get() + 1
        });
        assert_eq!(c.get(), 8);
        let version = c.version();
        assert!(!o.set_if_changed(7));
        assert_eq!(c.get(), 8);
        assert_eq!(c.version(), version, "no recompute for an equal write");
        assert!(o.set_if_changed(9));
        assert_eq!(c.get(), 10);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let o = Observable::new(0);
        {
            let c = Computed::new({
                let o = o.clone();
                move || o.get()
            });
            c.get();
            assert_eq!(o.subscriber_count(), 1);
        }
        assert_eq!(o.subscriber_count(), 0);
    }
}
