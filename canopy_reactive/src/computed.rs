// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lazily evaluated, memoized derived values.
//!
//! ## Invariants
//!
//! 1. `get()` never returns a value computed before the latest change of a
//!    dependency read during the previous evaluation.
//! 2. The compute function runs at most once per dependency change, and only
//!    when the value is read.
//! 3. Dependencies are collected again on every evaluation, so branches that
//!    stop reading a cell stop depending on it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::runtime::{self, ObserverId, ObserverNode, SourceNode};

/// A derived reactive value.
///
/// Cloning a `Computed` creates another handle to the same cached value.
/// A `Computed` is itself a source: reading it inside another computed value or
/// an effect registers a dependency.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

struct ComputedInner<T> {
    id: ObserverId,
    compute: Box<dyn Fn() -> T>,
    value: RefCell<Option<T>>,
    dirty: Cell<bool>,
    version: Cell<u64>,
    /// Sources read during the last evaluation.
    sources: RefCell<Vec<Rc<SourceNode>>>,
    /// Our own subscribers.
    source: Rc<SourceNode>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("cached", &*self.inner.value.borrow())
            .field("dirty", &self.inner.dirty.get())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: 'static> ObserverNode for ComputedInner<T> {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn add_source(&self, source: Rc<SourceNode>) {
        let mut sources = self.sources.borrow_mut();
        if !sources.iter().any(|s| Rc::ptr_eq(s, &source)) {
            sources.push(source);
        }
    }

    fn mark_dirty(&self) {
        if !self.dirty.replace(true) {
            self.source.notify();
        }
    }
}

impl<T: 'static> Computed<T> {
    /// Create a computed value. The compute function first runs on the first read.
    pub fn new(compute: impl Fn() -> T + 'static) -> Self {
        Self {
            inner: Rc::new(ComputedInner {
                id: runtime::next_id(),
                compute: Box::new(compute),
                value: RefCell::new(None),
                dirty: Cell::new(true),
                version: Cell::new(0),
                sources: RefCell::new(Vec::new()),
                source: SourceNode::new(),
            }),
        }
    }

    /// Borrow the current value, registering a dependency.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.source.track();
        self.with_untracked(f)
    }

    /// Borrow the current value without registering a dependency.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.refresh();
        let value = self.inner.value.borrow();
        f(value
            .as_ref()
            .expect("computed value is populated by refresh"))
    }

    /// Number of evaluations so far.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Returns true if both handles point at the same computed value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn refresh(&self) {
        if !self.inner.dirty.get() && self.inner.value.borrow().is_some() {
            return;
        }
        for source in self.inner.sources.take() {
            source.unsubscribe(self.inner.id);
        }
        self.inner.dirty.set(false);
        let observer: Rc<dyn ObserverNode> = self.inner.clone();
        let next = runtime::with_observer(Some(observer), || (self.inner.compute)());
        *self.inner.value.borrow_mut() = Some(next);
        self.inner.version.set(self.inner.version.get() + 1);
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Tracked read.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Untracked read. Still recomputes if a dependency changed.
    pub fn peek(&self) -> T {
        self.with_untracked(T::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Observable;

    #[test]
    fn lazy_until_first_read() {
        let calls = Rc::new(Cell::new(0));
        let c = Computed::new({
            let calls = calls.clone();
            move || {
                calls.set(calls.get() + 1);
                42
            }
        });
        assert_eq!(calls.get(), 0);
        assert_eq!(c.get(), 42);
        assert_eq!(c.get(), 42);
        assert_eq!(calls.get(), 1, "cached after first read");
    }

    #[test]
    fn recomputes_after_dependency_change() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let sum = Computed::new({
            let (a, b) = (a.clone(), b.clone());
            move || a.get() + b.get()
        });
        assert_eq!(sum.get(), 3);
        a.set(10);
        assert_eq!(sum.get(), 12);
        b.set(20);
        assert_eq!(sum.get(), 30);
        assert_eq!(sum.version(), 3);
    }

    #[test]
    fn chained_computed_values_propagate() {
        let a = Observable::new(2);
        let doubled = Computed::new({
            let a = a.clone();
            move || a.get() * 2
        });
        let quadrupled = Computed::new({
            let doubled = doubled.clone();
            move || doubled.get() * 2
        });
        assert_eq!(quadrupled.get(), 8);
        a.set(3);
        assert_eq!(quadrupled.get(), 12);
    }

    #[test]
    fn dependencies_are_dynamic() {
        let flag = Observable::new(true);
        let a = Observable::new(1);
        let b = Observable::new(100);
        let pick = Computed::new({
            let (flag, a, b) = (flag.clone(), a.clone(), b.clone());
            move || if flag.get() { a.get() } else { b.get() }
        });
        assert_eq!(pick.get(), 1);
        assert_eq!(b.subscriber_count(), 0);
        flag.set(false);
        assert_eq!(pick.get(), 100);
        assert_eq!(a.subscriber_count(), 0, "stale branch unsubscribed");
        assert_eq!(b.subscriber_count(), 1);
    }

    #[test]
    fn peek_does_not_subscribe_outer_observer() {
        let a = Observable::new(1);
        let inner = Computed::new({
            let a = a.clone();
            move || a.get()
        });
        let outer = Computed::new({
            let inner = inner.clone();
            move || inner.peek() + 1
        });
        assert_eq!(outer.get(), 2);
        a.set(5);
        assert_eq!(outer.get(), 2, "outer does not track inner");
        assert_eq!(inner.get(), 5);
    }
}
