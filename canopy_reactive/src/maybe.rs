// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Values that may or may not be reactive, and how to resolve them.

use std::fmt;

use crate::{Computed, Observable};

/// A plain value or a reactive cell holding one.
///
/// Hooks accept `MaybeReactive<T>` wherever a caller may want to pass either a
/// constant or something that changes over time.
///
/// ```
/// use canopy_reactive::{MaybeReactive, Observable};
///
/// let fixed: MaybeReactive<i32> = 5.into();
/// let cell = Observable::new(7);
/// let live: MaybeReactive<i32> = cell.clone().into();
/// assert_eq!(fixed.get(), 5);
/// assert_eq!(live.get(), 7);
/// cell.set(8);
/// assert_eq!(live.get(), 8);
/// ```
pub enum MaybeReactive<T> {
    /// A plain value.
    Static(T),
    /// A mutable cell.
    Observable(Observable<T>),
    /// A derived value.
    Computed(Computed<T>),
}

impl<T: Clone> Clone for MaybeReactive<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(v) => Self::Static(v.clone()),
            Self::Observable(o) => Self::Observable(o.clone()),
            Self::Computed(c) => Self::Computed(c.clone()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for MaybeReactive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(v) => f.debug_tuple("Static").field(v).finish(),
            Self::Observable(o) => f.debug_tuple("Observable").field(o).finish(),
            Self::Computed(c) => f.debug_tuple("Computed").field(c).finish(),
        }
    }
}

impl<T: Default> Default for MaybeReactive<T> {
    fn default() -> Self {
        Self::Static(T::default())
    }
}

impl<T> From<T> for MaybeReactive<T> {
    fn from(value: T) -> Self {
        Self::Static(value)
    }
}

impl<T> From<Observable<T>> for MaybeReactive<T> {
    fn from(value: Observable<T>) -> Self {
        Self::Observable(value)
    }
}

impl<T> From<&Observable<T>> for MaybeReactive<T> {
    fn from(value: &Observable<T>) -> Self {
        Self::Observable(value.clone())
    }
}

impl<T> From<Computed<T>> for MaybeReactive<T> {
    fn from(value: Computed<T>) -> Self {
        Self::Computed(value)
    }
}

impl From<&str> for MaybeReactive<String> {
    fn from(value: &str) -> Self {
        Self::Static(value.into())
    }
}

impl<T: 'static> MaybeReactive<T> {
    /// Returns true for the cell variants.
    pub fn is_reactive(&self) -> bool {
        !matches!(self, Self::Static(_))
    }

    /// Borrow the resolved value, registering a dependency on cells.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self {
            Self::Static(v) => f(v),
            Self::Observable(o) => o.with(f),
            Self::Computed(c) => c.with(f),
        }
    }

    /// Borrow the resolved value without registering a dependency.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self {
            Self::Static(v) => f(v),
            Self::Observable(o) => o.with_untracked(f),
            Self::Computed(c) => c.with_untracked(f),
        }
    }

    /// Returns true if both refer to the same cell, or are equal plain values.
    pub fn same_identity(&self, other: &Self) -> bool
    where
        T: PartialEq,
    {
        match (self, other) {
            (Self::Static(a), Self::Static(b)) => a == b,
            (Self::Observable(a), Self::Observable(b)) => a.ptr_eq(b),
            (Self::Computed(a), Self::Computed(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl<T: Clone + 'static> MaybeReactive<T> {
    /// Tracked resolution.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Untracked resolution.
    pub fn peek(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T: 'static> MaybeReactive<Option<T>> {
    /// Resolve (tracked) and project a field off the value.
    ///
    /// Returns `None` when the resolved value is absent; never panics.
    ///
    /// ```
    /// use canopy_reactive::{MaybeReactive, Observable};
    ///
    /// struct Size { width: f64 }
    /// let cell = Observable::new(None::<Size>);
    /// let size: MaybeReactive<Option<Size>> = cell.clone().into();
    /// assert_eq!(size.project(|s| s.width), None);
    /// cell.set(Some(Size { width: 3.0 }));
    /// assert_eq!(size.project(|s| s.width), Some(3.0));
    /// ```
    pub fn project<U>(&self, key: impl FnOnce(&T) -> U) -> Option<U> {
        self.with(|v| v.as_ref().map(key))
    }

    /// Untracked [`project`](Self::project).
    pub fn project_untracked<U>(&self, key: impl FnOnce(&T) -> U) -> Option<U> {
        self.with_untracked(|v| v.as_ref().map(key))
    }
}

/// Resolve a maybe-reactive value, registering a dependency on cells.
pub fn resolve<T: Clone + 'static>(value: &MaybeReactive<T>) -> T {
    value.get()
}

/// Resolve a maybe-reactive value without registering a dependency.
pub fn resolve_untracked<T: Clone + 'static>(value: &MaybeReactive<T>) -> T {
    value.peek()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Effect;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn static_values_pass_through() {
        let v: MaybeReactive<&str> = "plain".into();
        assert!(!v.is_reactive());
        assert_eq!(resolve(&v), "plain");
        assert_eq!(resolve_untracked(&v), "plain");
    }

    #[test]
    fn tracked_resolution_registers_dependency() {
        let cell = Observable::new(1);
        let v = MaybeReactive::<i32>::from(&cell);
        let runs = Rc::new(Cell::new(0));
        let _e = Effect::new({
            let (v, runs) = (v.clone(), runs.clone());
            move || {
                resolve(&v);
                runs.set(runs.get() + 1);
            }
        });
        cell.set(2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn untracked_resolution_registers_nothing() {
        let cell = Observable::new(1);
        let v = MaybeReactive::<i32>::from(&cell);
        let runs = Rc::new(Cell::new(0));
        let _e = Effect::new({
            let (v, runs) = (v.clone(), runs.clone());
            move || {
                resolve_untracked(&v);
                runs.set(runs.get() + 1);
            }
        });
        cell.set(2);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn computed_variant_resolves() {
        let cell = Observable::new(2);
        let c = Computed::new({
            let cell = cell.clone();
            move || cell.get() * 3
        });
        let v: MaybeReactive<i32> = c.into();
        assert_eq!(v.get(), 6);
        cell.set(3);
        assert_eq!(v.peek(), 9);
    }

    #[test]
    fn projection_of_absent_value_is_none() {
        let v: MaybeReactive<Option<(i32, i32)>> = None.into();
        assert_eq!(v.project(|p| p.0), None);
        let v: MaybeReactive<Option<(i32, i32)>> = Some((4, 5)).into();
        assert_eq!(v.project(|p| p.1), Some(5));
        assert_eq!(v.project_untracked(|p| p.0), Some(4));
    }

    #[test]
    fn identity_compares_cells_by_pointer() {
        let a = Observable::new(1);
        let b = Observable::new(1);
        assert!(MaybeReactive::<i32>::from(&a).same_identity(&MaybeReactive::from(&a)));
        assert!(!MaybeReactive::<i32>::from(&a).same_identity(&MaybeReactive::from(&b)));
        assert!(MaybeReactive::<i32>::from(1).same_identity(&MaybeReactive::from(1)));
        assert!(!MaybeReactive::<i32>::from(1).same_identity(&MaybeReactive::from(&a)));
    }

    proptest! {
        #[test]
        fn resolve_matches_cell_or_value(value in any::<i64>(), as_cell in any::<bool>()) {
            let v: MaybeReactive<i64> = if as_cell {
                Observable::new(value).into()
            } else {
                value.into()
            };
            let expected = match &v {
                MaybeReactive::Observable(o) => o.get(),
                MaybeReactive::Computed(c) => c.get(),
                MaybeReactive::Static(s) => *s,
            };
            prop_assert_eq!(resolve(&v), expected);
            prop_assert_eq!(resolve_untracked(&v), value);
        }
    }
}
