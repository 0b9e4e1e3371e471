// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ownership of effects and cleanup callbacks.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::effect::Effect;
use crate::runtime::{self, Owner};

/// An owner for effects and cleanup callbacks.
///
/// Effects created and [`on_cleanup`](crate::on_cleanup) callbacks registered
/// inside [`Scope::run`] belong to the scope. [`Scope::dispose`] disposes the
/// effects, then runs the cleanups in reverse registration order.
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use canopy_reactive::{on_cleanup, Scope};
///
/// let released = Rc::new(Cell::new(false));
/// let scope = Scope::new();
/// scope.run(|| {
///     let released = released.clone();
///     on_cleanup(move || released.set(true));
/// });
/// scope.dispose();
/// assert!(released.get());
/// ```
#[derive(Clone, Default)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

#[derive(Default)]
struct ScopeInner {
    effects: RefCell<Vec<Effect>>,
    cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
    disposed: Cell<bool>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("effects", &self.inner.effects.borrow().len())
            .field("cleanups", &self.inner.cleanups.borrow().len())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

impl Scope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with this scope as the current owner.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        runtime::with_owner(Owner::Scope(self.clone()), f)
    }

    /// Register a cleanup callback. Runs immediately if the scope is already disposed.
    pub fn on_cleanup(&self, f: impl FnOnce() + 'static) {
        if self.inner.disposed.get() {
            f();
            return;
        }
        self.inner.cleanups.borrow_mut().push(Box::new(f));
    }

    /// Dispose owned effects and run cleanups. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let effects = self.inner.effects.take();
        for effect in &effects {
            effect.dispose();
        }
        let cleanups = self.inner.cleanups.take();
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
    }

    /// Returns true once [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    pub(crate) fn adopt(&self, effect: Effect) {
        if self.inner.disposed.get() {
            effect.dispose();
            return;
        }
        self.inner.effects.borrow_mut().push(effect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Observable, on_cleanup};

    #[test]
    fn dispose_stops_owned_effects() {
        let o = Observable::new(0);
        let runs = Rc::new(Cell::new(0));
        let scope = Scope::new();
        scope.run(|| {
            let (o, runs) = (o.clone(), runs.clone());
            Effect::new(move || {
                o.get();
                runs.set(runs.get() + 1);
            });
        });
        o.set(1);
        assert_eq!(runs.get(), 2);
        scope.dispose();
        o.set(2);
        assert_eq!(runs.get(), 2);
        assert_eq!(o.subscriber_count(), 0);
    }

    #[test]
    fn cleanups_run_in_reverse_order_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let scope = Scope::new();
        scope.run(|| {
            for i in 0..3 {
                let log = log.clone();
                on_cleanup(move || log.borrow_mut().push(i));
            }
        });
        scope.dispose();
        scope.dispose();
        assert_eq!(*log.borrow(), [2, 1, 0]);
        assert!(scope.is_disposed());
    }

    #[test]
    fn late_registration_runs_immediately() {
        let scope = Scope::new();
        scope.dispose();
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        scope.on_cleanup(move || flag.set(true));
        assert!(ran.get());
    }
}
