// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Side effects that re-run when their dependencies change.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::runtime::{self, ObserverId, ObserverNode, Owner, SourceNode};

type Cleanup = Box<dyn FnOnce()>;

/// A reactive side effect.
///
/// The effect function runs once on creation and again, after the current
/// [`batch`](crate::batch), whenever a value it read during its previous run
/// changes. Callbacks registered with [`on_cleanup`](crate::on_cleanup)
/// during a run execute before the next run and on disposal.
///
/// An effect is owned by the [`Scope`](crate::Scope) (or parent effect) that
/// was current when it was created; free-standing effects live as long as a
/// handle to them does.
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use canopy_reactive::{Effect, Observable};
///
/// let name = Observable::new("a");
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let effect = Effect::new({
///     let (name, seen) = (name.clone(), seen.clone());
///     move || seen.borrow_mut().push(name.get())
/// });
/// name.set("b");
/// effect.dispose();
/// name.set("c");
/// assert_eq!(*seen.borrow(), ["a", "b"]);
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

pub(crate) struct EffectInner {
    id: ObserverId,
    this: Weak<EffectInner>,
    f: RefCell<Box<dyn FnMut()>>,
    sources: RefCell<Vec<Rc<SourceNode>>>,
    cleanups: RefCell<Vec<Cleanup>>,
    dirty: Cell<bool>,
    queued: Cell<bool>,
    disposed: Cell<bool>,
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("disposed", &self.inner.disposed.get())
            .finish_non_exhaustive()
    }
}

impl Effect {
    /// Create an effect and run it immediately.
    pub fn new(f: impl FnMut() + 'static) -> Self {
        let inner = Rc::new_cyclic(|this| EffectInner {
            id: runtime::next_id(),
            this: this.clone(),
            f: RefCell::new(Box::new(f)),
            sources: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            dirty: Cell::new(true),
            queued: Cell::new(false),
            disposed: Cell::new(false),
        });
        let effect = Self { inner };
        runtime::adopt(&effect);
        runtime::batch(|| effect.inner.run());
        effect
    }

    /// Stop the effect and run its pending cleanups.
    ///
    /// Calling this more than once, or from inside the effect itself, is fine.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Returns true once [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Returns true if both handles refer to the same effect.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl EffectInner {
    pub(crate) fn push_cleanup(&self, cleanup: Cleanup) {
        if self.disposed.get() {
            cleanup();
            return;
        }
        self.cleanups.borrow_mut().push(cleanup);
    }

    pub(crate) fn dequeue(&self) {
        self.queued.set(false);
    }

    pub(crate) fn run_queued(&self) {
        self.queued.set(false);
        if self.dirty.get() {
            self.run();
        }
    }

    pub(crate) fn run(&self) {
        if self.disposed.get() {
            return;
        }
        let Some(this) = self.this.upgrade() else {
            return;
        };
        self.dirty.set(false);
        self.run_cleanups();
        for source in self.sources.take() {
            source.unsubscribe(self.id);
        }
        let observer: Rc<dyn ObserverNode> = this.clone();
        runtime::with_owner(Owner::Effect(Rc::downgrade(&this)), || {
            runtime::with_observer(Some(observer), || {
                let Ok(mut f) = self.f.try_borrow_mut() else {
                    tracing::warn!(id = self.id, "effect re-entered while running; skipped");
                    return;
                };
                f();
            });
        });
    }

    fn run_cleanups(&self) {
        let cleanups = self.cleanups.take();
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.run_cleanups();
        for source in self.sources.take() {
            source.unsubscribe(self.id);
        }
        if let Ok(mut f) = self.f.try_borrow_mut() {
            *f = Box::new(|| {});
        }
    }
}

impl ObserverNode for EffectInner {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn add_source(&self, source: Rc<SourceNode>) {
        if self.disposed.get() {
            return;
        }
        let mut sources = self.sources.borrow_mut();
        if !sources.iter().any(|s| Rc::ptr_eq(s, &source)) {
            sources.push(source);
        }
    }

    fn mark_dirty(&self) {
        if self.disposed.get() {
            return;
        }
        self.dirty.set(true);
        if self.queued.replace(true) {
            return;
        }
        if let Some(this) = self.this.upgrade() {
            runtime::enqueue(this);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Observable, Scope, batch, on_cleanup, untrack};

    #[test]
    fn reruns_on_change() {
        let o = Observable::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _e = Effect::new({
            let (o, seen) = (o.clone(), seen.clone());
            move || seen.borrow_mut().push(o.get())
        });
        o.set(2);
        o.set(3);
        assert_eq!(*seen.borrow(), [1, 2, 3]);
    }

    #[test]
    fn batch_coalesces_runs() {
        let a = Observable::new(0);
        let b = Observable::new(0);
        let runs = Rc::new(Cell::new(0));
        let _e = Effect::new({
            let (a, b, runs) = (a.clone(), b.clone(), runs.clone());
            move || {
                a.get();
                b.get();
                runs.set(runs.get() + 1);
            }
        });
        batch(|| {
            a.set(1);
            b.set(1);
            a.set(2);
        });
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn cleanup_runs_before_next_run_and_on_dispose() {
        let o = Observable::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let e = Effect::new({
            let (o, log) = (o.clone(), log.clone());
            move || {
                let v = o.get();
                log.borrow_mut().push(format!("run {v}"));
                let log = log.clone();
                on_cleanup(move || log.borrow_mut().push(format!("cleanup {v}")));
            }
        });
        o.set(1);
        e.dispose();
        e.dispose();
        assert_eq!(
            *log.borrow(),
            ["run 0", "cleanup 0", "run 1", "cleanup 1"],
        );
    }

    #[test]
    fn dispose_from_inside_the_effect() {
        let o = Observable::new(0);
        let slot: Rc<RefCell<Option<Effect>>> = Rc::new(RefCell::new(None));
        let runs = Rc::new(Cell::new(0));
        let e = Effect::new({
            let (o, slot, runs) = (o.clone(), slot.clone(), runs.clone());
            move || {
                runs.set(runs.get() + 1);
                if o.get() > 0 {
                    if let Some(e) = slot.borrow().as_ref() {
                        e.dispose();
                    }
                }
            }
        });
        *slot.borrow_mut() = Some(e.clone());
        o.set(1);
        o.set(2);
        assert!(e.is_disposed());
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn writes_inside_an_effect_settle() {
        let source = Observable::new(1);
        let mirror = Observable::new(0);
        let _copy = Effect::new({
            let (source, mirror) = (source.clone(), mirror.clone());
            move || mirror.set(source.get() * 10)
        });
        assert_eq!(mirror.peek(), 10);
        source.set(2);
        assert_eq!(mirror.peek(), 20);
    }

    #[test]
    fn untracked_reads_do_not_rerun() {
        let o = Observable::new(0);
        let runs = Rc::new(Cell::new(0));
        let _e = Effect::new({
            let (o, runs) = (o.clone(), runs.clone());
            move || {
                untrack(|| o.get());
                runs.set(runs.get() + 1);
            }
        });
        o.set(1);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn nested_effects_are_disposed_with_their_parent_run() {
        let outer_dep = Observable::new(0);
        let inner_dep = Observable::new(0);
        let inner_runs = Rc::new(Cell::new(0));
        let scope = Scope::new();
        scope.run(|| {
            Effect::new({
                let (outer_dep, inner_dep, inner_runs) =
                    (outer_dep.clone(), inner_dep.clone(), inner_runs.clone());
                move || {
                    outer_dep.get();
                    let (inner_dep, inner_runs) = (inner_dep.clone(), inner_runs.clone());
                    Effect::new(move || {
                        inner_dep.get();
                        inner_runs.set(inner_runs.get() + 1);
                    });
                }
            });
        });
        outer_dep.set(1);
        assert_eq!(inner_dep.subscriber_count(), 1, "old inner effect disposed");
        inner_dep.set(1);
        assert_eq!(inner_runs.get(), 3);
        scope.dispose();
        assert_eq!(inner_dep.subscriber_count(), 0);
    }
}
