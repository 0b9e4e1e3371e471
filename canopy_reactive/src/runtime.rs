// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Thread-local runtime state: the observer stack, the owner stack, batching, and the effect queue.
//!
//! ## Overview
//!
//! Every readable value owns a [`SourceNode`] holding weak links to the observers that read it.
//! Observers ([`Computed`](crate::Computed) and [`Effect`](crate::Effect)) remember the sources
//! they read during their last evaluation so they can unsubscribe before re-evaluating.
//!
//! Effect re-runs are queued and drained when the outermost [`batch`] ends.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::effect::{Effect, EffectInner};
use crate::scope::Scope;

/// Upper bound on effect runs drained by a single flush.
///
/// An effect that writes to one of its own dependencies on every run would
/// otherwise loop forever.
const MAX_EFFECT_RUNS: usize = 100_000;

pub(crate) type ObserverId = u64;

/// Something that reads sources and wants to hear when they change.
pub(crate) trait ObserverNode {
    fn id(&self) -> ObserverId;
    fn add_source(&self, source: Rc<SourceNode>);
    fn mark_dirty(&self);
}

/// Subscriber list shared by every readable reactive value.
#[derive(Default)]
pub(crate) struct SourceNode {
    subscribers: RefCell<Vec<(ObserverId, Weak<dyn ObserverNode>)>>,
}

impl SourceNode {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Register the current observer, if any, as a subscriber.
    pub(crate) fn track(self: &Rc<Self>) {
        let Some(observer) = current_observer() else {
            return;
        };
        {
            let mut subs = self.subscribers.borrow_mut();
            if subs.iter().any(|(id, _)| *id == observer.id()) {
                return;
            }
            subs.push((observer.id(), Rc::downgrade(&observer)));
        }
        observer.add_source(Rc::clone(self));
    }

    pub(crate) fn unsubscribe(&self, id: ObserverId) {
        self.subscribers.borrow_mut().retain(|(sid, _)| *sid != id);
    }

    /// Mark every live subscriber dirty. Effects scheduled here run when the batch ends.
    pub(crate) fn notify(&self) {
        let live: Vec<Rc<dyn ObserverNode>> = {
            let mut subs = self.subscribers.borrow_mut();
            subs.retain(|(_, w)| w.strong_count() > 0);
            subs.iter().filter_map(|(_, w)| w.upgrade()).collect()
        };
        if live.is_empty() {
            return;
        }
        batch(|| {
            for observer in live {
                observer.mark_dirty();
            }
        });
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|(_, w)| w.strong_count() > 0)
            .count()
    }
}

/// The innermost owner that adopts new effects and cleanup callbacks.
#[derive(Clone)]
pub(crate) enum Owner {
    Scope(Scope),
    Effect(Weak<EffectInner>),
}

thread_local! {
    static OBSERVERS: RefCell<Vec<Option<Rc<dyn ObserverNode>>>> = const { RefCell::new(Vec::new()) };
    static OWNERS: RefCell<Vec<Owner>> = const { RefCell::new(Vec::new()) };
    static BATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
    static PENDING: RefCell<VecDeque<Rc<EffectInner>>> = const { RefCell::new(VecDeque::new()) };
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
}

pub(crate) fn next_id() -> ObserverId {
    NEXT_ID.with(|n| {
        let id = n.get();
        n.set(id + 1);
        id
    })
}

fn current_observer() -> Option<Rc<dyn ObserverNode>> {
    OBSERVERS.with(|o| o.borrow().last().cloned().flatten())
}

/// Pops the stack it pushed to even if the closure unwinds.
struct StackGuard<F: Fn()>(F);

impl<F: Fn()> Drop for StackGuard<F> {
    fn drop(&mut self) {
        (self.0)();
    }
}

pub(crate) fn with_observer<R>(observer: Option<Rc<dyn ObserverNode>>, f: impl FnOnce() -> R) -> R {
    OBSERVERS.with(|o| o.borrow_mut().push(observer));
    let _guard = StackGuard(|| {
        OBSERVERS.with(|o| o.borrow_mut().pop());
    });
    f()
}

pub(crate) fn with_owner<R>(owner: Owner, f: impl FnOnce() -> R) -> R {
    OWNERS.with(|o| o.borrow_mut().push(owner));
    let _guard = StackGuard(|| {
        OWNERS.with(|o| o.borrow_mut().pop());
    });
    f()
}

fn current_owner() -> Option<Owner> {
    OWNERS.with(|o| o.borrow().last().cloned())
}

/// Hand a freshly created effect to the innermost owner.
///
/// Effects created inside another effect's run are disposed before that
/// effect runs again.
pub(crate) fn adopt(effect: &Effect) {
    match current_owner() {
        Some(Owner::Scope(scope)) => scope.adopt(effect.clone()),
        Some(Owner::Effect(parent)) => {
            if let Some(parent) = parent.upgrade() {
                let child = effect.clone();
                parent.push_cleanup(Box::new(move || child.dispose()));
            }
        }
        None => {}
    }
}

pub(crate) fn enqueue(effect: Rc<EffectInner>) {
    PENDING.with(|q| q.borrow_mut().push_back(effect));
}

/// Run `f` without an active observer: reads inside `f` register no dependencies.
///
/// ```
/// use canopy_reactive::{untrack, Computed, Observable};
///
/// let a = Observable::new(1);
/// let b = Observable::new(10);
/// let sum = Computed::new({
///     let (a, b) = (a.clone(), b.clone());
///     move || a.get() + untrack(|| b.get())
/// });
/// assert_eq!(sum.get(), 11);
/// b.set(20);
/// assert_eq!(sum.get(), 11);
/// a.set(2);
/// assert_eq!(sum.get(), 22);
/// ```
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    with_observer(None, f)
}

/// Register `f` with the innermost owner.
///
/// Inside an effect run, `f` runs before the effect's next run and when the
/// effect is disposed. Inside [`Scope::run`], `f` runs when the scope is
/// disposed. Outside of both, `f` is dropped without running.
pub fn on_cleanup(f: impl FnOnce() + 'static) {
    match current_owner() {
        Some(Owner::Scope(scope)) => scope.on_cleanup(f),
        Some(Owner::Effect(effect)) => match effect.upgrade() {
            Some(effect) => effect.push_cleanup(Box::new(f)),
            None => f(),
        },
        None => {
            tracing::debug!("on_cleanup called without an owner; callback dropped");
        }
    }
}

/// Returns true while a computed value or effect is collecting dependencies.
pub fn is_tracking() -> bool {
    current_observer().is_some()
}

/// Run `f`, deferring effect re-runs until the outermost batch finishes.
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use canopy_reactive::{batch, Effect, Observable};
///
/// let a = Observable::new(0);
/// let runs = Rc::new(Cell::new(0));
/// let _effect = Effect::new({
///     let (a, runs) = (a.clone(), runs.clone());
///     move || {
///         a.get();
///         runs.set(runs.get() + 1);
///     }
/// });
/// batch(|| {
///     a.set(1);
///     a.set(2);
/// });
/// assert_eq!(runs.get(), 2);
/// ```
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    BATCH_DEPTH.with(|d| d.set(d.get() + 1));
    let result = {
        let _guard = StackGuard(|| BATCH_DEPTH.with(|d| d.set(d.get() - 1)));
        f()
    };
    if BATCH_DEPTH.with(Cell::get) == 0 {
        flush();
    }
    result
}

fn flush() {
    BATCH_DEPTH.with(|d| d.set(d.get() + 1));
    let _guard = StackGuard(|| BATCH_DEPTH.with(|d| d.set(d.get() - 1)));
    let mut runs = 0_usize;
    loop {
        let Some(effect) = PENDING.with(|q| q.borrow_mut().pop_front()) else {
            break;
        };
        runs += 1;
        if runs > MAX_EFFECT_RUNS {
            let dropped = PENDING.with(|q| {
                let mut q = q.borrow_mut();
                let n = q.len();
                for e in q.drain(..) {
                    e.dequeue();
                }
                n
            });
            effect.dequeue();
            tracing::warn!(
                runs,
                dropped,
                "effect queue did not settle; dropping pending effects"
            );
            break;
        }
        effect.run_queued();
    }
}
