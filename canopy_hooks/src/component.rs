// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Component host: hook slots, mount and unmount.
//!
//! A [`Component`] owns a render function and a [`Scope`]. Each render gets a
//! [`Cx`] through which hooks claim persistent slots in call order, the way a
//! retained UI framework keeps per-instance hook state between renders.
//!
//! ```
//! use canopy_hooks::{Component, Env};
//! use canopy_reactive::Observable;
//!
//! let mut counter = Component::mount(Env::headless(), |cx| {
//!     let count = cx.use_hook(|| Observable::new(0));
//!     count.update(|c| *c += 1);
//!     count.peek()
//! });
//! assert_eq!(*counter.output(), 1);
//! assert_eq!(*counter.rerender(), 2);
//! counter.unmount();
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use canopy_dom::Document;
use canopy_reactive::{Scope, untrack};

use crate::env::Env;

type Render<T> = Box<dyn FnMut(&mut Cx<'_>) -> T>;
type MountCallback = Box<dyn FnOnce()>;

/// A mounted component instance.
///
/// Dropping the component unmounts it.
pub struct Component<T> {
    env: Env,
    scope: Scope,
    slots: Vec<Rc<dyn Any>>,
    render: Render<T>,
    output: T,
    renders: u64,
}

impl<T> fmt::Debug for Component<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("hooks", &self.slots.len())
            .field("renders", &self.renders)
            .field("mounted", &self.is_mounted())
            .finish_non_exhaustive()
    }
}

impl<T> Component<T> {
    /// Render once, then run the callbacks registered with [`Cx::use_mount`].
    pub fn mount(env: Env, render: impl FnMut(&mut Cx<'_>) -> T + 'static) -> Self {
        let scope = Scope::new();
        let mut render: Render<T> = Box::new(render);
        let mut slots = Vec::new();
        let mut mounted = Vec::new();
        let output = render_once(&env, &scope, &mut slots, &mut mounted, true, &mut render);
        scope.run(|| {
            untrack(|| {
                for callback in mounted {
                    callback();
                }
            });
        });
        tracing::debug!(hooks = slots.len(), "component mounted");
        Self {
            env,
            scope,
            slots,
            render,
            output,
            renders: 1,
        }
    }

    /// Render again with the same hook slots.
    ///
    /// After [`unmount`](Self::unmount) this returns the last output without rendering.
    pub fn rerender(&mut self) -> &T {
        if self.scope.is_disposed() {
            tracing::debug!("rerender after unmount ignored");
            return &self.output;
        }
        let mut unused = Vec::new();
        self.output = render_once(
            &self.env,
            &self.scope,
            &mut self.slots,
            &mut unused,
            false,
            &mut self.render,
        );
        self.renders += 1;
        &self.output
    }

    /// The output of the most recent render.
    pub fn output(&self) -> &T {
        &self.output
    }

    /// Number of renders so far.
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// The environment the component was mounted with.
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Returns true until [`unmount`](Self::unmount).
    pub fn is_mounted(&self) -> bool {
        !self.scope.is_disposed()
    }

    /// Dispose every effect and cleanup the hooks registered. Idempotent.
    pub fn unmount(&mut self) {
        if self.scope.is_disposed() {
            return;
        }
        self.scope.dispose();
        tracing::debug!(renders = self.renders, "component unmounted");
    }
}

impl<T> Drop for Component<T> {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn render_once<T>(
    env: &Env,
    scope: &Scope,
    slots: &mut Vec<Rc<dyn Any>>,
    mounted: &mut Vec<MountCallback>,
    first_render: bool,
    render: &mut Render<T>,
) -> T {
    scope.run(|| {
        untrack(|| {
            let mut cx = Cx {
                env,
                scope,
                slots,
                cursor: 0,
                first_render,
                mounted,
            };
            let output = render(&mut cx);
            assert!(
                cx.cursor == cx.slots.len(),
                "hook order changed between renders"
            );
            output
        })
    })
}

/// Per-render hook context.
pub struct Cx<'a> {
    env: &'a Env,
    scope: &'a Scope,
    slots: &'a mut Vec<Rc<dyn Any>>,
    cursor: usize,
    first_render: bool,
    mounted: &'a mut Vec<MountCallback>,
}

impl fmt::Debug for Cx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cx")
            .field("cursor", &self.cursor)
            .field("hooks", &self.slots.len())
            .field("first_render", &self.first_render)
            .finish_non_exhaustive()
    }
}

impl Cx<'_> {
    /// The component's environment.
    pub fn env(&self) -> &Env {
        self.env
    }

    /// The environment's document, if any.
    pub fn document(&self) -> Option<&Document> {
        self.env.document()
    }

    /// The component's scope.
    pub fn scope(&self) -> &Scope {
        self.scope
    }

    /// Returns true during the render performed by [`Component::mount`].
    pub fn is_first_render(&self) -> bool {
        self.first_render
    }

    /// Claim the next hook slot, initializing it with `init` on the first render.
    ///
    /// # Panics
    ///
    /// If hooks are called in a different order, or a different number of
    /// times, than on the first render.
    pub fn use_hook<S: 'static>(&mut self, init: impl FnOnce() -> S) -> Rc<S> {
        match self.existing::<S>() {
            Some(slot) => slot,
            None => self.push(init()),
        }
    }

    /// A slot holding the value passed on the most recent render.
    ///
    /// Closures installed once (listeners, observer callbacks) read through it
    /// to see the current render's values.
    pub fn use_latest<S: 'static>(&mut self, value: S) -> Rc<RefCell<S>> {
        match self.existing::<RefCell<S>>() {
            Some(slot) => {
                *slot.borrow_mut() = value;
                slot
            }
            None => self.push(RefCell::new(value)),
        }
    }

    /// Run `f` once, after the first render, inside the component scope.
    ///
    /// Effects created by `f` belong to the component and are disposed on unmount.
    pub fn use_mount(&mut self, f: impl FnOnce() + 'static) {
        if self.first_render {
            self.mounted.push(Box::new(f));
        }
    }

    /// Run `f` when the component unmounts. Registered on the first render only.
    pub fn on_unmount(&mut self, f: impl FnOnce() + 'static) {
        if self.first_render {
            self.scope.on_cleanup(f);
        }
    }

    fn existing<S: 'static>(&mut self) -> Option<Rc<S>> {
        let index = self.cursor;
        self.cursor += 1;
        let slot = self.slots.get(index)?.clone();
        Some(
            slot.downcast::<S>()
                .unwrap_or_else(|_| panic!("hook order changed between renders")),
        )
    }

    fn push<S: 'static>(&mut self, value: S) -> Rc<S> {
        assert!(self.first_render, "hook order changed between renders");
        let slot = Rc::new(value);
        self.slots.push(slot.clone());
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_reactive::{Effect, Observable};
    use std::cell::Cell;

    #[test]
    fn slots_persist_across_renders() {
        let mut c = Component::mount(Env::headless(), |cx| {
            let a = cx.use_hook(|| Cell::new(0));
            let b = cx.use_hook(|| String::from("b"));
            a.set(a.get() + 1);
            (a.get(), b.len())
        });
        assert_eq!(*c.output(), (1, 1));
        assert_eq!(*c.rerender(), (2, 1));
        assert_eq!(c.render_count(), 2);
    }

    #[test]
    fn use_latest_tracks_the_last_render() {
        let input = Rc::new(Cell::new(1));
        let mut c = Component::mount(Env::headless(), {
            let input = input.clone();
            move |cx| cx.use_latest(input.get())
        });
        let slot = c.output().clone();
        input.set(5);
        c.rerender();
        assert_eq!(*slot.borrow(), 5);
        assert!(Rc::ptr_eq(&slot, c.output()));
    }

    #[test]
    fn mount_callbacks_run_after_render_and_effects_die_with_unmount() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let source = Observable::new(0);
        let mut c = Component::mount(Env::headless(), {
            let (log, source) = (log.clone(), source.clone());
            move |cx| {
                log.borrow_mut().push("render");
                let (log, source) = (log.clone(), source.clone());
                cx.use_mount(move || {
                    Effect::new(move || {
                        source.get();
                        log.borrow_mut().push("effect");
                    });
                });
            }
        });
        source.set(1);
        c.rerender();
        c.unmount();
        c.unmount();
        source.set(2);
        assert_eq!(*log.borrow(), ["render", "effect", "effect", "render"]);
        assert!(!c.is_mounted());
    }

    #[test]
    fn drop_runs_unmount_callbacks() {
        let released = Rc::new(Cell::new(false));
        let c = Component::mount(Env::headless(), {
            let released = released.clone();
            move |cx| {
                let released = released.clone();
                cx.on_unmount(move || released.set(true));
            }
        });
        assert!(!released.get());
        drop(c);
        assert!(released.get());
    }

    #[test]
    #[should_panic(expected = "hook order changed between renders")]
    fn conditional_hooks_are_rejected() {
        let toggle = Rc::new(Cell::new(false));
        let mut c = Component::mount(Env::headless(), {
            let toggle = toggle.clone();
            move |cx| {
                if toggle.get() {
                    cx.use_hook(|| 0_u8);
                }
                cx.use_hook(String::new);
            }
        });
        toggle.set(true);
        c.rerender();
    }
}
