// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Reactive: single-threaded fine-grained reactivity.
//!
//! ## Overview
//!
//! This crate is the substrate the Canopy hooks are built on.
//!
//! - [`Observable<T>`]: a mutable cell. [`get`](Observable::get) is a tracked
//!   read, [`peek`](Observable::peek) an untracked one, [`set`](Observable::set)
//!   writes and notifies.
//! - [`Computed<T>`]: a lazily evaluated value derived from whatever it read
//!   during its last evaluation.
//! - [`Effect`]: a side effect that re-runs when its dependencies change.
//! - [`Scope`]: owns effects and cleanup callbacks; disposing it tears
//!   everything down.
//! - [`MaybeReactive<T>`]: a plain value or a cell; [`resolve`] and
//!   [`resolve_untracked`] read either uniformly.
//! - [`Opaque<T>`]: an `Rc` compared by identity, for callbacks and handles
//!   stored inside otherwise structurally compared values.
//!
//! ## Scheduling
//!
//! Writes mark dependent computed values dirty and queue dependent effects.
//! Queued effects run when the outermost [`batch`] ends; a write outside of any
//! batch is its own batch. Effect runs are batched too, so writes performed by
//! an effect are observed after it returns.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use canopy_reactive::{Computed, Effect, Observable, Scope};
//!
//! let width = Observable::new(10.0);
//! let height = Observable::new(5.0);
//! let area = Computed::new({
//!     let (width, height) = (width.clone(), height.clone());
//!     move || width.get() * height.get()
//! });
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let scope = Scope::new();
//! scope.run(|| {
//!     let (area, log) = (area.clone(), log.clone());
//!     Effect::new(move || log.borrow_mut().push(area.get()));
//! });
//!
//! width.set(20.0);
//! scope.dispose();
//! height.set(1.0);
//! assert_eq!(*log.borrow(), [50.0, 100.0]);
//! ```
//!
//! Everything here uses `Rc` and thread-local state; values are not `Send`.

mod computed;
mod effect;
mod maybe;
mod observable;
mod opaque;
mod runtime;
mod scope;

pub use computed::Computed;
pub use effect::Effect;
pub use maybe::{MaybeReactive, resolve, resolve_untracked};
pub use observable::Observable;
pub use opaque::Opaque;
pub use runtime::{batch, is_tracking, on_cleanup, untrack};
pub use scope::Scope;
