// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Option normalization.
//!
//! Hooks take their options either as a whole cell
//! ([`MaybeObservableOptions::Observable`]) or as a raw struct whose fields are
//! individually [`MaybeReactive`] ([`MaybeObservableOptions::Fields`]). The raw
//! struct implements [`NormalizeOptions`] and picks, per field, how that field
//! is read through a [`FieldResolver`]:
//!
//! | policy | method | dependency |
//! |---|---|---|
//! | track | [`FieldResolver::track`] | yes |
//! | snapshot | [`FieldResolver::snapshot`] | no, frozen until the options identity changes |
//! | track + opaque | [`FieldResolver::track_opaque`] | yes |
//! | snapshot + opaque | [`FieldResolver::snapshot_opaque`] | no |
//! | track element | [`FieldResolver::track_element`] | yes |
//! | snapshot element | [`FieldResolver::snapshot_element`] | no |
//! | custom | [`FieldResolver::custom`] | whatever the function reads |
//!
//! ```
//! use canopy_hooks::{
//!     Component, Env, FieldResolver, MaybeObservableOptions, NormalizeOptions,
//!     use_maybe_observable_options,
//! };
//! use canopy_reactive::{MaybeReactive, Observable};
//!
//! struct Raw {
//!     step: MaybeReactive<f64>,
//!     origin: MaybeReactive<f64>,
//! }
//!
//! impl NormalizeOptions for Raw {
//!     type Output = (f64, f64);
//!     fn normalize(&self, fields: &FieldResolver) -> (f64, f64) {
//!         (fields.track(&self.step), fields.snapshot("origin", &self.origin))
//!     }
//! }
//!
//! let step = Observable::new(1.0);
//! let origin = Observable::new(0.0);
//! let raw = std::rc::Rc::new(Raw { step: step.clone().into(), origin: origin.clone().into() });
//! let c = Component::mount(Env::headless(), move |cx| {
//!     use_maybe_observable_options(cx, Some(MaybeObservableOptions::Fields(raw.clone())))
//! });
//! let options = c.output().clone();
//! step.set(2.0);
//! origin.set(9.0);
//! assert_eq!(options.get(), Some((2.0, 0.0)));
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use canopy_dom::NodeId;
use canopy_reactive::{Computed, MaybeReactive, Observable, Opaque};

use crate::component::Cx;
use crate::target::MaybeTarget;

/// A raw options struct that knows how to resolve itself.
pub trait NormalizeOptions: 'static {
    /// The resolved options.
    type Output: Clone + 'static;

    /// Resolve every field, choosing a policy per field.
    fn normalize(&self, fields: &FieldResolver) -> Self::Output;
}

/// Options given either as one cell or as a struct of maybe-reactive fields.
pub enum MaybeObservableOptions<R: NormalizeOptions> {
    /// The whole options value is a cell. Field policies do not apply.
    Observable(Observable<R::Output>),
    /// A raw options struct. Its identity is the `Rc` pointer.
    Fields(Rc<R>),
}

impl<R: NormalizeOptions> MaybeObservableOptions<R> {
    /// Returns true if both are the same cell or the same raw struct.
    pub fn same_identity(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Observable(a), Self::Observable(b)) => a.ptr_eq(b),
            (Self::Fields(a), Self::Fields(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<R: NormalizeOptions> Clone for MaybeObservableOptions<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Observable(cell) => Self::Observable(cell.clone()),
            Self::Fields(raw) => Self::Fields(raw.clone()),
        }
    }
}

impl<R: NormalizeOptions> fmt::Debug for MaybeObservableOptions<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Observable(_) => f.write_str("Observable(..)"),
            Self::Fields(_) => f.write_str("Fields(..)"),
        }
    }
}

impl<R: NormalizeOptions> From<R> for MaybeObservableOptions<R> {
    fn from(raw: R) -> Self {
        Self::Fields(Rc::new(raw))
    }
}

impl<R: NormalizeOptions> From<Rc<R>> for MaybeObservableOptions<R> {
    fn from(raw: Rc<R>) -> Self {
        Self::Fields(raw)
    }
}

/// Per-field resolution policies, handed to [`NormalizeOptions::normalize`].
///
/// Snapshots are cached by key until the options identity changes.
#[derive(Clone, Default)]
pub struct FieldResolver {
    snapshots: Rc<RefCell<HashMap<&'static str, Rc<dyn Any>>>>,
}

impl fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldResolver")
            .field("snapshots", &self.snapshots.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FieldResolver {
    /// Tracked read.
    pub fn track<T: Clone + 'static>(&self, field: &MaybeReactive<T>) -> T {
        field.get()
    }

    /// Untracked read, frozen when the options identity settles.
    pub fn snapshot<T: Clone + 'static>(&self, key: &'static str, field: &MaybeReactive<T>) -> T {
        self.cached(key, || field.peek())
    }

    /// Tracked read wrapped as an identity-compared leaf. `None` stays `None`.
    pub fn track_opaque<T: ?Sized + 'static>(
        &self,
        field: &MaybeReactive<Option<Rc<T>>>,
    ) -> Option<Opaque<T>> {
        field.get().map(Opaque::new)
    }

    /// Snapshot read wrapped as an identity-compared leaf. `None` stays `None`.
    pub fn snapshot_opaque<T: ?Sized + 'static>(
        &self,
        key: &'static str,
        field: &MaybeReactive<Option<Rc<T>>>,
    ) -> Option<Opaque<T>> {
        self.snapshot(key, field).map(Opaque::new)
    }

    /// Tracked element read.
    ///
    /// `None` means the field was not set; `Some(None)` means it was set to
    /// something holding no element.
    pub fn track_element(&self, field: &Option<MaybeTarget>) -> Option<Option<NodeId>> {
        field.as_ref().map(MaybeTarget::first_element)
    }

    /// Snapshot element read, with the same `None`/`Some(None)` distinction.
    pub fn snapshot_element(
        &self,
        key: &'static str,
        field: &Option<MaybeTarget>,
    ) -> Option<Option<NodeId>> {
        let target = field.as_ref()?;
        Some(self.cached(key, || target.first_element_untracked()))
    }

    /// Apply `f` to the raw field.
    pub fn custom<F, U>(&self, field: &F, f: impl FnOnce(&F) -> U) -> U {
        f(field)
    }

    pub(crate) fn clear(&self) {
        self.snapshots.borrow_mut().clear();
    }

    fn cached<T: Clone + 'static>(&self, key: &'static str, read: impl FnOnce() -> T) -> T {
        let hit = self
            .snapshots
            .borrow()
            .get(key)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned();
        if let Some(value) = hit {
            return value;
        }
        let value = read();
        self.snapshots
            .borrow_mut()
            .insert(key, Rc::new(value.clone()));
        value
    }
}

struct OptionsSlot<R: NormalizeOptions> {
    raw: Observable<Option<MaybeObservableOptions<R>>>,
    fields: FieldResolver,
    computed: Computed<Option<R::Output>>,
}

fn same_raw<R: NormalizeOptions>(
    a: &Option<MaybeObservableOptions<R>>,
    b: &Option<MaybeObservableOptions<R>>,
) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.same_identity(b),
        (None, None) => true,
        _ => false,
    }
}

/// Resolve hook options into one computed value.
///
/// Absent options resolve to `None`. The computed value re-evaluates when a
/// render passes options of a different identity, and when a tracked field
/// (or the whole cell) changes.
pub fn use_maybe_observable_options<R: NormalizeOptions>(
    cx: &mut Cx<'_>,
    raw: Option<MaybeObservableOptions<R>>,
) -> Computed<Option<R::Output>> {
    let slot = cx.use_hook(|| {
        let cell = Observable::new(raw.clone());
        let fields = FieldResolver::default();
        let computed = Computed::new({
            let (cell, fields) = (cell.clone(), fields.clone());
            move || {
                cell.with(|raw| match raw {
                    None => None,
                    Some(MaybeObservableOptions::Observable(whole)) => Some(whole.get()),
                    Some(MaybeObservableOptions::Fields(raw)) => Some(raw.normalize(&fields)),
                })
            }
        });
        // Evaluate now so snapshots capture the values at mount.
        computed.with_untracked(|_| ());
        OptionsSlot {
            raw: cell,
            fields,
            computed,
        }
    });
    if !slot.raw.with_untracked(|current| same_raw(current, &raw)) {
        slot.fields.clear();
        slot.raw.set(raw);
        slot.computed.with_untracked(|_| ());
    }
    slot.computed.clone()
}

/// Resolve one maybe-reactive value into a computed value, re-keyed when a
/// render passes a value of different identity.
pub fn use_maybe_observable<T: Clone + PartialEq + 'static>(
    cx: &mut Cx<'_>,
    value: impl Into<MaybeReactive<T>>,
) -> Computed<T> {
    let value = value.into();
    let slot = cx.use_hook(|| {
        let cell = Observable::new(value.clone());
        let computed = Computed::new({
            let cell = cell.clone();
            move || cell.with(MaybeReactive::get)
        });
        (cell, computed)
    });
    let (cell, computed) = &*slot;
    if !cell.with_untracked(|current| current.same_identity(&value)) {
        cell.set(value);
    }
    computed.clone()
}
