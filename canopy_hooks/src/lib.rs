// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Hooks: reactive UI hooks over a headless document.
//!
//! ## Overview
//!
//! Every hook here is assembled from three pieces:
//!
//! - the target normalizer ([`MaybeTarget`], [`use_target`]), which turns an
//!   element, a [`TargetRef`], a cell, a derived list or any mix of them into
//!   an ordered set of event targets;
//! - the option normalizer ([`MaybeObservableOptions`],
//!   [`use_maybe_observable_options`]), which resolves options given either as
//!   one cell or as a struct of maybe-reactive fields, with a resolution policy
//!   chosen per field;
//! - the event binder ([`use_event_listener`]), which keeps one stable
//!   forwarder registered per (target, event) and re-binds whenever the target
//!   set changes.
//!
//! Hooks run inside a [`Component`]: a render function with per-instance hook
//! slots, a mount phase (where subscriptions are made) and an unmount phase
//! (where all of them are released). The component reads its platform from an
//! [`Env`], which is either a [`canopy_dom::Document`] or nothing at all.
//!
//! ## Feature hooks
//!
//! - Pointer: [`use_draggable`], [`use_drop_zone`], [`use_mouse`],
//!   [`use_mouse_in_element`], [`use_element_hover`].
//! - Observers: [`use_resize_observer`], [`use_intersection_observer`],
//!   [`use_mutation_observer`].
//! - Geometry: [`use_element_size`], [`use_element_bounding`],
//!   [`use_element_visibility`], [`use_window_size`].
//! - Media: [`use_media_query`].
//!
//! ## Minimal usage
//!
//! ```
//! use canopy_dom::{Document, LocalElement};
//! use canopy_hooks::{Component, Env, TargetRef, use_element_hover};
//! use kurbo::{Point, Rect};
//!
//! let doc = Document::default();
//! let card = doc.insert(None, LocalElement::new("card", Rect::new(0.0, 0.0, 100.0, 60.0))).unwrap();
//!
//! let card_ref = TargetRef::new();
//! let component = Component::mount(Env::new(doc.clone()), {
//!     let card_ref = card_ref.clone();
//!     move |cx| use_element_hover(cx, (&card_ref).into())
//! });
//! let hovered = component.output().clone();
//!
//! // Nothing is bound until the ref points somewhere.
//! assert_eq!(doc.total_listeners(), 0);
//! card_ref.set(Some(card));
//!
//! doc.pointer_move(Point::new(10.0, 10.0));
//! assert!(hovered.get());
//! doc.pointer_move(Point::new(300.0, 10.0));
//! assert!(!hovered.get());
//!
//! drop(component);
//! assert_eq!(doc.total_listeners(), 0);
//! ```
//!
//! Everything is single-threaded; handles are `Rc`-based and not `Send`.

mod component;
mod env;
mod hooks;
mod listener;
mod options;
mod target;

pub use component::{Component, Cx};
pub use env::Env;
pub use hooks::*;
pub use listener::{EventNames, Listeners, Unbind, use_event_listener};
pub use options::{
    FieldResolver, MaybeObservableOptions, NormalizeOptions, use_maybe_observable,
    use_maybe_observable_options,
};
pub use target::{ExternalRef, MaybeTarget, TargetRef, use_target, use_target_ref};
