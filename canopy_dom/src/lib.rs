// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy DOM: a headless document model.
//!
//! Canopy DOM provides the platform contracts the Canopy hooks are written
//! against, without a browser:
//!
//! - an element tree with local bounds, transforms, z-order, flags and attributes;
//! - event targets (window, document, elements, media query lists) with
//!   capture → target → bubble dispatch, `once`/`passive` listeners and
//!   propagation control;
//! - pointer, mouse, touch and drag input with hover enter/leave derivation;
//! - a window with viewport size, scroll offset and `matchMedia`;
//! - animation frames;
//! - resize, intersection and mutation observers.
//!
//! It is not a layout engine. Geometry is supplied by the caller, in the same
//! way a box tree is fed by an upstream layout pass.
//!
//! ## API overview
//!
//! - [`Document`]: shared handle to the whole platform; everything else is reached through it.
//! - [`Tree`]: the element tree behind the document.
//! - [`Event`], [`Listener`], [`ListenerOptions`]: event dispatch.
//! - [`ResizeObserver`], [`IntersectionObserver`], [`MutationObserver`]: observers delivered on [`Document::flush`].
//! - [`MediaQueryList`]: live media query results.
//! - [`Capabilities`]: which of the above a document exposes.
//!
//! ## Minimal usage
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use canopy_dom::{Document, Event, Listener, ListenerOptions, LocalElement, TargetId};
//! use kurbo::{Point, Rect};
//!
//! let doc = Document::default();
//! let body = doc.insert(None, LocalElement::new("body", Rect::new(0.0, 0.0, 800.0, 600.0))).unwrap();
//! let button = doc
//!     .insert(Some(body), LocalElement::new("button", Rect::new(10.0, 10.0, 110.0, 40.0)))
//!     .unwrap();
//!
//! let clicks = Rc::new(Cell::new(0));
//! let listener: Listener = {
//!     let clicks = clicks.clone();
//!     Rc::new(move |_: &Event| clicks.set(clicks.get() + 1))
//! };
//! doc.add_event_listener(TargetId::Element(body), "pointerdown", listener, ListenerOptions::default());
//!
//! // Bubbles from the button to the body.
//! doc.pointer_down(Point::new(20.0, 20.0));
//! assert_eq!(clicks.get(), 1);
//! assert_eq!(doc.bounding_client_rect(button).unwrap(), Rect::new(10.0, 10.0, 110.0, 40.0));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod dispatch;
mod document;
mod error;
mod event;
pub mod hover;
mod listeners;
mod media;
mod observers;
mod tree;
mod types;

pub use document::{
    Document, DocumentConfig, DragAction, FRAME_INTERVAL_MS, FrameId, MediaQueryList,
    PointerAction, WeakDocument,
};
pub use error::DomError;
pub use event::{
    DataTransfer, DataTransferItem, DragData, DropEffect, Event, EventPayload, FileInfo, Listener,
    ListenerOptions, MediaChange, Phase, PointerData, PointerType,
};
pub use media::{ColorScheme, MediaEnvironment, MediaQuery, Orientation};
pub use observers::{
    IntersectionCallback, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit, MutationCallback, MutationObserver, MutationObserverInit,
    ResizeBox, ResizeCallback, ResizeObserver, ResizeObserverEntry,
};
pub use tree::{Hit, MutationKind, MutationRecord, Tree};
pub use types::{Capabilities, Capability, LocalElement, MediaQueryId, NodeFlags, NodeId, TargetId};
