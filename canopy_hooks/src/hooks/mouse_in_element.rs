// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer position relative to an element.

use std::rc::Rc;

use canopy_dom::{Document, ListenerOptions, TargetId};
use canopy_reactive::{Computed, MaybeReactive, Observable, batch};
use kurbo::Point;

use super::{
    CoordinateType, MountEffect, UseMouse, UseMouseOptions, use_mount_effect, use_mouse,
};
use crate::component::Cx;
use crate::listener::{Listeners, Unbind, use_event_listener};
use crate::options::{
    FieldResolver, MaybeObservableOptions, NormalizeOptions, use_maybe_observable_options,
};
use crate::target::{MaybeTarget, use_target};

/// Options for [`use_mouse_in_element`].
#[derive(Clone, Debug)]
pub struct UseMouseInElementOptions {
    /// Options for the underlying [`use_mouse`](super::use_mouse).
    pub mouse: Rc<UseMouseOptions>,
    /// Keep updating `element_x`/`element_y` while the pointer is outside.
    /// Defaults to true.
    pub handle_outside: MaybeReactive<bool>,
    /// Re-measure on any scroll in the document. Defaults to true.
    pub window_scroll: MaybeReactive<bool>,
    /// Re-measure on window `resize`. Defaults to true.
    pub window_resize: MaybeReactive<bool>,
}

impl Default for UseMouseInElementOptions {
    fn default() -> Self {
        Self {
            mouse: Rc::new(UseMouseOptions::default()),
            handle_outside: true.into(),
            window_scroll: true.into(),
            window_resize: true.into(),
        }
    }
}

/// Resolved [`UseMouseInElementOptions`], minus the mouse options.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MouseInElementConfig {
    /// See [`UseMouseInElementOptions::handle_outside`].
    pub handle_outside: bool,
    /// See [`UseMouseInElementOptions::window_scroll`].
    pub window_scroll: bool,
    /// See [`UseMouseInElementOptions::window_resize`].
    pub window_resize: bool,
}

impl Default for MouseInElementConfig {
    fn default() -> Self {
        Self {
            handle_outside: true,
            window_scroll: true,
            window_resize: true,
        }
    }
}

impl NormalizeOptions for UseMouseInElementOptions {
    type Output = MouseInElementConfig;

    fn normalize(&self, fields: &FieldResolver) -> MouseInElementConfig {
        MouseInElementConfig {
            handle_outside: fields.track(&self.handle_outside),
            window_scroll: fields.track(&self.window_scroll),
            window_resize: fields.track(&self.window_resize),
        }
    }
}

/// State returned by [`use_mouse_in_element`].
#[derive(Clone, Debug)]
pub struct UseMouseInElement {
    /// Pointer x, as reported by [`use_mouse`](super::use_mouse).
    pub x: Observable<f64>,
    /// Pointer y, as reported by [`use_mouse`](super::use_mouse).
    pub y: Observable<f64>,
    /// Pointer x relative to the element's left edge.
    pub element_x: Observable<f64>,
    /// Pointer y relative to the element's top edge.
    pub element_y: Observable<f64>,
    /// Element left edge in the mouse coordinate space.
    pub element_position_x: Observable<f64>,
    /// Element top edge in the mouse coordinate space.
    pub element_position_y: Observable<f64>,
    /// Element width.
    pub element_width: Observable<f64>,
    /// Element height.
    pub element_height: Observable<f64>,
    /// Whether the pointer is outside the element (or has left the window).
    pub is_outside: Observable<bool>,
    stops: Rc<Stops>,
}

impl UseMouseInElement {
    /// Pointer position relative to the element, tracked.
    pub fn element_position(&self) -> Point {
        Point::new(self.element_x.get(), self.element_y.get())
    }

    /// Stop measuring. The values keep their last state.
    pub fn stop(&self) {
        self.stops.watch.dispose();
        for unbind in &self.stops.listeners {
            unbind.call();
        }
    }
}

#[derive(Debug)]
struct Stops {
    watch: MountEffect,
    listeners: Vec<Unbind>,
}

#[derive(Debug)]
struct Measure {
    doc: Option<Document>,
    target: Observable<MaybeTarget>,
    config: Computed<Option<MouseInElementConfig>>,
    mouse: UseMouse,
    element_x: Observable<f64>,
    element_y: Observable<f64>,
    position_x: Observable<f64>,
    position_y: Observable<f64>,
    width: Observable<f64>,
    height: Observable<f64>,
    is_outside: Observable<bool>,
}

impl Measure {
    fn update(&self) {
        let Some(doc) = &self.doc else { return };
        let element = self
            .target
            .with_untracked(MaybeTarget::first_element_untracked);
        let Some(element) = element else { return };
        let Ok(rect) = doc.bounding_client_rect(element) else {
            return;
        };
        let origin = match self.mouse.coordinate_type() {
            CoordinateType::Page => rect.origin() + doc.scroll_offset().to_vec2(),
            CoordinateType::Client => rect.origin(),
        };
        let (width, height) = (rect.width(), rect.height());
        let local = Point::new(self.mouse.x.peek(), self.mouse.y.peek()) - origin;
        let outside = width == 0.0
            || height == 0.0
            || local.x < 0.0
            || local.y < 0.0
            || local.x > width
            || local.y > height;
        let handle_outside = self
            .config
            .with_untracked(|c| c.unwrap_or_default().handle_outside);
        batch(|| {
            self.position_x.set_if_changed(origin.x);
            self.position_y.set_if_changed(origin.y);
            self.width.set_if_changed(width);
            self.height.set_if_changed(height);
            self.is_outside.set_if_changed(outside);
            if handle_outside || !outside {
                self.element_x.set_if_changed(local.x);
                self.element_y.set_if_changed(local.y);
            }
        });
    }
}

/// Track the pointer relative to the first element of `target`.
///
/// Positions are re-measured when the pointer moves, when the target changes,
/// on scroll and on window resize. Leaving the window marks the pointer as
/// outside.
pub fn use_mouse_in_element(
    cx: &mut Cx<'_>,
    target: MaybeTarget,
    options: impl Into<MaybeObservableOptions<UseMouseInElementOptions>>,
) -> UseMouseInElement {
    let options = options.into();
    let fallback = cx.use_hook(|| Rc::new(UseMouseOptions::default()));
    let mouse_options = match &options {
        MaybeObservableOptions::Fields(raw) => raw.mouse.clone(),
        MaybeObservableOptions::Observable(_) => (*fallback).clone(),
    };
    let mouse = use_mouse(cx, mouse_options);
    let target = use_target(cx, target);
    let config = use_maybe_observable_options(cx, Some(options));
    let doc = cx.document().cloned();
    let slot = cx.use_hook(|| {
        let window_when = |pick: fn(&MouseInElementConfig) -> bool| {
            let config = config.clone();
            MaybeTarget::Derived(Computed::new(move || {
                if config.with(|c| pick(&c.unwrap_or_default())) {
                    vec![TargetId::Window]
                } else {
                    Vec::new()
                }
            }))
        };
        let measure = Rc::new(Measure {
            doc,
            target: target.clone(),
            config: config.clone(),
            mouse: mouse.clone(),
            element_x: Observable::new(0.0),
            element_y: Observable::new(0.0),
            position_x: Observable::new(0.0),
            position_y: Observable::new(0.0),
            width: Observable::new(0.0),
            height: Observable::new(0.0),
            is_outside: Observable::new(true),
        });
        (measure, window_when(|c| c.window_scroll), window_when(|c| c.window_resize))
    });
    let (measure, scroll_targets, resize_targets) = &*slot;

    let watch = use_mount_effect(cx, "use_mouse_in_element", {
        let (measure, target) = (measure.clone(), target.clone());
        move |_| {
            target.with(|t| t.resolve());
            measure.mouse.x.get();
            measure.mouse.y.get();
            canopy_reactive::untrack(|| measure.update());
        }
    });

    let leave = use_event_listener(
        cx,
        Some(TargetId::Document.into()),
        "mouseleave",
        Listeners::from_fn({
            let is_outside = measure.is_outside.clone();
            move |_| {
                is_outside.set_if_changed(true);
            }
        }),
        ListenerOptions::PASSIVE,
    );
    let remeasure = |measure: &Rc<Measure>| {
        let measure = measure.clone();
        Listeners::from_fn(move |_| measure.update())
    };
    let scroll = use_event_listener(
        cx,
        Some(scroll_targets.clone()),
        "scroll",
        remeasure(measure),
        ListenerOptions {
            capture: true,
            passive: true,
            once: false,
        },
    );
    let resize = use_event_listener(
        cx,
        Some(resize_targets.clone()),
        "resize",
        remeasure(measure),
        ListenerOptions::PASSIVE,
    );

    let stops = cx.use_hook(|| Stops {
        watch,
        listeners: vec![leave, scroll, resize],
    });

    UseMouseInElement {
        x: mouse.x.clone(),
        y: mouse.y.clone(),
        element_x: measure.element_x.clone(),
        element_y: measure.element_y.clone(),
        element_position_x: measure.position_x.clone(),
        element_position_y: measure.position_y.clone(),
        element_width: measure.width.clone(),
        element_height: measure.height.clone(),
        is_outside: measure.is_outside.clone(),
        stops: Rc::clone(&stops),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, Env};
    use canopy_dom::{LocalElement, NodeId};
    use kurbo::Rect;

    fn setup(
        options: UseMouseInElementOptions,
    ) -> (Document, NodeId, Component<UseMouseInElement>) {
        let doc = Document::default();
        let el = doc
            .insert(None, LocalElement::new("div", Rect::new(100.0, 100.0, 200.0, 150.0)))
            .unwrap();
        let options = Rc::new(options);
        let c = Component::mount(Env::new(doc.clone()), move |cx| {
            use_mouse_in_element(cx, el.into(), options.clone())
        });
        (doc, el, c)
    }

    #[test]
    fn measures_relative_to_the_element() {
        let (doc, _, c) = setup(UseMouseInElementOptions::default());
        let m = c.output().clone();
        assert!(m.is_outside.get());
        assert_eq!(m.element_width.get(), 100.0);
        assert_eq!(m.element_height.get(), 50.0);

        doc.pointer_move(Point::new(120.0, 110.0));
        assert!(!m.is_outside.get());
        assert_eq!(m.element_position(), Point::new(20.0, 10.0));

        doc.pointer_move(Point::new(250.0, 110.0));
        assert!(m.is_outside.get());
        assert_eq!(m.element_position(), Point::new(150.0, 10.0));
    }

    #[test]
    fn outside_updates_can_be_suppressed() {
        let (doc, _, c) = setup(UseMouseInElementOptions {
            handle_outside: false.into(),
            ..UseMouseInElementOptions::default()
        });
        let m = c.output().clone();
        doc.pointer_move(Point::new(120.0, 110.0));
        doc.pointer_move(Point::new(250.0, 110.0));
        assert!(m.is_outside.get());
        assert_eq!(m.element_position(), Point::new(20.0, 10.0));
    }

    #[test]
    fn page_coordinates_account_for_scroll() {
        let (doc, _, c) = setup(UseMouseInElementOptions::default());
        let m = c.output().clone();
        doc.pointer_move(Point::new(120.0, 110.0));
        doc.scroll_to(Point::new(0.0, 30.0));
        // The element moved up in the viewport; the page origin stays put.
        assert_eq!(m.element_position_y.get(), 100.0);
        assert_eq!(m.y.get(), 140.0);
        assert_eq!(m.element_y.get(), 40.0);
    }

    #[test]
    fn leaving_the_window_marks_outside_and_stop_freezes() {
        let (doc, _, c) = setup(UseMouseInElementOptions::default());
        let m = c.output().clone();
        doc.pointer_move(Point::new(120.0, 110.0));
        assert!(!m.is_outside.get());
        doc.pointer_exit();
        assert!(m.is_outside.get());

        m.stop();
        m.stop();
        doc.pointer_move(Point::new(150.0, 120.0));
        assert_eq!(m.element_position(), Point::new(20.0, 10.0));
        assert_eq!(m.x.get(), 150.0);
    }
}
