// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer drag tracking.
//!
//! The hook is a two-state machine. A qualifying `pointerdown` on the handle
//! (or the target) records the press offset between the pointer and the
//! element's origin and moves to dragging, unless `on_start` breaks. While
//! dragging, `pointermove` on the dragging surface (the window by default)
//! places the element at pointer minus offset, then applies the axis lock, the
//! container clamp and the viewport clamp in that order. `pointerup` ends the
//! drag.

use std::fmt;
use std::ops::ControlFlow;
use std::rc::Rc;

use canopy_dom::{Document, Event, ListenerOptions, NodeId, PointerData, PointerType, TargetId};
use canopy_reactive::{Computed, MaybeReactive, Observable, Opaque};
use kurbo::{Point, Rect, Vec2};

use crate::component::Cx;
use crate::listener::{Listeners, use_event_listener};
use crate::options::{
    FieldResolver, MaybeObservableOptions, NormalizeOptions, use_maybe_observable_options,
};
use crate::target::{MaybeTarget, use_target};

/// Called with the press offset when a drag starts; `Break` cancels it.
pub type DragStartCallback = Rc<dyn Fn(Point, &Event) -> ControlFlow<()>>;
/// Called with the element position on move and on end.
pub type DragCallback = Rc<dyn Fn(Point, &Event)>;

/// Which coordinates a drag may change.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal only.
    X,
    /// Vertical only.
    Y,
    /// Both.
    #[default]
    Both,
}

impl Axis {
    fn moves_x(self) -> bool {
        matches!(self, Self::X | Self::Both)
    }

    fn moves_y(self) -> bool {
        matches!(self, Self::Y | Self::Both)
    }
}

/// Options for [`use_draggable`].
#[derive(Clone)]
pub struct UseDraggableOptions {
    /// Only start when the target itself, not a descendant, is pressed.
    pub exact: MaybeReactive<bool>,
    /// Cancel the pointer events the drag consumes.
    pub prevent_default: MaybeReactive<bool>,
    /// Stop propagation of the pointer events the drag consumes.
    pub stop_propagation: MaybeReactive<bool>,
    /// Listen in the capture phase. Defaults to true.
    pub capture: MaybeReactive<bool>,
    /// Where `pointermove`/`pointerup` are observed. Defaults to the window.
    pub dragging_element: Option<MaybeTarget>,
    /// Element whose box bounds the position; positions become relative to it.
    pub container_element: Option<MaybeTarget>,
    /// Element that starts the drag. Defaults to the target.
    pub handle: Option<MaybeTarget>,
    /// Accepted pointer kinds. Defaults to all.
    pub pointer_types: MaybeReactive<Vec<PointerType>>,
    /// Accepted buttons. Defaults to the primary button.
    pub buttons: MaybeReactive<Vec<i16>>,
    /// Position before the first drag. Read once.
    pub initial_value: MaybeReactive<Point>,
    /// See [`DragStartCallback`].
    pub on_start: MaybeReactive<Option<DragStartCallback>>,
    /// See [`DragCallback`].
    pub on_move: MaybeReactive<Option<DragCallback>>,
    /// See [`DragCallback`].
    pub on_end: MaybeReactive<Option<DragCallback>>,
    /// Axis lock.
    pub axis: MaybeReactive<Axis>,
    /// Ignore all input.
    pub disabled: MaybeReactive<bool>,
    /// Keep the element inside the viewport.
    pub restrict_in_view: MaybeReactive<bool>,
}

impl Default for UseDraggableOptions {
    fn default() -> Self {
        Self {
            exact: false.into(),
            prevent_default: false.into(),
            stop_propagation: false.into(),
            capture: true.into(),
            dragging_element: None,
            container_element: None,
            handle: None,
            pointer_types: MaybeReactive::Static(vec![
                PointerType::Mouse,
                PointerType::Touch,
                PointerType::Pen,
            ]),
            buttons: MaybeReactive::Static(vec![0]),
            initial_value: Point::ZERO.into(),
            on_start: MaybeReactive::default(),
            on_move: MaybeReactive::default(),
            on_end: MaybeReactive::default(),
            axis: Axis::Both.into(),
            disabled: false.into(),
            restrict_in_view: false.into(),
        }
    }
}

impl fmt::Debug for UseDraggableOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UseDraggableOptions")
            .field("exact", &self.exact)
            .field("axis", &self.axis)
            .field("handle", &self.handle)
            .field("container_element", &self.container_element)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

/// Resolved [`UseDraggableOptions`].
#[derive(Clone, Debug, PartialEq)]
pub struct DraggableConfig {
    /// See [`UseDraggableOptions::exact`].
    pub exact: bool,
    /// See [`UseDraggableOptions::prevent_default`].
    pub prevent_default: bool,
    /// See [`UseDraggableOptions::stop_propagation`].
    pub stop_propagation: bool,
    /// See [`UseDraggableOptions::capture`].
    pub capture: bool,
    /// `None` when unset, `Some(None)` when set to no element.
    pub dragging_element: Option<Option<NodeId>>,
    /// `None` when unset, `Some(None)` when set to no element.
    pub container_element: Option<Option<NodeId>>,
    /// `None` when unset, `Some(None)` when set to no element.
    pub handle: Option<Option<NodeId>>,
    /// See [`UseDraggableOptions::pointer_types`].
    pub pointer_types: Vec<PointerType>,
    /// See [`UseDraggableOptions::buttons`].
    pub buttons: Vec<i16>,
    /// See [`UseDraggableOptions::initial_value`].
    pub initial_value: Point,
    /// See [`UseDraggableOptions::on_start`].
    pub on_start: Option<Opaque<dyn Fn(Point, &Event) -> ControlFlow<()>>>,
    /// See [`UseDraggableOptions::on_move`].
    pub on_move: Option<Opaque<dyn Fn(Point, &Event)>>,
    /// See [`UseDraggableOptions::on_end`].
    pub on_end: Option<Opaque<dyn Fn(Point, &Event)>>,
    /// See [`UseDraggableOptions::axis`].
    pub axis: Axis,
    /// See [`UseDraggableOptions::disabled`].
    pub disabled: bool,
    /// See [`UseDraggableOptions::restrict_in_view`].
    pub restrict_in_view: bool,
}

impl NormalizeOptions for UseDraggableOptions {
    type Output = DraggableConfig;

    fn normalize(&self, fields: &FieldResolver) -> DraggableConfig {
        DraggableConfig {
            exact: fields.track(&self.exact),
            prevent_default: fields.track(&self.prevent_default),
            stop_propagation: fields.track(&self.stop_propagation),
            capture: fields.track(&self.capture),
            dragging_element: fields.track_element(&self.dragging_element),
            container_element: fields.track_element(&self.container_element),
            handle: fields.track_element(&self.handle),
            pointer_types: fields.track(&self.pointer_types),
            buttons: fields.track(&self.buttons),
            initial_value: fields.snapshot("initial_value", &self.initial_value),
            on_start: fields.track_opaque(&self.on_start),
            on_move: fields.track_opaque(&self.on_move),
            on_end: fields.track_opaque(&self.on_end),
            axis: fields.track(&self.axis),
            disabled: fields.track(&self.disabled),
            restrict_in_view: fields.track(&self.restrict_in_view),
        }
    }
}

/// State returned by [`use_draggable`].
#[derive(Clone, Debug)]
pub struct UseDraggable {
    /// Horizontal position.
    pub x: Computed<f64>,
    /// Vertical position.
    pub y: Computed<f64>,
    /// Position, writable to move the element programmatically.
    pub position: Observable<Point>,
    /// True between a started drag and its `pointerup`.
    pub is_dragging: Computed<bool>,
    /// `"left: {x}px; top: {y}px;"`.
    pub style: Computed<String>,
}

struct DragSlot {
    state: UseDraggable,
    pressed: Observable<Option<Vec2>>,
    handle_targets: MaybeTarget,
    surface_targets: MaybeTarget,
    listener_options: MaybeReactive<ListenerOptions>,
}

/// Make `target` draggable.
pub fn use_draggable(
    cx: &mut Cx<'_>,
    target: MaybeTarget,
    options: impl Into<MaybeObservableOptions<UseDraggableOptions>>,
) -> UseDraggable {
    let target = use_target(cx, target);
    let config = use_maybe_observable_options(cx, Some(options.into()));

    let slot = cx.use_hook(|| {
        let initial =
            config.with_untracked(|c| c.as_ref().map_or(Point::ZERO, |c| c.initial_value));
        let position = Observable::new(initial);
        let pressed = Observable::new(None::<Vec2>);
        let state = UseDraggable {
            x: Computed::new({
                let position = position.clone();
                move || position.get().x
            }),
            y: Computed::new({
                let position = position.clone();
                move || position.get().y
            }),
            is_dragging: Computed::new({
                let pressed = pressed.clone();
                move || pressed.get().is_some()
            }),
            style: Computed::new({
                let position = position.clone();
                move || {
                    let p = position.get();
                    format!("left: {}px; top: {}px;", p.x, p.y)
                }
            }),
            position,
        };
        let handle_targets = MaybeTarget::Derived(Computed::new({
            let (config, target) = (config.clone(), target.clone());
            move || match config.with(|c| c.as_ref().and_then(|c| c.handle)) {
                Some(handle) => handle.map(TargetId::Element).into_iter().collect(),
                None => target.with(MaybeTarget::resolve),
            }
        }));
        let surface_targets = MaybeTarget::Derived(Computed::new({
            let config = config.clone();
            move || match config.with(|c| c.as_ref().and_then(|c| c.dragging_element)) {
                Some(surface) => surface.map(TargetId::Element).into_iter().collect(),
                None => vec![TargetId::Window],
            }
        }));
        let listener_options = MaybeReactive::Computed(Computed::new({
            let config = config.clone();
            move || {
                config.with(|c| {
                    c.as_ref().map_or(ListenerOptions::default(), |c| ListenerOptions {
                        capture: c.capture,
                        passive: !c.prevent_default,
                        once: false,
                    })
                })
            }
        }));
        DragSlot {
            state,
            pressed,
            handle_targets,
            surface_targets,
            listener_options,
        }
    });

    let machine = Rc::new(DragMachine {
        doc: cx.document().cloned(),
        config,
        target,
        position: slot.state.position.clone(),
        pressed: slot.pressed.clone(),
    });
    let start = Listeners::from_fn({
        let machine = machine.clone();
        move |e| machine.start(e)
    });
    let moved = Listeners::from_fn({
        let machine = machine.clone();
        move |e| machine.move_to(e)
    });
    let end = Listeners::from_fn(move |e| machine.end(e));

    use_event_listener(
        cx,
        Some(slot.handle_targets.clone()),
        "pointerdown",
        start,
        slot.listener_options.clone(),
    );
    use_event_listener(
        cx,
        Some(slot.surface_targets.clone()),
        "pointermove",
        moved,
        slot.listener_options.clone(),
    );
    use_event_listener(
        cx,
        Some(slot.surface_targets.clone()),
        "pointerup",
        end,
        slot.listener_options.clone(),
    );

    slot.state.clone()
}

struct DragMachine {
    doc: Option<Document>,
    config: Computed<Option<DraggableConfig>>,
    target: Observable<MaybeTarget>,
    position: Observable<Point>,
    pressed: Observable<Option<Vec2>>,
}

impl DragMachine {
    /// Config, document and pointer kind checks shared by every transition.
    fn accept<'e>(
        &self,
        e: &'e Event,
    ) -> Option<(DraggableConfig, &Document, &'e PointerData)> {
        let config = self.config.peek()?;
        let doc = self.doc.as_ref()?;
        let pointer = e.pointer()?;
        if config.disabled || !config.pointer_types.contains(&pointer.pointer_type) {
            return None;
        }
        Some((config, doc, pointer))
    }

    /// The element's box, and its container's box when one is configured.
    fn boxes(
        &self,
        config: &DraggableConfig,
        doc: &Document,
    ) -> Option<(NodeId, Rect, Option<Rect>)> {
        let element = self.target.with_untracked(MaybeTarget::first_element_untracked)?;
        let rect = doc.bounding_client_rect(element).ok()?;
        let container = config
            .container_element
            .flatten()
            .and_then(|c| doc.bounding_client_rect(c).ok());
        Some((element, rect, container))
    }

    fn start(&self, e: &Event) {
        let Some((config, doc, pointer)) = self.accept(e) else {
            return;
        };
        if !config.buttons.contains(&pointer.button) {
            return;
        }
        let Some((element, rect, container)) = self.boxes(&config, doc) else {
            return;
        };
        if config.exact && e.target() != TargetId::Element(element) {
            return;
        }
        let origin = match container {
            Some(c) => Point::new(rect.x0 - c.x0, rect.y0 - c.y0),
            None => rect.origin(),
        };
        let offset = pointer.client - origin;
        if let Some(on_start) = &config.on_start
            && on_start(offset.to_point(), e).is_break()
        {
            tracing::debug!("drag start canceled");
            return;
        }
        self.pressed.set(Some(offset));
        tracing::debug!(x = offset.x, y = offset.y, "drag started");
        consume(&config, e);
    }

    fn move_to(&self, e: &Event) {
        let Some((config, doc, pointer)) = self.accept(e) else {
            return;
        };
        let Some(offset) = self.pressed.peek() else {
            return;
        };
        let Some((_, rect, container)) = self.boxes(&config, doc) else {
            return;
        };
        let mut next = self.position.peek();
        if config.axis.moves_x() {
            next.x = pointer.client.x - offset.x;
            if let Some(c) = container {
                next.x = next.x.max(0.0).min(c.width() - rect.width());
            }
        }
        if config.axis.moves_y() {
            next.y = pointer.client.y - offset.y;
            if let Some(c) = container {
                next.y = next.y.max(0.0).min(c.height() - rect.height());
            }
        }
        if config.restrict_in_view {
            let view = doc.inner_size();
            if config.axis.moves_x() {
                next.x = next.x.max(0.0).min(view.width - rect.width());
            }
            if config.axis.moves_y() {
                next.y = next.y.max(0.0).min(view.height - rect.height());
            }
        }
        self.position.set(next);
        if let Some(on_move) = &config.on_move {
            on_move(next, e);
        }
        consume(&config, e);
    }

    fn end(&self, e: &Event) {
        let Some((config, _, _)) = self.accept(e) else {
            return;
        };
        if self.pressed.peek().is_none() {
            return;
        }
        self.pressed.set(None);
        let position = self.position.peek();
        tracing::debug!(x = position.x, y = position.y, "drag ended");
        if let Some(on_end) = &config.on_end {
            on_end(position, e);
        }
        consume(&config, e);
    }
}

fn consume(config: &DraggableConfig, e: &Event) {
    if config.prevent_default {
        e.prevent_default();
    }
    if config.stop_propagation {
        e.stop_propagation();
    }
}
