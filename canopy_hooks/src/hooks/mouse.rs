// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reactive pointer position.

use std::cell::Cell;

use canopy_dom::{Document, Event, ListenerOptions, PointerType};
use canopy_reactive::{Computed, MaybeReactive, Observable, batch};
use kurbo::Point;

use crate::component::Cx;
use crate::listener::{Listeners, use_event_listener};
use crate::options::{
    FieldResolver, MaybeObservableOptions, NormalizeOptions, use_maybe_observable_options,
};
use crate::target::MaybeTarget;

/// Which coordinates [`use_mouse`] reports.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CoordinateType {
    /// Relative to the document, following window scroll.
    #[default]
    Page,
    /// Relative to the viewport.
    Client,
}

/// Options for [`use_mouse`].
#[derive(Clone, Debug)]
pub struct UseMouseOptions {
    /// See [`CoordinateType`].
    pub coordinate_type: MaybeReactive<CoordinateType>,
    /// Where to listen. The window when unset.
    pub target: Option<MaybeTarget>,
    /// Follow touch input as well. Defaults to true.
    pub touch: MaybeReactive<bool>,
    /// Go back to `initial_value` when a touch ends.
    pub reset_on_touch_ends: MaybeReactive<bool>,
    /// Position before the first event. Read once.
    pub initial_value: MaybeReactive<Point>,
    /// Keep page coordinates current while the window scrolls. Defaults to true.
    pub scroll: MaybeReactive<bool>,
}

impl Default for UseMouseOptions {
    fn default() -> Self {
        Self {
            coordinate_type: CoordinateType::Page.into(),
            target: None,
            touch: true.into(),
            reset_on_touch_ends: false.into(),
            initial_value: Point::ZERO.into(),
            scroll: true.into(),
        }
    }
}

/// Resolved [`UseMouseOptions`], minus the target.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MouseConfig {
    /// See [`UseMouseOptions::coordinate_type`].
    pub coordinate_type: CoordinateType,
    /// See [`UseMouseOptions::touch`].
    pub touch: bool,
    /// See [`UseMouseOptions::reset_on_touch_ends`].
    pub reset_on_touch_ends: bool,
    /// See [`UseMouseOptions::initial_value`].
    pub initial_value: Point,
    /// See [`UseMouseOptions::scroll`].
    pub scroll: bool,
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self {
            coordinate_type: CoordinateType::Page,
            touch: true,
            reset_on_touch_ends: false,
            initial_value: Point::ZERO,
            scroll: true,
        }
    }
}

impl NormalizeOptions for UseMouseOptions {
    type Output = MouseConfig;

    fn normalize(&self, fields: &FieldResolver) -> MouseConfig {
        MouseConfig {
            coordinate_type: fields.track(&self.coordinate_type),
            touch: fields.track(&self.touch),
            reset_on_touch_ends: fields.track(&self.reset_on_touch_ends),
            initial_value: fields.snapshot("initial_value", &self.initial_value),
            scroll: fields.track(&self.scroll),
        }
    }
}

/// State returned by [`use_mouse`].
#[derive(Clone, Debug)]
pub struct UseMouse {
    /// Horizontal position.
    pub x: Observable<f64>,
    /// Vertical position.
    pub y: Observable<f64>,
    /// Device behind the last update, `None` before the first one and after a reset.
    pub source_type: Observable<Option<PointerType>>,
    config: Computed<Option<MouseConfig>>,
}

impl UseMouse {
    /// Both coordinates, tracked.
    pub fn position(&self) -> Point {
        Point::new(self.x.get(), self.y.get())
    }

    pub(crate) fn coordinate_type(&self) -> CoordinateType {
        self.config
            .with_untracked(|c| c.unwrap_or_default().coordinate_type)
    }

    fn write(&self, pos: Point, source: Option<PointerType>) {
        batch(|| {
            self.x.set_if_changed(pos.x);
            self.y.set_if_changed(pos.y);
            self.source_type.set_if_changed(source);
        });
    }
}

struct Tracker {
    doc: Option<Document>,
    state: UseMouse,
    // Client position of the last mouse event, replayed on scroll.
    last_mouse: Cell<Option<Point>>,
}

impl Tracker {
    fn config(&self) -> MouseConfig {
        self.state.config.with_untracked(|c| c.unwrap_or_default())
    }

    fn scroll(&self) -> Point {
        self.doc
            .as_ref()
            .map_or(Point::ZERO, |doc| doc.scroll_offset())
    }

    fn pick(&self, client: Point, page: Point) -> Point {
        match self.state.coordinate_type() {
            CoordinateType::Page => page,
            CoordinateType::Client => client,
        }
    }

    fn handle(&self, e: &Event) {
        let config = self.config();
        match e.event_type() {
            "mousemove" => {
                let Some(p) = e.pointer() else { return };
                self.last_mouse.set(Some(p.client));
                self.state
                    .write(self.pick(p.client, p.page), Some(PointerType::Mouse));
            }
            "dragover" => {
                let Some(d) = e.drag() else { return };
                self.last_mouse.set(Some(d.client));
                let page = d.client + self.scroll().to_vec2();
                self.state
                    .write(self.pick(d.client, page), Some(PointerType::Mouse));
            }
            "touchstart" | "touchmove" if config.touch => {
                let Some(p) = e.pointer() else { return };
                self.last_mouse.set(None);
                self.state
                    .write(self.pick(p.client, p.page), Some(PointerType::Touch));
            }
            "touchend" if config.touch && config.reset_on_touch_ends => {
                self.last_mouse.set(None);
                self.state.write(config.initial_value, None);
            }
            _ => {}
        }
    }

    fn on_scroll(&self) {
        let config = self.config();
        if !config.scroll || config.coordinate_type != CoordinateType::Page {
            return;
        }
        if let Some(client) = self.last_mouse.get() {
            let page = client + self.scroll().to_vec2();
            self.state.write(page, Some(PointerType::Mouse));
        }
    }
}

/// Track the pointer through `mousemove`, `dragover` and touch events.
///
/// Pen input arrives as mouse events and is reported as
/// [`PointerType::Mouse`].
pub fn use_mouse(
    cx: &mut Cx<'_>,
    options: impl Into<MaybeObservableOptions<UseMouseOptions>>,
) -> UseMouse {
    let options = options.into();
    let target = match &options {
        MaybeObservableOptions::Fields(raw) => raw.target.clone(),
        MaybeObservableOptions::Observable(_) => None,
    };
    let config = use_maybe_observable_options(cx, Some(options));
    let doc = cx.document().cloned();
    let tracker = cx.use_hook(|| {
        let initial = config.with_untracked(|c| c.unwrap_or_default().initial_value);
        Tracker {
            doc,
            state: UseMouse {
                x: Observable::new(initial.x),
                y: Observable::new(initial.y),
                source_type: Observable::new(None),
                config: config.clone(),
            },
            last_mouse: Cell::new(None),
        }
    });

    use_event_listener(
        cx,
        target,
        ["mousemove", "dragover", "touchstart", "touchmove", "touchend"],
        Listeners::from_fn({
            let tracker = tracker.clone();
            move |e| tracker.handle(e)
        }),
        ListenerOptions::PASSIVE,
    );
    use_event_listener(
        cx,
        None,
        "scroll",
        Listeners::from_fn({
            let tracker = tracker.clone();
            move |_| tracker.on_scroll()
        }),
        ListenerOptions {
            capture: true,
            passive: true,
            once: false,
        },
    );

    tracker.state.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, Env};
    use canopy_dom::{DragAction, PointerAction, PointerData};
    use std::rc::Rc;

    fn mount(doc: &Document, options: UseMouseOptions) -> Component<UseMouse> {
        let options = Rc::new(options);
        Component::mount(Env::new(doc.clone()), move |cx| use_mouse(cx, options.clone()))
    }

    fn touch(doc: &Document, action: PointerAction, at: Point) {
        let data = PointerData::mouse(at).with_pointer_type(PointerType::Touch);
        doc.dispatch_pointer(action, data);
    }

    #[test]
    fn page_coordinates_follow_scroll() {
        let doc = Document::default();
        let c = mount(&doc, UseMouseOptions::default());
        let mouse = c.output().clone();
        assert_eq!(mouse.position(), Point::ZERO);
        assert_eq!(mouse.source_type.get(), None);

        doc.pointer_move(Point::new(10.0, 20.0));
        assert_eq!(mouse.position(), Point::new(10.0, 20.0));
        assert_eq!(mouse.source_type.get(), Some(PointerType::Mouse));

        doc.scroll_to(Point::new(0.0, 100.0));
        assert_eq!(mouse.position(), Point::new(10.0, 120.0));
        doc.pointer_move(Point::new(15.0, 20.0));
        assert_eq!(mouse.position(), Point::new(15.0, 120.0));
    }

    #[test]
    fn client_coordinates_ignore_scroll() {
        let doc = Document::default();
        let c = mount(
            &doc,
            UseMouseOptions {
                coordinate_type: CoordinateType::Client.into(),
                ..UseMouseOptions::default()
            },
        );
        let mouse = c.output().clone();
        doc.scroll_to(Point::new(0.0, 100.0));
        doc.pointer_move(Point::new(10.0, 20.0));
        assert_eq!(mouse.position(), Point::new(10.0, 20.0));
        doc.scroll_to(Point::new(0.0, 300.0));
        assert_eq!(mouse.position(), Point::new(10.0, 20.0));
    }

    #[test]
    fn touch_input_and_reset() {
        let doc = Document::default();
        let c = mount(
            &doc,
            UseMouseOptions {
                reset_on_touch_ends: true.into(),
                initial_value: Point::new(-1.0, -1.0).into(),
                ..UseMouseOptions::default()
            },
        );
        let mouse = c.output().clone();
        assert_eq!(mouse.position(), Point::new(-1.0, -1.0));
        touch(&doc, PointerAction::Down, Point::new(5.0, 5.0));
        touch(&doc, PointerAction::Move, Point::new(30.0, 40.0));
        assert_eq!(mouse.position(), Point::new(30.0, 40.0));
        assert_eq!(mouse.source_type.get(), Some(PointerType::Touch));
        touch(&doc, PointerAction::Up, Point::new(30.0, 40.0));
        assert_eq!(mouse.position(), Point::new(-1.0, -1.0));
        assert_eq!(mouse.source_type.get(), None);
    }

    #[test]
    fn touch_can_be_ignored() {
        let doc = Document::default();
        let enabled = Observable::new(false);
        let c = mount(
            &doc,
            UseMouseOptions {
                touch: enabled.clone().into(),
                ..UseMouseOptions::default()
            },
        );
        let mouse = c.output().clone();
        touch(&doc, PointerAction::Move, Point::new(30.0, 40.0));
        assert_eq!(mouse.position(), Point::ZERO);
        enabled.set(true);
        touch(&doc, PointerAction::Move, Point::new(30.0, 40.0));
        assert_eq!(mouse.position(), Point::new(30.0, 40.0));
    }

    #[test]
    fn dragover_updates_the_position() {
        let doc = Document::default();
        let c = mount(&doc, UseMouseOptions::default());
        doc.scroll_to(Point::new(0.0, 50.0));
        doc.drag(DragAction::Over, Point::new(7.0, 8.0), None);
        assert_eq!(c.output().position(), Point::new(7.0, 58.0));
    }
}
