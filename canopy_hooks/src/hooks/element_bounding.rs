// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reactive bounding client rect.

use std::rc::Rc;

use canopy_dom::{
    Document, ListenerOptions, MutationObserverInit, MutationRecord, ResizeObserverEntry, TargetId,
};
use canopy_reactive::{Computed, MaybeReactive, Observable};
use kurbo::Rect;

use super::{
    UseResizeObserverOptions, use_mount_effect, use_mutation_observer, use_resize_observer,
};
use crate::component::Cx;
use crate::listener::{Listeners, use_event_listener};
use crate::options::{
    FieldResolver, MaybeObservableOptions, NormalizeOptions, use_maybe_observable_options,
};
use crate::target::{MaybeTarget, use_target};

/// When [`UseElementBounding::update`] reads the rect.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum UpdateTiming {
    /// Immediately.
    #[default]
    Sync,
    /// In the next animation frame.
    NextFrame,
}

/// Options for [`use_element_bounding`].
#[derive(Clone, Debug)]
pub struct UseElementBoundingOptions {
    /// Zero every value when the element goes away. Defaults to true.
    pub reset: MaybeReactive<bool>,
    /// Update on window `resize`. Defaults to true.
    pub window_resize: MaybeReactive<bool>,
    /// Update on any `scroll` in the document. Defaults to true.
    pub window_scroll: MaybeReactive<bool>,
    /// Update on mount. Defaults to true.
    pub immediate: MaybeReactive<bool>,
    /// See [`UpdateTiming`].
    pub update_timing: MaybeReactive<UpdateTiming>,
}

impl Default for UseElementBoundingOptions {
    fn default() -> Self {
        Self {
            reset: true.into(),
            window_resize: true.into(),
            window_scroll: true.into(),
            immediate: true.into(),
            update_timing: UpdateTiming::Sync.into(),
        }
    }
}

/// Resolved [`UseElementBoundingOptions`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ElementBoundingConfig {
    /// See [`UseElementBoundingOptions::reset`].
    pub reset: bool,
    /// See [`UseElementBoundingOptions::window_resize`].
    pub window_resize: bool,
    /// See [`UseElementBoundingOptions::window_scroll`].
    pub window_scroll: bool,
    /// See [`UseElementBoundingOptions::immediate`].
    pub immediate: bool,
    /// See [`UseElementBoundingOptions::update_timing`].
    pub update_timing: UpdateTiming,
}

impl Default for ElementBoundingConfig {
    fn default() -> Self {
        Self {
            reset: true,
            window_resize: true,
            window_scroll: true,
            immediate: true,
            update_timing: UpdateTiming::Sync,
        }
    }
}

impl NormalizeOptions for UseElementBoundingOptions {
    type Output = ElementBoundingConfig;

    fn normalize(&self, fields: &FieldResolver) -> ElementBoundingConfig {
        ElementBoundingConfig {
            reset: fields.track(&self.reset),
            window_resize: fields.track(&self.window_resize),
            window_scroll: fields.track(&self.window_scroll),
            immediate: fields.snapshot("immediate", &self.immediate),
            update_timing: fields.track(&self.update_timing),
        }
    }
}

/// State returned by [`use_element_bounding`].
#[derive(Clone, Debug)]
pub struct UseElementBounding {
    /// Left edge.
    pub x: Observable<f64>,
    /// Top edge.
    pub y: Observable<f64>,
    /// Top edge.
    pub top: Observable<f64>,
    /// Right edge.
    pub right: Observable<f64>,
    /// Bottom edge.
    pub bottom: Observable<f64>,
    /// Left edge.
    pub left: Observable<f64>,
    /// Width.
    pub width: Observable<f64>,
    /// Height.
    pub height: Observable<f64>,
    updater: Rc<Updater>,
}

impl UseElementBounding {
    /// Read the rect now (or in the next frame, per [`UpdateTiming`]).
    pub fn update(&self) {
        self.updater.update();
    }

    /// The current values as a rect.
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.left.get(),
            self.top.get(),
            self.right.get(),
            self.bottom.get(),
        )
    }
}

#[derive(Debug)]
struct Updater {
    doc: Option<Document>,
    target: Observable<MaybeTarget>,
    config: Computed<Option<ElementBoundingConfig>>,
    values: [Observable<f64>; 8],
}

impl Updater {
    fn update(self: &Rc<Self>) {
        let timing = self
            .config
            .with_untracked(|c| c.unwrap_or_default().update_timing);
        match (timing, &self.doc) {
            (UpdateTiming::NextFrame, Some(doc)) => {
                let this = self.clone();
                doc.request_animation_frame(move |_| this.recalculate());
            }
            _ => self.recalculate(),
        }
    }

    fn recalculate(&self) {
        let element = self.target.with_untracked(MaybeTarget::first_element_untracked);
        let rect = match (element, &self.doc) {
            (Some(element), Some(doc)) => doc.bounding_client_rect(element).ok(),
            _ => None,
        };
        let Some(rect) = rect else {
            if self.config.with_untracked(|c| c.unwrap_or_default().reset) {
                self.write([0.0; 8]);
            }
            return;
        };
        self.write([
            rect.x0,
            rect.y0,
            rect.y0,
            rect.x1,
            rect.y1,
            rect.x0,
            rect.width(),
            rect.height(),
        ]);
    }

    fn write(&self, next: [f64; 8]) {
        canopy_reactive::batch(|| {
            for (cell, value) in self.values.iter().zip(next) {
                cell.set_if_changed(value);
            }
        });
    }
}

struct BoundingSlot {
    updater: Rc<Updater>,
    scroll_targets: MaybeTarget,
    resize_targets: MaybeTarget,
    resize_options: Rc<UseResizeObserverOptions>,
}

/// Track the bounding client rect of the first element of `target`.
///
/// The rect is re-read when the element resizes, when its `style` or `class`
/// attribute changes, on any scroll in the document, on window resize, and
/// whenever the element goes away.
pub fn use_element_bounding(
    cx: &mut Cx<'_>,
    target: MaybeTarget,
    options: impl Into<MaybeObservableOptions<UseElementBoundingOptions>>,
) -> UseElementBounding {
    let config = use_maybe_observable_options(cx, Some(options.into()));
    let observed = use_target(cx, target.clone());
    let doc = cx.document().cloned();
    let slot = cx.use_hook(|| {
        let window_when = |pick: fn(&ElementBoundingConfig) -> bool| {
            let config = config.clone();
            MaybeTarget::Derived(Computed::new(move || {
                if config.with(|c| pick(&c.unwrap_or_default())) {
                    vec![TargetId::Window]
                } else {
                    Vec::new()
                }
            }))
        };
        BoundingSlot {
            updater: Rc::new(Updater {
                doc,
                target: observed.clone(),
                config: config.clone(),
                values: std::array::from_fn(|_| Observable::new(0.0)),
            }),
            scroll_targets: window_when(|c| c.window_scroll),
            resize_targets: window_when(|c| c.window_resize),
            resize_options: Rc::new(UseResizeObserverOptions::default()),
        }
    });
    let updater = slot.updater.clone();

    let on_change = {
        let updater = updater.clone();
        move || updater.update()
    };
    use_resize_observer(
        cx,
        target.clone(),
        {
            let on_change = on_change.clone();
            move |_: &[ResizeObserverEntry]| on_change()
        },
        MaybeObservableOptions::Fields(slot.resize_options.clone()),
    );
    use_mutation_observer(
        cx,
        target,
        {
            let on_change = on_change.clone();
            move |_: &[MutationRecord]| on_change()
        },
        MutationObserverInit {
            attribute_filter: Some(vec!["style".into(), "class".into()]),
            ..MutationObserverInit::default()
        },
    );
    use_event_listener(
        cx,
        Some(slot.scroll_targets.clone()),
        "scroll",
        Listeners::from_fn({
            let on_change = on_change.clone();
            move |_| on_change()
        }),
        ListenerOptions {
            capture: true,
            passive: true,
            once: false,
        },
    );
    use_event_listener(
        cx,
        Some(slot.resize_targets.clone()),
        "resize",
        Listeners::from_fn({
            let on_change = on_change.clone();
            move |_| on_change()
        }),
        ListenerOptions::PASSIVE,
    );

    // Losing the element refreshes (and resets) the values.
    use_mount_effect(cx, "use_element_bounding", {
        let updater = updater.clone();
        move |_| {
            if observed.with(MaybeTarget::first_element).is_none() {
                canopy_reactive::untrack(|| updater.update());
            }
        }
    });

    if cx.is_first_render() {
        let immediate = config.with_untracked(|c| c.unwrap_or_default().immediate);
        if immediate {
            cx.use_mount(move || updater.update());
        }
    }

    let [x, y, top, right, bottom, left, width, height] = slot.updater.values.clone();
    UseElementBounding {
        x,
        y,
        top,
        right,
        bottom,
        left,
        width,
        height,
        updater: slot.updater.clone(),
    }
}
