// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hover state of an element.

use canopy_dom::{Event, ListenerOptions};
use canopy_reactive::Observable;

use crate::component::Cx;
use crate::listener::{Listeners, use_event_listener};
use crate::target::MaybeTarget;

/// Whether the pointer is over any element of `target`.
///
/// Driven by `pointerenter` and `pointerleave`, which the document fires as
/// the hovered path changes on pointer down and move, and when the pointer
/// leaves the window.
pub fn use_element_hover(cx: &mut Cx<'_>, target: MaybeTarget) -> Observable<bool> {
    let hovered = cx.use_hook(|| Observable::new(false));
    use_event_listener(
        cx,
        Some(target),
        ["pointerenter", "pointerleave"],
        Listeners::from_fn({
            let hovered = (*hovered).clone();
            move |e: &Event| {
                hovered.set_if_changed(e.event_type() == "pointerenter");
            }
        }),
        ListenerOptions::PASSIVE,
    );
    (*hovered).clone()
}
