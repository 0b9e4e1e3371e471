// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Feature hooks built on the target normalizer, the option normalizer and
//! the event binder.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use canopy_dom::{Capability, Document};
use canopy_reactive::{Effect, Observable};

use crate::component::Cx;

mod draggable;
mod drop_zone;
mod element_bounding;
mod element_hover;
mod element_size;
mod element_visibility;
mod intersection_observer;
mod media_query;
mod mouse;
mod mouse_in_element;
mod mutation_observer;
mod resize_observer;
mod window_size;

pub use draggable::{
    Axis, DragCallback, DragStartCallback, DraggableConfig, UseDraggable, UseDraggableOptions,
    use_draggable,
};
pub use drop_zone::{
    DataTypes, DropCallback, DropZoneConfig, UseDropZone, UseDropZoneOptions, use_drop_zone,
};
pub use element_bounding::{
    ElementBoundingConfig, UpdateTiming, UseElementBounding, UseElementBoundingOptions,
    use_element_bounding,
};
pub use element_hover::use_element_hover;
pub use element_size::{
    ElementSizeConfig, UseElementSize, UseElementSizeOptions, use_element_size,
};
pub use element_visibility::{
    ElementVisibilityConfig, UseElementVisibilityOptions, use_element_visibility,
};
pub use intersection_observer::{
    IntersectionConfig, UseIntersectionObserver, UseIntersectionObserverOptions,
    use_intersection_observer,
};
pub use media_query::{MediaQueryConfig, UseMediaQueryOptions, use_media_query};
pub use mouse::{CoordinateType, MouseConfig, UseMouse, UseMouseOptions, use_mouse};
pub use mouse_in_element::{
    MouseInElementConfig, UseMouseInElement, UseMouseInElementOptions, use_mouse_in_element,
};
pub use mutation_observer::{UseMutationObserver, use_mutation_observer};
pub use resize_observer::{
    ResizeObserverConfig, UseResizeObserver, UseResizeObserverOptions, use_resize_observer,
};
pub use window_size::{UseWindowSize, UseWindowSizeOptions, WindowSizeConfig, use_window_size};

/// Pause, resume and stop controls for hooks that own an observer.
///
/// Pausing disconnects the observer and resuming reconnects it. Stopping is
/// final. All three are idempotent.
#[derive(Clone, Debug)]
pub struct Pausable {
    active: Observable<bool>,
    stopped: Rc<Cell<bool>>,
}

impl Pausable {
    pub(crate) fn new(active: bool) -> Self {
        Self {
            active: Observable::new(active),
            stopped: Rc::new(Cell::new(false)),
        }
    }

    /// Tracked read of whether the observer is connected (or will be, once there is a target).
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Returns true once [`stop`](Self::stop) has run.
    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }

    /// Disconnect until [`resume`](Self::resume).
    pub fn pause(&self) {
        if !self.stopped.get() {
            self.active.set_if_changed(false);
        }
    }

    /// Reconnect after [`pause`](Self::pause). Does nothing after [`stop`](Self::stop).
    pub fn resume(&self) {
        if !self.stopped.get() {
            self.active.set_if_changed(true);
        }
    }

    /// Disconnect for good.
    pub fn stop(&self) {
        self.stopped.set(true);
        self.active.set_if_changed(false);
    }
}

/// A flag that turns true after mount if the document exposes `capability`.
pub(crate) fn use_supported(cx: &mut Cx<'_>, capability: Capability) -> Observable<bool> {
    let supported = cx.use_hook(|| Observable::new(false));
    if cx.is_first_render() {
        let (flag, env) = ((*supported).clone(), cx.env().clone());
        cx.use_mount(move || {
            let available = env.supports(capability);
            if !available {
                tracing::debug!(%capability, "capability unavailable; hook inactive");
            }
            flag.set_if_changed(available);
        });
    }
    (*supported).clone()
}

/// An effect created at mount and owned by the component scope.
#[derive(Clone, Debug, Default)]
pub(crate) struct MountEffect {
    state: Rc<MountEffectState>,
}

#[derive(Debug, Default)]
struct MountEffectState {
    disposed: Cell<bool>,
    effect: RefCell<Option<Effect>>,
}

impl MountEffect {
    /// Dispose the effect, or keep it from being created if not yet mounted.
    pub(crate) fn dispose(&self) {
        self.state.disposed.set(true);
        let effect = self.state.effect.borrow_mut().take();
        if let Some(effect) = effect {
            effect.dispose();
        }
    }
}

/// Run `f` as an effect from mount until unmount (or [`MountEffect::dispose`]).
///
/// Without a document the effect is never created.
pub(crate) fn use_mount_effect(
    cx: &mut Cx<'_>,
    hook: &'static str,
    mut f: impl FnMut(&Document) + 'static,
) -> MountEffect {
    let handle = cx.use_hook(MountEffect::default);
    if cx.is_first_render() {
        match cx.document().cloned() {
            Some(doc) => {
                let state = handle.state.clone();
                cx.use_mount(move || {
                    if state.disposed.get() {
                        return;
                    }
                    let effect = Effect::new(move || f(&doc));
                    *state.effect.borrow_mut() = Some(effect);
                });
            }
            None => tracing::debug!(hook, "no document; hook inactive"),
        }
    }
    (*handle).clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_is_final_and_idempotent() {
        let p = Pausable::new(true);
        p.pause();
        assert!(!p.is_active());
        p.resume();
        assert!(p.is_active());
        p.stop();
        p.stop();
        p.resume();
        assert!(!p.is_active());
        assert!(p.is_stopped());
    }
}
