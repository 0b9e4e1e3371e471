// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The event binder.
//!
//! [`use_event_listener`] installs one document listener per (target, event
//! name): a forwarder created once per hook instance. The forwarder reads the
//! listener list passed on the latest render and calls each in order, so
//! closures that change every render never cause re-subscription. Changing
//! the target set, the event names or the options does: every installed
//! registration is removed and the binding is rebuilt.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use canopy_dom::{Document, Event, Listener, ListenerOptions, TargetId};
//! use canopy_hooks::{Component, Env, use_event_listener};
//!
//! let doc = Document::default();
//! let resized = Rc::new(Cell::new(0));
//! let c = Component::mount(Env::new(doc.clone()), {
//!     let resized = resized.clone();
//!     move |cx| {
//!         let resized = resized.clone();
//!         let on_resize: Listener = Rc::new(move |_: &Event| resized.set(resized.get() + 1));
//!         use_event_listener(cx, None, "resize", on_resize, ListenerOptions::PASSIVE)
//!     }
//! });
//! doc.set_viewport(kurbo::Size::new(640.0, 480.0));
//! assert_eq!(resized.get(), 1);
//!
//! c.output().call();
//! doc.set_viewport(kurbo::Size::new(800.0, 600.0));
//! assert_eq!(resized.get(), 1);
//! assert_eq!(doc.listener_count(TargetId::Window, "resize"), 0);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use canopy_dom::{Document, Event, Listener, ListenerOptions, TargetId};
use canopy_reactive::{Effect, MaybeReactive, Observable, on_cleanup};

use crate::component::Cx;
use crate::target::MaybeTarget;

/// One or more event names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventNames(Vec<String>);

impl EventNames {
    /// The names, in order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns true if there are no names.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for EventNames {
    fn from(name: &str) -> Self {
        Self(vec![name.into()])
    }
}

impl From<String> for EventNames {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl<const N: usize> From<[&str; N]> for EventNames {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|n| String::from(*n)).collect())
    }
}

impl From<Vec<String>> for EventNames {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

/// One or more listeners, called in order by the forwarder.
#[derive(Clone, Default)]
pub struct Listeners(Vec<Listener>);

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Listeners").field(&self.0.len()).finish()
    }
}

impl Listeners {
    /// Wrap a single closure.
    pub fn from_fn(f: impl Fn(&Event) + 'static) -> Self {
        Self(vec![Rc::new(f)])
    }

    /// Number of listeners.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Listener> for Listeners {
    fn from(listener: Listener) -> Self {
        Self(vec![listener])
    }
}

impl From<Vec<Listener>> for Listeners {
    fn from(listeners: Vec<Listener>) -> Self {
        Self(listeners)
    }
}

impl<const N: usize> From<[Listener; N]> for Listeners {
    fn from(listeners: [Listener; N]) -> Self {
        Self(listeners.into())
    }
}

/// Removes a binding made by [`use_event_listener`].
///
/// Unbinding is idempotent, safe after unmount, and before mount it prevents
/// the binding from being made at all.
#[derive(Clone, Debug)]
pub struct Unbind {
    state: Rc<BinderState>,
}

#[derive(Debug, Default)]
struct BinderState {
    stopped: Cell<bool>,
    effect: RefCell<Option<Effect>>,
}

impl Unbind {
    /// Remove every registration and stop re-binding.
    pub fn call(&self) {
        self.state.stopped.set(true);
        let effect = self.state.effect.borrow_mut().take();
        if let Some(effect) = effect {
            effect.dispose();
        }
    }

    /// Same as [`call`](Self::call).
    pub fn unbind(&self) {
        self.call();
    }

    /// Returns true if [`call`](Self::call) has run.
    pub fn is_stopped(&self) -> bool {
        self.state.stopped.get()
    }
}

#[derive(Clone)]
struct Binding {
    target: Option<MaybeTarget>,
    events: EventNames,
    options: MaybeReactive<ListenerOptions>,
}

impl Binding {
    fn same_identity(&self, other: &Self) -> bool {
        let same_target = match (&self.target, &other.target) {
            (Some(a), Some(b)) => a.same_identity(b),
            (None, None) => true,
            _ => false,
        };
        same_target && self.events == other.events && self.options.same_identity(&other.options)
    }
}

/// Listen for `events` on `target` (the window when `None`).
///
/// Binding happens after mount and follows the target set: assigning a
/// [`TargetRef`](crate::TargetRef) or writing a target cell re-binds. Options
/// are resolved when binding and the same copy is used for removal.
pub fn use_event_listener(
    cx: &mut Cx<'_>,
    target: Option<MaybeTarget>,
    events: impl Into<EventNames>,
    listeners: impl Into<Listeners>,
    options: impl Into<MaybeReactive<ListenerOptions>>,
) -> Unbind {
    let latest = cx.use_latest(listeners.into());
    let forwarder = cx.use_hook(|| -> Listener {
        let latest = latest.clone();
        Rc::new(move |event: &Event| {
            let current = latest.borrow().clone();
            for listener in &current.0 {
                listener(event);
            }
        })
    });

    let next = Binding {
        target,
        events: events.into(),
        options: options.into(),
    };
    let binding = cx.use_hook(|| Observable::new(next.clone()));
    if !binding.with_untracked(|current| current.same_identity(&next)) {
        binding.set(next);
    }

    let state = cx.use_hook(BinderState::default);
    if cx.is_first_render() {
        match cx.document().cloned() {
            Some(doc) => {
                let binding = (*binding).clone();
                let forwarder = (*forwarder).clone();
                let state = state.clone();
                cx.use_mount(move || {
                    if state.stopped.get() {
                        tracing::debug!("unbound before mount; listeners not bound");
                        return;
                    }
                    let effect = Effect::new(move || bind(&doc, &binding, &forwarder));
                    *state.effect.borrow_mut() = Some(effect);
                });
            }
            None => tracing::debug!("no document; listeners not bound"),
        }
    }
    Unbind { state }
}

fn bind(doc: &Document, binding: &Observable<Binding>, forwarder: &Listener) {
    let (targets, events, options) = binding.with(|b| {
        let targets = match &b.target {
            Some(target) => target.resolve(),
            None => vec![TargetId::Window],
        };
        (targets, b.events.clone(), b.options.get())
    });
    if targets.is_empty() || events.is_empty() {
        tracing::trace!("empty target set; nothing to bind");
        return;
    }

    let mut installed = Vec::with_capacity(targets.len() * events.as_slice().len());
    for &target in &targets {
        for name in events.as_slice() {
            if doc.add_event_listener(target, name, forwarder.clone(), options) {
                installed.push((target, name.clone()));
            }
        }
    }
    tracing::debug!(
        targets = targets.len(),
        events = ?events.as_slice(),
        installed = installed.len(),
        "bound listeners"
    );

    let doc = doc.clone();
    let forwarder = forwarder.clone();
    on_cleanup(move || {
        for (target, name) in &installed {
            doc.remove_event_listener(*target, name, &forwarder, options.capture);
        }
        tracing::debug!(removed = installed.len(), "unbound listeners");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, Env, TargetRef};
    use canopy_dom::LocalElement;
    use kurbo::{Point, Rect};
    use tracing_test::traced_test;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, tag: &str) -> Listener {
        let (log, tag) = (log.clone(), String::from(tag));
        Rc::new(move |e: &Event| log.borrow_mut().push(format!("{tag}:{}", e.event_type())))
    }

    fn two_boxes(doc: &Document) -> (canopy_dom::NodeId, canopy_dom::NodeId) {
        let a = doc
            .insert(None, LocalElement::new("a", Rect::new(0.0, 0.0, 50.0, 50.0)))
            .unwrap();
        let b = doc
            .insert(None, LocalElement::new("b", Rect::new(100.0, 0.0, 150.0, 50.0)))
            .unwrap();
        (a, b)
    }

    #[test]
    fn one_registration_per_target_and_event() {
        let doc = Document::default();
        let (a, b) = two_boxes(&doc);
        let log = Rc::new(RefCell::new(Vec::new()));
        let _c = Component::mount(Env::new(doc.clone()), {
            let log = log.clone();
            move |cx| {
                let listeners = [recorder(&log, "1"), recorder(&log, "2"), recorder(&log, "3")];
                use_event_listener(
                    cx,
                    Some(MaybeTarget::list([a, b])),
                    "pointerdown",
                    listeners,
                    ListenerOptions::default(),
                )
            }
        });
        assert_eq!(doc.listener_count(TargetId::Element(a), "pointerdown"), 1);
        assert_eq!(doc.listener_count(TargetId::Element(b), "pointerdown"), 1);
        assert_eq!(doc.total_listeners(), 2);

        doc.pointer_down(Point::new(10.0, 10.0));
        assert_eq!(
            *log.borrow(),
            ["1:pointerdown", "2:pointerdown", "3:pointerdown"]
        );
    }

    #[test]
    fn forwarder_sees_latest_listeners_without_resubscribing() {
        let doc = Document::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let tag = Rc::new(RefCell::new(String::from("first")));
        let mut c = Component::mount(Env::new(doc.clone()), {
            let (log, tag) = (log.clone(), tag.clone());
            move |cx| {
                let listener = recorder(&log, &tag.borrow());
                let events = ["resize", "scroll"];
                use_event_listener(cx, None, events, listener, ListenerOptions::PASSIVE)
            }
        });
        assert_eq!(doc.listener_count(TargetId::Window, "resize"), 1);
        *tag.borrow_mut() = String::from("second");
        c.rerender();
        assert_eq!(doc.total_listeners(), 2);
        doc.set_viewport(kurbo::Size::new(10.0, 10.0));
        assert_eq!(*log.borrow(), ["second:resize"]);
    }

    #[test]
    fn assignment_rebinds_to_the_new_element() {
        let doc = Document::default();
        let (a, b) = two_boxes(&doc);
        let log = Rc::new(RefCell::new(Vec::new()));
        let r = TargetRef::new();
        r.set(Some(a));
        let _c = Component::mount(Env::new(doc.clone()), {
            let (log, r) = (log.clone(), r.clone());
            move |cx| {
                use_event_listener(
                    cx,
                    Some(r.clone().into()),
                    "pointerdown",
                    recorder(&log, "hit"),
                    ListenerOptions::default(),
                )
            }
        });
        r.set(Some(b));
        assert_eq!(doc.listener_count(TargetId::Element(a), "pointerdown"), 0);
        assert_eq!(doc.listener_count(TargetId::Element(b), "pointerdown"), 1);
        doc.pointer_down(Point::new(10.0, 10.0));
        doc.pointer_down(Point::new(110.0, 10.0));
        assert_eq!(*log.borrow(), ["hit:pointerdown"]);

        r.set(None);
        assert_eq!(doc.total_listeners(), 0);
    }

    #[test]
    fn removal_uses_the_bound_capture_flag() {
        let doc = Document::default();
        let options = Observable::new(ListenerOptions {
            capture: true,
            ..ListenerOptions::default()
        });
        let mut c = Component::mount(Env::new(doc.clone()), {
            let options = options.clone();
            move |cx| {
                use_event_listener(
                    cx,
                    Some(TargetId::Document.into()),
                    "pointermove",
                    Listeners::from_fn(|_| {}),
                    options.clone(),
                )
            }
        });
        assert_eq!(doc.listener_count(TargetId::Document, "pointermove"), 1);
        options.set(ListenerOptions::default());
        assert_eq!(doc.listener_count(TargetId::Document, "pointermove"), 1);
        c.unmount();
        assert_eq!(doc.total_listeners(), 0);
    }

    #[test]
    fn unbind_is_idempotent_and_survives_unmount() {
        let doc = Document::default();
        let mut c = Component::mount(Env::new(doc.clone()), |cx| {
            use_event_listener(
                cx,
                None,
                "resize",
                Listeners::from_fn(|_| {}),
                ListenerOptions::default(),
            )
        });
        let unbind = c.output().clone();
        assert_eq!(doc.total_listeners(), 1);
        unbind.call();
        unbind.unbind();
        assert!(unbind.is_stopped());
        assert_eq!(doc.total_listeners(), 0);
        c.unmount();
        unbind.call();
        assert_eq!(doc.total_listeners(), 0);
    }

    #[test]
    fn unbinding_before_mount_prevents_binding() {
        let doc = Document::default();
        let _c = Component::mount(Env::new(doc.clone()), |cx| {
            let unbind = use_event_listener(
                cx,
                None,
                "resize",
                Listeners::from_fn(|_| {}),
                ListenerOptions::default(),
            );
            if cx.is_first_render() {
                unbind.call();
            }
        });
        assert_eq!(doc.total_listeners(), 0);
    }

    #[test]
    #[traced_test]
    fn binding_is_logged() {
        let doc = Document::default();
        let mut c = Component::mount(Env::new(doc.clone()), |cx| {
            use_event_listener(
                cx,
                None,
                "resize",
                Listeners::from_fn(|_| {}),
                ListenerOptions::default(),
            )
        });
        c.unmount();
        assert!(logs_contain("bound listeners"));
        assert!(logs_contain("unbound listeners"));

        let _headless = Component::mount(Env::headless(), |cx| {
            use_event_listener(
                cx,
                None,
                "resize",
                Listeners::from_fn(|_| {}),
                ListenerOptions::default(),
            )
        });
        assert!(logs_contain("no document; listeners not bound"));
    }
}
