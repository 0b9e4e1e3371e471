// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Whether an element is in view.

use std::cell::OnceCell;
use std::rc::Rc;

use canopy_dom::IntersectionObserverEntry;
use canopy_reactive::{Computed, MaybeReactive, Observable};
use kurbo::Insets;

use super::{UseIntersectionObserver, UseIntersectionObserverOptions, use_intersection_observer};
use crate::component::Cx;
use crate::options::{
    FieldResolver, MaybeObservableOptions, NormalizeOptions, use_maybe_observable_options,
};
use crate::target::MaybeTarget;

/// Options for [`use_element_visibility`].
#[derive(Clone, Debug)]
pub struct UseElementVisibilityOptions {
    /// Scroll container used as the root. The viewport when unset.
    ///
    /// Read on the first render; pass a [`TargetRef`](crate::TargetRef) to
    /// change the container later.
    pub scroll_target: Option<MaybeTarget>,
    /// Growth of the root rectangle on each side.
    pub root_margin: MaybeReactive<Insets>,
    /// Ratios at which visibility is re-evaluated.
    pub threshold: MaybeReactive<Vec<f64>>,
    /// Stop observing once the element has been visible.
    pub once: MaybeReactive<bool>,
}

impl Default for UseElementVisibilityOptions {
    fn default() -> Self {
        Self {
            scroll_target: None,
            root_margin: Insets::ZERO.into(),
            threshold: MaybeReactive::Static(vec![0.0]),
            once: false.into(),
        }
    }
}

/// Resolved [`UseElementVisibilityOptions`], minus the scroll target.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementVisibilityConfig {
    /// See [`UseElementVisibilityOptions::root_margin`].
    pub root_margin: Insets,
    /// See [`UseElementVisibilityOptions::threshold`].
    pub threshold: Vec<f64>,
    /// See [`UseElementVisibilityOptions::once`].
    pub once: bool,
}

impl NormalizeOptions for UseElementVisibilityOptions {
    type Output = ElementVisibilityConfig;

    fn normalize(&self, fields: &FieldResolver) -> ElementVisibilityConfig {
        ElementVisibilityConfig {
            root_margin: fields.track(&self.root_margin),
            threshold: fields.track(&self.threshold),
            once: fields.snapshot("once", &self.once),
        }
    }
}

/// Track whether the first element of `target` intersects its scroll root.
///
/// When several entries arrive together the latest one wins.
pub fn use_element_visibility(
    cx: &mut Cx<'_>,
    target: MaybeTarget,
    options: impl Into<MaybeObservableOptions<UseElementVisibilityOptions>>,
) -> Observable<bool> {
    let options = options.into();
    let scroll_target = match &options {
        MaybeObservableOptions::Fields(raw) => raw.scroll_target.clone(),
        MaybeObservableOptions::Observable(_) => None,
    };
    let config = use_maybe_observable_options(cx, Some(options));
    let visible = cx.use_hook(|| Observable::new(false));
    // Filled once the observer exists, so `once` can stop it from the callback.
    let handle = cx.use_hook(OnceCell::<UseIntersectionObserver>::new);

    let observe_options = cx.use_hook(|| {
        let (margin, threshold) = (config.clone(), config.clone());
        Rc::new(UseIntersectionObserverOptions {
            root: scroll_target.clone(),
            root_margin: Computed::new(move || {
                margin.with(|c| c.as_ref().map_or(Insets::ZERO, |c| c.root_margin))
            })
            .into(),
            threshold: Computed::new(move || {
                threshold.with(|c| {
                    c.as_ref()
                        .map_or_else(|| vec![0.0], |c| c.threshold.clone())
                })
            })
            .into(),
            ..UseIntersectionObserverOptions::default()
        })
    });
    let observer = use_intersection_observer(
        cx,
        target,
        {
            let (visible, handle) = ((*visible).clone(), handle.clone());
            let config = config.clone();
            move |entries: &[IntersectionObserverEntry]| {
                let mut latest = (f64::MIN, visible.peek());
                for entry in entries {
                    if entry.time >= latest.0 {
                        latest = (entry.time, entry.is_intersecting);
                    }
                }
                visible.set_if_changed(latest.1);
                let once = config.with_untracked(|c| c.as_ref().is_some_and(|c| c.once));
                if once
                    && latest.1
                    && let Some(observer) = handle.get()
                {
                    tracing::debug!("element visible; observation stopped");
                    observer.stop();
                }
            }
        },
        MaybeObservableOptions::Fields((*observe_options).clone()),
    );
    let _ = handle.set(observer);
    (*visible).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, Env};
    use canopy_dom::{Document, LocalElement, NodeId};
    use kurbo::{Point, Rect};

    fn setup(
        options: UseElementVisibilityOptions,
    ) -> (Document, NodeId, Component<Observable<bool>>) {
        let doc = Document::default();
        let el = doc
            .insert(None, LocalElement::new("div", Rect::new(0.0, 1000.0, 50.0, 1050.0)))
            .unwrap();
        let options = Rc::new(options);
        let c = Component::mount(Env::new(doc.clone()), move |cx| {
            use_element_visibility(cx, el.into(), MaybeObservableOptions::Fields(options.clone()))
        });
        (doc, el, c)
    }

    #[test]
    fn follows_scrolling() {
        let (doc, _, c) = setup(UseElementVisibilityOptions::default());
        let visible = c.output().clone();
        doc.flush();
        assert!(!visible.get());
        doc.scroll_to(Point::new(0.0, 500.0));
        doc.flush();
        assert!(visible.get());
        doc.scroll_to(Point::ZERO);
        doc.flush();
        assert!(!visible.get());
    }

    #[test]
    fn once_stops_after_the_first_visible_entry() {
        let (doc, _, c) = setup(UseElementVisibilityOptions {
            once: true.into(),
            ..UseElementVisibilityOptions::default()
        });
        let visible = c.output().clone();
        doc.scroll_to(Point::new(0.0, 500.0));
        doc.flush();
        assert!(visible.get());
        doc.scroll_to(Point::ZERO);
        doc.flush();
        assert!(visible.get());
    }

    #[test]
    fn scroll_target_is_the_root() {
        let doc = Document::default();
        let pane = doc
            .insert(None, LocalElement::new("pane", Rect::new(0.0, 0.0, 100.0, 100.0)))
            .unwrap();
        let item = doc
            .insert(Some(pane), LocalElement::new("item", Rect::new(0.0, 90.0, 10.0, 100.0)))
            .unwrap();
        let options = Rc::new(UseElementVisibilityOptions {
            scroll_target: Some(pane.into()),
            root_margin: Insets::new(0.0, -20.0, 0.0, -20.0).into(),
            ..UseElementVisibilityOptions::default()
        });
        let c = Component::mount(Env::new(doc.clone()), move |cx| {
            use_element_visibility(cx, item.into(), MaybeObservableOptions::Fields(options.clone()))
        });
        doc.flush();
        assert!(!c.output().get());
        doc.set_local_bounds(item, Rect::new(0.0, 40.0, 10.0, 50.0)).unwrap();
        doc.flush();
        assert!(c.output().get());
    }
}
