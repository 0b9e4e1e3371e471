// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Intersection observation of a target set.

use std::rc::Rc;

use canopy_dom::{
    Capability, IntersectionCallback, IntersectionObserverEntry, IntersectionObserverInit, NodeId,
    TargetId,
};
use canopy_reactive::{MaybeReactive, Observable, on_cleanup};
use kurbo::Insets;

use super::{Pausable, use_mount_effect, use_supported};
use crate::component::Cx;
use crate::options::{
    FieldResolver, MaybeObservableOptions, NormalizeOptions, use_maybe_observable_options,
};
use crate::target::{MaybeTarget, use_target};

/// Options for [`use_intersection_observer`].
#[derive(Clone, Debug)]
pub struct UseIntersectionObserverOptions {
    /// Element used as the root. The viewport when unset or empty.
    pub root: Option<MaybeTarget>,
    /// Growth of the root rectangle on each side.
    pub root_margin: MaybeReactive<Insets>,
    /// Ratios at which entries are delivered.
    pub threshold: MaybeReactive<Vec<f64>>,
    /// Start observing on mount. Defaults to true; read once.
    pub immediate: MaybeReactive<bool>,
}

impl Default for UseIntersectionObserverOptions {
    fn default() -> Self {
        Self {
            root: None,
            root_margin: Insets::ZERO.into(),
            threshold: MaybeReactive::Static(vec![0.0]),
            immediate: true.into(),
        }
    }
}

/// Resolved [`UseIntersectionObserverOptions`].
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionConfig {
    /// See [`UseIntersectionObserverOptions::root`].
    pub root: Option<Option<NodeId>>,
    /// See [`UseIntersectionObserverOptions::root_margin`].
    pub root_margin: Insets,
    /// See [`UseIntersectionObserverOptions::threshold`].
    pub threshold: Vec<f64>,
    /// See [`UseIntersectionObserverOptions::immediate`].
    pub immediate: bool,
}

impl Default for IntersectionConfig {
    fn default() -> Self {
        Self {
            root: None,
            root_margin: Insets::ZERO,
            threshold: vec![0.0],
            immediate: true,
        }
    }
}

impl IntersectionConfig {
    fn init(&self) -> IntersectionObserverInit {
        IntersectionObserverInit {
            root: self.root.flatten(),
            root_margin: self.root_margin,
            thresholds: self.threshold.clone(),
        }
    }
}

impl NormalizeOptions for UseIntersectionObserverOptions {
    type Output = IntersectionConfig;

    fn normalize(&self, fields: &FieldResolver) -> IntersectionConfig {
        IntersectionConfig {
            root: fields.track_element(&self.root),
            root_margin: fields.track(&self.root_margin),
            threshold: fields.track(&self.threshold),
            immediate: fields.snapshot("immediate", &self.immediate),
        }
    }
}

/// Handle returned by [`use_intersection_observer`].
#[derive(Clone, Debug)]
pub struct UseIntersectionObserver {
    /// False until mount, and afterwards if the document cannot observe intersections.
    pub is_supported: Observable<bool>,
    controls: Pausable,
}

impl UseIntersectionObserver {
    /// Tracked read of whether observation is on.
    pub fn is_active(&self) -> bool {
        self.controls.is_active()
    }

    /// Disconnect until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.controls.pause();
    }

    /// Reconnect after [`pause`](Self::pause).
    pub fn resume(&self) {
        self.controls.resume();
    }

    /// Disconnect for good.
    pub fn stop(&self) {
        self.controls.stop();
    }
}

/// Call `callback` with intersection entries for every element of `target`.
///
/// The observer is re-created when the target set, the root, the margin, the
/// thresholds or the pause state changes.
pub fn use_intersection_observer(
    cx: &mut Cx<'_>,
    target: MaybeTarget,
    callback: impl Fn(&[IntersectionObserverEntry]) + 'static,
    options: impl Into<MaybeObservableOptions<UseIntersectionObserverOptions>>,
) -> UseIntersectionObserver {
    let target = use_target(cx, target);
    let config = use_maybe_observable_options(cx, Some(options.into()));
    let latest = cx.use_latest::<IntersectionCallback>(Rc::new(callback));
    let is_supported = use_supported(cx, Capability::IntersectionObserver);
    let controls = cx.use_hook(|| {
        Pausable::new(config.with_untracked(|c| c.as_ref().is_none_or(|c| c.immediate)))
    });

    use_mount_effect(cx, "use_intersection_observer", {
        let (supported, controls) = (is_supported.clone(), (*controls).clone());
        move |doc| {
            if !supported.get() || !controls.is_active() {
                return;
            }
            let init = config.with(|c| c.clone().unwrap_or_default().init());
            let elements: Vec<NodeId> = target
                .with(MaybeTarget::resolve)
                .into_iter()
                .filter_map(TargetId::element)
                .collect();
            if elements.is_empty() {
                return;
            }
            let latest = latest.clone();
            let observer = match doc.intersection_observer(init, move |entries| {
                let callback = latest.borrow().clone();
                callback(entries);
            }) {
                Ok(observer) => observer,
                Err(err) => {
                    tracing::debug!(%err, "intersection observer unavailable");
                    return;
                }
            };
            for &element in &elements {
                if let Err(err) = observer.observe(element) {
                    tracing::debug!(%err, "skipping intersection target");
                }
            }
            tracing::debug!(targets = elements.len(), "intersection observer connected");
            on_cleanup(move || {
                observer.disconnect();
                tracing::debug!("intersection observer disconnected");
            });
        }
    });

    UseIntersectionObserver {
        is_supported,
        controls: (*controls).clone(),
    }
}
