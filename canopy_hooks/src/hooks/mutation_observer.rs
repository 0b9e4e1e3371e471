// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mutation observation of a target set.

use std::cell::RefCell;
use std::rc::Rc;

use canopy_dom::{
    Capability, MutationCallback, MutationObserver, MutationObserverInit, MutationRecord,
    TargetId,
};
use canopy_reactive::{MaybeReactive, Observable, on_cleanup};

use super::{Pausable, use_mount_effect, use_supported};
use crate::component::Cx;
use crate::options::use_maybe_observable;
use crate::target::{MaybeTarget, use_target};

/// Handle returned by [`use_mutation_observer`].
#[derive(Clone, Debug)]
pub struct UseMutationObserver {
    /// False until mount, and afterwards if the document cannot observe mutations.
    pub is_supported: Observable<bool>,
    controls: Pausable,
    observer: Rc<RefCell<Option<MutationObserver>>>,
}

impl UseMutationObserver {
    /// Disconnect for good.
    pub fn stop(&self) {
        self.controls.stop();
    }

    /// Drain records that were queued but not yet delivered to the callback.
    pub fn take_records(&self) -> Vec<MutationRecord> {
        self.observer
            .borrow()
            .as_ref()
            .map(MutationObserver::take_records)
            .unwrap_or_default()
    }
}

/// Call `callback` with mutation records for every element of `target`.
///
/// Records are delivered on [`Document::flush`](canopy_dom::Document::flush).
/// The observer is re-created when the target set or `init` changes.
pub fn use_mutation_observer(
    cx: &mut Cx<'_>,
    target: MaybeTarget,
    callback: impl Fn(&[MutationRecord]) + 'static,
    init: impl Into<MaybeReactive<MutationObserverInit>>,
) -> UseMutationObserver {
    let target = use_target(cx, target);
    let init = use_maybe_observable(cx, init);
    let latest = cx.use_latest::<MutationCallback>(Rc::new(callback));
    let is_supported = use_supported(cx, Capability::MutationObserver);
    let state = cx.use_hook(|| (Pausable::new(true), Rc::new(RefCell::new(None))));
    let (controls, observer) = (state.0.clone(), state.1.clone());

    use_mount_effect(cx, "use_mutation_observer", {
        let (supported, controls) = (is_supported.clone(), controls.clone());
        let slot = observer.clone();
        move |doc| {
            if !supported.get() || !controls.is_active() {
                return;
            }
            let init = init.get();
            let elements: Vec<_> = target
                .with(MaybeTarget::resolve)
                .into_iter()
                .filter_map(TargetId::element)
                .collect();
            if elements.is_empty() {
                return;
            }
            let latest = latest.clone();
            let observer = match doc.mutation_observer(move |records| {
                let callback = latest.borrow().clone();
                callback(records);
            }) {
                Ok(observer) => observer,
                Err(err) => {
                    tracing::debug!(%err, "mutation observer unavailable");
                    return;
                }
            };
            for &element in &elements {
                if let Err(err) = observer.observe(element, init.clone()) {
                    tracing::debug!(%err, "skipping mutation target");
                }
            }
            tracing::debug!(targets = elements.len(), "mutation observer connected");
            *slot.borrow_mut() = Some(observer);
            let slot = slot.clone();
            on_cleanup(move || {
                if let Some(observer) = slot.borrow_mut().take() {
                    observer.disconnect();
                }
                tracing::debug!("mutation observer disconnected");
            });
        }
    });

    UseMutationObserver {
        is_supported,
        controls,
        observer,
    }
}
