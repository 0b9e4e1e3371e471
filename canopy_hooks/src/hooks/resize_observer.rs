// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resize observation of a target set.

use std::rc::Rc;

use canopy_dom::{Capability, NodeId, ResizeBox, ResizeCallback, ResizeObserverEntry, TargetId};
use canopy_reactive::{MaybeReactive, Observable, on_cleanup};

use super::{Pausable, use_mount_effect, use_supported};
use crate::component::Cx;
use crate::options::{
    FieldResolver, MaybeObservableOptions, NormalizeOptions, use_maybe_observable_options,
};
use crate::target::{MaybeTarget, use_target};

/// Options for [`use_resize_observer`].
#[derive(Clone, Debug)]
pub struct UseResizeObserverOptions {
    /// Which box to watch.
    pub observed_box: MaybeReactive<ResizeBox>,
    /// Start observing on mount. Defaults to true; read once.
    pub immediate: MaybeReactive<bool>,
}

impl Default for UseResizeObserverOptions {
    fn default() -> Self {
        Self {
            observed_box: ResizeBox::ContentBox.into(),
            immediate: true.into(),
        }
    }
}

/// Resolved [`UseResizeObserverOptions`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResizeObserverConfig {
    /// See [`UseResizeObserverOptions::observed_box`].
    pub observed_box: ResizeBox,
    /// See [`UseResizeObserverOptions::immediate`].
    pub immediate: bool,
}

impl Default for ResizeObserverConfig {
    fn default() -> Self {
        Self {
            observed_box: ResizeBox::ContentBox,
            immediate: true,
        }
    }
}

impl NormalizeOptions for UseResizeObserverOptions {
    type Output = ResizeObserverConfig;

    fn normalize(&self, fields: &FieldResolver) -> ResizeObserverConfig {
        ResizeObserverConfig {
            observed_box: fields.track(&self.observed_box),
            immediate: fields.snapshot("immediate", &self.immediate),
        }
    }
}

/// Handle returned by [`use_resize_observer`].
#[derive(Clone, Debug)]
pub struct UseResizeObserver {
    /// False until mount, and afterwards if the document cannot observe resizes.
    pub is_supported: Observable<bool>,
    controls: Pausable,
}

impl UseResizeObserver {
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

/// Call `callback` with resize entries for every element of `target`.
///
/// The observer is re-created when the target set, the observed box or the
/// pause state changes; each new observer reports every target once.
pub fn use_resize_observer(
    cx: &mut Cx<'_>,
    target: MaybeTarget,
    callback: impl Fn(&[ResizeObserverEntry]) + 'static,
    options: impl Into<MaybeObservableOptions<UseResizeObserverOptions>>,
) -> UseResizeObserver {
    let target = use_target(cx, target);
    let config = use_maybe_observable_options(cx, Some(options.into()));
    let latest = cx.use_latest::<ResizeCallback>(Rc::new(callback));
    let is_supported = use_supported(cx, Capability::ResizeObserver);
    let controls = cx.use_hook(|| {
        Pausable::new(config.with_untracked(|c| c.unwrap_or_default().immediate))
    });

    use_mount_effect(cx, "use_resize_observer", {
        let (supported, controls) = (is_supported.clone(), (*controls).clone());
        move |doc| {
            if !supported.get() || !controls.is_active() {
                return;
            }
            let observed_box = config.with(|c| c.unwrap_or_default().observed_box);
            let elements: Vec<NodeId> = target
                .with(MaybeTarget::resolve)
                .into_iter()
                .filter_map(TargetId::element)
                .collect();
            if elements.is_empty() {
                tracing::trace!("empty target set; nothing to observe");
                return;
            }
            let latest = latest.clone();
            let observer = match doc.resize_observer(move |entries| {
                let callback = latest.borrow().clone();
                callback(entries);
            }) {
                Ok(observer) => observer,
                Err(err) => {
                    tracing::debug!(%err, "resize observer unavailable");
                    return;
                }
            };
            for &element in &elements {
                if let Err(err) = observer.observe(element, observed_box) {
                    tracing::debug!(%err, "skipping resize target");
                }
            }
            tracing::debug!(targets = elements.len(), ?observed_box, "resize observer connected");
            on_cleanup(move || {
                observer.disconnect();
                tracing::debug!("resize observer disconnected");
            });
        }
    });

    UseResizeObserver {
        is_supported,
        controls: (*controls).clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, Env, TargetRef};
    use canopy_dom::{Capabilities, Document, DocumentConfig, LocalElement};
    use kurbo::{Insets, Rect, Size};
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<(NodeId, Size)>>>;

    fn mount(
        doc: &Document,
        target: impl Into<MaybeTarget>,
        observed_box: ResizeBox,
        log: &Log,
    ) -> Component<UseResizeObserver> {
        let (target, log) = (target.into(), log.clone());
        let options = Rc::new(UseResizeObserverOptions {
            observed_box: observed_box.into(),
            ..UseResizeObserverOptions::default()
        });
        Component::mount(Env::new(doc.clone()), move |cx| {
            let log = log.clone();
            use_resize_observer(
                cx,
                target.clone(),
                move |entries: &[ResizeObserverEntry]| {
                    let mut log = log.borrow_mut();
                    log.extend(entries.iter().map(|e| (e.target, e.size(observed_box))));
                },
                MaybeObservableOptions::Fields(options.clone()),
            )
        })
    }

    #[test]
    fn reports_observed_box_changes() {
        let doc = Document::default();
        let el = doc
            .insert(None, LocalElement::new("div", Rect::new(0.0, 0.0, 100.0, 50.0)))
            .unwrap();
        doc.set_content_insets(el, Insets::uniform(5.0)).unwrap();
        let log = Log::default();
        let observer = mount(&doc, el, ResizeBox::BorderBox, &log);
        assert!(observer.output().is_supported.get());

        doc.flush();
        doc.set_content_insets(el, Insets::uniform(10.0)).unwrap();
        doc.flush();
        doc.set_local_bounds(el, Rect::new(0.0, 0.0, 120.0, 50.0)).unwrap();
        doc.flush();
        assert_eq!(
            *log.borrow(),
            [(el, Size::new(100.0, 50.0)), (el, Size::new(120.0, 50.0))]
        );
    }

    #[test]
    fn pause_resume_and_stop() {
        let doc = Document::default();
        let el = doc
            .insert(None, LocalElement::new("div", Rect::new(0.0, 0.0, 10.0, 10.0)))
            .unwrap();
        let log = Log::default();
        let c = mount(&doc, el, ResizeBox::ContentBox, &log);
        let observer = c.output().clone();
        doc.flush();
        assert_eq!(log.borrow().len(), 1);

        observer.pause();
        doc.set_local_bounds(el, Rect::new(0.0, 0.0, 20.0, 10.0)).unwrap();
        doc.flush();
        assert_eq!(log.borrow().len(), 1);

        // A fresh observer reports the current size once.
        observer.resume();
        doc.flush();
        assert_eq!(log.borrow().len(), 2);

        observer.stop();
        observer.stop();
        observer.resume();
        assert!(!observer.is_active());
        doc.set_local_bounds(el, Rect::new(0.0, 0.0, 30.0, 10.0)).unwrap();
        doc.flush();
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn follows_target_ref_assignment() {
        let doc = Document::default();
        let a = doc
            .insert(None, LocalElement::new("a", Rect::new(0.0, 0.0, 10.0, 10.0)))
            .unwrap();
        let b = doc
            .insert(None, LocalElement::new("b", Rect::new(0.0, 0.0, 20.0, 20.0)))
            .unwrap();
        let target = TargetRef::new();
        let log = Log::default();
        let _c = mount(&doc, target.clone(), ResizeBox::ContentBox, &log);
        doc.flush();
        assert!(log.borrow().is_empty());

        target.set(Some(a));
        doc.flush();
        target.set(Some(b));
        doc.flush();
        let targets: Vec<NodeId> = log.borrow().iter().map(|(n, _)| *n).collect();
        assert_eq!(targets, [a, b]);
    }

    #[test]
    fn unsupported_documents_report_it() {
        let doc = Document::new(DocumentConfig {
            capabilities: Capabilities::all() - Capabilities::RESIZE_OBSERVER,
            ..DocumentConfig::default()
        });
        let el = doc
            .insert(None, LocalElement::new("div", Rect::new(0.0, 0.0, 10.0, 10.0)))
            .unwrap();
        let log = Log::default();
        let c = mount(&doc, el, ResizeBox::ContentBox, &log);
        doc.flush();
        assert!(!c.output().is_supported.get());
        assert!(log.borrow().is_empty());
    }
}
