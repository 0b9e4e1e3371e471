// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reactive `matchMedia`.

use std::cell::RefCell;
use std::rc::Rc;

use canopy_dom::{
    Capability, ColorScheme, ListenerOptions, MediaEnvironment, MediaQuery, MediaQueryList,
    TargetId,
};
use canopy_reactive::{Computed, MaybeReactive, Observable, on_cleanup};

use super::{use_mount_effect, use_supported};
use crate::component::Cx;
use crate::listener::{Listeners, use_event_listener};
use crate::options::{
    FieldResolver, MaybeObservableOptions, NormalizeOptions, use_maybe_observable,
    use_maybe_observable_options,
};
use crate::target::MaybeTarget;

/// Options for [`use_media_query`].
#[derive(Clone, Debug, Default)]
pub struct UseMediaQueryOptions {
    /// Viewport width to evaluate against while `matchMedia` is unavailable.
    pub ssr_width: MaybeReactive<Option<f64>>,
}

/// Resolved [`UseMediaQueryOptions`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MediaQueryConfig {
    /// See [`UseMediaQueryOptions::ssr_width`].
    pub ssr_width: Option<f64>,
}

impl NormalizeOptions for UseMediaQueryOptions {
    type Output = MediaQueryConfig;

    fn normalize(&self, fields: &FieldResolver) -> MediaQueryConfig {
        MediaQueryConfig {
            ssr_width: fields.track(&self.ssr_width),
        }
    }
}

/// Evaluate `query` without a window, at `width` and zero height.
fn evaluate_headless(query: &str, width: f64) -> bool {
    let env = MediaEnvironment {
        width,
        height: 0.0,
        color_scheme: ColorScheme::Light,
    };
    MediaQuery::parse(query).is_ok_and(|q| q.evaluate(&env))
}

struct MediaSlot {
    matches: Observable<bool>,
    list_target: Observable<Option<TargetId>>,
    list: Rc<RefCell<Option<MediaQueryList>>>,
}

/// Whether `query` matches, kept live through the list's `change` event.
///
/// Until mount, and whenever `matchMedia` is unsupported, the query is
/// evaluated against `ssr_width` if one is given and is false otherwise.
pub fn use_media_query(
    cx: &mut Cx<'_>,
    query: impl Into<MaybeReactive<String>>,
    options: impl Into<MaybeObservableOptions<UseMediaQueryOptions>>,
) -> Computed<bool> {
    let query = use_maybe_observable(cx, query);
    let config = use_maybe_observable_options(cx, Some(options.into()));
    let supported = use_supported(cx, Capability::MatchMedia);
    let slot = cx.use_hook(|| {
        let ssr_width = config.with_untracked(|c| c.unwrap_or_default().ssr_width);
        let initial = ssr_width.is_some_and(|w| query.with_untracked(|q| evaluate_headless(q, w)));
        MediaSlot {
            matches: Observable::new(initial),
            list_target: Observable::new(None),
            list: Rc::new(RefCell::new(None)),
        }
    });

    use_mount_effect(cx, "use_media_query", {
        let (matches, list_target, list) =
            (slot.matches.clone(), slot.list_target.clone(), slot.list.clone());
        move |doc| {
            if !supported.get() {
                let ssr_width = config.with(|c| c.unwrap_or_default().ssr_width);
                let value = ssr_width.is_some_and(|w| query.with(|q| evaluate_headless(q, w)));
                matches.set_if_changed(value);
                return;
            }
            let text = query.get();
            match doc.match_media(&text) {
                Ok(created) => {
                    matches.set_if_changed(created.matches());
                    list_target.set_if_changed(Some(created.target()));
                    *list.borrow_mut() = Some(created);
                }
                Err(err) => {
                    tracing::debug!(%err, "media query not evaluated");
                    matches.set_if_changed(false);
                    list_target.set_if_changed(None);
                }
            }
            let list = list.clone();
            on_cleanup(move || drop(list.borrow_mut().take()));
        }
    });

    use_event_listener(
        cx,
        Some(MaybeTarget::Target(slot.list_target.clone())),
        "change",
        Listeners::from_fn({
            let matches = slot.matches.clone();
            move |e| {
                if let Some(change) = e.media_change() {
                    matches.set_if_changed(change.matches);
                }
            }
        }),
        ListenerOptions::PASSIVE,
    );

    let matches = slot.matches.clone();
    let out = cx.use_hook(move || Computed::new(move || matches.get()));
    (*out).clone()
}
