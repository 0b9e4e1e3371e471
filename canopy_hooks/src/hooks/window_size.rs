// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reactive window size.

use std::rc::Rc;

use canopy_dom::{Document, ListenerOptions};
use canopy_reactive::{MaybeReactive, Observable, batch};
use kurbo::Size;

use super::{UseMediaQueryOptions, use_media_query, use_mount_effect};
use crate::component::Cx;
use crate::listener::{Listeners, use_event_listener};
use crate::options::{
    FieldResolver, MaybeObservableOptions, NormalizeOptions, use_maybe_observable_options,
};

/// Options for [`use_window_size`].
#[derive(Clone, Debug)]
pub struct UseWindowSizeOptions {
    /// Width reported before mount, and without a window. Defaults to infinity.
    pub initial_width: MaybeReactive<f64>,
    /// Height reported before mount, and without a window. Defaults to infinity.
    pub initial_height: MaybeReactive<f64>,
    /// Also update when the viewport orientation flips. Defaults to true.
    pub listen_orientation: MaybeReactive<bool>,
    /// Report the size including scrollbars. Defaults to true.
    pub include_scrollbar: MaybeReactive<bool>,
}

impl Default for UseWindowSizeOptions {
    fn default() -> Self {
        Self {
            initial_width: f64::INFINITY.into(),
            initial_height: f64::INFINITY.into(),
            listen_orientation: true.into(),
            include_scrollbar: true.into(),
        }
    }
}

/// Resolved [`UseWindowSizeOptions`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WindowSizeConfig {
    /// See [`UseWindowSizeOptions::initial_width`].
    pub initial_width: f64,
    /// See [`UseWindowSizeOptions::initial_height`].
    pub initial_height: f64,
    /// See [`UseWindowSizeOptions::listen_orientation`].
    pub listen_orientation: bool,
    /// See [`UseWindowSizeOptions::include_scrollbar`].
    pub include_scrollbar: bool,
}

impl Default for WindowSizeConfig {
    fn default() -> Self {
        Self {
            initial_width: f64::INFINITY,
            initial_height: f64::INFINITY,
            listen_orientation: true,
            include_scrollbar: true,
        }
    }
}

impl NormalizeOptions for UseWindowSizeOptions {
    type Output = WindowSizeConfig;

    fn normalize(&self, fields: &FieldResolver) -> WindowSizeConfig {
        WindowSizeConfig {
            initial_width: fields.snapshot("initial_width", &self.initial_width),
            initial_height: fields.snapshot("initial_height", &self.initial_height),
            listen_orientation: fields.track(&self.listen_orientation),
            include_scrollbar: fields.track(&self.include_scrollbar),
        }
    }
}

/// State returned by [`use_window_size`].
#[derive(Clone, Debug)]
pub struct UseWindowSize {
    /// Viewport width.
    pub width: Observable<f64>,
    /// Viewport height.
    pub height: Observable<f64>,
}

impl UseWindowSize {
    /// Both dimensions, tracked.
    pub fn size(&self) -> Size {
        Size::new(self.width.get(), self.height.get())
    }

    fn write(&self, size: Size) {
        batch(|| {
            self.width.set_if_changed(size.width);
            self.height.set_if_changed(size.height);
        });
    }
}

fn measure(doc: &Document, include_scrollbar: bool) -> Size {
    if include_scrollbar {
        doc.inner_size()
    } else {
        doc.client_size()
    }
}

/// Track the viewport size through window `resize` events.
///
/// With `listen_orientation`, an orientation flip reported by
/// `(orientation: portrait)` refreshes the size as well.
pub fn use_window_size(
    cx: &mut Cx<'_>,
    options: impl Into<MaybeObservableOptions<UseWindowSizeOptions>>,
) -> UseWindowSize {
    let config = use_maybe_observable_options(cx, Some(options.into()));
    let state = cx.use_hook(|| {
        let initial = config.with_untracked(|c| c.unwrap_or_default());
        UseWindowSize {
            width: Observable::new(initial.initial_width),
            height: Observable::new(initial.initial_height),
        }
    });
    let media_options = cx.use_hook(|| Rc::new(UseMediaQueryOptions::default()));
    let portrait = use_media_query(
        cx,
        String::from("(orientation: portrait)"),
        (*media_options).clone(),
    );

    use_mount_effect(cx, "use_window_size", {
        let (state, config) = ((*state).clone(), config.clone());
        move |doc| {
            let config = config.with(|c| c.unwrap_or_default());
            if config.listen_orientation {
                portrait.get();
            }
            state.write(measure(doc, config.include_scrollbar));
        }
    });

    let doc = cx.document().cloned();
    use_event_listener(
        cx,
        None,
        "resize",
        Listeners::from_fn({
            let state = (*state).clone();
            move |_| {
                if let Some(doc) = &doc {
                    let include =
                        config.with_untracked(|c| c.unwrap_or_default().include_scrollbar);
                    state.write(measure(doc, include));
                }
            }
        }),
        ListenerOptions::PASSIVE,
    );

    (*state).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, Env};
    use canopy_dom::DocumentConfig;

    fn mount(doc: Option<Document>, options: UseWindowSizeOptions) -> Component<UseWindowSize> {
        let env = doc.map_or_else(Env::headless, Env::new);
        let options = Rc::new(options);
        Component::mount(env, move |cx| use_window_size(cx, options.clone()))
    }

    #[test]
    fn follows_viewport_resizes() {
        let doc = Document::default();
        let c = mount(Some(doc.clone()), UseWindowSizeOptions::default());
        let size = c.output().clone();
        assert_eq!(size.size(), Size::new(1024.0, 768.0));
        doc.set_viewport(Size::new(640.0, 480.0));
        assert_eq!(size.size(), Size::new(640.0, 480.0));
    }

    #[test]
    fn scrollbars_can_be_excluded() {
        let doc = Document::new(DocumentConfig {
            scrollbar_width: 15.0,
            ..DocumentConfig::default()
        });
        let include = Observable::new(false);
        let c = mount(
            Some(doc.clone()),
            UseWindowSizeOptions {
                include_scrollbar: include.clone().into(),
                ..UseWindowSizeOptions::default()
            },
        );
        let size = c.output().clone();
        assert_eq!(size.size(), Size::new(1009.0, 753.0));
        include.set(true);
        assert_eq!(size.size(), Size::new(1024.0, 768.0));
    }

    #[test]
    fn initial_size_without_a_window() {
        let c = mount(
            None,
            UseWindowSizeOptions {
                initial_width: 320.0.into(),
                initial_height: 200.0.into(),
                ..UseWindowSizeOptions::default()
            },
        );
        assert_eq!(c.output().size(), Size::new(320.0, 200.0));

        let c = mount(None, UseWindowSizeOptions::default());
        assert!(c.output().width.get().is_infinite());
    }
}
