// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reactive element size.

use std::cell::Cell;
use std::rc::Rc;

use canopy_dom::{ResizeBox, ResizeObserverEntry};
use canopy_reactive::{Computed, MaybeReactive, Observable};
use kurbo::Size;

use super::{
    MountEffect, UseResizeObserver, UseResizeObserverOptions, use_mount_effect, use_resize_observer,
};
use crate::component::Cx;
use crate::options::{
    FieldResolver, MaybeObservableOptions, NormalizeOptions, use_maybe_observable_options,
};
use crate::target::{MaybeTarget, use_target};

/// Options for [`use_element_size`].
#[derive(Clone, Debug)]
pub struct UseElementSizeOptions {
    /// Size before the first observation, and after the element changes.
    pub initial_size: MaybeReactive<Size>,
    /// Which box to measure.
    pub observed_box: MaybeReactive<ResizeBox>,
}

impl Default for UseElementSizeOptions {
    fn default() -> Self {
        Self {
            initial_size: Size::ZERO.into(),
            observed_box: ResizeBox::ContentBox.into(),
        }
    }
}

/// Resolved [`UseElementSizeOptions`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ElementSizeConfig {
    /// See [`UseElementSizeOptions::initial_size`].
    pub initial_size: Size,
    /// See [`UseElementSizeOptions::observed_box`].
    pub observed_box: ResizeBox,
}

impl NormalizeOptions for UseElementSizeOptions {
    type Output = ElementSizeConfig;

    fn normalize(&self, fields: &FieldResolver) -> ElementSizeConfig {
        ElementSizeConfig {
            initial_size: fields.snapshot("initial_size", &self.initial_size),
            observed_box: fields.track(&self.observed_box),
        }
    }
}

/// State returned by [`use_element_size`].
#[derive(Clone, Debug)]
pub struct UseElementSize {
    /// Width of the observed box.
    pub width: Observable<f64>,
    /// Height of the observed box.
    pub height: Observable<f64>,
    watch: MountEffect,
    observer: UseResizeObserver,
}

impl UseElementSize {
    /// Stop observing and stop following element changes.
    pub fn stop(&self) {
        self.observer.stop();
        self.watch.dispose();
    }
}

/// Track the size of the first element of `target`.
///
/// On mount the size is the element's border box; afterwards it follows the
/// configured box. When the target changes to another element the size
/// resets to the initial size (or to zero if there is no element) until the
/// next observation.
pub fn use_element_size(
    cx: &mut Cx<'_>,
    target: MaybeTarget,
    options: impl Into<MaybeObservableOptions<UseElementSizeOptions>>,
) -> UseElementSize {
    let config = use_maybe_observable_options(cx, Some(options.into()));
    let initial = config.with_untracked(|c| c.unwrap_or_default().initial_size);
    let size = cx.use_hook(|| (Observable::new(initial.width), Observable::new(initial.height)));
    let (width, height) = (size.0.clone(), size.1.clone());

    let observe_options = cx.use_hook(|| {
        Rc::new(UseResizeObserverOptions {
            observed_box: {
                let config = config.clone();
                Computed::new(move || {
                    config.with(|c| c.unwrap_or_default().observed_box)
                })
                .into()
            },
            ..UseResizeObserverOptions::default()
        })
    });
    let observer = use_resize_observer(
        cx,
        target.clone(),
        {
            let (width, height, config) = (width.clone(), height.clone(), config.clone());
            move |entries: &[ResizeObserverEntry]| {
                let Some(entry) = entries.last() else {
                    return;
                };
                let observed_box = config.with_untracked(|c| c.unwrap_or_default().observed_box);
                let measured = entry.size(observed_box);
                width.set_if_changed(measured.width);
                height.set_if_changed(measured.height);
            }
        },
        MaybeObservableOptions::Fields((*observe_options).clone()),
    );

    let target = use_target(cx, target);
    let watch = use_mount_effect(cx, "use_element_size", {
        let (width, height) = (width.clone(), height.clone());
        let first = Cell::new(true);
        move |doc| {
            let element = target.with(MaybeTarget::first_element);
            if first.replace(false) {
                let border = element.and_then(|e| doc.box_size(e, ResizeBox::BorderBox).ok());
                if let Some(measured) = border {
                    width.set_if_changed(measured.width);
                    height.set_if_changed(measured.height);
                }
                return;
            }
            let reset = if element.is_some() { initial } else { Size::ZERO };
            width.set_if_changed(reset.width);
            height.set_if_changed(reset.height);
        }
    });

    UseElementSize {
        width,
        height,
        watch,
        observer,
    }
}
