// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drop target tracking.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use canopy_dom::{DataTransfer, DropEffect, Event, FileInfo, ListenerOptions};
use canopy_reactive::{MaybeReactive, Observable, Opaque};

use crate::component::Cx;
use crate::listener::{Listeners, use_event_listener};
use crate::options::{
    FieldResolver, MaybeObservableOptions, NormalizeOptions, use_maybe_observable_options,
};
use crate::target::MaybeTarget;

/// Called with the dropped files (only for `drop`) and the event.
pub type DropCallback = Rc<dyn Fn(Option<&[FileInfo]>, &Event)>;

/// Which drag payloads the zone accepts.
#[derive(Clone, Default)]
pub enum DataTypes {
    /// Everything.
    #[default]
    Any,
    /// Every item type must contain one of these strings. A drag with no
    /// items is rejected.
    Mime(Vec<String>),
    /// Decides from the list of item types.
    Predicate(Rc<dyn Fn(&[String]) -> bool>),
}

impl DataTypes {
    fn accepts(&self, types: &[String]) -> bool {
        match self {
            Self::Any => true,
            Self::Mime(allowed) if allowed.is_empty() => true,
            Self::Mime(_) if types.is_empty() => false,
            Self::Mime(allowed) => types
                .iter()
                .all(|ty| allowed.iter().any(|a| ty.contains(a.as_str()))),
            Self::Predicate(f) => f(types),
        }
    }
}

impl PartialEq for DataTypes {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Any, Self::Any) => true,
            (Self::Mime(a), Self::Mime(b)) => a == b,
            (Self::Predicate(a), Self::Predicate(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for DataTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Mime(types) => f.debug_tuple("Mime").field(types).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl<const N: usize> From<[&str; N]> for DataTypes {
    fn from(types: [&str; N]) -> Self {
        Self::Mime(types.iter().map(|t| String::from(*t)).collect())
    }
}

/// Options for [`use_drop_zone`].
#[derive(Clone)]
pub struct UseDropZoneOptions {
    /// Accepted payloads.
    pub data_types: MaybeReactive<DataTypes>,
    /// Accept more than one item. Defaults to true.
    pub multiple: MaybeReactive<bool>,
    /// Cancel every drag event, even ones the zone rejects.
    pub prevent_default_for_unhandled: MaybeReactive<bool>,
    /// Accepted `dragenter`.
    pub on_enter: MaybeReactive<Option<DropCallback>>,
    /// Accepted `dragover`.
    pub on_over: MaybeReactive<Option<DropCallback>>,
    /// Accepted `dragleave`.
    pub on_leave: MaybeReactive<Option<DropCallback>>,
    /// Accepted `drop`, with the files.
    pub on_drop: MaybeReactive<Option<DropCallback>>,
}

impl Default for UseDropZoneOptions {
    fn default() -> Self {
        Self {
            data_types: MaybeReactive::default(),
            multiple: true.into(),
            prevent_default_for_unhandled: false.into(),
            on_enter: MaybeReactive::default(),
            on_over: MaybeReactive::default(),
            on_leave: MaybeReactive::default(),
            on_drop: MaybeReactive::default(),
        }
    }
}

impl fmt::Debug for UseDropZoneOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UseDropZoneOptions")
            .field("data_types", &self.data_types)
            .field("multiple", &self.multiple)
            .field(
                "prevent_default_for_unhandled",
                &self.prevent_default_for_unhandled,
            )
            .finish_non_exhaustive()
    }
}

/// Resolved [`UseDropZoneOptions`].
#[derive(Clone, Debug, PartialEq)]
pub struct DropZoneConfig {
    /// See [`UseDropZoneOptions::data_types`].
    pub data_types: DataTypes,
    /// See [`UseDropZoneOptions::multiple`].
    pub multiple: bool,
    /// See [`UseDropZoneOptions::prevent_default_for_unhandled`].
    pub prevent_default_for_unhandled: bool,
    /// See [`UseDropZoneOptions::on_enter`].
    pub on_enter: Option<Opaque<dyn Fn(Option<&[FileInfo]>, &Event)>>,
    /// See [`UseDropZoneOptions::on_over`].
    pub on_over: Option<Opaque<dyn Fn(Option<&[FileInfo]>, &Event)>>,
    /// See [`UseDropZoneOptions::on_leave`].
    pub on_leave: Option<Opaque<dyn Fn(Option<&[FileInfo]>, &Event)>>,
    /// See [`UseDropZoneOptions::on_drop`].
    pub on_drop: Option<Opaque<dyn Fn(Option<&[FileInfo]>, &Event)>>,
}

impl NormalizeOptions for UseDropZoneOptions {
    type Output = DropZoneConfig;

    fn normalize(&self, fields: &FieldResolver) -> DropZoneConfig {
        DropZoneConfig {
            data_types: fields.track(&self.data_types),
            multiple: fields.track(&self.multiple),
            prevent_default_for_unhandled: fields.track(&self.prevent_default_for_unhandled),
            on_enter: fields.track_opaque(&self.on_enter),
            on_over: fields.track_opaque(&self.on_over),
            on_leave: fields.track_opaque(&self.on_leave),
            on_drop: fields.track_opaque(&self.on_drop),
        }
    }
}

/// State returned by [`use_drop_zone`].
#[derive(Clone, Debug)]
pub struct UseDropZone {
    /// Files from the last accepted drop.
    pub files: Observable<Option<Vec<FileInfo>>>,
    /// True while an accepted drag is over the zone or one of its descendants.
    pub is_over_drop_zone: Observable<bool>,
}

struct ZoneSlot {
    state: UseDropZone,
    // Enter/leave pairs from nested elements cancel out.
    counter: Cell<u32>,
}

#[derive(Copy, Clone)]
enum Phase {
    Enter,
    Over,
    Leave,
    Drop,
}

/// Track drags over `target` and collect dropped files.
pub fn use_drop_zone(
    cx: &mut Cx<'_>,
    target: MaybeTarget,
    options: impl Into<MaybeObservableOptions<UseDropZoneOptions>>,
) -> UseDropZone {
    let config = use_maybe_observable_options(cx, Some(options.into()));
    let slot = cx.use_hook(|| ZoneSlot {
        state: UseDropZone {
            files: Observable::new(None),
            is_over_drop_zone: Observable::new(false),
        },
        counter: Cell::new(0),
    });

    let handler = |phase: Phase| {
        let (slot, config) = (slot.clone(), config.clone());
        Listeners::from_fn(move |e: &Event| {
            if let Some(config) = config.peek() {
                handle(&slot, &config, phase, e);
            }
        })
    };
    let phases = [
        ("dragenter", Phase::Enter),
        ("dragover", Phase::Over),
        ("dragleave", Phase::Leave),
        ("drop", Phase::Drop),
    ];
    for (name, phase) in phases {
        use_event_listener(
            cx,
            Some(target.clone()),
            name,
            handler(phase),
            ListenerOptions::default(),
        );
    }
    slot.state.clone()
}

fn is_valid(config: &DropZoneConfig, transfer: &DataTransfer) -> bool {
    let types = transfer.types();
    config.data_types.accepts(&types) && (config.multiple || transfer.items.len() <= 1)
}

fn handle(slot: &ZoneSlot, config: &DropZoneConfig, phase: Phase, e: &Event) {
    let transfer = e.data_transfer();
    let valid = transfer.is_some_and(|t| is_valid(config, t));
    if config.prevent_default_for_unhandled {
        e.prevent_default();
    }
    let Some(transfer) = transfer.filter(|_| valid) else {
        if let Some(transfer) = transfer {
            transfer.set_drop_effect(DropEffect::None);
        }
        tracing::trace!(event = e.event_type(), "drag payload rejected");
        return;
    };
    e.prevent_default();
    transfer.set_drop_effect(DropEffect::Copy);

    let state = &slot.state;
    let callback = match phase {
        Phase::Enter => {
            slot.counter.set(slot.counter.get() + 1);
            state.is_over_drop_zone.set_if_changed(true);
            &config.on_enter
        }
        Phase::Over => &config.on_over,
        Phase::Leave => {
            let remaining = slot.counter.get().saturating_sub(1);
            slot.counter.set(remaining);
            if remaining == 0 {
                state.is_over_drop_zone.set_if_changed(false);
            }
            &config.on_leave
        }
        Phase::Drop => {
            slot.counter.set(0);
            state.is_over_drop_zone.set_if_changed(false);
            let files = if config.multiple {
                transfer.files.clone()
            } else {
                transfer.files.iter().take(1).cloned().collect()
            };
            tracing::debug!(files = files.len(), "files dropped");
            state.files.set(Some(files.clone()));
            if let Some(on_drop) = &config.on_drop {
                on_drop(Some(files.as_slice()), e);
            }
            return;
        }
    };
    if let Some(callback) = callback {
        callback(None, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, Env};
    use canopy_dom::{Document, DragAction, LocalElement, NodeId};
    use kurbo::{Point, Rect};

    fn file(name: &str, mime: &str) -> FileInfo {
        FileInfo {
            name: name.into(),
            mime: mime.into(),
            size: 1,
        }
    }

    fn zone_with_child(doc: &Document) -> (NodeId, NodeId) {
        let zone = doc
            .insert(None, LocalElement::new("zone", Rect::new(0.0, 0.0, 100.0, 100.0)))
            .unwrap();
        let child = doc
            .insert(Some(zone), LocalElement::new("child", Rect::new(10.0, 10.0, 40.0, 40.0)))
            .unwrap();
        (zone, child)
    }

    fn mount(doc: &Document, zone: NodeId, options: UseDropZoneOptions) -> Component<UseDropZone> {
        let options = Rc::new(options);
        Component::mount(Env::new(doc.clone()), move |cx| {
            use_drop_zone(cx, zone.into(), MaybeObservableOptions::Fields(options.clone()))
        })
    }

    #[test]
    fn nested_enter_leave_pairs_keep_the_zone_active() {
        let doc = Document::default();
        let (zone, _child) = zone_with_child(&doc);
        let c = mount(&doc, zone, UseDropZoneOptions::default());
        let state = c.output().clone();
        let payload = Rc::new(DataTransfer::with_files(vec![file("a.png", "image/png")]));

        doc.drag(DragAction::Enter, Point::new(80.0, 80.0), Some(payload.clone()));
        doc.drag(DragAction::Enter, Point::new(20.0, 20.0), Some(payload.clone()));
        doc.drag(DragAction::Leave, Point::new(80.0, 80.0), Some(payload.clone()));
        assert!(state.is_over_drop_zone.get());
        doc.drag(DragAction::Leave, Point::new(200.0, 200.0), Some(payload.clone()));
        // The last leave lands outside the zone and never reaches its listener.
        assert!(state.is_over_drop_zone.get());

        assert!(!doc.drag(DragAction::Drop, Point::new(20.0, 20.0), Some(payload.clone())));
        assert!(!state.is_over_drop_zone.get());
        assert_eq!(state.files.get(), Some(vec![file("a.png", "image/png")]));
        assert_eq!(payload.drop_effect(), DropEffect::Copy);
    }

    #[test]
    fn rejected_types_set_no_drop_effect() {
        let doc = Document::default();
        let (zone, _) = zone_with_child(&doc);
        let c = mount(
            &doc,
            zone,
            UseDropZoneOptions {
                data_types: DataTypes::from(["image/"]).into(),
                ..UseDropZoneOptions::default()
            },
        );
        let state = c.output().clone();
        let text = Rc::new(DataTransfer::with_files(vec![file("a.txt", "text/plain")]));
        assert!(doc.drag(DragAction::Enter, Point::new(50.0, 50.0), Some(text.clone())));
        assert!(!state.is_over_drop_zone.get());
        assert_eq!(text.drop_effect(), DropEffect::None);
        doc.drag(DragAction::Drop, Point::new(50.0, 50.0), Some(text));
        assert_eq!(state.files.get(), None);

        // No items at all is rejected when a list is configured.
        let empty = Rc::new(DataTransfer::default());
        assert!(doc.drag(DragAction::Enter, Point::new(50.0, 50.0), Some(empty)));
        assert!(!state.is_over_drop_zone.get());
    }

    #[test]
    fn single_file_zones_reject_multiple_items() {
        let doc = Document::default();
        let (zone, _) = zone_with_child(&doc);
        let dropped = Rc::new(Cell::new(0));
        let on_drop: DropCallback = {
            let dropped = dropped.clone();
            Rc::new(move |files: Option<&[FileInfo]>, _: &Event| {
                dropped.set(files.map_or(0, <[FileInfo]>::len));
            })
        };
        let c = mount(
            &doc,
            zone,
            UseDropZoneOptions {
                multiple: false.into(),
                on_drop: Some(on_drop).into(),
                ..UseDropZoneOptions::default()
            },
        );
        let two = Rc::new(DataTransfer::with_files(vec![
            file("a.png", "image/png"),
            file("b.png", "image/png"),
        ]));
        doc.drag(DragAction::Drop, Point::new(50.0, 50.0), Some(two));
        assert_eq!(c.output().files.get(), None);

        let one = Rc::new(DataTransfer::with_files(vec![file("a.png", "image/png")]));
        doc.drag(DragAction::Drop, Point::new(50.0, 50.0), Some(one));
        assert_eq!(dropped.get(), 1);
    }

    #[test]
    fn predicates_and_unhandled_prevention() {
        let doc = Document::default();
        let (zone, _) = zone_with_child(&doc);
        let only_pdf: Rc<dyn Fn(&[String]) -> bool> =
            Rc::new(|types: &[String]| types.iter().all(|t| t == "application/pdf"));
        let c = mount(
            &doc,
            zone,
            UseDropZoneOptions {
                data_types: DataTypes::Predicate(only_pdf).into(),
                prevent_default_for_unhandled: true.into(),
                ..UseDropZoneOptions::default()
            },
        );
        let png = Rc::new(DataTransfer::with_files(vec![file("a.png", "image/png")]));
        // Rejected, but still canceled.
        assert!(!doc.drag(DragAction::Over, Point::new(50.0, 50.0), Some(png)));
        let pdf = Rc::new(DataTransfer::with_files(vec![file("a.pdf", "application/pdf")]));
        doc.drag(DragAction::Enter, Point::new(50.0, 50.0), Some(pdf));
        assert!(c.output().is_over_drop_zone.get());
    }
}
