// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resize, intersection and mutation observers.
//!
//! Observers are created through the [`Document`](crate::Document) and
//! delivered to during [`Document::flush`](crate::Document::flush):
//!
//! - mutation records queue up as the tree changes and are delivered first;
//! - resize entries are delivered for targets whose observed box size differs
//!   from the last size reported to that observer;
//! - intersection entries are delivered when a target crosses a threshold or
//!   starts or stops intersecting its root.
//!
//! The first flush after `observe` always delivers an entry for the new target.
//! Removed elements are dropped from every observer without a final entry.
//!
//! Dropping an observer handle disconnects it.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Insets, Rect, Size, Vec2};

use crate::document::WeakDocument;
use crate::error::DomError;
use crate::tree::{MutationKind, MutationRecord, Tree};
use crate::types::{LocalElement, NodeFlags, NodeId};

/// Callback of a [`ResizeObserver`].
pub type ResizeCallback = Rc<dyn Fn(&[ResizeObserverEntry])>;
/// Callback of an [`IntersectionObserver`].
pub type IntersectionCallback = Rc<dyn Fn(&[IntersectionObserverEntry])>;
/// Callback of a [`MutationObserver`].
pub type MutationCallback = Rc<dyn Fn(&[MutationRecord])>;

/// Which box a [`ResizeObserver`] watches.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum ResizeBox {
    /// The content box (border box minus padding and border).
    #[default]
    ContentBox,
    /// The border box.
    BorderBox,
    /// The content box in device pixels.
    DevicePixelContentBox,
}

/// A size change reported by a [`ResizeObserver`].
#[derive(Clone, Debug, PartialEq)]
pub struct ResizeObserverEntry {
    /// The observed element.
    pub target: NodeId,
    /// Content box, positioned relative to the border box origin.
    pub content_rect: Rect,
    /// Content box size.
    pub content_box_size: Size,
    /// Border box size.
    pub border_box_size: Size,
    /// Content box size in device pixels.
    pub device_pixel_content_box_size: Size,
}

impl ResizeObserverEntry {
    /// Size of the requested box.
    pub fn size(&self, observed_box: ResizeBox) -> Size {
        match observed_box {
            ResizeBox::ContentBox => self.content_box_size,
            ResizeBox::BorderBox => self.border_box_size,
            ResizeBox::DevicePixelContentBox => self.device_pixel_content_box_size,
        }
    }
}

/// Compute the resize entry describing `local` right now.
pub(crate) fn resize_entry(target: NodeId, local: &LocalElement, dpr: f64) -> ResizeObserverEntry {
    let border = local.local_bounds.size();
    let i = local.content_insets;
    let content = Size::new(
        (border.width - i.x0 - i.x1).max(0.0),
        (border.height - i.y0 - i.y1).max(0.0),
    );
    ResizeObserverEntry {
        target,
        content_rect: Rect::new(i.x0, i.y0, i.x0 + content.width, i.y0 + content.height),
        content_box_size: content,
        border_box_size: border,
        device_pixel_content_box_size: Size::new(content.width * dpr, content.height * dpr),
    }
}

#[derive(Debug)]
struct ResizeTarget {
    node: NodeId,
    observed_box: ResizeBox,
    last: Option<Size>,
}

pub(crate) struct ResizeRegistration {
    pub(crate) callback: ResizeCallback,
    targets: Vec<ResizeTarget>,
}

impl ResizeRegistration {
    pub(crate) fn new(callback: ResizeCallback) -> Self {
        Self {
            callback,
            targets: Vec::new(),
        }
    }

    /// Entries for targets whose observed size changed since the last delivery.
    pub(crate) fn gather(&mut self, tree: &Tree, dpr: f64) -> Vec<ResizeObserverEntry> {
        self.targets.retain(|t| tree.is_alive(t.node));
        let mut out = Vec::new();
        for t in &mut self.targets {
            let Some(local) = tree.local(t.node) else {
                continue;
            };
            let entry = resize_entry(t.node, local, dpr);
            let size = entry.size(t.observed_box);
            if t.last != Some(size) {
                t.last = Some(size);
                out.push(entry);
            }
        }
        out
    }

    pub(crate) fn forget(&mut self, removed: &[NodeId]) {
        self.targets.retain(|t| !removed.contains(&t.node));
    }
}

/// Options of an [`IntersectionObserver`].
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionObserverInit {
    /// Element whose border box is the root; `None` uses the viewport.
    pub root: Option<NodeId>,
    /// Growth of the root rectangle on each side. Negative values shrink it.
    pub root_margin: Insets,
    /// Ratios at which entries are delivered.
    pub thresholds: Vec<f64>,
}

impl Default for IntersectionObserverInit {
    fn default() -> Self {
        Self {
            root: None,
            root_margin: Insets::ZERO,
            thresholds: alloc::vec![0.0],
        }
    }
}

/// An intersection change reported by an [`IntersectionObserver`].
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionObserverEntry {
    /// The observed element.
    pub target: NodeId,
    /// Frame time of the observation, in milliseconds.
    pub time: f64,
    /// Whether the target touches the root.
    pub is_intersecting: bool,
    /// Visible fraction of the target's area.
    pub intersection_ratio: f64,
    /// Target rectangle in viewport coordinates.
    pub bounding_client_rect: Rect,
    /// Visible part of the target, or zero when not intersecting.
    pub intersection_rect: Rect,
    /// Root rectangle after applying the root margin.
    pub root_bounds: Rect,
}

#[derive(Debug)]
struct IntersectionTarget {
    node: NodeId,
    last: Option<(usize, bool)>,
}

pub(crate) struct IntersectionRegistration {
    pub(crate) callback: IntersectionCallback,
    root: Option<NodeId>,
    root_margin: Insets,
    thresholds: Vec<f64>,
    targets: Vec<IntersectionTarget>,
}

impl IntersectionRegistration {
    pub(crate) fn new(callback: IntersectionCallback, init: IntersectionObserverInit) -> Self {
        let mut thresholds: Vec<f64> = init
            .thresholds
            .into_iter()
            .map(|t| t.clamp(0.0, 1.0))
            .collect();
        thresholds.sort_by(f64::total_cmp);
        thresholds.dedup();
        if thresholds.is_empty() {
            thresholds.push(0.0);
        }
        Self {
            callback,
            root: init.root,
            root_margin: init.root_margin,
            thresholds,
            targets: Vec::new(),
        }
    }

    /// Entries for targets that crossed a threshold since the last delivery.
    ///
    /// `viewport` is the implicit root in client coordinates; `scroll` maps
    /// world coordinates to client coordinates.
    pub(crate) fn gather(
        &mut self,
        tree: &Tree,
        viewport: Rect,
        scroll: Vec2,
        time: f64,
    ) -> Vec<IntersectionObserverEntry> {
        self.targets.retain(|t| tree.is_alive(t.node));
        let root = match self.root {
            Some(r) => tree.world_bounds(r).map(|b| b - scroll),
            None => Some(viewport),
        };
        let m = self.root_margin;
        let root_bounds = root
            .map(|r| Rect::new(r.x0 - m.x0, r.y0 - m.y0, r.x1 + m.x1, r.y1 + m.y1))
            .unwrap_or(Rect::ZERO);

        let mut out = Vec::new();
        for t in &mut self.targets {
            let Some(world) = tree.world_bounds(t.node) else {
                continue;
            };
            let client = world - scroll;
            let in_root = match self.root {
                Some(r) => root.is_some() && r != t.node && tree.contains(r, t.node),
                None => true,
            };
            let overlap = if in_root && rendered(tree, t.node) {
                intersect(client, root_bounds)
            } else {
                None
            };
            let (is_intersecting, intersection_rect) = match overlap {
                Some(r) => (true, r),
                None => (false, Rect::ZERO),
            };
            let target_area = client.area();
            let ratio = if target_area > 0.0 {
                (intersection_rect.area() / target_area).clamp(0.0, 1.0)
            } else if is_intersecting {
                1.0
            } else {
                0.0
            };
            let index = self.thresholds.partition_point(|&th| th <= ratio);
            let state = (index, is_intersecting);
            if t.last == Some(state) {
                continue;
            }
            t.last = Some(state);
            out.push(IntersectionObserverEntry {
                target: t.node,
                time,
                is_intersecting,
                intersection_ratio: ratio,
                bounding_client_rect: client,
                intersection_rect,
                root_bounds,
            });
        }
        out
    }

    pub(crate) fn forget(&mut self, removed: &[NodeId]) {
        self.targets.retain(|t| !removed.contains(&t.node));
    }
}

/// Edge-adjacent rectangles count as intersecting.
fn intersect(a: Rect, b: Rect) -> Option<Rect> {
    let r = Rect::new(a.x0.max(b.x0), a.y0.max(b.y0), a.x1.min(b.x1), a.y1.min(b.y1));
    (r.x0 <= r.x1 && r.y0 <= r.y1).then_some(r)
}

/// An element is rendered when it and all its ancestors are visible.
fn rendered(tree: &Tree, id: NodeId) -> bool {
    tree.path_to_root(id).into_iter().all(|n| {
        tree.local(n)
            .is_some_and(|l| l.flags.contains(NodeFlags::VISIBLE))
    })
}

/// What a [`MutationObserver`] reports for one target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutationObserverInit {
    /// Report children being added or removed.
    pub child_list: bool,
    /// Report attribute changes.
    pub attributes: bool,
    /// Extend observation to all descendants of the target.
    pub subtree: bool,
    /// Only report these attributes. Implies `attributes`.
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    fn observes_attributes(&self) -> bool {
        self.attributes || self.attribute_filter.is_some()
    }

    fn wants(&self, observed: NodeId, record: &MutationRecord, tree: &Tree) -> bool {
        let in_scope =
            record.target == observed || (self.subtree && tree.contains(observed, record.target));
        if !in_scope {
            return false;
        }
        match &record.kind {
            MutationKind::ChildList { .. } => self.child_list,
            MutationKind::Attributes { name, .. } => {
                self.observes_attributes()
                    && self
                        .attribute_filter
                        .as_ref()
                        .is_none_or(|f| f.iter().any(|n| n == name))
            }
        }
    }
}

pub(crate) struct MutationRegistration {
    pub(crate) callback: MutationCallback,
    targets: Vec<(NodeId, MutationObserverInit)>,
    pub(crate) pending: Vec<MutationRecord>,
}

impl MutationRegistration {
    pub(crate) fn new(callback: MutationCallback) -> Self {
        Self {
            callback,
            targets: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Queue `record` if any observed target is interested in it.
    pub(crate) fn route(&mut self, tree: &Tree, record: &MutationRecord) {
        if self
            .targets
            .iter()
            .any(|(node, init)| init.wants(*node, record, tree))
        {
            self.pending.push(record.clone());
        }
    }

    pub(crate) fn forget(&mut self, removed: &[NodeId]) {
        self.targets.retain(|(node, _)| !removed.contains(node));
    }
}

/// Reports size changes of observed elements.
///
/// Created by [`Document::resize_observer`](crate::Document::resize_observer).
pub struct ResizeObserver {
    doc: WeakDocument,
    id: u64,
}

impl core::fmt::Debug for ResizeObserver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResizeObserver").field("id", &self.id).finish()
    }
}

impl ResizeObserver {
    pub(crate) fn new(doc: WeakDocument, id: u64) -> Self {
        Self { doc, id }
    }

    /// Start observing `target`. Observing it again switches the observed box.
    pub fn observe(&self, target: NodeId, observed_box: ResizeBox) -> Result<(), DomError> {
        let Some(doc) = self.doc.upgrade() else {
            return Ok(());
        };
        let mut guard = doc.state.borrow_mut();
        let st = &mut *guard;
        if !st.tree.is_alive(target) {
            return Err(DomError::StaleNode(target));
        }
        if let Some(reg) = st.resize.get_mut(&self.id) {
            match reg.targets.iter_mut().find(|t| t.node == target) {
                Some(t) => {
                    t.observed_box = observed_box;
                    t.last = None;
                }
                None => reg.targets.push(ResizeTarget {
                    node: target,
                    observed_box,
                    last: None,
                }),
            }
        }
        Ok(())
    }

    /// Stop observing `target`.
    pub fn unobserve(&self, target: NodeId) {
        if let Some(doc) = self.doc.upgrade()
            && let Some(reg) = doc.state.borrow_mut().resize.get_mut(&self.id)
        {
            reg.targets.retain(|t| t.node != target);
        }
    }

    /// Stop observing every target. The observer can be reused.
    pub fn disconnect(&self) {
        if let Some(doc) = self.doc.upgrade()
            && let Some(reg) = doc.state.borrow_mut().resize.get_mut(&self.id)
        {
            reg.targets.clear();
        }
    }
}

impl Drop for ResizeObserver {
    fn drop(&mut self) {
        let Some(doc) = self.doc.upgrade() else {
            return;
        };
        let removed = match doc.state.try_borrow_mut() {
            Ok(mut st) => st.resize.remove(&self.id),
            Err(_) => None,
        };
        drop(removed);
    }
}

/// Reports when observed elements enter or leave a root rectangle.
///
/// Created by [`Document::intersection_observer`](crate::Document::intersection_observer).
pub struct IntersectionObserver {
    doc: WeakDocument,
    id: u64,
}

impl core::fmt::Debug for IntersectionObserver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IntersectionObserver")
            .field("id", &self.id)
            .finish()
    }
}

impl IntersectionObserver {
    pub(crate) fn new(doc: WeakDocument, id: u64) -> Self {
        Self { doc, id }
    }

    /// Start observing `target`.
    pub fn observe(&self, target: NodeId) -> Result<(), DomError> {
        let Some(doc) = self.doc.upgrade() else {
            return Ok(());
        };
        let mut guard = doc.state.borrow_mut();
        let st = &mut *guard;
        if !st.tree.is_alive(target) {
            return Err(DomError::StaleNode(target));
        }
        if let Some(reg) = st.intersection.get_mut(&self.id)
            && !reg.targets.iter().any(|t| t.node == target)
        {
            reg.targets.push(IntersectionTarget {
                node: target,
                last: None,
            });
        }
        Ok(())
    }

    /// Stop observing `target`.
    pub fn unobserve(&self, target: NodeId) {
        if let Some(doc) = self.doc.upgrade()
            && let Some(reg) = doc.state.borrow_mut().intersection.get_mut(&self.id)
        {
            reg.targets.retain(|t| t.node != target);
        }
    }

    /// Stop observing every target.
    pub fn disconnect(&self) {
        if let Some(doc) = self.doc.upgrade()
            && let Some(reg) = doc.state.borrow_mut().intersection.get_mut(&self.id)
        {
            reg.targets.clear();
        }
    }
}

impl Drop for IntersectionObserver {
    fn drop(&mut self) {
        let Some(doc) = self.doc.upgrade() else {
            return;
        };
        let removed = match doc.state.try_borrow_mut() {
            Ok(mut st) => st.intersection.remove(&self.id),
            Err(_) => None,
        };
        drop(removed);
    }
}

/// Reports tree and attribute changes.
///
/// Created by [`Document::mutation_observer`](crate::Document::mutation_observer).
pub struct MutationObserver {
    doc: WeakDocument,
    id: u64,
}

impl core::fmt::Debug for MutationObserver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MutationObserver")
            .field("id", &self.id)
            .finish()
    }
}

impl MutationObserver {
    pub(crate) fn new(doc: WeakDocument, id: u64) -> Self {
        Self { doc, id }
    }

    /// Start observing `target`. Observing it again replaces `init`.
    ///
    /// Fails with [`DomError::InvalidObserverInit`] when `init` requests
    /// neither child list nor attribute records.
    pub fn observe(&self, target: NodeId, init: MutationObserverInit) -> Result<(), DomError> {
        if !init.child_list && !init.observes_attributes() {
            return Err(DomError::InvalidObserverInit);
        }
        let Some(doc) = self.doc.upgrade() else {
            return Ok(());
        };
        let mut guard = doc.state.borrow_mut();
        let st = &mut *guard;
        if !st.tree.is_alive(target) {
            return Err(DomError::StaleNode(target));
        }
        if let Some(reg) = st.mutation.get_mut(&self.id) {
            match reg.targets.iter_mut().find(|(n, _)| *n == target) {
                Some((_, existing)) => *existing = init,
                None => reg.targets.push((target, init)),
            }
        }
        Ok(())
    }

    /// Drain records queued but not yet delivered.
    pub fn take_records(&self) -> Vec<MutationRecord> {
        let Some(doc) = self.doc.upgrade() else {
            return Vec::new();
        };
        doc.state
            .borrow_mut()
            .mutation
            .get_mut(&self.id)
            .map(|reg| core::mem::take(&mut reg.pending))
            .unwrap_or_default()
    }

    /// Stop observing every target and discard queued records.
    pub fn disconnect(&self) {
        if let Some(doc) = self.doc.upgrade()
            && let Some(reg) = doc.state.borrow_mut().mutation.get_mut(&self.id)
        {
            reg.targets.clear();
            reg.pending.clear();
        }
    }
}

impl Drop for MutationObserver {
    fn drop(&mut self) {
        let Some(doc) = self.doc.upgrade() else {
            return;
        };
        let removed = match doc.state.try_borrow_mut() {
            Ok(mut st) => st.mutation.remove(&self.id),
            Err(_) => None,
        };
        drop(removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LocalElement;
    use alloc::vec;

    fn noop_resize() -> ResizeCallback {
        Rc::new(|_: &[ResizeObserverEntry]| {})
    }

    #[test]
    fn content_box_subtracts_insets() {
        let mut local = LocalElement::new("div", Rect::new(0.0, 0.0, 100.0, 50.0));
        local.content_insets = Insets::new(10.0, 5.0, 10.0, 5.0);
        let e = resize_entry(NodeId::new(0, 1), &local, 2.0);
        assert_eq!(e.border_box_size, Size::new(100.0, 50.0));
        assert_eq!(e.content_box_size, Size::new(80.0, 40.0));
        assert_eq!(e.content_rect, Rect::new(10.0, 5.0, 90.0, 45.0));
        assert_eq!(e.device_pixel_content_box_size, Size::new(160.0, 80.0));
    }

    #[test]
    fn resize_reports_first_then_only_changes() {
        let mut tree = Tree::new();
        let a = tree
            .insert(None, LocalElement::new("div", Rect::new(0.0, 0.0, 10.0, 10.0)))
            .unwrap();
        let mut reg = ResizeRegistration::new(noop_resize());
        reg.targets.push(ResizeTarget {
            node: a,
            observed_box: ResizeBox::BorderBox,
            last: None,
        });
        assert_eq!(reg.gather(&tree, 1.0).len(), 1);
        assert!(reg.gather(&tree, 1.0).is_empty());
        // Moving without resizing is not a resize.
        tree.set_local_bounds(a, Rect::new(5.0, 5.0, 15.0, 15.0)).unwrap();
        assert!(reg.gather(&tree, 1.0).is_empty());
        tree.set_local_bounds(a, Rect::new(0.0, 0.0, 20.0, 10.0)).unwrap();
        let entries = reg.gather(&tree, 1.0);
        assert_eq!(entries[0].border_box_size, Size::new(20.0, 10.0));
        tree.remove(a).unwrap();
        assert!(reg.gather(&tree, 1.0).is_empty());
        assert!(reg.targets.is_empty());
    }

    #[test]
    fn intersection_crosses_thresholds() {
        let mut tree = Tree::new();
        let a = tree
            .insert(None, LocalElement::new("div", Rect::new(0.0, 0.0, 100.0, 100.0)))
            .unwrap();
        tree.commit();
        let init = IntersectionObserverInit {
            thresholds: vec![0.5, 0.0],
            ..Default::default()
        };
        let mut reg = IntersectionRegistration::new(Rc::new(|_: &[_]| {}), init);
        assert_eq!(reg.thresholds, [0.0, 0.5]);
        reg.targets.push(IntersectionTarget { node: a, last: None });
        let viewport = Rect::new(0.0, 0.0, 200.0, 200.0);

        let e = reg.gather(&tree, viewport, Vec2::ZERO, 0.0);
        assert_eq!(e.len(), 1);
        assert!(e[0].is_intersecting);
        assert_eq!(e[0].intersection_ratio, 1.0);

        // Scrolled so that 30% remains visible: below the 0.5 threshold.
        let e = reg.gather(&tree, viewport, Vec2::new(0.0, 70.0), 16.0);
        assert_eq!(e.len(), 1);
        let ratio = e[0].intersection_ratio;
        assert!(ratio > 0.299 && ratio < 0.301, "{ratio}");
        assert_eq!(e[0].time, 16.0);

        // Still between thresholds: nothing new.
        assert!(reg.gather(&tree, viewport, Vec2::new(0.0, 80.0), 32.0).is_empty());

        let e = reg.gather(&tree, viewport, Vec2::new(0.0, 500.0), 48.0);
        assert!(!e[0].is_intersecting);
        assert_eq!(e[0].intersection_rect, Rect::ZERO);
    }

    #[test]
    fn hidden_ancestors_hide_descendants() {
        let mut tree = Tree::new();
        let parent = tree
            .insert(None, LocalElement::new("div", Rect::new(0.0, 0.0, 50.0, 50.0)))
            .unwrap();
        let child = tree
            .insert(Some(parent), LocalElement::new("div", Rect::new(0.0, 0.0, 10.0, 10.0)))
            .unwrap();
        tree.set_flags(parent, NodeFlags::PICKABLE).unwrap();
        tree.commit();
        assert!(!rendered(&tree, child));
        let mut reg = IntersectionRegistration::new(
            Rc::new(|_: &[_]| {}),
            IntersectionObserverInit::default(),
        );
        reg.targets.push(IntersectionTarget {
            node: child,
            last: None,
        });
        let e = reg.gather(&tree, Rect::new(0.0, 0.0, 100.0, 100.0), Vec2::ZERO, 0.0);
        assert!(!e[0].is_intersecting);
    }

    #[test]
    fn mutation_interest_respects_subtree_and_filter() {
        let mut tree = Tree::new();
        let root = tree.insert(None, LocalElement::default()).unwrap();
        let child = tree.insert(Some(root), LocalElement::default()).unwrap();
        tree.take_mutations();
        let mut reg = MutationRegistration::new(Rc::new(|_: &[_]| {}));
        reg.targets.push((
            root,
            MutationObserverInit {
                attribute_filter: Some(vec!["style".into()]),
                subtree: true,
                ..Default::default()
            },
        ));
        tree.set_attribute(child, "style", Some("color: red")).unwrap();
        tree.set_attribute(child, "title", Some("x")).unwrap();
        tree.insert(Some(child), LocalElement::default()).unwrap();
        for record in tree.take_mutations() {
            reg.route(&tree, &record);
        }
        assert_eq!(reg.pending.len(), 1);
        assert_eq!(
            reg.pending[0].kind,
            MutationKind::Attributes {
                name: "style".into(),
                old_value: None,
            }
        );
    }
}
