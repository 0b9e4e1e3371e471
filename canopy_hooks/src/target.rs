// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Target references and target normalization.
//!
//! A [`TargetRef`] is the handle a component hands to whatever places its
//! element, and a [`MaybeTarget`] is anything a hook accepts as "where to
//! listen or observe". [`MaybeTarget::resolve`] flattens it into a target set:
//! an ordered `Vec<TargetId>` with unset entries dropped.
//!
//! ```
//! use canopy_dom::{Document, LocalElement, TargetId};
//! use canopy_hooks::{MaybeTarget, TargetRef};
//! use kurbo::Rect;
//!
//! let doc = Document::default();
//! let el = doc.insert(None, LocalElement::new("div", Rect::ZERO)).unwrap();
//!
//! let r = TargetRef::new();
//! let target = MaybeTarget::List(vec![r.clone().into(), TargetId::Window.into(), MaybeTarget::Unset]);
//! assert_eq!(target.resolve(), [TargetId::Window]);
//! r.set(Some(el));
//! assert_eq!(target.resolve(), [TargetId::Element(el), TargetId::Window]);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use canopy_dom::{NodeId, TargetId};
use canopy_reactive::{Computed, Observable};

use crate::component::Cx;

/// A ref composed into a [`TargetRef`]; assignments are forwarded to it first.
#[derive(Clone)]
pub enum ExternalRef {
    /// Called with every assignment.
    Callback(Rc<dyn Fn(Option<NodeId>)>),
    /// Written with every assignment.
    Object(Rc<RefCell<Option<NodeId>>>),
}

impl ExternalRef {
    fn assign(&self, node: Option<NodeId>) {
        match self {
            Self::Callback(f) => f(node),
            Self::Object(slot) => *slot.borrow_mut() = node,
        }
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Callback(a), Self::Callback(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for ExternalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("Callback(..)"),
            Self::Object(slot) => f.debug_tuple("Object").field(&slot.borrow()).finish(),
        }
    }
}

/// A stable, assignable reference to at most one element.
///
/// Reads are reactive: an effect that read [`get`](Self::get) re-runs when the
/// reference is assigned a different element.
#[derive(Clone, Default)]
pub struct TargetRef {
    inner: Rc<TargetRefInner>,
}

#[derive(Default)]
struct TargetRefInner {
    cell: Observable<Option<NodeId>>,
    external: RefCell<Option<ExternalRef>>,
}

impl fmt::Debug for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetRef")
            .field("element", &self.peek())
            .field("external", &self.inner.external.borrow())
            .finish()
    }
}

impl TargetRef {
    /// A free-standing reference with no element.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the element (or clear it with `None`).
    ///
    /// The composed external ref, if any, sees the assignment first.
    pub fn set(&self, node: Option<NodeId>) {
        let external = self.inner.external.borrow().clone();
        if let Some(external) = external {
            external.assign(node);
        }
        self.inner.cell.set_if_changed(node);
    }

    /// Tracked read.
    pub fn get(&self) -> Option<NodeId> {
        self.inner.cell.get()
    }

    /// Untracked read.
    pub fn peek(&self) -> Option<NodeId> {
        self.inner.cell.peek()
    }

    /// The cell behind the reference.
    pub fn cell(&self) -> &Observable<Option<NodeId>> {
        &self.inner.cell
    }

    /// Replace the composed external ref. Takes effect on the next assignment.
    pub fn set_external(&self, external: Option<ExternalRef>) {
        let mut slot = self.inner.external.borrow_mut();
        let unchanged = match (&*slot, &external) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        };
        if !unchanged {
            *slot = external;
        }
    }

    /// Returns true if both handles are the same reference.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// A [`TargetRef`] memoized for the life of the component.
///
/// `external` is refreshed on every render, so passing a different external
/// ref takes effect without changing the returned reference.
pub fn use_target_ref(cx: &mut Cx<'_>, external: Option<ExternalRef>) -> TargetRef {
    let target = cx.use_hook(TargetRef::new);
    target.set_external(external);
    (*target).clone()
}

/// Anything a hook accepts as a listening or observation target.
#[derive(Clone, Debug, Default)]
pub enum MaybeTarget {
    /// A component's target reference.
    Ref(TargetRef),
    /// A cell holding an element or nothing.
    Element(Observable<Option<NodeId>>),
    /// A cell holding any event target or nothing, such as a media query list.
    Target(Observable<Option<TargetId>>),
    /// A target set derived from other reactive state.
    Derived(Computed<Vec<TargetId>>),
    /// A fixed target.
    Node(TargetId),
    /// Nothing.
    #[default]
    Unset,
    /// Several targets, flattened in order.
    List(Vec<Self>),
}

impl MaybeTarget {
    /// Build a list target.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Self>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Flatten into a target set, registering dependencies on every cell read.
    pub fn resolve(&self) -> Vec<TargetId> {
        let mut out = Vec::new();
        self.collect(true, &mut out);
        out
    }

    /// Flatten into a target set without registering dependencies.
    pub fn resolve_untracked(&self) -> Vec<TargetId> {
        let mut out = Vec::new();
        self.collect(false, &mut out);
        out
    }

    /// The first element in the target set (tracked).
    pub fn first_element(&self) -> Option<NodeId> {
        self.find_element(true)
    }

    /// The first element in the target set (untracked).
    pub fn first_element_untracked(&self) -> Option<NodeId> {
        self.find_element(false)
    }

    /// Returns true if both refer to the same references and cells, the same
    /// fixed targets, or lists of pairwise identical entries.
    pub fn same_identity(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Ref(a), Self::Ref(b)) => a.ptr_eq(b),
            (Self::Element(a), Self::Element(b)) => a.ptr_eq(b),
            (Self::Target(a), Self::Target(b)) => a.ptr_eq(b),
            (Self::Derived(a), Self::Derived(b)) => a.ptr_eq(b),
            (Self::Node(a), Self::Node(b)) => a == b,
            (Self::Unset, Self::Unset) => true,
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.same_identity(b))
            }
            _ => false,
        }
    }

    fn collect(&self, tracked: bool, out: &mut Vec<TargetId>) {
        match self {
            Self::Ref(r) => {
                let node = if tracked { r.get() } else { r.peek() };
                out.extend(node.map(TargetId::Element));
            }
            Self::Element(cell) => {
                let node = if tracked { cell.get() } else { cell.peek() };
                out.extend(node.map(TargetId::Element));
            }
            Self::Target(cell) => {
                out.extend(if tracked { cell.get() } else { cell.peek() });
            }
            Self::Derived(c) => {
                if tracked {
                    c.with(|set| out.extend_from_slice(set));
                } else {
                    c.with_untracked(|set| out.extend_from_slice(set));
                }
            }
            Self::Node(target) => out.push(*target),
            Self::Unset => {}
            Self::List(items) => {
                for item in items {
                    item.collect(tracked, out);
                }
            }
        }
    }

    fn find_element(&self, tracked: bool) -> Option<NodeId> {
        match self {
            Self::Ref(r) => {
                if tracked {
                    r.get()
                } else {
                    r.peek()
                }
            }
            Self::Element(cell) => {
                if tracked {
                    cell.get()
                } else {
                    cell.peek()
                }
            }
            Self::Target(_) | Self::Derived(_) => {
                let mut out = Vec::new();
                self.collect(tracked, &mut out);
                out.into_iter().find_map(TargetId::element)
            }
            Self::Node(target) => target.element(),
            Self::Unset => None,
            Self::List(items) => items.iter().find_map(|item| item.find_element(tracked)),
        }
    }
}

impl From<TargetRef> for MaybeTarget {
    fn from(r: TargetRef) -> Self {
        Self::Ref(r)
    }
}

impl From<&TargetRef> for MaybeTarget {
    fn from(r: &TargetRef) -> Self {
        Self::Ref(r.clone())
    }
}

impl From<Observable<Option<NodeId>>> for MaybeTarget {
    fn from(cell: Observable<Option<NodeId>>) -> Self {
        Self::Element(cell)
    }
}

impl From<Observable<Option<TargetId>>> for MaybeTarget {
    fn from(cell: Observable<Option<TargetId>>) -> Self {
        Self::Target(cell)
    }
}

impl From<Computed<Vec<TargetId>>> for MaybeTarget {
    fn from(c: Computed<Vec<TargetId>>) -> Self {
        Self::Derived(c)
    }
}

impl From<NodeId> for MaybeTarget {
    fn from(node: NodeId) -> Self {
        Self::Node(TargetId::Element(node))
    }
}

impl From<TargetId> for MaybeTarget {
    fn from(target: TargetId) -> Self {
        Self::Node(target)
    }
}

impl From<Option<NodeId>> for MaybeTarget {
    fn from(node: Option<NodeId>) -> Self {
        node.map_or(Self::Unset, Self::from)
    }
}

impl From<Vec<Self>> for MaybeTarget {
    fn from(items: Vec<Self>) -> Self {
        Self::List(items)
    }
}

/// A cell holding `target`, replaced only when a render passes a target of
/// different identity.
///
/// Effects that read the cell re-run on identity changes and, through
/// [`MaybeTarget::resolve`], on writes to the references and cells inside it.
pub fn use_target(cx: &mut Cx<'_>, target: MaybeTarget) -> Observable<MaybeTarget> {
    let cell = cx.use_hook(|| Observable::new(target.clone()));
    if !cell.with_untracked(|current| current.same_identity(&target)) {
        cell.set(target);
    }
    (*cell).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, Env};
    use canopy_dom::{Document, LocalElement};
    use canopy_reactive::Effect;
    use kurbo::Rect;
    use proptest::prelude::*;
    use std::cell::Cell;

    fn elements(n: usize) -> (Document, Vec<NodeId>) {
        let doc = Document::default();
        let ids = (0..n)
            .map(|_| doc.insert(None, LocalElement::new("div", Rect::ZERO)).unwrap())
            .collect();
        (doc, ids)
    }

    #[test]
    fn external_ref_sees_assignment_first() {
        let (_doc, ids) = elements(1);
        let r = TargetRef::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let cb: Rc<dyn Fn(Option<NodeId>)> = {
            let (order, r) = (order.clone(), r.clone());
            Rc::new(move |node| order.borrow_mut().push((node, r.peek())))
        };
        r.set_external(Some(ExternalRef::Callback(cb)));
        r.set(Some(ids[0]));
        // The internal cell still held the old value when the external ref ran.
        assert_eq!(*order.borrow(), [(Some(ids[0]), None)]);
        assert_eq!(r.peek(), Some(ids[0]));

        let object = Rc::new(RefCell::new(None));
        r.set_external(Some(ExternalRef::Object(object.clone())));
        r.set(None);
        assert_eq!(*object.borrow(), None);
        r.set(Some(ids[0]));
        assert_eq!(*object.borrow(), Some(ids[0]));
        assert_eq!(order.borrow().len(), 1);
    }

    #[test]
    fn use_target_ref_is_stable_and_refreshes_external() {
        let (_doc, ids) = elements(1);
        let a = Rc::new(RefCell::new(None));
        let b = Rc::new(RefCell::new(None));
        let current = Rc::new(RefCell::new(a.clone()));
        let mut c = Component::mount(Env::headless(), {
            let current = current.clone();
            move |cx| {
                let external = ExternalRef::Object(current.borrow().clone());
                use_target_ref(cx, Some(external))
            }
        });
        let first = c.output().clone();
        *current.borrow_mut() = b.clone();
        c.rerender();
        assert!(first.ptr_eq(c.output()));
        first.set(Some(ids[0]));
        assert_eq!(*a.borrow(), None);
        assert_eq!(*b.borrow(), Some(ids[0]));
    }

    #[test]
    fn resolve_tracks_reference_assignment() {
        let (_doc, ids) = elements(2);
        let r = TargetRef::new();
        let target = MaybeTarget::list([MaybeTarget::from(&r), ids[1].into()]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _effect = Effect::new({
            let (target, seen) = (target.clone(), seen.clone());
            move || seen.borrow_mut().push(target.resolve().len())
        });
        r.set(Some(ids[0]));
        r.set(Some(ids[0]));
        assert_eq!(*seen.borrow(), [1, 2]);
        assert_eq!(target.first_element(), Some(ids[0]));
    }

    #[test]
    fn untracked_resolution_registers_nothing() {
        let cell = Observable::new(None::<TargetId>);
        let runs = Rc::new(Cell::new(0));
        let _effect = Effect::new({
            let (cell, runs) = (cell.clone(), runs.clone());
            move || {
                MaybeTarget::Target(cell.clone()).resolve_untracked();
                runs.set(runs.get() + 1);
            }
        });
        cell.set(Some(TargetId::Document));
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn identity_compares_cells_by_pointer() {
        let a = Observable::new(None::<NodeId>);
        let b = Observable::new(None::<NodeId>);
        assert!(MaybeTarget::from(a.clone()).same_identity(&a.clone().into()));
        assert!(!MaybeTarget::from(a).same_identity(&b.into()));
        assert!(MaybeTarget::Node(TargetId::Window).same_identity(&TargetId::Window.into()));
        assert!(!MaybeTarget::list([TargetId::Window]).same_identity(&MaybeTarget::list([
            TargetId::Window,
            TargetId::Document
        ])));
        assert!(MaybeTarget::Unset.resolve().is_empty());
    }

    #[test]
    fn use_target_only_replaces_on_identity_change() {
        let source = Rc::new(RefCell::new(MaybeTarget::Node(TargetId::Window)));
        let mut c = Component::mount(Env::headless(), {
            let source = source.clone();
            move |cx| use_target(cx, source.borrow().clone())
        });
        let cell = c.output().clone();
        let writes = Rc::new(Cell::new(0));
        let _effect = Effect::new({
            let (cell, writes) = (cell.clone(), writes.clone());
            move || {
                cell.with(|_| ());
                writes.set(writes.get() + 1);
            }
        });
        c.rerender();
        assert_eq!(writes.get(), 1);
        *source.borrow_mut() = MaybeTarget::Node(TargetId::Document);
        c.rerender();
        assert_eq!(writes.get(), 2);
        assert_eq!(cell.with_untracked(MaybeTarget::resolve_untracked), [TargetId::Document]);
    }

    #[derive(Clone, Debug)]
    enum Shape {
        Unset,
        Fixed(u8),
        Cell(Option<u8>),
        List(Vec<Shape>),
    }

    fn shape() -> impl Strategy<Value = Shape> {
        let leaf = prop_oneof![
            Just(Shape::Unset),
            (0_u8..4).prop_map(Shape::Fixed),
            proptest::option::of(0_u8..4).prop_map(Shape::Cell),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            proptest::collection::vec(inner, 0..4).prop_map(Shape::List)
        })
    }

    fn build(shape: &Shape, ids: &[NodeId], expected: &mut Vec<TargetId>) -> MaybeTarget {
        match shape {
            Shape::Unset => MaybeTarget::Unset,
            Shape::Fixed(i) => {
                let t = TargetId::Element(ids[usize::from(*i)]);
                expected.push(t);
                t.into()
            }
            Shape::Cell(v) => {
                let node = v.map(|i| ids[usize::from(i)]);
                expected.extend(node.map(TargetId::Element));
                Observable::new(node).into()
            }
            Shape::List(items) => {
                MaybeTarget::List(items.iter().map(|s| build(s, ids, expected)).collect())
            }
        }
    }

    proptest! {
        #[test]
        fn target_sets_preserve_order_and_drop_unset(s in shape()) {
            let (_doc, ids) = elements(4);
            let mut expected = Vec::new();
            let target = build(&s, &ids, &mut expected);
            let resolved = target.resolve();
            prop_assert_eq!(&resolved, &expected);
            prop_assert_eq!(target.resolve_untracked(), resolved.clone());
            prop_assert_eq!(target.first_element(), resolved.iter().find_map(|t| t.element()));
        }
    }
}
