// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element tree: structure, geometry updates, mutation records, queries.

use alloc::string::String;
use alloc::vec::Vec;
use kurbo::{Affine, Insets, Point, Rect};

use crate::error::DomError;
use crate::types::{LocalElement, NodeFlags, NodeId};

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// The element tree behind a [`Document`](crate::Document).
///
/// Child geometry is expressed in the parent's coordinate space: a child's world
/// transform is its parent's world transform followed by its own local transform,
/// and its world bounds are the transformed AABB of its local bounds.
///
/// Structural and attribute changes are appended to a mutation log drained with
/// [`Tree::take_mutations`].
pub struct Tree {
    nodes: Vec<Option<Node>>, // slots
    generations: Vec<u32>,    // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    epoch: u64,
    needs_commit: bool,
    mutations: Vec<MutationRecord>,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        let free = self.free_list.len();
        f.debug_struct("Tree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .field("epoch", &self.epoch)
            .field("pending_mutations", &self.mutations.len())
            .finish_non_exhaustive()
    }
}

/// Results of a hit test.
#[derive(Clone, Debug)]
pub struct Hit {
    /// The matched element.
    pub node: NodeId,
    /// Path from root to element (inclusive).
    pub path: Vec<NodeId>,
}

/// A change to the tree, as reported to mutation observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    /// The element whose children or attributes changed.
    pub target: NodeId,
    /// What changed.
    pub kind: MutationKind,
}

/// The kind of a [`MutationRecord`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    /// Children were added to or removed from `target`.
    ChildList {
        /// Elements inserted under `target`.
        added: Vec<NodeId>,
        /// Elements removed from `target`.
        removed: Vec<NodeId>,
    },
    /// An attribute of `target` was set or removed.
    Attributes {
        /// Attribute name.
        name: String,
        /// The value before the change.
        old_value: Option<String>,
    },
}

#[derive(Clone, Debug, Default)]
struct WorldNode {
    world_transform: Affine,
    world_bounds: Rect, // AABB of transformed local bounds
}

#[derive(Clone, Debug)]
struct Node {
    generation: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: LocalElement,
    attributes: Vec<(String, String)>,
    world: WorldNode,
}

impl Node {
    fn new(generation: u32, local: LocalElement) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            local,
            attributes: Vec::new(),
            world: WorldNode::default(),
        }
    }
}

impl Tree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            epoch: 0,
            needs_commit: false,
            mutations: Vec::new(),
        }
    }

    /// Insert a new element as a child of `parent` (or as a root if `None`).
    pub fn insert(
        &mut self,
        parent: Option<NodeId>,
        local: LocalElement,
    ) -> Result<NodeId, DomError> {
        if let Some(p) = parent {
            self.check(p)?;
        }
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, local));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, local)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        let id = NodeId::new(idx, generation);
        if let Some(p) = parent {
            self.link_parent(id, p);
            self.record_child_list(p, alloc::vec![id], Vec::new());
        }
        self.needs_commit = true;
        Ok(id)
    }

    /// Remove an element and its subtree.
    ///
    /// Returns every removed id, the element itself first.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<NodeId>, DomError> {
        self.check(id)?;
        if let Some(parent) = self.node(id).parent {
            self.unlink_parent(id, parent);
            self.record_child_list(parent, Vec::new(), alloc::vec![id]);
        }
        let mut removed = Vec::new();
        self.free_subtree(id, &mut removed);
        self.needs_commit = true;
        Ok(removed)
    }

    /// Move `id` under `new_parent` (or make it a root).
    pub fn reparent(&mut self, id: NodeId, new_parent: Option<NodeId>) -> Result<(), DomError> {
        self.check(id)?;
        if let Some(p) = new_parent {
            self.check(p)?;
            if self.contains(id, p) {
                return Err(DomError::HierarchyCycle(id));
            }
        }
        if let Some(parent) = self.node(id).parent {
            self.unlink_parent(id, parent);
            self.record_child_list(parent, Vec::new(), alloc::vec![id]);
        }
        if let Some(p) = new_parent {
            self.link_parent(id, p);
            self.record_child_list(p, alloc::vec![id], Vec::new());
        }
        self.needs_commit = true;
        Ok(())
    }

    /// Update local bounds.
    pub fn set_local_bounds(&mut self, id: NodeId, bounds: Rect) -> Result<(), DomError> {
        self.node_checked_mut(id)?.local.local_bounds = bounds;
        self.needs_commit = true;
        Ok(())
    }

    /// Update content insets.
    pub fn set_content_insets(&mut self, id: NodeId, insets: Insets) -> Result<(), DomError> {
        self.node_checked_mut(id)?.local.content_insets = insets;
        Ok(())
    }

    /// Update local transform.
    pub fn set_local_transform(&mut self, id: NodeId, tf: Affine) -> Result<(), DomError> {
        self.node_checked_mut(id)?.local.local_transform = tf;
        self.needs_commit = true;
        Ok(())
    }

    /// Update z index.
    pub fn set_z_index(&mut self, id: NodeId, z: i32) -> Result<(), DomError> {
        self.node_checked_mut(id)?.local.z_index = z;
        Ok(())
    }

    /// Update element flags.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) -> Result<(), DomError> {
        self.node_checked_mut(id)?.local.flags = flags;
        Ok(())
    }

    /// Set (`Some`) or remove (`None`) an attribute.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), DomError> {
        let node = self.node_checked_mut(id)?;
        let pos = node.attributes.iter().position(|(n, _)| n == name);
        let old_value = match (pos, value) {
            (Some(i), Some(v)) => Some(core::mem::replace(&mut node.attributes[i].1, v.into())),
            (Some(i), None) => Some(node.attributes.remove(i).1),
            (None, Some(v)) => {
                node.attributes.push((name.into(), v.into()));
                None
            }
            (None, None) => return Ok(()),
        };
        self.mutations.push(MutationRecord {
            target: id,
            kind: MutationKind::Attributes {
                name: name.into(),
                old_value,
            },
        });
        Ok(())
    }

    /// Current value of an attribute.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        let node = self.node_opt(id)?;
        node.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Local data of an element.
    pub fn local(&self, id: NodeId) -> Option<&LocalElement> {
        self.node_opt(id).map(|n| &n.local)
    }

    /// Recompute world transforms and bounds if anything moved since the last commit.
    ///
    /// Returns the number of elements whose world bounds changed.
    pub fn commit(&mut self) -> usize {
        if !self.needs_commit {
            return 0;
        }
        self.needs_commit = false;
        self.epoch += 1;
        let roots: Vec<NodeId> = self.roots().collect();
        let mut changed = 0;
        for root in roots {
            self.update_world_recursive(root, Affine::IDENTITY, &mut changed);
        }
        changed
    }

    /// Returns true if geometry changed since the last [`commit`](Self::commit).
    pub fn needs_commit(&self) -> bool {
        self.needs_commit
    }

    /// World-space bounds as of the last commit.
    pub fn world_bounds(&self, id: NodeId) -> Option<Rect> {
        self.node_opt(id).map(|n| n.world.world_bounds)
    }

    /// Hit test a world-space point. Returns the topmost visible, pickable element.
    ///
    /// If multiple elements overlap with the same `z_index`, the newer [`NodeId`] wins.
    pub fn hit_test_point(&self, pt: Point) -> Option<Hit> {
        let mut best: Option<(NodeId, i32)> = None;
        for (id, node) in self.live_nodes() {
            let flags = node.local.flags;
            if !flags.contains(NodeFlags::VISIBLE | NodeFlags::PICKABLE) {
                continue;
            }
            if !node.world.world_bounds.contains(pt) {
                continue;
            }
            let local_pt = node.world.world_transform.inverse() * pt;
            if !node.local.local_bounds.contains(local_pt) {
                continue;
            }
            let z = node.local.z_index;
            match best {
                None => best = Some((id, z)),
                Some((best_id, z_best)) => {
                    if z > z_best || (z == z_best && id.is_newer_than(best_id)) {
                        best = Some((id, z));
                    }
                }
            }
        }
        best.map(|(node, _)| Hit {
            node,
            path: self.path_to_root(node),
        })
    }

    /// Returns true if `id` refers to a live element.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node_opt(id).is_some()
    }

    /// Returns the z-index of an element if the identifier is live.
    pub fn z_index(&self, id: NodeId) -> Option<i32> {
        self.node_opt(id).map(|n| n.local.z_index)
    }

    /// Parent of a live element.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id)?.parent
    }

    /// Children of a live element, in insertion order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node_opt(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Returns true if `node` is `ancestor` or one of its descendants.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }

    /// Path from the root to `id` (inclusive). Empty for stale ids.
    pub fn path_to_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = Some(id).filter(|id| self.is_alive(*id));
        while let Some(id) = cur {
            out.push(id);
            cur = self.node(id).parent;
        }
        out.reverse();
        out
    }

    /// Live elements without a parent.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.live_nodes()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(id, _)| id)
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Returns true if the tree has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain the mutation log.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        core::mem::take(&mut self.mutations)
    }

    // --- internals ---

    fn check(&self, id: NodeId) -> Result<(), DomError> {
        if self.is_alive(id) {
            Ok(())
        } else {
            Err(DomError::StaleNode(id))
        }
    }

    fn live_nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| {
            let n = n.as_ref()?;
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            Some((NodeId::new(i as u32, n.generation), n))
        })
    }

    /// Access a node; panics if `id` is stale.
    fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.idx()].as_ref().expect("dangling NodeId")
    }

    /// Access a node mutably; panics if `id` is stale.
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.idx()].as_mut().expect("dangling NodeId")
    }

    fn node_opt(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    fn node_checked_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        match self.nodes.get_mut(id.idx()).and_then(|n| n.as_mut()) {
            Some(n) if n.generation == id.1 => Ok(n),
            _ => Err(DomError::StaleNode(id)),
        }
    }

    fn link_parent(&mut self, id: NodeId, parent: NodeId) {
        let parent_node = self.node_mut(parent);
        parent_node.children.push(id);
        self.node_mut(id).parent = Some(parent);
    }

    fn unlink_parent(&mut self, id: NodeId, parent: NodeId) {
        let p = self.node_mut(parent);
        p.children.retain(|c| *c != id);
        self.node_mut(id).parent = None;
    }

    fn free_subtree(&mut self, id: NodeId, removed: &mut Vec<NodeId>) {
        removed.push(id);
        let children = core::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.free_subtree(child, removed);
        }
        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    fn record_child_list(&mut self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        self.mutations.push(MutationRecord {
            target,
            kind: MutationKind::ChildList { added, removed },
        });
    }

    fn update_world_recursive(&mut self, id: NodeId, parent_tf: Affine, changed: &mut usize) {
        let (world_tf, child_ids) = {
            let node = self.node_mut(id);
            let world_tf = parent_tf * node.local.local_transform;
            let bounds = transform_rect_bbox(world_tf, node.local.local_bounds);
            if bounds != node.world.world_bounds {
                *changed += 1;
            }
            node.world = WorldNode {
                world_transform: world_tf,
                world_bounds: bounds,
            };
            (world_tf, node.children.clone())
        };
        for child in child_ids {
            self.update_world_recursive(child, world_tf, changed);
        }
    }
}

/// Transform an axis-aligned `Rect` by an `Affine` and return a conservative
/// axis-aligned bounding box in world space.
fn transform_rect_bbox(affine: Affine, rect: Rect) -> Rect {
    let p0 = affine * Point::new(rect.x0, rect.y0);
    let p1 = affine * Point::new(rect.x1, rect.y0);
    let p2 = affine * Point::new(rect.x0, rect.y1);
    let p3 = affine * Point::new(rect.x1, rect.y1);
    let min_x = p0.x.min(p1.x).min(p2.x).min(p3.x);
    let min_y = p0.y.min(p1.y).min(p2.y).min(p3.y);
    let max_x = p0.x.max(p1.x).max(p2.x).max(p3.x);
    let max_y = p0.y.max(p1.y).max(p2.y).max(p3.y);
    Rect::new(min_x, min_y, max_x, max_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use kurbo::Vec2;

    fn element(bounds: Rect) -> LocalElement {
        LocalElement::new("div", bounds)
    }

    #[test]
    fn insert_and_hit_test() {
        let mut tree = Tree::new();
        let root = tree
            .insert(None, element(Rect::new(0.0, 0.0, 200.0, 200.0)))
            .unwrap();
        let _a = tree
            .insert(Some(root), element(Rect::new(10.0, 10.0, 60.0, 60.0)))
            .unwrap();
        let b = tree
            .insert(
                Some(root),
                LocalElement {
                    z_index: 10,
                    ..element(Rect::new(40.0, 40.0, 120.0, 120.0))
                },
            )
            .unwrap();
        tree.commit();

        let hit = tree.hit_test_point(Point::new(50.0, 50.0)).unwrap();
        assert_eq!(hit.node, b, "topmost by z should win");
        assert_eq!(hit.path, vec![root, b]);
    }

    #[test]
    fn transforms_compose_down_the_tree() {
        let mut tree = Tree::new();
        let root = tree
            .insert(None, element(Rect::new(0.0, 0.0, 100.0, 100.0)))
            .unwrap();
        let n = tree
            .insert(Some(root), element(Rect::new(0.0, 0.0, 10.0, 10.0)))
            .unwrap();
        tree.commit();
        tree.set_local_transform(root, Affine::translate(Vec2::new(50.0, 0.0)))
            .unwrap();
        assert!(tree.needs_commit());
        assert_eq!(tree.commit(), 2);
        assert_eq!(tree.world_bounds(n), Some(Rect::new(50.0, 0.0, 60.0, 10.0)));
        assert_eq!(tree.commit(), 0, "nothing changed since the last commit");
    }

    #[test]
    fn liveness_insert_remove_reuse() {
        let mut tree = Tree::new();
        let root = tree.insert(None, element(Rect::new(0.0, 0.0, 1.0, 1.0))).unwrap();
        let a = tree
            .insert(Some(root), element(Rect::new(0.0, 0.0, 1.0, 1.0)))
            .unwrap();
        let a_child = tree
            .insert(Some(a), element(Rect::new(0.0, 0.0, 1.0, 1.0)))
            .unwrap();

        assert_eq!(tree.remove(a).unwrap(), vec![a, a_child]);
        assert!(!tree.is_alive(a));
        assert!(!tree.is_alive(a_child));
        assert_eq!(tree.remove(a), Err(DomError::StaleNode(a)));

        let b = tree
            .insert(Some(root), element(Rect::new(0.0, 0.0, 1.0, 1.0)))
            .unwrap();
        assert!(tree.is_alive(b));
        assert!(!tree.is_alive(a));
        if a.0 == b.0 {
            assert!(b.1 > a.1, "generation must increase on reuse");
        }
        assert_eq!(tree.children(root), &[b]);
    }

    #[test]
    fn hit_equal_z_newer_wins() {
        let mut tree = Tree::new();
        let root = tree
            .insert(None, element(Rect::new(0.0, 0.0, 200.0, 200.0)))
            .unwrap();
        let overlapping = || LocalElement {
            z_index: 5,
            ..element(Rect::new(40.0, 40.0, 120.0, 120.0))
        };
        let a = tree.insert(Some(root), overlapping()).unwrap();
        let b = tree.insert(Some(root), overlapping()).unwrap();
        tree.commit();
        let expected = if b.is_newer_than(a) { b } else { a };
        assert_eq!(tree.hit_test_point(Point::new(60.0, 60.0)).unwrap().node, expected);

        tree.remove(a).unwrap();
        let c = tree.insert(Some(root), overlapping()).unwrap();
        tree.commit();
        assert!(c.is_newer_than(b));
        assert_eq!(
            tree.hit_test_point(Point::new(60.0, 60.0)).unwrap().node,
            c,
            "newer id should win on equal z"
        );
    }

    #[test]
    fn unpickable_elements_are_skipped() {
        let mut tree = Tree::new();
        let root = tree
            .insert(None, element(Rect::new(0.0, 0.0, 100.0, 100.0)))
            .unwrap();
        let overlay = tree
            .insert(
                Some(root),
                LocalElement {
                    z_index: 1,
                    flags: NodeFlags::VISIBLE,
                    ..element(Rect::new(0.0, 0.0, 100.0, 100.0))
                },
            )
            .unwrap();
        tree.commit();
        assert_eq!(tree.hit_test_point(Point::new(5.0, 5.0)).unwrap().node, root);
        tree.set_flags(overlay, NodeFlags::default()).unwrap();
        assert_eq!(tree.hit_test_point(Point::new(5.0, 5.0)).unwrap().node, overlay);
    }

    #[test]
    fn reparent_rejects_cycles_and_records_mutations() {
        let mut tree = Tree::new();
        let root = tree.insert(None, element(Rect::ZERO)).unwrap();
        let a = tree.insert(Some(root), element(Rect::ZERO)).unwrap();
        let b = tree.insert(Some(a), element(Rect::ZERO)).unwrap();
        tree.take_mutations();

        assert_eq!(tree.reparent(a, Some(b)), Err(DomError::HierarchyCycle(a)));
        tree.reparent(b, Some(root)).unwrap();
        assert_eq!(
            tree.take_mutations(),
            vec![
                MutationRecord {
                    target: a,
                    kind: MutationKind::ChildList {
                        added: vec![],
                        removed: vec![b]
                    },
                },
                MutationRecord {
                    target: root,
                    kind: MutationKind::ChildList {
                        added: vec![b],
                        removed: vec![]
                    },
                },
            ]
        );
        assert!(tree.contains(root, b));
        assert!(!tree.contains(a, b));
    }

    #[test]
    fn attributes_record_old_values() {
        let mut tree = Tree::new();
        let n = tree.insert(None, element(Rect::ZERO)).unwrap();
        tree.set_attribute(n, "class", Some("a")).unwrap();
        tree.set_attribute(n, "class", Some("b")).unwrap();
        tree.set_attribute(n, "class", None).unwrap();
        tree.set_attribute(n, "class", None).unwrap();
        let olds: Vec<Option<String>> = tree
            .take_mutations()
            .into_iter()
            .map(|r| match r.kind {
                MutationKind::Attributes { old_value, .. } => old_value,
                MutationKind::ChildList { .. } => panic!("unexpected child list record"),
            })
            .collect();
        assert_eq!(olds, vec![None, Some("a".into()), Some("b".into())]);
        assert_eq!(tree.attribute(n, "class"), None);
    }
}
