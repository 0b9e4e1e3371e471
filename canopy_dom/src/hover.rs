// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hover state helper: compute enter/leave transitions from path changes.
//!
//! The [`Document`](crate::Document) feeds the root→target path of every
//! pointer move into a [`HoverState`] and dispatches `pointerleave`/`mouseleave`
//! and `pointerenter`/`mouseenter` for the resulting transitions.
//!
//! ```
//! use canopy_dom::hover::{HoverState, HoverEvent};
//! let mut h: HoverState<u32> = HoverState::new();
//! assert_eq!(h.update_path(&[1, 2]), vec![HoverEvent::Enter(1), HoverEvent::Enter(2)]);
//! assert_eq!(h.update_path(&[1, 3]), vec![HoverEvent::Leave(2), HoverEvent::Enter(3)]);
//! ```

use alloc::vec::Vec;

/// A hover state machine over root→target paths.
///
/// Ordering semantics:
/// - Leave events are emitted from inner-most to outer-most.
/// - Enter events are emitted from outer-most to inner-most.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HoverState<K: Copy + Eq> {
    current: Vec<K>,
}

/// A hover transition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HoverEvent<K> {
    /// Pointer enters the given node (in order from outer→inner).
    Enter(K),
    /// Pointer leaves the given node (in order from inner→outer).
    Leave(K),
}

impl<K: Copy + Eq> HoverState<K> {
    /// Create an empty hover state.
    pub fn new() -> Self {
        Self {
            current: Vec::new(),
        }
    }

    /// Return the current root→target path (if any).
    pub fn current_path(&self) -> &[K] {
        &self.current
    }

    /// Clear the current hover path, returning leave events from inner-most to outer-most.
    pub fn clear(&mut self) -> Vec<HoverEvent<K>> {
        let out = self.current.iter().rev().map(|&k| HoverEvent::Leave(k)).collect();
        self.current.clear();
        out
    }

    /// Forget `node` and everything below it without emitting transitions.
    ///
    /// Used when hovered elements are removed from the tree.
    pub fn truncate_at(&mut self, node: K) {
        if let Some(pos) = self.current.iter().position(|k| *k == node) {
            self.current.truncate(pos);
        }
    }

    /// Update the hover path and return the transitions from the previous path to `new_path`.
    pub fn update_path(&mut self, new_path: &[K]) -> Vec<HoverEvent<K>> {
        // Common prefix length is the depth of the lowest common ancestor.
        let lca = self
            .current
            .iter()
            .zip(new_path)
            .take_while(|(a, b)| a == b)
            .count();

        let mut out = Vec::new();
        for &k in self.current[lca..].iter().rev() {
            out.push(HoverEvent::Leave(k));
        }
        for &k in &new_path[lca..] {
            out.push(HoverEvent::Enter(k));
        }

        self.current.clear();
        self.current.extend_from_slice(new_path);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn hover_leave_to_empty() {
        let mut h: HoverState<u32> = HoverState::new();
        let _ = h.update_path(&[1, 2]);
        assert_eq!(h.clear(), vec![HoverEvent::Leave(2), HoverEvent::Leave(1)]);
        assert!(h.current_path().is_empty());
    }

    // Shared prefix [1,2,3], tails [4,5] → [9,10].
    #[test]
    fn hover_deep_lca() {
        let mut h: HoverState<u32> = HoverState::new();
        let _ = h.update_path(&[1, 2, 3, 4, 5]);
        let ev = h.update_path(&[1, 2, 3, 9, 10]);
        assert_eq!(
            ev,
            vec![
                HoverEvent::Leave(5),
                HoverEvent::Leave(4),
                HoverEvent::Enter(9),
                HoverEvent::Enter(10),
            ]
        );
    }

    #[test]
    fn hover_same_path_no_events() {
        let mut h: HoverState<u32> = HoverState::new();
        let _ = h.update_path(&[7, 8]);
        assert!(h.update_path(&[7, 8]).is_empty());
    }

    #[test]
    fn removed_nodes_leave_silently() {
        let mut h: HoverState<u32> = HoverState::new();
        let _ = h.update_path(&[1, 2, 3]);
        h.truncate_at(2);
        assert_eq!(h.current_path(), &[1]);
        assert_eq!(h.update_path(&[1, 4]), vec![HoverEvent::Enter(4)]);
    }
}
