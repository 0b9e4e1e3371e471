// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Propagation paths and dispatch plans.
//!
//! ## Overview
//!
//! Builds the propagation path for a target and emits a capture → target → bubble
//! sequence of [`Dispatch`] steps for it. Running listeners is left to the
//! [`Document`](crate::Document), which walks the sequence and honors
//! `stop_propagation`.
//!
//! ## Paths
//!
//! - An element's path is `Window, Document, root, .., element`.
//! - The document's path is `Window, Document`.
//! - The window and media query lists have singleton paths.

use alloc::vec::Vec;

use crate::event::Phase;
use crate::tree::Tree;
use crate::types::TargetId;

/// A single dispatch step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Dispatch {
    /// Propagation phase for this step.
    pub phase: Phase,
    /// Target whose listeners run in this step.
    pub target: TargetId,
}

/// Outermost-first propagation path ending at `target`.
///
/// Stale element ids produce an empty path.
pub fn propagation_path(tree: &Tree, target: TargetId) -> Vec<TargetId> {
    match target {
        TargetId::Window | TargetId::MediaQuery(_) => alloc::vec![target],
        TargetId::Document => alloc::vec![TargetId::Window, TargetId::Document],
        TargetId::Element(id) => {
            let nodes = tree.path_to_root(id);
            if nodes.is_empty() {
                return Vec::new();
            }
            let mut out = Vec::with_capacity(nodes.len() + 2);
            out.push(TargetId::Window);
            out.push(TargetId::Document);
            out.extend(nodes.into_iter().map(TargetId::Element));
            out
        }
    }
}

/// Emit the dispatch sequence for a path produced by [`propagation_path`].
///
/// Capture runs outer → inner over the ancestors, then the target, then (for
/// bubbling events) bubble inner → outer over the ancestors.
pub fn plan(path: &[TargetId], bubbles: bool) -> Vec<Dispatch> {
    let Some((&target, ancestors)) = path.split_last() else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(path.len() * 2);
    // Capture: outer→inner
    for &t in ancestors {
        out.push(Dispatch {
            phase: Phase::Capture,
            target: t,
        });
    }
    out.push(Dispatch {
        phase: Phase::Target,
        target,
    });
    // Bubble: inner→outer
    if bubbles {
        for &t in ancestors.iter().rev() {
            out.push(Dispatch {
                phase: Phase::Bubble,
                target: t,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LocalElement;
    use kurbo::Rect;

    #[test]
    fn element_path_starts_at_window() {
        let mut tree = Tree::new();
        let root = tree.insert(None, LocalElement::new("body", Rect::ZERO)).unwrap();
        let child = tree.insert(Some(root), LocalElement::default()).unwrap();
        assert_eq!(
            propagation_path(&tree, TargetId::Element(child)),
            [
                TargetId::Window,
                TargetId::Document,
                TargetId::Element(root),
                TargetId::Element(child),
            ]
        );
        tree.remove(child).unwrap();
        assert!(propagation_path(&tree, TargetId::Element(child)).is_empty());
    }

    #[test]
    fn capture_target_bubble_order() {
        let path = [TargetId::Window, TargetId::Document];
        let seq: Vec<(Phase, TargetId)> = plan(&path, true)
            .into_iter()
            .map(|d| (d.phase, d.target))
            .collect();
        assert_eq!(
            seq,
            [
                (Phase::Capture, TargetId::Window),
                (Phase::Target, TargetId::Document),
                (Phase::Bubble, TargetId::Window),
            ]
        );
    }

    #[test]
    fn non_bubbling_events_stop_at_target() {
        let path = [TargetId::Window, TargetId::Document];
        let seq = plan(&path, false);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.last().map(|d| d.phase), Some(Phase::Target));
        assert!(plan(&[], true).is_empty());
    }
}
