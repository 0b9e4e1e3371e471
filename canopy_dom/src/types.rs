// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the document: node identifiers, event targets, flags, and local geometry.

use alloc::string::String;

use kurbo::{Affine, Insets, Rect};

/// Identifier for an element in the document tree.
///
/// This is a small, copyable handle that stays stable across updates but becomes
/// invalid when the underlying slot is reused.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On remove, the slot is freed; any existing `NodeId` that pointed to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `NodeId`.
///
/// ### Newer
///
/// A `NodeId` is considered newer than another when it has a higher generation.
/// If generations are equal, the one with the higher slot index is considered newer.
/// This order is used only for deterministic tie-breaks in
/// [hit testing](crate::Tree::hit_test_point).
///
/// Stale `NodeId`s never alias a different live node because the generation must match.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    /// Returns true if `self` was allocated after `other`.
    pub(crate) fn is_newer_than(self, other: Self) -> bool {
        (self.1 > other.1) || (self.1 == other.1 && self.0 > other.0)
    }
}

/// Identifier of a media query list created by [`Document::match_media`](crate::Document::match_media).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct MediaQueryId(pub(crate) u32);

/// Anything listeners can be attached to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TargetId {
    /// The window.
    Window,
    /// The document.
    Document,
    /// An element of the document tree.
    Element(NodeId),
    /// A media query list.
    MediaQuery(MediaQueryId),
}

impl TargetId {
    /// The element behind this target, if it is one.
    pub fn element(self) -> Option<NodeId> {
        match self {
            Self::Element(id) => Some(id),
            _ => None,
        }
    }
}

impl From<NodeId> for TargetId {
    fn from(id: NodeId) -> Self {
        Self::Element(id)
    }
}

impl From<MediaQueryId> for TargetId {
    fn from(id: MediaQueryId) -> Self {
        Self::MediaQuery(id)
    }
}

bitflags::bitflags! {
    /// Element flags controlling visibility and picking.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Element is visible (participates in intersection observation).
        const VISIBLE  = 0b0000_0001;
        /// Element is pickable (receives pointer and drag input).
        const PICKABLE = 0b0000_0010;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::PICKABLE
    }
}

bitflags::bitflags! {
    /// Platform features a document exposes.
    ///
    /// Hooks check these before creating observers; a missing capability is
    /// reported as "unsupported" rather than as a failure.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// `ResizeObserver`.
        const RESIZE_OBSERVER       = 0b0000_0001;
        /// `IntersectionObserver`.
        const INTERSECTION_OBSERVER = 0b0000_0010;
        /// `MutationObserver`.
        const MUTATION_OBSERVER     = 0b0000_0100;
        /// `matchMedia`.
        const MATCH_MEDIA           = 0b0000_1000;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// A single platform feature, as named in [`DomError::Unsupported`](crate::DomError::Unsupported).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Capability {
    /// `ResizeObserver`.
    ResizeObserver,
    /// `IntersectionObserver`.
    IntersectionObserver,
    /// `MutationObserver`.
    MutationObserver,
    /// `matchMedia`.
    MatchMedia,
}

impl Capability {
    /// The flag corresponding to this capability.
    pub fn flag(self) -> Capabilities {
        match self {
            Self::ResizeObserver => Capabilities::RESIZE_OBSERVER,
            Self::IntersectionObserver => Capabilities::INTERSECTION_OBSERVER,
            Self::MutationObserver => Capabilities::MUTATION_OBSERVER,
            Self::MatchMedia => Capabilities::MATCH_MEDIA,
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::ResizeObserver => "ResizeObserver",
            Self::IntersectionObserver => "IntersectionObserver",
            Self::MutationObserver => "MutationObserver",
            Self::MatchMedia => "matchMedia",
        })
    }
}

/// Local geometry and identity for an element.
#[derive(Clone, Debug)]
pub struct LocalElement {
    /// Tag name, informational only.
    pub tag: String,
    /// Local (untransformed) border box. For non-axis-aligned content, use a conservative AABB.
    pub local_bounds: Rect,
    /// Insets from the border box to the content box (padding plus border).
    pub content_insets: Insets,
    /// Local transform relative to parent space.
    pub local_transform: Affine,
    /// Z-order used by hit testing. Higher is on top.
    pub z_index: i32,
    /// Visibility and picking flags.
    pub flags: NodeFlags,
}

impl LocalElement {
    /// An element with the given tag and border box.
    pub fn new(tag: impl Into<String>, local_bounds: Rect) -> Self {
        Self {
            tag: tag.into(),
            local_bounds,
            ..Default::default()
        }
    }
}

impl Default for LocalElement {
    fn default() -> Self {
        Self {
            tag: String::from("div"),
            local_bounds: Rect::ZERO,
            content_insets: Insets::ZERO,
            local_transform: Affine::IDENTITY,
            z_index: 0,
            flags: NodeFlags::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_than_semantics() {
        let old = NodeId::new(10, 1);
        let newer_same_slot = NodeId::new(10, 2);
        let same_gen_higher_slot = NodeId::new(11, 2);
        let same_gen_lower_slot = NodeId::new(9, 2);

        assert!(newer_same_slot.is_newer_than(old));
        assert!(same_gen_higher_slot.is_newer_than(newer_same_slot));
        assert!(!same_gen_lower_slot.is_newer_than(newer_same_slot));
    }

    #[test]
    fn capability_flags_cover_every_capability() {
        let all = [
            Capability::ResizeObserver,
            Capability::IntersectionObserver,
            Capability::MutationObserver,
            Capability::MatchMedia,
        ];
        let union = all
            .iter()
            .fold(Capabilities::empty(), |acc, c| acc | c.flag());
        assert_eq!(union, Capabilities::all());
    }

    #[test]
    fn element_target_roundtrip() {
        let id = NodeId::new(3, 1);
        assert_eq!(TargetId::from(id).element(), Some(id));
        assert_eq!(TargetId::Window.element(), None);
    }
}
