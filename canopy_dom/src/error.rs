// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;

use crate::types::{Capability, NodeId};

/// Errors returned by fallible document operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// The node was removed, or never belonged to this document.
    #[error("stale node id {0:?}")]
    StaleNode(NodeId),
    /// The document was configured without this capability.
    #[error("{0} is not supported by this document")]
    Unsupported(Capability),
    /// A media query string could not be parsed.
    #[error("invalid media query: {0:?}")]
    InvalidMediaQuery(String),
    /// A mutation observer was asked to observe neither child lists nor attributes.
    #[error("mutation observer init must request child_list or attributes")]
    InvalidObserverInit,
    /// Reparenting would make a node its own ancestor.
    #[error("cannot move {0:?} under its own descendant")]
    HierarchyCycle(NodeId),
}
