// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use canopy_dom::{Capability, Document};

/// The platform a component is mounted into.
///
/// Hooks never reach for a global window. They read the document from the
/// environment their component was mounted with; a headless environment (no
/// document) turns every subscription into a no-op and every capability
/// check into "unsupported".
#[derive(Clone, Debug, Default)]
pub struct Env {
    document: Option<Document>,
}

impl Env {
    /// An environment backed by `document`.
    pub fn new(document: Document) -> Self {
        Self {
            document: Some(document),
        }
    }

    /// An environment with no document, as when rendering off-screen.
    pub fn headless() -> Self {
        Self { document: None }
    }

    /// The document, if any.
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Returns true if there is a document and it exposes `capability`.
    pub fn supports(&self, capability: Capability) -> bool {
        self.document
            .as_ref()
            .is_some_and(|doc| doc.supports(capability))
    }
}
