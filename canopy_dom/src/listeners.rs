// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Listener registry keyed by target and event type.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;

use crate::event::{Listener, ListenerOptions, Phase};
use crate::types::TargetId;

/// A listener snapshot taken before invocation.
///
/// The `removed` flag is shared with the registry so a listener removed while
/// an event is in flight is skipped.
pub(crate) struct Invocation {
    pub(crate) listener: Listener,
    pub(crate) options: ListenerOptions,
    pub(crate) removed: Rc<Cell<bool>>,
}

struct Registration {
    target: TargetId,
    event_type: String,
    listener: Listener,
    options: ListenerOptions,
    removed: Rc<Cell<bool>>,
}

impl Registration {
    fn matches(&self, target: TargetId, event_type: &str, listener: &Listener, capture: bool) -> bool {
        self.target == target
            && self.event_type == event_type
            && self.options.capture == capture
            && Rc::ptr_eq(&self.listener, listener)
    }
}

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    entries: Vec<Registration>,
}

impl core::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("registrations", &self.entries.len())
            .finish()
    }
}

impl ListenerRegistry {
    /// Returns false when an identical registration (same listener and `capture`) exists.
    pub(crate) fn add(
        &mut self,
        target: TargetId,
        event_type: &str,
        listener: Listener,
        options: ListenerOptions,
    ) -> bool {
        if self
            .entries
            .iter()
            .any(|r| r.matches(target, event_type, &listener, options.capture))
        {
            return false;
        }
        self.entries.push(Registration {
            target,
            event_type: event_type.into(),
            listener,
            options,
            removed: Rc::new(Cell::new(false)),
        });
        true
    }

    pub(crate) fn remove(
        &mut self,
        target: TargetId,
        event_type: &str,
        listener: &Listener,
        capture: bool,
    ) -> bool {
        let Some(pos) = self
            .entries
            .iter()
            .position(|r| r.matches(target, event_type, listener, capture))
        else {
            return false;
        };
        let r = self.entries.remove(pos);
        r.removed.set(true);
        true
    }

    /// Remove the registration owning `removed`, if it is still present.
    pub(crate) fn remove_by_flag(&mut self, removed: &Rc<Cell<bool>>) {
        removed.set(true);
        self.entries.retain(|r| !Rc::ptr_eq(&r.removed, removed));
    }

    /// Drop every registration on `target`.
    pub(crate) fn remove_target(&mut self, target: TargetId) {
        self.entries.retain(|r| {
            if r.target == target {
                r.removed.set(true);
                false
            } else {
                true
            }
        });
    }

    pub(crate) fn count(&self, target: TargetId, event_type: &str) -> usize {
        self.entries
            .iter()
            .filter(|r| r.target == target && r.event_type == event_type)
            .count()
    }

    pub(crate) fn total(&self) -> usize {
        self.entries.len()
    }

    /// Listeners to run on `target` during `phase`, in invocation order.
    ///
    /// At the target, capture listeners run before non-capture listeners.
    pub(crate) fn invocations(
        &self,
        target: TargetId,
        event_type: &str,
        phase: Phase,
    ) -> Vec<Invocation> {
        let passes: &[bool] = match phase {
            Phase::Capture => &[true],
            Phase::Bubble => &[false],
            Phase::Target => &[true, false],
            Phase::None => &[],
        };
        let mut out = Vec::new();
        for &capture in passes {
            for r in &self.entries {
                if r.target == target && r.event_type == event_type && r.options.capture == capture
                {
                    out.push(Invocation {
                        listener: r.listener.clone(),
                        options: r.options,
                        removed: r.removed.clone(),
                    });
                }
            }
        }
        out
    }
}
