// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Events, payloads, and listener types.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;

use kurbo::Point;

use crate::types::TargetId;

/// A listener callback.
///
/// Listeners are compared by identity (`Rc::ptr_eq`) when they are removed.
pub type Listener = Rc<dyn Fn(&Event)>;

/// Phases of event propagation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Not being dispatched.
    None,
    /// Window-to-target traversal, excluding the target.
    Capture,
    /// The target itself.
    Target,
    /// Target-to-window traversal, excluding the target.
    Bubble,
}

/// Options passed to [`Document::add_event_listener`](crate::Document::add_event_listener).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct ListenerOptions {
    /// Invoke during the capture phase instead of the bubble phase.
    pub capture: bool,
    /// The listener promises not to call [`Event::prevent_default`].
    pub passive: bool,
    /// Remove the listener after its first invocation.
    pub once: bool,
}

impl ListenerOptions {
    /// Passive, bubble-phase options.
    pub const PASSIVE: Self = Self {
        capture: false,
        passive: true,
        once: false,
    };
}

/// The kind of device that produced a pointer event.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum PointerType {
    /// A mouse.
    #[default]
    Mouse,
    /// A touch surface.
    Touch,
    /// A stylus.
    Pen,
}

impl PointerType {
    /// The DOM name of this pointer type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mouse => "mouse",
            Self::Touch => "touch",
            Self::Pen => "pen",
        }
    }
}

/// Pointer event payload.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerData {
    /// Position relative to the viewport.
    pub client: Point,
    /// Position relative to the document (client position plus scroll offset).
    pub page: Point,
    /// Pointer identifier.
    pub pointer_id: u32,
    /// Device kind.
    pub pointer_type: PointerType,
    /// Button that changed state: `0` primary, `1` auxiliary, `2` secondary, `-1` none.
    pub button: i16,
    /// Bitmask of buttons currently held.
    pub buttons: u16,
}

impl PointerData {
    /// A primary mouse pointer at `client`. The page position is filled in on dispatch.
    pub fn mouse(client: Point) -> Self {
        Self {
            client,
            page: client,
            pointer_id: 1,
            pointer_type: PointerType::Mouse,
            button: 0,
            buttons: 0,
        }
    }

    /// Same data with a different device kind.
    pub fn with_pointer_type(mut self, pointer_type: PointerType) -> Self {
        self.pointer_type = pointer_type;
        self
    }

    /// Same data with a different changed button.
    pub fn with_button(mut self, button: i16) -> Self {
        self.button = button;
        self
    }
}

/// The effect a drop is allowed to have, as set by drag listeners.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum DropEffect {
    /// The drop is rejected.
    #[default]
    None,
    /// The data is copied.
    Copy,
    /// The data is moved.
    Move,
    /// A link to the data is created.
    Link,
}

/// A file carried by a drag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    /// File name.
    pub name: String,
    /// MIME type.
    pub mime: String,
    /// Size in bytes.
    pub size: u64,
}

/// One item of a drag data store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataTransferItem {
    /// `"file"` or `"string"`.
    pub kind: String,
    /// MIME type.
    pub mime: String,
}

/// Drag data store shared by every event of one drag operation.
#[derive(Debug, Default)]
pub struct DataTransfer {
    /// Items being dragged.
    pub items: Vec<DataTransferItem>,
    /// Files being dragged.
    pub files: Vec<FileInfo>,
    drop_effect: Cell<DropEffect>,
}

impl DataTransfer {
    /// A store holding `files`, with one file item per file.
    pub fn with_files(files: Vec<FileInfo>) -> Self {
        let items = files
            .iter()
            .map(|f| DataTransferItem {
                kind: String::from("file"),
                mime: f.mime.clone(),
            })
            .collect();
        Self {
            items,
            files,
            drop_effect: Cell::new(DropEffect::None),
        }
    }

    /// Current drop effect.
    pub fn drop_effect(&self) -> DropEffect {
        self.drop_effect.get()
    }

    /// Set the drop effect.
    pub fn set_drop_effect(&self, effect: DropEffect) {
        self.drop_effect.set(effect);
    }

    /// MIME types of all items.
    pub fn types(&self) -> Vec<String> {
        self.items.iter().map(|i| i.mime.clone()).collect()
    }
}

/// Drag event payload.
#[derive(Clone, Debug)]
pub struct DragData {
    /// Position relative to the viewport.
    pub client: Point,
    /// Data store, absent for drags that carry nothing readable.
    pub data_transfer: Option<Rc<DataTransfer>>,
}

/// Media query list `change` payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaChange {
    /// Whether the query matches now.
    pub matches: bool,
    /// The query text.
    pub media: String,
}

/// Event payload.
#[derive(Clone, Debug)]
pub enum EventPayload {
    /// No payload (`resize`, `scroll`, custom events).
    None,
    /// Pointer, mouse and touch events.
    Pointer(PointerData),
    /// Drag and drop events.
    Drag(DragData),
    /// Media query list changes.
    MediaChange(MediaChange),
}

/// An event being dispatched.
///
/// Flags use interior mutability so listeners can cancel or stop the event
/// through a shared reference.
#[derive(Debug)]
pub struct Event {
    event_type: String,
    target: TargetId,
    bubbles: bool,
    cancelable: bool,
    payload: EventPayload,
    current_target: Cell<Option<TargetId>>,
    phase: Cell<Phase>,
    in_passive_listener: Cell<bool>,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
    immediate_propagation_stopped: Cell<bool>,
}

impl Event {
    /// A new event aimed at `target`.
    pub fn new(event_type: impl Into<String>, target: TargetId, payload: EventPayload) -> Self {
        Self {
            event_type: event_type.into(),
            target,
            bubbles: false,
            cancelable: false,
            payload,
            current_target: Cell::new(None),
            phase: Cell::new(Phase::None),
            in_passive_listener: Cell::new(false),
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
            immediate_propagation_stopped: Cell::new(false),
        }
    }

    /// Set whether the event bubbles.
    pub fn bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    /// Set whether the event can be canceled.
    pub fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    /// The event type, e.g. `"pointerdown"`.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The innermost target.
    pub fn target(&self) -> TargetId {
        self.target
    }

    /// The target whose listeners are running.
    pub fn current_target(&self) -> Option<TargetId> {
        self.current_target.get()
    }

    /// Current propagation phase.
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// Returns true if the event bubbles.
    pub fn does_bubble(&self) -> bool {
        self.bubbles
    }

    /// The payload.
    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Pointer payload, for pointer, mouse and touch events.
    pub fn pointer(&self) -> Option<&PointerData> {
        match &self.payload {
            EventPayload::Pointer(p) => Some(p),
            _ => None,
        }
    }

    /// Drag payload.
    pub fn drag(&self) -> Option<&DragData> {
        match &self.payload {
            EventPayload::Drag(d) => Some(d),
            _ => None,
        }
    }

    /// Data store of a drag event.
    pub fn data_transfer(&self) -> Option<&DataTransfer> {
        self.drag()?.data_transfer.as_deref()
    }

    /// Media query change payload.
    pub fn media_change(&self) -> Option<&MediaChange> {
        match &self.payload {
            EventPayload::MediaChange(m) => Some(m),
            _ => None,
        }
    }

    /// Cancel the default action.
    ///
    /// Ignored for non-cancelable events and inside passive listeners.
    pub fn prevent_default(&self) {
        if self.in_passive_listener.get() {
            tracing::trace!(event = %self.event_type, "prevent_default ignored in passive listener");
            return;
        }
        if self.cancelable {
            self.default_prevented.set(true);
        }
    }

    /// Returns true if a listener canceled the default action.
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Stop propagation after the current target's listeners finish.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    /// Stop propagation and skip the current target's remaining listeners.
    pub fn stop_immediate_propagation(&self) {
        self.propagation_stopped.set(true);
        self.immediate_propagation_stopped.set(true);
    }

    /// Returns true once propagation was stopped.
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    pub(crate) fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped.get()
    }

    pub(crate) fn enter(&self, target: TargetId, phase: Phase) {
        self.current_target.set(Some(target));
        self.phase.set(phase);
    }

    pub(crate) fn set_passive(&self, passive: bool) {
        self.in_passive_listener.set(passive);
    }

    pub(crate) fn finish(&self) {
        self.current_target.set(None);
        self.phase.set(Phase::None);
        self.in_passive_listener.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prevent_default_respects_cancelable_and_passive() {
        let e = Event::new("pointerdown", TargetId::Window, EventPayload::None);
        e.prevent_default();
        assert!(!e.default_prevented(), "not cancelable");

        let e = Event::new("pointerdown", TargetId::Window, EventPayload::None).cancelable(true);
        e.set_passive(true);
        e.prevent_default();
        assert!(!e.default_prevented(), "passive listener");
        e.set_passive(false);
        e.prevent_default();
        assert!(e.default_prevented());
    }

    #[test]
    fn data_transfer_types_follow_files() {
        let dt = DataTransfer::with_files(alloc::vec![FileInfo {
            name: "a.png".into(),
            mime: "image/png".into(),
            size: 3,
        }]);
        assert_eq!(dt.types(), ["image/png"]);
        assert_eq!(dt.drop_effect(), DropEffect::None);
        dt.set_drop_effect(DropEffect::Copy);
        assert_eq!(dt.drop_effect(), DropEffect::Copy);
    }
}
