// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The document: element tree, window, listeners and observers behind one handle.
//!
//! ## Re-entrancy
//!
//! [`Document`] is a cheap, cloneable handle to shared state. Listeners,
//! observer callbacks and frame callbacks are never invoked while that state is
//! borrowed, so they may freely call back into the document: add or remove
//! listeners, mutate the tree, dispatch further events.
//!
//! ## Input
//!
//! Pointer input is injected with [`Document::dispatch_pointer`] (or the
//! `pointer_*` shorthands). Each call hit tests the point, updates the hover
//! path (`pointerenter`/`pointerleave`, plus `mouseenter`/`mouseleave` for
//! mice), then dispatches the pointer event followed by its compatibility
//! event (`mouse*` for mice and pens, `touch*` for touch).
//!
//! ## Frames
//!
//! [`Document::flush`] advances one frame: it delivers queued mutation
//! records, runs animation frame callbacks, commits geometry, then delivers
//! resize and intersection entries.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::{Affine, Insets, Point, Rect, Size, Vec2};

use crate::dispatch::{plan, propagation_path};
use crate::error::DomError;
use crate::event::{
    DataTransfer, DragData, Event, EventPayload, Listener, ListenerOptions, MediaChange,
    PointerData, PointerType,
};
use crate::hover::{HoverEvent, HoverState};
use crate::listeners::ListenerRegistry;
use crate::media::{ColorScheme, MediaEnvironment, MediaQuery};
use crate::observers::{
    IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit,
    IntersectionRegistration, MutationCallback, MutationObserver, MutationRegistration,
    ResizeBox, ResizeObserver, ResizeObserverEntry, ResizeRegistration, resize_entry,
};
use crate::tree::{MutationRecord, Tree};
use crate::types::{Capabilities, Capability, LocalElement, MediaQueryId, NodeFlags, NodeId, TargetId};

/// Milliseconds added to the frame clock by every [`Document::flush`].
pub const FRAME_INTERVAL_MS: f64 = 16.0;

/// Initial window and platform settings.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentConfig {
    /// Viewport size (`innerWidth`/`innerHeight`).
    pub viewport: Size,
    /// Device pixels per CSS pixel.
    pub device_pixel_ratio: f64,
    /// Width of the vertical scrollbar, also used for the horizontal one.
    pub scrollbar_width: f64,
    /// Preferred color scheme.
    pub color_scheme: ColorScheme,
    /// Available platform features.
    pub capabilities: Capabilities,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            viewport: Size::new(1024.0, 768.0),
            device_pixel_ratio: 1.0,
            scrollbar_width: 0.0,
            color_scheme: ColorScheme::Light,
            capabilities: Capabilities::all(),
        }
    }
}

/// Handle returned by [`Document::request_animation_frame`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

/// Pointer input kinds accepted by [`Document::dispatch_pointer`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PointerAction {
    /// A button was pressed.
    Down,
    /// The pointer moved.
    Move,
    /// A button was released.
    Up,
}

/// Drag input kinds accepted by [`Document::drag`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DragAction {
    /// `dragenter`.
    Enter,
    /// `dragover`.
    Over,
    /// `dragleave`.
    Leave,
    /// `drop`.
    Drop,
}

impl DragAction {
    fn event_type(self) -> &'static str {
        match self {
            Self::Enter => "dragenter",
            Self::Over => "dragover",
            Self::Leave => "dragleave",
            Self::Drop => "drop",
        }
    }
}

type FrameCallback = Box<dyn FnOnce(f64)>;

struct MediaEntry {
    query: MediaQuery,
    matches: bool,
}

pub(crate) struct DocumentState {
    pub(crate) tree: Tree,
    pub(crate) resize: BTreeMap<u64, ResizeRegistration>,
    pub(crate) intersection: BTreeMap<u64, IntersectionRegistration>,
    pub(crate) mutation: BTreeMap<u64, MutationRegistration>,
    config: DocumentConfig,
    listeners: ListenerRegistry,
    hover: HoverState<NodeId>,
    buttons: u16,
    last_pointer: Option<PointerData>,
    scroll: Vec2,
    media: BTreeMap<MediaQueryId, MediaEntry>,
    next_media: u32,
    frames: Vec<(FrameId, FrameCallback)>,
    next_frame: u64,
    time: f64,
    next_observer: u64,
}

impl DocumentState {
    fn environment(&self) -> MediaEnvironment {
        MediaEnvironment {
            width: self.config.viewport.width,
            height: self.config.viewport.height,
            color_scheme: self.config.color_scheme,
        }
    }

    /// Hand fresh tree mutation records to interested mutation observers.
    fn route_mutations(&mut self) {
        let records = self.tree.take_mutations();
        if records.is_empty() {
            return;
        }
        let tree = &self.tree;
        for reg in self.mutation.values_mut() {
            for record in &records {
                reg.route(tree, record);
            }
        }
    }

    /// Drop everything that refers to removed elements.
    fn forget(&mut self, removed: &[NodeId]) {
        for &id in removed {
            self.listeners.remove_target(TargetId::Element(id));
        }
        if let Some(&first) = removed.first() {
            self.hover.truncate_at(first);
        }
        for reg in self.resize.values_mut() {
            reg.forget(removed);
        }
        for reg in self.intersection.values_mut() {
            reg.forget(removed);
        }
        for reg in self.mutation.values_mut() {
            reg.forget(removed);
        }
    }

    fn client_rect(&mut self, id: NodeId) -> Result<Rect, DomError> {
        self.tree.commit();
        let world = self.tree.world_bounds(id).ok_or(DomError::StaleNode(id))?;
        Ok(world - self.scroll)
    }

    fn media_changes(&mut self) -> Vec<(MediaQueryId, MediaChange)> {
        let env = self.environment();
        let mut out = Vec::new();
        for (id, entry) in &mut self.media {
            let matches = entry.query.evaluate(&env);
            if matches != entry.matches {
                entry.matches = matches;
                out.push((
                    *id,
                    MediaChange {
                        matches,
                        media: entry.query.text().into(),
                    },
                ));
            }
        }
        out
    }

    fn require(&self, capability: Capability) -> Result<(), DomError> {
        if self.config.capabilities.contains(capability.flag()) {
            Ok(())
        } else {
            Err(DomError::Unsupported(capability))
        }
    }
}

/// A headless document with a single window.
///
/// Cloning the handle shares the document.
#[derive(Clone)]
pub struct Document {
    pub(crate) state: Rc<RefCell<DocumentState>>,
}

impl core::fmt::Debug for Document {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.state.try_borrow() {
            Ok(st) => f
                .debug_struct("Document")
                .field("tree", &st.tree)
                .field("listeners", &st.listeners)
                .field("viewport", &st.config.viewport)
                .field("scroll", &st.scroll)
                .finish_non_exhaustive(),
            Err(_) => f.write_str("Document { <borrowed> }"),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DocumentConfig::default())
    }
}

/// A non-owning [`Document`] handle.
#[derive(Clone, Debug)]
pub struct WeakDocument {
    state: Weak<RefCell<DocumentState>>,
}

impl WeakDocument {
    /// The document, if it is still alive.
    pub fn upgrade(&self) -> Option<Document> {
        self.state.upgrade().map(|state| Document { state })
    }
}

impl Document {
    /// Create an empty document.
    pub fn new(config: DocumentConfig) -> Self {
        let state = DocumentState {
            tree: Tree::new(),
            resize: BTreeMap::new(),
            intersection: BTreeMap::new(),
            mutation: BTreeMap::new(),
            config,
            listeners: ListenerRegistry::default(),
            hover: HoverState::new(),
            buttons: 0,
            last_pointer: None,
            scroll: Vec2::ZERO,
            media: BTreeMap::new(),
            next_media: 0,
            frames: Vec::new(),
            next_frame: 0,
            time: 0.0,
            next_observer: 0,
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// A weak handle to this document.
    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument {
            state: Rc::downgrade(&self.state),
        }
    }

    /// Returns true if both handles refer to the same document.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Returns true if the document provides `capability`.
    pub fn supports(&self, capability: Capability) -> bool {
        self.state.borrow().require(capability).is_ok()
    }

    /// Read the element tree. `f` must not call back into the document.
    pub fn with_tree<R>(&self, f: impl FnOnce(&Tree) -> R) -> R {
        f(&self.state.borrow().tree)
    }

    // --- tree ---

    fn mutate<R>(&self, f: impl FnOnce(&mut Tree) -> Result<R, DomError>) -> Result<R, DomError> {
        let mut st = self.state.borrow_mut();
        let out = f(&mut st.tree)?;
        st.route_mutations();
        Ok(out)
    }

    /// Insert an element under `parent` (or as a root).
    pub fn insert(&self, parent: Option<NodeId>, local: LocalElement) -> Result<NodeId, DomError> {
        self.mutate(|tree| tree.insert(parent, local))
    }

    /// Remove an element and its subtree, with their listeners and observations.
    pub fn remove(&self, id: NodeId) -> Result<(), DomError> {
        let removed = self.mutate(|tree| tree.remove(id))?;
        tracing::debug!(?id, count = removed.len(), "removed elements");
        self.state.borrow_mut().forget(&removed);
        Ok(())
    }

    /// Move an element under `parent` (or make it a root).
    pub fn reparent(&self, id: NodeId, parent: Option<NodeId>) -> Result<(), DomError> {
        self.mutate(|tree| tree.reparent(id, parent))
    }

    /// Update an element's border box in parent space.
    pub fn set_local_bounds(&self, id: NodeId, bounds: Rect) -> Result<(), DomError> {
        self.mutate(|tree| tree.set_local_bounds(id, bounds))
    }

    /// Update an element's padding plus border.
    pub fn set_content_insets(&self, id: NodeId, insets: Insets) -> Result<(), DomError> {
        self.mutate(|tree| tree.set_content_insets(id, insets))
    }

    /// Update an element's local transform.
    pub fn set_local_transform(&self, id: NodeId, transform: Affine) -> Result<(), DomError> {
        self.mutate(|tree| tree.set_local_transform(id, transform))
    }

    /// Update an element's z-index.
    pub fn set_z_index(&self, id: NodeId, z: i32) -> Result<(), DomError> {
        self.mutate(|tree| tree.set_z_index(id, z))
    }

    /// Update an element's flags.
    pub fn set_flags(&self, id: NodeId, flags: NodeFlags) -> Result<(), DomError> {
        self.mutate(|tree| tree.set_flags(id, flags))
    }

    /// Set (`Some`) or remove (`None`) an attribute.
    pub fn set_attribute(&self, id: NodeId, name: &str, value: Option<&str>) -> Result<(), DomError> {
        self.mutate(|tree| tree.set_attribute(id, name, value))
    }

    /// Current value of an attribute.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.state.borrow().tree.attribute(id, name).map(String::from)
    }

    /// Returns true if `id` refers to a live element.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.state.borrow().tree.is_alive(id)
    }

    /// Returns true if `node` is `ancestor` or one of its descendants.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.state.borrow().tree.contains(ancestor, node)
    }

    // --- geometry and window ---

    /// Border box of `id` in viewport coordinates.
    pub fn bounding_client_rect(&self, id: NodeId) -> Result<Rect, DomError> {
        self.state.borrow_mut().client_rect(id)
    }

    /// Current size of one of `id`'s boxes.
    pub fn box_size(&self, id: NodeId, observed_box: ResizeBox) -> Result<Size, DomError> {
        let st = self.state.borrow();
        let local = st.tree.local(id).ok_or(DomError::StaleNode(id))?;
        Ok(resize_entry(id, local, st.config.device_pixel_ratio).size(observed_box))
    }

    /// Viewport size including scrollbars (`innerWidth`/`innerHeight`).
    pub fn inner_size(&self) -> Size {
        self.state.borrow().config.viewport
    }

    /// Viewport size excluding scrollbars (`clientWidth`/`clientHeight` of the root).
    pub fn client_size(&self) -> Size {
        let st = self.state.borrow();
        let bar = st.config.scrollbar_width;
        let v = st.config.viewport;
        Size::new((v.width - bar).max(0.0), (v.height - bar).max(0.0))
    }

    /// Current window scroll offset.
    pub fn scroll_offset(&self) -> Point {
        self.state.borrow().scroll.to_point()
    }

    /// Device pixels per CSS pixel.
    pub fn device_pixel_ratio(&self) -> f64 {
        self.state.borrow().config.device_pixel_ratio
    }

    /// Preferred color scheme.
    pub fn color_scheme(&self) -> ColorScheme {
        self.state.borrow().config.color_scheme
    }

    /// Resize the viewport.
    ///
    /// Fires `resize` on the window, then `change` on every media query list
    /// whose result changed.
    pub fn set_viewport(&self, size: Size) {
        {
            let mut st = self.state.borrow_mut();
            if st.config.viewport == size {
                return;
            }
            st.config.viewport = size;
        }
        tracing::debug!(width = size.width, height = size.height, "viewport resized");
        self.dispatch_event(&Event::new("resize", TargetId::Window, EventPayload::None));
        self.refresh_media();
    }

    /// Change the preferred color scheme, firing media query `change` events.
    pub fn set_color_scheme(&self, scheme: ColorScheme) {
        self.state.borrow_mut().config.color_scheme = scheme;
        self.refresh_media();
    }

    /// Change the device pixel ratio. Observed device pixel boxes report on the next flush.
    pub fn set_device_pixel_ratio(&self, ratio: f64) {
        self.state.borrow_mut().config.device_pixel_ratio = ratio;
    }

    /// Scroll the window, firing `scroll` at the document.
    pub fn scroll_to(&self, offset: Point) {
        {
            let mut st = self.state.borrow_mut();
            if st.scroll == offset.to_vec2() {
                return;
            }
            st.scroll = offset.to_vec2();
        }
        self.dispatch_event(&Event::new("scroll", TargetId::Document, EventPayload::None).bubbles(true));
    }

    fn refresh_media(&self) {
        let changes = self.state.borrow_mut().media_changes();
        for (id, change) in changes {
            tracing::debug!(media = %change.media, matches = change.matches, "media query changed");
            self.dispatch_event(&Event::new(
                "change",
                TargetId::MediaQuery(id),
                EventPayload::MediaChange(change),
            ));
        }
    }

    /// Evaluate a media query and keep it live.
    ///
    /// The returned list fires `change` at [`MediaQueryList::target`] whenever
    /// its result flips. Dropping the last clone releases it along with its
    /// listeners.
    pub fn match_media(&self, query: &str) -> Result<MediaQueryList, DomError> {
        let mut st = self.state.borrow_mut();
        st.require(Capability::MatchMedia)?;
        let parsed = MediaQuery::parse(query).inspect_err(|_| {
            tracing::warn!(query, "rejected media query");
        })?;
        let matches = parsed.evaluate(&st.environment());
        let id = MediaQueryId(st.next_media);
        st.next_media += 1;
        st.media.insert(
            id,
            MediaEntry {
                query: parsed,
                matches,
            },
        );
        Ok(MediaQueryList {
            inner: Rc::new(MediaQueryListInner {
                doc: self.downgrade(),
                id,
                media: query.into(),
            }),
        })
    }

    // --- listeners ---

    /// Register `listener` for `event_type` on `target`.
    ///
    /// Returns false if the same listener is already registered there with the
    /// same `capture` flag.
    pub fn add_event_listener(
        &self,
        target: TargetId,
        event_type: &str,
        listener: Listener,
        options: ListenerOptions,
    ) -> bool {
        self.state
            .borrow_mut()
            .listeners
            .add(target, event_type, listener, options)
    }

    /// Remove a listener. Matches on listener identity and `capture`.
    pub fn remove_event_listener(
        &self,
        target: TargetId,
        event_type: &str,
        listener: &Listener,
        capture: bool,
    ) -> bool {
        self.state
            .borrow_mut()
            .listeners
            .remove(target, event_type, listener, capture)
    }

    /// Number of listeners registered for `event_type` on `target`.
    pub fn listener_count(&self, target: TargetId, event_type: &str) -> usize {
        self.state.borrow().listeners.count(target, event_type)
    }

    /// Number of listeners registered anywhere.
    pub fn total_listeners(&self) -> usize {
        self.state.borrow().listeners.total()
    }

    /// Dispatch `event` along its propagation path.
    ///
    /// Returns false if a listener canceled the default action.
    pub fn dispatch_event(&self, event: &Event) -> bool {
        let steps = {
            let st = self.state.borrow();
            plan(&propagation_path(&st.tree, event.target()), event.does_bubble())
        };
        tracing::trace!(
            event = event.event_type(),
            target = ?event.target(),
            steps = steps.len(),
            "dispatch"
        );
        for step in steps {
            if event.propagation_stopped() {
                break;
            }
            event.enter(step.target, step.phase);
            let invocations = self.state.borrow().listeners.invocations(
                step.target,
                event.event_type(),
                step.phase,
            );
            for inv in invocations {
                if inv.removed.get() {
                    continue;
                }
                if inv.options.once {
                    self.state.borrow_mut().listeners.remove_by_flag(&inv.removed);
                }
                event.set_passive(inv.options.passive);
                (inv.listener)(event);
                event.set_passive(false);
                if event.immediate_propagation_stopped() {
                    break;
                }
            }
        }
        event.finish();
        !event.default_prevented()
    }

    // --- input ---

    /// Inject pointer input at `data.client`.
    ///
    /// Fills in `page`, `buttons` (and `button = -1` for moves) before
    /// dispatching. The target is the topmost pickable element under the
    /// pointer, or the document. Returns false if either the pointer event or
    /// its compatibility event was canceled.
    pub fn dispatch_pointer(&self, action: PointerAction, mut data: PointerData) -> bool {
        let (target, path) = {
            let mut guard = self.state.borrow_mut();
            let st = &mut *guard;
            st.tree.commit();
            data.page = data.client + st.scroll;
            let mask = button_mask(data.button);
            match action {
                PointerAction::Down => st.buttons |= mask,
                PointerAction::Up => st.buttons &= !mask,
                PointerAction::Move => data.button = -1,
            }
            data.buttons = st.buttons;
            st.last_pointer = Some(data.clone());
            match st.tree.hit_test_point(data.page) {
                Some(hit) => (TargetId::Element(hit.node), hit.path),
                None => (TargetId::Document, Vec::new()),
            }
        };
        if action != PointerAction::Up {
            self.update_hover(&path, &data);
        }

        let (pointer_type, compat_type) = match (action, data.pointer_type) {
            (PointerAction::Down, PointerType::Touch) => ("pointerdown", "touchstart"),
            (PointerAction::Move, PointerType::Touch) => ("pointermove", "touchmove"),
            (PointerAction::Up, PointerType::Touch) => ("pointerup", "touchend"),
            (PointerAction::Down, _) => ("pointerdown", "mousedown"),
            (PointerAction::Move, _) => ("pointermove", "mousemove"),
            (PointerAction::Up, _) => ("pointerup", "mouseup"),
        };
        let pointer = Event::new(pointer_type, target, EventPayload::Pointer(data.clone()))
            .bubbles(true)
            .cancelable(true);
        let pointer_allowed = self.dispatch_event(&pointer);
        let compat = Event::new(compat_type, target, EventPayload::Pointer(data))
            .bubbles(true)
            .cancelable(true);
        let compat_allowed = self.dispatch_event(&compat);
        pointer_allowed && compat_allowed
    }

    /// Primary mouse button pressed at `client`.
    pub fn pointer_down(&self, client: Point) -> bool {
        self.dispatch_pointer(PointerAction::Down, PointerData::mouse(client))
    }

    /// Mouse moved to `client`.
    pub fn pointer_move(&self, client: Point) -> bool {
        self.dispatch_pointer(PointerAction::Move, PointerData::mouse(client))
    }

    /// Primary mouse button released at `client`.
    pub fn pointer_up(&self, client: Point) -> bool {
        self.dispatch_pointer(PointerAction::Up, PointerData::mouse(client))
    }

    /// The pointer left the window.
    ///
    /// Leaves every hovered element, then fires `pointerleave` and
    /// `mouseleave` at the document.
    pub fn pointer_exit(&self) {
        let (transitions, data) = {
            let mut st = self.state.borrow_mut();
            let data = st
                .last_pointer
                .clone()
                .unwrap_or_else(|| PointerData::mouse(Point::ZERO));
            (st.hover.clear(), data)
        };
        self.fire_hover(transitions, &data);
        for name in ["pointerleave", "mouseleave"] {
            self.dispatch_event(&Event::new(
                name,
                TargetId::Document,
                EventPayload::Pointer(data.clone()),
            ));
        }
    }

    fn update_hover(&self, path: &[NodeId], data: &PointerData) {
        let transitions = self.state.borrow_mut().hover.update_path(path);
        self.fire_hover(transitions, data);
    }

    fn fire_hover(&self, transitions: Vec<HoverEvent<NodeId>>, data: &PointerData) {
        for transition in transitions {
            let (node, pointer_type, mouse_type) = match transition {
                HoverEvent::Enter(n) => (n, "pointerenter", "mouseenter"),
                HoverEvent::Leave(n) => (n, "pointerleave", "mouseleave"),
            };
            let payload = EventPayload::Pointer(data.clone());
            self.dispatch_event(&Event::new(pointer_type, TargetId::Element(node), payload));
            if data.pointer_type == PointerType::Mouse {
                let payload = EventPayload::Pointer(data.clone());
                self.dispatch_event(&Event::new(mouse_type, TargetId::Element(node), payload));
            }
        }
    }

    /// Inject a drag event at `client`, aimed at the topmost pickable element
    /// there (or the document).
    ///
    /// Every drag event bubbles; all but `dragleave` are cancelable. Returns
    /// false if a listener canceled it.
    pub fn drag(
        &self,
        action: DragAction,
        client: Point,
        data_transfer: Option<Rc<DataTransfer>>,
    ) -> bool {
        let target = {
            let mut guard = self.state.borrow_mut();
            let st = &mut *guard;
            st.tree.commit();
            st.tree
                .hit_test_point(client + st.scroll)
                .map(|hit| TargetId::Element(hit.node))
                .unwrap_or(TargetId::Document)
        };
        let event = Event::new(
            action.event_type(),
            target,
            EventPayload::Drag(DragData {
                client,
                data_transfer,
            }),
        )
        .bubbles(true)
        .cancelable(action != DragAction::Leave);
        self.dispatch_event(&event)
    }

    // --- frames ---

    /// Run `f` with the frame time on the next [`flush`](Self::flush).
    pub fn request_animation_frame(&self, f: impl FnOnce(f64) + 'static) -> FrameId {
        let mut st = self.state.borrow_mut();
        let id = FrameId(st.next_frame);
        st.next_frame += 1;
        st.frames.push((id, Box::new(f)));
        id
    }

    /// Cancel a pending frame callback.
    pub fn cancel_animation_frame(&self, id: FrameId) {
        let canceled = {
            let mut st = self.state.borrow_mut();
            st.frames
                .iter()
                .position(|(f, _)| *f == id)
                .map(|pos| st.frames.remove(pos))
        };
        drop(canceled);
    }

    /// Frame clock in milliseconds.
    pub fn now(&self) -> f64 {
        self.state.borrow().time
    }

    // --- observers ---

    fn next_observer(&self, capability: Capability) -> Result<(u64, WeakDocument), DomError> {
        let mut st = self.state.borrow_mut();
        st.require(capability)?;
        let id = st.next_observer;
        st.next_observer += 1;
        tracing::debug!(%capability, id, "observer created");
        Ok((id, self.downgrade()))
    }

    /// Create a resize observer. Fails if resize observation is unsupported.
    pub fn resize_observer(
        &self,
        callback: impl Fn(&[ResizeObserverEntry]) + 'static,
    ) -> Result<ResizeObserver, DomError> {
        let (id, weak) = self.next_observer(Capability::ResizeObserver)?;
        self.state
            .borrow_mut()
            .resize
            .insert(id, ResizeRegistration::new(Rc::new(callback)));
        Ok(ResizeObserver::new(weak, id))
    }

    /// Create an intersection observer. Fails if intersection observation is unsupported.
    pub fn intersection_observer(
        &self,
        init: IntersectionObserverInit,
        callback: impl Fn(&[IntersectionObserverEntry]) + 'static,
    ) -> Result<IntersectionObserver, DomError> {
        let (id, weak) = self.next_observer(Capability::IntersectionObserver)?;
        self.state
            .borrow_mut()
            .intersection
            .insert(id, IntersectionRegistration::new(Rc::new(callback), init));
        Ok(IntersectionObserver::new(weak, id))
    }

    /// Create a mutation observer. Fails if mutation observation is unsupported.
    pub fn mutation_observer(
        &self,
        callback: impl Fn(&[MutationRecord]) + 'static,
    ) -> Result<MutationObserver, DomError> {
        let (id, weak) = self.next_observer(Capability::MutationObserver)?;
        self.state
            .borrow_mut()
            .mutation
            .insert(id, MutationRegistration::new(Rc::new(callback)));
        Ok(MutationObserver::new(weak, id))
    }

    /// Advance one frame.
    pub fn flush(&self) {
        let mutations: Vec<(MutationCallback, Vec<MutationRecord>)> = {
            let mut st = self.state.borrow_mut();
            st.route_mutations();
            st.mutation
                .values_mut()
                .filter(|reg| !reg.pending.is_empty())
                .map(|reg| (reg.callback.clone(), core::mem::take(&mut reg.pending)))
                .collect()
        };
        for (callback, records) in mutations {
            tracing::trace!(count = records.len(), "deliver mutation records");
            callback(&records);
        }

        let (time, frames) = {
            let mut st = self.state.borrow_mut();
            st.time += FRAME_INTERVAL_MS;
            (st.time, core::mem::take(&mut st.frames))
        };
        for (_, frame) in frames {
            frame(time);
        }

        let resizes = {
            let mut guard = self.state.borrow_mut();
            let st = &mut *guard;
            st.tree.commit();
            let tree = &st.tree;
            let dpr = st.config.device_pixel_ratio;
            let mut out = Vec::new();
            for reg in st.resize.values_mut() {
                let entries = reg.gather(tree, dpr);
                if !entries.is_empty() {
                    out.push((reg.callback.clone(), entries));
                }
            }
            out
        };
        for (callback, entries) in resizes {
            tracing::trace!(count = entries.len(), "deliver resize entries");
            callback(&entries);
        }

        let intersections = {
            let mut guard = self.state.borrow_mut();
            let st = &mut *guard;
            st.tree.commit();
            let tree = &st.tree;
            let viewport = Rect::from_origin_size(Point::ZERO, st.config.viewport);
            let (scroll, time) = (st.scroll, st.time);
            let mut out = Vec::new();
            for reg in st.intersection.values_mut() {
                let entries = reg.gather(tree, viewport, scroll, time);
                if !entries.is_empty() {
                    out.push((reg.callback.clone(), entries));
                }
            }
            out
        };
        for (callback, entries) in intersections {
            tracing::trace!(count = entries.len(), "deliver intersection entries");
            callback(&entries);
        }
    }
}

fn button_mask(button: i16) -> u16 {
    match button {
        0 => 1,
        1 => 4,
        2 => 2,
        3 => 8,
        4 => 16,
        _ => 0,
    }
}

struct MediaQueryListInner {
    doc: WeakDocument,
    id: MediaQueryId,
    media: String,
}

impl Drop for MediaQueryListInner {
    fn drop(&mut self) {
        let Some(doc) = self.doc.upgrade() else {
            return;
        };
        if let Ok(mut st) = doc.state.try_borrow_mut() {
            st.media.remove(&self.id);
            st.listeners.remove_target(TargetId::MediaQuery(self.id));
        }
    }
}

/// A live media query created by [`Document::match_media`].
#[derive(Clone)]
pub struct MediaQueryList {
    inner: Rc<MediaQueryListInner>,
}

impl core::fmt::Debug for MediaQueryList {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MediaQueryList")
            .field("media", &self.inner.media)
            .field("matches", &self.matches())
            .finish()
    }
}

impl MediaQueryList {
    /// Whether the query currently matches.
    pub fn matches(&self) -> bool {
        self.inner
            .doc
            .upgrade()
            .and_then(|doc| {
                doc.state
                    .try_borrow()
                    .ok()
                    .and_then(|st| st.media.get(&self.inner.id).map(|e| e.matches))
            })
            .unwrap_or(false)
    }

    /// The query text.
    pub fn media(&self) -> &str {
        &self.inner.media
    }

    /// Event target receiving `change` events.
    pub fn target(&self) -> TargetId {
        TargetId::MediaQuery(self.inner.id)
    }
}
