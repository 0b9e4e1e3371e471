// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Listener binding that follows its target.
//!
//! This example binds one listener to whatever a `TargetRef` points at, moves
//! the ref between two buttons, and shows that exactly one registration
//! exists at a time. It then watches the window through `use_window_size` and
//! `use_media_query`.
//!
//! Run:
//! - `cargo run -p canopy_demos --example event_binding`

use std::cell::RefCell;
use std::rc::Rc;

use canopy_dom::{Document, Event, ListenerOptions, LocalElement, TargetId};
use canopy_hooks::{
    Component, Env, Listeners, TargetRef, UseMediaQueryOptions, UseWindowSizeOptions,
    use_event_listener, use_media_query, use_window_size,
};
use kurbo::{Point, Rect, Size};

fn main() {
    let doc = Document::default();
    let ok = doc
        .insert(None, LocalElement::new("ok", Rect::new(0.0, 0.0, 100.0, 30.0)))
        .unwrap();
    let cancel = doc
        .insert(None, LocalElement::new("cancel", Rect::new(120.0, 0.0, 220.0, 30.0)))
        .unwrap();

    let clicks = Rc::new(RefCell::new(Vec::new()));
    let focused = TargetRef::new();
    let component = Component::mount(Env::new(doc.clone()), {
        let (clicks, focused) = (clicks.clone(), focused.clone());
        move |cx| {
            let clicks = clicks.clone();
            use_event_listener(
                cx,
                Some((&focused).into()),
                "pointerdown",
                Listeners::from_fn(move |e: &Event| clicks.borrow_mut().push(e.target())),
                ListenerOptions::PASSIVE,
            )
        }
    });

    println!("== Ref unset ==");
    doc.pointer_down(Point::new(10.0, 10.0));
    println!("  registrations: {}", doc.total_listeners());

    println!("== Ref on `ok` ==");
    focused.set(Some(ok));
    doc.pointer_down(Point::new(10.0, 10.0));
    doc.pointer_down(Point::new(130.0, 10.0));
    println!("  registrations: {}", doc.total_listeners());

    println!("== Ref on `cancel` ==");
    focused.set(Some(cancel));
    doc.pointer_down(Point::new(10.0, 10.0));
    doc.pointer_down(Point::new(130.0, 10.0));
    println!("  registrations: {}", doc.total_listeners());
    println!("  clicks: {:?}", clicks.borrow());
    assert_eq!(
        *clicks.borrow(),
        [TargetId::Element(ok), TargetId::Element(cancel)]
    );

    component.output().unbind();
    assert_eq!(doc.total_listeners(), 0);
    drop(component);

    println!("== Window ==");
    let window = Component::mount(Env::new(doc.clone()), |cx| {
        let size = use_window_size(cx, UseWindowSizeOptions::default());
        let wide = use_media_query(cx, "(min-width: 800px)", UseMediaQueryOptions::default());
        (size, wide)
    });
    let (size, wide) = window.output().clone();
    for viewport in [Size::new(1024.0, 768.0), Size::new(600.0, 900.0)] {
        doc.set_viewport(viewport);
        println!(
            "  {}x{} wide={}",
            size.width.get(),
            size.height.get(),
            wide.get()
        );
    }
    assert!(!wide.get());
}
