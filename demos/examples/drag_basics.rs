// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dragging a card inside a container.
//!
//! This example drives `use_draggable` with synthetic pointer input and prints
//! the reactive position and style as they change.
//!
//! Run:
//! - `cargo run -p canopy_demos --example drag_basics`

use std::rc::Rc;

use canopy_dom::{Document, Event, LocalElement};
use canopy_hooks::{Axis, Component, DragCallback, Env, UseDraggableOptions, use_draggable};
use canopy_reactive::{Effect, Observable, Scope};
use kurbo::{Point, Rect};

fn main() {
    let doc = Document::default();
    let board = doc
        .insert(None, LocalElement::new("board", Rect::new(0.0, 0.0, 300.0, 200.0)))
        .unwrap();
    let card = doc
        .insert(Some(board), LocalElement::new("card", Rect::new(0.0, 0.0, 80.0, 40.0)))
        .unwrap();

    let on_end: DragCallback = Rc::new(|p: Point, e: &Event| {
        println!("  drag ended at ({}, {}) via {}", p.x, p.y, e.event_type());
    });
    let axis = Observable::new(Axis::Both);
    let options = Rc::new(UseDraggableOptions {
        container_element: Some(board.into()),
        axis: axis.clone().into(),
        on_end: Some(on_end).into(),
        ..UseDraggableOptions::default()
    });
    let component = Component::mount(Env::new(doc.clone()), move |cx| {
        use_draggable(cx, card.into(), options.clone())
    });
    let drag = component.output().clone();

    // The hook only reports a position; laying the card out there is up to us.
    let layout = Scope::new();
    layout.run(|| {
        let (doc, position, style) = (doc.clone(), drag.position.clone(), drag.style.clone());
        Effect::new(move || {
            let bounds = Rect::from_origin_size(position.get(), (80.0, 40.0));
            doc.set_local_bounds(card, bounds).unwrap();
            println!("  style: {}", style.get());
        });
    });

    println!("== Free drag ==");
    doc.pointer_down(Point::new(10.0, 10.0));
    doc.pointer_move(Point::new(60.0, 80.0));
    doc.pointer_up(Point::new(60.0, 80.0));
    assert_eq!(drag.position.get(), Point::new(50.0, 70.0));

    println!("== Clamped to the board ==");
    doc.pointer_down(Point::new(60.0, 80.0));
    doc.pointer_move(Point::new(900.0, 80.0));
    doc.pointer_up(Point::new(900.0, 80.0));
    assert_eq!(drag.x.get(), 220.0);

    println!("== Horizontal only ==");
    axis.set(Axis::X);
    doc.pointer_down(Point::new(230.0, 80.0));
    doc.pointer_move(Point::new(130.0, 10.0));
    doc.pointer_up(Point::new(130.0, 10.0));
    assert_eq!(drag.position.get(), Point::new(120.0, 70.0));

    layout.dispose();
}
