//! Leptos DragDrop Utilities
//!
//! Pointer-driven drag and drop for trees rendered outside of Leptos views.
//! Listeners are delegated on the document: a node is any element carrying
//! `data-structr-id`, a pseudo target any element carrying `data-drop-target`.
//! Uses a movement threshold to distinguish click from drag.

use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

/// Attribute naming the entity an element renders
pub const ID_ATTRIBUTE: &str = "data-structr-id";
/// Attribute naming a pseudo target such as `root` or `favorites`
pub const PSEUDO_ATTRIBUTE: &str = "data-drop-target";

/// Movement threshold in pixels to start dragging
const DRAG_THRESHOLD_PX: i32 = 5;

/// Share of a node header, at top and bottom, that means "insert as sibling"
const EDGE_FRACTION: f64 = 0.25;

/// Drop target types
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropTarget {
    /// Drop on a node (become child)
    Item(String),
    /// Drop on the upper or lower edge of a node (become sibling)
    Zone { reference: String, after: bool },
    /// Drop on a pseudo target
    Pseudo(String),
}

/// DnD state signals
#[derive(Clone, Copy)]
pub struct DndSignals {
    pub dragging_id_read: ReadSignal<Option<String>>,
    pub dragging_id_write: WriteSignal<Option<String>>,
    pub drop_target_read: ReadSignal<Option<DropTarget>>,
    pub drop_target_write: WriteSignal<Option<DropTarget>>,
    /// Set for a moment after a drag so the trailing click is ignored
    pub drag_just_ended_read: ReadSignal<bool>,
    pub drag_just_ended_write: WriteSignal<bool>,
    /// Pending node id (mousedown but not yet dragging)
    pub pending_id_read: ReadSignal<Option<String>>,
    pub pending_id_write: WriteSignal<Option<String>>,
    /// Start position for movement detection
    pub start_x_read: ReadSignal<i32>,
    pub start_x_write: WriteSignal<i32>,
    pub start_y_read: ReadSignal<i32>,
    pub start_y_write: WriteSignal<i32>,
}

pub fn create_dnd_signals() -> DndSignals {
    let (dragging_id_read, dragging_id_write) = signal(None::<String>);
    let (drop_target_read, drop_target_write) = signal(None::<DropTarget>);
    let (drag_just_ended_read, drag_just_ended_write) = signal(false);
    let (pending_id_read, pending_id_write) = signal(None::<String>);
    let (start_x_read, start_x_write) = signal(0i32);
    let (start_y_read, start_y_write) = signal(0i32);
    DndSignals {
        dragging_id_read,
        dragging_id_write,
        drop_target_read,
        drop_target_write,
        drag_just_ended_read,
        drag_just_ended_write,
        pending_id_read,
        pending_id_write,
        start_x_read,
        start_x_write,
        start_y_read,
        start_y_write,
    }
}

/// Callbacks into the drag model
#[derive(Clone)]
pub struct DndHandlers {
    /// A drag of this node begins; return false to refuse it
    pub on_start: Rc<dyn Fn(&str) -> bool>,
    /// The pointer entered a new target
    pub on_hover: Rc<dyn Fn(&DropTarget)>,
    /// The button was released over a target; ending the session is up to
    /// the handler once the drop has been applied
    pub on_drop: Rc<dyn Fn(String, DropTarget)>,
    /// The button was released outside of any target
    pub on_end: Rc<dyn Fn()>,
}

/// End drag operation
pub fn end_drag(dnd: &DndSignals) {
    dnd.dragging_id_write.set(None);
    dnd.drop_target_write.set(None);
    dnd.pending_id_write.set(None);
    dnd.drag_just_ended_write.set(true);

    if let Some(win) = web_sys::window() {
        let clear = dnd.drag_just_ended_write;
        let cb = Closure::<dyn FnMut()>::new(move || {
            clear.set(false);
        });
        let _ = win.set_timeout_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            100,
        );
        cb.forget();
    }
}

/// Nearest element at or above the event target that carries `attribute`
fn closest_with(ev: &web_sys::MouseEvent, attribute: &str) -> Option<web_sys::Element> {
    let target = ev.target()?.dyn_into::<web_sys::Element>().ok()?;
    target.closest(&format!("[{}]", attribute)).ok().flatten()
}

/// Target under the pointer: node edges, then nodes, then the pseudo target
/// of the surrounding container
fn target_at(ev: &web_sys::MouseEvent) -> Option<DropTarget> {
    let Some(node) = closest_with(ev, ID_ATTRIBUTE) else {
        let pseudo = closest_with(ev, PSEUDO_ATTRIBUTE)?;
        return pseudo.get_attribute(PSEUDO_ATTRIBUTE).map(DropTarget::Pseudo);
    };
    let id = node.get_attribute(ID_ATTRIBUTE)?;

    // the header decides; the node box also spans its children
    let header = node
        .query_selector(":scope > .node-header")
        .ok()
        .flatten()
        .unwrap_or_else(|| node.clone());
    let rect = header.get_bounding_client_rect();
    let y = f64::from(ev.client_y());
    let edge = rect.height() * EDGE_FRACTION;
    if rect.height() > 0.0 && y < rect.top() + edge {
        Some(DropTarget::Zone {
            reference: id,
            after: false,
        })
    } else if rect.height() > 0.0 && y > rect.bottom() - edge && y <= rect.bottom() {
        Some(DropTarget::Zone {
            reference: id,
            after: true,
        })
    } else {
        Some(DropTarget::Item(id))
    }
}

fn on_document(event: &str, listener: Closure<dyn FnMut(web_sys::MouseEvent)>) {
    if let Some(win) = web_sys::window() {
        if let Some(doc) = win.document() {
            let _ = doc.add_event_listener_with_callback(event, listener.as_ref().unchecked_ref());
        }
    }
    listener.forget();
}

/// Document mousedown: record a pending drag on the node under the pointer
fn bind_global_mousedown(dnd: DndSignals) {
    let on_mousedown = Closure::<dyn FnMut(web_sys::MouseEvent)>::new(move |ev: web_sys::MouseEvent| {
        if ev.button() != 0 {
            return;
        }
        // Ignore if target is an input, select or button
        if let Some(target) = ev.target() {
            if target.dyn_ref::<web_sys::HtmlInputElement>().is_some()
                || target.dyn_ref::<web_sys::HtmlSelectElement>().is_some()
                || target.dyn_ref::<web_sys::HtmlButtonElement>().is_some()
            {
                return;
            }
        }
        let Some(id) = closest_with(&ev, ID_ATTRIBUTE).and_then(|n| n.get_attribute(ID_ATTRIBUTE))
        else {
            return;
        };
        dnd.pending_id_write.set(Some(id));
        dnd.start_x_write.set(ev.client_x());
        dnd.start_y_write.set(ev.client_y());
    });
    on_document("mousedown", on_mousedown);
}

/// Document mousemove: start the drag past the threshold, then track the target
fn bind_global_mousemove(dnd: DndSignals, handlers: DndHandlers) {
    let on_mousemove = Closure::<dyn FnMut(web_sys::MouseEvent)>::new(move |ev: web_sys::MouseEvent| {
        if dnd.dragging_id_read.get_untracked().is_none() {
            let Some(pending) = dnd.pending_id_read.get_untracked() else {
                return;
            };
            let dx = (ev.client_x() - dnd.start_x_read.get_untracked()).abs();
            let dy = (ev.client_y() - dnd.start_y_read.get_untracked()).abs();
            if dx <= DRAG_THRESHOLD_PX && dy <= DRAG_THRESHOLD_PX {
                return;
            }
            if !(handlers.on_start)(&pending) {
                dnd.pending_id_write.set(None);
                return;
            }
            dnd.dragging_id_write.set(Some(pending));
        }

        let target = target_at(&ev);
        if target != dnd.drop_target_read.get_untracked() {
            if let Some(target) = &target {
                (handlers.on_hover)(target);
            }
            dnd.drop_target_write.set(target);
        }
    });
    on_document("mousemove", on_mousemove);
}

/// Bind the document listeners for the whole drag gesture
pub fn bind_document(dnd: DndSignals, handlers: DndHandlers) {
    let on_end = handlers.on_end.clone();
    let on_drop = handlers.on_drop.clone();
    let on_mouseup = Closure::<dyn FnMut(web_sys::MouseEvent)>::new(move |_ev: web_sys::MouseEvent| {
        let dragging_id = dnd.dragging_id_read.get_untracked();
        let drop_target = dnd.drop_target_read.get_untracked();

        // Clear pending state first
        dnd.pending_id_write.set(None);

        match (dragging_id, drop_target) {
            (Some(dragged), Some(target)) => {
                end_drag(&dnd);
                on_drop(dragged, target);
            }
            (Some(_), None) => {
                end_drag(&dnd);
                on_end();
            }
            // Not dragging; the click fires naturally on the element
            (None, _) => {}
        }
    });
    on_document("mouseup", on_mouseup);

    bind_global_mousedown(dnd);
    bind_global_mousemove(dnd, handlers);
}
