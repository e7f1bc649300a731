//! Tree Gestures
//!
//! Wires pointer and keyboard input on the rendered trees to the model:
//! drag and drop through `leptos-dragdrop`, click to select, click on the
//! icon to expand, double click on a label to edit it inline.

use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dragdrop::{DndHandlers, ID_ATTRIBUTE};
use structr_model::view::value_text;
use structr_model::{Anchor, Dom, DropCallback, DropOutcome, DropTarget};
use wasm_bindgen::closure::{Closure, WasmClosure};
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlInputElement};

use crate::context::{AppContext, Model};
use crate::store::{store_report_error, store_set_status, store_sync, AppStore};

const INPUT_SUFFIX: &str = "_input";
const FIELD_SUFFIX: &str = "_";

/// Translate a gesture target into a model drop target
fn drop_target(target: &leptos_dragdrop::DropTarget) -> Option<DropTarget> {
    match target {
        leptos_dragdrop::DropTarget::Item(id) => Some(DropTarget::Node(id.clone())),
        leptos_dragdrop::DropTarget::Zone { reference, after } => {
            let anchor = if *after {
                Anchor::after(reference.as_str())
            } else {
                Anchor::before(reference.as_str())
            };
            Some(DropTarget::Relative(anchor))
        }
        leptos_dragdrop::DropTarget::Pseudo(name) => match name.as_str() {
            "root" => Some(DropTarget::Root),
            "favorites" => Some(DropTarget::Favorites),
            _ => None,
        },
    }
}

fn report_outcome(store: AppStore) -> DropCallback {
    Rc::new(move |outcome: &DropOutcome| match outcome {
        DropOutcome::Applied { mutation, created } => {
            let status = match created {
                Some(id) => format!("Created {} from {}", id, mutation.subject()),
                None => format!("Moved {}", mutation.subject()),
            };
            store_set_status(&store, status);
        }
        DropOutcome::Rejected(rejection) => {
            tracing::debug!(?rejection, "drop refused");
        }
        DropOutcome::Stale => {}
    })
}

/// Drag callbacks bound to the model in `ctx`
pub fn drag_handlers(ctx: AppContext, store: AppStore) -> DndHandlers {
    let on_start = Rc::new(move |id: &str| {
        let model = ctx.model();
        let token = model.drag_start(id, Some(report_outcome(store)));
        ctx.set_drag_token(token);
        token.is_some()
    });

    let on_hover = Rc::new(move |target: &leptos_dragdrop::DropTarget| {
        let (Some(token), Some(target)) = (ctx.drag_token(), drop_target(target)) else {
            return;
        };
        let _ = ctx.model().drag_over(token, &target);
    });

    let on_drop = Rc::new(move |dragged: String, target: leptos_dragdrop::DropTarget| {
        let Some(token) = ctx.take_drag_token() else {
            return;
        };
        let model = ctx.model();
        let Some(target) = drop_target(&target) else {
            model.drag_end(token);
            return;
        };
        spawn_local(async move {
            tracing::debug!(%dragged, ?target, "drop");
            if let Err(e) = Model::drop(&model, token, target).await {
                store_report_error(&store, format!("Drop of {} failed: {}", dragged, e));
            }
            model.drag_end(token);
            store_sync(&store, &model);
        });
    });

    let on_end = Rc::new(move || {
        if let Some(token) = ctx.take_drag_token() {
            ctx.model().drag_end(token);
        }
    });

    DndHandlers {
        on_start,
        on_hover,
        on_drop,
        on_end,
    }
}

fn event_element(ev: &web_sys::Event) -> Option<Element> {
    ev.target()?.dyn_into::<Element>().ok()
}

/// Entity id and node of the closest rendered node around `element`
fn node_around(element: &Element) -> Option<(String, Element)> {
    let node = element.closest(&format!("[{}]", ID_ATTRIBUTE)).ok().flatten()?;
    let id = node.get_attribute(ID_ATTRIBUTE)?;
    Some((id, node))
}

/// Property key of a header field or inline input, from its class
fn field_key(element: &Element, suffix: &str) -> Option<String> {
    let class_list = element.class_list();
    (0..class_list.length())
        .filter_map(|i| class_list.item(i))
        .find_map(|class| class.strip_suffix(suffix).map(str::to_string))
        .filter(|key| !key.is_empty())
}

fn inline_input(node: &Element, key: &str) -> Option<HtmlInputElement> {
    node.query_selector(&format!(":scope > .node-header > .{}{}", key, INPUT_SUFFIX))
        .ok()
        .flatten()?
        .dyn_into::<HtmlInputElement>()
        .ok()
}

fn on_document<T: ?Sized + WasmClosure>(event: &str, listener: Closure<T>) {
    if let Some(doc) = web_sys::window().and_then(|w| w.document()) {
        let _ = doc.add_event_listener_with_callback(event, listener.as_ref().unchecked_ref());
    }
    listener.forget();
}

fn on_click(ctx: AppContext, store: AppStore, ev: web_sys::MouseEvent) {
    if ctx.dnd.drag_just_ended_read.get_untracked() {
        return;
    }
    let Some(element) = event_element(&ev) else {
        return;
    };
    if element.dyn_ref::<HtmlInputElement>().is_some() {
        return;
    }
    let Some((id, _)) = node_around(&element) else {
        return;
    };
    let model = ctx.model();

    if field_key(&element, FIELD_SUFFIX).as_deref() == Some("icon") {
        spawn_local(async move {
            if let Err(e) = model.toggle_expanded(&id).await {
                store_report_error(&store, format!("Could not expand {}: {}", id, e));
            }
            store_sync(&store, &model);
        });
        return;
    }
    model.select(&id);
    store_sync(&store, &model);
}

/// Swap a label for its inline input, prefilled with the current value
fn on_dblclick(ctx: AppContext, ev: web_sys::MouseEvent) {
    let Some(element) = event_element(&ev) else {
        return;
    };
    let (Some(key), Some((id, node))) = (field_key(&element, FIELD_SUFFIX), node_around(&element))
    else {
        return;
    };
    let Some(input) = inline_input(&node, &key) else {
        return;
    };
    let model = ctx.model();
    let current = model
        .read(&id, |entity| entity.get(&key).map(value_text))
        .flatten()
        .unwrap_or_default();
    input.set_value(&current);
    input.set_hidden(false);
    let _ = element.set_attribute("hidden", "");
    let _ = input.focus();
}

fn close_input(node: &Element, input: &HtmlInputElement, key: &str) {
    input.set_hidden(true);
    let label = node
        .query_selector(&format!(":scope > .node-header > .{}{}", key, FIELD_SUFFIX))
        .ok()
        .flatten();
    if let Some(label) = label {
        let _ = label.remove_attribute("hidden");
    }
}

/// Enter saves the inline edit, Escape discards it
fn on_keydown(ctx: AppContext, store: AppStore, ev: web_sys::KeyboardEvent) {
    let key_name = ev.key();
    if key_name != "Enter" && key_name != "Escape" {
        return;
    }
    let Some(element) = event_element(&ev) else {
        return;
    };
    let Some(input) = element.dyn_ref::<HtmlInputElement>().cloned() else {
        return;
    };
    let (Some(key), Some((id, node))) = (field_key(&element, INPUT_SUFFIX), node_around(&element))
    else {
        return;
    };
    ev.prevent_default();
    close_input(&node, &input, &key);

    let model = ctx.model();
    if key_name == "Escape" {
        restore_input(&model, &id, &key);
        return;
    }
    spawn_local(async move {
        match model.save(&id).await {
            Ok(()) => store_set_status(&store, format!("Saved {}", id)),
            Err(e) => {
                restore_input(&model, &id, &key);
                store_report_error(&store, format!("Could not save {}: {}", id, e));
            }
        }
    });
}

/// Put the resident value back into the inline inputs of every node
fn restore_input(model: &Model, id: &str, key: &str) {
    let value = model
        .read(id, |entity| entity.get(key).map(value_text))
        .flatten()
        .unwrap_or_default();
    let mut dom = model.dom_mut();
    for node in model.nodes_of(id) {
        dom.set_input_value(&node, key, &value);
    }
}

/// Bind click, double click and key listeners on the document
pub fn bind_tree_events(ctx: AppContext, store: AppStore) {
    on_document(
        "click",
        Closure::<dyn FnMut(web_sys::MouseEvent)>::new(move |ev| on_click(ctx, store, ev)),
    );
    on_document(
        "dblclick",
        Closure::<dyn FnMut(web_sys::MouseEvent)>::new(move |ev| on_dblclick(ctx, ev)),
    );
    on_document(
        "keydown",
        Closure::<dyn FnMut(web_sys::KeyboardEvent)>::new(move |ev| on_keydown(ctx, store, ev)),
    );
}
