//! Application Context
//!
//! Shared state provided via Leptos Context API.

use std::rc::Rc;

use leptos::prelude::*;
use leptos_dragdrop::DndSignals;
use structr_model::{DragToken, StructrModel};

use crate::dom::WebDom;

pub type Model = StructrModel<WebDom>;

/// App-wide handles provided via context
#[derive(Clone, Copy)]
pub struct AppContext {
    /// The model is single-threaded, so it is kept in local storage
    model: StoredValue<Rc<Model>, LocalStorage>,
    /// Pointer gesture state
    pub dnd: DndSignals,
    /// Token of the drag session started by the last gesture
    drag_token: StoredValue<Option<DragToken>>,
}

impl AppContext {
    pub fn new(model: Rc<Model>, dnd: DndSignals) -> Self {
        Self {
            model: StoredValue::new_local(model),
            dnd,
            drag_token: StoredValue::new(None),
        }
    }

    pub fn model(&self) -> Rc<Model> {
        self.model.get_value()
    }

    pub fn set_drag_token(&self, token: Option<DragToken>) {
        self.drag_token.set_value(token);
    }

    /// Token of the current gesture, cleared on read
    pub fn take_drag_token(&self) -> Option<DragToken> {
        let token = self.drag_token.get_value();
        self.drag_token.set_value(None);
        token
    }

    pub fn drag_token(&self) -> Option<DragToken> {
        self.drag_token.get_value()
    }
}

pub fn use_app_context() -> AppContext {
    expect_context::<AppContext>()
}
