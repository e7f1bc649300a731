//! Structr Model
//!
//! Client-side mirror of Structr entities for the admin UI. Entities pushed
//! or fetched from the server become resident objects in one store, are
//! rendered into tree containers of a [`Dom`] and can be re-parented by drag
//! and drop. Everything hangs off a [`StructrModel`] context; the backend is
//! reached through the [`Transport`] trait.

pub mod config;
pub mod context;
pub mod dnd;
pub mod dom;
pub mod entity;
pub mod error;
pub mod model;
pub mod notify;
pub mod selection;
pub mod storage;
pub mod store;
pub mod transport;
pub mod view;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod virtual_dom;

pub use config::{Containers, UiConfig};
pub use context::StructrModel;
pub use dnd::{
    DragToken, DropCallback, DropEffect, DropOutcome, DropTarget, DropVerdict, Hover, Rejection,
    RelativeMarker,
};
pub use dom::{Dom, FieldSpec, FieldWidget, NodeSpec};
pub use entity::{Entity, EntityKind, EntityRef, Properties, RenderState, Scope, TreeFamily};
pub use error::{ModelError, ModelResult, TransportError};
pub use notify::Notification;
pub use storage::{KeyValueStorage, MemoryStorage};
pub use store::EntityStore;
pub use transport::{Anchor, Mutation, RelativePosition, Transport};
