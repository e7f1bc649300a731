//! Model Context
//!
//! One `StructrModel` owns the entity store, the document it renders into,
//! the transport handle, UI-state storage and the drag session. Every
//! operation of the crate is a method on it; independent instances do not
//! share state.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::warn;

use crate::config::UiConfig;
use crate::dnd::DragSession;
use crate::dom::Dom;
use crate::entity::{EntityRef, Scope};
use crate::storage::KeyValueStorage;
use crate::store::EntityStore;
use crate::transport::Transport;

pub struct StructrModel<D: Dom> {
    pub(crate) config: UiConfig,
    pub(crate) store: RefCell<EntityStore>,
    pub(crate) dom: RefCell<D>,
    pub(crate) transport: Rc<dyn Transport>,
    pub(crate) storage: RefCell<Box<dyn KeyValueStorage>>,
    pub(crate) expanded: RefCell<BTreeSet<String>>,
    pub(crate) drag: RefCell<Option<DragSession>>,
    pub(crate) next_drag_token: Cell<u64>,
}

impl<D: Dom> StructrModel<D> {
    pub fn new(
        config: UiConfig,
        dom: D,
        transport: Rc<dyn Transport>,
        storage: Box<dyn KeyValueStorage>,
    ) -> Self {
        let expanded = storage
            .get(&config.expanded_key)
            .and_then(|raw| match serde_json::from_str::<BTreeSet<String>>(&raw) {
                Ok(ids) => Some(ids),
                Err(e) => {
                    warn!(error = %e, "discarding unreadable expanded-node set");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            config,
            store: RefCell::new(EntityStore::new()),
            dom: RefCell::new(dom),
            transport,
            storage: RefCell::new(storage),
            expanded: RefCell::new(expanded),
            drag: RefCell::new(None),
            next_drag_token: Cell::new(1),
        }
    }

    pub fn config(&self) -> &UiConfig {
        &self.config
    }

    /// Resident entity for `id`
    pub fn get(&self, id: &str) -> Option<EntityRef> {
        self.store.borrow().get(id)
    }

    pub fn is_resident(&self, id: &str) -> bool {
        self.store.borrow().contains(id)
    }

    pub fn resident_count(&self) -> usize {
        self.store.borrow().len()
    }

    pub fn dom(&self) -> Ref<'_, D> {
        self.dom.borrow()
    }

    pub fn dom_mut(&self) -> RefMut<'_, D> {
        self.dom.borrow_mut()
    }

    /// Home node key of `id` while rendered
    pub fn node_of(&self, id: &str) -> Option<String> {
        let entity = self.get(id)?;
        let entity = entity.borrow();
        entity.node_key().map(str::to_string)
    }

    pub fn node_in(&self, id: &str, scope: &Scope) -> Option<String> {
        let entity = self.get(id)?;
        let entity = entity.borrow();
        entity.node_key_in(scope).map(str::to_string)
    }

    /// Every rendered node of `id`, home node first
    pub fn nodes_of(&self, id: &str) -> Vec<String> {
        let Some(entity) = self.get(id) else {
            return Vec::new();
        };
        let entity = entity.borrow();
        entity.rendered().into_iter().map(|(_, node)| node).collect()
    }

    pub(crate) fn storage_get(&self, key: &str) -> Option<String> {
        self.storage.borrow().get(key)
    }

    pub(crate) fn storage_set(&self, key: &str, value: &str) {
        self.storage.borrow_mut().set(key, value);
    }

    pub(crate) fn storage_remove(&self, key: &str) {
        self.storage.borrow_mut().remove(key);
    }
}
