//! Entity Store
//!
//! Single table of resident entities, keyed by entity id.

use std::collections::HashMap;

use crate::entity::EntityRef;

#[derive(Debug, Default)]
pub struct EntityStore {
    entities: HashMap<String, EntityRef>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure lookup
    pub fn get(&self, id: &str) -> Option<EntityRef> {
        self.entities.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Register or overwrite the resident object for `id`
    pub fn put(&mut self, id: &str, entity: EntityRef) {
        self.entities.insert(id.to_string(), entity);
    }

    /// Deregister `id`. Children stay resident; detaching them is up to the caller.
    pub fn remove(&mut self, id: &str) -> Option<EntityRef> {
        self.entities.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entities.keys().cloned().collect()
    }
}
