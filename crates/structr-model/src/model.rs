//! Model Objects
//!
//! Construction from payloads, dispatch to variants and the per-variant
//! capabilities: append, remove, set_property, save, exists.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::context::StructrModel;
use crate::dom::{Dom, NodeSpec};
use crate::entity::{
    is_reference_only, is_search_hit, payload_id, Entity, EntityKind, EntityRef, Properties,
    RenderState, Scope, PLACEMENT_KEYS,
};
use crate::error::{ModelError, ModelResult};
use crate::view::value_text;

/// Target container and sibling anchor of a node
struct Placement {
    parent: String,
    before: Option<String>,
}

fn moves_node(changed: &[String]) -> bool {
    changed.iter().any(|k| PLACEMENT_KEYS.contains(&k.as_str()))
}

fn changes_members(changed: &[String]) -> bool {
    changed.iter().any(|k| k == "members")
}

/// Placement a payload asks for: the result list for a search hit, the
/// entity's own tree otherwise
fn payload_scope(entity: &Entity, payload: &Properties) -> Scope {
    if is_search_hit(payload) {
        Scope::Search
    } else {
        entity.home_scope()
    }
}

impl<D: Dom> StructrModel<D> {
    /// Run `f` against the resident entity `id`
    pub fn read<T>(&self, id: &str, f: impl FnOnce(&Entity) -> T) -> Option<T> {
        let entity = self.get(id)?;
        let entity = entity.borrow();
        let value = f(&entity);
        Some(value)
    }

    /// Build (or find) the model object for a payload.
    ///
    /// An id-only payload is a lazy reference: the entity is fetched first and
    /// nothing is rendered before the full data is there. An entity that is
    /// already resident and placed outside the staging area is returned
    /// unchanged, so a payload pushed twice never renders twice. A search hit
    /// renders into the result list and leaves the tree node alone.
    pub async fn create_from_payload(
        &self,
        payload: Properties,
        insertion_ref: Option<&str>,
        attach: bool,
    ) -> ModelResult<EntityRef> {
        let id = payload_id(&payload)?;
        if is_reference_only(&payload) {
            debug!(%id, "resolving lazy reference");
            let mut fetched = self.transport.fetch_entity(&id, None).await?;
            if !fetched.contains_key("id") {
                fetched.insert("id".to_string(), Value::String(id.clone()));
            }
            return self.construct(fetched, insertion_ref, attach);
        }
        self.construct(payload, insertion_ref, attach)
    }

    /// Merge into the resident entity if there is one, create it otherwise.
    /// Keys missing from `payload` keep their known values.
    pub async fn create_or_update_from_payload(
        &self,
        payload: Properties,
        insertion_ref: Option<&str>,
        attach: bool,
    ) -> ModelResult<EntityRef> {
        let id = payload_id(&payload)?;
        let Some(existing) = self.get(&id) else {
            return self.create_from_payload(payload, insertion_ref, attach).await;
        };

        let (changed, old_parent, scope) = {
            let mut entity = existing.borrow_mut();
            let old_parent = entity.logical_parent_id();
            entity.settle_kind(&payload);
            let changed = entity.merge(&payload);
            (changed, old_parent, payload_scope(&entity, &payload))
        };
        trace!(%id, ?changed, "merged payload");

        if attach && !self.is_placed_in(&id, &scope) {
            self.append_in(&id, &scope, insertion_ref);
        } else if moves_node(&changed) && self.node_of(&id).is_some() {
            self.append(&id, insertion_ref);
            if let Some(parent) = old_parent {
                self.refresh_icon(&parent);
            }
        } else {
            self.refresh_all(&id);
        }
        if changes_members(&changed) {
            self.render_members(&id);
        }
        Ok(existing)
    }

    /// Re-fetch `changed_keys` plus every key already known, merge the result
    /// in place and refresh the node. Concurrent calls each fetch; the last
    /// response merged wins.
    pub async fn apply_partial_update(&self, id: &str, changed_keys: &[String]) -> ModelResult<()> {
        let Some(entity) = self.get(id) else {
            trace!(%id, "partial update for non-resident entity ignored");
            return Ok(());
        };
        let keys: Vec<String> = {
            let entity = entity.borrow();
            changed_keys
                .iter()
                .cloned()
                .chain(entity.properties().keys().cloned())
                .filter(|k| k != "id")
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };

        let payload = self.transport.fetch_entity(id, Some(keys.as_slice())).await?;

        // the entity may have been deleted while the fetch was in flight
        let Some(entity) = self.get(id) else {
            return Ok(());
        };
        let (changed, old_parent) = {
            let mut entity = entity.borrow_mut();
            let old_parent = entity.logical_parent_id();
            (entity.merge(&payload), old_parent)
        };
        debug!(%id, ?changed, "applied partial update");

        if moves_node(&changed) && self.node_of(id).is_some() {
            self.append(id, None);
            if let Some(parent) = old_parent {
                self.refresh_icon(&parent);
            }
        } else {
            self.refresh_all(id);
        }
        if changes_members(&changed) {
            self.render_members(id);
        }
        Ok(())
    }

    /// Create an entity on the server and mirror the result
    pub async fn create(&self, payload: Properties) -> ModelResult<EntityRef> {
        let created = self.transport.create_entity(&payload).await?;
        self.create_from_payload(created, None, true).await
    }

    /// Load all entities of a server type into their trees
    pub async fn load(&self, type_name: &str) -> ModelResult<Vec<EntityRef>> {
        let payloads = self.transport.list_entities(type_name).await?;
        debug!(type_name, count = payloads.len(), "loaded entities");
        let mut loaded = Vec::with_capacity(payloads.len());
        for payload in payloads {
            loaded.push(self.create_or_update_from_payload(payload, None, true).await?);
        }
        Ok(loaded)
    }

    /// Re-list the pool of page elements that belong to no page
    pub async fn refresh_unattached(&self) -> ModelResult<()> {
        let payloads = self.transport.list_unattached().await?;
        let pool = self.config.containers.unattached.clone();
        let dropped = self.dom.borrow_mut().clear_children(&pool);
        self.mark_detached(&dropped);
        debug!(count = payloads.len(), "refreshing unattached pool");
        for payload in payloads {
            self.create_or_update_from_payload(payload, None, true).await?;
        }
        Ok(())
    }

    /// Re-list the favorite files and show each one in the favorites
    /// container, next to its node in the file tree
    pub async fn refresh_favorites(&self) -> ModelResult<()> {
        let payloads = self.transport.list_favorites().await?;
        let container = self.config.containers.favorites.clone();
        let dropped = self.dom.borrow_mut().clear_children(&container);
        self.mark_detached(&dropped);
        debug!(count = payloads.len(), "refreshing favorites");
        for payload in payloads {
            let entity = self.create_or_update_from_payload(payload, None, false).await?;
            let id = entity.borrow().id().to_string();
            self.append_in(&id, &Scope::Favorite, None);
        }
        Ok(())
    }

    /// Render the home node of `id`, or move it if it is rendered already.
    ///
    /// `insertion_ref` puts the node before that entity's node when both
    /// share a container; otherwise the parent's child order decides.
    pub fn append(&self, id: &str, insertion_ref: Option<&str>) -> bool {
        let Some(scope) = self.read(id, Entity::home_scope) else {
            return false;
        };
        self.append_in(id, &scope, insertion_ref)
    }

    /// Render or move the node of `id` for one placement. Placing the home
    /// node also brings parked children, group members and group
    /// memberships along.
    pub fn append_in(&self, id: &str, scope: &Scope, insertion_ref: Option<&str>) -> bool {
        let Some(entity) = self.get(id) else {
            return false;
        };
        let (spec, current, parent_id, home) = {
            let entity = entity.borrow();
            let shown = match scope {
                Scope::Search => EntityKind::SearchResult,
                _ => entity.kind(),
            };
            let spec = NodeSpec {
                key: scope.node_key(id),
                entity_id: id.to_string(),
                classes: vec!["node".to_string(), shown.css_class().to_string()],
                fields: shown.fields(),
            };
            (
                spec,
                entity.node_key_in(scope).map(str::to_string),
                entity.logical_parent_id(),
                entity.home_scope() == *scope,
            )
        };
        let placement = {
            let entity = entity.borrow();
            self.placement(&entity, scope, insertion_ref)
        };
        let Some(placement) = placement else {
            trace!(%id, ?scope, "nothing to render under");
            return false;
        };

        let attached = {
            let mut dom = self.dom.borrow_mut();
            match current.filter(|node| dom.has_node(node)) {
                Some(node) => dom.move_node(&node, &placement.parent, placement.before.as_deref()),
                None => dom.insert_node(&placement.parent, placement.before.as_deref(), &spec),
            }
        };
        if !attached {
            warn!(%id, container = %placement.parent, "no container to render into");
            return false;
        }

        entity.borrow_mut().set_render_state(
            scope.clone(),
            RenderState::Rendered {
                node: spec.key.clone(),
            },
        );
        trace!(%id, ?scope, container = %placement.parent, "node attached");

        self.refresh_all(id);
        if home {
            self.adopt_parked_children(id);
            self.render_members(id);
            self.join_groups(id);
            if let Some(parent) = parent_id {
                self.refresh_icon(&parent);
            }
        }
        true
    }

    /// Detach every node of `id` with its subtree. The entities stay
    /// resident.
    pub fn remove(&self, id: &str) -> bool {
        let nodes = self.nodes_of(id);
        if nodes.is_empty() {
            return false;
        }
        let parent = self.read(id, Entity::logical_parent_id).flatten();
        let mut detached = vec![id.to_string()];
        for node in &nodes {
            detached.extend(self.dom.borrow_mut().remove_node(node));
        }
        self.mark_detached(&detached);
        debug!(%id, nodes = nodes.len(), detached = detached.len(), "node removed");
        if let Some(parent) = parent {
            self.refresh_icon(&parent);
        }
        true
    }

    /// Placements of `ids` whose node left the document become detached
    fn mark_detached(&self, ids: &[String]) {
        let ids: BTreeSet<&String> = ids.iter().collect();
        let dom = self.dom.borrow();
        for id in ids {
            let Some(entity) = self.get(id) else {
                continue;
            };
            let mut entity = entity.borrow_mut();
            for (scope, node) in entity.rendered() {
                if !dom.has_node(&node) {
                    entity.set_render_state(scope, RenderState::Detached);
                }
            }
        }
    }

    /// Show the resident members of `group_id` under its node and drop the
    /// member nodes of entities it no longer lists
    pub(crate) fn render_members(&self, group_id: &str) {
        let Some((kind, members)) = self.read(group_id, |e| (e.kind(), e.children_ids())) else {
            return;
        };
        if kind != EntityKind::Group {
            return;
        }
        let Some(group_node) = self.node_of(group_id) else {
            return;
        };

        let stale: Vec<String> = {
            let dom = self.dom.borrow();
            dom.children(&group_node)
                .into_iter()
                .filter(|node| {
                    dom.entity_of(node)
                        .map_or(false, |member| !members.contains(&member))
                })
                .collect()
        };
        for node in stale {
            let dropped = self.dom.borrow_mut().remove_node(&node);
            self.mark_detached(&dropped);
        }

        let scope = Scope::Member(group_id.to_string());
        for member in members.iter().filter(|m| *m != group_id && self.is_resident(m)) {
            if !self.is_placed_in(member, &scope) {
                self.append_in(member, &scope, None);
            }
        }
    }

    /// Show `id` under every rendered group that lists it as a member
    fn join_groups(&self, id: &str) {
        if !matches!(
            self.read(id, Entity::kind),
            Some(EntityKind::User | EntityKind::Group)
        ) {
            return;
        }
        let candidates = self.store.borrow().ids();
        for group in candidates {
            let lists = group != id
                && self
                    .read(&group, |e| {
                        e.kind() == EntityKind::Group && e.children_ids().iter().any(|m| m == id)
                    })
                    .unwrap_or(false);
            if !lists || self.node_of(&group).is_none() {
                continue;
            }
            let scope = Scope::Member(group);
            if !self.is_placed_in(id, &scope) {
                self.append_in(id, &scope, None);
            }
        }
    }

    /// Resident and rendered
    pub fn exists(&self, id: &str) -> bool {
        match self.node_of(id) {
            Some(node) => self.dom.borrow().has_node(&node),
            None => false,
        }
    }

    /// Home node rendered outside the staging area
    pub fn is_placed(&self, id: &str) -> bool {
        match self.read(id, Entity::home_scope) {
            Some(scope) => self.is_placed_in(id, &scope),
            None => false,
        }
    }

    pub fn is_placed_in(&self, id: &str, scope: &Scope) -> bool {
        let Some(node) = self.node_in(id, scope) else {
            return false;
        };
        let dom = self.dom.borrow();
        dom.has_node(&node) && !dom.contains(&self.config.containers.staging, &node)
    }

    /// Node parked in the staging area
    pub fn is_orphaned(&self, id: &str) -> bool {
        let Some(node) = self.node_of(id) else {
            return false;
        };
        self.dom
            .borrow()
            .contains(&self.config.containers.staging, &node)
    }

    /// Write one property through the transport. The model only changes once
    /// the server accepted the value.
    pub async fn set_property(
        &self,
        id: &str,
        key: &str,
        value: Value,
        recursive: bool,
    ) -> ModelResult<()> {
        self.transport.set_property(id, key, &value, recursive).await?;

        let Some(entity) = self.get(id) else {
            return Ok(());
        };
        let old_parent = {
            let mut entity = entity.borrow_mut();
            let old_parent = entity.logical_parent_id();
            entity.set(key, value.clone());
            old_parent
        };

        if recursive {
            for descendant in self.resident_descendants(id) {
                if let Some(d) = self.get(&descendant) {
                    d.borrow_mut().set(key, value.clone());
                }
                self.refresh_all(&descendant);
            }
        }

        if PLACEMENT_KEYS.contains(&key) && self.node_of(id).is_some() {
            self.append(id, None);
            if let Some(parent) = old_parent {
                self.refresh_icon(&parent);
            }
        } else {
            self.refresh_all(id);
        }
        Ok(())
    }

    /// Persist the inline edits of `id`: every editable field whose input
    /// differs from the known value is sent in one `set_properties` call.
    /// The edit may come from any node of the entity.
    pub async fn save(&self, id: &str) -> ModelResult<()> {
        let Some(entity) = self.get(id) else {
            return Ok(());
        };
        let kind = entity.borrow().kind();
        if !kind.supports_save() {
            return Err(ModelError::Unsupported {
                kind,
                operation: "save",
            });
        }
        let nodes = self.nodes_of(id);

        let changes: Properties = {
            let dom = self.dom.borrow();
            let entity = entity.borrow();
            kind.fields()
                .iter()
                .filter(|f| f.editable)
                .filter_map(|f| {
                    let known = entity.get(f.key).map(value_text).unwrap_or_default();
                    let typed = nodes
                        .iter()
                        .filter_map(|node| dom.input_value(node, f.key))
                        .find(|typed| *typed != known)?;
                    Some((f.key.to_string(), Value::String(typed)))
                })
                .collect()
        };
        if changes.is_empty() {
            trace!(%id, "nothing to save");
            return Ok(());
        }

        self.transport.set_properties(id, &changes).await?;
        debug!(%id, keys = changes.len(), "saved inline edits");
        entity.borrow_mut().merge(&changes);
        self.refresh_all(id);
        Ok(())
    }

    /// Delete on the server, then drop the entity locally
    pub async fn delete(&self, id: &str) -> ModelResult<()> {
        self.transport.delete_entity(id).await?;
        self.forget(id);
        Ok(())
    }

    /// Drop a deleted entity from DOM and store, unlink it from its resident
    /// parent and clear the selection if it pointed at it.
    pub fn forget(&self, id: &str) {
        let parent = self.read(id, Entity::logical_parent_id).flatten();
        self.remove(id);
        if self.store.borrow_mut().remove(id).is_none() {
            trace!(%id, "deleted entity was not resident");
        }
        if self.selected_id().as_deref() == Some(id) {
            self.clear_selection();
        }
        if let Some(parent) = parent {
            if let Some(entity) = self.get(&parent) {
                entity.borrow_mut().forget_child(id);
            }
            self.refresh_icon(&parent);
        }
        debug!(%id, "entity forgotten");
    }

    /// Give every resident descendant of `id` the `pageId` it now carries;
    /// a subtree changes page together with its root
    pub(crate) fn spread_page_id(&self, id: &str) {
        let Some(page) = self.read(id, |e| e.get("pageId").cloned()).flatten() else {
            return;
        };
        let descendants = self.resident_descendants(id);
        for descendant in &descendants {
            if let Some(entity) = self.get(descendant) {
                entity.borrow_mut().set("pageId", page.clone());
            }
            self.refresh_all(descendant);
        }
        debug!(%id, %page, count = descendants.len(), "page spread to subtree");
    }

    /// Resident entities below `id`, following child lists
    pub fn resident_descendants(&self, id: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<String> = self
            .read(id, Entity::children_ids)
            .unwrap_or_default()
            .into();
        let mut result = Vec::new();
        while let Some(child) = queue.pop_front() {
            if child == id || !seen.insert(child.clone()) {
                continue;
            }
            let Some(grandchildren) = self.read(&child, Entity::children_ids) else {
                continue;
            };
            queue.extend(grandchildren);
            result.push(child);
        }
        result
    }

    fn construct(
        &self,
        payload: Properties,
        insertion_ref: Option<&str>,
        attach: bool,
    ) -> ModelResult<EntityRef> {
        let id = payload_id(&payload)?;
        if let Some(existing) = self.get(&id) {
            let scope = {
                let mut entity = existing.borrow_mut();
                entity.settle_kind(&payload);
                payload_scope(&entity, &payload)
            };
            if !attach || self.is_placed_in(&id, &scope) {
                trace!(%id, "already resident");
                return Ok(existing);
            }
            if !is_search_hit(&payload) {
                existing.borrow_mut().merge(&payload);
            }
            self.append_in(&id, &scope, insertion_ref);
            return Ok(existing);
        }

        let entity: EntityRef = Rc::new(RefCell::new(Entity::from_payload(payload)?));
        let (kind, scope) = {
            let entity = entity.borrow();
            let scope = if is_search_hit(entity.properties()) {
                Scope::Search
            } else {
                entity.home_scope()
            };
            (entity.kind(), scope)
        };
        self.store.borrow_mut().put(&id, entity.clone());
        debug!(%id, kind = kind.name(), "registered entity");
        if attach {
            self.append_in(&id, &scope, insertion_ref);
        }
        Ok(entity)
    }

    /// Container node and sibling anchor for the `scope` node of `entity`.
    /// A member node needs its group rendered.
    fn placement(
        &self,
        entity: &Entity,
        scope: &Scope,
        insertion_ref: Option<&str>,
    ) -> Option<Placement> {
        let containers = &self.config.containers;
        let (parent, siblings) = match scope {
            Scope::Home => (
                self.home_container(entity),
                entity
                    .logical_parent_id()
                    .and_then(|p| self.read(&p, Entity::children_ids)),
            ),
            Scope::Search => (containers.search_results.clone(), None),
            Scope::Favorite => (containers.favorites.clone(), None),
            Scope::Member(group) => (
                self.node_of(group)?,
                self.read(group, Entity::children_ids),
            ),
        };

        let explicit = insertion_ref
            .and_then(|r| self.node_in(r, scope))
            .filter(|node| {
                self.dom.borrow().parent_node(node).as_deref() == Some(parent.as_str())
            });
        let before =
            explicit.or_else(|| self.ordered_anchor(entity, scope, siblings.as_deref(), &parent));
        Some(Placement { parent, before })
    }

    /// Container of the home node: the parent's node, the staging area while
    /// the parent is not rendered, or the tree root
    fn home_container(&self, entity: &Entity) -> String {
        let containers = &self.config.containers;
        let under = |parent: Option<String>, root: &str| match parent {
            Some(parent) => self
                .node_of(&parent)
                .unwrap_or_else(|| containers.staging.clone()),
            None => root.to_string(),
        };

        match entity.kind() {
            EntityKind::Page => containers.pages.clone(),
            EntityKind::Widget => containers.widgets.clone(),
            EntityKind::User => containers.users.clone(),
            EntityKind::Group => containers.groups.clone(),
            EntityKind::ResourceAccess => containers.resource_access.clone(),
            EntityKind::CorsSetting => containers.cors_settings.clone(),
            EntityKind::SearchResult => containers.search_results.clone(),
            // component masters live in a hidden page, so they are checked first
            EntityKind::Element | EntityKind::Content
                if entity.parent_id().is_none() && entity.is_shared_component() =>
            {
                containers.components.clone()
            }
            EntityKind::Element | EntityKind::Content => match entity.logical_parent_id() {
                Some(parent) => under(Some(parent), &containers.staging),
                None => containers.unattached.clone(),
            },
            EntityKind::Folder => under(entity.parent_id(), &containers.folders),
            EntityKind::File => under(entity.parent_id(), &containers.files),
            EntityKind::Image => under(entity.parent_id(), &containers.images),
            EntityKind::ContentContainer | EntityKind::ContentItem => {
                under(entity.parent_id(), &containers.content_tree)
            }
        }
    }

    /// First rendered sibling that comes after `entity` in server order.
    /// Children follow the parent's child list; roots follow `position`.
    fn ordered_anchor(
        &self,
        entity: &Entity,
        scope: &Scope,
        siblings: Option<&[String]>,
        container: &str,
    ) -> Option<String> {
        let in_container = |node: &String| {
            self.dom.borrow().parent_node(node).as_deref() == Some(container)
        };
        let node = |id: &String| match scope {
            Scope::Home => self.node_of(id),
            _ => self.node_in(id, scope),
        };

        if let Some(siblings) = siblings {
            let index = siblings.iter().position(|s| s == entity.id())?;
            return siblings[index + 1..]
                .iter()
                .filter_map(node)
                .find(in_container);
        }

        let position = entity.get("position").and_then(Value::as_f64)?;
        let children = self.dom.borrow().children(container);
        children.into_iter().find(|node| {
            self.dom
                .borrow()
                .entity_of(node)
                .filter(|other| other != entity.id())
                .and_then(|other| self.read(&other, |e| e.get("position").and_then(Value::as_f64)))
                .flatten()
                .map_or(false, |p| p > position)
        })
    }

    /// Move children parked in staging under the freshly placed `id`
    fn adopt_parked_children(&self, id: &str) {
        let children = self.read(id, Entity::children_ids).unwrap_or_default();
        for child in children {
            if self.is_orphaned(&child) {
                trace!(%id, %child, "adopting parked child");
                self.append(&child, None);
            }
        }
    }
}
