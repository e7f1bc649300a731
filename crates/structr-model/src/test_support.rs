//! In-process Structr server and fixtures shared by the unit tests

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::UiConfig;
use crate::context::StructrModel;
use crate::dom::Dom;
use crate::entity::{id_of, Properties};
use crate::error::TransportError;
use crate::storage::MemoryStorage;
use crate::transport::{Anchor, Mutation, RelativePosition, Transport};
use crate::virtual_dom::VirtualDom;

const CHILD_LISTS: &[&str] = &["children", "folders", "files"];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Fetch { id: String, keys: Option<Vec<String>> },
    FetchChildren { id: String },
    List { type_name: String },
    ListUnattached,
    ListFavorites,
    SetProperty {
        id: String,
        key: String,
        value: Value,
        recursive: bool,
    },
    SetProperties { id: String, properties: Properties },
    Create { payload: Properties },
    Delete { id: String },
    Apply(Mutation),
}

/// Entity table with Structr-like mutation semantics. Every call is
/// recorded; `fail` makes every call return an error.
pub(crate) struct FakeServer {
    entities: RefCell<BTreeMap<String, Properties>>,
    calls: RefCell<Vec<Call>>,
    pub fail: Cell<bool>,
    next_id: Cell<u32>,
}

impl FakeServer {
    pub fn new(entities: Vec<Value>) -> Rc<Self> {
        let entities = entities
            .into_iter()
            .map(|value| {
                let payload = props(value);
                let id = payload["id"].as_str().unwrap().to_string();
                (id, payload)
            })
            .collect();
        Rc::new(Self {
            entities: RefCell::new(entities),
            calls: RefCell::new(Vec::new()),
            fail: Cell::new(false),
            next_id: Cell::new(1),
        })
    }

    /// Full server-side payload of `id`
    pub fn entity(&self, id: &str) -> Properties {
        self.entities.borrow()[id].clone()
    }

    /// Change server state without telling the client
    pub fn update(&self, id: &str, changes: Value) {
        let mut entities = self.entities.borrow_mut();
        let entity = entities.get_mut(id).unwrap();
        for (key, value) in props(changes) {
            entity.insert(key, value);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn fetches(&self, id: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Fetch { id: fetched, .. } if fetched == id))
            .count()
    }

    fn record(&self, call: Call) -> Result<(), TransportError> {
        self.calls.borrow_mut().push(call);
        if self.fail.get() {
            return Err(TransportError::new("server unavailable"));
        }
        Ok(())
    }

    fn fresh_id(&self, base: &str) -> String {
        let n = self.next_id.get();
        self.next_id.set(n + 1);
        format!("{}-copy{}", base, n)
    }

    fn page_of(entities: &BTreeMap<String, Properties>, parent: &str) -> Value {
        match entities.get(parent) {
            Some(p) if p.get("isPage") == Some(&json!(true)) => json!(parent),
            Some(p) => p.get("pageId").cloned().unwrap_or(Value::Null),
            None => Value::Null,
        }
    }

    fn unlink(entities: &mut BTreeMap<String, Properties>, id: &str) {
        for entity in entities.values_mut() {
            for key in CHILD_LISTS {
                if let Some(Value::Array(items)) = entity.get_mut(*key) {
                    items.retain(|item| id_of(item).as_deref() != Some(id));
                }
            }
        }
    }

    fn link(
        entities: &mut BTreeMap<String, Properties>,
        parent: &str,
        list: &str,
        id: &str,
        anchor: Option<&Anchor>,
    ) {
        let Some(parent) = entities.get_mut(parent) else {
            return;
        };
        let items = parent
            .entry(list)
            .or_insert_with(|| Value::Array(Vec::new()));
        let Value::Array(items) = items else {
            return;
        };
        let index = anchor
            .and_then(|a| {
                let at = items
                    .iter()
                    .position(|item| id_of(item).as_deref() == Some(a.reference_id.as_str()))?;
                Some(match a.position {
                    RelativePosition::Before => at,
                    RelativePosition::After => at + 1,
                })
            })
            .unwrap_or(items.len());
        items.insert(index, json!(id));
    }

    fn set_page(entities: &mut BTreeMap<String, Properties>, id: &str, page: &Value) {
        let children = match entities.get_mut(id) {
            Some(entity) => {
                entity.insert("pageId".into(), page.clone());
                entity
                    .get("children")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(id_of).collect::<Vec<_>>())
                    .unwrap_or_default()
            }
            None => return,
        };
        for child in children {
            Self::set_page(entities, &child, page);
        }
    }

    fn relocate(&self, id: &str, parent: &str, anchor: Option<&Anchor>) {
        let mut entities = self.entities.borrow_mut();
        let page = Self::page_of(&entities, parent);
        Self::unlink(&mut entities, id);
        if let Some(entity) = entities.get_mut(id) {
            entity.insert("parent".into(), json!(parent));
        }
        Self::set_page(&mut entities, id, &page);
        Self::link(&mut entities, parent, "children", id, anchor);
    }

    /// Copy `id` under `parent`; returns the new root payload
    fn copy(&self, id: &str, parent: &str, anchor: Option<&Anchor>, deep: bool) -> Properties {
        let copy_id = self.fresh_id(id);
        let (mut payload, children) = {
            let entities = self.entities.borrow();
            let source = entities[id].clone();
            let children = source
                .get("children")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(id_of).collect::<Vec<_>>())
                .unwrap_or_default();
            (source, children)
        };
        let page = Self::page_of(&self.entities.borrow(), parent);
        for key in ["children", "syncedNodesIds", "isSharedComponent", "sharedComponentId"] {
            payload.remove(key);
        }
        payload.insert("id".into(), json!(copy_id));
        payload.insert("parent".into(), json!(parent));
        payload.insert("pageId".into(), page);
        payload.insert("children".into(), json!([]));
        {
            let mut entities = self.entities.borrow_mut();
            entities.insert(copy_id.clone(), payload.clone());
            Self::link(&mut entities, parent, "children", &copy_id, anchor);
        }
        if deep {
            for child in children {
                self.copy(&child, &copy_id, None, true);
            }
        }
        let entities = self.entities.borrow();
        entities[&copy_id].clone()
    }

    fn descendants(&self, id: &str) -> Vec<String> {
        let entities = self.entities.borrow();
        let mut stack = vec![id.to_string()];
        let mut found = Vec::new();
        while let Some(current) = stack.pop() {
            if let Some(entity) = entities.get(&current) {
                for key in CHILD_LISTS {
                    if let Some(Value::Array(items)) = entity.get(*key) {
                        for child in items.iter().filter_map(id_of) {
                            found.push(child.clone());
                            stack.push(child);
                        }
                    }
                }
            }
        }
        found
    }
}

#[async_trait(?Send)]
impl Transport for FakeServer {
    async fn fetch_entity(
        &self,
        id: &str,
        properties: Option<&[String]>,
    ) -> Result<Properties, TransportError> {
        self.record(Call::Fetch {
            id: id.to_string(),
            keys: properties.map(<[String]>::to_vec),
        })?;
        let entities = self.entities.borrow();
        let entity = entities
            .get(id)
            .ok_or_else(|| TransportError::new(format!("no entity {}", id)))?;
        let payload = match properties {
            None => entity.clone(),
            Some(keys) => entity
                .iter()
                .filter(|(k, _)| *k == "id" || keys.contains(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        Ok(payload)
    }

    async fn fetch_children(&self, id: &str) -> Result<Vec<Properties>, TransportError> {
        self.record(Call::FetchChildren { id: id.to_string() })?;
        let entities = self.entities.borrow();
        Ok(entities
            .values()
            .filter(|e| e.get("parent").and_then(id_of).as_deref() == Some(id))
            .cloned()
            .collect())
    }

    async fn list_entities(&self, type_name: &str) -> Result<Vec<Properties>, TransportError> {
        self.record(Call::List {
            type_name: type_name.to_string(),
        })?;
        let entities = self.entities.borrow();
        Ok(entities
            .values()
            .filter(|e| e.get("type").and_then(Value::as_str) == Some(type_name))
            .cloned()
            .collect())
    }

    async fn list_favorites(&self) -> Result<Vec<Properties>, TransportError> {
        self.record(Call::ListFavorites)?;
        let entities = self.entities.borrow();
        Ok(entities
            .values()
            .filter(|e| e.get("isFavorite") == Some(&json!(true)))
            .cloned()
            .collect())
    }

    async fn list_unattached(&self) -> Result<Vec<Properties>, TransportError> {
        self.record(Call::ListUnattached)?;
        let entities = self.entities.borrow();
        Ok(entities
            .values()
            .filter(|e| {
                e.contains_key("tag")
                    && e.get("pageId").and_then(id_of).is_none()
                    && e.get("parent").and_then(id_of).is_none()
                    && e.get("isSharedComponent") != Some(&json!(true))
            })
            .cloned()
            .collect())
    }

    async fn set_property(
        &self,
        id: &str,
        key: &str,
        value: &Value,
        recursive: bool,
    ) -> Result<(), TransportError> {
        self.record(Call::SetProperty {
            id: id.to_string(),
            key: key.to_string(),
            value: value.clone(),
            recursive,
        })?;
        let mut targets = vec![id.to_string()];
        if recursive {
            targets.extend(self.descendants(id));
        }
        let mut entities = self.entities.borrow_mut();
        for target in targets {
            if let Some(entity) = entities.get_mut(&target) {
                entity.insert(key.to_string(), value.clone());
            }
        }
        Ok(())
    }

    async fn set_properties(&self, id: &str, properties: &Properties) -> Result<(), TransportError> {
        self.record(Call::SetProperties {
            id: id.to_string(),
            properties: properties.clone(),
        })?;
        if let Some(entity) = self.entities.borrow_mut().get_mut(id) {
            for (key, value) in properties {
                entity.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn create_entity(&self, payload: &Properties) -> Result<Properties, TransportError> {
        self.record(Call::Create {
            payload: payload.clone(),
        })?;
        let mut created = payload.clone();
        let id = match created.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => self.fresh_id("new"),
        };
        created.insert("id".into(), json!(id));
        let parent = created.get("parent").and_then(id_of);
        let mut entities = self.entities.borrow_mut();
        entities.insert(id.clone(), created.clone());
        if let Some(parent) = parent {
            Self::link(&mut entities, &parent, "children", &id, None);
        }
        Ok(created)
    }

    async fn delete_entity(&self, id: &str) -> Result<(), TransportError> {
        self.record(Call::Delete { id: id.to_string() })?;
        let mut entities = self.entities.borrow_mut();
        entities.remove(id);
        Self::unlink(&mut entities, id);
        Ok(())
    }

    async fn apply(&self, mutation: &Mutation) -> Result<Option<Properties>, TransportError> {
        self.record(Call::Apply(mutation.clone()))?;
        let created = match mutation {
            Mutation::AppendChild { id, parent_id, .. } => {
                self.relocate(id, parent_id, None);
                None
            }
            Mutation::InsertRelative {
                id,
                parent_id,
                anchor,
            } => {
                self.relocate(id, parent_id, Some(anchor));
                None
            }
            Mutation::CloneComponent {
                id,
                parent_id,
                anchor,
            } => {
                let mut instance = self.copy(id, parent_id, anchor.as_ref(), false);
                let instance_id = instance["id"].as_str().unwrap().to_string();
                instance.insert("sharedComponentId".into(), json!(id));
                let mut entities = self.entities.borrow_mut();
                entities.insert(instance_id.clone(), instance.clone());
                if let Some(master) = entities.get_mut(id) {
                    if let Some(Value::Array(synced)) = master.get_mut("syncedNodesIds") {
                        synced.push(json!(instance_id));
                    }
                }
                Some(instance)
            }
            Mutation::CloneNode {
                id,
                parent_id,
                anchor,
                deep,
            } => Some(self.copy(id, parent_id, anchor.as_ref(), *deep)),
            Mutation::AppendWidget {
                widget_id,
                parent_id,
                page_id,
                anchor,
            } => {
                let id = self.fresh_id(widget_id);
                let mut entities = self.entities.borrow_mut();
                let name = entities[widget_id.as_str()].get("name").cloned();
                let payload = props(json!({
                    "id": id,
                    "type": "Div",
                    "tag": "div",
                    "name": name,
                    "parent": parent_id,
                    "pageId": page_id,
                    "children": [],
                }));
                entities.insert(id.clone(), payload.clone());
                Self::link(&mut entities, parent_id, "children", &id, anchor.as_ref());
                Some(payload)
            }
            Mutation::MoveToFolder { id, folder_id } => {
                let mut entities = self.entities.borrow_mut();
                Self::unlink(&mut entities, id);
                let is_folder = entities
                    .get(id.as_str())
                    .and_then(|e| e.get("isFolder"))
                    == Some(&json!(true));
                if let Some(entity) = entities.get_mut(id.as_str()) {
                    entity.insert("parent".into(), json!(folder_id));
                }
                if let Some(folder) = folder_id {
                    let list = if is_folder { "folders" } else { "files" };
                    Self::link(&mut entities, folder, list, id, None);
                }
                None
            }
            Mutation::AddFavorite { id } => {
                if let Some(entity) = self.entities.borrow_mut().get_mut(id.as_str()) {
                    entity.insert("isFavorite".into(), json!(true));
                }
                None
            }
            Mutation::MoveToContainer { id, container_id } => {
                let mut entities = self.entities.borrow_mut();
                Self::unlink(&mut entities, id);
                if let Some(entity) = entities.get_mut(id.as_str()) {
                    entity.insert("parent".into(), json!(container_id));
                }
                if let Some(container) = container_id {
                    Self::link(&mut entities, container, "children", id, None);
                }
                None
            }
            Mutation::AddMember {
                group_id,
                member_id,
            } => {
                let mut entities = self.entities.borrow_mut();
                Self::link(&mut entities, group_id, "members", member_id, None);
                None
            }
        };
        Ok(created)
    }
}

pub(crate) fn props(value: Value) -> Properties {
    value.as_object().cloned().unwrap()
}

/// Document with every tree container plus a hidden detail panel
pub(crate) fn dom() -> VirtualDom {
    let config = UiConfig::default();
    let mut dom = VirtualDom::with_containers(config.containers.tree_roots());
    dom.add_container(&config.containers.detail_panel, None);
    dom.add_class(&config.containers.detail_panel, "hidden");
    dom
}

pub(crate) fn model(server: &Rc<FakeServer>) -> StructrModel<VirtualDom> {
    let transport: Rc<dyn Transport> = server.clone();
    StructrModel::new(
        UiConfig::default(),
        dom(),
        transport,
        Box::new(MemoryStorage::new()),
    )
}

/// Two pages, an unattached subtree, a shared component, a widget, a
/// folder tree with a favorite image, a content tree and a user with two
/// groups (member of `editors` only):
///
/// ```text
/// p1 > html1 > body1 > div1 > text1
///                    > div2
/// p2 > html2 > body2
/// u1 > u1c
/// docs > archive, logo
/// ```
pub(crate) fn fixture_server() -> Rc<FakeServer> {
    FakeServer::new(vec![
        json!({"id": "p1", "type": "Page", "isPage": true, "name": "Home", "position": 0,
               "contentType": "text/html", "children": ["html1"]}),
        json!({"id": "p2", "type": "Page", "isPage": true, "name": "About", "position": 1,
               "contentType": "text/html", "children": ["html2"]}),
        json!({"id": "html1", "type": "Html", "tag": "html", "pageId": "p1", "parent": null,
               "children": ["body1"]}),
        json!({"id": "body1", "type": "Body", "tag": "body", "pageId": "p1", "parent": "html1",
               "children": ["div1", "div2"]}),
        json!({"id": "div1", "type": "Div", "tag": "div", "name": "Header", "pageId": "p1",
               "parent": "body1", "_html_id": "top", "_html_class": "nav",
               "children": ["text1"]}),
        json!({"id": "text1", "type": "Content", "isContent": true, "content": "Hello",
               "pageId": "p1", "parent": "div1"}),
        json!({"id": "div2", "type": "Div", "tag": "div", "name": "Footer", "pageId": "p1",
               "parent": "body1", "children": []}),
        json!({"id": "html2", "type": "Html", "tag": "html", "pageId": "p2", "parent": null,
               "children": ["body2"]}),
        json!({"id": "body2", "type": "Body", "tag": "body", "pageId": "p2", "parent": "html2",
               "children": []}),
        json!({"id": "u1", "type": "Div", "tag": "div", "name": "Loose", "children": ["u1c"]}),
        json!({"id": "u1c", "type": "Span", "tag": "span", "name": "Inner", "parent": "u1",
               "children": []}),
        json!({"id": "comp1", "type": "Div", "tag": "nav", "name": "Navigation",
               "pageId": "shadow", "isSharedComponent": true, "syncedNodesIds": [],
               "children": []}),
        json!({"id": "w1", "type": "Widget", "isWidget": true, "name": "Card"}),
        json!({"id": "docs", "type": "Folder", "isFolder": true, "name": "docs",
               "folders": ["archive"], "files": ["logo"]}),
        json!({"id": "archive", "type": "Folder", "isFolder": true, "name": "archive",
               "parent": "docs", "folders": [], "files": []}),
        json!({"id": "logo", "type": "Image", "isFile": true, "isImage": true,
               "name": "logo.png", "parent": "docs", "width": 64, "height": 64,
               "isFavorite": true}),
        json!({"id": "readme", "type": "File", "isFile": true, "name": "README.md",
               "size": 120, "contentType": "text/markdown", "parent": null}),
        json!({"id": "box", "type": "ContentContainer", "isContentContainer": true,
               "name": "Posts", "children": []}),
        json!({"id": "note", "type": "ContentItem", "isContentItem": true, "name": "Hello"}),
        json!({"id": "usr", "type": "User", "isUser": true, "name": "alice",
               "eMail": "alice@example.com", "isAdmin": false}),
        json!({"id": "admins", "type": "Group", "isGroup": true, "name": "admins",
               "members": []}),
        json!({"id": "editors", "type": "Group", "isGroup": true, "name": "editors",
               "members": ["usr"]}),
    ])
}

/// Render both page trees, the unattached pool and the component library.
/// Siblings are created out of order on purpose.
pub(crate) async fn load_page_tree(model: &StructrModel<VirtualDom>, server: &FakeServer) {
    for id in [
        "p2", "p1", "html1", "body1", "div2", "div1", "text1", "html2", "body2", "u1", "u1c",
        "comp1",
    ] {
        model
            .create_from_payload(server.entity(id), None, true)
            .await
            .unwrap();
    }
}
