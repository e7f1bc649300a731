//! Entity Model
//!
//! Client-side mirror of one server entity: immutable id and kind plus the
//! property bag copied from the last-known payload.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::dom::FieldSpec;
use crate::error::{ModelError, ModelResult};

/// Raw entity payload as delivered by the transport
pub type Properties = Map<String, Value>;

/// Shared handle to a resident entity. Identity is preserved across updates.
pub type EntityRef = Rc<RefCell<Entity>>;

/// Keys whose change moves the node to a different container
pub const PLACEMENT_KEYS: &[&str] = &["parent", "pageId"];

/// Variant discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Page,
    Widget,
    Element,
    Content,
    Folder,
    File,
    Image,
    User,
    Group,
    ResourceAccess,
    CorsSetting,
    SearchResult,
    ContentContainer,
    ContentItem,
}

/// Drag-and-drop families. Drops never cross families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeFamily {
    Page,
    File,
    ContentContainer,
    Security,
}

// Images also carry `isFile`, so `isImage` has to be checked first.
const MARKERS: &[(&str, EntityKind)] = &[
    ("isPage", EntityKind::Page),
    ("isWidget", EntityKind::Widget),
    ("isContent", EntityKind::Content),
    ("isFolder", EntityKind::Folder),
    ("isImage", EntityKind::Image),
    ("isFile", EntityKind::File),
    ("isUser", EntityKind::User),
    ("isGroup", EntityKind::Group),
    ("isResourceAccess", EntityKind::ResourceAccess),
    ("isCorsSetting", EntityKind::CorsSetting),
    ("isContentContainer", EntityKind::ContentContainer),
    ("isContentItem", EntityKind::ContentItem),
];

const PAGE_FIELDS: &[FieldSpec] = &[
    FieldSpec::icon(),
    FieldSpec::label("name").editable(),
    FieldSpec::text("position"),
    FieldSpec::select("contentType"),
];
const WIDGET_FIELDS: &[FieldSpec] = &[FieldSpec::icon(), FieldSpec::label("name").editable()];
const ELEMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::icon(),
    FieldSpec::label("name").editable(),
    FieldSpec::label("html_badge"),
];
const CONTENT_FIELDS: &[FieldSpec] = &[FieldSpec::icon(), FieldSpec::text("content").editable()];
const FOLDER_FIELDS: &[FieldSpec] = &[FieldSpec::icon(), FieldSpec::label("name").editable()];
const FILE_FIELDS: &[FieldSpec] = &[
    FieldSpec::icon(),
    FieldSpec::label("name").editable(),
    FieldSpec::label("size"),
    FieldSpec::label("contentType"),
];
const IMAGE_FIELDS: &[FieldSpec] = &[
    FieldSpec::icon(),
    FieldSpec::label("name").editable(),
    FieldSpec::label("width"),
    FieldSpec::label("height"),
];
const USER_FIELDS: &[FieldSpec] = &[
    FieldSpec::icon(),
    FieldSpec::label("name").editable(),
    FieldSpec::label("eMail"),
    FieldSpec::toggle("isAdmin"),
];
const GROUP_FIELDS: &[FieldSpec] = &[FieldSpec::icon(), FieldSpec::label("name").editable()];
const RESOURCE_ACCESS_FIELDS: &[FieldSpec] = &[
    FieldSpec::icon(),
    FieldSpec::label("signature"),
    FieldSpec::label("flags"),
    FieldSpec::toggle("visibleToPublicUsers"),
    FieldSpec::toggle("visibleToAuthenticatedUsers"),
    FieldSpec::text("position"),
];
const CORS_SETTING_FIELDS: &[FieldSpec] = &[
    FieldSpec::icon(),
    FieldSpec::label("requestUri"),
    FieldSpec::label("acceptedOrigins"),
    FieldSpec::label("maxAge"),
];
const SEARCH_RESULT_FIELDS: &[FieldSpec] = &[
    FieldSpec::icon(),
    FieldSpec::label("name"),
    FieldSpec::label("type"),
];
const CONTENT_CONTAINER_FIELDS: &[FieldSpec] =
    &[FieldSpec::icon(), FieldSpec::label("name").editable()];
const CONTENT_ITEM_FIELDS: &[FieldSpec] =
    &[FieldSpec::icon(), FieldSpec::label("name").editable()];

impl EntityKind {
    /// Select the variant for a payload. An explicit `kind` field wins over
    /// the boolean markers; without either the payload is a generic element.
    ///
    /// `kind: SearchResult` only says how a hit is shown. The markers still
    /// decide, and a hit is a `SearchResult` only when nothing else is known.
    pub fn classify(payload: &Properties) -> Self {
        let explicit = payload
            .get("kind")
            .and_then(Value::as_str)
            .and_then(EntityKind::from_name);
        if let Some(kind) = explicit.filter(|k| *k != EntityKind::SearchResult) {
            return kind;
        }
        let marked = MARKERS
            .iter()
            .find(|(marker, _)| payload.get(*marker).and_then(Value::as_bool) == Some(true))
            .map(|(_, kind)| *kind);
        match (marked, explicit) {
            (Some(kind), _) => kind,
            (None, Some(hit)) if !payload.contains_key("tag") => hit,
            _ => EntityKind::Element,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "Page" => EntityKind::Page,
            "Widget" => EntityKind::Widget,
            "Element" => EntityKind::Element,
            "Content" => EntityKind::Content,
            "Folder" => EntityKind::Folder,
            "File" => EntityKind::File,
            "Image" => EntityKind::Image,
            "User" => EntityKind::User,
            "Group" => EntityKind::Group,
            "ResourceAccess" => EntityKind::ResourceAccess,
            "CorsSetting" => EntityKind::CorsSetting,
            "SearchResult" => EntityKind::SearchResult,
            "ContentContainer" => EntityKind::ContentContainer,
            "ContentItem" => EntityKind::ContentItem,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Page => "Page",
            EntityKind::Widget => "Widget",
            EntityKind::Element => "Element",
            EntityKind::Content => "Content",
            EntityKind::Folder => "Folder",
            EntityKind::File => "File",
            EntityKind::Image => "Image",
            EntityKind::User => "User",
            EntityKind::Group => "Group",
            EntityKind::ResourceAccess => "ResourceAccess",
            EntityKind::CorsSetting => "CorsSetting",
            EntityKind::SearchResult => "SearchResult",
            EntityKind::ContentContainer => "ContentContainer",
            EntityKind::ContentItem => "ContentItem",
        }
    }

    /// CSS class put on every node of this kind
    pub fn css_class(self) -> &'static str {
        match self {
            EntityKind::Page => "page",
            EntityKind::Widget => "widget",
            EntityKind::Element => "element",
            EntityKind::Content => "content",
            EntityKind::Folder => "folder",
            EntityKind::File => "file",
            EntityKind::Image => "image",
            EntityKind::User => "user",
            EntityKind::Group => "group",
            EntityKind::ResourceAccess => "resource-access",
            EntityKind::CorsSetting => "cors-setting",
            EntityKind::SearchResult => "search-result",
            EntityKind::ContentContainer => "content-container",
            EntityKind::ContentItem => "content-item",
        }
    }

    pub fn family(self) -> Option<TreeFamily> {
        match self {
            EntityKind::Page | EntityKind::Widget | EntityKind::Element | EntityKind::Content => {
                Some(TreeFamily::Page)
            }
            EntityKind::Folder | EntityKind::File | EntityKind::Image => Some(TreeFamily::File),
            EntityKind::ContentContainer | EntityKind::ContentItem => {
                Some(TreeFamily::ContentContainer)
            }
            EntityKind::User | EntityKind::Group => Some(TreeFamily::Security),
            EntityKind::ResourceAccess | EntityKind::CorsSetting | EntityKind::SearchResult => None,
        }
    }

    /// Whether nodes of this kind may hold child nodes
    pub fn accepts_children(self) -> bool {
        matches!(
            self,
            EntityKind::Page
                | EntityKind::Element
                | EntityKind::Folder
                | EntityKind::Group
                | EntityKind::ContentContainer
        )
    }

    pub fn supports_save(self) -> bool {
        matches!(
            self,
            EntityKind::File
                | EntityKind::Folder
                | EntityKind::Image
                | EntityKind::Content
                | EntityKind::Element
                | EntityKind::ContentItem
        )
    }

    /// Header fields rendered for nodes of this kind
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            EntityKind::Page => PAGE_FIELDS,
            EntityKind::Widget => WIDGET_FIELDS,
            EntityKind::Element => ELEMENT_FIELDS,
            EntityKind::Content => CONTENT_FIELDS,
            EntityKind::Folder => FOLDER_FIELDS,
            EntityKind::File => FILE_FIELDS,
            EntityKind::Image => IMAGE_FIELDS,
            EntityKind::User => USER_FIELDS,
            EntityKind::Group => GROUP_FIELDS,
            EntityKind::ResourceAccess => RESOURCE_ACCESS_FIELDS,
            EntityKind::CorsSetting => CORS_SETTING_FIELDS,
            EntityKind::SearchResult => SEARCH_RESULT_FIELDS,
            EntityKind::ContentContainer => CONTENT_CONTAINER_FIELDS,
            EntityKind::ContentItem => CONTENT_ITEM_FIELDS,
        }
    }
}

/// Where one node of an entity is shown. An entity has its home node in its
/// own tree and may show up again as a search hit, a group member or a
/// favorite; each placement has its own node and render state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Home,
    Search,
    /// Under the node of the group with this id
    Member(String),
    Favorite,
}

impl Scope {
    /// DOM key of the node rendering entity `id` in this scope
    pub fn node_key(&self, id: &str) -> String {
        match self {
            Scope::Home => format!("id_{}", id),
            Scope::Search => format!("search_{}", id),
            Scope::Member(group) => format!("{}_{}", group, id),
            Scope::Favorite => format!("fav_{}", id),
        }
    }
}

/// Render state of an entity's DOM node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
    Unrendered,
    Rendered { node: String },
    Detached,
}

static UNRENDERED: RenderState = RenderState::Unrendered;

#[derive(Debug, Clone)]
pub struct Entity {
    id: String,
    kind: EntityKind,
    properties: Properties,
    placements: BTreeMap<Scope, RenderState>,
}

impl Entity {
    pub fn from_payload(payload: Properties) -> ModelResult<Self> {
        let id = payload_id(&payload)?;
        let kind = EntityKind::classify(&payload);
        Ok(Self {
            id,
            kind,
            properties: payload,
            placements: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Copy every key of `payload` onto this entity. Keys the payload omits
    /// stay as they are; `id`, `kind` and an already known `type` never
    /// change. Returns the keys whose value actually changed.
    pub fn merge(&mut self, payload: &Properties) -> Vec<String> {
        let mut changed = Vec::new();
        for (key, value) in payload {
            if key == "id"
                || key == "kind"
                || (key == "type" && self.properties.contains_key("type"))
            {
                continue;
            }
            if self.properties.get(key) != Some(value) {
                self.properties.insert(key.clone(), value.clone());
                changed.push(key.clone());
            }
        }
        changed
    }

    pub fn set(&mut self, key: &str, value: Value) {
        if key != "id" {
            self.properties.insert(key.to_string(), value);
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }

    pub fn tag(&self) -> Option<&str> {
        self.get("tag").and_then(Value::as_str)
    }

    /// Server type name, falling back to the variant name
    pub fn type_name(&self) -> &str {
        self.get("type")
            .and_then(Value::as_str)
            .unwrap_or_else(|| self.kind.name())
    }

    pub fn parent_id(&self) -> Option<String> {
        self.get("parent").and_then(id_of)
    }

    /// Page this entity belongs to; a page belongs to itself
    pub fn page_id(&self) -> Option<String> {
        if self.kind == EntityKind::Page {
            return Some(self.id.clone());
        }
        self.get("pageId").and_then(id_of)
    }

    /// Ordered child ids as declared by the server
    pub fn children_ids(&self) -> Vec<String> {
        if let Some(children) = self.get("children") {
            return ids_of(children);
        }
        match self.kind {
            EntityKind::Folder => {
                let mut ids = self.get("folders").map(ids_of).unwrap_or_default();
                ids.extend(self.get("files").map(ids_of).unwrap_or_default());
                ids
            }
            EntityKind::Group => self.get("members").map(ids_of).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Parent in the tree: the `parent` reference, or the page for top-level
    /// page elements
    pub fn logical_parent_id(&self) -> Option<String> {
        self.parent_id().or_else(|| match self.kind {
            EntityKind::Element | EntityKind::Content => self.page_id(),
            _ => None,
        })
    }

    /// Drop `child` from every child list; true if it was listed
    pub fn forget_child(&mut self, child: &str) -> bool {
        let mut found = false;
        for key in ["children", "folders", "files", "members"] {
            if let Some(Value::Array(items)) = self.properties.get_mut(key) {
                let before = items.len();
                items.retain(|item| id_of(item).as_deref() != Some(child));
                found |= items.len() != before;
            }
        }
        found
    }

    pub fn synced_nodes_ids(&self) -> Vec<String> {
        self.get("syncedNodesIds").map(ids_of).unwrap_or_default()
    }

    /// Master definition of a shared component (not one of its instances)
    pub fn is_shared_component(&self) -> bool {
        if self.get("isSharedComponent").and_then(Value::as_bool) == Some(true) {
            return true;
        }
        !self.synced_nodes_ids().is_empty()
            && self.get("sharedComponentId").and_then(id_of).is_none()
            && self.get("sharedComponent").and_then(id_of).is_none()
    }

    pub fn is_hidden(&self) -> bool {
        self.get("hidden").map(is_truthy).unwrap_or(false)
    }

    /// A bare search hit learns its real kind from the first full payload.
    /// True if the kind changed.
    pub fn settle_kind(&mut self, payload: &Properties) -> bool {
        if self.kind != EntityKind::SearchResult || is_search_hit(payload) {
            return false;
        }
        match EntityKind::classify(payload) {
            EntityKind::SearchResult => false,
            kind => {
                self.kind = kind;
                true
            }
        }
    }

    /// Scope of the node that `append` renders: the tree, or the result list
    /// for an entity known only as a search hit
    pub fn home_scope(&self) -> Scope {
        match self.kind {
            EntityKind::SearchResult => Scope::Search,
            _ => Scope::Home,
        }
    }

    /// Render state of the home node
    pub fn render_state(&self) -> &RenderState {
        self.render_state_in(&self.home_scope())
    }

    pub fn render_state_in(&self, scope: &Scope) -> &RenderState {
        self.placements.get(scope).unwrap_or(&UNRENDERED)
    }

    pub fn set_render_state(&mut self, scope: Scope, state: RenderState) {
        self.placements.insert(scope, state);
    }

    /// Home node key while rendered
    pub fn node_key(&self) -> Option<&str> {
        self.node_key_in(&self.home_scope())
    }

    pub fn node_key_in(&self, scope: &Scope) -> Option<&str> {
        match self.placements.get(scope) {
            Some(RenderState::Rendered { node }) => Some(node),
            _ => None,
        }
    }

    /// Every rendered placement with its node key
    pub fn rendered(&self) -> Vec<(Scope, String)> {
        self.placements
            .iter()
            .filter_map(|(scope, state)| match state {
                RenderState::Rendered { node } => Some((scope.clone(), node.clone())),
                _ => None,
            })
            .collect()
    }
}

/// Payload of a search hit rather than of the entity itself
pub fn is_search_hit(payload: &Properties) -> bool {
    payload.get("kind").and_then(Value::as_str) == Some(EntityKind::SearchResult.name())
}

/// Extract the mandatory string id of a payload
pub fn payload_id(payload: &Properties) -> ModelResult<String> {
    payload
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ModelError::MalformedPayload("payload has no string id".into()))
}

/// A payload carrying nothing but the id: a reference to be fetched
pub fn is_reference_only(payload: &Properties) -> bool {
    payload.len() == 1 && payload.contains_key("id")
}

/// Id-only payload for `id`
pub fn reference(id: &str) -> Properties {
    let mut payload = Properties::new();
    payload.insert("id".to_string(), Value::String(id.to_string()));
    payload
}

/// Id of a reference value: either the id string or an object with `id`
pub fn id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn ids_of(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(id_of).collect())
        .unwrap_or_default()
}

/// JavaScript truthiness, used where the UI historically relied on it
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_classify_by_marker() {
        assert_eq!(EntityKind::classify(&props(json!({"id": "a", "isPage": true}))), EntityKind::Page);
        assert_eq!(
            EntityKind::classify(&props(json!({"id": "a", "isFile": true, "isImage": true}))),
            EntityKind::Image
        );
        assert_eq!(
            EntityKind::classify(&props(json!({"id": "a", "isFile": true, "isImage": false}))),
            EntityKind::File
        );
        assert_eq!(EntityKind::classify(&props(json!({"id": "a", "tag": "div"}))), EntityKind::Element);
    }

    #[test]
    fn test_kind_field_wins_over_markers() {
        let payload = props(json!({"id": "a", "kind": "Folder", "isPage": true}));
        assert_eq!(EntityKind::classify(&payload), EntityKind::Folder);
    }

    #[test]
    fn test_search_hit_keeps_its_real_kind() {
        let page_hit = props(json!({"id": "a", "kind": "SearchResult", "isPage": true}));
        let element_hit = props(json!({"id": "b", "kind": "SearchResult", "tag": "div"}));
        let bare_hit = props(json!({"id": "c", "kind": "SearchResult", "name": "c"}));

        assert_eq!(EntityKind::classify(&page_hit), EntityKind::Page);
        assert_eq!(EntityKind::classify(&element_hit), EntityKind::Element);
        assert_eq!(EntityKind::classify(&bare_hit), EntityKind::SearchResult);
    }

    #[test]
    fn test_bare_hit_settles_on_full_payload() {
        let mut entity =
            Entity::from_payload(props(json!({"id": "c", "kind": "SearchResult"}))).unwrap();
        assert_eq!(entity.home_scope(), Scope::Search);

        assert!(!entity.settle_kind(&props(json!({"id": "c", "kind": "SearchResult"}))));
        assert!(entity.settle_kind(&props(json!({"id": "c", "isFolder": true}))));
        assert_eq!(entity.kind(), EntityKind::Folder);
        assert_eq!(entity.home_scope(), Scope::Home);
    }

    #[test]
    fn test_placements_render_independently() {
        let mut entity = Entity::from_payload(props(json!({"id": "u", "isUser": true}))).unwrap();
        entity.set_render_state(Scope::Home, RenderState::Rendered { node: "id_u".into() });
        entity.set_render_state(
            Scope::Member("g".into()),
            RenderState::Rendered { node: "g_u".into() },
        );
        entity.set_render_state(Scope::Member("g".into()), RenderState::Detached);

        assert_eq!(entity.node_key(), Some("id_u"));
        assert_eq!(entity.node_key_in(&Scope::Member("g".into())), None);
        assert_eq!(entity.render_state_in(&Scope::Favorite), &RenderState::Unrendered);
        assert_eq!(entity.rendered(), vec![(Scope::Home, "id_u".to_string())]);
    }

    #[test]
    fn test_missing_id_is_malformed() {
        let err = Entity::from_payload(props(json!({"name": "nobody"}))).unwrap_err();
        assert!(matches!(err, ModelError::MalformedPayload(_)));
    }

    #[test]
    fn test_references_resolve_from_string_or_object() {
        let entity = Entity::from_payload(props(json!({
            "id": "c",
            "parent": {"id": "p", "name": "parent"},
            "children": ["x", {"id": "y"}, null],
        })))
        .unwrap();

        assert_eq!(entity.parent_id().as_deref(), Some("p"));
        assert_eq!(entity.children_ids(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_folder_children_combine_folders_and_files() {
        let folder = Entity::from_payload(props(json!({
            "id": "f", "isFolder": true,
            "folders": [{"id": "sub"}], "files": [{"id": "doc"}],
        })))
        .unwrap();
        assert_eq!(folder.children_ids(), vec!["sub".to_string(), "doc".to_string()]);
    }

    #[test]
    fn test_merge_is_non_destructive() {
        let mut entity = Entity::from_payload(props(json!({"id": "e", "a": 1, "b": 2}))).unwrap();
        let changed = entity.merge(&props(json!({"id": "other", "a": 9})));

        assert_eq!(changed, vec!["a".to_string()]);
        assert_eq!(entity.id(), "e");
        assert_eq!(entity.get("a"), Some(&json!(9)));
        assert_eq!(entity.get("b"), Some(&json!(2)));
    }

    #[test]
    fn test_shared_component_master_vs_instance() {
        let master = Entity::from_payload(props(json!({"id": "m", "syncedNodesIds": ["i"]}))).unwrap();
        let instance = Entity::from_payload(props(json!({
            "id": "i", "syncedNodesIds": ["m"], "sharedComponentId": "m",
        })))
        .unwrap();

        assert!(master.is_shared_component());
        assert!(!instance.is_shared_component());
    }

    #[test]
    fn test_page_belongs_to_itself() {
        let page = Entity::from_payload(props(json!({"id": "p1", "isPage": true}))).unwrap();
        assert_eq!(page.page_id().as_deref(), Some("p1"));
    }
}
