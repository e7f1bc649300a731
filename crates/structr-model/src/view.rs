//! View Sync
//!
//! Projects resident entities onto their DOM nodes. Every refresh tolerates a
//! missing entity, node or field and simply does nothing.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{trace, warn};

use crate::context::StructrModel;
use crate::dom::{Dom, FieldWidget};
use crate::entity::{is_truthy, reference, Entity, EntityKind};
use crate::error::ModelResult;

/// Label shown for a name that is empty or whitespace only
pub const BLANK_NAME: &str = "(blank name)";
/// Placeholder for empty content, keeps the line height
pub const NBSP: &str = "\u{a0}";

pub const CLASS_HIDDEN: &str = "node-hidden";
pub const CLASS_EXPANDED: &str = "expanded";
pub const CLASS_COLLAPSED: &str = "collapsed";
pub const CLASS_NO_HTML_ATTRS: &str = "no-html-attrs";

const BADGE_FIELD: &str = "html_badge";
const ICON_FIELD: &str = "icon";
const ICON_ATTRIBUTE: &str = "data-icon";

/// Text form of a property value as shown in labels and inputs
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Human readable label: the name, else the tag, else `[Type]`
pub fn display_label(entity: &Entity) -> String {
    match entity.get("name") {
        Some(Value::String(name)) if name.trim().is_empty() => BLANK_NAME.to_string(),
        Some(Value::String(name)) => name.clone(),
        Some(Value::Null) | None => match entity.tag() {
            Some(tag) => tag.to_string(),
            None => format!("[{}]", entity.type_name()),
        },
        Some(other) => value_text(other),
    }
}

/// Icon name from kind and child count
pub fn type_icon(entity: &Entity) -> &'static str {
    let has_children = !entity.children_ids().is_empty();
    match entity.kind() {
        EntityKind::Page => "page",
        EntityKind::Widget => "widget",
        EntityKind::Element | EntityKind::Content if entity.is_shared_component() => {
            "shared-component"
        }
        EntityKind::Element | EntityKind::Content if entity.has("sharedComponentId") => {
            "synced-instance"
        }
        EntityKind::Element if has_children => "element-with-children",
        EntityKind::Element => "element",
        EntityKind::Content => "content",
        EntityKind::Folder if has_children => "folder-full",
        EntityKind::Folder => "folder-empty",
        EntityKind::File => "file",
        EntityKind::Image => "image",
        EntityKind::User if entity.get("isAdmin").map(is_truthy).unwrap_or(false) => "user-admin",
        EntityKind::User => "user",
        EntityKind::Group => "group",
        EntityKind::ResourceAccess => "resource-access",
        EntityKind::CorsSetting => "cors-setting",
        EntityKind::SearchResult => "search-result",
        EntityKind::ContentContainer if has_children => "container-full",
        EntityKind::ContentContainer => "container-empty",
        EntityKind::ContentItem => "content-item",
    }
}

/// `#id.class1.class2` when either HTML attribute is set
pub fn html_badge(entity: &Entity) -> Option<String> {
    if !entity.has("_html_id") && !entity.has("_html_class") {
        return None;
    }
    let mut badge = String::new();
    if let Some(html_id) = entity.get("_html_id").map(value_text).filter(|s| !s.is_empty()) {
        badge.push('#');
        badge.push_str(&html_id);
    }
    if let Some(classes) = entity.get("_html_class").map(value_text) {
        for class in classes.split_whitespace() {
            badge.push('.');
            badge.push_str(class);
        }
    }
    Some(badge)
}

impl<D: Dom> StructrModel<D> {
    /// Render one property into the field bound to `key`, on every node of
    /// `id`
    pub fn refresh_key(&self, id: &str, key: &str) {
        let nodes = self.nodes_of(id);
        if nodes.is_empty() {
            return;
        }
        let Some((value, label)) = self.read(id, |e| {
            let label = (key == "name").then(|| display_label(e));
            (e.get(key).cloned(), label)
        }) else {
            return;
        };
        for node in &nodes {
            self.render_key(node, key, value.as_ref(), label.as_deref());
        }
    }

    fn render_key(&self, node: &str, key: &str, value: Option<&Value>, label: Option<&str>) {
        let mut dom = self.dom.borrow_mut();
        let Some(widget) = dom.field_widget(node, key) else {
            return;
        };

        if let Some(label) = label {
            dom.set_field_attribute(node, key, "title", label);
            dom.set_field_text(node, key, label);
            let raw = value.map(value_text).unwrap_or_default();
            dom.set_input_value(node, key, &raw);
            return;
        }
        let Some(value) = value else {
            return;
        };

        if widget == FieldWidget::Toggle || value.is_boolean() {
            dom.set_field_toggled(node, key, is_truthy(value));
            return;
        }

        let text = value_text(value);
        match widget {
            FieldWidget::Icon => {}
            _ if key == "content" => {
                let shown = if is_truthy(value) { text.as_str() } else { NBSP };
                dom.set_field_text(node, key, shown);
            }
            _ if key == "position" => dom.set_field_text(node, key, &text),
            FieldWidget::Select => dom.set_field_value(node, key, &text),
            _ => {
                dom.set_field_attribute(node, key, "title", &text);
                dom.set_field_text(node, key, &text);
            }
        }
        dom.set_input_value(node, key, &text);
    }

    /// Refresh every known key plus the state derived from several keys
    pub fn refresh_all(&self, id: &str) {
        let nodes = self.nodes_of(id);
        if nodes.is_empty() {
            return;
        }
        let Some(keys) = self.read(id, |e| e.properties().keys().cloned().collect::<Vec<_>>())
        else {
            return;
        };
        for key in &keys {
            self.refresh_key(id, key);
        }
        // label falls back to tag or type when there is no name
        self.refresh_key(id, "name");
        self.refresh_icon(id);

        let Some((badge, hidden, expandable)) = self.read(id, |e| {
            let expandable = e.kind().accepts_children() && !e.children_ids().is_empty();
            (html_badge(e), e.is_hidden(), expandable)
        }) else {
            return;
        };
        let open = self.is_expanded(id);

        let mut dom = self.dom.borrow_mut();
        for node in &nodes {
            if dom.field_widget(node, BADGE_FIELD).is_some() {
                let text = badge.as_deref().unwrap_or_default();
                dom.set_field_attribute(node, BADGE_FIELD, "title", text);
                dom.set_field_text(node, BADGE_FIELD, text);
                dom.set_class(node, CLASS_NO_HTML_ATTRS, badge.is_none());
            }
            dom.set_class(node, CLASS_HIDDEN, hidden);
            dom.set_class(node, CLASS_EXPANDED, expandable && open);
            dom.set_class(node, CLASS_COLLAPSED, expandable && !open);
        }
        trace!(%id, keys = keys.len(), nodes = nodes.len(), "refreshed node");
    }

    pub fn refresh_icon(&self, id: &str) {
        let nodes = self.nodes_of(id);
        let Some(icon) = self.read(id, type_icon) else {
            return;
        };
        let mut dom = self.dom.borrow_mut();
        for node in &nodes {
            dom.set_field_attribute(node, ICON_FIELD, ICON_ATTRIBUTE, icon);
        }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.borrow().contains(id)
    }

    /// Open `id` and render its children, fetching them when some are not
    /// resident or not placed yet
    pub async fn expand(&self, id: &str) -> ModelResult<()> {
        let Some((kind, children)) = self.read(id, |e| (e.kind(), e.children_ids())) else {
            return Ok(());
        };
        self.set_expanded(id, true);
        if kind == EntityKind::Group {
            return self.expand_group(id, &children).await;
        }
        if children.iter().all(|child| self.is_placed(child)) {
            return Ok(());
        }

        let payloads = self.transport.fetch_children(id).await?;
        trace!(%id, count = payloads.len(), "fetched children");
        for payload in payloads {
            self.create_or_update_from_payload(payload, None, true).await?;
        }
        Ok(())
    }

    /// Members are shown under the group; the ones not resident yet are
    /// fetched one by one because they have no `parent` to list them by
    async fn expand_group(&self, id: &str, members: &[String]) -> ModelResult<()> {
        for member in members.iter().filter(|m| !self.is_resident(m)) {
            self.create_from_payload(reference(member), None, true).await?;
        }
        self.render_members(id);
        Ok(())
    }

    pub fn collapse(&self, id: &str) {
        self.set_expanded(id, false);
    }

    pub async fn toggle_expanded(&self, id: &str) -> ModelResult<()> {
        if self.is_expanded(id) {
            self.collapse(id);
            Ok(())
        } else {
            self.expand(id).await
        }
    }

    /// Record the expand state of `id` and persist the whole set
    pub fn set_expanded(&self, id: &str, open: bool) {
        let changed = {
            let mut expanded = self.expanded.borrow_mut();
            if open {
                expanded.insert(id.to_string())
            } else {
                expanded.remove(id)
            }
        };
        if changed {
            self.persist_expanded();
        }
        self.refresh_all(id);
    }

    fn persist_expanded(&self) {
        let serialized = {
            let expanded = self.expanded.borrow();
            serde_json::to_string::<BTreeSet<String>>(&expanded)
        };
        match serialized {
            Ok(raw) => self.storage_set(&self.config.expanded_key, &raw),
            Err(e) => warn!(error = %e, "failed to persist expanded nodes"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Properties;
    use crate::test_support::*;
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        Entity::from_payload(props(value)).unwrap()
    }

    #[test]
    fn test_display_label_fallbacks() {
        assert_eq!(display_label(&entity(json!({"id": "a", "name": "Main"}))), "Main");
        assert_eq!(display_label(&entity(json!({"id": "a", "name": "  "}))), BLANK_NAME);
        assert_eq!(display_label(&entity(json!({"id": "a", "name": null, "tag": "div"}))), "div");
        assert_eq!(
            display_label(&entity(json!({"id": "a", "type": "Template"}))),
            "[Template]"
        );
        assert_eq!(display_label(&entity(json!({"id": "a", "isFolder": true}))), "[Folder]");
    }

    #[test]
    fn test_html_badge() {
        assert_eq!(html_badge(&entity(json!({"id": "a"}))), None);
        assert_eq!(
            html_badge(&entity(json!({"id": "a", "_html_id": "main", "_html_class": "row wide"})))
                .as_deref(),
            Some("#main.row.wide")
        );
        assert_eq!(
            html_badge(&entity(json!({"id": "a", "_html_class": null}))).as_deref(),
            Some("")
        );
    }

    #[test]
    fn test_type_icon_follows_children() {
        assert_eq!(type_icon(&entity(json!({"id": "f", "isFolder": true}))), "folder-empty");
        assert_eq!(
            type_icon(&entity(json!({"id": "f", "isFolder": true, "files": ["x"]}))),
            "folder-full"
        );
        assert_eq!(
            type_icon(&entity(json!({"id": "e", "tag": "div", "children": ["x"]}))),
            "element-with-children"
        );
    }

    #[tokio::test]
    async fn test_refresh_renders_label_badge_and_icon() {
        let server = fixture_server();
        let model = model(&server);
        load_page_tree(&model, &server).await;

        let dom = model.dom();
        let name = dom.field("id_div1", "name").unwrap();
        assert_eq!(name.text, "Header");
        assert_eq!(name.attributes.get("title").map(String::as_str), Some("Header"));
        assert_eq!(name.input.as_deref(), Some("Header"));

        assert_eq!(dom.field("id_div1", "html_badge").unwrap().text, "#top.nav");
        assert!(!dom.has_class("id_div1", CLASS_NO_HTML_ATTRS));
        assert!(dom.has_class("id_div2", CLASS_NO_HTML_ATTRS));

        let icon = dom.field("id_div1", "icon").unwrap();
        assert_eq!(
            icon.attributes.get(ICON_ATTRIBUTE).map(String::as_str),
            Some("element-with-children")
        );
        // a nameless element shows its tag
        assert_eq!(dom.field("id_html1", "name").unwrap().text, "html");
    }

    #[tokio::test]
    async fn test_empty_content_keeps_placeholder() {
        let server = fixture_server();
        let model = model(&server);
        load_page_tree(&model, &server).await;
        assert_eq!(model.dom().field("id_text1", "content").unwrap().text, "Hello");

        let mut update = Properties::new();
        update.insert("id".into(), json!("text1"));
        update.insert("content".into(), json!(""));
        model
            .create_or_update_from_payload(update, None, true)
            .await
            .unwrap();

        let dom = model.dom();
        let content = dom.field("id_text1", "content").unwrap();
        assert_eq!(content.text, NBSP);
        assert_eq!(content.input.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_booleans_toggle_and_select_follows_value() {
        let server = fixture_server();
        let model = model(&server);

        model
            .create_from_payload(
                props(json!({"id": "usr", "isUser": true, "name": "admin", "isAdmin": true})),
                None,
                true,
            )
            .await
            .unwrap();
        model
            .create_from_payload(server.entity("p1"), None, true)
            .await
            .unwrap();

        let dom = model.dom();
        let admin = dom.field("id_usr", "isAdmin").unwrap();
        assert!(admin.toggled);
        assert_eq!(admin.text, "");
        assert_eq!(
            dom.field("id_p1", "contentType").unwrap().value.as_deref(),
            Some("text/html")
        );
        assert_eq!(dom.field("id_p1", "position").unwrap().text, "0");
        assert!(dom.field("id_p1", "position").unwrap().attributes.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_all_is_idempotent() {
        let server = fixture_server();
        let model = model(&server);
        load_page_tree(&model, &server).await;

        model.refresh_all("div1");
        let first = model.dom().node("id_div1").cloned().unwrap();
        model.refresh_all("div1");
        let second = model.dom().node("id_div1").cloned().unwrap();

        assert_eq!(first.fields, second.fields);
        assert_eq!(first.classes, second.classes);
    }

    #[tokio::test]
    async fn test_refresh_without_node_is_silent() {
        let server = fixture_server();
        let model = model(&server);

        model.refresh_all("nobody");
        model.refresh_key("nobody", "name");
        model
            .create_from_payload(props(json!({"id": "x", "name": "x"})), None, false)
            .await
            .unwrap();
        model.refresh_all("x");
        assert_eq!(model.dom().count_nodes_for("x"), 0);
    }

    #[tokio::test]
    async fn test_expand_fetches_missing_children_and_persists() {
        let server = fixture_server();
        let model = model(&server);
        model
            .create_from_payload(server.entity("docs"), None, true)
            .await
            .unwrap();
        assert!(model.dom().has_class("id_docs", CLASS_COLLAPSED));

        model.expand("docs").await.unwrap();

        assert!(model.is_placed("archive"));
        assert!(model.dom().has_class("id_docs", CLASS_EXPANDED));
        assert_eq!(
            model.storage_get(&model.config().expanded_key).as_deref(),
            Some(r#"["docs"]"#)
        );

        server.clear_calls();
        model.collapse("docs");
        model.expand("docs").await.unwrap();
        assert!(server.calls().is_empty());
    }

    #[tokio::test]
    async fn test_expand_group_shows_members() {
        let server = fixture_server();
        let model = model(&server);
        model
            .create_from_payload(server.entity("editors"), None, true)
            .await
            .unwrap();
        assert!(model.dom().children("id_editors").is_empty());

        model.expand("editors").await.unwrap();

        assert_eq!(server.fetches("usr"), 1);
        assert_eq!(model.dom().children("id_editors"), vec!["editors_usr"]);
        assert_eq!(model.dom().parent_node("id_usr").as_deref(), Some("users"));
        assert!(model.dom().has_class("id_editors", CLASS_EXPANDED));
        assert_eq!(
            model.dom().field("editors_usr", "name").unwrap().text,
            "alice"
        );
    }
}
