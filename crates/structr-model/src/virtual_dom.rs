//! In-memory DOM
//!
//! Retained node tree implementing [`Dom`] that the unit tests render into.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::dom::{Dom, FieldWidget, NodeSpec};

/// Header field state
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualField {
    pub widget: FieldWidget,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    pub toggled: bool,
    pub value: Option<String>,
    /// Inline edit input, present only for editable fields
    pub input: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VirtualNode {
    pub entity_id: Option<String>,
    pub classes: BTreeSet<String>,
    pub fields: BTreeMap<String, VirtualField>,
    pub children: Vec<String>,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VirtualDom {
    nodes: HashMap<String, VirtualNode>,
}

impl VirtualDom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document with one top-level container per id
    pub fn with_containers<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let mut dom = Self::new();
        for id in ids {
            dom.add_container(id, None);
        }
        dom
    }

    /// Add an empty container, optionally nested in another one
    pub fn add_container(&mut self, id: &str, parent: Option<&str>) {
        self.nodes.insert(
            id.to_string(),
            VirtualNode {
                parent: parent.map(str::to_string),
                ..Default::default()
            },
        );
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.push(id.to_string());
        }
    }

    pub fn node(&self, key: &str) -> Option<&VirtualNode> {
        self.nodes.get(key)
    }

    pub fn field(&self, key: &str, field: &str) -> Option<&VirtualField> {
        self.nodes.get(key).and_then(|n| n.fields.get(field))
    }

    /// Number of nodes currently rendering `entity_id`
    pub fn count_nodes_for(&self, entity_id: &str) -> usize {
        self.nodes
            .values()
            .filter(|n| n.entity_id.as_deref() == Some(entity_id))
            .count()
    }

    fn field_mut(&mut self, key: &str, field: &str) -> Option<&mut VirtualField> {
        self.nodes.get_mut(key).and_then(|n| n.fields.get_mut(field))
    }

    fn attach(&mut self, key: &str, parent: &str, before: Option<&str>) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.parent = Some(parent.to_string());
        }
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            let index = before
                .and_then(|b| parent_node.children.iter().position(|c| c == b))
                .unwrap_or(parent_node.children.len());
            parent_node.children.insert(index, key.to_string());
        }
    }

    fn detach(&mut self, key: &str) {
        let parent = self.nodes.get(key).and_then(|n| n.parent.clone());
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| c != key);
        }
        if let Some(node) = self.nodes.get_mut(key) {
            node.parent = None;
        }
    }

    fn drop_subtree(&mut self, key: &str, removed: &mut Vec<String>) {
        if let Some(node) = self.nodes.remove(key) {
            if let Some(id) = node.entity_id {
                removed.push(id);
            }
            for child in node.children {
                self.drop_subtree(&child, removed);
            }
        }
    }

    fn sibling(&self, key: &str, offset: isize) -> Option<String> {
        let parent = self.nodes.get(key)?.parent.as_ref()?;
        let siblings = &self.nodes.get(parent)?.children;
        let index = siblings.iter().position(|c| c == key)? as isize + offset;
        if index < 0 {
            return None;
        }
        siblings.get(index as usize).cloned()
    }
}

impl Dom for VirtualDom {
    fn has_node(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    fn entity_of(&self, key: &str) -> Option<String> {
        self.nodes.get(key).and_then(|n| n.entity_id.clone())
    }

    fn insert_node(&mut self, parent: &str, before: Option<&str>, spec: &NodeSpec) -> bool {
        if self.nodes.contains_key(&spec.key) {
            return self.move_node(&spec.key, parent, before);
        }
        if !self.nodes.contains_key(parent) {
            return false;
        }
        let fields = spec
            .fields
            .iter()
            .map(|f| {
                let field = VirtualField {
                    widget: f.widget,
                    text: String::new(),
                    attributes: BTreeMap::new(),
                    toggled: false,
                    value: None,
                    input: f.editable.then(String::new),
                };
                (f.key.to_string(), field)
            })
            .collect();
        self.nodes.insert(
            spec.key.clone(),
            VirtualNode {
                entity_id: Some(spec.entity_id.clone()),
                classes: spec.classes.iter().cloned().collect(),
                fields,
                children: Vec::new(),
                parent: None,
            },
        );
        self.attach(&spec.key, parent, before);
        true
    }

    fn move_node(&mut self, key: &str, parent: &str, before: Option<&str>) -> bool {
        if !self.nodes.contains_key(key) || !self.nodes.contains_key(parent) {
            return false;
        }
        if self.contains(key, parent) {
            return false;
        }
        self.detach(key);
        self.attach(key, parent, before.filter(|b| *b != key));
        true
    }

    fn remove_node(&mut self, key: &str) -> Vec<String> {
        let mut removed = Vec::new();
        self.detach(key);
        self.drop_subtree(key, &mut removed);
        removed
    }

    fn clear_children(&mut self, key: &str) -> Vec<String> {
        let children = self.children(key);
        let mut removed = Vec::new();
        for child in children {
            self.detach(&child);
            self.drop_subtree(&child, &mut removed);
        }
        removed
    }

    fn parent_node(&self, key: &str) -> Option<String> {
        self.nodes.get(key).and_then(|n| n.parent.clone())
    }

    fn children(&self, key: &str) -> Vec<String> {
        self.nodes
            .get(key)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn previous_sibling(&self, key: &str) -> Option<String> {
        self.sibling(key, -1)
    }

    fn next_sibling(&self, key: &str) -> Option<String> {
        self.sibling(key, 1)
    }

    fn contains(&self, ancestor: &str, key: &str) -> bool {
        let mut current = Some(key.to_string());
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.nodes.get(&k).and_then(|n| n.parent.clone());
        }
        false
    }

    fn add_class(&mut self, key: &str, class: &str) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.classes.insert(class.to_string());
        }
    }

    fn remove_class(&mut self, key: &str, class: &str) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.classes.remove(class);
        }
    }

    fn has_class(&self, key: &str, class: &str) -> bool {
        self.nodes
            .get(key)
            .map(|n| n.classes.contains(class))
            .unwrap_or(false)
    }

    fn field_widget(&self, key: &str, field: &str) -> Option<FieldWidget> {
        self.field(key, field).map(|f| f.widget)
    }

    fn set_field_text(&mut self, key: &str, field: &str, text: &str) {
        if let Some(f) = self.field_mut(key, field) {
            f.text = text.to_string();
        }
    }

    fn set_field_attribute(&mut self, key: &str, field: &str, name: &str, value: &str) {
        if let Some(f) = self.field_mut(key, field) {
            f.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn set_field_toggled(&mut self, key: &str, field: &str, on: bool) {
        if let Some(f) = self.field_mut(key, field) {
            f.toggled = on;
        }
    }

    fn set_field_value(&mut self, key: &str, field: &str, value: &str) {
        if let Some(f) = self.field_mut(key, field) {
            f.value = Some(value.to_string());
        }
    }

    fn input_value(&self, key: &str, field: &str) -> Option<String> {
        self.field(key, field).and_then(|f| f.input.clone())
    }

    fn set_input_value(&mut self, key: &str, field: &str, value: &str) {
        if let Some(input) = self.field_mut(key, field).and_then(|f| f.input.as_mut()) {
            *input = value.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::FieldSpec;

    const FIELDS: &[FieldSpec] = &[FieldSpec::label("name").editable(), FieldSpec::toggle("flag")];

    fn spec(key: &str) -> NodeSpec {
        NodeSpec {
            key: key.to_string(),
            entity_id: key.trim_start_matches("id_").to_string(),
            classes: vec!["node".to_string()],
            fields: FIELDS,
        }
    }

    #[test]
    fn test_insert_before_and_append() {
        let mut dom = VirtualDom::with_containers(["root"]);
        assert!(dom.insert_node("root", None, &spec("id_a")));
        assert!(dom.insert_node("root", None, &spec("id_c")));
        assert!(dom.insert_node("root", Some("id_c"), &spec("id_b")));
        // unknown anchor appends
        assert!(dom.insert_node("root", Some("id_zzz"), &spec("id_d")));

        assert_eq!(dom.children("root"), vec!["id_a", "id_b", "id_c", "id_d"]);
        assert_eq!(dom.previous_sibling("id_b").as_deref(), Some("id_a"));
        assert_eq!(dom.next_sibling("id_d"), None);
        assert!(!dom.insert_node("missing", None, &spec("id_e")));
    }

    #[test]
    fn test_move_refuses_own_subtree() {
        let mut dom = VirtualDom::with_containers(["root"]);
        dom.insert_node("root", None, &spec("id_a"));
        dom.insert_node("id_a", None, &spec("id_b"));

        assert!(!dom.move_node("id_a", "id_b", None));
        assert!(dom.contains("id_a", "id_b"));
        assert!(dom.contains("id_a", "id_a"));
        assert!(!dom.contains("id_b", "id_a"));
    }

    #[test]
    fn test_remove_reports_subtree_entities() {
        let mut dom = VirtualDom::with_containers(["root"]);
        dom.insert_node("root", None, &spec("id_a"));
        dom.insert_node("id_a", None, &spec("id_b"));
        dom.insert_node("id_b", None, &spec("id_c"));

        let mut removed = dom.remove_node("id_a");
        removed.sort();
        assert_eq!(removed, vec!["a", "b", "c"]);
        assert!(dom.children("root").is_empty());
        assert!(!dom.has_node("id_c"));
    }

    #[test]
    fn test_fields_follow_spec() {
        let mut dom = VirtualDom::with_containers(["root"]);
        dom.insert_node("root", None, &spec("id_a"));
        dom.set_input_value("id_a", "name", "typed");
        dom.set_input_value("id_a", "flag", "ignored");

        assert_eq!(dom.input_value("id_a", "name").as_deref(), Some("typed"));
        assert_eq!(dom.input_value("id_a", "flag"), None);
        assert_eq!(dom.field_widget("id_a", "flag"), Some(FieldWidget::Toggle));
        assert_eq!(dom.field_widget("id_a", "other"), None);
    }
}
