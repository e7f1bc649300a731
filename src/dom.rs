//! Browser DOM
//!
//! `Dom` over the live document. An entity node renders as
//!
//! ```text
//! div#<key>.node[data-structr-id]
//!   div.node-header   fields (.<key>_) and inline inputs (.<key>_input)
//!   div.node-children
//! ```
//!
//! Containers are plain elements found by id whose children are the nodes.

use structr_model::{Dom, FieldSpec, FieldWidget, NodeSpec};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlInputElement, HtmlSelectElement};

const NODE_CLASS: &str = "node";
const HEADER_CLASS: &str = "node-header";
const CHILDREN_CLASS: &str = "node-children";
const TOGGLED_CLASS: &str = "toggled";
const WIDGET_ATTRIBUTE: &str = "data-widget";

pub struct WebDom {
    document: Document,
}

impl WebDom {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// Dom of the current window's document
    pub fn from_window() -> Option<Self> {
        let document = web_sys::window()?.document()?;
        Some(Self::new(document))
    }

    fn element(&self, key: &str) -> Option<Element> {
        self.document.get_element_by_id(key)
    }

    fn is_node(element: &Element) -> bool {
        element.class_list().contains(NODE_CLASS)
    }

    /// Element the children of `key` live in
    fn children_host(&self, key: &str) -> Option<Element> {
        let element = self.element(key)?;
        if Self::is_node(&element) {
            return Self::direct_child(&element, CHILDREN_CLASS);
        }
        Some(element)
    }

    fn direct_child(element: &Element, class: &str) -> Option<Element> {
        element
            .query_selector(&format!(":scope > .{}", class))
            .ok()
            .flatten()
    }

    fn field(&self, key: &str, field: &str) -> Option<Element> {
        let header = Self::direct_child(&self.element(key)?, HEADER_CLASS)?;
        Self::direct_child(&header, &format!("{}_", field))
    }

    fn input(&self, key: &str, field: &str) -> Option<HtmlInputElement> {
        let header = Self::direct_child(&self.element(key)?, HEADER_CLASS)?;
        Self::direct_child(&header, &format!("{}_input", field))?
            .dyn_into::<HtmlInputElement>()
            .ok()
    }

    fn create_field(&self, spec: &FieldSpec) -> Option<Element> {
        let (tag, widget) = match spec.widget {
            FieldWidget::Icon => ("i", "icon"),
            FieldWidget::Label => ("span", "label"),
            FieldWidget::Text => ("span", "text"),
            FieldWidget::Toggle => ("span", "toggle"),
            FieldWidget::Select => ("select", "select"),
        };
        let element = self.document.create_element(tag).ok()?;
        element.set_class_name(&format!("{}_", spec.key));
        element.set_attribute(WIDGET_ATTRIBUTE, widget).ok()?;
        Some(element)
    }

    fn create_node(&self, spec: &NodeSpec) -> Option<Element> {
        let node = self.document.create_element("div").ok()?;
        node.set_id(&spec.key);
        node.set_class_name(&spec.classes.join(" "));
        node.set_attribute(leptos_dragdrop::ID_ATTRIBUTE, &spec.entity_id)
            .ok()?;

        let header = self.document.create_element("div").ok()?;
        header.set_class_name(HEADER_CLASS);
        for field in spec.fields {
            header.append_child(&self.create_field(field)?.into()).ok()?;
            if field.editable {
                let input = self.document.create_element("input").ok()?;
                input.set_class_name(&format!("{}_input", field.key));
                input.set_attribute("hidden", "").ok()?;
                header.append_child(&input).ok()?;
            }
        }
        node.append_child(&header).ok()?;

        let children = self.document.create_element("div").ok()?;
        children.set_class_name(CHILDREN_CLASS);
        node.append_child(&children).ok()?;
        Some(node)
    }

    /// Put `element` into `host`, before `before` when that is a child of `host`
    fn place(&self, element: &Element, host: &Element, before: Option<&str>) -> bool {
        let reference = before
            .and_then(|b| self.element(b))
            .filter(|b| b.parent_element().as_ref() == Some(host));
        let reference = reference.as_ref().map(|r| -> &web_sys::Node { r });
        host.insert_before(element, reference).is_ok()
    }

    fn entity_ids_within(element: &Element) -> Vec<String> {
        let mut ids: Vec<String> = element
            .get_attribute(leptos_dragdrop::ID_ATTRIBUTE)
            .into_iter()
            .collect();
        let selector = format!("[{}]", leptos_dragdrop::ID_ATTRIBUTE);
        if let Ok(list) = element.query_selector_all(&selector) {
            for i in 0..list.length() {
                let id = list
                    .item(i)
                    .and_then(|n| n.dyn_into::<Element>().ok())
                    .and_then(|e| e.get_attribute(leptos_dragdrop::ID_ATTRIBUTE));
                ids.extend(id);
            }
        }
        ids
    }

    fn key_of(element: Option<Element>) -> Option<String> {
        element.map(|e| e.id()).filter(|id| !id.is_empty())
    }
}

impl Dom for WebDom {
    fn has_node(&self, key: &str) -> bool {
        self.element(key).is_some()
    }

    fn entity_of(&self, key: &str) -> Option<String> {
        self.element(key)?
            .get_attribute(leptos_dragdrop::ID_ATTRIBUTE)
    }

    fn insert_node(&mut self, parent: &str, before: Option<&str>, spec: &NodeSpec) -> bool {
        if self.has_node(&spec.key) {
            return self.move_node(&spec.key, parent, before);
        }
        let Some(host) = self.children_host(parent) else {
            return false;
        };
        let Some(node) = self.create_node(spec) else {
            return false;
        };
        self.place(&node, &host, before)
    }

    fn move_node(&mut self, key: &str, parent: &str, before: Option<&str>) -> bool {
        let (Some(element), Some(host)) = (self.element(key), self.children_host(parent)) else {
            return false;
        };
        if element.contains(Some(&*host)) {
            return false;
        }
        self.place(&element, &host, before.filter(|b| *b != key))
    }

    fn remove_node(&mut self, key: &str) -> Vec<String> {
        let Some(element) = self.element(key) else {
            return Vec::new();
        };
        let ids = Self::entity_ids_within(&element);
        element.remove();
        ids
    }

    fn clear_children(&mut self, key: &str) -> Vec<String> {
        let Some(host) = self.children_host(key) else {
            return Vec::new();
        };
        let mut ids = Vec::new();
        while let Some(child) = host.first_element_child() {
            ids.extend(Self::entity_ids_within(&child));
            child.remove();
        }
        ids
    }

    fn parent_node(&self, key: &str) -> Option<String> {
        let parent = self.element(key)?.parent_element()?;
        if parent.class_list().contains(CHILDREN_CLASS) {
            return Self::key_of(parent.parent_element());
        }
        Self::key_of(Some(parent))
    }

    fn children(&self, key: &str) -> Vec<String> {
        let Some(host) = self.children_host(key) else {
            return Vec::new();
        };
        let children = host.children();
        (0..children.length())
            .filter_map(|i| Self::key_of(children.item(i)))
            .collect()
    }

    fn previous_sibling(&self, key: &str) -> Option<String> {
        Self::key_of(self.element(key)?.previous_element_sibling())
    }

    fn next_sibling(&self, key: &str) -> Option<String> {
        Self::key_of(self.element(key)?.next_element_sibling())
    }

    fn contains(&self, ancestor: &str, key: &str) -> bool {
        match (self.element(ancestor), self.element(key)) {
            (Some(outer), Some(inner)) => outer.contains(Some(&*inner)),
            _ => false,
        }
    }

    fn add_class(&mut self, key: &str, class: &str) {
        if let Some(element) = self.element(key) {
            let _ = element.class_list().add_1(class);
        }
    }

    fn remove_class(&mut self, key: &str, class: &str) {
        if let Some(element) = self.element(key) {
            let _ = element.class_list().remove_1(class);
        }
    }

    fn has_class(&self, key: &str, class: &str) -> bool {
        self.element(key)
            .map(|e| e.class_list().contains(class))
            .unwrap_or(false)
    }

    fn field_widget(&self, key: &str, field: &str) -> Option<FieldWidget> {
        let widget = match self.field(key, field)?.get_attribute(WIDGET_ATTRIBUTE)?.as_str() {
            "icon" => FieldWidget::Icon,
            "label" => FieldWidget::Label,
            "text" => FieldWidget::Text,
            "toggle" => FieldWidget::Toggle,
            "select" => FieldWidget::Select,
            _ => return None,
        };
        Some(widget)
    }

    fn set_field_text(&mut self, key: &str, field: &str, text: &str) {
        if let Some(element) = self.field(key, field) {
            element.set_text_content(Some(text));
        }
    }

    fn set_field_attribute(&mut self, key: &str, field: &str, name: &str, value: &str) {
        if let Some(element) = self.field(key, field) {
            let _ = element.set_attribute(name, value);
        }
    }

    fn set_field_toggled(&mut self, key: &str, field: &str, on: bool) {
        if let Some(element) = self.field(key, field) {
            let _ = element.class_list().toggle_with_force(TOGGLED_CLASS, on);
            let _ = element.set_attribute("aria-checked", if on { "true" } else { "false" });
        }
    }

    fn set_field_value(&mut self, key: &str, field: &str, value: &str) {
        let Some(select) = self
            .field(key, field)
            .and_then(|e| e.dyn_into::<HtmlSelectElement>().ok())
        else {
            return;
        };
        select.set_value(value);
        if select.value() != value {
            // unknown option: add it so the value can show
            if let Ok(option) = self.document.create_element("option") {
                let _ = option.set_attribute("value", value);
                option.set_text_content(Some(value));
                let _ = select.append_child(&option);
                select.set_value(value);
            }
        }
    }

    fn input_value(&self, key: &str, field: &str) -> Option<String> {
        self.input(key, field).map(|input| input.value())
    }

    fn set_input_value(&mut self, key: &str, field: &str, value: &str) {
        if let Some(input) = self.input(key, field) {
            input.set_value(value);
        }
    }
}
