//! DOM Surface
//!
//! The part of the document the view layer touches. Nodes are addressed by
//! their DOM id ("node key"); header fields inside a node are addressed by
//! the bound property key (rendered as the `<key>_` class).

/// How a header field displays its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidget {
    /// Type icon, driven through the `data-icon` attribute
    Icon,
    /// Truncated label with a `title` tooltip
    Label,
    /// Plain text without tooltip
    Text,
    /// Checkbox-like toggled state
    Toggle,
    /// `<select>` whose selected value follows the property
    Select,
}

/// A header field bound to one property key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub widget: FieldWidget,
    /// Rendered with an inline edit input (`<key>_input`)
    pub editable: bool,
}

impl FieldSpec {
    pub const fn icon() -> Self {
        Self::new("icon", FieldWidget::Icon)
    }

    pub const fn label(key: &'static str) -> Self {
        Self::new(key, FieldWidget::Label)
    }

    pub const fn text(key: &'static str) -> Self {
        Self::new(key, FieldWidget::Text)
    }

    pub const fn toggle(key: &'static str) -> Self {
        Self::new(key, FieldWidget::Toggle)
    }

    pub const fn select(key: &'static str) -> Self {
        Self::new(key, FieldWidget::Select)
    }

    pub const fn editable(self) -> Self {
        Self {
            editable: true,
            ..self
        }
    }

    const fn new(key: &'static str, widget: FieldWidget) -> Self {
        Self {
            key,
            widget,
            editable: false,
        }
    }
}

/// Everything needed to create an entity node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub key: String,
    pub entity_id: String,
    pub classes: Vec<String>,
    pub fields: &'static [FieldSpec],
}

/// Document operations used by the view layer.
///
/// Every method tolerates unknown keys: lookups return `None`/`false`,
/// mutations do nothing.
pub trait Dom {
    fn has_node(&self, key: &str) -> bool;

    /// Entity rendered by node `key`; `None` for containers
    fn entity_of(&self, key: &str) -> Option<String>;

    /// Create a node as child of `parent`, before sibling `before` when that
    /// is a child of `parent`, else at the end. Returns false without parent.
    fn insert_node(&mut self, parent: &str, before: Option<&str>, spec: &NodeSpec) -> bool;

    /// Re-parent an existing node. Refuses to move a node into its own subtree.
    fn move_node(&mut self, key: &str, parent: &str, before: Option<&str>) -> bool;

    /// Remove a node with its subtree; returns the entity ids that were rendered in it
    fn remove_node(&mut self, key: &str) -> Vec<String>;

    /// Remove all children of `key`; returns the entity ids that were rendered in them
    fn clear_children(&mut self, key: &str) -> Vec<String>;

    fn parent_node(&self, key: &str) -> Option<String>;

    fn children(&self, key: &str) -> Vec<String>;

    fn previous_sibling(&self, key: &str) -> Option<String>;

    fn next_sibling(&self, key: &str) -> Option<String>;

    /// Inclusive containment: a node contains itself
    fn contains(&self, ancestor: &str, key: &str) -> bool;

    fn add_class(&mut self, key: &str, class: &str);

    fn remove_class(&mut self, key: &str, class: &str);

    fn has_class(&self, key: &str, class: &str) -> bool;

    fn field_widget(&self, key: &str, field: &str) -> Option<FieldWidget>;

    fn set_field_text(&mut self, key: &str, field: &str, text: &str);

    fn set_field_attribute(&mut self, key: &str, field: &str, name: &str, value: &str);

    fn set_field_toggled(&mut self, key: &str, field: &str, on: bool);

    fn set_field_value(&mut self, key: &str, field: &str, value: &str);

    /// Current value of the inline edit input bound to `field`, if any
    fn input_value(&self, key: &str, field: &str) -> Option<String>;

    fn set_input_value(&mut self, key: &str, field: &str, value: &str);

    fn set_class(&mut self, key: &str, class: &str, on: bool) {
        if on {
            self.add_class(key, class);
        } else {
            self.remove_class(key, class);
        }
    }
}
