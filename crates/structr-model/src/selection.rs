//! Selection
//!
//! The active element is persisted under the configured selection key and
//! shown in the detail panel.

use tracing::debug;

use crate::context::StructrModel;
use crate::dom::Dom;

pub const CLASS_SELECTED: &str = "nodeSelected";
pub const CLASS_PANEL_HIDDEN: &str = "hidden";

impl<D: Dom> StructrModel<D> {
    /// Mark `id` as the active element and open the detail panel
    pub fn select(&self, id: &str) {
        if let Some(previous) = self.selected_id() {
            if let Some(node) = self.node_of(&previous) {
                self.dom.borrow_mut().remove_class(&node, CLASS_SELECTED);
            }
        }
        self.storage_set(&self.config.selection_key, id);

        let node = self.node_of(id);
        let mut dom = self.dom.borrow_mut();
        dom.remove_class(&self.config.containers.detail_panel, CLASS_PANEL_HIDDEN);
        if let Some(node) = node {
            dom.add_class(&node, CLASS_SELECTED);
        }
        debug!(%id, "selected");
    }

    pub fn selected_id(&self) -> Option<String> {
        self.storage_get(&self.config.selection_key)
            .filter(|id| !id.is_empty())
    }

    /// Forget the active element and hide the detail panel
    pub fn clear_selection(&self) {
        if let Some(previous) = self.selected_id() {
            if let Some(node) = self.node_of(&previous) {
                self.dom.borrow_mut().remove_class(&node, CLASS_SELECTED);
            }
        }
        self.storage_remove(&self.config.selection_key);
        self.dom
            .borrow_mut()
            .add_class(&self.config.containers.detail_panel, CLASS_PANEL_HIDDEN);
    }
}
