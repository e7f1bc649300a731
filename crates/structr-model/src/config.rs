//! UI Configuration
//!
//! DOM container ids and storage keys used by the model. Every field has a
//! default, so a partial JSON object is enough to override single values.

use serde::Deserialize;

use crate::error::ModelError;

/// Ids of the static DOM containers the trees render into
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Containers {
    pub pages: String,
    /// Elements that belong to no page
    pub unattached: String,
    /// Shared component masters
    pub components: String,
    /// Throwaway parking area for nodes whose parent is not rendered yet
    pub staging: String,
    pub widgets: String,
    pub folders: String,
    pub files: String,
    pub images: String,
    pub favorites: String,
    pub content_tree: String,
    pub users: String,
    pub groups: String,
    pub resource_access: String,
    pub cors_settings: String,
    pub search_results: String,
    pub detail_panel: String,
}

impl Default for Containers {
    fn default() -> Self {
        Self {
            pages: "pages".into(),
            unattached: "unattached-nodes".into(),
            components: "shared-components".into(),
            staging: "structr-staging".into(),
            widgets: "widgets".into(),
            folders: "folders".into(),
            files: "files".into(),
            images: "images".into(),
            favorites: "favorites".into(),
            content_tree: "content-tree".into(),
            users: "users".into(),
            groups: "groups".into(),
            resource_access: "resource-access".into(),
            cors_settings: "cors-settings".into(),
            search_results: "search-results".into(),
            detail_panel: "detail-panel".into(),
        }
    }
}

impl Containers {
    /// Every container that holds tree nodes (the detail panel excluded)
    pub fn tree_roots(&self) -> Vec<&str> {
        vec![
            self.pages.as_str(),
            self.unattached.as_str(),
            self.components.as_str(),
            self.staging.as_str(),
            self.widgets.as_str(),
            self.folders.as_str(),
            self.files.as_str(),
            self.images.as_str(),
            self.favorites.as_str(),
            self.content_tree.as_str(),
            self.users.as_str(),
            self.groups.as_str(),
            self.resource_access.as_str(),
            self.cors_settings.as_str(),
            self.search_results.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiConfig {
    pub containers: Containers,
    /// Storage key holding the id of the selected entity
    pub selection_key: String,
    /// Storage key holding the JSON array of expanded node ids
    pub expanded_key: String,
    /// Offer before/after sibling markers while dragging in the page tree
    pub relative_drop_targets: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            containers: Containers::default(),
            selection_key: "structrActiveElement".into(),
            expanded_key: "structrTreeExpandedIds".into(),
            relative_drop_targets: true,
        }
    }
}

impl UiConfig {
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        serde_json::from_str(json).map_err(|e| ModelError::MalformedPayload(e.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ModelError> {
        serde_json::from_value(value).map_err(|e| ModelError::MalformedPayload(e.to_string()))
    }
}
