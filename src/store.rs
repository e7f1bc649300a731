//! Global Application State Store
//!
//! Uses Leptos reactive_stores for fine-grained reactivity. Only what the
//! Leptos views display lives here; entities stay in the model.

use leptos::prelude::*;
use reactive_stores::Store;

use crate::context::Model;

/// Global application state with field-level reactivity
#[derive(Clone, Debug, Default, Store)]
pub struct AppState {
    /// Bootstrap progress or the last finished action
    pub status: String,
    /// Number of resident entities
    pub resident_count: usize,
    /// Id of the active element
    pub selected: Option<String>,
    /// Last failure shown in the error banner
    pub last_error: Option<String>,
    /// Bumped per reported error so the banner can time out the right one
    pub error_version: u32,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            status: "Connecting".to_string(),
            ..Default::default()
        }
    }
}

/// Type alias for the store
pub type AppStore = Store<AppState>;

/// Get the app store from context
pub fn use_app_store() -> AppStore {
    expect_context::<AppStore>()
}

// ========================
// Store Helper Functions
// ========================

pub fn store_set_status(store: &AppStore, status: impl Into<String>) {
    store.status().set(status.into());
}

/// Show `message` in the error banner
pub fn store_report_error(store: &AppStore, message: impl Into<String>) {
    let message = message.into();
    tracing::warn!(%message, "reported to user");
    store.last_error().set(Some(message));
    store.error_version().update(|v| *v += 1);
}

/// Clear the banner if no newer error arrived since `version`
pub fn store_clear_error(store: &AppStore, version: u32) {
    if store.error_version().get_untracked() == version {
        store.last_error().set(None);
    }
}

/// Copy the model figures the views display
pub fn store_sync(store: &AppStore, model: &Model) {
    let count = model.resident_count();
    if store.resident_count().get_untracked() != count {
        store.resident_count().set(count);
    }
    let selected = model.selected_id();
    if store.selected().get_untracked() != selected {
        store.selected().set(selected);
    }
}
