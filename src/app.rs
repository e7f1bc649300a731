//! Structr UI App
//!
//! Main application component: the static tree containers, the detail panel
//! and the bootstrap that fills them.

use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use reactive_stores::Store;
use structr_model::{Notification, StructrModel, UiConfig};
use wasm_bindgen::JsValue;

use crate::commands;
use crate::components::{DetailPanel, ErrorBanner, StatusBar, TreePanel};
use crate::context::{AppContext, Model};
use crate::dom::WebDom;
use crate::gestures;
use crate::storage::BrowserStorage;
use crate::store::{store_report_error, store_set_status, store_sync, AppState, AppStore};
use crate::transport::JsTransport;

/// Server types listed on startup, in tree order
const ROOT_TYPES: &[&str] = &[
    "Page",
    "Widget",
    "Folder",
    "File",
    "Image",
    "ContentContainer",
    "User",
    "Group",
    "ResourceAccess",
    "CorsSetting",
];

/// `window.structrUiConfig` if the page defines one, else the defaults
fn read_config() -> UiConfig {
    let raw = web_sys::window()
        .and_then(|w| js_sys::Reflect::get(&w, &JsValue::from_str("structrUiConfig")).ok())
        .filter(|v| !v.is_undefined() && !v.is_null());
    let Some(raw) = raw else {
        return UiConfig::default();
    };
    let parsed = serde_wasm_bindgen::from_value::<serde_json::Value>(raw)
        .map_err(|e| e.to_string())
        .and_then(|value| UiConfig::from_value(value).map_err(|e| e.to_string()));
    match parsed {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring invalid structrUiConfig");
            UiConfig::default()
        }
    }
}

/// Load every tree, then re-apply the persisted selection
async fn bootstrap(model: Rc<Model>, store: AppStore) {
    for type_name in ROOT_TYPES {
        store_set_status(&store, format!("Loading {}", type_name));
        if let Err(e) = model.load(type_name).await {
            store_report_error(&store, format!("Could not load {}: {}", type_name, e));
        }
    }
    if let Err(e) = model.refresh_unattached().await {
        store_report_error(&store, format!("Could not load unattached nodes: {}", e));
    }
    if let Err(e) = model.refresh_favorites().await {
        store_report_error(&store, format!("Could not load favorites: {}", e));
    }
    if let Some(id) = model.selected_id() {
        if model.is_resident(&id) {
            model.select(&id);
        } else {
            model.clear_selection();
        }
    }
    store_sync(&store, &model);
    store_set_status(&store, "Ready");
    tracing::info!(resident = model.resident_count(), "bootstrap finished");
}

/// Apply server push messages as they arrive
fn listen(model: Rc<Model>, store: AppStore) {
    commands::subscribe(move |message| {
        let notification = match Notification::from_json(message) {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!(error = %e, "dropping notification");
                return;
            }
        };
        let model = model.clone();
        spawn_local(async move {
            let id = notification.id();
            if let Err(e) = model.handle_notification(notification).await {
                tracing::warn!(?id, error = %e, "notification failed");
            }
            store_sync(&store, &model);
        });
    });
}

#[component]
pub fn App() -> impl IntoView {
    let config = read_config();
    let Some(dom) = WebDom::from_window() else {
        return view! { <p class="fatal">"No document to render into"</p> }.into_any();
    };
    let containers = config.containers.clone();
    let model = Rc::new(StructrModel::new(
        config,
        dom,
        Rc::new(JsTransport),
        Box::new(BrowserStorage::new()),
    ));

    let store = Store::new(AppState::new());
    provide_context(store);
    let ctx = AppContext::new(model, leptos_dragdrop::create_dnd_signals());
    provide_context(ctx);

    // Containers are mounted by now; fill them once
    Effect::new(move |_| {
        let model = ctx.model();
        leptos_dragdrop::bind_document(ctx.dnd, gestures::drag_handlers(ctx, store));
        gestures::bind_tree_events(ctx, store);
        listen(model.clone(), store);
        spawn_local(bootstrap(model, store));
    });

    view! {
        <div class="app-layout">
            <ErrorBanner />
            <main class="trees">
                <div class="tree-column pages-column">
                    <TreePanel title="Pages" container_id=containers.pages.clone() />
                    <TreePanel title="Unattached" container_id=containers.unattached.clone() />
                    <TreePanel title="Shared Components" container_id=containers.components.clone() />
                    <TreePanel title="Widgets" container_id=containers.widgets.clone() />
                </div>
                <div class="tree-column files-column">
                    <TreePanel title="Favorites" container_id=containers.favorites.clone() drop_target="favorites" />
                    <TreePanel title="Folders" container_id=containers.folders.clone() drop_target="root" />
                    <TreePanel title="Files" container_id=containers.files.clone() drop_target="root" />
                    <TreePanel title="Images" container_id=containers.images.clone() drop_target="root" />
                </div>
                <div class="tree-column content-column">
                    <TreePanel title="Contents" container_id=containers.content_tree.clone() drop_target="root" />
                    <TreePanel title="Search Results" container_id=containers.search_results.clone() />
                </div>
                <div class="tree-column security-column">
                    <TreePanel title="Users" container_id=containers.users.clone() />
                    <TreePanel title="Groups" container_id=containers.groups.clone() />
                    <TreePanel title="Resource Access" container_id=containers.resource_access.clone() />
                    <TreePanel title="CORS Settings" container_id=containers.cors_settings.clone() />
                </div>
                <div id=containers.staging.clone() class="staging" hidden=true></div>
            </main>
            <DetailPanel panel_id=containers.detail_panel.clone() />
            <StatusBar />
        </div>
    }
    .into_any()
}
