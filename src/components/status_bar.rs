//! Status Bar Component

use leptos::prelude::*;

use crate::store::{use_app_store, AppStateStoreFields};

#[component]
pub fn StatusBar() -> impl IntoView {
    let store = use_app_store();

    view! {
        <footer class="status-bar">
            <span class="status-text">{move || store.status().get()}</span>
            <span class="status-count">
                {move || format!("{} objects", store.resident_count().get())}
            </span>
        </footer>
    }
}
