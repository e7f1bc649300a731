//! Error Banner Component
//!
//! Shows the last reported failure and hides it after a few seconds.

use gloo_timers::future::TimeoutFuture;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::store::{store_clear_error, use_app_store, AppStateStoreFields};

const VISIBLE_MS: u32 = 6000;

#[component]
pub fn ErrorBanner() -> impl IntoView {
    let store = use_app_store();

    // Every new error restarts the timer; only the newest one clears the banner
    Effect::new(move |_| {
        let version = store.error_version().get();
        if store.last_error().get_untracked().is_none() {
            return;
        }
        spawn_local(async move {
            TimeoutFuture::new(VISIBLE_MS).await;
            store_clear_error(&store, version);
        });
    });

    view! {
        <Show when=move || store.last_error().get().is_some()>
            <div class="error-banner" role="alert">
                <span>{move || store.last_error().get().unwrap_or_default()}</span>
                <button
                    class="error-dismiss"
                    on:click=move |_| store.last_error().set(None)
                >
                    "✕"
                </button>
            </div>
        </Show>
    }
}
