//! Detail Panel Component
//!
//! Properties of the active element with save and delete actions. Delete
//! asks once before it goes to the server. The model shows and hides the
//! panel through its `hidden` class.

use leptos::prelude::*;
use leptos::task::spawn_local;
use structr_model::view::value_text;

use crate::context::use_app_context;
use crate::store::{
    store_report_error, store_set_status, store_sync, use_app_store, AppStateStoreFields,
};

#[component]
pub fn DetailPanel(#[prop(into)] panel_id: String) -> impl IntoView {
    let ctx = use_app_context();
    let store = use_app_store();

    // (key, value) rows of the selected entity, re-read on selection change
    // and whenever the resident count moves
    let rows = move || {
        let _ = store.resident_count().get();
        let _ = store.status().get();
        let Some(id) = store.selected().get() else {
            return Vec::new();
        };
        ctx.model()
            .read(&id, |entity| {
                entity
                    .properties()
                    .iter()
                    .map(|(key, value)| (key.clone(), value_text(value)))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    };

    let (confirming, set_confirming) = signal(false);

    let close = move |_| {
        set_confirming.set(false);
        let model = ctx.model();
        model.clear_selection();
        store_sync(&store, &model);
    };

    let save = move |_| {
        let Some(id) = store.selected().get_untracked() else {
            return;
        };
        let model = ctx.model();
        spawn_local(async move {
            match model.save(&id).await {
                Ok(()) => store_set_status(&store, format!("Saved {}", id)),
                Err(e) => store_report_error(&store, format!("Could not save {}: {}", id, e)),
            }
        });
    };

    let delete = move |_| {
        set_confirming.set(false);
        let Some(id) = store.selected().get_untracked() else {
            return;
        };
        let model = ctx.model();
        spawn_local(async move {
            match model.delete(&id).await {
                Ok(()) => store_set_status(&store, format!("Deleted {}", id)),
                Err(e) => store_report_error(&store, format!("Could not delete {}: {}", id, e)),
            }
            store_sync(&store, &model);
        });
    };

    view! {
        <aside id=panel_id class="detail-panel hidden">
            <header class="detail-header">
                <span class="detail-title">
                    {move || store.selected().get().unwrap_or_default()}
                </span>
                <button class="detail-save" on:click=save>"Save"</button>
                <Show
                    when=move || confirming.get()
                    fallback=move || {
                        view! {
                            <button class="detail-delete" on:click=move |_| set_confirming.set(true)>
                                "Delete"
                            </button>
                        }
                    }
                >
                    <span class="delete-confirm">
                        {move || format!("Delete {}?", store.selected().get().unwrap_or_default())}
                        <button class="confirm-btn" on:click=delete>"Yes"</button>
                        <button class="cancel-btn" on:click=move |_| set_confirming.set(false)>
                            "No"
                        </button>
                    </span>
                </Show>
                <button class="detail-close" on:click=close>"✕"</button>
            </header>
            <table class="detail-properties">
                <For
                    each=rows
                    key=|(key, value)| format!("{}={}", key, value)
                    children=move |(key, value)| {
                        view! {
                            <tr>
                                <th>{key}</th>
                                <td>{value}</td>
                            </tr>
                        }
                    }
                />
            </table>
        </aside>
    }
}
