//! Tree Panel Component
//!
//! Titled container the model renders one tree into. The container's
//! children are managed by the model, never by Leptos.

use leptos::prelude::*;

/// Static tree container
///
/// # Arguments
/// * `title` - Panel heading
/// * `container_id` - DOM id the model addresses the container by
/// * `drop_target` - Pseudo drop target name for drops on empty space
#[component]
pub fn TreePanel(
    #[prop(into)] title: String,
    #[prop(into)] container_id: String,
    #[prop(optional)] drop_target: Option<&'static str>,
) -> impl IntoView {
    view! {
        <section class="tree-panel">
            <h2 class="tree-panel-title">{title}</h2>
            <div id=container_id class="tree-root" data-drop-target=drop_target></div>
        </section>
    }
}
