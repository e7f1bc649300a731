//! UI Components
//!
//! Leptos components around the model-managed trees.

mod detail_panel;
mod error_banner;
mod status_bar;
mod tree_panel;

pub use detail_panel::DetailPanel;
pub use error_banner::ErrorBanner;
pub use status_bar::StatusBar;
pub use tree_panel::TreePanel;
