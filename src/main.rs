//! Structr UI Frontend Entry Point

mod app;
mod commands;
mod components;
mod context;
mod dom;
mod gestures;
mod storage;
mod store;
mod transport;

use app::App;
use leptos::prelude::*;

fn main() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
    mount_to_body(App);
}
