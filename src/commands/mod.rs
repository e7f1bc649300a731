//! Structr Command Wrappers
//!
//! Frontend bindings to the page's Structr connection
//! (`window.StructrTransport`), organized by domain. Each command sends one
//! message and resolves with the server's `data` payload.

mod entity;
mod structure;

use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["window", "StructrTransport"], js_name = send)]
    async fn send_raw(command: &str, args: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["window", "StructrTransport"], js_name = subscribe)]
    fn subscribe_raw(callback: &Closure<dyn FnMut(JsValue)>);
}

// Re-export all public items
pub use entity::*;
pub use structure::*;

fn to_js<T: Serialize + ?Sized>(args: &T) -> Result<JsValue, String> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    args.serialize(&serializer).map_err(|e| e.to_string())
}

fn error_text(err: JsValue) -> String {
    err.as_string()
        .or_else(|| {
            js_sys::Reflect::get(&err, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", err))
}

/// Send `command` and decode the reply
async fn call<A, R>(command: &str, args: &A) -> Result<R, String>
where
    A: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let js_args = to_js(args)?;
    let result = send_raw(command, js_args).await.map_err(error_text)?;
    serde_wasm_bindgen::from_value(result).map_err(|e| e.to_string())
}

/// Send `command`, ignoring the reply body
async fn call_unit<A: Serialize + ?Sized>(command: &str, args: &A) -> Result<(), String> {
    let js_args = to_js(args)?;
    send_raw(command, js_args).await.map_err(error_text)?;
    Ok(())
}

/// Register `callback` for server push messages. The closure lives as long
/// as the page.
pub fn subscribe(mut callback: impl FnMut(serde_json::Value) + 'static) {
    let listener = Closure::<dyn FnMut(JsValue)>::new(move |message: JsValue| {
        match serde_wasm_bindgen::from_value::<serde_json::Value>(message) {
            Ok(value) => callback(value),
            Err(e) => tracing::warn!(error = %e, "undecodable push message dropped"),
        }
    });
    subscribe_raw(&listener);
    listener.forget();
}
