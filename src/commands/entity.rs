//! Entity Commands
//!
//! Reading, listing, writing and deleting single entities.

use serde::Serialize;
use serde_json::Value;
use structr_model::Properties;

use super::{call, call_unit};

// ========================
// Argument Structs
// ========================

#[derive(Serialize)]
struct IdArgs<'a> {
    id: &'a str,
}

#[derive(Serialize)]
struct GetArgs<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    properties: Option<&'a [String]>,
}

#[derive(Serialize)]
struct ListArgs<'a> {
    #[serde(rename = "type")]
    type_name: &'a str,
}

#[derive(Serialize)]
struct UpdateArgs<'a> {
    id: &'a str,
    key: &'a str,
    value: &'a Value,
    recursive: bool,
}

#[derive(Serialize)]
struct UpdateManyArgs<'a> {
    id: &'a str,
    properties: &'a Properties,
}

// ========================
// Commands
// ========================

/// `properties: None` asks for the server's default view
pub async fn get_entity(id: &str, properties: Option<&[String]>) -> Result<Properties, String> {
    call("GET", &GetArgs { id, properties }).await
}

pub async fn get_children(id: &str) -> Result<Vec<Properties>, String> {
    call("CHILDREN", &IdArgs { id }).await
}

pub async fn list_entities(type_name: &str) -> Result<Vec<Properties>, String> {
    call("LIST", &ListArgs { type_name }).await
}

pub async fn list_unattached() -> Result<Vec<Properties>, String> {
    call("LIST_UNATTACHED_NODES", &()).await
}

pub async fn list_favorites() -> Result<Vec<Properties>, String> {
    call("LIST_FAVORITES", &()).await
}

pub async fn update_property(id: &str, key: &str, value: &Value, recursive: bool) -> Result<(), String> {
    call_unit(
        "UPDATE",
        &UpdateArgs {
            id,
            key,
            value,
            recursive,
        },
    )
    .await
}

pub async fn update_properties(id: &str, properties: &Properties) -> Result<(), String> {
    call_unit("SET_PROPERTIES", &UpdateManyArgs { id, properties }).await
}

pub async fn create_entity(payload: &Properties) -> Result<Properties, String> {
    call("CREATE", payload).await
}

pub async fn delete_entity(id: &str) -> Result<(), String> {
    call_unit("DELETE", &IdArgs { id }).await
}
