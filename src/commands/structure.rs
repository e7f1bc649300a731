//! Structure Commands
//!
//! Tree mutations sent for drops: moves, clones, widget instantiation and
//! membership changes.

use serde::Serialize;
use structr_model::{Anchor, Properties, RelativePosition};

use super::{call, call_unit};

// ========================
// Argument Structs
// ========================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AppendChildArgs<'a> {
    id: &'a str,
    parent_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_id: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertArgs<'a> {
    id: &'a str,
    parent_id: &'a str,
    ref_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CloneArgs<'a> {
    id: &'a str,
    parent_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ref_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    relative_position: Option<&'static str>,
    deep: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WidgetArgs<'a> {
    widget_id: &'a str,
    parent_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ref_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    relative_position: Option<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReparentArgs<'a> {
    id: &'a str,
    /// `null` means the tree root
    parent_id: Option<&'a str>,
}

#[derive(Serialize)]
struct IdArgs<'a> {
    id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MemberArgs<'a> {
    id: &'a str,
    member_id: &'a str,
}

fn position_name(position: RelativePosition) -> &'static str {
    match position {
        RelativePosition::Before => "Before",
        RelativePosition::After => "After",
    }
}

fn anchor_parts(anchor: Option<&Anchor>) -> (Option<&str>, Option<&'static str>) {
    match anchor {
        Some(anchor) => (
            Some(anchor.reference_id.as_str()),
            Some(position_name(anchor.position)),
        ),
        None => (None, None),
    }
}

// ========================
// Commands
// ========================

pub async fn append_child(id: &str, parent_id: &str, page_id: Option<&str>) -> Result<(), String> {
    call_unit(
        "APPEND_CHILD",
        &AppendChildArgs {
            id,
            parent_id,
            page_id,
        },
    )
    .await
}

/// Move `id` before or after `anchor` under `parent_id`
pub async fn insert_relative(id: &str, parent_id: &str, anchor: &Anchor) -> Result<(), String> {
    let command = match anchor.position {
        RelativePosition::Before => "INSERT_BEFORE",
        RelativePosition::After => "INSERT_AFTER",
    };
    call_unit(
        command,
        &InsertArgs {
            id,
            parent_id,
            ref_id: &anchor.reference_id,
        },
    )
    .await
}

pub async fn clone_component(
    id: &str,
    parent_id: &str,
    anchor: Option<&Anchor>,
) -> Result<Properties, String> {
    let (ref_id, relative_position) = anchor_parts(anchor);
    call(
        "CLONE_COMPONENT",
        &CloneArgs {
            id,
            parent_id,
            ref_id,
            relative_position,
            deep: true,
        },
    )
    .await
}

pub async fn clone_node(
    id: &str,
    parent_id: &str,
    anchor: Option<&Anchor>,
    deep: bool,
) -> Result<Properties, String> {
    let (ref_id, relative_position) = anchor_parts(anchor);
    call(
        "CLONE_NODE",
        &CloneArgs {
            id,
            parent_id,
            ref_id,
            relative_position,
            deep,
        },
    )
    .await
}

pub async fn append_widget(
    widget_id: &str,
    parent_id: &str,
    page_id: Option<&str>,
    anchor: Option<&Anchor>,
) -> Result<Properties, String> {
    let (ref_id, relative_position) = anchor_parts(anchor);
    call(
        "APPEND_WIDGET",
        &WidgetArgs {
            widget_id,
            parent_id,
            page_id,
            ref_id,
            relative_position,
        },
    )
    .await
}

pub async fn move_to_folder(id: &str, folder_id: Option<&str>) -> Result<(), String> {
    call_unit(
        "APPEND_FILE",
        &ReparentArgs {
            id,
            parent_id: folder_id,
        },
    )
    .await
}

pub async fn add_favorite(id: &str) -> Result<(), String> {
    call_unit("FAVORITES", &IdArgs { id }).await
}

pub async fn move_to_container(id: &str, container_id: Option<&str>) -> Result<(), String> {
    call_unit(
        "APPEND_CONTENT_ITEM",
        &ReparentArgs {
            id,
            parent_id: container_id,
        },
    )
    .await
}

pub async fn add_member(group_id: &str, member_id: &str) -> Result<(), String> {
    call_unit(
        "APPEND_MEMBER",
        &MemberArgs {
            id: group_id,
            member_id,
        },
    )
    .await
}
