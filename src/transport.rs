//! Browser Transport
//!
//! `Transport` over the command wrappers.

use async_trait::async_trait;
use serde_json::Value;
use structr_model::{Mutation, Properties, Transport, TransportError};

use crate::commands;

pub struct JsTransport;

#[async_trait(?Send)]
impl Transport for JsTransport {
    async fn fetch_entity(
        &self,
        id: &str,
        properties: Option<&[String]>,
    ) -> Result<Properties, TransportError> {
        commands::get_entity(id, properties)
            .await
            .map_err(TransportError::new)
    }

    async fn fetch_children(&self, id: &str) -> Result<Vec<Properties>, TransportError> {
        commands::get_children(id).await.map_err(TransportError::new)
    }

    async fn list_entities(&self, type_name: &str) -> Result<Vec<Properties>, TransportError> {
        commands::list_entities(type_name)
            .await
            .map_err(TransportError::new)
    }

    async fn list_unattached(&self) -> Result<Vec<Properties>, TransportError> {
        commands::list_unattached().await.map_err(TransportError::new)
    }

    async fn list_favorites(&self) -> Result<Vec<Properties>, TransportError> {
        commands::list_favorites().await.map_err(TransportError::new)
    }

    async fn set_property(
        &self,
        id: &str,
        key: &str,
        value: &Value,
        recursive: bool,
    ) -> Result<(), TransportError> {
        commands::update_property(id, key, value, recursive)
            .await
            .map_err(TransportError::new)
    }

    async fn set_properties(&self, id: &str, properties: &Properties) -> Result<(), TransportError> {
        commands::update_properties(id, properties)
            .await
            .map_err(TransportError::new)
    }

    async fn create_entity(&self, payload: &Properties) -> Result<Properties, TransportError> {
        commands::create_entity(payload)
            .await
            .map_err(TransportError::new)
    }

    async fn delete_entity(&self, id: &str) -> Result<(), TransportError> {
        commands::delete_entity(id).await.map_err(TransportError::new)
    }

    async fn apply(&self, mutation: &Mutation) -> Result<Option<Properties>, TransportError> {
        let created = match mutation {
            Mutation::AppendChild {
                id,
                parent_id,
                page_id,
            } => commands::append_child(id, parent_id, page_id.as_deref())
                .await
                .map(|_| None),
            Mutation::InsertRelative {
                id,
                parent_id,
                anchor,
            } => commands::insert_relative(id, parent_id, anchor)
                .await
                .map(|_| None),
            Mutation::CloneComponent {
                id,
                parent_id,
                anchor,
            } => commands::clone_component(id, parent_id, anchor.as_ref())
                .await
                .map(Some),
            Mutation::CloneNode {
                id,
                parent_id,
                anchor,
                deep,
            } => commands::clone_node(id, parent_id, anchor.as_ref(), *deep)
                .await
                .map(Some),
            Mutation::AppendWidget {
                widget_id,
                parent_id,
                page_id,
                anchor,
            } => commands::append_widget(widget_id, parent_id, page_id.as_deref(), anchor.as_ref())
                .await
                .map(Some),
            Mutation::MoveToFolder { id, folder_id } => {
                commands::move_to_folder(id, folder_id.as_deref())
                    .await
                    .map(|_| None)
            }
            Mutation::AddFavorite { id } => commands::add_favorite(id).await.map(|_| None),
            Mutation::MoveToContainer { id, container_id } => {
                commands::move_to_container(id, container_id.as_deref())
                    .await
                    .map(|_| None)
            }
            Mutation::AddMember {
                group_id,
                member_id,
            } => commands::add_member(group_id, member_id)
                .await
                .map(|_| None),
        };
        created.map_err(TransportError::new)
    }
}
