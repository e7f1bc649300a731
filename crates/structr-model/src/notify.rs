//! Push Notifications
//!
//! Server pushes arrive in receipt order and are applied one at a time.

use serde_json::Value;
use tracing::{debug, trace};

use crate::context::StructrModel;
use crate::dom::Dom;
use crate::entity::{id_of, payload_id, Properties};
use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Full payload of a new entity
    Create(Properties),
    Update {
        id: String,
        modified_properties: Vec<String>,
        /// Relationship data; its `sourceId` names an entity whose children changed
        rel_data: Option<Value>,
    },
    Delete {
        id: String,
    },
}

impl Notification {
    /// Parse a push message.
    ///
    /// An explicit `command` (`CREATE`, `UPDATE`, `DELETE`) decides the shape
    /// when present. Otherwise `modifiedProperties` marks an update, a bare id
    /// a delete and anything else a create.
    pub fn from_json(value: Value) -> ModelResult<Self> {
        let Value::Object(mut message) = value else {
            return Err(ModelError::MalformedPayload(
                "notification is not an object".into(),
            ));
        };

        let command = message
            .remove("command")
            .and_then(|c| c.as_str().map(str::to_ascii_uppercase));
        let body = match message.remove("data") {
            Some(Value::Object(mut data)) => {
                if let Some(id) = message.remove("id") {
                    data.entry("id").or_insert(id);
                }
                if let Some(modified) = message.remove("modifiedProperties") {
                    data.entry("modifiedProperties").or_insert(modified);
                }
                data
            }
            _ => message,
        };

        match command.as_deref() {
            Some("CREATE") => Ok(Notification::Create(body)),
            Some("UPDATE") => Self::update(body),
            Some("DELETE") => Ok(Notification::Delete {
                id: payload_id(&body)?,
            }),
            Some(other) => Err(ModelError::MalformedPayload(format!(
                "unknown notification command {}",
                other
            ))),
            None if body.contains_key("modifiedProperties") => Self::update(body),
            None if body.len() == 1 => Ok(Notification::Delete {
                id: payload_id(&body)?,
            }),
            None => Ok(Notification::Create(body)),
        }
    }

    fn update(mut body: Properties) -> ModelResult<Self> {
        let id = payload_id(&body)?;
        let modified_properties = match body.remove("modifiedProperties") {
            Some(Value::Array(keys)) => keys
                .into_iter()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };
        Ok(Notification::Update {
            id,
            modified_properties,
            rel_data: body.remove("relData"),
        })
    }

    pub fn id(&self) -> Option<String> {
        match self {
            Notification::Create(payload) => payload_id(payload).ok(),
            Notification::Update { id, .. } | Notification::Delete { id } => Some(id.clone()),
        }
    }
}

impl<D: Dom> StructrModel<D> {
    /// Turn one push into store and DOM operations. Updates for
    /// entities that are not resident are dropped.
    pub async fn handle_notification(&self, notification: Notification) -> ModelResult<()> {
        debug!(id = ?notification.id(), "handling notification");
        match notification {
            Notification::Create(payload) => {
                self.create_from_payload(payload, None, true).await?;
            }
            Notification::Update {
                id,
                modified_properties,
                rel_data,
            } => {
                if self.is_resident(&id) {
                    self.apply_partial_update(&id, &modified_properties).await?;
                } else {
                    trace!(%id, "update for non-resident entity");
                }
                let source = rel_data
                    .as_ref()
                    .and_then(|rel| rel.get("sourceId"))
                    .and_then(id_of);
                if let Some(source) = source.filter(|s| s != &id && self.is_resident(s)) {
                    self.apply_partial_update(&source, &["children".to_string()])
                        .await?;
                }
            }
            Notification::Delete { id } => self.forget(&id),
        }
        Ok(())
    }
}
