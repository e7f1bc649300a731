//! Transport Facade
//!
//! Capabilities the model needs from the Structr backend connection. The
//! connection itself (WebSocket framing, auth, retries) lives outside this
//! crate.

use async_trait::async_trait;
use serde_json::Value;

use crate::entity::Properties;
use crate::error::TransportError;

/// Side of a reference node for relative inserts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelativePosition {
    Before,
    After,
}

/// Insertion point next to an existing node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Anchor {
    pub reference_id: String,
    pub position: RelativePosition,
}

impl Anchor {
    pub fn before(reference_id: impl Into<String>) -> Self {
        Self {
            reference_id: reference_id.into(),
            position: RelativePosition::Before,
        }
    }

    pub fn after(reference_id: impl Into<String>) -> Self {
        Self {
            reference_id: reference_id.into(),
            position: RelativePosition::After,
        }
    }
}

/// Structural change requested by a drop
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Move `id` to the end of `parent_id`'s children
    AppendChild {
        id: String,
        parent_id: String,
        page_id: Option<String>,
    },
    /// Move `id` next to the anchor, under the anchor's parent
    InsertRelative {
        id: String,
        parent_id: String,
        anchor: Anchor,
    },
    /// Create a new synced instance of shared component `id`
    CloneComponent {
        id: String,
        parent_id: String,
        anchor: Option<Anchor>,
    },
    /// Copy `id` (with its subtree when `deep`) into `parent_id`
    CloneNode {
        id: String,
        parent_id: String,
        anchor: Option<Anchor>,
        deep: bool,
    },
    /// Instantiate a widget's template under `parent_id`
    AppendWidget {
        widget_id: String,
        parent_id: String,
        page_id: Option<String>,
        anchor: Option<Anchor>,
    },
    /// `None` moves the file or folder to the root
    MoveToFolder {
        id: String,
        folder_id: Option<String>,
    },
    AddFavorite {
        id: String,
    },
    /// `None` moves the container or item to the root
    MoveToContainer {
        id: String,
        container_id: Option<String>,
    },
    AddMember {
        group_id: String,
        member_id: String,
    },
}

impl Mutation {
    /// Id of the entity the mutation is about
    pub fn subject(&self) -> &str {
        match self {
            Mutation::AppendChild { id, .. }
            | Mutation::InsertRelative { id, .. }
            | Mutation::CloneComponent { id, .. }
            | Mutation::CloneNode { id, .. }
            | Mutation::MoveToFolder { id, .. }
            | Mutation::AddFavorite { id }
            | Mutation::MoveToContainer { id, .. } => id,
            Mutation::AppendWidget { widget_id, .. } => widget_id,
            Mutation::AddMember { member_id, .. } => member_id,
        }
    }

    /// Whether the subject keeps its place and a new entity is created instead
    pub fn creates_entity(&self) -> bool {
        matches!(
            self,
            Mutation::CloneComponent { .. } | Mutation::CloneNode { .. } | Mutation::AppendWidget { .. }
        )
    }
}

#[async_trait(?Send)]
pub trait Transport {
    /// Fetch `id`; `None` asks for the server's default view
    async fn fetch_entity(
        &self,
        id: &str,
        properties: Option<&[String]>,
    ) -> Result<Properties, TransportError>;

    async fn fetch_children(&self, id: &str) -> Result<Vec<Properties>, TransportError>;

    /// All entities of a server type (tree roots on startup)
    async fn list_entities(&self, type_name: &str) -> Result<Vec<Properties>, TransportError>;

    /// Page elements that belong to no page
    async fn list_unattached(&self) -> Result<Vec<Properties>, TransportError>;

    /// Files and images the current user marked as favorite
    async fn list_favorites(&self) -> Result<Vec<Properties>, TransportError>;

    async fn set_property(
        &self,
        id: &str,
        key: &str,
        value: &Value,
        recursive: bool,
    ) -> Result<(), TransportError>;

    async fn set_properties(&self, id: &str, properties: &Properties) -> Result<(), TransportError>;

    async fn create_entity(&self, payload: &Properties) -> Result<Properties, TransportError>;

    async fn delete_entity(&self, id: &str) -> Result<(), TransportError>;

    /// Apply a structural mutation. Returns the new entity's payload for
    /// mutations that create one.
    async fn apply(&self, mutation: &Mutation) -> Result<Option<Properties>, TransportError>;
}
