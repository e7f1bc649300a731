//! Model Errors
//!
//! Expected conditions (missing object, missing DOM node, illegal drop) are
//! not errors in this crate. These types cover the rest.

use crate::entity::EntityKind;

/// Common result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Failure reported by the transport for a fetch or mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Transport failure: {}", self.0)
    }
}

impl std::error::Error for TransportError {}

/// Model-level errors
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Payload is not an object or carries no string `id`
    MalformedPayload(String),
    Transport(TransportError),
    /// Operation not offered by this entity kind
    Unsupported {
        kind: EntityKind,
        operation: &'static str,
    },
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::MalformedPayload(msg) => write!(f, "Malformed payload: {}", msg),
            ModelError::Transport(err) => write!(f, "{}", err),
            ModelError::Unsupported { kind, operation } => {
                write!(f, "{} does not support {}", kind.name(), operation)
            }
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for ModelError {
    fn from(err: TransportError) -> Self {
        ModelError::Transport(err)
    }
}
