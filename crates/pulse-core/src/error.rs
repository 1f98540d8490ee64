//! Domain-level error types.

use thiserror::Error;

use crate::domain::RecordId;
use crate::ports::Collection;
use crate::store::Operation;

/// Store errors - what the UI is told when an operation does not go through.
///
/// None of these are fatal. Mutation failures are always reported after the
/// optimistic change has been reverted.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Failed to load {collection}: {source}")]
    LoadFailure {
        collection: Collection,
        #[source]
        source: GatewayError,
    },

    #[error("{operation} failed{}: {source}", .post_id.map(|id| format!(" for post {id}")).unwrap_or_default())]
    MutationFailure {
        operation: Operation,
        post_id: Option<RecordId>,
        #[source]
        source: GatewayError,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: RecordId,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub(crate) fn post_not_found(id: RecordId) -> Self {
        Self::NotFound {
            entity_type: "post",
            id,
        }
    }
}

/// Gateway-level errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("Rejected by backend: {0}")]
    Validation(String),

    #[error("{collection} record {id} not found")]
    NotFound { collection: Collection, id: RecordId },

    #[error("Malformed record: {0}")]
    Decode(String),
}
