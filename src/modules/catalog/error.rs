//! Failures of a single bot invocation.

use shelf_db::{CatalogKey, StoreError};
use thiserror::Error;

use super::command::{Command, FieldValueError};
use super::messages;
use super::ports::LookupError;

/// Every way an invocation can end without its normal reply. Each variant is
/// terminal and renders to exactly one chat message.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("requester has no role")]
    Unauthorized,

    #[error("'{0}' is not a valid identifier")]
    InvalidIdentifier(String),

    #[error("/{} is missing arguments", .0.token())]
    MissingArgument(Command),

    #[error(transparent)]
    InvalidValue(#[from] FieldValueError),

    #[error("{0} is not in the catalog")]
    NotFound(CatalogKey),

    #[error("no metadata for {identifier}")]
    LookupFailed {
        identifier: String,
        #[source]
        source: Option<LookupError>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    /// Chat text shown to the requester.
    pub fn reply(&self) -> String {
        match self {
            CatalogError::Unauthorized => messages::REFUSAL.to_string(),
            CatalogError::InvalidIdentifier(raw) => messages::invalid_identifier(raw),
            CatalogError::MissingArgument(command) => messages::usage(*command),
            CatalogError::InvalidValue(error) => format!("{error}."),
            CatalogError::NotFound(key) => messages::not_found(key),
            CatalogError::LookupFailed { identifier, .. } => messages::lookup_failed(identifier),
            CatalogError::Store(_) => messages::INTERNAL_FAILURE.to_string(),
        }
    }

    /// Whether the failure is a system fault rather than a user mistake.
    pub fn is_system_failure(&self) -> bool {
        matches!(self, CatalogError::Store(_))
    }
}
