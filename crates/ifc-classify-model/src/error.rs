// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for entity source operations

use crate::{EntityId, ModelId};
use thiserror::Error;

/// Result type alias for entity source operations
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors an [`EntitySource`](crate::EntitySource) can report
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Entity not found in the model
    #[error("Entity {id} not found in {model}")]
    EntityNotFound { model: ModelId, id: EntityId },

    /// Model is not loaded in the source
    #[error("{0} is not loaded")]
    ModelNotLoaded(ModelId),

    /// The source as a whole cannot serve requests
    #[error("Entity source unavailable: {0}")]
    Unavailable(String),

    /// Record exists but does not have the expected shape
    #[error("Malformed record {id}: {reason}")]
    Malformed { id: EntityId, reason: String },
}

impl SourceError {
    /// Create a not-found error
    pub fn not_found(model: ModelId, id: EntityId) -> Self {
        SourceError::EntityNotFound { model, id }
    }

    /// Create a malformed-record error
    pub fn malformed(id: EntityId, reason: impl Into<String>) -> Self {
        SourceError::Malformed {
            id,
            reason: reason.into(),
        }
    }

    /// Whether the whole source is down, as opposed to one record missing
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SourceError::Unavailable(_))
    }
}
