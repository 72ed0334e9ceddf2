// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for interchange operations

use thiserror::Error;

/// Result type alias for interchange operations
pub type Result<T> = std::result::Result<T, InterchangeError>;

/// Errors that abort a whole import
///
/// Bad individual rows or cells never produce an error; they are skipped.
#[derive(Error, Debug)]
pub enum InterchangeError {
    /// Header row lacks a required column
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Structured-text payload could not be read or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InterchangeError {
    pub fn missing_column(name: impl Into<String>) -> Self {
        InterchangeError::MissingColumn(name.into())
    }
}
