// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cache bounds, loaded from environment variables or set explicitly

use serde::{Deserialize, Serialize};

/// Default number of models kept in the property cache
pub const DEFAULT_MAX_MODELS: usize = 10;

/// Default number of elements kept per model
pub const DEFAULT_MAX_ENTRIES_PER_MODEL: usize = 1000;

/// Bounds of the two-level property cache
///
/// Deserializes from a host settings file; omitted fields take the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Maximum number of models (outer level)
    pub max_models: usize,
    /// Maximum number of elements within one model (inner level)
    pub max_entries_per_model: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_models: DEFAULT_MAX_MODELS,
            max_entries_per_model: DEFAULT_MAX_ENTRIES_PER_MODEL,
        }
    }
}

impl CacheConfig {
    /// Load configuration from environment variables.
    ///
    /// `IFC_CLASSIFY_CACHE_MAX_MODELS` and `IFC_CLASSIFY_CACHE_MAX_ENTRIES`;
    /// unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::default()
            .with_max_models(
                std::env::var("IFC_CLASSIFY_CACHE_MAX_MODELS")
                    .unwrap_or_else(|_| DEFAULT_MAX_MODELS.to_string())
                    .trim()
                    .parse()
                    .unwrap_or(DEFAULT_MAX_MODELS),
            )
            .with_max_entries_per_model(
                std::env::var("IFC_CLASSIFY_CACHE_MAX_ENTRIES")
                    .unwrap_or_else(|_| DEFAULT_MAX_ENTRIES_PER_MODEL.to_string())
                    .trim()
                    .parse()
                    .unwrap_or(DEFAULT_MAX_ENTRIES_PER_MODEL),
            )
    }

    /// Set the model bound (minimum 1)
    pub fn with_max_models(mut self, max_models: usize) -> Self {
        self.max_models = max_models.max(1);
        self
    }

    /// Set the per-model element bound (minimum 1)
    pub fn with_max_entries_per_model(mut self, max_entries: usize) -> Self {
        self.max_entries_per_model = max_entries.max(1);
        self
    }
}
