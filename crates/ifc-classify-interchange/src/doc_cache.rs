// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persisted documentation cache document
//!
//! Hosts keep schema documentation fetched from the web in a single JSON
//! document. Times are epoch milliseconds supplied by the caller; where the
//! document is stored is up to the host.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Only documents with this version are read or cleaned
pub const DOC_CACHE_VERSION: &str = "v1";

/// More entries than this call for a cleanup
const CLEANUP_ENTRY_THRESHOLD: usize = 100;

/// Documents untouched for longer than this call for a cleanup
const CLEANUP_MAX_AGE_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// One cached value and its expiry time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocCacheEntry {
    pub value: serde_json::Value,
    /// Epoch milliseconds; zero means already expired
    #[serde(default)]
    pub expires: u64,
}

impl DocCacheEntry {
    pub fn is_valid(&self, now: u64) -> bool {
        self.expires > now
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocCacheDocument {
    #[serde(default)]
    pub data: BTreeMap<String, DocCacheEntry>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<u64>,
}

impl Default for DocCacheDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DocCacheDocument {
    /// Empty document at the current version
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            version: DOC_CACHE_VERSION.to_string(),
            last_updated: None,
        }
    }

    pub fn is_current(&self) -> bool {
        self.version == DOC_CACHE_VERSION
    }

    /// Unexpired value for `key`; documents of another version read as empty
    pub fn get(&self, key: &str, now: u64) -> Option<&serde_json::Value> {
        if !self.is_current() {
            return None;
        }
        self.data
            .get(key)
            .filter(|entry| entry.is_valid(now))
            .map(|entry| &entry.value)
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
        expires: u64,
        now: u64,
    ) {
        self.data.insert(key.into(), DocCacheEntry { value, expires });
        self.last_updated = Some(now);
    }

    pub fn remove(&mut self, key: &str) -> Option<DocCacheEntry> {
        self.data.remove(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drop expired entries, returning how many were removed
    ///
    /// Documents of another version are left untouched.
    pub fn cleanup_expired(&mut self, now: u64) -> usize {
        if !self.is_current() {
            return 0;
        }
        let before = self.data.len();
        self.data.retain(|_, entry| entry.is_valid(now));
        let removed = before - self.data.len();
        if removed > 0 {
            self.last_updated = Some(now);
            log::debug!("Cleaned up {} expired documentation cache entries", removed);
        }
        removed
    }

    /// Whether the document is large or stale enough to be worth cleaning
    pub fn needs_cleanup(&self, now: u64) -> bool {
        if self.data.len() > CLEANUP_ENTRY_THRESHOLD {
            return true;
        }
        self.last_updated
            .is_some_and(|updated| updated < now.saturating_sub(CLEANUP_MAX_AGE_MS))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
