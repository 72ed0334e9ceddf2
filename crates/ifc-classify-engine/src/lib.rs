// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC Classify Engine
//!
//! Derived structures over an [`EntitySource`](ifc_classify_model::EntitySource):
//!
//! - [`RelationsIndexer`]: inverse relationship index with downward
//!   transitive queries
//! - [`PropertyResolver`]: flattened property sheets for one element, backed
//!   by a bounded two-level [`PropertyCache`]
//! - [`RuleEngine`]: evaluates classification rules against [`FlatSheet`]s
//!
//! ## Quick Start
//!
//! ```ignore
//! use ifc_classify_engine::{CacheConfig, FlatSheet, PropertyResolver, RuleEngine};
//!
//! let mut resolver = PropertyResolver::with_config(source, CacheConfig::from_env());
//! let props = resolver.resolve(model, entity)?;
//! let sheet = FlatSheet::from_properties(&props);
//! let matches = RuleEngine::new().matching_rules(&rules, &sheet);
//! ```
//!
//! None of these types lock internally. Callers that share them across
//! threads serialize access per model.

pub mod cache;
pub mod config;
pub mod lru;
pub mod properties;
pub mod relations;
pub mod rules;
pub mod units;

pub use cache::PropertyCache;
pub use config::CacheConfig;
pub use lru::LruMap;
pub use properties::PropertyResolver;
pub use relations::{RelationKind, RelationsIndex, RelationsIndexer};
pub use rules::{FlatSheet, Operator, RuleEngine};
pub use units::unit_label;
