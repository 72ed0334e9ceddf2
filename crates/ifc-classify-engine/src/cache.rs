// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Two-level LRU cache of resolved element properties
//!
//! Outer level: model -> inner map, bounded by `max_models`.
//! Inner level: entity -> properties, bounded by `max_entries_per_model`.
//! Both levels evict the least recently accessed entry first.

use crate::{CacheConfig, LruMap};
use ifc_classify_model::{ElementProperties, EntityId, ModelId};
use std::sync::Arc;

type ModelEntries = LruMap<EntityId, Arc<ElementProperties>>;

/// Bounded cache of [`ElementProperties`] keyed by (model, entity)
pub struct PropertyCache {
    config: CacheConfig,
    models: LruMap<ModelId, ModelEntries>,
}

impl Default for PropertyCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl PropertyCache {
    /// Create an empty cache with the given bounds
    pub fn new(config: CacheConfig) -> Self {
        Self {
            models: LruMap::new(config.max_models),
            config,
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// Look up an entry, moving it (and its model) to the most recent position
    pub fn get(&mut self, model: ModelId, entity: EntityId) -> Option<Arc<ElementProperties>> {
        let entries = self.models.get_mut(&model)?;
        entries.get(&entity).cloned()
    }

    /// Whether an entry is cached, without touching recency
    pub fn contains(&self, model: ModelId, entity: EntityId) -> bool {
        self.models
            .peek(&model)
            .is_some_and(|entries| entries.contains(&entity))
    }

    /// Store resolved properties under their own (model, entity) key
    pub fn insert(&mut self, properties: Arc<ElementProperties>) {
        let model = properties.model;
        let entity = properties.entity;

        if !self.models.contains(&model) {
            let entries = LruMap::new(self.config.max_entries_per_model);
            if let Some((evicted, dropped)) = self.models.insert(model, entries) {
                log::debug!(
                    "Property cache evicted {} ({} entries)",
                    evicted,
                    dropped.len()
                );
            }
        }

        if let Some(entries) = self.models.get_mut(&model) {
            if let Some((evicted, _)) = entries.insert(entity, properties) {
                log::debug!("Property cache evicted {} in {}", evicted, model);
            }
        }
    }

    /// Drop one model's entries, or everything when `model` is `None`
    pub fn invalidate(&mut self, model: Option<ModelId>) {
        match model {
            Some(model) => {
                self.models.remove(&model);
            }
            None => self.models.clear(),
        }
    }

    /// Number of cached models
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Number of cached elements for one model
    pub fn entry_count(&self, model: ModelId) -> usize {
        self.models.peek(&model).map_or(0, |entries| entries.len())
    }

    /// Cached models from least to most recently used
    pub fn models(&self) -> Vec<ModelId> {
        self.models.keys().copied().collect()
    }

    /// Cached entities of one model from least to most recently used
    pub fn entities(&self, model: ModelId) -> Vec<EntityId> {
        self.models
            .peek(&model)
            .map(|entries| entries.keys().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(model: u32, entity: u32) -> Arc<ElementProperties> {
        Arc::new(ElementProperties::new(
            ModelId(model),
            EntityId(entity),
            "IFCWALL",
        ))
    }

    fn small_cache(models: usize, entries: usize) -> PropertyCache {
        PropertyCache::new(
            CacheConfig::default()
                .with_max_models(models)
                .with_max_entries_per_model(entries),
        )
    }

    #[test]
    fn test_entity_eviction_order() {
        let mut cache = small_cache(10, 3);
        for entity in 1..=4 {
            cache.insert(props(0, entity));
        }
        assert!(!cache.contains(ModelId(0), EntityId(1)));
        assert_eq!(
            cache.entities(ModelId(0)),
            vec![EntityId(2), EntityId(3), EntityId(4)]
        );

        // re-access moves to the most recent position
        assert!(cache.get(ModelId(0), EntityId(2)).is_some());
        assert_eq!(
            cache.entities(ModelId(0)),
            vec![EntityId(3), EntityId(4), EntityId(2)]
        );
        cache.insert(props(0, 5));
        assert!(!cache.contains(ModelId(0), EntityId(3)));
        assert!(cache.contains(ModelId(0), EntityId(2)));
    }

    #[test]
    fn test_model_eviction_order() {
        let mut cache = small_cache(2, 10);
        cache.insert(props(0, 1));
        cache.insert(props(1, 1));
        // hit on model 0 bumps it above model 1
        assert!(cache.get(ModelId(0), EntityId(1)).is_some());
        cache.insert(props(2, 1));
        assert_eq!(cache.models(), vec![ModelId(0), ModelId(2)]);
        assert_eq!(cache.entry_count(ModelId(1)), 0);
    }

    #[test]
    fn test_hit_returns_same_value() {
        let mut cache = small_cache(2, 2);
        let stored = props(0, 7);
        cache.insert(Arc::clone(&stored));
        let hit = cache.get(ModelId(0), EntityId(7)).unwrap();
        assert!(Arc::ptr_eq(&stored, &hit));
    }

    #[test]
    fn test_invalidate() {
        let mut cache = small_cache(4, 4);
        cache.insert(props(0, 1));
        cache.insert(props(1, 1));
        cache.invalidate(Some(ModelId(0)));
        assert_eq!(cache.models(), vec![ModelId(1)]);
        cache.invalidate(None);
        assert_eq!(cache.model_count(), 0);
        assert!(cache.get(ModelId(1), EntityId(1)).is_none());
    }
}
