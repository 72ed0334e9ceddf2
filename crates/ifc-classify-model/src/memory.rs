// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory [`EntitySource`] implementation

use crate::{EntityId, EntitySource, IfcType, ModelId, Record, Result, SourceError};
use rustc_hash::FxHashMap;
use std::sync::{Arc, RwLock};

/// Records of one model plus a type index
#[derive(Default)]
struct ModelStore {
    records: FxHashMap<u32, Arc<Record>>,
    /// Type -> handles, in insertion order
    type_index: FxHashMap<IfcType, Vec<EntityId>>,
}

impl ModelStore {
    fn insert(&mut self, record: Record) {
        let id = record.id;
        let ifc_type = record.ifc_type.clone();
        if let Some(previous) = self.records.insert(id.0, Arc::new(record)) {
            if let Some(ids) = self.type_index.get_mut(&previous.ifc_type) {
                ids.retain(|existing| *existing != id);
            }
        }
        self.type_index.entry(ifc_type).or_default().push(id);
    }
}

/// Thread-safe in-memory entity source
///
/// Hosts that already hold decoded records can load them here; tests use it
/// as the fixture source.
#[derive(Default)]
pub struct MemorySource {
    models: RwLock<FxHashMap<ModelId, ModelStore>>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or replace) a model from a set of records
    pub fn insert_model(&self, model: ModelId, records: impl IntoIterator<Item = Record>) {
        let mut store = ModelStore::default();
        for record in records {
            store.insert(record);
        }
        if let Ok(mut models) = self.models.write() {
            models.insert(model, store);
        }
    }

    /// Add or replace a single record, creating the model if needed
    pub fn insert(&self, model: ModelId, record: Record) {
        if let Ok(mut models) = self.models.write() {
            models.entry(model).or_default().insert(record);
        }
    }

    /// Unload a model
    pub fn remove_model(&self, model: ModelId) -> bool {
        self.models
            .write()
            .map(|mut models| models.remove(&model).is_some())
            .unwrap_or(false)
    }

    /// Number of records in a model
    pub fn record_count(&self, model: ModelId) -> usize {
        self.models
            .read()
            .ok()
            .and_then(|models| models.get(&model).map(|m| m.records.len()))
            .unwrap_or(0)
    }
}

impl EntitySource for MemorySource {
    fn record(&self, model: ModelId, id: EntityId) -> Result<Arc<Record>> {
        let models = self
            .models
            .read()
            .map_err(|_| SourceError::Unavailable("record store lock poisoned".into()))?;
        let store = models.get(&model).ok_or(SourceError::ModelNotLoaded(model))?;
        store
            .records
            .get(&id.0)
            .cloned()
            .ok_or(SourceError::not_found(model, id))
    }

    fn handles_of_type(&self, model: ModelId, ifc_type: &IfcType) -> Result<Vec<EntityId>> {
        let models = self
            .models
            .read()
            .map_err(|_| SourceError::Unavailable("record store lock poisoned".into()))?;
        let store = models.get(&model).ok_or(SourceError::ModelNotLoaded(model))?;
        Ok(store.type_index.get(ifc_type).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntitySourceExt, FieldValue};

    fn fixture() -> MemorySource {
        let source = MemorySource::new();
        source.insert_model(
            ModelId(0),
            vec![
                Record::new(1, IfcType::IfcWall).with("Name", "Wall 1"),
                Record::new(2, IfcType::IfcPropertySet).with("Name", "Pset_WallCommon"),
                Record::new(3, IfcType::IfcRelDefinesByProperties)
                    .with("RelatedObjects", FieldValue::refs([1]))
                    .with("RelatingPropertyDefinition", EntityId(2)),
            ],
        );
        source
    }

    #[test]
    fn test_record_lookup() {
        let source = fixture();
        let wall = source.record(ModelId(0), EntityId(1)).unwrap();
        assert_eq!(wall.name(), Some("Wall 1"));
        assert_eq!(
            source.record(ModelId(0), EntityId(99)),
            Err(SourceError::not_found(ModelId(0), EntityId(99)))
        );
        assert_eq!(
            source.record(ModelId(4), EntityId(1)),
            Err(SourceError::ModelNotLoaded(ModelId(4)))
        );
    }

    #[test]
    fn test_type_index_tracks_replacement() {
        let source = fixture();
        source.insert(ModelId(0), Record::new(1, IfcType::IfcSlab));
        assert!(source
            .handles_of_type(ModelId(0), &IfcType::IfcWall)
            .unwrap()
            .is_empty());
        assert_eq!(
            source.handles_of_type(ModelId(0), &IfcType::IfcSlab).unwrap(),
            vec![EntityId(1)]
        );
    }

    #[test]
    fn test_default_property_definition_scan() {
        let source = fixture();
        assert_eq!(
            source
                .property_definition_handles(ModelId(0), EntityId(1))
                .unwrap(),
            vec![EntityId(2)]
        );
        assert!(source
            .property_definition_handles(ModelId(0), EntityId(2))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_remove_model() {
        let source = fixture();
        assert_eq!(source.record_count(ModelId(0)), 3);
        assert!(source.remove_model(ModelId(0)));
        assert!(!source.exists(ModelId(0), EntityId(1)));
    }
}
