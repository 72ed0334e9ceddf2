// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity source trait for looking up raw records
//!
//! The source owns the parsed models. Everything in this workspace reads it
//! through [`EntitySource`] and keeps only derived indexes and caches.

use crate::{EntityId, FieldValue, IfcType, ModelId, Record, Result};
use std::sync::Arc;

/// Raw record lookup for loaded models
///
/// Only [`record`](EntitySource::record) and
/// [`handles_of_type`](EntitySource::handles_of_type) are required. The
/// association lookups default to scanning the relationship records; sources
/// with prebuilt indexes can override them.
///
/// # Example
///
/// ```ignore
/// use ifc_classify_model::{EntitySource, IfcType, ModelId};
///
/// fn count_aggregations(source: &dyn EntitySource, model: ModelId) -> usize {
///     source
///         .handles_of_type(model, &IfcType::IfcRelAggregates)
///         .map(|ids| ids.len())
///         .unwrap_or(0)
/// }
/// ```
pub trait EntitySource: Send + Sync {
    /// Get a record by handle
    ///
    /// Fails with [`SourceError::EntityNotFound`](crate::SourceError::EntityNotFound)
    /// for unknown handles.
    fn record(&self, model: ModelId, id: EntityId) -> Result<Arc<Record>>;

    /// All handles of records of the given type within a model
    fn handles_of_type(&self, model: ModelId, ifc_type: &IfcType) -> Result<Vec<EntityId>>;

    /// Property definitions (property sets, quantity sets) attached to an entity
    ///
    /// Default: scan `IfcRelDefinesByProperties` for relationships naming `id`
    /// among their related objects.
    fn property_definition_handles(&self, model: ModelId, id: EntityId) -> Result<Vec<EntityId>> {
        self.scan_relating(
            model,
            id,
            &IfcType::IfcRelDefinesByProperties,
            "RelatingPropertyDefinition",
        )
    }

    /// Type objects the entity is typed by
    ///
    /// Default: scan `IfcRelDefinesByType`.
    fn type_object_handles(&self, model: ModelId, id: EntityId) -> Result<Vec<EntityId>> {
        self.scan_relating(model, id, &IfcType::IfcRelDefinesByType, "RelatingType")
    }

    /// Materials associated with an entity through a direct index
    ///
    /// Default: no index, so callers fall back to scanning
    /// `IfcRelAssociatesMaterial` themselves.
    fn material_handles(&self, _model: ModelId, _id: EntityId) -> Result<Vec<EntityId>> {
        Ok(Vec::new())
    }

    /// Scan relationships of `rel_type` whose `RelatedObjects` contain `id` and
    /// collect their `relating_field` targets
    ///
    /// Unreadable relationship records are skipped.
    fn scan_relating(
        &self,
        model: ModelId,
        id: EntityId,
        rel_type: &IfcType,
        relating_field: &str,
    ) -> Result<Vec<EntityId>> {
        let mut found = Vec::new();
        for rel_id in self.handles_of_type(model, rel_type)? {
            let rel = match self.record(model, rel_id) {
                Ok(rel) => rel,
                Err(e) => {
                    log::warn!("Skipping {} {}: {}", rel_type, rel_id, e);
                    continue;
                }
            };
            let related = match rel.get_refs("RelatedObjects") {
                Some(related) => related,
                None => continue,
            };
            if !related.contains(&id) {
                continue;
            }
            if let Some(target) = rel.get_ref(relating_field) {
                if !found.contains(&target) {
                    found.push(target);
                }
            }
        }
        Ok(found)
    }
}

/// Extension methods for EntitySource
pub trait EntitySourceExt: EntitySource {
    /// Follow a reference field value
    ///
    /// Inline records are returned as-is, plain references are fetched.
    /// Returns `None` if the value is not a reference at all.
    fn follow(&self, model: ModelId, value: &FieldValue) -> Option<Result<Arc<Record>>> {
        match value {
            FieldValue::Inline(record) => Some(Ok(Arc::clone(record))),
            FieldValue::Ref(id) => Some(self.record(model, *id)),
            _ => None,
        }
    }

    /// Check if a record exists
    fn exists(&self, model: ModelId, id: EntityId) -> bool {
        self.record(model, id).is_ok()
    }
}

// Blanket implementation for all EntitySource types
impl<T: EntitySource + ?Sized> EntitySourceExt for T {}
