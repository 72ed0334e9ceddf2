// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inverse relationship index over aggregation and spatial containment

use ifc_classify_model::{EntityId, EntitySource, IfcType, ModelId, Record, Result, SourceError};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Directed relation label
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum RelationKind {
    /// Whole -> parts (`IfcRelAggregates`)
    IsDecomposedBy,
    /// Part -> whole
    Decomposes,
    /// Spatial container -> contained elements (`IfcRelContainedInSpatialStructure`)
    ContainsElements,
    /// Element -> spatial container
    ContainedInStructure,
}

impl RelationKind {
    /// The opposite direction of the same relationship
    pub fn inverse(self) -> Self {
        match self {
            RelationKind::IsDecomposedBy => RelationKind::Decomposes,
            RelationKind::Decomposes => RelationKind::IsDecomposedBy,
            RelationKind::ContainsElements => RelationKind::ContainedInStructure,
            RelationKind::ContainedInStructure => RelationKind::ContainsElements,
        }
    }

    /// Whether this kind points down the hierarchy
    pub fn is_downward(self) -> bool {
        matches!(
            self,
            RelationKind::IsDecomposedBy | RelationKind::ContainsElements
        )
    }
}

/// Relationship record layout that yields edges
struct RelationSource {
    rel_type: IfcType,
    parent_field: &'static str,
    children_field: &'static str,
    /// Kind of the parent -> child edge
    forward: RelationKind,
}

impl RelationSource {
    /// Parent and children of one relationship record
    fn edges(&self, rel: &Record) -> Result<(EntityId, Vec<EntityId>)> {
        let parent = rel
            .get_ref(self.parent_field)
            .ok_or_else(|| SourceError::malformed(rel.id, format!("no {}", self.parent_field)))?;
        let children = rel.get_refs(self.children_field).ok_or_else(|| {
            SourceError::malformed(rel.id, format!("{} is not a list", self.children_field))
        })?;
        Ok((parent, children))
    }
}

fn relation_sources() -> [RelationSource; 2] {
    [
        RelationSource {
            rel_type: IfcType::IfcRelAggregates,
            parent_field: "RelatingObject",
            children_field: "RelatedObjects",
            forward: RelationKind::IsDecomposedBy,
        },
        RelationSource {
            rel_type: IfcType::IfcRelContainedInSpatialStructure,
            parent_field: "RelatingStructure",
            children_field: "RelatedElements",
            forward: RelationKind::ContainsElements,
        },
    ]
}

/// Per-model adjacency: entity -> (kind -> targets)
#[derive(Debug, Default, Clone)]
pub struct RelationsIndex {
    edges: FxHashMap<EntityId, BTreeMap<RelationKind, BTreeSet<EntityId>>>,
}

impl RelationsIndex {
    /// Insert an edge and its inverse
    pub fn insert(&mut self, from: EntityId, kind: RelationKind, to: EntityId) {
        self.edges
            .entry(from)
            .or_default()
            .entry(kind)
            .or_default()
            .insert(to);
        self.edges
            .entry(to)
            .or_default()
            .entry(kind.inverse())
            .or_default()
            .insert(from);
    }

    /// Targets of `entity` along `kind`
    pub fn related(&self, entity: EntityId, kind: RelationKind) -> Option<&BTreeSet<EntityId>> {
        self.edges.get(&entity)?.get(&kind)
    }

    /// Transitive closure over the downward kinds, excluding `entity` itself
    pub fn descendants(&self, entity: EntityId) -> BTreeSet<EntityId> {
        let mut found = BTreeSet::new();
        let mut visited = FxHashSet::default();
        visited.insert(entity);
        let mut frontier = vec![entity];

        while let Some(current) = frontier.pop() {
            let Some(kinds) = self.edges.get(&current) else {
                continue;
            };
            for (kind, targets) in kinds {
                if !kind.is_downward() {
                    continue;
                }
                for target in targets {
                    if visited.insert(*target) {
                        found.insert(*target);
                        frontier.push(*target);
                    }
                }
            }
        }

        found
    }

    /// Number of directed edges, inverses included
    pub fn edge_count(&self) -> usize {
        self.edges
            .values()
            .flat_map(|kinds| kinds.values())
            .map(|targets| targets.len())
            .sum()
    }

    /// Number of entities with at least one edge
    pub fn entity_count(&self) -> usize {
        self.edges.len()
    }
}

/// Builds and owns one [`RelationsIndex`] per loaded model
pub struct RelationsIndexer {
    source: Arc<dyn EntitySource>,
    indexes: FxHashMap<ModelId, RelationsIndex>,
}

impl RelationsIndexer {
    pub fn new(source: Arc<dyn EntitySource>) -> Self {
        Self {
            source,
            indexes: FxHashMap::default(),
        }
    }

    /// Build (or rebuild) the index of a model in one pass
    ///
    /// Relationship records that cannot be fetched, lack a parent, or whose
    /// children field is not a list are skipped. Fails only when the source
    /// cannot enumerate relationship handles.
    pub fn build_index(&mut self, model: ModelId) -> Result<&RelationsIndex> {
        let mut index = RelationsIndex::default();
        let mut records = 0usize;

        for rel_source in relation_sources() {
            for rel_id in self.source.handles_of_type(model, &rel_source.rel_type)? {
                let rel = match self.source.record(model, rel_id) {
                    Ok(rel) => rel,
                    Err(e) => {
                        log::warn!("Skipping {} {}: {}", rel_source.rel_type, rel_id, e);
                        continue;
                    }
                };
                let (parent, children) = match rel_source.edges(&rel) {
                    Ok(edges) => edges,
                    Err(e) => {
                        log::warn!("Skipping {}: {}", rel_source.rel_type, e);
                        continue;
                    }
                };
                for child in children {
                    index.insert(parent, rel_source.forward, child);
                }
                records += 1;
            }
        }

        log::debug!(
            "Indexed {} relationship records ({} edges) for {}",
            records,
            index.edge_count(),
            model
        );

        self.indexes.insert(model, index);
        Ok(&self.indexes[&model])
    }

    /// Index of a model, building it on first use
    pub fn ensure_index(&mut self, model: ModelId) -> Result<&RelationsIndex> {
        if self.indexes.contains_key(&model) {
            return Ok(&self.indexes[&model]);
        }
        self.build_index(model)
    }

    /// Index of a model, if built
    pub fn index(&self, model: ModelId) -> Option<&RelationsIndex> {
        self.indexes.get(&model)
    }

    pub fn is_indexed(&self, model: ModelId) -> bool {
        self.indexes.contains_key(&model)
    }

    /// Discard the index of an unloaded model
    pub fn unload(&mut self, model: ModelId) -> bool {
        self.indexes.remove(&model).is_some()
    }

    /// Direct relations of an entity; empty if the model or entity is not indexed
    pub fn get_related(
        &self,
        model: ModelId,
        entity: EntityId,
        kind: RelationKind,
    ) -> BTreeSet<EntityId> {
        self.indexes
            .get(&model)
            .and_then(|index| index.related(entity, kind))
            .cloned()
            .unwrap_or_default()
    }

    /// Everything under an entity through decomposition and containment
    ///
    /// Never walks upward and never includes `entity` itself.
    pub fn get_descendants(&self, model: ModelId, entity: EntityId) -> BTreeSet<EntityId> {
        self.indexes
            .get(&model)
            .map(|index| index.descendants(entity))
            .unwrap_or_default()
    }
}
