// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Storey-to-spreadsheet run over a small in-memory building

use ifc_classify_engine::{
    CacheConfig, FlatSheet, PropertyResolver, RelationKind, RelationsIndexer, RuleEngine,
};
use ifc_classify_interchange::{
    decode_classifications, decode_rules, encode_classifications, encode_rules,
};
use ifc_classify_model::{
    Classification, ElementRef, EntityId, FieldValue, IfcType, MemorySource, ModelId,
    PropertyValue, Record, Rule, RuleCondition,
};
use std::collections::BTreeSet;
use std::sync::Arc;

const M: ModelId = ModelId(3);

fn wall_pset(id: u32, external: bool, rating: i64) -> Vec<Record> {
    let flag = if external { "T" } else { "F" };
    vec![
        Record::new(id, IfcType::IfcPropertySet)
            .with("Name", "Pset_WallCommon")
            .with("HasProperties", FieldValue::refs([id + 1, id + 2])),
        Record::new(id + 1, IfcType::IfcPropertySingleValue)
            .with("Name", "IsExternal")
            .with(
                "NominalValue",
                FieldValue::typed("IFCBOOLEAN", FieldValue::Enum(flag.into())),
            ),
        Record::new(id + 2, IfcType::IfcPropertySingleValue)
            .with("Name", "FireRating")
            .with("NominalValue", FieldValue::typed("IFCINTEGER", rating)),
    ]
}

fn building() -> Arc<MemorySource> {
    let mut records = vec![
        Record::new(100, IfcType::IfcProject).with("Name", "Project"),
        Record::new(101, IfcType::IfcSite).with("Name", "Site"),
        Record::new(102, IfcType::IfcBuilding).with("Name", "Building"),
        Record::new(103, IfcType::IfcBuildingStorey).with("Name", "Level 1"),
        Record::new(1, IfcType::IfcWall).with("Name", "Facade"),
        Record::new(2, IfcType::IfcWall).with("Name", "Partition"),
        Record::new(3, IfcType::IfcDoor).with("Name", "Entrance"),
        Record::new(200, IfcType::IfcRelAggregates)
            .with("RelatingObject", EntityId(100))
            .with("RelatedObjects", FieldValue::refs([101])),
        Record::new(201, IfcType::IfcRelAggregates)
            .with("RelatingObject", EntityId(101))
            .with("RelatedObjects", FieldValue::refs([102])),
        Record::new(202, IfcType::IfcRelAggregates)
            .with("RelatingObject", EntityId(102))
            .with("RelatedObjects", FieldValue::refs([103])),
        Record::new(203, IfcType::IfcRelContainedInSpatialStructure)
            .with("RelatingStructure", EntityId(103))
            .with("RelatedElements", FieldValue::refs([1, 2, 3])),
        Record::new(300, IfcType::IfcRelDefinesByProperties)
            .with("RelatedObjects", FieldValue::refs([1]))
            .with("RelatingPropertyDefinition", EntityId(10)),
        Record::new(301, IfcType::IfcRelDefinesByProperties)
            .with("RelatedObjects", FieldValue::refs([2]))
            .with("RelatingPropertyDefinition", EntityId(20)),
    ];
    records.extend(wall_pset(10, true, 90));
    records.extend(wall_pset(20, false, 30));

    let source = MemorySource::new();
    source.insert_model(M, records);
    Arc::new(source)
}

fn rules() -> Vec<Rule> {
    vec![
        Rule::new("ext", "External walls", "21.1")
            .with_condition(RuleCondition::new("ifcType", "equals", "IfcWall"))
            .with_condition(RuleCondition::new("Pset_WallCommon.IsExternal", "equals", true)),
        Rule::new("fire", "Fire rated", "FR")
            .with_condition(RuleCondition::new("Pset_WallCommon.FireRating", ">=", 60)),
        Rule::new("doors", "Doors", "31")
            .with_condition(RuleCondition::new("name", "contains", "entr")),
        Rule::new("off", "Disabled", "21.1")
            .with_active(false)
            .with_condition(RuleCondition::new("ifcType", "exists", "")),
        Rule::new("orphan", "Unknown code", "99")
            .with_condition(RuleCondition::new("ifcType", "exists", "")),
    ]
}

#[test]
fn test_storey_classification_round_trip() {
    let source = building();

    let mut indexer = RelationsIndexer::new(source.clone());
    let index = indexer.build_index(M).unwrap();
    // three aggregations and three containments, stored both ways
    assert_eq!(index.edge_count(), 12);

    let project_tree = indexer.get_descendants(M, EntityId(100));
    assert_eq!(
        project_tree,
        BTreeSet::from([101, 102, 103, 1, 2, 3].map(EntityId))
    );
    assert_eq!(
        indexer.get_related(M, EntityId(2), RelationKind::ContainedInStructure),
        BTreeSet::from([EntityId(103)])
    );

    let storey_elements = indexer.get_descendants(M, EntityId(103));
    let mut resolver = PropertyResolver::with_config(source, CacheConfig::default());
    let mut sheets = Vec::new();
    for &entity in &storey_elements {
        let properties = resolver.resolve(M, entity).unwrap();
        sheets.push((ElementRef::new(M, entity), FlatSheet::from_properties(&properties)));
    }
    assert_eq!(resolver.cache().entry_count(M), 3);
    assert_eq!(
        sheets[0].1.get("Pset_WallCommon.IsExternal"),
        Some(&PropertyValue::Bool(true))
    );

    let engine = RuleEngine::new();
    let rules = rules();
    let matches = engine.evaluate_all(&rules, sheets.iter().map(|(e, s)| (*e, s)));
    assert_eq!(matches[&ElementRef::new(M, 1)], vec!["ext", "fire", "orphan"]);
    assert_eq!(matches[&ElementRef::new(M, 2)], vec!["orphan"]);
    assert_eq!(matches[&ElementRef::new(M, 3)], vec!["doors", "orphan"]);

    let classifications = vec![
        Classification::new("21.1", "External walls").with_color("#aa0000"),
        Classification::new("FR", "Fire rated"),
        Classification::new("31", "Doors"),
    ];
    let proposed =
        engine.propose_assignments(&rules, &classifications, sheets.iter().map(|(e, s)| (*e, s)));
    assert_eq!(proposed.len(), 3);
    assert_eq!(proposed["21.1"], vec![ElementRef::new(M, 1)]);
    assert_eq!(proposed["31"], vec![ElementRef::new(M, 3)]);
    assert!(!proposed.contains_key("99"));

    // the host applies the proposal, then exports both sheets
    let applied: Vec<Classification> = classifications
        .into_iter()
        .map(|c| {
            let elements = proposed.get(&c.code).cloned().unwrap_or_default();
            c.with_elements(elements)
        })
        .collect();

    let decoded = decode_classifications(&encode_classifications(&applied)).unwrap();
    assert_eq!(decoded, applied);
    assert_eq!(decode_rules(&encode_rules(&rules)).unwrap(), rules);
}

#[test]
fn test_reindex_after_unload() {
    let source = building();
    let mut indexer = RelationsIndexer::new(source.clone());
    indexer.ensure_index(M).unwrap();
    assert!(indexer.unload(M));
    assert!(indexer.get_descendants(M, EntityId(100)).is_empty());

    source.insert(
        M,
        Record::new(204, IfcType::IfcRelAggregates)
            .with("RelatingObject", EntityId(1))
            .with("RelatedObjects", FieldValue::refs([2])),
    );
    indexer.ensure_index(M).unwrap();
    assert_eq!(
        indexer.get_descendants(M, EntityId(1)),
        BTreeSet::from([EntityId(2)])
    );
}

#[test]
fn test_invalidate_forces_fresh_resolution() {
    let source = building();
    let mut resolver = PropertyResolver::with_config(
        source.clone(),
        CacheConfig::default().with_max_entries_per_model(1),
    );

    let first = resolver.resolve(M, EntityId(1)).unwrap();
    resolver.resolve(M, EntityId(2)).unwrap();
    assert!(!resolver.cache().contains(M, EntityId(1)));

    source.insert(M, Record::new(1, IfcType::IfcWall).with("Name", "Renamed"));
    let again = resolver.resolve(M, EntityId(1)).unwrap();
    assert!(!Arc::ptr_eq(&first, &again));
    assert_eq!(again.attributes.get("Name"), Some(&PropertyValue::text("Renamed")));

    resolver.invalidate(None);
    assert_eq!(resolver.cache().model_count(), 0);
}
