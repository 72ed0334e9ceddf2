// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property resolution for a single element
//!
//! Walks property sets, quantity sets, type objects and material
//! associations of an element and flattens them into [`ElementProperties`].
//! Failures are isolated per section and recorded as in-band error markers.

use crate::{unit_label, CacheConfig, PropertyCache};
use ifc_classify_model::{
    error_sheet, ElementProperties, EntityId, EntitySource, EntitySourceExt, FieldValue, IfcType,
    ModelId, PropertySheet, PropertyValue, Record, Result,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Entity type reported when the base record cannot be loaded
const UNKNOWN_TYPE: &str = "Unknown";

type Sections = BTreeMap<String, PropertySheet>;

/// Resolves and caches [`ElementProperties`]
///
/// The resolver owns its cache. It does not lock: callers sharing one
/// resolver across threads must serialize calls.
pub struct PropertyResolver {
    source: Arc<dyn EntitySource>,
    cache: PropertyCache,
}

impl PropertyResolver {
    /// Create a resolver over a source with an explicit cache
    pub fn new(source: Arc<dyn EntitySource>, cache: PropertyCache) -> Self {
        Self { source, cache }
    }

    /// Create a resolver with a fresh cache of the given bounds
    pub fn with_config(source: Arc<dyn EntitySource>, config: CacheConfig) -> Self {
        Self::new(source, PropertyCache::new(config))
    }

    pub fn cache(&self) -> &PropertyCache {
        &self.cache
    }

    /// Resolve all properties of an element
    ///
    /// A cache hit returns the stored value. Missing or broken sections are
    /// replaced by error markers; the only error returned is the source
    /// reporting itself unavailable while fetching the element record.
    pub fn resolve(&mut self, model: ModelId, entity: EntityId) -> Result<Arc<ElementProperties>> {
        if let Some(hit) = self.cache.get(model, entity) {
            log::debug!("Property cache hit for {} in {}", entity, model);
            return Ok(hit);
        }
        log::debug!("Property cache miss for {} in {}", entity, model);

        let properties = Arc::new(Resolution::new(self.source.as_ref(), model, entity).run()?);
        self.cache.insert(Arc::clone(&properties));
        Ok(properties)
    }

    /// Drop cached results for one model, or for all models
    pub fn invalidate(&mut self, model: Option<ModelId>) {
        self.cache.invalidate(model);
    }
}

/// Resolved entries of one property definition, paths relative to its parent
#[derive(Default)]
struct Fragment {
    entries: Vec<(String, PropertyValue)>,
    /// Contains a cycle marker somewhere
    cyclic: bool,
}

impl Fragment {
    fn single(path: String, value: PropertyValue) -> Self {
        Self {
            entries: vec![(path, value)],
            cyclic: false,
        }
    }

    fn cycle(path: String) -> Self {
        Self {
            entries: vec![(path, PropertyValue::Cycle)],
            cyclic: true,
        }
    }

    /// Append a child fragment below `parent`
    fn nest(&mut self, parent: &str, child: Fragment) {
        self.cyclic |= child.cyclic;
        self.entries.extend(
            child
                .entries
                .into_iter()
                .map(|(path, value)| (format!("{}.{}", parent, path), value)),
        );
    }
}

/// State of one `resolve` call
struct Resolution<'a> {
    source: &'a dyn EntitySource,
    model: ModelId,
    entity: EntityId,
    /// Fully expanded, cycle-free definitions
    memo: FxHashMap<EntityId, Vec<(String, PropertyValue)>>,
}

impl<'a> Resolution<'a> {
    fn new(source: &'a dyn EntitySource, model: ModelId, entity: EntityId) -> Self {
        Self {
            source,
            model,
            entity,
            memo: FxHashMap::default(),
        }
    }

    fn run(mut self) -> Result<ElementProperties> {
        let mut result = ElementProperties::new(self.model, self.entity, UNKNOWN_TYPE);

        match self.source.record(self.model, self.entity) {
            Ok(record) => {
                result.entity_type = record.ifc_type.name().to_string();
                result.attributes = direct_attributes(&record);
            }
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => {
                log::warn!(
                    "Failed to load attributes of {} in {}: {}",
                    self.entity,
                    self.model,
                    e
                );
                result.attributes = error_sheet("Failed to load attributes");
            }
        }

        self.add_property_sets(&mut result.property_sets);
        self.add_type_sections(&mut result.property_sets);
        self.add_material_sections(&mut result.property_sets);

        Ok(result)
    }

    fn add_property_sets(&mut self, sections: &mut Sections) {
        let handles = match self
            .source
            .property_definition_handles(self.model, self.entity)
        {
            Ok(handles) => handles,
            Err(e) => {
                log::warn!("Failed to list property sets of {}: {}", self.entity, e);
                return;
            }
        };

        for id in handles {
            match self.source.record(self.model, id) {
                Ok(definition) => self.add_definition(sections, &definition, None),
                Err(e) => {
                    log::warn!("Failed to load pset {} of {}: {}", id, self.entity, e);
                    sections.insert(
                        format!("Error_Pset_{}", id.0),
                        error_sheet("Failed to load pset"),
                    );
                }
            }
        }
    }

    fn add_type_sections(&mut self, sections: &mut Sections) {
        let handles = match self.source.type_object_handles(self.model, self.entity) {
            Ok(handles) => handles,
            Err(e) => {
                log::warn!("Failed to list type objects of {}: {}", self.entity, e);
                return;
            }
        };

        for id in handles {
            let type_object = match self.source.record(self.model, id) {
                Ok(type_object) => type_object,
                Err(e) => {
                    log::warn!("Failed to load type {} of {}: {}", id, self.entity, e);
                    sections.insert(
                        format!("Error_Type_{}", id.0),
                        error_sheet("Failed to load type"),
                    );
                    continue;
                }
            };
            let type_name = type_object
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Type_{}", id.0));

            sections
                .entry(format!("Type Attributes: {}", type_name))
                .or_default()
                .extend(direct_attributes(&type_object));

            for item in type_object.get_list("HasPropertySets").unwrap_or(&[]) {
                match self.source.follow(self.model, item) {
                    None => continue,
                    Some(Ok(definition)) => {
                        self.add_definition(sections, &definition, Some(type_name.as_str()))
                    }
                    Some(Err(e)) => {
                        let pset_id = item.as_entity_ref().unwrap_or_default();
                        log::warn!("Failed to load pset {} of type {}: {}", pset_id, id, e);
                        sections.insert(
                            format!("Error_TypePset_{}", pset_id.0),
                            error_sheet("Failed to load pset from type"),
                        );
                    }
                }
            }
        }
    }

    /// Add one property set, quantity set or other definition as a section
    fn add_definition(&mut self, sections: &mut Sections, definition: &Record, type_name: Option<&str>) {
        let name = match definition.ifc_type {
            IfcType::IfcPropertySet => definition.name().unwrap_or("Unnamed PSet"),
            IfcType::IfcElementQuantity => definition.name().unwrap_or("Unnamed QSet"),
            _ => definition.name().unwrap_or(definition.ifc_type.name()),
        };
        let key = match type_name {
            Some(type_name) => format!("{} (from Type: {})", name, type_name),
            None => name.to_string(),
        };

        let sheet = match definition.ifc_type {
            IfcType::IfcPropertySet => self.property_set_sheet(definition),
            IfcType::IfcElementQuantity => self.quantity_sheet(definition),
            _ if type_name.is_some() => {
                let attributes = direct_attributes(definition);
                if attributes.is_empty() {
                    return;
                }
                attributes
            }
            _ => {
                log::debug!(
                    "Ignoring property definition {} ({})",
                    definition.id,
                    definition.ifc_type
                );
                return;
            }
        };

        sections.entry(key).or_default().extend(sheet);
    }

    fn property_set_sheet(&mut self, pset: &Record) -> PropertySheet {
        let mut sheet = PropertySheet::new();
        let mut path = FxHashSet::default();
        path.insert(pset.id);

        for item in pset.get_list("HasProperties").unwrap_or(&[]) {
            if let Some(fragment) = self.expand_item(item, &mut path) {
                sheet.extend(fragment.entries);
            }
        }
        sheet
    }

    /// Fetch and expand one entry of a `HasProperties` list
    fn expand_item(&mut self, item: &FieldValue, path: &mut FxHashSet<EntityId>) -> Option<Fragment> {
        match self.source.follow(self.model, item)? {
            Ok(property) => self.expand(&property, path),
            Err(e) => {
                let id = item.as_entity_ref().unwrap_or_default();
                log::warn!("Failed to load property {} of {}: {}", id, self.entity, e);
                Some(Fragment::single(
                    format!("Error_Property_{}", id.0),
                    PropertyValue::error("Failed to load property"),
                ))
            }
        }
    }

    /// Expand one property definition; `path` holds the definitions being expanded
    fn expand(&mut self, property: &Record, path: &mut FxHashSet<EntityId>) -> Option<Fragment> {
        let name = property.name()?.to_string();

        if path.contains(&property.id) {
            return Some(Fragment::cycle(name));
        }
        if let Some(entries) = self.memo.get(&property.id) {
            return Some(Fragment {
                entries: entries.clone(),
                cyclic: false,
            });
        }

        path.insert(property.id);
        let fragment = match property.ifc_type {
            IfcType::IfcComplexProperty => {
                let mut fragment = Fragment::default();
                for item in property.get_list("HasProperties").unwrap_or(&[]) {
                    if let Some(child) = self.expand_item(item, path) {
                        fragment.nest(&name, child);
                    }
                }
                fragment
            }
            _ => Fragment::single(name, self.simple_value(property)),
        };
        path.remove(&property.id);

        if !fragment.cyclic {
            self.memo.insert(property.id, fragment.entries.clone());
        }
        Some(fragment)
    }

    /// Value of a non-complex property, by field priority
    fn simple_value(&self, property: &Record) -> PropertyValue {
        let unit = property
            .get("Unit")
            .and_then(|unit| unit_label(self.source, self.model, unit));

        for field in ["NominalValue", "Value"] {
            if let Some(value) = present(property, field).and_then(field_value) {
                return with_unit(value, unit);
            }
        }

        for field in ["ListValues", "EnumerationValues"] {
            if let Some(items) = present(property, field).and_then(|v| v.as_list()) {
                let values = items.iter().filter_map(field_value).collect();
                return with_unit(PropertyValue::List(values), unit);
            }
        }

        let lower = present(property, "LowerBoundValue").and_then(field_value);
        let upper = present(property, "UpperBoundValue").and_then(field_value);
        if lower.is_some() || upper.is_some() {
            return PropertyValue::Bounded {
                lower: lower.map(Box::new),
                upper: upper.map(Box::new),
                unit,
            };
        }

        PropertyValue::Unhandled(property.ifc_type.name().to_string())
    }

    fn quantity_sheet(&self, qset: &Record) -> PropertySheet {
        let mut sheet = PropertySheet::new();

        for item in qset.get_list("Quantities").unwrap_or(&[]) {
            match self.source.follow(self.model, item) {
                None => continue,
                Some(Ok(quantity)) => {
                    if let Some(name) = quantity.name() {
                        sheet.insert(name.to_string(), self.quantity_value(&quantity));
                    }
                }
                Some(Err(e)) => {
                    let id = item.as_entity_ref().unwrap_or_default();
                    log::warn!("Failed to load quantity {} of {}: {}", id, self.entity, e);
                    sheet.insert(
                        format!("Error_Property_{}", id.0),
                        PropertyValue::error("Failed to load quantity"),
                    );
                }
            }
        }
        sheet
    }

    fn quantity_value(&self, quantity: &Record) -> PropertyValue {
        let field = match quantity.ifc_type {
            IfcType::IfcQuantityLength => "LengthValue",
            IfcType::IfcQuantityArea => "AreaValue",
            IfcType::IfcQuantityVolume => "VolumeValue",
            IfcType::IfcQuantityCount => "CountValue",
            IfcType::IfcQuantityWeight => "WeightValue",
            IfcType::IfcQuantityTime => "TimeValue",
            _ => return PropertyValue::Unhandled(quantity.ifc_type.name().to_string()),
        };
        let Some(value) = present(quantity, field).and_then(field_value) else {
            return PropertyValue::Null;
        };
        let unit = quantity
            .get("Unit")
            .and_then(|unit| unit_label(self.source, self.model, unit));
        with_unit(value, unit)
    }

    fn add_material_sections(&self, sections: &mut Sections) {
        let mut handles = match self.source.material_handles(self.model, self.entity) {
            Ok(handles) => handles,
            Err(e) => {
                log::warn!("Failed to look up materials of {}: {}", self.entity, e);
                Vec::new()
            }
        };

        if handles.is_empty() {
            handles = match self.source.scan_relating(
                self.model,
                self.entity,
                &IfcType::IfcRelAssociatesMaterial,
                "RelatingMaterial",
            ) {
                Ok(handles) => handles,
                Err(e) => {
                    log::warn!("Failed to scan material associations of {}: {}", self.entity, e);
                    Vec::new()
                }
            };
        }

        for id in handles {
            match self.source.record(self.model, id) {
                Ok(material) => self.add_material(sections, &material),
                Err(e) => {
                    log::warn!("Failed to load material {} of {}: {}", id, self.entity, e);
                    sections.insert(
                        format!("Error_Material_{}", id.0),
                        error_sheet("Failed to load material"),
                    );
                }
            }
        }
    }

    fn add_material(&self, sections: &mut Sections, material: &Record) {
        match material.ifc_type {
            IfcType::IfcMaterialLayerSetUsage => {
                match material
                    .get("ForLayerSet")
                    .and_then(|layer_set| self.source.follow(self.model, layer_set))
                {
                    Some(Ok(layer_set)) if layer_set.ifc_type == IfcType::IfcMaterialLayerSet => {
                        self.add_layer_set(sections, &layer_set)
                    }
                    Some(Err(e)) => {
                        log::warn!("Failed to load layer set of {}: {}", material.id, e);
                        sections.insert(
                            format!("Error_Material_{}", material.id.0),
                            error_sheet("Failed to load material"),
                        );
                    }
                    _ => add_plain_material(sections, material),
                }
            }
            IfcType::IfcMaterialLayerSet => self.add_layer_set(sections, material),
            IfcType::IfcMaterialList => self.add_material_list(sections, material),
            _ => add_plain_material(sections, material),
        }
    }

    fn add_layer_set(&self, sections: &mut Sections, layer_set: &Record) {
        let name = layer_set
            .get_string("LayerSetName")
            .filter(|name| !name.is_empty())
            .or_else(|| layer_set.name())
            .map(str::to_string)
            .unwrap_or_else(|| format!("MatLayerSet_{}", layer_set.id.0));

        let mut sheet = PropertySheet::new();
        if let Some(total) = layer_set.get_float("TotalThickness") {
            sheet.insert("TotalThickness".to_string(), PropertyValue::Real(total));
        }

        for (i, item) in layer_set
            .get_list("MaterialLayers")
            .unwrap_or(&[])
            .iter()
            .enumerate()
        {
            let layer = match self.source.follow(self.model, item) {
                Some(Ok(layer)) => layer,
                Some(Err(e)) => {
                    log::warn!("Failed to load layer {} of {}: {}", i + 1, layer_set.id, e);
                    continue;
                }
                None => continue,
            };
            let thickness = layer
                .get_float("LayerThickness")
                .map_or(PropertyValue::Null, PropertyValue::Real);
            let material_name = layer
                .get("Material")
                .and_then(|m| self.source.follow(self.model, m))
                .and_then(|m| m.ok())
                .and_then(|m| m.name().map(str::to_string))
                .unwrap_or_else(|| "Unknown Material".to_string());

            sheet.insert(format!("Layer_{}_Thickness", i + 1), thickness);
            sheet.insert(
                format!("Layer_{}_Material", i + 1),
                PropertyValue::Text(material_name),
            );
        }

        sections
            .entry(format!("LayerSet: {}", name))
            .or_default()
            .extend(sheet);
    }

    fn add_material_list(&self, sections: &mut Sections, list: &Record) {
        let name = list
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("MatList_{}", list.id.0));

        let mut sheet = PropertySheet::new();
        for (i, item) in list.get_list("Materials").unwrap_or(&[]).iter().enumerate() {
            match self.source.follow(self.model, item) {
                Some(Ok(material)) => {
                    let material_name = material
                        .name()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("UnnamedMaterial_{}", material.id.0));
                    sheet.insert(
                        format!("Material_{}", i + 1),
                        PropertyValue::Text(material_name),
                    );
                }
                Some(Err(e)) => {
                    log::warn!("Failed to load material {} of {}: {}", i + 1, list.id, e)
                }
                None => {}
            }
        }

        sections
            .entry(format!("MaterialList: {}", name))
            .or_default()
            .extend(sheet);
    }
}

fn add_plain_material(sections: &mut Sections, material: &Record) {
    let name = material
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Material_{}", material.id.0));
    sections
        .entry(format!("Material: {}", name))
        .or_default()
        .extend(direct_attributes(material));
}

/// Field carrying a value (not null or derived)
fn present<'r>(record: &'r Record, field: &str) -> Option<&'r FieldValue> {
    record.get(field).filter(|value| !value.is_absent())
}

fn with_unit(value: PropertyValue, unit: Option<String>) -> PropertyValue {
    match unit {
        Some(unit) => value.with_unit(unit),
        None => value,
    }
}

/// Scalar fields of a record; references are left out
fn direct_attributes(record: &Record) -> PropertySheet {
    record
        .fields()
        .filter_map(|(name, value)| field_value(value).map(|v| (name.to_string(), v)))
        .collect()
}

/// Convert a scalar or list-of-scalars field
fn field_value(value: &FieldValue) -> Option<PropertyValue> {
    match value {
        FieldValue::Null => Some(PropertyValue::Null),
        FieldValue::Derived | FieldValue::Ref(_) | FieldValue::Inline(_) => None,
        FieldValue::Bool(b) => Some(PropertyValue::Bool(*b)),
        FieldValue::Integer(i) => Some(PropertyValue::Integer(*i)),
        FieldValue::Float(f) => Some(PropertyValue::Real(*f)),
        FieldValue::String(s) => Some(PropertyValue::Text(s.clone())),
        FieldValue::Enum(e) => Some(
            value
                .as_bool()
                .map_or_else(|| PropertyValue::Text(e.clone()), PropertyValue::Bool),
        ),
        FieldValue::List(items) => items
            .iter()
            .map(field_value)
            .collect::<Option<Vec<_>>>()
            .map(PropertyValue::List),
        FieldValue::Typed(_, inner) => field_value(inner),
    }
}
