// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for entity records supplied by an [`EntitySource`](crate::EntitySource)
//!
//! Records are bags of named fields. The accessors on [`FieldValue`] and [`Record`]
//! fail closed: any shape other than the one asked for reads as `None`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Identifier of a loaded model
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Default)]
pub struct ModelId(pub u32);

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model {}", self.0)
    }
}

impl From<u32> for ModelId {
    fn from(id: u32) -> Self {
        ModelId(id)
    }
}

/// Type-safe entity handle
///
/// Wraps the raw line handle of a record (e.g., #123 becomes EntityId(123)).
/// Unique within one model only.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Default)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        EntityId(id)
    }
}

impl From<EntityId> for u32 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

macro_rules! ifc_types {
    ($( $(#[$meta:meta])* $variant:ident => $name:literal ),+ $(,)?) => {
        /// IFC entity type tag
        ///
        /// Covers the types this crate reasons about. Anything else is kept as
        /// [`IfcType::Unknown`] with its upper-cased name.
        #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        pub enum IfcType {
            $( $(#[$meta])* $variant, )+
            /// Unknown type - stores the upper-cased type name
            Unknown(String),
        }

        impl IfcType {
            /// Parse a type name string into an IfcType (case-insensitive)
            pub fn parse(s: &str) -> Self {
                let upper = s.trim().to_uppercase();
                match upper.as_str() {
                    $( $name => IfcType::$variant, )+
                    _ => IfcType::Unknown(upper),
                }
            }

            /// Upper-case type name, e.g. `IFCWALL`
            pub fn name(&self) -> &str {
                match self {
                    $( IfcType::$variant => $name, )+
                    IfcType::Unknown(s) => s,
                }
            }
        }
    };
}

ifc_types! {
    // Spatial structure
    IfcProject => "IFCPROJECT",
    IfcSite => "IFCSITE",
    IfcBuilding => "IFCBUILDING",
    IfcBuildingStorey => "IFCBUILDINGSTOREY",
    IfcSpace => "IFCSPACE",

    // Building elements
    IfcWall => "IFCWALL",
    IfcWallStandardCase => "IFCWALLSTANDARDCASE",
    IfcCurtainWall => "IFCCURTAINWALL",
    IfcSlab => "IFCSLAB",
    IfcRoof => "IFCROOF",
    IfcBeam => "IFCBEAM",
    IfcColumn => "IFCCOLUMN",
    IfcDoor => "IFCDOOR",
    IfcWindow => "IFCWINDOW",
    IfcStair => "IFCSTAIR",
    IfcRailing => "IFCRAILING",
    IfcCovering => "IFCCOVERING",
    IfcPlate => "IFCPLATE",
    IfcMember => "IFCMEMBER",
    IfcBuildingElementProxy => "IFCBUILDINGELEMENTPROXY",
    IfcOpeningElement => "IFCOPENINGELEMENT",
    IfcFurnishingElement => "IFCFURNISHINGELEMENT",

    // Relationships
    IfcRelAggregates => "IFCRELAGGREGATES",
    IfcRelContainedInSpatialStructure => "IFCRELCONTAINEDINSPATIALSTRUCTURE",
    IfcRelDefinesByProperties => "IFCRELDEFINESBYPROPERTIES",
    IfcRelDefinesByType => "IFCRELDEFINESBYTYPE",
    IfcRelAssociatesMaterial => "IFCRELASSOCIATESMATERIAL",
    IfcRelVoidsElement => "IFCRELVOIDSELEMENT",
    IfcRelFillsElement => "IFCRELFILLSELEMENT",

    // Properties
    IfcPropertySet => "IFCPROPERTYSET",
    IfcPropertySingleValue => "IFCPROPERTYSINGLEVALUE",
    IfcPropertyEnumeratedValue => "IFCPROPERTYENUMERATEDVALUE",
    IfcPropertyBoundedValue => "IFCPROPERTYBOUNDEDVALUE",
    IfcPropertyListValue => "IFCPROPERTYLISTVALUE",
    IfcPropertyTableValue => "IFCPROPERTYTABLEVALUE",
    IfcPropertyReferenceValue => "IFCPROPERTYREFERENCEVALUE",
    IfcPropertyEnumeration => "IFCPROPERTYENUMERATION",
    IfcComplexProperty => "IFCCOMPLEXPROPERTY",
    IfcElementQuantity => "IFCELEMENTQUANTITY",
    IfcQuantityLength => "IFCQUANTITYLENGTH",
    IfcQuantityArea => "IFCQUANTITYAREA",
    IfcQuantityVolume => "IFCQUANTITYVOLUME",
    IfcQuantityCount => "IFCQUANTITYCOUNT",
    IfcQuantityWeight => "IFCQUANTITYWEIGHT",
    IfcQuantityTime => "IFCQUANTITYTIME",

    // Materials
    IfcMaterial => "IFCMATERIAL",
    IfcMaterialLayer => "IFCMATERIALLAYER",
    IfcMaterialLayerSet => "IFCMATERIALLAYERSET",
    IfcMaterialLayerSetUsage => "IFCMATERIALLAYERSETUSAGE",
    IfcMaterialList => "IFCMATERIALLIST",
    IfcMaterialConstituentSet => "IFCMATERIALCONSTITUENTSET",
    IfcMaterialProfileSet => "IFCMATERIALPROFILESET",

    // Units
    IfcSIUnit => "IFCSIUNIT",
    IfcConversionBasedUnit => "IFCCONVERSIONBASEDUNIT",
    IfcDerivedUnit => "IFCDERIVEDUNIT",

    // Type definitions
    IfcWallType => "IFCWALLTYPE",
    IfcSlabType => "IFCSLABTYPE",
    IfcBeamType => "IFCBEAMTYPE",
    IfcColumnType => "IFCCOLUMNTYPE",
    IfcDoorType => "IFCDOORTYPE",
    IfcWindowType => "IFCWINDOWTYPE",
    IfcCoveringType => "IFCCOVERINGTYPE",
    IfcBuildingElementProxyType => "IFCBUILDINGELEMENTPROXYTYPE",
}

impl FromStr for IfcType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for IfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single field value of a [`Record`]
#[derive(Clone, Debug, PartialEq, Default)]
pub enum FieldValue {
    /// Null value ($)
    #[default]
    Null,
    /// Derived value (*)
    Derived,
    /// Reference to another record by handle
    Ref(EntityId),
    /// Reference whose target was delivered inline by the source
    Inline(Arc<Record>),
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Enumeration value (.VALUE.)
    Enum(String),
    /// List of values
    List(Vec<FieldValue>),
    /// Typed value like IFCLABEL('text')
    Typed(String, Box<FieldValue>),
}

impl FieldValue {
    /// Build a typed value such as `IFCLABEL('text')`
    pub fn typed(type_name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        FieldValue::Typed(type_name.into().to_uppercase(), Box::new(value.into()))
    }

    /// Build a list of references
    pub fn refs(ids: impl IntoIterator<Item = u32>) -> Self {
        FieldValue::List(ids.into_iter().map(|id| FieldValue::Ref(EntityId(id))).collect())
    }

    /// Try to get as entity reference (plain or inline)
    pub fn as_entity_ref(&self) -> Option<EntityId> {
        match self {
            FieldValue::Ref(id) => Some(*id),
            FieldValue::Inline(record) => Some(record.id),
            _ => None,
        }
    }

    /// Inline record, if the source delivered one
    pub fn as_inline(&self) -> Option<&Arc<Record>> {
        match self {
            FieldValue::Inline(record) => Some(record),
            _ => None,
        }
    }

    /// Try to get as string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            FieldValue::Typed(_, inner) => inner.as_string(),
            _ => None,
        }
    }

    /// Try to get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Typed(_, inner) => inner.as_float(),
            _ => None,
        }
    }

    /// Try to get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Enum(s) => match s.to_uppercase().as_str() {
                "TRUE" | "T" => Some(true),
                "FALSE" | "F" => Some(false),
                _ => None,
            },
            FieldValue::Typed(_, inner) => inner.as_bool(),
            _ => None,
        }
    }

    /// Try to get as enum string
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            FieldValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as list
    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(list) => Some(list),
            _ => None,
        }
    }

    /// Null or derived: carries no value
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Null | FieldValue::Derived)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<EntityId> for FieldValue {
    fn from(id: EntityId) -> Self {
        FieldValue::Ref(id)
    }
}

impl From<Record> for FieldValue {
    fn from(record: Record) -> Self {
        FieldValue::Inline(Arc::new(record))
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(list: Vec<FieldValue>) -> Self {
        FieldValue::List(list)
    }
}

/// A raw typed record from the entity graph
///
/// Fields keep the order in which the source declared them.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Entity handle
    pub id: EntityId,
    /// Entity type
    pub ifc_type: IfcType,
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// Create a record without fields
    pub fn new(id: impl Into<EntityId>, ifc_type: IfcType) -> Self {
        Self {
            id: id.into(),
            ifc_type,
            fields: Vec::new(),
        }
    }

    /// Set a field, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, replacing any previous value of the same name
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Get field by name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Get entity reference
    pub fn get_ref(&self, name: &str) -> Option<EntityId> {
        self.get(name).and_then(|v| v.as_entity_ref())
    }

    /// Get list of entity references; `None` if the field is not a list
    pub fn get_refs(&self, name: &str) -> Option<Vec<EntityId>> {
        self.get_list(name)
            .map(|list| list.iter().filter_map(|v| v.as_entity_ref()).collect())
    }

    /// Get string
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_string())
    }

    /// Get float
    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.as_float())
    }

    /// Get list
    pub fn get_list(&self, name: &str) -> Option<&[FieldValue]> {
        self.get(name).and_then(|v| v.as_list())
    }

    /// Get enum string
    pub fn get_enum(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_enum())
    }

    /// The `Name` attribute, if set
    pub fn name(&self) -> Option<&str> {
        self.get_string("Name").filter(|s| !s.is_empty())
    }

    /// Iterate fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ifc_type_round_trip() {
        assert_eq!(IfcType::parse("IfcWall"), IfcType::IfcWall);
        assert_eq!(IfcType::IfcRelAggregates.name(), "IFCRELAGGREGATES");
        assert_eq!(
            IfcType::parse("ifcFooBar"),
            IfcType::Unknown("IFCFOOBAR".to_string())
        );
        assert_eq!(IfcType::parse("ifcfoobar").name(), "IFCFOOBAR");
    }

    #[test]
    fn test_record_accessors() {
        let record = Record::new(7, IfcType::IfcRelAggregates)
            .with("RelatingObject", EntityId(1))
            .with("RelatedObjects", FieldValue::refs([2, 3]))
            .with("Name", FieldValue::typed("IFCLABEL", "Agg"));

        assert_eq!(record.get_ref("RelatingObject"), Some(EntityId(1)));
        assert_eq!(
            record.get_refs("RelatedObjects"),
            Some(vec![EntityId(2), EntityId(3)])
        );
        assert_eq!(record.name(), Some("Agg"));
        // not a list
        assert_eq!(record.get_refs("RelatingObject"), None);
        assert_eq!(record.get_ref("Missing"), None);
    }

    #[test]
    fn test_set_replaces_field() {
        let mut record = Record::new(1, IfcType::IfcWall).with("Name", "A");
        record.set("Name", "B");
        assert_eq!(record.name(), Some("B"));
        assert_eq!(record.fields().count(), 1);
    }

    #[test]
    fn test_inline_reference() {
        let inner = Record::new(5, IfcType::IfcPropertySingleValue).with("Name", "Width");
        let value = FieldValue::from(inner);
        assert_eq!(value.as_entity_ref(), Some(EntityId(5)));
        assert_eq!(value.as_inline().and_then(|r| r.name()), Some("Width"));
    }

    #[test]
    fn test_bool_from_logical_enum() {
        let value = FieldValue::typed("IFCBOOLEAN", FieldValue::Enum("T".into()));
        assert_eq!(value.as_bool(), Some(true));
        assert_eq!(FieldValue::Enum("U".into()).as_bool(), None);
    }
}
