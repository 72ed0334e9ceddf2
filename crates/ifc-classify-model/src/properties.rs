// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolved property values and per-element property sheets

use crate::{EntityId, ModelId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Display text of the cycle sentinel
pub const CYCLE_MARKER: &str = "[Cycle Detected]";

/// Key under which a degraded section or attribute map stores its error marker
pub const ERROR_KEY: &str = "error";

/// A resolved property value
///
/// The last three variants are in-band sentinels: they stand in for a value
/// that could not be produced and are never raised as errors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    /// Explicit null
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Real value
    Real(f64),
    /// Text value (labels, identifiers, enumerators)
    Text(String),
    /// List or enumeration of values
    List(Vec<PropertyValue>),
    /// Bounded range
    Bounded {
        lower: Option<Box<PropertyValue>>,
        upper: Option<Box<PropertyValue>>,
        unit: Option<String>,
    },
    /// Value tagged with a unit
    Measured {
        value: Box<PropertyValue>,
        unit: String,
    },
    /// Property definition of a type the resolver does not handle
    Unhandled(String),
    /// Re-entrant reference found while expanding nested properties
    Cycle,
    /// Section or value could not be loaded
    Error(String),
}

impl PropertyValue {
    /// Create a text value
    pub fn text(s: impl Into<String>) -> Self {
        PropertyValue::Text(s.into())
    }

    /// Create an error marker
    pub fn error(msg: impl Into<String>) -> Self {
        PropertyValue::Error(msg.into())
    }

    /// Attach a unit
    pub fn with_unit(self, unit: impl Into<String>) -> Self {
        PropertyValue::Measured {
            value: Box::new(self),
            unit: unit.into(),
        }
    }

    /// Whether this is one of the sentinel markers
    pub fn is_marker(&self) -> bool {
        matches!(
            self,
            PropertyValue::Unhandled(_) | PropertyValue::Cycle | PropertyValue::Error(_)
        )
    }

    /// Value with any unit wrapper removed
    pub fn unwrap_unit(&self) -> &PropertyValue {
        match self {
            PropertyValue::Measured { value, .. } => value.unwrap_unit(),
            other => other,
        }
    }

    /// Numeric view of a scalar
    pub fn as_f64(&self) -> Option<f64> {
        match self.unwrap_unit() {
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::Real(f) => Some(*f),
            _ => None,
        }
    }

    /// Text view of a text scalar
    pub fn as_str(&self) -> Option<&str> {
        match self.unwrap_unit() {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view of a boolean scalar
    pub fn as_bool(&self) -> Option<bool> {
        match self.unwrap_unit() {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => Ok(()),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Real(r) => write!(f, "{}", r),
            PropertyValue::Text(s) => f.write_str(s),
            PropertyValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            PropertyValue::Bounded { lower, upper, unit } => {
                match (lower, upper) {
                    (Some(l), Some(u)) => write!(f, "{} - {}", l, u)?,
                    (Some(l), None) => write!(f, ">= {}", l)?,
                    (None, Some(u)) => write!(f, "<= {}", u)?,
                    (None, None) => {}
                }
                match unit {
                    Some(unit) => write!(f, " {}", unit),
                    None => Ok(()),
                }
            }
            PropertyValue::Measured { value, unit } => write!(f, "{} {}", value, unit),
            PropertyValue::Unhandled(type_name) => write!(f, "(Unhandled {})", type_name),
            PropertyValue::Cycle => f.write_str(CYCLE_MARKER),
            PropertyValue::Error(msg) => f.write_str(msg),
        }
    }
}

/// Flat dotted-path -> value map for one property section
pub type PropertySheet = BTreeMap<String, PropertyValue>;

/// Build a sheet that only carries an error marker
pub fn error_sheet(msg: impl Into<String>) -> PropertySheet {
    let mut sheet = PropertySheet::new();
    sheet.insert(ERROR_KEY.to_string(), PropertyValue::error(msg));
    sheet
}

/// Fully resolved properties of one element
///
/// Produced once by the property resolver and shared read-only afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementProperties {
    /// Model the element belongs to
    pub model: ModelId,
    /// Element handle
    pub entity: EntityId,
    /// Declared type tag, e.g. `IFCWALL`
    pub entity_type: String,
    /// Direct scalar attributes of the element record
    pub attributes: PropertySheet,
    /// Section display name -> property sheet
    pub property_sets: BTreeMap<String, PropertySheet>,
}

impl ElementProperties {
    /// Empty result for an element
    pub fn new(model: ModelId, entity: EntityId, entity_type: impl Into<String>) -> Self {
        Self {
            model,
            entity,
            entity_type: entity_type.into(),
            attributes: PropertySheet::new(),
            property_sets: BTreeMap::new(),
        }
    }

    /// Look up a value by section name and dotted property path
    pub fn get(&self, section: &str, path: &str) -> Option<&PropertyValue> {
        self.property_sets.get(section)?.get(path)
    }

    /// Whether the base record could not be loaded
    pub fn attributes_failed(&self) -> bool {
        matches!(self.attributes.get(ERROR_KEY), Some(PropertyValue::Error(_)))
    }

    /// Names of sections that carry an error marker
    pub fn failed_sections(&self) -> Vec<&str> {
        self.property_sets
            .iter()
            .filter(|(_, sheet)| matches!(sheet.get(ERROR_KEY), Some(PropertyValue::Error(_))))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
