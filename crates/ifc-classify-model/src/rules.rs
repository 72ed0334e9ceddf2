// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! User-authored classification rules and classifications
//!
//! These are owned by the host application. The engine and codecs only read
//! them or produce fresh copies.

use crate::{EntityId, ModelId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Color used for classifications that do not specify one
pub const DEFAULT_CLASSIFICATION_COLOR: &str = "#3b82f6";

/// Address of one element across all loaded models
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct ElementRef {
    pub model: ModelId,
    pub entity: EntityId,
}

impl ElementRef {
    pub fn new(model: impl Into<ModelId>, entity: impl Into<EntityId>) -> Self {
        Self {
            model: model.into(),
            entity: entity.into(),
        }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.model.0, self.entity.0)
    }
}

/// Right-hand side of a rule condition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RuleValue {
    /// Empty text value
    pub fn empty() -> Self {
        RuleValue::Text(String::new())
    }
}

impl Default for RuleValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValue::Bool(b) => write!(f, "{}", b),
            RuleValue::Number(n) => write!(f, "{}", n),
            RuleValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RuleValue {
    fn from(s: &str) -> Self {
        RuleValue::Text(s.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(s: String) -> Self {
        RuleValue::Text(s)
    }
}

impl From<f64> for RuleValue {
    fn from(n: f64) -> Self {
        RuleValue::Number(n)
    }
}

impl From<i32> for RuleValue {
    fn from(n: i32) -> Self {
        RuleValue::Number(f64::from(n))
    }
}

impl From<bool> for RuleValue {
    fn from(b: bool) -> Self {
        RuleValue::Bool(b)
    }
}

/// One property test inside a rule
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    /// Dotted property path, e.g. `Pset_WallCommon.FireRating`
    pub property: String,
    /// Operator tag, e.g. `equals` or `>=`
    pub operator: String,
    pub value: RuleValue,
}

impl RuleCondition {
    pub fn new(
        property: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<RuleValue>,
    ) -> Self {
        Self {
            property: property.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

fn default_active() -> bool {
    true
}

/// Declarative matching rule that assigns a classification
///
/// A rule without conditions matches nothing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub classification_code: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
}

impl Rule {
    /// Create an active rule without conditions
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        classification_code: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            classification_code: classification_code.into(),
            active: true,
            conditions: Vec::new(),
        }
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a condition
    pub fn with_condition(mut self, condition: RuleCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// A classification label and the elements assigned to it
///
/// Element order is preserved; duplicates are tolerated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub code: String,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub elements: Vec<ElementRef>,
}

fn default_color() -> String {
    DEFAULT_CLASSIFICATION_COLOR.to_string()
}

impl Classification {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            color: default_color(),
            elements: Vec::new(),
        }
    }

    /// Set color
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Append elements
    pub fn with_elements(mut self, elements: impl IntoIterator<Item = ElementRef>) -> Self {
        self.elements.extend(elements);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_json_defaults() {
        let rule: Rule = serde_json::from_str(
            r#"{"id":"r1","name":"Fire walls","classificationCode":"C1",
                "conditions":[{"property":"Pset.Fire","operator":">=","value":30}]}"#,
        )
        .unwrap();
        assert!(rule.active);
        assert_eq!(rule.description, "");
        assert_eq!(rule.conditions[0].value, RuleValue::Number(30.0));
    }

    #[test]
    fn test_rule_value_untagged() {
        let values: Vec<RuleValue> = serde_json::from_str(r#"[true, 2, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                RuleValue::Bool(true),
                RuleValue::Number(2.0),
                RuleValue::Text("x".into())
            ]
        );
    }

    #[test]
    fn test_element_ref_display() {
        assert_eq!(ElementRef::new(1, 42).to_string(), "1:42");
    }

    #[test]
    fn test_classification_default_color() {
        let c: Classification = serde_json::from_str(r#"{"code":"A","name":"Walls"}"#).unwrap();
        assert_eq!(c.color, DEFAULT_CLASSIFICATION_COLOR);
        assert!(c.elements.is_empty());
    }
}
