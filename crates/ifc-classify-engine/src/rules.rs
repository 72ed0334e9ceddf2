// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rule evaluation against flattened property sheets

use ifc_classify_model::{
    Classification, ElementProperties, ElementRef, PropertyValue, Rule, RuleCondition, RuleValue,
};
use std::collections::BTreeMap;

/// Section prefix used for direct element attributes
pub const ATTRIBUTES_SECTION: &str = "Attributes";

/// Single-level dotted-path view of an element's properties
///
/// Keys are `section.path` for every property set section,
/// `Attributes.name` for direct attributes, plus the shorthands
/// `ifcType` and `name`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatSheet {
    values: BTreeMap<String, PropertyValue>,
}

impl FlatSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten resolved properties
    ///
    /// Distinct sources can flatten to the same key (section `A` with path
    /// `B.C` and section `A.B` with path `C`). Later writes win: sections in
    /// name order, then attributes, then the `ifcType` and `name` shorthands.
    /// Every replaced value is logged.
    pub fn from_properties(properties: &ElementProperties) -> Self {
        let mut sheet = Self::new();

        for (section, values) in &properties.property_sets {
            for (path, value) in values {
                sheet.flatten_into(format!("{}.{}", section, path), value.clone());
            }
        }
        for (name, value) in &properties.attributes {
            sheet.flatten_into(format!("{}.{}", ATTRIBUTES_SECTION, name), value.clone());
        }

        sheet.flatten_into(
            "ifcType".to_string(),
            PropertyValue::text(properties.entity_type.clone()),
        );
        if let Some(name) = properties.attributes.get("Name") {
            sheet.flatten_into("name".to_string(), name.clone());
        }

        sheet
    }

    fn flatten_into(&mut self, key: String, value: PropertyValue) {
        if let Some(previous) = self.values.get(&key) {
            log::warn!(
                "Flattened key {} collides: {:?} replaced by {:?}",
                key,
                previous,
                value
            );
        }
        self.values.insert(key, value);
    }

    /// Set a value, builder style
    pub fn with(mut self, path: impl Into<String>, value: PropertyValue) -> Self {
        self.insert(path, value);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, value: PropertyValue) {
        self.values.insert(path.into(), value);
    }

    /// Exact-key lookup
    pub fn get(&self, path: &str) -> Option<&PropertyValue> {
        self.values.get(path)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, PropertyValue)> for FlatSheet {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Condition operator
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operator {
    Equals,
    NotEquals,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Contains,
    NotContains,
    Exists,
    NotExists,
}

impl Operator {
    /// Parse an operator tag (case-insensitive)
    pub fn parse(tag: &str) -> Option<Self> {
        let op = match tag.trim().to_lowercase().as_str() {
            "equals" | "=" | "==" => Operator::Equals,
            "notequals" | "!=" | "<>" => Operator::NotEquals,
            ">" | "greaterthan" => Operator::Greater,
            ">=" => Operator::GreaterOrEqual,
            "<" | "lessthan" => Operator::Less,
            "<=" => Operator::LessOrEqual,
            "contains" => Operator::Contains,
            "notcontains" => Operator::NotContains,
            "exists" => Operator::Exists,
            "notexists" => Operator::NotExists,
            _ => return None,
        };
        Some(op)
    }

    /// Apply to a found value, `None` meaning absent
    pub fn apply(self, found: Option<&PropertyValue>, expected: &RuleValue) -> bool {
        match self {
            Operator::Equals => found.is_some_and(|v| values_equal(v, expected)),
            Operator::NotEquals => !found.is_some_and(|v| values_equal(v, expected)),
            Operator::Greater => compare(found, expected, |a, b| a > b),
            Operator::GreaterOrEqual => compare(found, expected, |a, b| a >= b),
            Operator::Less => compare(found, expected, |a, b| a < b),
            Operator::LessOrEqual => compare(found, expected, |a, b| a <= b),
            Operator::Contains => found.is_some_and(|v| text_contains(v, expected)),
            Operator::NotContains => !found.is_some_and(|v| text_contains(v, expected)),
            Operator::Exists => found.is_some(),
            Operator::NotExists => found.is_none(),
        }
    }
}

/// Parse a number from text
fn parse_number(text: &str) -> Option<f64> {
    lexical_core::parse::<f64>(text.trim().as_bytes()).ok()
}

fn property_number(value: &PropertyValue) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(parse_number))
}

fn rule_number(value: &RuleValue) -> Option<f64> {
    match value {
        RuleValue::Number(n) => Some(*n),
        RuleValue::Text(s) => parse_number(s),
        RuleValue::Bool(_) => None,
    }
}

/// Comparable text of a property value, unit stripped
fn property_text(value: &PropertyValue) -> String {
    value.unwrap_unit().to_string().to_lowercase()
}

fn values_equal(found: &PropertyValue, expected: &RuleValue) -> bool {
    if let (Some(a), Some(b)) = (property_number(found), rule_number(expected)) {
        return a == b;
    }
    property_text(found) == expected.to_string().to_lowercase()
}

fn text_contains(found: &PropertyValue, expected: &RuleValue) -> bool {
    property_text(found).contains(&expected.to_string().to_lowercase())
}

fn compare(found: Option<&PropertyValue>, expected: &RuleValue, op: fn(f64, f64) -> bool) -> bool {
    match (found.and_then(property_number), rule_number(expected)) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

/// Evaluates rules against flattened property sheets
///
/// Stateless. Matching never resolves ties between rules: every matching rule
/// is reported and the caller decides precedence.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        RuleEngine
    }

    /// Whether `rule` matches the sheet
    ///
    /// Inactive rules and rules without conditions never match. Conditions are
    /// ANDed and evaluation stops at the first failure.
    pub fn evaluate(&self, rule: &Rule, sheet: &FlatSheet) -> bool {
        if !rule.active || rule.conditions.is_empty() {
            return false;
        }
        rule.conditions
            .iter()
            .all(|condition| self.evaluate_condition(condition, sheet))
    }

    /// Evaluate one condition
    ///
    /// Marker values (errors, cycles, unhandled types) and explicit nulls
    /// count as absent.
    pub fn evaluate_condition(&self, condition: &RuleCondition, sheet: &FlatSheet) -> bool {
        let Some(op) = Operator::parse(&condition.operator) else {
            log::warn!(
                "Unsupported operator {:?} on {}",
                condition.operator,
                condition.property
            );
            return false;
        };
        let found = sheet
            .get(&condition.property)
            .filter(|value| !value.is_marker() && !matches!(value, PropertyValue::Null));
        let result = op.apply(found, &condition.value);
        log::trace!(
            "{} {:?} {} -> {}",
            condition.property,
            op,
            condition.value,
            result
        );
        result
    }

    /// Ids of all rules matching the sheet, in rule order
    pub fn matching_rules(&self, rules: &[Rule], sheet: &FlatSheet) -> Vec<String> {
        rules
            .iter()
            .filter(|rule| self.evaluate(rule, sheet))
            .map(|rule| rule.id.clone())
            .collect()
    }

    /// Matching rule ids for every element
    pub fn evaluate_all<'s>(
        &self,
        rules: &[Rule],
        elements: impl IntoIterator<Item = (ElementRef, &'s FlatSheet)>,
    ) -> BTreeMap<ElementRef, Vec<String>> {
        elements
            .into_iter()
            .map(|(element, sheet)| (element, self.matching_rules(rules, sheet)))
            .collect()
    }

    /// Element lists per classification code, produced by the active rules
    ///
    /// Every known classification code gets an entry, possibly empty. Rules
    /// pointing at unknown codes are ignored. Each list keeps the order in
    /// which elements first matched and holds no duplicates.
    pub fn propose_assignments<'s>(
        &self,
        rules: &[Rule],
        classifications: &[Classification],
        elements: impl IntoIterator<Item = (ElementRef, &'s FlatSheet)>,
    ) -> BTreeMap<String, Vec<ElementRef>> {
        let mut proposed: BTreeMap<String, Vec<ElementRef>> = classifications
            .iter()
            .map(|c| (c.code.clone(), Vec::new()))
            .collect();
        let elements: Vec<_> = elements.into_iter().collect();

        for rule in rules.iter().filter(|rule| rule.active) {
            let Some(assigned) = proposed.get_mut(&rule.classification_code) else {
                continue;
            };
            for (element, sheet) in &elements {
                if !assigned.contains(element) && self.evaluate(rule, sheet) {
                    assigned.push(*element);
                }
            }
        }

        proposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_classify_model::{EntityId, ModelId};

    fn fire_sheet(rating: i64) -> FlatSheet {
        FlatSheet::new().with("Pset.Fire.Rating", PropertyValue::Integer(rating))
    }

    fn fire_rule(threshold: i32) -> Rule {
        Rule::new("r1", "Fire rated", "FR").with_condition(RuleCondition::new(
            "Pset.Fire.Rating",
            ">=",
            threshold,
        ))
    }

    #[test]
    fn test_numeric_threshold() {
        let engine = RuleEngine::new();
        let sheet = fire_sheet(60);
        assert!(engine.evaluate(&fire_rule(30), &sheet));
        assert!(!engine.evaluate(&fire_rule(90), &sheet));
        assert!(!engine.evaluate(&fire_rule(30).with_active(false), &sheet));
    }

    #[test]
    fn test_rule_without_conditions_matches_nothing() {
        let engine = RuleEngine::new();
        assert!(!engine.evaluate(&Rule::new("r", "Empty", "X"), &fire_sheet(60)));
    }

    #[test]
    fn test_equality_is_case_insensitive() {
        let engine = RuleEngine::new();
        let sheet = FlatSheet::new()
            .with("ifcType", PropertyValue::text("IFCWALL"))
            .with("Pset.IsExternal", PropertyValue::Bool(true))
            .with("Pset.Width", PropertyValue::Real(200.0).with_unit("mm"));

        let cond = |p: &str, op: &str, v: RuleValue| RuleCondition::new(p, op, v);
        assert!(engine.evaluate_condition(&cond("ifcType", "equals", "IfcWall".into()), &sheet));
        assert!(engine.evaluate_condition(&cond("Pset.IsExternal", "=", "TRUE".into()), &sheet));
        assert!(engine.evaluate_condition(&cond("Pset.IsExternal", "==", true.into()), &sheet));
        assert!(engine.evaluate_condition(&cond("Pset.Width", "equals", "200".into()), &sheet));
        assert!(engine.evaluate_condition(&cond("Pset.Width", "<", 250.into()), &sheet));
        assert!(engine.evaluate_condition(&cond("ifcType", "notEquals", "IfcSlab".into()), &sheet));
    }

    #[test]
    fn test_absent_values() {
        let engine = RuleEngine::new();
        let sheet = FlatSheet::new()
            .with("Pset.Broken", PropertyValue::error("Failed to load pset"))
            .with("Pset.Loop", PropertyValue::Cycle);

        let cond = |p: &str, op: &str| RuleCondition::new(p, op, "x");
        assert!(!engine.evaluate_condition(&cond("Pset.Missing", "equals"), &sheet));
        assert!(engine.evaluate_condition(&cond("Pset.Missing", "notEquals"), &sheet));
        assert!(engine.evaluate_condition(&cond("Pset.Broken", "notExists"), &sheet));
        assert!(!engine.evaluate_condition(&cond("Pset.Loop", "exists"), &sheet));
        assert!(!engine.evaluate_condition(&cond("Pset.Missing", ">"), &sheet));
        assert!(engine.evaluate_condition(&cond("Pset.Missing", "notContains"), &sheet));
    }

    #[test]
    fn test_contains_and_unknown_operator() {
        let engine = RuleEngine::new();
        let sheet = FlatSheet::new().with("name", PropertyValue::text("Basic Wall:Exterior"));
        assert!(engine.evaluate_condition(&RuleCondition::new("name", "contains", "exterior"), &sheet));
        assert!(!engine.evaluate_condition(&RuleCondition::new("name", "matches", "Basic"), &sheet));
    }

    #[test]
    fn test_flatten_properties() {
        let mut props = ElementProperties::new(ModelId(0), EntityId(5), "IFCDOOR");
        props.attributes.insert("Name".into(), PropertyValue::text("D-01"));
        props
            .property_sets
            .entry("Pset_DoorCommon".into())
            .or_default()
            .insert("Fire.Rating".into(), PropertyValue::Integer(30));

        let sheet = FlatSheet::from_properties(&props);
        assert_eq!(
            sheet.get("Pset_DoorCommon.Fire.Rating"),
            Some(&PropertyValue::Integer(30))
        );
        assert_eq!(sheet.get("Attributes.Name"), Some(&PropertyValue::text("D-01")));
        assert_eq!(sheet.get("name"), Some(&PropertyValue::text("D-01")));
        assert_eq!(sheet.get("ifcType"), Some(&PropertyValue::text("IFCDOOR")));
        // exact keys only
        assert_eq!(sheet.get("Fire.Rating"), None);
    }

    #[test]
    fn test_colliding_keys_keep_last_write() {
        let mut props = ElementProperties::new(ModelId(0), EntityId(5), "IFCWALL");
        props.attributes.insert("Name".into(), PropertyValue::text("W-01"));
        props
            .property_sets
            .entry("Pset".into())
            .or_default()
            .insert("Fire.Rating".into(), PropertyValue::Integer(60));
        props
            .property_sets
            .entry("Pset.Fire".into())
            .or_default()
            .insert("Rating".into(), PropertyValue::Integer(10));
        props
            .property_sets
            .entry(ATTRIBUTES_SECTION.into())
            .or_default()
            .insert("Name".into(), PropertyValue::text("from pset"));

        let sheet = FlatSheet::from_properties(&props);
        // sections apply in name order
        assert_eq!(sheet.get("Pset.Fire.Rating"), Some(&PropertyValue::Integer(10)));
        // element attributes override a section called Attributes
        assert_eq!(sheet.get("Attributes.Name"), Some(&PropertyValue::text("W-01")));
        assert_eq!(sheet.len(), 4);
    }

    #[test]
    fn test_matching_and_assignments() {
        let engine = RuleEngine::new();
        let low = fire_sheet(30);
        let high = fire_sheet(120);
        let a = ElementRef::new(0, 1);
        let b = ElementRef::new(0, 2);

        let rules = vec![
            fire_rule(30),
            Rule::new("r2", "High", "FR").with_condition(RuleCondition::new(
                "Pset.Fire.Rating",
                ">",
                90,
            )),
            Rule::new("r3", "Orphan", "NOPE").with_condition(RuleCondition::new(
                "Pset.Fire.Rating",
                "exists",
                "",
            )),
        ];

        let matches = engine.evaluate_all(&rules, [(a, &low), (b, &high)]);
        assert_eq!(matches[&a], vec!["r1", "r3"]);
        assert_eq!(matches[&b], vec!["r1", "r2", "r3"]);

        let classifications = vec![Classification::new("FR", "Fire rated"), Classification::new("X", "Other")];
        let proposed = engine.propose_assignments(&rules, &classifications, [(a, &low), (b, &high)]);
        assert_eq!(proposed["FR"], vec![a, b]);
        assert!(proposed["X"].is_empty());
        assert!(!proposed.contains_key("NOPE"));
    }
}
