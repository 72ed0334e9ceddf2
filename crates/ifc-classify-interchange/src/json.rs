// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON form of rules, classifications and tables
//!
//! Field names are camelCase, matching what hosts persist.

use crate::{Result, Table};
use ifc_classify_model::{Classification, Rule};

pub fn rules_to_json(rules: &[Rule]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rules)?)
}

pub fn rules_from_json(json: &str) -> Result<Vec<Rule>> {
    Ok(serde_json::from_str(json)?)
}

pub fn classifications_to_json(classifications: &[Classification]) -> Result<String> {
    Ok(serde_json::to_string_pretty(classifications)?)
}

pub fn classifications_from_json(json: &str) -> Result<Vec<Classification>> {
    Ok(serde_json::from_str(json)?)
}

pub fn table_to_json(table: &Table) -> Result<String> {
    Ok(serde_json::to_string(table)?)
}

pub fn table_from_json(json: &str) -> Result<Table> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InterchangeError;
    use ifc_classify_model::{ElementRef, RuleCondition, DEFAULT_CLASSIFICATION_COLOR};

    #[test]
    fn test_rules_defaults_on_read() {
        let json = r#"[{
            "id": "r1",
            "name": "Walls",
            "classificationCode": "W",
            "conditions": [
                {"property": "ifcType", "operator": "equals", "value": "IFCWALL"},
                {"property": "Pset_WallCommon.FireRating", "operator": ">", "value": 30}
            ]
        }]"#;

        let rules = rules_from_json(json).unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].active);
        assert_eq!(rules[0].description, "");
        assert_eq!(
            rules[0].conditions[1],
            RuleCondition::new("Pset_WallCommon.FireRating", ">", 30)
        );

        let written = rules_to_json(&rules).unwrap();
        assert!(written.contains("\"classificationCode\": \"W\""));
        assert_eq!(rules_from_json(&written).unwrap(), rules);
    }

    #[test]
    fn test_classifications() {
        let classifications = vec![Classification::new("A", "Doors")
            .with_elements([ElementRef::new(0, 12), ElementRef::new(2, 3)])];

        let json = classifications_to_json(&classifications).unwrap();
        let back = classifications_from_json(&json).unwrap();
        assert_eq!(back, classifications);
        assert_eq!(back[0].color, DEFAULT_CLASSIFICATION_COLOR);
    }

    #[test]
    fn test_table_and_errors() {
        let table = table_from_json(r#"{"rows":[["code"],["A"],[3.5,true,null]]}"#).unwrap();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.column("code"), Some(0));
        assert_eq!(table_from_json(&table_to_json(&table).unwrap()).unwrap(), table);

        assert!(matches!(
            rules_from_json("{not json"),
            Err(InterchangeError::Json(_))
        ));
    }
}
