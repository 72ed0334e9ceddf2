// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rules <-> table rows
//!
//! Fixed columns come first; each condition then takes three cells
//! (`property_k`, `operator_k`, `value_k`). Rules with fewer conditions than
//! the widest rule are padded with empty cells.

use crate::table::cell_at;
use crate::{Cell, InterchangeError, Result, Table};
use ifc_classify_model::{Rule, RuleCondition, RuleValue};

/// Fixed columns written by [`encode_rules`]
pub const RULE_COLUMNS: [&str; 5] = ["id", "name", "description", "classificationCode", "active"];

fn value_cell(value: &RuleValue) -> Cell {
    match value {
        RuleValue::Bool(b) => Cell::Bool(*b),
        RuleValue::Number(n) => Cell::Number(*n),
        RuleValue::Text(s) => Cell::Text(s.clone()),
    }
}

fn cell_value(cell: &Cell) -> RuleValue {
    match cell {
        Cell::Empty => RuleValue::empty(),
        Cell::Bool(b) => RuleValue::Bool(*b),
        Cell::Number(n) => RuleValue::Number(*n),
        Cell::Text(s) => RuleValue::Text(s.clone()),
    }
}

/// `false` (any case) and zero are falsy; everything else, blank included, is true
fn decode_active(cell: &Cell) -> bool {
    match cell {
        Cell::Empty => true,
        Cell::Bool(b) => *b,
        Cell::Number(n) => *n != 0.0,
        Cell::Text(s) => {
            let s = s.trim();
            !(s.eq_ignore_ascii_case("false") || s == "0")
        }
    }
}

/// Write rules as a header row plus one row each
///
/// `active` is written as `1` or `0`.
pub fn encode_rules(rules: &[Rule]) -> Table {
    let max_conditions = rules.iter().map(|r| r.conditions.len()).max().unwrap_or(0);

    let mut header: Vec<String> = RULE_COLUMNS.iter().map(|c| c.to_string()).collect();
    for k in 1..=max_conditions {
        header.push(format!("property_{}", k));
        header.push(format!("operator_{}", k));
        header.push(format!("value_{}", k));
    }
    let width = header.len();
    let mut table = Table::with_header(header.as_slice());

    for rule in rules {
        let mut row = vec![
            Cell::text(&rule.id),
            Cell::text(&rule.name),
            Cell::text(&rule.description),
            Cell::text(&rule.classification_code),
            Cell::Number(if rule.active { 1.0 } else { 0.0 }),
        ];
        for condition in &rule.conditions {
            row.push(Cell::text(&condition.property));
            row.push(Cell::text(&condition.operator));
            row.push(value_cell(&condition.value));
        }
        row.resize(width, Cell::Empty);
        table.push_row(row);
    }
    table
}

/// Read rules from a table
///
/// `name` and `active` columns are required; condition triples start right
/// after `active`. Rows with an empty name are skipped. A missing
/// `classificationCode` reads as empty. Only an empty id cell becomes
/// `rule-«row»`; an id written as empty text stays empty.
/// Condition reading stops at the first empty property cell.
pub fn decode_rules(table: &Table) -> Result<Vec<Rule>> {
    if table.rows.len() < 2 {
        return Ok(Vec::new());
    }

    let required = |name: &str| {
        table
            .column(name)
            .ok_or_else(|| InterchangeError::missing_column(name))
    };
    let name_col = required("name")?;
    let active_col = required("active")?;
    let code_col = table.column("classificationCode");
    let id_col = table.column("id");
    let description_col = table.column("description");

    let mut rules = Vec::new();
    for (i, row) in table.data_rows().enumerate() {
        let row_number = i + 1;
        let name = cell_at(row, name_col).to_string();
        if name.trim().is_empty() {
            continue;
        }

        let id = id_col
            .map(|c| cell_at(row, c))
            .filter(|cell| **cell != Cell::Empty)
            .map(Cell::to_string)
            .unwrap_or_else(|| format!("rule-{}", row_number));
        let description = description_col
            .map(|c| cell_at(row, c).to_string())
            .unwrap_or_default();

        let code = code_col
            .map(|c| cell_at(row, c).to_string())
            .unwrap_or_default();

        let mut rule = Rule::new(id, name, code)
            .with_description(description)
            .with_active(decode_active(cell_at(row, active_col)));

        let mut col = active_col + 1;
        while col < row.len() {
            let property = cell_at(row, col);
            if property.is_blank() {
                break;
            }
            rule.conditions.push(RuleCondition::new(
                property.to_string(),
                cell_at(row, col + 1).to_string(),
                cell_value(cell_at(row, col + 2)),
            ));
            col += 3;
        }

        rules.push(rule);
    }
    Ok(rules)
}
