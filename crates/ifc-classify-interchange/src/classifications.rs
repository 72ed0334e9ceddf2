// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Classifications <-> table rows

use crate::table::cell_at;
use crate::{Cell, InterchangeError, Result, Table};
use ifc_classify_model::{Classification, ElementRef, DEFAULT_CLASSIFICATION_COLOR};
use nom::{
    character::complete::{char, digit1, space0},
    combinator::{all_consuming, map_res},
    sequence::{delimited, separated_pair},
    IResult, Parser,
};

/// Column order written by [`encode_classifications`]
pub const CLASSIFICATION_COLUMNS: [&str; 4] = ["code", "name", "color", "elements"];

/// Separator between element pairs in the `elements` cell
const ELEMENT_SEPARATOR: char = ';';

/// Parse a non-negative handle
fn handle(input: &str) -> IResult<&str, u32> {
    map_res(digit1, |digits: &str| {
        lexical_core::parse::<u32>(digits.as_bytes())
    })
    .parse(input)
}

/// Parse `model:entity`
fn element_pair(input: &str) -> IResult<&str, ElementRef> {
    let (input, (model, entity)) = separated_pair(
        delimited(space0, handle, space0),
        char(':'),
        delimited(space0, handle, space0),
    )
    .parse(input)?;
    Ok((input, ElementRef::new(model, entity)))
}

/// Parse one `model:entity` segment; anything else is `None`
pub fn parse_element(segment: &str) -> Option<ElementRef> {
    all_consuming(element_pair)
        .parse(segment)
        .ok()
        .map(|(_, element)| element)
}

/// Parse a `;`-separated element list, skipping segments that do not parse
pub fn parse_elements(text: &str) -> Vec<ElementRef> {
    text.split(ELEMENT_SEPARATOR)
        .filter(|segment| !segment.trim().is_empty())
        .filter_map(|segment| {
            let element = parse_element(segment);
            if element.is_none() {
                log::warn!("Skipping malformed element reference {:?}", segment);
            }
            element
        })
        .collect()
}

/// Join elements as `model:entity` pairs, keeping order
pub fn format_elements(elements: &[ElementRef]) -> String {
    elements
        .iter()
        .map(ElementRef::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

/// Write classifications as a header row plus one row each
pub fn encode_classifications(classifications: &[Classification]) -> Table {
    let mut table = Table::with_header(&CLASSIFICATION_COLUMNS[..]);
    for classification in classifications {
        table.push_row(vec![
            Cell::text(&classification.code),
            Cell::text(&classification.name),
            Cell::text(&classification.color),
            Cell::text(format_elements(&classification.elements)),
        ]);
    }
    table
}

/// Read classifications from a table
///
/// Header names are matched trimmed and case-insensitively; only `code` is
/// required. Rows with an empty code are skipped, a blank color falls back to
/// the default.
pub fn decode_classifications(table: &Table) -> Result<Vec<Classification>> {
    if table.rows.len() < 2 {
        return Ok(Vec::new());
    }

    let code_col = table
        .column("code")
        .ok_or_else(|| InterchangeError::missing_column("code"))?;
    let name_col = table.column("name");
    let color_col = table.column("color");
    let elements_col = table.column("elements");

    let text = |row: &[Cell], col: Option<usize>| {
        col.map(|c| cell_at(row, c).to_string()).unwrap_or_default()
    };

    let mut classifications = Vec::new();
    for row in table.data_rows() {
        let code = cell_at(row, code_col).to_string().trim().to_string();
        if code.is_empty() {
            continue;
        }

        let color = text(row, color_col);
        let color = if color.trim().is_empty() {
            DEFAULT_CLASSIFICATION_COLOR.to_string()
        } else {
            color
        };

        classifications.push(
            Classification::new(code, text(row, name_col))
                .with_color(color)
                .with_elements(parse_elements(&text(row, elements_col))),
        );
    }
    Ok(classifications)
}
