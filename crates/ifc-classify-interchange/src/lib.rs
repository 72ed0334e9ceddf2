// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC Classify Interchange
//!
//! Stateless conversions between classification entities and flat,
//! spreadsheet-like [`Table`]s, plus their JSON form.
//!
//! - Classifications: `code | name | color | elements`, elements written as
//!   `model:entity` pairs joined with `;`
//! - Rules: `id | name | description | classificationCode | active`, followed
//!   by repeating `property_k | operator_k | value_k` triples
//!
//! Reading and writing the actual workbook file is left to the host.

pub mod classifications;
pub mod doc_cache;
pub mod error;
pub mod json;
pub mod rules;
pub mod table;

pub use classifications::{
    decode_classifications, encode_classifications, format_elements, parse_element,
    parse_elements, CLASSIFICATION_COLUMNS,
};
pub use doc_cache::{DocCacheDocument, DocCacheEntry, DOC_CACHE_VERSION};
pub use error::{InterchangeError, Result};
pub use json::{
    classifications_from_json, classifications_to_json, rules_from_json, rules_to_json,
    table_from_json, table_to_json,
};
pub use rules::{decode_rules, encode_rules, RULE_COLUMNS};
pub use table::{Cell, Table};
