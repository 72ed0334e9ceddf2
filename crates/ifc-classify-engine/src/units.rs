// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Readable labels for unit references

use ifc_classify_model::{EntitySource, EntitySourceExt, FieldValue, IfcType, ModelId};

/// Label of the unit a field refers to, e.g. `mm` or `m²`
///
/// Returns `None` for absent, unfetchable or unsupported units.
pub fn unit_label(source: &dyn EntitySource, model: ModelId, field: &FieldValue) -> Option<String> {
    let unit = source.follow(model, field)?.ok()?;

    match unit.ifc_type {
        IfcType::IfcSIUnit => {
            let name = unit.get_enum("Name")?;
            let prefix = unit.get_enum("Prefix").map_or("", si_prefix);
            Some(format!("{}{}", prefix, si_symbol(name)))
        }
        IfcType::IfcConversionBasedUnit => unit.name().map(str::to_string),
        _ => None,
    }
}

fn si_prefix(prefix: &str) -> &'static str {
    match prefix {
        "MILLI" => "m",
        "CENTI" => "c",
        "DECI" => "d",
        "KILO" => "k",
        "MEGA" => "M",
        "GIGA" => "G",
        _ => "",
    }
}

fn si_symbol(name: &str) -> &str {
    match name {
        "METRE" => "m",
        "SQUARE_METRE" => "m²",
        "CUBIC_METRE" => "m³",
        "GRAM" => "g",
        "SECOND" => "s",
        "KELVIN" => "K",
        "DEGREE_CELSIUS" => "°C",
        "AMPERE" => "A",
        "NEWTON" => "N",
        "PASCAL" => "Pa",
        "JOULE" => "J",
        "WATT" => "W",
        "VOLT" => "V",
        "HERTZ" => "Hz",
        "RADIAN" => "rad",
        "LUMEN" => "lm",
        "LUX" => "lx",
        _ => name,
    }
}
