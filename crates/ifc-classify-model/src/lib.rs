// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Classify Model - Shared types for IFC property classification
//!
//! This crate defines the data every other crate in the workspace agrees on:
//!
//! - [`EntitySource`] - read access to raw records of loaded models
//! - [`Record`] / [`FieldValue`] - named-field records as delivered by a source
//! - [`PropertyValue`] / [`ElementProperties`] - resolved property sheets
//! - [`Rule`] / [`Classification`] - user-authored classification content
//!
//! # Example
//!
//! ```ignore
//! use ifc_classify_model::{EntitySource, EntityId, MemorySource, ModelId};
//!
//! let source = MemorySource::new();
//! source.insert_model(ModelId(0), records);
//! let wall = source.record(ModelId(0), EntityId(42))?;
//! println!("{} {:?}", wall.ifc_type, wall.name());
//! ```

pub mod error;
pub mod memory;
pub mod properties;
pub mod rules;
pub mod source;
pub mod types;

// Re-export all public types
pub use error::*;
pub use memory::*;
pub use properties::*;
pub use rules::*;
pub use source::*;
pub use types::*;
