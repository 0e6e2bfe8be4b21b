//! Codec module - the visitor contract and its two implementations.
//!
//! A codec is a [`Visitor`] driven field-by-field by the struct walker
//! ([`walk_struct`]). Two interchangeable codecs exist:
//!
//! - [`json`] - the textual tagged format over `serde_json::Value`
//! - [`binary`] - the compact little-endian format over the wire primitives
//!
//! Both follow the same structural rules (structs keyed by field name, bare
//! list/map elements embedded positionally, enums by symbolic name,
//! polymorphic fields tagged with a class id), so a value encoded in one
//! format decodes field-wise equal through the other.

pub mod binary;
pub mod json;

mod visitor;

pub use visitor::{walk_struct, walk_value, ClassMut, FieldTag, Visitor};
