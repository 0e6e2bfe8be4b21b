//! Struct and enum descriptors - the per-type metadata tables.
//!
//! A [`TypeDescriptor`] is the static field table for one wire-visible
//! struct: its stable 64-bit class identifier, display name, fields in
//! declaration order, and an allocation hook used when the decoder has to
//! construct an instance from a class id alone (polymorphic fields, list
//! elements of struct type).

use std::any::Any;
use std::fmt;

use crate::meta::{FieldKind, ValueMut};

/// Accessor function stored in a field table.
///
/// Given the containing struct (as `&mut dyn Any`), returns the mutable slot
/// for one field. Invoking an accessor with the wrong concrete type is a
/// programmer error and panics.
pub type FieldAccessFn = for<'a> fn(&'a mut dyn Any) -> ValueMut<'a>;

/// Allocation hook producing a default-initialized instance.
pub type AllocateFn = fn() -> Box<dyn WireStruct>;

/// One entry in a struct's field table.
pub struct FieldDef {
    /// Field name as it appears on the textual wire.
    pub name: &'static str,
    /// Value category of the field.
    pub kind: FieldKind,
    /// Optional fields may be absent from textual input; the decoded struct
    /// keeps the default value. Binary input always carries every field.
    pub optional: bool,
    /// Accessor returning the field's mutable slot.
    pub access: FieldAccessFn,
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("optional", &self.optional)
            .finish()
    }
}

/// Static metadata for one wire-visible struct.
pub struct TypeDescriptor {
    /// Stable 64-bit class identifier carried on the wire for polymorphic
    /// fields.
    pub class_id: u64,
    /// Display name, used as the envelope type tag.
    pub name: &'static str,
    /// Public fields in declaration order.
    pub fields: &'static [FieldDef],
    /// Produces a new default instance of the described struct.
    pub allocate: AllocateFn,
}

impl TypeDescriptor {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("class_id", &self.class_id)
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Static metadata for one wire-visible enum.
#[derive(Debug)]
pub struct EnumDescriptor {
    /// Display name of the enum type.
    pub name: &'static str,
    /// `(symbolic name, integer value)` pairs in declaration order.
    pub entries: &'static [(&'static str, i32)],
}

impl EnumDescriptor {
    /// Integer value for a symbolic name, if declared.
    pub fn value_of(&self, name: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    /// Symbolic name for an integer value, if declared.
    pub fn name_of(&self, value: i32) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| *n)
    }
}

/// A struct that can cross the wire.
///
/// Implemented by the [`wire_struct!`](crate::wire_struct) macro; never
/// implemented by hand. Object safe so decoded polymorphic payloads can be
/// held as `Box<dyn WireStruct>`.
pub trait WireStruct: Any + Send + fmt::Debug {
    /// The static field table for this struct.
    fn descriptor(&self) -> &'static TypeDescriptor;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for field access.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Dynamic equality across boxed payloads.
    fn eq_dyn(&self, other: &dyn WireStruct) -> bool;

    /// Dynamic clone for boxed payloads.
    fn clone_boxed(&self) -> Box<dyn WireStruct>;
}

/// An enum that can cross the wire.
///
/// The wire carries the symbolic name, not the integer value, so renumbering
/// enum members does not invalidate previously-encoded data. Implemented by
/// the [`wire_enum!`](crate::wire_enum) macro.
pub trait WireEnum: Send {
    /// The static name/value table for this enum.
    fn enum_descriptor(&self) -> &'static EnumDescriptor;

    /// Current integer value.
    fn value(&self) -> i32;

    /// Set from an integer value. Returns false if the value is not a
    /// declared member.
    fn set_value(&mut self, value: i32) -> bool;

    /// Symbolic name of the current member.
    fn name(&self) -> &'static str;

    /// Set from a symbolic name. Returns false if the name is not a declared
    /// member.
    fn set_by_name(&mut self, name: &str) -> bool;
}
