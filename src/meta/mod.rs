//! Type metadata for the object-graph codec.
//!
//! The codec never inspects Rust types directly. Every struct that crosses
//! the wire declares an explicit field table (a [`TypeDescriptor`]) mapping
//! field name to [`FieldKind`] plus an accessor function, and every enum
//! declares a name/value table (an [`EnumDescriptor`]). The tables are
//! generated by the [`wire_struct!`](crate::wire_struct) and
//! [`wire_enum!`](crate::wire_enum) macros and collected into an explicitly
//! constructed [`TypeRegistry`].
//!
//! # Design
//!
//! - [`ValueMut`] is the only channel through which a codec reads or writes
//!   a concrete value; it carries exactly one [`FieldKind`] per slot.
//! - Polymorphic fields are [`ObjectRef`], a tagged
//!   `{class_id, Option<Box<dyn WireStruct>>}` pair resolved through the
//!   registry at decode time.
//! - Ordered lists are `Vec<T>`, key/value maps are [`KvMap`]; both expose
//!   trait-object slots ([`ListSlot`], [`MapSlot`]) so the codecs stay
//!   generic over element types.

mod descriptor;
mod registry;
mod value;

pub mod macros;

pub use descriptor::{
    AllocateFn, EnumDescriptor, FieldAccessFn, FieldDef, TypeDescriptor, WireEnum, WireStruct,
};
pub use registry::TypeRegistry;
pub use value::{KvMap, ListSlot, MapSlot, ObjectRef, ValueMut, WireValue};

/// The closed set of value categories the codec can visit.
///
/// Every value visited during serialization carries exactly one kind,
/// determined by the field table of its containing struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Bool,
    /// Signed 8-bit integer.
    Byte,
    /// Unsigned 8-bit integer.
    UByte,
    /// Signed 16-bit integer.
    Short,
    /// Unsigned 16-bit integer.
    UShort,
    /// Signed 32-bit integer.
    Int,
    /// Unsigned 32-bit integer.
    UInt,
    /// Signed 64-bit integer.
    Long,
    /// Unsigned 64-bit integer.
    ULong,
    Float,
    Double,
    String,
    Enum,
    Struct,
    List,
    Map,
    ObjectPointer,
}

impl FieldKind {
    /// Whether this kind is allowed as a map key on the wire.
    ///
    /// Only integer and string keys are supported, matching the legacy wire
    /// format; both codecs enforce the same restriction so a schema that
    /// encodes in one format round-trips in the other.
    pub fn is_valid_map_key(self) -> bool {
        matches!(
            self,
            FieldKind::Byte
                | FieldKind::UByte
                | FieldKind::Short
                | FieldKind::UShort
                | FieldKind::Int
                | FieldKind::UInt
                | FieldKind::Long
                | FieldKind::ULong
                | FieldKind::String
        )
    }
}
