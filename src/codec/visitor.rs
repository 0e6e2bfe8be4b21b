//! Visitor contract and struct walker.
//!
//! The walker enumerates a struct's field table and invokes one visitor
//! method per field; a codec is a [`Visitor`] implementation. Compound kinds
//! (lists, maps, object pointers) all funnel through [`Visitor::visit_class`]
//! so that adding a container kind touches only the codec implementations,
//! never the walker.

use crate::error::Result;
use crate::meta::{ListSlot, MapSlot, ObjectRef, ValueMut, WireEnum, WireStruct};

/// Identity of the slot being visited: the field name (absent for bare
/// list/map elements, which embed positionally) and whether the field may be
/// missing from textual input.
#[derive(Debug, Clone, Copy)]
pub struct FieldTag<'a> {
    pub name: Option<&'a str>,
    pub optional: bool,
}

impl<'a> FieldTag<'a> {
    /// Tag for a bare element with no field name.
    pub fn bare() -> FieldTag<'static> {
        FieldTag {
            name: None,
            optional: false,
        }
    }

    /// Tag for a required named member.
    pub fn named(name: &'a str) -> FieldTag<'a> {
        FieldTag {
            name: Some(name),
            optional: false,
        }
    }
}

/// Compound slot handed to [`Visitor::visit_class`].
pub enum ClassMut<'a> {
    List(&'a mut dyn ListSlot),
    Map(&'a mut dyn MapSlot),
    Object(&'a mut ObjectRef),
}

/// Per-kind read/write behavior of one codec.
///
/// Encoders read through the slots; decoders write through them. The walker
/// guarantees each slot is visited with the method matching its kind.
pub trait Visitor {
    fn visit_bool(&mut self, tag: FieldTag<'_>, v: &mut bool) -> Result<()>;
    fn visit_byte(&mut self, tag: FieldTag<'_>, v: &mut i8) -> Result<()>;
    fn visit_ubyte(&mut self, tag: FieldTag<'_>, v: &mut u8) -> Result<()>;
    fn visit_short(&mut self, tag: FieldTag<'_>, v: &mut i16) -> Result<()>;
    fn visit_ushort(&mut self, tag: FieldTag<'_>, v: &mut u16) -> Result<()>;
    fn visit_int(&mut self, tag: FieldTag<'_>, v: &mut i32) -> Result<()>;
    fn visit_uint(&mut self, tag: FieldTag<'_>, v: &mut u32) -> Result<()>;
    fn visit_long(&mut self, tag: FieldTag<'_>, v: &mut i64) -> Result<()>;
    fn visit_ulong(&mut self, tag: FieldTag<'_>, v: &mut u64) -> Result<()>;
    fn visit_float(&mut self, tag: FieldTag<'_>, v: &mut f32) -> Result<()>;
    fn visit_double(&mut self, tag: FieldTag<'_>, v: &mut f64) -> Result<()>;
    fn visit_string(&mut self, tag: FieldTag<'_>, v: &mut String) -> Result<()>;
    fn visit_enum(&mut self, tag: FieldTag<'_>, v: &mut dyn WireEnum) -> Result<()>;
    fn visit_struct(&mut self, tag: FieldTag<'_>, v: &mut dyn WireStruct) -> Result<()>;

    /// Entry point for all compound kinds; the visitor sub-dispatches on the
    /// [`ClassMut`] variant.
    fn visit_class(&mut self, tag: FieldTag<'_>, v: ClassMut<'_>) -> Result<()>;
}

/// Drive a visitor over every field of `instance`, in declaration order.
pub fn walk_struct(instance: &mut dyn WireStruct, visitor: &mut dyn Visitor) -> Result<()> {
    let descriptor = instance.descriptor();
    for field in descriptor.fields {
        let tag = FieldTag {
            name: Some(field.name),
            optional: field.optional,
        };
        let slot = (field.access)(instance.as_any_mut());
        walk_value(tag, slot, visitor)?;
    }
    Ok(())
}

/// Dispatch one slot to the visitor method matching its kind.
pub fn walk_value(tag: FieldTag<'_>, slot: ValueMut<'_>, visitor: &mut dyn Visitor) -> Result<()> {
    match slot {
        ValueMut::Bool(v) => visitor.visit_bool(tag, v),
        ValueMut::Byte(v) => visitor.visit_byte(tag, v),
        ValueMut::UByte(v) => visitor.visit_ubyte(tag, v),
        ValueMut::Short(v) => visitor.visit_short(tag, v),
        ValueMut::UShort(v) => visitor.visit_ushort(tag, v),
        ValueMut::Int(v) => visitor.visit_int(tag, v),
        ValueMut::UInt(v) => visitor.visit_uint(tag, v),
        ValueMut::Long(v) => visitor.visit_long(tag, v),
        ValueMut::ULong(v) => visitor.visit_ulong(tag, v),
        ValueMut::Float(v) => visitor.visit_float(tag, v),
        ValueMut::Double(v) => visitor.visit_double(tag, v),
        ValueMut::Str(v) => visitor.visit_string(tag, v),
        ValueMut::Enum(v) => visitor.visit_enum(tag, v),
        ValueMut::Struct(v) => visitor.visit_struct(tag, v),
        ValueMut::List(v) => visitor.visit_class(tag, ClassMut::List(v)),
        ValueMut::Map(v) => visitor.visit_class(tag, ClassMut::Map(v)),
        ValueMut::Object(v) => visitor.visit_class(tag, ClassMut::Object(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::wire_struct! {
        pub struct Probe: 0x0501 {
            flag: bool,
            count: i32,
            label: String,
            items: Vec<i32>,
        }
    }

    /// Records the order and tags of visited slots.
    #[derive(Default)]
    struct Recorder {
        visits: Vec<String>,
    }

    impl Recorder {
        fn record(&mut self, what: &str, tag: FieldTag<'_>) {
            self.visits.push(format!("{what}:{}", tag.name.unwrap_or("_")));
        }
    }

    impl Visitor for Recorder {
        fn visit_bool(&mut self, tag: FieldTag<'_>, _v: &mut bool) -> Result<()> {
            self.record("bool", tag);
            Ok(())
        }
        fn visit_byte(&mut self, tag: FieldTag<'_>, _v: &mut i8) -> Result<()> {
            self.record("byte", tag);
            Ok(())
        }
        fn visit_ubyte(&mut self, tag: FieldTag<'_>, _v: &mut u8) -> Result<()> {
            self.record("ubyte", tag);
            Ok(())
        }
        fn visit_short(&mut self, tag: FieldTag<'_>, _v: &mut i16) -> Result<()> {
            self.record("short", tag);
            Ok(())
        }
        fn visit_ushort(&mut self, tag: FieldTag<'_>, _v: &mut u16) -> Result<()> {
            self.record("ushort", tag);
            Ok(())
        }
        fn visit_int(&mut self, tag: FieldTag<'_>, _v: &mut i32) -> Result<()> {
            self.record("int", tag);
            Ok(())
        }
        fn visit_uint(&mut self, tag: FieldTag<'_>, _v: &mut u32) -> Result<()> {
            self.record("uint", tag);
            Ok(())
        }
        fn visit_long(&mut self, tag: FieldTag<'_>, _v: &mut i64) -> Result<()> {
            self.record("long", tag);
            Ok(())
        }
        fn visit_ulong(&mut self, tag: FieldTag<'_>, _v: &mut u64) -> Result<()> {
            self.record("ulong", tag);
            Ok(())
        }
        fn visit_float(&mut self, tag: FieldTag<'_>, _v: &mut f32) -> Result<()> {
            self.record("float", tag);
            Ok(())
        }
        fn visit_double(&mut self, tag: FieldTag<'_>, _v: &mut f64) -> Result<()> {
            self.record("double", tag);
            Ok(())
        }
        fn visit_string(&mut self, tag: FieldTag<'_>, _v: &mut String) -> Result<()> {
            self.record("string", tag);
            Ok(())
        }
        fn visit_enum(&mut self, tag: FieldTag<'_>, _v: &mut dyn WireEnum) -> Result<()> {
            self.record("enum", tag);
            Ok(())
        }
        fn visit_struct(&mut self, tag: FieldTag<'_>, _v: &mut dyn WireStruct) -> Result<()> {
            self.record("struct", tag);
            Ok(())
        }
        fn visit_class(&mut self, tag: FieldTag<'_>, v: ClassMut<'_>) -> Result<()> {
            let what = match v {
                ClassMut::List(_) => "list",
                ClassMut::Map(_) => "map",
                ClassMut::Object(_) => "object",
            };
            self.record(what, tag);
            Ok(())
        }
    }

    #[test]
    fn test_walker_visits_fields_in_declaration_order() {
        let mut probe = Probe::default();
        let mut recorder = Recorder::default();
        walk_struct(&mut probe, &mut recorder).expect("walk");

        assert_eq!(
            recorder.visits,
            vec!["bool:flag", "int:count", "string:label", "list:items"]
        );
    }

    #[test]
    fn test_walk_value_dispatches_bare_elements() {
        let mut value = 5i64;
        let mut recorder = Recorder::default();
        walk_value(FieldTag::bare(), ValueMut::Long(&mut value), &mut recorder).expect("walk");
        assert_eq!(recorder.visits, vec!["long:_"]);
    }
}
