//! Binary codec - the compact little-endian wire format.
//!
//! Fields are written positionally in declaration order with no names and no
//! delimiters; both sides must share the same field tables. Strings and enum
//! names are `i32` length-prefixed UTF-8, lists and maps carry an `i32`
//! element count, and polymorphic fields are a `u64` class id, a presence
//! byte, and the nested fields inline.
//!
//! Unlike the JSON codec, an unresolvable object-pointer class id is a hard
//! error here: with no self-describing structure there is no way to skip the
//! unknown payload bytes.

use bytes::Bytes;

use crate::codec::{walk_struct, walk_value, ClassMut, FieldTag, Visitor};
use crate::error::{Result, WireError};
use crate::meta::{ObjectRef, TypeRegistry, WireEnum, WireStruct};
use crate::protocol::wire::{WireReader, WireWriter};

/// Encode a struct into its binary form.
pub fn to_binary(instance: &mut dyn WireStruct) -> Result<Bytes> {
    let mut writer = WireWriter::new();
    encode_into(instance, &mut writer)?;
    Ok(writer.finish())
}

/// Encode a struct's fields into an open writer.
///
/// Used by the envelope layer to append a body after header fields.
pub fn encode_into(instance: &mut dyn WireStruct, writer: &mut WireWriter) -> Result<()> {
    let mut encoder = BinaryEncoder { writer };
    walk_struct(instance, &mut encoder)
}

/// Decode a struct from its binary form.
pub fn from_binary(registry: &TypeRegistry, bytes: &[u8], instance: &mut dyn WireStruct) -> Result<()> {
    let mut reader = WireReader::new(bytes);
    decode_from(registry, &mut reader, instance)
}

/// Decode a struct's fields from an open reader.
///
/// Used by the envelope layer to read a body after header fields.
pub fn decode_from(
    registry: &TypeRegistry,
    reader: &mut WireReader<'_>,
    instance: &mut dyn WireStruct,
) -> Result<()> {
    let mut decoder = BinaryDecoder { registry, reader };
    walk_struct(instance, &mut decoder)
}

struct BinaryEncoder<'w> {
    writer: &'w mut WireWriter,
}

impl Visitor for BinaryEncoder<'_> {
    fn visit_bool(&mut self, _tag: FieldTag<'_>, v: &mut bool) -> Result<()> {
        self.writer.put_bool(*v);
        Ok(())
    }

    fn visit_byte(&mut self, _tag: FieldTag<'_>, v: &mut i8) -> Result<()> {
        self.writer.put_i8(*v);
        Ok(())
    }

    fn visit_ubyte(&mut self, _tag: FieldTag<'_>, v: &mut u8) -> Result<()> {
        self.writer.put_u8(*v);
        Ok(())
    }

    fn visit_short(&mut self, _tag: FieldTag<'_>, v: &mut i16) -> Result<()> {
        self.writer.put_i16(*v);
        Ok(())
    }

    fn visit_ushort(&mut self, _tag: FieldTag<'_>, v: &mut u16) -> Result<()> {
        self.writer.put_u16(*v);
        Ok(())
    }

    fn visit_int(&mut self, _tag: FieldTag<'_>, v: &mut i32) -> Result<()> {
        self.writer.put_i32(*v);
        Ok(())
    }

    fn visit_uint(&mut self, _tag: FieldTag<'_>, v: &mut u32) -> Result<()> {
        self.writer.put_u32(*v);
        Ok(())
    }

    fn visit_long(&mut self, _tag: FieldTag<'_>, v: &mut i64) -> Result<()> {
        self.writer.put_i64(*v);
        Ok(())
    }

    fn visit_ulong(&mut self, _tag: FieldTag<'_>, v: &mut u64) -> Result<()> {
        self.writer.put_u64(*v);
        Ok(())
    }

    fn visit_float(&mut self, _tag: FieldTag<'_>, v: &mut f32) -> Result<()> {
        self.writer.put_f32(*v);
        Ok(())
    }

    fn visit_double(&mut self, _tag: FieldTag<'_>, v: &mut f64) -> Result<()> {
        self.writer.put_f64(*v);
        Ok(())
    }

    fn visit_string(&mut self, _tag: FieldTag<'_>, v: &mut String) -> Result<()> {
        self.writer.put_string(v)
    }

    fn visit_enum(&mut self, _tag: FieldTag<'_>, v: &mut dyn WireEnum) -> Result<()> {
        // Symbolic name, same as the textual format.
        self.writer.put_string(v.name())
    }

    fn visit_struct(&mut self, _tag: FieldTag<'_>, v: &mut dyn WireStruct) -> Result<()> {
        walk_struct(v, self)
    }

    fn visit_class(&mut self, _tag: FieldTag<'_>, v: ClassMut<'_>) -> Result<()> {
        match v {
            ClassMut::List(list) => {
                self.writer.put_count(list.len())?;
                for index in 0..list.len() {
                    walk_value(FieldTag::bare(), list.at(index), self)?;
                }
                Ok(())
            }
            ClassMut::Map(map) => {
                if !map.key_kind().is_valid_map_key() {
                    return Err(WireError::UnsupportedField {
                        kind: map.key_kind(),
                        context: "map key",
                    });
                }
                self.writer.put_count(map.len())?;
                for index in 0..map.len() {
                    let (key, value) = map.entry_at(index);
                    walk_value(FieldTag::bare(), key, self)?;
                    walk_value(FieldTag::bare(), value, self)?;
                }
                Ok(())
            }
            ClassMut::Object(object) => {
                self.writer.put_u64(object.class_id);
                match object.payload.as_deref_mut() {
                    Some(payload) => {
                        self.writer.put_bool(true);
                        walk_struct(payload, self)
                    }
                    None => {
                        self.writer.put_bool(false);
                        Ok(())
                    }
                }
            }
        }
    }
}

struct BinaryDecoder<'r, 'b, 'v> {
    registry: &'r TypeRegistry,
    reader: &'b mut WireReader<'v>,
}

impl Visitor for BinaryDecoder<'_, '_, '_> {
    fn visit_bool(&mut self, _tag: FieldTag<'_>, v: &mut bool) -> Result<()> {
        *v = self.reader.read_bool()?;
        Ok(())
    }

    fn visit_byte(&mut self, _tag: FieldTag<'_>, v: &mut i8) -> Result<()> {
        *v = self.reader.read_i8()?;
        Ok(())
    }

    fn visit_ubyte(&mut self, _tag: FieldTag<'_>, v: &mut u8) -> Result<()> {
        *v = self.reader.read_u8()?;
        Ok(())
    }

    fn visit_short(&mut self, _tag: FieldTag<'_>, v: &mut i16) -> Result<()> {
        *v = self.reader.read_i16()?;
        Ok(())
    }

    fn visit_ushort(&mut self, _tag: FieldTag<'_>, v: &mut u16) -> Result<()> {
        *v = self.reader.read_u16()?;
        Ok(())
    }

    fn visit_int(&mut self, _tag: FieldTag<'_>, v: &mut i32) -> Result<()> {
        *v = self.reader.read_i32()?;
        Ok(())
    }

    fn visit_uint(&mut self, _tag: FieldTag<'_>, v: &mut u32) -> Result<()> {
        *v = self.reader.read_u32()?;
        Ok(())
    }

    fn visit_long(&mut self, _tag: FieldTag<'_>, v: &mut i64) -> Result<()> {
        *v = self.reader.read_i64()?;
        Ok(())
    }

    fn visit_ulong(&mut self, _tag: FieldTag<'_>, v: &mut u64) -> Result<()> {
        *v = self.reader.read_u64()?;
        Ok(())
    }

    fn visit_float(&mut self, _tag: FieldTag<'_>, v: &mut f32) -> Result<()> {
        *v = self.reader.read_f32()?;
        Ok(())
    }

    fn visit_double(&mut self, _tag: FieldTag<'_>, v: &mut f64) -> Result<()> {
        *v = self.reader.read_f64()?;
        Ok(())
    }

    fn visit_string(&mut self, _tag: FieldTag<'_>, v: &mut String) -> Result<()> {
        *v = self.reader.read_string()?;
        Ok(())
    }

    fn visit_enum(&mut self, _tag: FieldTag<'_>, v: &mut dyn WireEnum) -> Result<()> {
        let name = self.reader.read_string()?;
        if v.set_by_name(&name) {
            Ok(())
        } else {
            Err(WireError::UnknownEnumValue {
                enum_name: v.enum_descriptor().name,
                value: name,
            })
        }
    }

    fn visit_struct(&mut self, _tag: FieldTag<'_>, v: &mut dyn WireStruct) -> Result<()> {
        walk_struct(v, self)
    }

    fn visit_class(&mut self, _tag: FieldTag<'_>, v: ClassMut<'_>) -> Result<()> {
        match v {
            ClassMut::List(list) => {
                let count = self.reader.read_count()?;
                list.clear();
                for _ in 0..count {
                    walk_value(FieldTag::bare(), list.push_default(), self)?;
                }
                Ok(())
            }
            ClassMut::Map(map) => {
                if !map.key_kind().is_valid_map_key() {
                    return Err(WireError::UnsupportedField {
                        kind: map.key_kind(),
                        context: "map key",
                    });
                }
                let count = self.reader.read_count()?;
                map.clear();
                for _ in 0..count {
                    let (key, value) = map.push_default();
                    walk_value(FieldTag::bare(), key, self)?;
                    walk_value(FieldTag::bare(), value, self)?;
                }
                Ok(())
            }
            ClassMut::Object(object) => {
                let class_id = self.reader.read_u64()?;
                let present = self.reader.read_bool()?;
                if !present {
                    *object = ObjectRef {
                        class_id,
                        payload: None,
                    };
                    return Ok(());
                }
                let descriptor = self.registry.resolve_by_class_id(class_id).ok_or_else(|| {
                    // The payload bytes cannot be skipped without a field
                    // table, so the whole decode fails.
                    WireError::UnknownType(format!("class id {class_id:#x}"))
                })?;
                let mut payload = (descriptor.allocate)();
                walk_struct(payload.as_mut(), self)?;
                *object = ObjectRef {
                    class_id,
                    payload: Some(payload),
                };
                Ok(())
            }
        }
    }
}
