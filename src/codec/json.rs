//! JSON codec - the textual tagged wire format.
//!
//! One JSON object per struct, one member per field keyed by field name;
//! bare list/map elements embed positionally. Enums are written as their
//! symbolic name string so the wire stays stable across member renumbering.
//! Maps are arrays of `{"key": K, "value": V}` pairs (not JSON objects,
//! because keys may be non-string). Polymorphic fields are
//! `{"class_id": <id>, "value": <object or null>}`.
//!
//! Decoding tolerances:
//! - enum lookup tries the integer value first, then the symbolic name;
//!   anything else is a hard parse error
//! - a required field absent from the object is a hard parse error; an
//!   optional field keeps its default
//! - an unresolvable object-pointer class id is logged and leaves the field
//!   empty; the containing struct still decodes

use serde_json::{Map, Value};
use tracing::warn;

use crate::codec::{walk_struct, walk_value, ClassMut, FieldTag, Visitor};
use crate::error::{Result, WireError};
use crate::meta::{ObjectRef, TypeRegistry, ValueMut, WireEnum, WireStruct};

/// Encode a struct into a JSON tree.
pub fn to_json_value(instance: &mut dyn WireStruct) -> Result<Value> {
    let mut encoder = JsonEncoder::new();
    encoder.stack.push(Value::Object(Map::new()));
    walk_struct(instance, &mut encoder)?;
    Ok(encoder.pop())
}

/// Encode a struct into JSON text.
pub fn to_json_string(instance: &mut dyn WireStruct) -> Result<String> {
    Ok(serde_json::to_string(&to_json_value(instance)?)?)
}

/// Decode a struct from a JSON tree.
///
/// `instance` is overwritten field-by-field; fields absent from optional
/// members keep their current value.
pub fn from_json_value(
    registry: &TypeRegistry,
    node: &Value,
    instance: &mut dyn WireStruct,
) -> Result<()> {
    if !node.is_object() {
        return Err(WireError::Malformed(format!(
            "expected JSON object for struct {}",
            instance.descriptor().name
        )));
    }
    let mut decoder = JsonDecoder {
        registry,
        nodes: vec![node],
    };
    walk_struct(instance, &mut decoder)
}

/// Decode a struct from JSON text.
pub fn from_json_str(
    registry: &TypeRegistry,
    text: &str,
    instance: &mut dyn WireStruct,
) -> Result<()> {
    let node: Value = serde_json::from_str(text)?;
    from_json_value(registry, &node, instance)
}

/// Visitor building a JSON tree.
struct JsonEncoder {
    /// Open containers, innermost last.
    stack: Vec<Value>,
}

impl JsonEncoder {
    fn new() -> Self {
        Self { stack: Vec::new() }
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("encoder container stack underflow")
    }

    /// Place a finished value into the innermost open container.
    fn emit(&mut self, tag: FieldTag<'_>, value: Value) -> Result<()> {
        match self.stack.last_mut() {
            Some(Value::Object(map)) => {
                let name = tag.name.ok_or_else(|| {
                    WireError::Malformed("bare value inside object context".to_string())
                })?;
                map.insert(name.to_string(), value);
                Ok(())
            }
            Some(Value::Array(items)) => {
                items.push(value);
                Ok(())
            }
            _ => Err(WireError::Malformed(
                "no open container for encoded value".to_string(),
            )),
        }
    }
}

impl Visitor for JsonEncoder {
    fn visit_bool(&mut self, tag: FieldTag<'_>, v: &mut bool) -> Result<()> {
        self.emit(tag, Value::from(*v))
    }

    fn visit_byte(&mut self, tag: FieldTag<'_>, v: &mut i8) -> Result<()> {
        self.emit(tag, Value::from(*v))
    }

    fn visit_ubyte(&mut self, tag: FieldTag<'_>, v: &mut u8) -> Result<()> {
        self.emit(tag, Value::from(*v))
    }

    fn visit_short(&mut self, tag: FieldTag<'_>, v: &mut i16) -> Result<()> {
        self.emit(tag, Value::from(*v))
    }

    fn visit_ushort(&mut self, tag: FieldTag<'_>, v: &mut u16) -> Result<()> {
        self.emit(tag, Value::from(*v))
    }

    fn visit_int(&mut self, tag: FieldTag<'_>, v: &mut i32) -> Result<()> {
        self.emit(tag, Value::from(*v))
    }

    fn visit_uint(&mut self, tag: FieldTag<'_>, v: &mut u32) -> Result<()> {
        self.emit(tag, Value::from(*v))
    }

    fn visit_long(&mut self, tag: FieldTag<'_>, v: &mut i64) -> Result<()> {
        self.emit(tag, Value::from(*v))
    }

    fn visit_ulong(&mut self, tag: FieldTag<'_>, v: &mut u64) -> Result<()> {
        self.emit(tag, Value::from(*v))
    }

    fn visit_float(&mut self, tag: FieldTag<'_>, v: &mut f32) -> Result<()> {
        self.emit(tag, Value::from(*v))
    }

    fn visit_double(&mut self, tag: FieldTag<'_>, v: &mut f64) -> Result<()> {
        self.emit(tag, Value::from(*v))
    }

    fn visit_string(&mut self, tag: FieldTag<'_>, v: &mut String) -> Result<()> {
        self.emit(tag, Value::from(v.clone()))
    }

    fn visit_enum(&mut self, tag: FieldTag<'_>, v: &mut dyn WireEnum) -> Result<()> {
        // Symbolic name, never the integer value.
        self.emit(tag, Value::from(v.name()))
    }

    fn visit_struct(&mut self, tag: FieldTag<'_>, v: &mut dyn WireStruct) -> Result<()> {
        self.stack.push(Value::Object(Map::new()));
        walk_struct(v, self)?;
        let object = self.pop();
        self.emit(tag, object)
    }

    fn visit_class(&mut self, tag: FieldTag<'_>, v: ClassMut<'_>) -> Result<()> {
        match v {
            ClassMut::List(list) => {
                self.stack.push(Value::Array(Vec::with_capacity(list.len())));
                for index in 0..list.len() {
                    walk_value(FieldTag::bare(), list.at(index), self)?;
                }
                let array = self.pop();
                self.emit(tag, array)
            }
            ClassMut::Map(map) => {
                if !map.key_kind().is_valid_map_key() {
                    return Err(WireError::UnsupportedField {
                        kind: map.key_kind(),
                        context: "map key",
                    });
                }
                self.stack.push(Value::Array(Vec::with_capacity(map.len())));
                for index in 0..map.len() {
                    let (key, value) = map.entry_at(index);
                    self.stack.push(Value::Object(Map::new()));
                    walk_value(FieldTag::named("key"), key, self)?;
                    walk_value(FieldTag::named("value"), value, self)?;
                    let pair = self.pop();
                    self.emit(FieldTag::bare(), pair)?;
                }
                let array = self.pop();
                self.emit(tag, array)
            }
            ClassMut::Object(object) => {
                self.stack.push(Value::Object(Map::new()));
                self.emit(FieldTag::named("class_id"), Value::from(object.class_id))?;
                match object.payload.as_deref_mut() {
                    Some(payload) => {
                        walk_value(FieldTag::named("value"), ValueMut::Struct(payload), self)?;
                    }
                    None => {
                        self.emit(FieldTag::named("value"), Value::Null)?;
                    }
                }
                let wrapper = self.pop();
                self.emit(tag, wrapper)
            }
        }
    }
}

/// Visitor populating a struct from a JSON tree.
struct JsonDecoder<'r, 'v> {
    registry: &'r TypeRegistry,
    /// Input nodes, innermost last. Named tags read a member of the top
    /// node; bare tags read the top node itself.
    nodes: Vec<&'v Value>,
}

impl<'r, 'v> JsonDecoder<'r, 'v> {
    fn top(&self) -> &'v Value {
        self.nodes
            .last()
            .copied()
            .expect("decoder input stack underflow")
    }

    /// Input node for one tag, or `None` for an absent optional member.
    fn node(&self, tag: FieldTag<'_>) -> Result<Option<&'v Value>> {
        let top = self.top();
        match tag.name {
            None => Ok(Some(top)),
            Some(name) => match top {
                Value::Object(map) => match map.get(name) {
                    Some(node) => Ok(Some(node)),
                    None if tag.optional => Ok(None),
                    None => Err(WireError::MissingField(name.to_string())),
                },
                _ => Err(WireError::Malformed(format!(
                    "expected JSON object containing member {name:?}"
                ))),
            },
        }
    }

    fn as_i64(node: &Value, what: &str) -> Result<i64> {
        node.as_i64()
            .ok_or_else(|| WireError::Malformed(format!("expected integer for {what}")))
    }

    fn as_u64(node: &Value, what: &str) -> Result<u64> {
        node.as_u64()
            .ok_or_else(|| WireError::Malformed(format!("expected unsigned integer for {what}")))
    }

    fn int_in_range<T: TryFrom<i64>>(node: &Value, what: &str) -> Result<T> {
        let wide = Self::as_i64(node, what)?;
        T::try_from(wide)
            .map_err(|_| WireError::Malformed(format!("integer {wide} out of range for {what}")))
    }

    fn uint_in_range<T: TryFrom<u64>>(node: &Value, what: &str) -> Result<T> {
        let wide = Self::as_u64(node, what)?;
        T::try_from(wide)
            .map_err(|_| WireError::Malformed(format!("integer {wide} out of range for {what}")))
    }
}

impl Visitor for JsonDecoder<'_, '_> {
    fn visit_bool(&mut self, tag: FieldTag<'_>, v: &mut bool) -> Result<()> {
        if let Some(node) = self.node(tag)? {
            *v = node
                .as_bool()
                .ok_or_else(|| WireError::Malformed("expected boolean".to_string()))?;
        }
        Ok(())
    }

    fn visit_byte(&mut self, tag: FieldTag<'_>, v: &mut i8) -> Result<()> {
        if let Some(node) = self.node(tag)? {
            *v = Self::int_in_range(node, "byte field")?;
        }
        Ok(())
    }

    fn visit_ubyte(&mut self, tag: FieldTag<'_>, v: &mut u8) -> Result<()> {
        if let Some(node) = self.node(tag)? {
            *v = Self::uint_in_range(node, "ubyte field")?;
        }
        Ok(())
    }

    fn visit_short(&mut self, tag: FieldTag<'_>, v: &mut i16) -> Result<()> {
        if let Some(node) = self.node(tag)? {
            *v = Self::int_in_range(node, "short field")?;
        }
        Ok(())
    }

    fn visit_ushort(&mut self, tag: FieldTag<'_>, v: &mut u16) -> Result<()> {
        if let Some(node) = self.node(tag)? {
            *v = Self::uint_in_range(node, "ushort field")?;
        }
        Ok(())
    }

    fn visit_int(&mut self, tag: FieldTag<'_>, v: &mut i32) -> Result<()> {
        if let Some(node) = self.node(tag)? {
            *v = Self::int_in_range(node, "int field")?;
        }
        Ok(())
    }

    fn visit_uint(&mut self, tag: FieldTag<'_>, v: &mut u32) -> Result<()> {
        if let Some(node) = self.node(tag)? {
            *v = Self::uint_in_range(node, "uint field")?;
        }
        Ok(())
    }

    fn visit_long(&mut self, tag: FieldTag<'_>, v: &mut i64) -> Result<()> {
        if let Some(node) = self.node(tag)? {
            *v = Self::as_i64(node, "long field")?;
        }
        Ok(())
    }

    fn visit_ulong(&mut self, tag: FieldTag<'_>, v: &mut u64) -> Result<()> {
        if let Some(node) = self.node(tag)? {
            *v = Self::as_u64(node, "ulong field")?;
        }
        Ok(())
    }

    fn visit_float(&mut self, tag: FieldTag<'_>, v: &mut f32) -> Result<()> {
        if let Some(node) = self.node(tag)? {
            *v = node
                .as_f64()
                .ok_or_else(|| WireError::Malformed("expected number".to_string()))?
                as f32;
        }
        Ok(())
    }

    fn visit_double(&mut self, tag: FieldTag<'_>, v: &mut f64) -> Result<()> {
        if let Some(node) = self.node(tag)? {
            *v = node
                .as_f64()
                .ok_or_else(|| WireError::Malformed("expected number".to_string()))?;
        }
        Ok(())
    }

    fn visit_string(&mut self, tag: FieldTag<'_>, v: &mut String) -> Result<()> {
        if let Some(node) = self.node(tag)? {
            *v = node
                .as_str()
                .ok_or_else(|| WireError::Malformed("expected string".to_string()))?
                .to_string();
        }
        Ok(())
    }

    fn visit_enum(&mut self, tag: FieldTag<'_>, v: &mut dyn WireEnum) -> Result<()> {
        let Some(node) = self.node(tag)? else {
            return Ok(());
        };
        // Integer value first, then symbolic name.
        if let Some(value) = node.as_i64() {
            let narrow = i32::try_from(value).unwrap_or(i32::MIN);
            if v.set_value(narrow) {
                return Ok(());
            }
        } else if let Some(name) = node.as_str() {
            if v.set_by_name(name) {
                return Ok(());
            }
        }
        Err(WireError::UnknownEnumValue {
            enum_name: v.enum_descriptor().name,
            value: node.to_string(),
        })
    }

    fn visit_struct(&mut self, tag: FieldTag<'_>, v: &mut dyn WireStruct) -> Result<()> {
        let Some(node) = self.node(tag)? else {
            return Ok(());
        };
        if !node.is_object() {
            return Err(WireError::Malformed(format!(
                "expected JSON object for struct {}",
                v.descriptor().name
            )));
        }
        self.nodes.push(node);
        let result = walk_struct(v, self);
        self.nodes.pop();
        result
    }

    fn visit_class(&mut self, tag: FieldTag<'_>, v: ClassMut<'_>) -> Result<()> {
        let Some(node) = self.node(tag)? else {
            return Ok(());
        };
        match v {
            ClassMut::List(list) => {
                let items = node
                    .as_array()
                    .ok_or_else(|| WireError::Malformed("expected array for list".to_string()))?;
                list.clear();
                for item in items {
                    self.nodes.push(item);
                    let result = walk_value(FieldTag::bare(), list.push_default(), self);
                    self.nodes.pop();
                    result?;
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
                let pairs = node
                    .as_array()
                    .ok_or_else(|| WireError::Malformed("expected array for map".to_string()))?;
                map.clear();
                for pair in pairs {
                    self.nodes.push(pair);
                    let (key, value) = map.push_default();
                    let result = walk_value(FieldTag::named("key"), key, self)
                        .and_then(|_| walk_value(FieldTag::named("value"), value, self));
                    self.nodes.pop();
                    result?;
                }
                Ok(())
            }
            ClassMut::Object(object) => {
                let class_id = match node.get("class_id") {
                    Some(id) => Self::as_u64(id, "class_id")?,
                    None => return Err(WireError::MissingField("class_id".to_string())),
                };
                let payload_node = node.get("value").filter(|value| !value.is_null());
                let Some(payload_node) = payload_node else {
                    *object = ObjectRef {
                        class_id,
                        payload: None,
                    };
                    return Ok(());
                };

                let Some(descriptor) = self.registry.resolve_by_class_id(class_id) else {
                    // Unknown type: leave the field empty, keep decoding the
                    // containing struct.
                    warn!(class_id, "unresolvable object-pointer class id, leaving field empty");
                    *object = ObjectRef {
                        class_id,
                        payload: None,
                    };
                    return Ok(());
                };

                let mut payload = (descriptor.allocate)();
                self.nodes.push(payload_node);
                let result = walk_struct(payload.as_mut(), self);
                self.nodes.pop();
                result?;
                *object = ObjectRef {
                    class_id,
                    payload: Some(payload),
                };
                Ok(())
            }
        }
    }
}
