//! Value accessors - the typed channel between walker and codec.
//!
//! A [`ValueMut`] is one mutable field slot. Encoders read through it,
//! decoders write through it; neither ever touches the host struct directly.
//! Container fields expose trait-object slots ([`ListSlot`], [`MapSlot`]) so
//! the codecs stay generic over element types, and polymorphic fields are
//! [`ObjectRef`] values resolved through the registry at decode time.

use std::fmt;

use crate::meta::{FieldKind, WireEnum, WireStruct};

/// Mutable slot for one value of a known [`FieldKind`].
pub enum ValueMut<'a> {
    Bool(&'a mut bool),
    Byte(&'a mut i8),
    UByte(&'a mut u8),
    Short(&'a mut i16),
    UShort(&'a mut u16),
    Int(&'a mut i32),
    UInt(&'a mut u32),
    Long(&'a mut i64),
    ULong(&'a mut u64),
    Float(&'a mut f32),
    Double(&'a mut f64),
    Str(&'a mut String),
    Enum(&'a mut dyn WireEnum),
    Struct(&'a mut dyn WireStruct),
    List(&'a mut dyn ListSlot),
    Map(&'a mut dyn MapSlot),
    Object(&'a mut ObjectRef),
}

impl ValueMut<'_> {
    /// The kind carried by this slot.
    pub fn kind(&self) -> FieldKind {
        match self {
            ValueMut::Bool(_) => FieldKind::Bool,
            ValueMut::Byte(_) => FieldKind::Byte,
            ValueMut::UByte(_) => FieldKind::UByte,
            ValueMut::Short(_) => FieldKind::Short,
            ValueMut::UShort(_) => FieldKind::UShort,
            ValueMut::Int(_) => FieldKind::Int,
            ValueMut::UInt(_) => FieldKind::UInt,
            ValueMut::Long(_) => FieldKind::Long,
            ValueMut::ULong(_) => FieldKind::ULong,
            ValueMut::Float(_) => FieldKind::Float,
            ValueMut::Double(_) => FieldKind::Double,
            ValueMut::Str(_) => FieldKind::String,
            ValueMut::Enum(_) => FieldKind::Enum,
            ValueMut::Struct(_) => FieldKind::Struct,
            ValueMut::List(_) => FieldKind::List,
            ValueMut::Map(_) => FieldKind::Map,
            ValueMut::Object(_) => FieldKind::ObjectPointer,
        }
    }
}

impl fmt::Debug for ValueMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueMut::{:?}", self.kind())
    }
}

/// A type eligible to appear as a struct field.
///
/// Supplies the compile-time [`FieldKind`] the field tables record, and the
/// runtime slot the walker hands to a codec.
pub trait WireValue: Send + 'static {
    /// The kind this type maps to.
    const KIND: FieldKind;

    /// Mutable slot over this value.
    fn value_mut(&mut self) -> ValueMut<'_>;
}

macro_rules! impl_wire_primitive {
    ($($ty:ty => $variant:ident / $kind:ident;)*) => {
        $(
            impl WireValue for $ty {
                const KIND: FieldKind = FieldKind::$kind;

                fn value_mut(&mut self) -> ValueMut<'_> {
                    ValueMut::$variant(self)
                }
            }
        )*
    };
}

impl_wire_primitive! {
    bool => Bool / Bool;
    i8 => Byte / Byte;
    u8 => UByte / UByte;
    i16 => Short / Short;
    u16 => UShort / UShort;
    i32 => Int / Int;
    u32 => UInt / UInt;
    i64 => Long / Long;
    u64 => ULong / ULong;
    f32 => Float / Float;
    f64 => Double / Double;
    String => Str / String;
}

/// Mutable slot over an ordered list field.
///
/// Elements are addressed positionally; `push_default` appends a
/// default-initialized element and returns its slot, which is how the
/// decoder grows a list without knowing the element type.
pub trait ListSlot: Send {
    /// Kind of the list elements.
    fn element_kind(&self) -> FieldKind;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    /// Slot for the element at `index`. Panics if out of range.
    fn at(&mut self, index: usize) -> ValueMut<'_>;

    /// Append a default element and return its slot.
    fn push_default(&mut self) -> ValueMut<'_>;
}

impl<T: WireValue + Default> ListSlot for Vec<T> {
    fn element_kind(&self) -> FieldKind {
        T::KIND
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn at(&mut self, index: usize) -> ValueMut<'_> {
        self[index].value_mut()
    }

    fn push_default(&mut self) -> ValueMut<'_> {
        let index = Vec::len(self);
        self.push(T::default());
        self[index].value_mut()
    }
}

impl<T: WireValue + Default> WireValue for Vec<T> {
    const KIND: FieldKind = FieldKind::List;

    fn value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::List(self)
    }
}

/// Mutable slot over a key/value map field.
///
/// Entries are addressed positionally in insertion order; the wire formats
/// carry maps as ordered `(key, value)` pair sequences, not keyed objects.
pub trait MapSlot: Send {
    /// Kind of the map keys.
    fn key_kind(&self) -> FieldKind;

    /// Kind of the map values.
    fn value_kind(&self) -> FieldKind;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    /// Slots for the entry at `index`. Panics if out of range.
    fn entry_at(&mut self, index: usize) -> (ValueMut<'_>, ValueMut<'_>);

    /// Append a default entry and return its slots.
    fn push_default(&mut self) -> (ValueMut<'_>, ValueMut<'_>);
}

/// Ordered key/value map preserving insertion order.
///
/// The wire representation of a map is a pair sequence, so an order-keeping
/// backing store makes encode/decode deterministic. Lookup is linear, which
/// matches the small maps carried by compositing messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KvMap<K, V> {
    entries: Vec<(K, V)>,
}

impl<K: PartialEq, V> KvMap<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Insert a pair, replacing the value of an equal key.
    ///
    /// Returns the previous value if the key was present.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        for (k, v) in &mut self.entries {
            if *k == key {
                return Some(std::mem::replace(v, value));
            }
        }
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl<K: PartialEq, V> FromIterator<(K, V)> for KvMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<K, V> MapSlot for KvMap<K, V>
where
    K: WireValue + Default + PartialEq,
    V: WireValue + Default,
{
    fn key_kind(&self) -> FieldKind {
        K::KIND
    }

    fn value_kind(&self) -> FieldKind {
        V::KIND
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn entry_at(&mut self, index: usize) -> (ValueMut<'_>, ValueMut<'_>) {
        let (k, v) = &mut self.entries[index];
        (k.value_mut(), v.value_mut())
    }

    fn push_default(&mut self) -> (ValueMut<'_>, ValueMut<'_>) {
        let index = self.entries.len();
        self.entries.push((K::default(), V::default()));
        let (k, v) = &mut self.entries[index];
        (k.value_mut(), v.value_mut())
    }
}

impl<K, V> WireValue for KvMap<K, V>
where
    K: WireValue + Default + PartialEq,
    V: WireValue + Default,
{
    const KIND: FieldKind = FieldKind::Map;

    fn value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Map(self)
    }
}

/// Polymorphic object-pointer field.
///
/// The concrete runtime type is identified by `class_id` and resolved
/// through the [`TypeRegistry`](crate::meta::TypeRegistry) at decode time.
/// A null pointer is `class_id == 0` with no payload; a decoded pointer
/// whose class id did not resolve keeps the id but stays empty.
#[derive(Debug)]
pub struct ObjectRef {
    /// Stable class identifier of the pointed-to struct, 0 for null.
    pub class_id: u64,
    /// The pointed-to instance, if present and resolvable.
    pub payload: Option<Box<dyn WireStruct>>,
}

impl ObjectRef {
    /// A null pointer.
    pub fn null() -> Self {
        Self {
            class_id: 0,
            payload: None,
        }
    }

    /// Pointer to a concrete instance; the class id is taken from the
    /// instance's descriptor.
    pub fn new(payload: Box<dyn WireStruct>) -> Self {
        let class_id = payload.descriptor().class_id;
        Self {
            class_id,
            payload: Some(payload),
        }
    }

    pub fn is_null(&self) -> bool {
        self.payload.is_none()
    }

    /// Downcast the payload to a concrete struct type.
    pub fn payload_as<T: 'static>(&self) -> Option<&T> {
        self.payload
            .as_ref()
            .and_then(|p| p.as_any().downcast_ref::<T>())
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::null()
    }
}

impl Clone for ObjectRef {
    fn clone(&self) -> Self {
        Self {
            class_id: self.class_id,
            payload: self.payload.as_ref().map(|p| p.clone_boxed()),
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        if self.class_id != other.class_id {
            return false;
        }
        match (&self.payload, &other.payload) {
            (None, None) => true,
            (Some(a), Some(b)) => a.eq_dyn(b.as_ref()),
            _ => false,
        }
    }
}

impl WireValue for ObjectRef {
    const KIND: FieldKind = FieldKind::ObjectPointer;

    fn value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Object(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kvmap_insert_and_get() {
        let mut map = KvMap::new();
        assert_eq!(map.insert("a".to_string(), 1), None);
        assert_eq!(map.insert("b".to_string(), 2), None);
        assert_eq!(map.insert("a".to_string(), 3), Some(1));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&"a".to_string()), Some(&3));
        assert_eq!(map.get(&"b".to_string()), Some(&2));
        assert_eq!(map.get(&"c".to_string()), None);
    }

    #[test]
    fn test_kvmap_preserves_insertion_order() {
        let map: KvMap<i32, String> = [(3, "c".to_string()), (1, "a".to_string())]
            .into_iter()
            .collect();
        let keys: Vec<i32> = map.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![3, 1]);
    }

    #[test]
    fn test_vec_list_slot_push_default() {
        let mut list: Vec<i32> = vec![];
        let slot: &mut dyn ListSlot = &mut list;
        assert_eq!(slot.element_kind(), FieldKind::Int);

        if let ValueMut::Int(v) = slot.push_default() {
            *v = 7;
        } else {
            panic!("expected Int slot");
        }
        assert_eq!(list, vec![7]);
    }

    #[test]
    fn test_map_slot_entry_access() {
        let mut map: KvMap<String, i64> = KvMap::new();
        map.insert("x".to_string(), 10);

        let slot: &mut dyn MapSlot = &mut map;
        assert_eq!(slot.key_kind(), FieldKind::String);
        assert_eq!(slot.value_kind(), FieldKind::Long);

        let (k, v) = slot.entry_at(0);
        match (k, v) {
            (ValueMut::Str(k), ValueMut::Long(v)) => {
                assert_eq!(k, "x");
                assert_eq!(*v, 10);
            }
            _ => panic!("unexpected slot kinds"),
        }
    }

    #[test]
    fn test_object_ref_null_equality() {
        assert_eq!(ObjectRef::null(), ObjectRef::null());
        assert!(ObjectRef::default().is_null());
    }

    #[test]
    fn test_value_mut_kind() {
        let mut v = 1i32;
        assert_eq!(v.value_mut().kind(), FieldKind::Int);
        let mut s = String::new();
        assert_eq!(s.value_mut().kind(), FieldKind::String);
    }

    #[test]
    fn test_map_key_kind_validity() {
        assert!(FieldKind::Int.is_valid_map_key());
        assert!(FieldKind::String.is_valid_map_key());
        assert!(FieldKind::ULong.is_valid_map_key());
        assert!(!FieldKind::Bool.is_valid_map_key());
        assert!(!FieldKind::Struct.is_valid_map_key());
        assert!(!FieldKind::Float.is_valid_map_key());
    }
}
