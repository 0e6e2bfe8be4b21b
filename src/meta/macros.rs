//! Declarative macros generating per-type metadata tables.
//!
//! [`wire_struct!`](crate::wire_struct) declares a plain Rust struct together
//! with its static field table ([`TypeDescriptor`](crate::meta::TypeDescriptor)),
//! and [`wire_enum!`](crate::wire_enum) declares an enum together with its
//! name/value table. The generated tables are what the struct walker drives,
//! so adding a message type never touches the walker or the codecs.
//!
//! # Example
//!
//! ```
//! scenewire::wire_struct! {
//!     /// One layer in the scene graph.
//!     pub struct Layer: 0x4C41_0001 {
//!         id: i32,
//!         name: String,
//!         optional tags: Vec<String>,
//!     }
//! }
//!
//! let layer = Layer::default();
//! assert_eq!(layer.id, 0);
//!
//! let descriptor = Layer::descriptor();
//! assert_eq!(descriptor.class_id, 0x4C41_0001);
//! assert_eq!(descriptor.fields.len(), 3);
//! assert!(descriptor.fields[2].optional);
//! ```

/// Declare a wire-visible struct and its field table.
///
/// Syntax: `pub struct Name: <class id expr> { field: Type, optional other: Type, }`.
/// Fields marked `optional` may be absent from textual input; all other
/// fields are required.
#[macro_export]
macro_rules! wire_struct {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident : $class_id:literal {
            $($fields:tt)*
        }
    ) => {
        $crate::wire_struct!(@munch
            meta = [$(#[$attr])* $vis $name $class_id]
            rest = [$($fields)*]
            out = []
        );
    };

    // One field marked optional.
    (@munch
        meta = [$($meta:tt)*]
        rest = [$(#[$fattr:meta])* optional $fname:ident : $fty:ty $(, $($rest:tt)*)?]
        out = [$($out:tt)*]
    ) => {
        $crate::wire_struct!(@munch
            meta = [$($meta)*]
            rest = [$($($rest)*)?]
            out = [$($out)* { [$(#[$fattr])*] $fname [$fty] true }]
        );
    };

    // One required field.
    (@munch
        meta = [$($meta:tt)*]
        rest = [$(#[$fattr:meta])* $fname:ident : $fty:ty $(, $($rest:tt)*)?]
        out = [$($out:tt)*]
    ) => {
        $crate::wire_struct!(@munch
            meta = [$($meta)*]
            rest = [$($($rest)*)?]
            out = [$($out)* { [$(#[$fattr])*] $fname [$fty] false }]
        );
    };

    // All fields consumed.
    (@munch
        meta = [$($meta:tt)*]
        rest = []
        out = [$($out:tt)*]
    ) => {
        $crate::wire_struct!(@emit meta = [$($meta)*] out = [$($out)*]);
    };

    (@emit
        meta = [$(#[$attr:meta])* $vis:vis $name:ident $class_id:literal]
        out = [$({ [$($fattr:tt)*] $fname:ident [$fty:ty] $fopt:tt })*]
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $(
                $($fattr)*
                pub $fname: $fty,
            )*
        }

        impl $name {
            /// Stable wire identifier for this struct.
            pub const CLASS_ID: u64 = $class_id;

            /// Static field table and allocation hook for this struct.
            pub fn descriptor() -> &'static $crate::meta::TypeDescriptor {
                static FIELDS: &[$crate::meta::FieldDef] = &[
                    $(
                        $crate::meta::FieldDef {
                            name: stringify!($fname),
                            kind: <$fty as $crate::meta::WireValue>::KIND,
                            optional: $fopt,
                            access: {
                                fn access(
                                    instance: &mut dyn ::std::any::Any,
                                ) -> $crate::meta::ValueMut<'_> {
                                    let concrete = instance
                                        .downcast_mut::<$name>()
                                        .expect("field accessor invoked with wrong struct type");
                                    $crate::meta::WireValue::value_mut(&mut concrete.$fname)
                                }
                                access
                            },
                        },
                    )*
                ];
                static DESCRIPTOR: $crate::meta::TypeDescriptor = $crate::meta::TypeDescriptor {
                    class_id: $class_id,
                    name: stringify!($name),
                    fields: FIELDS,
                    allocate: {
                        fn allocate() -> ::std::boxed::Box<dyn $crate::meta::WireStruct> {
                            ::std::boxed::Box::new(<$name as ::core::default::Default>::default())
                        }
                        allocate
                    },
                };
                &DESCRIPTOR
            }
        }

        impl $crate::meta::WireStruct for $name {
            fn descriptor(&self) -> &'static $crate::meta::TypeDescriptor {
                Self::descriptor()
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn eq_dyn(&self, other: &dyn $crate::meta::WireStruct) -> bool {
                other
                    .as_any()
                    .downcast_ref::<$name>()
                    .map_or(false, |other| self == other)
            }

            fn clone_boxed(&self) -> ::std::boxed::Box<dyn $crate::meta::WireStruct> {
                ::std::boxed::Box::new(self.clone())
            }
        }

        impl $crate::meta::WireValue for $name {
            const KIND: $crate::meta::FieldKind = $crate::meta::FieldKind::Struct;

            fn value_mut(&mut self) -> $crate::meta::ValueMut<'_> {
                $crate::meta::ValueMut::Struct(self)
            }
        }
    };
}

/// Declare a wire-visible enum and its name/value table.
///
/// The first declared member is the default. The wire carries the symbolic
/// name, so members can be renumbered or reordered without breaking
/// previously-encoded data.
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$attr:meta])*
        $vis:vis enum $name:ident {
            $(#[$first_attr:meta])*
            $first:ident = $first_val:expr
            $(
                , $(#[$var_attr:meta])*
                $variant:ident = $variant_val:expr
            )* $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        $vis enum $name {
            $(#[$first_attr])*
            $first = $first_val,
            $(
                $(#[$var_attr])*
                $variant = $variant_val,
            )*
        }

        impl $name {
            /// Static name/value table for this enum.
            pub fn descriptor() -> &'static $crate::meta::EnumDescriptor {
                static ENTRIES: &[(&str, i32)] = &[
                    (stringify!($first), $first_val),
                    $((stringify!($variant), $variant_val),)*
                ];
                static DESCRIPTOR: $crate::meta::EnumDescriptor = $crate::meta::EnumDescriptor {
                    name: stringify!($name),
                    entries: ENTRIES,
                };
                &DESCRIPTOR
            }

            /// Resolve a member from its symbolic name.
            pub fn from_name(name: &str) -> Option<Self> {
                let mut member = Self::default();
                if $crate::meta::WireEnum::set_by_name(&mut member, name) {
                    Some(member)
                } else {
                    None
                }
            }

            /// Resolve a member from its integer value.
            pub fn from_value(value: i32) -> Option<Self> {
                let mut member = Self::default();
                if $crate::meta::WireEnum::set_value(&mut member, value) {
                    Some(member)
                } else {
                    None
                }
            }
        }

        impl ::core::default::Default for $name {
            fn default() -> Self {
                Self::$first
            }
        }

        impl $crate::meta::WireEnum for $name {
            fn enum_descriptor(&self) -> &'static $crate::meta::EnumDescriptor {
                Self::descriptor()
            }

            fn value(&self) -> i32 {
                *self as i32
            }

            fn set_value(&mut self, value: i32) -> bool {
                let next = if value == $first_val {
                    Self::$first
                }
                $(else if value == $variant_val {
                    Self::$variant
                })*
                else {
                    return false;
                };
                *self = next;
                true
            }

            fn name(&self) -> &'static str {
                match self {
                    Self::$first => stringify!($first),
                    $(Self::$variant => stringify!($variant),)*
                }
            }

            fn set_by_name(&mut self, name: &str) -> bool {
                let next = if name == stringify!($first) {
                    Self::$first
                }
                $(else if name == stringify!($variant) {
                    Self::$variant
                })*
                else {
                    return false;
                };
                *self = next;
                true
            }
        }

        impl $crate::meta::WireValue for $name {
            const KIND: $crate::meta::FieldKind = $crate::meta::FieldKind::Enum;

            fn value_mut(&mut self) -> $crate::meta::ValueMut<'_> {
                $crate::meta::ValueMut::Enum(self)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::meta::{FieldKind, KvMap, ObjectRef, WireEnum, WireStruct, WireValue};

    crate::wire_enum! {
        pub enum BlendMode {
            Normal = 0,
            Add = 1,
            Multiply = 2,
        }
    }

    crate::wire_struct! {
        /// Fixture covering every field category.
        pub struct Sample: 0x5A4D_0001 {
            enabled: bool,
            depth: i16,
            id: i32,
            frame: u64,
            opacity: f32,
            name: String,
            blend: BlendMode,
            tags: Vec<String>,
            attributes: KvMap<String, i32>,
            parent: ObjectRef,
            optional note: String,
        }
    }

    #[test]
    fn test_struct_descriptor_field_table() {
        let descriptor = Sample::descriptor();
        assert_eq!(descriptor.class_id, 0x5A4D_0001);
        assert_eq!(descriptor.name, "Sample");

        let kinds: Vec<FieldKind> = descriptor.fields.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FieldKind::Bool,
                FieldKind::Short,
                FieldKind::Int,
                FieldKind::ULong,
                FieldKind::Float,
                FieldKind::String,
                FieldKind::Enum,
                FieldKind::List,
                FieldKind::Map,
                FieldKind::ObjectPointer,
                FieldKind::String,
            ]
        );
        assert!(!descriptor.fields[0].optional);
        assert!(descriptor.fields[10].optional);
        assert_eq!(descriptor.field("opacity").map(|f| f.kind), Some(FieldKind::Float));
        assert!(descriptor.field("missing").is_none());
    }

    #[test]
    fn test_field_accessor_reads_and_writes() {
        let mut sample = Sample::default();
        let descriptor = Sample::descriptor();
        let field = descriptor.field("id").expect("id field");

        match (field.access)(sample.as_any_mut()) {
            crate::meta::ValueMut::Int(slot) => *slot = 42,
            other => panic!("unexpected slot {other:?}"),
        }
        assert_eq!(sample.id, 42);
    }

    #[test]
    fn test_allocate_produces_default_instance() {
        let instance = (Sample::descriptor().allocate)();
        let concrete = instance.as_any().downcast_ref::<Sample>().expect("Sample");
        assert_eq!(*concrete, Sample::default());
    }

    #[test]
    fn test_enum_name_value_mapping() {
        let mut mode = BlendMode::default();
        assert_eq!(mode, BlendMode::Normal);
        assert_eq!(mode.value(), 0);
        assert_eq!(mode.name(), "Normal");

        assert!(mode.set_value(2));
        assert_eq!(mode, BlendMode::Multiply);
        assert!(mode.set_by_name("Add"));
        assert_eq!(mode, BlendMode::Add);

        assert!(!mode.set_value(99));
        assert!(!mode.set_by_name("Screen"));
        assert_eq!(mode, BlendMode::Add);
    }

    #[test]
    fn test_enum_descriptor_lookup() {
        let descriptor = BlendMode::descriptor();
        assert_eq!(descriptor.name, "BlendMode");
        assert_eq!(descriptor.value_of("Multiply"), Some(2));
        assert_eq!(descriptor.name_of(1), Some("Add"));
        assert_eq!(descriptor.value_of("Screen"), None);
    }

    #[test]
    fn test_dyn_equality_and_clone() {
        let mut a = Sample::default();
        a.name = "quad".to_string();
        let boxed = a.clone_boxed();
        assert!(a.eq_dyn(boxed.as_ref()));

        let b = Sample::default();
        assert!(!b.eq_dyn(boxed.as_ref()));
    }
}
