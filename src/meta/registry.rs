//! Type registry - explicit, session-scoped metadata lookup.
//!
//! The registry is constructed at session startup, populated with the
//! descriptors of every message type the session may receive, and passed by
//! reference to the codecs and the request manager. There is no global
//! singleton.

use std::collections::HashMap;

use crate::meta::TypeDescriptor;

/// Lookup table from class id / type name to [`TypeDescriptor`].
#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_id: HashMap<u64, &'static TypeDescriptor>,
    by_name: HashMap<&'static str, &'static TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor.
    ///
    /// # Panics
    ///
    /// Panics if another descriptor is already registered under the same
    /// class id or name; colliding identifiers are a programmer error caught
    /// at session startup.
    pub fn register(&mut self, descriptor: &'static TypeDescriptor) -> &mut Self {
        let prev = self.by_id.insert(descriptor.class_id, descriptor);
        assert!(
            prev.is_none(),
            "duplicate class id {:#x} for {}",
            descriptor.class_id,
            descriptor.name
        );
        let prev = self.by_name.insert(descriptor.name, descriptor);
        assert!(prev.is_none(), "duplicate type name {}", descriptor.name);
        self
    }

    /// Resolve a descriptor by its stable class identifier.
    pub fn resolve_by_class_id(&self, class_id: u64) -> Option<&'static TypeDescriptor> {
        self.by_id.get(&class_id).copied()
    }

    /// Resolve a descriptor by its display name.
    pub fn resolve_by_name(&self, name: &str) -> Option<&'static TypeDescriptor> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
