//! The type table (C2): a process-wide registry mapping a structured type's
//! `ExtensionObject` encoding id to its Rust type name and back.
//!
//! The original reflects over per-member descriptors (name, byte offset,
//! type pointer, array/optional flags) to drive one generic encode/decode
//! walker for every registered struct. Rust's static type system makes that
//! indirection both unsafe and unnecessary: every structured type here
//! implements `BinaryEncodable`/`BinaryDecodable` directly (the struct
//! literally *is* its own descriptor), the same way `async-opcua` generates
//! one impl per message type instead of reflecting over one. What the type
//! table still has to provide at runtime is exactly what `ExtensionObject`
//! needs and can't get from the type system alone: resolving a numeric
//! encoding id carried on the wire to the name of the Rust type a caller
//! should decode it as.
//!
//! `Struct`/`OptStruct` presence-bitmask encoding and `Union` switch-index
//! encoding are expressed directly on each type (see `LocalizedText`,
//! `DiagnosticInfo`, `DataValue` for the `OptStruct` pattern already used
//! by built-in types); this table only indexes structured types by id.

use std::collections::HashMap;

use crate::core::TypeLookup;

/// What kind of structured type a table entry describes, mirroring the
/// byte-codec's notion of which presence/selector convention its wire
/// encoding follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Every member is always present, encoded in declaration order.
    Structure,
    /// A `UInt32` presence bitmask precedes the present members.
    OptStruct,
    /// A 1-based `UInt32` switch index precedes the chosen member.
    Union,
    /// A named `Int32` discriminant with no payload beyond its value.
    Enum,
}

/// One registered structured type: its name, its `ExtensionObject` encoding
/// id, and which wire convention it follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// The Rust type name, e.g. `"ReadRequest"`.
    pub name: String,
    /// The numeric identifier carried as an `ExtensionObject` `NodeId` (in
    /// namespace 0, i.e. the standard OPC UA namespace).
    pub encoding_id: u32,
    /// The wire convention this type follows.
    pub kind: TypeKind,
}

/// A process-wide registry of structured types, indexed both by name and by
/// binary encoding id.
#[derive(Debug, Default)]
pub struct TypeTable {
    by_name: HashMap<String, TypeDescriptor>,
    by_encoding_id: HashMap<u32, String>,
}

impl TypeTable {
    /// An empty type table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a structured type. Re-registering the same name replaces
    /// the previous descriptor and updates the encoding-id index.
    pub fn register(&mut self, descriptor: TypeDescriptor) {
        self.by_encoding_id
            .insert(descriptor.encoding_id, descriptor.name.clone());
        self.by_name.insert(descriptor.name.clone(), descriptor);
    }

    /// Look up a type's full descriptor by name.
    pub fn descriptor(&self, name: &str) -> Option<&TypeDescriptor> {
        self.by_name.get(name)
    }

    /// Look up a type's full descriptor by its binary encoding id.
    pub fn descriptor_for_encoding_id(&self, encoding_id: u32) -> Option<&TypeDescriptor> {
        self.by_encoding_id
            .get(&encoding_id)
            .and_then(|name| self.by_name.get(name))
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// True if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl TypeLookup for TypeTable {
    fn name_for(&self, encoding_id: u32) -> Option<&str> {
        self.by_encoding_id.get(&encoding_id).map(String::as_str)
    }

    fn encoding_id_for(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).map(|d| d.encoding_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TypeDescriptor {
        TypeDescriptor {
            name: "ReadRequest".into(),
            encoding_id: 631,
            kind: TypeKind::Structure,
        }
    }

    #[test]
    fn registers_and_resolves_both_directions() {
        let mut table = TypeTable::new();
        table.register(sample());
        assert_eq!(table.name_for(631), Some("ReadRequest"));
        assert_eq!(table.encoding_id_for("ReadRequest"), Some(631));
        assert_eq!(table.descriptor("ReadRequest").unwrap().kind, TypeKind::Structure);
    }

    #[test]
    fn unknown_id_resolves_to_none() {
        let table = TypeTable::new();
        assert_eq!(table.name_for(1), None);
        assert!(table.is_empty());
    }

    #[test]
    fn re_registering_replaces_descriptor() {
        let mut table = TypeTable::new();
        table.register(sample());
        table.register(TypeDescriptor {
            kind: TypeKind::OptStruct,
            ..sample()
        });
        assert_eq!(table.descriptor("ReadRequest").unwrap().kind, TypeKind::OptStruct);
        assert_eq!(table.len(), 1);
    }
}
