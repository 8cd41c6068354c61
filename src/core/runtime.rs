//! The `Context` threaded through every encode/decode call.
//!
//! The teacher's sync engine carried no equivalent — NOMAD diffs were decoded
//! against a single fixed wire format. OPC UA's `Variant`/`ExtensionObject`
//! encodings are self-describing against a process-wide type table (C2), and
//! decoding must also enforce the negotiated size limits (§2, §7.1). Rather
//! than reach for global/thread-local state, both are bundled into a context
//! object passed by reference to every `encode`/`decode` call, the same way
//! the set of `DecodingLimits` is threaded through `async-opcua`'s codec.

use super::constants::{DEFAULT_MAX_CHUNK_COUNT, DEFAULT_MAX_MESSAGE_SIZE};

/// Resolves an `ExtensionObject`'s encoding id to a decoder and back, without
/// requiring the codec layer to depend on the concrete type-table type.
///
/// The `types` feature's `TypeTable` implements this; `core` only depends on
/// the trait, keeping the crate's dependency graph a DAG (`types` depends on
/// `core`, never the reverse).
pub trait TypeLookup {
    /// Look up the Rust type name registered for a numeric encoding id, if any.
    fn name_for(&self, encoding_id: u32) -> Option<&str>;

    /// Look up the numeric encoding id registered for a Rust type name, if any.
    fn encoding_id_for(&self, name: &str) -> Option<u32>;
}

/// A `TypeLookup` that resolves nothing — used where `ExtensionObject` bodies
/// are always read back as opaque bytes (no decoded-object support needed).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTypeLookup;

impl TypeLookup for NoTypeLookup {
    fn name_for(&self, _encoding_id: u32) -> Option<&str> {
        None
    }

    fn encoding_id_for(&self, _name: &str) -> Option<u32> {
        None
    }
}

/// Limits enforced while decoding, independent of any particular message
/// (§2 "Encoding Limits", §7.1 edge cases).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodingLimits {
    /// Maximum total size, in bytes, of a single decoded message.
    pub max_message_size: u32,
    /// Maximum number of chunks a single message may be split across.
    pub max_chunk_count: u32,
    /// Maximum number of elements accepted in any array.
    pub max_array_length: u32,
    /// Maximum number of UTF-8 bytes accepted in any string.
    pub max_string_length: u32,
    /// Maximum nesting depth accepted for recursive types (`Variant` of
    /// `Variant`, nested `ExtensionObject`, structures-in-structures).
    pub max_nesting_depth: u16,
}

impl Default for DecodingLimits {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_chunk_count: DEFAULT_MAX_CHUNK_COUNT,
            max_array_length: 0x0010_0000,
            max_string_length: 0x0010_0000,
            max_nesting_depth: 100,
        }
    }
}

/// Context threaded through every `encode`/`decode` call in this crate.
///
/// Borrowed for the duration of a single encode/decode operation; cheap to
/// construct since it holds only a limits value and a trait object reference.
pub struct Context<'a> {
    /// Decoding limits in effect for this operation.
    pub limits: DecodingLimits,
    /// Type table used to resolve `ExtensionObject` bodies, if any.
    pub type_lookup: &'a dyn TypeLookup,
}

impl<'a> Context<'a> {
    /// A context with default limits and no type resolution.
    pub fn new(type_lookup: &'a dyn TypeLookup) -> Self {
        Self {
            limits: DecodingLimits::default(),
            type_lookup,
        }
    }

    /// A context with default limits and no type resolution (`ExtensionObject`
    /// bodies decode as opaque bytes).
    pub fn opaque() -> Context<'static> {
        Context {
            limits: DecodingLimits::default(),
            type_lookup: &NoTypeLookup,
        }
    }

    /// The same context with different decoding limits.
    pub fn with_limits(mut self, limits: DecodingLimits) -> Self {
        self.limits = limits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_context_resolves_nothing() {
        let ctx = Context::opaque();
        assert_eq!(ctx.type_lookup.name_for(42), None);
        assert_eq!(ctx.type_lookup.encoding_id_for("Foo"), None);
    }

    #[test]
    fn default_limits_match_constants() {
        let limits = DecodingLimits::default();
        assert_eq!(limits.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
        assert_eq!(limits.max_chunk_count, DEFAULT_MAX_CHUNK_COUNT);
    }
}
