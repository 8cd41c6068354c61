//! `ExtensionObject` (Part 6 §5.2.2.15): a type id plus a body carried as
//! opaque bytes, inline XML, or (already decoded) a concrete structure.
//!
//! The byte codec itself only ever needs to move the body's bytes — turning
//! those bytes into a concrete Rust value is the type table's job (C2),
//! invoked lazily by callers that know which concrete type they expect
//! (`ExtensionObject::decode_as`), the same split `async-opcua` draws
//! between `ExtensionObject` and `ObjectId`-keyed decoding.

use std::io::{Read, Write};

use crate::core::{BinaryDecodable, BinaryEncodable, CodecError, Context};

use super::node_id::NodeId;

const BODY_ENCODING_NONE: u8 = 0x00;
const BODY_ENCODING_BYTE_STRING: u8 = 0x01;
const BODY_ENCODING_XML: u8 = 0x02;

/// The body of an `ExtensionObject` before type-table resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExtensionObjectBody {
    /// No body — `typeId` alone conveys meaning (e.g. a null variant type).
    #[default]
    None,
    /// Body carried as an opaque, already-binary-encoded byte string.
    ByteString(Vec<u8>),
    /// Body carried as an inline XML fragment (its raw text, §8).
    Xml(String),
}

/// A structure carried by type id, with its body in one of three wire forms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtensionObject {
    /// The id of the encoded type (typically a `DataTypeId_Encoding_*` node).
    pub type_id: NodeId,
    /// The body.
    pub body: ExtensionObjectBody,
}

impl ExtensionObject {
    /// The null extension object (null type id, no body).
    pub fn null() -> Self {
        Self::default()
    }

    /// Wrap an already-binary-encoded body under the given type id.
    pub fn from_binary(type_id: NodeId, bytes: Vec<u8>) -> Self {
        ExtensionObject {
            type_id,
            body: ExtensionObjectBody::ByteString(bytes),
        }
    }

    /// Encode `value` as this extension object's body under `type_id`.
    pub fn encode_binary<T: BinaryEncodable>(
        type_id: NodeId,
        value: &T,
        ctx: &Context<'_>,
    ) -> Result<Self, CodecError> {
        Ok(ExtensionObject {
            type_id,
            body: ExtensionObjectBody::ByteString(value.to_bytes(ctx)?),
        })
    }

    /// Decode the binary body as `T`, if this object carries one.
    pub fn decode_as<T: BinaryDecodable>(&self, ctx: &Context<'_>) -> Result<Option<T>, CodecError> {
        match &self.body {
            ExtensionObjectBody::None => Ok(None),
            ExtensionObjectBody::ByteString(bytes) => Ok(Some(T::from_bytes(bytes, ctx)?)),
            ExtensionObjectBody::Xml(_) => Err(CodecError::Malformed(
                "cannot binary-decode an XML-bodied ExtensionObject".into(),
            )),
        }
    }
}

impl BinaryEncodable for ExtensionObject {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        self.type_id.byte_len(ctx)
            + 1
            + match &self.body {
                ExtensionObjectBody::None => 0,
                ExtensionObjectBody::ByteString(bytes) => 4 + bytes.len(),
                ExtensionObjectBody::Xml(text) => 4 + text.len(),
            }
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> Result<(), CodecError> {
        self.type_id.encode(stream, ctx)?;
        match &self.body {
            ExtensionObjectBody::None => BODY_ENCODING_NONE.encode(stream, ctx),
            ExtensionObjectBody::ByteString(bytes) => {
                BODY_ENCODING_BYTE_STRING.encode(stream, ctx)?;
                super::string::ByteString::from(bytes.clone()).encode(stream, ctx)
            }
            ExtensionObjectBody::Xml(text) => {
                BODY_ENCODING_XML.encode(stream, ctx)?;
                super::string::UaString::from(text.as_str()).encode(stream, ctx)
            }
        }
    }
}

impl BinaryDecodable for ExtensionObject {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> Result<Self, CodecError> {
        let type_id = NodeId::decode(stream, ctx)?;
        let encoding = u8::decode(stream, ctx)?;
        let body = match encoding {
            BODY_ENCODING_NONE => ExtensionObjectBody::None,
            BODY_ENCODING_BYTE_STRING => {
                let bs = super::string::ByteString::decode(stream, ctx)?;
                ExtensionObjectBody::ByteString(bs.0.unwrap_or_default())
            }
            BODY_ENCODING_XML => {
                let s = super::string::UaString::decode(stream, ctx)?;
                ExtensionObjectBody::Xml(s.0.unwrap_or_default())
            }
            other => return Err(CodecError::Malformed(format!("unknown ExtensionObject body encoding {other:#x}"))),
        };
        Ok(ExtensionObject { type_id, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context<'static> {
        Context::opaque()
    }

    #[test]
    fn null_round_trips() {
        let ctx = ctx();
        let eo = ExtensionObject::null();
        let bytes = eo.to_bytes(&ctx).unwrap();
        assert_eq!(ExtensionObject::from_bytes(&bytes, &ctx).unwrap(), eo);
    }

    #[test]
    fn byte_string_body_round_trips_and_decodes() {
        let ctx = ctx();
        let value: u32 = 0xDEAD_BEEF;
        let eo = ExtensionObject::encode_binary(NodeId::numeric(0, 99), &value, &ctx).unwrap();
        let bytes = eo.to_bytes(&ctx).unwrap();
        let decoded = ExtensionObject::from_bytes(&bytes, &ctx).unwrap();
        assert_eq!(decoded.type_id, NodeId::numeric(0, 99));
        let inner: u32 = decoded.decode_as(&ctx).unwrap().unwrap();
        assert_eq!(inner, value);
    }

    #[test]
    fn xml_body_round_trips() {
        let ctx = ctx();
        let eo = ExtensionObject {
            type_id: NodeId::numeric(0, 5),
            body: ExtensionObjectBody::Xml("<Foo>bar</Foo>".into()),
        };
        let bytes = eo.to_bytes(&ctx).unwrap();
        assert_eq!(ExtensionObject::from_bytes(&bytes, &ctx).unwrap(), eo);
    }
}
