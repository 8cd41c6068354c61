//! `NodeId` and `ExpandedNodeId` (§2, §4.1): a namespace index plus one of
//! four identifier kinds, encoded with a 1-byte discriminant selecting the
//! most compact representation that fits.

use std::io::{Read, Write};

use crate::core::{BinaryDecodable, BinaryEncodable, CodecError, Context};

use super::guid::Guid;
use super::string::{ByteString, UaString};

const ENCODING_TWO_BYTE: u8 = 0x00;
const ENCODING_FOUR_BYTE: u8 = 0x01;
const ENCODING_NUMERIC: u8 = 0x02;
const ENCODING_STRING: u8 = 0x03;
const ENCODING_GUID: u8 = 0x04;
const ENCODING_BYTE_STRING: u8 = 0x05;

/// Flag bit (on the `ExpandedNodeId` encoding byte) marking a following
/// `namespaceUri` field in place of the plain namespace index.
pub const NAMESPACE_URI_FLAG: u8 = 0x80;
/// Flag bit marking a following `serverIndex` field.
pub const SERVER_INDEX_FLAG: u8 = 0x40;

/// The identifier held by a `NodeId`, before namespace/server qualification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// A numeric identifier (the common case for OPC UA's own address space).
    Numeric(u32),
    /// A string identifier.
    String(UaString),
    /// A `Guid` identifier.
    Guid(Guid),
    /// An opaque byte string identifier.
    ByteString(ByteString),
}

/// A node identifier: a namespace index plus an identifier of one of four
/// kinds (Part 6 §5.2.2.9).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId {
    /// Index into the server's namespace array.
    pub namespace_index: u16,
    /// The identifier itself.
    pub identifier: Identifier,
}

impl Default for NodeId {
    fn default() -> Self {
        NodeId::numeric(0, 0)
    }
}

impl NodeId {
    /// Build a numeric `NodeId`.
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        NodeId {
            namespace_index,
            identifier: Identifier::Numeric(value),
        }
    }

    /// Build a string `NodeId`.
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        NodeId {
            namespace_index,
            identifier: Identifier::String(UaString::from(value.into())),
        }
    }

    /// Build a `Guid` `NodeId`.
    pub fn guid(namespace_index: u16, value: Guid) -> Self {
        NodeId {
            namespace_index,
            identifier: Identifier::Guid(value),
        }
    }

    /// Build a byte-string `NodeId`.
    pub fn byte_string(namespace_index: u16, value: Vec<u8>) -> Self {
        NodeId {
            namespace_index,
            identifier: Identifier::ByteString(ByteString::from(value)),
        }
    }

    /// The null NodeId: `ns=0;i=0`.
    pub fn null() -> Self {
        Self::default()
    }

    /// True for the null NodeId.
    pub fn is_null(&self) -> bool {
        matches!(
            (&self.identifier, self.namespace_index),
            (Identifier::Numeric(0), 0)
        )
    }

    fn compact_encoding(&self) -> u8 {
        match &self.identifier {
            Identifier::Numeric(v) if self.namespace_index == 0 && *v <= u8::MAX as u32 => {
                ENCODING_TWO_BYTE
            }
            Identifier::Numeric(v) if self.namespace_index <= u8::MAX as u16 && *v <= u16::MAX as u32 => {
                ENCODING_FOUR_BYTE
            }
            Identifier::Numeric(_) => ENCODING_NUMERIC,
            Identifier::String(_) => ENCODING_STRING,
            Identifier::Guid(_) => ENCODING_GUID,
            Identifier::ByteString(_) => ENCODING_BYTE_STRING,
        }
    }

    fn encode_body<S: Write + ?Sized>(&self, encoding: u8, stream: &mut S, ctx: &Context<'_>) -> Result<(), CodecError> {
        match encoding {
            ENCODING_TWO_BYTE => {
                let Identifier::Numeric(v) = &self.identifier else { unreachable!() };
                (*v as u8).encode(stream, ctx)
            }
            ENCODING_FOUR_BYTE => {
                let Identifier::Numeric(v) = &self.identifier else { unreachable!() };
                (self.namespace_index as u8).encode(stream, ctx)?;
                (*v as u16).encode(stream, ctx)
            }
            ENCODING_NUMERIC => {
                let Identifier::Numeric(v) = &self.identifier else { unreachable!() };
                self.namespace_index.encode(stream, ctx)?;
                v.encode(stream, ctx)
            }
            ENCODING_STRING => {
                self.namespace_index.encode(stream, ctx)?;
                let Identifier::String(s) = &self.identifier else { unreachable!() };
                s.encode(stream, ctx)
            }
            ENCODING_GUID => {
                self.namespace_index.encode(stream, ctx)?;
                let Identifier::Guid(g) = &self.identifier else { unreachable!() };
                g.encode(stream, ctx)
            }
            ENCODING_BYTE_STRING => {
                self.namespace_index.encode(stream, ctx)?;
                let Identifier::ByteString(b) = &self.identifier else { unreachable!() };
                b.encode(stream, ctx)
            }
            other => Err(CodecError::Malformed(format!("unknown NodeId encoding byte {other:#x}"))),
        }
    }

    fn body_byte_len(&self, encoding: u8, ctx: &Context<'_>) -> usize {
        match encoding {
            ENCODING_TWO_BYTE => 1,
            ENCODING_FOUR_BYTE => 3,
            ENCODING_NUMERIC => 6,
            ENCODING_STRING => {
                let Identifier::String(s) = &self.identifier else { unreachable!() };
                2 + s.byte_len(ctx)
            }
            ENCODING_GUID => 2 + 16,
            ENCODING_BYTE_STRING => {
                let Identifier::ByteString(b) = &self.identifier else { unreachable!() };
                2 + b.byte_len(ctx)
            }
            _ => 0,
        }
    }

    fn decode_body<S: Read + ?Sized>(
        encoding: u8,
        stream: &mut S,
        ctx: &Context<'_>,
    ) -> Result<(u16, Identifier), CodecError> {
        match encoding {
            ENCODING_TWO_BYTE => {
                let v = u8::decode(stream, ctx)?;
                Ok((0, Identifier::Numeric(v as u32)))
            }
            ENCODING_FOUR_BYTE => {
                let ns = u8::decode(stream, ctx)?;
                let v = u16::decode(stream, ctx)?;
                Ok((ns as u16, Identifier::Numeric(v as u32)))
            }
            ENCODING_NUMERIC => {
                let ns = u16::decode(stream, ctx)?;
                let v = u32::decode(stream, ctx)?;
                Ok((ns, Identifier::Numeric(v)))
            }
            ENCODING_STRING => {
                let ns = u16::decode(stream, ctx)?;
                let s = UaString::decode(stream, ctx)?;
                Ok((ns, Identifier::String(s)))
            }
            ENCODING_GUID => {
                let ns = u16::decode(stream, ctx)?;
                let g = Guid::decode(stream, ctx)?;
                Ok((ns, Identifier::Guid(g)))
            }
            ENCODING_BYTE_STRING => {
                let ns = u16::decode(stream, ctx)?;
                let b = ByteString::decode(stream, ctx)?;
                Ok((ns, Identifier::ByteString(b)))
            }
            other => Err(CodecError::Malformed(format!("unknown NodeId encoding byte {other:#x}"))),
        }
    }

    /// Render the textual NodeId grammar body (without the `ns=N;` prefix
    /// logic or the enclosing `<NodeId>` element — shared by `Display` and
    /// the XML codec, §8).
    pub fn identifier_text(&self) -> String {
        match &self.identifier {
            Identifier::Numeric(v) => format!("i={v}"),
            Identifier::String(s) => format!("s={}", s.as_str()),
            Identifier::Guid(g) => format!("g={g}"),
            Identifier::ByteString(b) => {
                use base64::Engine;
                format!("b={}", base64::engine::general_purpose::STANDARD.encode(b.as_bytes()))
            }
        }
    }

    /// Parse the textual NodeId grammar: `[ns=N;](i=V|s=S|g=G|b=base64)`.
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        let mut namespace_index = 0u16;
        let mut rest = text;
        if let Some(semi) = text.find(';') {
            let prefix = &text[..semi];
            if let Some(n) = prefix.strip_prefix("ns=") {
                namespace_index = n
                    .parse()
                    .map_err(|_| CodecError::Malformed(format!("invalid ns in NodeId text: {text}")))?;
                rest = &text[semi + 1..];
            }
        }
        let identifier = if let Some(v) = rest.strip_prefix("i=") {
            Identifier::Numeric(
                v.parse()
                    .map_err(|_| CodecError::Malformed(format!("invalid numeric NodeId: {text}")))?,
            )
        } else if let Some(v) = rest.strip_prefix("s=") {
            Identifier::String(UaString::from(v))
        } else if let Some(v) = rest.strip_prefix("g=") {
            Identifier::Guid(Guid::parse(v)?)
        } else if let Some(v) = rest.strip_prefix("b=") {
            use base64::Engine;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(v)
                .map_err(|e| CodecError::Malformed(e.to_string()))?;
            Identifier::ByteString(ByteString::from(bytes))
        } else {
            return Err(CodecError::Malformed(format!("unrecognized NodeId text: {text}")));
        };
        Ok(NodeId {
            namespace_index,
            identifier,
        })
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace_index != 0 {
            write!(f, "ns={};", self.namespace_index)?;
        }
        write!(f, "{}", self.identifier_text())
    }
}

impl BinaryEncodable for NodeId {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        1 + self.body_byte_len(self.compact_encoding(), ctx)
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> Result<(), CodecError> {
        let encoding = self.compact_encoding();
        encoding.encode(stream, ctx)?;
        self.encode_body(encoding, stream, ctx)
    }
}

impl BinaryDecodable for NodeId {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> Result<Self, CodecError> {
        let encoding = u8::decode(stream, ctx)?;
        let (namespace_index, identifier) = NodeId::decode_body(encoding, stream, ctx)?;
        Ok(NodeId {
            namespace_index,
            identifier,
        })
    }
}

/// A `NodeId` optionally qualified by a namespace URI and/or an originating
/// server index (Part 6 §5.2.2.10) — used when a reference crosses a
/// namespace or a server boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ExpandedNodeId {
    /// The local node id (namespace index meaningful only if `namespace_uri` is `None`).
    pub node_id: NodeId,
    /// Namespace URI, when the index alone can't be resolved by the reader.
    pub namespace_uri: Option<String>,
    /// Index of the server that originated this id, 0 for the local server.
    pub server_index: u32,
}

impl BinaryEncodable for ExpandedNodeId {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        let mut len = 1 + self.node_id.body_byte_len(self.node_id.compact_encoding(), ctx);
        if let Some(uri) = &self.namespace_uri {
            len += UaString::from(uri.as_str()).byte_len(ctx);
        }
        if self.server_index != 0 {
            len += 4;
        }
        len
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> Result<(), CodecError> {
        let mut encoding = self.node_id.compact_encoding();
        if self.namespace_uri.is_some() {
            encoding |= NAMESPACE_URI_FLAG;
        }
        if self.server_index != 0 {
            encoding |= SERVER_INDEX_FLAG;
        }
        encoding.encode(stream, ctx)?;
        self.node_id.encode_body(encoding & 0x3F, stream, ctx)?;
        if let Some(uri) = &self.namespace_uri {
            UaString::from(uri.as_str()).encode(stream, ctx)?;
        }
        if self.server_index != 0 {
            self.server_index.encode(stream, ctx)?;
        }
        Ok(())
    }
}

impl BinaryDecodable for ExpandedNodeId {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> Result<Self, CodecError> {
        let encoding = u8::decode(stream, ctx)?;
        let has_uri = encoding & NAMESPACE_URI_FLAG != 0;
        let has_server_index = encoding & SERVER_INDEX_FLAG != 0;
        let (namespace_index, identifier) = NodeId::decode_body(encoding & 0x3F, stream, ctx)?;
        let namespace_uri = if has_uri {
            UaString::decode(stream, ctx)?.0
        } else {
            None
        };
        let server_index = if has_server_index {
            u32::decode(stream, ctx)?
        } else {
            0
        };
        Ok(ExpandedNodeId {
            node_id: NodeId {
                namespace_index,
                identifier,
            },
            namespace_uri,
            server_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context<'static> {
        Context::opaque()
    }

    #[test]
    fn two_byte_form_for_small_ns0_numeric() {
        let ctx = ctx();
        let id = NodeId::numeric(0, 42);
        let bytes = id.to_bytes(&ctx).unwrap();
        assert_eq!(bytes, vec![ENCODING_TWO_BYTE, 42]);
        assert_eq!(NodeId::from_bytes(&bytes, &ctx).unwrap(), id);
    }

    #[test]
    fn four_byte_form_for_small_ns_and_value() {
        let ctx = ctx();
        let id = NodeId::numeric(5, 300);
        let bytes = id.to_bytes(&ctx).unwrap();
        assert_eq!(bytes[0], ENCODING_FOUR_BYTE);
        assert_eq!(NodeId::from_bytes(&bytes, &ctx).unwrap(), id);
    }

    #[test]
    fn full_numeric_form_for_large_values() {
        let ctx = ctx();
        let id = NodeId::numeric(1000, 100_000);
        let bytes = id.to_bytes(&ctx).unwrap();
        assert_eq!(bytes[0], ENCODING_NUMERIC);
        assert_eq!(NodeId::from_bytes(&bytes, &ctx).unwrap(), id);
    }

    #[test]
    fn string_node_id_round_trips_binary_and_text() {
        let ctx = ctx();
        let id = NodeId::string(2, "Temperature");
        let bytes = id.to_bytes(&ctx).unwrap();
        assert_eq!(NodeId::from_bytes(&bytes, &ctx).unwrap(), id);
        let text = id.to_string();
        assert_eq!(text, "ns=2;s=Temperature");
        assert_eq!(NodeId::parse(&text).unwrap(), id);
    }

    #[test]
    fn ns0_omitted_from_text() {
        let id = NodeId::numeric(0, 2258);
        assert_eq!(id.to_string(), "i=2258");
        assert_eq!(NodeId::parse("i=2258").unwrap(), id);
    }

    #[test]
    fn expanded_node_id_round_trips_with_uri_and_server_index() {
        let ctx = ctx();
        let eni = ExpandedNodeId {
            node_id: NodeId::numeric(0, 7),
            namespace_uri: Some("urn:example:ns".into()),
            server_index: 3,
        };
        let bytes = eni.to_bytes(&ctx).unwrap();
        assert_eq!(ExpandedNodeId::from_bytes(&bytes, &ctx).unwrap(), eni);
    }

    #[test]
    fn null_node_id_is_ns0_i0() {
        assert!(NodeId::null().is_null());
        assert_eq!(NodeId::null().to_string(), "i=0");
    }
}
