//! Codec traits shared by every wire-representable type (C1, C3).
//!
//! Every built-in and structured type implements `BinaryEncodable` +
//! `BinaryDecodable`; types reachable from `ExtensionObject`/`Variant` bodies
//! additionally implement the XML pair when the `xml` feature is enabled.

use std::io::{Read, Write};

use super::error::CodecError;
use super::runtime::Context;

/// A type that can be written to the OPC UA binary encoding (§2).
pub trait BinaryEncodable {
    /// Exact number of bytes `encode` will write for this value.
    ///
    /// Used to size buffers and to bound `ByteString`/array lengths before
    /// committing to an encode pass.
    fn byte_len(&self, ctx: &Context<'_>) -> usize;

    /// Write this value's binary encoding to `stream`.
    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> Result<(), CodecError>;

    /// Convenience: encode into a freshly allocated, exactly-sized buffer.
    fn to_bytes(&self, ctx: &Context<'_>) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::with_capacity(self.byte_len(ctx));
        self.encode(&mut buf, ctx)?;
        Ok(buf)
    }
}

/// A type that can be read back from the OPC UA binary encoding (§2).
pub trait BinaryDecodable: Sized {
    /// Read one value from `stream`.
    ///
    /// On error, `stream` may be left at an arbitrary position; callers must
    /// not continue reading the same stream after a decode error.
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> Result<Self, CodecError>;

    /// Convenience: decode a single value from an in-memory buffer, requiring
    /// that the whole buffer be consumed.
    fn from_bytes(bytes: &[u8], ctx: &Context<'_>) -> Result<Self, CodecError> {
        let mut cursor = std::io::Cursor::new(bytes);
        let value = Self::decode(&mut cursor, ctx)?;
        if (cursor.position() as usize) != bytes.len() {
            return Err(CodecError::Malformed("trailing bytes after decode".into()));
        }
        Ok(value)
    }
}

/// A type that can be written to the OPC UA XML encoding (§8).
#[cfg(feature = "xml")]
pub trait XmlEncodable {
    /// Write this value as the body of `element_name` into `writer`.
    fn encode_xml<W: Write>(
        &self,
        writer: &mut quick_xml::Writer<W>,
        element_name: &str,
        ctx: &Context<'_>,
    ) -> Result<(), CodecError>;
}

/// A type that can be read back from the OPC UA XML encoding (§8).
#[cfg(feature = "xml")]
pub trait XmlDecodable: Sized {
    /// Read one value from the given start element's children.
    fn decode_xml(
        reader: &mut quick_xml::Reader<&[u8]>,
        start: &quick_xml::events::BytesStart<'_>,
        ctx: &Context<'_>,
    ) -> Result<Self, CodecError>;
}
