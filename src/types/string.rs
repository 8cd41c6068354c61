//! `UaString` and `ByteString` (§2): an `Int32` length prefix, `-1` for null.

use std::io::{Read, Write};

use crate::core::{BinaryDecodable, BinaryEncodable, CodecError, Context};

/// An OPC UA `String`: `None` is the distinguished null string, distinct
/// from `Some(String::new())` (the empty string), per Part 6 §5.2.2.4.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct UaString(pub Option<String>);

impl UaString {
    /// The null string.
    pub const fn null() -> Self {
        UaString(None)
    }

    /// Borrow the contained text, or `""` for the null string.
    pub fn as_str(&self) -> &str {
        self.0.as_deref().unwrap_or("")
    }

    /// True for the null string (not the same as an empty non-null string).
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }
}

impl From<&str> for UaString {
    fn from(value: &str) -> Self {
        UaString(Some(value.to_owned()))
    }
}

impl From<String> for UaString {
    fn from(value: String) -> Self {
        UaString(Some(value))
    }
}

impl BinaryEncodable for UaString {
    fn byte_len(&self, _ctx: &Context<'_>) -> usize {
        4 + self.0.as_ref().map(|s| s.len()).unwrap_or(0)
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> Result<(), CodecError> {
        match &self.0 {
            None => (-1i32).encode(stream, ctx),
            Some(text) => {
                let len = i32::try_from(text.len())
                    .map_err(|_| CodecError::InvalidLength(text.len() as i64))?;
                len.encode(stream, ctx)?;
                stream
                    .write_all(text.as_bytes())
                    .map_err(|_| CodecError::BufferTooSmall {
                        needed: text.len(),
                        available: 0,
                    })
            }
        }
    }
}

impl BinaryDecodable for UaString {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> Result<Self, CodecError> {
        let len = i32::decode(stream, ctx)?;
        if len < 0 {
            return Ok(UaString(None));
        }
        let len = len as u32;
        if len > ctx.limits.max_string_length {
            return Err(CodecError::InvalidLength(len as i64));
        }
        let mut buf = vec![0u8; len as usize];
        stream
            .read_exact(&mut buf)
            .map_err(|_| CodecError::BufferTooSmall {
                needed: len as usize,
                available: 0,
            })?;
        let text = String::from_utf8(buf).map_err(|e| CodecError::Malformed(e.to_string()))?;
        Ok(UaString(Some(text)))
    }
}

/// An OPC UA `ByteString`: `None` is the distinguished null value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct ByteString(pub Option<Vec<u8>>);

impl ByteString {
    /// The null byte string.
    pub const fn null() -> Self {
        ByteString(None)
    }

    /// Borrow the contained bytes, or `&[]` for the null value.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_deref().unwrap_or(&[])
    }

    /// True for the null byte string.
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(value: Vec<u8>) -> Self {
        ByteString(Some(value))
    }
}

impl BinaryEncodable for ByteString {
    fn byte_len(&self, _ctx: &Context<'_>) -> usize {
        4 + self.0.as_ref().map(|b| b.len()).unwrap_or(0)
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> Result<(), CodecError> {
        match &self.0 {
            None => (-1i32).encode(stream, ctx),
            Some(bytes) => {
                let len = i32::try_from(bytes.len())
                    .map_err(|_| CodecError::InvalidLength(bytes.len() as i64))?;
                len.encode(stream, ctx)?;
                stream
                    .write_all(bytes)
                    .map_err(|_| CodecError::BufferTooSmall {
                        needed: bytes.len(),
                        available: 0,
                    })
            }
        }
    }
}

impl BinaryDecodable for ByteString {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> Result<Self, CodecError> {
        let len = i32::decode(stream, ctx)?;
        if len < 0 {
            return Ok(ByteString(None));
        }
        let len = len as u32;
        if len > ctx.limits.max_string_length {
            return Err(CodecError::InvalidLength(len as i64));
        }
        let mut buf = vec![0u8; len as usize];
        stream
            .read_exact(&mut buf)
            .map_err(|_| CodecError::BufferTooSmall {
                needed: len as usize,
                available: 0,
            })?;
        Ok(ByteString(Some(buf)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context<'static> {
        Context::opaque()
    }

    #[test]
    fn null_string_is_distinct_from_empty() {
        let ctx = ctx();
        let null = UaString::null();
        let empty = UaString::from("");
        assert_ne!(null.to_bytes(&ctx).unwrap(), empty.to_bytes(&ctx).unwrap());
        assert!(null.is_null());
        assert!(!empty.is_null());
    }

    #[test]
    fn string_round_trips() {
        let ctx = ctx();
        let s = UaString::from("hello OPC UA");
        let bytes = s.to_bytes(&ctx).unwrap();
        assert_eq!(UaString::from_bytes(&bytes, &ctx).unwrap(), s);
    }

    #[test]
    fn bytestring_round_trips() {
        let ctx = ctx();
        let bs = ByteString::from(vec![1, 2, 3, 4]);
        let bytes = bs.to_bytes(&ctx).unwrap();
        assert_eq!(ByteString::from_bytes(&bytes, &ctx).unwrap(), bs);
    }

    #[test]
    fn string_rejects_excessive_length() {
        let mut ctx = ctx();
        ctx.limits.max_string_length = 4;
        let mut buf = Vec::new();
        100i32.encode(&mut buf, &ctx).unwrap();
        let err = UaString::from_bytes(&buf, &ctx).unwrap_err();
        assert!(matches!(err, CodecError::InvalidLength(100)));
    }
}
