//! Generic `Array of T` encoding shared by structure members and `Variant`
//! array bodies (§4.2): an `Int32` length, `-1` for null, followed by that
//! many encoded elements.

use std::io::{Read, Write};

use crate::core::{BinaryDecodable, BinaryEncodable, CodecError, Context};

/// Number of bytes the length prefix for an array or string occupies.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Encode `Option<Vec<T>>` as OPC UA's `Array of T`: `None` and `Some(vec![])`
/// are distinct on the wire (length `-1` vs length `0`), matching the
/// distinction the built-in decoder preserves for `Variant` arrays.
pub fn encode_array<T: BinaryEncodable, S: Write + ?Sized>(
    items: &Option<Vec<T>>,
    stream: &mut S,
    ctx: &Context<'_>,
) -> Result<(), CodecError> {
    match items {
        None => (-1i32).encode(stream, ctx),
        Some(items) => {
            let len = i32::try_from(items.len()).map_err(|_| CodecError::InvalidLength(items.len() as i64))?;
            len.encode(stream, ctx)?;
            for item in items {
                item.encode(stream, ctx)?;
            }
            Ok(())
        }
    }
}

/// Byte length of `encode_array`'s output without writing anything.
pub fn array_byte_len<T: BinaryEncodable>(items: &Option<Vec<T>>, ctx: &Context<'_>) -> usize {
    LENGTH_PREFIX_SIZE
        + items
            .as_ref()
            .map(|items| items.iter().map(|item| item.byte_len(ctx)).sum())
            .unwrap_or(0)
}

/// Decode OPC UA's `Array of T`, enforcing `ctx.limits.max_array_length`.
pub fn decode_array<T: BinaryDecodable, S: Read + ?Sized>(
    stream: &mut S,
    ctx: &Context<'_>,
) -> Result<Option<Vec<T>>, CodecError> {
    let len = i32::decode(stream, ctx)?;
    if len < 0 {
        return Ok(None);
    }
    let len = len as u32;
    if len > ctx.limits.max_array_length {
        return Err(CodecError::InvalidLength(len as i64));
    }
    let mut items = Vec::with_capacity(len.min(4096) as usize);
    for _ in 0..len {
        items.push(T::decode(stream, ctx)?);
    }
    Ok(Some(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context<'static> {
        Context::opaque()
    }

    #[test]
    fn null_array_round_trips_as_negative_one() {
        let ctx = ctx();
        let none: Option<Vec<u32>> = None;
        let bytes = {
            let mut buf = Vec::new();
            encode_array(&none, &mut buf, &ctx).unwrap();
            buf
        };
        assert_eq!(bytes, (-1i32).to_le_bytes());
        let mut cursor = std::io::Cursor::new(bytes.as_slice());
        let decoded: Option<Vec<u32>> = decode_array(&mut cursor, &ctx).unwrap();
        assert_eq!(decoded, None);
    }

    #[test]
    fn empty_array_is_distinct_from_null() {
        let ctx = ctx();
        let empty: Option<Vec<u32>> = Some(vec![]);
        let mut buf = Vec::new();
        encode_array(&empty, &mut buf, &ctx).unwrap();
        assert_eq!(buf, 0i32.to_le_bytes());
    }

    #[test]
    fn array_rejects_excessive_length() {
        let mut ctx = ctx();
        ctx.limits.max_array_length = 2;
        let mut buf = Vec::new();
        10i32.encode(&mut buf, &ctx).unwrap();
        let mut cursor = std::io::Cursor::new(buf.as_slice());
        let result: Result<Option<Vec<u32>>, _> = decode_array(&mut cursor, &ctx);
        assert!(matches!(result, Err(CodecError::InvalidLength(10))));
    }
}
