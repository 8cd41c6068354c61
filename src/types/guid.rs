//! `Guid` (§2): the .NET-style mixed-endian 16-byte layout — `Data1` (UInt32
//! LE), `Data2`/`Data3` (UInt16 LE), `Data4` (8 raw bytes).

use std::io::{Read, Write};

use crate::core::{BinaryDecodable, BinaryEncodable, CodecError, Context};

/// A 128-bit globally unique identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid {
    data1: u32,
    data2: u16,
    data3: u16,
    data4: [u8; 8],
}

impl Guid {
    /// Build a `Guid` from its four components.
    pub fn from_parts(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Parse the canonical `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` text form
    /// used by the XML codec and the NodeId `g=` grammar (§8).
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        let hex: String = text.chars().filter(|c| *c != '-').collect();
        if hex.len() != 32 {
            return Err(CodecError::Malformed(format!("invalid guid text: {text}")));
        }
        let byte = |i: usize| -> Result<u8, CodecError> {
            u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| CodecError::Malformed(format!("invalid guid text: {text}")))
        };
        let data1 = u32::from_be_bytes([byte(0)?, byte(1)?, byte(2)?, byte(3)?]);
        let data2 = u16::from_be_bytes([byte(4)?, byte(5)?]);
        let data3 = u16::from_be_bytes([byte(6)?, byte(7)?]);
        let mut data4 = [0u8; 8];
        for (i, slot) in data4.iter_mut().enumerate() {
            *slot = byte(8 + i)?;
        }
        Ok(Self {
            data1,
            data2,
            data3,
            data4,
        })
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7],
        )
    }
}

impl BinaryEncodable for Guid {
    fn byte_len(&self, _ctx: &Context<'_>) -> usize {
        16
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> Result<(), CodecError> {
        self.data1.encode(stream, ctx)?;
        self.data2.encode(stream, ctx)?;
        self.data3.encode(stream, ctx)?;
        stream
            .write_all(&self.data4)
            .map_err(|_| CodecError::BufferTooSmall { needed: 8, available: 0 })
    }
}

impl BinaryDecodable for Guid {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> Result<Self, CodecError> {
        let data1 = u32::decode(stream, ctx)?;
        let data2 = u16::decode(stream, ctx)?;
        let data3 = u16::decode(stream, ctx)?;
        let mut data4 = [0u8; 8];
        stream
            .read_exact(&mut data4)
            .map_err(|_| CodecError::BufferTooSmall { needed: 8, available: 0 })?;
        Ok(Self {
            data1,
            data2,
            data3,
            data4,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_text() {
        let guid = Guid::from_parts(0x72962B91, 0xFA75, 0x4AE6, [0x8D, 0x28, 0xB4, 0x04, 0xDC, 0x7D, 0xAF, 0x63]);
        let text = guid.to_string();
        assert_eq!(text, "72962B91-FA75-4AE6-8D28-B404DC7DAF63");
        assert_eq!(Guid::parse(&text).unwrap(), guid);
    }

    #[test]
    fn round_trips_through_binary() {
        let ctx = Context::opaque();
        let guid = Guid::from_parts(1, 2, 3, [4, 5, 6, 7, 8, 9, 10, 11]);
        let bytes = guid.to_bytes(&ctx).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(Guid::from_bytes(&bytes, &ctx).unwrap(), guid);
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(Guid::parse("not-a-guid").is_err());
    }
}
