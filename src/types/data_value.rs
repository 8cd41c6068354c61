//! `DataValue` (Part 6 §5.2.2.17): a `Variant` plus status and timestamp
//! metadata, each field individually optional via a presence bitmask.

use std::io::{Read, Write};

use crate::core::{BinaryDecodable, BinaryEncodable, CodecError, Context, StatusCode};

use super::scalar::UtcTime;
use super::variant::Variant;

const HAS_VALUE: u8 = 0x01;
const HAS_STATUS_CODE: u8 = 0x02;
const HAS_SOURCE_TIMESTAMP: u8 = 0x04;
const HAS_SERVER_TIMESTAMP: u8 = 0x08;
const HAS_SOURCE_PICOSECONDS: u8 = 0x10;
const HAS_SERVER_PICOSECONDS: u8 = 0x20;

/// A sampled value together with its quality and timing metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataValue {
    /// The value, if sampling succeeded.
    pub value: Option<Variant>,
    /// Quality of the value.
    pub status: Option<StatusCode>,
    /// When the value was obtained at the source (device/sensor).
    pub source_timestamp: Option<UtcTime>,
    /// Sub-100ns offset from `source_timestamp` (0-9999).
    pub source_picoseconds: Option<u16>,
    /// When the server obtained or last validated the value.
    pub server_timestamp: Option<UtcTime>,
    /// Sub-100ns offset from `server_timestamp` (0-9999).
    pub server_picoseconds: Option<u16>,
}

impl DataValue {
    /// A `DataValue` carrying only a value, with `Good` implied by absence
    /// of an explicit status.
    pub fn new(value: Variant) -> Self {
        DataValue {
            value: Some(value),
            ..Default::default()
        }
    }

    /// The effective status: `Good` when no status field is present.
    pub fn effective_status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::Good)
    }

    fn presence_mask(&self) -> u8 {
        let mut mask = 0;
        if self.value.is_some() {
            mask |= HAS_VALUE;
        }
        if self.status.is_some() {
            mask |= HAS_STATUS_CODE;
        }
        if self.source_timestamp.is_some() {
            mask |= HAS_SOURCE_TIMESTAMP;
        }
        if self.server_timestamp.is_some() {
            mask |= HAS_SERVER_TIMESTAMP;
        }
        if self.source_picoseconds.is_some() {
            mask |= HAS_SOURCE_PICOSECONDS;
        }
        if self.server_picoseconds.is_some() {
            mask |= HAS_SERVER_PICOSECONDS;
        }
        mask
    }
}

impl BinaryEncodable for DataValue {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        let mut len = 1;
        if let Some(v) = &self.value {
            len += v.byte_len(ctx);
        }
        if self.status.is_some() {
            len += 4;
        }
        if self.source_timestamp.is_some() {
            len += 8;
        }
        if self.source_picoseconds.is_some() {
            len += 2;
        }
        if self.server_timestamp.is_some() {
            len += 8;
        }
        if self.server_picoseconds.is_some() {
            len += 2;
        }
        len
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> Result<(), CodecError> {
        self.presence_mask().encode(stream, ctx)?;
        if let Some(v) = &self.value {
            v.encode(stream, ctx)?;
        }
        if let Some(v) = self.status {
            v.as_raw().encode(stream, ctx)?;
        }
        if let Some(v) = self.source_timestamp {
            v.encode(stream, ctx)?;
        }
        if let Some(v) = self.source_picoseconds {
            v.encode(stream, ctx)?;
        }
        if let Some(v) = self.server_timestamp {
            v.encode(stream, ctx)?;
        }
        if let Some(v) = self.server_picoseconds {
            v.encode(stream, ctx)?;
        }
        Ok(())
    }
}

impl BinaryDecodable for DataValue {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> Result<Self, CodecError> {
        let mask = u8::decode(stream, ctx)?;
        let value = (mask & HAS_VALUE != 0).then(|| Variant::decode(stream, ctx)).transpose()?;
        let status = (mask & HAS_STATUS_CODE != 0)
            .then(|| u32::decode(stream, ctx))
            .transpose()?
            .map(StatusCode::from_raw);
        let source_timestamp = (mask & HAS_SOURCE_TIMESTAMP != 0).then(|| UtcTime::decode(stream, ctx)).transpose()?;
        let source_picoseconds = (mask & HAS_SOURCE_PICOSECONDS != 0).then(|| u16::decode(stream, ctx)).transpose()?;
        let server_timestamp = (mask & HAS_SERVER_TIMESTAMP != 0).then(|| UtcTime::decode(stream, ctx)).transpose()?;
        let server_picoseconds = (mask & HAS_SERVER_PICOSECONDS != 0).then(|| u16::decode(stream, ctx)).transpose()?;

        Ok(DataValue {
            value,
            status,
            source_timestamp,
            source_picoseconds,
            server_timestamp,
            server_picoseconds,
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
    fn value_only_round_trips() {
        let ctx = ctx();
        let dv = DataValue::new(42i32.into());
        let bytes = dv.to_bytes(&ctx).unwrap();
        assert_eq!(bytes[0], HAS_VALUE);
        assert_eq!(DataValue::from_bytes(&bytes, &ctx).unwrap(), dv);
        assert_eq!(dv.effective_status(), StatusCode::Good);
    }

    #[test]
    fn fully_populated_round_trips() {
        let ctx = ctx();
        let dv = DataValue {
            value: Some(3.14.into()),
            status: Some(StatusCode::BadTimeout),
            source_timestamp: Some(UtcTime(123_456)),
            source_picoseconds: Some(10),
            server_timestamp: Some(UtcTime(123_999)),
            server_picoseconds: Some(20),
        };
        let bytes = dv.to_bytes(&ctx).unwrap();
        assert_eq!(DataValue::from_bytes(&bytes, &ctx).unwrap(), dv);
        assert_eq!(dv.effective_status(), StatusCode::BadTimeout);
    }

    #[test]
    fn empty_data_value_round_trips() {
        let ctx = ctx();
        let dv = DataValue::default();
        let bytes = dv.to_bytes(&ctx).unwrap();
        assert_eq!(bytes, vec![0]);
        assert_eq!(DataValue::from_bytes(&bytes, &ctx).unwrap(), dv);
    }
}
