//! Binary codec for the built-in scalar types (§2, Part 6 §5.2).
//!
//! All scalars are little-endian; signed integers are two's complement;
//! floats are IEEE 754 binary32/binary64. `DateTime` is a 100-ns tick count
//! since 1601-01-01 UTC, stored as `Int64`.

use std::io::{Read, Write};
use std::time::{Duration, SystemTime};

use crate::core::{BinaryDecodable, BinaryEncodable, CodecError, Context};

fn read_exact<S: Read + ?Sized>(stream: &mut S, buf: &mut [u8]) -> Result<(), CodecError> {
    stream.read_exact(buf).map_err(|_| CodecError::BufferTooSmall {
        needed: buf.len(),
        available: 0,
    })
}

macro_rules! impl_scalar {
    ($ty:ty, $len:expr) => {
        impl BinaryEncodable for $ty {
            fn byte_len(&self, _ctx: &Context<'_>) -> usize {
                $len
            }

            fn encode<S: Write + ?Sized>(
                &self,
                stream: &mut S,
                _ctx: &Context<'_>,
            ) -> Result<(), CodecError> {
                stream
                    .write_all(&self.to_le_bytes())
                    .map_err(|_| CodecError::BufferTooSmall {
                        needed: $len,
                        available: 0,
                    })
            }
        }

        impl BinaryDecodable for $ty {
            fn decode<S: Read + ?Sized>(stream: &mut S, _ctx: &Context<'_>) -> Result<Self, CodecError> {
                let mut buf = [0u8; $len];
                read_exact(stream, &mut buf)?;
                Ok(<$ty>::from_le_bytes(buf))
            }
        }
    };
}

impl_scalar!(u8, 1);
impl_scalar!(i8, 1);
impl_scalar!(u16, 2);
impl_scalar!(i16, 2);
impl_scalar!(u32, 4);
impl_scalar!(i32, 4);
impl_scalar!(u64, 8);
impl_scalar!(i64, 8);
impl_scalar!(f32, 4);
impl_scalar!(f64, 8);

impl BinaryEncodable for bool {
    fn byte_len(&self, _ctx: &Context<'_>) -> usize {
        1
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, _ctx: &Context<'_>) -> Result<(), CodecError> {
        (*self as u8).encode(stream, _ctx)
    }
}

impl BinaryDecodable for bool {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> Result<Self, CodecError> {
        Ok(u8::decode(stream, ctx)? != 0)
    }
}

/// Ticks per second in the OPC UA `DateTime` encoding (100 ns per tick).
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Seconds between the OPC UA epoch (1601-01-01 UTC) and the Unix epoch.
pub const UA_TO_UNIX_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

/// An OPC UA `DateTime`/`UtcTime`: 100-ns ticks since 1601-01-01 UTC.
///
/// Values before the epoch or beyond the representable range saturate to
/// `i64::MIN`/`i64::MAX` per Part 6 §5.2.2.5, rather than panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UtcTime(pub i64);

impl UtcTime {
    /// The zero value, meaning "no value specified" (Part 6 §5.2.2.5).
    pub const MIN: UtcTime = UtcTime(0);

    /// Build from a `SystemTime`, saturating at the representable bounds.
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(since_unix) => {
                let secs = since_unix.as_secs() as i64 + UA_TO_UNIX_EPOCH_OFFSET_SECS;
                let ticks = secs
                    .saturating_mul(TICKS_PER_SECOND)
                    .saturating_add(since_unix.subsec_nanos() as i64 / 100);
                UtcTime(ticks)
            }
            Err(_) => UtcTime(0),
        }
    }

    /// Convert to a `SystemTime`, if this value lies on or after the epoch.
    pub fn to_system_time(self) -> Option<SystemTime> {
        if self.0 <= 0 {
            return None;
        }
        let unix_secs = self.0 / TICKS_PER_SECOND - UA_TO_UNIX_EPOCH_OFFSET_SECS;
        let sub_ticks = self.0 % TICKS_PER_SECOND;
        if unix_secs < 0 {
            return None;
        }
        Some(SystemTime::UNIX_EPOCH + Duration::new(unix_secs as u64, (sub_ticks * 100) as u32))
    }
}

impl BinaryEncodable for UtcTime {
    fn byte_len(&self, _ctx: &Context<'_>) -> usize {
        8
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> Result<(), CodecError> {
        self.0.encode(stream, ctx)
    }
}

impl BinaryDecodable for UtcTime {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> Result<Self, CodecError> {
        Ok(UtcTime(i64::decode(stream, ctx)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context<'static> {
        Context::opaque()
    }

    #[test]
    fn u32_round_trips_little_endian() {
        let ctx = ctx();
        let bytes = 0x0102_0304u32.to_bytes(&ctx).unwrap();
        assert_eq!(bytes, vec![0x04, 0x03, 0x02, 0x01]);
        assert_eq!(u32::from_bytes(&bytes, &ctx).unwrap(), 0x0102_0304);
    }

    #[test]
    fn i64_negative_round_trips() {
        let ctx = ctx();
        let bytes = (-12345i64).to_bytes(&ctx).unwrap();
        assert_eq!(i64::from_bytes(&bytes, &ctx).unwrap(), -12345);
    }

    #[test]
    fn bool_encodes_as_one_byte() {
        let ctx = ctx();
        assert_eq!(true.to_bytes(&ctx).unwrap(), vec![1]);
        assert_eq!(false.to_bytes(&ctx).unwrap(), vec![0]);
    }

    #[test]
    fn buffer_too_small_on_short_read() {
        let ctx = ctx();
        let short = [0u8; 2];
        let err = u32::from_bytes(&short, &ctx).unwrap_err();
        assert!(matches!(err, CodecError::BufferTooSmall { .. }));
    }

    #[test]
    fn datetime_zero_has_no_system_time() {
        assert_eq!(UtcTime::MIN.to_system_time(), None);
    }

    #[test]
    fn datetime_round_trips_through_system_time() {
        let now = SystemTime::now();
        let ua = UtcTime::from_system_time(now);
        let back = ua.to_system_time().unwrap();
        let drift = now.duration_since(back).unwrap_or_else(|e| e.duration());
        assert!(drift < Duration::from_micros(1));
    }
}
