//! `Variant` (Part 6 §5.2.2.16): a tagged union over the 22 built-in scalar
//! types, optionally as an array (with optional matrix dimensions).
//!
//! The tag is a built-in type id (1-25) looked up directly — there is no
//! heap pointer or vtable here, only a plain `u8` jump table, mirroring the
//! "process-wide type-table index" the byte codec spec calls for (C2).

use std::io::{Read, Write};

use crate::core::{BinaryDecodable, BinaryEncodable, CodecError, Context};

use super::array::{decode_array, encode_array};
use super::data_value::DataValue;
use super::diagnostic_info::DiagnosticInfo;
use super::extension_object::ExtensionObject;
use super::guid::Guid;
use super::node_id::{ExpandedNodeId, NodeId};
use super::qualified_name::{LocalizedText, QualifiedName};
use super::scalar::UtcTime;
use super::string::{ByteString, UaString};
use crate::core::StatusCode;

/// Array-flag bit in the `Variant` encoding byte.
pub const VARIANT_ARRAY_FLAG: u8 = 0x80;
/// Dimensions-present bit in the `Variant` encoding byte (valid only with
/// the array flag also set).
pub const VARIANT_ARRAY_DIMENSIONS_FLAG: u8 = 0x40;
/// Mask isolating the built-in type id from the encoding byte.
pub const VARIANT_TYPE_MASK: u8 = 0x3F;

/// One value of a built-in scalar type, as carried inside a `Variant`.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// No value; a `Variant` of this kind is the "empty variant" (type id 0).
    Empty,
    /// Built-in type id 1.
    Boolean(bool),
    /// Built-in type id 2.
    SByte(i8),
    /// Built-in type id 3.
    Byte(u8),
    /// Built-in type id 4.
    Int16(i16),
    /// Built-in type id 5.
    UInt16(u16),
    /// Built-in type id 6.
    Int32(i32),
    /// Built-in type id 7.
    UInt32(u32),
    /// Built-in type id 8.
    Int64(i64),
    /// Built-in type id 9.
    UInt64(u64),
    /// Built-in type id 10.
    Float(f32),
    /// Built-in type id 11.
    Double(f64),
    /// Built-in type id 12.
    String(UaString),
    /// Built-in type id 13.
    DateTime(UtcTime),
    /// Built-in type id 14.
    Guid(Guid),
    /// Built-in type id 15.
    ByteString(ByteString),
    /// Built-in type id 16 — encoded identically to `ByteString` (UTF-8 XML text).
    XmlElement(ByteString),
    /// Built-in type id 17.
    NodeId(NodeId),
    /// Built-in type id 18.
    ExpandedNodeId(ExpandedNodeId),
    /// Built-in type id 19.
    StatusCode(StatusCode),
    /// Built-in type id 20.
    QualifiedName(QualifiedName),
    /// Built-in type id 21.
    LocalizedText(LocalizedText),
    /// Built-in type id 22.
    ExtensionObject(ExtensionObject),
    /// Built-in type id 23.
    DataValue(Box<DataValue>),
    /// Built-in type id 24 — a `Variant` nested inside a `Variant`.
    Variant(Box<Variant>),
    /// Built-in type id 25.
    DiagnosticInfo(DiagnosticInfo),
}

impl ScalarValue {
    fn type_id(&self) -> u8 {
        match self {
            ScalarValue::Empty => 0,
            ScalarValue::Boolean(_) => 1,
            ScalarValue::SByte(_) => 2,
            ScalarValue::Byte(_) => 3,
            ScalarValue::Int16(_) => 4,
            ScalarValue::UInt16(_) => 5,
            ScalarValue::Int32(_) => 6,
            ScalarValue::UInt32(_) => 7,
            ScalarValue::Int64(_) => 8,
            ScalarValue::UInt64(_) => 9,
            ScalarValue::Float(_) => 10,
            ScalarValue::Double(_) => 11,
            ScalarValue::String(_) => 12,
            ScalarValue::DateTime(_) => 13,
            ScalarValue::Guid(_) => 14,
            ScalarValue::ByteString(_) => 15,
            ScalarValue::XmlElement(_) => 16,
            ScalarValue::NodeId(_) => 17,
            ScalarValue::ExpandedNodeId(_) => 18,
            ScalarValue::StatusCode(_) => 19,
            ScalarValue::QualifiedName(_) => 20,
            ScalarValue::LocalizedText(_) => 21,
            ScalarValue::ExtensionObject(_) => 22,
            ScalarValue::DataValue(_) => 23,
            ScalarValue::Variant(_) => 24,
            ScalarValue::DiagnosticInfo(_) => 25,
        }
    }

    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        match self {
            ScalarValue::Empty => 0,
            ScalarValue::Boolean(v) => v.byte_len(ctx),
            ScalarValue::SByte(v) => v.byte_len(ctx),
            ScalarValue::Byte(v) => v.byte_len(ctx),
            ScalarValue::Int16(v) => v.byte_len(ctx),
            ScalarValue::UInt16(v) => v.byte_len(ctx),
            ScalarValue::Int32(v) => v.byte_len(ctx),
            ScalarValue::UInt32(v) => v.byte_len(ctx),
            ScalarValue::Int64(v) => v.byte_len(ctx),
            ScalarValue::UInt64(v) => v.byte_len(ctx),
            ScalarValue::Float(v) => v.byte_len(ctx),
            ScalarValue::Double(v) => v.byte_len(ctx),
            ScalarValue::String(v) => v.byte_len(ctx),
            ScalarValue::DateTime(v) => v.byte_len(ctx),
            ScalarValue::Guid(v) => v.byte_len(ctx),
            ScalarValue::ByteString(v) => v.byte_len(ctx),
            ScalarValue::XmlElement(v) => v.byte_len(ctx),
            ScalarValue::NodeId(v) => v.byte_len(ctx),
            ScalarValue::ExpandedNodeId(v) => v.byte_len(ctx),
            ScalarValue::StatusCode(v) => v.as_raw().byte_len(ctx),
            ScalarValue::QualifiedName(v) => v.byte_len(ctx),
            ScalarValue::LocalizedText(v) => v.byte_len(ctx),
            ScalarValue::ExtensionObject(v) => v.byte_len(ctx),
            ScalarValue::DataValue(v) => v.byte_len(ctx),
            ScalarValue::Variant(v) => v.byte_len(ctx),
            ScalarValue::DiagnosticInfo(v) => v.byte_len(ctx),
        }
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> Result<(), CodecError> {
        match self {
            ScalarValue::Empty => Ok(()),
            ScalarValue::Boolean(v) => v.encode(stream, ctx),
            ScalarValue::SByte(v) => v.encode(stream, ctx),
            ScalarValue::Byte(v) => v.encode(stream, ctx),
            ScalarValue::Int16(v) => v.encode(stream, ctx),
            ScalarValue::UInt16(v) => v.encode(stream, ctx),
            ScalarValue::Int32(v) => v.encode(stream, ctx),
            ScalarValue::UInt32(v) => v.encode(stream, ctx),
            ScalarValue::Int64(v) => v.encode(stream, ctx),
            ScalarValue::UInt64(v) => v.encode(stream, ctx),
            ScalarValue::Float(v) => v.encode(stream, ctx),
            ScalarValue::Double(v) => v.encode(stream, ctx),
            ScalarValue::String(v) => v.encode(stream, ctx),
            ScalarValue::DateTime(v) => v.encode(stream, ctx),
            ScalarValue::Guid(v) => v.encode(stream, ctx),
            ScalarValue::ByteString(v) => v.encode(stream, ctx),
            ScalarValue::XmlElement(v) => v.encode(stream, ctx),
            ScalarValue::NodeId(v) => v.encode(stream, ctx),
            ScalarValue::ExpandedNodeId(v) => v.encode(stream, ctx),
            ScalarValue::StatusCode(v) => v.as_raw().encode(stream, ctx),
            ScalarValue::QualifiedName(v) => v.encode(stream, ctx),
            ScalarValue::LocalizedText(v) => v.encode(stream, ctx),
            ScalarValue::ExtensionObject(v) => v.encode(stream, ctx),
            ScalarValue::DataValue(v) => v.encode(stream, ctx),
            ScalarValue::Variant(v) => v.encode(stream, ctx),
            ScalarValue::DiagnosticInfo(v) => v.encode(stream, ctx),
        }
    }

    fn decode<S: Read + ?Sized>(type_id: u8, stream: &mut S, ctx: &Context<'_>) -> Result<Self, CodecError> {
        Ok(match type_id {
            0 => ScalarValue::Empty,
            1 => ScalarValue::Boolean(bool::decode(stream, ctx)?),
            2 => ScalarValue::SByte(i8::decode(stream, ctx)?),
            3 => ScalarValue::Byte(u8::decode(stream, ctx)?),
            4 => ScalarValue::Int16(i16::decode(stream, ctx)?),
            5 => ScalarValue::UInt16(u16::decode(stream, ctx)?),
            6 => ScalarValue::Int32(i32::decode(stream, ctx)?),
            7 => ScalarValue::UInt32(u32::decode(stream, ctx)?),
            8 => ScalarValue::Int64(i64::decode(stream, ctx)?),
            9 => ScalarValue::UInt64(u64::decode(stream, ctx)?),
            10 => ScalarValue::Float(f32::decode(stream, ctx)?),
            11 => ScalarValue::Double(f64::decode(stream, ctx)?),
            12 => ScalarValue::String(UaString::decode(stream, ctx)?),
            13 => ScalarValue::DateTime(UtcTime::decode(stream, ctx)?),
            14 => ScalarValue::Guid(Guid::decode(stream, ctx)?),
            15 => ScalarValue::ByteString(ByteString::decode(stream, ctx)?),
            16 => ScalarValue::XmlElement(ByteString::decode(stream, ctx)?),
            17 => ScalarValue::NodeId(NodeId::decode(stream, ctx)?),
            18 => ScalarValue::ExpandedNodeId(ExpandedNodeId::decode(stream, ctx)?),
            19 => ScalarValue::StatusCode(StatusCode::from_raw(u32::decode(stream, ctx)?)),
            20 => ScalarValue::QualifiedName(QualifiedName::decode(stream, ctx)?),
            21 => ScalarValue::LocalizedText(LocalizedText::decode(stream, ctx)?),
            22 => ScalarValue::ExtensionObject(ExtensionObject::decode(stream, ctx)?),
            23 => ScalarValue::DataValue(Box::new(DataValue::decode(stream, ctx)?)),
            24 => ScalarValue::Variant(Box::new(Variant::decode(stream, ctx)?)),
            25 => ScalarValue::DiagnosticInfo(DiagnosticInfo::decode(stream, ctx)?),
            other => return Err(CodecError::Malformed(format!("unknown Variant built-in type id {other}"))),
        })
    }
}

/// A `Variant`: empty, a single scalar, or an array (with optional matrix
/// dimensions) of one built-in type.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
    /// The empty variant (built-in type id 0, no value).
    #[default]
    Empty,
    /// A single scalar value.
    Scalar(ScalarValue),
    /// An array of same-typed scalar values, with optional matrix
    /// dimensions (row-major, product must equal the element count).
    Array {
        /// Built-in type id shared by every element.
        type_id: u8,
        /// The flattened elements.
        items: Vec<ScalarValue>,
        /// Matrix dimensions, if this array represents a multi-dimensional
        /// value.
        dimensions: Option<Vec<i32>>,
    },
}

impl Variant {
    /// Wrap a single scalar as a `Variant`.
    pub fn scalar(value: ScalarValue) -> Self {
        Variant::Scalar(value)
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Variant::Scalar(ScalarValue::Boolean(v))
    }
}

impl From<i32> for Variant {
    fn from(v: i32) -> Self {
        Variant::Scalar(ScalarValue::Int32(v))
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Variant::Scalar(ScalarValue::Double(v))
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::Scalar(ScalarValue::String(UaString::from(v)))
    }
}

impl BinaryEncodable for Variant {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        match self {
            Variant::Empty => 1,
            Variant::Scalar(value) => 1 + value.byte_len(ctx),
            Variant::Array {
                items, dimensions, ..
            } => {
                let elems_len: usize = 4 + items.iter().map(|v| v.byte_len(ctx)).sum::<usize>();
                let dims_len = dimensions
                    .as_ref()
                    .map(|d| 4 + d.len() * 4)
                    .unwrap_or(0);
                1 + elems_len + dims_len
            }
        }
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> Result<(), CodecError> {
        match self {
            Variant::Empty => 0u8.encode(stream, ctx),
            Variant::Scalar(value) => {
                value.type_id().encode(stream, ctx)?;
                value.encode(stream, ctx)
            }
            Variant::Array {
                type_id,
                items,
                dimensions,
            } => {
                let mut encoding = *type_id | VARIANT_ARRAY_FLAG;
                if dimensions.is_some() {
                    encoding |= VARIANT_ARRAY_DIMENSIONS_FLAG;
                }
                encoding.encode(stream, ctx)?;
                let len = i32::try_from(items.len()).map_err(|_| CodecError::InvalidLength(items.len() as i64))?;
                len.encode(stream, ctx)?;
                for item in items {
                    item.encode(stream, ctx)?;
                }
                if let Some(dims) = dimensions {
                    encode_array(&Some(dims.clone()), stream, ctx)?;
                }
                Ok(())
            }
        }
    }
}

impl BinaryDecodable for Variant {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> Result<Self, CodecError> {
        if ctx.limits.max_nesting_depth == 0 {
            return Err(CodecError::Malformed("nesting depth exceeded".into()));
        }
        let inner_ctx = Context {
            limits: crate::core::DecodingLimits {
                max_nesting_depth: ctx.limits.max_nesting_depth - 1,
                ..ctx.limits
            },
            type_lookup: ctx.type_lookup,
        };

        let encoding = u8::decode(stream, &inner_ctx)?;
        let type_id = encoding & VARIANT_TYPE_MASK;
        let is_array = encoding & VARIANT_ARRAY_FLAG != 0;
        let has_dims = encoding & VARIANT_ARRAY_DIMENSIONS_FLAG != 0;

        if !is_array {
            let value = ScalarValue::decode(type_id, stream, &inner_ctx)?;
            return Ok(match value {
                ScalarValue::Empty => Variant::Empty,
                other => Variant::Scalar(other),
            });
        }

        let len = i32::decode(stream, &inner_ctx)?;
        if len < 0 {
            return Ok(Variant::Array {
                type_id,
                items: Vec::new(),
                dimensions: None,
            });
        }
        let len = len as u32;
        if len > inner_ctx.limits.max_array_length {
            return Err(CodecError::InvalidLength(len as i64));
        }
        let mut items = Vec::with_capacity(len.min(4096) as usize);
        for _ in 0..len {
            items.push(ScalarValue::decode(type_id, stream, &inner_ctx)?);
        }
        let dimensions = if has_dims {
            decode_array::<i32, _>(stream, &inner_ctx)?
        } else {
            None
        };
        Ok(Variant::Array {
            type_id,
            items,
            dimensions,
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
    fn empty_variant_round_trips() {
        let ctx = ctx();
        let v = Variant::Empty;
        let bytes = v.to_bytes(&ctx).unwrap();
        assert_eq!(bytes, vec![0]);
        assert_eq!(Variant::from_bytes(&bytes, &ctx).unwrap(), v);
    }

    #[test]
    fn scalar_int32_round_trips() {
        let ctx = ctx();
        let v: Variant = 42i32.into();
        let bytes = v.to_bytes(&ctx).unwrap();
        assert_eq!(bytes[0], 6);
        assert_eq!(Variant::from_bytes(&bytes, &ctx).unwrap(), v);
    }

    #[test]
    fn scalar_string_round_trips() {
        let ctx = ctx();
        let v: Variant = "hello".into();
        let bytes = v.to_bytes(&ctx).unwrap();
        assert_eq!(Variant::from_bytes(&bytes, &ctx).unwrap(), v);
    }

    #[test]
    fn array_round_trips_without_dimensions() {
        let ctx = ctx();
        let v = Variant::Array {
            type_id: 6,
            items: vec![ScalarValue::Int32(1), ScalarValue::Int32(2), ScalarValue::Int32(3)],
            dimensions: None,
        };
        let bytes = v.to_bytes(&ctx).unwrap();
        assert_eq!(bytes[0], 6 | VARIANT_ARRAY_FLAG);
        assert_eq!(Variant::from_bytes(&bytes, &ctx).unwrap(), v);
    }

    #[test]
    fn array_round_trips_with_dimensions() {
        let ctx = ctx();
        let v = Variant::Array {
            type_id: 6,
            items: (0..6).map(ScalarValue::Int32).collect(),
            dimensions: Some(vec![2, 3]),
        };
        let bytes = v.to_bytes(&ctx).unwrap();
        assert_eq!(bytes[0], 6 | VARIANT_ARRAY_FLAG | VARIANT_ARRAY_DIMENSIONS_FLAG);
        assert_eq!(Variant::from_bytes(&bytes, &ctx).unwrap(), v);
    }

    #[test]
    fn nested_variant_round_trips() {
        let ctx = ctx();
        let inner: Variant = 7i32.into();
        let v = Variant::Scalar(ScalarValue::Variant(Box::new(inner)));
        let bytes = v.to_bytes(&ctx).unwrap();
        assert_eq!(Variant::from_bytes(&bytes, &ctx).unwrap(), v);
    }

    #[test]
    fn unknown_type_id_is_malformed() {
        let ctx = ctx();
        let bytes = vec![63u8];
        let err = Variant::from_bytes(&bytes, &ctx).unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
    }
}
