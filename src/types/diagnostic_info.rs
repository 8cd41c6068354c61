//! `DiagnosticInfo` (Part 6 §5.2.2.12): a presence-masked bundle of
//! diagnostic detail, optionally nesting another `DiagnosticInfo` to explain
//! an inner status code.

use std::io::{Read, Write};

use crate::core::{BinaryDecodable, BinaryEncodable, CodecError, Context, StatusCode};

use super::string::UaString;

const HAS_SYMBOLIC_ID: u8 = 0x01;
const HAS_NAMESPACE_URI: u8 = 0x02;
const HAS_LOCALIZED_TEXT: u8 = 0x04;
const HAS_LOCALE: u8 = 0x08;
const HAS_ADDITIONAL_INFO: u8 = 0x10;
const HAS_INNER_STATUS_CODE: u8 = 0x20;
const HAS_INNER_DIAGNOSTIC_INFO: u8 = 0x40;

/// Extended diagnostic information accompanying a status code.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiagnosticInfo {
    /// Index into the response's `stringTable` naming a vendor-specific symbol.
    pub symbolic_id: Option<i32>,
    /// Index into the response's `stringTable` naming a namespace URI.
    pub namespace_uri: Option<i32>,
    /// Index into the response's `stringTable` naming a locale.
    pub locale: Option<i32>,
    /// Index into the response's `stringTable` with human-readable text.
    pub localized_text: Option<i32>,
    /// Vendor-specific additional diagnostic text.
    pub additional_info: Option<String>,
    /// A finer-grained status code this diagnostic elaborates on.
    pub inner_status_code: Option<StatusCode>,
    /// Diagnostics for `inner_status_code`, recursively.
    pub inner_diagnostic_info: Option<Box<DiagnosticInfo>>,
}

impl DiagnosticInfo {
    fn presence_mask(&self) -> u8 {
        let mut mask = 0;
        if self.symbolic_id.is_some() {
            mask |= HAS_SYMBOLIC_ID;
        }
        if self.namespace_uri.is_some() {
            mask |= HAS_NAMESPACE_URI;
        }
        if self.localized_text.is_some() {
            mask |= HAS_LOCALIZED_TEXT;
        }
        if self.locale.is_some() {
            mask |= HAS_LOCALE;
        }
        if self.additional_info.is_some() {
            mask |= HAS_ADDITIONAL_INFO;
        }
        if self.inner_status_code.is_some() {
            mask |= HAS_INNER_STATUS_CODE;
        }
        if self.inner_diagnostic_info.is_some() {
            mask |= HAS_INNER_DIAGNOSTIC_INFO;
        }
        mask
    }
}

impl BinaryEncodable for DiagnosticInfo {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        let mut len = 1;
        if let Some(v) = self.symbolic_id {
            len += v.byte_len(ctx);
        }
        if let Some(v) = self.namespace_uri {
            len += v.byte_len(ctx);
        }
        if let Some(v) = self.locale {
            len += v.byte_len(ctx);
        }
        if let Some(v) = self.localized_text {
            len += v.byte_len(ctx);
        }
        if let Some(v) = &self.additional_info {
            len += UaString::from(v.as_str()).byte_len(ctx);
        }
        if let Some(v) = self.inner_status_code {
            len += v.as_raw().byte_len(ctx);
        }
        if let Some(v) = &self.inner_diagnostic_info {
            len += v.byte_len(ctx);
        }
        len
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> Result<(), CodecError> {
        self.presence_mask().encode(stream, ctx)?;
        if let Some(v) = self.symbolic_id {
            v.encode(stream, ctx)?;
        }
        if let Some(v) = self.namespace_uri {
            v.encode(stream, ctx)?;
        }
        if let Some(v) = self.locale {
            v.encode(stream, ctx)?;
        }
        if let Some(v) = self.localized_text {
            v.encode(stream, ctx)?;
        }
        if let Some(v) = &self.additional_info {
            UaString::from(v.as_str()).encode(stream, ctx)?;
        }
        if let Some(v) = self.inner_status_code {
            v.as_raw().encode(stream, ctx)?;
        }
        if let Some(v) = &self.inner_diagnostic_info {
            v.encode(stream, ctx)?;
        }
        Ok(())
    }
}

impl BinaryDecodable for DiagnosticInfo {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> Result<Self, CodecError> {
        if ctx.limits.max_nesting_depth == 0 {
            return Err(CodecError::Malformed("nesting depth exceeded".into()));
        }
        let inner_limits = crate::core::DecodingLimits {
            max_nesting_depth: ctx.limits.max_nesting_depth - 1,
            ..ctx.limits
        };
        let inner_ctx = Context {
            limits: inner_limits,
            type_lookup: ctx.type_lookup,
        };

        let mask = u8::decode(stream, &inner_ctx)?;
        let symbolic_id = (mask & HAS_SYMBOLIC_ID != 0).then(|| i32::decode(stream, &inner_ctx)).transpose()?;
        let namespace_uri = (mask & HAS_NAMESPACE_URI != 0).then(|| i32::decode(stream, &inner_ctx)).transpose()?;
        let locale = (mask & HAS_LOCALE != 0).then(|| i32::decode(stream, &inner_ctx)).transpose()?;
        let localized_text = (mask & HAS_LOCALIZED_TEXT != 0).then(|| i32::decode(stream, &inner_ctx)).transpose()?;
        let additional_info = (mask & HAS_ADDITIONAL_INFO != 0)
            .then(|| UaString::decode(stream, &inner_ctx))
            .transpose()?
            .and_then(|s| s.0);
        let inner_status_code = (mask & HAS_INNER_STATUS_CODE != 0)
            .then(|| u32::decode(stream, &inner_ctx))
            .transpose()?
            .map(StatusCode::from_raw);
        let inner_diagnostic_info = (mask & HAS_INNER_DIAGNOSTIC_INFO != 0)
            .then(|| DiagnosticInfo::decode(stream, &inner_ctx))
            .transpose()?
            .map(Box::new);

        Ok(DiagnosticInfo {
            symbolic_id,
            namespace_uri,
            locale,
            localized_text,
            additional_info,
            inner_status_code,
            inner_diagnostic_info,
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
    fn empty_diagnostic_info_round_trips() {
        let ctx = ctx();
        let di = DiagnosticInfo::default();
        let bytes = di.to_bytes(&ctx).unwrap();
        assert_eq!(bytes, vec![0]);
        assert_eq!(DiagnosticInfo::from_bytes(&bytes, &ctx).unwrap(), di);
    }

    #[test]
    fn nested_diagnostic_info_round_trips() {
        let ctx = ctx();
        let di = DiagnosticInfo {
            symbolic_id: Some(3),
            additional_info: Some("vendor note".into()),
            inner_status_code: Some(StatusCode::BadTimeout),
            inner_diagnostic_info: Some(Box::new(DiagnosticInfo {
                symbolic_id: Some(1),
                ..Default::default()
            })),
            ..Default::default()
        };
        let bytes = di.to_bytes(&ctx).unwrap();
        assert_eq!(DiagnosticInfo::from_bytes(&bytes, &ctx).unwrap(), di);
    }
}
