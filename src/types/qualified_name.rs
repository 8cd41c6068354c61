//! `QualifiedName` and `LocalizedText` (Part 6 §5.2.2.11/.12, §5.2.3).

use std::io::{Read, Write};

use crate::core::{BinaryDecodable, BinaryEncodable, CodecError, Context};

use super::string::UaString;

const LOCALIZED_TEXT_LOCALE_PRESENT: u8 = 0x01;
const LOCALIZED_TEXT_TEXT_PRESENT: u8 = 0x02;

/// A name qualified by a namespace index — used for browse names and
/// structure field names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QualifiedName {
    /// Index into the server's namespace array.
    pub namespace_index: u16,
    /// The unqualified name.
    pub name: UaString,
}

impl QualifiedName {
    /// Build a `QualifiedName` in the given namespace.
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        QualifiedName {
            namespace_index,
            name: UaString::from(name.into()),
        }
    }
}

impl BinaryEncodable for QualifiedName {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        2 + self.name.byte_len(ctx)
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> Result<(), CodecError> {
        self.namespace_index.encode(stream, ctx)?;
        self.name.encode(stream, ctx)
    }
}

impl BinaryDecodable for QualifiedName {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> Result<Self, CodecError> {
        let namespace_index = u16::decode(stream, ctx)?;
        let name = UaString::decode(stream, ctx)?;
        Ok(QualifiedName { namespace_index, name })
    }
}

/// Human-readable text qualified by an IETF locale id — e.g. `en-US`.
///
/// Encoded with a leading presence-mask byte so that locale and text can
/// each be independently absent (Part 6 §5.2.2.12), unlike a plain string
/// pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LocalizedText {
    /// IETF locale id, e.g. `"en-US"`.
    pub locale: Option<String>,
    /// The text itself.
    pub text: Option<String>,
}

impl LocalizedText {
    /// Build a `LocalizedText` with both locale and text present.
    pub fn new(locale: impl Into<String>, text: impl Into<String>) -> Self {
        LocalizedText {
            locale: Some(locale.into()),
            text: Some(text.into()),
        }
    }

    /// Build a `LocalizedText` with only text (no locale).
    pub fn text_only(text: impl Into<String>) -> Self {
        LocalizedText {
            locale: None,
            text: Some(text.into()),
        }
    }

    fn presence_mask(&self) -> u8 {
        let mut mask = 0;
        if self.locale.is_some() {
            mask |= LOCALIZED_TEXT_LOCALE_PRESENT;
        }
        if self.text.is_some() {
            mask |= LOCALIZED_TEXT_TEXT_PRESENT;
        }
        mask
    }
}

impl BinaryEncodable for LocalizedText {
    fn byte_len(&self, ctx: &Context<'_>) -> usize {
        let mut len = 1;
        if let Some(locale) = &self.locale {
            len += UaString::from(locale.as_str()).byte_len(ctx);
        }
        if let Some(text) = &self.text {
            len += UaString::from(text.as_str()).byte_len(ctx);
        }
        len
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S, ctx: &Context<'_>) -> Result<(), CodecError> {
        self.presence_mask().encode(stream, ctx)?;
        if let Some(locale) = &self.locale {
            UaString::from(locale.as_str()).encode(stream, ctx)?;
        }
        if let Some(text) = &self.text {
            UaString::from(text.as_str()).encode(stream, ctx)?;
        }
        Ok(())
    }
}

impl BinaryDecodable for LocalizedText {
    fn decode<S: Read + ?Sized>(stream: &mut S, ctx: &Context<'_>) -> Result<Self, CodecError> {
        let mask = u8::decode(stream, ctx)?;
        let locale = if mask & LOCALIZED_TEXT_LOCALE_PRESENT != 0 {
            UaString::decode(stream, ctx)?.0
        } else {
            None
        };
        let text = if mask & LOCALIZED_TEXT_TEXT_PRESENT != 0 {
            UaString::decode(stream, ctx)?.0
        } else {
            None
        };
        Ok(LocalizedText { locale, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context<'static> {
        Context::opaque()
    }

    #[test]
    fn qualified_name_round_trips() {
        let ctx = ctx();
        let qn = QualifiedName::new(2, "Temperature");
        let bytes = qn.to_bytes(&ctx).unwrap();
        assert_eq!(QualifiedName::from_bytes(&bytes, &ctx).unwrap(), qn);
    }

    #[test]
    fn localized_text_round_trips_both_present() {
        let ctx = ctx();
        let lt = LocalizedText::new("en-US", "Hello");
        let bytes = lt.to_bytes(&ctx).unwrap();
        assert_eq!(bytes[0], 0x03);
        assert_eq!(LocalizedText::from_bytes(&bytes, &ctx).unwrap(), lt);
    }

    #[test]
    fn localized_text_round_trips_text_only() {
        let ctx = ctx();
        let lt = LocalizedText::text_only("Hello");
        let bytes = lt.to_bytes(&ctx).unwrap();
        assert_eq!(bytes[0], LOCALIZED_TEXT_TEXT_PRESENT);
        assert_eq!(LocalizedText::from_bytes(&bytes, &ctx).unwrap(), lt);
    }

    #[test]
    fn localized_text_round_trips_empty() {
        let ctx = ctx();
        let lt = LocalizedText::default();
        let bytes = lt.to_bytes(&ctx).unwrap();
        assert_eq!(bytes, vec![0]);
        assert_eq!(LocalizedText::from_bytes(&bytes, &ctx).unwrap(), lt);
    }
}
