//! The XML codec (C3): mirrors the binary codec's per-kind encode/decode
//! split, but as text. Booleans are `true`/`false`; non-finite floats use
//! `INF`/`-INF`/`NaN`; `DateTime` is ISO-8601 with a trailing `Z` and
//! trailing-zero-trimmed fractional seconds; `Guid` is wrapped in
//! `<Guid><String>…</String></Guid>`; `NodeId` follows the same textual
//! grammar as `NodeId::parse`/`Display`; `ByteString` is base64; arrays are
//! `<ListOfT>…</ListOfT>`.

use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::core::{CodecError, Context, XmlDecodable, XmlEncodable};

use super::guid::Guid;
use super::node_id::NodeId;
use super::scalar::{UtcTime, TICKS_PER_SECOND, UA_TO_UNIX_EPOCH_OFFSET_SECS};
use super::string::{ByteString, UaString};

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), CodecError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_err)?;
    if !text.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)
}

fn xml_err(e: impl std::fmt::Display) -> CodecError {
    CodecError::Malformed(e.to_string())
}

/// Read the flat character-data content of the current element (the one
/// `start` opened), consuming through its matching end tag. Assumes no
/// nested elements — true for every built-in scalar leaf.
fn read_flat_text(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<String, CodecError> {
    let name = start.name().as_ref().to_vec();
    let mut text = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Text(t) => text.push_str(&t.unescape().map_err(xml_err)?),
            Event::CData(t) => text.push_str(&String::from_utf8_lossy(&t.into_inner())),
            Event::End(e) if e.name().as_ref() == name => break,
            Event::Eof => return Err(CodecError::Malformed("unexpected EOF in XML element".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

macro_rules! impl_xml_display {
    ($ty:ty) => {
        impl XmlEncodable for $ty {
            fn encode_xml<W: Write>(
                &self,
                writer: &mut Writer<W>,
                element_name: &str,
                _ctx: &Context<'_>,
            ) -> Result<(), CodecError> {
                write_text_element(writer, element_name, &self.to_string())
            }
        }

        impl XmlDecodable for $ty {
            fn decode_xml(
                reader: &mut Reader<&[u8]>,
                start: &BytesStart<'_>,
                _ctx: &Context<'_>,
            ) -> Result<Self, CodecError> {
                let text = read_flat_text(reader, start)?;
                text.trim().parse::<$ty>().map_err(|e| CodecError::Malformed(e.to_string()))
            }
        }
    };
}

impl_xml_display!(i8);
impl_xml_display!(u8);
impl_xml_display!(i16);
impl_xml_display!(u16);
impl_xml_display!(i32);
impl_xml_display!(u32);
impl_xml_display!(i64);
impl_xml_display!(u64);

impl XmlEncodable for bool {
    fn encode_xml<W: Write>(&self, writer: &mut Writer<W>, element_name: &str, _ctx: &Context<'_>) -> Result<(), CodecError> {
        write_text_element(writer, element_name, if *self { "true" } else { "false" })
    }
}

impl XmlDecodable for bool {
    fn decode_xml(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>, _ctx: &Context<'_>) -> Result<Self, CodecError> {
        match read_flat_text(reader, start)?.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(CodecError::Malformed(format!("invalid xs:boolean: {other}"))),
        }
    }
}

fn format_xml_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 { "INF".to_owned() } else { "-INF".to_owned() }
    } else {
        value.to_string()
    }
}

fn parse_xml_float(text: &str) -> Result<f64, CodecError> {
    match text {
        "NaN" => Ok(f64::NAN),
        "INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        other => other.parse().map_err(|_| CodecError::Malformed(format!("invalid xs:double: {other}"))),
    }
}

impl XmlEncodable for f32 {
    fn encode_xml<W: Write>(&self, writer: &mut Writer<W>, element_name: &str, _ctx: &Context<'_>) -> Result<(), CodecError> {
        write_text_element(writer, element_name, &format_xml_float(*self as f64))
    }
}

impl XmlDecodable for f32 {
    fn decode_xml(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>, _ctx: &Context<'_>) -> Result<Self, CodecError> {
        Ok(parse_xml_float(read_flat_text(reader, start)?.trim())? as f32)
    }
}

impl XmlEncodable for f64 {
    fn encode_xml<W: Write>(&self, writer: &mut Writer<W>, element_name: &str, _ctx: &Context<'_>) -> Result<(), CodecError> {
        write_text_element(writer, element_name, &format_xml_float(*self))
    }
}

impl XmlDecodable for f64 {
    fn decode_xml(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>, _ctx: &Context<'_>) -> Result<Self, CodecError> {
        parse_xml_float(read_flat_text(reader, start)?.trim())
    }
}

impl XmlEncodable for UaString {
    fn encode_xml<W: Write>(&self, writer: &mut Writer<W>, element_name: &str, _ctx: &Context<'_>) -> Result<(), CodecError> {
        write_text_element(writer, element_name, self.as_str())
    }
}

impl XmlDecodable for UaString {
    fn decode_xml(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>, _ctx: &Context<'_>) -> Result<Self, CodecError> {
        Ok(UaString::from(read_flat_text(reader, start)?))
    }
}

impl XmlEncodable for ByteString {
    fn encode_xml<W: Write>(&self, writer: &mut Writer<W>, element_name: &str, _ctx: &Context<'_>) -> Result<(), CodecError> {
        use base64::Engine;
        let text = base64::engine::general_purpose::STANDARD.encode(self.as_bytes());
        write_text_element(writer, element_name, &text)
    }
}

impl XmlDecodable for ByteString {
    fn decode_xml(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>, _ctx: &Context<'_>) -> Result<Self, CodecError> {
        use base64::Engine;
        let text = read_flat_text(reader, start)?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(text.trim())
            .map_err(|e| CodecError::Malformed(e.to_string()))?;
        Ok(ByteString::from(bytes))
    }
}

impl XmlEncodable for Guid {
    fn encode_xml<W: Write>(&self, writer: &mut Writer<W>, element_name: &str, _ctx: &Context<'_>) -> Result<(), CodecError> {
        writer.write_event(Event::Start(BytesStart::new(element_name))).map_err(xml_err)?;
        write_text_element(writer, "String", &self.to_string())?;
        writer.write_event(Event::End(BytesEnd::new(element_name))).map_err(xml_err)
    }
}

impl XmlDecodable for Guid {
    fn decode_xml(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>, _ctx: &Context<'_>) -> Result<Self, CodecError> {
        let outer_name = start.name().as_ref().to_vec();
        let mut buf = Vec::new();
        let mut guid = None;
        loop {
            match reader.read_event_into(&mut buf).map_err(xml_err)? {
                Event::Start(e) if e.name().as_ref() == b"String" => {
                    let text = read_flat_text(reader, &e)?;
                    guid = Some(Guid::parse(text.trim())?);
                }
                Event::End(e) if e.name().as_ref() == outer_name => break,
                Event::Eof => return Err(CodecError::Malformed("unexpected EOF in Guid".into())),
                _ => {}
            }
            buf.clear();
        }
        guid.ok_or_else(|| CodecError::Malformed("missing Guid/String".into()))
    }
}

impl XmlEncodable for NodeId {
    fn encode_xml<W: Write>(&self, writer: &mut Writer<W>, element_name: &str, _ctx: &Context<'_>) -> Result<(), CodecError> {
        writer.write_event(Event::Start(BytesStart::new(element_name))).map_err(xml_err)?;
        write_text_element(writer, "Identifier", &self.to_string())?;
        writer.write_event(Event::End(BytesEnd::new(element_name))).map_err(xml_err)
    }
}

impl XmlDecodable for NodeId {
    fn decode_xml(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>, _ctx: &Context<'_>) -> Result<Self, CodecError> {
        let outer_name = start.name().as_ref().to_vec();
        let mut buf = Vec::new();
        let mut node_id = None;
        loop {
            match reader.read_event_into(&mut buf).map_err(xml_err)? {
                Event::Start(e) if e.name().as_ref() == b"Identifier" => {
                    let text = read_flat_text(reader, &e)?;
                    node_id = Some(NodeId::parse(text.trim())?);
                }
                Event::End(e) if e.name().as_ref() == outer_name => break,
                Event::Eof => return Err(CodecError::Malformed("unexpected EOF in NodeId".into())),
                _ => {}
            }
            buf.clear();
        }
        node_id.ok_or_else(|| CodecError::Malformed("missing NodeId/Identifier".into()))
    }
}

/// Civil calendar conversion (Howard Hinnant's `civil_from_days`), used to
/// render `DateTime` as ISO-8601 without pulling in a date/time crate.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

fn days_from_civil(y: i64, m: u32, d: u32) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let mp = if m > 2 { m - 3 } else { m + 9 } as u64;
    let doy = (153 * mp + 2) / 5 + d as u64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe as i64 - 719468
}

impl XmlEncodable for UtcTime {
    fn encode_xml<W: Write>(&self, writer: &mut Writer<W>, element_name: &str, _ctx: &Context<'_>) -> Result<(), CodecError> {
        let unix_ticks = self.0 - UA_TO_UNIX_EPOCH_OFFSET_SECS * TICKS_PER_SECOND;
        let total_secs = unix_ticks.div_euclid(TICKS_PER_SECOND);
        let sub_ticks = unix_ticks.rem_euclid(TICKS_PER_SECOND);
        let days = total_secs.div_euclid(86400);
        let secs_of_day = total_secs.rem_euclid(86400);
        let (year, month, day) = civil_from_days(days);
        let hour = secs_of_day / 3600;
        let minute = (secs_of_day % 3600) / 60;
        let second = secs_of_day % 60;

        let mut text = format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}");
        if sub_ticks != 0 {
            let nanos = sub_ticks * 100;
            let mut frac = format!("{nanos:09}");
            while frac.ends_with('0') {
                frac.pop();
            }
            text.push('.');
            text.push_str(&frac);
        }
        text.push('Z');
        write_text_element(writer, element_name, &text)
    }
}

impl XmlDecodable for UtcTime {
    fn decode_xml(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>, _ctx: &Context<'_>) -> Result<Self, CodecError> {
        let text = read_flat_text(reader, start)?;
        let text = text.trim().strip_suffix('Z').ok_or_else(|| {
            CodecError::Malformed(format!("DateTime missing trailing Z: {text}"))
        })?;
        let (date_part, time_part) = text
            .split_once('T')
            .ok_or_else(|| CodecError::Malformed(format!("invalid DateTime: {text}")))?;
        let mut date_fields = date_part.splitn(3, '-');
        let year: i64 = date_fields.next().unwrap_or("").parse().map_err(|_| CodecError::Malformed(text.to_owned()))?;
        let month: u32 = date_fields.next().unwrap_or("").parse().map_err(|_| CodecError::Malformed(text.to_owned()))?;
        let day: u32 = date_fields.next().unwrap_or("").parse().map_err(|_| CodecError::Malformed(text.to_owned()))?;

        let (time_no_frac, frac_nanos) = match time_part.split_once('.') {
            Some((t, f)) => {
                let mut digits = f.to_owned();
                while digits.len() < 9 {
                    digits.push('0');
                }
                digits.truncate(9);
                (t, digits.parse::<i64>().unwrap_or(0))
            }
            None => (time_part, 0),
        };
        let mut time_fields = time_no_frac.splitn(3, ':');
        let hour: i64 = time_fields.next().unwrap_or("").parse().map_err(|_| CodecError::Malformed(text.to_owned()))?;
        let minute: i64 = time_fields.next().unwrap_or("").parse().map_err(|_| CodecError::Malformed(text.to_owned()))?;
        let second: i64 = time_fields.next().unwrap_or("").parse().map_err(|_| CodecError::Malformed(text.to_owned()))?;

        let days = days_from_civil(year, month, day);
        let secs_of_day = hour * 3600 + minute * 60 + second;
        let unix_ticks = (days * 86400 + secs_of_day) * TICKS_PER_SECOND + frac_nanos / 100;
        Ok(UtcTime(unix_ticks + UA_TO_UNIX_EPOCH_OFFSET_SECS * TICKS_PER_SECOND))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context<'static> {
        Context::opaque()
    }

    fn encode<T: XmlEncodable>(value: &T, name: &str) -> String {
        let mut writer = Writer::new(Vec::new());
        value.encode_xml(&mut writer, name, &ctx()).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    fn decode<T: XmlDecodable>(xml: &str) -> T {
        let mut reader = Reader::from_str(xml);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf).unwrap() {
                Event::Start(start) => return T::decode_xml(&mut reader, &start, &ctx()).unwrap(),
                Event::Eof => panic!("no start element"),
                _ => {}
            }
            buf.clear();
        }
    }

    #[test]
    fn bool_maps_to_true_false() {
        assert_eq!(encode(&true, "Value"), "<Value>true</Value>");
        assert_eq!(encode(&false, "Value"), "<Value>false</Value>");
        assert!(decode::<bool>("<Value>true</Value>"));
    }

    #[test]
    fn non_finite_floats_use_ua_tokens() {
        assert_eq!(encode(&f64::NAN, "Value"), "<Value>NaN</Value>");
        assert_eq!(encode(&f64::INFINITY, "Value"), "<Value>INF</Value>");
        assert_eq!(encode(&f64::NEG_INFINITY, "Value"), "<Value>-INF</Value>");
        assert!(decode::<f64>("<Value>NaN</Value>").is_nan());
        assert_eq!(decode::<f64>("<Value>INF</Value>"), f64::INFINITY);
    }

    #[test]
    fn node_id_xml_round_trips() {
        let id = NodeId::string(2, "Temperature");
        let xml = encode(&id, "NodeId");
        assert_eq!(xml, "<NodeId><Identifier>ns=2;s=Temperature</Identifier></NodeId>");
        assert_eq!(decode::<NodeId>(&xml), id);
    }

    #[test]
    fn guid_xml_round_trips() {
        let guid = Guid::from_parts(1, 2, 3, [4, 5, 6, 7, 8, 9, 10, 11]);
        let xml = encode(&guid, "Guid");
        assert!(xml.starts_with("<Guid><String>"));
        assert_eq!(decode::<Guid>(&xml), guid);
    }

    #[test]
    fn bytestring_is_base64() {
        let bs = ByteString::from(vec![0, 1, 2, 3]);
        let xml = encode(&bs, "Value");
        assert_eq!(xml, "<Value>AAECAw==</Value>");
        assert_eq!(decode::<ByteString>(&xml), bs);
    }

    #[test]
    fn datetime_round_trips_without_fraction() {
        let dt = UtcTime::from_system_time(
            std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000),
        );
        let xml = encode(&dt, "Value");
        assert!(xml.ends_with("Z</Value>"));
        assert_eq!(decode::<UtcTime>(&xml), dt);
    }

    #[test]
    fn datetime_round_trips_with_fraction() {
        let dt = UtcTime(UA_TO_UNIX_EPOCH_OFFSET_SECS * TICKS_PER_SECOND + 12_345);
        let xml = encode(&dt, "Value");
        assert!(xml.contains('.'));
        assert_eq!(decode::<UtcTime>(&xml), dt);
    }
}
