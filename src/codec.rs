//! Direct `Value <-> XML` codec.
//!
//! Unlike [`crate::util::value`], which bridges arbitrary `serde` types through a
//! generic `Visitor`, this module reads and writes [`Value`] trees directly. That
//! distinction matters for one tag: a generic `Visitor` sees `<dateTime.iso8601>` and
//! `<string>` identically (both arrive as `visit_str`), which would silently turn every
//! decoded `Value::DateTime` into a `Value::String`. Matching on the tag name ourselves
//! keeps that distinction intact, so this is the codec the registry, client and
//! `ParamList` build requests and responses with.

use std::borrow::Cow;

use base64::prelude::*;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};

use crate::error::{EncodingError, Fault, ParseError};
use crate::util::{ReaderExt, WriterExt};
use crate::value::{DateTime, Members};
use crate::{Result, Value};

/// Decodes XML entity references (`&amp;`, `&lt;`, ...) in text read via `read_text`,
/// which (unlike `BytesText::unescape`) returns its content verbatim.
fn unescape(raw: &str) -> Result<Cow<'_, str>> {
    quick_xml::escape::unescape(raw)
        .map_err(|e| ParseError::from(quick_xml::Error::from(e)).into())
}

/// Parses a `<value>...</value>` element, consuming its start and end tags.
pub fn read_value(reader: &mut Reader<&[u8]>) -> Result<Value> {
    reader.expect_tag(QName(b"value"))?;
    read_value_body(reader)
}

/// Parses the contents of a `<value>` element whose start tag has already been consumed.
fn read_value_body(reader: &mut Reader<&[u8]>) -> Result<Value> {
    let value = match reader.read_event().map_err(ParseError::from)? {
        // A bare value with no inner tag is a string, per the XML-RPC spec's informal
        // relaxation of the grammar.
        Event::Text(e) => Value::string(e.unescape().map_err(ParseError::from)?.into_owned()),

        Event::End(ref e) if e.name() == QName(b"value") => return Ok(Value::string("")),

        Event::Start(ref e) => {
            let tagged = match e.name() {
                QName(b"int") | QName(b"i4") => {
                    let text = reader.read_text(e.name()).map_err(ParseError::from)?;
                    Value::int(text.parse().map_err(ParseError::from)?)
                }
                QName(b"boolean") => {
                    let text = reader.read_text(e.name()).map_err(ParseError::from)?;
                    match text.as_ref() {
                        "1" => Value::bool(true),
                        "0" => Value::bool(false),
                        _ => return Err(ParseError::BooleanDecodeError(text.into_owned()).into()),
                    }
                }
                QName(b"string") => {
                    let text = reader.read_text(e.name()).map_err(ParseError::from)?;
                    Value::string(unescape(&text)?.into_owned())
                }
                QName(b"double") => {
                    let text = reader.read_text(e.name()).map_err(ParseError::from)?;
                    let parsed: f64 = text.parse().map_err(ParseError::from)?;
                    if !parsed.is_finite() {
                        return Err(ParseError::DoubleDecodeError(text.into_owned()).into());
                    }
                    Value::double(parsed)
                }
                QName(b"dateTime.iso8601") => {
                    let text = reader.read_text(e.name()).map_err(ParseError::from)?;
                    Value::datetime(DateTime::parse(text.as_ref())?)
                }
                QName(b"base64") => {
                    let text = reader.read_text(e.name()).map_err(ParseError::from)?;
                    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                    Value::bytestring(BASE64_STANDARD.decode(cleaned).map_err(ParseError::from)?)
                }
                QName(b"struct") => Value::from_members(read_struct_members(reader)?),
                QName(b"array") => Value::array(read_array_elements(reader)?),
                QName(b"nil") => {
                    reader.read_to_end(e.name()).map_err(ParseError::from)?;
                    Value::nil()
                }
                _ => {
                    return Err(ParseError::UnexpectedTag(
                        String::from_utf8_lossy(e.name().into_inner()).into(),
                        "one of int|i4|boolean|string|double|dateTime.iso8601|base64|struct|array|nil"
                            .into(),
                    )
                    .into())
                }
            };
            tagged
        }

        Event::Eof => return Err(ParseError::UnexpectedEOF("value".into()).into()),
        _ => return Err(ParseError::UnexpectedEvent("value".into()).into()),
    };

    reader
        .read_to_end(QName(b"value"))
        .map_err(ParseError::from)?;

    Ok(value)
}

fn read_struct_members(reader: &mut Reader<&[u8]>) -> Result<Members> {
    let mut members = Members::new();
    loop {
        match reader.read_event().map_err(ParseError::from)? {
            Event::End(ref e) if e.name() == QName(b"struct") => break,
            Event::Start(ref e) if e.name() == QName(b"member") => {
                reader.expect_tag(QName(b"name"))?;
                let key = unescape(&reader.read_text(QName(b"name")).map_err(ParseError::from)?)?
                    .into_owned();
                let value = read_value(reader)?;
                reader
                    .read_to_end(QName(b"member"))
                    .map_err(ParseError::from)?;
                members.insert(key, value);
            }
            Event::Eof => return Err(ParseError::UnexpectedEOF("struct".into()).into()),
            _ => return Err(ParseError::UnexpectedEvent("struct".into()).into()),
        }
    }
    Ok(members)
}

fn read_array_elements(reader: &mut Reader<&[u8]>) -> Result<Vec<Value>> {
    reader.expect_tag(QName(b"data"))?;
    let mut elements = Vec::new();
    loop {
        match reader.read_event().map_err(ParseError::from)? {
            Event::End(ref e) if e.name() == QName(b"data") => break,
            Event::Start(ref e) if e.name() == QName(b"value") => {
                elements.push(read_value_body(reader)?);
            }
            Event::Eof => return Err(ParseError::UnexpectedEOF("array".into()).into()),
            _ => return Err(ParseError::UnexpectedEvent("array".into()).into()),
        }
    }
    reader
        .read_to_end(QName(b"array"))
        .map_err(ParseError::from)?;
    Ok(elements)
}

/// Writes a `<value>...</value>` element for `value`.
pub fn write_value<W: std::io::Write>(writer: &mut Writer<W>, value: &Value) -> Result<()> {
    writer.write_start_tag("value")?;
    write_value_body(writer, value)?;
    writer.write_end_tag("value")?;
    Ok(())
}

fn write_value_body<W: std::io::Write>(writer: &mut Writer<W>, value: &Value) -> Result<()> {
    match value {
        Value::Int32(i) => writer.write_safe_tag("int", &i.to_string())?,
        Value::Bool(b) => writer.write_safe_tag("boolean", if *b { "1" } else { "0" })?,
        Value::Double(d) => {
            if !d.is_finite() {
                return Err(EncodingError::NonFiniteDouble(*d).into());
            }
            writer.write_safe_tag("double", &d.to_string())?
        }
        Value::DateTime(dt) => writer.write_safe_tag("dateTime.iso8601", &dt.to_string())?,
        Value::String(s) => writer.write_tag("string", s)?,
        Value::Bytestring(bytes) => {
            writer.write_safe_tag("base64", &BASE64_STANDARD.encode(bytes.as_slice()))?
        }
        Value::Struct(members) => {
            writer.write_start_tag("struct")?;
            for (key, member) in members.iter() {
                writer.write_start_tag("member")?;
                writer.write_tag("name", key)?;
                write_value(writer, member)?;
                writer.write_end_tag("member")?;
            }
            writer.write_end_tag("struct")?;
        }
        Value::Array(elements) => {
            writer.write_start_tag("array")?;
            writer.write_start_tag("data")?;
            for element in elements.iter() {
                write_value(writer, element)?;
            }
            writer.write_end_tag("data")?;
            writer.write_end_tag("array")?;
        }
        Value::Nil => {
            writer
                .write_event(Event::Empty(BytesStart::new("nil")))
                .map_err(EncodingError::from)?;
        }
        Value::Placeholder => {
            return Err(crate::error::ValueError::Uninitialized.into());
        }
    }
    Ok(())
}

/// Reads the next event, rejecting non-whitespace text and skipping whitespace-only
/// text and XML declarations. Used between the structural elements of a `methodCall`
/// or `methodResponse` document, where the grammar allows no content of its own.
fn next_structural_event(reader: &mut Reader<&[u8]>) -> Result<Event<'static>> {
    loop {
        match reader.read_event().map_err(ParseError::from)? {
            Event::Decl(_) => continue,
            Event::Text(e) => {
                let text = e.unescape().map_err(ParseError::from)?;
                if text.trim().is_empty() {
                    continue;
                }
                return Err(ParseError::MalformedRpc(format!(
                    "unexpected text outside of a <value>: {:?}",
                    text
                ))
                .into());
            }
            other => return Ok(other.into_owned()),
        }
    }
}

fn expect_end(reader: &mut Reader<&[u8]>, name: &str) -> Result<()> {
    match next_structural_event(reader)? {
        Event::End(ref e) if e.name() == QName(name.as_bytes()) => Ok(()),
        other => Err(ParseError::MalformedRpc(format!(
            "expected end tag </{}>, found {:?}",
            name, other
        ))
        .into()),
    }
}

/// Parses a `<methodCall>` document into its method name and ordered parameters.
pub fn parse_method_call(xml: &str) -> Result<(String, Vec<Value>)> {
    let mut reader = Reader::from_str(xml);
    reader.expand_empty_elements(true);
    reader.trim_text(true);

    reader.expect_tag(QName(b"methodCall"))?;
    reader.expect_tag(QName(b"methodName"))?;
    let name = unescape(&reader.read_text(QName(b"methodName")).map_err(ParseError::from)?)?
        .into_owned();

    let mut params = Vec::new();
    match next_structural_event(&mut reader)? {
        Event::Start(ref e) if e.name() == QName(b"params") => {
            loop {
                match next_structural_event(&mut reader)? {
                    Event::End(ref e) if e.name() == QName(b"params") => break,
                    Event::Start(ref e) if e.name() == QName(b"param") => {
                        params.push(read_value(&mut reader)?);
                        expect_end(&mut reader, "param")?;
                    }
                    other => {
                        return Err(ParseError::MalformedRpc(format!(
                            "expected <param> or </params>, found {:?}",
                            other
                        ))
                        .into())
                    }
                }
            }
            expect_end(&mut reader, "methodCall")?;
        }
        Event::End(ref e) if e.name() == QName(b"methodCall") => {}
        other => {
            return Err(ParseError::MalformedRpc(format!(
                "expected <params> or </methodCall>, found {:?}",
                other
            ))
            .into())
        }
    }

    Ok((name, params))
}

/// The outcome of a `<methodResponse>`: either the single result value, or a fault.
pub type MethodOutcome = std::result::Result<Value, Fault>;

/// Parses a `<methodResponse>` document.
pub fn parse_method_response(xml: &str) -> Result<MethodOutcome> {
    let mut reader = Reader::from_str(xml);
    reader.expand_empty_elements(true);
    reader.trim_text(true);

    reader.expect_tag(QName(b"methodResponse"))?;

    let outcome = match next_structural_event(&mut reader)? {
        Event::Start(ref e) if e.name() == QName(b"params") => {
            reader.expect_tag(QName(b"param"))?;
            let value = read_value(&mut reader)?;
            expect_end(&mut reader, "param")?;
            expect_end(&mut reader, "params")?;
            Ok(value)
        }
        Event::Start(ref e) if e.name() == QName(b"fault") => {
            let value = read_value(&mut reader)?;
            expect_end(&mut reader, "fault")?;
            let code = value
                .struct_get("faultCode")
                .map_err(|e| ParseError::ParseFaultError(e.to_string()))?
                .as_i32()
                .map_err(|e| ParseError::ParseFaultError(e.to_string()))?;
            let description = value
                .struct_get("faultString")
                .map_err(|e| ParseError::ParseFaultError(e.to_string()))?
                .as_str()
                .map_err(|e| ParseError::ParseFaultError(e.to_string()))?
                .to_string();
            Err(Fault::new(code, description))
        }
        other => {
            return Err(ParseError::MalformedRpc(format!(
                "expected <params> or <fault>, found {:?}",
                other
            ))
            .into())
        }
    };

    expect_end(&mut reader, "methodResponse")?;

    Ok(outcome)
}

/// Writes a `<methodCall>` document invoking `name` with `params`.
pub fn write_method_call(name: &str, params: &[Value]) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(EncodingError::from)?;

    writer.write_start_tag("methodCall")?;
    writer.write_tag("methodName", name)?;
    writer.write_start_tag("params")?;
    for param in params {
        writer.write_start_tag("param")?;
        write_value(&mut writer, param)?;
        writer.write_end_tag("param")?;
    }
    writer.write_end_tag("params")?;
    writer.write_end_tag("methodCall")?;

    String::from_utf8(writer.into_inner())
        .map_err(EncodingError::from)
        .map_err(Into::into)
}

/// Writes a `<methodResponse>` document carrying `outcome`.
pub fn write_method_response(outcome: &MethodOutcome) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(EncodingError::from)?;

    writer.write_start_tag("methodResponse")?;
    match outcome {
        Ok(value) => {
            writer.write_start_tag("params")?;
            writer.write_start_tag("param")?;
            write_value(&mut writer, value)?;
            writer.write_end_tag("param")?;
            writer.write_end_tag("params")?;
        }
        Err(fault) => {
            let mut members = Members::new();
            members.insert("faultCode".to_string(), Value::int(fault.code));
            members.insert(
                "faultString".to_string(),
                Value::string(fault.description.clone()),
            );
            writer.write_start_tag("fault")?;
            write_value(&mut writer, &Value::from_members(members))?;
            writer.write_end_tag("fault")?;
        }
    }
    writer.write_end_tag("methodResponse")?;

    String::from_utf8(writer.into_inner())
        .map_err(EncodingError::from)
        .map_err(Into::into)
}
