//! The XML-RPC codec.
//!
//! Decoding drives `quick-xml`'s pull parser over the type-tag grammar;
//! encoding renders through its event writer, optionally wrapping the
//! value in a request, response, or fault envelope selected by
//! [`SerializationConfig::rpc`].

use std::borrow::Cow;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use wf_value::{Value, ValueMap};

use crate::codec::{Codec, MAX_DECODE_DEPTH};
use crate::config::{RpcFlags, SerializationConfig};
use crate::error::CodecError;
use crate::framing::{BoundaryScanner, XmlBoundaryScanner};
use crate::text;

// -----------------------------------------------------------------------------
// XmlRpcCodec

/// The XML-RPC wire format.
///
/// Values map onto the type-tag grammar: `<string>`, `<int>`/`<i4>` (with
/// `<i8>` for integers outside the 32-bit range), `<boolean>` as `1`/`0`,
/// `<double>`, `<base64>` for [`Value::Bytes`], `<array>`, `<struct>`,
/// and `<nil/>` for [`Value::Null`]. A `<dateTime.iso8601>` element
/// decodes to [`Value::Text`] carrying the raw timestamp; interpreting it
/// is left to the binding layer. Untagged `<value>` content is a string,
/// as the protocol specifies.
///
/// [`SerializationConfig::rpc`] selects envelope framing. With
/// [`RpcFlags::REQUEST`] the value must be the parameter list (or
/// [`Value::Null`] for a zero-argument call) and
/// [`SerializationConfig::rpc_method`] must name the method; decoding
/// yields a map of `methodName` and `params`. [`RpcFlags::RESPONSE`]
/// carries one return value, [`RpcFlags::FAULT`] a map exposing an
/// integer `faultCode` and a text `faultString`. Without a flag the
/// document is a bare `<value>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlRpcCodec;

impl Codec for XmlRpcCodec {
    fn format_name(&self) -> &'static str {
        "xml-rpc"
    }

    fn encode(&self, value: &Value, config: &SerializationConfig) -> Result<Vec<u8>, CodecError> {
        config.validate()?;
        let writer = if config.pretty {
            Writer::new_with_indent(Vec::new(), b' ', 2)
        } else {
            Writer::new(Vec::new())
        };
        let mut encoder = Encoder { writer };
        encoder.declaration(config.encoding.name())?;
        if config.rpc.contains(RpcFlags::REQUEST) {
            encoder.write_request(value, config)?;
        } else if config.rpc.contains(RpcFlags::RESPONSE) {
            encoder.write_response(value)?;
        } else if config.rpc.contains(RpcFlags::FAULT) {
            encoder.write_fault(value)?;
        } else {
            encoder.write_value(value)?;
        }
        let rendered = String::from_utf8(encoder.into_bytes())
            .map_err(|_| CodecError::Encoding("the XML writer produced invalid UTF-8".into()))?;
        text::encode(rendered, config.encoding)
    }

    fn decode(&self, bytes: &[u8], config: &SerializationConfig) -> Result<Value, CodecError> {
        config.validate()?;
        let decoded = text::decode(bytes, config.encoding)?;
        let mut decoder = Decoder { reader: Reader::from_reader(decoded.as_bytes()), depth: 0 };
        let value = if config.rpc.contains(RpcFlags::REQUEST) {
            decoder.decode_request()?
        } else if config.rpc.contains(RpcFlags::RESPONSE) {
            decoder.decode_response(false)?
        } else if config.rpc.contains(RpcFlags::FAULT) {
            decoder.decode_response(true)?
        } else {
            decoder.decode_value()?
        };
        decoder.expect_eof()?;
        Ok(value)
    }

    fn boundary_scanner(&self, start_depth: usize) -> Box<dyn BoundaryScanner> {
        Box::new(XmlBoundaryScanner::new(start_depth))
    }
}

// -----------------------------------------------------------------------------
// Decoder

struct Decoder<'a> {
    reader: Reader<&'a [u8]>,
    depth: usize,
}

fn is_tag(start: &BytesStart<'_>, tag: &str) -> bool {
    start.local_name().as_ref() == tag.as_bytes()
}

fn is_end(end: &BytesEnd<'_>, tag: &str) -> bool {
    end.local_name().as_ref() == tag.as_bytes()
}

fn is_blank(text: &BytesText<'_>) -> bool {
    text.iter().all(|&byte| matches!(byte, b' ' | b'\t' | b'\r' | b'\n'))
}

impl<'a> Decoder<'a> {
    /// RPC request document: `methodCall` wrapping `methodName` and
    /// optional `params`. Yields a map of `methodName` and `params`.
    fn decode_request(&mut self) -> Result<Value, CodecError> {
        self.expect_start("methodCall")?;
        self.expect_start("methodName")?;
        let method = self.text_until_end("methodName")?;
        let mut params = Vec::new();
        loop {
            match self.next_event()? {
                Event::Start(start) if is_tag(&start, "params") => loop {
                    match self.next_event()? {
                        Event::Start(start) if is_tag(&start, "param") => {
                            params.push(self.decode_value()?);
                            self.expect_end("param")?;
                        }
                        Event::End(end) if is_end(&end, "params") => break,
                        other => return Err(self.unexpected(&other, "<param> or </params>")),
                    }
                },
                Event::Empty(start) if is_tag(&start, "params") => {}
                Event::End(end) if is_end(&end, "methodCall") => break,
                other => return Err(self.unexpected(&other, "<params> or </methodCall>")),
            }
        }
        let mut map = ValueMap::new();
        map.insert("methodName", Value::Text(method.trim().to_owned()));
        map.insert("params", Value::List(params));
        Ok(Value::Map(map))
    }

    /// RPC response document. Returns the single return value, or the
    /// fault struct when the document carries `<fault>`. With
    /// `require_fault` a plain response is rejected.
    fn decode_response(&mut self, require_fault: bool) -> Result<Value, CodecError> {
        self.expect_start("methodResponse")?;
        let value = match self.next_event()? {
            Event::Start(start) if is_tag(&start, "fault") => {
                log::debug!("response document carries a fault");
                let fault = self.decode_value()?;
                self.expect_end("fault")?;
                fault
            }
            Event::Start(start) if is_tag(&start, "params") && !require_fault => {
                self.expect_start("param")?;
                let value = self.decode_value()?;
                self.expect_end("param")?;
                self.expect_end("params")?;
                value
            }
            other => {
                let wanted = if require_fault { "<fault>" } else { "<params> or <fault>" };
                return Err(self.unexpected(&other, wanted));
            }
        };
        self.expect_end("methodResponse")?;
        Ok(value)
    }

    /// One `<value>` element, including its end tag.
    fn decode_value(&mut self) -> Result<Value, CodecError> {
        match self.next_event()? {
            Event::Start(start) if is_tag(&start, "value") => self.decode_value_body(),
            Event::Empty(start) if is_tag(&start, "value") => Ok(Value::Text(String::new())),
            other => Err(self.unexpected(&other, "<value>")),
        }
    }

    /// Everything after a consumed `<value>` start tag, through the
    /// matching `</value>`.
    fn decode_value_body(&mut self) -> Result<Value, CodecError> {
        self.enter()?;
        let value = match self.next_event()? {
            // Untagged content is a string; the protocol's default type.
            first @ (Event::Text(_) | Event::CData(_)) => {
                let mut content = self.event_text(&first)?;
                loop {
                    match self.next_raw()? {
                        Event::Text(text) => {
                            let piece = self.unescape(&text)?;
                            content.push_str(&piece);
                        }
                        Event::CData(data) => {
                            content.push_str(&String::from_utf8_lossy(&data[..]));
                        }
                        Event::Comment(_) | Event::PI(_) => {}
                        Event::End(end) if is_end(&end, "value") => break,
                        other => return Err(self.unexpected(&other, "</value>")),
                    }
                }
                self.leave();
                return Ok(Value::Text(content));
            }
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                let value = match name.as_str() {
                    "string" => Value::Text(self.text_until_end(&name)?),
                    "int" | "i4" | "i8" => self.leaf_int(&name)?,
                    "boolean" => self.leaf_bool(&name)?,
                    "double" => self.leaf_double(&name)?,
                    // The raw timestamp; binding layers interpret it.
                    "dateTime.iso8601" => {
                        Value::Text(self.text_until_end(&name)?.trim().to_owned())
                    }
                    "base64" => self.leaf_base64(&name)?,
                    "array" => self.decode_array()?,
                    "struct" => self.decode_struct()?,
                    "nil" => {
                        self.expect_end("nil")?;
                        Value::Null
                    }
                    other => return Err(self.here(format!("unknown type element <{other}>"))),
                };
                self.expect_end("value")?;
                value
            }
            Event::Empty(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                let value = match name.as_str() {
                    "nil" => Value::Null,
                    "string" => Value::Text(String::new()),
                    "base64" => Value::Bytes(Vec::new()),
                    "array" => Value::List(Vec::new()),
                    "struct" => Value::Map(ValueMap::new()),
                    other => return Err(self.here(format!("element <{other}/> has no content"))),
                };
                self.expect_end("value")?;
                value
            }
            Event::End(end) if is_end(&end, "value") => {
                self.leave();
                return Ok(Value::Text(String::new()));
            }
            other => return Err(self.unexpected(&other, "a type element or text")),
        };
        self.leave();
        Ok(value)
    }

    fn decode_array(&mut self) -> Result<Value, CodecError> {
        let mut items = Vec::new();
        match self.next_event()? {
            Event::Start(start) if is_tag(&start, "data") => loop {
                match self.next_event()? {
                    Event::Start(start) if is_tag(&start, "value") => {
                        items.push(self.decode_value_body()?);
                    }
                    Event::Empty(start) if is_tag(&start, "value") => {
                        items.push(Value::Text(String::new()));
                    }
                    Event::End(end) if is_end(&end, "data") => break,
                    other => return Err(self.unexpected(&other, "<value> or </data>")),
                }
            },
            Event::Empty(start) if is_tag(&start, "data") => {}
            other => return Err(self.unexpected(&other, "<data>")),
        }
        self.expect_end("array")?;
        Ok(Value::List(items))
    }

    fn decode_struct(&mut self) -> Result<Value, CodecError> {
        let mut map = ValueMap::new();
        loop {
            match self.next_event()? {
                Event::Start(start) if is_tag(&start, "member") => {
                    self.expect_start("name")?;
                    let key = self.text_until_end("name")?;
                    let value = self.decode_value()?;
                    self.expect_end("member")?;
                    if map.insert(&*key, value).is_some() {
                        log::debug!("duplicate member `{key}` keeps its last value");
                    }
                }
                Event::End(end) if is_end(&end, "struct") => return Ok(Value::Map(map)),
                other => return Err(self.unexpected(&other, "<member> or </struct>")),
            }
        }
    }

    // ---- leaf parsers ----

    fn leaf_int(&mut self, tag: &str) -> Result<Value, CodecError> {
        let content = self.text_until_end(tag)?;
        let trimmed = content.trim();
        match trimmed.parse::<i64>() {
            Ok(number) => Ok(Value::Int(number)),
            Err(_) => Err(self.here(format!("malformed integer `{trimmed}`"))),
        }
    }

    fn leaf_bool(&mut self, tag: &str) -> Result<Value, CodecError> {
        let content = self.text_until_end(tag)?;
        match content.trim() {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            other => Err(self.here(format!("malformed boolean `{other}`, expected 0 or 1"))),
        }
    }

    fn leaf_double(&mut self, tag: &str) -> Result<Value, CodecError> {
        let content = self.text_until_end(tag)?;
        let trimmed = content.trim();
        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(Value::Float(number)),
            _ => Err(self.here(format!("malformed double `{trimmed}`"))),
        }
    }

    fn leaf_base64(&mut self, tag: &str) -> Result<Value, CodecError> {
        let content = self.text_until_end(tag)?;
        // Transports conventionally wrap base64 payloads in whitespace.
        let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        match BASE64.decode(&compact) {
            Ok(bytes) => Ok(Value::Bytes(bytes)),
            Err(error) => Err(self.here(format!("malformed base64 payload: {error}"))),
        }
    }

    /// Collects text and CDATA content until the named end tag, keeping
    /// interior whitespace intact.
    fn text_until_end(&mut self, tag: &str) -> Result<String, CodecError> {
        let mut content = String::new();
        loop {
            match self.next_raw()? {
                Event::Text(text) => {
                    let piece = self.unescape(&text)?;
                    content.push_str(&piece);
                }
                Event::CData(data) => content.push_str(&String::from_utf8_lossy(&data[..])),
                Event::Comment(_) | Event::PI(_) => {}
                Event::End(end) if is_end(&end, tag) => return Ok(content),
                other => return Err(self.unexpected(&other, &format!("</{tag}>"))),
            }
        }
    }

    // ---- event plumbing ----

    /// The next structurally interesting event: comments, declarations,
    /// processing instructions, doctypes, and whitespace-only text are
    /// skipped.
    fn next_event(&mut self) -> Result<Event<'a>, CodecError> {
        loop {
            match self.next_raw()? {
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Text(text) if is_blank(&text) => {}
                other => return Ok(other),
            }
        }
    }

    fn next_raw(&mut self) -> Result<Event<'a>, CodecError> {
        self.reader.read_event().map_err(|error| self.here(format!("{error}")))
    }

    fn expect_start(&mut self, tag: &str) -> Result<(), CodecError> {
        match self.next_event()? {
            Event::Start(start) if is_tag(&start, tag) => Ok(()),
            other => Err(self.unexpected(&other, &format!("<{tag}>"))),
        }
    }

    fn expect_end(&mut self, tag: &str) -> Result<(), CodecError> {
        match self.next_event()? {
            Event::End(end) if is_end(&end, tag) => Ok(()),
            other => Err(self.unexpected(&other, &format!("</{tag}>"))),
        }
    }

    /// Verifies that nothing but ignorable events remain.
    fn expect_eof(&mut self) -> Result<(), CodecError> {
        match self.next_event()? {
            Event::Eof => Ok(()),
            other => Err(self.unexpected(&other, "end of document")),
        }
    }

    fn event_text(&self, event: &Event<'_>) -> Result<String, CodecError> {
        match event {
            Event::Text(text) => self.unescape(text),
            Event::CData(data) => Ok(String::from_utf8_lossy(&data[..]).into_owned()),
            _ => Ok(String::new()),
        }
    }

    fn unescape(&self, text: &BytesText<'_>) -> Result<String, CodecError> {
        text.unescape().map(Cow::into_owned).map_err(|error| self.here(format!("{error}")))
    }

    fn enter(&mut self) -> Result<(), CodecError> {
        self.depth += 1;
        if self.depth > MAX_DECODE_DEPTH {
            return Err(self.here(format!("nesting exceeds {MAX_DECODE_DEPTH} levels")));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn position(&self) -> usize {
        usize::try_from(self.reader.buffer_position()).unwrap_or(usize::MAX)
    }

    fn here(&self, message: impl Into<String>) -> CodecError {
        CodecError::syntax(self.position(), message)
    }

    fn unexpected(&self, event: &Event<'_>, wanted: &str) -> CodecError {
        let found = match event {
            Event::Start(start) => {
                format!("<{}>", String::from_utf8_lossy(start.name().as_ref()))
            }
            Event::Empty(start) => {
                format!("<{}/>", String::from_utf8_lossy(start.name().as_ref()))
            }
            Event::End(end) => format!("</{}>", String::from_utf8_lossy(end.name().as_ref())),
            Event::Text(_) | Event::CData(_) => "text content".to_owned(),
            Event::Eof => "end of document".to_owned(),
            _ => "unexpected markup".to_owned(),
        };
        self.here(format!("expected {wanted}, found {found}"))
    }
}

// -----------------------------------------------------------------------------
// Encoder

struct Encoder {
    writer: Writer<Vec<u8>>,
}

impl Encoder {
    fn write_request(
        &mut self,
        value: &Value,
        config: &SerializationConfig,
    ) -> Result<(), CodecError> {
        let method = config
            .rpc_method
            .as_deref()
            .filter(|method| !method.is_empty())
            .ok_or_else(|| {
                CodecError::Configuration("request framing requires a method name".into())
            })?;
        let params = match value {
            Value::List(items) => Some(items.as_slice()),
            // A zero-argument call; the params block is omitted entirely.
            Value::Null => None,
            other => {
                return Err(CodecError::Structure(format!(
                    "request parameters must be a list, got {}",
                    other.kind()
                )));
            }
        };
        self.start("methodCall")?;
        self.leaf("methodName", method)?;
        if let Some(params) = params {
            self.start("params")?;
            for param in params {
                self.start("param")?;
                self.write_value(param)?;
                self.end("param")?;
            }
            self.end("params")?;
        }
        self.end("methodCall")
    }

    fn write_response(&mut self, value: &Value) -> Result<(), CodecError> {
        self.start("methodResponse")?;
        self.start("params")?;
        self.start("param")?;
        self.write_value(value)?;
        self.end("param")?;
        self.end("params")?;
        self.end("methodResponse")
    }

    fn write_fault(&mut self, value: &Value) -> Result<(), CodecError> {
        let map = value.as_map().ok_or_else(|| {
            CodecError::Structure(format!("fault framing requires a map, got {}", value.kind()))
        })?;
        if !matches!(map.get("faultCode"), Some(Value::Int(_))) {
            return Err(CodecError::Structure(
                "fault framing requires an integer `faultCode`".into(),
            ));
        }
        if !matches!(map.get("faultString"), Some(Value::Text(_))) {
            return Err(CodecError::Structure(
                "fault framing requires a text `faultString`".into(),
            ));
        }
        self.start("methodResponse")?;
        self.start("fault")?;
        self.write_value(value)?;
        self.end("fault")?;
        self.end("methodResponse")
    }

    fn write_value(&mut self, value: &Value) -> Result<(), CodecError> {
        self.start("value")?;
        match value {
            Value::Null => self.empty("nil")?,
            Value::Bool(flag) => self.leaf("boolean", if *flag { "1" } else { "0" })?,
            Value::Int(number) => {
                if i32::try_from(*number).is_ok() {
                    self.leaf("int", &number.to_string())?;
                } else {
                    self.leaf("i8", &number.to_string())?;
                }
            }
            Value::Float(number) => {
                if !number.is_finite() {
                    return Err(CodecError::Structure(format!(
                        "XML-RPC has no representation for the non-finite number {number}"
                    )));
                }
                let mut text = number.to_string();
                if !text.contains('.') {
                    text.push_str(".0");
                }
                self.leaf("double", &text)?;
            }
            Value::Text(content) => self.leaf("string", content)?,
            Value::Bytes(bytes) => self.leaf("base64", &BASE64.encode(bytes))?,
            Value::List(items) => {
                self.start("array")?;
                self.start("data")?;
                for item in items {
                    self.write_value(item)?;
                }
                self.end("data")?;
                self.end("array")?;
            }
            Value::Map(map) => {
                self.start("struct")?;
                for (key, entry) in map.iter() {
                    self.start("member")?;
                    self.leaf("name", key)?;
                    self.write_value(entry)?;
                    self.end("member")?;
                }
                self.end("struct")?;
            }
        }
        self.end("value")
    }

    // ---- event plumbing ----

    fn declaration(&mut self, encoding: &str) -> Result<(), CodecError> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some(encoding), None)))
            .map_err(write_error)
    }

    fn start(&mut self, tag: &str) -> Result<(), CodecError> {
        self.writer.write_event(Event::Start(BytesStart::new(tag))).map_err(write_error)
    }

    fn end(&mut self, tag: &str) -> Result<(), CodecError> {
        self.writer.write_event(Event::End(BytesEnd::new(tag))).map_err(write_error)
    }

    fn empty(&mut self, tag: &str) -> Result<(), CodecError> {
        self.writer.write_event(Event::Empty(BytesStart::new(tag))).map_err(write_error)
    }

    fn leaf(&mut self, tag: &str, content: &str) -> Result<(), CodecError> {
        self.start(tag)?;
        self.writer.write_event(Event::Text(BytesText::new(content))).map_err(write_error)?;
        self.end(tag)
    }

    fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

fn write_error(error: impl std::fmt::Display) -> CodecError {
    CodecError::Structure(format!("XML write failed: {error}"))
}

// -----------------------------------------------------------------------------
// Tests
