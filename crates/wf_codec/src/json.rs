//! The JSON codec.
//!
//! The reader is a hand-rolled recursive-descent parser over the decoded
//! text, byte-indexed so every [`CodecError::Syntax`] carries the offset
//! of the offending character. The writer renders compact output by
//! default and two-space indentation when [`SerializationConfig::pretty`]
//! is set.

use std::fmt::Write as _;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use wf_value::{Value, ValueMap};

use crate::codec::{Codec, MAX_DECODE_DEPTH};
use crate::config::SerializationConfig;
use crate::error::CodecError;
use crate::framing::{BoundaryScanner, JsonBoundaryScanner};
use crate::text;

// -----------------------------------------------------------------------------
// JsonCodec

/// Standard JSON.
///
/// Decoding preserves object key order, keeps the last value of a
/// duplicated key, and splits numbers strictly: a literal without
/// fraction or exponent that fits `i64` becomes [`Value::Int`], anything
/// else becomes [`Value::Float`]. Encoding writes [`Value::Bytes`] as
/// Base64 text since JSON has no blob type; decoded text is never turned
/// back into bytes.
///
/// Non-finite floats have no JSON spelling and fail encoding with
/// [`CodecError::Structure`]. RPC envelope flags do not apply to this
/// format and are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn format_name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, value: &Value, config: &SerializationConfig) -> Result<Vec<u8>, CodecError> {
        config.validate()?;
        let mut out = String::new();
        Writer { pretty: config.pretty }.write(&mut out, value, 0)?;
        text::encode(out, config.encoding)
    }

    fn decode(&self, bytes: &[u8], config: &SerializationConfig) -> Result<Value, CodecError> {
        config.validate()?;
        let decoded = text::decode(bytes, config.encoding)?;
        Reader::new(&decoded).parse_document()
    }

    fn boundary_scanner(&self, start_depth: usize) -> Box<dyn BoundaryScanner> {
        Box::new(JsonBoundaryScanner::new(start_depth))
    }
}

// -----------------------------------------------------------------------------
// Reader

struct Reader<'a> {
    text: &'a str,
    bytes: &'a [u8],
    cursor: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, bytes: text.as_bytes(), cursor: 0, depth: 0 }
    }

    /// Parses exactly one document; trailing non-whitespace is an error.
    fn parse_document(mut self) -> Result<Value, CodecError> {
        let value = self.parse_value()?;
        self.skip_whitespace();
        if self.cursor < self.bytes.len() {
            return Err(self.error("trailing characters after the document"));
        }
        Ok(value)
    }

    fn parse_value(&mut self) -> Result<Value, CodecError> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => self.parse_string().map(Value::Text),
            Some(b't') => self.parse_keyword(b"true", Value::Bool(true)),
            Some(b'f') => self.parse_keyword(b"false", Value::Bool(false)),
            Some(b'n') => self.parse_keyword(b"null", Value::Null),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            Some(_) => Err(self.error("expected a value")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_object(&mut self) -> Result<Value, CodecError> {
        self.cursor += 1;
        self.enter()?;
        let mut map = ValueMap::new();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.cursor += 1;
            self.leave();
            return Ok(Value::Map(map));
        }
        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'"') {
                return Err(self.error("expected a string key"));
            }
            let key = self.parse_string()?;
            self.skip_whitespace();
            if self.peek() != Some(b':') {
                return Err(self.error("expected `:` after the key"));
            }
            self.cursor += 1;
            let value = self.parse_value()?;
            if map.insert(&*key, value).is_some() {
                log::debug!("duplicate key `{key}` keeps its last value");
            }
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.cursor += 1,
                Some(b'}') => {
                    self.cursor += 1;
                    self.leave();
                    return Ok(Value::Map(map));
                }
                _ => return Err(self.error("expected `,` or `}`")),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, CodecError> {
        self.cursor += 1;
        self.enter()?;
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.cursor += 1;
            self.leave();
            return Ok(Value::List(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.cursor += 1,
                Some(b']') => {
                    self.cursor += 1;
                    self.leave();
                    return Ok(Value::List(items));
                }
                _ => return Err(self.error("expected `,` or `]`")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, CodecError> {
        // The caller verified the opening quote.
        self.cursor += 1;
        let mut out = String::new();
        let mut run_start = self.cursor;
        loop {
            let at = self.cursor;
            let byte = match self.bytes.get(at) {
                Some(&byte) => byte,
                None => return Err(CodecError::syntax(at, "unterminated string")),
            };
            match byte {
                b'"' => {
                    out.push_str(&self.text[run_start..at]);
                    self.cursor = at + 1;
                    return Ok(out);
                }
                b'\\' => {
                    out.push_str(&self.text[run_start..at]);
                    self.cursor = at + 1;
                    self.parse_escape(&mut out)?;
                    run_start = self.cursor;
                }
                0x00..=0x1F => {
                    return Err(CodecError::syntax(at, "unescaped control character in string"));
                }
                _ => self.cursor = at + 1,
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), CodecError> {
        let at = self.cursor;
        let byte = self
            .bytes
            .get(at)
            .copied()
            .ok_or_else(|| CodecError::syntax(at, "unterminated escape sequence"))?;
        self.cursor = at + 1;
        match byte {
            b'"' => out.push('"'),
            b'\\' => out.push('\\'),
            b'/' => out.push('/'),
            b'b' => out.push('\u{0008}'),
            b'f' => out.push('\u{000C}'),
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'u' => {
                let joined = self.parse_unicode_escape(at - 1)?;
                out.push(joined);
            }
            other => {
                return Err(CodecError::syntax(
                    at,
                    format!("invalid escape character `{}`", char::from(other)),
                ));
            }
        }
        Ok(())
    }

    /// Parses the hex digits of a `\u` escape, consuming a second escape
    /// when the first names a high surrogate. `escape_start` is the
    /// offset of the introducing backslash, used for error reporting.
    fn parse_unicode_escape(&mut self, escape_start: usize) -> Result<char, CodecError> {
        let unit = self.parse_hex4()?;
        let joined = match unit {
            0xD800..=0xDBFF => {
                if self.bytes.get(self.cursor) != Some(&b'\\')
                    || self.bytes.get(self.cursor + 1) != Some(&b'u')
                {
                    return Err(CodecError::syntax(escape_start, "unpaired surrogate escape"));
                }
                self.cursor += 2;
                let low = self.parse_hex4()?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(CodecError::syntax(escape_start, "unpaired surrogate escape"));
                }
                0x10000 + ((u32::from(unit) - 0xD800) << 10) + (u32::from(low) - 0xDC00)
            }
            0xDC00..=0xDFFF => {
                return Err(CodecError::syntax(escape_start, "unpaired surrogate escape"));
            }
            unit => u32::from(unit),
        };
        char::from_u32(joined)
            .ok_or_else(|| CodecError::syntax(escape_start, "invalid unicode escape"))
    }

    fn parse_hex4(&mut self) -> Result<u16, CodecError> {
        let mut unit: u16 = 0;
        for _ in 0..4 {
            let at = self.cursor;
            let digit = self
                .bytes
                .get(at)
                .and_then(|&byte| char::from(byte).to_digit(16))
                .ok_or_else(|| CodecError::syntax(at, "expected four hex digits"))?;
            self.cursor = at + 1;
            unit = (unit << 4) | digit as u16;
        }
        Ok(unit)
    }

    fn parse_number(&mut self) -> Result<Value, CodecError> {
        let start = self.cursor;
        if self.peek() == Some(b'-') {
            self.cursor += 1;
        }
        match self.peek() {
            Some(b'0') => self.cursor += 1,
            Some(b'1'..=b'9') => self.eat_digits(),
            _ => return Err(self.error("expected a digit")),
        }
        let mut integral = true;
        if self.peek() == Some(b'.') {
            integral = false;
            self.cursor += 1;
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.error("expected a digit after the decimal point"));
            }
            self.eat_digits();
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            integral = false;
            self.cursor += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.cursor += 1;
            }
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.error("expected a digit in the exponent"));
            }
            self.eat_digits();
        }
        let literal = &self.text[start..self.cursor];
        if integral {
            if let Ok(number) = literal.parse::<i64>() {
                return Ok(Value::Int(number));
            }
            // Magnitude beyond i64; fall through to floating point.
        }
        let number: f64 = literal
            .parse()
            .map_err(|_| CodecError::syntax(start, format!("malformed number `{literal}`")))?;
        if !number.is_finite() {
            return Err(CodecError::syntax(start, format!("number `{literal}` is out of range")));
        }
        Ok(Value::Float(number))
    }

    fn parse_keyword(&mut self, literal: &'static [u8], value: Value) -> Result<Value, CodecError> {
        if self.bytes[self.cursor..].starts_with(literal) {
            self.cursor += literal.len();
            Ok(value)
        } else {
            Err(self.error(format!("expected `{}`", String::from_utf8_lossy(literal))))
        }
    }

    fn enter(&mut self) -> Result<(), CodecError> {
        self.depth += 1;
        if self.depth > MAX_DECODE_DEPTH {
            return Err(self.error(format!("nesting exceeds {MAX_DECODE_DEPTH} levels")));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.cursor += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.cursor).copied()
    }

    fn eat_digits(&mut self) {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.cursor += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> CodecError {
        CodecError::syntax(self.cursor, message)
    }
}

// -----------------------------------------------------------------------------
// Writer

struct Writer {
    pretty: bool,
}

impl Writer {
    fn write(&self, out: &mut String, value: &Value, indent: usize) -> Result<(), CodecError> {
        match value {
            Value::Null => out.push_str("null"),
            Value::Bool(true) => out.push_str("true"),
            Value::Bool(false) => out.push_str("false"),
            Value::Int(number) => {
                let _ = write!(out, "{number}");
            }
            Value::Float(number) => write_float(out, *number)?,
            Value::Text(text) => write_escaped(out, text),
            Value::Bytes(bytes) => write_escaped(out, &BASE64.encode(bytes)),
            Value::List(items) => {
                if items.is_empty() {
                    out.push_str("[]");
                } else {
                    out.push('[');
                    for (index, item) in items.iter().enumerate() {
                        if index > 0 {
                            out.push(',');
                        }
                        if self.pretty {
                            self.newline(out, indent + 1);
                        }
                        self.write(out, item, indent + 1)?;
                    }
                    if self.pretty {
                        self.newline(out, indent);
                    }
                    out.push(']');
                }
            }
            Value::Map(map) => {
                if map.is_empty() {
                    out.push_str("{}");
                } else {
                    out.push('{');
                    for (index, (key, entry)) in map.iter().enumerate() {
                        if index > 0 {
                            out.push(',');
                        }
                        if self.pretty {
                            self.newline(out, indent + 1);
                        }
                        write_escaped(out, key);
                        out.push(':');
                        if self.pretty {
                            out.push(' ');
                        }
                        self.write(out, entry, indent + 1)?;
                    }
                    if self.pretty {
                        self.newline(out, indent);
                    }
                    out.push('}');
                }
            }
        }
        Ok(())
    }

    fn newline(&self, out: &mut String, indent: usize) {
        out.push('\n');
        for _ in 0..indent {
            out.push_str("  ");
        }
    }
}

fn write_float(out: &mut String, number: f64) -> Result<(), CodecError> {
    if !number.is_finite() {
        return Err(CodecError::Structure(format!(
            "JSON has no representation for the non-finite number {number}"
        )));
    }
    let start = out.len();
    let _ = write!(out, "{number}");
    // Keep a decimal point so the literal reads back as floating point.
    if !out[start..].contains('.') {
        out.push_str(".0");
    }
    Ok(())
}

fn write_escaped(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Encoding;

    fn decode(input: &str) -> Result<Value, CodecError> {
        JsonCodec.decode(input.as_bytes(), &SerializationConfig::default())
    }

    fn encode(value: &Value) -> String {
        let bytes = JsonCodec.encode(value, &SerializationConfig::default()).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    fn syntax_offset(result: Result<Value, CodecError>) -> usize {
        match result {
            Err(CodecError::Syntax { offset, .. }) => offset,
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn decodes_scalars() {
        assert_eq!(decode("null").unwrap(), Value::Null);
        assert_eq!(decode("true").unwrap(), Value::Bool(true));
        assert_eq!(decode("false").unwrap(), Value::Bool(false));
        assert_eq!(decode(" -17 ").unwrap(), Value::Int(-17));
        assert_eq!(decode("\"plain\"").unwrap(), Value::Text("plain".into()));
    }

    #[test]
    fn integral_literals_become_int_until_i64_overflows() {
        assert_eq!(decode("9223372036854775807").unwrap(), Value::Int(i64::MAX));
        assert_eq!(
            decode("9223372036854775808").unwrap(),
            Value::Float(9.223372036854776e18)
        );
        assert_eq!(decode("-9223372036854775808").unwrap(), Value::Int(i64::MIN));
    }

    #[test]
    fn fraction_or_exponent_always_becomes_float() {
        assert_eq!(decode("1.5").unwrap(), Value::Float(1.5));
        assert_eq!(decode("42.0").unwrap(), Value::Float(42.0));
        assert_eq!(decode("4e2").unwrap(), Value::Float(400.0));
        assert_eq!(decode("-2.5e-1").unwrap(), Value::Float(-0.25));
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        assert_eq!(syntax_offset(decode("[1e400]")), 1);
    }

    #[test]
    fn objects_preserve_key_order() {
        let value = decode(r#"{"zeta":1,"alpha":2,"mid":3}"#).unwrap();
        let keys: Vec<&str> = value.as_map().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn duplicate_keys_keep_the_last_value() {
        let value = decode(r#"{"a":1,"b":2,"a":3}"#).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some(&Value::Int(3)));
        assert_eq!(map.index_of("a"), Some(0));
    }

    #[test]
    fn unicode_escapes_decode_including_surrogate_pairs() {
        assert_eq!(decode(r#""Aé""#).unwrap(), Value::Text("Aé".into()));
        assert_eq!(decode(r#""😀""#).unwrap(), Value::Text("😀".into()));
        assert_eq!(decode(r#""😀""#).unwrap(), Value::Text("😀".into()));
    }

    #[test]
    fn unpaired_surrogates_are_rejected_at_the_backslash() {
        assert_eq!(syntax_offset(decode(r#""\ud800""#)), 1);
        assert_eq!(syntax_offset(decode(r#""\ude00""#)), 1);
        assert_eq!(syntax_offset(decode(r#""\ud83d\n""#)), 1);
    }

    #[test]
    fn malformed_documents_are_rejected_with_offsets() {
        assert_eq!(syntax_offset(decode(r#"{"a" 1}"#)), 5);
        assert_eq!(syntax_offset(decode(r#"{"a":1} extra"#)), 8);
        assert_eq!(syntax_offset(decode(r#"[1,]"#)), 3);
        assert!(decode(r#""open"#).is_err());
        assert!(decode(r#""bad \x escape""#).is_err());
        assert!(decode("nope").is_err());
        assert!(decode("").is_err());
    }

    #[test]
    fn control_characters_must_be_escaped() {
        assert!(decode("\"line\nbreak\"").is_err());
        assert_eq!(decode(r#""line\nbreak""#).unwrap(), Value::Text("line\nbreak".into()));
    }

    #[test]
    fn runaway_nesting_is_rejected() {
        let deep = "[".repeat(MAX_DECODE_DEPTH + 1);
        assert!(matches!(decode(&deep), Err(CodecError::Syntax { .. })));

        let tolerable = format!("{}{}", "[".repeat(64), "]".repeat(64));
        assert!(decode(&tolerable).is_ok());
    }

    #[test]
    fn encodes_compact_by_default() {
        let value = decode(r#"{ "name": "ada", "tags": [1, 2.5, null], "ok": true }"#).unwrap();
        assert_eq!(encode(&value), r#"{"name":"ada","tags":[1,2.5,null],"ok":true}"#);
    }

    #[test]
    fn pretty_printing_indents_by_two_spaces() {
        let mut config = SerializationConfig::default();
        config.pretty = true;
        let value = decode(r#"{"a":[1,2],"b":{},"c":{"d":null}}"#).unwrap();
        let bytes = JsonCodec.encode(&value, &config).unwrap();
        let expected = "{\n  \"a\": [\n    1,\n    2\n  ],\n  \"b\": {},\n  \"c\": {\n    \"d\": null\n  }\n}";
        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
    }

    #[test]
    fn floats_keep_their_decimal_point() {
        assert_eq!(encode(&Value::Float(2.0)), "2.0");
        assert_eq!(encode(&Value::Float(-0.0)), "-0.0");
        // Round trip stays a float instead of collapsing to an integer.
        assert_eq!(decode(&encode(&Value::Float(2.0))).unwrap(), Value::Float(2.0));
    }

    #[test]
    fn non_finite_floats_fail_with_structure() {
        let error = JsonCodec
            .encode(&Value::Float(f64::INFINITY), &SerializationConfig::default())
            .unwrap_err();
        assert!(matches!(error, CodecError::Structure(_)));
    }

    #[test]
    fn bytes_encode_as_base64_text() {
        let value = Value::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(encode(&value), r#""3q2+7w==""#);
        // Text never decodes back into bytes.
        assert_eq!(decode(r#""3q2+7w==""#).unwrap(), Value::Text("3q2+7w==".into()));
    }

    #[test]
    fn string_escapes_round_trip() {
        let original = Value::Text("quote \" slash \\ tab \t bell \u{0007} snow ☃".into());
        let rendered = encode(&original);
        assert!(rendered.contains("\\u0007"));
        assert_eq!(decode(&rendered).unwrap(), original);
    }

    #[test]
    fn honors_the_configured_text_encoding() {
        let mut config = SerializationConfig::default();
        config.encoding = Encoding::Utf16Le;
        let value = Value::Text("héllo".into());
        let bytes = JsonCodec.encode(&value, &config).unwrap();
        assert_ne!(bytes, "\"héllo\"".as_bytes());
        assert_eq!(JsonCodec.decode(&bytes, &config).unwrap(), value);
    }
}
