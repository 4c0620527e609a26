//! The serialization engine.

use std::fmt;

use wf_codec::{Codec, Encoding, JsonCodec, SerializationConfig, XmlRpcCodec};
use wf_reflect::{BindContext, Coerce, FromValue};
use wf_value::{Value, ValueKind, ValueMap};

use crate::error::SerializationError;

// -----------------------------------------------------------------------------
// Format

/// Selects the wire format for one engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// The built-in JSON codec.
    Json,
    /// The built-in XML-RPC codec.
    XmlRpc,
    /// A codec installed with [`Serializer::register_codec`], addressed
    /// by its [`format_name`](Codec::format_name).
    External(&'static str),
}

// -----------------------------------------------------------------------------
// Serializer

/// Converts typed values and [`Value`] trees to and from wire bytes.
///
/// A serializer owns its [`SerializationConfig`]; the `config` field is
/// public and meant to be adjusted between operations. Every operation
/// validates the configuration first, so a contradictory setup fails fast
/// instead of producing a half-written document.
///
/// Operations return `Result` and additionally record their outcome: the
/// most recent failure stays available through
/// [`last_error`](Self::last_error) until an operation succeeds again.
/// No failure is swallowed and no stale output is ever returned as valid.
///
/// The mutable state makes one serializer suitable for one operation at a
/// time; concurrent work should use one serializer each.
///
/// # Examples
///
/// ```
/// use wf_engine::{Format, Serializer};
/// use wf_value::Value;
///
/// let mut engine = Serializer::new();
///
/// let map = engine.map_from_str(r#"{"a": 1}"#, Format::Json).unwrap();
/// assert_eq!(map.get("a"), Some(&Value::Int(1)));
///
/// assert!(engine.map_from_str("[1]", Format::Json).is_err());
/// assert!(engine.last_error().is_some());
/// ```
pub struct Serializer {
    /// Options applied to every operation.
    pub config: SerializationConfig,
    last_error: Option<SerializationError>,
    json: JsonCodec,
    xmlrpc: XmlRpcCodec,
    external: Vec<Box<dyn Codec>>,
}

impl Serializer {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SerializationConfig::new())
    }

    /// Creates an engine with an explicit configuration.
    pub fn with_config(config: SerializationConfig) -> Self {
        Self {
            config,
            last_error: None,
            json: JsonCodec,
            xmlrpc: XmlRpcCodec,
            external: Vec::new(),
        }
    }

    /// The most recent operation's failure, if it failed.
    pub fn last_error(&self) -> Option<&SerializationError> {
        self.last_error.as_ref()
    }

    /// Installs an additional codec, addressed by
    /// [`Format::External`] with the codec's
    /// [`format_name`](Codec::format_name). Registering a second codec
    /// under the same name replaces the first.
    pub fn register_codec(&mut self, codec: Box<dyn Codec>) {
        let name = codec.format_name();
        if let Some(existing) = self.external.iter_mut().find(|c| c.format_name() == name) {
            log::debug!("replacing the codec registered under `{name}`");
            *existing = codec;
        } else {
            self.external.push(codec);
        }
    }

    // ---- typed object bridging ----

    /// Converts a reflected object (or any coercible value) into a
    /// [`Value`] tree.
    pub fn to_value<T>(&mut self, object: &T) -> Result<Value, SerializationError>
    where
        T: Coerce + ?Sized,
    {
        let result = self.to_value_inner(object);
        self.record(result)
    }

    /// Builds a fresh `T` from a [`Value`] tree.
    pub fn from_value<T>(&mut self, value: &Value) -> Result<T, SerializationError>
    where
        T: FromValue,
    {
        let result = self.from_value_inner(value);
        self.record(result)
    }

    /// Assigns a [`Value`] tree onto an existing object.
    ///
    /// Properties absent from the tree keep their current contents;
    /// [`SerializationConfig::ignore_nil_values`] and
    /// [`SerializationConfig::ignore_unknown_properties`] decide how
    /// explicit nulls and undeclared keys are treated.
    pub fn bind_value<T>(&mut self, value: &Value, object: &mut T) -> Result<(), SerializationError>
    where
        T: Coerce + ?Sized,
    {
        let result = self.bind_value_inner(value, object);
        self.record(result)
    }

    // ---- typed object wire surfaces ----

    /// Serializes an object to wire bytes in the configured text encoding.
    pub fn serialize<T>(&mut self, object: &T, format: Format) -> Result<Vec<u8>, SerializationError>
    where
        T: Coerce + ?Sized,
    {
        let result = self.serialize_inner(object, format);
        self.record(result)
    }

    /// Serializes an object to a string, ignoring the configured text
    /// encoding since strings are already decoded text.
    pub fn serialize_to_string<T>(
        &mut self,
        object: &T,
        format: Format,
    ) -> Result<String, SerializationError>
    where
        T: Coerce + ?Sized,
    {
        let result = self.serialize_to_string_inner(object, format);
        self.record(result)
    }

    /// Decodes wire bytes and assigns the result onto an existing object.
    pub fn deserialize<T>(
        &mut self,
        bytes: &[u8],
        object: &mut T,
        format: Format,
    ) -> Result<(), SerializationError>
    where
        T: Coerce + ?Sized,
    {
        let result = self.deserialize_inner(bytes, object, format);
        self.record(result)
    }

    /// Decodes a string document and assigns the result onto an existing
    /// object, ignoring the configured text encoding.
    pub fn deserialize_str<T>(
        &mut self,
        text: &str,
        object: &mut T,
        format: Format,
    ) -> Result<(), SerializationError>
    where
        T: Coerce + ?Sized,
    {
        let result = self.deserialize_str_inner(text, object, format);
        self.record(result)
    }

    // ---- value tree wire surfaces ----

    /// Decodes wire bytes into a [`Value`] tree.
    pub fn value_from_slice(
        &mut self,
        bytes: &[u8],
        format: Format,
    ) -> Result<Value, SerializationError> {
        let result = self.decode_value(bytes, format, false);
        self.record(result)
    }

    /// Decodes a string document into a [`Value`] tree.
    pub fn value_from_str(
        &mut self,
        text: &str,
        format: Format,
    ) -> Result<Value, SerializationError> {
        let result = self.decode_value(text.as_bytes(), format, true);
        self.record(result)
    }

    /// Encodes a [`Value`] tree to wire bytes.
    pub fn value_to_vec(
        &mut self,
        value: &Value,
        format: Format,
    ) -> Result<Vec<u8>, SerializationError> {
        let result = self.value_to_vec_inner(value, format);
        self.record(result)
    }

    /// Encodes a [`Value`] tree to a string, ignoring the configured text
    /// encoding.
    pub fn value_to_string(
        &mut self,
        value: &Value,
        format: Format,
    ) -> Result<String, SerializationError> {
        let result = self.value_to_string_inner(value, format);
        self.record(result)
    }

    // ---- root shape conveniences ----

    /// Decodes wire bytes whose root must be a map.
    pub fn map_from_slice(
        &mut self,
        bytes: &[u8],
        format: Format,
    ) -> Result<ValueMap, SerializationError> {
        let result = self.decode_value(bytes, format, false).and_then(expect_map);
        self.record(result)
    }

    /// Decodes a string document whose root must be a map.
    pub fn map_from_str(
        &mut self,
        text: &str,
        format: Format,
    ) -> Result<ValueMap, SerializationError> {
        let result = self.decode_value(text.as_bytes(), format, true).and_then(expect_map);
        self.record(result)
    }

    /// Decodes wire bytes whose root must be a list.
    pub fn list_from_slice(
        &mut self,
        bytes: &[u8],
        format: Format,
    ) -> Result<Vec<Value>, SerializationError> {
        let result = self.decode_value(bytes, format, false).and_then(expect_list);
        self.record(result)
    }

    /// Decodes a string document whose root must be a list.
    pub fn list_from_str(
        &mut self,
        text: &str,
        format: Format,
    ) -> Result<Vec<Value>, SerializationError> {
        let result = self.decode_value(text.as_bytes(), format, true).and_then(expect_list);
        self.record(result)
    }

    // ---- internals ----

    fn to_value_inner<T>(&self, object: &T) -> Result<Value, SerializationError>
    where
        T: Coerce + ?Sized,
    {
        self.config.validate()?;
        let mut cx = self.bind_context();
        Ok(object.to_value(&mut cx)?)
    }

    fn from_value_inner<T>(&self, value: &Value) -> Result<T, SerializationError>
    where
        T: FromValue,
    {
        self.config.validate()?;
        let mut cx = self.bind_context();
        Ok(T::from_value(value, &mut cx)?)
    }

    fn bind_value_inner<T>(&self, value: &Value, object: &mut T) -> Result<(), SerializationError>
    where
        T: Coerce + ?Sized,
    {
        self.config.validate()?;
        let mut cx = self.bind_context();
        Ok(object.assign_value(value, &mut cx)?)
    }

    fn serialize_inner<T>(&self, object: &T, format: Format) -> Result<Vec<u8>, SerializationError>
    where
        T: Coerce + ?Sized,
    {
        let value = self.to_value_inner(object)?;
        self.value_to_vec_inner(&value, format)
    }

    fn serialize_to_string_inner<T>(
        &self,
        object: &T,
        format: Format,
    ) -> Result<String, SerializationError>
    where
        T: Coerce + ?Sized,
    {
        let value = self.to_value_inner(object)?;
        self.value_to_string_inner(&value, format)
    }

    fn deserialize_inner<T>(
        &self,
        bytes: &[u8],
        object: &mut T,
        format: Format,
    ) -> Result<(), SerializationError>
    where
        T: Coerce + ?Sized,
    {
        let value = self.decode_value(bytes, format, false)?;
        self.bind_value_inner(&value, object)
    }

    fn deserialize_str_inner<T>(
        &self,
        text: &str,
        object: &mut T,
        format: Format,
    ) -> Result<(), SerializationError>
    where
        T: Coerce + ?Sized,
    {
        let value = self.decode_value(text.as_bytes(), format, true)?;
        self.bind_value_inner(&value, object)
    }

    fn value_to_vec_inner(
        &self,
        value: &Value,
        format: Format,
    ) -> Result<Vec<u8>, SerializationError> {
        self.config.validate()?;
        let codec = self.codec(format)?;
        Ok(codec.encode(value, &self.config)?)
    }

    fn value_to_string_inner(
        &self,
        value: &Value,
        format: Format,
    ) -> Result<String, SerializationError> {
        self.config.validate()?;
        let codec = self.codec(format)?;
        let mut config = self.config.clone();
        config.encoding = Encoding::Utf8;
        let bytes = codec.encode(value, &config)?;
        String::from_utf8(bytes)
            .map_err(|_| SerializationError::Encoding("the codec produced invalid UTF-8".into()))
    }

    /// Decodes one document. `textual` input bypasses the configured text
    /// encoding, since `&str` is already decoded.
    fn decode_value(
        &self,
        bytes: &[u8],
        format: Format,
        textual: bool,
    ) -> Result<Value, SerializationError> {
        self.config.validate()?;
        let codec = self.codec(format)?;
        if textual && self.config.encoding != Encoding::Utf8 {
            let mut config = self.config.clone();
            config.encoding = Encoding::Utf8;
            Ok(codec.decode(bytes, &config)?)
        } else {
            Ok(codec.decode(bytes, &self.config)?)
        }
    }

    fn codec(&self, format: Format) -> Result<&dyn Codec, SerializationError> {
        match format {
            Format::Json => Ok(&self.json),
            Format::XmlRpc => Ok(&self.xmlrpc),
            Format::External(name) => self
                .external
                .iter()
                .find(|codec| codec.format_name() == name)
                .map(|codec| codec.as_ref())
                .ok_or_else(|| {
                    SerializationError::Configuration(format!(
                        "no codec is registered under `{name}`"
                    ))
                }),
        }
    }

    fn bind_context(&self) -> BindContext {
        BindContext::new(
            self.config.time_zone,
            self.config.ignore_nil_values,
            self.config.ignore_unknown_properties,
        )
    }

    fn record<T>(
        &mut self,
        result: Result<T, SerializationError>,
    ) -> Result<T, SerializationError> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(error) => {
                log::debug!("serialization operation failed: {error}");
                self.last_error = Some(error.clone());
            }
        }
        result
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let external: Vec<&str> =
            self.external.iter().map(|codec| codec.format_name()).collect();
        f.debug_struct("Serializer")
            .field("config", &self.config)
            .field("last_error", &self.last_error)
            .field("external", &external)
            .finish()
    }
}

fn expect_map(value: Value) -> Result<ValueMap, SerializationError> {
    value.into_map().map_err(|other| SerializationError::Shape {
        expected: ValueKind::Map,
        found: other.kind(),
    })
}

fn expect_list(value: Value) -> Result<Vec<Value>, SerializationError> {
    value.into_list().map_err(|other| SerializationError::Shape {
        expected: ValueKind::List,
        found: other.kind(),
    })
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use wf_codec::{BoundaryScanner, CodecError, RpcFlags};
    use wf_reflect::derive::Properties;

    use super::*;

    #[derive(Properties, Default, PartialEq, Debug)]
    struct Inner {
        #[properties(rename = "innerString")]
        inner_string: String,
        #[properties(rename = "innerBool")]
        inner_bool: bool,
        #[properties(rename = "innerInt")]
        inner_int: i64,
    }

    #[derive(Properties, Default, PartialEq, Debug)]
    struct Sample {
        #[properties(rename = "stringProperty")]
        string_property: Option<String>,
        #[properties(rename = "intProperty")]
        int_property: i64,
        #[properties(rename = "innerObject")]
        inner_object: Option<Inner>,
    }

    fn sample() -> Sample {
        Sample {
            string_property: Some("hello".into()),
            int_property: 7,
            inner_object: Some(Inner {
                inner_string: "in".into(),
                inner_bool: true,
                inner_int: 3,
            }),
        }
    }

    #[test]
    fn round_trips_a_typed_object_through_json() {
        let mut engine = Serializer::new();
        let json = engine.serialize_to_string(&sample(), Format::Json).unwrap();
        assert_eq!(
            json,
            r#"{"stringProperty":"hello","intProperty":7,"innerObject":{"innerString":"in","innerBool":true,"innerInt":3}}"#
        );

        let mut back = Sample::default();
        engine.deserialize_str(&json, &mut back, Format::Json).unwrap();
        assert_eq!(back, sample());
        assert!(engine.last_error().is_none());
    }

    #[test]
    fn xml_rpc_round_trips_the_same_object() {
        let mut engine = Serializer::new();
        let bytes = engine.serialize(&sample(), Format::XmlRpc).unwrap();

        let mut back = Sample::default();
        engine.deserialize(&bytes, &mut back, Format::XmlRpc).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn nil_properties_are_omitted_by_default() {
        let mut engine = Serializer::new();
        let object = Sample { string_property: None, int_property: 1, inner_object: None };
        let json = engine.serialize_to_string(&object, Format::Json).unwrap();
        assert_eq!(json, r#"{"intProperty":1}"#);
    }

    #[test]
    fn kept_nils_are_explicit_nulls_both_ways() {
        let mut engine = Serializer::new();
        engine.config.ignore_nil_values = false;

        let object = Sample { string_property: None, int_property: 1, inner_object: None };
        let json = engine.serialize_to_string(&object, Format::Json).unwrap();
        assert_eq!(
            json,
            r#"{"stringProperty":null,"intProperty":1,"innerObject":null}"#
        );

        // An explicit null clears a populated nilable property.
        let mut back = sample();
        engine.deserialize_str(&json, &mut back, Format::Json).unwrap();
        assert_eq!(back, object);
    }

    #[test]
    fn ignored_nulls_keep_current_contents() {
        let mut engine = Serializer::new();
        let mut object = sample();
        engine
            .deserialize_str(r#"{"stringProperty":null,"intProperty":9}"#, &mut object, Format::Json)
            .unwrap();
        assert_eq!(object.string_property, Some("hello".into()));
        assert_eq!(object.int_property, 9);
    }

    #[test]
    fn unknown_keys_error_unless_ignored() {
        let mut engine = Serializer::new();
        let mut object = Sample::default();

        let error = engine
            .deserialize_str(r#"{"mystery":1}"#, &mut object, Format::Json)
            .unwrap_err();
        assert_eq!(error, SerializationError::UnknownProperty("mystery".into()));
        assert_eq!(engine.last_error(), Some(&error));

        engine.config.ignore_unknown_properties = true;
        engine
            .deserialize_str(r#"{"mystery":1,"intProperty":5}"#, &mut object, Format::Json)
            .unwrap();
        assert_eq!(object.int_property, 5);
    }

    #[test]
    fn root_shape_helpers_enforce_map_and_list() {
        let mut engine = Serializer::new();

        let map = engine.map_from_str(r#"{"a":1}"#, Format::Json).unwrap();
        assert_eq!(map.get("a"), Some(&Value::Int(1)));

        let list = engine.list_from_str("[1,2]", Format::Json).unwrap();
        assert_eq!(list, vec![Value::Int(1), Value::Int(2)]);

        let error = engine.map_from_str("[1,2]", Format::Json).unwrap_err();
        assert_eq!(
            error,
            SerializationError::Shape { expected: ValueKind::Map, found: ValueKind::List }
        );
        let error = engine.list_from_str(r#"{"a":1}"#, Format::Json).unwrap_err();
        assert_eq!(
            error,
            SerializationError::Shape { expected: ValueKind::List, found: ValueKind::Map }
        );
    }

    #[test]
    fn conflicting_rpc_flags_fail_fast() {
        let mut engine = Serializer::new();
        engine.config.rpc = RpcFlags::REQUEST | RpcFlags::FAULT;

        let error = engine.serialize_to_string(&sample(), Format::Json).unwrap_err();
        assert!(matches!(error, SerializationError::Configuration(_)));
        assert!(matches!(
            engine.last_error(),
            Some(SerializationError::Configuration(_))
        ));
    }

    #[test]
    fn last_error_tracks_the_most_recent_operation() {
        let mut engine = Serializer::new();

        assert!(engine.value_from_str("{oops", Format::Json).is_err());
        assert!(matches!(engine.last_error(), Some(SerializationError::Syntax { .. })));

        engine.value_from_str("{}", Format::Json).unwrap();
        assert!(engine.last_error().is_none());
    }

    #[test]
    fn value_bridging_preserves_property_order() {
        let mut engine = Serializer::new();
        let value = engine.to_value(&sample()).unwrap();
        let keys: Vec<&str> = value.as_map().unwrap().keys().collect();
        assert_eq!(keys, ["stringProperty", "intProperty", "innerObject"]);

        let rebuilt: Sample = engine.from_value(&value).unwrap();
        assert_eq!(rebuilt, sample());
    }

    #[test]
    fn scalar_and_collection_roots_serialize() {
        let mut engine = Serializer::new();

        let json = engine.serialize_to_string(&vec![1i64, 2, 3], Format::Json).unwrap();
        assert_eq!(json, "[1,2,3]");

        let mut numbers: Vec<i64> = Vec::new();
        engine.deserialize_str("[4,5]", &mut numbers, Format::Json).unwrap();
        assert_eq!(numbers, [4, 5]);
    }

    #[test]
    fn string_surfaces_bypass_the_configured_encoding() {
        let mut engine = Serializer::new();
        engine.config.encoding = Encoding::Utf16Be;

        let json = engine.serialize_to_string(&sample(), Format::Json).unwrap();
        let wire = engine.serialize(&sample(), Format::Json).unwrap();
        assert_ne!(wire, json.as_bytes());

        let mut back = Sample::default();
        engine.deserialize_str(&json, &mut back, Format::Json).unwrap();
        assert_eq!(back, sample());

        let mut from_wire = Sample::default();
        engine.deserialize(&wire, &mut from_wire, Format::Json).unwrap();
        assert_eq!(from_wire, sample());
    }

    // ---- external codecs ----

    /// Encodes only text roots, as raw bytes.
    #[derive(Debug)]
    struct PlainText;

    impl Codec for PlainText {
        fn format_name(&self) -> &'static str {
            "plain"
        }

        fn encode(
            &self,
            value: &Value,
            _config: &SerializationConfig,
        ) -> Result<Vec<u8>, CodecError> {
            match value {
                Value::Text(text) => Ok(text.clone().into_bytes()),
                other => Err(CodecError::Structure(format!(
                    "plain text cannot carry a {}",
                    other.kind()
                ))),
            }
        }

        fn decode(
            &self,
            bytes: &[u8],
            _config: &SerializationConfig,
        ) -> Result<Value, CodecError> {
            Ok(Value::Text(String::from_utf8_lossy(bytes).into_owned()))
        }

        fn boundary_scanner(&self, start_depth: usize) -> Box<dyn BoundaryScanner> {
            JsonCodec.boundary_scanner(start_depth)
        }
    }

    #[test]
    fn external_codecs_are_selected_by_name() {
        let mut engine = Serializer::new();

        let missing = engine.value_to_vec(&Value::Text("x".into()), Format::External("plain"));
        assert!(matches!(missing, Err(SerializationError::Configuration(_))));

        engine.register_codec(Box::new(PlainText));
        let bytes = engine
            .value_to_vec(&Value::Text("raw".into()), Format::External("plain"))
            .unwrap();
        assert_eq!(bytes, b"raw");

        let value = engine.value_from_slice(b"raw", Format::External("plain")).unwrap();
        assert_eq!(value, Value::Text("raw".into()));
    }
}
