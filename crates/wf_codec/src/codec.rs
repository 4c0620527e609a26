use wf_value::Value;

use crate::config::SerializationConfig;
use crate::error::CodecError;
use crate::framing::BoundaryScanner;

// -----------------------------------------------------------------------------

/// Maximum container nesting the built-in codecs accept when decoding.
///
/// Decoders recurse per nesting level; the cap keeps hostile input from
/// exhausting the stack. Mirrors the bind depth limit of the reflector.
pub const MAX_DECODE_DEPTH: usize = 128;

// -----------------------------------------------------------------------------

/// Translation between [`Value`] trees and one wire format.
///
/// A codec is stateless: everything an operation needs arrives in the
/// [`SerializationConfig`], so one codec instance serves any number of
/// callers. The two built-in implementations are
/// [`JsonCodec`](crate::JsonCodec) and [`XmlRpcCodec`](crate::XmlRpcCodec);
/// additional formats plug into an engine through the same trait.
///
/// Encoding a well-formed tree only fails on constraints of the format
/// itself, such as a non-finite number in JSON or a missing RPC envelope
/// part in XML-RPC. Decoding reports malformed input as
/// [`CodecError::Syntax`] with a byte offset and undecodable bytes as
/// [`CodecError::Encoding`].
pub trait Codec: Send + Sync {
    /// A short lowercase identifier for the format, unique per codec.
    fn format_name(&self) -> &'static str;

    /// Renders `value` into wire bytes in the configured text encoding.
    fn encode(&self, value: &Value, config: &SerializationConfig) -> Result<Vec<u8>, CodecError>;

    /// Parses wire bytes into a [`Value`] tree.
    fn decode(&self, bytes: &[u8], config: &SerializationConfig) -> Result<Value, CodecError>;

    /// Creates a fresh [`BoundaryScanner`] that recognizes this format's
    /// document boundaries in a byte stream.
    ///
    /// `start_depth` is the nesting depth at which documents live; see the
    /// scanner docs for how positive values support enveloped streams.
    fn boundary_scanner(&self, start_depth: usize) -> Box<dyn BoundaryScanner>;
}
