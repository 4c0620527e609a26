use bitflags::bitflags;
use chrono::{FixedOffset, Offset, Utc};

use crate::error::CodecError;

// -----------------------------------------------------------------------------

/// Text encoding of the raw document bytes.
///
/// Codecs decode input through this before parsing and encode output
/// through it after rendering. The default is UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// UTF-8, the default.
    #[default]
    Utf8,
    /// UTF-16, little endian. A byte order mark is honored when decoding.
    Utf16Le,
    /// UTF-16, big endian. A byte order mark is honored when decoding.
    Utf16Be,
    /// ISO-8859-1, mapping bytes to the first 256 code points one to one.
    Latin1,
}

impl Encoding {
    /// The conventional name of the encoding.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16Le => "UTF-16LE",
            Self::Utf16Be => "UTF-16BE",
            Self::Latin1 => "ISO-8859-1",
        }
    }
}

// -----------------------------------------------------------------------------

bitflags! {
    /// RPC envelope framing selectors.
    ///
    /// At most one flag may be set; [`SerializationConfig::validate`]
    /// rejects combinations. With no flag set, codecs read and write bare
    /// documents without envelope framing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RpcFlags: u8 {
        /// Frame as a method call.
        const REQUEST = 1 << 0;
        /// Frame as a method response carrying one return value.
        const RESPONSE = 1 << 1;
        /// Frame as a fault response carrying a fault struct.
        const FAULT = 1 << 2;
    }
}

// -----------------------------------------------------------------------------

/// Options shared by every serialization operation.
///
/// One instance is owned by an engine and reused across operations; it is
/// plain data and carries no connection to any particular codec.
///
/// # Examples
///
/// ```
/// use wf_codec::{RpcFlags, SerializationConfig};
///
/// let mut config = SerializationConfig::default();
/// assert!(config.ignore_nil_values);
/// assert!(!config.ignore_unknown_properties);
///
/// config.rpc = RpcFlags::REQUEST | RpcFlags::FAULT;
/// assert!(config.validate().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct SerializationConfig {
    /// Text encoding of document bytes. Default UTF-8.
    pub encoding: Encoding,
    /// Format output for display instead of compactness. Default `false`.
    pub pretty: bool,
    /// When decoding into typed objects, skip keys the type does not
    /// declare instead of failing. Default `false`.
    pub ignore_unknown_properties: bool,
    /// When encoding, omit nil values; when decoding, skip explicit nulls
    /// instead of binding them. Default `true`.
    pub ignore_nil_values: bool,
    /// Time zone for formats that do not carry zone information, such as
    /// XML-RPC `dateTime.iso8601`. Default UTC.
    pub time_zone: FixedOffset,
    /// RPC envelope framing. Default empty: no envelope.
    pub rpc: RpcFlags,
    /// Method name for [`RpcFlags::REQUEST`] encoding.
    pub rpc_method: Option<String>,
}

impl SerializationConfig {
    /// Creates a configuration with the documented defaults.
    pub fn new() -> Self {
        Self {
            encoding: Encoding::Utf8,
            pretty: false,
            ignore_unknown_properties: false,
            ignore_nil_values: true,
            time_zone: Utc.fix(),
            rpc: RpcFlags::empty(),
            rpc_method: None,
        }
    }

    /// Checks the configuration for contradictions.
    ///
    /// Run by every engine operation before touching a codec, so an
    /// impossible configuration fails fast instead of producing a
    /// half-written document.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.rpc.bits().count_ones() > 1 {
            return Err(CodecError::Configuration(format!(
                "RPC flags {:?} are mutually exclusive",
                self.rpc
            )));
        }
        Ok(())
    }
}

impl Default for SerializationConfig {
    fn default() -> Self {
        Self::new()
    }
}

// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documentation() {
        let config = SerializationConfig::default();
        assert_eq!(config.encoding, Encoding::Utf8);
        assert!(!config.pretty);
        assert!(!config.ignore_unknown_properties);
        assert!(config.ignore_nil_values);
        assert_eq!(config.time_zone.local_minus_utc(), 0);
        assert!(config.rpc.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn combined_rpc_flags_are_rejected() {
        let mut config = SerializationConfig::default();
        config.rpc = RpcFlags::REQUEST;
        assert!(config.validate().is_ok());

        config.rpc = RpcFlags::REQUEST | RpcFlags::FAULT;
        assert!(matches!(config.validate(), Err(CodecError::Configuration(_))));
    }
}
