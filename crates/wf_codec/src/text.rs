//! Text encoding transforms between wire bytes and Rust strings.
//!
//! Codecs parse and emit `str` internally; this module converts to and
//! from the encoding named by [`SerializationConfig::encoding`].
//!
//! [`SerializationConfig::encoding`]: crate::SerializationConfig

use std::borrow::Cow;

use crate::config::Encoding;
use crate::error::CodecError;

/// The Unicode byte order mark, in code units.
const BOM: u16 = 0xFEFF;

/// A byte order mark read with the wrong endianness.
const SWAPPED_BOM: u16 = 0xFFFE;

// -----------------------------------------------------------------------------
// Decoding

/// Decodes wire bytes into text according to `encoding`.
///
/// UTF-8 input borrows; the other encodings allocate. A leading byte
/// order mark matching the declared endianness is skipped, while a
/// contradicting one is rejected as [`CodecError::Encoding`].
pub fn decode(bytes: &[u8], encoding: Encoding) -> Result<Cow<'_, str>, CodecError> {
    match encoding {
        Encoding::Utf8 => {
            let text = std::str::from_utf8(bytes).map_err(|error| {
                CodecError::Encoding(format!(
                    "invalid UTF-8 after byte {}",
                    error.valid_up_to()
                ))
            })?;
            Ok(Cow::Borrowed(text.strip_prefix('\u{feff}').unwrap_or(text)))
        }
        Encoding::Utf16Le => decode_utf16(bytes, encoding, u16::from_le_bytes).map(Cow::Owned),
        Encoding::Utf16Be => decode_utf16(bytes, encoding, u16::from_be_bytes).map(Cow::Owned),
        Encoding::Latin1 => Ok(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())),
    }
}

fn decode_utf16(
    bytes: &[u8],
    encoding: Encoding,
    unit: fn([u8; 2]) -> u16,
) -> Result<String, CodecError> {
    if bytes.len() % 2 != 0 {
        return Err(CodecError::Encoding(format!(
            "{} input has an odd byte length ({})",
            encoding.name(),
            bytes.len()
        )));
    }
    let mut units: Vec<u16> = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]])).collect();
    match units.first() {
        Some(&BOM) => {
            units.remove(0);
        }
        Some(&SWAPPED_BOM) => {
            return Err(CodecError::Encoding(format!(
                "byte order mark contradicts {}",
                encoding.name()
            )));
        }
        _ => {}
    }
    char::decode_utf16(units).collect::<Result<String, _>>().map_err(|error| {
        CodecError::Encoding(format!(
            "unpaired surrogate {:#06x} in {} input",
            error.unpaired_surrogate(),
            encoding.name()
        ))
    })
}

// -----------------------------------------------------------------------------
// Encoding

/// Encodes text into wire bytes according to `encoding`.
///
/// UTF-8 reuses the string's buffer. UTF-16 output carries no byte
/// order mark; the endianness is part of the configuration. Latin-1
/// fails with [`CodecError::Encoding`] for characters above U+00FF.
pub fn encode(text: String, encoding: Encoding) -> Result<Vec<u8>, CodecError> {
    match encoding {
        Encoding::Utf8 => Ok(text.into_bytes()),
        Encoding::Utf16Le => Ok(encode_utf16(&text, u16::to_le_bytes)),
        Encoding::Utf16Be => Ok(encode_utf16(&text, u16::to_be_bytes)),
        Encoding::Latin1 => text
            .chars()
            .map(|c| {
                u8::try_from(u32::from(c)).map_err(|_| {
                    CodecError::Encoding(format!("character {c:?} is outside Latin-1"))
                })
            })
            .collect(),
    }
}

fn encode_utf16(text: &str, bytes: fn(u16) -> [u8; 2]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&bytes(unit));
    }
    out
}

// -----------------------------------------------------------------------------
// Tests
