#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Modules

mod codec;
mod config;
mod error;
pub mod framing;
mod json;
pub mod text;
mod xmlrpc;

// -----------------------------------------------------------------------------
// Top-level exports

pub use codec::{Codec, MAX_DECODE_DEPTH};
pub use config::{Encoding, RpcFlags, SerializationConfig};
pub use error::CodecError;
pub use framing::{BoundaryScanner, Scan};
pub use json::JsonCodec;
pub use xmlrpc::XmlRpcCodec;
