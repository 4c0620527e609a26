#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
mod serializer;

pub use error::SerializationError;
pub use serializer::{Format, Serializer};

// The configuration types travel with the engine so callers need a single
// import root.
pub use wf_codec::{Encoding, RpcFlags, SerializationConfig};
