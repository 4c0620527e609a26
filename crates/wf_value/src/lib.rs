#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Modules

mod blob;
mod map;
mod path;
mod serde;
mod value;

// -----------------------------------------------------------------------------
// Top-level exports

pub use blob::Blob;
pub use map::ValueMap;
pub use path::PathSegment;
pub use value::{Value, ValueKind};
