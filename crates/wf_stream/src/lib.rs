#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
mod sink;
mod source;
mod tokenizer;

pub use error::StreamError;
pub use sink::{DocumentSink, StreamEnd};
pub use source::{ByteSource, Chunk, IoSource, SliceSource};
pub use tokenizer::{Pump, State, StreamTokenizer};
