#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use wf_codec as codec;
pub use wf_engine as engine;
pub use wf_reflect as reflect;
pub use wf_stream as stream;
pub use wf_utils as utils;
pub use wf_value as value;
