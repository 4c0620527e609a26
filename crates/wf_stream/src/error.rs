use thiserror::Error;
use wf_codec::CodecError;

/// An error that ends a tokenized stream.
///
/// Every variant is fatal to its stream: the tokenizer moves to the
/// failed state, reports the error once, and does not resynchronize.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StreamError {
    /// An in-progress document outgrew the configured maximum size.
    #[error("a document exceeded the maximum object size of {limit} bytes")]
    SizeExceeded {
        /// The configured bound, in bytes.
        limit: usize,
    },

    /// The boundary scanner could not frame the bytes in its format.
    #[error(transparent)]
    Framing(#[from] CodecError),

    /// The byte source failed to produce data.
    #[error("byte source error: {0}")]
    Source(String),
}
