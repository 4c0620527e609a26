use thiserror::Error;

/// An error produced while encoding or decoding a document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    /// The input is not well formed in the codec's grammar.
    #[error("syntax error at byte {offset}: {message}")]
    Syntax {
        /// Byte offset into the decoded input where the problem was found.
        offset: usize,
        /// What was wrong.
        message: String,
    },

    /// The configured text encoding cannot represent or decode the data.
    #[error("text encoding error: {0}")]
    Encoding(String),

    /// The document violates a structural constraint of the format, such
    /// as a missing RPC envelope element or a non-finite JSON number.
    #[error("structure error: {0}")]
    Structure(String),

    /// The configuration itself is contradictory, such as multiple
    /// mutually exclusive RPC flags.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CodecError {
    /// Shorthand for a [`CodecError::Syntax`] at `offset`.
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax { offset, message: message.into() }
    }
}
