use thiserror::Error;
use wf_codec::CodecError;
use wf_reflect::ReflectError;
use wf_value::ValueKind;

/// An error produced by a [`Serializer`](crate::Serializer) operation.
///
/// The engine flattens the codec and reflection error domains into one
/// kind so a single `last_error` slot can hold any failure, whichever
/// stage produced it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SerializationError {
    /// The input is not well formed in the selected format.
    #[error("syntax error at byte {offset}: {message}")]
    Syntax {
        /// Byte offset into the decoded input where the problem was found.
        offset: usize,
        /// What was wrong.
        message: String,
    },

    /// The configured text encoding cannot decode or represent the data.
    #[error("text encoding error: {0}")]
    Encoding(String),

    /// The document or value violates a structural constraint of the
    /// format, such as a malformed RPC envelope.
    #[error("structure error: {0}")]
    Structure(String),

    /// The configuration is contradictory or incomplete for the
    /// requested operation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A decoded value cannot be represented by the target property.
    #[error("coercion error: {0}")]
    Coercion(String),

    /// The document carried a key the target type does not declare.
    #[error("unknown property `{0}`")]
    UnknownProperty(String),

    /// The decoded document root has the wrong shape for the requested
    /// operation.
    #[error("expected the document root to be a {expected}, found a {found}")]
    Shape {
        /// The root kind the operation requires.
        expected: ValueKind,
        /// The kind the document actually decoded to.
        found: ValueKind,
    },
}

impl From<CodecError> for SerializationError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::Syntax { offset, message } => Self::Syntax { offset, message },
            CodecError::Encoding(message) => Self::Encoding(message),
            CodecError::Structure(message) => Self::Structure(message),
            CodecError::Configuration(message) => Self::Configuration(message),
            other => Self::Structure(other.to_string()),
        }
    }
}

impl From<ReflectError> for SerializationError {
    fn from(error: ReflectError) -> Self {
        match error {
            ReflectError::UnknownProperty { name } => Self::UnknownProperty(name),
            ReflectError::Coercion(message) => Self::Coercion(message),
            mismatch @ ReflectError::Mismatch { .. } => Self::Coercion(mismatch.to_string()),
            deep @ ReflectError::TooDeep(_) => Self::Structure(deep.to_string()),
            other => Self::Coercion(other.to_string()),
        }
    }
}
