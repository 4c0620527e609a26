use thiserror::Error;
use wf_value::ValueKind;

use crate::descriptor::CoerceKind;

/// An error produced while converting between native properties and
/// [`Value`](wf_value::Value) trees.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReflectError {
    /// The source value has the wrong shape for the target property.
    #[error("expected {expected} but found {found}")]
    Mismatch {
        /// The kind the property accepts.
        expected: CoerceKind,
        /// The kind the value actually had.
        found: ValueKind,
    },

    /// The value has the right shape but cannot be represented by the
    /// target, such as an integer out of range or an unparseable date.
    #[error("{0}")]
    Coercion(String),

    /// The source carried a key the target type does not declare.
    #[error("unknown property `{name}`")]
    UnknownProperty {
        /// The offending key.
        name: String,
    },

    /// Conversion recursed past [`MAX_BIND_DEPTH`](crate::MAX_BIND_DEPTH)
    /// levels, which usually means a runaway or cyclic object graph.
    #[error("nesting exceeds the {0} level limit")]
    TooDeep(usize),
}

impl ReflectError {
    /// Wraps `error` with the name of the property it occurred on.
    ///
    /// [`UnknownProperty`](ReflectError::UnknownProperty) already names its
    /// key and passes through untouched.
    pub(crate) fn annotate(self, name: &str) -> Self {
        match self {
            Self::UnknownProperty { .. } => self,
            other => Self::Coercion(format!("property `{name}`: {other}")),
        }
    }
}
