use core::fmt;

// -----------------------------------------------------------------------------
// PathSegment

/// One step on the way from a tree root to a nested value.
///
/// Rendered as `[index]` for list positions and `.key` for map keys, so a
/// joined path reads like an access expression: `.items[2].name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    /// A position inside a [`Value::List`](crate::Value::List).
    Index(usize),
    /// A key inside a [`Value::Map`](crate::Value::Map).
    Key(&'a str),
}

impl fmt::Display for PathSegment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(index) => write!(f, "[{index}]"),
            PathSegment::Key(key) => write!(f, ".{key}"),
        }
    }
}
