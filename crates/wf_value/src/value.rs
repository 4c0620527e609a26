use core::fmt;

use crate::{Blob, PathSegment, ValueMap};

// -----------------------------------------------------------------------------
// Value

/// A format-independent tree of serialized data.
///
/// Every codec in the workspace parses wire bytes into a `Value` and
/// renders wire bytes out of one, so the set of variants is the contract
/// between formats: anything a format can carry must fit in here, and
/// anything here must be expressible by every format (possibly lossily,
/// like [`Value::Bytes`] in JSON).
///
/// Integers and floating point numbers are kept apart. `1` and `1.0`
/// are different values, survive round-trips as themselves, and never
/// collapse into each other.
///
/// Maps preserve insertion order and reject duplicate keys by overwrite;
/// see [`ValueMap`].
///
/// # Examples
///
/// ```
/// use wf_value::{Value, ValueMap};
///
/// let mut map = ValueMap::new();
/// map.insert("name", Value::from("callisto"));
/// map.insert("visible", Value::from(true));
///
/// let value = Value::Map(map);
/// assert_eq!(value.kind().name(), "map");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// An explicit absent value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed 64-bit integer.
    Int(i64),
    /// A double-precision floating point number.
    Float(f64),
    /// A unicode string.
    Text(String),
    /// An opaque byte blob.
    Bytes(Vec<u8>),
    /// An ordered sequence of values.
    List(Vec<Value>),
    /// An insertion-ordered map with unique text keys.
    Map(ValueMap),
}

// -----------------------------------------------------------------------------
// ValueKind

/// The variant of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    List,
    Map,
}

impl ValueKind {
    /// A lowercase human-readable name, used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Bytes => "bytes",
            ValueKind::List => "list",
            ValueKind::Map => "map",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// -----------------------------------------------------------------------------
// Accessors

impl Value {
    /// Returns the [`ValueKind`] of this value.
    #[inline]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean payload, if this is a [`Value::Bool`].
    #[inline]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer payload, if this is a [`Value::Int`].
    #[inline]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float payload, if this is a [`Value::Float`].
    ///
    /// Integers are not widened here; numeric coercion is the reflection
    /// layer's job.
    #[inline]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the text payload, if this is a [`Value::Text`].
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the byte payload, if this is a [`Value::Bytes`].
    #[inline]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the items, if this is a [`Value::List`].
    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the map, if this is a [`Value::Map`].
    #[inline]
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Consumes the value, returning the map payload.
    ///
    /// On kind mismatch the value is handed back unchanged.
    #[inline]
    pub fn into_map(self) -> Result<ValueMap, Self> {
        match self {
            Value::Map(map) => Ok(map),
            other => Err(other),
        }
    }

    /// Consumes the value, returning the list payload.
    ///
    /// On kind mismatch the value is handed back unchanged.
    #[inline]
    pub fn into_list(self) -> Result<Vec<Value>, Self> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(other),
        }
    }
}

// -----------------------------------------------------------------------------
// Traversal

impl Value {
    /// Walks the tree depth-first, invoking `f` for every scalar leaf with
    /// the path that leads to it.
    ///
    /// Containers themselves are not reported; an empty list or map
    /// produces no calls. A bare scalar is reported with an empty path.
    ///
    /// # Examples
    ///
    /// ```
    /// use wf_value::{PathSegment, Value, ValueMap};
    ///
    /// let mut map = ValueMap::new();
    /// map.insert("items", Value::List(vec![Value::Int(7)]));
    ///
    /// let mut seen = Vec::new();
    /// Value::Map(map).visit_leaves(|path, leaf| {
    ///     let rendered: String = path.iter().map(PathSegment::to_string).collect();
    ///     seen.push((rendered, leaf.clone()));
    /// });
    ///
    /// assert_eq!(seen, [(".items[0]".to_string(), Value::Int(7))]);
    /// ```
    pub fn visit_leaves<F>(&self, mut f: F)
    where
        F: FnMut(&[PathSegment<'_>], &Value),
    {
        let mut path = Vec::new();
        self.visit_inner(&mut path, &mut f);
    }

    fn visit_inner<'v, F>(&'v self, path: &mut Vec<PathSegment<'v>>, f: &mut F)
    where
        F: FnMut(&[PathSegment<'_>], &Value),
    {
        match self {
            Value::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    path.push(PathSegment::Index(index));
                    item.visit_inner(path, f);
                    path.pop();
                }
            }
            Value::Map(map) => {
                for (key, value) in map.iter() {
                    path.push(PathSegment::Key(key));
                    value.visit_inner(path, f);
                    path.pop();
                }
            }
            leaf => f(path, leaf),
        }
    }
}

// -----------------------------------------------------------------------------
// Conversions

macro_rules! impl_value_from_int {
    ($($ty:ty),* $(,)?) => {
        $(impl From<$ty> for Value {
            #[inline]
            fn from(value: $ty) -> Self {
                Value::Int(value as i64)
            }
        })*
    };
}

impl_value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    #[inline]
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f32> for Value {
    #[inline]
    fn from(value: f32) -> Self {
        Value::Float(value as f64)
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    #[inline]
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Blob> for Value {
    #[inline]
    fn from(value: Blob) -> Self {
        Value::Bytes(value.into_inner())
    }
}

impl From<Vec<Value>> for Value {
    #[inline]
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<ValueMap> for Value {
    #[inline]
    fn from(map: ValueMap) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    #[inline]
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::List(iter.into_iter().collect())
    }
}
