use core::fmt;
use core::ops::{Deref, DerefMut};

// -----------------------------------------------------------------------------
// Blob

/// A byte buffer with its own serialization identity.
///
/// `Vec<u8>` would otherwise be indistinguishable from a list of small
/// integers; wrapping byte fields in `Blob` routes them to
/// [`Value::Bytes`](crate::Value::Bytes) and, on the wire, to the
/// format's binary representation (Base64 in JSON and XML-RPC).
///
/// # Examples
///
/// ```
/// use wf_value::{Blob, Value};
///
/// let blob = Blob::from(vec![0xCA, 0xFE]);
/// assert_eq!(Value::from(blob), Value::Bytes(vec![0xCA, 0xFE]));
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Blob(Vec<u8>);

impl Blob {
    /// Creates an empty `Blob`.
    #[inline]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Wraps an existing buffer.
    #[inline]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Copies a slice into a new `Blob`.
    #[inline]
    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    /// Consumes the blob, returning the inner buffer.
    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for Blob {
    type Target = Vec<u8>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Blob {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<u8>> for Blob {
    #[inline]
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<Blob> for Vec<u8> {
    #[inline]
    fn from(blob: Blob) -> Self {
        blob.0
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({} bytes)", self.0.len())
    }
}
