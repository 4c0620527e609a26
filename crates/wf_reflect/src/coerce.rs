use wf_value::Value;

use crate::context::BindContext;
use crate::descriptor::CoerceKind;
use crate::error::ReflectError;

// -----------------------------------------------------------------------------

/// Compile-time kind information for a property type.
///
/// `Kinded` is what lets `#[derive(Properties)]` build its descriptor table
/// in a `const` context: every field type must report which
/// [`CoerceKind`] it converts through and whether it can hold nil.
///
/// Implemented for the standard leaf types, for containers over `Kinded`
/// element types, and by the derive for reflected types themselves.
pub trait Kinded {
    /// The kind this type converts through.
    const KIND: CoerceKind;

    /// Whether the type has a nil state. Only `Option<T>` and types that
    /// wrap one report `true`.
    const NILABLE: bool = false;
}

// -----------------------------------------------------------------------------

/// Conversion between a native value and the neutral [`Value`] tree.
///
/// This is the object-safe core of the reflection layer: property accessors
/// hand out `&dyn Coerce` / `&mut dyn Coerce`, and the conversion helpers
/// drive those without knowing the concrete field types.
///
/// Containers recurse through their elements and honor the policies carried
/// by the [`BindContext`], so a `Vec<Option<i64>>` drops nil entries exactly
/// like a nil property is dropped from a map.
pub trait Coerce {
    /// The kind of this value. Matches [`Kinded::KIND`] for types that
    /// implement both.
    fn kind(&self) -> CoerceKind;

    /// Whether this particular value is nil right now.
    #[inline]
    fn is_nil(&self) -> bool {
        false
    }

    /// Converts `self` into a [`Value`].
    fn to_value(&self, cx: &mut BindContext) -> Result<Value, ReflectError>;

    /// Replaces `self` with the converted content of `value`.
    ///
    /// Fails with [`ReflectError::Mismatch`] when the value has the wrong
    /// shape and [`ReflectError::Coercion`] when it has the right shape but
    /// an unrepresentable content.
    fn assign_value(&mut self, value: &Value, cx: &mut BindContext) -> Result<(), ReflectError>;
}

// -----------------------------------------------------------------------------

/// Construction of a fresh value from a [`Value`].
///
/// Containers need this to materialize elements during
/// [`assign_value`](Coerce::assign_value), and deserializers use it to build
/// whole objects. It is a separate trait rather than a method on [`Coerce`]
/// because construction needs `Sized` while property access needs dynamic
/// dispatch.
///
/// `#[derive(Properties)]` implements it for types that also implement
/// [`Default`].
pub trait FromValue: Coerce + Sized {
    /// Builds a new instance from `value`.
    fn from_value(value: &Value, cx: &mut BindContext) -> Result<Self, ReflectError>;
}
