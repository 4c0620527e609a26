use wf_value::{Value, ValueMap};

use crate::coerce::Coerce;
use crate::context::BindContext;
use crate::descriptor::{CoerceKind, FieldDescriptor};
use crate::error::ReflectError;
use crate::table::FieldTable;

// -----------------------------------------------------------------------------

/// A type whose fields are exposed as named, kinded properties.
///
/// Usually implemented with `#[derive(Properties)]`, which builds the
/// descriptor table from the struct's fields and wires the two accessors up
/// to them. Property indices refer to the declared table returned by
/// [`descriptors`](Properties::descriptors), in declaration order.
///
/// Manual implementations are possible but must keep the accessors and the
/// descriptor table consistent: `property(i)` must return the field
/// described by `descriptors()[i]` for every `i` in range.
pub trait Properties: Coerce + 'static {
    /// The type's name as it appears in logs and error messages.
    fn type_ident() -> &'static str;

    /// The declared property table, one entry per field in declaration
    /// order.
    fn descriptors() -> &'static [FieldDescriptor];

    /// Borrows the field at `index` in the declared table.
    fn property(&self, index: usize) -> Option<&dyn Coerce>;

    /// Mutably borrows the field at `index` in the declared table.
    fn property_mut(&mut self, index: usize) -> Option<&mut dyn Coerce>;

    /// Restricts which declared properties take part in conversion.
    ///
    /// When this returns `Some`, only the named properties are read and
    /// written; everything else behaves as if it were not declared. The
    /// result is consulted once per type, when the [`FieldTable`] entry is
    /// first built, and must not vary between instances.
    fn serializable_properties(&self) -> Option<Vec<&'static str>> {
        None
    }
}

// -----------------------------------------------------------------------------
// Conversion drivers, shared by generated `Coerce` impls.

fn out_of_sync<T: Properties>(name: &str) -> ReflectError {
    ReflectError::Coercion(format!(
        "`{}` does not expose declared property `{name}`",
        T::type_ident()
    ))
}

/// Converts a reflected object into a [`Value::Map`] of its properties.
///
/// Nil properties are skipped when the context says so, otherwise they are
/// emitted as explicit nulls. Entry order is exposure order.
pub fn object_to_value<T: Properties>(
    object: &T,
    cx: &mut BindContext,
) -> Result<Value, ReflectError> {
    let set = FieldTable::resolve(object);
    cx.enter()?;
    let mut map = ValueMap::with_capacity(set.len());
    for (descriptor, index) in set.entries() {
        let name = descriptor.name();
        let property = object.property(index).ok_or_else(|| out_of_sync::<T>(name))?;
        let value = property.to_value(cx).map_err(|e| e.annotate(name))?;
        if value.is_null() && cx.ignore_nil() {
            continue;
        }
        map.insert(name, value);
    }
    cx.leave();
    Ok(Value::Map(map))
}

/// Assigns the entries of a [`Value::Map`] onto a reflected object's
/// properties.
///
/// Keys with no exposed property are skipped or reported according to the
/// context. Properties absent from the map keep their current content. Null
/// entries are skipped when the context ignores nil, otherwise they are
/// assigned and nilable properties become nil.
pub fn object_assign_value<T: Properties>(
    object: &mut T,
    value: &Value,
    cx: &mut BindContext,
) -> Result<(), ReflectError> {
    let Value::Map(entries) = value else {
        return Err(ReflectError::Mismatch {
            expected: CoerceKind::Object,
            found: value.kind(),
        });
    };
    let set = FieldTable::resolve(object);
    cx.enter()?;
    for (key, entry) in entries.iter() {
        let Some(position) = set.position(key) else {
            if cx.ignore_unknown() {
                log::trace!("skipping unknown property `{key}` for `{}`", T::type_ident());
                continue;
            }
            return Err(ReflectError::UnknownProperty { name: key.to_owned() });
        };
        if entry.is_null() && cx.ignore_nil() {
            continue;
        }
        let index = match set.entry_at(position) {
            Some((_, index)) => index,
            None => return Err(out_of_sync::<T>(key)),
        };
        let property = object.property_mut(index).ok_or_else(|| out_of_sync::<T>(key))?;
        property.assign_value(entry, cx).map_err(|e| e.annotate(key))?;
    }
    cx.leave();
    Ok(())
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use wf_reflect_derive::Properties;
    use wf_value::{Value, ValueMap};

    use super::*;
    use crate::coerce::FromValue;
    use crate::descriptor::CoerceKind;
    use crate::error::ReflectError;

    #[derive(Properties, Default, PartialEq, Debug)]
    struct Inner {
        label: String,
        weight: f64,
    }

    #[derive(Properties, Default, PartialEq, Debug)]
    struct Outer {
        #[properties(rename = "innerObject")]
        inner: Inner,
        items: Vec<i64>,
        note: Option<String>,
        stamp: Option<DateTime<Utc>>,
        #[properties(skip)]
        scratch: usize,
    }

    fn sample() -> Outer {
        Outer {
            inner: Inner { label: "core".into(), weight: 1.5 },
            items: vec![3, 4],
            note: None,
            stamp: None,
            scratch: 77,
        }
    }

    #[test]
    fn declared_table_reflects_attributes() {
        let names: Vec<&str> = Outer::descriptors().iter().map(|d| d.name()).collect();
        assert_eq!(names, ["innerObject", "items", "note", "stamp"]);

        let kinds: Vec<CoerceKind> = Outer::descriptors().iter().map(|d| d.kind()).collect();
        assert_eq!(
            kinds,
            [CoerceKind::Object, CoerceKind::List, CoerceKind::Text, CoerceKind::Date]
        );
        assert!(Outer::descriptors()[2].is_nilable());
        assert!(!Outer::descriptors()[0].is_nilable());
    }

    #[test]
    fn nested_objects_convert_to_maps() {
        let mut cx = BindContext::default();
        let value = sample().to_value(&mut cx).unwrap();

        let map = value.as_map().unwrap();
        assert_eq!(map.len(), 2); // nil note and stamp skipped
        let inner = map.get("innerObject").and_then(Value::as_map).unwrap();
        assert_eq!(inner.get("label"), Some(&Value::Text("core".into())));
        assert_eq!(inner.get("weight"), Some(&Value::Float(1.5)));
        assert_eq!(
            map.get("items"),
            Some(&Value::List(vec![Value::Int(3), Value::Int(4)]))
        );
    }

    #[test]
    fn assign_rebuilds_nested_state() {
        let mut cx = BindContext::default();
        let value = sample().to_value(&mut cx).unwrap();

        let mut rebuilt = Outer::default();
        rebuilt.assign_value(&value, &mut cx).unwrap();
        // The skipped field keeps its default instead of the source's 77.
        assert_eq!(rebuilt, Outer { scratch: 0, ..sample() });
    }

    #[test]
    fn from_value_builds_from_default() {
        let mut cx = BindContext::default();
        let value = sample().to_value(&mut cx).unwrap();
        let built = Outer::from_value(&value, &mut cx).unwrap();
        assert_eq!(built.inner.label, "core");
        assert_eq!(built.items, [3, 4]);
    }

    #[test]
    fn unknown_keys_follow_policy() {
        let mut wire = ValueMap::new();
        wire.insert("bogus", Value::Int(1));
        let value = Value::Map(wire);

        let mut target = Inner::default();
        let mut lenient = BindContext::new(chrono::Offset::fix(&Utc), true, true);
        target.assign_value(&value, &mut lenient).unwrap();

        // Unknown keys are reported by default.
        let mut strict = BindContext::default();
        assert_eq!(
            target.assign_value(&value, &mut strict),
            Err(ReflectError::UnknownProperty { name: "bogus".into() })
        );
    }

    #[test]
    fn explicit_null_clears_nilable_property() {
        let mut wire = ValueMap::new();
        wire.insert("note", Value::Null);
        let value = Value::Map(wire);

        let mut target = Outer { note: Some("kept".into()), ..Outer::default() };

        // Ignored by default: the property keeps its value.
        let mut lenient = BindContext::default();
        target.assign_value(&value, &mut lenient).unwrap();
        assert_eq!(target.note, Some("kept".into()));

        // With nils honored the property is cleared.
        let mut honoring = BindContext::new(chrono::Offset::fix(&Utc), false, true);
        target.assign_value(&value, &mut honoring).unwrap();
        assert_eq!(target.note, None);
    }

    #[test]
    fn null_into_non_nilable_property_fails() {
        let mut wire = ValueMap::new();
        wire.insert("label", Value::Null);
        let mut target = Inner::default();

        let mut honoring = BindContext::new(chrono::Offset::fix(&Utc), false, true);
        let err = target.assign_value(&Value::Map(wire), &mut honoring);
        assert!(matches!(err, Err(ReflectError::Coercion(_))));
    }

    #[derive(Properties, Default)]
    #[properties(serializable("visible"))]
    struct Guarded {
        visible: i64,
        hidden: i64,
    }

    #[test]
    fn serializable_attribute_narrows_output() {
        let mut cx = BindContext::default();
        let guarded = Guarded { visible: 1, hidden: 2 };
        let value = guarded.to_value(&mut cx).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("visible"), Some(&Value::Int(1)));
    }

    #[test]
    fn coercion_errors_name_the_property() {
        let mut cx = BindContext::default();
        let mut wire = ValueMap::new();
        wire.insert("weight", Value::Text("heavy".into()));

        let err = Inner::default().assign_value(&Value::Map(wire), &mut cx).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("weight"), "unexpected message: {message}");
    }
}
