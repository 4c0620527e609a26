//! [`Coerce`] and [`FromValue`] implementations for leaf and container
//! types.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone as _, Utc};
use wf_value::{Blob, Value, ValueMap};

use crate::coerce::{Coerce, FromValue, Kinded};
use crate::context::BindContext;
use crate::descriptor::CoerceKind;
use crate::error::ReflectError;

// -----------------------------------------------------------------------------
// Integers

fn float_to_int(float: f64) -> Result<i64, ReflectError> {
    // The upper bound is exclusive: `i64::MAX as f64` rounds up to 2^63,
    // which is one past the largest representable i64.
    if float.fract() == 0.0 && float >= (i64::MIN as f64) && float < (i64::MAX as f64) {
        Ok(float as i64)
    } else {
        Err(ReflectError::Coercion(format!(
            "number {float} has no exact 64-bit integer form"
        )))
    }
}

macro_rules! impl_coerce_int {
    ($($ty:ty),* $(,)?) => {$(
        impl Kinded for $ty {
            const KIND: CoerceKind = CoerceKind::Int;
        }

        impl Coerce for $ty {
            #[inline]
            fn kind(&self) -> CoerceKind {
                CoerceKind::Int
            }

            fn to_value(&self, _cx: &mut BindContext) -> Result<Value, ReflectError> {
                i64::try_from(*self).map(Value::Int).map_err(|_| {
                    ReflectError::Coercion(format!(
                        "integer {self} does not fit a 64-bit signed value"
                    ))
                })
            }

            fn assign_value(
                &mut self,
                value: &Value,
                _cx: &mut BindContext,
            ) -> Result<(), ReflectError> {
                let int = match value {
                    Value::Int(int) => *int,
                    Value::Float(float) => float_to_int(*float)?,
                    other => {
                        return Err(ReflectError::Mismatch {
                            expected: CoerceKind::Int,
                            found: other.kind(),
                        });
                    }
                };
                *self = <$ty>::try_from(int).map_err(|_| {
                    ReflectError::Coercion(format!(
                        "integer {int} is out of range for {}",
                        stringify!($ty)
                    ))
                })?;
                Ok(())
            }
        }

        impl FromValue for $ty {
            fn from_value(value: &Value, cx: &mut BindContext) -> Result<Self, ReflectError> {
                let mut out: $ty = 0;
                out.assign_value(value, cx)?;
                Ok(out)
            }
        }
    )*};
}

impl_coerce_int!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

// -----------------------------------------------------------------------------
// Floats

impl Kinded for f32 {
    const KIND: CoerceKind = CoerceKind::Float;
}

impl Coerce for f32 {
    #[inline]
    fn kind(&self) -> CoerceKind {
        CoerceKind::Float
    }

    fn to_value(&self, _cx: &mut BindContext) -> Result<Value, ReflectError> {
        Ok(Value::Float(f64::from(*self)))
    }

    fn assign_value(&mut self, value: &Value, _cx: &mut BindContext) -> Result<(), ReflectError> {
        match value {
            Value::Float(float) => *self = *float as f32,
            Value::Int(int) => *self = *int as f32,
            other => {
                return Err(ReflectError::Mismatch {
                    expected: CoerceKind::Float,
                    found: other.kind(),
                });
            }
        }
        Ok(())
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value, cx: &mut BindContext) -> Result<Self, ReflectError> {
        let mut out = 0.0f32;
        out.assign_value(value, cx)?;
        Ok(out)
    }
}

impl Kinded for f64 {
    const KIND: CoerceKind = CoerceKind::Float;
}

impl Coerce for f64 {
    #[inline]
    fn kind(&self) -> CoerceKind {
        CoerceKind::Float
    }

    fn to_value(&self, _cx: &mut BindContext) -> Result<Value, ReflectError> {
        Ok(Value::Float(*self))
    }

    fn assign_value(&mut self, value: &Value, _cx: &mut BindContext) -> Result<(), ReflectError> {
        match value {
            Value::Float(float) => *self = *float,
            Value::Int(int) => *self = *int as f64,
            other => {
                return Err(ReflectError::Mismatch {
                    expected: CoerceKind::Float,
                    found: other.kind(),
                });
            }
        }
        Ok(())
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value, cx: &mut BindContext) -> Result<Self, ReflectError> {
        let mut out = 0.0f64;
        out.assign_value(value, cx)?;
        Ok(out)
    }
}

// -----------------------------------------------------------------------------
// Bool and text

impl Kinded for bool {
    const KIND: CoerceKind = CoerceKind::Bool;
}

impl Coerce for bool {
    #[inline]
    fn kind(&self) -> CoerceKind {
        CoerceKind::Bool
    }

    fn to_value(&self, _cx: &mut BindContext) -> Result<Value, ReflectError> {
        Ok(Value::Bool(*self))
    }

    fn assign_value(&mut self, value: &Value, _cx: &mut BindContext) -> Result<(), ReflectError> {
        match value {
            Value::Bool(flag) => {
                *self = *flag;
                Ok(())
            }
            other => Err(ReflectError::Mismatch {
                expected: CoerceKind::Bool,
                found: other.kind(),
            }),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value, cx: &mut BindContext) -> Result<Self, ReflectError> {
        let mut out = false;
        out.assign_value(value, cx)?;
        Ok(out)
    }
}

impl Kinded for String {
    const KIND: CoerceKind = CoerceKind::Text;
}

impl Coerce for String {
    #[inline]
    fn kind(&self) -> CoerceKind {
        CoerceKind::Text
    }

    fn to_value(&self, _cx: &mut BindContext) -> Result<Value, ReflectError> {
        Ok(Value::Text(self.clone()))
    }

    fn assign_value(&mut self, value: &Value, _cx: &mut BindContext) -> Result<(), ReflectError> {
        match value {
            Value::Text(text) => {
                self.clear();
                self.push_str(text);
                Ok(())
            }
            other => Err(ReflectError::Mismatch {
                expected: CoerceKind::Text,
                found: other.kind(),
            }),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value, _cx: &mut BindContext) -> Result<Self, ReflectError> {
        match value {
            Value::Text(text) => Ok(text.clone()),
            other => Err(ReflectError::Mismatch {
                expected: CoerceKind::Text,
                found: other.kind(),
            }),
        }
    }
}

// -----------------------------------------------------------------------------
// Bytes

impl Kinded for Blob {
    const KIND: CoerceKind = CoerceKind::Bytes;
}

impl Coerce for Blob {
    #[inline]
    fn kind(&self) -> CoerceKind {
        CoerceKind::Bytes
    }

    fn to_value(&self, _cx: &mut BindContext) -> Result<Value, ReflectError> {
        Ok(self.clone().into())
    }

    fn assign_value(&mut self, value: &Value, _cx: &mut BindContext) -> Result<(), ReflectError> {
        match value {
            Value::Bytes(bytes) => {
                *self = Blob::from_vec(bytes.clone());
                Ok(())
            }
            other => Err(ReflectError::Mismatch {
                expected: CoerceKind::Bytes,
                found: other.kind(),
            }),
        }
    }
}

impl FromValue for Blob {
    fn from_value(value: &Value, _cx: &mut BindContext) -> Result<Self, ReflectError> {
        match value {
            Value::Bytes(bytes) => Ok(Blob::from_vec(bytes.clone())),
            other => Err(ReflectError::Mismatch {
                expected: CoerceKind::Bytes,
                found: other.kind(),
            }),
        }
    }
}

// -----------------------------------------------------------------------------
// Dates

/// Accepts RFC 3339 (`1998-07-17T14:08:55+01:00`), the compact XML-RPC form
/// (`19980717T14:08:55`), and zone-less ISO-8601 (`1998-07-17T14:08:55`).
/// Naive timestamps are interpreted in `tz`.
fn parse_date_text(text: &str, tz: FixedOffset) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y%m%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return tz
                .from_local_datetime(&naive)
                .single()
                .map(|date| date.with_timezone(&Utc));
        }
    }
    None
}

impl Kinded for DateTime<Utc> {
    const KIND: CoerceKind = CoerceKind::Date;
}

impl Coerce for DateTime<Utc> {
    #[inline]
    fn kind(&self) -> CoerceKind {
        CoerceKind::Date
    }

    /// Renders the instant in the context's time zone as ISO-8601 text.
    fn to_value(&self, cx: &mut BindContext) -> Result<Value, ReflectError> {
        let rendered = self
            .with_timezone(&cx.time_zone())
            .to_rfc3339_opts(SecondsFormat::Secs, false);
        Ok(Value::Text(rendered))
    }

    fn assign_value(&mut self, value: &Value, cx: &mut BindContext) -> Result<(), ReflectError> {
        match value {
            Value::Text(text) => {
                *self = parse_date_text(text, cx.time_zone()).ok_or_else(|| {
                    ReflectError::Coercion(format!("`{text}` is not an ISO-8601 date"))
                })?;
                Ok(())
            }
            // Unix seconds.
            Value::Int(seconds) => {
                *self = DateTime::from_timestamp(*seconds, 0).ok_or_else(|| {
                    ReflectError::Coercion(format!("timestamp {seconds} is out of range"))
                })?;
                Ok(())
            }
            other => Err(ReflectError::Mismatch {
                expected: CoerceKind::Date,
                found: other.kind(),
            }),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value, cx: &mut BindContext) -> Result<Self, ReflectError> {
        let mut out = DateTime::<Utc>::MIN_UTC;
        out.assign_value(value, cx)?;
        Ok(out)
    }
}

// -----------------------------------------------------------------------------
// Raw values

impl Kinded for Value {
    const KIND: CoerceKind = CoerceKind::Value;
}

impl Coerce for Value {
    #[inline]
    fn kind(&self) -> CoerceKind {
        CoerceKind::Value
    }

    #[inline]
    fn is_nil(&self) -> bool {
        self.is_null()
    }

    fn to_value(&self, _cx: &mut BindContext) -> Result<Value, ReflectError> {
        Ok(self.clone())
    }

    fn assign_value(&mut self, value: &Value, _cx: &mut BindContext) -> Result<(), ReflectError> {
        *self = value.clone();
        Ok(())
    }
}

impl FromValue for Value {
    fn from_value(value: &Value, _cx: &mut BindContext) -> Result<Self, ReflectError> {
        Ok(value.clone())
    }
}

impl Kinded for ValueMap {
    const KIND: CoerceKind = CoerceKind::Map;
}

impl Coerce for ValueMap {
    #[inline]
    fn kind(&self) -> CoerceKind {
        CoerceKind::Map
    }

    fn to_value(&self, _cx: &mut BindContext) -> Result<Value, ReflectError> {
        Ok(Value::Map(self.clone()))
    }

    fn assign_value(&mut self, value: &Value, _cx: &mut BindContext) -> Result<(), ReflectError> {
        match value {
            Value::Map(map) => {
                *self = map.clone();
                Ok(())
            }
            other => Err(ReflectError::Mismatch {
                expected: CoerceKind::Map,
                found: other.kind(),
            }),
        }
    }
}

impl FromValue for ValueMap {
    fn from_value(value: &Value, _cx: &mut BindContext) -> Result<Self, ReflectError> {
        match value {
            Value::Map(map) => Ok(map.clone()),
            other => Err(ReflectError::Mismatch {
                expected: CoerceKind::Map,
                found: other.kind(),
            }),
        }
    }
}

// -----------------------------------------------------------------------------
// Option

impl<T: Kinded> Kinded for Option<T> {
    const KIND: CoerceKind = T::KIND;
    const NILABLE: bool = true;
}

impl<T: Kinded + FromValue> Coerce for Option<T> {
    #[inline]
    fn kind(&self) -> CoerceKind {
        T::KIND
    }

    #[inline]
    fn is_nil(&self) -> bool {
        self.is_none()
    }

    fn to_value(&self, cx: &mut BindContext) -> Result<Value, ReflectError> {
        match self {
            Some(inner) => inner.to_value(cx),
            None => Ok(Value::Null),
        }
    }

    fn assign_value(&mut self, value: &Value, cx: &mut BindContext) -> Result<(), ReflectError> {
        if value.is_null() {
            *self = None;
        } else {
            *self = Some(T::from_value(value, cx)?);
        }
        Ok(())
    }
}

impl<T: Kinded + FromValue> FromValue for Option<T> {
    fn from_value(value: &Value, cx: &mut BindContext) -> Result<Self, ReflectError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value, cx).map(Some)
        }
    }
}

// -----------------------------------------------------------------------------
// Sequences

impl<T: Kinded> Kinded for Vec<T> {
    const KIND: CoerceKind = CoerceKind::List;
}

impl<T: Kinded + FromValue> Coerce for Vec<T> {
    #[inline]
    fn kind(&self) -> CoerceKind {
        CoerceKind::List
    }

    fn to_value(&self, cx: &mut BindContext) -> Result<Value, ReflectError> {
        cx.enter()?;
        let mut items = Vec::with_capacity(self.len());
        for item in self {
            let value = item.to_value(cx)?;
            if value.is_null() && cx.ignore_nil() {
                continue;
            }
            items.push(value);
        }
        cx.leave();
        Ok(Value::List(items))
    }

    fn assign_value(&mut self, value: &Value, cx: &mut BindContext) -> Result<(), ReflectError> {
        let Value::List(entries) = value else {
            return Err(ReflectError::Mismatch {
                expected: CoerceKind::List,
                found: value.kind(),
            });
        };
        cx.enter()?;
        self.clear();
        self.reserve(entries.len());
        for entry in entries {
            if entry.is_null() && cx.ignore_nil() {
                continue;
            }
            self.push(T::from_value(entry, cx)?);
        }
        cx.leave();
        Ok(())
    }
}

impl<T: Kinded + FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value, cx: &mut BindContext) -> Result<Self, ReflectError> {
        let mut list = Self::new();
        list.assign_value(value, cx)?;
        Ok(list)
    }
}

// -----------------------------------------------------------------------------
// Keyed collections

impl<T: Kinded> Kinded for BTreeMap<String, T> {
    const KIND: CoerceKind = CoerceKind::Map;
}

impl<T: Kinded + FromValue> Coerce for BTreeMap<String, T> {
    #[inline]
    fn kind(&self) -> CoerceKind {
        CoerceKind::Map
    }

    fn to_value(&self, cx: &mut BindContext) -> Result<Value, ReflectError> {
        cx.enter()?;
        let mut map = ValueMap::with_capacity(self.len());
        for (key, item) in self {
            let value = item.to_value(cx).map_err(|e| e.annotate(key))?;
            if value.is_null() && cx.ignore_nil() {
                continue;
            }
            map.insert(key.as_str(), value);
        }
        cx.leave();
        Ok(Value::Map(map))
    }

    fn assign_value(&mut self, value: &Value, cx: &mut BindContext) -> Result<(), ReflectError> {
        let Value::Map(entries) = value else {
            return Err(ReflectError::Mismatch {
                expected: CoerceKind::Map,
                found: value.kind(),
            });
        };
        cx.enter()?;
        self.clear();
        for (key, entry) in entries.iter() {
            if entry.is_null() && cx.ignore_nil() {
                continue;
            }
            let item = T::from_value(entry, cx).map_err(|e| e.annotate(key))?;
            self.insert(key.to_owned(), item);
        }
        cx.leave();
        Ok(())
    }
}

impl<T: Kinded + FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: &Value, cx: &mut BindContext) -> Result<Self, ReflectError> {
        let mut map = Self::new();
        map.assign_value(value, cx)?;
        Ok(map)
    }
}

impl<T: Kinded, S> Kinded for HashMap<String, T, S> {
    const KIND: CoerceKind = CoerceKind::Map;
}

impl<T, S> Coerce for HashMap<String, T, S>
where
    T: Kinded + FromValue,
    S: BuildHasher,
{
    #[inline]
    fn kind(&self) -> CoerceKind {
        CoerceKind::Map
    }

    /// Entries are emitted in lexical key order so the output does not
    /// depend on hash iteration order.
    fn to_value(&self, cx: &mut BindContext) -> Result<Value, ReflectError> {
        cx.enter()?;
        let mut entries: Vec<(&String, &T)> = self.iter().collect();
        entries.sort_unstable_by_key(|entry| entry.0);
        let mut map = ValueMap::with_capacity(entries.len());
        for (key, item) in entries {
            let value = item.to_value(cx).map_err(|e| e.annotate(key))?;
            if value.is_null() && cx.ignore_nil() {
                continue;
            }
            map.insert(key.as_str(), value);
        }
        cx.leave();
        Ok(Value::Map(map))
    }

    fn assign_value(&mut self, value: &Value, cx: &mut BindContext) -> Result<(), ReflectError> {
        let Value::Map(entries) = value else {
            return Err(ReflectError::Mismatch {
                expected: CoerceKind::Map,
                found: value.kind(),
            });
        };
        cx.enter()?;
        self.clear();
        for (key, entry) in entries.iter() {
            if entry.is_null() && cx.ignore_nil() {
                continue;
            }
            let item = T::from_value(entry, cx).map_err(|e| e.annotate(key))?;
            self.insert(key.to_owned(), item);
        }
        cx.leave();
        Ok(())
    }
}

impl<T, S> FromValue for HashMap<String, T, S>
where
    T: Kinded + FromValue,
    S: BuildHasher + Default,
{
    fn from_value(value: &Value, cx: &mut BindContext) -> Result<Self, ReflectError> {
        let mut map = Self::default();
        map.assign_value(value, cx)?;
        Ok(map)
    }
}

// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone, Utc};
    use wf_value::{Value, ValueMap};

    use super::*;

    fn keep_nil_context() -> BindContext {
        BindContext::new(chrono::Offset::fix(&Utc), false, true)
    }

    #[test]
    fn int_assign_checks_range() {
        let mut cx = BindContext::default();
        let mut small: i8 = 0;
        assert!(small.assign_value(&Value::Int(100), &mut cx).is_ok());
        assert_eq!(small, 100);
        assert!(matches!(
            small.assign_value(&Value::Int(300), &mut cx),
            Err(ReflectError::Coercion(_))
        ));
    }

    #[test]
    fn oversized_unsigned_fails_to_convert() {
        let mut cx = BindContext::default();
        let big: u64 = u64::MAX;
        assert!(matches!(
            big.to_value(&mut cx),
            Err(ReflectError::Coercion(_))
        ));
        assert_eq!((42u64).to_value(&mut cx), Ok(Value::Int(42)));
    }

    #[test]
    fn int_accepts_integral_floats_only() {
        let mut cx = BindContext::default();
        let mut n: i64 = 0;
        n.assign_value(&Value::Float(5.0), &mut cx).unwrap();
        assert_eq!(n, 5);
        assert!(n.assign_value(&Value::Float(5.5), &mut cx).is_err());
    }

    #[test]
    fn float_widens_ints() {
        let mut cx = BindContext::default();
        let mut f: f64 = 0.0;
        f.assign_value(&Value::Int(3), &mut cx).unwrap();
        assert_eq!(f, 3.0);
    }

    #[test]
    fn string_rejects_numbers() {
        let mut cx = BindContext::default();
        let mut text = String::new();
        assert_eq!(
            text.assign_value(&Value::Int(7), &mut cx),
            Err(ReflectError::Mismatch {
                expected: CoerceKind::Text,
                found: wf_value::ValueKind::Int,
            })
        );
    }

    #[test]
    fn option_maps_nil_both_ways() {
        let mut cx = BindContext::default();
        let mut slot: Option<i64> = Some(4);
        slot.assign_value(&Value::Null, &mut cx).unwrap();
        assert_eq!(slot, None);
        assert_eq!(slot.to_value(&mut cx), Ok(Value::Null));

        slot.assign_value(&Value::Int(9), &mut cx).unwrap();
        assert_eq!(slot, Some(9));
    }

    #[test]
    fn vec_drops_nil_entries_by_default() {
        let mut cx = BindContext::default();
        let source = Value::List(vec![Value::Int(1), Value::Null, Value::Int(2)]);
        let mut items: Vec<Option<i64>> = Vec::new();
        items.assign_value(&source, &mut cx).unwrap();
        assert_eq!(items, [Some(1), Some(2)]);

        let mut cx = keep_nil_context();
        items.assign_value(&source, &mut cx).unwrap();
        assert_eq!(items, [Some(1), None, Some(2)]);
    }

    #[test]
    fn hash_map_output_is_sorted() {
        let mut cx = BindContext::default();
        let mut map = HashMap::new();
        map.insert("zeta".to_string(), 1i64);
        map.insert("alpha".to_string(), 2i64);
        let value = map.to_value(&mut cx).unwrap();
        let keys: Vec<&str> = value.as_map().unwrap().keys().collect();
        assert_eq!(keys, ["alpha", "zeta"]);
    }

    #[test]
    fn btree_map_round_trip() {
        let mut cx = BindContext::default();
        let mut wire = ValueMap::new();
        wire.insert("a", Value::Int(1));
        wire.insert("b", Value::Int(2));

        let map: BTreeMap<String, i64> =
            FromValue::from_value(&Value::Map(wire.clone()), &mut cx).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["b"], 2);
        assert_eq!(map.to_value(&mut cx), Ok(Value::Map(wire)));
    }

    #[test]
    fn date_renders_in_context_zone() {
        let plus_one = FixedOffset::east_opt(3600).unwrap();
        let mut cx = BindContext::new(plus_one, true, true);

        let mut date = DateTime::<Utc>::MIN_UTC;
        date.assign_value(&Value::Text("2014-02-26T10:05:30+01:00".into()), &mut cx)
            .unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2014, 2, 26, 9, 5, 30).unwrap());
        assert_eq!(
            date.to_value(&mut cx),
            Ok(Value::Text("2014-02-26T10:05:30+01:00".into()))
        );
    }

    #[test]
    fn date_accepts_compact_and_naive_forms() {
        let mut cx = BindContext::default();
        let expected = Utc.with_ymd_and_hms(1998, 7, 17, 14, 8, 55).unwrap();

        let compact: DateTime<Utc> =
            FromValue::from_value(&Value::Text("19980717T14:08:55".into()), &mut cx).unwrap();
        assert_eq!(compact, expected);

        let naive: DateTime<Utc> =
            FromValue::from_value(&Value::Text("1998-07-17T14:08:55".into()), &mut cx).unwrap();
        assert_eq!(naive, expected);

        let garbage = DateTime::<Utc>::from_value(&Value::Text("not a date".into()), &mut cx);
        assert!(matches!(garbage, Err(ReflectError::Coercion(_))));
    }

    #[test]
    fn date_accepts_unix_seconds() {
        let mut cx = BindContext::default();
        let date: DateTime<Utc> = FromValue::from_value(&Value::Int(0), &mut cx).unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap());
    }
}
