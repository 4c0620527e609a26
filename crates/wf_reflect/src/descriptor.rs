use core::fmt;

use wf_utils::hash::HashMap;

// -----------------------------------------------------------------------------

/// The family of [`Value`](wf_value::Value) shapes a property converts
/// through.
///
/// Every property of a reflected type belongs to exactly one kind. The kind
/// is fixed at compile time through [`Kinded`](crate::Kinded) and decides
/// which coercions [`assign_value`](crate::Coerce::assign_value) accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoerceKind {
    /// Converts through [`Value::Bool`](wf_value::Value::Bool).
    Bool,
    /// Converts through [`Value::Int`](wf_value::Value::Int).
    Int,
    /// Converts through [`Value::Float`](wf_value::Value::Float).
    Float,
    /// Converts through [`Value::Text`](wf_value::Value::Text).
    Text,
    /// Converts through [`Value::Bytes`](wf_value::Value::Bytes).
    Bytes,
    /// A calendar instant, carried as ISO-8601 text on the wire.
    Date,
    /// Converts through [`Value::List`](wf_value::Value::List).
    List,
    /// A keyed collection converting through
    /// [`Value::Map`](wf_value::Value::Map).
    Map,
    /// A reflected type with its own property table.
    Object,
    /// A raw [`Value`](wf_value::Value) stored as-is.
    Value,
}

impl CoerceKind {
    /// Returns the lowercase name of the kind.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Bytes => "bytes",
            Self::Date => "date",
            Self::List => "list",
            Self::Map => "map",
            Self::Object => "object",
            Self::Value => "value",
        }
    }
}

impl fmt::Display for CoerceKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// -----------------------------------------------------------------------------

/// A static description of one reflected property.
///
/// Descriptors are produced by `#[derive(Properties)]` as a `const` table,
/// one entry per field in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: &'static str,
    kind: CoerceKind,
    nilable: bool,
}

impl FieldDescriptor {
    /// Creates a descriptor. Intended for generated code.
    pub const fn new(name: &'static str, kind: CoerceKind, nilable: bool) -> Self {
        Self { name, kind, nilable }
    }

    /// The property's wire name.
    ///
    /// This is the field identifier unless renamed with
    /// `#[properties(rename = "...")]`.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The kind of value the property converts through.
    #[inline]
    pub const fn kind(&self) -> CoerceKind {
        self.kind
    }

    /// Whether the property can hold and accept nil.
    #[inline]
    pub const fn is_nilable(&self) -> bool {
        self.nilable
    }
}

// -----------------------------------------------------------------------------

/// The resolved property table of one concrete type.
///
/// A `FieldSet` is the declared descriptor table, narrowed to the names
/// reported by [`serializable_properties`] when the type supplies them, with
/// a by-name index on the side. Sets are built once per type and cached in
/// the [`FieldTable`](crate::FieldTable).
///
/// [`serializable_properties`]: crate::Properties::serializable_properties
#[derive(Debug)]
pub struct FieldSet {
    type_ident: &'static str,
    // Each entry pairs a descriptor with its index in the full declared
    // table, which is what `property`/`property_mut` expect.
    fields: Vec<(FieldDescriptor, usize)>,
    indices: HashMap<&'static str, usize>,
}

impl FieldSet {
    pub(crate) fn new(
        type_ident: &'static str,
        declared: &'static [FieldDescriptor],
        capability: Option<Vec<&'static str>>,
    ) -> Self {
        let mut fields = Vec::with_capacity(declared.len());
        let mut indices = HashMap::default();
        for (index, descriptor) in declared.iter().enumerate() {
            if let Some(allowed) = &capability {
                if !allowed.contains(&descriptor.name()) {
                    continue;
                }
            }
            indices.insert(descriptor.name(), fields.len());
            fields.push((*descriptor, index));
        }
        Self { type_ident, fields, indices }
    }

    /// The identifier of the type this set describes.
    #[inline]
    pub const fn type_ident(&self) -> &'static str {
        self.type_ident
    }

    /// Number of exposed properties.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when the set exposes no properties.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the property named `name` within this set, if exposed.
    #[inline]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    /// The descriptor at `position` together with its index in the declared
    /// table.
    #[inline]
    pub fn entry_at(&self, position: usize) -> Option<(&FieldDescriptor, usize)> {
        self.fields.get(position).map(|(descriptor, index)| (descriptor, *index))
    }

    /// Iterates over `(descriptor, declared index)` pairs in exposure order.
    #[inline]
    pub fn entries(&self) -> impl Iterator<Item = (&FieldDescriptor, usize)> {
        self.fields.iter().map(|(descriptor, index)| (descriptor, *index))
    }

    /// Iterates over the exposed descriptors in order.
    #[inline]
    pub fn descriptors(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().map(|(descriptor, _)| descriptor)
    }
}

// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DECLARED: &[FieldDescriptor] = &[
        FieldDescriptor::new("alpha", CoerceKind::Int, false),
        FieldDescriptor::new("beta", CoerceKind::Text, true),
        FieldDescriptor::new("gamma", CoerceKind::List, false),
    ];

    #[test]
    fn full_set_keeps_declaration_order() {
        let set = FieldSet::new("Sample", DECLARED, None);
        assert_eq!(set.len(), 3);
        let names: Vec<_> = set.descriptors().map(|d| d.name()).collect();
        assert_eq!(names, ["alpha", "beta", "gamma"]);
        assert_eq!(set.position("gamma"), Some(2));
        assert_eq!(set.position("delta"), None);
    }

    #[test]
    fn capability_narrows_and_remaps() {
        let set = FieldSet::new("Sample", DECLARED, Some(vec!["gamma", "alpha"]));
        assert_eq!(set.len(), 2);
        // Declaration order is preserved regardless of capability order.
        let names: Vec<_> = set.descriptors().map(|d| d.name()).collect();
        assert_eq!(names, ["alpha", "gamma"]);
        // Positions are local to the narrowed set, indices point into the
        // declared table.
        assert_eq!(set.position("gamma"), Some(1));
        let (descriptor, index) = set.entry_at(1).unwrap();
        assert_eq!(descriptor.name(), "gamma");
        assert_eq!(index, 2);
        assert_eq!(set.position("beta"), None);
    }
}
