use std::any::TypeId;
use std::sync::{Arc, PoisonError, RwLock};

use wf_utils::TypeIdMap;

use crate::descriptor::FieldSet;
use crate::properties::Properties;

static FIELD_TABLE: RwLock<TypeIdMap<Arc<FieldSet>>> = RwLock::new(TypeIdMap::new());

/// The process-wide cache of resolved [`FieldSet`]s.
///
/// A type's set is built on the first conversion involving it and reused for
/// every later one, so the per-object cost of reflection is two lock-free
/// reads and no allocation. Entries are never invalidated.
pub struct FieldTable;

impl FieldTable {
    /// Returns the resolved set for `T`, building and caching it on first
    /// use.
    ///
    /// `instance` is only consulted while building, for
    /// [`serializable_properties`](Properties::serializable_properties).
    pub fn resolve<T: Properties>(instance: &T) -> Arc<FieldSet> {
        let type_id = TypeId::of::<T>();
        {
            let table = FIELD_TABLE.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(set) = table.get(&type_id) {
                return Arc::clone(set);
            }
        }

        // Built outside the lock. If two threads race here, the first
        // insert wins and both return the same cached set.
        let built = Arc::new(FieldSet::new(
            T::type_ident(),
            T::descriptors(),
            instance.serializable_properties(),
        ));
        let mut table = FIELD_TABLE.write().unwrap_or_else(PoisonError::into_inner);
        if table.try_insert(type_id, || Arc::clone(&built)) {
            log::debug!(
                "resolved {} of {} properties for `{}`",
                built.len(),
                T::descriptors().len(),
                T::type_ident()
            );
        }
        table.get(&type_id).map(Arc::clone).unwrap_or(built)
    }

    /// Returns the cached set for `T` without building one.
    pub fn cached<T: Properties>() -> Option<Arc<FieldSet>> {
        let table = FIELD_TABLE.read().unwrap_or_else(PoisonError::into_inner);
        table.get_type::<T>().map(Arc::clone)
    }
}
