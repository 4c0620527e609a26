#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Extern Self

// Usually, we need to use `crate` in the crate itself and `wf_reflect` in doc
// testing. But `macro_utils::Manifest` can only choose one, so we must have an
// `extern self` to ensure `wf_reflect` can be used as an alias for `crate`.
extern crate self as wf_reflect;

// -----------------------------------------------------------------------------
// Modules

mod coerce;
mod context;
mod descriptor;
mod error;
mod impls;
mod properties;
mod table;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use coerce::{Coerce, FromValue, Kinded};
pub use context::{BindContext, MAX_BIND_DEPTH};
pub use descriptor::{CoerceKind, FieldDescriptor, FieldSet};
pub use error::ReflectError;
pub use properties::{Properties, object_assign_value, object_to_value};
pub use table::FieldTable;
pub use wf_reflect_derive as derive;

// Value types, re-exported so generated code and downstream crates only need
// one import root.
pub use wf_value::{Blob, Value, ValueKind, ValueMap};
