//! See [`derive Properties`](derive_properties).
#![cfg_attr(docsrs, feature(doc_cfg))]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

static PROPERTIES_ATTRIBUTE_NAME: &str = "properties";

// -----------------------------------------------------------------------------
// Modules

mod derive_data;
mod impls;

// -----------------------------------------------------------------------------
// Macros

/// # Property Reflection Derivation
///
/// `#[derive(Properties)]` implements the following traits for a struct
/// with named fields:
///
/// - `Kinded`, reporting the type as an object
/// - `Properties`, exposing one descriptor and accessor per field
/// - `Coerce`, converting through a map of the properties
/// - `FromValue`, building instances via `Default`
///
/// Every field type must implement `Kinded` and `Coerce`, which holds for
/// the standard leaf types, containers of them, and other derived types.
/// The type itself must implement [`Default`] so it can be constructed
/// during deserialization.
///
/// ```rust, ignore
/// #[derive(Properties, Default)]
/// struct Light {
///     name: String,
///     lumens: i64,
///     flicker: Option<f64>,
/// }
/// ```
///
/// ## Renaming and skipping fields
///
/// Wire names default to the field identifier. `rename` overrides that,
/// and `skip` hides a field from reflection entirely:
///
/// ```rust, ignore
/// #[derive(Properties, Default)]
/// struct Light {
///     #[properties(rename = "lightName")]
///     name: String,
///     #[properties(skip)]
///     cache: Option<ExpensiveHandle>,
/// }
/// ```
///
/// A skipped field keeps whatever `Default` gave it when an instance is
/// deserialized.
///
/// ## Restricting the serializable set
///
/// The type-level `serializable(...)` attribute narrows conversion to the
/// listed wire names, like overriding
/// [`serializable_properties`](../wf_reflect/trait.Properties.html):
///
/// ```rust, ignore
/// #[derive(Properties, Default)]
/// #[properties(serializable("name", "lumens"))]
/// struct Light {
///     name: String,
///     lumens: i64,
///     secret_token: String,
/// }
/// ```
///
/// ## Limitations
///
/// Generic types are not supported: the descriptor table is a `const` and
/// cannot name type parameters. Enums, tuple structs, and unit structs are
/// not supported either; the property model is named fields only.
#[proc_macro_derive(Properties, attributes(properties))]
pub fn derive_properties(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    let data = match derive_data::PropertyStruct::parse(&ast) {
        Ok(data) => data,
        Err(err) => return err.into_compile_error().into(),
    };

    impls::expand(&data).into()
}
