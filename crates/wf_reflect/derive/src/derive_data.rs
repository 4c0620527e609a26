use std::collections::HashSet;

use syn::parse::Parse;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, Type};

use crate::PROPERTIES_ATTRIBUTE_NAME;

/// A struct accepted by `#[derive(Properties)]`, reduced to what code
/// generation needs.
pub(crate) struct PropertyStruct<'a> {
    pub ident: &'a Ident,
    /// Non-skipped fields in declaration order.
    pub fields: Vec<PropertyField<'a>>,
    /// Wire names listed in the type-level `serializable(...)` attribute.
    pub serializable: Option<Vec<String>>,
}

pub(crate) struct PropertyField<'a> {
    pub ident: &'a Ident,
    pub ty: &'a Type,
    pub wire_name: String,
}

#[derive(Default)]
struct FieldAttrs {
    skip: bool,
    rename: Option<String>,
}

impl<'a> PropertyStruct<'a> {
    pub(crate) fn parse(ast: &'a DeriveInput) -> syn::Result<Self> {
        if !ast.generics.params.is_empty() {
            return Err(syn::Error::new_spanned(
                &ast.generics,
                "#[derive(Properties)] does not support generic types",
            ));
        }

        let Data::Struct(data) = &ast.data else {
            return Err(syn::Error::new_spanned(
                &ast.ident,
                "#[derive(Properties)] only supports structs",
            ));
        };
        let Fields::Named(named) = &data.fields else {
            return Err(syn::Error::new_spanned(
                &ast.ident,
                "#[derive(Properties)] requires named fields",
            ));
        };

        let mut fields = Vec::with_capacity(named.named.len());
        for field in &named.named {
            let attrs = parse_field_attrs(&field.attrs)?;
            if attrs.skip {
                continue;
            }
            let Some(ident) = &field.ident else {
                // Unreachable for named fields; keeps the unwrap out.
                continue;
            };
            fields.push(PropertyField {
                ident,
                ty: &field.ty,
                wire_name: attrs.rename.unwrap_or_else(|| ident.to_string()),
            });
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.wire_name.as_str()) {
                return Err(syn::Error::new(
                    field.ident.span(),
                    format!("duplicate property name `{}`", field.wire_name),
                ));
            }
        }

        let serializable = parse_type_attrs(&ast.attrs)?;
        if let Some(listed) = &serializable {
            for name in listed {
                if !fields.iter().any(|field| &field.wire_name == name) {
                    return Err(syn::Error::new(
                        ast.ident.span(),
                        format!("`serializable` lists unknown property `{name}`"),
                    ));
                }
            }
        }

        Ok(Self { ident: &ast.ident, fields, serializable })
    }
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident(PROPERTIES_ATTRIBUTE_NAME) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                parsed.skip = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                let name: LitStr = meta.value()?.parse()?;
                parsed.rename = Some(name.value());
                Ok(())
            } else {
                Err(meta.error("expected `skip` or `rename = \"...\"`"))
            }
        })?;
    }
    Ok(parsed)
}

fn parse_type_attrs(attrs: &[Attribute]) -> syn::Result<Option<Vec<String>>> {
    let mut serializable = None;
    for attr in attrs {
        if !attr.path().is_ident(PROPERTIES_ATTRIBUTE_NAME) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("serializable") {
                let content;
                syn::parenthesized!(content in meta.input);
                let names = content.parse_terminated(<LitStr as Parse>::parse, syn::Token![,])?;
                serializable = Some(names.iter().map(LitStr::value).collect());
                Ok(())
            } else {
                Err(meta.error("expected `serializable(\"name\", ...)`"))
            }
        })?;
    }
    Ok(serializable)
}
