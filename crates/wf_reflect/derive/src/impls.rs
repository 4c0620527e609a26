use proc_macro2::{Literal, TokenStream};
use quote::quote;
use wf_macro_utils::Manifest;

use crate::derive_data::PropertyStruct;

/// Generate the `Kinded`, `Properties`, `Coerce`, and `FromValue`
/// implementations for one struct.
pub(crate) fn expand(data: &PropertyStruct<'_>) -> TokenStream {
    let wf_reflect = Manifest::shared(|m| m.get_crate_path("wf_reflect"));

    let ident = data.ident;
    let type_ident = ident.to_string();

    let names: Vec<&str> = data.fields.iter().map(|f| f.wire_name.as_str()).collect();
    let types: Vec<&syn::Type> = data.fields.iter().map(|f| f.ty).collect();
    let idents: Vec<&syn::Ident> = data.fields.iter().map(|f| f.ident).collect();
    let indices: Vec<Literal> =
        (0..data.fields.len()).map(Literal::usize_unsuffixed).collect();

    let serializable_tokens = match &data.serializable {
        Some(listed) => quote! {
            fn serializable_properties(
                &self,
            ) -> ::core::option::Option<::std::vec::Vec<&'static str>> {
                ::core::option::Option::Some(::std::vec![#(#listed),*])
            }
        },
        None => TokenStream::new(),
    };

    quote! {
        impl #wf_reflect::Kinded for #ident {
            const KIND: #wf_reflect::CoerceKind = #wf_reflect::CoerceKind::Object;
        }

        impl #wf_reflect::Properties for #ident {
            fn type_ident() -> &'static str {
                #type_ident
            }

            fn descriptors() -> &'static [#wf_reflect::FieldDescriptor] {
                const DESCRIPTORS: &[#wf_reflect::FieldDescriptor] = &[
                    #(#wf_reflect::FieldDescriptor::new(
                        #names,
                        <#types as #wf_reflect::Kinded>::KIND,
                        <#types as #wf_reflect::Kinded>::NILABLE,
                    ),)*
                ];
                DESCRIPTORS
            }

            fn property(
                &self,
                index: usize,
            ) -> ::core::option::Option<&dyn #wf_reflect::Coerce> {
                match index {
                    #(#indices => ::core::option::Option::Some(&self.#idents),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn property_mut(
                &mut self,
                index: usize,
            ) -> ::core::option::Option<&mut dyn #wf_reflect::Coerce> {
                match index {
                    #(#indices => ::core::option::Option::Some(&mut self.#idents),)*
                    _ => ::core::option::Option::None,
                }
            }

            #serializable_tokens
        }

        impl #wf_reflect::Coerce for #ident {
            fn kind(&self) -> #wf_reflect::CoerceKind {
                #wf_reflect::CoerceKind::Object
            }

            fn to_value(
                &self,
                cx: &mut #wf_reflect::BindContext,
            ) -> ::core::result::Result<#wf_reflect::Value, #wf_reflect::ReflectError> {
                #wf_reflect::object_to_value(self, cx)
            }

            fn assign_value(
                &mut self,
                value: &#wf_reflect::Value,
                cx: &mut #wf_reflect::BindContext,
            ) -> ::core::result::Result<(), #wf_reflect::ReflectError> {
                #wf_reflect::object_assign_value(self, value, cx)
            }
        }

        impl #wf_reflect::FromValue for #ident {
            fn from_value(
                value: &#wf_reflect::Value,
                cx: &mut #wf_reflect::BindContext,
            ) -> ::core::result::Result<Self, #wf_reflect::ReflectError> {
                let mut object = <#ident as ::core::default::Default>::default();
                #wf_reflect::Coerce::assign_value(&mut object, value, cx)?;
                ::core::result::Result::Ok(object)
            }
        }
    }
}
