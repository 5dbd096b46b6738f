//! Implementation of #[derive(ResultNode)]

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, DeriveInput, Result, Visibility};

use crate::utils::{extract_result_meta, field_name, krate, named_fields};

pub fn derive_result_node_impl(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let krate = krate();
    let fields = named_fields(&input, "ResultNode")?;
    let no_clone = container_no_clone(&input.attrs)?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut entries = Vec::new();
    for field in fields {
        let meta = extract_result_meta(&field.attrs)?;
        if meta.skip {
            continue;
        }
        // Only the public surface of a result object reaches the wire
        if !matches!(field.vis, Visibility::Public(_)) && !meta.expose {
            continue;
        }

        let ident = &field.ident;
        let wire_name = match meta.rename {
            Some(rename) => rename,
            None => field_name(field)?,
        };
        entries.push(quote! {
            (
                ::std::string::String::from(#wire_name),
                #krate::ToResultValue::to_result_value(&self.#ident),
            )
        });
    }

    let by_value = if no_clone {
        quote! {}
    } else {
        quote! {
            #[automatically_derived]
            impl #impl_generics #krate::ToResultValue for #name #ty_generics #where_clause {
                fn to_result_value(&self) -> #krate::ResultValue {
                    #krate::ResultValue::Node(::std::sync::Arc::new(::std::clone::Clone::clone(self)))
                }
            }
        }
    };

    let expanded = quote! {
        #[automatically_derived]
        impl #impl_generics #krate::ResultNode for #name #ty_generics #where_clause {
            fn type_name(&self) -> &'static str {
                stringify!(#name)
            }

            fn fields(&self) -> ::std::vec::Vec<(::std::string::String, #krate::ResultValue)> {
                ::std::vec![
                    #(#entries),*
                ]
            }
        }

        #by_value

        #[automatically_derived]
        impl #impl_generics ::std::convert::From<#name #ty_generics> for #krate::ResultValue #where_clause {
            fn from(node: #name #ty_generics) -> Self {
                #krate::ResultValue::Node(::std::sync::Arc::new(node))
            }
        }
    };

    Ok(expanded)
}

/// `#[result(no_clone)]` on the struct: reachable through `Arc` only.
fn container_no_clone(attrs: &[Attribute]) -> Result<bool> {
    let mut no_clone = false;
    for attr in attrs {
        if !attr.path().is_ident("result") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("no_clone") {
                no_clone = true;
                Ok(())
            } else {
                Err(meta.error("unknown #[result] key on a struct, expected no_clone"))
            }
        })?;
    }
    Ok(no_clone)
}
