//! Implementation of #[derive(RpcParams)]

use proc_macro2::{Literal, TokenStream};
use quote::quote;
use syn::{DeriveInput, Result};

use crate::utils::{
    DefaultMeta, extract_param_meta, extract_serde_container_meta, extract_serde_meta, field_name,
    is_option_type, krate, named_fields,
};

pub fn derive_rpc_params_impl(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let krate = krate();
    let fields = named_fields(&input, "RpcParams")?;
    let container = extract_serde_container_meta(&input.attrs)?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut declarations = Vec::new();
    for field in fields {
        let serde_meta = extract_serde_meta(&field.attrs)?;
        let param_meta = extract_param_meta(&field.attrs)?;
        if serde_meta.skip {
            continue;
        }

        // A field-level rename wins over the container's rename_all
        let wire_name = match (serde_meta.rename, container.rename_all) {
            (Some(rename), _) => rename,
            (None, Some(rule)) => rule.apply_to_field(&field_name(field)?),
            (None, None) => field_name(field)?,
        };
        let ty = &field.ty;

        // Option<T> fields are optional unless explicitly marked otherwise
        let optional = param_meta.optional || is_option_type(ty);
        let optional = if optional {
            quote! { .optional(true) }
        } else {
            quote! {}
        };

        let default = match param_meta.default {
            Some(DefaultMeta::Expr(expr)) => {
                quote! { .with_default(#krate::DefaultValue::of(#expr)) }
            }
            Some(DefaultMeta::Implicit) => {
                quote! { .with_default(#krate::DefaultValue::Implicit) }
            }
            None if serde_meta.default || container.default => {
                quote! { .with_default(#krate::DefaultValue::Implicit) }
            }
            None => quote! {},
        };

        let description = match &param_meta.description {
            Some(description) => quote! { .with_description(#description) },
            None => quote! {},
        };

        let mut constraints = Vec::new();
        if let Some(min) = param_meta.min {
            let min = float_tokens(min);
            constraints.push(quote! { .with_constraint(#krate::Constraint::Min(#min)) });
        }
        if let Some(max) = param_meta.max {
            let max = float_tokens(max);
            constraints.push(quote! { .with_constraint(#krate::Constraint::Max(#max)) });
        }
        if let Some(min) = param_meta.min_length {
            constraints.push(quote! { .with_constraint(#krate::Constraint::MinLength(#min)) });
        }
        if let Some(max) = param_meta.max_length {
            constraints.push(quote! { .with_constraint(#krate::Constraint::MaxLength(#max)) });
        }
        if param_meta.not_blank {
            constraints.push(quote! { .with_constraint(#krate::Constraint::NotBlank) });
        }
        if let Some(pattern) = &param_meta.pattern {
            constraints.push(quote! { .with_constraint(#krate::Constraint::Pattern(#pattern)) });
        }

        let decoder = if serde_meta.custom_deserializer {
            quote! {}
        } else {
            quote! { .with_decoder::<#ty>() }
        };

        declarations.push(quote! {
            #krate::FieldDeclaration::of::<#ty>(#wire_name)
                #optional
                #default
                #description
                #(#constraints)*
                #decoder
        });
    }

    let expanded = quote! {
        #[automatically_derived]
        impl #impl_generics #krate::RpcParams for #name #ty_generics #where_clause {
            fn declarations() -> ::std::vec::Vec<#krate::FieldDeclaration> {
                ::std::vec![
                    #(#declarations),*
                ]
            }
        }

        #[automatically_derived]
        impl #impl_generics #krate::DeclaredType for #name #ty_generics #where_clause {
            fn type_shape() -> #krate::TypeShape {
                #krate::TypeShape::Nested(#krate::NestedType::of::<Self>())
            }
        }
    };

    Ok(expanded)
}

/// Negative bounds as `-` plus a literal, never a negative literal token
fn float_tokens(value: f64) -> TokenStream {
    let magnitude = Literal::f64_suffixed(value.abs());
    if value < 0.0 {
        quote! { -#magnitude }
    } else {
        quote! { #magnitude }
    }
}
