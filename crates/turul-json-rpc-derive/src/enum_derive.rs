//! Implementation of #[derive(RpcEnum)]
//!
//! Unit enums become backed enums (integer backing from explicit
//! discriminants, string backing from `#[rpc(value = "...")]`, otherwise the
//! variant name) and get matching serde impls. Enums whose variants each wrap
//! one type become unions of those types; their serde impls stay with the
//! user (`#[serde(untagged)]`).

use proc_macro2::{Literal, TokenStream};
use quote::quote;
use syn::{Data, DataEnum, DeriveInput, Fields, Result};

use crate::utils::{discriminant_value, extract_variant_value, krate};

enum Backing {
    Int(Vec<i64>),
    String(Vec<String>),
    Name(Vec<String>),
}

pub fn derive_rpc_enum_impl(input: DeriveInput) -> Result<TokenStream> {
    let data = match &input.data {
        Data::Enum(data) => data,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "RpcEnum can only be derived for enums",
            ));
        }
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "RpcEnum needs at least one variant",
        ));
    }

    let all_unit = data.variants.iter().all(|v| matches!(v.fields, Fields::Unit));
    let all_newtype = data
        .variants
        .iter()
        .all(|v| matches!(&v.fields, Fields::Unnamed(f) if f.unnamed.len() == 1));

    if all_unit {
        backed_enum(&input, data)
    } else if all_newtype {
        union_enum(&input, data)
    } else {
        Err(syn::Error::new_spanned(
            &input.ident,
            "RpcEnum variants must either all be unit variants or all wrap exactly one type",
        ))
    }
}

fn backing_of(data: &DataEnum) -> Result<Backing> {
    let has_discriminant = data.variants.iter().any(|v| v.discriminant.is_some());
    let values = data
        .variants
        .iter()
        .map(|v| extract_variant_value(&v.attrs))
        .collect::<Result<Vec<_>>>()?;
    let valued = values.iter().filter(|v| v.is_some()).count();

    if has_discriminant && valued > 0 {
        return Err(syn::Error::new_spanned(
            &data.variants,
            "use either discriminants or #[rpc(value)], not both",
        ));
    }

    if has_discriminant {
        // Implicit discriminants follow the previous one, as in Rust
        let mut next = 0i64;
        let mut ints = Vec::new();
        for variant in &data.variants {
            let value = match &variant.discriminant {
                Some((_, expr)) => discriminant_value(expr)?,
                None => next,
            };
            ints.push(value);
            next = value.wrapping_add(1);
        }
        return Ok(Backing::Int(ints));
    }

    if valued > 0 {
        if valued != values.len() {
            return Err(syn::Error::new_spanned(
                &data.variants,
                "every variant needs #[rpc(value)] once one has it",
            ));
        }
        return Ok(Backing::String(
            values.into_iter().flatten().map(|lit| lit.value()).collect(),
        ));
    }

    Ok(Backing::Name(
        data.variants.iter().map(|v| v.ident.to_string()).collect(),
    ))
}

fn backed_enum(input: &DeriveInput, data: &DataEnum) -> Result<TokenStream> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "RpcEnum cannot be derived for generic unit enums",
        ));
    }
    let name_str = name.to_string();
    let krate = krate();
    let serde = quote! { #krate::__private::serde };
    let json = quote! { #krate::__private::serde_json };

    let idents: Vec<_> = data.variants.iter().map(|v| &v.ident).collect();
    let case_names: Vec<String> = idents.iter().map(|i| i.to_string()).collect();

    let (kind, wire_values, serialize_arms, backing_arms, decode) = match backing_of(data)? {
        Backing::Int(ints) => {
            let patterns: Vec<TokenStream> = ints.iter().map(|&n| int_pattern(n)).collect();
            (
                quote! { #krate::PrimitiveKind::Int },
                quote! { #(#json::Value::from(#patterns as i64)),* },
                quote! { #(Self::#idents => serializer.serialize_i64(#patterns),)* },
                quote! { #(Self::#idents => ::std::option::Option::Some(#json::Value::from(#patterns as i64)),)* },
                quote! {
                    match value.as_i64() {
                        #(::std::option::Option::Some(#patterns) => ::std::option::Option::Some(Self::#idents),)*
                        _ => ::std::option::Option::None,
                    }
                },
            )
        }
        Backing::String(strings) => (
            quote! { #krate::PrimitiveKind::String },
            quote! { #(#json::Value::from(#strings)),* },
            quote! { #(Self::#idents => serializer.serialize_str(#strings),)* },
            quote! { #(Self::#idents => ::std::option::Option::Some(#json::Value::from(#strings)),)* },
            quote! {
                match value.as_str() {
                    #(::std::option::Option::Some(#strings) => ::std::option::Option::Some(Self::#idents),)*
                    _ => ::std::option::Option::None,
                }
            },
        ),
        Backing::Name(names) => (
            quote! { #krate::PrimitiveKind::String },
            quote! { #(#json::Value::from(#names)),* },
            quote! { #(Self::#idents => serializer.serialize_str(#names),)* },
            quote! { #(Self::#idents => ::std::option::Option::None,)* },
            quote! {
                match value.as_str() {
                    #(::std::option::Option::Some(#names) => ::std::option::Option::Some(Self::#idents),)*
                    _ => ::std::option::Option::None,
                }
            },
        ),
    };

    let expanded = quote! {
        #[automatically_derived]
        impl #krate::BackedEnum for #name {
            fn case_name(&self) -> &'static str {
                match self {
                    #(Self::#idents => #case_names,)*
                }
            }

            fn backing_value(&self) -> ::std::option::Option<#json::Value> {
                match self {
                    #backing_arms
                }
            }
        }

        #[automatically_derived]
        impl #krate::DeclaredType for #name {
            fn type_shape() -> #krate::TypeShape {
                #krate::TypeShape::BackedEnum {
                    backing: #kind,
                    cases: ::std::vec![#wire_values],
                }
            }
        }

        #[automatically_derived]
        impl #krate::ToResultValue for #name {
            fn to_result_value(&self) -> #krate::ResultValue {
                #krate::ResultValue::Enum {
                    name: #krate::BackedEnum::case_name(self),
                    backing: #krate::BackedEnum::backing_value(self),
                }
            }
        }

        #[automatically_derived]
        impl #serde::Serialize for #name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: #serde::Serializer,
            {
                match self {
                    #serialize_arms
                }
            }
        }

        #[automatically_derived]
        impl<'de> #serde::Deserialize<'de> for #name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
            where
                D: #serde::Deserializer<'de>,
            {
                let value = <#json::Value as #serde::Deserialize>::deserialize(deserializer)?;
                let decoded: ::std::option::Option<Self> = #decode;
                decoded.ok_or_else(|| {
                    <D::Error as #serde::de::Error>::custom(::std::format!(
                        "{} is not a valid {}",
                        value,
                        #name_str
                    ))
                })
            }
        }
    };

    Ok(expanded)
}

fn union_enum(input: &DeriveInput, data: &DataEnum) -> Result<TokenStream> {
    let name = &input.ident;
    let krate = krate();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let idents: Vec<_> = data.variants.iter().map(|v| &v.ident).collect();
    let member_types: Vec<_> = data
        .variants
        .iter()
        .filter_map(|v| match &v.fields {
            Fields::Unnamed(fields) => fields.unnamed.first().map(|f| &f.ty),
            _ => None,
        })
        .collect();

    let expanded = quote! {
        #[automatically_derived]
        impl #impl_generics #krate::DeclaredType for #name #ty_generics #where_clause {
            fn type_shape() -> #krate::TypeShape {
                #krate::TypeShape::Union(::std::vec![
                    #(<#member_types as #krate::DeclaredType>::type_shape()),*
                ])
            }
        }

        #[automatically_derived]
        impl #impl_generics #krate::ToResultValue for #name #ty_generics #where_clause {
            fn to_result_value(&self) -> #krate::ResultValue {
                match self {
                    #(Self::#idents(inner) => #krate::ToResultValue::to_result_value(inner),)*
                }
            }
        }
    };

    Ok(expanded)
}

/// `-3` as a pattern-friendly token pair rather than a negative literal
fn int_pattern(value: i64) -> TokenStream {
    let magnitude = Literal::u64_unsuffixed(value.unsigned_abs());
    if value < 0 {
        quote! { -#magnitude }
    } else {
        quote! { #magnitude }
    }
}
