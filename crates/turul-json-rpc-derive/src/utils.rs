//! Utility functions for macro implementations

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Data, DeriveInput, Fields, Result, Token};

/// Path every generated item refers to
pub fn krate() -> TokenStream {
    quote! { ::turul_json_rpc_server }
}

/// Named fields of a struct, or an error naming the derive.
pub fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> Result<&'a syn::punctuated::Punctuated<syn::Field, Token![,]>> {
    match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                format!("{} can only be derived for structs with named fields", derive),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            format!("{} can only be derived for structs", derive),
        )),
    }
}

/// Field name as it appears in Rust source, without `r#`.
pub fn field_name(field: &syn::Field) -> Result<String> {
    field
        .ident
        .as_ref()
        .map(|ident| ident.unraw().to_string())
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))
}

pub fn is_option_type(ty: &syn::Type) -> bool {
    if let syn::Type::Path(type_path) = ty {
        type_path.qself.is_none()
            && type_path
                .path
                .segments
                .last()
                .is_some_and(|segment| segment.ident == "Option")
    } else {
        false
    }
}

/// How a parameter field gets a value when the caller leaves it out
#[derive(Debug)]
pub enum DefaultMeta {
    /// `#[param(default)]`: the field's own `Default`, through serde
    Implicit,
    /// `#[param(default = expr)]`
    Expr(syn::Expr),
}

/// Extract parameter metadata from field attributes
#[derive(Debug, Default)]
pub struct ParamMeta {
    pub description: Option<String>,
    pub optional: bool,
    pub default: Option<DefaultMeta>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub not_blank: bool,
    pub pattern: Option<String>,
}

pub fn extract_param_meta(attrs: &[Attribute]) -> Result<ParamMeta> {
    let mut meta = ParamMeta::default();

    for attr in attrs {
        if !attr.path().is_ident("param") {
            continue;
        }
        attr.parse_nested_meta(|nested_meta| {
            if nested_meta.path.is_ident("description") {
                let s: syn::LitStr = nested_meta.value()?.parse()?;
                meta.description = Some(s.value());
            } else if nested_meta.path.is_ident("optional") {
                // Handle both #[param(optional)] and #[param(optional = true/false)]
                meta.optional = parse_flag(&nested_meta)?;
            } else if nested_meta.path.is_ident("default") {
                if nested_meta.input.peek(Token![=]) {
                    let expr: syn::Expr = nested_meta.value()?.parse()?;
                    meta.default = Some(DefaultMeta::Expr(expr));
                } else {
                    meta.default = Some(DefaultMeta::Implicit);
                }
            } else if nested_meta.path.is_ident("min") {
                meta.min = Some(parse_number(&nested_meta)?);
            } else if nested_meta.path.is_ident("max") {
                meta.max = Some(parse_number(&nested_meta)?);
            } else if nested_meta.path.is_ident("min_length") {
                let lit: syn::LitInt = nested_meta.value()?.parse()?;
                meta.min_length = Some(lit.base10_parse()?);
            } else if nested_meta.path.is_ident("max_length") {
                let lit: syn::LitInt = nested_meta.value()?.parse()?;
                meta.max_length = Some(lit.base10_parse()?);
            } else if nested_meta.path.is_ident("not_blank") {
                meta.not_blank = parse_flag(&nested_meta)?;
            } else if nested_meta.path.is_ident("pattern") {
                let s: syn::LitStr = nested_meta.value()?.parse()?;
                if let Err(e) = regex::Regex::new(&s.value()) {
                    return Err(syn::Error::new_spanned(&s, format!("invalid pattern: {}", e)));
                }
                meta.pattern = Some(s.value());
            } else {
                return Err(nested_meta.error(
                    "unknown #[param] key, expected one of: description, optional, default, \
                     min, max, min_length, max_length, not_blank, pattern",
                ));
            }
            Ok(())
        })?;

        if let (Some(min), Some(max)) = (meta.min, meta.max)
            && min > max
        {
            return Err(syn::Error::new_spanned(attr, "min must not be greater than max"));
        }
        if let (Some(min), Some(max)) = (meta.min_length, meta.max_length)
            && min > max
        {
            return Err(syn::Error::new_spanned(
                attr,
                "min_length must not be greater than max_length",
            ));
        }
    }

    Ok(meta)
}

/// `flag` alone means true; `flag = bool` is explicit.
fn parse_flag(meta: &ParseNestedMeta) -> Result<bool> {
    if meta.input.peek(Token![=]) {
        let lit: syn::LitBool = meta.value()?.parse()?;
        Ok(lit.value)
    } else {
        Ok(true)
    }
}

/// Integer or float literal, optionally negative.
fn parse_number(meta: &ParseNestedMeta) -> Result<f64> {
    let value = meta.value()?;
    let negative = value.peek(Token![-]);
    if negative {
        value.parse::<Token![-]>()?;
    }
    let number = match value.parse::<syn::Lit>()? {
        syn::Lit::Float(lit) => lit.base10_parse::<f64>()?,
        syn::Lit::Int(lit) => lit.base10_parse::<f64>()?,
        other => return Err(syn::Error::new_spanned(other, "expected a number")),
    };
    Ok(if negative { -number } else { number })
}

/// The parts of `#[serde(...)]` that change what a field looks like on the wire
#[derive(Debug, Default)]
pub struct SerdeFieldMeta {
    pub rename: Option<String>,
    pub skip: bool,
    pub default: bool,
    /// `with` or `deserialize_with`: the field type alone cannot decode the value
    pub custom_deserializer: bool,
}

pub fn extract_serde_meta(attrs: &[Attribute]) -> Result<SerdeFieldMeta> {
    let mut meta = SerdeFieldMeta::default();

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|nested_meta| {
            if nested_meta.path.is_ident("rename") {
                if nested_meta.input.peek(Token![=]) {
                    let s: syn::LitStr = nested_meta.value()?.parse()?;
                    meta.rename = Some(s.value());
                } else {
                    // rename(serialize = "...", deserialize = "...")
                    nested_meta.parse_nested_meta(|inner| {
                        if inner.path.is_ident("deserialize") {
                            let s: syn::LitStr = inner.value()?.parse()?;
                            meta.rename = Some(s.value());
                            Ok(())
                        } else {
                            skip_meta(&inner)
                        }
                    })?;
                }
            } else if nested_meta.path.is_ident("skip")
                || nested_meta.path.is_ident("skip_deserializing")
            {
                meta.skip = true;
            } else if nested_meta.path.is_ident("default") {
                meta.default = true;
                skip_meta(&nested_meta)?;
            } else if nested_meta.path.is_ident("with")
                || nested_meta.path.is_ident("deserialize_with")
            {
                meta.custom_deserializer = true;
                skip_meta(&nested_meta)?;
            } else {
                skip_meta(&nested_meta)?;
            }
            Ok(())
        })?;
    }

    Ok(meta)
}

/// Field naming rules accepted by `#[serde(rename_all = "...")]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(lit: &syn::LitStr) -> Result<Self> {
        match lit.value().as_str() {
            "lowercase" => Ok(RenameRule::Lower),
            "UPPERCASE" => Ok(RenameRule::Upper),
            "PascalCase" => Ok(RenameRule::Pascal),
            "camelCase" => Ok(RenameRule::Camel),
            "snake_case" => Ok(RenameRule::Snake),
            "SCREAMING_SNAKE_CASE" => Ok(RenameRule::ScreamingSnake),
            "kebab-case" => Ok(RenameRule::Kebab),
            "SCREAMING-KEBAB-CASE" => Ok(RenameRule::ScreamingKebab),
            other => Err(syn::Error::new_spanned(
                lit,
                format!("unknown rename_all rule: {}", other),
            )),
        }
    }

    /// Apply the rule to a snake_case field name, the way serde does.
    pub fn apply_to_field(self, field: &str) -> String {
        match self {
            RenameRule::Lower | RenameRule::Snake => field.to_string(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Pascal => snake_to_pascal_case(field),
            RenameRule::Camel => {
                let pascal = snake_to_pascal_case(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::ScreamingKebab => field.to_ascii_uppercase().replace('_', "-"),
        }
    }
}

fn snake_to_pascal_case(field: &str) -> String {
    let mut pascal = String::with_capacity(field.len());
    let mut capitalize = true;
    for ch in field.chars() {
        if ch == '_' {
            capitalize = true;
        } else if capitalize {
            pascal.push(ch.to_ascii_uppercase());
            capitalize = false;
        } else {
            pascal.push(ch);
        }
    }
    pascal
}

/// Container-level `#[serde(...)]` items that change field names or presence
#[derive(Debug, Default)]
pub struct SerdeContainerMeta {
    pub rename_all: Option<RenameRule>,
    /// `#[serde(default)]` on the struct: every field may be left out
    pub default: bool,
}

pub fn extract_serde_container_meta(attrs: &[Attribute]) -> Result<SerdeContainerMeta> {
    let mut meta = SerdeContainerMeta::default();

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|nested_meta| {
            if nested_meta.path.is_ident("rename_all") {
                if nested_meta.input.peek(Token![=]) {
                    let s: syn::LitStr = nested_meta.value()?.parse()?;
                    meta.rename_all = Some(RenameRule::parse(&s)?);
                } else {
                    // rename_all(serialize = "...", deserialize = "...")
                    nested_meta.parse_nested_meta(|inner| {
                        if inner.path.is_ident("deserialize") {
                            let s: syn::LitStr = inner.value()?.parse()?;
                            meta.rename_all = Some(RenameRule::parse(&s)?);
                            Ok(())
                        } else {
                            skip_meta(&inner)
                        }
                    })?;
                }
            } else if nested_meta.path.is_ident("default") {
                meta.default = true;
                skip_meta(&nested_meta)?;
            } else {
                skip_meta(&nested_meta)?;
            }
            Ok(())
        })?;
    }

    Ok(meta)
}

/// Consume a meta item this crate does not interpret.
fn skip_meta(meta: &ParseNestedMeta) -> Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta(&inner))?;
    }
    Ok(())
}

/// Field metadata from `#[result(...)]`
#[derive(Debug, Default)]
pub struct ResultFieldMeta {
    pub skip: bool,
    pub rename: Option<String>,
    /// Include a non-`pub` field
    pub expose: bool,
}

pub fn extract_result_meta(attrs: &[Attribute]) -> Result<ResultFieldMeta> {
    let mut meta = ResultFieldMeta::default();

    for attr in attrs {
        if !attr.path().is_ident("result") {
            continue;
        }
        attr.parse_nested_meta(|nested_meta| {
            if nested_meta.path.is_ident("skip") {
                meta.skip = parse_flag(&nested_meta)?;
            } else if nested_meta.path.is_ident("expose") {
                meta.expose = parse_flag(&nested_meta)?;
            } else if nested_meta.path.is_ident("rename") {
                let s: syn::LitStr = nested_meta.value()?.parse()?;
                meta.rename = Some(s.value());
            } else {
                return Err(nested_meta.error("unknown #[result] key, expected skip, rename or expose"));
            }
            Ok(())
        })?;
    }

    Ok(meta)
}

/// `#[rpc(value = "...")]` on an enum variant
pub fn extract_variant_value(attrs: &[Attribute]) -> Result<Option<syn::LitStr>> {
    let mut value = None;

    for attr in attrs {
        if !attr.path().is_ident("rpc") {
            continue;
        }
        attr.parse_nested_meta(|nested_meta| {
            if nested_meta.path.is_ident("value") {
                value = Some(nested_meta.value()?.parse::<syn::LitStr>()?);
                Ok(())
            } else {
                Err(nested_meta.error("unknown #[rpc] key, expected value"))
            }
        })?;
    }

    Ok(value)
}

/// Integer value of an explicit discriminant (`= 3`, `= -1`).
pub fn discriminant_value(expr: &syn::Expr) -> Result<i64> {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Int(lit),
            ..
        }) => lit.base10_parse(),
        syn::Expr::Unary(syn::ExprUnary {
            op: syn::UnOp::Neg(_),
            expr,
            ..
        }) => discriminant_value(expr).map(|value| -value),
        syn::Expr::Group(group) => discriminant_value(&group.expr),
        other => Err(syn::Error::new_spanned(
            other,
            "backed enum discriminants must be integer literals",
        )),
    }
}
