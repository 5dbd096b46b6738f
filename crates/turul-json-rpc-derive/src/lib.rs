//! # JSON-RPC Derive Macros
//!
//! Procedural macros that let parameter and result types describe themselves
//! to `turul-json-rpc-server`.
//!
//! ## Features
//!
//! - `#[derive(RpcParams)]` - Field declarations for parameter schema derivation
//! - `#[derive(RpcEnum)]` - Backed enums and union types usable as parameter fields
//! - `#[derive(ResultNode)]` - Field expansion for structured results
//!
//! ## Code Organization
//!
//! - **Derive Macros**: One module per derive (params_derive, enum_derive, result_derive)
//! - **Utilities**: Attribute parsing shared by all of them in the utils module

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod enum_derive;
mod params_derive;
mod result_derive;
mod utils;

#[cfg(test)]
mod tests;

/// Derive macro for parameter objects
///
/// Generates `RpcParams::declarations` (one declaration per deserialized
/// field, in declaration order) and lets the type appear nested inside other
/// parameter objects. The type still derives `serde::Deserialize` itself;
/// `#[serde(rename)]`, `#[serde(skip)]` and `#[serde(default)]` are honored.
///
/// # Attributes
///
/// - `#[param(description = "...")]` - Field description exposed by `describe`
/// - `#[param(optional)]` - Field may be left out (implied for `Option<T>`)
/// - `#[param(default)]` / `#[param(default = expr)]` - Value for a missing field
/// - `#[param(min = 1, max = 10)]` - Numeric bounds
/// - `#[param(min_length = 1, max_length = 64)]` - String or array length bounds
/// - `#[param(not_blank)]` - String must contain non-whitespace
/// - `#[param(pattern = "^[a-z]+$")]` - String must match the regex
///
/// # Example
///
/// ```rust,ignore
/// use turul_json_rpc_server::prelude::*;
///
/// #[derive(Debug, serde::Deserialize, RpcParams)]
/// struct Search {
///     #[param(description = "Text to look for", not_blank)]
///     query: String,
///     #[param(default = 20, min = 1, max = 100)]
///     limit: i64,
///     cursor: Option<String>,
/// }
/// ```
#[proc_macro_derive(RpcParams, attributes(param))]
pub fn derive_rpc_params(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    params_derive::derive_rpc_params_impl(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Derive macro for enums used as parameters or results
///
/// Unit enums are backed enums:
///
/// - explicit discriminants give an integer backing (`Low = 1`)
/// - `#[rpc(value = "...")]` on every variant gives a string backing
/// - otherwise the variant name is the wire value
///
/// `Serialize` and `Deserialize` are generated to match the backing, so do
/// not derive them as well.
///
/// Enums whose variants each wrap a single type are unions of those types.
/// Those keep their own `#[derive(Deserialize)] #[serde(untagged)]`.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Copy, PartialEq, RpcEnum)]
/// enum Priority {
///     Low = 1,
///     High = 3,
/// }
///
/// #[derive(Debug, serde::Deserialize, RpcEnum)]
/// #[serde(untagged)]
/// enum IdOrName {
///     Id(i64),
///     Name(String),
/// }
/// ```
#[proc_macro_derive(RpcEnum, attributes(rpc))]
pub fn derive_rpc_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    enum_derive::derive_rpc_enum_impl(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Derive macro for structured results
///
/// Exposes the `pub` fields of a struct to the result serializer. Each field
/// must implement `ToResultValue`; nested results are shared as `Arc<T>`.
///
/// # Attributes
///
/// - `#[result(skip)]` - Never expose this field
/// - `#[result(rename = "...")]` - Wire name of the field
/// - `#[result(expose)]` - Expose a non-`pub` field
/// - `#[result(no_clone)]` on the struct - Do not implement `ToResultValue`
///   for the bare type (it needs `Clone`); use `Arc<T>` or `ResultValue::from`
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, ResultNode)]
/// struct User {
///     pub id: i64,
///     pub name: String,
///     password_hash: String,
/// }
/// ```
#[proc_macro_derive(ResultNode, attributes(result))]
pub fn derive_result_node(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    result_derive::derive_result_node_impl(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
