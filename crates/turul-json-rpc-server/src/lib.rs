//! # JSON-RPC 2.0 Processing Core
//!
//! A transport-agnostic JSON-RPC 2.0 server core: payload parsing with batch
//! detection, parameter schemas derived from the parameter types themselves,
//! an interceptable invocation pipeline, and a result serializer that guards
//! against cycles and runaway nesting.
//!
//! ## Features
//! - Single calls, batches and notifications with per-item failure isolation
//! - `#[derive(RpcParams)]` parameter objects with loose-type widening,
//!   defaults and `#[param(...)]` constraints
//! - Before/after hooks through [`EventSink`]
//! - `#[derive(ResultNode)]` result graphs, serialized with a depth ceiling
//!   and cycle detection
//!
//! ```rust,no_run
//! use turul_json_rpc_server::prelude::*;
//!
//! #[derive(Debug, serde::Deserialize, RpcParams)]
//! struct Echo {
//!     message: String,
//! }
//!
//! # async fn run() {
//! let dispatcher = JsonRpcDispatcher::builder()
//!     .function("echo", |p: Echo, _ctx: CallContext| async move {
//!         Ok::<_, BoxError>(p.message)
//!     })
//!     .build();
//!
//! let response = dispatcher
//!     .handle_payload_str(r#"{"jsonrpc":"2.0","method":"echo","id":1,"params":{"message":"hi"}}"#)
//!     .await;
//! # }
//! ```

// Lets the derive macros refer to `::turul_json_rpc_server` from inside this crate
extern crate self as turul_json_rpc_server;

pub mod binder;
pub mod coercer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod method;
pub mod pipeline;
pub mod prelude;
pub mod request;
pub mod response;
pub mod result;
pub mod schema;
pub mod serializer;
pub mod types;
pub mod validator;

// Re-export main types
pub use binder::{BoundParams, ParameterBinder};
pub use coercer::{Coercer, CoercionError, LooseCoercer};
pub use config::{ConfigError, ServerConfig};
pub use dispatch::{JsonRpcDispatcher, JsonRpcDispatcherBuilder};
pub use error::{BoxError, JsonRpcErrorCode, JsonRpcErrorObject, RpcError};
pub use events::{EventSink, HookDecision, InvocationTiming, NoopSink};
pub use method::{CallContext, FunctionMethod, MethodDescriptor, ParameterInfo, RpcMethod};
pub use pipeline::{InvocationOutcome, InvocationPipeline};
pub use request::{
    BatchItem, CallBatch, ParseFailure, RequestEnvelope, RequestParams, parse_payload, parse_value,
};
pub use response::{JsonRpcErrorResponse, JsonRpcMessage, JsonRpcResponse, ResponseBody};
pub use result::{ArrayResult, BackedEnum, ResultNode, ResultValue, ToPlainData, ToResultValue};
pub use schema::{
    Constraint, DeclaredType, DefaultValue, FieldDeclaration, FieldDecoder, FieldRule,
    LOOSE_TYPE_WIDENING, NestedType, NoParams, ParameterSchema, PrimitiveKind, RpcParams, SchemaRegistry, TypeShape,
};
pub use serializer::{ResultSerializer, SerializationError};
pub use types::{JsonRpcVersion, RequestId};
pub use validator::{SchemaValidator, Validator, Violation};

#[cfg(feature = "derive")]
pub use turul_json_rpc_derive::{ResultNode, RpcEnum, RpcParams};

#[doc(hidden)]
pub mod __private {
    pub use serde;
    pub use serde_json;
}

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Raised by hooks that refuse a call
    pub const ACCESS_DENIED: i64 = -32001;
}
