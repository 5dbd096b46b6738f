//! # JSON-RPC Server Prelude
//!
//! This module provides convenient re-exports of the most commonly used types
//! from the JSON-RPC server library.
//!
//! ```rust
//! use turul_json_rpc_server::prelude::*;
//! ```

// Dispatching
pub use crate::config::ServerConfig;
pub use crate::dispatch::JsonRpcDispatcher;
pub use crate::response::{JsonRpcMessage, ResponseBody};

// Methods and hooks
pub use crate::error::{BoxError, JsonRpcErrorCode, RpcError};
pub use crate::events::{EventSink, HookDecision, InvocationTiming};
pub use crate::method::{CallContext, RpcMethod};
pub use crate::pipeline::InvocationOutcome;
pub use crate::request::{RequestEnvelope, RequestParams};
pub use crate::types::RequestId;

// Parameters and results
pub use crate::result::{ArrayResult, ResultValue, ToResultValue};
pub use crate::schema::{NoParams, RpcParams};

#[cfg(feature = "derive")]
pub use turul_json_rpc_derive::{ResultNode, RpcEnum, RpcParams};

// Standard error codes
pub use crate::error_codes::*;
