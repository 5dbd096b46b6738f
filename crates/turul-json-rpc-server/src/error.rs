use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

use crate::error_codes;

/// Boxed error returned by method implementations.
///
/// An error that downcasts to [`RpcError`] is a typed failure and reaches the
/// client unchanged; anything else is reported as an internal error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    AccessDenied,
    /// Any other integer, raised directly by a method
    Application(i64),
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::AccessDenied => error_codes::ACCESS_DENIED,
            JsonRpcErrorCode::Application(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::AccessDenied => "Access denied",
            JsonRpcErrorCode::Application(_) => "Application error",
        }
    }

    /// Map a raw wire code back onto the taxonomy.
    pub fn from_code(code: i64) -> Self {
        match code {
            error_codes::PARSE_ERROR => JsonRpcErrorCode::ParseError,
            error_codes::INVALID_REQUEST => JsonRpcErrorCode::InvalidRequest,
            error_codes::METHOD_NOT_FOUND => JsonRpcErrorCode::MethodNotFound,
            error_codes::INVALID_PARAMS => JsonRpcErrorCode::InvalidParams,
            error_codes::INTERNAL_ERROR => JsonRpcErrorCode::InternalError,
            error_codes::ACCESS_DENIED => JsonRpcErrorCode::AccessDenied,
            other => JsonRpcErrorCode::Application(other),
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data: data.filter(has_content),
        }
    }
}

/// `data` is only emitted when it carries something.
fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

#[derive(Debug, Clone, PartialEq)]
struct InternalCause {
    message: String,
    chain: Vec<String>,
}

/// Typed failure produced anywhere between the parser and the normalizer.
///
/// Internal errors keep their original cause aside so that it only reaches
/// the wire when the server is configured to expose internals.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    code: JsonRpcErrorCode,
    message: String,
    data: Option<Value>,
    cause: Option<InternalCause>,
}

impl RpcError {
    pub fn new(code: JsonRpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
            cause: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(detail: impl fmt::Display) -> Self {
        Self::new(JsonRpcErrorCode::ParseError, JsonRpcErrorCode::ParseError.message())
            .with_data(json!({ "reason": detail.to_string() }))
    }

    /// Malformed envelope; `content` is the offending item as received.
    pub fn invalid_request(reason: impl Into<String>, content: Value) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, reason).with_data(json!({ "request": content }))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            format!("Method '{}' not found", method),
        )
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidParams, message)
    }

    /// Invalid params pinned to one field path.
    pub fn invalid_param(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = message.into();
        Self::new(JsonRpcErrorCode::InvalidParams, message.clone())
            .with_data(json!({ "field": field, "message": message }))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code: JsonRpcErrorCode::InternalError,
            message: JsonRpcErrorCode::InternalError.message().to_string(),
            data: None,
            cause: Some(InternalCause {
                message,
                chain: Vec::new(),
            }),
        }
    }

    /// Wrap an unclassified failure, remembering its source chain.
    pub fn from_cause(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(inner) = source {
            chain.push(inner.to_string());
            source = inner.source();
        }
        Self {
            code: JsonRpcErrorCode::InternalError,
            message: JsonRpcErrorCode::InternalError.message().to_string(),
            data: None,
            cause: Some(InternalCause {
                message: error.to_string(),
                chain,
            }),
        }
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(JsonRpcErrorCode::AccessDenied, message)
    }

    pub fn application(code: i64, message: impl Into<String>) -> Self {
        Self::new(JsonRpcErrorCode::from_code(code), message)
    }

    /// Classify an error returned by a method.
    pub fn classify(error: BoxError) -> Self {
        match error.downcast::<RpcError>() {
            Ok(typed) => *typed,
            Err(other) => Self::from_cause(other.as_ref()),
        }
    }

    pub fn code(&self) -> JsonRpcErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn is_internal(&self) -> bool {
        self.cause.is_some()
    }

    /// Wire representation. Internal causes only surface with `expose_internals`.
    pub fn to_error_object(&self, expose_internals: bool) -> JsonRpcErrorObject {
        match &self.cause {
            Some(cause) if expose_internals => JsonRpcErrorObject::new(
                self.code,
                Some(cause.message.clone()),
                Some(json!({ "source": cause.message, "chain": cause.chain })),
            ),
            Some(_) => JsonRpcErrorObject::new(self.code, None, None),
            None => JsonRpcErrorObject::new(self.code, Some(self.message.clone()), self.data.clone()),
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "JSON-RPC Error {}: {}", self.code.code(), cause.message),
            None => write!(f, "JSON-RPC Error {}: {}", self.code.code(), self.message),
        }
    }
}

impl std::error::Error for RpcError {}
