use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use crate::error::{JsonRpcErrorObject, RpcError};
use crate::pipeline::InvocationOutcome;
use crate::serializer::ResultSerializer;
use crate::types::{JsonRpcVersion, RequestId};

/// A successful JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: RequestId,
    pub result: Value,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            result,
        }
    }
}

/// A JSON-RPC error response. `id` is `null` when the request id could not
/// be determined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: Option<RequestId>,
    pub error: JsonRpcErrorObject,
}

impl JsonRpcErrorResponse {
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            error,
        }
    }
}

/// Union type that represents either a successful response or an error response
/// This ensures JSON-RPC 2.0 compliance by keeping success and error responses separate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Successful response with result field
    Response(JsonRpcResponse),
    /// Error response with error field
    Error(JsonRpcErrorResponse),
}

impl JsonRpcMessage {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Response(JsonRpcResponse::success(id, result))
    }

    pub fn error(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self::Error(JsonRpcErrorResponse::new(id, error))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    pub fn id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcMessage::Response(resp) => Some(&resp.id),
            JsonRpcMessage::Error(err) => err.id.as_ref(),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            JsonRpcMessage::Response(resp) => Some(&resp.result),
            JsonRpcMessage::Error(_) => None,
        }
    }

    pub fn error_object(&self) -> Option<&JsonRpcErrorObject> {
        match self {
            JsonRpcMessage::Response(_) => None,
            JsonRpcMessage::Error(err) => Some(&err.error),
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcErrorResponse> for JsonRpcMessage {
    fn from(error: JsonRpcErrorResponse) -> Self {
        Self::Error(error)
    }
}

/// What goes back on the wire for one payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Single(JsonRpcMessage),
    Batch(Vec<JsonRpcMessage>),
}

impl ResponseBody {
    pub fn messages(&self) -> &[JsonRpcMessage] {
        match self {
            ResponseBody::Single(message) => std::slice::from_ref(message),
            ResponseBody::Batch(messages) => messages,
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, ResponseBody::Batch(_))
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Turns invocation outcomes into response messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseNormalizer {
    serializer: ResultSerializer,
    expose_internal_errors: bool,
}

impl ResponseNormalizer {
    pub fn new(serializer: ResultSerializer, expose_internal_errors: bool) -> Self {
        Self {
            serializer,
            expose_internal_errors,
        }
    }

    /// `None` for notifications; otherwise exactly one message.
    ///
    /// `id` is the id to echo, `None` meaning the request was a notification.
    pub fn normalize(&self, id: Option<&RequestId>, outcome: InvocationOutcome) -> Option<JsonRpcMessage> {
        let Some(id) = id else {
            if let InvocationOutcome::Failure(failure) = &outcome {
                warn!("Dropping failure of notification: {}", failure);
            }
            return None;
        };

        match outcome {
            InvocationOutcome::Success(value) => match self.serializer.serialize(&value) {
                Ok(result) => Some(JsonRpcMessage::success(id.clone(), result)),
                Err(e) => {
                    error!("Result for request {} could not be serialized: {}", id, e);
                    Some(self.failure(Some(id.clone()), &RpcError::from_cause(&e)))
                }
            },
            InvocationOutcome::Failure(failure) => Some(self.failure(Some(id.clone()), &failure)),
        }
    }

    /// Error message for a failure that is always answered (parse and
    /// request-shape failures, unknown methods).
    pub fn failure(&self, id: Option<RequestId>, failure: &RpcError) -> JsonRpcMessage {
        JsonRpcMessage::error(id, failure.to_error_object(self.expose_internal_errors))
    }

    /// Batch aggregation: no messages at all means no response.
    pub fn aggregate(messages: Vec<JsonRpcMessage>, batch: bool) -> Option<ResponseBody> {
        if batch {
            return (!messages.is_empty()).then_some(ResponseBody::Batch(messages));
        }
        messages.into_iter().next().map(ResponseBody::Single)
    }
}
