//! Request envelopes and the parser that turns a decoded payload into them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::RpcError;
use crate::types::{JsonRpcVersion, RequestId};

/// Parameters for a JSON-RPC request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object
    Object(Map<String, Value>),
}

impl Default for RequestParams {
    fn default() -> Self {
        RequestParams::Object(Map::new())
    }
}

impl RequestParams {
    pub fn is_positional(&self) -> bool {
        matches!(self, RequestParams::Array(_))
    }

    pub fn len(&self) -> usize {
        match self {
            RequestParams::Object(map) => map.len(),
            RequestParams::Array(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One call extracted from the payload.
///
/// The id is kept twice: normalized (numeric strings become integers) for
/// operations and hooks, and as sent so the response echoes it unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    version: JsonRpcVersion,
    id: Option<RequestId>,
    wire_id: Option<RequestId>,
    method: String,
    params: RequestParams,
}

impl RequestEnvelope {
    pub fn new(id: Option<RequestId>, method: impl Into<String>, params: RequestParams) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id: id.as_ref().map(RequestId::normalized),
            wire_id: id,
            method: method.into(),
            params,
        }
    }

    pub fn request(id: impl Into<RequestId>, method: impl Into<String>, params: RequestParams) -> Self {
        Self::new(Some(id.into()), method, params)
    }

    pub fn notification(method: impl Into<String>, params: RequestParams) -> Self {
        Self::new(None, method, params)
    }

    pub fn version(&self) -> JsonRpcVersion {
        self.version
    }

    /// Normalized id.
    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    /// Id exactly as the client sent it.
    pub fn response_id(&self) -> Option<&RequestId> {
        self.wire_id.as_ref()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &RequestParams {
        &self.params
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// An item that could not be turned into an envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    /// Id recovered from the malformed item, when it had a usable one.
    pub id: Option<RequestId>,
    pub error: RpcError,
}

impl ParseFailure {
    pub fn new(id: Option<RequestId>, error: RpcError) -> Self {
        Self { id, error }
    }
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for ParseFailure {}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchItem {
    Request(RequestEnvelope),
    Invalid(ParseFailure),
}

/// The parser's output: every item of the payload plus whether it was a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CallBatch {
    items: Vec<BatchItem>,
    batch: bool,
}

impl CallBatch {
    pub fn single(envelope: RequestEnvelope) -> Self {
        Self {
            items: vec![BatchItem::Request(envelope)],
            batch: false,
        }
    }

    pub fn is_batch(&self) -> bool {
        self.batch
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<BatchItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Decode raw payload text and parse it.
pub fn parse_payload(payload: &str) -> Result<CallBatch, ParseFailure> {
    let value: Value = serde_json::from_str(payload).map_err(|e| {
        debug!("Rejecting payload that is not valid JSON: {}", e);
        ParseFailure::new(None, RpcError::parse_error(e))
    })?;
    parse_value(value)
}

/// Parse an already decoded payload.
///
/// A batch captures item failures in place; a single call returns its
/// failure directly.
pub fn parse_value(value: Value) -> Result<CallBatch, ParseFailure> {
    if !looks_like_batch(&value) {
        return denormalize(value).map(CallBatch::single);
    }

    let elements: Vec<Value> = match value {
        Value::Array(items) => items,
        // Source order (`preserve_order`)
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        other => return denormalize(other).map(CallBatch::single),
    };
    debug!("Parsing batch of {} items", elements.len());

    let items = elements
        .into_iter()
        .map(|element| match denormalize(element) {
            Ok(envelope) => BatchItem::Request(envelope),
            Err(failure) => BatchItem::Invalid(failure),
        })
        .collect();

    Ok(CallBatch { items, batch: true })
}

/// Non-empty, and every key is a sequential non-negative integer index.
pub fn looks_like_batch(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) if !map.is_empty() => {
            let mut indices = Vec::with_capacity(map.len());
            for key in map.keys() {
                match key.parse::<usize>() {
                    Ok(index) if index.to_string() == *key => indices.push(index),
                    _ => return false,
                }
            }
            indices.sort_unstable();
            indices.iter().enumerate().all(|(expected, index)| expected == *index)
        }
        _ => false,
    }
}

/// Turn one decoded item into an envelope.
pub fn denormalize(item: Value) -> Result<RequestEnvelope, ParseFailure> {
    let mut object = match item {
        Value::Object(object) => object,
        other => {
            let reason = match &other {
                Value::Array(items) if items.is_empty() => "Empty batch",
                _ => "Request must be a JSON object",
            };
            debug!("Invalid request: {}", reason);
            return Err(ParseFailure::new(None, RpcError::invalid_request(reason, other)));
        }
    };

    let id = match object.get("id") {
        None => None,
        Some(raw) => match read_id(raw) {
            Some(id) => Some(id),
            None => {
                return Err(reject(None, "'id' must be an integer or a string", object));
            }
        },
    };

    match object.get("jsonrpc") {
        None => return Err(reject(id, "Missing 'jsonrpc' member", object)),
        Some(Value::String(version)) if version == crate::JSONRPC_VERSION => {}
        Some(Value::String(_)) => {
            return Err(reject(id, "Unsupported JSON-RPC version, expected \"2.0\"", object));
        }
        Some(_) => return Err(reject(id, "'jsonrpc' must be a string", object)),
    }

    let method = match object.get("method") {
        None => return Err(reject(id, "Missing 'method' member", object)),
        Some(Value::String(method)) => method.clone(),
        Some(_) => return Err(reject(id, "'method' must be a string", object)),
    };

    let params = match object.remove("params") {
        None => RequestParams::default(),
        Some(Value::Object(map)) => RequestParams::Object(map),
        Some(Value::Array(items)) => RequestParams::Array(items),
        Some(other) => {
            object.insert("params".to_string(), other);
            return Err(reject(id, "'params' must be an array or an object", object));
        }
    };

    Ok(RequestEnvelope::new(id, method, params))
}

/// Integer ids must fit an `i64`; larger ones are rejected like any other
/// unusable id. Clients needing wider ids can send them as strings.
fn read_id(raw: &Value) -> Option<RequestId> {
    match raw {
        Value::String(s) => Some(RequestId::String(s.clone())),
        Value::Number(n) => n.as_i64().map(RequestId::Number),
        _ => None,
    }
}

fn reject(id: Option<RequestId>, reason: &str, content: Map<String, Value>) -> ParseFailure {
    debug!("Invalid request: {}", reason);
    ParseFailure::new(id, RpcError::invalid_request(reason, Value::Object(content)))
}
