use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use crate::binder::ParameterBinder;
use crate::coercer::{Coercer, LooseCoercer};
use crate::config::ServerConfig;
use crate::error::{BoxError, RpcError};
use crate::events::{EventSink, NoopSink};
use crate::method::{CallContext, ErasedMethod, FunctionMethod, MethodDescriptor, RpcMethod, erase};
use crate::pipeline::{InvocationOutcome, InvocationPipeline};
use crate::request::{BatchItem, CallBatch, ParseFailure, RequestEnvelope, parse_payload, parse_value};
use crate::response::{JsonRpcMessage, ResponseBody, ResponseNormalizer};
use crate::result::ToResultValue;
use crate::schema::{RpcParams, SchemaRegistry};
use crate::serializer::ResultSerializer;
use crate::validator::{SchemaValidator, Validator};

/// Routes payloads to registered methods and produces the wire response.
pub struct JsonRpcDispatcher {
    methods: HashMap<String, Arc<dyn ErasedMethod>>,
    pipeline: InvocationPipeline,
    normalizer: ResponseNormalizer,
    config: ServerConfig,
}

impl JsonRpcDispatcher {
    pub fn builder() -> JsonRpcDispatcherBuilder {
        JsonRpcDispatcherBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Handle raw payload text. `None` means nothing is sent back.
    pub async fn handle_payload(&self, payload: &str) -> Option<ResponseBody> {
        match parse_payload(payload) {
            Ok(batch) => self.handle_batch(batch).await,
            Err(failure) => Some(ResponseBody::Single(self.reject(failure))),
        }
    }

    /// Handle raw payload text and encode the response.
    pub async fn handle_payload_str(&self, payload: &str) -> Result<Option<String>, serde_json::Error> {
        self.handle_payload(payload)
            .await
            .map(|body| body.to_json_string())
            .transpose()
    }

    /// Handle an already decoded payload.
    pub async fn handle_value(&self, value: Value) -> Option<ResponseBody> {
        match parse_value(value) {
            Ok(batch) => self.handle_batch(batch).await,
            Err(failure) => Some(ResponseBody::Single(self.reject(failure))),
        }
    }

    pub async fn handle_batch(&self, batch: CallBatch) -> Option<ResponseBody> {
        let is_batch = batch.is_batch();
        // join_all keeps input order
        let messages = join_all(batch.into_items().into_iter().map(|item| async move {
            match item {
                BatchItem::Request(envelope) => self.handle_envelope(&envelope).await,
                BatchItem::Invalid(failure) => Some(self.reject(failure)),
            }
        }))
        .await;

        ResponseNormalizer::aggregate(messages.into_iter().flatten().collect(), is_batch)
    }

    /// Run one envelope. `None` for notifications.
    pub async fn handle_envelope(&self, envelope: &RequestEnvelope) -> Option<JsonRpcMessage> {
        let Some(method) = self.methods.get(envelope.method()) else {
            debug!("No method registered for '{}'", envelope.method());
            let outcome = InvocationOutcome::Failure(RpcError::method_not_found(envelope.method()));
            return self.normalizer.normalize(envelope.response_id(), outcome);
        };

        let outcome = self.pipeline.invoke(envelope, method.as_ref()).await;
        self.normalizer.normalize(envelope.response_id(), outcome)
    }

    fn reject(&self, failure: ParseFailure) -> JsonRpcMessage {
        self.normalizer.failure(failure.id, &failure.error)
    }

    /// Read-only metadata of a registered method.
    pub fn describe(&self, method: &str) -> Option<MethodDescriptor> {
        self.methods
            .get(method)
            .map(|handler| handler.describe(method, self.pipeline.binder()))
    }

    /// Get all registered methods, sorted
    pub fn registered_methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.methods.keys().cloned().collect();
        methods.sort();
        methods
    }
}

/// Builder for [`JsonRpcDispatcher`]
pub struct JsonRpcDispatcherBuilder {
    methods: HashMap<String, Arc<dyn ErasedMethod>>,
    sink: Arc<dyn EventSink>,
    validator: Arc<dyn Validator>,
    coercer: Arc<dyn Coercer>,
    registry: Arc<SchemaRegistry>,
    config: ServerConfig,
}

impl Default for JsonRpcDispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonRpcDispatcherBuilder {
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
            sink: Arc::new(NoopSink),
            validator: Arc::new(SchemaValidator),
            coercer: Arc::new(LooseCoercer),
            registry: Arc::new(SchemaRegistry::new()),
            config: ServerConfig::default(),
        }
    }

    /// Register a method under `name`. A later registration replaces an earlier one.
    pub fn method<M: RpcMethod>(mut self, name: impl Into<String>, method: M) -> Self {
        let name = name.into();
        if self.methods.insert(name.clone(), erase(method)).is_some() {
            warn!("Method '{}' registered twice, keeping the last one", name);
        }
        self
    }

    /// Register a closure as a method
    pub fn function<P, O, F, Fut>(self, name: impl Into<String>, handler: F) -> Self
    where
        P: RpcParams,
        O: ToResultValue + Send + 'static,
        F: Fn(P, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, BoxError>> + Send + 'static,
    {
        self.method(name, FunctionMethod::new(handler))
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn coercer(mut self, coercer: Arc<dyn Coercer>) -> Self {
        self.coercer = coercer;
        self
    }

    /// Share a schema cache between dispatchers
    pub fn schema_registry(mut self, registry: Arc<SchemaRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> JsonRpcDispatcher {
        let binder = ParameterBinder::new(self.registry, self.validator, self.coercer);
        debug!(
            "Building dispatcher with {} methods, max result depth {}",
            self.methods.len(),
            self.config.max_result_depth
        );
        JsonRpcDispatcher {
            methods: self.methods,
            pipeline: InvocationPipeline::new(binder, self.sink),
            normalizer: ResponseNormalizer::new(
                ResultSerializer::new(self.config.max_result_depth),
                self.config.expose_internal_errors,
            ),
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDeclaration, NoParams};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Echo {
        message: String,
    }

    impl RpcParams for Echo {
        fn declarations() -> Vec<FieldDeclaration> {
            vec![FieldDeclaration::of::<String>("message").with_description("Text to echo")]
        }
    }

    fn dispatcher() -> JsonRpcDispatcher {
        JsonRpcDispatcher::builder()
            .function("echo", |p: Echo, _ctx: CallContext| async move {
                Ok::<_, BoxError>(json!({"message": p.message}))
            })
            .function("ping", |_: NoParams, _ctx: CallContext| async move {
                Ok::<_, BoxError>("pong")
            })
            .build()
    }

    #[tokio::test]
    async fn test_echo_round_trip() {
        let response = dispatcher()
            .handle_payload_str(r#"{"jsonrpc":"2.0","method":"echo","id":"1","params":{"message":"hi"}}"#)
            .await
            .unwrap();
        assert_eq!(
            response.as_deref(),
            Some(r#"{"jsonrpc":"2.0","id":"1","result":{"message":"hi"}}"#)
        );
    }

    #[tokio::test]
    async fn test_method_not_found() {
        let body = dispatcher()
            .handle_value(json!({"jsonrpc": "2.0", "method": "nope", "id": 5}))
            .await
            .unwrap();
        let message = &body.messages()[0];
        assert_eq!(message.id(), Some(&crate::RequestId::Number(5)));
        assert_eq!(message.error_object().unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_parse_error() {
        let body = dispatcher().handle_payload("{not json").await.unwrap();
        let message = &body.messages()[0];
        assert_eq!(message.id(), None);
        assert_eq!(message.error_object().unwrap().code, -32700);
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let body = dispatcher()
            .handle_value(json!({"jsonrpc": "2.0", "method": "ping"}))
            .await;
        assert!(body.is_none());

        // Unknown methods are not answered for notifications either
        let body = dispatcher()
            .handle_value(json!({"jsonrpc": "2.0", "method": "missing"}))
            .await;
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn test_invalid_item_inside_batch() {
        let body = dispatcher()
            .handle_value(json!([
                {"jsonrpc": "2.0", "method": "ping", "id": 1},
                {"jsonrpc": "1.0", "method": "ping", "id": 2},
                42
            ]))
            .await
            .unwrap();
        let messages = body.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].result(), Some(&json!("pong")));
        assert_eq!(messages[1].id(), Some(&crate::RequestId::Number(2)));
        assert_eq!(messages[1].error_object().unwrap().code, -32600);
        assert_eq!(messages[2].id(), None);
    }

    #[test]
    fn test_describe() {
        let dispatcher = dispatcher();
        assert_eq!(dispatcher.registered_methods(), vec!["echo", "ping"]);
        let descriptor = dispatcher.describe("echo").unwrap();
        assert_eq!(descriptor.params[0].name, "message");
        assert_eq!(descriptor.params[0].description, Some("Text to echo"));
        assert!(dispatcher.describe("nope").is_none());
    }
}
